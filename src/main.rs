use color_eyre::eyre::Result;

use hatchling::config::{Config, USAGE};
use hatchling::memory::{parse, Memory};
use hatchling::processor::{Processor, Status};
use hatchling::terminal::StdTerminal;
use simple_logger::SimpleLogger;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling

    let config = Config::from_env()?;
    SimpleLogger::new().with_level(config.log_level).init()?; // logging

    if config.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut terminal = StdTerminal::new();
    let mut mem = match &config.program {
        Some(path) => Memory::from_file(path)?,
        None => parse::read_interactive(&mut terminal)?,
    };
    println!("*** PROGRAM LOADING COMPLETED ***");
    println!("*** PROGRAM EXECUTION BEGINS ***");

    let mut cpu = Processor::new();
    let status = cpu.execute_until_halt(&mut mem, &mut terminal)?;

    if let Status::Fault(fault) = status {
        println!("*** {} ***", fault);
        println!("*** HATCHLING EXECUTION ABNORMALLY TERMINATED ***");
    }
    println!("*** PROGRAM EXECUTION TERMINATED ***");
    println!();
    println!("{}", cpu);
    println!();
    println!("Memory: ");
    println!("{}", mem);

    Ok(())
}
