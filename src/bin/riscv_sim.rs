use anyhow::{Context, Result};
use clap::Parser;
use rv32sim::processor::Processor;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

/// Run an assembled RV32I/M object file on the single-cycle simulator.
///
/// Reads the object file from `input`, or standard input if it is
/// omitted. Execution halts when register x31 holds the sentinel
/// 0xDEADBEEF, or when a zero instruction word is fetched. On halt,
/// prints the cycle count, a full register dump, and a dump of every
/// touched data-memory byte.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the object file produced by `assembler`
    input: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let object = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read object file from stdin")?;
            buf
        }
    };

    let mut processor = Processor::new();
    processor
        .load_program(object.lines())
        .context("failed to load object file onto the processor")?;

    processor.run().context("execution failed")?;

    processor.print_statistics();
    processor.dump_registers();
    processor.dump_memory();

    Ok(())
}
