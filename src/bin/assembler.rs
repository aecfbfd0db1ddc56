use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

/// Assemble RV32I/M source into the object format read by `riscv_sim`.
///
/// Reads from `input`, or standard input if it is omitted. Writes to
/// `output`, or standard output if it is omitted.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to the assembly source file
    input: Option<PathBuf>,

    /// Path to write the object file to
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let source = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read source from stdin")?;
            buf
        }
    };

    let object = rv32sim::assembler::assemble(&source).context("assembly failed")?;

    match &args.output {
        Some(path) => fs::write(path, object)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => io::stdout()
            .write_all(object.as_bytes())
            .context("failed to write object file to stdout")?,
    }

    Ok(())
}
