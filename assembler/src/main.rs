//! r8asm – R8 8-register CPU two-pass assembler (CLI)

use anyhow::{Context, Result};
use clap::Parser;
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use r8asm::{assemble, disasm, output, Addressing, AsmConfig};

/// CLI options
#[derive(Parser, Debug)]
#[command(author, version, about = "R8 Assembler")]
struct Cli {
    /// Input assembly source
    #[arg(default_value = "fibonacci.txt")]
    input: PathBuf,

    /// Output machine code file
    #[arg(short, long, default_value = "machine_code.bin")]
    output: PathBuf,

    /// Unit that branch displacements count in
    #[arg(long, value_enum, default_value_t = Addressing::Byte)]
    addressing: Addressing,

    /// Print a disassembly of the result
    #[arg(long)]
    listing: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = AsmConfig { addressing: cli.addressing };

    /* 1. read source */
    let src = fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    info!(input = %cli.input.display(), "assembling");

    /* 2. pass 1 + pass 2 */
    let asm = assemble(&src, &cfg).with_context(|| format!("assembling {}", cli.input.display()))?;

    if cli.listing {
        for (pc, inst) in disasm::disassemble(&asm.code) {
            println!("{pc:#06x}  {inst}");
        }
    }

    /* 3. machine code, only once both passes succeeded */
    output::write_atomic(&cli.output, &asm.code)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    println!(
        "OK  code:{:>5}B  labels:{:>3}  ->  {}",
        asm.code.len(),
        asm.symbols.len(),
        cli.output.display()
    );
    Ok(())
}
