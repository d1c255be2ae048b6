//! urom – writes the R8 decode and write-back microcode ROM images

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use r8asm::{microcode, output};

#[derive(Parser, Debug)]
#[command(author, version, about = "R8 microcode ROM generator")]
struct Cli {
    /// Directory receiving dx_rom.bin, dx_rom2.bin, wb_rom.bin and wb_rom2.bin
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let dx = microcode::decode_rom();
    let wb = microcode::writeback_rom();

    let images: [(&str, &[u8]); 4] = [
        ("dx_rom.bin", dx.low.as_slice()),
        ("dx_rom2.bin", dx.high.as_slice()),
        ("wb_rom.bin", wb.low.as_slice()),
        ("wb_rom2.bin", wb.high.as_slice()),
    ];
    for (name, bytes) in images {
        let path = cli.out_dir.join(name);
        output::write_atomic(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "rom written");
    }
    Ok(())
}
