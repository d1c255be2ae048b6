//! r8asm – two-pass assembler and microcode ROM generator for the R8 CPU.

pub mod config;
pub mod disasm;
pub mod encoder;
pub mod error;
pub mod isa;
pub mod lexer;
pub mod microcode;
pub mod output;
pub mod parser;

pub use config::{Addressing, AsmConfig};
pub use error::{AsmError, ErrorKind};
pub use parser::SymTab;

/// Machine code plus the symbol table it was laid out with.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub code: Vec<u8>,
    pub symbols: SymTab,
}

/// Runs both passes over `src`. Stops at the first error.
pub fn assemble(src: &str, cfg: &AsmConfig) -> Result<Assembly, AsmError> {
    let pass1 = parser::first_pass(src)?;
    let code = parser::second_pass(&pass1, cfg)?;
    Ok(Assembly { code, symbols: pass1.symbols })
}
