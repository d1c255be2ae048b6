use std::fmt;

use crate::isa::{Category, Opcode, Register};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    None,
    Imm { rd: Register, imm: u8 },
    Regs { rd: Register, rs: Register },
    Ram { r: Register, addr: u16 },
    Branch { disp: i8 },
    /// `jmp` / `call` absolute target.
    Abs { addr: u16 },
    /// `push` / `pop`.
    Reg { r: Register },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub op: Opcode,
    pub operands: Operands,
}

impl Decoded {
    pub fn width(&self) -> u16 {
        self.op.width()
    }
}

/// Decodes the instruction at the start of `bytes`. `None` if the slice is
/// shorter than the instruction or a register byte is out of range.
pub fn decode(bytes: &[u8]) -> Option<Decoded> {
    let first = *bytes.first()?;
    let op = Opcode::from_code(first >> 3)?;
    let bytes = bytes.get(..op.width() as usize)?;
    let r = Register::from_field(first);
    let abs = || u16::from_be_bytes([bytes[2], bytes[3]]);

    let operands = match op.category() {
        Category::Nop => Operands::None,
        Category::Immediate => Operands::Imm { rd: r, imm: bytes[1] },
        Category::Branch => Operands::Branch { disp: bytes[1] as i8 },
        Category::Register => Operands::Regs { rd: r, rs: Register::new(bytes[1])? },
        Category::Ram => Operands::Ram { r, addr: abs() },
        Category::Jump => Operands::Abs { addr: abs() },
        Category::Stack => match op {
            Opcode::Push | Opcode::Pop => Operands::Reg { r },
            Opcode::Call => Operands::Abs { addr: abs() },
            _ => Operands::None,
        },
    };
    Some(Decoded { op, operands })
}

/// Linear sweep from address 0; stops at the first undecodable byte.
pub fn disassemble(code: &[u8]) -> Vec<(u16, Decoded)> {
    let mut out = Vec::new();
    let mut pc = 0usize;
    while pc < code.len() {
        let Some(d) = decode(&code[pc..]) else { break };
        out.push((pc as u16, d));
        pc += d.width() as usize;
    }
    out
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.op;
        match self.operands {
            Operands::None => write!(f, "{op}"),
            Operands::Imm { rd, imm } => write!(f, "{op} {rd}, {imm:#04x}"),
            Operands::Regs { rd, rs } => write!(f, "{op} {rd}, {rs}"),
            Operands::Ram { r, addr } => write!(f, "{op} {r}, {addr:#06x}"),
            Operands::Branch { disp } => write!(f, "{op} {disp:+}"),
            Operands::Abs { addr } => write!(f, "{op} {addr:#06x}"),
            Operands::Reg { r } => write!(f, "{op} {r}"),
        }
    }
}
