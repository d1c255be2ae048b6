//! Decode-stage and write-back-stage control ROMs.
//!
//! The decode ROM is indexed by the first instruction byte
//! (`opcode << 3 | register`). The write-back ROM is indexed by a 12-bit
//! value `{N Z C V}{opcode:5}{register:3}`; only branch opcodes look at the
//! status flags. Both hold 16-bit control words and are emitted as a low and
//! a high byte plane.

use bitflags::bitflags;
use bitvec::prelude::*;
use tracing::debug;

use crate::isa::{Category, Opcode};

pub const DECODE_ROM_SIZE: usize = 256;
pub const WRITEBACK_ROM_SIZE: usize = 4096;

/// 3-bit ALU operation field, bits 0..=2 of the decode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum AluOp {
    Add = 0,
    And = 1,
    Or = 2,
    /// Pass operand B through unchanged.
    PassB = 3,
    Not = 4,
    Sub = 5,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DecodeSignals: u16 {
        const IMS   = 1 << 3; // immediate select
        const ALUI  = 1 << 4; // ALU enable
        const STALL = 1 << 5;
        const LDI   = 1 << 6; // load 16-bit immediate
        const PCS   = 1 << 7; // PC select
        const DECSP = 1 << 8; // stack pointer decrement
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct WritebackSignals: u16 {
        const WEN    = 1 << 0; // register write enable
        const J      = 1 << 1; // jump
        const BRS    = 1 << 2; // branch resolve
        const RW     = 1 << 3; // RAM write
        const RR     = 1 << 4; // RAM read
        const RBYTE  = 1 << 5; // byte-wide RAM access
        const FLUSH  = 1 << 6; // pipeline flush
        const INCSP  = 1 << 7; // stack pointer increment
        const SPS    = 1 << 8; // stack pointer select
        const RET_C  = 1 << 9;
        const CALL_C = 1 << 10;
    }
}

bitflags! {
    /// Processor status flags as they appear in bits 8..=11 of the
    /// write-back ROM index, shifted down by 8.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlags: u8 {
        const V = 1 << 0;
        const C = 1 << 1;
        const Z = 1 << 2;
        const N = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeWord {
    pub alu: AluOp,
    pub signals: DecodeSignals,
}

impl DecodeWord {
    pub fn bits(self) -> u16 {
        self.alu as u16 | self.signals.bits()
    }
}

/// Static control words for one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlWord {
    pub decode: DecodeWord,
    pub writeback: WritebackSignals,
}

fn word(alu: AluOp, decode: DecodeSignals, writeback: WritebackSignals) -> ControlWord {
    ControlWord { decode: DecodeWord { alu, signals: decode }, writeback }
}

/// Base control word of `op`, before any flag-dependent branch resolution.
pub fn control_word(op: Opcode) -> ControlWord {
    use AluOp as A;
    use DecodeSignals as D;
    use Opcode::*;
    use WritebackSignals as W;

    match op {
        Nop => word(A::Add, D::empty(), W::empty()),

        Mvi => word(A::PassB, D::IMS | D::ALUI, W::WEN),
        Addi => word(A::Add, D::IMS | D::ALUI, W::WEN),
        Subi => word(A::Sub, D::IMS | D::ALUI, W::WEN),
        Andi => word(A::And, D::IMS | D::ALUI, W::WEN),
        Ori => word(A::Or, D::IMS | D::ALUI, W::WEN),
        Cmpi => word(A::Sub, D::IMS | D::ALUI, W::empty()),

        Bra => word(A::Add, D::IMS | D::ALUI | D::STALL | D::PCS, W::J | W::BRS),
        Bne | Beq | Bhs | Blo | Bge | Blt | Bvs | Bvc => {
            word(A::Add, D::IMS | D::ALUI | D::PCS, W::BRS)
        }

        Mvr => word(A::PassB, D::ALUI, W::WEN),
        Addr => word(A::Add, D::ALUI, W::WEN),
        Subr => word(A::Sub, D::ALUI, W::WEN),
        Andr => word(A::And, D::ALUI, W::WEN),
        Orr => word(A::Or, D::ALUI, W::WEN),
        Notr => word(A::Not, D::ALUI, W::WEN),
        Cmp => word(A::Sub, D::ALUI, W::empty()),

        Ldr => word(A::Add, D::LDI | D::STALL, W::WEN | W::RR),
        Ldrb => word(A::Add, D::LDI | D::STALL, W::WEN | W::RR | W::RBYTE),
        Str => word(A::Add, D::LDI | D::STALL, W::RW),
        Strb => word(A::Add, D::LDI | D::STALL, W::RW | W::RBYTE),

        Push => word(A::Add, D::empty(), W::RW | W::INCSP | W::SPS),
        Pop => word(A::Add, D::DECSP, W::RR | W::WEN | W::SPS),
        Call => word(
            A::Add,
            D::LDI | D::STALL,
            W::J | W::RW | W::INCSP | W::SPS | W::CALL_C | W::FLUSH,
        ),
        Ret => word(A::Add, D::DECSP, W::RR | W::J | W::FLUSH | W::SPS | W::RET_C),

        Jmp => word(A::Add, D::STALL | D::LDI, W::J),
    }
}

/// Whether a conditional branch is taken under `flags`. `bra` is
/// unconditional through its base word and returns false here.
pub fn branch_taken(op: Opcode, flags: StatusFlags) -> bool {
    let n = flags.contains(StatusFlags::N);
    let z = flags.contains(StatusFlags::Z);
    let c = flags.contains(StatusFlags::C);
    let v = flags.contains(StatusFlags::V);
    match op {
        Opcode::Beq => z,
        Opcode::Bne => !z,
        Opcode::Bhs => c,
        Opcode::Blo => !c,
        // equal, or sign matches overflow
        Opcode::Bge => z || n == v,
        Opcode::Blt => n != v,
        Opcode::Bvs => v,
        Opcode::Bvc => !v,
        _ => false,
    }
}

/// Write-back word for `op` with branch resolution against `flags` applied.
pub fn writeback_word(op: Opcode, flags: StatusFlags) -> WritebackSignals {
    let base = control_word(op).writeback;
    if op.category() == Category::Branch && branch_taken(op, flags) {
        base | WritebackSignals::J | WritebackSignals::FLUSH
    } else {
        base
    }
}

/// Splits a write-back ROM index into its opcode and flag fields. The
/// register field (bits 0..=2) is ignored.
pub fn split_writeback_index(index: u16) -> (Opcode, StatusFlags) {
    let bits = index.view_bits::<Lsb0>();
    let code: u8 = bits[3..8].load_le();
    let flags: u8 = bits[8..12].load_le();
    let op = Opcode::from_code(code).unwrap_or(Opcode::Nop);
    (op, StatusFlags::from_bits_truncate(flags))
}

/// A 16-bit-wide ROM stored as two byte-wide planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomPair {
    pub low: Vec<u8>,
    pub high: Vec<u8>,
}

impl RomPair {
    fn from_words(words: impl Iterator<Item = u16>) -> Self {
        let (low, high) = words.map(|w| (w as u8, (w >> 8) as u8)).unzip();
        RomPair { low, high }
    }

    pub fn word(&self, index: usize) -> u16 {
        u16::from_le_bytes([self.low[index], self.high[index]])
    }
}

/// Decode ROM: one entry per first instruction byte.
pub fn decode_rom() -> RomPair {
    let rom = RomPair::from_words((0..DECODE_ROM_SIZE).map(|i| {
        let op = Opcode::from_code((i >> 3) as u8).unwrap_or(Opcode::Nop);
        control_word(op).decode.bits()
    }));
    debug!(entries = rom.low.len(), "decode rom built");
    rom
}

/// Write-back ROM: one entry per `{flags}{opcode}{register}` index.
pub fn writeback_rom() -> RomPair {
    let rom = RomPair::from_words((0..WRITEBACK_ROM_SIZE as u16).map(|i| {
        let (op, flags) = split_writeback_index(i);
        writeback_word(op, flags).bits()
    }));
    debug!(entries = rom.low.len(), "write-back rom built");
    rom
}
