//! The closed R8 instruction set: opcodes, registers and instruction categories.
//!
//! Both the assembler and the microcode generator read their ISA facts from
//! here, so an opcode number or category changes in exactly one place.

use std::fmt;

pub const NUM_REGS: usize = 8;

/// Shape class of an instruction: operand grammar and encoded width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Nop,
    Immediate,
    Branch,
    Register,
    Ram,
    Stack,
    Jump,
}

macro_rules! opcodes {
    ($($name:ident = $code:literal, $mn:literal;)*) => {
        /// 5-bit opcode; the discriminant is the value placed in bits 7..3
        /// of the first instruction byte.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Opcode {
            $($name = $code,)*
        }

        impl Opcode {
            pub const ALL: [Opcode; 32] = [$(Opcode::$name,)*];

            /// Mnemonics in opcode order.
            pub const MNEMONICS: [&'static str; 32] = [$($mn,)*];

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$name => $mn,)*
                }
            }

            /// Exact-match lookup; callers lower-case their input first.
            pub fn from_mnemonic(text: &str) -> Option<Opcode> {
                match text {
                    $($mn => Some(Opcode::$name),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    Nop  = 0,  "nop";
    Mvi  = 1,  "mvi";
    Addi = 2,  "addi";
    Subi = 3,  "subi";
    Andi = 4,  "andi";
    Ori  = 5,  "ori";
    Cmpi = 6,  "cmpi";
    Bra  = 7,  "bra";
    Bne  = 8,  "bne";
    Beq  = 9,  "beq";
    Bhs  = 10, "bhs";
    Blo  = 11, "blo";
    Bge  = 12, "bge";
    Blt  = 13, "blt";
    Bvs  = 14, "bvs";
    Bvc  = 15, "bvc";
    Mvr  = 16, "mvr";
    Addr = 17, "addr";
    Subr = 18, "subr";
    Andr = 19, "andr";
    Orr  = 20, "orr";
    Notr = 21, "notr";
    Cmp  = 22, "cmp";
    Ldr  = 23, "ldr";
    Ldrb = 24, "ldrb";
    Str  = 25, "str";
    Strb = 26, "strb";
    Push = 27, "push";
    Pop  = 28, "pop";
    Call = 29, "call";
    Ret  = 30, "ret";
    Jmp  = 31, "jmp";
}

impl Opcode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Opcode> {
        Opcode::ALL.get(code as usize).copied()
    }

    /// First instruction byte with the register field left at zero.
    pub fn high_byte(self) -> u8 {
        self.code() << 3
    }

    pub fn category(self) -> Category {
        use Opcode::*;
        match self {
            Nop => Category::Nop,
            Mvi | Addi | Subi | Andi | Ori | Cmpi => Category::Immediate,
            Bra | Bne | Beq | Bhs | Blo | Bge | Blt | Bvs | Bvc => Category::Branch,
            Mvr | Addr | Subr | Andr | Orr | Notr | Cmp => Category::Register,
            Ldr | Ldrb | Str | Strb => Category::Ram,
            Push | Pop | Call | Ret => Category::Stack,
            Jmp => Category::Jump,
        }
    }

    /// Encoded size in bytes. Pass 1 advances the PC by this and pass 2
    /// must emit exactly this many bytes.
    pub fn width(self) -> u16 {
        match self.category() {
            Category::Nop | Category::Immediate | Category::Branch | Category::Register => 2,
            Category::Ram | Category::Jump => 4,
            Category::Stack => match self {
                Opcode::Call => 4,
                _ => 2,
            },
        }
    }

    /// Word-width RAM accesses; these reject odd addresses.
    pub fn is_word_access(self) -> bool {
        matches!(self, Opcode::Ldr | Opcode::Str)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One of the eight general-purpose registers `r0`..`r7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(u8);

const REGISTER_NAMES: [&str; NUM_REGS] = ["r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7"];

impl Register {
    pub fn new(index: u8) -> Option<Register> {
        ((index as usize) < NUM_REGS).then_some(Register(index))
    }

    /// Low three bits of an instruction byte.
    pub fn from_field(byte: u8) -> Register {
        Register(byte & 0b111)
    }

    pub fn from_name(text: &str) -> Option<Register> {
        REGISTER_NAMES
            .iter()
            .position(|name| *name == text)
            .map(|i| Register(i as u8))
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REGISTER_NAMES[self.0 as usize])
    }
}

/// Every mnemonic followed by every register name.
pub fn reserved_words() -> impl Iterator<Item = &'static str> {
    Opcode::MNEMONICS.into_iter().chain(REGISTER_NAMES)
}

/// True when `name` is a mnemonic or a register name and so cannot be a label.
pub fn is_reserved(name: &str) -> bool {
    reserved_words().any(|word| word == name)
}

pub fn mnemonic_to_opcode(text: &str) -> Option<Opcode> {
    Opcode::from_mnemonic(text)
}

pub fn register_name_to_index(text: &str) -> Option<u8> {
    Register::from_name(text).map(Register::index)
}

pub fn category_of(op: Opcode) -> Category {
    op.category()
}
