use crate::{
    config::AsmConfig,
    error::AsmError,
    isa::{Category, Opcode, Register},
    parser::{Item, ItemKind, SymTab},
};

/// Read-only walk over the pass-1 item stream.
pub struct Cursor<'a> {
    items: &'a [Item],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(items: &'a [Item]) -> Self {
        Self { items, pos: 0 }
    }

    fn register(&mut self) -> Option<Register> {
        match self.next()?.kind {
            ItemKind::Reg(r) => Some(r),
            _ => None,
        }
    }

    fn immediate(&mut self) -> Option<i16> {
        match self.next()?.kind {
            ItemKind::Imm(v) => Some(v),
            _ => None,
        }
    }

    fn address(&mut self) -> Option<u16> {
        match self.next()?.kind {
            ItemKind::Addr(a) => Some(a),
            _ => None,
        }
    }

    fn label(&mut self) -> Option<&'a str> {
        match &self.next()?.kind {
            ItemKind::LabelRef(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

impl<'a> Iterator for Cursor<'a> {
    type Item = &'a Item;

    fn next(&mut self) -> Option<&'a Item> {
        let item = self.items.get(self.pos)?;
        self.pos += 1;
        Some(item)
    }
}

#[inline]
fn enc_reg(op: Opcode, r: Register) -> u8 {
    op.high_byte() | r.index()
}

#[inline]
fn enc_abs(first: u8, addr: u16) -> [u8; 4] {
    let [hi, lo] = addr.to_be_bytes();
    [first, 0, hi, lo]
}

fn resolve(sym: &SymTab, name: &str, line: usize) -> Result<u16, AsmError> {
    sym.get(name)
        .copied()
        .ok_or_else(|| AsmError::UndefinedLabel { line, name: name.to_string() })
}

/// Signed displacement from the address after the branch to `target`,
/// in units of the configured word size.
pub fn branch_disp(target: u16, next_pc: u32, cfg: &AsmConfig, line: usize) -> Result<i8, AsmError> {
    let raw = i32::from(target) - next_pc as i32;
    let word = cfg.addressing.word_size();
    if raw % word != 0 {
        return Err(AsmError::Misaligned {
            line,
            addr: target,
            msg: format!("branch target is not a multiple of {word} bytes away"),
        });
    }
    let disp = raw / word;
    i8::try_from(disp).map_err(|_| {
        AsmError::range(line, format!("branch displacement {disp} outside -128..=127"))
    })
}

/// Emits one instruction whose mnemonic has already been read from `ops`.
/// `next_pc` is the address right after this instruction.
pub fn encode(
    op: Opcode,
    line: usize,
    ops: &mut Cursor<'_>,
    sym: &SymTab,
    next_pc: u32,
    cfg: &AsmConfig,
    out: &mut Vec<u8>,
) -> Result<(), AsmError> {
    let step = |what: &str| AsmError::OutOfStep {
        line,
        pc: next_pc,
        msg: format!("`{op}` expected {what} operand"),
    };

    match op.category() {
        Category::Nop => out.extend([op.high_byte(), 0]),

        Category::Immediate => {
            let rd = ops.register().ok_or_else(|| step("register"))?;
            let imm = ops.immediate().ok_or_else(|| step("immediate"))?;
            out.extend([enc_reg(op, rd), imm as u8]);
        }

        Category::Branch => {
            let name = ops.label().ok_or_else(|| step("label"))?;
            let target = resolve(sym, name, line)?;
            let disp = branch_disp(target, next_pc, cfg, line)?;
            out.extend([op.high_byte(), disp as u8]);
        }

        Category::Register => {
            let rd = ops.register().ok_or_else(|| step("register"))?;
            let rs = ops.register().ok_or_else(|| step("register"))?;
            out.extend([enc_reg(op, rd), rs.index()]);
        }

        Category::Ram => {
            let r = ops.register().ok_or_else(|| step("register"))?;
            let addr = ops.address().ok_or_else(|| step("address"))?;
            if op.is_word_access() && addr % 2 != 0 {
                return Err(AsmError::Misaligned {
                    line,
                    addr,
                    msg: format!("`{op}` needs an even address, use `{op}b` for bytes"),
                });
            }
            out.extend(enc_abs(enc_reg(op, r), addr));
        }

        Category::Jump => {
            let name = ops.label().ok_or_else(|| step("label"))?;
            out.extend(enc_abs(op.high_byte(), resolve(sym, name, line)?));
        }

        Category::Stack => match op {
            Opcode::Push | Opcode::Pop => {
                let r = ops.register().ok_or_else(|| step("register"))?;
                out.extend([enc_reg(op, r), 0]);
            }
            Opcode::Call => {
                let name = ops.label().ok_or_else(|| step("label"))?;
                out.extend(enc_abs(op.high_byte(), resolve(sym, name, line)?));
            }
            _ => out.extend([op.high_byte(), 0]),
        },
    }
    Ok(())
}
