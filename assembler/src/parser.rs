use crate::{
    config::AsmConfig,
    encoder::{self, Cursor},
    error::AsmError,
    isa::{self, Category, Opcode, Register},
    lexer::{self, LiteralError, Token},
};
use std::collections::HashMap;
use tracing::{debug, info};

pub type SymTab = HashMap<String, u16>;

/// One past the last byte address.
pub const ADDRESS_SPACE: u32 = 0x1_0000;

/// One entry of the flat stream pass 1 hands to pass 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub line: usize,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Mnemonic(Opcode),
    Reg(Register),
    /// 8-bit immediate, already range checked.
    Imm(i16),
    /// 16-bit RAM address.
    Addr(u16),
    LabelRef(String),
}

pub struct FirstPassResult {
    pub symbols: SymTab,
    pub items: Vec<Item>,
    /// Program counter after the last statement; reaches `ADDRESS_SPACE`
    /// when the final instruction ends on the last byte.
    pub pc: u32,
}

/// Operand grammar of an instruction, in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Reg,
    Imm,
    Addr,
    Label,
}

fn operand_shapes(op: Opcode) -> &'static [Shape] {
    match op.category() {
        Category::Nop => &[],
        Category::Immediate => &[Shape::Reg, Shape::Imm],
        Category::Register => &[Shape::Reg, Shape::Reg],
        Category::Ram => &[Shape::Reg, Shape::Addr],
        Category::Branch | Category::Jump => &[Shape::Label],
        Category::Stack => match op {
            Opcode::Push | Opcode::Pop => &[Shape::Reg],
            Opcode::Call => &[Shape::Label],
            _ => &[],
        },
    }
}

/// Strips the `;` comment, trims and lower-cases. `None` for blank lines.
pub fn normalize(line: &str) -> Option<String> {
    let code = match line.find(';') {
        Some(p) => &line[..p],
        None => line,
    };
    let code = code.trim();
    (!code.is_empty()).then(|| code.to_lowercase())
}

/// Letter or underscore first, then letters, digits and underscores; never a
/// mnemonic or register name.
pub fn is_valid_label(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !isa::is_reserved(name)
}

struct Pass1 {
    pc: u32,
    symbols: SymTab,
    items: Vec<Item>,
}

impl Pass1 {
    fn advance(&mut self, line: usize, op: Opcode) -> Result<(), AsmError> {
        let end = self.pc + u32::from(op.width());
        if end > ADDRESS_SPACE {
            return Err(AsmError::range(
                line,
                format!("`{op}` at {:#06x} runs past the end of the 16-bit address space", self.pc),
            ));
        }
        self.pc = end;
        Ok(())
    }

    fn push(&mut self, line: usize, kind: ItemKind) {
        self.items.push(Item { line, kind });
    }

    fn label(&mut self, line: usize, name: &str) -> Result<(), AsmError> {
        if !is_valid_label(name) {
            return Err(AsmError::syntax(line, format!("invalid label name `{name}`")));
        }
        if let Some(&first) = self.symbols.get(name) {
            return Err(AsmError::DuplicateLabel { line, name: name.to_string(), first });
        }
        let addr = u16::try_from(self.pc).map_err(|_| {
            AsmError::range(line, format!("label `{name}` lies past the end of the address space"))
        })?;
        debug!(line, label = name, addr, "label");
        self.symbols.insert(name.to_string(), addr);
        Ok(())
    }

    fn directive(&mut self, line: usize, text: &str) -> Result<(), AsmError> {
        let mut words = text.split_whitespace();
        match words.next() {
            Some("#org") => {}
            Some(other) => {
                return Err(AsmError::syntax(line, format!("unknown directive `{other}`")));
            }
            None => return Err(AsmError::syntax(line, "empty directive")),
        }

        let operand = words
            .next()
            .ok_or_else(|| AsmError::syntax(line, "#org expects an address"))?;
        let value = number(line, operand)?;
        let target = u16::try_from(value)
            .map_err(|_| AsmError::range(line, format!("#org address `{operand}` does not fit 16 bits")))?;
        if let Some(extra) = words.next() {
            return Err(AsmError::syntax(line, format!("unexpected `{extra}` after #org address")));
        }

        if u32::from(target) < self.pc {
            return Err(AsmError::OrgBackwards { line, target, pc: self.pc });
        }
        if target % 2 != 0 {
            return Err(AsmError::Misaligned {
                line,
                addr: target,
                msg: "#org target must be on a 16-bit word boundary".into(),
            });
        }

        let fill = (u32::from(target) - self.pc) / u32::from(Opcode::Nop.width());
        debug!(line, from = self.pc, to = target, fill, "#org");
        for _ in 0..fill {
            self.push(line, ItemKind::Mnemonic(Opcode::Nop));
        }
        self.pc = u32::from(target);
        Ok(())
    }

    fn instruction(&mut self, line: usize, text: &str) -> Result<(), AsmError> {
        let toks = lexer::tokenize(text)
            .map_err(|c| AsmError::syntax(line, format!("unexpected character `{c}`")))?;
        let mut toks = toks.into_iter();

        let op = match toks.next() {
            Some(Token::Ident(name)) => Opcode::from_mnemonic(&name)
                .ok_or_else(|| AsmError::syntax(line, format!("unknown instruction `{name}`")))?,
            Some(Token::Literal(lit)) => {
                return Err(AsmError::syntax(line, format!("expected instruction, found `{lit}`")));
            }
            Some(Token::Comma) | None => return Err(AsmError::syntax(line, "expected instruction")),
        };

        let mut operands = Vec::with_capacity(2);
        for shape in operand_shapes(op) {
            let tok = toks.next().ok_or_else(|| {
                AsmError::syntax(line, format!("missing {} operand for `{op}`", shape_name(*shape)))
            })?;
            operands.push(operand(line, op, *shape, tok)?);
        }
        if let Some(extra) = toks.next() {
            return Err(AsmError::syntax(
                line,
                format!("unexpected `{}` after last operand of `{op}`", token_text(&extra)),
            ));
        }

        debug!(line, pc = self.pc, %op, "instruction");
        self.push(line, ItemKind::Mnemonic(op));
        for kind in operands {
            self.push(line, kind);
        }
        self.advance(line, op)
    }
}

fn shape_name(shape: Shape) -> &'static str {
    match shape {
        Shape::Reg => "register",
        Shape::Imm => "immediate",
        Shape::Addr => "address",
        Shape::Label => "label",
    }
}

fn token_text(tok: &Token) -> &str {
    match tok {
        Token::Ident(s) | Token::Literal(s) => s,
        Token::Comma => ",",
    }
}

fn operand(line: usize, op: Opcode, shape: Shape, tok: Token) -> Result<ItemKind, AsmError> {
    match (shape, tok) {
        (Shape::Reg, Token::Ident(name)) => Register::from_name(&name)
            .map(ItemKind::Reg)
            .ok_or_else(|| AsmError::syntax(line, format!("invalid register `{name}` (r0-r7)"))),

        (Shape::Imm, Token::Literal(lit)) => {
            let value = number(line, &lit)?;
            if !lexer::fits_bits(value, 8) {
                return Err(AsmError::range(line, format!("immediate `{lit}` does not fit 8 bits")));
            }
            Ok(ItemKind::Imm(value as i16))
        }

        (Shape::Addr, Token::Literal(lit)) => {
            let value = number(line, &lit)?;
            if !lexer::fits_bits(value, 16) {
                return Err(AsmError::range(line, format!("address `{lit}` does not fit 16 bits")));
            }
            // negative addresses are stored as their two's complement
            Ok(ItemKind::Addr(value as u16))
        }

        (Shape::Label, Token::Ident(name)) if !isa::is_reserved(&name) => {
            Ok(ItemKind::LabelRef(name))
        }
        (Shape::Label, Token::Ident(name)) => Err(AsmError::syntax(
            line,
            format!("`{name}` is a reserved word, expected label after `{op}`"),
        )),
        (Shape::Label, Token::Literal(lit)) => Err(AsmError::syntax(
            line,
            format!("expected label after `{op}`, found number `{lit}`"),
        )),

        (shape, tok) => Err(AsmError::syntax(
            line,
            format!("expected {} operand, found `{}`", shape_name(shape), token_text(&tok)),
        )),
    }
}

fn number(line: usize, lit: &str) -> Result<i64, AsmError> {
    lexer::parse_literal(lit).map_err(|e| match e {
        LiteralError::Malformed => {
            AsmError::syntax(line, format!("malformed number `{lit}` (0b.., 0x.., or decimal)"))
        }
        LiteralError::TooLarge => AsmError::range(line, format!("number `{lit}` is far too large")),
    })
}

/// Validates every line, builds the symbol table and the item stream.
pub fn first_pass(src: &str) -> Result<FirstPassResult, AsmError> {
    let mut pass = Pass1 { pc: 0, symbols: SymTab::new(), items: Vec::new() };

    for (idx, raw) in src.lines().enumerate() {
        let line = idx + 1;
        let Some(text) = normalize(raw) else {
            continue;
        };

        if let Some(name) = text.strip_prefix('.') {
            pass.label(line, name)?;
        } else if text.starts_with('#') {
            pass.directive(line, &text)?;
        } else {
            pass.instruction(line, &text)?;
        }
    }

    info!(labels = pass.symbols.len(), items = pass.items.len(), pc = pass.pc, "pass 1 done");
    Ok(FirstPassResult { symbols: pass.symbols, items: pass.items, pc: pass.pc })
}

/// Encodes the item stream with the completed symbol table.
pub fn second_pass(pass1: &FirstPassResult, cfg: &AsmConfig) -> Result<Vec<u8>, AsmError> {
    let mut code = Vec::<u8>::with_capacity(pass1.pc as usize);
    let mut cursor = Cursor::new(&pass1.items);
    let mut pc: u32 = 0;

    while let Some(item) = cursor.next() {
        let ItemKind::Mnemonic(op) = item.kind else {
            return Err(AsmError::OutOfStep {
                line: item.line,
                pc,
                msg: format!("expected mnemonic, found {:?}", item.kind),
            });
        };
        let line = item.line;
        let next_pc = pc + u32::from(op.width());
        if next_pc > ADDRESS_SPACE {
            return Err(AsmError::OutOfStep {
                line,
                pc,
                msg: format!("`{op}` runs past the end of the address space"),
            });
        }

        encoder::encode(op, line, &mut cursor, &pass1.symbols, next_pc, cfg, &mut code)?;
        pc = next_pc;

        if code.len() != pc as usize {
            return Err(AsmError::OutOfStep {
                line,
                pc,
                msg: format!("`{op}` emitted {} bytes in total, expected {pc}", code.len()),
            });
        }
    }

    if pc != pass1.pc {
        let line = pass1.items.last().map_or(0, |i| i.line);
        return Err(AsmError::OutOfStep {
            line,
            pc,
            msg: format!("pass 1 ended at {:#06x}", pass1.pc),
        });
    }

    info!(bytes = code.len(), "pass 2 done");
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn normalizes_lines() {
        assert_eq!(normalize("  MVI R0, 5 ; load"), Some("mvi r0, 5".to_string()));
        assert_eq!(normalize("   ; only a comment"), None);
        assert_eq!(normalize("\t \r"), None);
    }

    #[test]
    fn label_rules() {
        assert!(is_valid_label("loop"));
        assert!(is_valid_label("_start2"));
        assert!(is_valid_label("r8"));
        assert!(!is_valid_label("2fast"));
        assert!(!is_valid_label("bad-name"));
        assert!(!is_valid_label("r3"));
        assert!(!is_valid_label("jmp"));
        assert!(!is_valid_label(""));
    }

    #[test]
    fn label_at_first_instruction_is_zero() {
        let p = first_pass(".start\nmvi r0, 1\n").unwrap();
        assert_eq!(p.symbols["start"], 0);
        assert_eq!(p.pc, 2);
    }

    #[test]
    fn label_takes_address_of_next_instruction() {
        let p = first_pass("mvi r0, 1\nldr r1, 0x10\n.after\nnop\n").unwrap();
        assert_eq!(p.symbols["after"], 6);
        assert_eq!(p.pc, 8);
    }

    #[test]
    fn org_fills_with_nops() {
        let src = "nop\nnop\n#org 0x10\n.here\nnop\n";
        let p = first_pass(src).unwrap();
        let nops = p
            .items
            .iter()
            .filter(|i| i.line == 3 && i.kind == ItemKind::Mnemonic(Opcode::Nop))
            .count();
        assert_eq!(nops, 6);
        assert_eq!(p.symbols["here"], 0x10);
        assert_eq!(p.pc, 0x12);
    }

    #[test]
    fn org_backwards_is_layout_error() {
        let err = first_pass("nop\nnop\n#org 0x02\n").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Layout);
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn operand_stream_order() {
        let p = first_pass("addr r1, r2\nbeq done\n.done\n").unwrap();
        let kinds: Vec<_> = p.items.into_iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ItemKind::Mnemonic(Opcode::Addr),
                ItemKind::Reg(Register::new(1).unwrap()),
                ItemKind::Reg(Register::new(2).unwrap()),
                ItemKind::Mnemonic(Opcode::Beq),
                ItemKind::LabelRef("done".into()),
            ]
        );
    }

    #[test]
    fn last_instruction_may_end_on_the_last_byte() {
        let p = first_pass("#org 0xfffe\nnop\n").unwrap();
        assert_eq!(p.pc, ADDRESS_SPACE);

        let err = first_pass("#org 0xfffe\nnop\n.end\n").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn negative_address_is_twos_complement() {
        let p = first_pass("ldrb r0, -1\n").unwrap();
        assert_eq!(p.items[2].kind, ItemKind::Addr(0xFFFF));
    }

    #[test]
    fn undefined_labels_pass_first_pass() {
        assert!(first_pass("jmp nowhere\n").is_ok());
    }
}
