use logos::Logos;

/// Lexical units of one normalized instruction line.
#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\f]+")]
pub enum Token {
    // ── Separators ───────────────────────────
    #[token(",")]
    Comma,

    // ── Mnemonic / Register / Label ──────────
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // ── Numbers (validated later by parse_literal) ──
    #[regex(r"-?[0-9][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Literal(String),
}

/// Tokenizes a normalized line. Commas are dropped; an unlexable
/// character is returned as `Err` with its text.
pub fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut lex = Token::lexer(line);
    let mut out = Vec::new();
    while let Some(tok) = lex.next() {
        match tok {
            Ok(Token::Comma) => {}
            Ok(tok) => out.push(tok),
            Err(()) => return Err(lex.slice().to_string()),
        }
    }
    Ok(out)
}

/// Why a literal was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralError {
    /// Not a number in any accepted notation.
    Malformed,
    /// Well-formed digits whose value exceeds every bit budget.
    TooLarge,
}

/// Decimal (optionally negative), `0x` hex or `0b` binary.
pub fn parse_literal(text: &str) -> Result<i64, LiteralError> {
    let (neg, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (radix, digits) = if let Some(hex) = body.strip_prefix("0x") {
        (16, hex)
    } else if let Some(bin) = body.strip_prefix("0b") {
        (2, bin)
    } else {
        (10, body)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(LiteralError::Malformed);
    }
    // digits are validated, so the only failure left is overflow
    let magnitude = i64::from_str_radix(digits, radix).map_err(|_| LiteralError::TooLarge)?;
    Ok(if neg { -magnitude } else { magnitude })
}

/// Accepts anything representable in `bits` bits as either a signed or an
/// unsigned number: `-(2^(bits-1)) ..= 2^bits - 1`.
pub fn fits_bits(value: i64, bits: u32) -> bool {
    let max = (1i64 << bits) - 1;
    let min = -(1i64 << (bits - 1));
    (min..=max).contains(&value)
}
