use thiserror::Error;

/// Coarse classification of an [`AsmError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Resolution,
    Range,
    Alignment,
    Layout,
    Internal,
}

/// Every assembly failure is fatal; `line` is the 1-based source line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AsmError {
    #[error("line {line}: syntax error: {msg}")]
    Syntax { line: usize, msg: String },

    #[error("line {line}: duplicate label `{name}` (first defined at {first:#06x})")]
    DuplicateLabel { line: usize, name: String, first: u16 },

    #[error("line {line}: undefined label `{name}`")]
    UndefinedLabel { line: usize, name: String },

    #[error("line {line}: value out of range: {msg}")]
    Range { line: usize, msg: String },

    #[error("line {line}: misaligned address {addr:#06x}: {msg}")]
    Misaligned { line: usize, addr: u16, msg: String },

    #[error("line {line}: #org {target:#06x} is behind the program counter {pc:#06x}")]
    OrgBackwards { line: usize, target: u16, pc: u32 },

    #[error("line {line}: pass 2 out of step with pass 1 (pc {pc:#06x}): {msg}")]
    OutOfStep { line: usize, pc: u32, msg: String },
}

impl AsmError {
    pub(crate) fn syntax(line: usize, msg: impl Into<String>) -> Self {
        AsmError::Syntax { line, msg: msg.into() }
    }

    pub(crate) fn range(line: usize, msg: impl Into<String>) -> Self {
        AsmError::Range { line, msg: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AsmError::Syntax { .. } | AsmError::DuplicateLabel { .. } => ErrorKind::Syntax,
            AsmError::UndefinedLabel { .. } => ErrorKind::Resolution,
            AsmError::Range { .. } => ErrorKind::Range,
            AsmError::Misaligned { .. } => ErrorKind::Alignment,
            AsmError::OrgBackwards { .. } => ErrorKind::Layout,
            AsmError::OutOfStep { .. } => ErrorKind::Internal,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            AsmError::Syntax { line, .. }
            | AsmError::DuplicateLabel { line, .. }
            | AsmError::UndefinedLabel { line, .. }
            | AsmError::Range { line, .. }
            | AsmError::Misaligned { line, .. }
            | AsmError::OrgBackwards { line, .. }
            | AsmError::OutOfStep { line, .. } => *line,
        }
    }
}
