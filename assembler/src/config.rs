/// How branch displacements are scaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Addressing {
    /// Every byte has its own address; displacements count bytes.
    #[default]
    Byte,
    /// Memory is addressed in 16-bit words; displacements count words.
    Word,
}

impl Addressing {
    pub fn word_size(self) -> i32 {
        match self {
            Addressing::Byte => 1,
            Addressing::Word => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AsmConfig {
    pub addressing: Addressing,
}
