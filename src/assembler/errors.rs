use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("line {line}: unrecognized mnemonic \"{mnemonic}\"")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("line {line}: expected {expected} operand(s) for \"{mnemonic}\", found {found}")]
    WrongOperandCount {
        line: usize,
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: \"{token}\" is not a register (expected x0-x31)")]
    InvalidRegister { line: usize, token: String },

    #[error("line {line}: \"{token}\" is not a valid integer immediate")]
    InvalidImmediate { line: usize, token: String },

    #[error("line {line}: immediate {value} does not fit in {width} bits")]
    ImmediateOutOfRange { line: usize, value: i64, width: u32 },

    #[error("line {line}: undefined label \"{label}\"")]
    UndefinedLabel { line: usize, label: String },

    #[error("line {line}: label \"{label}\" is already defined on line {first_defined_on}")]
    DuplicateLabel {
        line: usize,
        label: String,
        first_defined_on: usize,
    },
}
