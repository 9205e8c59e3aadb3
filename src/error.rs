use spirv::Op;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a module build.
///
/// A build is all-or-nothing: once any of these is returned the partially
/// assembled module is dropped.
#[derive(Debug, Error)]
pub enum Error {
    /// The instruction needs more words than the 16-bit length field can hold.
    #[error("{opcode:?} needs {word_count} words, which does not fit the 16-bit length field")]
    EncodingSizeExceeded { opcode: Op, word_count: usize },

    /// A struct was referenced by name before it was registered.
    #[error("struct `{name}` used before its declaration")]
    UseBeforeDeclaration { name: String },

    /// A function-scoped instruction was emitted outside of any function.
    #[error("no function is being assembled")]
    NoOpenFunction,

    /// The module was finished while functions were still being assembled.
    #[error("{depth} function(s) still open when finishing the module")]
    UnterminatedFunction { depth: usize },

    /// A word stream ended in the middle of an instruction.
    #[error("truncated instruction at word {offset}")]
    Truncated { offset: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
