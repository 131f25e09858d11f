/// Errors raised while lowering IR to machine code.
///
/// Every variant is fatal: an image with a dangling jump or an unchecked
/// array access is never produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("compile error: undefined label '{0}'")]
    UndefinedLabel(String),

    #[error("compile error: label '{0}' defined more than once")]
    DuplicateLabel(String),

    #[error("compile error: array '{0}' used before its declaration")]
    UndeclaredArray(String),

    #[error("compile error: array '{0}' declared more than once")]
    DuplicateArray(String),

    #[error("compile error: index {index} out of bounds for array '{array}' of length {len}")]
    IndexOutOfBounds { array: String, index: u16, len: u16 },

    #[error("compile error: program does not fit in code memory (needs {needed} bytes, {available} available)")]
    CodeOverflow { needed: usize, available: usize },

    #[error("compile error: data memory exhausted while allocating '{0}'")]
    DataOverflow(String),
}
