/// A parsing error with source location.
///
/// `line` and `col` are 1-based positions coming from the lexer spans.
/// Errors at end of input point at the `Eof` token, which sits right after
/// the last significant character.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{line}:{col}: {message}")]
pub struct ParserError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}
