use crate::bytecode::CompileError;
use crate::lexer::LexerError;
use crate::parser_error::ParserError;
use crate::runtime::runtime_error::{RuntimeError, VmFault};

/// Source text could not be turned into IR.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrontendError {
    #[error("lexer error: {0}")]
    Lex(#[from] LexerError),

    #[error("parse error: {0}")]
    Parse(#[from] ParserError),
}

/// Any failure between source text and a finished run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error(transparent)]
    Frontend(#[from] FrontendError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Fault(#[from] VmFault),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
