//! minimal-cpu - a tiny imperative DSL compiled for an 8-bit CPU
//!
//! Source text goes through the lexer and a precedence-climbing parser into a
//! flat IR. The IR either compiles to machine code for the bundled CPU
//! (8-bit registers, 16-bit addresses, memory-mapped I/O) or runs directly on
//! the IR interpreter.
//!
//! ```text
//! source -> Lexer -> tokens -> Parser -> IR -> Codegen -> Image -> Cpu
//!                                         \-> Interpreter
//! ```

pub mod bytecode;
pub mod error;
pub mod frontend;
pub mod lang;
pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod repl;
pub mod runtime;
pub mod token;

pub use bytecode::{Codegen, CompileError, Image, Layout};
pub use error::{ExecError, FrontendError};
pub use lang::{Instr, Operand};
pub use runtime::{BytecodeBackend, Console, Cpu, Executor, Interpreter};

use crate::lexer::{Lexer, Spanned};
use crate::parser::Parser;

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, FrontendError> {
    Ok(Lexer::new(source).tokenize()?)
}

/// Lexes and parses a whole program into IR.
pub fn parse_source(source: &str) -> Result<Vec<Instr>, FrontendError> {
    let tokens = tokenize(source)?;
    Ok(Parser::new(tokens).parse()?)
}

/// Source to image with the default layout.
pub fn compile_source(source: &str) -> Result<Image, ExecError> {
    let ir = parse_source(source)?;
    Ok(bytecode::compile(&ir)?)
}

/// Parses `source` and runs it on `executor`.
pub fn run_source(
    source: &str,
    executor: &mut dyn Executor,
    console: &mut dyn Console,
) -> Result<(), ExecError> {
    let ir = parse_source(source)?;
    executor.execute(&ir, console)
}
