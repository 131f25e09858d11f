//! # Intermediate representation
//!
//! The parser lowers source statements into a flat list of [`Instr`]
//! quadruples. The list is consumed by two independent backends: the
//! bytecode compiler (`bytecode::compile`) and the IR interpreter
//! (`runtime::interp`).
//!
//! ## Conventions
//!
//! - Sub-expression results live in temporaries named `__temp__N`.
//! - Labels are plain names; they are resolved by whichever backend consumes
//!   the IR.

pub mod instr;
pub mod operand;

pub use instr::{Instr, IrOp, TEMP_PREFIX};
pub use operand::Operand;
