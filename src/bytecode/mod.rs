pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod image;
pub mod layout;
pub mod op;

pub use compile::{Codegen, compile};
pub use compile_error::CompileError;
pub use image::{ArraySlot, Image, ImageError};
pub use layout::Layout;
pub use op::Opcode;
