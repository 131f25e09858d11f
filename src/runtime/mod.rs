//! # Execution backends
//!
//! The same IR can run two ways:
//!
//! - [`BytecodeBackend`] compiles it to machine code and runs it on the
//!   [`Cpu`](cpu::Cpu).
//! - [`Interpreter`](interp::Interpreter) walks the IR directly.
//!
//! Both implement [`Executor`] and talk to the outside world only through a
//! [`Console`], so their outputs can be compared byte for byte.

pub mod console;
pub mod cpu;
pub mod interp;
pub mod runtime_error;

use crate::bytecode::{Codegen, Image, Layout};
use crate::error::ExecError;
use crate::lang::Instr;

pub use console::{Console, ScriptedConsole, StdConsole};
pub use cpu::{Cpu, CpuConfig, Step};
pub use interp::{Interpreter, InterpreterConfig};
pub use runtime_error::{RuntimeError, VmFault};

pub trait Executor {
    /// Runs a complete program until it halts or falls off the end.
    fn execute(&mut self, ir: &[Instr], console: &mut dyn Console) -> Result<(), ExecError>;
}

/// Compile-then-run backend. Keeps the last image and CPU for inspection.
pub struct BytecodeBackend {
    layout: Layout,
    cpu: Cpu,
    image: Option<Image>,
}

impl Default for BytecodeBackend {
    fn default() -> Self {
        Self::new(Layout::default(), CpuConfig::default())
    }
}

impl BytecodeBackend {
    pub fn new(layout: Layout, config: CpuConfig) -> Self {
        Self {
            layout,
            cpu: Cpu::with_config(config),
            image: None,
        }
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn image(&self) -> Option<&Image> {
        self.image.as_ref()
    }

    /// Value of a variable after the last run.
    pub fn var(&self, name: &str) -> Option<u8> {
        let addr = self.image.as_ref()?.symbols.get(name)?;
        Some(self.cpu.read(*addr))
    }

    /// Runs an already compiled image.
    pub fn run_image(&mut self, image: Image, console: &mut dyn Console) -> Result<(), ExecError> {
        self.cpu.load(&image)?;
        self.image = Some(image);
        self.cpu.run(console)?;
        Ok(())
    }
}

impl Executor for BytecodeBackend {
    fn execute(&mut self, ir: &[Instr], console: &mut dyn Console) -> Result<(), ExecError> {
        let image = Codegen::new(self.layout).compile(ir)?;
        self.run_image(image, console)
    }
}

impl Executor for Interpreter {
    fn execute(&mut self, ir: &[Instr], console: &mut dyn Console) -> Result<(), ExecError> {
        Interpreter::execute(self, ir, console)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Operand;

    fn program() -> Vec<Instr> {
        vec![
            Instr::LoadConst {
                value: 7,
                dst: "x".to_string(),
            },
            Instr::Out {
                src: Operand::var("x"),
            },
            Instr::Halt,
        ]
    }

    #[test]
    fn test_backends_through_trait_objects() {
        let mut backends: Vec<Box<dyn Executor>> =
            vec![Box::new(BytecodeBackend::default()), Box::new(Interpreter::new())];

        for backend in backends.iter_mut() {
            let mut console = ScriptedConsole::new();
            backend.execute(&program(), &mut console).unwrap();
            assert_eq!(console.outputs, vec![7]);
        }
    }

    #[test]
    fn test_repeated_runs_on_one_executor() {
        let ir = crate::parse_source("let a[2]; a[0] = 1; out a[0]; halt;").unwrap();
        let mut backends: Vec<Box<dyn Executor>> =
            vec![Box::new(BytecodeBackend::default()), Box::new(Interpreter::new())];

        for backend in backends.iter_mut() {
            for _ in 0..2 {
                let mut console = ScriptedConsole::new();
                backend.execute(&ir, &mut console).unwrap();
                assert_eq!(console.outputs, vec![1]);
            }
        }
    }

    #[test]
    fn test_bytecode_backend_keeps_state() {
        let mut backend = BytecodeBackend::default();
        let mut console = ScriptedConsole::new();
        backend.execute(&program(), &mut console).unwrap();

        assert!(backend.cpu().is_halted());
        assert_eq!(backend.var("x"), Some(7));
        assert_eq!(backend.var("nope"), None);
    }

    #[test]
    fn test_compile_error_is_reported() {
        let mut backend = BytecodeBackend::default();
        let mut console = ScriptedConsole::new();
        let err = backend
            .execute(
                &[Instr::Goto {
                    target: "x".to_string(),
                }],
                &mut console,
            )
            .unwrap_err();
        assert!(matches!(err, ExecError::Compile(_)));
        assert!(backend.image().is_none());
    }
}
