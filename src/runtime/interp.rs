use std::collections::HashMap;

use crate::lang::{Instr, Operand};
use crate::runtime::console::{Console, clamp_input};
use crate::runtime::cpu::Step;
use crate::runtime::runtime_error::RuntimeError;

#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    /// Abort with `RuntimeError::StepLimit` after this many IR instructions.
    pub max_steps: Option<usize>,
}

/// Executes IR directly, without compiling it.
///
/// Values are bytes with wrapping arithmetic, like the CPU. Unlike the CPU,
/// reading a variable that was never written is an error, and array indices
/// are always checked.
pub struct Interpreter {
    vars: HashMap<String, u8>,
    arrays: HashMap<String, Vec<u8>>,
    config: InterpreterConfig,
    steps: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        Self {
            vars: HashMap::new(),
            arrays: HashMap::new(),
            config,
            steps: 0,
        }
    }

    pub fn var(&self, name: &str) -> Option<u8> {
        self.vars.get(name).copied()
    }

    pub fn array(&self, name: &str) -> Option<&[u8]> {
        self.arrays.get(name).map(Vec::as_slice)
    }

    /// User variables in name order, temporaries excluded.
    pub fn user_vars(&self) -> Vec<(&str, u8)> {
        let mut vars: Vec<(&str, u8)> = self
            .vars
            .iter()
            .filter(|(name, _)| !name.starts_with(crate::lang::TEMP_PREFIX))
            .map(|(name, value)| (name.as_str(), *value))
            .collect();
        vars.sort();
        vars
    }

    /// Forgets all variables and arrays.
    pub fn reset(&mut self) {
        self.vars.clear();
        self.arrays.clear();
        self.steps = 0;
    }

    /// Runs a whole program from a clean state. Labels are resolved up
    /// front, so a jump to an undefined label fails before anything executes.
    pub fn execute(&mut self, ir: &[Instr], console: &mut dyn Console) -> Result<(), RuntimeError> {
        self.reset();
        let labels = scan_labels(ir)?;

        let mut pc = 0;
        while let Some(instr) = ir.get(pc) {
            self.check_limits()?;
            pc += 1;

            match instr {
                Instr::Label { .. } => {}
                Instr::Goto { target } => pc = labels[target.as_str()],
                Instr::IfLeq { lhs, rhs, target } => {
                    if self.value(lhs)? <= self.value(rhs)? {
                        pc = labels[target.as_str()];
                    }
                }
                _ => {
                    if self.exec_simple(instr, console)? == Step::Halted {
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }

    /// Runs one straight-line statement, keeping state between calls.
    /// Jumps and labels have nowhere to go here and are rejected.
    pub fn execute_statement(
        &mut self,
        instr: &Instr,
        console: &mut dyn Console,
    ) -> Result<Step, RuntimeError> {
        let op = instr.op();
        if op.is_control_flow() {
            return Err(RuntimeError::ControlFlowUnsupported(op.name()));
        }
        self.exec_simple(instr, console)
    }

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeError::StepLimit(max));
            }
        }

        Ok(())
    }

    fn value(&self, operand: &Operand) -> Result<u8, RuntimeError> {
        match operand {
            Operand::Literal(v) => Ok(*v),
            Operand::Variable(name) => self
                .vars
                .get(name)
                .copied()
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),
        }
    }

    fn set(&mut self, name: &str, value: u8) {
        self.vars.insert(name.to_string(), value);
    }

    /// Checks `array[index]` and returns the slot position.
    fn element(&self, array: &str, index: &Operand) -> Result<usize, RuntimeError> {
        let slots = self
            .arrays
            .get(array)
            .ok_or_else(|| RuntimeError::UndeclaredArray(array.to_string()))?;
        let i = self.value(index)?;
        if i as usize >= slots.len() {
            return Err(RuntimeError::IndexOutOfBounds {
                array: array.to_string(),
                index: i,
                len: slots.len() as u16,
            });
        }
        Ok(i as usize)
    }

    fn exec_simple(&mut self, instr: &Instr, console: &mut dyn Console) -> Result<Step, RuntimeError> {
        match instr {
            Instr::LoadConst { value, dst } | Instr::StoreConst { value, dst } => {
                self.set(dst, *value);
            }
            Instr::LoadVar { src, dst } => {
                let value = self.value(&Operand::var(src.as_str()))?;
                self.set(dst, value);
            }
            Instr::Store { src, dst } => {
                let value = self.value(src)?;
                self.set(dst, value);
            }
            Instr::Add { lhs, rhs, dst } => {
                let value = self.value(lhs)?.wrapping_add(self.value(rhs)?);
                self.set(dst, value);
            }
            Instr::Sub { lhs, rhs, dst } => {
                let value = self.value(lhs)?.wrapping_sub(self.value(rhs)?);
                self.set(dst, value);
            }
            Instr::Out { src } => console.write_output(self.value(src)?),
            Instr::In { dst } => {
                let raw = console.read_input(&format!("Input for {}: ", dst))?;
                self.set(dst, clamp_input(raw));
            }
            Instr::Halt => return Ok(Step::Halted),
            Instr::ArrayDecl { name, len } => {
                if self.arrays.contains_key(name) {
                    return Err(RuntimeError::DuplicateArray(name.clone()));
                }
                self.arrays.insert(name.clone(), vec![0; *len as usize]);
            }
            Instr::LoadIndexed { array, index, dst } => {
                let i = self.element(array, index)?;
                let value = self.arrays[array.as_str()][i];
                self.set(dst, value);
            }
            Instr::StoreIndexed { array, index, src } => {
                let value = self.value(src)?;
                let i = self.element(array, index)?;
                if let Some(slots) = self.arrays.get_mut(array) {
                    slots[i] = value;
                }
            }
            Instr::Label { .. } | Instr::Goto { .. } | Instr::IfLeq { .. } => {
                return Err(RuntimeError::ControlFlowUnsupported(instr.op().name()));
            }
        }

        Ok(Step::Continue)
    }
}

/// Maps label names to IR positions and checks every jump target.
fn scan_labels(ir: &[Instr]) -> Result<HashMap<&str, usize>, RuntimeError> {
    let mut labels = HashMap::new();

    for (i, instr) in ir.iter().enumerate() {
        if let Instr::Label { name } = instr {
            if labels.insert(name.as_str(), i).is_some() {
                return Err(RuntimeError::DuplicateLabel(name.clone()));
            }
        }
    }

    for instr in ir {
        if let Instr::Goto { target } | Instr::IfLeq { target, .. } = instr {
            if !labels.contains_key(target.as_str()) {
                return Err(RuntimeError::UndefinedLabel(target.clone()));
            }
        }
    }

    Ok(labels)
}
