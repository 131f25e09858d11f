use crate::bytecode::image::Image;
use crate::bytecode::layout::{INPUT_PORT, OUTPUT_PORT};
use crate::bytecode::op::{
    NUM_REGISTERS, Opcode, REG_BASE_HI, REG_BASE_LO, REG_BORROW, REG_DATA, REG_INDEX,
};
use crate::runtime::console::{Console, clamp_input};
use crate::runtime::runtime_error::VmFault;

const MEMORY_SIZE: usize = 0x1_0000;

#[derive(Debug, Clone, Default)]
pub struct CpuConfig {
    /// Abort with `VmFault::StepLimit` after this many instructions.
    pub max_steps: Option<usize>,
}

/// Result of one successful fetch-decode-execute cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Halted,
}

/// 8-bit CPU with eight registers and a flat 64KB address space.
///
/// Writes to `OUTPUT_PORT` go to the console; `IN` mirrors its value at
/// `INPUT_PORT`. Every fault halts the CPU.
pub struct Cpu {
    regs: [u8; NUM_REGISTERS],
    pc: u16,
    /// Set once the PC has moved past 0xFFFF. The next fetch faults unless a
    /// jump lands first.
    wrapped: bool,
    memory: Vec<u8>,
    halted: bool,
    config: CpuConfig,
    steps: usize,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self::with_config(CpuConfig::default())
    }

    pub fn with_config(config: CpuConfig) -> Self {
        Self {
            regs: [0; NUM_REGISTERS],
            pc: 0,
            wrapped: false,
            memory: vec![0; MEMORY_SIZE],
            halted: false,
            config,
            steps: 0,
        }
    }

    /// Clears the machine, copies the image's code to its origin and points
    /// the PC at it.
    pub fn load(&mut self, image: &Image) -> Result<(), VmFault> {
        let start = image.origin as usize;
        if image.end() > MEMORY_SIZE {
            return Err(VmFault::ImageTooLarge {
                origin: image.origin,
                len: image.code.len(),
            });
        }

        self.memory.fill(0);
        self.memory[start..image.end()].copy_from_slice(&image.code);
        self.regs = [0; NUM_REGISTERS];
        self.pc = image.origin;
        self.wrapped = false;
        self.halted = false;
        self.steps = 0;
        Ok(())
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn regs(&self) -> &[u8; NUM_REGISTERS] {
        &self.regs
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Instructions executed since the last `load`.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Runs until `HALT` or a fault.
    pub fn run(&mut self, console: &mut dyn Console) -> Result<(), VmFault> {
        while self.step(console)? == Step::Continue {}
        Ok(())
    }

    /// Executes a single instruction.
    pub fn step(&mut self, console: &mut dyn Console) -> Result<Step, VmFault> {
        if self.halted {
            return Ok(Step::Halted);
        }

        let result = self.execute(console);
        if result.is_err() {
            self.halted = true;
        }
        result
    }

    // Execution

    fn check_limits(&mut self) -> Result<(), VmFault> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(VmFault::StepLimit(max));
            }
        }

        Ok(())
    }

    fn execute(&mut self, console: &mut dyn Console) -> Result<Step, VmFault> {
        self.check_limits()?;

        let at = self.pc;
        let op = match Opcode::try_from(self.fetch()?) {
            Ok(op) => op,
            Err(opcode) => return Err(VmFault::UnknownOpcode { pc: at, opcode }),
        };
        log::trace!("{:#06x} {} regs={:?}", at, op, self.regs);

        match op {
            Opcode::Halt => {
                self.halted = true;
                return Ok(Step::Halted);
            }

            Opcode::Load => {
                let rd = self.fetch_reg(at)?;
                let addr = self.fetch_addr()?;
                self.regs[rd] = self.read(addr);
            }

            Opcode::LoadImm => {
                let rd = self.fetch_reg(at)?;
                self.regs[rd] = self.fetch()?;
            }

            Opcode::Store => {
                let addr = self.fetch_addr()?;
                let rs = self.fetch_reg(at)?;
                self.write(addr, self.regs[rs], console);
            }

            Opcode::StoreImm => {
                let addr = self.fetch_addr()?;
                let value = self.fetch()?;
                self.write(addr, value, console);
            }

            Opcode::Add => {
                let rd = self.fetch_reg(at)?;
                let rs = self.fetch_reg(at)?;
                self.regs[rd] = self.regs[rd].wrapping_add(self.regs[rs]);
            }

            Opcode::Sub => {
                let rd = self.fetch_reg(at)?;
                let rs = self.fetch_reg(at)?;
                let (a, b) = (self.regs[rd], self.regs[rs]);
                self.regs[rd] = a.wrapping_sub(b);
                self.regs[REG_BORROW as usize] = (a < b) as u8;
            }

            Opcode::Jnz | Opcode::Jz => {
                let r = self.fetch_reg(at)?;
                let addr = self.fetch_addr()?;
                let zero = self.regs[r] == 0;
                if zero == (op == Opcode::Jz) {
                    self.pc = addr;
                    self.wrapped = false;
                }
            }

            Opcode::In => {
                let rd = self.fetch_reg(at)?;
                let raw = console.read_input(&format!("Input for R{}: ", rd))?;
                let value = clamp_input(raw);
                self.regs[rd] = value;
                self.memory[INPUT_PORT as usize] = value;
            }

            Opcode::LoadIndexed => {
                let addr = self.indexed_addr();
                self.regs[REG_DATA as usize] = self.read(addr);
            }

            Opcode::StoreIndexed => {
                let addr = self.indexed_addr();
                self.write(addr, self.regs[REG_DATA as usize], console);
            }

            Opcode::Trap => return Err(VmFault::BoundsTrap { pc: at }),
        }

        Ok(Step::Continue)
    }

    fn fetch(&mut self) -> Result<u8, VmFault> {
        if self.wrapped {
            return Err(VmFault::PcOverflow);
        }
        let byte = self.read(self.pc);
        (self.pc, self.wrapped) = self.pc.overflowing_add(1);
        Ok(byte)
    }

    fn fetch_addr(&mut self) -> Result<u16, VmFault> {
        let hi = self.fetch()?;
        let lo = self.fetch()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn fetch_reg(&mut self, at: u16) -> Result<usize, VmFault> {
        let reg = self.fetch()?;
        if reg as usize >= NUM_REGISTERS {
            return Err(VmFault::InvalidRegister { pc: at, reg });
        }
        Ok(reg as usize)
    }

    /// `(R0 << 8 | R1) + R2`, wrapping at 64KB.
    fn indexed_addr(&self) -> u16 {
        let base = u16::from_be_bytes([
            self.regs[REG_BASE_HI as usize],
            self.regs[REG_BASE_LO as usize],
        ]);
        base.wrapping_add(self.regs[REG_INDEX as usize] as u16)
    }

    fn write(&mut self, addr: u16, value: u8, console: &mut dyn Console) {
        self.memory[addr as usize] = value;
        if addr == OUTPUT_PORT {
            console.write_output(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::console::{InputError, ScriptedConsole};

    const ORIGIN: u16 = 0x2000;

    fn cpu_with(code: &[u8]) -> Cpu {
        let mut cpu = Cpu::with_config(CpuConfig {
            max_steps: Some(10_000),
        });
        cpu.load(&Image::raw(ORIGIN, code.to_vec())).unwrap();
        cpu
    }

    fn run_with_inputs(code: &[u8], inputs: &[i64]) -> (Cpu, ScriptedConsole, Result<(), VmFault>) {
        let mut cpu = cpu_with(code);
        let mut console = ScriptedConsole::with_inputs(inputs.iter().copied());
        let result = cpu.run(&mut console);
        (cpu, console, result)
    }

    fn run(code: &[u8]) -> (Cpu, Vec<u8>) {
        let (cpu, console, result) = run_with_inputs(code, &[]);
        result.unwrap();
        (cpu, console.outputs)
    }

    fn run_fault(code: &[u8]) -> VmFault {
        let (cpu, _, result) = run_with_inputs(code, &[]);
        assert!(cpu.is_halted());
        result.unwrap_err()
    }

    // =========================================================================
    // Basics
    // =========================================================================

    #[test]
    fn test_halt() {
        let mut cpu = cpu_with(&[0x00]);
        let mut console = ScriptedConsole::new();
        assert_eq!(cpu.step(&mut console), Ok(Step::Halted));
        assert!(cpu.is_halted());
        // a halted CPU stays halted
        assert_eq!(cpu.step(&mut console), Ok(Step::Halted));
        assert_eq!(cpu.steps(), 1);
    }

    #[test]
    fn test_step_continue() {
        let mut cpu = cpu_with(&[0x02, 0x05, 0x2A, 0x00]);
        let mut console = ScriptedConsole::new();
        assert_eq!(cpu.step(&mut console), Ok(Step::Continue));
        assert_eq!(cpu.regs()[5], 42);
        assert_eq!(cpu.pc(), ORIGIN + 3);
    }

    #[test]
    fn test_load_and_store() {
        #[rustfmt::skip]
        let (cpu, _) = run(&[
            0x04, 0x80, 0x00, 0x07, // STORE_IMM [0x8000], 7
            0x01, 0x01, 0x80, 0x00, // LOAD R1, [0x8000]
            0x03, 0x80, 0x01, 0x01, // STORE [0x8001], R1
            0x00,
        ]);
        assert_eq!(cpu.regs()[1], 7);
        assert_eq!(cpu.read(0x8001), 7);
    }

    #[test]
    fn test_every_store_form_reaches_output() {
        #[rustfmt::skip]
        let (_, out) = run(&[
            0x04, 0xFF, 0x00, 0x01, // STORE_IMM [0xFF00], 1
            0x02, 0x00, 0x02,       // LOAD_IMM R0, 2
            0x03, 0xFF, 0x00, 0x00, // STORE [0xFF00], R0
            0x02, 0x00, 0xFF,       // R0:R1 := 0xFF00, R2 := 0
            0x02, 0x01, 0x00,
            0x02, 0x02, 0x00,
            0x02, 0x04, 0x03,       // LOAD_IMM R4, 3
            0x0B,                   // STORE_INDEXED
            0x00,
        ]);
        assert_eq!(out, vec![1, 2, 3]);
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    #[test]
    fn test_add_wraps() {
        #[rustfmt::skip]
        let (cpu, _) = run(&[
            0x02, 0x00, 200,
            0x02, 0x01, 100,
            0x05, 0x00, 0x01,
            0x00,
        ]);
        assert_eq!(cpu.regs()[0], 44);
    }

    #[test]
    fn test_sub_sets_borrow() {
        #[rustfmt::skip]
        let (cpu, _) = run(&[
            0x02, 0x00, 3,
            0x02, 0x01, 5,
            0x06, 0x00, 0x01, // R0 := 3 - 5
            0x00,
        ]);
        assert_eq!(cpu.regs()[0], 254);
        assert_eq!(cpu.regs()[2], 1);

        #[rustfmt::skip]
        let (cpu, _) = run(&[
            0x02, 0x02, 9,    // stale flag
            0x02, 0x00, 5,
            0x02, 0x01, 5,
            0x06, 0x00, 0x01, // R0 := 5 - 5
            0x00,
        ]);
        assert_eq!(cpu.regs()[0], 0);
        assert_eq!(cpu.regs()[2], 0);
    }

    // =========================================================================
    // Jumps
    // =========================================================================

    #[test]
    fn test_jnz_taken_and_not_taken() {
        #[rustfmt::skip]
        let (_, out) = run(&[
            0x02, 0x03, 0x01,       // 2000: R3 := 1
            0x07, 0x00, 0x20, 0x0F, // 2003: JNZ R0 (zero, falls through)
            0x07, 0x03, 0x20, 0x0F, // 2007: JNZ R3 -> 200F
            0x04, 0xFF, 0x00, 0x63, // 200B: out 99 (skipped)
            0x04, 0xFF, 0x00, 0x01, // 200F: out 1
            0x00,
        ]);
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn test_jz_taken_and_not_taken() {
        #[rustfmt::skip]
        let (_, out) = run(&[
            0x02, 0x03, 0x01,       // 2000: R3 := 1
            0x08, 0x03, 0x20, 0x0F, // 2003: JZ R3 (non-zero, falls through)
            0x08, 0x00, 0x20, 0x0F, // 2007: JZ R0 -> 200F
            0x04, 0xFF, 0x00, 0x63, // 200B: out 99 (skipped)
            0x04, 0xFF, 0x00, 0x02, // 200F: out 2
            0x00,
        ]);
        assert_eq!(out, vec![2]);
    }

    // =========================================================================
    // I/O and indexed addressing
    // =========================================================================

    #[test]
    fn test_in_clamps_and_mirrors() {
        let code = [0x09, 0x05, 0x09, 0x06, 0x00];
        let (cpu, _, result) = run_with_inputs(&code, &[300, 17]);
        result.unwrap();
        assert_eq!(cpu.regs()[5], 255);
        assert_eq!(cpu.regs()[6], 17);
        assert_eq!(cpu.read(INPUT_PORT), 17);

        let (cpu, _, _) = run_with_inputs(&code, &[-4, 0]);
        assert_eq!(cpu.regs()[5], 0);
    }

    #[test]
    fn test_in_without_input_faults() {
        let (_, _, result) = run_with_inputs(&[0x09, 0x00, 0x00], &[]);
        assert_eq!(result, Err(VmFault::Input(InputError::Closed)));
    }

    #[test]
    fn test_indexed_load_and_store() {
        #[rustfmt::skip]
        let (cpu, _) = run(&[
            0x04, 0x80, 0x12, 0x2A, // mem[0x8012] := 42
            0x02, 0x00, 0x80,       // R0 := 0x80
            0x02, 0x01, 0x10,       // R1 := 0x10
            0x02, 0x02, 0x02,       // R2 := 2
            0x0A,                   // R4 := mem[0x8012]
            0x02, 0x02, 0x03,       // R2 := 3
            0x0B,                   // mem[0x8013] := R4
            0x00,
        ]);
        assert_eq!(cpu.regs()[4], 42);
        assert_eq!(cpu.read(0x8013), 42);
    }

    #[test]
    fn test_indexed_address_wraps() {
        #[rustfmt::skip]
        let (cpu, _) = run(&[
            0x02, 0x00, 0xFF,
            0x02, 0x01, 0xFF,
            0x02, 0x02, 0x02,       // 0xFFFF + 2 = 0x0001
            0x02, 0x04, 0x07,
            0x0B,
            0x00,
        ]);
        assert_eq!(cpu.read(0x0001), 7);
    }

    // =========================================================================
    // Faults
    // =========================================================================

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(
            run_fault(&[0x02, 0x00, 0x01, 0xEE]),
            VmFault::UnknownOpcode {
                pc: 0x2003,
                opcode: 0xEE
            }
        );
    }

    #[test]
    fn test_invalid_register() {
        assert_eq!(
            run_fault(&[0x02, 0x08, 0x01]),
            VmFault::InvalidRegister { pc: 0x2000, reg: 8 }
        );
    }

    #[test]
    fn test_trap() {
        assert_eq!(
            run_fault(&[0x02, 0x00, 0x01, 0x0C]),
            VmFault::BoundsTrap { pc: 0x2003 }
        );
    }

    #[test]
    fn test_step_limit() {
        // 2003: JNZ R3, 0x2003 spins forever
        let fault = run_fault(&[0x02, 0x03, 0x01, 0x07, 0x03, 0x20, 0x03]);
        assert_eq!(fault, VmFault::StepLimit(10_000));
    }

    #[test]
    fn test_halt_in_last_byte() {
        let mut cpu = Cpu::new();
        cpu.load(&Image::raw(0xFFFF, vec![0x00])).unwrap();
        let mut console = ScriptedConsole::new();
        assert_eq!(cpu.run(&mut console), Ok(()));
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_pc_overflow() {
        // LOAD_IMM R0, 7 fills 0xFFFD..=0xFFFF; the next fetch has nowhere to go
        let mut cpu = Cpu::new();
        cpu.load(&Image::raw(0xFFFD, vec![0x02, 0x00, 0x07])).unwrap();
        let mut console = ScriptedConsole::new();
        assert_eq!(cpu.run(&mut console), Err(VmFault::PcOverflow));
        assert_eq!(cpu.regs()[0], 7);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_jump_in_last_bytes_recovers() {
        // LOAD_IMM R3, 1; JNZ R3, 0x2000 in the top bytes. Cleared memory at
        // 0x2000 reads as HALT.
        let mut cpu = Cpu::new();
        cpu.load(&Image::raw(0xFFF9, vec![0x02, 0x03, 0x01, 0x07, 0x03, 0x20, 0x00]))
            .unwrap();
        let mut console = ScriptedConsole::new();
        assert_eq!(cpu.run(&mut console), Ok(()));
        assert_eq!(cpu.pc(), 0x2001);
    }

    #[test]
    fn test_image_too_large() {
        let mut cpu = Cpu::new();
        let err = cpu.load(&Image::raw(0xFFFF, vec![0x00, 0x00])).unwrap_err();
        assert_eq!(
            err,
            VmFault::ImageTooLarge {
                origin: 0xFFFF,
                len: 2
            }
        );
    }

    #[test]
    fn test_load_resets_state() {
        let mut cpu = cpu_with(&[0x02, 0x00, 0x09, 0x04, 0x90, 0x00, 0x01, 0x00]);
        let mut console = ScriptedConsole::new();
        cpu.run(&mut console).unwrap();
        assert_eq!(cpu.read(0x9000), 1);

        cpu.load(&Image::raw(ORIGIN, vec![0x00])).unwrap();
        assert!(!cpu.is_halted());
        assert_eq!(cpu.regs()[0], 0);
        assert_eq!(cpu.read(0x9000), 0);
        assert_eq!(cpu.steps(), 0);
        assert_eq!(cpu.pc(), ORIGIN);
    }
}
