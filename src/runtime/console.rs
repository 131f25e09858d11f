use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Failure to obtain an input value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("input closed")]
    Closed,

    #[error("invalid input '{0}': expected an integer")]
    NotANumber(String),

    #[error("read error: {0}")]
    Io(String),
}

/// The machine's view of the outside world: the output and input registers.
///
/// Both executors talk to a `Console`, so tests can script input and capture
/// output without touching stdin/stdout.
pub trait Console {
    /// Called for every byte written to the output register.
    fn write_output(&mut self, value: u8);

    /// Reads one integer. Range clamping is the caller's job.
    fn read_input(&mut self, prompt: &str) -> Result<i64, InputError>;
}

/// Clamps a raw input value into a byte, warning when it had to.
pub fn clamp_input(raw: i64) -> u8 {
    if !(0..=255).contains(&raw) {
        log::warn!("input {} out of 8-bit range, clamping", raw);
    }
    raw.clamp(0, 255) as u8
}

// =============================================================================
// Terminal
// =============================================================================

/// Prints outputs as decimal lines and reads integers from stdin.
#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn write_output(&mut self, value: u8) {
        println!("{}", value);
    }

    fn read_input(&mut self, prompt: &str) -> Result<i64, InputError> {
        print!("{}", prompt);
        io::stdout().flush().ok();

        let line = io::stdin()
            .lock()
            .lines()
            .next()
            .transpose()
            .map_err(|e| InputError::Io(e.to_string()))?
            .ok_or(InputError::Closed)?;

        let text = line.trim();
        text.parse::<i64>()
            .map_err(|_| InputError::NotANumber(text.to_string()))
    }
}

// =============================================================================
// Scripted
// =============================================================================

/// Feeds queued inputs and records outputs.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    inputs: VecDeque<i64>,
    pub outputs: Vec<u8>,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inputs(inputs: impl IntoIterator<Item = i64>) -> Self {
        Self {
            inputs: inputs.into_iter().collect(),
            outputs: Vec::new(),
        }
    }
}

impl Console for ScriptedConsole {
    fn write_output(&mut self, value: u8) {
        self.outputs.push(value);
    }

    fn read_input(&mut self, _prompt: &str) -> Result<i64, InputError> {
        self.inputs.pop_front().ok_or(InputError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_input() {
        assert_eq!(clamp_input(42), 42);
        assert_eq!(clamp_input(-5), 0);
        assert_eq!(clamp_input(1000), 255);
    }

    #[test]
    fn test_scripted_console() {
        let mut console = ScriptedConsole::with_inputs([1, 2]);
        assert_eq!(console.read_input(""), Ok(1));
        assert_eq!(console.read_input(""), Ok(2));
        assert_eq!(console.read_input(""), Err(InputError::Closed));

        console.write_output(9);
        assert_eq!(console.outputs, vec![9]);
    }
}
