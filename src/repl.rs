//! Line-oriented REPL over the IR interpreter.
//!
//! Each input line is parsed and its statements run immediately against a
//! persistent interpreter. Jumps and labels only make sense in a whole
//! program, so they are refused here; use `.load` and `.run` instead.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::bytecode::disasm::print_ir;
use crate::lang::Instr;
use crate::runtime::{
    BytecodeBackend, Console, Executor, Interpreter, RuntimeError, StdConsole, Step,
};

const HELP: &str = "\
Available commands:
  .help          show this help
  .exit          leave the REPL
  .vars          list variables
  .reset         forget all variables and arrays
  .load <file>   load a program
  .ir            print the loaded program's IR
  .run           run the loaded program on the IR interpreter
  .cpu           compile the loaded program and run it on the CPU
  .clear         clear the screen";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Continue,
    Exit,
}

pub struct Repl {
    interp: Interpreter,
    loaded: Option<Vec<Instr>>,
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

impl Repl {
    pub fn new() -> Self {
        Self {
            interp: Interpreter::new(),
            loaded: None,
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    /// Interactive loop on stdin/stdout.
    pub fn run(&mut self) {
        let mut console = StdConsole;
        let mut out = io::stdout();
        let stdin = io::stdin();
        let mut input = String::new();

        println!("minimal-cpu REPL. Type .help for commands, .exit to quit.");
        loop {
            input.clear();
            print!(">>> ");
            if let Err(e) = out.flush() {
                eprintln!("Failed flush: {e}");
            }
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    println!();
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Failed read line: {e}");
                    continue;
                }
            }

            match self.eval_line(input.trim(), &mut console, &mut out) {
                Ok(Reply::Exit) => break,
                Ok(Reply::Continue) => {}
                Err(e) => eprintln!("{e:#}"),
            }
        }
    }

    /// Evaluates one line: a dot-command or DSL statements.
    pub fn eval_line(
        &mut self,
        line: &str,
        console: &mut dyn Console,
        out: &mut dyn Write,
    ) -> Result<Reply> {
        if line.is_empty() {
            return Ok(Reply::Continue);
        }
        if line.starts_with('.') {
            return self.command(line, console, out);
        }

        let ir = crate::parse_source(line)?;
        if let Some(instr) = ir.iter().find(|i| i.op().is_control_flow()) {
            return Err(RuntimeError::ControlFlowUnsupported(instr.op().name()).into());
        }

        for instr in &ir {
            if self.interp.execute_statement(instr, console)? == Step::Halted {
                writeln!(out, "halted")?;
                break;
            }
        }
        Ok(Reply::Continue)
    }

    fn command(
        &mut self,
        line: &str,
        console: &mut dyn Console,
        out: &mut dyn Write,
    ) -> Result<Reply> {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or_default();

        match cmd {
            ".exit" => return Ok(Reply::Exit),
            ".help" => writeln!(out, "{}", HELP)?,
            ".clear" => write!(out, "\x1b[2J\x1b[H")?,
            ".vars" => {
                for (name, value) in self.interp.user_vars() {
                    writeln!(out, "{} = {}", name, value)?;
                }
            }
            ".reset" => self.interp.reset(),
            ".load" => {
                let Some(path) = parts.next() else {
                    bail!("usage: .load <file>");
                };
                let ir = load_program(Path::new(path))?;
                writeln!(out, "loaded {} instructions from {}", ir.len(), path)?;
                self.loaded = Some(ir);
            }
            ".ir" => print_ir(self.loaded()?),
            ".run" => {
                let ir = self.loaded()?;
                Interpreter::new().execute(ir, console)?;
            }
            ".cpu" => {
                let ir = self.loaded()?;
                BytecodeBackend::default().execute(ir, console)?;
            }
            _ => bail!("unknown command: {} (try .help)", cmd),
        }

        Ok(Reply::Continue)
    }

    fn loaded(&self) -> Result<&[Instr]> {
        match &self.loaded {
            Some(ir) => Ok(ir),
            None => bail!("no program loaded, use .load <file> first"),
        }
    }
}

fn load_program(path: &Path) -> Result<Vec<Instr>> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read '{}'", path.display()))?;
    crate::parse_source(&source).with_context(|| format!("in '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ScriptedConsole;

    fn eval(repl: &mut Repl, line: &str) -> (Result<Reply>, String, Vec<u8>) {
        let mut console = ScriptedConsole::with_inputs([42]);
        let mut out = Vec::new();
        let reply = repl.eval_line(line, &mut console, &mut out);
        (reply, String::from_utf8(out).unwrap(), console.outputs)
    }

    #[test]
    fn test_statements_share_state() {
        let mut repl = Repl::new();
        eval(&mut repl, "let x = 2;").0.unwrap();
        let (_, _, outputs) = eval(&mut repl, "x = x + 3; out x;");
        assert_eq!(outputs, vec![5]);
        assert_eq!(repl.interpreter().var("x"), Some(5));
    }

    #[test]
    fn test_input_statement() {
        let mut repl = Repl::new();
        eval(&mut repl, "in n;").0.unwrap();
        assert_eq!(repl.interpreter().var("n"), Some(42));
    }

    #[test]
    fn test_control_flow_is_refused() {
        let mut repl = Repl::new();
        let (reply, _, outputs) = eval(&mut repl, "out 1; goto top;");
        let err = reply.unwrap_err();
        assert!(err.to_string().contains("GOTO"));
        // nothing from the line ran
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_errors_do_not_end_the_session() {
        let mut repl = Repl::new();
        assert!(eval(&mut repl, "out nope;").0.is_err());
        assert!(eval(&mut repl, "let = ;").0.is_err());
        assert_eq!(eval(&mut repl, "out 3;").2, vec![3]);
    }

    #[test]
    fn test_halt_reports() {
        let mut repl = Repl::new();
        let (_, text, outputs) = eval(&mut repl, "out 1; halt; out 2;");
        assert_eq!(outputs, vec![1]);
        assert!(text.contains("halted"));
    }

    #[test]
    fn test_commands() {
        let mut repl = Repl::new();
        assert_eq!(eval(&mut repl, ".exit").0.unwrap(), Reply::Exit);
        assert!(eval(&mut repl, ".help").1.contains(".load <file>"));

        eval(&mut repl, "b = 1; a = 2;").0.unwrap();
        assert_eq!(eval(&mut repl, ".vars").1, "a = 2\nb = 1\n");

        eval(&mut repl, ".reset").0.unwrap();
        assert_eq!(eval(&mut repl, ".vars").1, "");
    }

    #[test]
    fn test_run_without_program() {
        let mut repl = Repl::new();
        let err = eval(&mut repl, ".run").0.unwrap_err();
        assert!(err.to_string().contains("no program loaded"));
        assert!(eval(&mut repl, ".bogus").0.is_err());
        assert!(eval(&mut repl, ".load").0.is_err());
    }

    #[test]
    fn test_load_and_run_on_both_backends() {
        let path = std::env::temp_dir().join(format!("minimal_cpu_repl_{}.dsl", std::process::id()));
        std::fs::write(&path, "let i = 0; top: out i; i = i + 1; if i <= 2 goto top; halt;")
            .unwrap();

        let mut repl = Repl::new();
        let (reply, text, _) = eval(&mut repl, &format!(".load {}", path.display()));
        reply.unwrap();
        assert!(text.starts_with("loaded"));

        assert_eq!(eval(&mut repl, ".run").2, vec![0, 1, 2]);
        assert_eq!(eval(&mut repl, ".cpu").2, vec![0, 1, 2]);

        std::fs::remove_file(&path).ok();
    }
}
