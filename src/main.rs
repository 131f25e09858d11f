use std::{env, fs};

use anyhow::{Context, Result, bail};

use minimal_cpu::bytecode::disasm::{parse_hex, print_image, print_ir, to_hex};
use minimal_cpu::bytecode::{Codegen, Image, Layout};
use minimal_cpu::frontend::TokenDumper;
use minimal_cpu::lexer::Lexer;
use minimal_cpu::repl::Repl;
use minimal_cpu::runtime::{
    BytecodeBackend, CpuConfig, Interpreter, InterpreterConfig, StdConsole,
};

/// Flags that consume the following argument.
const VALUE_FLAGS: [&str; 5] = ["--emit", "--image", "--raw", "--max-steps", "--origin"];

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let flag = |name: &str| args.iter().any(|a| a == name);

    if flag("--help") || flag("-h") {
        print_usage();
        return Ok(());
    }
    if flag("--repl") || flag("-i") {
        Repl::new().run();
        return Ok(());
    }

    let max_steps = option_value(&args, "--max-steps")
        .map(|v| v.parse::<usize>().with_context(|| format!("invalid --max-steps '{}'", v)))
        .transpose()?;
    let origin = option_value(&args, "--origin")
        .map(|v| parse_u16(v).with_context(|| format!("invalid --origin '{}'", v)))
        .transpose()?;

    if let Some(path) = option_value(&args, "--image") {
        let bytes = fs::read(path).with_context(|| format!("cannot read '{}'", path))?;
        let image = Image::from_bytes(&bytes).with_context(|| format!("in '{}'", path))?;
        return run_image(image, &args, max_steps);
    }

    if let Some(path) = option_value(&args, "--raw") {
        let text = fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path))?;
        let code = parse_hex(&text).with_context(|| format!("in '{}'", path))?;
        return run_image(Image::raw(0, code), &args, max_steps);
    }

    let Some(filename) = positional(&args) else {
        print_usage();
        if args.len() > 1 {
            bail!("no input file");
        }
        return Ok(());
    };

    let source =
        fs::read_to_string(filename).with_context(|| format!("cannot read '{}'", filename))?;

    if flag("--tokens") {
        return dump_tokens(&source, flag("--no-color"), flag("--pretty"));
    }

    let ir = minimal_cpu::parse_source(&source).with_context(|| format!("in '{}'", filename))?;

    if flag("--print-ir") {
        print_ir(&ir);
        return Ok(());
    }

    if flag("--ir") {
        let mut interp = Interpreter::with_config(InterpreterConfig { max_steps });
        interp.execute(&ir, &mut StdConsole)?;
        return Ok(());
    }

    let layout = origin.map(|origin| Layout { origin }).unwrap_or_default();
    let image = Codegen::new(layout).compile(&ir)?;

    // Inspection flags stop before running, like --tokens and --print-ir.
    let mut inspected = false;
    if flag("--asm") {
        print_image(&image);
        inspected = true;
    }
    if flag("--hex") {
        println!("{}", to_hex(&image.code));
        inspected = true;
    }
    if let Some(out) = option_value(&args, "--emit") {
        fs::write(out, image.to_bytes()?).with_context(|| format!("cannot write '{}'", out))?;
        println!("wrote {} bytes of code to {}", image.code.len(), out);
        inspected = true;
    }
    if inspected {
        return Ok(());
    }

    run_image(image, &args, max_steps)
}

fn run_image(image: Image, args: &[String], max_steps: Option<usize>) -> Result<()> {
    if args.iter().any(|a| a == "--asm") {
        print_image(&image);
        return Ok(());
    }

    let mut backend = BytecodeBackend::new(Layout::default(), CpuConfig { max_steps });
    backend.run_image(image, &mut StdConsole)?;
    Ok(())
}

fn dump_tokens(source: &str, no_color: bool, pretty: bool) -> Result<()> {
    let tokens = Lexer::new(source).tokenize()?;

    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    if pretty {
        dumper = dumper.pretty();
    }

    dumper.dump(&tokens);
    Ok(())
}

fn option_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let pos = args.iter().position(|a| a == name)?;
    args.get(pos + 1).map(String::as_str)
}

/// First argument that is neither a flag nor a flag's value.
fn positional(args: &[String]) -> Option<&str> {
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if !arg.starts_with('-') {
            return Some(arg);
        }
    }
    None
}

fn parse_u16(text: &str) -> Result<u16> {
    let value = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16)?,
        None => text.parse::<u16>()?,
    };
    Ok(value)
}

fn print_usage() {
    println!("minimal-cpu - DSL compiler and 8-bit CPU emulator");
    println!();
    println!("Usage:");
    println!("  minimal-cpu <file.dsl>              Compile and run on the CPU");
    println!("  minimal-cpu --ir <file.dsl>         Run on the IR interpreter");
    println!("  minimal-cpu --tokens <file.dsl>     Show tokens (--no-color, --pretty)");
    println!("  minimal-cpu --print-ir <file.dsl>   Show the IR");
    println!("  minimal-cpu --asm <file.dsl>        Show the machine code listing");
    println!("  minimal-cpu --hex <file.dsl>        Show the machine code as hex");
    println!("  minimal-cpu <file.dsl> --emit <out> Write a compiled image");
    println!("  minimal-cpu --image <file>          Run a compiled image (--asm to list it)");
    println!("  minimal-cpu --raw <file.hex>        Run hex machine code loaded at 0x0000");
    println!("  minimal-cpu --repl, -i              Start interactive REPL");
    println!("  minimal-cpu --help, -h              Show this help");
    println!();
    println!("Options:");
    println!("  --max-steps <n>   Stop after n executed instructions");
    println!("  --origin <addr>   Code load address (default 0x2000)");
}
