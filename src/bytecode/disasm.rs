use crate::bytecode::image::Image;
use crate::bytecode::layout::{INPUT_PORT, OUTPUT_PORT};
use crate::bytecode::op::Opcode;
use crate::lang::Instr;

/// One decoded machine instruction (or a stray data byte).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub addr: u16,
    pub bytes: Vec<u8>,
    /// `None` for bytes that do not decode to an instruction.
    pub opcode: Option<Opcode>,
}

impl Line {
    /// Jump destination of `JZ`/`JNZ`.
    pub fn jump_target(&self) -> Option<u16> {
        match self.opcode {
            Some(op) if op.is_jump() => Some(u16::from_be_bytes([self.bytes[2], self.bytes[3]])),
            _ => None,
        }
    }
}

/// Splits code into instructions. Unknown opcodes and a truncated tail come
/// out as single data bytes so the listing never stops early.
pub fn decode(origin: u16, code: &[u8]) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut pc = 0;

    while pc < code.len() {
        let addr = (origin as usize + pc) as u16;
        match Opcode::try_from(code[pc]) {
            Ok(op) if pc + op.width() <= code.len() => {
                lines.push(Line {
                    addr,
                    bytes: code[pc..pc + op.width()].to_vec(),
                    opcode: Some(op),
                });
                pc += op.width();
            }
            _ => {
                lines.push(Line {
                    addr,
                    bytes: vec![code[pc]],
                    opcode: None,
                });
                pc += 1;
            }
        }
    }

    lines
}

fn reg(r: u8) -> String {
    format!("R{}", r)
}

fn addr(image: Option<&Image>, hi: u8, lo: u8) -> String {
    let a = u16::from_be_bytes([hi, lo]);
    let name = match a {
        OUTPUT_PORT => Some("OUT".to_string()),
        INPUT_PORT => Some("IN".to_string()),
        _ => image.and_then(|i| i.label_at(a).map(str::to_string).or_else(|| i.symbol_at(a))),
    };
    match name {
        Some(name) => format!("[{:#06x}] {}", a, name),
        None => format!("[{:#06x}]", a),
    }
}

/// Assembly text for one line, e.g. `STORE [0x8001] x, R0`.
pub fn format_line(line: &Line, image: Option<&Image>) -> String {
    let b = &line.bytes;
    let Some(op) = line.opcode else {
        return format!(".byte {:#04x}", b[0]);
    };

    let operands = match op {
        Opcode::Halt | Opcode::LoadIndexed | Opcode::StoreIndexed | Opcode::Trap => String::new(),
        Opcode::Load => format!("{}, {}", reg(b[1]), addr(image, b[2], b[3])),
        Opcode::LoadImm => format!("{}, {}", reg(b[1]), b[2]),
        Opcode::Store => format!("{}, {}", addr(image, b[1], b[2]), reg(b[3])),
        Opcode::StoreImm => format!("{}, {}", addr(image, b[1], b[2]), b[3]),
        Opcode::Add | Opcode::Sub => format!("{}, {}", reg(b[1]), reg(b[2])),
        Opcode::Jnz | Opcode::Jz => format!("{}, {}", reg(b[1]), addr(image, b[2], b[3])),
        Opcode::In => reg(b[1]),
    };

    if operands.is_empty() {
        op.mnemonic().to_string()
    } else {
        format!("{:<13} {}", op.mnemonic(), operands)
    }
}

fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full listing of an image: addresses, raw bytes, mnemonics and symbols.
/// Jump targets get a marker; named ones also get a label header.
pub fn disassemble_to_string(image: &Image) -> String {
    let lines = decode(image.origin, &image.code);
    let targets: Vec<u16> = lines.iter().filter_map(Line::jump_target).collect();
    let mut output = String::new();

    for line in &lines {
        let is_target = targets.contains(&line.addr);
        if let Some(label) = image.label_at(line.addr) {
            output.push_str(&format!("      ┌── {}:\n", label));
        } else if is_target {
            output.push_str("      ┌──────────────────────────────────\n");
        }

        output.push_str(&format!(
            "{:04x} {} {:<12} {}\n",
            line.addr,
            if is_target { "►" } else { " " },
            format_bytes(&line.bytes),
            format_line(line, Some(image))
        ));
    }

    output
}

/// Prints the listing with a summary header.
pub fn print_image(image: &Image) {
    println!("=== MACHINE CODE ===\n");
    println!(
        "origin {:#06x}, {} bytes, {} labels, {} variables, {} arrays",
        image.origin,
        image.code.len(),
        image.labels.len(),
        image.symbols.len(),
        image.arrays.len()
    );
    println!("════════════════════════════════════════");
    print!("{}", disassemble_to_string(image));
    println!();
}

/// Prints the IR in program order, labels flush left.
pub fn print_ir(ir: &[Instr]) {
    println!("=== IR ({} instructions) ===\n", ir.len());
    for (i, instr) in ir.iter().enumerate() {
        match instr {
            Instr::Label { name } => println!("{}:", name),
            _ => println!("  {:04}  {}", i, instr),
        }
    }
    println!();
}

// =============================================================================
// Hex text
// =============================================================================

/// Lowercase hex pairs, 16 per line.
pub fn to_hex(code: &[u8]) -> String {
    code.chunks(16)
        .map(format_bytes)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{line}: invalid hex byte '{token}'")]
pub struct HexError {
    pub line: usize,
    pub token: String,
}

/// Parses whitespace-separated hex bytes (optional `0x` prefix).
/// Text after `;` or `#` on a line is ignored.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, HexError> {
    let mut bytes = Vec::new();

    for (n, line) in text.lines().enumerate() {
        let content = line.split([';', '#']).next().unwrap_or("");
        for token in content.split_whitespace() {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            let byte = u8::from_str_radix(digits, 16).map_err(|_| HexError {
                line: n + 1,
                token: token.to_string(),
            })?;
            bytes.push(byte);
        }
    }

    Ok(bytes)
}
