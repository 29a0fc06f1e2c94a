//! Developer tool for the instruction encoding table.
//!
//! Prints the per-opcode descriptors, checks the table for consistency and
//! compiles a small built-in shader to show the encoded stream field by field.

use clap::Parser;
use std::process::exit;

use shader_backend::isa::table::{descriptor, FieldMapping, FieldSource};
use shader_backend::isa::{extract, ValueEncoder};
use shader_backend::{
    compile_shader, validate_table, CompileSession, InstrFlag, Instruction, Opcode, Operand,
    RegisterClassSet, Shader, ShaderStage,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Only show this opcode (mnemonic, e.g. `fma`).
    #[arg(short, long)]
    opcode: Option<String>,

    /// Validate the table and exit non-zero on the first inconsistency.
    #[arg(long)]
    check: bool,

    /// Compile and dump the built-in demo shader.
    #[arg(long)]
    demo: bool,

    /// Temp registers available to the demo.
    #[arg(long, default_value_t = 248)]
    temps: u32,

    /// Internal registers available to the demo.
    #[arg(long, default_value_t = 8)]
    internals: u32,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.check {
        match validate_table() {
            Ok(()) => println!("encoding table OK ({} opcodes)", Opcode::ALL.len()),
            Err(err) => {
                eprintln!("encoding table invalid: {err}");
                exit(1);
            }
        }
        return;
    }

    if args.demo {
        if let Err(err) = run_demo(args.temps, args.internals) {
            eprintln!("Error: {err}");
            exit(1);
        }
        return;
    }

    let opcodes: Vec<Opcode> = match &args.opcode {
        Some(name) => match Opcode::from_name(name) {
            Some(op) => vec![op],
            None => {
                eprintln!("unknown opcode `{name}`");
                exit(1);
            }
        },
        None => Opcode::ALL.to_vec(),
    };
    for op in opcodes {
        print_descriptor(op);
    }
}

fn print_descriptor(op: Opcode) {
    let desc = descriptor(op);
    println!(
        "{} ({} bytes, {} operands)",
        op,
        desc.width(),
        op.num_operands()
    );
    println!("  base: {}", hex(desc.bytes));
    for mapping in desc.mappings {
        let ranges: Vec<String> = mapping
            .ranges
            .iter()
            .map(|r| format!("[{}:{}]", r.start, r.low()))
            .collect();
        println!(
            "  {:<12} {:<28} {}",
            source_name(mapping),
            encoder_name(mapping.encoder),
            ranges.join(" ")
        );
    }
}

fn source_name(mapping: &FieldMapping) -> String {
    match mapping.source {
        FieldSource::InstrFlag(flag) => format!(".{}", flag.suffix()),
        FieldSource::Operand(i) => format!("operand {i}"),
        FieldSource::OperandFlag(i) => format!("opflag {i}"),
    }
}

fn encoder_name(encoder: ValueEncoder) -> String {
    match encoder {
        ValueEncoder::PassThrough => "pass-through".to_string(),
        ValueEncoder::Drc => "drc".to_string(),
        ValueEncoder::LimitedScale1To16 => "scale 1..16".to_string(),
        ValueEncoder::Register {
            bank_bits,
            num_bits,
        } => format!("register (bank {bank_bits}, num {num_bits})"),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn demo_shader() -> Shader {
    let mut shader = Shader::new(ShaderStage::Fragment);
    shader
        .push(Instruction::new(
            Opcode::MovImm,
            [Operand::vtemp(0), Operand::imm(0x3f80)],
        ))
        .push(
            Instruction::new(
                Opcode::Fma,
                [
                    Operand::vtemp(1),
                    Operand::vtemp(0),
                    Operand::vtemp(0),
                    Operand::vtemp(0),
                ],
            )
            .with_flag(InstrFlag::Saturate),
        )
        .push(Instruction::new(Opcode::EndFrag, []));
    shader
}

fn run_demo(temps: u32, internals: u32) -> Result<(), Box<dyn std::error::Error>> {
    let classes = RegisterClassSet::with_counts(temps, internals)?;
    let mut session = CompileSession::new();
    let mut shader = demo_shader();

    println!("input:\n{shader}");
    let binary = compile_shader(&mut session, &classes, &mut shader)?;
    println!("allocated ({}):\n{shader}", binary.usage);

    let mut offset = 0;
    for instr in &shader.instrs {
        let desc = descriptor(instr.opcode);
        let word = &binary.code[offset..offset + desc.width()];
        println!("{offset:04x}: {:<24} {}", instr.to_string(), hex(word));
        for mapping in desc.mappings {
            let raw = extract(mapping.ranges, word)?;
            println!("        {:<12} = {raw:#x}", source_name(mapping));
        }
        offset += desc.width();
    }
    println!("padding: {} bytes", binary.padding);
    print!("{}", session.stats());
    Ok(())
}
