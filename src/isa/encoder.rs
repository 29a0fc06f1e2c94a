// This module serializes fully allocated instructions into the binary ISA. For each
// instruction the opcode's descriptor is looked up, its base bytes are copied into a
// scratch word, and every field mapping is applied in table order: flags contribute a
// single 0/1 bit, operands are dispatched by variant to the mapping's value encoder
// (immediates and DRC indices pass through, registers pack bank selector and number, with
// pixel-output and internal registers first shifted by their fixed group offset inside
// the special bank) and the resulting value is ORed into the word with distribute().
// ShaderEncoder appends words to a flat stream and, once the last instruction is emitted,
// pads the stream with 0xFF up to the next 16-byte boundary. Any error aborts the shader;
// nothing is ever skipped or replaced by a default encoding.

//! Instruction and shader encoding.

use crate::core::error::{CompileError, CompileResult, EncodeError};
use crate::core::shader::{Instruction, Operand, RegBank};
use crate::isa::bits::distribute;
use crate::isa::table::{self, FieldSource, MAX_INSTR_BYTES};
use crate::isa::value_encoders::ValueEncoder;

/// Encoded shaders are padded to a multiple of this many bytes.
pub const INSTR_ALIGN: usize = 16;

/// Filler byte used for padding.
pub const PAD_BYTE: u8 = 0xff;

/// Pixel output registers start at this number inside the special bank.
pub const PIXEL_OUT_GROUP: u64 = 32;

/// Internal registers start at this number inside the special bank.
pub const INTERNAL_GROUP: u64 = 36;

/// Bank selector written above the register number.
pub fn bank_select(bank: RegBank) -> u64 {
    match bank {
        RegBank::Const | RegBank::PixelOut | RegBank::Internal => 0,
        RegBank::Temp => 1,
        RegBank::VertexIn => 2,
        RegBank::Coeff => 3,
        RegBank::Shared => 4,
    }
}

/// Offset added to register numbers of banks sharing the special bank.
pub fn group_offset(bank: RegBank) -> u64 {
    match bank {
        RegBank::PixelOut => PIXEL_OUT_GROUP,
        RegBank::Internal => INTERNAL_GROUP,
        _ => 0,
    }
}

/// One encoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedInstr {
    bytes: [u8; MAX_INSTR_BYTES],
    len: usize,
}

impl EncodedInstr {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn operand_value(
    instr: &Instruction,
    index: usize,
    encoder: ValueEncoder,
) -> Result<u64, EncodeError> {
    let opcode = instr.opcode;
    let operand = instr
        .operands
        .get(index)
        .ok_or(EncodeError::OperandCount {
            opcode,
            expected: opcode.num_operands(),
            found: instr.operands.len(),
        })?;

    let mismatch = |expected| EncodeError::OperandMismatch {
        opcode,
        index,
        expected,
    };

    match (*operand, encoder) {
        (Operand::Virtual(_), _) => Err(EncodeError::UnallocatedOperand { opcode, index }),
        (Operand::Physical(reg), ValueEncoder::Register { .. }) => {
            let number = u64::from(reg.number) + group_offset(reg.bank);
            encoder
                .encode_register(bank_select(reg.bank), number)
                .unwrap_or(Err(mismatch("register")))
        }
        (Operand::Physical(_), _) => Err(mismatch("value")),
        (Operand::Drc(drc), ValueEncoder::Drc | ValueEncoder::PassThrough) => encoder
            .encode_value(u64::from(drc.index()))
            .unwrap_or(Err(mismatch("drc"))),
        (Operand::Drc(_), _) => Err(mismatch("non-drc value")),
        (Operand::Immediate(_), ValueEncoder::Register { .. }) => Err(mismatch("register")),
        (Operand::Immediate(_), ValueEncoder::Drc) => Err(mismatch("drc")),
        (Operand::Immediate(value), _) => encoder
            .encode_value(value)
            .unwrap_or(Err(mismatch("immediate"))),
    }
}

/// Encode a single instruction. All register operands must be physical.
pub fn encode_instr(instr: &Instruction) -> Result<EncodedInstr, EncodeError> {
    let opcode = instr.opcode;
    if instr.operands.len() != opcode.num_operands() {
        return Err(EncodeError::OperandCount {
            opcode,
            expected: opcode.num_operands(),
            found: instr.operands.len(),
        });
    }

    let desc = table::descriptor(opcode);
    let width = desc.width();
    if width > MAX_INSTR_BYTES {
        return Err(EncodeError::DescriptorTooWide {
            opcode,
            bytes: width,
        });
    }

    let mut encoded = EncodedInstr {
        bytes: [0; MAX_INSTR_BYTES],
        len: width,
    };
    let word = &mut encoded.bytes[..width];
    word.copy_from_slice(desc.bytes);

    for mapping in desc.mappings {
        let value = match mapping.source {
            FieldSource::InstrFlag(flag) => u64::from(instr.has_flag(flag)),
            FieldSource::Operand(index) => operand_value(instr, index, mapping.encoder)?,
            FieldSource::OperandFlag(index) => {
                return Err(EncodeError::UnsupportedMapping { opcode, index })
            }
        };
        distribute(value, mapping.ranges, word)?;
    }

    Ok(encoded)
}

/// Pad `code` with [`PAD_BYTE`] to a multiple of `align`, returning the bytes added.
pub fn pad_to_alignment(code: &mut Vec<u8>, align: usize) -> usize {
    let padding = (align - code.len() % align) % align;
    code.resize(code.len() + padding, PAD_BYTE);
    padding
}

/// A finished, padded instruction stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedShader {
    pub code: Vec<u8>,
    pub instructions: usize,
    pub padding: usize,
}

/// Accumulates encoded instructions into one stream.
#[derive(Debug, Default)]
pub struct ShaderEncoder {
    code: Vec<u8>,
    instructions: usize,
}

impl ShaderEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            code: Vec::with_capacity(bytes),
            instructions: 0,
        }
    }

    /// Byte offset the next instruction will be written at.
    pub fn position(&self) -> usize {
        self.code.len()
    }

    pub fn emit(&mut self, instr: &Instruction) -> Result<(), EncodeError> {
        let encoded = encode_instr(instr)?;
        log::trace!(
            "{:04x}: {:<28} {:02x?}",
            self.code.len(),
            instr.to_string(),
            encoded.as_bytes()
        );
        self.code.extend_from_slice(encoded.as_bytes());
        self.instructions += 1;
        Ok(())
    }

    /// Pad the stream and hand it over.
    pub fn finish(mut self) -> EncodedShader {
        let padding = pad_to_alignment(&mut self.code, INSTR_ALIGN);
        EncodedShader {
            code: self.code,
            instructions: self.instructions,
            padding,
        }
    }
}

/// Encode a whole, fully allocated instruction list.
pub fn encode_shader(instrs: &[Instruction]) -> CompileResult<EncodedShader> {
    let mut encoder = ShaderEncoder::with_capacity(instrs.len() * MAX_INSTR_BYTES);
    for (ip, instr) in instrs.iter().enumerate() {
        encoder
            .emit(instr)
            .map_err(|source| CompileError::Encode { ip, source })?;
    }
    let shader = encoder.finish();
    log::debug!(
        "encoded {} instructions into {} bytes ({} padding)",
        shader.instructions,
        shader.code.len(),
        shader.padding
    );
    Ok(shader)
}
