// This module groups the instruction encoder. Encoding is table driven: each opcode has a
// descriptor holding its base bytes and a list of field mappings, each mapping naming a
// value source (operand or instruction flag), a value encoder and the bit ranges the
// encoded value is scattered into. Porting to a new hardware generation means replacing
// the table; the packing in bits and the encoders stay the same.

//! Table-driven instruction encoding.

pub mod bits;
pub mod encoder;
pub mod table;
pub mod value_encoders;

pub use bits::{distribute, extract, range_bits, BitRange};
pub use encoder::{
    encode_instr, encode_shader, EncodedInstr, EncodedShader, ShaderEncoder, INSTR_ALIGN,
    INTERNAL_GROUP, PAD_BYTE, PIXEL_OUT_GROUP,
};
pub use table::{descriptor, validate_table, EncodingDescriptor, FieldMapping, FieldSource};
pub use value_encoders::ValueEncoder;
