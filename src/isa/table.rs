// This module holds the instruction encoding table of the ISA: one immutable descriptor
// per opcode, consisting of the fixed base bytes of the instruction word and an ordered
// list of field mappings. Each mapping says where a flag bit or an operand lands (one or
// more bit ranges, most significant piece first) and which value encoder produces the raw
// field. The table is plain static data; porting to another GPU generation means swapping
// this file, not the encoder. validate_table() checks the invariants the encoder relies
// on: supported widths, ranges inside the word, range widths matching encoder widths,
// operand indices inside the opcode's operand list, no overlapping fields, and base bytes
// that are zero under every field so that ORing values in is exact.

//! Per-opcode instruction encoding descriptors.

use crate::core::error::TableError;
use crate::core::shader::{InstrFlag, Opcode};
use crate::isa::bits::{range_bits, BitRange};
use crate::isa::value_encoders::{ValueEncoder, REG_2_8, REG_3_11, REG_3_8};

/// Widest instruction word in the table.
pub const MAX_INSTR_BYTES: usize = 16;

/// Where a field's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// 1 when the instruction carries the flag, 0 otherwise.
    InstrFlag(InstrFlag),
    /// The operand at this index.
    Operand(usize),
    /// Reserved: per-operand modifier flags. No opcode uses it.
    OperandFlag(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub source: FieldSource,
    pub ranges: &'static [BitRange],
    pub encoder: ValueEncoder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingDescriptor {
    pub bytes: &'static [u8],
    pub mappings: &'static [FieldMapping],
}

impl EncodingDescriptor {
    pub fn width(&self) -> usize {
        self.bytes.len()
    }
}

macro_rules! ranges {
    ($(($start:expr, $num:expr)),+ $(,)?) => {
        &[$(BitRange { start: $start, num: $num }),+]
    };
}

macro_rules! flag {
    ($flag:ident, $(($start:expr, $num:expr)),+) => {
        FieldMapping {
            source: FieldSource::InstrFlag(InstrFlag::$flag),
            ranges: ranges!($(($start, $num)),+),
            encoder: ValueEncoder::PassThrough,
        }
    };
}

macro_rules! operand {
    ($index:expr, $encoder:expr, $(($start:expr, $num:expr)),+) => {
        FieldMapping {
            source: FieldSource::Operand($index),
            ranges: ranges!($(($start, $num)),+),
            encoder: $encoder,
        }
    };
}

static NOP: EncodingDescriptor = EncodingDescriptor {
    bytes: &[0x04, 0x80, 0x6e, 0x00, 0xf2, 0xff, 0xff, 0xff],
    mappings: &[],
};

static END_FRAG: EncodingDescriptor = EncodingDescriptor {
    bytes: &[0x04, 0x80, 0xee, 0x00, 0xf2, 0xff, 0xff, 0xff],
    mappings: &[],
};

static END_VERT: EncodingDescriptor = EncodingDescriptor {
    bytes: &[0x44, 0xa0, 0x80, 0x05, 0x00, 0x00, 0x00, 0xff],
    mappings: &[],
};

static WDF: EncodingDescriptor = EncodingDescriptor {
    bytes: &[0x04, 0x80, 0x6a, 0xff, 0xf2, 0xff, 0xff, 0xff],
    mappings: &[operand!(0, ValueEncoder::Drc, (47, 1))],
};

static PIX_ITER_W: EncodingDescriptor = EncodingDescriptor {
    bytes: &[
        0x48, 0x20, 0xb0, 0x01, 0x80, 0x40, 0x80, 0x00, 0x80, 0x00, 0xf3, 0xf0, 0x0f, 0xff, 0xff,
        0xff,
    ],
    mappings: &[
        flag!(Saturate, (100, 1)),
        operand!(0, REG_2_8, (43, 2), (35, 8)),
        operand!(1, ValueEncoder::Drc, (121, 1)),
        operand!(2, REG_3_8, (59, 3), (55, 8)),
        operand!(3, REG_3_8, (75, 3), (71, 8)),
        operand!(4, ValueEncoder::LimitedScale1To16, (83, 4)),
    ],
};

static MAX: EncodingDescriptor = EncodingDescriptor {
    bytes: &[
        0x68, 0x42, 0xd0, 0x3c, 0xfa, 0x10, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x02, 0x80, 0x02,
        0xff,
    ],
    mappings: &[
        operand!(0, REG_2_8, (43, 2), (35, 8)),
        operand!(1, REG_3_11, (63, 3), (58, 11)),
        operand!(2, REG_3_11, (79, 3), (74, 11)),
    ],
};

static MIN: EncodingDescriptor = EncodingDescriptor {
    bytes: &[
        0x68, 0x42, 0xd0, 0x3c, 0xf0, 0x11, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x02, 0x80, 0x02,
        0xff,
    ],
    mappings: &[
        operand!(0, REG_2_8, (43, 2), (35, 8)),
        operand!(1, REG_3_11, (63, 3), (58, 11)),
        operand!(2, REG_3_11, (79, 3), (74, 11)),
    ],
};

static PACK_U8888: EncodingDescriptor = EncodingDescriptor {
    bytes: &[
        0x58, 0x92, 0x06, 0x9c, 0x20, 0x80, 0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x02, 0xff, 0xff,
        0xff,
    ],
    mappings: &[
        operand!(0, REG_2_8, (43, 2), (35, 8)),
        operand!(1, REG_3_11, (63, 3), (58, 11)),
    ],
};

static MOV: EncodingDescriptor = EncodingDescriptor {
    bytes: &[
        0x48, 0x42, 0xd0, 0x3f, 0x87, 0x80, 0xf2, 0xff, 0x18, 0x00, 0xc7, 0x00, 0x1f, 0xff, 0xff,
        0xff,
    ],
    mappings: &[
        flag!(OverlapCheck, (114, 1)),
        operand!(0, REG_3_11, (45, 3), (39, 11)),
        operand!(1, REG_3_11, (63, 3), (58, 11)),
    ],
};

static MOV_IMM: EncodingDescriptor = EncodingDescriptor {
    bytes: &[
        0x88, 0x92, 0x40, 0x91, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf2, 0xf0, 0x0f, 0xff, 0xff,
        0xff,
    ],
    mappings: &[
        operand!(0, REG_2_8, (43, 2), (35, 8)),
        operand!(1, ValueEncoder::PassThrough, (95, 16), (71, 16)),
    ],
};

static FMA: EncodingDescriptor = EncodingDescriptor {
    bytes: &[
        0x28, 0x02, 0xd0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x80, 0x00,
        0xff,
    ],
    mappings: &[
        flag!(Saturate, (104, 1)),
        flag!(LowPrecision, (103, 1)),
        operand!(0, REG_2_8, (43, 2), (35, 8)),
        operand!(1, REG_3_11, (63, 3), (58, 11)),
        operand!(2, REG_3_11, (79, 3), (74, 11)),
        operand!(3, REG_3_11, (95, 3), (90, 11)),
    ],
};

static MUL: EncodingDescriptor = EncodingDescriptor {
    bytes: &[
        0x28, 0x02, 0x40, 0x80, 0xc0, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x80, 0x00,
        0xff,
    ],
    mappings: &[
        flag!(Saturate, (108, 1)),
        flag!(LowPrecision, (109, 1)),
        operand!(0, REG_2_8, (43, 2), (35, 8)),
        operand!(1, REG_3_11, (63, 3), (58, 11)),
        operand!(2, REG_3_11, (79, 3), (74, 11)),
    ],
};

/// Encoding descriptor for `opcode`.
pub fn descriptor(opcode: Opcode) -> &'static EncodingDescriptor {
    match opcode {
        Opcode::Nop => &NOP,
        Opcode::EndFrag => &END_FRAG,
        Opcode::EndVert => &END_VERT,
        Opcode::Wdf => &WDF,
        Opcode::PixIterW => &PIX_ITER_W,
        Opcode::Max => &MAX,
        Opcode::Min => &MIN,
        Opcode::PackU8888 => &PACK_U8888,
        Opcode::Mov => &MOV,
        Opcode::MovImm => &MOV_IMM,
        Opcode::Fma => &FMA,
        Opcode::Mul => &MUL,
    }
}

/// Expected width of a mapping's range list, `None` when any width is accepted.
fn mapping_width(mapping: &FieldMapping) -> Option<usize> {
    match mapping.source {
        FieldSource::InstrFlag(_) => Some(1),
        FieldSource::Operand(_) | FieldSource::OperandFlag(_) => mapping.encoder.width(),
    }
}

/// Check one descriptor against the invariants the encoder relies on.
pub fn validate_descriptor(opcode: Opcode, desc: &EncodingDescriptor) -> Result<(), TableError> {
    let bytes = desc.width();
    if bytes == 0 || bytes > MAX_INSTR_BYTES || bytes % 8 != 0 {
        return Err(TableError::BadWidth { opcode, bytes });
    }
    let width = bytes * 8;
    let mut covered = [false; MAX_INSTR_BYTES * 8];

    for (index, mapping) in desc.mappings.iter().enumerate() {
        if let FieldSource::Operand(op) | FieldSource::OperandFlag(op) = mapping.source {
            if op >= opcode.num_operands() {
                return Err(TableError::OperandIndex {
                    opcode,
                    mapping: index,
                    index: op,
                    count: opcode.num_operands(),
                });
            }
        }

        let found = range_bits(mapping.ranges);
        if let Some(expected) = mapping_width(mapping) {
            if expected != found {
                return Err(TableError::WidthMismatch {
                    opcode,
                    mapping: index,
                    expected,
                    found,
                });
            }
        }

        for range in mapping.ranges {
            if range.num == 0 || range.num > range.start + 1 || range.start >= width {
                return Err(TableError::RangeOutsideWord {
                    opcode,
                    mapping: index,
                    start: range.start,
                    num: range.num,
                });
            }
            for bit in range.bits() {
                if covered[bit] {
                    return Err(TableError::Overlap {
                        opcode,
                        mapping: index,
                        bit,
                    });
                }
                covered[bit] = true;
                let byte = desc.bytes[bytes - 1 - bit / 8];
                if (byte >> (bit % 8)) & 1 != 0 {
                    return Err(TableError::BaseBitSet {
                        opcode,
                        mapping: index,
                        bit,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Validate the whole table.
pub fn validate_table() -> Result<(), TableError> {
    for opcode in Opcode::ALL {
        validate_descriptor(opcode, descriptor(opcode))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_consistent() {
        validate_table().unwrap();
    }

    #[test]
    fn test_every_opcode_has_descriptor() {
        for opcode in Opcode::ALL {
            let desc = descriptor(opcode);
            assert!(matches!(desc.width(), 8 | 16), "{opcode}");
            let operand_fields = desc
                .mappings
                .iter()
                .filter(|m| matches!(m.source, FieldSource::Operand(_)))
                .count();
            assert_eq!(operand_fields, opcode.num_operands(), "{opcode}");
        }
    }

    #[test]
    fn test_no_operand_flag_mappings() {
        for opcode in Opcode::ALL {
            assert!(descriptor(opcode)
                .mappings
                .iter()
                .all(|m| !matches!(m.source, FieldSource::OperandFlag(_))));
        }
    }

    #[test]
    fn test_validator_catches_overlap() {
        static BAD: EncodingDescriptor = EncodingDescriptor {
            bytes: &[0; 8],
            mappings: &[
                operand!(0, REG_2_8, (20, 10)),
                operand!(1, REG_2_8, (15, 10)),
            ],
        };
        assert_eq!(
            validate_descriptor(Opcode::Mov, &BAD),
            Err(TableError::Overlap {
                opcode: Opcode::Mov,
                mapping: 1,
                bit: 11
            })
        );
    }

    #[test]
    fn test_validator_catches_dirty_base() {
        static BAD: EncodingDescriptor = EncodingDescriptor {
            bytes: &[0, 0, 0, 0, 0, 0, 0, 0x01],
            mappings: &[flag!(Saturate, (0, 1))],
        };
        assert_eq!(
            validate_descriptor(Opcode::Fma, &BAD),
            Err(TableError::BaseBitSet {
                opcode: Opcode::Fma,
                mapping: 0,
                bit: 0
            })
        );
    }

    #[test]
    fn test_validator_catches_width_mismatch() {
        static BAD: EncodingDescriptor = EncodingDescriptor {
            bytes: &[0; 16],
            mappings: &[operand!(0, REG_3_11, (40, 13))],
        };
        assert!(matches!(
            validate_descriptor(Opcode::Mov, &BAD),
            Err(TableError::WidthMismatch {
                expected: 14,
                found: 13,
                ..
            })
        ));
    }

    #[test]
    fn test_validator_catches_bad_operand_index() {
        static BAD: EncodingDescriptor = EncodingDescriptor {
            bytes: &[0; 8],
            mappings: &[operand!(3, REG_2_8, (20, 10))],
        };
        assert!(matches!(
            validate_descriptor(Opcode::Mov, &BAD),
            Err(TableError::OperandIndex { index: 3, count: 2, .. })
        ));
    }
}
