//! Value encoders turning operands and flags into raw field values.
//!
//! Each field mapping names one [`ValueEncoder`]. Immediates and DRC indices
//! pass through unchanged (DRCs after a bounds check), scale immediates are
//! remapped into a 4-bit field, and registers pack a bank selector above the
//! register number.

use crate::core::error::EncodeError;
use crate::core::shader::NUM_DRCS;

/// Bits needed to name any DRC.
pub const DRC_BITS: usize = (u8::BITS - (NUM_DRCS - 1).leading_zeros()) as usize;

/// Encoder attached to a field mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueEncoder {
    /// Value is written unchanged; its width is the width of the range list.
    PassThrough,
    /// DRC index, passed through after a bounds check.
    Drc,
    /// Scale in `1..=16` stored in 4 bits, with 16 stored as 0.
    LimitedScale1To16,
    /// `bank` in the top `bank_bits`, register number in the low `num_bits`.
    Register { bank_bits: u32, num_bits: u32 },
}

pub const REG_2_8: ValueEncoder = ValueEncoder::Register {
    bank_bits: 2,
    num_bits: 8,
};

pub const REG_3_8: ValueEncoder = ValueEncoder::Register {
    bank_bits: 3,
    num_bits: 8,
};

pub const REG_3_11: ValueEncoder = ValueEncoder::Register {
    bank_bits: 3,
    num_bits: 11,
};

impl ValueEncoder {
    /// Field width this encoder produces, `None` when it adapts to the range list.
    pub fn width(self) -> Option<usize> {
        match self {
            ValueEncoder::PassThrough => None,
            ValueEncoder::Drc => Some(DRC_BITS),
            ValueEncoder::LimitedScale1To16 => Some(4),
            ValueEncoder::Register {
                bank_bits,
                num_bits,
            } => Some((bank_bits + num_bits) as usize),
        }
    }

    pub fn is_register(self) -> bool {
        matches!(self, ValueEncoder::Register { .. })
    }

    /// Encode a single scalar input (immediate, DRC or flag bit).
    ///
    /// Returns `None` for register encoders, which need a bank and number.
    pub fn encode_value(self, value: u64) -> Option<Result<u64, EncodeError>> {
        match self {
            ValueEncoder::PassThrough => Some(Ok(pass_through(value))),
            ValueEncoder::Drc => Some(drc(value)),
            ValueEncoder::LimitedScale1To16 => Some(limited_scale_1_16(value)),
            ValueEncoder::Register { .. } => None,
        }
    }

    /// Encode a register given its bank selector and (offset) number.
    ///
    /// Returns `None` for scalar encoders.
    pub fn encode_register(self, bank: u64, number: u64) -> Option<Result<u64, EncodeError>> {
        match self {
            ValueEncoder::Register {
                bank_bits,
                num_bits,
            } => Some(register_field(bank_bits, bank, num_bits, number)),
            _ => None,
        }
    }
}

#[inline]
pub fn pass_through(value: u64) -> u64 {
    value
}

pub fn drc(value: u64) -> Result<u64, EncodeError> {
    if value < u64::from(NUM_DRCS) {
        Ok(pass_through(value))
    } else {
        Err(EncodeError::DrcOutOfRange(value))
    }
}

pub fn limited_scale_1_16(value: u64) -> Result<u64, EncodeError> {
    match value {
        16 => Ok(0),
        1..=15 => Ok(value),
        _ => Err(EncodeError::ScaleOutOfRange(value)),
    }
}

pub fn register_field(
    bank_bits: u32,
    bank: u64,
    num_bits: u32,
    number: u64,
) -> Result<u64, EncodeError> {
    if bank >> bank_bits != 0 {
        return Err(EncodeError::RegisterBankOutOfRange {
            bank,
            bits: bank_bits,
        });
    }
    if number >> num_bits != 0 {
        return Err(EncodeError::RegisterNumberOutOfRange {
            number,
            bits: num_bits,
        });
    }
    Ok((bank << num_bits) | number)
}
