// This module implements the declarative bit-range packing used by every instruction
// encoding. A BitRange names a run of bits inside an instruction word by its most
// significant bit and length. Bits are numbered the way the ISA documents them: bit 0 is
// the least significant bit of the last byte of the word and numbering increases towards
// the first byte, so a field's `start` is its top bit and the range runs downwards from
// there. A field may be split over several ranges; its value is consumed most significant
// bits first across the ranges in table order. distribute() ORs a value into a pre-seeded
// word (it never clears bits, so base bytes must be zero under every field) and extract()
// reads a field back using the same convention.

//! Bit-range packing for ISA fields.

use crate::core::error::EncodeError;

/// A contiguous run of `num` bits whose most significant bit is `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitRange {
    pub start: usize,
    pub num: usize,
}

impl BitRange {
    pub const fn new(start: usize, num: usize) -> Self {
        Self { start, num }
    }

    /// Lowest bit covered by the range.
    pub const fn low(&self) -> usize {
        self.start + 1 - self.num
    }

    /// Bits of the range, lowest first.
    pub fn bits(&self) -> impl DoubleEndedIterator<Item = usize> {
        self.low()..=self.start
    }

    fn fits(&self, width: usize) -> bool {
        self.num > 0 && self.num <= self.start + 1 && self.start < width
    }
}

/// Total width of a range list.
pub fn range_bits(ranges: &[BitRange]) -> usize {
    ranges.iter().map(|r| r.num).sum()
}

/// Index of the byte holding `bit` in a `len`-byte word.
#[inline]
fn byte_index(len: usize, bit: usize) -> usize {
    len - 1 - bit / 8
}

fn check_ranges(ranges: &[BitRange], len: usize) -> Result<usize, EncodeError> {
    let width = len * 8;
    for range in ranges {
        if !range.fits(width) {
            return Err(EncodeError::RangeOutsideWord {
                start: range.start,
                num: range.num,
                width,
            });
        }
    }
    let total = range_bits(ranges);
    if total > u64::BITS as usize {
        return Err(EncodeError::ValueOutOfRange {
            value: u64::MAX,
            bits: total,
        });
    }
    Ok(total)
}

/// Scatter `source` into the bits of `dest` named by `ranges`.
///
/// The most significant bits of `source` land in the first range. Bits are
/// ORed in, existing bits in `dest` are left untouched.
pub fn distribute(source: u64, ranges: &[BitRange], dest: &mut [u8]) -> Result<(), EncodeError> {
    let total = check_ranges(ranges, dest.len())?;
    let needed = (u64::BITS - source.leading_zeros()) as usize;
    if needed > total {
        return Err(EncodeError::ValueOutOfRange {
            value: source,
            bits: total,
        });
    }

    let mut source_bits_left = total;
    for range in ranges {
        let mut dest_bit = range.start;
        let mut bits_left = range.num;

        while bits_left > 0 {
            // Bits available in this byte at and below dest_bit.
            let byte_bits_left = dest_bit % 8 + 1;
            let count = bits_left.min(byte_bits_left);
            source_bits_left -= count;

            let mask = (1u64 << count) - 1;
            let chunk = ((source >> source_bits_left) & mask) as u8;
            let offset = byte_bits_left - count;
            dest[byte_index(dest.len(), dest_bit)] |= chunk << offset;

            bits_left -= count;
            // Wraps only after the last chunk of a range ending at bit 0.
            dest_bit = dest_bit.wrapping_sub(count);
        }
    }
    Ok(())
}

/// Read back the value spread over `ranges` in `src`.
pub fn extract(ranges: &[BitRange], src: &[u8]) -> Result<u64, EncodeError> {
    check_ranges(ranges, src.len())?;

    let mut value = 0u64;
    for range in ranges {
        for bit in range.bits().rev() {
            let set = (src[byte_index(src.len(), bit)] >> (bit % 8)) & 1;
            value = (value << 1) | u64::from(set);
        }
    }
    Ok(value)
}
