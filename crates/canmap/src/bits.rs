// crates/canmap/src/bits.rs

//! Bit addressing helpers for signals packed into CAN payloads.
//!
//! Bits are numbered MSB-first: bit 0 is the most significant bit of the first
//! transmitted byte. Some signal databases number the bits of each byte the
//! other way round; [`invert_bit_index`] translates between the two.

use core::fmt;

/// A bit index that has no representation under the inverted numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitInversionError {
    pub bit_index: u32,
    pub length: u32,
}

impl fmt::Display for BitInversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bit index {} with length {} falls before the start of the payload when inverted",
            self.bit_index, self.length
        )
    }
}

impl std::error::Error for BitInversionError {}

/// Returns the bit (1..=8) within its byte at which a field ends.
///
/// A field that ends exactly on a byte boundary reports 8, never 0.
pub fn end_bit(start_bit: u32, num_bits: u32) -> u32 {
    match field_end(start_bit, num_bits) % 8 {
        0 => 8,
        end => end as u32,
    }
}

/// One past the last bit of a field, widened so that no input overflows.
fn field_end(start_bit: u32, num_bits: u32) -> u64 {
    u64::from(start_bit) + u64::from(num_bits)
}

/// All-ones mask covering `num_bits` low bits.
pub fn bitmask(num_bits: u32) -> u128 {
    if num_bits >= 128 {
        u128::MAX
    } else {
        (1u128 << num_bits) - 1
    }
}

pub fn starting_byte(start_bit: u32) -> usize {
    (start_bit / 8) as usize
}

pub fn ending_byte(start_bit: u32, num_bits: u32) -> usize {
    (field_end(start_bit, num_bits).saturating_sub(1) / 8) as usize
}

/// Converts a normal (MSB-first) bit index into the inverted numbering.
pub fn invert_bit_index(bit_index: u32, length: u32) -> Result<u32, BitInversionError> {
    let (byte, rem) = (bit_index / 8, bit_index % 8);
    let end = i64::from(8 * byte + (7 - rem));
    let inverted = end - i64::from(length) + 1;
    u32::try_from(inverted).map_err(|_| BitInversionError { bit_index, length })
}

/// Extracts the raw unsigned field at `start_bit..start_bit + num_bits`.
///
/// Bytes past the end of `data` read as zero. Fields up to 64 bits wide are
/// returned exactly.
pub fn get_bit_field(data: &[u8], start_bit: u32, num_bits: u32) -> u64 {
    if num_bits == 0 {
        return 0;
    }
    let first = starting_byte(start_bit);
    let last = ending_byte(start_bit, num_bits);

    // The lowest byte address holds the most significant bits.
    let raw = (first..=last).fold(0u128, |acc, i| {
        (acc << 8) | u128::from(data.get(i).copied().unwrap_or(0))
    });

    let shifted = raw >> (8 - end_bit(start_bit, num_bits));
    (shifted & bitmask(num_bits.min(64))) as u64
}

/// Decodes a scaled signal value from a raw payload.
pub fn decode(data: &[u8], bit_position: u32, bit_size: u32, factor: f64, offset: f64) -> f64 {
    let raw = get_bit_field(data, bit_position, bit_size);
    raw as f64 * factor + offset
}
