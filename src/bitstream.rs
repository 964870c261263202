//! Sequential MSB-first bit reading over the entropy-coded segment.
//!
//! By the time this runs, the segment parser has already destuffed `0xFF00`
//! pairs and dropped restart markers, so the reader never has to special-case
//! `0xFF` in the hot path; it only moves a `(byte, bit)` cursor forward.

use crate::errors::DecodeErrors;
use crate::huffman::HuffmanTable;

/// An MSB-first bit cursor over the destuffed entropy bytes.
///
/// Strictly forward-only, never rewinds. Running off the end of the data is
/// a fatal entropy-stream error, not a recoverable condition.
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    next_byte: usize,
    next_bit: u8,
}

impl<'a> BitReader<'a> {
    pub(crate) const fn new(data: &'a [u8]) -> BitReader<'a> {
        BitReader {
            data,
            next_byte: 0,
            next_bit: 0,
        }
    }

    /// Read a single bit.
    #[inline]
    pub(crate) fn read_bit(&mut self) -> Result<u32, DecodeErrors> {
        let byte = *self.data.get(self.next_byte).ok_or_else(|| {
            DecodeErrors::HuffmanDecode("bitstream ended prematurely".to_string())
        })?;
        let bit = u32::from((byte >> (7 - self.next_bit)) & 1);
        self.next_bit += 1;
        if self.next_bit == 8 {
            self.next_bit = 0;
            self.next_byte += 1;
        }
        Ok(bit)
    }

    /// Read `length` bits, first bit read lands in the most significant
    /// position.
    #[inline]
    pub(crate) fn read_bits(&mut self, length: u8) -> Result<i32, DecodeErrors> {
        let mut bits = 0_i32;
        for _ in 0..length {
            bits = (bits << 1) | self.read_bit()? as i32;
        }
        Ok(bits)
    }

    /// Discard any partially read byte so the cursor sits on a byte
    /// boundary, as required at a restart interval.
    pub(crate) fn align(&mut self) {
        if self.next_bit != 0 {
            self.next_bit = 0;
            self.next_byte += 1;
        }
    }

    /// Decode one symbol by canonical prefix search: shift in one bit at a
    /// time and look for the running code among the codes of that length.
    ///
    /// No match after 16 bits means the stream is corrupt.
    pub(crate) fn decode_symbol(&mut self, table: &HuffmanTable) -> Result<u8, DecodeErrors> {
        let mut code = 0_u16;
        for len in 1..=16_usize {
            code = (code << 1) | self.read_bit()? as u16;
            for j in table.offsets[len - 1]..table.offsets[len] {
                if table.codes[j] == code {
                    return Ok(table.symbols[j]);
                }
            }
        }
        Err(DecodeErrors::HuffmanDecode(
            "no code match after 16 bits, stream is corrupt".to_string(),
        ))
    }
}

/// Sign-extend a JPEG variable-length integer.
///
/// A raw `length`-bit value below `2^(length - 1)` denotes a negative
/// number and is mapped to `value - (2^length - 1)`.
#[inline]
pub(crate) fn extend(value: i32, length: u8) -> i32 {
    if length != 0 && value < (1 << (length - 1)) {
        value - ((1 << length) - 1)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_come_out_msb_first() {
        let mut reader = BitReader::new(&[0b1010_0011, 0b1100_0000]);
        assert_eq!(reader.read_bit().unwrap(), 1);
        assert_eq!(reader.read_bit().unwrap(), 0);
        assert_eq!(reader.read_bit().unwrap(), 1);
        assert_eq!(reader.read_bits(5).unwrap(), 0b00011);
        assert_eq!(reader.read_bits(2).unwrap(), 0b11);
    }

    #[test]
    fn premature_end_is_an_error() {
        let mut reader = BitReader::new(&[0xff]);
        assert!(reader.read_bits(8).is_ok());
        assert!(reader.read_bit().is_err());
    }

    #[test]
    fn align_discards_partial_byte() {
        let mut reader = BitReader::new(&[0b1111_1111, 0b0000_0001]);
        reader.read_bits(3).unwrap();
        reader.align();
        assert_eq!(reader.read_bits(8).unwrap(), 1);
        // aligning an already aligned cursor is a no-op
        let mut aligned = BitReader::new(&[0xab, 0xcd]);
        aligned.read_bits(8).unwrap();
        aligned.align();
        assert_eq!(aligned.read_bits(8).unwrap(), 0xcd);
    }

    #[test]
    fn sign_extension_law() {
        // for v < 2^(len-1) the decoded value is v - (2^len - 1), else v
        for length in 1..=11_u8 {
            let half = 1_i32 << (length - 1);
            let full = (1_i32 << length) - 1;
            for v in 0..(1_i32 << length) {
                let got = extend(v, length);
                if v < half {
                    assert_eq!(got, v - full);
                } else {
                    assert_eq!(got, v);
                }
            }
        }
        // length 0 always decodes to the value itself
        assert_eq!(extend(0, 0), 0);
    }

    #[test]
    fn prefix_search_decodes_known_table() {
        // two codes: `0` -> 0x04, `10` -> 0x07
        let mut counts = [0_u8; 16];
        counts[0] = 1;
        counts[1] = 1;
        let table = HuffmanTable::new(&counts, vec![0x04, 0x07]).unwrap();

        let mut reader = BitReader::new(&[0b0_10_0_10_00]);
        assert_eq!(reader.decode_symbol(&table).unwrap(), 0x04);
        assert_eq!(reader.decode_symbol(&table).unwrap(), 0x07);
        assert_eq!(reader.decode_symbol(&table).unwrap(), 0x04);
        assert_eq!(reader.decode_symbol(&table).unwrap(), 0x07);
    }

    #[test]
    fn unmatched_prefix_is_fatal() {
        // single code `0`; a stream of all ones never matches
        let mut counts = [0_u8; 16];
        counts[0] = 1;
        let table = HuffmanTable::new(&counts, vec![0x00]).unwrap();
        let mut reader = BitReader::new(&[0xff, 0xff, 0xff]);
        assert!(reader.decode_symbol(&table).is_err());
    }
}
