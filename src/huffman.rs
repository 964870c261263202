//! Canonical Huffman table construction.
//!
//! A DHT segment transmits only a histogram of code lengths plus the symbol
//! list in order of increasing code length; the numeric code values are fully
//! determined by that histogram (shorter codes get smaller values, and the
//! shift-and-carry rule leaves no gaps in the code space), so we re-derive
//! them here instead of storing them in the file.

use crate::errors::DecodeErrors;
use crate::misc::MAX_HUFFMAN_SYMBOLS;

/// A canonical Huffman decode table built from a DHT segment.
#[allow(clippy::module_name_repetitions)]
pub struct HuffmanTable {
    /// `offsets[k]` is the number of codes strictly shorter than `k + 1`
    /// bits; symbols with codes of length `l` live in
    /// `symbols[offsets[l - 1]..offsets[l]]`.
    pub(crate) offsets: [usize; 17],
    /// Symbols in order of increasing code length, at most 162 entries.
    pub(crate) symbols: Vec<u8>,
    /// Generated numeric code per symbol, same indexing as `symbols`.
    pub(crate) codes: Vec<u16>,
}

impl HuffmanTable {
    /// Build a table from the 16 per-length symbol counts and the symbol
    /// list of a DHT segment, generating the canonical codes.
    ///
    /// # Errors
    /// Returns `HuffmanDecode` if the counts declare more symbols than the
    /// symbol list carries or more than the 162 the format allows.
    pub fn new(counts: &[u8; 16], symbols: Vec<u8>) -> Result<HuffmanTable, DecodeErrors> {
        let mut offsets = [0_usize; 17];
        let mut total = 0_usize;
        for (i, count) in counts.iter().enumerate() {
            total += usize::from(*count);
            offsets[i + 1] = total;
        }
        if total > MAX_HUFFMAN_SYMBOLS {
            return Err(DecodeErrors::HuffmanDecode(format!(
                "too many symbols in Huffman table, {total} exceeds 162"
            )));
        }
        if symbols.len() != total {
            return Err(DecodeErrors::HuffmanDecode(format!(
                "Huffman table declares {total} symbols but carries {}",
                symbols.len()
            )));
        }
        // a histogram must fit the canonical code space: after handing out
        // the codes of length l, the next code value cannot exceed 2^l
        let mut next_code = 0_u32;
        for (i, count) in counts.iter().enumerate() {
            next_code += u32::from(*count);
            if next_code > 1 << (i + 1) {
                return Err(DecodeErrors::HuffmanDecode(
                    "code length histogram over-subscribes the code space".to_string(),
                ));
            }
            next_code <<= 1;
        }
        let mut table = HuffmanTable {
            offsets,
            symbols,
            codes: vec![0; total],
        };
        table.generate_codes();
        Ok(table)
    }

    /// Assign canonical codes: walk lengths 1..=16, handing consecutive
    /// integer codes to each symbol of that length, then left shift by one
    /// before moving to the next length.
    #[allow(clippy::cast_possible_truncation)]
    fn generate_codes(&mut self) {
        // the accumulator is wider than a code because the trailing shifts
        // for unused lengths can push it past 16 bits
        let mut code = 0_u32;
        for len in 0..16 {
            for j in self.offsets[len]..self.offsets[len + 1] {
                self.codes[j] = code as u16;
                code += 1;
            }
            code <<= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // the standard DC luminance table from ITU T.81 Annex K
    const DC_LUMA_COUNTS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
    const DC_LUMA_SYMBOLS: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

    fn code_length(table: &HuffmanTable, index: usize) -> usize {
        (1..=16)
            .find(|l| index < table.offsets[*l])
            .expect("symbol has no length")
    }

    #[test]
    fn annex_k_dc_luminance_codes() {
        let table = HuffmanTable::new(&DC_LUMA_COUNTS, DC_LUMA_SYMBOLS.to_vec()).unwrap();
        // one 2-bit code, then five 3-bit codes starting at 0b010
        assert_eq!(table.codes[0], 0b00);
        assert_eq!(table.codes[1], 0b010);
        assert_eq!(table.codes[2], 0b011);
        assert_eq!(table.codes[5], 0b110);
        // each jump in length doubles the running code
        assert_eq!(table.codes[6], 0b1110);
        assert_eq!(table.codes[7], 0b1_1110);
        assert_eq!(table.codes[11], 0b1_1111_1110);
    }

    #[test]
    fn per_length_counts_match_offsets() {
        let table = HuffmanTable::new(&DC_LUMA_COUNTS, DC_LUMA_SYMBOLS.to_vec()).unwrap();
        for len in 1..=16 {
            let count = table.offsets[len] - table.offsets[len - 1];
            assert_eq!(count, usize::from(DC_LUMA_COUNTS[len - 1]));
        }
    }

    #[test]
    fn codes_are_prefix_free() {
        let table = HuffmanTable::new(&DC_LUMA_COUNTS, DC_LUMA_SYMBOLS.to_vec()).unwrap();
        let n = table.symbols.len();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let (li, lj) = (code_length(&table, i), code_length(&table, j));
                if li <= lj {
                    // a code is a prefix of another iff the longer one,
                    // truncated to the shorter length, equals it
                    assert_ne!(
                        table.codes[i],
                        table.codes[j] >> (lj - li),
                        "code {i} is a prefix of code {j}"
                    );
                }
            }
        }
    }

    #[test]
    fn symbol_count_mismatch_rejected() {
        let err = HuffmanTable::new(&DC_LUMA_COUNTS, vec![0; 3]);
        assert!(matches!(err, Err(DecodeErrors::HuffmanDecode(_))));
    }

    #[test]
    fn over_subscribed_histogram_rejected() {
        // three codes cannot all be one bit long
        let mut counts = [0_u8; 16];
        counts[0] = 3;
        let err = HuffmanTable::new(&counts, vec![0, 1, 2]);
        assert!(matches!(err, Err(DecodeErrors::HuffmanDecode(_))));
    }

    #[test]
    fn excessive_symbols_rejected() {
        let mut counts = [0_u8; 16];
        counts[15] = 255;
        let err = HuffmanTable::new(&counts, vec![0; 255]);
        assert!(matches!(err, Err(DecodeErrors::HuffmanDecode(_))));
    }
}
