//! Entropy decoding of coefficient blocks.
//!
//! Walks the destuffed entropy bytes MCU by MCU in raster order, producing
//! one 64-coefficient block per 8x8 sampling block per component, with DC
//! prediction carried across MCUs and reset at restart boundaries.
use crate::bitstream::{extend, BitReader};
use crate::decoder::Decoder;
use crate::errors::DecodeErrors;
use crate::huffman::HuffmanTable;
use crate::misc::UN_ZIGZAG;

/// The number of coefficients in a block
pub const DCT_BLOCK: usize = 64;

impl Decoder {
    /// Decode the whole entropy-coded segment into per-component coefficient
    /// planes.
    ///
    /// Plane `i` holds `mcu_x * mcu_y * blocks_per_mcu` blocks of 64
    /// natural-order coefficients, appended in MCU raster order (blocks
    /// within an MCU in vertical-then-horizontal sampling order).
    pub(crate) fn decode_mcu_baseline(
        &mut self,
        entropy_data: &[u8],
    ) -> Result<Vec<Vec<i32>>, DecodeErrors> {
        let mcu_count = self.mcu_x * self.mcu_y;
        let mut planes: Vec<Vec<i32>> = self
            .components
            .iter()
            .map(|c| vec![0_i32; mcu_count * c.blocks_per_mcu() * DCT_BLOCK])
            .collect();
        let mut offsets = vec![0_usize; self.components.len()];

        let mut stream = BitReader::new(entropy_data);
        for component in &mut self.components {
            component.dc_pred = 0;
        }

        for mcu_idx in 0..mcu_count {
            // restart boundaries are an exact multiple of the interval;
            // integer modulo, never a bitwise AND against the interval
            if self.restart_interval != 0 && mcu_idx % self.restart_interval == 0 {
                for component in &mut self.components {
                    component.dc_pred = 0;
                }
                stream.align();
            }
            for (pos, component) in self.components.iter_mut().enumerate() {
                let dc_table = self.dc_huffman_tables[component.dc_huff_table]
                    .as_ref()
                    .ok_or_else(|| {
                        DecodeErrors::HuffmanDecode("no DC table for component".to_string())
                    })?;
                let ac_table = self.ac_huffman_tables[component.ac_huff_table]
                    .as_ref()
                    .ok_or_else(|| {
                        DecodeErrors::HuffmanDecode("no AC table for component".to_string())
                    })?;
                for _ in 0..component.vertical_sample {
                    for _ in 0..component.horizontal_sample {
                        let mut block = [0_i32; DCT_BLOCK];
                        decode_block(
                            &mut stream,
                            &mut block,
                            &mut component.dc_pred,
                            dc_table,
                            ac_table,
                        )?;
                        let offset = offsets[pos];
                        planes[pos][offset..offset + DCT_BLOCK].copy_from_slice(&block);
                        offsets[pos] += DCT_BLOCK;
                    }
                }
            }
        }
        debug!("Finished decoding coefficient blocks");
        Ok(planes)
    }
}

/// Decode one 8x8 coefficient block: the DC difference, then AC
/// coefficients at zigzag positions 1..=63.
///
/// Coefficients are written to their natural row-major position through the
/// zigzag map.
fn decode_block(
    stream: &mut BitReader,
    block: &mut [i32; DCT_BLOCK],
    dc_pred: &mut i32,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
) -> Result<(), DecodeErrors> {
    // Section F.2.2.1: decode the DC coefficient difference
    let length = stream.decode_symbol(dc_table)?;
    if length > 11 {
        return Err(DecodeErrors::MCUError(format!(
            "DC coefficient length {length} greater than 11"
        )));
    }
    let mut delta = 0;
    if length != 0 {
        delta = extend(stream.read_bits(length)?, length);
    }
    // DC coefficients are relative to the previous block of the component
    if (*dc_pred >= 0 && delta > i32::MAX - *dc_pred)
        || (*dc_pred < 0 && delta < i32::MIN - *dc_pred)
    {
        return Err(DecodeErrors::MCUError("bad DC coefficient".to_string()));
    }
    *dc_pred += delta;
    block[0] = *dc_pred;

    // Section F.2.2.2: decode the AC coefficients
    let mut i = 1_usize;
    while i < DCT_BLOCK {
        let symbol = stream.decode_symbol(ac_table)?;
        // 0x00 means every remaining position is zero
        if symbol == 0x00 {
            return Ok(());
        }
        // 0xF0 means skip sixteen zero positions with no value
        let (run, coeff_length) = if symbol == 0xf0 {
            (16_usize, 0_u8)
        } else {
            (usize::from(symbol >> 4), symbol & 0x0f)
        };
        if i + run >= DCT_BLOCK {
            return Err(DecodeErrors::MCUError(
                "zero run-length exceeded block".to_string(),
            ));
        }
        i += run;
        if coeff_length > 10 {
            return Err(DecodeErrors::MCUError(format!(
                "AC coefficient length {coeff_length} greater than 10"
            )));
        }
        if coeff_length != 0 {
            let coeff = extend(stream.read_bits(coeff_length)?, coeff_length);
            block[UN_ZIGZAG[i]] = coeff;
            i += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // one code `0` -> symbol; enough for deterministic streams
    fn single_symbol_table(symbol: u8) -> HuffmanTable {
        let mut counts = [0_u8; 16];
        counts[0] = 1;
        HuffmanTable::new(&counts, vec![symbol]).unwrap()
    }

    // DC table decoding magnitudes of length 2 with code `0`
    fn dc_len2_table() -> HuffmanTable {
        single_symbol_table(0x02)
    }

    #[test]
    fn dc_predictor_accumulates_deltas() {
        let dc_table = dc_len2_table();
        let ac_table = single_symbol_table(0x00);
        // each block: DC symbol `0`, magnitude `11` (= +3), EOB `0`
        // bits per block: 0 11 0 -> three blocks pack into 12 bits
        let data = [0b0110_0110, 0b0110_0000];
        let mut stream = BitReader::new(&data);
        let mut dc_pred = 0;

        for expected in [3, 6, 9] {
            let mut block = [0_i32; 64];
            decode_block(&mut stream, &mut block, &mut dc_pred, &dc_table, &ac_table).unwrap();
            assert_eq!(block[0], expected);
            assert_eq!(dc_pred, expected);
        }
    }

    #[test]
    fn negative_dc_magnitude_sign_extends() {
        let dc_table = dc_len2_table();
        let ac_table = single_symbol_table(0x00);
        // magnitude bits `00` with length 2 decode to -3
        let data = [0b0000_0000];
        let mut stream = BitReader::new(&data);
        let mut dc_pred = 0;
        let mut block = [0_i32; 64];
        decode_block(&mut stream, &mut block, &mut dc_pred, &dc_table, &ac_table).unwrap();
        assert_eq!(block[0], -3);
    }

    #[test]
    fn ac_coefficient_lands_in_natural_position() {
        let dc_table = single_symbol_table(0x00);
        // AC table with two codes: `0` -> 0x11 (run 1, length 1), `10` -> 0x00
        let mut counts = [0_u8; 16];
        counts[0] = 1;
        counts[1] = 1;
        let ac_table = HuffmanTable::new(&counts, vec![0x11, 0x00]).unwrap();

        // DC `0` (zero delta), AC `0` + bit `1` (coeff +1 after run 1), EOB `10`
        let data = [0b0_0_1_10_000];
        let mut stream = BitReader::new(&data);
        let mut dc_pred = 0;
        let mut block = [0_i32; 64];
        decode_block(&mut stream, &mut block, &mut dc_pred, &dc_table, &ac_table).unwrap();
        // run of 1 puts the value at zigzag position 2 = natural position 8
        assert_eq!(block[UN_ZIGZAG[2]], 1);
        assert_eq!(block.iter().filter(|x| **x != 0).count(), 1);
    }

    #[test]
    fn zero_run_overflow_is_fatal() {
        let dc_table = single_symbol_table(0x00);
        // every AC symbol is 0xF0, sixteen-zero runs overrun position 63
        let ac_table = single_symbol_table(0xf0);
        let data = [0b0000_0000];
        let mut stream = BitReader::new(&data);
        let mut dc_pred = 0;
        let mut block = [0_i32; 64];
        let err = decode_block(&mut stream, &mut block, &mut dc_pred, &dc_table, &ac_table);
        assert!(matches!(err, Err(DecodeErrors::MCUError(_))));
    }

    #[test]
    fn oversized_dc_length_is_fatal() {
        let dc_table = single_symbol_table(0x0c);
        let ac_table = single_symbol_table(0x00);
        let data = [0b0000_0000, 0, 0];
        let mut stream = BitReader::new(&data);
        let mut dc_pred = 0;
        let mut block = [0_i32; 64];
        let err = decode_block(&mut stream, &mut block, &mut dc_pred, &dc_table, &ac_table);
        assert!(matches!(err, Err(DecodeErrors::MCUError(_))));
    }

    #[test]
    fn truncated_stream_is_fatal() {
        let dc_table = dc_len2_table();
        let ac_table = single_symbol_table(0x00);
        // DC symbol fits but its magnitude bits run off the end
        let data = [0b0_1_000000];
        let mut stream = BitReader::new(&data);
        stream.read_bits(7).unwrap();
        let mut dc_pred = 0;
        let mut block = [0_i32; 64];
        let err = decode_block(&mut stream, &mut block, &mut dc_pred, &dc_table, &ac_table);
        assert!(err.is_err());
    }
}
