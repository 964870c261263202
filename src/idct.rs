//! Dequantization and the inverse DCT.
//!
//! The transform is the standard separable formulation: a 1-D inverse DCT
//! down every column, then across every row, using a precomputed basis
//! table with the DC term scaled by `1/sqrt(2)` relative to the AC terms.
//! The `+128` level shift is folded into color reconstruction, so spatial
//! samples leave here still centered near zero.
#![allow(clippy::cast_possible_truncation)]

use std::sync::OnceLock;

/// Scaled cosine basis, `basis[u * 8 + x] = c(u)/2 * cos((2x + 1) u pi / 16)`.
///
/// The `/2` per axis absorbs the transform's overall `/4` normalization.
fn idct_basis() -> &'static [f32; 64] {
    static BASIS: OnceLock<[f32; 64]> = OnceLock::new();
    BASIS.get_or_init(|| {
        let mut map = [0.0_f32; 64];
        for u in 0..8 {
            let c = if u == 0 {
                1.0 / (2.0_f64).sqrt() / 2.0
            } else {
                0.5
            };
            for x in 0..8 {
                map[u * 8 + x] =
                    (c * ((2.0 * x as f64 + 1.0) * u as f64 * std::f64::consts::PI / 16.0).cos())
                        as f32;
            }
        }
        map
    })
}

/// Scale each of the 64 natural-order coefficients by the matching entry of
/// the component's quantization table.
#[inline]
pub(crate) fn dequantize_block(block: &mut [i32; 64], qt_table: &[i32; 64]) {
    for (coeff, q) in block.iter_mut().zip(qt_table.iter()) {
        *coeff *= q;
    }
}

/// Perform the inverse DCT on one block, frequency-domain coefficients in,
/// spatial-domain samples out.
pub(crate) fn idct_block(block: &mut [i32; 64]) {
    let basis = idct_basis();
    let mut tmp = [0.0_f32; 64];

    // 1-D inverse transform down the columns
    for i in 0..8 {
        for y in 0..8 {
            let mut sum = 0.0_f32;
            for v in 0..8 {
                sum += block[v * 8 + i] as f32 * basis[v * 8 + y];
            }
            tmp[y * 8 + i] = sum;
        }
    }
    // then across the rows
    for i in 0..8 {
        for x in 0..8 {
            let mut sum = 0.0_f32;
            for u in 0..8 {
                sum += tmp[i * 8 + u] * basis[u * 8 + x];
            }
            block[i * 8 + x] = sum.round() as i32;
        }
    }
}
