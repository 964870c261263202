//! Post-entropy pipeline: dequantization, inverse transform, chroma
//! upsampling and color conversion.
//!
//! Everything after entropy decoding is independent per MCU, so the output
//! raster is split into per-MCU-row slices and the rows are processed on a
//! scoped thread pool with no shared mutable state.
use scoped_threadpool::Pool;

use crate::color_convert::{luma_to_gray, ycbcr_to_rgb};
use crate::components::Components;
use crate::decoder::Decoder;
use crate::errors::DecodeErrors;
use crate::idct::{dequantize_block, idct_block};
use crate::mcu::DCT_BLOCK;

/// Turn per-component coefficient planes into the final RGB raster.
pub(crate) fn color_reconstruct(
    decoder: &Decoder,
    planes: &[Vec<i32>],
) -> Result<Vec<u8>, DecodeErrors> {
    let width = usize::from(decoder.width());
    let height = usize::from(decoder.height());
    let (h_max, v_max, mcu_x) = (decoder.h_max, decoder.v_max, decoder.mcu_x);

    // resolve quantization tables up front; the post-parse cross check
    // already guaranteed every reference is populated
    let mut qt_tables = Vec::with_capacity(decoder.components.len());
    for component in &decoder.components {
        let table = decoder.qt_tables[usize::from(component.quantization_table_number)]
            .ok_or_else(|| {
                DecodeErrors::DqtError("component references an uninitialized table".to_string())
            })?;
        qt_tables.push(table);
    }
    let components = decoder.components.as_slice();

    let mut output = vec![0_u8; width * height * 3];
    // one work unit per MCU row; the last chunk may cover fewer pixel rows
    let chunk_len = width * 3 * 8 * v_max;

    let threads = num_cpus::get().min(decoder.mcu_y).max(1);
    let mut pool = Pool::new(threads as u32);
    pool.scoped(|scope| {
        for (mcu_row, out_chunk) in output.chunks_mut(chunk_len).enumerate() {
            let qt_tables = &qt_tables;
            scope.execute(move || {
                process_mcu_row(
                    mcu_row, out_chunk, planes, components, qt_tables, width, h_max, v_max, mcu_x,
                );
            });
        }
    });
    debug!("Finished color reconstruction");
    Ok(output)
}

/// Map an in-MCU pixel coordinate to a component's sample coordinate given
/// its sampling factors; subsampled chroma upsamples by nearest neighbor
/// (integer division), never by interpolation.
#[inline]
fn sample_coords(
    px: usize,
    py: usize,
    component: &Components,
    h_max: usize,
    v_max: usize,
) -> (usize, usize) {
    (
        px * component.horizontal_sample / h_max,
        py * component.vertical_sample / v_max,
    )
}

/// Dequantize, inverse transform and color convert every MCU of one MCU
/// row, writing the row's pixels into `out`.
#[allow(clippy::too_many_arguments)]
fn process_mcu_row(
    mcu_row: usize,
    out: &mut [u8],
    planes: &[Vec<i32>],
    components: &[Components],
    qt_tables: &[[i32; 64]],
    width: usize,
    h_max: usize,
    v_max: usize,
    mcu_x: usize,
) {
    // spatial-domain planes for this row, one per component
    let mut spatial: Vec<Vec<i32>> = Vec::with_capacity(components.len());
    for (pos, component) in components.iter().enumerate() {
        let row_len = mcu_x * component.blocks_per_mcu() * DCT_BLOCK;
        let coeffs = &planes[pos][mcu_row * row_len..(mcu_row + 1) * row_len];

        let mut samples = vec![0_i32; row_len];
        let mut block = [0_i32; DCT_BLOCK];
        for (i, chunk) in coeffs.chunks_exact(DCT_BLOCK).enumerate() {
            block.copy_from_slice(chunk);
            dequantize_block(&mut block, &qt_tables[pos]);
            idct_block(&mut block);
            samples[i * DCT_BLOCK..(i + 1) * DCT_BLOCK].copy_from_slice(&block);
        }
        spatial.push(samples);
    }

    let mcu_width_px = 8 * h_max;
    let rows_in_chunk = out.len() / (width * 3);
    for py in 0..rows_in_chunk {
        for x in 0..width {
            let mcu_col = x / mcu_width_px;
            let px = x % mcu_width_px;

            let mut samples = [0_i32; 3];
            for (pos, component) in components.iter().enumerate() {
                let (sx, sy) = sample_coords(px, py, component, h_max, v_max);
                let block_index = mcu_col * component.blocks_per_mcu()
                    + (sy / 8) * component.horizontal_sample
                    + sx / 8;
                samples[pos] = spatial[pos][block_index * DCT_BLOCK + (sy % 8) * 8 + (sx % 8)];
            }
            let rgb = if components.len() == 1 {
                let gray = luma_to_gray(samples[0]);
                [gray, gray, gray]
            } else {
                ycbcr_to_rgb(samples[0], samples[1], samples[2])
            };
            let offset = (py * width + x) * 3;
            out[offset..offset + 3].copy_from_slice(&rgb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Components;

    fn component(h: u8, v: u8) -> Components {
        Components::from(2, (h << 4) | v, 0).unwrap()
    }

    #[test]
    fn subsampled_chroma_is_shared_per_neighborhood() {
        // 2x2 luma sampling against 1x1 chroma: every 2x2 luma neighborhood
        // inside the MCU maps to one single chroma sample
        let chroma = component(1, 1);
        for py in (0..16).step_by(2) {
            for px in (0..16).step_by(2) {
                let expected = sample_coords(px, py, &chroma, 2, 2);
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    assert_eq!(sample_coords(px + dx, py + dy, &chroma, 2, 2), expected);
                }
            }
        }
    }

    #[test]
    fn full_resolution_component_maps_identically() {
        let luma = component(2, 2);
        for py in 0..16 {
            for px in 0..16 {
                assert_eq!(sample_coords(px, py, &luma, 2, 2), (px, py));
            }
        }
    }

    #[test]
    fn horizontal_only_subsampling() {
        // 4:2:2, chroma shared between horizontal pairs only
        let chroma = component(1, 1);
        assert_eq!(sample_coords(0, 0, &chroma, 2, 1), (0, 0));
        assert_eq!(sample_coords(1, 0, &chroma, 2, 1), (0, 0));
        assert_eq!(sample_coords(2, 0, &chroma, 2, 1), (1, 0));
        assert_eq!(sample_coords(0, 1, &chroma, 2, 1), (0, 1));
    }
}
