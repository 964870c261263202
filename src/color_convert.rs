//! YCbCr to RGB conversion
//!
//! The conversion equations are
//! ```text
//! R = Y + 1.402 * Cr
//! G = Y - 0.344136 * Cb - 0.714136 * Cr
//! B = Y + 1.772 * Cb
//! ```
//! with the `+128` level shift (deferred from the transform stage) applied
//! before clamping every channel to `[0, 255]`.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

/// Limit a value to the `[0, 255]` sample range.
#[inline]
fn clamp(a: i32) -> u8 {
    a.clamp(0, 255) as u8
}

/// Convert one YCbCr sample triple (level-shifted, centered near zero) to
/// an RGB triple.
#[inline]
pub(crate) fn ycbcr_to_rgb(y: i32, cb: i32, cr: i32) -> [u8; 3] {
    let y = y as f32;
    let cb = cb as f32;
    let cr = cr as f32;
    let r = y + 1.402 * cr + 128.0;
    let g = y - 0.344_136 * cb - 0.714_136 * cr + 128.0;
    let b = y + 1.772 * cb + 128.0;
    [clamp(r as i32), clamp(g as i32), clamp(b as i32)]
}

/// Level shift and clamp a single luma sample; grayscale images replicate
/// this into all three output channels.
#[inline]
pub(crate) fn luma_to_gray(y: i32) -> u8 {
    clamp(y + 128)
}
