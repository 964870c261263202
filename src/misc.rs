//! Miscellaneous constants and small helpers shared across the decoder.
use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

use crate::errors::DecodeErrors;

/// Start of image, these are the first two bytes in the image
pub const START_OF_IMAGE: u16 = 0xffd8;
/// Start of extended sequential frame
pub const START_OF_FRAME_EXT_SEQ: u16 = 0xffc1;
/// Start of progressive DCT encoding
pub const START_OF_FRAME_PROG_DCT: u16 = 0xffc2;
/// Start of lossless sequential Huffman coding
pub const START_OF_FRAME_LOS_SEQ: u16 = 0xffc3;
/// Start of extended sequential DCT arithmetic coding
pub const START_OF_FRAME_EXT_AR: u16 = 0xffc9;
/// Start of progressive DCT arithmetic coding
pub const START_OF_FRAME_PROG_DCT_AR: u16 = 0xffca;
/// Start of lossless sequential arithmetic coding
pub const START_OF_FRAME_LOS_SEQ_AR: u16 = 0xffcb;

/// Maximum number of quantization/Huffman table slots
pub const MAX_TABLES: usize = 4;

/// Maximum number of symbols a Huffman table may carry
pub const MAX_HUFFMAN_SYMBOLS: usize = 162;

/// Maximum number of pixels before we refuse to allocate plane storage
pub const MAX_DIMENSIONS: usize = 1 << 27;

/// Unzigzag a zig-zagged JPEG block
///
/// This is used as an index mechanism,
/// i.e. calling `UN_ZIGZAG[5]` gives you 2 which means the
/// value at zigzag position 5 should be moved to natural position 2
#[rustfmt::skip]
pub const UN_ZIGZAG: [usize; 64] = [
    0,  1,  8,  16, 9,  2,  3, 10,
    17, 24, 32, 25, 18, 11, 4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13, 6,  7,  14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Read a single byte, turning premature EOF into a structural error.
#[inline]
pub fn read_u8<R>(reader: &mut R) -> Result<u8, DecodeErrors>
where
    R: Read,
{
    reader
        .read_u8()
        .map_err(|_| DecodeErrors::Format("file ended prematurely".to_string()))
}

/// Read a big-endian `u16`, turning premature EOF into a structural error.
#[inline]
pub fn read_u16_be<R>(reader: &mut R) -> Result<u16, DecodeErrors>
where
    R: Read,
{
    reader
        .read_u16::<BigEndian>()
        .map_err(|_| DecodeErrors::Format("file ended prematurely".to_string()))
}

/// Move a 64-entry block from zigzag scan order to natural row-major order.
pub fn un_zig_zag<T: Default + Copy>(a: &[T; 64]) -> [T; 64] {
    let mut output = [T::default(); 64];
    for i in 0..64 {
        output[UN_ZIGZAG[i]] = a[i];
    }
    output
}
