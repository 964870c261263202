//! Contains most common errors that may be encountered in decoding a JPEG image
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

use crate::misc::{
    START_OF_FRAME_EXT_AR, START_OF_FRAME_EXT_SEQ, START_OF_FRAME_LOS_SEQ,
    START_OF_FRAME_LOS_SEQ_AR, START_OF_FRAME_PROG_DCT, START_OF_FRAME_PROG_DCT_AR,
};

/// Common decode errors
///
/// Every failure is classified into one of four families:
/// structural corruption (`IllegalMagicBytes`, `Format`, `DqtError`,
/// `SofError`, `SosError`, `ZeroError`), unsupported capabilities
/// (`Unsupported`), corrupt entropy data (`HuffmanDecode`, `MCUError`)
/// and allocation guards (`LargeImage`).
#[allow(clippy::module_name_repetitions)]
pub enum DecodeErrors {
    /// Illegal magic bytes, the file does not start with `0xffd8`
    IllegalMagicBytes(u16),
    /// Structural errors in the marker stream
    Format(String),
    /// Problems with the Huffman tables or the entropy-coded data
    HuffmanDecode(String),
    /// Image has a zero width or height
    ZeroError,
    /// Quantization table segment errors
    DqtError(String),
    /// Start of scan errors
    SosError(String),
    /// Start of frame errors
    SofError(String),
    /// Error decoding the entropy-coded segment into coefficient blocks
    MCUError(String),
    /// Image dimensions would require more storage than the decoder allows
    LargeImage(usize),
    /// Unsupported images
    Unsupported(UnsupportedSchemes),
}

impl DecodeErrors {
    fn write(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self {
            Self::IllegalMagicBytes(bytes) => {
                write!(f, "Error parsing image. Illegal start bytes:{bytes:#x}")
            }
            Self::Format(ref reason) => write!(f, "Invalid JPEG structure. Reason:{reason}"),
            Self::HuffmanDecode(ref reason) => {
                write!(f, "Error decoding huffman values. Reason:{reason}")
            }
            Self::ZeroError => write!(f, "Image width or height is set to zero, cannot continue"),
            Self::DqtError(ref reason) => write!(f, "Error parsing DQT segment. Reason:{reason}"),
            Self::SosError(ref reason) => write!(f, "Error parsing SOS segment. Reason:{reason}"),
            Self::SofError(ref reason) => write!(f, "Error parsing SOF segment. Reason:{reason}"),
            Self::MCUError(ref reason) => write!(f, "Error in decoding MCU. Reason:{reason}"),
            Self::LargeImage(pixels) => {
                write!(f, "Image contains {pixels} pixels, larger than the decoder limit")
            }
            Self::Unsupported(ref image_type) => write!(f, "{image_type:?}"),
        }
    }
}

impl Debug for DecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write(f)
    }
}

impl Display for DecodeErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.write(f)
    }
}

impl Error for DecodeErrors {}

/// Encoding schemes and color modes the decoder recognizes but does not
/// support.
#[derive(Eq, PartialEq, Copy, Clone)]
pub enum UnsupportedSchemes {
    /// SOF_1 Extended sequential DCT, Huffman coding
    ExtendedSequentialHuffman,
    /// Progressive DCT, Huffman coding
    ProgressiveDctHuffman,
    /// Lossless (sequential), Huffman coding
    LosslessHuffman,
    /// Extended sequential DCT, arithmetic coding
    ExtendedSequentialDctArithmetic,
    /// Progressive DCT, arithmetic coding
    ProgressiveDctArithmetic,
    /// Lossless (sequential), arithmetic coding
    LosslessArithmetic,
    /// Arithmetic coding conditioning (DAC marker)
    ArithmeticCoding,
    /// Four component (CMYK) images
    Cmyk,
    /// YIQ color mode (component ids 4 and 5)
    Yiq,
    /// Sample precision other than 8 bits
    Precision(u8),
    /// Sampling factors outside the supported `1..=4` range
    SamplingFactor(u8, u8),
    /// Non-default spectral selection or successive approximation, which is
    /// progressive/lossless scan syntax
    NonBaselineScan,
}

impl Debug for UnsupportedSchemes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self {
            Self::ExtendedSequentialHuffman => {
                write!(f, "The library cannot decode images encoded with the Extended Sequential Huffman scheme")
            }
            Self::ProgressiveDctHuffman => {
                write!(f, "The library cannot decode images encoded with the Progressive Huffman scheme")
            }
            Self::LosslessHuffman => {
                write!(f, "The library cannot decode images encoded with the Lossless Huffman scheme")
            }
            Self::ExtendedSequentialDctArithmetic => {
                write!(f, "The library cannot decode images encoded with the Extended Sequential DCT Arithmetic scheme")
            }
            Self::ProgressiveDctArithmetic => {
                write!(f, "The library cannot decode images encoded with the Progressive DCT Arithmetic scheme")
            }
            Self::LosslessArithmetic => {
                write!(f, "The library cannot decode images encoded with the Lossless Arithmetic scheme")
            }
            Self::ArithmeticCoding => {
                write!(f, "The library cannot decode images using arithmetic coding")
            }
            Self::Cmyk => write!(f, "CMYK (4 component) color mode is not supported"),
            Self::Yiq => write!(f, "YIQ color mode is not supported"),
            Self::Precision(p) => {
                write!(f, "The library can only decode 8-bit images, image has {p} bits")
            }
            Self::SamplingFactor(h, v) => {
                write!(f, "Sampling factors {h}x{v} are not supported, expected values between 1 and 4")
            }
            Self::NonBaselineScan => {
                write!(f, "Spectral selection/successive approximation fields differ from baseline values, image is not baseline")
            }
        }
    }
}

impl UnsupportedSchemes {
    /// Map a two-byte start-of-frame marker to the scheme it declares.
    #[must_use]
    pub fn from_int(int: u16) -> Option<UnsupportedSchemes> {
        match int {
            START_OF_FRAME_PROG_DCT => Some(Self::ProgressiveDctHuffman),
            START_OF_FRAME_PROG_DCT_AR => Some(Self::ProgressiveDctArithmetic),
            START_OF_FRAME_LOS_SEQ => Some(Self::LosslessHuffman),
            START_OF_FRAME_LOS_SEQ_AR => Some(Self::LosslessArithmetic),
            START_OF_FRAME_EXT_SEQ => Some(Self::ExtendedSequentialHuffman),
            START_OF_FRAME_EXT_AR => Some(Self::ExtendedSequentialDctArithmetic),
            _ => None,
        }
    }
}
