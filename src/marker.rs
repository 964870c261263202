//! Marker byte to marker mapping.
//!
//! A marker is the byte following a `0xFF` in the stream; the mapping here is
//! a closed, finite set dispatched on by the top-level parser.

/// Markers that may appear in a JPEG stream.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Marker {
    /// Start of image
    SOI,
    /// Start of frame, the value is the low nibble family (0 = baseline)
    SOF(u8),
    /// Define Huffman table(s)
    DHT,
    /// Define arithmetic coding conditioning
    DAC,
    /// Define quantization table(s)
    DQT,
    /// Define restart interval
    DRI,
    /// Restart marker `RSTn`
    RST(u8),
    /// Start of scan
    SOS,
    /// End of image
    EOI,
    /// Application specific segment `APPn`
    APP(u8),
    /// Comment
    COM,
    /// Define number of lines
    DNL,
    /// Define hierarchical progression
    DHP,
    /// Expand reference component
    EXP,
    /// Reserved `JPGn` extension markers
    JPG(u8),
    /// Temporary private use, size-less
    TEM,
    /// Fill byte, any number of `0xFF`s may precede a marker
    FILL,
}

impl Marker {
    /// Map a marker byte (the byte after `0xFF`) to a marker.
    ///
    /// Returns `None` for bytes that are not assigned to any marker.
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Marker> {
        match value {
            0xd8 => Some(Marker::SOI),
            // 0xc4, 0xc8 and 0xcc carve DHT, JPG and DAC out of the SOF range
            0xc4 => Some(Marker::DHT),
            0xc8 => Some(Marker::JPG(8)),
            0xcc => Some(Marker::DAC),
            v @ 0xc0..=0xcf => Some(Marker::SOF(v & 0x0f)),
            v @ 0xd0..=0xd7 => Some(Marker::RST(v & 0x07)),
            0xd9 => Some(Marker::EOI),
            0xda => Some(Marker::SOS),
            0xdb => Some(Marker::DQT),
            0xdc => Some(Marker::DNL),
            0xdd => Some(Marker::DRI),
            0xde => Some(Marker::DHP),
            0xdf => Some(Marker::EXP),
            v @ 0xe0..=0xef => Some(Marker::APP(v & 0x0f)),
            v @ 0xf0..=0xfd => Some(Marker::JPG(v & 0x0f)),
            0xfe => Some(Marker::COM),
            0x01 => Some(Marker::TEM),
            0xff => Some(Marker::FILL),
            _ => None,
        }
    }
}
