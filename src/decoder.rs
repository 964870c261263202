//! Main decoder logic.
//!
//! Walks the marker stream, collects tables and frame geometry into the
//! decoder state, extracts the destuffed entropy-coded segment and drives
//! the block pipeline (entropy decode, dequantize + IDCT, color
//! reconstruction).
use std::fs::read;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::components::Components;
use crate::errors::{DecodeErrors, UnsupportedSchemes};
use crate::headers::{parse_dqt, parse_dri, parse_huffman, parse_sos, parse_start_of_frame, skip_segment};
use crate::huffman::HuffmanTable;
use crate::marker::Marker;
use crate::misc::{read_u8, read_u16_be, MAX_DIMENSIONS, MAX_TABLES, START_OF_IMAGE};
use crate::worker::color_reconstruct;

/// A decoder instance
pub struct Decoder {
    /// Image information from the frame header
    pub(crate) info: ImageInfo,
    /// Quantization tables, stored in natural order
    pub(crate) qt_tables: [Option<[i32; 64]>; MAX_TABLES],
    /// DC Huffman tables, one slot per table id
    pub(crate) dc_huffman_tables: [Option<HuffmanTable>; MAX_TABLES],
    /// AC Huffman tables, one slot per table id
    pub(crate) ac_huffman_tables: [Option<HuffmanTable>; MAX_TABLES],
    /// Image components, holding sampling factors, table references and
    /// DC prediction per component
    pub(crate) components: Vec<Components>,
    /// Some encoders emit component ids starting from 0 instead of 1;
    /// once detected, every SOF/SOS id is remapped up by one
    pub(crate) zero_based: bool,
    /// MCUs between restart boundaries, 0 means never restart
    pub(crate) restart_interval: usize,
    /// Start of spectral selection, fixed at 0 for baseline
    pub(crate) spec_start: u8,
    /// End of spectral selection, fixed at 63 for baseline
    pub(crate) spec_end: u8,
    /// Successive approximation high nibble, fixed at 0 for baseline
    pub(crate) succ_high: u8,
    /// Successive approximation low nibble, fixed at 0 for baseline
    pub(crate) succ_low: u8,
    /// Maximum horizontal sampling factor of all components
    pub(crate) h_max: usize,
    /// Maximum vertical sampling factor of all components
    pub(crate) v_max: usize,
    /// Number of MCUs in the x plane
    pub(crate) mcu_x: usize,
    /// Number of MCUs in the y plane
    pub(crate) mcu_y: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder {
            info: ImageInfo::default(),
            qt_tables: [None, None, None, None],
            dc_huffman_tables: [None, None, None, None],
            ac_huffman_tables: [None, None, None, None],
            components: vec![],
            zero_based: false,
            restart_interval: 0,
            spec_start: 0,
            spec_end: 63,
            succ_high: 0,
            succ_low: 0,
            h_max: 1,
            v_max: 1,
            mcu_x: 0,
            mcu_y: 0,
        }
    }
}

impl Decoder {
    /// Create a new decoder instance
    #[must_use]
    pub fn new() -> Decoder {
        Decoder::default()
    }

    /// Image width in pixels, valid after headers have been decoded
    #[must_use]
    pub fn width(&self) -> u16 {
        self.info.width
    }

    /// Image height in pixels, valid after headers have been decoded
    #[must_use]
    pub fn height(&self) -> u16 {
        self.info.height
    }

    /// Information parsed out of the frame header
    #[must_use]
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// Decode a JPEG file into an RGB raster
    ///
    /// # Errors
    /// - `Format` - The file could not be read or its structure is invalid
    /// - `IllegalMagicBytes` - The first two bytes of the image are not `0xffd8`
    /// - `Unsupported` - The image encoding scheme is not baseline DCT
    pub fn decode_file<P>(file: P) -> Result<Vec<u8>, DecodeErrors>
    where
        P: AsRef<Path>,
    {
        let buffer = read(file)
            .map_err(|e| DecodeErrors::Format(format!("could not read input file: {e}")))?;
        Decoder::new().decode(&buffer)
    }

    /// Decode a buffer already in memory into an RGB raster
    ///
    /// # Errors
    /// Same classification as [`Decoder::decode_file`].
    pub fn decode_buffer(buf: &[u8]) -> Result<Vec<u8>, DecodeErrors> {
        Decoder::new().decode(buf)
    }

    /// Decode a JPEG byte stream into a row-major, top-to-bottom RGB raster
    /// of `width() * height() * 3` bytes.
    ///
    /// Grayscale images replicate the luma channel into all three output
    /// channels. Either the whole image decodes or a classified error is
    /// returned; no partial raster is ever produced.
    ///
    /// # Errors
    /// See [`crate::errors::DecodeErrors`] for the failure taxonomy.
    pub fn decode(&mut self, buf: &[u8]) -> Result<Vec<u8>, DecodeErrors> {
        let mut buf = Cursor::new(buf);
        let entropy_data = self.decode_headers(&mut buf)?;
        self.check_table_references()?;
        self.set_mcu_dimensions()?;

        let planes = self.decode_mcu_baseline(&entropy_data)?;
        color_reconstruct(self, &planes)
    }

    /// Decode JPEG headers up to and including the start of scan, then pull
    /// out the destuffed entropy-coded segment.
    ///
    /// # Supported headers
    /// - SOF(0), DQT, DHT, DRI, SOS
    /// - APPn/COM/JPGn/DNL/DHP/EXP (skipped verbatim), TEM (size-less no-op)
    ///
    /// # Rejected headers
    /// - SOF(n != 0) - non-baseline frames
    /// - DAC - arithmetic coding
    /// - Embedded SOI, EOI before SOS, RSTn before SOS
    fn decode_headers<R>(&mut self, buf: &mut R) -> Result<Vec<u8>, DecodeErrors>
    where
        R: Read,
    {
        // the first marker must be start of image
        let magic_bytes = read_u16_be(buf)?;
        if magic_bytes != START_OF_IMAGE {
            return Err(DecodeErrors::IllegalMagicBytes(magic_bytes));
        }
        loop {
            let last = read_u8(buf)?;
            if last != 0xff {
                return Err(DecodeErrors::Format(format!(
                    "expected a marker, found byte {last:#x}"
                )));
            }
            // any number of fill bytes may precede the marker code
            let mut code = read_u8(buf)?;
            while code == 0xff {
                code = read_u8(buf)?;
            }
            let marker = Marker::from_u8(code).ok_or_else(|| {
                DecodeErrors::Format(format!("unknown marker {code:#x}"))
            })?;
            match marker {
                Marker::SOF(0) => {
                    debug!("Image encoding scheme = Baseline DCT");
                    parse_start_of_frame(self, buf)?;
                }
                Marker::SOF(v) => {
                    // differential/hierarchical SOFs have no scheme mapping
                    // and fall through to a plain structural error
                    if let Some(feature) = UnsupportedSchemes::from_int(0xff00 | u16::from(code)) {
                        return Err(DecodeErrors::Unsupported(feature));
                    }
                    return Err(DecodeErrors::Format(format!(
                        "unsupported start of frame marker SOF{v}"
                    )));
                }
                Marker::DQT => {
                    debug!("Extracting quantization tables");
                    parse_dqt(self, buf)?;
                }
                Marker::DHT => {
                    debug!("Extracting Huffman table(s)");
                    parse_huffman(self, buf)?;
                }
                Marker::DRI => parse_dri(self, buf)?,
                Marker::SOS => {
                    debug!("Parsing start of scan");
                    parse_sos(self, buf)?;
                    // what follows is the entropy-coded image data
                    break;
                }
                Marker::APP(n) => {
                    debug!("Skipping APP({n}) segment");
                    skip_segment(buf)?;
                }
                Marker::COM | Marker::JPG(_) | Marker::DNL | Marker::DHP | Marker::EXP => {
                    skip_segment(buf)?;
                }
                // TEM carries no length field
                Marker::TEM | Marker::FILL => {}
                Marker::SOI => {
                    return Err(DecodeErrors::Format(
                        "embedded JPEGs are not supported".to_string(),
                    ))
                }
                Marker::EOI => {
                    return Err(DecodeErrors::Format(
                        "EOI marker detected before start of scan".to_string(),
                    ))
                }
                Marker::DAC => {
                    return Err(DecodeErrors::Unsupported(
                        UnsupportedSchemes::ArithmeticCoding,
                    ))
                }
                Marker::RST(_) => {
                    return Err(DecodeErrors::Format(
                        "restart marker detected before start of scan".to_string(),
                    ))
                }
            }
        }
        self.read_entropy_data(buf)
    }

    /// Read the entropy-coded segment byte-wise until the end of image
    /// marker.
    ///
    /// `0xFF 0x00` is destuffed to a literal `0xFF` data byte, restart
    /// markers are consumed and dropped (boundaries are re-derived from the
    /// restart interval by the entropy decoder), and any other marker here
    /// is a hard error.
    fn read_entropy_data<R>(&mut self, buf: &mut R) -> Result<Vec<u8>, DecodeErrors>
    where
        R: Read,
    {
        let mut data = Vec::with_capacity(1 << 16);
        let mut current = read_u8(buf)?;
        loop {
            let last = current;
            current = read_u8(buf)?;
            if last == 0xff {
                match current {
                    // end of image
                    0xd9 => break,
                    // stuffed zero byte, 0xff is literal data
                    0x00 => {
                        data.push(0xff);
                        current = read_u8(buf)?;
                    }
                    // restart marker, dropped; the decoder re-derives the
                    // boundary from the restart interval count
                    0xd0..=0xd7 => {
                        current = read_u8(buf)?;
                    }
                    // fill bytes
                    0xff => {}
                    _ => {
                        return Err(DecodeErrors::Format(format!(
                            "invalid marker {current:#x} inside compressed data"
                        )))
                    }
                }
            } else {
                data.push(last);
            }
        }
        debug!("Entropy segment length: {} bytes", data.len());
        Ok(data)
    }

    /// Cross-check, once after parsing completes, that every table a
    /// component references was actually populated.
    fn check_table_references(&self) -> Result<(), DecodeErrors> {
        for component in &self.components {
            let id = component.component_id;
            if self.qt_tables[usize::from(component.quantization_table_number)].is_none() {
                return Err(DecodeErrors::DqtError(format!(
                    "component {id:?} references an uninitialized quantization table"
                )));
            }
            if self.dc_huffman_tables[component.dc_huff_table].is_none() {
                return Err(DecodeErrors::HuffmanDecode(format!(
                    "component {id:?} references an uninitialized DC table"
                )));
            }
            if self.ac_huffman_tables[component.ac_huff_table].is_none() {
                return Err(DecodeErrors::HuffmanDecode(format!(
                    "component {id:?} references an uninitialized AC table"
                )));
            }
        }
        Ok(())
    }

    /// Derive the MCU grid from image dimensions and sampling factors, and
    /// guard plane allocation against absurd dimensions.
    fn set_mcu_dimensions(&mut self) -> Result<(), DecodeErrors> {
        self.h_max = self
            .components
            .iter()
            .map(|c| c.horizontal_sample)
            .max()
            .unwrap_or(1);
        self.v_max = self
            .components
            .iter()
            .map(|c| c.vertical_sample)
            .max()
            .unwrap_or(1);
        self.mcu_x = (usize::from(self.info.width) + 8 * self.h_max - 1) / (8 * self.h_max);
        self.mcu_y = (usize::from(self.info.height) + 8 * self.v_max - 1) / (8 * self.v_max);

        let pixels = self.mcu_x * self.mcu_y * 64 * self.h_max * self.v_max;
        if pixels > MAX_DIMENSIONS {
            return Err(DecodeErrors::LargeImage(pixels));
        }
        Ok(())
    }
}

/// A struct representing image information from the frame header
#[derive(Default, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct ImageInfo {
    /// Width of the image
    pub width: u16,
    /// Height of the image
    pub height: u16,
    /// Sample precision in bits, always 8 for baseline
    pub pixel_density: u8,
    /// Number of components, 1 (grayscale) or 3 (YCbCr)
    pub(crate) components: u8,
}

impl ImageInfo {
    /// Set width of the image, found in the start of frame
    pub(crate) fn set_width(&mut self, width: u16) {
        self.width = width;
    }

    /// Set height of the image, found in the start of frame
    pub(crate) fn set_height(&mut self, height: u16) {
        self.height = height;
    }

    /// Set the sample precision, found in the start of frame
    pub(crate) fn set_density(&mut self, density: u8) {
        self.pixel_density = density;
    }
}
