//! Per-component state carried from the frame header through entropy
//! decoding.
use crate::errors::{DecodeErrors, UnsupportedSchemes};

/// Component data from the start of frame, plus the scan-time table
/// references and DC prediction filled in later.
#[derive(Clone)]
pub(crate) struct Components {
    pub component_id: ComponentID,
    /// Horizontal sampling factor, 1..=4
    pub horizontal_sample: usize,
    /// Vertical sampling factor, 1..=4
    pub vertical_sample: usize,
    /// Quantization table slot this component references
    pub quantization_table_number: u8,
    /// DC Huffman table slot, set by the scan header
    pub dc_huff_table: usize,
    /// AC Huffman table slot, set by the scan header
    pub ac_huff_table: usize,
    /// Running DC predictor for this component
    pub dc_pred: i32,
    /// Duplicate detection within a single SOF/SOS segment
    pub seen: bool,
}

impl Components {
    /// Create a new instance from three bytes of a start of frame segment.
    ///
    /// `id` is the component id after zero-based remapping, so always 1..=3.
    pub fn from(id: u8, sampling_factor: u8, qt_number: u8) -> Result<Components, DecodeErrors> {
        let component_id = match id {
            1 => ComponentID::Y,
            2 => ComponentID::Cb,
            3 => ComponentID::Cr,
            r => {
                return Err(DecodeErrors::SofError(format!(
                    "invalid component id {r}, expected a value between 1 and 3"
                )))
            }
        };
        // upper nibble is horizontal, lower nibble vertical
        let horizontal_sample = sampling_factor >> 4;
        let vertical_sample = sampling_factor & 0x0f;

        if !(1..=4).contains(&horizontal_sample) || !(1..=4).contains(&vertical_sample) {
            return Err(DecodeErrors::Unsupported(UnsupportedSchemes::SamplingFactor(
                horizontal_sample,
                vertical_sample,
            )));
        }
        if qt_number > 3 {
            return Err(DecodeErrors::SofError(format!(
                "invalid quantization table id {qt_number} in frame component"
            )));
        }
        debug!(
            "Component ID:{component_id:?} sampling:{horizontal_sample}x{vertical_sample} QT slot:{qt_number}"
        );

        Ok(Components {
            component_id,
            horizontal_sample: usize::from(horizontal_sample),
            vertical_sample: usize::from(vertical_sample),
            quantization_table_number: qt_number,
            dc_huff_table: 0,
            ac_huff_table: 0,
            dc_pred: 0,
            seen: false,
        })
    }

    /// Number of 8x8 blocks this component contributes to one MCU.
    pub fn blocks_per_mcu(&self) -> usize {
        self.horizontal_sample * self.vertical_sample
    }
}

/// Component ids
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub(crate) enum ComponentID {
    Y,
    Cb,
    Cr,
}
