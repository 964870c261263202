//! Decode JPEG marker segments
//!
//! This file deals with decoding header information in a JPEG file.
//!
//! A good guide on markers can be found [here](http://vip.sugovica.hu/Sardi/kepnezo/JPEG%20File%20Layout%20and%20Format.htm)
use std::io::Read;

use crate::components::Components;
use crate::decoder::Decoder;
use crate::errors::{DecodeErrors, UnsupportedSchemes};
use crate::huffman::HuffmanTable;
use crate::misc::{read_u16_be, read_u8, un_zig_zag};

/// **B.2.4.1 Quantization table-specification syntax**
///
/// Parse a DQT segment and carry out un-zig-zagging of the stored values.
///
/// |Field               |Size                   |Description
/// ---------------------|-----------------------|-------------------------
/// |Marker Identifier   |2 bytes                |0xff, 0xdb identifies DQT
/// |Length              |2 bytes                |This gives the length of QT.
/// |QT information      |1 byte                 |bit 0..3: number of QT (0..3, otherwise error)
/// |                    |                       |bit 4..7: precision of QT, 0 = 8 bit, otherwise 16 bit
/// |Bytes               |n bytes                |This gives QT values, n = 64*(precision+1)
///
/// A single DQT segment may contain multiple QTs, each with its own
/// information byte. For 16-bit precision the 64 values are big-endian words.
pub(crate) fn parse_dqt<R>(decoder: &mut Decoder, buf: &mut R) -> Result<(), DecodeErrors>
where
    R: Read,
{
    // length is signed so over-consumption goes negative instead of wrapping
    let mut length = i32::from(read_u16_be(buf)?) - 2;

    while length > 0 {
        let qt_info = read_u8(buf)?;
        length -= 1;

        let table_id = usize::from(qt_info & 0x0f);
        if table_id > 3 {
            return Err(DecodeErrors::DqtError(format!(
                "invalid quantization table id {table_id}, expected a value between 0 and 3"
            )));
        }
        // 0 = 8 bit, otherwise 16 bit
        let precision = qt_info >> 4;

        let mut zigzagged = [0_i32; 64];
        if precision == 0 {
            let mut qt_values = [0_u8; 64];
            buf.read_exact(&mut qt_values)
                .map_err(|_| DecodeErrors::DqtError("file ended mid quantization table".to_string()))?;
            for (pos, value) in qt_values.iter().enumerate() {
                zigzagged[pos] = i32::from(*value);
            }
            length -= 64;
        } else {
            for value in &mut zigzagged {
                *value = i32::from(read_u16_be(buf).map_err(|_| {
                    DecodeErrors::DqtError("file ended mid quantization table".to_string())
                })?);
            }
            length -= 128;
        }
        // store in natural order, coefficients arrive zig-zagged
        decoder.qt_tables[table_id] = Some(un_zig_zag(&zigzagged));
    }
    if length != 0 {
        return Err(DecodeErrors::DqtError(
            "declared DQT length does not match consumed bytes".to_string(),
        ));
    }
    debug!("Quantization tables extracted");
    Ok(())
}

/// **B.2.4.2 Huffman table-specification syntax**
///
/// |Field                      |Size          |Description
/// ----------------------------|--------------|-------------------------------------------------
/// |Marker Identifier          |2 bytes       |0xff, 0xc4 to identify DHT marker
/// |Length                     |2 bytes       |This specifies the length of the Huffman table
/// |HT information             |1 byte        |bit 0..3: number of HT (0..3, otherwise error)
/// |                           |              |bit 4   : type of HT, 0 = DC table, 1 = AC table
/// |Number of Symbols          |16 bytes      |Number of symbols with codes of length 1..16
/// |Symbols                    |n bytes       |Symbols in order of increasing code length
///
/// A single DHT segment may contain multiple HTs.
#[allow(clippy::similar_names)]
pub(crate) fn parse_huffman<R>(decoder: &mut Decoder, buf: &mut R) -> Result<(), DecodeErrors>
where
    R: Read,
{
    let mut length = i32::from(read_u16_be(buf)?) - 2;

    while length > 0 {
        let ht_info = read_u8(buf)?;
        // bit 4 indicates whether the table is DC or AC type
        let is_ac = (ht_info >> 4) & 1 == 1;
        let index = usize::from(ht_info & 0x0f);
        if index > 3 {
            return Err(DecodeErrors::HuffmanDecode(format!(
                "invalid Huffman table id {index}, expected a value between 0 and 3"
            )));
        }
        let mut counts = [0_u8; 16];
        buf.read_exact(&mut counts)
            .map_err(|_| DecodeErrors::HuffmanDecode("file ended mid DHT".to_string()))?;
        let symbols_sum: usize = counts.iter().map(|f| usize::from(*f)).sum();

        let mut symbols = vec![0_u8; symbols_sum];
        buf.read_exact(&mut symbols)
            .map_err(|_| DecodeErrors::HuffmanDecode("file ended mid DHT".to_string()))?;
        length -= 17 + symbols_sum as i32;

        let table = HuffmanTable::new(&counts, symbols)?;
        if is_ac {
            decoder.ac_huffman_tables[index] = Some(table);
        } else {
            decoder.dc_huffman_tables[index] = Some(table);
        }
    }
    if length != 0 {
        return Err(DecodeErrors::HuffmanDecode(
            "declared DHT length does not match consumed bytes".to_string(),
        ));
    }
    debug!("Huffman table(s) extracted");
    Ok(())
}

/// Section: `B.2.2 Frame header syntax`
///
/// Parse a START OF FRAME 0 segment
///
/// | Field              |Size        |Description
/// ---------------------|------------|-----------------
/// | Marker Identifier  |2 bytes     |0xff, 0xc0 to identify SOF0 marker
/// | Length             |2 bytes     |This value equals 8 + components*3
/// | Data precision     |1 byte      |Bits/sample, must be 8
/// |Image height        |2 bytes     |This must be > 0
/// |Image Width         |2 bytes     |This must be > 0
/// |Number of components|1 byte      |1 = grayscale, 3 = YCbCr, 4 = CMYK (rejected)
/// |Each component      |3 bytes     |id, sampling factors (nibbles), QT number
pub(crate) fn parse_start_of_frame<R>(decoder: &mut Decoder, buf: &mut R) -> Result<(), DecodeErrors>
where
    R: Read,
{
    if !decoder.components.is_empty() {
        return Err(DecodeErrors::SofError(
            "multiple start of frame segments detected".to_string(),
        ));
    }
    let length = read_u16_be(buf)?;

    let precision = read_u8(buf)?;
    if precision != 8 {
        return Err(DecodeErrors::Unsupported(UnsupportedSchemes::Precision(
            precision,
        )));
    }
    decoder.info.set_density(precision);

    let img_height = read_u16_be(buf)?;
    decoder.info.set_height(img_height);

    let img_width = read_u16_be(buf)?;
    decoder.info.set_width(img_width);

    if img_width == 0 || img_height == 0 {
        return Err(DecodeErrors::ZeroError);
    }

    let num_components = read_u8(buf)?;
    if num_components == 4 {
        return Err(DecodeErrors::Unsupported(UnsupportedSchemes::Cmyk));
    }
    if num_components != 1 && num_components != 3 {
        return Err(DecodeErrors::SofError(format!(
            "{num_components} color components given, 1 or 3 required"
        )));
    }
    if length != u16::from(8 + 3 * num_components) {
        return Err(DecodeErrors::SofError(format!(
            "length of start of frame differs from expected {}, value is {length}",
            8 + 3 * num_components
        )));
    }
    decoder.info.components = num_components;

    let mut components = Vec::with_capacity(usize::from(num_components));
    for _ in 0..num_components {
        let mut component_id = read_u8(buf)?;
        // Component ids are usually 1, 2, 3 but are rarely seen as 0, 1, 2;
        // force them to 1, 2, 3 for consistency
        if component_id == 0 {
            decoder.zero_based = true;
        }
        if decoder.zero_based {
            component_id += 1;
        }
        if component_id == 4 || component_id == 5 {
            return Err(DecodeErrors::Unsupported(UnsupportedSchemes::Yiq));
        }
        let sampling_factor = read_u8(buf)?;
        let qt_number = read_u8(buf)?;

        let component = Components::from(component_id, sampling_factor, qt_number)?;
        if components
            .iter()
            .any(|c: &Components| c.component_id == component.component_id)
        {
            return Err(DecodeErrors::SofError(format!(
                "duplicate component id {component_id} in start of frame"
            )));
        }
        components.push(component);
    }
    decoder.components = components;
    Ok(())
}

/// Section: `B.2.3 Scan header syntax`
///
/// Parse a start of scan segment
///
/// |Field                       |Size       |Description
/// -----------------------------|-----------|-------------
/// |Marker Identifier           |2 bytes    |0xff, 0xda identify SOS marker
/// |Length                      |2 bytes    |This must equal 6+2*(components in scan)
/// |Number of components in scan|1 byte     |Must be >= 1 and <= 3
/// |Each component              |2 bytes    |component id, then DC table (upper nibble)
/// |                            |           |and AC table (lower nibble)
/// |Spectral selection          |3 bytes    |Must be 0, 63, 0, 0 for baseline
pub(crate) fn parse_sos<R>(decoder: &mut Decoder, buf: &mut R) -> Result<(), DecodeErrors>
where
    R: Read,
{
    // a scan before any frame definition means the component list is empty
    if decoder.components.is_empty() {
        return Err(DecodeErrors::SosError(
            "SOS detected before SOF".to_string(),
        ));
    }
    let length = read_u16_be(buf)?;

    // the seen flags were consumed by SOF duplicate detection, reuse them here
    for component in &mut decoder.components {
        component.seen = false;
    }

    let ns = read_u8(buf)?;
    if !(1..=3).contains(&ns) {
        return Err(DecodeErrors::SosError(format!(
            "number of components in scan should be between 1 and 3, found {ns}"
        )));
    }
    for _ in 0..ns {
        let mut component_id = read_u8(buf)?;
        if decoder.zero_based {
            component_id += 1;
        }
        if component_id == 0 || usize::from(component_id) > decoder.components.len() {
            return Err(DecodeErrors::SosError(format!(
                "invalid component id {component_id} in scan header"
            )));
        }
        let component = &mut decoder.components[usize::from(component_id) - 1];
        if component.seen {
            return Err(DecodeErrors::SosError(format!(
                "duplicate component id {component_id} in scan header"
            )));
        }
        component.seen = true;

        let huffman_table_ids = read_u8(buf)?;
        // upper nibble is the DC table id, lower nibble the AC table id
        let dc_table = usize::from(huffman_table_ids >> 4);
        let ac_table = usize::from(huffman_table_ids & 0x0f);
        if dc_table > 3 {
            return Err(DecodeErrors::SosError(format!(
                "invalid Huffman DC table id {dc_table}"
            )));
        }
        if ac_table > 3 {
            return Err(DecodeErrors::SosError(format!(
                "invalid Huffman AC table id {ac_table}"
            )));
        }
        component.dc_huff_table = dc_table;
        component.ac_huff_table = ac_table;
    }

    decoder.spec_start = read_u8(buf)?;
    decoder.spec_end = read_u8(buf)?;
    let successive_approximation = read_u8(buf)?;
    decoder.succ_high = successive_approximation >> 4;
    decoder.succ_low = successive_approximation & 0x0f;

    // baseline scans never use spectral selection or successive approximation;
    // anything else is progressive/lossless syntax
    if decoder.spec_start != 0
        || decoder.spec_end != 63
        || decoder.succ_high != 0
        || decoder.succ_low != 0
    {
        return Err(DecodeErrors::Unsupported(
            UnsupportedSchemes::NonBaselineScan,
        ));
    }

    if length != u16::from(6 + 2 * ns) {
        return Err(DecodeErrors::SosError(
            "bad SOS length, corrupt jpeg".to_string(),
        ));
    }
    Ok(())
}

/// Section: `B.2.4.4 Restart interval definition syntax`
///
/// The declared length must be exactly 4; the payload is the number of MCUs
/// between restart boundaries, 0 meaning never restart.
pub(crate) fn parse_dri<R>(decoder: &mut Decoder, buf: &mut R) -> Result<(), DecodeErrors>
where
    R: Read,
{
    let length = read_u16_be(buf)?;
    if length != 4 {
        return Err(DecodeErrors::Format(format!(
            "DRI length must be 4, found {length}"
        )));
    }
    decoder.restart_interval = usize::from(read_u16_be(buf)?);
    debug!("Restart interval: {}", decoder.restart_interval);
    Ok(())
}

/// Skip a length-prefixed segment (APPn, COM, JPGn, DNL, DHP, EXP) verbatim.
pub(crate) fn skip_segment<R>(buf: &mut R) -> Result<(), DecodeErrors>
where
    R: Read,
{
    let length = usize::from(read_u16_be(buf)?);
    if length < 2 {
        return Err(DecodeErrors::Format(
            "segment length smaller than its own length field".to_string(),
        ));
    }
    let mut skipped = vec![0_u8; length - 2];
    buf.read_exact(&mut skipped)
        .map_err(|_| DecodeErrors::Format("file ended inside a skipped segment".to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;
    use crate::misc::UN_ZIGZAG;
    use std::io::Cursor;

    #[test]
    fn dqt_descans_zigzag_order() {
        // identity check: store i at zigzag position i, expect natural order
        let mut segment = vec![0x00, 0x43, 0x00];
        segment.extend((0_u8..64).collect::<Vec<u8>>());
        let mut decoder = Decoder::new();
        parse_dqt(&mut decoder, &mut Cursor::new(segment)).unwrap();

        let table = decoder.qt_tables[0].unwrap();
        for i in 0..64 {
            assert_eq!(table[UN_ZIGZAG[i]], i as i32);
        }
    }

    #[test]
    fn dqt_sixteen_bit_precision() {
        let mut segment = vec![0x00, 0x83, 0x10];
        for i in 0_u16..64 {
            segment.extend_from_slice(&(i + 256).to_be_bytes());
        }
        let mut decoder = Decoder::new();
        parse_dqt(&mut decoder, &mut Cursor::new(segment)).unwrap();
        assert_eq!(decoder.qt_tables[0].unwrap()[0], 256);
    }

    #[test]
    fn dqt_bad_table_id() {
        let mut segment = vec![0x00, 0x43, 0x07];
        segment.extend(std::iter::repeat(1_u8).take(64));
        let mut decoder = Decoder::new();
        assert!(matches!(
            parse_dqt(&mut decoder, &mut Cursor::new(segment)),
            Err(DecodeErrors::DqtError(_))
        ));
    }

    #[test]
    fn dqt_length_mismatch() {
        let mut segment = vec![0x00, 0x50, 0x00];
        segment.extend(std::iter::repeat(1_u8).take(77));
        let mut decoder = Decoder::new();
        assert!(matches!(
            parse_dqt(&mut decoder, &mut Cursor::new(segment)),
            Err(DecodeErrors::DqtError(_))
        ));
    }

    #[test]
    fn dri_requires_length_four() {
        let mut decoder = Decoder::new();
        let segment = [0x00, 0x05, 0x00, 0x08, 0x00];
        assert!(matches!(
            parse_dri(&mut decoder, &mut Cursor::new(segment.to_vec())),
            Err(DecodeErrors::Format(_))
        ));

        let segment = [0x00, 0x04, 0x00, 0x08];
        parse_dri(&mut decoder, &mut Cursor::new(segment.to_vec())).unwrap();
        assert_eq!(decoder.restart_interval, 8);
    }

    #[test]
    fn sos_before_sof_rejected() {
        let mut decoder = Decoder::new();
        let segment = [0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3f, 0x00];
        assert!(matches!(
            parse_sos(&mut decoder, &mut Cursor::new(segment.to_vec())),
            Err(DecodeErrors::SosError(_))
        ));
    }
}
