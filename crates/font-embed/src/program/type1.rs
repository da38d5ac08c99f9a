//! AFM / PFM metrics parsing and PFB program validation.

use super::{Cursor, DescriptorMetrics, FontNames, PfbData};
use crate::errors::{FormatError, FormatErrorKind};

/// Names and descriptor metrics recovered from an AFM file.
#[derive(Debug)]
pub(crate) struct AfmInfo {
    pub(crate) names: FontNames,
    pub(crate) metrics: DescriptorMetrics,
}

/// Parses the header section of an AFM metrics file.
pub(crate) fn parse_afm(bytes: &[u8]) -> Result<AfmInfo, FormatError> {
    // AFM files are ASCII; decode as Latin-1 so a stray high byte cannot
    // fail the whole parse.
    let text: String = bytes.iter().map(|&byte| char::from(byte)).collect();
    let mut lines = text.lines();
    if !lines
        .next()
        .is_some_and(|line| line.starts_with("StartFontMetrics"))
    {
        return Err(FormatError::new(FormatErrorKind::NotAfm));
    }

    let mut names = FontNames::default();
    let mut metrics = DescriptorMetrics::default();
    for line in lines {
        let Some((key, value)) = line.split_once(char::is_whitespace) else {
            if line.trim() == "StartCharMetrics" {
                break;
            }
            continue;
        };
        let value = value.trim();
        match key {
            "FontName" => names.postscript = Some(value.to_owned()),
            "FamilyName" => names.family = Some(value.to_owned()),
            "FullName" => names.full = Some(value.to_owned()),
            "Ascender" => read_metric(value, &mut metrics.ascent),
            "Descender" => read_metric(value, &mut metrics.descent),
            "CapHeight" => read_metric(value, &mut metrics.cap_height),
            "ItalicAngle" => read_metric(value, &mut metrics.italic_angle),
            // Per-glyph metrics follow; nothing in the header past this point.
            "StartCharMetrics" => break,
            _ => {}
        }
    }

    if names.postscript.is_none() {
        return Err(FormatError::new(FormatErrorKind::MissingAfmKey("FontName")));
    }
    Ok(AfmInfo { names, metrics })
}

fn read_metric(value: &str, target: &mut i32) {
    #[allow(clippy::cast_possible_truncation)] // AFM metrics fit i32
    if let Ok(parsed) = value.parse::<f32>() {
        *target = parsed.round() as i32;
    }
}

/// Parses a Windows PFM metrics header, reading the face name, the
/// PostScript name from the driver info block, and validating that the
/// metrics describe a PostScript device font.
pub(crate) fn parse_pfm(bytes: &[u8]) -> Result<FontNames, FormatError> {
    const PFM_VERSION: u16 = 0x0100;

    let mut cursor = Cursor::new(bytes);
    let version = cursor.read_u16_le()?;
    if version != PFM_VERSION {
        return Err(FormatError::new(FormatErrorKind::UnexpectedPfmVersion(
            version,
        )));
    }
    let declared = cursor.read_u32_le()?;
    if declared as usize != bytes.len() {
        return Err(cursor.error(FormatErrorKind::PfmLengthMismatch {
            declared,
            actual: bytes.len(),
        }));
    }
    cursor.skip(60)?; // dfCopyright
    cursor.skip(35)?; // dfType through dfWidthBytes
    let device_offset = cursor.read_u32_le()?;
    let face_offset = cursor.read_u32_le()?;
    cursor.skip(8)?; // dfBitsPointer, dfBitsOffset
    cursor.skip(2)?; // dfSizeFields
    cursor.skip(20)?; // extent, origin and kerning table offsets
    let driver_info_offset = cursor.read_u32_le()?;

    let device = read_cstring(bytes, device_offset)?;
    if !device.eq_ignore_ascii_case("PostScript") {
        return Err(FormatError::at(
            FormatErrorKind::NotPostScriptDevice,
            device_offset as usize,
        ));
    }
    let face = read_cstring(bytes, face_offset)?;
    let postscript = read_cstring(bytes, driver_info_offset)?;
    Ok(FontNames {
        family: Some(face).filter(|name| !name.is_empty()),
        full: None,
        postscript: Some(postscript).filter(|name| !name.is_empty()),
    })
}

/// Reads a NUL-terminated Latin-1 string at an offset declared by a PFM
/// header field.
fn read_cstring(bytes: &[u8], offset: u32) -> Result<String, FormatError> {
    let offset = offset as usize;
    let tail = bytes
        .get(offset..)
        .ok_or_else(|| FormatError::at(FormatErrorKind::UnexpectedEof, offset))?;
    let len = tail.iter().position(|&byte| byte == 0).unwrap_or(tail.len());
    Ok(tail[..len].iter().map(|&byte| char::from(byte)).collect())
}

/// Walks the segment structure of a PFB file, stripping segment headers and
/// recording the clear / binary / trailer lengths a document writer embeds
/// alongside the program.
pub(crate) fn parse_pfb(bytes: &[u8]) -> Result<PfbData, FormatError> {
    const MARKER: u8 = 0x80;
    const ASCII: u8 = 1;
    const BINARY: u8 = 2;
    const EOF: u8 = 3;

    fn phase_kind(phase: usize) -> u8 {
        if phase == 1 {
            BINARY
        } else {
            ASCII
        }
    }

    let mut cursor = Cursor::new(bytes);
    let mut data = Vec::with_capacity(bytes.len());
    // Clear text, binary program, clear-text trailer.
    let mut lens = [0_u32; 3];
    let mut phase = 0;
    loop {
        let marker_offset = cursor.offset();
        let marker = cursor.read_u8()?;
        if marker != MARKER {
            return Err(FormatError::at(
                FormatErrorKind::BadPfbMarker(marker),
                marker_offset,
            ));
        }
        let kind = cursor.read_u8()?;
        if kind == EOF {
            break;
        }
        if kind != phase_kind(phase) {
            if phase < 2 && kind == phase_kind(phase + 1) {
                phase += 1;
            } else {
                return Err(FormatError::at(
                    FormatErrorKind::UnexpectedPfbSegment(kind),
                    marker_offset,
                ));
            }
        }
        let len = cursor.read_u32_le()?;
        let segment = cursor.read_prefix(len as usize)?;
        lens[phase] += len;
        data.extend_from_slice(segment);
    }

    if !data.starts_with(b"%!") {
        let mut magic = [0; 4];
        for (target, &byte) in magic.iter_mut().zip(&data) {
            *target = byte;
        }
        return Err(FormatError::new(FormatErrorKind::UnrecognizedContainer {
            magic: u32::from_be_bytes(magic),
        }));
    }
    Ok(PfbData {
        data,
        clear_len: lens[0],
        binary_len: lens[1],
        trailer_len: lens[2],
    })
}

/// Cross-validates a metrics/program pair: the font name declared by the
/// metrics half must appear in the program's clear-text header.
pub(crate) fn check_names_match(names: &FontNames, pfb: &PfbData) -> Result<(), FormatError> {
    let Some(font_name) = names.postscript.as_deref() else {
        return Ok(());
    };
    let clear = &pfb.data[..pfb.clear_len as usize];
    if !contains_subslice(clear, font_name.as_bytes()) {
        return Err(FormatError::new(FormatErrorKind::MetricsMismatch {
            font_name: font_name.to_owned(),
        }));
    }
    Ok(())
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
