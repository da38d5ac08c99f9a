//! sfnt container parsing: the table directory, `name` table and `ttcf` header.

use core::fmt;

use super::{Cursor, FontNames};
use crate::errors::{FormatError, FormatErrorKind};

/// 4-byte tag of a table in an sfnt table directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableTag(pub [u8; 4]);

impl TableTag {
    pub(crate) const NAME: Self = Self(*b"name");
}

impl fmt::Display for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(formatter, "{}", char::from(byte))?;
            } else {
                write!(formatter, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

pub(crate) const VERSION_TRUETYPE: u32 = 0x0001_0000;
pub(crate) const VERSION_APPLE: u32 = u32::from_be_bytes(*b"true");
pub(crate) const VERSION_CFF: u32 = u32::from_be_bytes(*b"OTTO");
const TTC_TAG: u32 = u32::from_be_bytes(*b"ttcf");

/// Parses a single-face container and resolves its names. `versions` lists
/// the sfnt version words acceptable for the declared container kind.
pub(crate) fn parse_single(data: &[u8], versions: &[u32]) -> Result<FontNames, FormatError> {
    parse_face(data, 0, versions)
}

/// Parses a `ttcf` collection header and resolves the names of the face at
/// `face_index`.
pub(crate) fn parse_collection(data: &[u8], face_index: u32) -> Result<FontNames, FormatError> {
    let mut cursor = Cursor::new(data);
    let tag = cursor.read_u32()?;
    if tag != TTC_TAG {
        return Err(FormatError::new(FormatErrorKind::UnrecognizedContainer {
            magic: tag,
        }));
    }
    cursor.skip(4)?; // majorVersion, minorVersion
    let count = cursor.read_u32()?;
    if count == 0 {
        return Err(cursor.error(FormatErrorKind::EmptyCollection));
    }
    if face_index >= count {
        return Err(cursor.error(FormatErrorKind::FaceOutOfBounds {
            index: face_index,
            count,
        }));
    }
    cursor.skip(4 * face_index as usize)?;
    let offset = cursor.read_u32()?;
    // Faces of a collection may use any sfnt flavor.
    parse_face(
        data,
        offset as usize,
        &[VERSION_TRUETYPE, VERSION_APPLE, VERSION_CFF],
    )
}

fn parse_face(data: &[u8], dir_offset: usize, versions: &[u32]) -> Result<FontNames, FormatError> {
    let mut cursor = Cursor::at(data, dir_offset)?;
    let version = cursor.read_u32()?;
    if !versions.contains(&version) {
        return Err(FormatError::at(
            FormatErrorKind::UnrecognizedContainer { magic: version },
            dir_offset,
        ));
    }
    let table_count = cursor.read_u16()?;
    cursor.skip(6)?; // searchRange, entrySelector, rangeShift

    for _ in 0..table_count {
        let tag = cursor.read_prefix(4)?;
        cursor.skip(4)?; // checksum
        let offset = cursor.read_u32()? as usize;
        let len = cursor.read_u32()? as usize;
        if tag == b"name" {
            // Table offsets are absolute within the container, including
            // for faces embedded in a collection.
            let end = offset
                .checked_add(len)
                .ok_or_else(|| FormatError::at(FormatErrorKind::UnexpectedEof, offset))?;
            let table = data
                .get(offset..end)
                .ok_or_else(|| FormatError::at(FormatErrorKind::UnexpectedEof, offset))?;
            return parse_name_table(table, offset);
        }
    }
    Err(FormatError::new(FormatErrorKind::MissingTable(
        TableTag::NAME,
    )))
}

fn parse_name_table(table: &[u8], table_offset: usize) -> Result<FontNames, FormatError> {
    let mut cursor = Cursor::with_offset(table, table_offset);
    let format = cursor.read_u16()?;
    if format > 1 {
        return Err(cursor.error(FormatErrorKind::UnexpectedTableVersion {
            table: TableTag::NAME,
            version: format.into(),
        }));
    }
    let count = cursor.read_u16()?;
    let storage_offset = usize::from(cursor.read_u16()?);
    let storage = table.get(storage_offset..).ok_or_else(|| {
        FormatError::at(FormatErrorKind::UnexpectedEof, table_offset + storage_offset)
    })?;

    let (mut family, mut full, mut postscript) = (None, None, None);
    for _ in 0..count {
        let platform = cursor.read_u16()?;
        cursor.skip(2)?; // encodingID
        let language = cursor.read_u16()?;
        let name_id = cursor.read_u16()?;
        let len = usize::from(cursor.read_u16()?);
        let str_offset = usize::from(cursor.read_u16()?);

        let slot: &mut Option<(u8, String)> = match name_id {
            1 => &mut family,
            4 => &mut full,
            6 => &mut postscript,
            _ => continue,
        };
        // Tolerate individual broken records as long as some name decodes.
        let Some(raw) = storage.get(str_offset..str_offset + len) else {
            continue;
        };
        let Some(value) = decode_name(platform, raw) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let score = record_score(platform, language);
        if slot.as_ref().is_none_or(|(best, _)| *best < score) {
            *slot = Some((score, value));
        }
    }

    let names = FontNames {
        family: family.map(|(_, value)| value),
        full: full.map(|(_, value)| value),
        postscript: postscript.map(|(_, value)| value),
    };
    if names.preferred().is_none() {
        return Err(FormatError::at(FormatErrorKind::MissingName, table_offset));
    }
    Ok(names)
}

fn record_score(platform: u16, language: u16) -> u8 {
    const WINDOWS_ENGLISH_US: u16 = 0x409;

    match (platform, language) {
        (3, WINDOWS_ENGLISH_US) => 4,
        (3, _) => 3,
        (0, _) => 2,
        (1, _) => 1,
        _ => 0,
    }
}

fn decode_name(platform: u16, raw: &[u8]) -> Option<String> {
    match platform {
        // Windows and Unicode platforms store UTF-16BE.
        0 | 3 => {
            if raw.len() % 2 != 0 {
                return None;
            }
            let units: Vec<u16> = raw
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        // Macintosh platform; Roman encoding is close enough to Latin-1 for
        // the ASCII names fonts carry in practice.
        1 => Some(raw.iter().map(|&byte| char::from(byte)).collect()),
        _ => None,
    }
}
