//! Font program descriptors and container parsing.

use core::fmt;

use crate::errors::{FormatError, FormatErrorKind};

mod sfnt;
mod type1;

pub use self::sfnt::TableTag;

/// Closed set of font container kinds understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FontProgramKind {
    /// Single-program TrueType file (`.ttf`).
    TrueType,
    /// Multi-face TrueType collection (`.ttc`).
    TrueTypeCollection,
    /// OpenType file, usually with CFF outlines (`.otf`).
    OpenType,
    /// Adobe font metrics paired with a raw Type 1 program (`.afm` + `.pfb`).
    Type1,
    /// Windows printer font metrics paired with a raw Type 1 program
    /// (`.pfm` + `.pfb`).
    PrinterFont,
}

impl fmt::Display for FontProgramKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::TrueType => "TrueType",
            Self::TrueTypeCollection => "TrueType collection",
            Self::OpenType => "OpenType",
            Self::Type1 => "Type 1",
            Self::PrinterFont => "printer font",
        })
    }
}

/// How character codes map to glyphs when a program is used in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum Encoding {
    /// Identity mapping of glyph indices; required for full Unicode text.
    #[default]
    IdentityH,
    /// Windows-1252 legacy code page.
    WinAnsi,
}

impl fmt::Display for Encoding {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::IdentityH => "Identity-H",
            Self::WinAnsi => "WinAnsi",
        })
    }
}

/// Raw payload of a font program.
///
/// Paired metrics formats carry both halves in a single variant, so a half
/// cannot be supplied on its own.
#[derive(Clone)]
pub enum FontSource {
    /// Single-program TrueType file.
    TrueType(Vec<u8>),
    /// TrueType collection; a face is selected at load time.
    TrueTypeCollection(Vec<u8>),
    /// OpenType file.
    OpenType(Vec<u8>),
    /// AFM metrics plus the Type 1 program they describe.
    Type1 {
        /// AFM metrics buffer.
        metrics: Vec<u8>,
        /// PFB outline program.
        outlines: Vec<u8>,
    },
    /// PFM metrics plus the Type 1 program they describe.
    PrinterFont {
        /// PFM metrics buffer.
        metrics: Vec<u8>,
        /// PFB outline program.
        outlines: Vec<u8>,
    },
}

impl fmt::Debug for FontSource {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = formatter.debug_struct("FontSource");
        debug.field("kind", &self.kind());
        match self {
            Self::TrueType(data) | Self::TrueTypeCollection(data) | Self::OpenType(data) => {
                debug.field("len", &data.len());
            }
            Self::Type1 { metrics, outlines } | Self::PrinterFont { metrics, outlines } => {
                debug
                    .field("metrics_len", &metrics.len())
                    .field("outlines_len", &outlines.len());
            }
        }
        debug.finish()
    }
}

impl FontSource {
    /// Gets the container kind of this payload.
    pub fn kind(&self) -> FontProgramKind {
        match self {
            Self::TrueType(_) => FontProgramKind::TrueType,
            Self::TrueTypeCollection(_) => FontProgramKind::TrueTypeCollection,
            Self::OpenType(_) => FontProgramKind::OpenType,
            Self::Type1 { .. } => FontProgramKind::Type1,
            Self::PrinterFont { .. } => FontProgramKind::PrinterFont,
        }
    }

    /// Builds a source from a file-like identifier, using its extension to
    /// select the container kind.
    ///
    /// # Errors
    ///
    /// Fails if the extension is unknown, or if the number of supplied
    /// buffers does not match the kind (paired metrics formats require both
    /// halves; single-program formats must not carry a companion).
    pub fn from_extension(
        name_or_path: &str,
        data: Vec<u8>,
        companion: Option<Vec<u8>>,
    ) -> Result<Self, FormatError> {
        let extension = name_or_path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some(ext @ ("ttf" | "ttc" | "otf")) => {
                if companion.is_some() {
                    return Err(FormatError::new(FormatErrorKind::UnexpectedOutlines));
                }
                Ok(match ext {
                    "ttf" => Self::TrueType(data),
                    "ttc" => Self::TrueTypeCollection(data),
                    _ => Self::OpenType(data),
                })
            }
            Some("afm") => {
                let outlines =
                    companion.ok_or_else(|| FormatError::new(FormatErrorKind::MissingOutlines))?;
                Ok(Self::Type1 {
                    metrics: data,
                    outlines,
                })
            }
            Some("pfm") => {
                let outlines =
                    companion.ok_or_else(|| FormatError::new(FormatErrorKind::MissingOutlines))?;
                Ok(Self::PrinterFont {
                    metrics: data,
                    outlines,
                })
            }
            _ => Err(FormatError::new(FormatErrorKind::UnknownExtension)),
        }
    }
}

/// Names discovered inside a font program, retained for resolution and
/// diagnostics.
#[derive(Debug, Clone, Default)]
pub struct FontNames {
    /// Family name (`name` table ID 1, or AFM `FamilyName`).
    pub family: Option<String>,
    /// Full human-readable name (`name` table ID 4, or AFM `FullName`).
    pub full: Option<String>,
    /// PostScript name (`name` table ID 6, or AFM `FontName`).
    pub postscript: Option<String>,
}

impl FontNames {
    /// Gets the name a program should be registered under, preferring the
    /// family name.
    pub fn preferred(&self) -> Option<&str> {
        self.family
            .as_deref()
            .or(self.full.as_deref())
            .or(self.postscript.as_deref())
    }
}

/// Font descriptor metrics recovered from the program's metrics data, with
/// conservative defaults where the container does not carry them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DescriptorMetrics {
    pub(crate) ascent: i32,
    pub(crate) descent: i32,
    pub(crate) cap_height: i32,
    pub(crate) italic_angle: i32,
}

impl Default for DescriptorMetrics {
    fn default() -> Self {
        Self {
            ascent: 800,
            descent: -200,
            cap_height: 700,
            italic_angle: 0,
        }
    }
}

/// Type 1 program with its PFB segment headers stripped, plus the segment
/// lengths a document writer needs to embed it.
#[derive(Debug, Clone)]
pub(crate) struct PfbData {
    /// Clear-text, binary and clear-text trailer parts, concatenated.
    pub(crate) data: Vec<u8>,
    pub(crate) clear_len: u32,
    pub(crate) binary_len: u32,
    pub(crate) trailer_len: u32,
}

/// A loaded font program: parsed names plus the payload to embed.
///
/// Programs are created once, before document generation begins, and are
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct FontProgram {
    source: FontSource,
    face_index: u32,
    names: FontNames,
    encoding: Encoding,
    embed: bool,
    override_name: Option<String>,
    metrics: DescriptorMetrics,
    pfb: Option<PfbData>,
}

impl FontProgram {
    /// Loads a program from its payload, parsing enough of the container to
    /// discover the font's internal names. Collections use their first face.
    ///
    /// # Errors
    ///
    /// Fails if the payload is not a recognizable container of the declared
    /// kind, or if a paired format's halves are inconsistent.
    pub fn load(
        source: FontSource,
        encoding: Encoding,
        embed: bool,
        override_name: Option<String>,
    ) -> Result<Self, FormatError> {
        Self::load_face(source, 0, encoding, embed, override_name)
    }

    /// Loads a specific face of a collection; equivalent to [`Self::load`]
    /// for single-program containers, which ignore `face_index`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`], plus an out-of-bounds `face_index` for
    /// collections.
    pub fn load_face(
        source: FontSource,
        face_index: u32,
        encoding: Encoding,
        embed: bool,
        override_name: Option<String>,
    ) -> Result<Self, FormatError> {
        let mut metrics = DescriptorMetrics::default();
        let mut pfb = None;
        let names = match &source {
            FontSource::TrueType(data) => {
                sfnt::parse_single(data, &[sfnt::VERSION_TRUETYPE, sfnt::VERSION_APPLE])?
            }
            FontSource::OpenType(data) => {
                sfnt::parse_single(data, &[sfnt::VERSION_CFF, sfnt::VERSION_TRUETYPE])?
            }
            FontSource::TrueTypeCollection(data) => sfnt::parse_collection(data, face_index)?,
            FontSource::Type1 {
                metrics: afm,
                outlines,
            } => {
                let info = type1::parse_afm(afm)?;
                let unwrapped = type1::parse_pfb(outlines)?;
                type1::check_names_match(&info.names, &unwrapped)?;
                metrics = info.metrics;
                pfb = Some(unwrapped);
                info.names
            }
            FontSource::PrinterFont {
                metrics: pfm,
                outlines,
            } => {
                let names = type1::parse_pfm(pfm)?;
                let unwrapped = type1::parse_pfb(outlines)?;
                type1::check_names_match(&names, &unwrapped)?;
                pfb = Some(unwrapped);
                names
            }
        };

        Ok(Self {
            source,
            face_index,
            names,
            encoding,
            embed,
            override_name,
            metrics,
            pfb,
        })
    }

    /// Gets the container kind of this program.
    pub fn kind(&self) -> FontProgramKind {
        self.source.kind()
    }

    /// Gets the names discovered inside the program. Retained even when an
    /// override name takes precedence for resolution.
    pub fn names(&self) -> &FontNames {
        &self.names
    }

    /// Gets the encoding the program was registered with.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Whether the program bytes are embedded in the output document, as
    /// opposed to being referenced by name only.
    pub fn embed(&self) -> bool {
        self.embed
    }

    /// Gets the explicit name supplied at registration, if any. Takes
    /// precedence over the internally discovered names.
    pub fn override_name(&self) -> Option<&str> {
        self.override_name.as_deref()
    }

    /// Gets the face selected from a collection (0 for single-program
    /// containers).
    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    /// Gets the outline program payload: the sole buffer for single-program
    /// containers, the PFB half for paired formats.
    pub fn payload(&self) -> &[u8] {
        match &self.source {
            FontSource::TrueType(data)
            | FontSource::TrueTypeCollection(data)
            | FontSource::OpenType(data) => data,
            FontSource::Type1 { outlines, .. } | FontSource::PrinterFont { outlines, .. } => {
                outlines
            }
        }
    }

    /// Gets the metrics half of a paired format.
    pub fn metrics_payload(&self) -> Option<&[u8]> {
        match &self.source {
            FontSource::Type1 { metrics, .. } | FontSource::PrinterFont { metrics, .. } => {
                Some(metrics)
            }
            _ => None,
        }
    }

    /// Computes the name the program appears under in an output document:
    /// the override name if one was set, else the PostScript name, else the
    /// family / full name. Sanitized to the characters PDF names allow.
    pub fn base_font_name(&self) -> String {
        let raw = self
            .override_name
            .as_deref()
            .or(self.names.postscript.as_deref())
            .or(self.names.family.as_deref())
            .or(self.names.full.as_deref())
            .unwrap_or("Unknown");
        sanitize_name(raw)
    }

    pub(crate) fn descriptor_metrics(&self) -> DescriptorMetrics {
        self.metrics
    }

    pub(crate) fn pfb(&self) -> Option<&PfbData> {
        self.pfb.as_ref()
    }
}

/// Restricts a name to characters valid inside a PDF name object: printable
/// ASCII minus delimiters, whitespace and `#` escapes.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|ch| {
            ch.is_ascii_graphic()
                && !matches!(
                    ch,
                    '(' | ')' | '<' | '>' | '[' | ']' | '{' | '}' | '/' | '%' | '#'
                )
        })
        .collect()
}

/// Byte-slice cursor tracking its absolute offset in the parsed buffer, so
/// errors can point at the offending byte.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Creates a cursor over an already-extracted slice, reporting offsets
    /// relative to the buffer the slice was taken from.
    pub(crate) fn with_offset(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, offset }
    }

    /// Creates a cursor over `bytes[offset..]`, keeping absolute offsets.
    pub(crate) fn at(bytes: &'a [u8], offset: usize) -> Result<Self, FormatError> {
        let tail = bytes
            .get(offset..)
            .ok_or_else(|| FormatError::at(FormatErrorKind::UnexpectedEof, offset))?;
        Ok(Self {
            bytes: tail,
            offset,
        })
    }

    pub(crate) fn error(&self, kind: FormatErrorKind) -> FormatError {
        FormatError::at(kind, self.offset)
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    fn advance(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        if self.bytes.len() < len {
            return Err(self.error(FormatErrorKind::UnexpectedEof));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        self.offset += len;
        Ok(head)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), FormatError> {
        self.advance(len).map(drop)
    }

    pub(crate) fn read_prefix(&mut self, len: usize) -> Result<&'a [u8], FormatError> {
        self.advance(len)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.advance(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, FormatError> {
        let bytes = self.advance(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, FormatError> {
        let bytes = self.advance(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_u16_le(&mut self) -> Result<u16, FormatError> {
        let bytes = self.advance(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32, FormatError> {
        let bytes = self.advance(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
