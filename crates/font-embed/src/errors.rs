use core::fmt;
use std::io;

use crate::program::{Encoding, FontProgramKind, TableTag};

/// Kind of a [`FormatError`].
#[derive(Debug)]
#[non_exhaustive]
pub enum FormatErrorKind {
    /// Unexpected end of the font program data.
    UnexpectedEof,
    /// The buffer does not start like a container of the declared kind.
    UnrecognizedContainer {
        /// First 4 bytes of the buffer, big-endian.
        magic: u32,
    },
    /// File-like identifier has an extension not mapping to a supported container.
    UnknownExtension,
    /// A paired format (AFM / PFM metrics) was supplied without its outline half.
    MissingOutlines,
    /// A single-buffer format was supplied with a stray second buffer.
    UnexpectedOutlines,
    /// A TrueType collection with zero faces.
    EmptyCollection,
    /// Requested collection face does not exist.
    FaceOutOfBounds {
        /// Requested face index.
        index: u32,
        /// Number of faces in the collection.
        count: u32,
    },
    /// Missing required font table (e.g., `name`).
    MissingTable(TableTag),
    /// Unexpected version / format of a font table.
    UnexpectedTableVersion {
        /// Table the version was read from.
        table: TableTag,
        /// Version read from the font data.
        version: u32,
    },
    /// The `name` table contains no decodable family / full / PostScript name.
    MissingName,
    /// The metrics buffer does not start with an AFM header.
    NotAfm,
    /// A required AFM key is absent.
    MissingAfmKey(&'static str),
    /// Unexpected PFM header version.
    UnexpectedPfmVersion(u16),
    /// Declared PFM size does not match the supplied buffer.
    PfmLengthMismatch {
        /// Size declared in the header.
        declared: u32,
        /// Actual buffer length.
        actual: usize,
    },
    /// The PFM device string is not `PostScript`.
    NotPostScriptDevice,
    /// A PFB segment does not start with the `0x80` marker byte.
    BadPfbMarker(u8),
    /// A PFB segment has an unknown kind, or segment kinds are out of order.
    UnexpectedPfbSegment(u8),
    /// The metrics half names a font absent from the outline program.
    MetricsMismatch {
        /// Font name declared by the metrics buffer.
        font_name: String,
    },
    /// I/O failure while reading a font file or directory.
    Io(io::Error),
}

impl fmt::Display for FormatErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => formatter.write_str("unexpected end of the font data"),
            Self::UnrecognizedContainer { magic } => {
                write!(formatter, "unrecognized font container (magic {magic:#010x})")
            }
            Self::UnknownExtension => {
                formatter.write_str("identifier extension does not map to a supported container")
            }
            Self::MissingOutlines => {
                formatter.write_str("metrics buffer supplied without its outline program")
            }
            Self::UnexpectedOutlines => {
                formatter.write_str("single-program container supplied with a second buffer")
            }
            Self::EmptyCollection => formatter.write_str("font collection contains no faces"),
            Self::FaceOutOfBounds { index, count } => {
                write!(
                    formatter,
                    "face #{index} requested from a collection of {count} faces"
                )
            }
            Self::MissingTable(tag) => write!(formatter, "missing required `{tag}` table"),
            Self::UnexpectedTableVersion { table, version } => {
                write!(formatter, "unexpected `{table}` table version ({version})")
            }
            Self::MissingName => {
                formatter.write_str("no decodable name records in the `name` table")
            }
            Self::NotAfm => formatter.write_str("metrics buffer is not an AFM file"),
            Self::MissingAfmKey(key) => write!(formatter, "missing `{key}` key in AFM metrics"),
            Self::UnexpectedPfmVersion(version) => {
                write!(formatter, "unexpected PFM header version ({version:#06x})")
            }
            Self::PfmLengthMismatch { declared, actual } => {
                write!(
                    formatter,
                    "PFM header declares {declared} bytes, buffer has {actual}"
                )
            }
            Self::NotPostScriptDevice => {
                formatter.write_str("PFM metrics do not describe a PostScript device font")
            }
            Self::BadPfbMarker(byte) => {
                write!(formatter, "expected PFB segment marker, got {byte:#04x}")
            }
            Self::UnexpectedPfbSegment(kind) => {
                write!(formatter, "unexpected PFB segment kind ({kind})")
            }
            Self::MetricsMismatch { font_name } => {
                write!(
                    formatter,
                    "metrics describe `{font_name}`, which the outline program does not declare"
                )
            }
            Self::Io(err) => write!(formatter, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for FormatErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors that can occur when loading a [`FontProgram`](crate::FontProgram)
/// from raw bytes. Always recoverable: the caller may skip the offending
/// registration and continue.
#[derive(Debug)]
pub struct FormatError {
    pub(crate) kind: FormatErrorKind,
    pub(crate) offset: usize,
}

impl fmt::Display for FormatError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offset > 0 {
            write!(formatter, "{}: ", self.offset)?;
        }
        fmt::Display::fmt(&self.kind, formatter)
    }
}

impl std::error::Error for FormatError {}

impl From<io::Error> for FormatError {
    fn from(err: io::Error) -> Self {
        Self::new(FormatErrorKind::Io(err))
    }
}

impl FormatError {
    pub(crate) fn new(kind: FormatErrorKind) -> Self {
        Self { kind, offset: 0 }
    }

    pub(crate) fn at(kind: FormatErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &FormatErrorKind {
        &self.kind
    }

    /// Gets the offset in the font data this error relates to.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Errors surfaced by a document writer when it refuses to embed a font
/// program. Fatal to the document being built, but never to the registry
/// the program came from.
#[derive(Debug)]
#[non_exhaustive]
pub enum EmbedError {
    /// The program kind cannot be embedded with the requested encoding
    /// (e.g., a Type 1 program with the identity encoding).
    EncodingMismatch {
        /// Kind of the rejected program.
        kind: FontProgramKind,
        /// Encoding the program was registered with.
        encoding: Encoding,
    },
    /// A font with the same base name is already embedded in the document.
    DuplicateResource {
        /// Conflicting base font name.
        base_font: String,
    },
    /// The underlying PDF serializer failed.
    Pdf(lopdf::Error),
}

impl fmt::Display for EmbedError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EncodingMismatch { kind, encoding } => {
                write!(
                    formatter,
                    "{kind} programs cannot be embedded with the {encoding} encoding"
                )
            }
            Self::DuplicateResource { base_font } => {
                write!(formatter, "font `{base_font}` is already embedded")
            }
            Self::Pdf(err) => write!(formatter, "PDF serialization failed: {err}"),
        }
    }
}

impl std::error::Error for EmbedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pdf(err) => Some(err),
            _ => None,
        }
    }
}

impl From<lopdf::Error> for EmbedError {
    fn from(err: lopdf::Error) -> Self {
        Self::Pdf(err)
    }
}

/// Errors that can occur when realizing a requested font family through a
/// document writer.
#[derive(Debug)]
#[non_exhaustive]
pub enum RealizeError {
    /// No program is registered for the requested family. Recoverable:
    /// the caller may retry with a fallback family.
    NotFound {
        /// Family name as requested (before normalization).
        family: String,
    },
    /// The writer refused the resolved program. Fatal to the document
    /// being built.
    Embed {
        /// Family name that resolved to the rejected program.
        family: String,
        /// Writer-side rejection.
        source: EmbedError,
    },
}

impl fmt::Display for RealizeError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { family } => {
                write!(formatter, "no font registered for family `{family}`")
            }
            Self::Embed { family, source } => {
                write!(formatter, "embedding font for family `{family}`: {source}")
            }
        }
    }
}

impl RealizeError {
    /// Gets the requested family name this error relates to.
    pub fn family(&self) -> &str {
        match self {
            Self::NotFound { family } | Self::Embed { family, .. } => family,
        }
    }
}

impl std::error::Error for RealizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound { .. } => None,
            Self::Embed { source, .. } => Some(source),
        }
    }
}
