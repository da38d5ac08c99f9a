//! Font family resolution and font program embedding for PDF output.
//!
//! Maps family-name tokens from style rules (including the generic
//! `serif` / `sans-serif` / `monospace` keywords) to registered font
//! programs, parses the supported binary containers enough to discover
//! their internal names, and embeds the selected program into a PDF so
//! that independent readers can recover the font by name.

mod embed;
mod errors;
mod family;
mod pdf;
mod program;
mod registry;
#[cfg(test)]
pub(crate) mod tests;

#[cfg(doctest)]
doc_comment::doctest!("../README.md");

pub use crate::{
    embed::{DocumentWriter, EmbeddedFont, Embedder},
    errors::{EmbedError, FormatError, FormatErrorKind, RealizeError},
    family::{normalize_family, MONOSPACE, SANS_SERIF, SERIF},
    pdf::PdfWriter,
    program::{Encoding, FontNames, FontProgram, FontProgramKind, FontSource, TableTag},
    registry::FontRegistry,
};
