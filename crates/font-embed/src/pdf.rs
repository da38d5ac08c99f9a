//! Minimal PDF document writer backed by `lopdf`.
//!
//! Covers the slice of PDF generation this subsystem needs: embedding font
//! programs as document resources and placing text runs that reference
//! them. Page layout beyond a top-down text cursor is the host renderer's
//! business.

use core::fmt;
use std::collections::BTreeSet;

use lopdf::{
    content::{Content, Operation},
    dictionary, Dictionary, Document, Object, ObjectId, Stream,
};

use crate::{
    embed::{DocumentWriter, EmbeddedFont},
    errors::EmbedError,
    program::{Encoding, FontProgram, FontProgramKind},
};

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;

/// Document writer producing a single-page PDF with embedded fonts.
pub struct PdfWriter {
    doc: Document,
    font_resources: Vec<(String, ObjectId)>,
    base_fonts: BTreeSet<String>,
    operations: Vec<Operation>,
    next_font: u32,
    cursor_y: i64,
}

impl fmt::Debug for PdfWriter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PdfWriter")
            .field("fonts", &self.font_resources.len())
            .field("operations", &self.operations.len())
            .finish_non_exhaustive()
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    /// Creates a writer for a new, empty document.
    pub fn new() -> Self {
        Self {
            doc: Document::with_version("1.5"),
            font_resources: vec![],
            base_fonts: BTreeSet::new(),
            operations: vec![],
            next_font: 1,
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Places a text run set in a previously embedded font, advancing the
    /// page-level text cursor.
    pub fn show_text(&mut self, font: &EmbeddedFont, size: f32, text: &str) {
        #[allow(clippy::cast_possible_truncation)] // point sizes are small
        let size = size.round() as i64;
        self.operations.push(Operation::new("BT", vec![]));
        self.operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(font.resource_name.clone().into_bytes()),
                size.into(),
            ],
        ));
        self.operations.push(Operation::new(
            "Td",
            vec![MARGIN.into(), self.cursor_y.into()],
        ));
        self.operations
            .push(Operation::new("Tj", vec![Object::string_literal(text)]));
        self.operations.push(Operation::new("ET", vec![]));
        self.cursor_y -= size + 4;
    }

    /// Assembles the page tree and serializes the document.
    ///
    /// # Errors
    ///
    /// Propagates serialization failures of the underlying PDF library.
    pub fn finish(mut self) -> Result<Vec<u8>, EmbedError> {
        let mut fonts = Dictionary::new();
        for (name, id) in &self.font_resources {
            fonts.set(name.clone(), Object::Reference(*id));
        }
        let content = Content {
            operations: self.operations,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));
        let pages_id = self.doc.new_object_id();
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => fonts },
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        });
        self.doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut buffer = vec![];
        self.doc.save_to(&mut buffer).map_err(lopdf::Error::IO)?;
        Ok(buffer)
    }

    fn write_descriptor(&mut self, program: &FontProgram, base_font: &str) -> ObjectId {
        let metrics = program.descriptor_metrics();
        let mut descriptor = dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(base_font.as_bytes().to_vec()),
            "Flags" => 32, // nonsymbolic
            "FontBBox" => vec![
                (-500).into(),
                i64::from(metrics.descent).into(),
                1250.into(),
                i64::from(metrics.ascent).into(),
            ],
            "ItalicAngle" => i64::from(metrics.italic_angle),
            "Ascent" => i64::from(metrics.ascent),
            "Descent" => i64::from(metrics.descent),
            "CapHeight" => i64::from(metrics.cap_height),
            "StemV" => 80,
        };

        if program.embed() {
            let (key, stream) = match program.kind() {
                FontProgramKind::TrueType | FontProgramKind::TrueTypeCollection => (
                    "FontFile2",
                    Stream::new(dictionary! {}, program.payload().to_vec()),
                ),
                FontProgramKind::OpenType => (
                    "FontFile3",
                    Stream::new(
                        dictionary! { "Subtype" => "OpenType" },
                        program.payload().to_vec(),
                    ),
                ),
                FontProgramKind::Type1 | FontProgramKind::PrinterFont => {
                    // `expect()` is safe: paired programs always carry their
                    // unwrapped PFB data.
                    let pfb = program.pfb().expect("paired program without PFB data");
                    (
                        "FontFile",
                        Stream::new(
                            dictionary! {
                                "Length1" => i64::from(pfb.clear_len),
                                "Length2" => i64::from(pfb.binary_len),
                                "Length3" => i64::from(pfb.trailer_len),
                            },
                            pfb.data.clone(),
                        ),
                    )
                }
            };
            let stream_id = self.doc.add_object(stream);
            descriptor.set(key, Object::Reference(stream_id));
        }
        self.doc.add_object(descriptor)
    }

    fn write_type0(
        &mut self,
        base_font: &str,
        cid_subtype: &str,
        descriptor_id: ObjectId,
    ) -> ObjectId {
        let mut descendant = dictionary! {
            "Type" => "Font",
            "Subtype" => cid_subtype,
            "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => 1000,
        };
        if cid_subtype == "CIDFontType2" {
            descendant.set("CIDToGIDMap", "Identity");
        }
        let descendant_id = self.doc.add_object(descendant);

        self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![descendant_id.into()],
        })
    }

    fn write_simple(
        &mut self,
        base_font: &str,
        subtype: &str,
        descriptor_id: ObjectId,
    ) -> ObjectId {
        const FIRST_CHAR: i64 = 32;
        const LAST_CHAR: i64 = 126;

        let widths: Vec<Object> = (FIRST_CHAR..=LAST_CHAR).map(|_| 500.into()).collect();
        self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => subtype,
            "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
            "Encoding" => "WinAnsiEncoding",
            "FirstChar" => FIRST_CHAR,
            "LastChar" => LAST_CHAR,
            "Widths" => widths,
            "FontDescriptor" => descriptor_id,
        })
    }
}

impl DocumentWriter for PdfWriter {
    fn embed_font(&mut self, program: &FontProgram) -> Result<EmbeddedFont, EmbedError> {
        let kind = program.kind();
        let encoding = program.encoding();
        // Reject before touching the document, so a refused program leaves
        // no orphan objects behind.
        let is_type1 = matches!(kind, FontProgramKind::Type1 | FontProgramKind::PrinterFont);
        if is_type1 && encoding == Encoding::IdentityH {
            return Err(EmbedError::EncodingMismatch { kind, encoding });
        }
        let base_font = program.base_font_name();
        if self.base_fonts.contains(&base_font) {
            return Err(EmbedError::DuplicateResource { base_font });
        }

        let descriptor_id = self.write_descriptor(program, &base_font);
        let font_id = match (kind, encoding) {
            (FontProgramKind::TrueType | FontProgramKind::TrueTypeCollection, Encoding::IdentityH) => {
                self.write_type0(&base_font, "CIDFontType2", descriptor_id)
            }
            (FontProgramKind::OpenType, Encoding::IdentityH) => {
                self.write_type0(&base_font, "CIDFontType0", descriptor_id)
            }
            (
                FontProgramKind::TrueType
                | FontProgramKind::TrueTypeCollection
                | FontProgramKind::OpenType,
                Encoding::WinAnsi,
            ) => self.write_simple(&base_font, "TrueType", descriptor_id),
            (FontProgramKind::Type1 | FontProgramKind::PrinterFont, _) => {
                self.write_simple(&base_font, "Type1", descriptor_id)
            }
        };

        let resource_name = format!("F{}", self.next_font);
        self.next_font += 1;
        self.base_fonts.insert(base_font.clone());
        self.font_resources.push((resource_name.clone(), font_id));
        Ok(EmbeddedFont {
            resource_name,
            base_font,
        })
    }
}
