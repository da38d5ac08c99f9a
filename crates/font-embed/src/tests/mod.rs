//! Shared test fixtures: synthesized font containers for the "Jacquard 24"
//! face, and round-trip tests re-parsing the produced documents.

use lopdf::{Dictionary, Document, Object};
use test_casing::test_casing;

use crate::{
    Embedder, Encoding, FontProgramKind, FontRegistry, FormatErrorKind, PdfWriter, RealizeError,
};

pub(crate) const FACE_FAMILY: &str = "Jacquard 24";
pub(crate) const FACE_FULL: &str = "Jacquard 24 Regular";
pub(crate) const FACE_POSTSCRIPT: &str = "Jacquard24-Regular";

const SFNT_TRUETYPE: u32 = 0x0001_0000;
const SFNT_CFF: u32 = u32::from_be_bytes(*b"OTTO");

fn write_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

fn write_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

/// Single record in a synthesized `name` table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NameRecord {
    platform: u16,
    encoding: u16,
    language: u16,
    name_id: u16,
    value: &'static str,
}

impl NameRecord {
    pub(crate) fn windows(name_id: u16, value: &'static str) -> Self {
        Self {
            platform: 3,
            encoding: 1,
            language: 0x409,
            name_id,
            value,
        }
    }

    pub(crate) fn mac(name_id: u16, value: &'static str) -> Self {
        Self {
            platform: 1,
            encoding: 0,
            language: 0,
            name_id,
            value,
        }
    }

    fn encoded_value(self) -> Vec<u8> {
        if self.platform == 1 {
            self.value.bytes().collect()
        } else {
            self.value
                .encode_utf16()
                .flat_map(u16::to_be_bytes)
                .collect()
        }
    }
}

pub(crate) fn name_table(records: &[NameRecord]) -> Vec<u8> {
    let count = u16::try_from(records.len()).unwrap();
    let mut table = vec![];
    write_u16(&mut table, 0); // format
    write_u16(&mut table, count);
    write_u16(&mut table, 6 + 12 * count); // storage offset

    let mut storage = vec![];
    for record in records {
        let encoded = record.encoded_value();
        write_u16(&mut table, record.platform);
        write_u16(&mut table, record.encoding);
        write_u16(&mut table, record.language);
        write_u16(&mut table, record.name_id);
        write_u16(&mut table, u16::try_from(encoded.len()).unwrap());
        write_u16(&mut table, u16::try_from(storage.len()).unwrap());
        storage.extend_from_slice(&encoded);
    }
    table.extend_from_slice(&storage);
    table
}

fn default_name_records() -> Vec<NameRecord> {
    vec![
        NameRecord::windows(1, FACE_FAMILY),
        NameRecord::windows(4, FACE_FULL),
        NameRecord::windows(6, FACE_POSTSCRIPT),
        NameRecord::mac(1, FACE_FAMILY),
    ]
}

/// Synthesizes an sfnt container. `base` shifts the recorded table offsets,
/// which are absolute within the final file (non-zero for collection faces).
pub(crate) fn sfnt_font(version: u32, tables: &[([u8; 4], Vec<u8>)], base: usize) -> Vec<u8> {
    let data_start = 12 + 16 * tables.len();
    let mut directory = vec![];
    let mut data = vec![];
    for (tag, table) in tables {
        let offset = base + data_start + data.len();
        directory.extend_from_slice(tag);
        write_u32(&mut directory, 0); // checksum, not validated here
        write_u32(&mut directory, u32::try_from(offset).unwrap());
        write_u32(&mut directory, u32::try_from(table.len()).unwrap());
        data.extend_from_slice(table);
        while data.len() % 4 != 0 {
            data.push(0);
        }
    }

    let mut font = vec![];
    write_u32(&mut font, version);
    write_u16(&mut font, u16::try_from(tables.len()).unwrap());
    font.extend_from_slice(&[0; 6]); // searchRange, entrySelector, rangeShift
    font.extend_from_slice(&directory);
    font.extend_from_slice(&data);
    font
}

pub(crate) fn truetype_font() -> Vec<u8> {
    sfnt_font(
        SFNT_TRUETYPE,
        &[
            (*b"head", vec![0; 54]),
            (*b"name", name_table(&default_name_records())),
        ],
        0,
    )
}

pub(crate) fn opentype_font() -> Vec<u8> {
    sfnt_font(
        SFNT_CFF,
        &[
            (*b"CFF ", vec![1, 0, 4, 4]),
            (*b"name", name_table(&default_name_records())),
        ],
        0,
    )
}

pub(crate) fn collection_font() -> Vec<u8> {
    const HEADER_LEN: usize = 16; // ttcf header with a single face offset

    let face = sfnt_font(
        SFNT_TRUETYPE,
        &[
            (*b"head", vec![0; 54]),
            (*b"name", name_table(&default_name_records())),
        ],
        HEADER_LEN,
    );
    let mut font = b"ttcf".to_vec();
    write_u16(&mut font, 1); // majorVersion
    write_u16(&mut font, 0); // minorVersion
    write_u32(&mut font, 1); // numFonts
    write_u32(&mut font, u32::try_from(HEADER_LEN).unwrap());
    font.extend_from_slice(&face);
    font
}

pub(crate) fn afm_metrics() -> Vec<u8> {
    let text = format!(
        "StartFontMetrics 4.1\n\
         FontName {FACE_POSTSCRIPT}\n\
         FullName {FACE_FULL}\n\
         FamilyName {FACE_FAMILY}\n\
         Weight Regular\n\
         ItalicAngle 0\n\
         Ascender 750\n\
         Descender -250\n\
         CapHeight 700\n\
         StartCharMetrics 2\n\
         C 32 ; WX 600 ; N space ;\n\
         C 65 ; WX 600 ; N A ;\n\
         EndCharMetrics\n\
         EndFontMetrics\n"
    );
    text.into_bytes()
}

pub(crate) fn pfb_outlines() -> Vec<u8> {
    let clear = format!(
        "%!PS-AdobeFont-1.0: {FACE_POSTSCRIPT} 001.000\n\
         /FontName /{FACE_POSTSCRIPT} def\n\
         currentfile eexec\n"
    );
    let binary: Vec<u8> = (0..64).map(|i| i ^ 0x5a).collect();
    let trailer = format!("{}\ncleartomark\n", "0".repeat(64));

    let mut font = vec![];
    for (kind, segment) in [
        (1_u8, clear.as_bytes()),
        (2, binary.as_slice()),
        (1, trailer.as_bytes()),
    ] {
        font.push(0x80);
        font.push(kind);
        font.extend_from_slice(&u32::try_from(segment.len()).unwrap().to_le_bytes());
        font.extend_from_slice(segment);
    }
    font.extend_from_slice(&[0x80, 3]);
    font
}

pub(crate) fn pfm_metrics() -> Vec<u8> {
    const HEADER_LEN: usize = 147; // 117-byte header + 30-byte extension

    let device = b"PostScript\0";
    let face = b"Jacquard 24\0";
    let driver_info = b"Jacquard24-Regular\0";
    let total = HEADER_LEN + device.len() + face.len() + driver_info.len();

    let mut data = vec![0; HEADER_LEN];
    data[0..2].copy_from_slice(&0x0100_u16.to_le_bytes()); // dfVersion
    data[2..6].copy_from_slice(&u32::try_from(total).unwrap().to_le_bytes()); // dfSize
    let device_offset = u32::try_from(HEADER_LEN).unwrap();
    let face_offset = device_offset + u32::try_from(device.len()).unwrap();
    let driver_offset = face_offset + u32::try_from(face.len()).unwrap();
    data[101..105].copy_from_slice(&device_offset.to_le_bytes()); // dfDevice
    data[105..109].copy_from_slice(&face_offset.to_le_bytes()); // dfFace
    data[139..143].copy_from_slice(&driver_offset.to_le_bytes()); // dfDriverInfo
    data.extend_from_slice(device);
    data.extend_from_slice(face);
    data.extend_from_slice(driver_info);
    data
}

/// Supported container kinds, as registered from raw byte buffers.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Container {
    TrueType,
    Collection,
    OpenType,
    Afm,
    Pfm,
}

pub(crate) const CONTAINERS: [Container; 5] = [
    Container::TrueType,
    Container::Collection,
    Container::OpenType,
    Container::Afm,
    Container::Pfm,
];

impl Container {
    fn register(self, registry: &mut FontRegistry, override_name: Option<&str>) {
        match self {
            Self::TrueType => registry
                .add_font(
                    "Jacquard24-Regular.ttf",
                    Encoding::IdentityH,
                    true,
                    truetype_font(),
                    override_name,
                )
                .unwrap(),
            Self::Collection => registry
                .add_font(
                    "Jacquard24-Regular.ttc",
                    Encoding::IdentityH,
                    true,
                    collection_font(),
                    override_name,
                )
                .unwrap(),
            Self::OpenType => registry
                .add_font(
                    "Jacquard24-Regular.otf",
                    Encoding::IdentityH,
                    true,
                    opentype_font(),
                    override_name,
                )
                .unwrap(),
            Self::Afm => registry
                .add_font_pair(
                    "Jacquard24-Regular.afm",
                    Encoding::WinAnsi,
                    true,
                    afm_metrics(),
                    pfb_outlines(),
                    override_name,
                )
                .unwrap(),
            Self::Pfm => registry
                .add_font_pair(
                    "Jacquard24-Regular.pfm",
                    Encoding::WinAnsi,
                    true,
                    pfm_metrics(),
                    pfb_outlines(),
                    override_name,
                )
                .unwrap(),
        }
    }
}

fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> &'a Dictionary {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap().as_dict().unwrap(),
        _ => object.as_dict().unwrap(),
    }
}

/// Re-parses a produced document and returns the descriptor names of the
/// fonts referenced by the first page, checking along the way that each
/// font's descriptor agrees with its base font name.
fn embedded_font_names(pdf: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = *doc.get_pages().values().next().unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let resources = resolve_dict(&doc, page.get(b"Resources").unwrap());
    let fonts = resolve_dict(&doc, resources.get(b"Font").unwrap());

    let mut names = vec![];
    for (_, font_ref) in fonts.iter() {
        let font = resolve_dict(&doc, font_ref);
        let base_font = font.get(b"BaseFont").unwrap().as_name().unwrap();
        let base_font = String::from_utf8(base_font.to_vec()).unwrap();

        // The descriptor lives on the descendant for composite fonts.
        let descriptor_holder = if let Ok(descendants) = font.get(b"DescendantFonts") {
            resolve_dict(&doc, &descendants.as_array().unwrap()[0])
        } else {
            font
        };
        let descriptor = resolve_dict(&doc, descriptor_holder.get(b"FontDescriptor").unwrap());
        let descriptor_name = descriptor.get(b"FontName").unwrap().as_name().unwrap();
        assert_eq!(descriptor_name, base_font.as_bytes());

        names.push(base_font);
    }
    names
}

fn assert_font_is_included(registry: &FontRegistry, requested: &str, expected: &str) {
    let embedder = Embedder::new(registry);
    let mut writer = PdfWriter::new();
    let font = embedder.realize(&mut writer, requested).unwrap();
    writer.show_text(&font, 12.0, "Test");
    let rendered = writer.finish().unwrap();

    let detected = embedded_font_names(&rendered);
    assert_eq!(
        detected.len(),
        1,
        "expected exactly one embedded font, got {detected:?}"
    );
    assert!(
        detected[0].contains(expected),
        "`{}` does not contain `{expected}`",
        detected[0]
    );
}

#[test_casing(5, CONTAINERS)]
#[test]
fn embedding_registered_font(container: Container) {
    let mut registry = FontRegistry::new();
    container.register(&mut registry, None);
    assert_font_is_included(&registry, FACE_FAMILY, "Jacquard");
}

#[test_casing(5, CONTAINERS)]
#[test]
fn embedding_font_with_name_override(container: Container) {
    let mut registry = FontRegistry::new();
    container.register(&mut registry, Some("OverriddenName"));

    let embedder = Embedder::new(&registry);
    let mut writer = PdfWriter::new();
    let font = embedder.realize(&mut writer, "OverriddenName").unwrap();
    writer.show_text(&font, 12.0, "Test");
    let rendered = writer.finish().unwrap();

    let detected = embedded_font_names(&rendered);
    assert_eq!(detected.len(), 1);
    assert!(detected[0].contains("OverriddenName"), "{:?}", detected[0]);
    // The override takes precedence over the internal name.
    assert!(!detected[0].contains("Jacquard"), "{:?}", detected[0]);
}

#[test]
fn requesting_family_with_style_rule_quoting() {
    let mut registry = FontRegistry::new();
    Container::Collection.register(&mut registry, None);
    assert_font_is_included(&registry, "'Jacquard 24'", "Jacquard");
    assert_font_is_included(&registry, "\"Jacquard 24\"", "Jacquard");
}

#[test]
fn unknown_family_resolves_to_not_found() {
    let mut registry = FontRegistry::new();
    Container::TrueType.register(&mut registry, None);

    assert!(registry.resolve("No Such Family").is_none());
    let embedder = Embedder::new(&registry);
    let mut writer = PdfWriter::new();
    let err = embedder.realize(&mut writer, "No Such Family").unwrap_err();
    assert!(
        matches!(&err, RealizeError::NotFound { family } if family == "No Such Family"),
        "{err:?}"
    );
    // The fallback is the caller's: the writer is still usable.
    let font = embedder.realize(&mut writer, FACE_FAMILY).unwrap();
    writer.show_text(&font, 12.0, "Test");
    writer.finish().unwrap();
}

#[test]
fn registering_half_of_a_metrics_pair_fails() {
    let mut registry = FontRegistry::new();
    let err = registry
        .add_font(
            "Jacquard24-Regular.afm",
            Encoding::WinAnsi,
            true,
            afm_metrics(),
            None,
        )
        .unwrap_err();
    assert!(matches!(err.kind(), FormatErrorKind::MissingOutlines));

    let err = registry
        .add_font(
            "Jacquard24-Regular.pfm",
            Encoding::WinAnsi,
            true,
            pfm_metrics(),
            None,
        )
        .unwrap_err();
    assert!(matches!(err.kind(), FormatErrorKind::MissingOutlines));

    // Failed registrations leave the registry untouched.
    assert!(registry.is_empty());
}

#[test]
fn writer_rejects_type1_with_identity_encoding() {
    let mut registry = FontRegistry::new();
    registry
        .add_font_pair(
            "Jacquard24-Regular.afm",
            Encoding::IdentityH,
            true,
            afm_metrics(),
            pfb_outlines(),
            None,
        )
        .unwrap();
    registry
        .add_font(
            "Jacquard24-Regular.ttf",
            Encoding::IdentityH,
            true,
            truetype_font(),
            Some("Fallback"),
        )
        .unwrap();

    let embedder = Embedder::new(&registry);
    let mut writer = PdfWriter::new();
    let err = embedder.realize(&mut writer, FACE_FAMILY).unwrap_err();
    match &err {
        RealizeError::Embed { family, source } => {
            assert_eq!(family, FACE_FAMILY);
            assert!(
                matches!(
                    source,
                    crate::EmbedError::EncodingMismatch {
                        kind: FontProgramKind::Type1,
                        ..
                    }
                ),
                "{source:?}"
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The failure is fatal to that document only; the registry still
    // resolves, and a fresh document builds.
    assert!(registry.resolve(FACE_FAMILY).is_some());
    let mut writer = PdfWriter::new();
    let font = embedder.realize(&mut writer, "Fallback").unwrap();
    writer.show_text(&font, 12.0, "Test");
    writer.finish().unwrap();
}

#[test]
fn writer_rejects_duplicate_resources() {
    let mut registry = FontRegistry::new();
    Container::TrueType.register(&mut registry, None);

    let embedder = Embedder::new(&registry);
    let mut writer = PdfWriter::new();
    // Exercise the adapter through the trait object it accepts.
    {
        let writer: &mut dyn crate::DocumentWriter = &mut writer;
        embedder.realize(writer, FACE_FAMILY).unwrap();
        let err = embedder.realize(writer, FACE_FAMILY).unwrap_err();
        assert!(
            matches!(
                &err,
                RealizeError::Embed {
                    source: crate::EmbedError::DuplicateResource { .. },
                    ..
                }
            ),
            "{err:?}"
        );
    }
    // The first embedding is unaffected.
    let rendered = writer.finish().unwrap();
    assert_eq!(embedded_font_names(&rendered).len(), 1);
}

#[test]
fn referencing_font_without_embedding() {
    let mut registry = FontRegistry::new();
    registry
        .add_font(
            "Jacquard24-Regular.ttf",
            Encoding::IdentityH,
            false,
            truetype_font(),
            None,
        )
        .unwrap();

    let embedder = Embedder::new(&registry);
    let mut writer = PdfWriter::new();
    let font = embedder.realize(&mut writer, FACE_FAMILY).unwrap();
    writer.show_text(&font, 12.0, "Test");
    let rendered = writer.finish().unwrap();

    assert!(embedded_font_names(&rendered)[0].contains("Jacquard"));
    // Name-only reference: no descriptor points at a font program stream.
    let doc = Document::load_mem(&rendered).unwrap();
    let has_font_file = doc.objects.values().any(|object| {
        object.as_dict().is_ok_and(|dict| {
            dict.has(b"FontFile") || dict.has(b"FontFile2") || dict.has(b"FontFile3")
        })
    });
    assert!(!has_font_file);
}

#[test]
fn registering_fonts_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Jacquard24-Regular.ttf"), truetype_font()).unwrap();
    std::fs::write(dir.path().join("Jacquard24-Regular.afm"), afm_metrics()).unwrap();
    std::fs::write(dir.path().join("Jacquard24-Regular.pfb"), pfb_outlines()).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"not a font").unwrap();

    let mut registry = FontRegistry::new();
    let registered = registry
        .add_font_directory(dir.path(), Encoding::WinAnsi, true)
        .unwrap();
    assert_eq!(registered, 2);
    assert_eq!(registry.programs(FACE_FAMILY).len(), 2);
}

#[test]
fn registering_metrics_file_without_its_outline_sibling() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Jacquard24-Regular.afm");
    std::fs::write(&path, afm_metrics()).unwrap();

    let mut registry = FontRegistry::new();
    let err = registry
        .add_font_file(&path, Encoding::WinAnsi, true)
        .unwrap_err();
    assert!(matches!(err.kind(), FormatErrorKind::MissingOutlines));
}

#[test]
fn readme_is_up_to_date() {
    version_sync::assert_markdown_deps_updated!("README.md");
}
