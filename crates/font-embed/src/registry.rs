//! Family-indexed storage of loaded font programs.

use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use crate::{
    errors::{FormatError, FormatErrorKind},
    family::normalize_family,
    program::{Encoding, FontProgram, FontSource},
};

/// Registry mapping normalized family names to loaded font programs.
///
/// Registration happens before document generation begins; entries are
/// immutable afterwards, so a registry can be shared read-only across
/// concurrent document builds. Registering the same family again appends to
/// its entry rather than replacing it.
#[derive(Debug, Default)]
pub struct FontRegistry {
    families: BTreeMap<String, Vec<Arc<FontProgram>>>,
    // Secondary index: programs registered with an explicit override name
    // are also resolvable by that name, whatever family they landed under.
    overrides: BTreeMap<String, Arc<FontProgram>>,
}

impl FontRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single-buffer font program. The container kind is
    /// selected by the extension of `name_or_path` (`.ttf`, `.ttc`, `.otf`);
    /// the registration key is the family name discovered inside the
    /// program, falling back to the identifier's file stem.
    ///
    /// # Errors
    ///
    /// Fails if the extension is unknown, names a paired metrics format, or
    /// if the buffer does not parse as the indicated container. The registry
    /// is unchanged on error.
    pub fn add_font(
        &mut self,
        name_or_path: &str,
        encoding: Encoding,
        embed: bool,
        data: Vec<u8>,
        override_name: Option<&str>,
    ) -> Result<(), FormatError> {
        let source = FontSource::from_extension(name_or_path, data, None)?;
        self.load_and_insert(name_or_path, source, encoding, embed, override_name)
    }

    /// Registers a paired metrics + outline program (`.afm` or `.pfm`
    /// extension on `name_or_path`). Both halves are required; supplying
    /// them through this single call keeps the registration atomic.
    ///
    /// # Errors
    ///
    /// Fails if the extension names a single-buffer format, or if either
    /// half is unparsable or inconsistent with the other.
    pub fn add_font_pair(
        &mut self,
        name_or_path: &str,
        encoding: Encoding,
        embed: bool,
        metrics: Vec<u8>,
        outlines: Vec<u8>,
        override_name: Option<&str>,
    ) -> Result<(), FormatError> {
        let source = FontSource::from_extension(name_or_path, metrics, Some(outlines))?;
        self.load_and_insert(name_or_path, source, encoding, embed, override_name)
    }

    /// Reads a font file from disk and registers it. Paired metrics formats
    /// look for the sibling `.pfb` next to the metrics file.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures in addition to the [`Self::add_font`] /
    /// [`Self::add_font_pair`] error conditions.
    pub fn add_font_file(
        &mut self,
        path: &Path,
        encoding: Encoding,
        embed: bool,
    ) -> Result<(), FormatError> {
        let name = path.to_string_lossy().into_owned();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
        match extension.as_deref() {
            Some("afm" | "pfm") => {
                let metrics = fs::read(path)?;
                let outline_path = path.with_extension("pfb");
                if !outline_path.exists() {
                    return Err(FormatError::new(FormatErrorKind::MissingOutlines));
                }
                let outlines = fs::read(outline_path)?;
                self.add_font_pair(&name, encoding, embed, metrics, outlines, None)
            }
            Some("ttf" | "ttc" | "otf") => {
                let data = fs::read(path)?;
                self.add_font(&name, encoding, embed, data, None)
            }
            _ => Err(FormatError::new(FormatErrorKind::UnknownExtension)),
        }
    }

    /// Registers every supported font file in a directory (not recursing),
    /// skipping files that fail to parse. Returns the number of programs
    /// registered.
    ///
    /// # Errors
    ///
    /// Fails only on directory enumeration errors; per-file failures are
    /// logged and skipped.
    pub fn add_font_directory(
        &mut self,
        path: &Path,
        encoding: Encoding,
        embed: bool,
    ) -> Result<usize, FormatError> {
        let mut registered = 0;
        for entry in fs::read_dir(path).map_err(FormatError::from)? {
            let entry_path = entry.map_err(FormatError::from)?.path();
            let extension = entry_path
                .extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
            match extension.as_deref() {
                Some("ttf" | "ttc" | "otf" | "afm" | "pfm") => {
                    match self.add_font_file(&entry_path, encoding, embed) {
                        Ok(()) => registered += 1,
                        Err(err) => {
                            log::warn!("skipping font file {}: {err}", entry_path.display());
                        }
                    }
                }
                // Outline programs are picked up alongside their metrics.
                Some("pfb") => {}
                _ => log::debug!("ignoring non-font file {}", entry_path.display()),
            }
        }
        Ok(registered)
    }

    /// Registers an already-loaded program, returning the normalized family
    /// name it was registered under.
    pub fn insert(&mut self, program: FontProgram) -> String {
        let key = program
            .names()
            .preferred()
            .or_else(|| program.override_name())
            .map_or_else(|| "Unknown".to_owned(), normalize_family);
        self.insert_with_key(key.clone(), Arc::new(program));
        key
    }

    /// Registers an already-loaded program under an explicit family name
    /// instead of the one discovered inside the program. The name is
    /// normalized like any style-rule token.
    pub fn insert_as(&mut self, family: &str, program: FontProgram) {
        self.insert_with_key(normalize_family(family), Arc::new(program));
    }

    fn load_and_insert(
        &mut self,
        name_or_path: &str,
        source: FontSource,
        encoding: Encoding,
        embed: bool,
        override_name: Option<&str>,
    ) -> Result<(), FormatError> {
        let program = FontProgram::load(source, encoding, embed, override_name.map(str::to_owned))?;
        let key = program
            .names()
            .preferred()
            .map_or_else(|| normalize_family(file_stem(name_or_path)), normalize_family);
        log::debug!(
            "registered {} program for family `{key}`",
            program.kind()
        );
        self.insert_with_key(key, Arc::new(program));
        Ok(())
    }

    fn insert_with_key(&mut self, key: String, program: Arc<FontProgram>) {
        if let Some(name) = program.override_name() {
            let override_key = normalize_family(name);
            if self
                .overrides
                .insert(override_key, Arc::clone(&program))
                .is_some()
            {
                log::warn!("override name `{name}` registered more than once; latest wins");
            }
        }
        self.families.entry(key).or_default().push(program);
    }

    /// Resolves a requested family name to a registered program.
    ///
    /// The request is normalized, then matched against the override index
    /// first and the family index second. `None` is recoverable: the caller
    /// may retry with a fallback family.
    pub fn resolve(&self, requested: &str) -> Option<&Arc<FontProgram>> {
        let key = normalize_family(requested);
        if let Some(program) = self.overrides.get(&key) {
            return Some(program);
        }
        let program = self.families.get(&key).and_then(|programs| programs.first());
        if program.is_none() {
            log::debug!("no font registered for family `{key}`");
        }
        program
    }

    /// Gets all programs registered for a family, in registration order.
    pub fn programs(&self, family: &str) -> &[Arc<FontProgram>] {
        self.families
            .get(&normalize_family(family))
            .map_or(&[], Vec::as_slice)
    }

    /// Iterates over the registered family names.
    pub fn families(&self) -> impl Iterator<Item = &str> + '_ {
        self.families.keys().map(String::as_str)
    }

    /// Checks whether no programs are registered.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

fn file_stem(name_or_path: &str) -> &str {
    let name = name_or_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name_or_path);
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}
