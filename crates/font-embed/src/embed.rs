//! Resolving requested family names into embedded font resources.

use crate::{
    errors::{EmbedError, RealizeError},
    program::FontProgram,
    registry::FontRegistry,
};

/// Handle to a font resource embedded into an output document.
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    /// Resource name allocated by the document writer (e.g. `F1`). Stable
    /// for the lifetime of the produced document.
    pub resource_name: String,
    /// Descriptor name the font appears under, discoverable by independent
    /// readers of the document. Contains the override name if one was set,
    /// else a name derived from the program's own internal name.
    pub base_font: String,
}

/// Contract between this subsystem and a document writer.
///
/// The writer owns resource-name allocation and the byte layout of the
/// emitted document; implementations only promise that the returned names
/// are stable and discoverable per [`EmbeddedFont`].
pub trait DocumentWriter {
    /// Embeds a font program into the document being written.
    ///
    /// # Errors
    ///
    /// Returns an [`EmbedError`] if the writer refuses the payload (corrupt
    /// program, disallowed encoding combination, or a duplicate resource).
    /// Such a failure is fatal to the document, not to the caller's
    /// registry.
    fn embed_font(&mut self, program: &FontProgram) -> Result<EmbeddedFont, EmbedError>;
}

/// Resolves requested family names against a registry and realizes them
/// through a document writer.
///
/// Each request either resolves and embeds, terminates with `NotFound`
/// (the caller picks a fallback family), or terminates with `Embed`
/// (fatal to the document being built). The registry is never modified.
#[derive(Debug, Clone, Copy)]
pub struct Embedder<'a> {
    registry: &'a FontRegistry,
}

impl<'a> Embedder<'a> {
    /// Creates an embedder over a registry. Registration is expected to be
    /// finished; the registry is only read from here on.
    pub fn new(registry: &'a FontRegistry) -> Self {
        Self { registry }
    }

    /// Realizes a font for `requested` (the literal family-name token as
    /// written in a style rule) in the document written by `writer`.
    ///
    /// # Errors
    ///
    /// [`RealizeError::NotFound`] if no program is registered for the
    /// family; [`RealizeError::Embed`] if the writer rejects the resolved
    /// program.
    pub fn realize<W: DocumentWriter + ?Sized>(
        &self,
        writer: &mut W,
        requested: &str,
    ) -> Result<EmbeddedFont, RealizeError> {
        let Some(program) = self.registry.resolve(requested) else {
            return Err(RealizeError::NotFound {
                family: requested.to_owned(),
            });
        };
        writer.embed_font(program).map_err(|source| {
            log::warn!("document writer rejected font for `{requested}`: {source}");
            RealizeError::Embed {
                family: requested.to_owned(),
                source,
            }
        })
    }
}
