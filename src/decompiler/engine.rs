//! The seam between this crate and an external decompiler.
//!
//! An engine turns one class into source text. It does not read files
//! itself; it pulls class bytes on demand through a [`SourceLookup`]
//! capability supplied by the caller.

use super::error::EngineError;
use super::name::{ClassBytes, InternalName};

/// On-demand class byte lookup handed to an engine.
///
/// Returns `None` when the class is unknown. An empty buffer means "assume a
/// trivial class" rather than "missing".
pub type SourceLookup<'a> = dyn Fn(&str) -> Option<ClassBytes> + 'a;

/// Fixed output options passed to the engine on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecompileOptions {
    /// Omit imports of `java.lang` types.
    pub hide_lang_imports: bool,
    /// Embed the engine's version banner in the output.
    pub show_version: bool,
}

impl Default for DecompileOptions {
    fn default() -> Self {
        Self {
            hide_lang_imports: true,
            show_version: false,
        }
    }
}

/// An external bytecode-to-source decompiler.
pub trait DecompilerEngine: Send + Sync {
    /// Decompiles the class named `internal_name`.
    ///
    /// The engine obtains the primary class, and any auxiliary classes it
    /// wants, through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an engine-specific error if decompilation fails.
    fn decompile(
        &self,
        internal_name: &InternalName,
        lookup: &SourceLookup<'_>,
        options: &DecompileOptions,
    ) -> Result<String, EngineError>;
}
