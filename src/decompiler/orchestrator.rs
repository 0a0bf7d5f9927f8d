//! Drives the decompiler engine for one resolved class.

use super::engine::{DecompileOptions, DecompilerEngine};
use super::error::{DecompileError, DecompileResult};
use super::locator::ResolutionResult;
use super::name::ClassBytes;

/// Internal-name prefix of core-language classes.
///
/// Lookups under this prefix that nothing else answers get an empty buffer,
/// which tells the engine to assume a trivial class instead of reporting it
/// as unresolved.
pub const CORE_LANG_PREFIX: &str = "java/lang/";

/// Runs a [`DecompilerEngine`] over resolved classes.
pub struct DecompileOrchestrator {
    engine: Box<dyn DecompilerEngine>,
    options: DecompileOptions,
}

impl std::fmt::Debug for DecompileOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecompileOrchestrator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DecompileOrchestrator {
    /// Creates an orchestrator with the default options.
    #[must_use]
    pub fn new(engine: Box<dyn DecompilerEngine>) -> Self {
        Self {
            engine,
            options: DecompileOptions::default(),
        }
    }

    /// Replaces the options passed to the engine.
    #[must_use]
    pub const fn with_options(mut self, options: DecompileOptions) -> Self {
        self.options = options;
        self
    }

    /// The options passed to the engine.
    #[must_use]
    pub const fn options(&self) -> &DecompileOptions {
        &self.options
    }

    /// Decompiles a resolved class and returns the engine's source text verbatim.
    ///
    /// Consumes the resolution so its extraction workspace, if any, is removed
    /// when this call returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`DecompileError::DecompilationFailed`] with the engine's
    /// message if the engine fails.
    pub fn decompile(&self, resolution: ResolutionResult) -> DecompileResult<String> {
        let internal_name = resolution.internal_name().clone();

        let lookup = |name: &str| -> Option<ClassBytes> {
            if internal_name == *name {
                return Some(resolution.bytes().clone());
            }
            if let Some(bytes) = resolution.auxiliary(name) {
                return Some(bytes);
            }
            if name.starts_with(CORE_LANG_PREFIX) {
                return Some(ClassBytes::empty());
            }
            None
        };

        tracing::debug!(class = %internal_name, options = ?self.options, "Invoking decompiler");

        let result = self
            .engine
            .decompile(&internal_name, &lookup, &self.options)
            .map_err(|e| {
                tracing::warn!(class = %internal_name, error = %e, "Decompilation failed");
                DecompileError::DecompilationFailed {
                    message: e.to_string(),
                }
            });

        drop(resolution);
        result
    }
}
