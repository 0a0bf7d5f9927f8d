//! The three public decompilation operations.
//!
//! Each operation resolves its input with the [`Locator`], hands the result to
//! the [`DecompileOrchestrator`] and wraps any failure with a stage prefix so
//! the caller can tell which kind of request went wrong.

use std::path::{Path, PathBuf};

use super::cfr::CfrEngine;
use super::engine::DecompileOptions;
use super::error::{DecompileError, DecompileResult, ServiceError};
use super::locator::{ClassFileInference, ClassIdentifier, DirectoryInference, Locator};
use super::orchestrator::DecompileOrchestrator;
use crate::config::{Config, PackageInferenceKind};

/// Locator plus orchestrator. Shared by every request; holds no per-request state.
#[derive(Debug)]
pub struct DecompilerService {
    locator: Locator,
    orchestrator: DecompileOrchestrator,
}

impl DecompilerService {
    /// Creates a service from its two collaborators.
    #[must_use]
    pub const fn new(locator: Locator, orchestrator: DecompileOrchestrator) -> Self {
        Self {
            locator,
            orchestrator,
        }
    }

    /// Builds the CFR-backed service described by `config`.
    #[must_use]
    pub fn from_config(config: &Config, cfr_jar: PathBuf) -> Self {
        let locator = Locator::new()
            .with_classpath_env_var(config.classpath.env_var.clone())
            .with_workspace_root(config.workspace.temp_root.clone())
            .with_inference(match config.classpath.package_inference {
                PackageInferenceKind::Directory => Box::new(DirectoryInference),
                PackageInferenceKind::ClassFile => Box::new(ClassFileInference),
            });

        tracing::info!(
            cfr_jar = %cfr_jar.display(),
            java = %config.decompiler.java,
            "Configured CFR engine"
        );

        let engine = CfrEngine::new(cfr_jar)
            .with_java(config.decompiler.java.clone())
            .with_max_staged_classes(config.decompiler.max_staged_classes);

        let orchestrator =
            DecompileOrchestrator::new(Box::new(engine)).with_options(DecompileOptions {
                hide_lang_imports: config.decompiler.hide_lang_imports,
                show_version: config.decompiler.show_version,
            });

        Self::new(locator, orchestrator)
    }

    /// The orchestrator used to decompile resolved classes.
    #[must_use]
    pub const fn orchestrator(&self) -> &DecompileOrchestrator {
        &self.orchestrator
    }

    /// The locator used to resolve requests.
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Decompiles a single `.class` file.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ClassFile`] wrapping the underlying failure.
    pub fn decompile_from_path(&self, class_file: &Path) -> Result<String, ServiceError> {
        self.run(&ClassIdentifier::Path(class_file.to_path_buf()))
    }

    /// Decompiles a class found by dotted name on `classpath` (or the
    /// environment classpath when empty).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Package`] wrapping the underlying failure.
    pub fn decompile_from_package(
        &self,
        name: &str,
        classpath: &[PathBuf],
    ) -> Result<String, ServiceError> {
        self.run(&ClassIdentifier::Package {
            name: name.to_string(),
            classpath: classpath.to_vec(),
        })
    }

    /// Decompiles one class out of a JAR.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Jar`] wrapping the underlying failure,
    /// including a missing `class_name`.
    pub fn decompile_from_jar(
        &self,
        jar: &Path,
        class_name: Option<&str>,
    ) -> Result<String, ServiceError> {
        self.run(&ClassIdentifier::Jar {
            jar: jar.to_path_buf(),
            class_name: class_name.map(str::to_string),
        })
    }

    /// Decompiles any identifier, prefixing errors by its mode.
    ///
    /// # Errors
    ///
    /// Returns the [`ServiceError`] variant matching the identifier's mode.
    pub fn decompile(&self, id: &ClassIdentifier) -> Result<String, ServiceError> {
        self.run(id)
    }

    fn run(&self, id: &ClassIdentifier) -> Result<String, ServiceError> {
        let wrap: fn(DecompileError) -> ServiceError = match id {
            ClassIdentifier::Path(_) => ServiceError::ClassFile,
            ClassIdentifier::Package { .. } => ServiceError::Package,
            ClassIdentifier::Jar { .. } => ServiceError::Jar,
        };

        self.resolve_and_decompile(id).map_err(|e| {
            let err = wrap(e);
            tracing::info!(error = %err, "Decompile request failed");
            err
        })
    }

    fn resolve_and_decompile(&self, id: &ClassIdentifier) -> DecompileResult<String> {
        let resolution = self.locator.resolve(id)?;
        let source = self.orchestrator.decompile(resolution)?;
        tracing::debug!(chars = source.len(), "Decompiled");
        Ok(source)
    }
}
