//! Error types for class resolution and decompilation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for locator and orchestrator operations.
pub type DecompileResult<T> = Result<T, DecompileError>;

/// Errors that can occur while locating or decompiling a class.
///
/// Every variant is terminal for the request that produced it.
#[derive(Debug, Error)]
pub enum DecompileError {
    /// The input file does not exist.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The input is not a single class file (e.g. a JAR passed to the path tool).
    #[error("{path} is a JAR archive, not a class file; use decompile-from-jar instead")]
    NotAClassFile {
        /// Path that was rejected.
        path: PathBuf,
    },

    /// A required request parameter was not supplied.
    #[error("Missing required parameter: {name}")]
    MissingParameter {
        /// Parameter name as exposed to callers.
        name: &'static str,
    },

    /// No classpath directory contains the requested class.
    #[error("Could not find class file for package: {name} (searched {searched} classpath entries)")]
    PackageNotFoundOnClasspath {
        /// Dotted name that was searched for.
        name: String,
        /// Number of classpath directories searched.
        searched: usize,
    },

    /// The JAR holds no `.class` entries.
    #[error("No class files found in JAR: {path}")]
    EmptyArchive {
        /// Path of the archive.
        path: PathBuf,
    },

    /// The requested class is not one of the JAR's entries.
    #[error("Class {class_name} not found in JAR: {path}")]
    ClassNotFoundInArchive {
        /// Dotted class name that was requested.
        class_name: String,
        /// Path of the archive.
        path: PathBuf,
    },

    /// The JAR could not be opened, listed, or extracted.
    #[error("Failed to extract JAR {path}: {message}")]
    ExtractionFailed {
        /// Path of the archive.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// The external decompiler engine reported an error.
    #[error("{message}")]
    DecompilationFailed {
        /// The engine's message.
        message: String,
    },

    /// A class file exists but could not be read.
    #[error("Failed to read {path}")]
    ReadFailed {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A class name does not form a valid internal name.
    #[error("Invalid class name: {name:?}")]
    InvalidClassName {
        /// The offending name.
        name: String,
    },
}

impl DecompileError {
    /// Creates an extraction error from any displayable cause.
    pub fn extraction(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        Self::ExtractionFailed {
            path: path.into(),
            message: cause.to_string(),
        }
    }

    /// Maps an I/O error on `path` to `FileNotFound` or `ReadFailed`.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::ReadFailed { path, source }
        }
    }
}

/// Errors raised by a [`DecompilerEngine`](super::engine::DecompilerEngine).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine was handed bytes that are not a class file.
    #[error("Invalid class file: {message}")]
    InvalidClassFile {
        /// Description of what's wrong.
        message: String,
    },

    /// The engine could not obtain the class it was asked to decompile.
    #[error("Class bytes unavailable for {name}")]
    ClassUnavailable {
        /// Internal name that could not be looked up.
        name: String,
    },

    /// The CFR jar does not exist.
    #[error("CFR jar not found at {path} (set CFR_JAR or pass --cfr)")]
    CfrJarMissing {
        /// Path that was checked.
        path: PathBuf,
    },

    /// The Java runtime could not be launched.
    #[error("Failed to execute {java} (ensure a JRE/JDK is installed)")]
    Launch {
        /// Java executable that was invoked.
        java: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// CFR exited unsuccessfully.
    #[error("CFR decompilation failed: {stderr}")]
    Cfr {
        /// Trimmed stderr of the CFR process.
        stderr: String,
    },

    /// Preparing the engine's scratch directory failed.
    #[error("Failed to stage classes for decompilation")]
    Staging {
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Any other engine-specific failure.
    #[error("{0}")]
    Other(String),
}

/// A stage-prefixed failure of one of the public decompile operations.
///
/// The `Display` form is the stable, greppable message surfaced to tool callers.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// `decompile-from-path` failed.
    #[error("Failed to decompile class file: {0}")]
    ClassFile(#[source] DecompileError),

    /// `decompile-from-package` failed.
    #[error("Failed to decompile package: {0}")]
    Package(#[source] DecompileError),

    /// `decompile-from-jar` failed.
    #[error("Failed to decompile JAR file: {0}")]
    Jar(#[source] DecompileError),
}

impl ServiceError {
    /// Returns the underlying classified error.
    #[must_use]
    pub const fn kind(&self) -> &DecompileError {
        match self {
            Self::ClassFile(e) | Self::Package(e) | Self::Jar(e) => e,
        }
    }
}
