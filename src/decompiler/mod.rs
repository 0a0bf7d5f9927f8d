//! Java class decompilation.
//!
//! This module turns compiled Java classes back into source text. A request
//! names its class in one of three ways:
//!
//! - an absolute path to a `.class` file
//! - a dotted class name plus a classpath to search
//! - a JAR file plus the class name inside it
//!
//! # Architecture
//!
//! The [`Locator`] resolves a request to class bytes and an internal name.
//! The [`DecompileOrchestrator`] hands them to a [`DecompilerEngine`] together
//! with a lookup capability for the other classes the engine may need. The
//! bundled engine, [`CfrEngine`], runs the CFR decompiler in a `java`
//! subprocess. [`DecompilerService`] ties both together and prefixes errors
//! with the stage that failed.
//!
//! JAR requests extract the archive into an [`ExtractionWorkspace`] that lives
//! exactly as long as the request.

pub mod archive;
pub mod cfr;
pub mod classfile;
pub mod engine;
pub mod error;
pub mod locator;
pub mod name;
pub mod orchestrator;
pub mod service;

pub use archive::ExtractionWorkspace;
pub use cfr::CfrEngine;
pub use engine::{DecompileOptions, DecompilerEngine, SourceLookup};
pub use error::{DecompileError, DecompileResult, EngineError, ServiceError};
pub use locator::{
    ClassFileInference, ClassIdentifier, DirectoryInference, Locator, PackageInference,
    ResolutionResult,
};
pub use name::{ClassBytes, InternalName};
pub use orchestrator::DecompileOrchestrator;
pub use service::DecompilerService;
