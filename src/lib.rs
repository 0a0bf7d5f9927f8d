//! java-decompiler-mcp: MCP server that decompiles Java bytecode
//!
//! Exposes three tools to MCP clients:
//!
//! - `decompile-from-path`: a `.class` file on disk
//! - `decompile-from-package`: a dotted class name searched on a classpath
//! - `decompile-from-jar`: one class inside a JAR
//!
//! # Architecture
//!
//! Decompilation itself is delegated to CFR, run as a `java` subprocess. This
//! crate resolves what to decompile, feeds the decompiler the classes it
//! references and shapes the output into MCP tool results.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`decompiler`]: Class resolution and decompilation
//! - [`error`]: Configuration error types
//! - [`mcp`]: MCP protocol implementation (stdio and HTTP)

pub mod config;
pub mod decompiler;
pub mod error;
pub mod mcp;
