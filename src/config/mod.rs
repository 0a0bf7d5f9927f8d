//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk, applying
//! environment overrides and parsing it into validated, type-safe structures.
//!
//! # Configuration File Locations
//!
//! 1. Path given as the positional CLI argument (must exist)
//! 2. Default location (optional; built-in defaults apply if absent):
//!    - **Linux/macOS:** `~/.java-decompiler-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.java-decompiler-mcp\config.json`
//!
//! # Environment Overrides
//!
//! | Variable | Effect |
//! |---|---|
//! | `CFR_JAR` | `decompiler.cfr_jar` |
//! | `JAVADC_JAVA` | `decompiler.java` |
//! | `PORT` | `http.port` |
//! | `MCP_USE_HTTP=true` | start the HTTP transport |

mod settings;

pub use settings::{
    ClasspathConfig, Config, DecompilerConfig, HttpConfig, LoggingConfig, PackageInferenceKind,
    WorkspaceConfig,
};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Overrides `decompiler.cfr_jar`.
pub const CFR_JAR_ENV: &str = "CFR_JAR";
/// Overrides `decompiler.java`.
pub const JAVA_ENV: &str = "JAVADC_JAVA";
/// Overrides `http.port`.
pub const PORT_ENV: &str = "PORT";
/// Selects the HTTP transport when set to `true`.
pub const USE_HTTP_ENV: &str = "MCP_USE_HTTP";

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.java-decompiler-mcp/`
/// - **Windows:** `%USERPROFILE%\.java-decompiler-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".java-decompiler-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Returns the default location of `cfr.jar`.
#[must_use]
pub fn default_cfr_jar() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("tools").join("cfr.jar"))
}

/// Loads and parses the configuration file.
///
/// An explicit `path` must exist. With `None`, the default location is used
/// if a file is there and built-in defaults otherwise.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - A field is invalid
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => {
                tracing::debug!("No configuration file, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}

/// Applies environment overrides to `config`, reading variables through
/// `lookup`. Empty values are ignored.
///
/// # Errors
///
/// Returns a validation error if `PORT` is not a valid port number.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(jar) = get(CFR_JAR_ENV) {
        config.decompiler.cfr_jar = Some(PathBuf::from(jar));
    }

    if let Some(java) = get(JAVA_ENV) {
        config.decompiler.java = java;
    }

    if let Some(port) = get(PORT_ENV) {
        config.http.port = match port.trim().parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => {
                return Err(ConfigError::ValidationError {
                    message: format!("{PORT_ENV} must be a port number, got '{port}'"),
                });
            }
        };
    }

    Ok(())
}

/// Whether the environment asks for the HTTP transport.
pub fn http_requested<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(USE_HTTP_ENV).is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Picks the CFR jar: the CLI value, then `decompiler.cfr_jar` (which
/// already carries `CFR_JAR`), then the default install location.
///
/// The jar is not checked for existence here; a missing jar fails each
/// decompile request instead of startup.
#[must_use]
pub fn resolve_cfr_jar(cli: Option<&Path>, decompiler: &DecompilerConfig) -> PathBuf {
    cli.map(Path::to_path_buf)
        .or_else(|| decompiler.cfr_jar.clone())
        .or_else(default_cfr_jar)
        .unwrap_or_else(|| PathBuf::from("cfr.jar"))
}
