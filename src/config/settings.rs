//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every section and field is optional; an empty object is a valid config.

use std::path::PathBuf;

use serde::Deserialize;

use crate::decompiler::locator::DEFAULT_CLASSPATH_ENV;
use crate::error::ConfigError;

/// Root configuration structure.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Decompiler engine settings.
    #[serde(default)]
    pub decompiler: DecompilerConfig,

    /// Class lookup settings.
    #[serde(default)]
    pub classpath: ClasspathConfig,

    /// JAR extraction settings.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decompiler.max_staged_classes == 0 {
            return Err(ConfigError::ValidationError {
                message: "decompiler.max_staged_classes must be at least 1".to_string(),
            });
        }

        if self.decompiler.java.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "decompiler.java must not be empty".to_string(),
            });
        }

        if self.classpath.env_var.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "classpath.env_var must not be empty".to_string(),
            });
        }

        if self.http.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "http.port must be between 1 and 65535".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }

        Ok(())
    }
}

/// Decompiler engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecompilerConfig {
    /// Path to `cfr.jar`. Overridden by `--cfr` and `CFR_JAR`.
    #[serde(default)]
    pub cfr_jar: Option<PathBuf>,

    /// Java launcher. Overridden by `JAVADC_JAVA`.
    #[serde(default = "default_java")]
    pub java: String,

    /// Omit `java.lang` imports from the output.
    #[serde(default = "default_true")]
    pub hide_lang_imports: bool,

    /// Include the decompiler's version banner in the output.
    #[serde(default)]
    pub show_version: bool,

    /// Upper bound on auxiliary classes handed to the decompiler per request.
    #[serde(default = "default_max_staged_classes")]
    pub max_staged_classes: usize,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            cfr_jar: None,
            java: default_java(),
            hide_lang_imports: default_true(),
            show_version: false,
            max_staged_classes: default_max_staged_classes(),
        }
    }
}

fn default_java() -> String {
    "java".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_max_staged_classes() -> usize {
    crate::decompiler::cfr::DEFAULT_MAX_STAGED_CLASSES
}

/// How package names are recovered and where classes are searched.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClasspathConfig {
    /// Environment variable read when a package lookup has no classpath.
    #[serde(default = "default_env_var")]
    pub env_var: String,

    /// Strategy for naming a bare `.class` file.
    #[serde(default)]
    pub package_inference: PackageInferenceKind,
}

impl Default for ClasspathConfig {
    fn default() -> Self {
        Self {
            env_var: default_env_var(),
            package_inference: PackageInferenceKind::default(),
        }
    }
}

fn default_env_var() -> String {
    DEFAULT_CLASSPATH_ENV.to_string()
}

/// Package inference strategy for `decompile-from-path`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageInferenceKind {
    /// Walk lowercase parent directories.
    #[default]
    Directory,
    /// Read the name the class file declares.
    ClassFile,
}

/// JAR extraction configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Parent directory of extraction workspaces. System temp dir if unset.
    #[serde(default)]
    pub temp_root: Option<PathBuf>,
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind. Overridden by `PORT` and `--port`.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    3000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.decompiler.java, "java");
        assert!(config.decompiler.hide_lang_imports);
        assert!(!config.decompiler.show_version);
        assert_eq!(config.classpath.env_var, "CLASSPATH");
        assert_eq!(
            config.classpath.package_inference,
            PackageInferenceKind::Directory
        );
        assert_eq!(config.http.port, 3000);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "decompiler": {
                "cfr_jar": "/opt/cfr/cfr.jar",
                "java": "/usr/lib/jvm/bin/java",
                "hide_lang_imports": false,
                "show_version": true,
                "max_staged_classes": 64
            },
            "classpath": {
                "env_var": "MY_CLASSPATH",
                "package_inference": "class_file"
            },
            "workspace": { "temp_root": "/var/tmp" },
            "http": { "host": "0.0.0.0", "port": 8080 },
            "logging": { "level": "debug" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.decompiler.cfr_jar,
            Some(PathBuf::from("/opt/cfr/cfr.jar"))
        );
        assert!(!config.decompiler.hide_lang_imports);
        assert!(config.decompiler.show_version);
        assert_eq!(config.decompiler.max_staged_classes, 64);
        assert_eq!(config.classpath.env_var, "MY_CLASSPATH");
        assert_eq!(
            config.classpath.package_inference,
            PackageInferenceKind::ClassFile
        );
        assert_eq!(config.workspace.temp_root, Some(PathBuf::from("/var/tmp")));
        assert_eq!(config.http.host, "0.0.0.0");
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn reject_invalid_values() {
        for json in [
            r#"{"decompiler": {"max_staged_classes": 0}}"#,
            r#"{"decompiler": {"java": " "}}"#,
            r#"{"classpath": {"env_var": ""}}"#,
            r#"{"http": {"port": 0}}"#,
            r#"{"logging": {"level": "loud"}}"#,
        ] {
            let config: Config = serde_json::from_str(json).unwrap();
            assert!(config.validate().is_err(), "{json} should be rejected");
        }
    }

    #[test]
    fn reject_unknown_inference_strategy() {
        let result: Result<Config, _> =
            serde_json::from_str(r#"{"classpath": {"package_inference": "magic"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let result: Result<Config, _> = serde_json::from_str(r#"{"allowed_paths": []}"#);
        assert!(result.is_err());

        let result: Result<Config, _> = serde_json::from_str(r#"{"http": {"tls": true}}"#);
        assert!(result.is_err());
    }
}
