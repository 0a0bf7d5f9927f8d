//! CFR decompiler integration.
//!
//! CFR runs as a `java -jar cfr.jar` subprocess, so it cannot call back into
//! this process for the classes it needs. Before launching it, the engine
//! walks the primary class's constant pool, asks the [`SourceLookup`] for
//! each referenced class, and writes the answers into a private staging
//! directory that CFR receives as `--extraclasspath`.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

use super::classfile;
use super::engine::{DecompileOptions, DecompilerEngine, SourceLookup};
use super::error::EngineError;
use super::name::{ClassBytes, InternalName};

/// Default cap on classes staged for one decompilation.
pub const DEFAULT_MAX_STAGED_CLASSES: usize = 512;

/// Decompiles classes with CFR.
#[derive(Debug, Clone)]
pub struct CfrEngine {
    cfr_jar: PathBuf,
    java: String,
    max_staged_classes: usize,
}

impl CfrEngine {
    /// Creates an engine that runs `cfr_jar` with `java` from `PATH`.
    #[must_use]
    pub fn new(cfr_jar: PathBuf) -> Self {
        Self {
            cfr_jar,
            java: "java".to_string(),
            max_staged_classes: DEFAULT_MAX_STAGED_CLASSES,
        }
    }

    /// Uses a specific Java executable.
    #[must_use]
    pub fn with_java(mut self, java: impl Into<String>) -> Self {
        self.java = java.into();
        self
    }

    /// Caps the number of auxiliary classes written to the staging directory.
    #[must_use]
    pub const fn with_max_staged_classes(mut self, max: usize) -> Self {
        self.max_staged_classes = max;
        self
    }

    /// Path of the CFR jar.
    #[must_use]
    pub fn cfr_jar(&self) -> &Path {
        &self.cfr_jar
    }

    fn java_command(&self, args: &[&str]) -> Result<Output, EngineError> {
        let launch = |source| EngineError::Launch {
            java: self.java.clone(),
            source,
        };

        #[cfg(windows)]
        {
            let lower = self.java.to_ascii_lowercase();
            if lower.ends_with(".cmd") || lower.ends_with(".bat") {
                return Command::new("cmd")
                    .arg("/C")
                    .arg(&self.java)
                    .args(args)
                    .output()
                    .map_err(launch);
            }
        }

        Command::new(&self.java).args(args).output().map_err(launch)
    }

    /// Writes the primary class and everything reachable from it through
    /// `lookup` into `stage`. Returns the primary class file's path.
    fn stage_classes(
        &self,
        stage: &Path,
        internal_name: &InternalName,
        primary: &ClassBytes,
        lookup: &SourceLookup<'_>,
    ) -> Result<PathBuf, EngineError> {
        let info = classfile::parse(primary.as_bytes()).map_err(|e| {
            EngineError::InvalidClassFile {
                message: format!("{internal_name}: {e}"),
            }
        })?;

        // Stage under the declared name so CFR's own lookups line up.
        let declared = InternalName::new(info.this_class.clone())
            .unwrap_or_else(|_| internal_name.clone());
        let primary_path = write_staged(stage, &declared, primary)?;

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(internal_name.as_str().to_string());
        seen.insert(info.this_class);

        let mut queue: VecDeque<String> = info.referenced_classes.into_iter().collect();
        let mut staged = 0usize;

        while let Some(name) = queue.pop_front() {
            if staged >= self.max_staged_classes {
                tracing::debug!(limit = self.max_staged_classes, "Staging limit reached");
                break;
            }
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(bytes) = lookup(&name) else {
                continue;
            };
            // Empty buffers are placeholders for core classes the JRE provides.
            if bytes.is_empty() {
                continue;
            }
            let Ok(aux_name) = InternalName::new(name.as_str()) else {
                continue;
            };

            write_staged(stage, &aux_name, &bytes)?;
            staged += 1;

            match classfile::parse(bytes.as_bytes()) {
                Ok(aux) => queue.extend(aux.referenced_classes),
                Err(e) => tracing::debug!(class = %name, error = %e, "Staged unreadable class"),
            }
        }

        tracing::debug!(
            class = %internal_name,
            staged,
            stage = %stage.display(),
            "Staged auxiliary classes"
        );

        Ok(primary_path)
    }
}

fn write_staged(stage: &Path, name: &InternalName, bytes: &ClassBytes) -> Result<PathBuf, EngineError> {
    let path = stage.join(name.class_file_path());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| EngineError::Staging { source })?;
    }
    fs::write(&path, bytes.as_bytes()).map_err(|source| EngineError::Staging { source })?;
    Ok(path)
}

const fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn path_arg(path: &Path) -> Result<&str, EngineError> {
    path.to_str()
        .ok_or_else(|| EngineError::Other(format!("path is not valid UTF-8: {}", path.display())))
}

impl DecompilerEngine for CfrEngine {
    fn decompile(
        &self,
        internal_name: &InternalName,
        lookup: &SourceLookup<'_>,
        options: &DecompileOptions,
    ) -> Result<String, EngineError> {
        let primary = lookup(internal_name.as_str()).ok_or_else(|| EngineError::ClassUnavailable {
            name: internal_name.to_string(),
        })?;
        if !classfile::has_class_magic(primary.as_bytes()) {
            return Err(EngineError::InvalidClassFile {
                message: format!("{internal_name}: missing class-file magic"),
            });
        }

        let stage = tempfile::Builder::new()
            .prefix("javadc-cfr-")
            .tempdir()
            .map_err(|source| EngineError::Staging { source })?;
        let primary_path = self.stage_classes(stage.path(), internal_name, &primary, lookup)?;

        if !self.cfr_jar.is_file() {
            return Err(EngineError::CfrJarMissing {
                path: self.cfr_jar.clone(),
            });
        }

        let output = self.java_command(&[
            "-jar",
            path_arg(&self.cfr_jar)?,
            path_arg(&primary_path)?,
            "--extraclasspath",
            path_arg(stage.path())?,
            "--hidelangimports",
            flag(options.hide_lang_imports),
            "--showversion",
            flag(options.show_version),
            "--silent",
            "true",
        ])?;

        close_stage(stage);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(status = ?output.status.code(), "CFR exited unsuccessfully");
            return Err(EngineError::Cfr {
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn close_stage(stage: TempDir) {
    let path = stage.path().to_path_buf();
    if let Err(e) = stage.close() {
        tracing::warn!(stage = %path.display(), error = %e, "Failed to remove CFR staging directory");
    }
}
