//! JAR listing and extraction.
//!
//! A JAR is a zip archive. Decompiling one class out of it needs the whole
//! archive on disk, because the decompiler may ask for sibling classes
//! (superclasses, interfaces, nested classes) while it works.
//!
//! Extraction targets an [`ExtractionWorkspace`]: a uniquely named temporary
//! directory that is removed when the workspace is dropped, on every exit path.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zip::ZipArchive;

use super::error::{DecompileError, DecompileResult};
use super::name::CLASS_EXTENSION;

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "javadc-jar-";

fn open_archive(jar_path: &Path) -> DecompileResult<ZipArchive<BufReader<File>>> {
    let file = File::open(jar_path).map_err(|e| DecompileError::from_io(jar_path, e))?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| DecompileError::extraction(jar_path, e))
}

/// Lists every entry of the archive whose name ends in `.class`, in archive order.
///
/// # Errors
///
/// Returns `FileNotFound` if the JAR does not exist and `ExtractionFailed`
/// if it is not a readable zip archive.
pub fn list_class_entries(jar_path: &Path) -> DecompileResult<Vec<String>> {
    let mut archive = open_archive(jar_path)?;
    let suffix = format!(".{CLASS_EXTENSION}");

    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| DecompileError::extraction(jar_path, e))?;
        if !entry.is_dir() && entry.name().ends_with(&suffix) {
            entries.push(entry.name().to_string());
        }
    }
    Ok(entries)
}

/// Extracts the complete archive into `destination`.
///
/// An entry whose name would escape `destination` (absolute, or climbing
/// out with `..`) makes the zip reader reject the archive, so the whole
/// extraction fails with nothing written outside `destination`.
///
/// # Errors
///
/// Returns `ExtractionFailed` if the archive cannot be read or written out.
pub fn extract_all(jar_path: &Path, destination: &Path) -> DecompileResult<()> {
    let mut archive = open_archive(jar_path)?;
    archive
        .extract(destination)
        .map_err(|e| DecompileError::extraction(jar_path, e))
}

/// A temporary directory holding one request's extracted JAR contents.
///
/// The directory name carries a random suffix, so concurrent requests never
/// share or delete each other's workspace. Dropping the workspace removes the
/// directory; a failed removal is logged and otherwise ignored.
#[derive(Debug)]
pub struct ExtractionWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ExtractionWorkspace {
    /// Creates a fresh workspace under `root` (the system temp dir if `None`).
    ///
    /// # Errors
    ///
    /// Returns `ExtractionFailed` if the directory cannot be created.
    pub fn create(root: Option<&Path>, jar_path: &Path) -> DecompileResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| DecompileError::extraction(jar_path, format!("cannot create workspace: {e}")))?;

        let path = dir.path().to_path_buf();
        tracing::debug!(workspace = %path.display(), "Created extraction workspace");

        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Returns the workspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the on-disk location of `relative` inside the workspace.
    #[must_use]
    pub fn join(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }
}

impl Drop for ExtractionWorkspace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        match dir.close() {
            Ok(()) => {
                tracing::debug!(workspace = %self.path.display(), "Removed extraction workspace");
            }
            Err(e) => {
                tracing::warn!(
                    workspace = %self.path.display(),
                    error = %e,
                    "Failed to remove extraction workspace"
                );
            }
        }
    }
}
