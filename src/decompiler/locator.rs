//! Class resolution.
//!
//! The [`Locator`] turns a caller-supplied [`ClassIdentifier`] into the bytes of
//! one compiled class plus the internal name the decompiler needs:
//!
//! - **Path**: an absolute `.class` file. The package is inferred from the
//!   directory layout by a swappable [`PackageInference`] strategy.
//! - **Package**: a dotted class name searched for on an ordered classpath.
//! - **Jar**: a class inside a JAR. The whole archive is extracted into an
//!   [`ExtractionWorkspace`] so sibling classes can be looked up on demand.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use super::archive::{self, ExtractionWorkspace};
use super::classfile;
use super::error::{DecompileError, DecompileResult};
use super::name::{ClassBytes, InternalName, CLASS_EXTENSION};

/// Environment variable consulted when no classpath is given.
pub const DEFAULT_CLASSPATH_ENV: &str = "CLASSPATH";

/// Looks up auxiliary classes by internal name during decompilation.
pub type AuxiliaryResolver = Box<dyn Fn(&str) -> Option<ClassBytes> + Send + Sync>;

/// What the caller asked to decompile. Exactly one mode per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassIdentifier {
    /// An absolute path to a `.class` file.
    Path(PathBuf),
    /// A dotted class name and the directories to search for it.
    Package {
        /// Dotted class name, e.g. `com.example.Foo`.
        name: String,
        /// Ordered classpath; empty means "use the environment".
        classpath: Vec<PathBuf>,
    },
    /// A class inside a JAR.
    Jar {
        /// Path to the archive.
        jar: PathBuf,
        /// Dotted class name; mandatory, but checked by the locator.
        class_name: Option<String>,
    },
}

/// A located class, ready to hand to the decompiler.
pub struct ResolutionResult {
    internal_name: InternalName,
    bytes: ClassBytes,
    auxiliary: Option<AuxiliaryResolver>,
    workspace: Option<ExtractionWorkspace>,
}

impl ResolutionResult {
    /// Creates a result with no auxiliary resolver.
    #[must_use]
    pub const fn new(internal_name: InternalName, bytes: ClassBytes) -> Self {
        Self {
            internal_name,
            bytes,
            auxiliary: None,
            workspace: None,
        }
    }

    /// Attaches a resolver for other classes referenced during decompilation.
    #[must_use]
    pub fn with_auxiliary(mut self, resolver: AuxiliaryResolver) -> Self {
        self.auxiliary = Some(resolver);
        self
    }

    /// Attaches the workspace the auxiliary resolver reads from. The
    /// workspace is removed when this result is dropped.
    #[must_use]
    pub fn with_workspace(mut self, workspace: ExtractionWorkspace) -> Self {
        self.workspace = Some(workspace);
        self
    }

    /// The resolved internal name.
    #[must_use]
    pub const fn internal_name(&self) -> &InternalName {
        &self.internal_name
    }

    /// The primary class bytes.
    #[must_use]
    pub const fn bytes(&self) -> &ClassBytes {
        &self.bytes
    }

    /// Looks up an auxiliary class. `None` if there is no resolver or the
    /// class is unknown to it.
    #[must_use]
    pub fn auxiliary(&self, name: &str) -> Option<ClassBytes> {
        self.auxiliary.as_ref().and_then(|resolve| resolve(name))
    }

    /// Whether an auxiliary resolver is attached.
    #[must_use]
    pub const fn has_auxiliary(&self) -> bool {
        self.auxiliary.is_some()
    }

    /// Path of the extraction workspace, if this result owns one.
    #[must_use]
    pub fn workspace_path(&self) -> Option<&Path> {
        self.workspace.as_ref().map(ExtractionWorkspace::path)
    }
}

impl fmt::Debug for ResolutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionResult")
            .field("internal_name", &self.internal_name)
            .field("bytes", &self.bytes)
            .field("auxiliary", &self.auxiliary.is_some())
            .field("workspace", &self.workspace_path())
            .finish()
    }
}

/// Strategy for recovering an internal name from a bare class file path.
pub trait PackageInference: Send + Sync {
    /// Derives the internal name of the class stored at `class_file`.
    ///
    /// # Errors
    ///
    /// Returns [`DecompileError::InvalidClassName`] if no valid name can be formed.
    fn infer(&self, class_file: &Path, bytes: &ClassBytes) -> DecompileResult<InternalName>;
}

fn package_segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_.]*$").expect("valid regex"))
}

/// Best-effort package recovery from the directory layout.
///
/// Walks upward from the file's directory collecting segments that look like
/// Java package names (`^[a-z][a-z0-9_.]*$`) and stops at the first that
/// doesn't. It cannot tell a package directory from an unrelated lowercase
/// directory, so `/home/user/Foo.class` yields `home/user/Foo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryInference;

impl DirectoryInference {
    /// Applies the heuristic to a path without reading the file.
    ///
    /// # Errors
    ///
    /// Returns [`DecompileError::InvalidClassName`] if the file name does not
    /// form a valid class name.
    pub fn internal_name_for(class_file: &Path) -> DecompileResult<InternalName> {
        let file_name = class_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let simple_name = file_name
            .strip_suffix(&format!(".{CLASS_EXTENSION}"))
            .unwrap_or(&file_name);

        let mut package: Vec<String> = Vec::new();
        if let Some(dir) = class_file.parent() {
            for component in dir.components().rev() {
                let Component::Normal(segment) = component else {
                    break;
                };
                let segment = segment.to_string_lossy();
                if !package_segment_pattern().is_match(&segment) {
                    break;
                }
                // A dotted directory name stands for several package levels.
                for part in segment.rsplit('.').filter(|p| !p.is_empty()) {
                    package.push(part.to_string());
                }
            }
        }
        package.reverse();

        InternalName::from_parts(&package, simple_name)
    }
}

impl PackageInference for DirectoryInference {
    fn infer(&self, class_file: &Path, _bytes: &ClassBytes) -> DecompileResult<InternalName> {
        Self::internal_name_for(class_file)
    }
}

/// Reads the name the class file declares for itself.
///
/// Falls back to [`DirectoryInference`] when the bytes are not a readable
/// class file, leaving the decompiler to report the malformed input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassFileInference;

impl PackageInference for ClassFileInference {
    fn infer(&self, class_file: &Path, bytes: &ClassBytes) -> DecompileResult<InternalName> {
        match classfile::parse(bytes.as_bytes()) {
            Ok(info) => InternalName::new(info.this_class),
            Err(e) => {
                tracing::debug!(
                    path = %class_file.display(),
                    error = %e,
                    "Class file unreadable, falling back to directory inference"
                );
                DirectoryInference::internal_name_for(class_file)
            }
        }
    }
}

/// Resolves class identifiers to class bytes.
pub struct Locator {
    classpath_env_var: String,
    workspace_root: Option<PathBuf>,
    inference: Box<dyn PackageInference>,
}

impl Default for Locator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("classpath_env_var", &self.classpath_env_var)
            .field("workspace_root", &self.workspace_root)
            .finish_non_exhaustive()
    }
}

impl Locator {
    /// Creates a locator reading `CLASSPATH`, extracting into the system temp
    /// directory and inferring packages from directory names.
    #[must_use]
    pub fn new() -> Self {
        Self {
            classpath_env_var: DEFAULT_CLASSPATH_ENV.to_string(),
            workspace_root: None,
            inference: Box::new(DirectoryInference),
        }
    }

    /// Uses a different environment variable for the fallback classpath.
    #[must_use]
    pub fn with_classpath_env_var(mut self, name: impl Into<String>) -> Self {
        self.classpath_env_var = name.into();
        self
    }

    /// Creates extraction workspaces under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_workspace_root(mut self, root: Option<PathBuf>) -> Self {
        self.workspace_root = root;
        self
    }

    /// Replaces the package inference strategy used by [`Self::resolve_path`].
    #[must_use]
    pub fn with_inference(mut self, inference: Box<dyn PackageInference>) -> Self {
        self.inference = inference;
        self
    }

    /// Resolves any identifier.
    ///
    /// # Errors
    ///
    /// Returns the error of the mode-specific operation.
    pub fn resolve(&self, id: &ClassIdentifier) -> DecompileResult<ResolutionResult> {
        match id {
            ClassIdentifier::Path(path) => self.resolve_path(path),
            ClassIdentifier::Package { name, classpath } => self.resolve_package(name, classpath),
            ClassIdentifier::Jar { jar, class_name } => {
                self.resolve_jar(jar, class_name.as_deref())
            }
        }
    }

    /// Resolves a single `.class` file.
    ///
    /// # Errors
    ///
    /// - `NotAClassFile` if the path ends in `.jar` (checked before touching disk)
    /// - `FileNotFound` / `ReadFailed` if the file cannot be read
    /// - `InvalidClassName` if no valid internal name can be derived
    pub fn resolve_path(&self, path: &Path) -> DecompileResult<ResolutionResult> {
        if is_jar_path(path) {
            return Err(DecompileError::NotAClassFile {
                path: path.to_path_buf(),
            });
        }

        let bytes = read_class(path)?;
        let internal_name = self.inference.infer(path, &bytes)?;

        tracing::info!(
            mode = "path",
            path = %path.display(),
            internal_name = %internal_name,
            size = bytes.len(),
            "Resolved class file"
        );

        Ok(ResolutionResult::new(internal_name, bytes))
    }

    /// Resolves a dotted class name against a classpath.
    ///
    /// # Errors
    ///
    /// - `InvalidClassName` if `name` is not a valid class name
    /// - `PackageNotFoundOnClasspath` if no directory contains the class
    /// - `ReadFailed` if the matching file cannot be read
    pub fn resolve_package(
        &self,
        name: &str,
        classpath: &[PathBuf],
    ) -> DecompileResult<ResolutionResult> {
        let internal_name = InternalName::from_dotted(name)?;
        let found = self.find_on_classpath(&internal_name, name, classpath)?;
        let bytes = read_class(&found)?;

        tracing::info!(
            mode = "package",
            name,
            path = %found.display(),
            size = bytes.len(),
            "Resolved class on classpath"
        );

        Ok(ResolutionResult::new(internal_name, bytes))
    }

    /// The directories searched for `classpath`, in order.
    ///
    /// An empty `classpath` falls back to the configured environment
    /// variable split on the platform path separator, then to the current
    /// working directory.
    #[must_use]
    pub fn search_roots(&self, classpath: &[PathBuf]) -> Vec<PathBuf> {
        if !classpath.is_empty() {
            return classpath.to_vec();
        }

        match std::env::var_os(&self.classpath_env_var) {
            Some(value) if !value.is_empty() => std::env::split_paths(&value).collect(),
            _ => vec![std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))],
        }
    }

    /// Returns the first classpath entry containing the class. First match
    /// wins, even if later entries also contain it.
    fn find_on_classpath(
        &self,
        internal_name: &InternalName,
        name: &str,
        classpath: &[PathBuf],
    ) -> DecompileResult<PathBuf> {
        let relative = internal_name.class_file_path();
        let roots = self.search_roots(classpath);

        for root in &roots {
            let candidate = root.join(&relative);
            if candidate.is_file() {
                return Ok(candidate);
            }
            tracing::trace!(candidate = %candidate.display(), "Not on classpath entry");
        }

        Err(DecompileError::PackageNotFoundOnClasspath {
            name: name.to_string(),
            searched: roots.len(),
        })
    }

    /// Resolves a class inside a JAR.
    ///
    /// The archive is extracted in full into a fresh workspace owned by the
    /// returned result; its auxiliary resolver reads sibling classes from
    /// there and answers `None` for anything missing.
    ///
    /// # Errors
    ///
    /// - `MissingParameter` if `class_name` is absent (before any extraction)
    /// - `FileNotFound` if the JAR does not exist
    /// - `EmptyArchive` if the JAR has no `.class` entries
    /// - `ExtractionFailed` if the JAR cannot be read or extracted
    /// - `ClassNotFoundInArchive` if the class is not in the JAR
    pub fn resolve_jar(
        &self,
        jar: &Path,
        class_name: Option<&str>,
    ) -> DecompileResult<ResolutionResult> {
        let class_name = class_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or(DecompileError::MissingParameter { name: "className" })?;

        let entries = archive::list_class_entries(jar)?;
        if entries.is_empty() {
            return Err(DecompileError::EmptyArchive {
                path: jar.to_path_buf(),
            });
        }

        let workspace = ExtractionWorkspace::create(self.workspace_root.as_deref(), jar)?;
        archive::extract_all(jar, workspace.path())?;

        let internal_name = InternalName::from_dotted(class_name)?;
        let relative = internal_name.class_file_path();
        if !entries.iter().any(|entry| *entry == relative) {
            return Err(DecompileError::ClassNotFoundInArchive {
                class_name: class_name.to_string(),
                path: jar.to_path_buf(),
            });
        }

        let bytes = read_class(&workspace.join(&relative))?;

        tracing::info!(
            mode = "jar",
            jar = %jar.display(),
            internal_name = %internal_name,
            entries = entries.len(),
            workspace = %workspace.path().display(),
            "Resolved class from JAR"
        );

        let root = workspace.path().to_path_buf();
        let resolver: AuxiliaryResolver = Box::new(move |name: &str| read_from_dir(&root, name));

        Ok(ResolutionResult::new(internal_name, bytes)
            .with_auxiliary(resolver)
            .with_workspace(workspace))
    }
}

fn is_jar_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
}

fn read_class(path: &Path) -> DecompileResult<ClassBytes> {
    fs::read(path)
        .map(ClassBytes::new)
        .map_err(|e| DecompileError::from_io(path, e))
}

/// Reads `<root>/<name>.class`, or `None` if the name is invalid or absent.
fn read_from_dir(root: &Path, name: &str) -> Option<ClassBytes> {
    let name = InternalName::new(name).ok()?;
    fs::read(root.join(name.class_file_path()))
        .ok()
        .map(ClassBytes::new)
}
