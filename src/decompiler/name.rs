//! Class naming and byte buffers.
//!
//! The JVM refers to classes by their *internal name*: the binary name with
//! `/` separating package segments (`com/example/Foo`, `com/example/Foo$Inner`).
//! Source code uses the dotted form (`com.example.Foo`).

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::error::DecompileError;

/// File extension of compiled class files.
pub const CLASS_EXTENSION: &str = "class";

fn internal_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_/$]+$").expect("valid regex"))
}

/// A slash-delimited binary class name, e.g. `com/example/Foo`.
///
/// Never contains dots and always matches `^[A-Za-z0-9_/$]+$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternalName(String);

impl InternalName {
    /// Validates an already slash-delimited name.
    ///
    /// # Errors
    ///
    /// Returns [`DecompileError::InvalidClassName`] if the name is empty,
    /// contains characters outside `[A-Za-z0-9_/$]`, or has empty segments.
    pub fn new(name: impl Into<String>) -> Result<Self, DecompileError> {
        let name = name.into();
        let well_formed = internal_name_pattern().is_match(&name)
            && !name.starts_with('/')
            && !name.ends_with('/')
            && !name.contains("//");

        if well_formed {
            Ok(Self(name))
        } else {
            Err(DecompileError::InvalidClassName { name })
        }
    }

    /// Converts a dotted source-level name (`com.example.Foo`) into an
    /// internal name. Names already in slash form are accepted unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DecompileError::InvalidClassName`] if the converted name is
    /// not a valid internal name.
    pub fn from_dotted(name: &str) -> Result<Self, DecompileError> {
        Self::new(name.trim().replace('.', "/"))
    }

    /// Joins package segments and a simple class name.
    ///
    /// # Errors
    ///
    /// Returns [`DecompileError::InvalidClassName`] if the joined name is invalid.
    pub fn from_parts<S: AsRef<str>>(
        package: &[S],
        simple_name: &str,
    ) -> Result<Self, DecompileError> {
        let mut name = String::new();
        for segment in package {
            name.push_str(segment.as_ref());
            name.push('/');
        }
        name.push_str(simple_name);
        Self::new(name)
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the dotted source-level form.
    #[must_use]
    pub fn to_dotted(&self) -> String {
        self.0.replace('/', ".")
    }

    /// Returns the archive/classpath relative path, e.g. `com/example/Foo.class`.
    #[must_use]
    pub fn class_file_path(&self) -> String {
        format!("{}.{CLASS_EXTENSION}", self.0)
    }

    /// Returns the last path segment (the simple class name).
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for InternalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InternalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for InternalName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// The binary content of one compiled class.
///
/// Immutable once produced; owned by the request that read it.
#[derive(Clone, PartialEq, Eq)]
pub struct ClassBytes(Vec<u8>);

impl ClassBytes {
    /// Wraps raw class-file bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// An empty buffer, used as the "trivial class" placeholder.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Returns the bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the number of bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty placeholder buffer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for ClassBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for ClassBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBytes").field("len", &self.0.len()).finish()
    }
}
