//! Minimal class-file reader.
//!
//! Reads just enough of the JVM class-file format to answer two questions:
//! which class a buffer declares, and which other classes it refers to.
//! Everything after the method table (attributes, code) is ignored.
//!
//! # Layout
//!
//! ```text
//! u4 magic (0xCAFEBABE)   u2 minor   u2 major
//! u2 constant_pool_count  cp_info[count - 1]
//! u2 access_flags  u2 this_class  u2 super_class
//! u2 interfaces_count  u2[interfaces_count]
//! u2 fields_count  field_info[]   u2 methods_count  method_info[]
//! ```

use thiserror::Error;

/// Magic number at the start of every class file.
pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Errors produced while reading a class file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassFileError {
    /// The buffer does not start with `0xCAFEBABE`.
    #[error("bad magic number (expected 0xCAFEBABE)")]
    BadMagic,

    /// The buffer ends in the middle of a structure.
    #[error("truncated at offset {offset}")]
    Truncated {
        /// Offset where more bytes were needed.
        offset: usize,
    },

    /// A constant-pool entry has an unknown tag.
    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag {
        /// The tag byte.
        tag: u8,
        /// Constant-pool index of the entry.
        index: u16,
    },

    /// A constant-pool index points at the wrong kind of entry.
    #[error("constant pool index {index} is not a {expected}")]
    BadIndex {
        /// The index that was dereferenced.
        index: u16,
        /// The entry kind that was expected.
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    Other,
    // Second slot of a long/double.
    Unusable,
}

/// The parts of a class file this crate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    /// Internal name of the declared class.
    pub this_class: String,
    /// Internal name of the superclass (`None` only for `java/lang/Object`).
    pub super_class: Option<String>,
    /// Every class named by a `CONSTANT_Class` entry, excluding the class
    /// itself and array descriptors, in constant-pool order.
    pub referenced_classes: Vec<String>,
    /// Method names in declaration order (including `<init>`).
    pub method_names: Vec<String>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ClassFileError::Truncated { offset: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u1(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.take(1)?[0])
    }

    fn u2(&mut self) -> Result<u16, ClassFileError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32, ClassFileError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn skip(&mut self, n: usize) -> Result<(), ClassFileError> {
        self.take(n).map(|_| ())
    }

    fn skip_attributes(&mut self) -> Result<(), ClassFileError> {
        let count = self.u2()?;
        for _ in 0..count {
            self.skip(2)?;
            let len = self.u4()? as usize;
            self.skip(len)?;
        }
        Ok(())
    }
}

/// Returns `true` if `bytes` starts with the class-file magic number.
#[must_use]
pub fn has_class_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) == CLASS_MAGIC
}

/// Parses a class file.
///
/// # Errors
///
/// Returns an error if the buffer is not a well-formed class file up to the
/// end of its method table.
pub fn parse(bytes: &[u8]) -> Result<ClassInfo, ClassFileError> {
    let mut r = Reader::new(bytes);

    if r.u4()? != CLASS_MAGIC {
        return Err(ClassFileError::BadMagic);
    }
    let _minor = r.u2()?;
    let _major = r.u2()?;

    let pool = read_constant_pool(&mut r)?;

    let _access_flags = r.u2()?;
    let this_index = r.u2()?;
    let super_index = r.u2()?;

    let this_class = class_name(&pool, this_index)?;
    let super_class = if super_index == 0 {
        None
    } else {
        Some(class_name(&pool, super_index)?)
    };

    // Interfaces also appear as class constants, so only their indices are checked.
    let interface_count = r.u2()?;
    for _ in 0..interface_count {
        class_name(&pool, r.u2()?)?;
    }

    // Fields and methods share the same layout.
    let field_count = r.u2()?;
    for _ in 0..field_count {
        r.skip(6)?;
        r.skip_attributes()?;
    }

    let method_count = r.u2()?;
    let mut method_names = Vec::with_capacity(usize::from(method_count));
    for _ in 0..method_count {
        r.skip(2)?;
        let name_index = r.u2()?;
        r.skip(2)?;
        method_names.push(utf8(&pool, name_index)?.to_string());
        r.skip_attributes()?;
    }

    let mut referenced_classes = Vec::new();
    for constant in &pool {
        if let Constant::Class { name_index } = constant {
            let name = utf8(&pool, *name_index)?;
            if name != this_class
                && !name.starts_with('[')
                && !referenced_classes.iter().any(|n| n == name)
            {
                referenced_classes.push(name.to_string());
            }
        }
    }

    Ok(ClassInfo {
        this_class,
        super_class,
        referenced_classes,
        method_names,
    })
}

fn read_constant_pool(r: &mut Reader<'_>) -> Result<Vec<Constant>, ClassFileError> {
    let count = r.u2()?;
    // Index 0 is unused; keep it so indices line up.
    let mut pool = vec![Constant::Unusable];
    let mut index = 1u16;

    while index < count {
        let tag = r.u1()?;
        let constant = match tag {
            1 => {
                let len = usize::from(r.u2()?);
                let raw = r.take(len)?;
                // Modified UTF-8 differs from UTF-8 only for NUL and
                // supplementary characters, neither of which occur in names.
                Constant::Utf8(String::from_utf8_lossy(raw).into_owned())
            }
            7 => Constant::Class {
                name_index: r.u2()?,
            },
            // Integer, Float, Field/Method/InterfaceMethodref, NameAndType,
            // Dynamic, InvokeDynamic
            3 | 4 | 9 | 10 | 11 | 12 | 17 | 18 => {
                r.skip(4)?;
                Constant::Other
            }
            // String, MethodType, Module, Package
            8 | 16 | 19 | 20 => {
                r.skip(2)?;
                Constant::Other
            }
            // MethodHandle
            15 => {
                r.skip(3)?;
                Constant::Other
            }
            // Long, Double: take two slots
            5 | 6 => {
                r.skip(8)?;
                pool.push(Constant::Other);
                index += 1;
                Constant::Unusable
            }
            _ => return Err(ClassFileError::UnknownTag { tag, index }),
        };
        pool.push(constant);
        index += 1;
    }

    Ok(pool)
}

fn utf8(pool: &[Constant], index: u16) -> Result<&str, ClassFileError> {
    match pool.get(usize::from(index)) {
        Some(Constant::Utf8(s)) => Ok(s),
        _ => Err(ClassFileError::BadIndex {
            index,
            expected: "Utf8",
        }),
    }
}

fn class_name(pool: &[Constant], index: u16) -> Result<String, ClassFileError> {
    match pool.get(usize::from(index)) {
        Some(Constant::Class { name_index }) => utf8(pool, *name_index).map(str::to_string),
        _ => Err(ClassFileError::BadIndex {
            index,
            expected: "Class",
        }),
    }
}
