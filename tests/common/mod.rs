//! Shared fixtures for integration tests.
//!
//! Builds real class files without a JDK and provides an engine that renders
//! a class outline from them, so whole requests can run without Java.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use java_decompiler_mcp::decompiler::classfile::{self, CLASS_MAGIC};
use java_decompiler_mcp::decompiler::{
    DecompileOptions, DecompileOrchestrator, DecompilerEngine, DecompilerService, EngineError,
    InternalName, Locator, SourceLookup,
};
use zip::write::FileOptions;

/// Assembles a minimal class file.
pub struct ClassBuilder {
    name: String,
    super_class: String,
    references: Vec<String>,
    methods: Vec<(String, String)>,
}

impl ClassBuilder {
    pub fn new(internal_name: &str) -> Self {
        Self {
            name: internal_name.to_string(),
            super_class: "java/lang/Object".to_string(),
            references: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, super_class: &str) -> Self {
        self.super_class = super_class.to_string();
        self
    }

    /// Adds a class constant, as a field type or method call would.
    pub fn references(mut self, class: &str) -> Self {
        self.references.push(class.to_string());
        self
    }

    pub fn method(mut self, name: &str, descriptor: &str) -> Self {
        self.methods.push((name.to_string(), descriptor.to_string()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = Pool::default();
        let this_class = pool.class(&self.name);
        let super_class = pool.class(&self.super_class);
        for reference in &self.references {
            pool.class(reference);
        }
        let methods: Vec<(u16, u16)> = self
            .methods
            .iter()
            .map(|(name, descriptor)| (pool.utf8(name), pool.utf8(descriptor)))
            .collect();

        let mut out = Vec::new();
        out.extend_from_slice(&CLASS_MAGIC.to_be_bytes());
        push_u2(&mut out, 0);
        push_u2(&mut out, 52);
        push_u2(&mut out, pool.count + 1);
        out.extend_from_slice(&pool.bytes);
        push_u2(&mut out, 0x0021); // public super
        push_u2(&mut out, this_class);
        push_u2(&mut out, super_class);
        push_u2(&mut out, 0); // interfaces
        push_u2(&mut out, 0); // fields
        push_u2(&mut out, u16::try_from(methods.len()).unwrap());
        for (name, descriptor) in methods {
            push_u2(&mut out, 0x0001);
            push_u2(&mut out, name);
            push_u2(&mut out, descriptor);
            push_u2(&mut out, 0);
        }
        push_u2(&mut out, 0); // attributes
        out
    }
}

#[derive(Default)]
struct Pool {
    bytes: Vec<u8>,
    count: u16,
}

impl Pool {
    fn utf8(&mut self, s: &str) -> u16 {
        self.bytes.push(1);
        push_u2(&mut self.bytes, u16::try_from(s.len()).unwrap());
        self.bytes.extend_from_slice(s.as_bytes());
        self.count += 1;
        self.count
    }

    fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.bytes.push(7);
        push_u2(&mut self.bytes, name_index);
        self.count += 1;
        self.count
    }
}

fn push_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// `SampleClass` with a `String` constructor and `printMessage()`.
pub fn sample_class() -> Vec<u8> {
    ClassBuilder::new("SampleClass")
        .references("java/lang/String")
        .references("java/lang/System")
        .method("<init>", "(Ljava/lang/String;)V")
        .method("printMessage", "()V")
        .build()
}

/// Writes a JAR with the given entries.
pub fn write_jar<N: AsRef<str>, B: AsRef<[u8]>>(path: &Path, entries: &[(N, B)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in entries {
        zip.start_file(name.as_ref(), options).unwrap();
        zip.write_all(content.as_ref()).unwrap();
    }
    zip.finish().unwrap();
}

/// Renders `public class Name extends Super { methods }` from the class file
/// and lists which referenced classes the lookup could supply.
#[derive(Default, Clone)]
pub struct OutlineEngine {
    resolved: Arc<Mutex<Vec<String>>>,
}

impl OutlineEngine {
    /// Referenced classes the lookup answered with real bytes, across all calls.
    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }
}

impl DecompilerEngine for OutlineEngine {
    fn decompile(
        &self,
        internal_name: &InternalName,
        lookup: &SourceLookup<'_>,
        _options: &DecompileOptions,
    ) -> Result<String, EngineError> {
        let bytes = lookup(internal_name.as_str()).ok_or_else(|| EngineError::ClassUnavailable {
            name: internal_name.to_string(),
        })?;
        let info = classfile::parse(bytes.as_bytes()).map_err(|e| EngineError::InvalidClassFile {
            message: e.to_string(),
        })?;

        for reference in &info.referenced_classes {
            if lookup(reference).is_some_and(|b| !b.is_empty()) {
                self.resolved.lock().unwrap().push(reference.clone());
            }
        }

        let simple = info.this_class.rsplit('/').next().unwrap_or_default();
        let mut out = String::new();
        if let Some((package, _)) = info.this_class.rsplit_once('/') {
            out.push_str(&format!("package {};\n\n", package.replace('/', ".")));
        }
        out.push_str(&format!("public class {simple}"));
        if let Some(super_class) = info.super_class.as_deref() {
            if super_class != "java/lang/Object" {
                out.push_str(&format!(" extends {}", super_class.replace('/', ".")));
            }
        }
        out.push_str(" {\n");
        for method in &info.method_names {
            let name = if method == "<init>" { simple } else { method.as_str() };
            out.push_str(&format!("    public void {name}() {{ }}\n"));
        }
        out.push_str("}\n");
        Ok(out)
    }
}

/// A service backed by `engine` and a locator extracting under `workspace_root`.
pub fn service_with(engine: OutlineEngine, workspace_root: &Path) -> DecompilerService {
    DecompilerService::new(
        Locator::new().with_workspace_root(Some(workspace_root.to_path_buf())),
        DecompileOrchestrator::new(Box::new(engine)),
    )
}

/// Entries currently in `dir`.
pub fn entries_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
