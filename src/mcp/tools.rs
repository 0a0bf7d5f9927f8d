//! The decompilation tools exposed over MCP.
//!
//! Every tool answers with a single text item: the decompiled source on
//! success, or a message starting with `Error: ` (and `isError: true`) on
//! failure. Failures never escape as JSON-RPC errors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::decompiler::DecompilerService;

/// Decompile a single `.class` file.
pub const DECOMPILE_FROM_PATH: &str = "decompile-from-path";
/// Decompile a class found by dotted name on a classpath.
pub const DECOMPILE_FROM_PACKAGE: &str = "decompile-from-package";
/// Decompile one class inside a JAR.
pub const DECOMPILE_FROM_JAR: &str = "decompile-from-jar";

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the arguments.
    pub input_schema: Value,
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Tool to call.
    pub name: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Value,
}

/// One content item of a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the call failed.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

impl ToolCallResult {
    /// A successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// A failed result. The message is prefixed with `Error: `.
    #[must_use]
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: format!("Error: {message}"),
            }],
            is_error: true,
        }
    }

    /// The text of the first content item.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|item| match item {
            ToolContent::Text { text } => text.as_str(),
        })
    }
}

/// Returns the definitions of all tools.
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: DECOMPILE_FROM_PATH.to_string(),
            description: Some("Decompiles a Java .class file from a given file path".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "classFilePath": {
                        "type": "string",
                        "description": "Absolute path to the .class file to decompile"
                    }
                },
                "required": ["classFilePath"]
            }),
        },
        ToolDefinition {
            name: DECOMPILE_FROM_PACKAGE.to_string(),
            description: Some(
                "Decompiles a Java class from a package name. Searches the given classpath \
                 directories in order, then the CLASSPATH environment variable, then the \
                 working directory."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "packageName": {
                        "type": "string",
                        "description": "Fully qualified class name, e.g. com.example.MyClass"
                    },
                    "classpath": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Directories to search, first match wins"
                    }
                },
                "required": ["packageName"]
            }),
        },
        ToolDefinition {
            name: DECOMPILE_FROM_JAR.to_string(),
            description: Some(
                "Decompiles a Java class from a JAR file. The whole JAR is extracted so \
                 sibling classes can be resolved."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "jarFilePath": {
                        "type": "string",
                        "description": "Path to the .jar file"
                    },
                    "className": {
                        "type": "string",
                        "description": "Fully qualified name of the class inside the JAR (required)"
                    }
                },
                "required": ["jarFilePath"]
            }),
        },
    ]
}

/// Dispatches a tool call by name.
#[must_use]
pub fn call(service: &DecompilerService, name: &str, arguments: &Value) -> ToolCallResult {
    tracing::debug!(tool = name, "Tool call");
    match name {
        DECOMPILE_FROM_PATH => call_decompile_from_path(service, arguments),
        DECOMPILE_FROM_PACKAGE => call_decompile_from_package(service, arguments),
        DECOMPILE_FROM_JAR => call_decompile_from_jar(service, arguments),
        _ => ToolCallResult::error(format!("Unknown tool: {name}")),
    }
}

/// A non-empty string argument.
fn string_arg<'a>(arguments: &'a Value, key: &str) -> Option<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn call_decompile_from_path(service: &DecompilerService, arguments: &Value) -> ToolCallResult {
    let Some(class_file_path) = string_arg(arguments, "classFilePath") else {
        return ToolCallResult::error("Missing classFilePath parameter");
    };

    match service.decompile_from_path(Path::new(class_file_path)) {
        Ok(source) => ToolCallResult::text(source),
        Err(e) => ToolCallResult::error(e),
    }
}

fn call_decompile_from_package(service: &DecompilerService, arguments: &Value) -> ToolCallResult {
    let Some(package_name) = string_arg(arguments, "packageName") else {
        return ToolCallResult::error("Missing packageName parameter");
    };

    let classpath = match parse_classpath(arguments.get("classpath")) {
        Ok(classpath) => classpath,
        Err(message) => return ToolCallResult::error(message),
    };

    match service.decompile_from_package(package_name, &classpath) {
        Ok(source) => ToolCallResult::text(source),
        Err(e) => ToolCallResult::error(e),
    }
}

fn call_decompile_from_jar(service: &DecompilerService, arguments: &Value) -> ToolCallResult {
    let Some(jar_file_path) = string_arg(arguments, "jarFilePath") else {
        return ToolCallResult::error("Missing jarFilePath parameter");
    };

    // A missing className is reported by the locator, with the JAR stage prefix.
    let class_name = string_arg(arguments, "className");

    match service.decompile_from_jar(Path::new(jar_file_path), class_name) {
        Ok(source) => ToolCallResult::text(source),
        Err(e) => ToolCallResult::error(e),
    }
}

/// Reads the optional `classpath` argument. Absent or `null` is an empty list.
fn parse_classpath(value: Option<&Value>) -> Result<Vec<PathBuf>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(PathBuf::from)
                    .ok_or_else(|| "classpath entries must be strings".to_string())
            })
            .collect(),
        Some(_) => Err("classpath must be an array of strings".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompiler::{
        DecompileOptions, DecompileOrchestrator, DecompilerEngine, EngineError, InternalName,
        Locator, SourceLookup,
    };

    struct EchoEngine;

    impl DecompilerEngine for EchoEngine {
        fn decompile(
            &self,
            internal_name: &InternalName,
            _lookup: &SourceLookup<'_>,
            _options: &DecompileOptions,
        ) -> Result<String, EngineError> {
            Ok(format!("class {}", internal_name.simple_name()))
        }
    }

    fn service() -> DecompilerService {
        DecompilerService::new(
            Locator::new(),
            DecompileOrchestrator::new(Box::new(EchoEngine)),
        )
    }

    #[test]
    fn definitions_are_well_formed() {
        let tools = definitions();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![DECOMPILE_FROM_PATH, DECOMPILE_FROM_PACKAGE, DECOMPILE_FROM_JAR]
        );
        for tool in &tools {
            assert!(tool.input_schema.is_object());
            assert_eq!(tool.input_schema["type"], "object");
        }
    }

    #[test]
    fn result_serialisation() {
        let ok = serde_json::to_value(ToolCallResult::text("class A")).unwrap();
        assert_eq!(ok, json!({"content": [{"type": "text", "text": "class A"}]}));

        let err = serde_json::to_value(ToolCallResult::error("boom")).unwrap();
        assert_eq!(
            err,
            json!({"content": [{"type": "text", "text": "Error: boom"}], "isError": true})
        );
    }

    #[test]
    fn missing_parameters() {
        let svc = service();
        for (tool, param) in [
            (DECOMPILE_FROM_PATH, "classFilePath"),
            (DECOMPILE_FROM_PACKAGE, "packageName"),
            (DECOMPILE_FROM_JAR, "jarFilePath"),
        ] {
            let result = call(&svc, tool, &json!({}));
            assert!(result.is_error);
            assert_eq!(
                result.first_text(),
                Some(format!("Error: Missing {param} parameter").as_str())
            );
        }
    }

    #[test]
    fn jar_without_class_name_reports_stage() {
        let result = call(&service(), DECOMPILE_FROM_JAR, &json!({"jarFilePath": "/x.jar"}));
        assert!(result.is_error);
        assert_eq!(
            result.first_text(),
            Some("Error: Failed to decompile JAR file: Missing required parameter: className")
        );
    }

    #[test]
    fn unknown_tool() {
        let result = call(&service(), "decompile-everything", &json!({}));
        assert!(result.is_error);
        assert_eq!(result.first_text(), Some("Error: Unknown tool: decompile-everything"));
    }

    #[test]
    fn classpath_argument_shapes() {
        assert_eq!(parse_classpath(None).unwrap(), Vec::<PathBuf>::new());
        assert_eq!(parse_classpath(Some(&Value::Null)).unwrap(), Vec::<PathBuf>::new());
        assert_eq!(
            parse_classpath(Some(&json!(["/a", "/b"]))).unwrap(),
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert!(parse_classpath(Some(&json!("/a"))).is_err());
        assert!(parse_classpath(Some(&json!([1]))).is_err());
    }

    #[test]
    fn package_lookup_through_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("org").join("demo");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Widget.class"), b"x").unwrap();

        let result = call(
            &service(),
            DECOMPILE_FROM_PACKAGE,
            &json!({
                "packageName": "org.demo.Widget",
                "classpath": [tmp.path().to_string_lossy()]
            }),
        );
        assert!(!result.is_error, "{:?}", result.first_text());
        assert_eq!(result.first_text(), Some("class Widget"));
    }
}
