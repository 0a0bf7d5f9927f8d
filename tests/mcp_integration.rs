//! Integration tests for MCP protocol handling.
//!
//! These tests drive whole client conversations through the session, the
//! stdio server and the HTTP router, with real class files on disk.

mod common;

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{sample_class, service_with, write_jar, OutlineEngine};
use java_decompiler_mcp::decompiler::DecompilerService;
use java_decompiler_mcp::mcp::http::{self, SESSION_HEADER};
use java_decompiler_mcp::mcp::protocol::{parse_message, IncomingMessage, RequestId};
use java_decompiler_mcp::mcp::{McpServer, McpSession, ServerState, StdioTransport};

const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test-client","version":"1.0.0"}}}"#;
const INITIALIZED: &str = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;

fn service(workspace_root: &Path) -> Arc<DecompilerService> {
    Arc::new(service_with(OutlineEngine::default(), workspace_root))
}

fn call(id: i64, tool: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments }
    })
    .to_string()
}

fn reply_json(session: &mut McpSession, line: &str) -> Value {
    let reply = session.handle_line(line).expect("request should get a reply");
    serde_json::from_str(&reply.to_json().unwrap()).unwrap()
}

fn ready_session(service: Arc<DecompilerService>) -> McpSession {
    let mut session = McpSession::new(service);
    session.handle_line(INITIALIZE).unwrap();
    assert!(session.handle_line(INITIALIZED).is_none());
    assert_eq!(session.state(), ServerState::Running);
    session
}

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let msg = parse_message(INITIALIZE).unwrap();
    let IncomingMessage::Request(req) = msg else {
        panic!("Expected Request");
    };
    assert_eq!(req.method, "initialize");
    assert_eq!(req.id, RequestId::Number(1));
}

#[test]
fn test_parse_notification() {
    let msg = parse_message(INITIALIZED).unwrap();
    assert!(matches!(msg, IncomingMessage::Notification(_)));
    assert_eq!(msg.method(), "notifications/initialized");
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    let err = parse_message(r#"{"id": 1, "method": "test"}"#).unwrap_err();
    assert_eq!(err.error.code, -32600);
}

// =============================================================================
// Session Flow Tests
// =============================================================================

#[test]
fn test_full_path_flow() {
    let tmp = tempfile::tempdir().unwrap();
    let class_file = tmp.path().join("SampleClass.class");
    std::fs::write(&class_file, sample_class()).unwrap();

    let mut session = McpSession::new(service(tmp.path()));

    let init = reply_json(&mut session, INITIALIZE);
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(init["result"]["serverInfo"]["name"], "java-decompiler-mcp");
    assert!(init["result"]["capabilities"]["tools"].is_object());

    assert!(session.handle_line(INITIALIZED).is_none());

    let list = reply_json(
        &mut session,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
    );
    let names: Vec<&str> = list["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        ["decompile-from-path", "decompile-from-package", "decompile-from-jar"]
    );

    let result = reply_json(
        &mut session,
        &call(
            3,
            "decompile-from-path",
            json!({ "classFilePath": class_file.to_string_lossy() }),
        ),
    );
    assert_eq!(result["id"], 3);
    assert!(result["result"].get("isError").is_none());
    let text = result["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("class SampleClass"), "{text}");
    assert!(text.contains("printMessage"), "{text}");
}

#[test]
fn test_tools_require_initialised_session() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = McpSession::new(service(tmp.path()));

    let early = reply_json(
        &mut session,
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
    );
    assert_eq!(early["error"]["code"], -32600);
    assert_eq!(early["error"]["message"], "Server not initialised");

    session.handle_line(INITIALIZE).unwrap();
    let before_notification = reply_json(
        &mut session,
        &call(2, "decompile-from-path", json!({ "classFilePath": "/x/A.class" })),
    );
    assert_eq!(before_notification["error"]["message"], "Server not initialised");
}

#[test]
fn test_jar_flow_and_missing_class_name() {
    let tmp = tempfile::tempdir().unwrap();
    let jar = tmp.path().join("sample.jar");
    write_jar(&jar, &[("SampleClass.class", sample_class())]);
    let jar_path = jar.to_string_lossy().into_owned();

    let mut session = ready_session(service(tmp.path()));

    let ok = reply_json(
        &mut session,
        &call(
            10,
            "decompile-from-jar",
            json!({ "jarFilePath": jar_path, "className": "SampleClass" }),
        ),
    );
    assert!(ok["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("class SampleClass"));

    let missing = reply_json(
        &mut session,
        &call(11, "decompile-from-jar", json!({ "jarFilePath": jar_path })),
    );
    assert_eq!(missing["result"]["isError"], true);
    let text = missing["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Error: "), "{text}");
    assert!(text.contains("className"), "{text}");
}

#[test]
fn test_tool_errors_are_results_not_protocol_errors() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = ready_session(service(tmp.path()));

    let missing = reply_json(&mut session, &call(1, "decompile-from-path", json!({})));
    assert_eq!(
        missing["result"]["content"][0]["text"],
        "Error: Missing classFilePath parameter"
    );
    assert_eq!(missing["result"]["isError"], true);

    let unknown = reply_json(&mut session, &call(2, "decompile-everything", json!({})));
    assert_eq!(
        unknown["result"]["content"][0]["text"],
        "Error: Unknown tool: decompile-everything"
    );

    let absent = tmp.path().join("Absent.class");
    let not_found = reply_json(
        &mut session,
        &call(
            3,
            "decompile-from-path",
            json!({ "classFilePath": absent.to_string_lossy() }),
        ),
    );
    let text = not_found["result"]["content"][0]["text"].as_str().unwrap();
    assert!(
        text.starts_with("Error: Failed to decompile class file: "),
        "{text}"
    );
}

#[test]
fn test_package_flow_with_explicit_classpath() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("classes").join("com").join("example");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("Greeter.class"),
        common::ClassBuilder::new("com/example/Greeter")
            .method("greet", "()V")
            .build(),
    )
    .unwrap();

    let mut session = ready_session(service(tmp.path()));
    let classpath = tmp.path().join("classes").to_string_lossy().into_owned();

    let found = reply_json(
        &mut session,
        &call(
            1,
            "decompile-from-package",
            json!({ "packageName": "com.example.Greeter", "classpath": [classpath] }),
        ),
    );
    let text = found["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("package com.example;"), "{text}");

    let bad_classpath = reply_json(
        &mut session,
        &call(
            2,
            "decompile-from-package",
            json!({ "packageName": "com.example.Greeter", "classpath": "not-a-list" }),
        ),
    );
    assert_eq!(bad_classpath["result"]["isError"], true);
}

// =============================================================================
// Stdio Server Tests
// =============================================================================

#[tokio::test]
async fn test_stdio_server_transcript() {
    let tmp = tempfile::tempdir().unwrap();
    let class_file = tmp.path().join("SampleClass.class");
    std::fs::write(&class_file, sample_class()).unwrap();

    let input = [
        INITIALIZE.to_string(),
        INITIALIZED.to_string(),
        "not json".to_string(),
        call(
            2,
            "decompile-from-path",
            json!({ "classFilePath": class_file.to_string_lossy() }),
        ),
    ]
    .join("\n")
        + "\n";

    let transport = StdioTransport::with_io(input.as_bytes(), Vec::new());
    let mut server = McpServer::with_transport(service(tmp.path()), transport);
    server.run().await.unwrap();

    let out = String::from_utf8(server.into_writer()).unwrap();
    let replies: Vec<Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["id"], 1);
    assert_eq!(replies[1]["error"]["code"], -32700);
    assert!(replies[1]["id"].is_null());
    assert!(replies[2]["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("printMessage"));
}

// =============================================================================
// HTTP Transport Tests
// =============================================================================

fn post(session: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(id) = session {
        builder = builder.header(SESSION_HEADER, id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_http_session_flow() {
    let tmp = tempfile::tempdir().unwrap();
    let class_file = tmp.path().join("SampleClass.class");
    std::fs::write(&class_file, sample_class()).unwrap();

    let state = Arc::new(http::HttpState::new(service(tmp.path())));
    let app = http::router_with_state(Arc::clone(&state));

    let response = app.clone().oneshot(post(None, INITIALIZE)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session_id = response
        .headers()
        .get(SESSION_HEADER)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(state.session_count(), 1);

    let response = app
        .clone()
        .oneshot(post(Some(&session_id), INITIALIZED))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let request = call(
        2,
        "decompile-from-path",
        json!({ "classFilePath": class_file.to_string_lossy() }),
    );
    let response = app
        .clone()
        .oneshot(post(Some(&session_id), &request))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reply = body_json(response).await;
    assert!(reply["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("class SampleClass"));

    // Without a session id only initialize is accepted.
    let response = app
        .clone()
        .oneshot(post(None, r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.session_count(), 1);

    // A second client gets its own session, not yet initialised.
    let response = app.clone().oneshot(post(None, INITIALIZE)).await.unwrap();
    let second_id = response.headers()[SESSION_HEADER]
        .to_str()
        .unwrap()
        .to_string();
    assert_ne!(second_id, session_id);
    let response = app
        .clone()
        .oneshot(post(
            Some(&second_id),
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        ))
        .await
        .unwrap();
    let reply = body_json(response).await;
    assert_eq!(reply["error"]["message"], "Server not initialised");
    assert_eq!(state.session_count(), 2);

    let delete = Request::builder()
        .method("DELETE")
        .uri("/mcp")
        .header(SESSION_HEADER, &session_id)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(delete).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(post(Some(&session_id), INITIALIZE))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
