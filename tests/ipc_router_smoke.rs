mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{request, request_ok, spawn_sidecar, temp_dir};

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("recordbook-router-smoke");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert!(health["workspacePath"].is_null());

    let methods = [
        ("students.list", json!({})),
        ("subjects.list", json!({})),
        ("marks.list", json!({ "studentId": "x" })),
        ("academics.summary", json!({ "studentId": "x" })),
        ("achievements.list", json!({ "studentId": "x" })),
        ("reports.portfolioPdf", json!({ "studentId": "x", "outPath": "x.pdf" })),
    ];
    for (i, (method, params)) in methods.iter().enumerate() {
        let resp = request(
            &mut stdin,
            &mut reader,
            &format!("pre{}", i),
            method,
            params.clone(),
        );
        assert_eq!(
            resp.pointer("/error/code").and_then(|v| v.as_str()),
            Some("no_workspace"),
            "{}",
            method
        );
    }

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let health = request_ok(&mut stdin, &mut reader, "3", "health", json!({}));
    let expected = workspace.to_string_lossy().to_string();
    assert_eq!(health["workspacePath"].as_str(), Some(expected.as_str()));

    for (i, (method, params)) in methods.iter().enumerate() {
        let resp = request(
            &mut stdin,
            &mut reader,
            &format!("post{}", i),
            method,
            params.clone(),
        );
        let code = resp.pointer("/error/code").and_then(|v| v.as_str());
        assert_ne!(code, Some("not_implemented"), "{}", method);
        assert_ne!(code, Some("no_workspace"), "{}", method);
    }

    let unknown = request(&mut stdin, &mut reader, "4", "classes.list", json!({}));
    assert_eq!(
        unknown.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_implemented")
    );

    writeln!(stdin, "{{not json").expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(
        value.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_json")
    );

    let still_alive = request_ok(&mut stdin, &mut reader, "5", "health", json!({}));
    assert!(still_alive["version"].is_string());
}
