//! End-to-end scenarios through the stdio JSON-RPC dispatch layer.

use serde_json::{Value, json};
use tempfile::TempDir;
use webgal_agent::{RpcServer, ToolContext};

fn server_for(dir: &TempDir) -> RpcServer {
    RpcServer::new(ToolContext::with_defaults(dir.path()).unwrap())
}

fn seed(dir: &TempDir, rel: &str, content: &str) {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Issue a tools/call and decode the embedded JSON payload.
async fn call(server: &RpcServer, tool: &str, arguments: Value) -> (Value, bool) {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments },
    });
    let response = server.handle_line(&request.to_string()).await.unwrap();
    let response: Value = serde_json::from_str(&response).unwrap();
    let result = &response["result"];
    let is_error = result.get("isError").and_then(Value::as_bool).unwrap_or(false);
    let text = result["content"][0]["text"].as_str().unwrap();
    (serde_json::from_str(text).unwrap(), is_error)
}

#[tokio::test]
async fn small_edit_through_replace_then_validate() {
    let dir = TempDir::new().unwrap();
    seed(&dir, "game/scene/start.txt", "欢迎;\n");
    let server = server_for(&dir);

    let (result, is_error) = call(
        &server,
        "replace_in_file",
        json!({"path": "game/scene/start.txt", "find": "欢迎", "replace": "你好"}),
    )
    .await;
    assert!(!is_error);
    assert_eq!(result["count"], 1);

    let (read, _) = call(&server, "read_file", json!({"path": "game/scene/start.txt"})).await;
    let content = read["content"].as_str().unwrap();
    assert!(content.contains("你好"));
    assert!(!content.contains("欢迎"));

    let (report, is_error) = call(
        &server,
        "validate_script",
        json!({"path": "game/scene/start.txt"}),
    )
    .await;
    assert!(!is_error);
    assert_eq!(report["valid"], true);
    assert_eq!(report["diagnostics"], json!([]));
}

#[tokio::test]
async fn full_rewrite_with_dry_run_then_apply() {
    let dir = TempDir::new().unwrap();
    let server = server_for(&dir);

    let (preview, is_error) = call(
        &server,
        "write_to_file",
        json!({
            "path": "game/scene/test.txt",
            "content": "setVar:n=1;\nend;\n",
            "dry_run": true,
        }),
    )
    .await;
    assert!(!is_error);
    assert_eq!(preview["applied"], false);
    assert!(preview["diff"]["hunks"].as_array().is_some());

    let (applied, is_error) = call(
        &server,
        "write_to_file",
        json!({
            "path": "game/scene/test.txt",
            "content": "setVar:n=1;\nend;\n",
            "dry_run": false,
        }),
    )
    .await;
    assert!(!is_error);
    assert_eq!(applied["applied"], true);
    let snapshot_id = applied["snapshot_id"].as_str().unwrap();
    assert!(snapshot_id.starts_with("snap_"));
    assert!(
        dir.path()
            .join(format!(".webgal_agent/snapshots/{snapshot_id}.meta.json"))
            .exists()
    );
}

#[tokio::test]
async fn snapshot_restore_round_trip() {
    let dir = TempDir::new().unwrap();
    let server = server_for(&dir);

    let (first, _) = call(
        &server,
        "write_to_file",
        json!({"path": "game/scene/start.txt", "content": "C1", "dry_run": false, "idempotency_key": "k"}),
    )
    .await;
    let s1 = first["snapshot_id"].as_str().unwrap().to_string();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    let (second, _) = call(
        &server,
        "write_to_file",
        json!({"path": "game/scene/start.txt", "content": "C2", "dry_run": false}),
    )
    .await;
    let s2 = second["snapshot_id"].as_str().unwrap().to_string();

    let (listed, _) = call(
        &server,
        "list_snapshots",
        json!({"path": "game/scene/start.txt"}),
    )
    .await;
    let ids: Vec<&str> = listed["snapshots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![s2.as_str(), s1.as_str()]);

    let (restored, _) = call(&server, "restore_snapshot", json!({"snapshot_id": s1})).await;
    assert_eq!(restored["path"], "game/scene/start.txt");
    assert_eq!(restored["content"], "C1");

    // Writing the restored content back restores the file.
    call(
        &server,
        "write_to_file",
        json!({"path": "game/scene/start.txt", "content": restored["content"], "dry_run": false}),
    )
    .await;
    assert_eq!(
        std::fs::read_to_string(dir.path().join("game/scene/start.txt")).unwrap(),
        "C1"
    );
}

#[tokio::test]
async fn idempotency_survives_restart() {
    let dir = TempDir::new().unwrap();

    let first_id = {
        let server = server_for(&dir);
        let (result, _) = call(
            &server,
            "write_to_file",
            json!({"path": "p.txt", "content": "A", "dry_run": false, "idempotency_key": "k"}),
        )
        .await;
        result["snapshot_id"].as_str().unwrap().to_string()
    };

    // A fresh context over the same project plays the part of a restarted
    // process: only the on-disk documents carry over.
    let server = server_for(&dir);
    let (retried, is_error) = call(
        &server,
        "write_to_file",
        json!({"path": "p.txt", "content": "B", "dry_run": false, "idempotency_key": "k"}),
    )
    .await;
    assert!(!is_error);
    assert_eq!(retried["snapshot_id"], first_id.as_str());
    assert_eq!(retried["bytes_written"], 0);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("p.txt")).unwrap(),
        "A"
    );

    let idem: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join(".webgal_agent/idem.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(idem["k"]["snapshotId"], first_id.as_str());
}

#[tokio::test]
async fn validator_reports_resource_and_syntax_diagnostics() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("game/background")).unwrap();
    let server = server_for(&dir);

    let (report, is_error) = call(
        &server,
        "validate_script",
        json!({"content": "changeBg: nonexistent.jpg;\nchangeBg beach.jpg\n"}),
    )
    .await;
    assert!(!is_error);
    assert_eq!(report["valid"], false);
    let diagnostics = report["diagnostics"].as_array().unwrap();
    assert!(
        diagnostics
            .iter()
            .any(|d| d["line"] == 1 && d["kind"] == "resource")
    );
    assert!(
        diagnostics
            .iter()
            .any(|d| d["line"] == 2 && d["kind"] == "syntax")
    );
}

#[tokio::test]
async fn conflict_surfaces_through_the_rpc_layer() {
    let dir = TempDir::new().unwrap();
    seed(&dir, "p.txt", "A");
    let server = server_for(&dir);

    call(
        &server,
        "write_to_file",
        json!({"path": "p.txt", "content": "B", "dry_run": true}),
    )
    .await;
    std::fs::write(dir.path().join("p.txt"), "C").unwrap();

    let (payload, is_error) = call(
        &server,
        "write_to_file",
        json!({"path": "p.txt", "content": "B", "dry_run": false}),
    )
    .await;
    assert!(is_error);
    assert_eq!(payload["error"]["code"], "E_CONFLICT");
    assert_eq!(payload["error"]["recoverable"], true);
    assert!(payload["error"]["details"]["expected_hash"].is_string());
    // The target keeps the external content.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("p.txt")).unwrap(),
        "C"
    );
}

#[tokio::test]
async fn gated_tools_report_disabled_by_default() {
    let dir = TempDir::new().unwrap();
    let server = server_for(&dir);
    for tool in ["execute_command", "browser_action", "preview_scene"] {
        let (payload, is_error) = call(&server, tool, json!({"command": "dev", "action": "navigate"})).await;
        assert!(is_error, "{tool} should be gated");
        assert_eq!(payload["error"]["code"], "E_TOOL_DISABLED", "{tool}");
    }
}

#[tokio::test]
async fn runtime_info_reflects_the_surface() {
    let dir = TempDir::new().unwrap();
    let server = server_for(&dir);
    let (info, is_error) = call(&server, "get_runtime_info", json!({})).await;
    assert!(!is_error);
    assert_eq!(info["server"]["name"], "webgal-agent");
    assert_eq!(info["config"]["snapshotRetention"], 20);
    let tools = info["tools"].as_array().unwrap();
    assert!(tools.iter().any(|t| t == "write_to_file"));
    assert!(tools.iter().any(|t| t == "restore_snapshot"));
}
