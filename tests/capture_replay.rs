use std::io::Write;

use serial_test::serial;

use apitap_cli::replay::{run, ReplayOptions};
use capture_tap::SessionConfig;
use export_store::ExportConfig;

fn write_events(dir: &tempfile::TempDir, lines: &[serde_json::Value]) -> std::path::PathBuf {
    let path = dir.path().join("events.jsonl");
    let mut file = std::fs::File::create(&path).expect("create events file");
    for line in lines {
        writeln!(file, "{line}").expect("write event line");
    }
    path
}

#[tokio::test]
#[serial]
async fn replayed_stream_exports_filtered_calls() {
    let dir = tempfile::tempdir().expect("tempdir");
    let events = write_events(
        &dir,
        &[
            serde_json::json!({"event": "opened", "id": 1, "url": "https://host/api/league"}),
            serde_json::json!({"event": "loaded", "id": 1, "status": 200, "body": r#"{"id": 42}"#}),
            serde_json::json!({"event": "opened", "id": 2, "method": "POST", "url": "https://host/api/mercato"}),
            serde_json::json!({"event": "body_sent", "id": 2, "body": r#"{"bid": 5}"#}),
            serde_json::json!({"event": "loaded", "id": 2, "status": 404, "body": "not found"}),
            // Out of scope for the filter below.
            serde_json::json!({"event": "opened", "id": 3, "url": "https://tracker.example/pixel"}),
            serde_json::json!({"event": "loaded", "id": 3, "status": 200, "body": "{}"}),
        ],
    );

    let options = ReplayOptions {
        events,
        session: SessionConfig {
            filter: vec!["host/api".into()],
            page_url: "https://host/app".into(),
            grace_ms: 200,
            ..SessionConfig::default()
        },
        export: ExportConfig {
            path: dir.path().join("capture.json"),
        },
    };

    let report = run(&options).await.expect("replay");
    assert_eq!(report.total_captured, 2);
    assert!(!report.reduced_fidelity);

    let value: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&report.path).expect("read artifact"))
            .expect("parse artifact");
    assert_eq!(value["url"], serde_json::json!("https://host/app"));
    assert_eq!(value["total_captured"], serde_json::json!(2));

    let calls = value["api_calls"].as_array().expect("api_calls array");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0]["url"], serde_json::json!("https://host/api/league"));
    assert_eq!(calls[0]["response"], serde_json::json!({"id": 42}));
    assert_eq!(calls[1]["method"], serde_json::json!("POST"));
    assert_eq!(calls[1]["status"], serde_json::json!(404));
    assert_eq!(calls[1]["response_text"], serde_json::json!("not found"));
    assert_eq!(calls[1]["request_body"], serde_json::json!({"bid": 5}));
}

#[tokio::test]
#[serial]
async fn malformed_lines_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.jsonl");
    let mut file = std::fs::File::create(&path).expect("create events file");
    writeln!(file, "this is not json").expect("write");
    writeln!(
        file,
        "{}",
        serde_json::json!({"event": "opened", "id": 1, "url": "https://host/api/teams"})
    )
    .expect("write");
    writeln!(
        file,
        "{}",
        serde_json::json!({"event": "loaded", "id": 1, "status": 200, "body": "[]"})
    )
    .expect("write");

    let options = ReplayOptions {
        events: path,
        session: SessionConfig {
            grace_ms: 200,
            ..SessionConfig::default()
        },
        export: ExportConfig {
            path: dir.path().join("capture.json"),
        },
    };

    let report = run(&options).await.expect("replay");
    assert_eq!(report.total_captured, 1);
}

#[tokio::test]
#[serial]
async fn missing_event_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let options = ReplayOptions {
        events: dir.path().join("does-not-exist.jsonl"),
        session: SessionConfig::default(),
        export: ExportConfig {
            path: dir.path().join("capture.json"),
        },
    };

    let err = run(&options).await.expect_err("missing input");
    assert!(err.to_string().contains("reading event stream"));
}
