//! Replay of recorded host sessions from disk.
//!
//! Sessions are written to temporary files and replayed the way the
//! `editorflow replay` command does it.

use std::fs::File;
use std::io::{BufReader, Write};

use serde_json::Value;
use tempfile::NamedTempFile;

use editorflow::replay::{replay, ReplayOptions, ReplaySummary};
use editorflow::Config;

// =============================================================================
// Test Helpers
// =============================================================================

fn session_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("should create temp file");
    for line in lines {
        writeln!(file, "{line}").expect("should write session line");
    }
    file.flush().expect("should flush session file");
    file
}

fn replay_file(file: &NamedTempFile, options: &ReplayOptions) -> (ReplaySummary, Vec<Value>) {
    let input = BufReader::new(File::open(file.path()).expect("should reopen session file"));
    let mut out = Vec::new();
    let summary = replay(input, &mut out, options).expect("replay should succeed");
    let events = String::from_utf8(out)
        .expect("output should be UTF-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each output line should be JSON"))
        .collect();
    (summary, events)
}

fn types(events: &[Value]) -> Vec<&str> {
    events
        .iter()
        .map(|event| event["type"].as_str().unwrap())
        .collect()
}

const TYPE_A: &str = r#"{"rangeStartLine": 0, "rangeEndLine": 0, "rangeLength": 0, "insertedText": "a"}"#;

// =============================================================================
// Sessions
// =============================================================================

#[test]
fn editing_session_with_unfocus() {
    let change = format!(
        r#"{{"ts": 1000, "event": "change", "fileName": "/ws/api/main.rs", "languageId": "rust", "text": "fn main() {{}}", "deltas": [{TYPE_A}, {TYPE_A}]}}"#
    );
    let file = session_file(&[
        r#"{"ts": 0, "event": "windowState", "focused": true, "active": true, "primary": true}"#,
        r#"{"ts": 500, "event": "open", "fileName": "/ws/api/main.rs", "languageId": "rust"}"#,
        change.as_str(),
        r#"{"ts": 1500, "event": "change", "fileName": "/ws/api/main.rs", "scheme": "git", "deltas": []}"#,
        r#"{"ts": 2000, "event": "save", "fileName": "/ws/api/main.rs"}"#,
        r#"{"ts": 4000, "event": "windowState", "focused": false, "active": true}"#,
        r#"{"ts": 5000, "event": "theme", "kind": "dark"}"#,
    ]);
    let options = ReplayOptions {
        config: Config::default().with_workspace_folders(vec!["/ws/api".to_string()]),
        kpm_only: false,
    };

    let (summary, events) = replay_file(&file, &options);

    assert_eq!(summary.records, 7);
    assert_eq!(summary.skipped, 0);
    assert_eq!(
        types(&events),
        vec!["focus", "open", "change", "save", "unfocus", "kpm", "theme"]
    );
    assert_eq!(events[0]["primary"], true);
    assert_eq!(events[2]["deltaCount"], 2);

    let kpm = &events[5];
    assert_eq!(kpm["reason"], "unfocus");
    let main = &kpm["project"]["docsChanged"]["/ws/api/main.rs"];
    assert_eq!(main["filePath"], "/ws/api");
    assert_eq!(main["keystrokes"], 2);
    assert_eq!(main["syntax"], "rust");
    assert_eq!(main["start"], 500);
    assert_eq!(main["end"], 4000);
}

#[test]
fn unfocused_window_ignores_document_events() {
    let change = format!(
        r#"{{"ts": 100, "event": "change", "fileName": "a.rs", "deltas": [{TYPE_A}]}}"#
    );
    let file = session_file(&[
        r#"{"ts": 0, "event": "windowState", "focused": false, "active": false}"#,
        change.as_str(),
        r#"{"ts": 90000, "event": "tick"}"#,
    ]);
    let options = ReplayOptions {
        config: Config::default(),
        kpm_only: true,
    };

    let (summary, events) = replay_file(&file, &options);
    assert_eq!(summary.records, 3);
    assert!(events.is_empty());
}

#[test]
fn windows_split_by_timer() {
    let first = format!(
        r#"{{"ts": 0, "event": "change", "fileName": "a.rs", "deltas": [{TYPE_A}]}}"#
    );
    let second = format!(
        r#"{{"ts": 70000, "event": "change", "fileName": "b.rs", "deltas": [{TYPE_A}]}}"#
    );
    let file = session_file(&[
        first.as_str(),
        second.as_str(),
        r#"{"ts": 130000, "event": "tick"}"#,
    ]);
    let options = ReplayOptions {
        config: Config::default(),
        kpm_only: true,
    };

    let (_, events) = replay_file(&file, &options);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["project"]["docsChanged"]["a.rs"]["end"], 60000);
    assert_eq!(events[1]["project"]["docsChanged"]["b.rs"]["start"], 70000);
    assert_eq!(events[1]["project"]["docsChanged"]["b.rs"]["end"], 130000);
    assert!(events[1]["project"]["docsChanged"]["a.rs"].is_null());
}

#[test]
fn garbage_lines_are_counted() {
    let file = session_file(&["{", "[]", r#"{"ts": 1, "event": "tick"}"#]);
    let (summary, events) = replay_file(&file, &ReplayOptions::default());
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.records, 1);
    assert!(events.is_empty());
}
