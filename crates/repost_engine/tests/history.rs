use std::fs;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use repost_core::{EntryStatus, HistoryEntry};
use repost_engine::{HistoryLog, JsonlHistory, MemoryHistory};
use tempfile::TempDir;

fn entry(id: &str, minute: u32) -> HistoryEntry {
    HistoryEntry {
        id: id.to_string(),
        source_url: format!("https://www.xiaohongshu.com/explore/{id}"),
        post_id: id.to_string(),
        title: format!("标题{id}"),
        body: "正文".to_string(),
        tags: vec!["生活".to_string()],
        image_count: 1,
        created_at: Utc.with_ymd_and_hms(2026, 10, 1, 9, minute, 0).unwrap(),
        status: EntryStatus::Completed,
    }
}

fn exercise(log: &dyn HistoryLog) {
    log.append(entry("a", 1)).unwrap();
    log.append(entry("b", 2)).unwrap();
    log.append(entry("c", 3)).unwrap();

    let ids: Vec<String> = log.list().unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let recent: Vec<String> = log.recent(2).unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(recent, vec!["c", "b"]);

    assert!(log.remove("b").unwrap());
    assert!(!log.remove("b").unwrap());
    let ids: Vec<String> = log.list().unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(ids, vec!["a", "c"]);

    log.clear().unwrap();
    assert!(log.list().unwrap().is_empty());
}

#[test]
fn memory_history_operations() {
    exercise(&MemoryHistory::new());
}

#[test]
fn jsonl_history_operations() {
    let temp = TempDir::new().unwrap();
    exercise(&JsonlHistory::new(temp.path().join("history.jsonl")));
}

#[test]
fn jsonl_history_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state").join("history.jsonl");

    JsonlHistory::new(&path).append(entry("a", 1)).unwrap();
    let reopened = JsonlHistory::new(&path);
    assert_eq!(reopened.list().unwrap(), vec![entry("a", 1)]);
}

#[test]
fn jsonl_history_uses_camel_case_lines() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("history.jsonl");
    JsonlHistory::new(&path).append(entry("a", 1)).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(text.contains("\"sourceUrl\""));
    assert!(text.contains("\"createdAt\""));
    assert!(text.contains("\"status\":\"completed\""));
}

#[test]
fn unreadable_lines_are_skipped() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("history.jsonl");
    let good = serde_json::to_string(&entry("a", 1)).unwrap();
    fs::write(&path, format!("{good}\nnot json\n\n")).unwrap();

    let ids: Vec<String> = JsonlHistory::new(&path)
        .list()
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec!["a"]);
}

#[test]
fn missing_file_lists_empty() {
    let temp = TempDir::new().unwrap();
    let history = JsonlHistory::new(temp.path().join("absent.jsonl"));
    assert!(history.list().unwrap().is_empty());
    assert_eq!(history.recent(5).unwrap(), Vec::new());
}

#[test]
fn concurrent_appends_are_all_kept() {
    let temp = TempDir::new().unwrap();
    let history = Arc::new(JsonlHistory::new(temp.path().join("history.jsonl")));

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let history = Arc::clone(&history);
            std::thread::spawn(move || {
                for m in 0..5 {
                    history.append(entry(&format!("t{n}-{m}"), m)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut ids: Vec<String> = history.list().unwrap().into_iter().map(|e| e.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 40);
}
