use pretty_assertions::assert_eq;
use serde_json::json;
use zinc_core::{StrayEventPolicy, Task, TaskRegistry, UpsertOutcome};

fn task(id: &str, status: &str) -> Task {
    serde_json::from_value(json!({
        "id": id,
        "task_type": "download",
        "status": status,
        "progress": 0.0,
        "url": format!("https://example.com/{id}"),
        "title": id,
    }))
    .expect("valid task payload")
}

fn ids(registry: &TaskRegistry) -> Vec<String> {
    registry.iter().map(|task| task.id.clone()).collect()
}

#[test]
fn snapshot_is_newest_first() {
    let mut registry = TaskRegistry::default();
    registry.upsert(task("a", "pending"));
    registry.upsert(task("b", "pending"));
    registry.upsert(task("c", "pending"));

    assert_eq!(ids(&registry), vec!["c", "b", "a"]);
    assert_eq!(registry.snapshot().len(), 3);
}

#[test]
fn replacing_an_old_entry_keeps_its_position() {
    let mut registry = TaskRegistry::default();
    registry.upsert(task("a", "pending"));
    registry.upsert(task("b", "pending"));

    let mut updated = task("a", "downloading");
    updated.progress = 42.0;
    assert_eq!(registry.reconcile(updated.clone()), UpsertOutcome::Replaced);

    assert_eq!(ids(&registry), vec!["b", "a"]);
    assert_eq!(registry.get("a"), Some(&updated));
}

#[test]
fn upsert_replaces_wholesale() {
    let mut registry = TaskRegistry::default();
    let mut first = task("a", "downloading");
    first.speed = Some("1.2MiB/s".to_string());
    first.eta = Some("00:10".to_string());
    registry.reconcile(first);

    let second = task("a", "transcribing:extracting");
    registry.reconcile(second.clone());

    let stored = registry.get("a").unwrap();
    assert_eq!(stored, &second);
    assert_eq!(stored.speed, None);
    assert_eq!(stored.eta, None);
}

#[test]
fn confirmation_tracks_the_latest_write() {
    let mut registry = TaskRegistry::default();
    registry.upsert(task("a", "pending"));
    assert_eq!(registry.is_confirmed("a"), Some(false));

    registry.reconcile(task("a", "downloading"));
    assert_eq!(registry.is_confirmed("a"), Some(true));

    assert!(registry.patch("a", |task| task.progress = 50.0));
    assert_eq!(registry.is_confirmed("a"), Some(false));
    assert_eq!(registry.is_confirmed("missing"), None);
    assert!(!registry.patch("missing", |task| task.progress = 1.0));
}

#[test]
fn delete_where_removes_matching_entries_only() {
    let mut registry = TaskRegistry::default();
    registry.upsert(task("a", "completed"));
    registry.upsert(task("b", "downloading"));
    registry.upsert(task("c", "error"));
    registry.upsert(task("d", "cancelled"));

    let removed = registry.delete_where(Task::is_terminal);

    assert_eq!(removed, vec!["d", "c", "a"]);
    assert_eq!(ids(&registry), vec!["b"]);
}

#[test]
fn stray_event_after_delete_is_suppressed() {
    let mut registry = TaskRegistry::new(StrayEventPolicy::Suppress, 8);
    registry.upsert(task("a", "downloading"));
    assert!(registry.delete("a").is_some());
    assert!(registry.is_tombstoned("a"));

    assert_eq!(registry.reconcile(task("a", "completed")), UpsertOutcome::Suppressed);
    assert!(registry.is_empty());
}

#[test]
fn stray_event_after_delete_resurrects_when_configured() {
    let mut registry = TaskRegistry::new(StrayEventPolicy::Resurrect, 8);
    registry.upsert(task("a", "downloading"));
    registry.upsert(task("b", "downloading"));
    registry.delete("a");

    assert_eq!(registry.reconcile(task("a", "completed")), UpsertOutcome::Inserted);
    // A resurrected id counts as newly seen.
    assert_eq!(ids(&registry), vec!["a", "b"]);
    assert!(!registry.is_tombstoned("a"));
}

#[test]
fn tombstones_are_bounded() {
    let mut registry = TaskRegistry::new(StrayEventPolicy::Suppress, 2);
    for id in ["a", "b", "c"] {
        registry.upsert(task(id, "completed"));
        registry.delete(id);
    }

    assert!(!registry.is_tombstoned("a"));
    assert!(registry.is_tombstoned("b"));
    assert!(registry.is_tombstoned("c"));
    assert_eq!(registry.reconcile(task("a", "completed")), UpsertOutcome::Inserted);
}

#[test]
fn local_insert_clears_tombstone() {
    let mut registry = TaskRegistry::default();
    registry.upsert(task("a", "completed"));
    registry.delete("a");

    registry.upsert(task("a", "pending"));
    assert!(!registry.is_tombstoned("a"));
    registry.delete("a");
    assert!(registry.is_tombstoned("a"));
}
