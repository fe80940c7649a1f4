//! Tests for `src/state.rs`: the last-state store and its backing file.

use std::time::{Duration, SystemTime};

use vigil::state::{LastState, StateStore};

fn state(uuid: &str, passed: bool) -> LastState {
    LastState {
        name: format!("check {uuid}"),
        uuid: uuid.to_owned(),
        state: passed,
        details: if passed { "passed" } else { "failed" }.to_owned(),
    }
}

#[test]
fn commit_then_reopen_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("vigil.state");

    let store = StateStore::open(&path);
    store.update(state("uuid-1", true));
    store.update(state("uuid-2", false));
    store.commit().expect("commit should succeed");

    let reopened = StateStore::open(&path);
    assert_eq!(reopened.get("uuid-1"), Some(state("uuid-1", true)));
    assert_eq!(reopened.get("uuid-2"), Some(state("uuid-2", false)));
    assert_eq!(reopened.all().len(), 2);
}

#[test]
fn all_passed_over_store_contents() {
    let cases: [(&[(&str, bool)], bool); 4] = [
        (&[("u1", true), ("u2", true), ("u3", true)], true),
        (&[("u1", true), ("u2", false), ("u3", true)], false),
        (&[("u1", false), ("u2", false)], false),
        // An empty store is vacuously all-passed.
        (&[], true),
    ];

    for (entries, want) in cases {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = StateStore::open(dir.path().join("vigil.state"));
        for (uuid, passed) in entries {
            store.update(state(uuid, *passed));
        }
        assert_eq!(store.all_passed(), want, "entries: {entries:?}");
    }
}

#[test]
fn failed_returns_only_failing_states() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = StateStore::open(dir.path().join("vigil.state"));
    store.update(state("u1", true));
    store.update(state("u2", false));
    store.update(state("u3", true));

    let failed = store.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].uuid, "u2");
}

#[test]
fn commit_to_a_directory_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = StateStore::open(dir.path());
    store.update(state("u1", true));
    assert!(store.commit().is_err());
}

#[test]
fn external_write_with_newer_mtime_is_picked_up() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("vigil.state");

    let writer = StateStore::open(&path);
    writer.update(state("u1", true));
    writer.commit().expect("first commit");

    // A second process observes the current content.
    let viewer = StateStore::open(&path);
    assert!(viewer.all_passed());

    // The first process flips the result and commits again; the mtime is
    // pushed forward explicitly so the test does not depend on filesystem
    // timestamp resolution.
    writer.update(state("u1", false));
    writer.commit().expect("second commit");
    let file = std::fs::File::options()
        .write(true)
        .open(&path)
        .expect("open state file");
    let future = SystemTime::now()
        .checked_add(Duration::from_secs(10))
        .expect("time overflow");
    file.set_modified(future).expect("bump mtime");

    // The viewer sees the update on its next read, without reopening.
    assert!(!viewer.all_passed());
    assert_eq!(viewer.get("u1").map(|s| s.state), Some(false));
}

#[test]
fn entries_not_updated_by_a_run_survive_commit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("vigil.state");

    let earlier = StateStore::open(&path);
    earlier.update(state("old", false));
    earlier.commit().expect("seed commit");

    // A fresh process updates a different check and commits.
    let later = StateStore::open(&path);
    later.update(state("new", true));
    later.commit().expect("merge commit");

    let reopened = StateStore::open(&path);
    assert_eq!(reopened.get("old"), Some(state("old", false)));
    assert_eq!(reopened.get("new"), Some(state("new", true)));
}

#[test]
fn identical_runs_produce_identical_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path_a = dir.path().join("a.state");
    let path_b = dir.path().join("b.state");

    for path in [&path_a, &path_b] {
        let store = StateStore::open(path);
        store.update(state("u2", false));
        store.update(state("u1", true));
        store.commit().expect("commit");
    }

    let a = std::fs::read_to_string(&path_a).expect("read a");
    let b = std::fs::read_to_string(&path_b).expect("read b");
    assert_eq!(a, b);
}
