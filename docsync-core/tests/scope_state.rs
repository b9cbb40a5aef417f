//! Scope state layout, lock exclusivity, and marker decoding.

use std::fs;

use docsync_core::{
    counter::read_decimal, lock, paths, Counter, MarkerEncoding, ProgressTracker, ScopeId,
    StoreError, TrackingState,
};
use rstest::rstest;
use tempfile::TempDir;

fn repo_scope() -> ScopeId {
    ScopeId::repository(std::path::Path::new("/code/copnow_api"))
}

// ---------------------------------------------------------------------------
// 1. Layout
// ---------------------------------------------------------------------------

#[test]
fn repository_and_session_state_files_share_one_scope_dir() {
    let home = TempDir::new().expect("home");
    let scope = repo_scope();
    let dir = paths::scope_dir(home.path(), &scope);

    let tracker = ProgressTracker::for_scope(home.path(), &scope);
    tracker.initialize("abc123", "commit-range/v1").expect("init");
    let handle = lock::acquire(&dir).expect("lock");

    assert_eq!(tracker.path(), dir.join("tracking.json"));
    assert_eq!(handle.path(), dir.join("lock"));
    assert!(dir.join("tracking.json").exists());
}

#[test]
fn session_scope_tracks_plain_line_numbers() {
    let home = TempDir::new().expect("home");
    let scope = ScopeId::session("0b6f-session");
    let tracker = ProgressTracker::for_scope(home.path(), &scope);

    tracker
        .write(&TrackingState::new("120", "transcript/v1"))
        .expect("write");
    let raw = fs::read_to_string(tracker.path()).expect("read raw");
    assert_eq!(raw, "120\n");
    assert_eq!(
        read_decimal(tracker.path()).expect("decimal"),
        Some(120),
        "session marker must stay a bare decimal"
    );
}

// ---------------------------------------------------------------------------
// 2. Lock exclusivity
// ---------------------------------------------------------------------------

#[test]
fn contending_acquire_fails_without_touching_tracking() {
    let home = TempDir::new().expect("home");
    let scope = repo_scope();
    let dir = paths::scope_dir(home.path(), &scope);
    let tracker = ProgressTracker::for_scope(home.path(), &scope);
    tracker.initialize("c0", "commit-range/v1").expect("init");
    let before = fs::read_to_string(tracker.path()).expect("before");

    let _held = lock::acquire(&dir).expect("first");
    match lock::acquire(&dir) {
        Err(StoreError::LockHeld { path }) => assert!(path.ends_with("lock")),
        other => panic!("expected LockHeld, got {other:?}"),
    }

    let after = fs::read_to_string(tracker.path()).expect("after");
    assert_eq!(before, after);
}

#[test]
fn lock_is_reacquirable_after_release() {
    let home = TempDir::new().expect("home");
    let dir = paths::scope_dir(home.path(), &repo_scope());

    let mut first = lock::acquire(&dir).expect("first");
    first.release();
    let second = lock::acquire(&dir).expect("second");
    lock::release(Some(second));
    assert!(!lock::is_locked(&dir));
}

// ---------------------------------------------------------------------------
// 3. Decimal decoding
// ---------------------------------------------------------------------------

#[rstest]
#[case("0\n", Some(0))]
#[case("17", Some(17))]
#[case("  42  \n", Some(42))]
#[case("", None)]
#[case("\n", None)]
fn decimal_files_decode(#[case] contents: &str, #[case] expected: Option<u64>) {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("counter");
    fs::write(&path, contents).expect("write");
    assert_eq!(read_decimal(&path).expect("decode"), expected);
}

#[rstest]
#[case("-1")]
#[case("4.5")]
#[case("five")]
fn non_decimal_files_are_rejected(#[case] contents: &str) {
    let tmp = TempDir::new().expect("tmp");
    let counter = Counter::new(tmp.path().join("counter"));
    fs::write(counter.path(), contents).expect("write");
    assert!(matches!(
        counter.read(),
        Err(StoreError::NotANumber { .. })
    ));
}

#[test]
fn plain_tracker_reads_structured_document_too() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("last_line");
    fs::write(
        &path,
        r#"{"last_processed_marker":"9","updated_at":"2024-01-01T00:00:00Z","strategy_version":"transcript/v1"}"#,
    )
    .expect("write");

    let state = ProgressTracker::new(&path, MarkerEncoding::Plain)
        .read()
        .expect("read");
    assert_eq!(state.last_processed_marker, "9");
    assert_eq!(state.strategy_version, "transcript/v1");
}
