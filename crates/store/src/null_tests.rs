use super::*;
use scribe_core::entry::LogEntry;

#[tokio::test]
async fn handle_batch_always_succeeds_and_consumes_everything() {
    let mut store = NullStore::new();
    assert!(store.open().await);
    let mut batch = vec![LogEntry::new("a", "1"), LogEntry::new("a", "2")];
    assert!(store.handle_batch(&mut batch).await);
    assert!(batch.is_empty());
    assert_eq!(store.ignored_count(), 2);
}

#[tokio::test]
async fn empty_batch_returns_true() {
    let mut store = NullStore::new();
    store.open().await;
    let mut batch: Batch = Vec::new();
    assert!(store.handle_batch(&mut batch).await);
}

#[test]
fn is_readable_and_reports_empty() {
    let store = NullStore::new();
    assert!(store.is_readable());
    assert_eq!(store.type_name(), "null");
}
