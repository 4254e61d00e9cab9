use super::*;
use scribe_core::conf::ConfBuilder;
use scribe_core::entry::LogEntry;
use scribe_core::random::FakeRandom;

fn entries(msgs: &[&str]) -> Batch {
    msgs.iter().map(|m| LogEntry::new("foo", m.as_bytes())).collect()
}

fn explicit_conf(num_buckets: u32) -> std::sync::Arc<ConfNode> {
    let mut root = ConfBuilder::new();
    root.set("bucket_type", "key_modulo");
    root.set("num_buckets", num_buckets.to_string());
    root.set("delimiter", "58"); // ':'
    for id in 0..=num_buckets {
        let mut child = ConfBuilder::new();
        child.set("type", "null");
        root.add_child(format!("bucket{id}"), child);
    }
    root.build()
}

#[tokio::test]
async fn configure_without_bucket_type_fails() {
    let mut store = BucketStore::new();
    let conf = ConfBuilder::new().build();
    assert!(store.configure(&conf).await.is_err());
}

#[tokio::test]
async fn explicit_blocks_build_one_store_per_bucket_including_failure_bucket() {
    let mut store = BucketStore::new();
    let conf = explicit_conf(2);
    store.configure(&conf).await.unwrap();
    assert_eq!(store.buckets.len(), 3);
}

#[tokio::test]
async fn template_mode_requires_bucket_subdir() {
    let mut store = BucketStore::new();
    let mut root = ConfBuilder::new();
    root.set("bucket_type", "key_hash");
    root.set("num_buckets", "2");
    let mut template = ConfBuilder::new();
    template.set("type", "null");
    root.add_child("bucket", template);
    let conf = root.build();

    assert!(store.configure(&conf).await.is_err());
}

#[tokio::test]
async fn template_mode_builds_file_children_with_unique_paths() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = BucketStore::new();
    let mut root = ConfBuilder::new();
    root.set("bucket_type", "key_hash");
    root.set("num_buckets", "2");
    let mut template = ConfBuilder::new();
    template.set("type", "file");
    template.set("file_path", dir.path().to_str().unwrap());
    template.set("bucket_subdir", "buckets");
    root.add_child("bucket", template);
    let conf = root.build();

    store.configure(&conf).await.unwrap();
    assert_eq!(store.buckets.len(), 3);
    assert!(store.open().await);
}

#[tokio::test]
async fn handle_batch_routes_by_key_and_reports_failure_bucket_residual() {
    let mut store = BucketStore::new().with_random(std::sync::Arc::new(FakeRandom::new(vec![0])));
    let conf = explicit_conf(2);
    store.configure(&conf).await.unwrap();
    assert!(store.open().await);

    // "a:1" hashes via key_modulo to some bucket 1..=2; "nodelim" has no
    // delimiter and always routes to the failure bucket, which is a
    // NullStore here and always succeeds, so the whole batch is consumed.
    let mut batch = entries(&["a:1", "nodelim"]);
    let ok = store.handle_batch(&mut batch).await;
    assert!(ok);
    assert!(batch.is_empty());
}

#[tokio::test]
async fn empty_batch_is_a_no_op_success() {
    let mut store = BucketStore::new();
    let conf = explicit_conf(1);
    store.configure(&conf).await.unwrap();
    store.open().await;

    let mut batch: Batch = Vec::new();
    assert!(store.handle_batch(&mut batch).await);
}

#[test]
fn type_name_is_bucket() {
    let store = BucketStore::new();
    assert_eq!(store.type_name(), "bucket");
}
