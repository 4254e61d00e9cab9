use std::time::Duration;

use scribe_core::conf::ConfBuilder;
use scribe_core::metrics::{InMemoryMetrics, MetricsSink};
use scribe_core::FakeClock;

use super::*;

fn null_block(categories: &str) -> ConfBuilder {
    let mut b = ConfBuilder::new();
    b.set("type", "null");
    b.set("category", categories);
    b
}

async fn build(root: ConfBuilder) -> (CategoryRegistry, bool) {
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    let metrics: Arc<dyn MetricsSink> = Arc::new(InMemoryMetrics::new());
    CategoryRegistry::build(&root.build(), true, Duration::from_secs(5), clock, metrics, scribe_store::StoreDeps::default())
        .await
        .expect("registry should build")
}

#[tokio::test]
async fn exact_category_store_is_spawned_eagerly_at_build() {
    let mut root = ConfBuilder::new();
    root.add_child("store0", null_block("foo"));
    let (registry, had_warnings) = build(root).await;
    assert!(!had_warnings);

    let queues = registry.resolve("foo").await.expect("foo should resolve");
    assert_eq!(queues.len(), 1);
    registry.stop_all().await;
}

#[tokio::test]
async fn unmatched_category_with_no_default_resolves_to_none() {
    let mut root = ConfBuilder::new();
    root.add_child("store0", null_block("foo"));
    let (registry, _) = build(root).await;

    assert!(registry.resolve("somethingelse").await.is_none());
    registry.stop_all().await;
}

#[tokio::test]
async fn prefix_pattern_spawns_one_dedicated_queue_per_concrete_category() {
    let mut root = ConfBuilder::new();
    root.add_child("store0", null_block("web*"));
    let (registry, _) = build(root).await;

    let a = registry.resolve("webfoo").await.expect("webfoo should resolve via web*");
    let b = registry.resolve("webbar").await.expect("webbar should resolve via web*");
    assert!(!Arc::ptr_eq(&a[0], &b[0]), "distinct categories get distinct queues under new_thread_per_category");

    let a_again = registry.resolve("webfoo").await.expect("webfoo still resolves");
    assert!(Arc::ptr_eq(&a[0], &a_again[0]), "re-resolving the same category returns the same queue");

    registry.stop_all().await;
}

#[tokio::test]
async fn default_store_catches_unmatched_categories() {
    let mut root = ConfBuilder::new();
    root.add_child("store0", null_block("web*"));
    root.add_child("store1", null_block("default"));
    let (registry, had_warnings) = build(root).await;
    assert!(!had_warnings);

    let other = registry.resolve("other").await.expect("default should catch this");
    assert_eq!(other.len(), 1);
    assert!(registry.resolve("webfoo").await.is_some());

    registry.stop_all().await;
}

#[tokio::test]
async fn shared_mode_reuses_one_queue_across_matching_categories() {
    let mut root = ConfBuilder::new();
    root.add_child("store0", null_block("web*"));
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    let metrics: Arc<dyn MetricsSink> = Arc::new(InMemoryMetrics::new());
    let (registry, _) = CategoryRegistry::build(&root.build(), false, Duration::from_secs(5), clock, metrics, scribe_store::StoreDeps::default())
        .await
        .expect("registry should build");

    let a = registry.resolve("webfoo").await.expect("webfoo resolves");
    let b = registry.resolve("webbar").await.expect("webbar resolves");
    assert!(Arc::ptr_eq(&a[0], &b[0]), "shared mode reuses the same queue across categories matching one pattern");
    assert!(a[0].is_multi_category());

    registry.stop_all().await;
}

#[tokio::test]
async fn duplicate_default_block_is_skipped_with_a_warning_not_a_fatal_error() {
    let mut root = ConfBuilder::new();
    root.add_child("store0", null_block("default"));
    root.add_child("store1", null_block("default"));
    let (registry, had_warnings) = build(root).await;
    assert!(had_warnings);

    // The first "default" block wins; the second was skipped.
    assert!(registry.resolve("anything").await.is_some());
    registry.stop_all().await;
}

#[tokio::test]
async fn category_less_block_is_skipped_with_a_warning() {
    let mut root = ConfBuilder::new();
    let mut no_category = ConfBuilder::new();
    no_category.set("type", "null");
    root.add_child("store0", no_category);
    root.add_child("store1", null_block("foo"));
    let (registry, had_warnings) = build(root).await;
    assert!(had_warnings);
    assert!(registry.resolve("foo").await.is_some());
    registry.stop_all().await;
}

#[tokio::test]
async fn no_runnable_store_is_a_fatal_init_error() {
    let mut root = ConfBuilder::new();
    let mut no_category = ConfBuilder::new();
    no_category.set("type", "null");
    root.add_child("store0", no_category);
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(0));
    let metrics: Arc<dyn MetricsSink> = Arc::new(InMemoryMetrics::new());
    let err = CategoryRegistry::build(&root.build(), true, Duration::from_secs(5), clock, metrics, scribe_store::StoreDeps::default()).await;
    assert!(matches!(err, Err(EngineError::NoStoresConfigured)));
}
