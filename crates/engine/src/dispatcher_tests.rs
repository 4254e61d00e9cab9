use std::time::Duration;

use parking_lot::Mutex;
use scribe_core::conf::ConfBuilder;
use scribe_core::entry::LogEntry;
use scribe_core::metrics::{InMemoryMetrics, MetricsSink};
use scribe_core::random::FakeRandom;
use scribe_core::status::ServerStatus;
use scribe_core::FakeClock;

use super::*;

fn null_block(categories: &str) -> ConfBuilder {
    let mut b = ConfBuilder::new();
    b.set("type", "null");
    b.set("category", categories);
    b
}

struct Fixture {
    dispatcher: Dispatcher,
    status: Arc<Mutex<ServerStatus>>,
    metrics: Arc<InMemoryMetrics>,
    clock: Arc<FakeClock>,
    registry: Arc<CategoryRegistry>,
}

async fn fixture(config: DispatcherConfig) -> Fixture {
    let mut root = ConfBuilder::new();
    root.add_child("store0", null_block("foo"));
    let clock = Arc::new(FakeClock::new(0));
    let metrics = Arc::new(InMemoryMetrics::new());
    let (registry, _) = CategoryRegistry::build(
        &root.build(),
        true,
        Duration::from_secs(5),
        clock.clone() as Arc<dyn Clock>,
        metrics.clone() as Arc<dyn MetricsSink>,
        scribe_store::StoreDeps::default(),
    )
    .await
    .expect("registry should build");
    let registry = Arc::new(registry);
    let random: Arc<dyn RandomSource> = Arc::new(FakeRandom::new(vec![0]).with_f64(0.0));
    let status = Arc::new(Mutex::new(ServerStatus::Running));
    let dispatcher = Dispatcher::new(
        Arc::clone(&status),
        Arc::clone(&registry),
        config,
        clock.clone() as Arc<dyn Clock>,
        random,
        metrics.clone() as Arc<dyn MetricsSink>,
    );
    Fixture {
        dispatcher,
        status,
        metrics,
        clock,
        registry,
    }
}

#[tokio::test]
async fn empty_category_entries_are_not_admitted() {
    let f = fixture(DispatcherConfig::default()).await;
    let batch = vec![LogEntry::new("", "hello")];
    assert_eq!(f.dispatcher.log(batch).await, LogCode::Ok);
    assert_eq!(f.metrics.counter_value("message.ignore"), 1);
    assert_eq!(f.metrics.counter_value("foo.admit"), 0);
    f.registry.stop_all().await;
}

#[tokio::test]
async fn non_portable_category_is_dropped() {
    let f = fixture(DispatcherConfig::default()).await;
    let batch = vec![LogEntry::new("../etc", "hello")];
    assert_eq!(f.dispatcher.log(batch).await, LogCode::Ok);
    assert_eq!(f.metrics.counter_value("../etc.ignore"), 1);
    f.registry.stop_all().await;
}

#[tokio::test]
async fn unmatched_category_is_dropped_with_ignore_counter() {
    let f = fixture(DispatcherConfig::default()).await;
    let batch = vec![LogEntry::new("nowhere", "hello")];
    assert_eq!(f.dispatcher.log(batch).await, LogCode::Ok);
    assert_eq!(f.metrics.counter_value("nowhere.ignore"), 1);
    assert_eq!(f.metrics.counter_value("scribe_overall.ignore"), 1);
    f.registry.stop_all().await;
}

#[tokio::test]
async fn matched_category_is_admitted_and_aggregated() {
    let f = fixture(DispatcherConfig::default()).await;
    let batch = vec![LogEntry::new("foo", "hello")];
    assert_eq!(f.dispatcher.log(batch).await, LogCode::Ok);
    assert_eq!(f.metrics.counter_value("foo.admit"), 1);
    assert_eq!(f.metrics.counter_value("scribe_overall.admit"), 1);
    f.registry.stop_all().await;
}

#[tokio::test]
async fn stopping_server_rejects_with_try_later() {
    let f = fixture(DispatcherConfig::default()).await;
    *f.status.lock() = ServerStatus::Stopping;
    let batch = vec![LogEntry::new("foo", "hello")];
    assert_eq!(f.dispatcher.log(batch).await, LogCode::TryLater);
    assert_eq!(f.metrics.counter_value("message.deny_stopping"), 1);
    assert_eq!(f.metrics.counter_value("foo.admit"), 0);
    f.registry.stop_all().await;
}

fn batch_of(n: usize) -> Vec<LogEntry> {
    (0..n).map(|i| LogEntry::new("foo", format!("m{i}"))).collect()
}

// Admission-rate boundary table: `max_msg_per_second` is 10 (half = 5)
// everywhere except the disabled-check row, so the "catastrophic" escape
// hatch (batch_len > half) only fires for the rows that name it.
#[yare::parameterized(
    two_non_catastrophic_calls_exactly_fill_the_budget = { 10, 5, Some(5), 0, LogCode::Ok },
    a_catastrophic_first_call_is_admitted_regardless_of_the_window = { 10, 7, None, 0, LogCode::Ok },
    catastrophic_admission_still_counts_toward_the_next_calls_budget = { 10, 7, Some(4), 0, LogCode::TryLater },
    a_new_wall_clock_second_resets_the_window_before_the_next_call = { 10, 7, Some(4), 1_000, LogCode::Ok },
    zero_disables_the_rate_check_entirely = { 0, 1_000_000, None, 0, LogCode::Ok },
)]
fn admission_rate_boundary_table(
    max_msg_per_second: u64,
    first_len: usize,
    second_len: Option<usize>,
    advance_ms: u64,
    expected: LogCode,
) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let config = DispatcherConfig {
            max_msg_per_second,
            ..Default::default()
        };
        let f = fixture(config).await;

        assert_eq!(f.dispatcher.log(batch_of(first_len)).await, LogCode::Ok);

        if let Some(len) = second_len {
            f.clock.advance(advance_ms);
            assert_eq!(f.dispatcher.log(batch_of(len)).await, expected);
        }
        f.registry.stop_all().await;
    });
}

#[tokio::test]
async fn second_call_in_the_same_second_exceeding_the_rate_is_denied() {
    let config = DispatcherConfig {
        max_msg_per_second: 3,
        ..Default::default()
    };
    let f = fixture(config).await;

    let first = vec![LogEntry::new("foo", "a"), LogEntry::new("foo", "b")];
    assert_eq!(f.dispatcher.log(first).await, LogCode::Ok);

    let second = vec![LogEntry::new("foo", "c"), LogEntry::new("foo", "d")];
    assert_eq!(f.dispatcher.log(second).await, LogCode::TryLater);
    assert_eq!(f.metrics.counter_value("message.deny_rate"), 2);
    f.registry.stop_all().await;
}

#[tokio::test]
async fn rate_window_resets_on_the_next_wall_clock_second() {
    let config = DispatcherConfig {
        max_msg_per_second: 1,
        ..Default::default()
    };
    let f = fixture(config).await;

    assert_eq!(f.dispatcher.log(vec![LogEntry::new("foo", "a")]).await, LogCode::Ok);
    assert_eq!(
        f.dispatcher.log(vec![LogEntry::new("foo", "b")]).await,
        LogCode::TryLater,
        "second call in the same second should be denied"
    );

    f.clock.advance(1_000);
    assert_eq!(
        f.dispatcher.log(vec![LogEntry::new("foo", "c")]).await,
        LogCode::Ok,
        "a new wall-clock second should reopen the window"
    );
    f.registry.stop_all().await;
}

#[tokio::test]
async fn catastrophic_batch_bypasses_the_rate_check() {
    let config = DispatcherConfig {
        max_msg_per_second: 4,
        ..Default::default()
    };
    let f = fixture(config).await;

    // batch_len (3) > max_msg_per_second/2 (2): admitted regardless of the
    // window, to avoid a live-lock where the client just resubmits.
    let huge = vec![LogEntry::new("foo", "a"), LogEntry::new("foo", "b"), LogEntry::new("foo", "c")];
    assert_eq!(f.dispatcher.log(huge).await, LogCode::Ok);
    assert_eq!(f.metrics.counter_value("foo.admit"), 3);
    f.registry.stop_all().await;
}

#[tokio::test]
async fn queue_over_its_byte_budget_is_denied() {
    let config = DispatcherConfig {
        max_queue_size: 4,
        ..Default::default()
    };
    let f = fixture(config).await;

    // First call pushes the "foo" queue's pending byte count over budget
    // (the queue's check_period/max_write_interval in this fixture are
    // long enough that nothing drains before the second call observes it).
    let over_budget = vec![LogEntry::new("foo", "0123456789")];
    assert_eq!(f.dispatcher.log(over_budget).await, LogCode::Ok);

    let next = vec![LogEntry::new("foo", "x")];
    assert_eq!(f.dispatcher.log(next).await, LogCode::TryLater);
    assert_eq!(f.metrics.counter_value("message.deny_queue"), 1);
    f.registry.stop_all().await;
}

#[tokio::test]
async fn entries_carrying_a_send_timestamp_record_hop_latency_and_have_it_stripped() {
    let f = fixture(DispatcherConfig::default()).await;
    f.clock.set(10_000);

    let mut entry = LogEntry::new("foo", "hello");
    entry.set_timestamp_ms(9_000);
    assert_eq!(f.dispatcher.log(vec![entry]).await, LogCode::Ok);

    assert_eq!(f.metrics.histogram_values("foo.hop_latency"), vec![1_000]);
    f.registry.stop_all().await;
}

#[tokio::test]
async fn full_sample_rate_stamps_a_fresh_timestamp_on_every_admitted_entry() {
    let f = fixture(DispatcherConfig::default()).await;
    f.clock.set(5_000);

    // The dispatcher owns the entry by the time it's enqueued, so we can't
    // read back what it wrote; the sampling decision itself (FakeRandom's
    // fixed 0.0 is always < the default 1.0 sample rate) is what's under
    // test, via the entry being admitted rather than dropped.
    let batch = vec![LogEntry::new("foo", "hello")];
    assert_eq!(f.dispatcher.log(batch).await, LogCode::Ok);
    assert_eq!(f.metrics.counter_value("foo.admit"), 1);
    f.registry.stop_all().await;
}
