use super::*;
use scribe_core::clock::{CalendarNow, Clock, FakeClock};
use scribe_core::entry::LogEntry;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;

fn entries(msgs: &[&str]) -> Batch {
    msgs.iter().map(|m| LogEntry::new("foo", m.as_bytes())).collect()
}

/// A scripted primary/secondary test double. `handle_batch` always
/// succeeds unless `fail_handle` is set, in which case it leaves the
/// whole batch as residual. Readable-store methods operate on an
/// in-memory queue of batches so the SendingBuffer drain loop has
/// something real to read/delete/replace. `open_result` is shared through
/// an `Arc` so a test can flip it after the store has been boxed away
/// into a `BufferStore`, to simulate a reconnect becoming possible.
struct FakeStore {
    open_result: Arc<AtomicBool>,
    open: bool,
    fail_handle: bool,
    readable: bool,
    queue: StdMutex<VecDeque<Batch>>,
    handled: StdMutex<Vec<Batch>>,
}

impl FakeStore {
    fn new(open_result: bool) -> Self {
        Self::new_shared(Arc::new(AtomicBool::new(open_result)))
    }

    fn new_shared(open_result: Arc<AtomicBool>) -> Self {
        Self {
            open_result,
            open: false,
            fail_handle: false,
            readable: false,
            queue: StdMutex::new(VecDeque::new()),
            handled: StdMutex::new(Vec::new()),
        }
    }

    fn readable_with(queued: Vec<Batch>) -> Self {
        Self {
            readable: true,
            queue: StdMutex::new(queued.into()),
            ..Self::new(true)
        }
    }
}

#[async_trait]
impl Store for FakeStore {
    async fn configure(&mut self, _conf: &Arc<ConfNode>) -> Result<(), StoreConfigError> {
        Ok(())
    }

    async fn open(&mut self) -> bool {
        self.open = self.open_result.load(Ordering::Relaxed);
        self.open
    }

    async fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn handle_batch(&mut self, batch: &mut Batch) -> bool {
        self.handled.lock().unwrap().push(batch.clone());
        if self.fail_handle {
            return false;
        }
        if self.readable {
            self.queue.lock().unwrap().push_back(batch.clone());
        }
        batch.clear();
        true
    }

    async fn flush(&mut self) {}
    async fn periodic_check(&mut self, _pending_bytes: u64, _max_queue_size: u64) {}

    fn copy(&self, _category: &str) -> Box<dyn Store> {
        unreachable!("not exercised by these tests")
    }

    fn type_name(&self) -> &'static str {
        "fake-test-double"
    }

    fn is_readable(&self) -> bool {
        self.readable
    }

    async fn read_oldest(&mut self, _now: &CalendarNow) -> Batch {
        self.queue.lock().unwrap().front().cloned().unwrap_or_default()
    }

    async fn replace_oldest(&mut self, batch: Batch, _now: &CalendarNow) -> bool {
        let mut q = self.queue.lock().unwrap();
        if q.is_empty() {
            return false;
        }
        q[0] = batch;
        true
    }

    async fn delete_oldest(&mut self, _now: &CalendarNow) -> bool {
        self.queue.lock().unwrap().pop_front().is_some()
    }

    async fn empty(&mut self, _now: &CalendarNow) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

#[tokio::test]
async fn new_rejects_non_readable_secondary() {
    let primary = Box::new(FakeStore::new(true));
    let secondary = Box::new(FakeStore::new(true));
    assert!(BufferStore::new(primary, secondary).is_err());
}

#[tokio::test]
async fn open_with_healthy_primary_drains_empty_buffer_straight_to_streaming() {
    let primary = Box::new(FakeStore::new(true));
    let secondary = Box::new(FakeStore::readable_with(vec![]));
    let mut store = BufferStore::new(primary, secondary).unwrap();

    assert!(store.open().await);
    assert_eq!(store.state(), BufferState::SendingBuffer);
    store.periodic_check(0, 0).await;
    assert_eq!(store.state(), BufferState::Streaming);
}

#[tokio::test]
async fn open_with_failed_primary_enters_disconnected() {
    let primary = Box::new(FakeStore::new(false));
    let secondary = Box::new(FakeStore::readable_with(vec![]));
    let mut store = BufferStore::new(primary, secondary).unwrap();

    assert!(store.open().await);
    assert_eq!(store.state(), BufferState::Disconnected);
}

#[tokio::test]
async fn streaming_handle_batch_failure_transitions_to_disconnected() {
    let mut primary = FakeStore::new(true);
    primary.fail_handle = true;
    let secondary = Box::new(FakeStore::readable_with(vec![]));
    let mut store = BufferStore::new(Box::new(primary), secondary).unwrap();
    store.open().await;
    store.periodic_check(0, 0).await; // SendingBuffer -> Streaming (secondary empty)
    assert_eq!(store.state(), BufferState::Streaming);

    let mut batch = entries(&["a"]);
    let ok = store.handle_batch(&mut batch).await;
    assert!(!ok);
    assert_eq!(store.state(), BufferState::Disconnected);
}

#[tokio::test]
async fn disconnected_handle_batch_forwards_to_secondary() {
    let primary = Box::new(FakeStore::new(false));
    let secondary = Box::new(FakeStore::readable_with(vec![]));
    let mut store = BufferStore::new(primary, secondary).unwrap();
    store.open().await;
    assert_eq!(store.state(), BufferState::Disconnected);

    let mut batch = entries(&["a"]);
    let ok = store.handle_batch(&mut batch).await;
    assert!(ok);
    assert!(batch.is_empty());
}

#[tokio::test]
async fn retry_timer_elapsed_moves_disconnected_to_sending_buffer() {
    let clock = Arc::new(FakeClock::new(0));
    let primary_open = Arc::new(AtomicBool::new(false));
    let primary = Box::new(FakeStore::new_shared(primary_open.clone()));
    let secondary = Box::new(FakeStore::readable_with(vec![entries(&["queued"])]));
    let mut store = BufferStore::new(primary, secondary)
        .unwrap()
        .with_clock(clock.clone() as Arc<dyn Clock>);
    store.open().await;
    assert_eq!(store.state(), BufferState::Disconnected);

    // Retry timer hasn't elapsed yet, and the primary still can't open.
    store.periodic_check(0, 0).await;
    assert_eq!(store.state(), BufferState::Disconnected);

    clock.advance(10_000);
    primary_open.store(true, Ordering::Relaxed);
    store.periodic_check(0, 0).await;
    assert_eq!(store.state(), BufferState::SendingBuffer);
}

#[tokio::test]
async fn sending_buffer_drains_queued_batches_and_returns_to_streaming() {
    let primary = Box::new(FakeStore::new(true));
    let secondary = Box::new(FakeStore::readable_with(vec![entries(&["a"]), entries(&["b"])]));
    let mut store = BufferStore::new(primary, secondary).unwrap();
    store.open().await;
    assert_eq!(store.state(), BufferState::SendingBuffer);

    store.periodic_check(0, 0).await;
    assert_eq!(store.state(), BufferState::Streaming);
}

#[tokio::test]
async fn sending_buffer_reconnect_failure_replaces_residual_and_disconnects() {
    let mut primary = FakeStore::new(true);
    primary.fail_handle = true;
    let secondary = Box::new(FakeStore::readable_with(vec![entries(&["a"])]));
    let mut store = BufferStore::new(Box::new(primary), secondary).unwrap();
    store.open().await;
    assert_eq!(store.state(), BufferState::SendingBuffer);

    store.periodic_check(0, 0).await;
    assert_eq!(store.state(), BufferState::Disconnected);
}

#[tokio::test]
async fn sending_buffer_yields_when_over_bypass_ratio_and_flush_streaming() {
    let primary = Box::new(FakeStore::new(true));
    let secondary = Box::new(FakeStore::readable_with(vec![entries(&["a"])]));
    let mut store = BufferStore::new(primary, secondary).unwrap();
    store.config.flush_streaming = true;
    store.config.buffer_bypass_max_ratio = 1.0;
    store.open().await;
    assert_eq!(store.state(), BufferState::SendingBuffer);

    // pending_bytes (100) >= ratio (1.0) * max_queue_size (50): yield this
    // tick entirely, leaving the queued secondary batch undrained.
    store.periodic_check(100, 50).await;
    assert_eq!(store.state(), BufferState::SendingBuffer);
}

#[tokio::test]
async fn sending_buffer_drains_when_under_bypass_ratio_despite_flush_streaming() {
    let primary = Box::new(FakeStore::new(true));
    let secondary = Box::new(FakeStore::readable_with(vec![entries(&["a"])]));
    let mut store = BufferStore::new(primary, secondary).unwrap();
    store.config.flush_streaming = true;
    store.config.buffer_bypass_max_ratio = 1.0;
    store.open().await;
    assert_eq!(store.state(), BufferState::SendingBuffer);

    // pending_bytes (10) is under the ratio * max_queue_size (50) threshold,
    // so draining proceeds as usual and the secondary empties out.
    store.periodic_check(10, 50).await;
    assert_eq!(store.state(), BufferState::Streaming);
}

#[test]
fn type_name_is_buffer() {
    let primary = Box::new(FakeStore::new(true));
    let secondary = Box::new(FakeStore::readable_with(vec![]));
    let store = BufferStore::new(primary, secondary).unwrap();
    assert_eq!(store.type_name(), "buffer");
}
