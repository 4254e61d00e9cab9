use super::*;
use crate::client::{RpcClient, RpcTimeouts, TcpRpcClient};
use scribe_core::entry::LogEntry;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingHandler {
    calls: AtomicUsize,
    reply: LogCode,
}

#[async_trait]
impl LogHandler for CountingHandler {
    async fn handle_log(&self, _batch: Batch) -> LogCode {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply
    }
}

async fn spawn_server(
    reply: LogCode,
) -> (SocketAddr, Arc<CountingHandler>, tokio::sync::watch::Sender<bool>) {
    let handler = Arc::new(CountingHandler {
        calls: AtomicUsize::new(0),
        reply,
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, rx) = tokio::sync::watch::channel(false);
    let server_handler = Arc::clone(&handler);
    tokio::spawn(async move {
        let server = RpcServer::new(server_handler);
        let _ = server.serve_listener(listener, rx).await;
    });
    (addr, handler, tx)
}

#[tokio::test]
async fn serves_log_requests_and_replies() {
    let (addr, handler, _tx) = spawn_server(LogCode::Ok).await;
    let mut client = TcpRpcClient::new(addr.ip().to_string(), addr.port(), RpcTimeouts::default());
    client.connect().await.unwrap();
    let batch = vec![LogEntry::new("cat", "hello")];
    let code = client.send_log(&batch).await.unwrap();
    assert!(matches!(code, LogCode::Ok));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn replies_try_later_when_handler_says_so() {
    let (addr, _handler, _tx) = spawn_server(LogCode::TryLater).await;
    let mut client = TcpRpcClient::new(addr.ip().to_string(), addr.port(), RpcTimeouts::default());
    client.connect().await.unwrap();
    let code = client
        .send_log(&vec![LogEntry::new("cat", "hi")])
        .await
        .unwrap();
    assert!(matches!(code, LogCode::TryLater));
}

#[tokio::test]
async fn get_mapping_without_provider_returns_empty() {
    let (addr, _handler, _tx) = spawn_server(LogCode::Ok).await;
    let mut client = TcpRpcClient::new(addr.ip().to_string(), addr.port(), RpcTimeouts::default());
    client.connect().await.unwrap();
    let mappings = client.get_mapping("cat").await.unwrap();
    assert!(mappings.is_empty());
}
