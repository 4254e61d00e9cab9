use super::*;
use scribe_core::entry::LogEntry;

fn batch_of(n: usize) -> Batch {
    (0..n).map(|i| LogEntry::new("cat", format!("m-{i}"))).collect()
}

#[tokio::test]
async fn fake_client_requires_connect() {
    let mut client = FakeRpcClient::new(vec![Ok(LogCode::Ok)]);
    let err = client.send_log(&batch_of(1)).await.unwrap_err();
    assert!(matches!(err, RpcError::NotConnected));
}

#[tokio::test]
async fn fake_client_replays_script_in_order() {
    let mut client = FakeRpcClient::new(vec![Ok(LogCode::Ok), Ok(LogCode::TryLater)]);
    client.connect().await.unwrap();
    assert!(matches!(client.send_log(&batch_of(1)).await, Ok(LogCode::Ok)));
    assert!(matches!(
        client.send_log(&batch_of(1)).await,
        Ok(LogCode::TryLater)
    ));
    assert_eq!(client.sent.len(), 2);
}

#[tokio::test]
async fn always_unreachable_fails_connect() {
    let mut client = FakeRpcClient::always_unreachable();
    assert!(client.connect().await.is_err());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn transport_failure_disconnects_fake_client() {
    let mut client = FakeRpcClient::new(vec![Err(())]);
    client.connect().await.unwrap();
    assert!(client.send_log(&batch_of(1)).await.is_err());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn real_tcp_client_connect_refused() {
    // Port 1 is reserved and unreachable on every platform CI runs on.
    let mut client = TcpRpcClient::new("127.0.0.1", 1, RpcTimeouts::default());
    assert!(client.connect().await.is_err());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn real_tcp_client_roundtrip_against_loopback_server() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await.unwrap();
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await.unwrap();
        let resp = wire::encode_response(&RpcResponse::Log(LogCode::Ok)).unwrap();
        stream
            .write_all(&(resp.len() as u32).to_be_bytes())
            .await
            .unwrap();
        stream.write_all(&resp).await.unwrap();
    });

    let mut client = TcpRpcClient::new(
        addr.ip().to_string(),
        addr.port(),
        RpcTimeouts::default(),
    );
    client.connect().await.unwrap();
    let code = client.send_log(&batch_of(2)).await.unwrap();
    assert!(matches!(code, LogCode::Ok));
}
