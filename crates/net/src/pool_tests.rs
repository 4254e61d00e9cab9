use super::*;
use crate::client::FakeRpcClient;

fn fake() -> Box<dyn RpcClient> {
    Box::new(FakeRpcClient::new(vec![]))
}

#[test]
fn open_installs_a_fresh_entry_with_refcount_one() {
    let pool = ConnectionPool::new();
    pool.open("127.0.0.1:9090", fake());
    assert_eq!(pool.ref_count("127.0.0.1:9090"), 1);
    assert_eq!(pool.len(), 1);
}

#[test]
fn second_open_adopts_and_increments_refcount() {
    let pool = ConnectionPool::new();
    let a = pool.open("svc", fake());
    let b = pool.open("svc", fake());
    assert_eq!(pool.ref_count("svc"), 2);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn close_decrements_and_removes_at_zero() {
    let pool = ConnectionPool::new();
    pool.open("svc", fake());
    pool.open("svc", fake());
    pool.close("svc");
    assert_eq!(pool.ref_count("svc"), 1);
    pool.close("svc");
    assert_eq!(pool.ref_count("svc"), 0);
    assert!(pool.is_empty());
}

#[test]
fn close_on_unknown_key_is_a_no_op() {
    let pool = ConnectionPool::new();
    pool.close("nope");
    assert!(pool.is_empty());
}

#[test]
fn get_returns_none_for_unopened_key() {
    let pool = ConnectionPool::new();
    assert!(pool.get("nope").is_none());
}
