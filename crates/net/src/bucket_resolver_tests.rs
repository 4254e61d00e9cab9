use super::*;
use crate::client::FakeRpcClient;
use crate::wire::BucketMapping;
use parking_lot::Mutex as SyncMutex;
use std::sync::Arc;

fn mapping(id: u32, host: &str, port: u16) -> BucketMapping {
    BucketMapping {
        bucket_id: id,
        host: host.to_string(),
        port,
    }
}

fn factory(calls: Arc<SyncMutex<u32>>, mappings: Vec<BucketMapping>) -> ClientFactory {
    Box::new(move |_host, _port| {
        *calls.lock() += 1;
        let mut client = FakeRpcClient::new(vec![]);
        client.mappings = mappings.clone();
        Box::new(client)
    })
}

#[tokio::test]
async fn first_lookup_refreshes_and_caches() {
    let calls = Arc::new(SyncMutex::new(0));
    let cache = BucketResolverCache::new(
        1000,
        RemoteEndpoint::Fixed {
            host: "resolver".into(),
            port: 9999,
        },
        factory(Arc::clone(&calls), vec![mapping(1, "h1", 100), mapping(2, "h2", 200)]),
    );

    let host = cache.get_host("cat", 1, 0, 0).await;
    assert_eq!(host, Some(("h1".to_string(), 100)));
    assert_eq!(*calls.lock(), 1);

    // Second lookup within TTL reuses the cache, no second refresh.
    let host2 = cache.get_host("cat", 2, 500, 0).await;
    assert_eq!(host2, Some(("h2".to_string(), 200)));
    assert_eq!(*calls.lock(), 1);
}

#[tokio::test]
async fn expired_ttl_triggers_a_refresh() {
    let calls = Arc::new(SyncMutex::new(0));
    let cache = BucketResolverCache::new(
        100,
        RemoteEndpoint::Fixed {
            host: "resolver".into(),
            port: 9999,
        },
        factory(Arc::clone(&calls), vec![mapping(1, "h1", 100)]),
    );

    cache.get_host("cat", 1, 0, 0).await;
    cache.get_host("cat", 1, 50, 0).await;
    assert_eq!(*calls.lock(), 1);
    cache.get_host("cat", 1, 200, 0).await;
    assert_eq!(*calls.lock(), 2);
}

#[tokio::test]
async fn unknown_bucket_id_is_none() {
    let calls = Arc::new(SyncMutex::new(0));
    let cache = BucketResolverCache::new(
        1000,
        RemoteEndpoint::Fixed {
            host: "resolver".into(),
            port: 9999,
        },
        factory(calls, vec![mapping(1, "h1", 100)]),
    );
    assert_eq!(cache.get_host("cat", 7, 0, 0).await, None);
}

#[tokio::test]
async fn service_list_picks_by_random_draw() {
    let list = RemoteEndpoint::ServiceList(vec![
        ("a".into(), 1),
        ("b".into(), 2),
        ("c".into(), 3),
    ]);
    assert_eq!(list.pick(0), Some(("a".to_string(), 1)));
    assert_eq!(list.pick(1), Some(("b".to_string(), 2)));
    assert_eq!(list.pick(5), Some(("c".to_string(), 3)));
}

#[tokio::test]
async fn empty_service_list_skips_refresh_and_leaves_cache_empty() {
    let calls = Arc::new(SyncMutex::new(0));
    let cache = BucketResolverCache::new(
        1000,
        RemoteEndpoint::ServiceList(vec![]),
        factory(calls, vec![]),
    );
    assert_eq!(cache.get_host("cat", 1, 0, 0).await, None);
}
