use super::*;
use crate::grammar::parse_text;

#[test]
fn defaults_when_unset() {
    let root = parse_text("").build();
    let global = GlobalConfig::from_root(&root);
    assert_eq!(global, GlobalConfig::default());
}

#[test]
fn reads_overrides() {
    let text = "
port = 1464
max_msg_per_second = 250000
max_queue_size = 10000000
check_interval = 10
num_thrift_server_threads = 8
max_conn = 100
max_concurrent_request = 50
new_thread_per_category = no
timestamp_sample_rate = 0.5
";
    let root = parse_text(text).build();
    let global = GlobalConfig::from_root(&root);
    assert_eq!(global.port, 1464);
    assert_eq!(global.max_msg_per_second, 250_000);
    assert_eq!(global.max_queue_size, 10_000_000);
    assert_eq!(global.check_period_secs, 10);
    assert_eq!(global.num_thrift_server_threads, 8);
    assert_eq!(global.max_conn, 100);
    assert_eq!(global.max_concurrent_request, 50);
    assert!(!global.new_thread_per_category);
    assert_eq!(global.timestamp_sample_rate, 0.5);
}

#[test]
fn unparsable_values_fall_back_to_default() {
    let root = parse_text("port = not-a-number\n").build();
    let global = GlobalConfig::from_root(&root);
    assert_eq!(global.port, GlobalConfig::default().port);
}
