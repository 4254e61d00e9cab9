use super::*;

#[test]
fn loads_and_parses_a_real_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("scribe.conf");
    std::fs::write(&path, "port = 1464\n<store>\ntype=null\n</store>\n").expect("write");

    let root = load_file(&path).expect("load");
    assert_eq!(root.own_string("port"), Some("1464"));
    assert_eq!(root.all_stores().len(), 1);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_file("/nonexistent/path/scribe.conf").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
