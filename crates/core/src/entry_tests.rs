use super::*;

#[test]
fn byte_len_counts_message_only() {
    let mut e = LogEntry::new("foo", b"hello".to_vec());
    e.metadata.insert("timestamp".to_string(), "123456".to_string());
    assert_eq!(e.byte_len(), 5);
}

#[test]
fn batch_byte_len_sums_entries() {
    let batch = vec![LogEntry::new("a", b"12".to_vec()), LogEntry::new("a", b"345".to_vec())];
    assert_eq!(batch_byte_len(&batch), 5);
}

#[test]
fn timestamp_roundtrip() {
    let mut e = LogEntry::new("a", b"x".to_vec());
    assert_eq!(e.timestamp_ms(), None);
    e.set_timestamp_ms(42);
    assert_eq!(e.timestamp_ms(), Some(42));
    assert_eq!(e.remove_timestamp(), Some("42".to_string()));
    assert_eq!(e.timestamp_ms(), None);
}

#[test]
fn malformed_timestamp_is_none() {
    let mut e = LogEntry::new("a", b"x".to_vec());
    e.metadata.insert("timestamp".to_string(), "not-a-number".to_string());
    assert_eq!(e.timestamp_ms(), None);
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn batch_byte_len_is_the_sum_of_message_lengths(messages in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..32)) {
            let expected: usize = messages.iter().map(|m| m.len()).sum();
            let batch: Batch = messages.into_iter().map(|m| LogEntry::new("c", m)).collect();
            prop_assert_eq!(batch_byte_len(&batch), expected);
        }

        #[test]
        fn byte_len_is_unaffected_by_metadata(message in proptest::collection::vec(any::<u8>(), 0..64), meta_value in "[a-z0-9]{0,16}") {
            let mut e = LogEntry::new("c", message.clone());
            e.metadata.insert("timestamp".to_string(), meta_value);
            prop_assert_eq!(e.byte_len(), message.len());
        }
    }
}
