use super::*;

#[test]
fn category_counter_aggregates_known_suffix() {
    let m = InMemoryMetrics::new();
    m.category_counter("foo", "in", 3);
    assert_eq!(m.counter_value("foo.in"), 3);
    assert_eq!(m.counter_value("scribe_overall.in"), 3);
}

#[test]
fn category_counter_does_not_aggregate_unknown_suffix() {
    let m = InMemoryMetrics::new();
    m.category_counter("foo", "primary_err", 1);
    assert_eq!(m.counter_value("foo.primary_err"), 1);
    assert_eq!(m.counter_value("scribe_overall.primary_err"), 0);
}

#[test]
fn counters_accumulate() {
    let m = InMemoryMetrics::new();
    m.counter("x", 1);
    m.counter("x", 2);
    assert_eq!(m.counter_value("x"), 3);
}

#[test]
fn null_metrics_is_inert() {
    let m = NullMetrics;
    m.counter("x", 1);
    m.stat("y", 2);
    m.histogram("z", 3);
}
