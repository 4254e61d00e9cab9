use super::*;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new(1000);
    assert_eq!(clock.monotonic_ms(), 1000);
    clock.advance(500);
    assert_eq!(clock.monotonic_ms(), 1500);
    clock.set(0);
    assert_eq!(clock.monotonic_ms(), 0);
}

#[test]
fn calendar_known_epoch() {
    // 2021-01-02 03:04:00 UTC
    let epoch_ms: u64 = 1_609_556_640_000;
    let cal = calendar_from_epoch_ms(epoch_ms);
    assert_eq!(cal.year, 2021);
    assert_eq!(cal.month, 1);
    assert_eq!(cal.day, 2);
    assert_eq!(cal.hour, 3);
    assert_eq!(cal.minute, 4);
}

#[test]
fn calendar_epoch_zero_is_1970_01_01() {
    let cal = calendar_from_epoch_ms(0);
    assert_eq!((cal.year, cal.month, cal.day), (1970, 1, 1));
}
