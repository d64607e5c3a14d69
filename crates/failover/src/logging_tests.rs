use super::*;

#[test]
fn preview_truncates_on_char_boundary() {
    let cases: &[(&str, usize, &str)] = &[
        ("hello", 10, "hello"),
        ("hello", 5, "hello"),
        ("hello", 3, "hel"),
        ("hello", 0, ""),
        // 'é' is two bytes; cutting inside it backs off to the boundary.
        ("héllo", 2, "h"),
        ("héllo", 3, "hé"),
        ("✓✓", 4, "✓"),
    ];

    for (input, max, expected) in cases {
        let got = preview(input, *max);
        assert_eq!(
            got, *expected,
            "preview({:?}, {}) should be {:?}, got {:?}",
            input, max, expected, got
        );
    }
}

#[test]
fn deliver_counts_every_record() {
    let policy = LoggingFailoverPolicy::new(4);

    policy.deliver(Record::new("short"));
    policy.deliver(Record::routed("logs", "a much longer payload"));
    policy.deliver(Record::new(""));

    assert_eq!(policy.logged(), 3);
}
