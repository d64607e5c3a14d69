use super::*;
use crate::BatchBuilder;

fn seal(records: &[Record]) -> Batch {
    let mut builder = BatchBuilder::with_capacity(records.len().max(1));
    for r in records {
        builder.add(r.clone()).expect("add");
    }
    builder.seal().expect("seal")
}

#[test]
fn items_round_trip_builder_input() {
    let cases: Vec<Vec<Record>> = vec![
        vec![],
        vec![Record::new("R1")],
        vec![Record::new("R1"), Record::new("R2")],
        vec![
            Record::routed("logs-a", "{\"msg\":\"one\"}"),
            Record::new("{\"msg\":\"two\"}"),
            Record::routed("logs-b", "{\"msg\":\"three\"}"),
            Record::routed("logs-a", "{\"msg\":\"four\"}"),
        ],
        // Duplicates must survive as separate occurrences.
        vec![Record::new("dup"), Record::new("dup"), Record::new("")],
        vec![Record::routed("métriques", "ünïcödé ✓"), Record::new("x")],
    ];

    for input in cases {
        let batch = seal(&input);
        let items = BulkIntrospector.items(&batch);
        assert_eq!(items, input, "round trip mismatch for {:?}", input);
    }
}

#[test]
fn items_is_repeatable() {
    let batch = seal(&[Record::new("a"), Record::routed("i", "b")]);

    let first = BulkIntrospector.items(&batch);
    let second = BulkIntrospector.items(&batch);
    assert_eq!(first, second);
}

#[test]
fn items_round_trip_large_batch() {
    let input: Vec<Record> = (0..500)
        .map(|i| {
            if i % 3 == 0 {
                Record::routed(format!("index-{}", i % 7), format!("doc-{i}"))
            } else {
                Record::new(format!("doc-{i}"))
            }
        })
        .collect();

    let batch = seal(&input);
    assert_eq!(BulkIntrospector.items(&batch), input);
}
