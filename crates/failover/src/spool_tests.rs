use super::*;
use std::{fs::OpenOptions, io::Write, sync::Arc, thread};
use tempfile::tempdir;

fn temp_spool() -> (SpoolFailoverPolicy, tempfile::TempDir) {
    let dir = tempdir().expect("create temp dir");
    let policy = SpoolFailoverPolicy::new(dir.path().join("nested").join("failover.spool"));
    (policy, dir)
}

#[test]
fn deliver_then_read_back_in_order() {
    let (policy, _dir) = temp_spool();

    let records = vec![
        Record::new("{\"msg\":\"R1\"}"),
        Record::routed("logs", "{\"msg\":\"R2\"}"),
    ];
    for r in &records {
        policy.deliver(r.clone());
    }

    assert_eq!(policy.written(), 2);
    assert_eq!(policy.lost(), 0);

    let contents = SpoolReader::new(policy.path()).read_all().expect("read spool");
    assert_eq!(contents.records, records);
    assert!(!contents.corrupt_tail);
}

#[test]
fn missing_spool_reads_empty() {
    let (policy, _dir) = temp_spool();
    let reader = SpoolReader::new(policy.path());

    assert_eq!(reader.count().expect("count"), 0);
    assert!(!reader.read_all().expect("read").corrupt_tail);
}

#[test]
fn torn_tail_is_skipped_and_flagged() {
    let (policy, _dir) = temp_spool();
    policy.deliver(Record::new("intact"));

    // Simulate a crash halfway through the next frame header.
    let mut file = OpenOptions::new()
        .append(true)
        .open(policy.path())
        .expect("open spool");
    file.write_all(&[0, 0, 0]).expect("write partial header");
    drop(file);

    let contents = SpoolReader::new(policy.path()).read_all().expect("read spool");
    assert_eq!(contents.records, vec![Record::new("intact")]);
    assert!(contents.corrupt_tail);
}

#[test]
fn appends_after_a_torn_tail_stay_readable() {
    let (policy, _dir) = temp_spool();
    policy.deliver(Record::new("before"));

    // A frame cut short by a crash: full header, payload missing.
    let mut file = OpenOptions::new()
        .append(true)
        .open(policy.path())
        .expect("open spool");
    file.write_all(&[0, 0, 0, 9, 1, 2, 3, 4, 5, 6, 7])
        .expect("write torn frame");
    drop(file);

    let restarted = SpoolFailoverPolicy::new(policy.path().to_path_buf());
    restarted.deliver(Record::new("after1"));
    restarted.deliver(Record::new("after2"));

    let contents = SpoolReader::new(policy.path()).read_all().expect("read spool");
    let payloads: Vec<&str> = contents.records.iter().map(Record::payload).collect();
    assert_eq!(
        payloads,
        ["before", "after1", "after2"],
        "torn bytes are cut before appending"
    );
    assert!(!contents.corrupt_tail);
    assert_eq!(restarted.written(), 2);
}

#[test]
fn corrupt_frame_is_cut_on_open() {
    let (policy, _dir) = temp_spool();
    policy.deliver(Record::new("good"));
    let intact = std::fs::metadata(policy.path()).expect("stat").len();

    // Header announcing 4 bytes with a checksum that cannot match.
    let mut file = OpenOptions::new()
        .append(true)
        .open(policy.path())
        .expect("open spool");
    file.write_all(&[0, 0, 0, 4, 0, 0, 0, 0, 1, 2, 3, 4])
        .expect("write corrupt frame");
    drop(file);

    let restarted = SpoolFailoverPolicy::new(policy.path().to_path_buf());
    restarted.deliver(Record::new("next"));

    let contents = SpoolReader::new(policy.path()).read_all().expect("read spool");
    assert_eq!(contents.records, vec![Record::new("good"), Record::new("next")]);
    assert!(
        std::fs::metadata(policy.path()).expect("stat").len() > intact,
        "new frame appended after the cut"
    );
}

#[test]
fn appends_survive_a_new_policy_instance() {
    let (policy, _dir) = temp_spool();
    policy.deliver(Record::new("first"));

    let reopened = SpoolFailoverPolicy::new(policy.path().to_path_buf());
    reopened.deliver(Record::new("second"));

    let payloads: Vec<String> = SpoolReader::new(policy.path())
        .read_all()
        .expect("read spool")
        .records
        .into_iter()
        .map(Record::into_payload)
        .collect();
    assert_eq!(payloads, vec!["first", "second"]);
}

#[test]
fn concurrent_deliveries_produce_intact_frames() {
    let (policy, _dir) = temp_spool();
    let policy = Arc::new(policy);

    thread::scope(|s| {
        for t in 0..4 {
            let policy = Arc::clone(&policy);
            s.spawn(move || {
                for i in 0..50 {
                    policy.deliver(Record::new(format!("{t}-{i}")));
                }
            });
        }
    });

    let contents = SpoolReader::new(policy.path()).read_all().expect("read spool");
    assert_eq!(contents.records.len(), 200);
    assert!(!contents.corrupt_tail);
}

#[test]
fn unwritable_path_counts_lost_records() {
    let dir = tempdir().expect("create temp dir");
    // A regular file where the spool's parent directory should be.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"x").expect("write blocker");

    let policy = SpoolFailoverPolicy::new(blocker.join("failover.spool"));
    policy.deliver(Record::new("lost"));

    assert_eq!(policy.written(), 0);
    assert_eq!(policy.lost(), 1);
}

#[test]
fn clear_spool_removes_file_and_tolerates_missing() {
    let (policy, _dir) = temp_spool();
    policy.deliver(Record::new("x"));
    assert!(policy.path().exists());

    clear_spool(policy.path()).expect("clear");
    assert!(!policy.path().exists());
    clear_spool(policy.path()).expect("clear again");
}
