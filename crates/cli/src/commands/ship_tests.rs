use super::*;
use crate::commands::ClientArgs;
use sluice_batch::Batch;
use sluice_dispatch::{
    ClientConfig, ClientFactory, Completion, PutTemplate, ResultHandler, TransportClient,
    TransportError, TransportResponse,
};
use sluice_failover::SpoolReader;
use std::{
    io::Cursor,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Accepts every batch, or refuses every batch when `refuse` is set.
struct InlineTransport {
    refuse: bool,
    batches: AtomicUsize,
}

impl TransportClient for InlineTransport {
    fn execute_async(&self, _batch: Arc<Batch>, handler: ResultHandler) {
        self.batches.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            handler(Completion::Failed(TransportError::Connect(
                "connection refused".into(),
            )));
        } else {
            handler(Completion::Completed(TransportResponse::ok(200)));
        }
    }

    fn execute(&self, _action: &PutTemplate) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse::ok(200))
    }
}

struct InlineFactory(Arc<InlineTransport>);

impl ClientFactory for InlineFactory {
    fn build(&self, _config: &ClientConfig) -> Result<Arc<dyn TransportClient>, TransportError> {
        Ok(self.0.clone())
    }
}

fn inline_dispatcher(refuse: bool, batch_size: usize) -> (Dispatcher, Arc<InlineTransport>) {
    let transport = Arc::new(InlineTransport {
        refuse,
        batches: AtomicUsize::new(0),
    });
    let config = ClientArgs {
        server_uris: "http://localhost:9200".into(),
        conn_timeout_ms: None,
        read_timeout_ms: None,
        max_total_connection: 40,
        max_connection_per_route: 4,
        discovery: false,
    }
    .to_config()
    .expect("valid config");

    let dispatcher = Dispatcher::new(config, Arc::new(InlineFactory(transport.clone())))
        .with_batch_settings(BatchSettings::new(batch_size));
    (dispatcher, transport)
}

#[test]
fn read_records_skips_blank_lines_and_routes() {
    let input = "{\"a\":1}\n\n   \n{\"b\":2}\r\n";

    let cases: &[(Option<&str>, Option<&str>)] = &[(None, None), (Some("logs"), Some("logs"))];

    for (index, expected_index) in cases {
        let records: Vec<Record> = read_records(Cursor::new(input), *index)
            .collect::<io::Result<_>>()
            .expect("read records");

        assert_eq!(records.len(), 2, "blank lines are skipped");
        assert_eq!(records[0].payload(), "{\"a\":1}");
        assert_eq!(records[1].payload(), "{\"b\":2}");
        assert!(
            records.iter().all(|r| r.index() == *expected_index),
            "index routing for {:?}",
            index
        );
    }
}

#[test]
fn zero_interval_disables_the_ticker() {
    assert_eq!(delivery_interval(0), None);
    assert_eq!(delivery_interval(250), Some(Duration::from_millis(250)));
}

#[test]
fn deliver_reports_totals_when_everything_lands() {
    let (dispatcher, transport) = inline_dispatcher(false, 3);
    let failover = Failover::new(FailoverKind::Noop, None);

    let records = (0..7).map(|i| Ok(Record::new(format!("{{\"n\":{i}}}"))));
    let summary = deliver(dispatcher, &failover, None, records).expect("deliver");

    assert_eq!(
        summary,
        ShipSummary {
            records: 7,
            batches: 3,
            failed: 0
        }
    );
    assert_eq!(transport.batches.load(Ordering::SeqCst), 3);
    assert_eq!(summary.status(), 0);
}

#[test]
fn deliver_spools_records_the_cluster_refused() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let spool_path = dir.path().join("failover.spool");

    let (dispatcher, _transport) = inline_dispatcher(true, 2);
    let failover = Failover::new(FailoverKind::Spool, Some(spool_path.clone()));

    let records = ["{\"a\":1}", "{\"b\":2}", "{\"c\":3}"]
        .into_iter()
        .map(|p| Ok(Record::routed("logs", p)));
    let summary = deliver(dispatcher, &failover, None, records).expect("deliver");

    assert_eq!(summary.failed, 3);
    assert_eq!(summary.status(), 1);

    let spooled = SpoolReader::new(&spool_path).read_all().expect("read spool");
    let payloads: Vec<&str> = spooled.records.iter().map(|r| r.payload()).collect();
    assert_eq!(payloads, ["{\"a\":1}", "{\"b\":2}", "{\"c\":3}"]);
    assert!(spooled.records.iter().all(|r| r.index() == Some("logs")));
}

#[test]
fn deliver_stops_at_read_errors_but_ships_what_came_before() {
    let (dispatcher, transport) = inline_dispatcher(false, 10);
    let failover = Failover::new(FailoverKind::Noop, None);

    let records = vec![
        Ok(Record::new("{}")),
        Err(io::Error::new(io::ErrorKind::InvalidData, "bad utf-8")),
        Ok(Record::new("{}")),
    ];
    let err = deliver(dispatcher, &failover, None, records.into_iter())
        .expect_err("read error surfaces");

    assert!(format!("{err:#}").contains("bad utf-8"));
    assert_eq!(
        transport.batches.load(Ordering::SeqCst),
        1,
        "records read before the error are flushed"
    );
}
