use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
};

use crossbeam::channel::{self, Sender};
use log::{debug, error, warn};
use reqwest::{
    Url,
    blocking::{Client, Response},
    header::CONTENT_TYPE,
};
use serde_json::{Value, json};
use sluice_batch::Batch;

use crate::{
    ClientConfig, ClientFactory, Completion, PutTemplate, ResultHandler, TransportClient,
    TransportError, TransportResponse,
};

const NDJSON: &str = "application/x-ndjson";
const JSON: &str = "application/json";

/// Longest error body kept in a response message.
const MAX_ERROR_BODY: usize = 512;

/// Builds an [`HttpTransport`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpClientFactory;

impl ClientFactory for HttpClientFactory {
    fn build(&self, config: &ClientConfig) -> Result<Arc<dyn TransportClient>, TransportError> {
        Ok(Arc::new(HttpTransport::new(config)?))
    }
}

type Job = (Arc<Batch>, ResultHandler);

struct Endpoints {
    uris: Vec<String>,
    next: AtomicUsize,
}

impl Endpoints {
    /// Round-robin over the configured endpoints.
    fn pick(&self) -> &str {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.uris.len();
        &self.uris[i]
    }
}

struct HttpShared {
    client: Client,
    endpoints: Endpoints,
}

impl HttpShared {
    fn send_bulk(&self, batch: &Batch) -> Result<TransportResponse, TransportError> {
        let url = format!("{}/_bulk", self.endpoints.pick());
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, NDJSON)
            .body(render_bulk_body(batch))
            .send()?;

        read_response(response)
    }

    fn put_template(&self, action: &PutTemplate) -> Result<TransportResponse, TransportError> {
        let url = template_url(self.endpoints.pick(), &action.name)?;
        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, JSON)
            .body(action.source.clone())
            .send()?;

        read_response(response)
    }
}

/// `{endpoint}/_template/{name}` with `name` escaped as a single path
/// segment.
fn template_url(endpoint: &str, name: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(endpoint).map_err(|e| TransportError::Request(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| TransportError::Request(format!("{endpoint} cannot take a path")))?
        .pop_if_empty()
        .extend(["_template", name]);
    Ok(url)
}

fn read_response(response: Response) -> Result<TransportResponse, TransportError> {
    let status = response.status().as_u16();
    let body = response.text()?;
    Ok(parse_bulk_response(status, &body))
}

/// Transport over the indexing service's HTTP bulk API.
///
/// Batches are queued to a fixed pool of worker threads that share one
/// connection-pooled HTTP client; completion handlers run on those workers.
/// Dropping the transport lets queued batches finish before the workers are
/// joined.
pub struct HttpTransport {
    shared: Arc<HttpShared>,
    jobs: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        if config.discovery_enabled() {
            warn!("[http] node discovery is not supported, using configured endpoints only");
        }

        let mut builder = Client::builder()
            .user_agent(concat!("sluice/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(config.default_max_total_connection_per_route());
        if let Some(timeout) = config.conn_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.read_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let shared = Arc::new(HttpShared {
            client,
            endpoints: Endpoints {
                uris: config.server_uris().to_vec(),
                next: AtomicUsize::new(0),
            },
        });

        let (job_tx, job_rx) = channel::unbounded::<Job>();
        let num_workers = worker_count(config);
        let mut workers = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let shared = Arc::clone(&shared);
            let job_rx = job_rx.clone();

            let handle = thread::Builder::new()
                .name(format!("sluice-http-{worker_id}"))
                .spawn(move || {
                    while let Ok((batch, handler)) = job_rx.recv() {
                        run_job(&shared, batch, handler);
                    }
                })
                .map_err(|e| TransportError::Build(format!("failed to spawn worker: {e}")))?;
            workers.push(handle);
        }

        debug!(
            "[http] transport started with {} workers for {} endpoints",
            num_workers,
            shared.endpoints.uris.len()
        );

        Ok(Self {
            shared,
            jobs: Some(job_tx),
            workers,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

/// Workers are capped by both the total pool size and what the endpoints can
/// take per route.
fn worker_count(config: &ClientConfig) -> usize {
    let per_routes = config
        .default_max_total_connection_per_route()
        .saturating_mul(config.server_uris().len());
    config.max_total_connection().min(per_routes).max(1)
}

fn run_job(shared: &HttpShared, batch: Arc<Batch>, handler: ResultHandler) {
    let completion = match shared.send_bulk(&batch) {
        Ok(response) => Completion::Completed(response),
        Err(e) => Completion::Failed(e),
    };

    // Keep the worker alive if a handler panics.
    if panic::catch_unwind(AssertUnwindSafe(|| handler(completion))).is_err() {
        error!("[http] result handler panicked for batch {}", batch.id());
    }
}

impl TransportClient for HttpTransport {
    fn execute_async(&self, batch: Arc<Batch>, handler: ResultHandler) {
        let Some(jobs) = &self.jobs else {
            handler(Completion::Failed(TransportError::Closed));
            return;
        };

        if let Err(channel::SendError((_batch, handler))) = jobs.send((batch, handler)) {
            handler(Completion::Failed(TransportError::Closed));
        }
    }

    fn execute(&self, action: &PutTemplate) -> Result<TransportResponse, TransportError> {
        self.shared.put_template(action)
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        // Closing the queue ends each worker's loop once it is drained.
        self.jobs.take();

        let current = thread::current().id();
        for handle in self.workers.drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("[http] worker thread panicked");
            }
        }
    }
}

/// Newline-delimited bulk body: one action line and one source line per
/// record.
///
/// Sources are sent as given apart from trailing line breaks, so each must
/// be a single-line JSON document.
pub fn render_bulk_body(batch: &Batch) -> String {
    let mut body = String::with_capacity(batch.payload_bytes() + batch.len() * 32);

    for item in batch.iter() {
        let action = match item.index {
            Some(index) => json!({ "index": { "_index": index } }),
            None => json!({ "index": {} }),
        };
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(item.payload.trim_end_matches(['\r', '\n']));
        body.push('\n');
    }

    body
}

/// Interpret a response from the indexing service.
///
/// Bulk responses carry a top-level `errors` flag and per-item results;
/// other calls may return an `error` object. Non-JSON bodies only matter for
/// the message of a non-2xx status.
pub fn parse_bulk_response(status: u16, body: &str) -> TransportResponse {
    let mut response = TransportResponse::ok(status);
    let http_ok = (200..300).contains(&status);

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        if !http_ok && !body.trim().is_empty() {
            response.error_message = Some(truncate(body.trim(), MAX_ERROR_BODY).to_owned());
        }
        return response;
    };

    response.errors = value
        .get("errors")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let item_errors: Vec<&Value> = value
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_object()?.values().next()?.get("error"))
                .collect()
        })
        .unwrap_or_default();
    response.failed_items = item_errors.len();

    response.error_message = item_errors
        .first()
        .copied()
        .or_else(|| value.get("error"))
        .map(error_reason);

    response
}

fn error_reason(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        other => {
            let kind = other.get("type").and_then(Value::as_str);
            let reason = other.get("reason").and_then(Value::as_str);
            match (kind, reason) {
                (Some(k), Some(r)) => format!("{k}: {r}"),
                (None, Some(r)) => r.to_owned(),
                _ => truncate(&other.to_string(), MAX_ERROR_BODY).to_owned(),
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
