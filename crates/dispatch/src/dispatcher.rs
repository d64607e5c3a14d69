use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, OnceLock, PoisonError},
    time::Duration,
};

use log::{debug, error, info, warn};
use sluice_batch::{
    Batch, BatchEmitter, BatchListener, BatchOperations, BatchSettings, BatchState,
    BulkIntrospector, BulkOperations, ItemIntrospector,
};
use sluice_failover::FailoverPolicy;
use sluice_protocol::IndexTemplate;

use crate::{
    BatchFailure, ClientConfig, ClientFactory, Completion, DispatchError, HttpClientFactory,
    PutTemplate, ResultHandler, TransportClient,
};

/// Hands every record of a failed batch to the failover policy. Always
/// returns true.
pub type FailureHandler = Arc<dyn Fn(&Batch) -> bool + Send + Sync>;

/// Owns the transport client and wires batches, completions and failover
/// together.
pub struct Dispatcher {
    config: ClientConfig,
    factory: Arc<dyn ClientFactory>,
    batch_settings: BatchSettings,
    introspector: Arc<dyn ItemIntrospector>,
    client: OnceLock<Arc<dyn TransportClient>>,
    client_init: Mutex<()>,
}

impl Dispatcher {
    pub fn new(config: ClientConfig, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            config,
            factory,
            batch_settings: BatchSettings::default(),
            introspector: Arc::new(BulkIntrospector),
            client: OnceLock::new(),
            client_init: Mutex::new(()),
        }
    }

    /// Dispatcher backed by [`crate::HttpTransport`].
    pub fn http(config: ClientConfig) -> Self {
        Self::new(config, Arc::new(HttpClientFactory))
    }

    pub fn with_batch_settings(mut self, settings: BatchSettings) -> Self {
        self.batch_settings = settings;
        self
    }

    pub fn with_introspector(mut self, introspector: Arc<dyn ItemIntrospector>) -> Self {
        self.introspector = introspector;
        self
    }

    /// Copy of the configured endpoints; changing it does not affect the
    /// dispatcher.
    pub fn server_list(&self) -> Vec<String> {
        self.config.server_uris().to_vec()
    }

    /// The transport client, built on first use and shared afterwards.
    ///
    /// A failed build is not cached, the next call tries again.
    pub fn create_client(&self) -> Result<Arc<dyn TransportClient>, DispatchError> {
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }

        let _guard = self
            .client_init
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Another caller may have finished while we waited for the lock.
        if let Some(client) = self.client.get() {
            return Ok(Arc::clone(client));
        }

        let client = self
            .factory
            .build(&self.config)
            .map_err(DispatchError::ClientInit)?;

        info!(
            "[dispatch] transport client created for {}",
            self.config.server_uris().join(", ")
        );

        Ok(Arc::clone(self.client.get_or_init(|| client)))
    }

    /// Entry point for sealed batches: submits each one asynchronously and
    /// routes failures to `failover`.
    pub fn create_batch_listener(
        &self,
        failover: Arc<dyn FailoverPolicy>,
    ) -> Result<BatchListener, DispatchError> {
        let failure_handler = self.create_failure_handler(failover);
        let client = self.create_client()?;

        Ok(Arc::new(move |batch: Batch| {
            let batch = Arc::new(batch);
            batch.transition(BatchState::Dispatched);
            debug!(
                "[dispatch] submitting batch {} with {} records",
                batch.id(),
                batch.len()
            );

            let handler = create_result_handler(Arc::clone(&batch), Arc::clone(&failure_handler));
            client.execute_async(batch, handler);
            true
        }))
    }

    /// Every item of the batch goes to `failover`, whichever items actually
    /// failed upstream.
    pub fn create_failure_handler(&self, failover: Arc<dyn FailoverPolicy>) -> FailureHandler {
        let introspector = Arc::clone(&self.introspector);

        Arc::new(move |batch: &Batch| {
            for item in introspector.items(batch) {
                let delivered = panic::catch_unwind(AssertUnwindSafe(|| failover.deliver(item)));
                if delivered.is_err() {
                    error!(
                        "[dispatch] failover policy panicked on a record of batch {}",
                        batch.id()
                    );
                }
            }
            true
        })
    }

    pub fn create_batch_operations(&self) -> Arc<dyn BatchOperations> {
        Arc::new(BulkOperations::new(self.batch_settings))
    }

    /// Emitter feeding this dispatcher, optionally flushing partial batches
    /// every `delivery_interval`.
    pub fn create_emitter(
        &self,
        failover: Arc<dyn FailoverPolicy>,
        delivery_interval: Option<Duration>,
    ) -> Result<BatchEmitter, DispatchError> {
        let listener = self.create_batch_listener(failover)?;
        let operations = self.create_batch_operations();

        match delivery_interval {
            Some(interval) => Ok(BatchEmitter::with_delivery_interval(
                operations, listener, interval,
            )?),
            None => Ok(BatchEmitter::new(operations, listener)),
        }
    }

    /// Install an index template. Failures are logged, never returned.
    pub fn execute(&self, template: &IndexTemplate) {
        let client = match self.create_client() {
            Ok(client) => client,
            Err(e) => {
                error!("Unable to add index template {}: {e}", template.name());
                return;
            }
        };

        match client.execute(&PutTemplate::from(template)) {
            Ok(response) if response.is_succeeded() => {
                info!("[dispatch] index template {} installed", template.name());
            }
            Ok(response) => {
                error!(
                    "Unable to add index template {}. {response}",
                    template.name()
                );
            }
            Err(e) => {
                error!("Unable to add index template {}: {e}", template.name());
            }
        }
    }
}

/// Completion handler for one dispatched batch.
///
/// A succeeded response ends the batch. A response that is not succeeded and
/// a transport error both run `failure_handler` on the whole batch.
pub fn create_result_handler(batch: Arc<Batch>, failure_handler: FailureHandler) -> ResultHandler {
    Box::new(move |completion| {
        let failure = match completion {
            Completion::Completed(response) if response.is_succeeded() => {
                batch.transition(BatchState::Succeeded);
                debug!("[dispatch] batch {} indexed", batch.id());
                return;
            }
            Completion::Completed(response) => {
                batch.transition(response.batch_state(batch.len()));
                BatchFailure::Rejected(response)
            }
            Completion::Failed(err) => {
                batch.transition(BatchState::Failed);
                BatchFailure::Transport(err)
            }
        };

        warn!(
            "[dispatch] batch {} with {} records failed, handing records to failover: {failure}",
            batch.id(),
            batch.len()
        );
        failure_handler(&batch);
    })
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
