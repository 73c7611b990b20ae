use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::time::Duration;

use chatlist_model::{CredentialResolver, ProviderConfig, RequestOutcome};
use tokio::select;
use tokio::sync::{Semaphore, mpsc, oneshot, watch};
use tokio::task::AbortHandle;
use tracing::Instrument;

use super::unit::{self, UnitContext};
use crate::batch::{Batch, BatchId};
use crate::event::DispatchEvent;
use crate::executor_client::ExecutorClient;
use crate::options::DispatchOptions;

pub(crate) type EventSink = Arc<dyn Fn(DispatchEvent) + Send + Sync>;

pub(crate) enum Command {
    Submit {
        batch: Batch,
        configs: Vec<ProviderConfig>,
        options: DispatchOptions,
        waiter: oneshot::Sender<Batch>,
    },
    Record {
        batch_id: BatchId,
        outcome: RequestOutcome,
    },
    Cancel(BatchId),
    Snapshot(BatchId, oneshot::Sender<Batch>),
}

impl Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Submit { batch, .. } => {
                f.debug_tuple("Submit").field(&batch.id()).finish()
            }
            Command::Record { batch_id, outcome } => f
                .debug_struct("Record")
                .field("batch_id", batch_id)
                .field("provider_id", outcome.provider_id())
                .finish_non_exhaustive(),
            Command::Cancel(id) => f.debug_tuple("Cancel").field(id).finish(),
            Command::Snapshot(id, _) => {
                f.debug_tuple("Snapshot").field(id).finish()
            }
        }
    }
}

struct InFlight {
    batch: Batch,
    aborts: Vec<AbortHandle>,
    waiter: Option<oneshot::Sender<Batch>>,
}

impl InFlight {
    fn abort_all(&self) {
        for abort in &self.aborts {
            abort.abort();
        }
    }

    fn resolve(&mut self) {
        if let Some(waiter) = self.waiter.take() {
            // The handle may have been dropped already.
            waiter.send(self.batch.clone()).ok();
        }
    }
}

/// State owned by the dispatcher task. Every batch mutation happens here.
pub(crate) struct DispatcherState {
    executor: ExecutorClient,
    credentials: Arc<dyn CredentialResolver>,
    on_event: Option<EventSink>,
    reporter: mpsc::WeakUnboundedSender<Command>,
    batches: HashMap<BatchId, InFlight>,
}

impl DispatcherState {
    pub fn new(
        executor: ExecutorClient,
        credentials: Arc<dyn CredentialResolver>,
        on_event: Option<EventSink>,
        reporter: mpsc::WeakUnboundedSender<Command>,
    ) -> Self {
        Self {
            executor,
            credentials,
            on_event,
            reporter,
            batches: HashMap::new(),
        }
    }

    pub async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut kill_rx: watch::Receiver<bool>,
    ) {
        debug!("started");
        loop {
            let cmd = select! {
                biased;

                // Dropping every dispatcher clone closes the kill switch
                // without flipping it, which disables this branch.
                Ok(()) = kill_rx.changed() => {
                    break;
                }
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        break;
                    };
                    cmd
                }
            };
            trace!("received command: {cmd:?}");
            self.handle(cmd);
        }

        // Dropping the waiters tells every handle that the dispatcher is gone.
        cmd_rx.close();
        while let Ok(cmd) = cmd_rx.try_recv() {
            trace!("dropping unhandled command: {cmd:?}");
        }
        for (id, in_flight) in self.batches.drain() {
            debug!("dropping unfinished batch {id}");
            in_flight.abort_all();
        }
        debug!("will terminate");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Submit {
                batch,
                configs,
                options,
                waiter,
            } => self.launch(batch, configs, options, waiter),
            Command::Record { batch_id, outcome } => {
                self.record(batch_id, outcome)
            }
            Command::Cancel(batch_id) => self.cancel(batch_id),
            Command::Snapshot(batch_id, reply) => {
                if let Some(in_flight) = self.batches.get(&batch_id) {
                    reply.send(in_flight.batch.clone()).ok();
                }
            }
        }
    }

    fn launch(
        &mut self,
        mut batch: Batch,
        configs: Vec<ProviderConfig>,
        options: DispatchOptions,
        waiter: oneshot::Sender<Batch>,
    ) {
        let batch_id = batch.id();
        batch.start();
        info!(
            "batch {batch_id}: dispatching to {} provider(s)",
            configs.len()
        );

        let ctx = UnitContext {
            prompt: Arc::from(batch.prompt()),
            permits: options
                .max_concurrency()
                .map(|max| Arc::new(Semaphore::new(max))),
            options: Arc::new(options),
            executor: self.executor.clone(),
            credentials: Arc::clone(&self.credentials),
        };

        let mut aborts = Vec::with_capacity(configs.len());
        for config in configs {
            aborts.push(self.spawn_unit(batch_id, config, ctx.clone()));
        }

        self.batches.insert(
            batch_id,
            InFlight {
                batch,
                aborts,
                waiter: Some(waiter),
            },
        );
    }

    fn spawn_unit(
        &self,
        batch_id: BatchId,
        config: ProviderConfig,
        ctx: UnitContext,
    ) -> AbortHandle {
        let provider_id = config.id.clone();
        let provider_name = config.name.clone();
        let span =
            debug_span!("unit", batch = %batch_id, provider = %provider_id);
        let task = tokio::spawn(unit::run(config, ctx).instrument(span));
        let abort = task.abort_handle();

        // A panicking unit still owes its batch an outcome.
        let reporter = self.reporter.clone();
        tokio::spawn(async move {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(err) if err.is_cancelled() => return,
                Err(err) => RequestOutcome::failure(
                    provider_id,
                    provider_name,
                    format!("unit aborted: {err}"),
                    Duration::ZERO,
                ),
            };
            if let Some(reporter) = reporter.upgrade() {
                reporter.send(Command::Record { batch_id, outcome }).ok();
            }
        });
        abort
    }

    fn record(&mut self, batch_id: BatchId, outcome: RequestOutcome) {
        let Some(in_flight) = self.batches.get_mut(&batch_id) else {
            debug!(
                "discarding late outcome of {} for batch {batch_id}",
                outcome.provider_id()
            );
            return;
        };

        let provider_id = outcome.provider_id().clone();
        let completed = match in_flight.batch.record(outcome.clone()) {
            Ok(completed) => completed,
            Err(err) => {
                warn!("batch {batch_id}: {err}");
                return;
            }
        };
        self.emit(DispatchEvent::OutcomeRecorded {
            batch_id,
            provider_id,
            outcome,
        });

        if completed {
            if let Some(mut in_flight) = self.batches.remove(&batch_id) {
                info!(
                    "batch {batch_id} completed: {}",
                    in_flight.batch.summary().status()
                );
                self.emit(DispatchEvent::BatchCompleted(
                    in_flight.batch.clone(),
                ));
                in_flight.resolve();
            }
        }
    }

    fn cancel(&mut self, batch_id: BatchId) {
        let Some(mut in_flight) = self.batches.remove(&batch_id) else {
            trace!("batch {batch_id} is not in flight, nothing to cancel");
            return;
        };
        in_flight.abort_all();
        in_flight.batch.cancel();
        info!(
            "batch {batch_id} cancelled with {} outcome(s) recorded",
            in_flight.batch.recorded_count()
        );
        self.emit(DispatchEvent::BatchCancelled(in_flight.batch.clone()));
        in_flight.resolve();
    }

    fn emit(&self, event: DispatchEvent) {
        if let Some(on_event) = &self.on_event {
            on_event(event);
        }
    }
}
