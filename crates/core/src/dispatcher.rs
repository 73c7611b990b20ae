mod state;
mod unit;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chatlist_model::{
    CredentialResolver, EnvCredentialResolver, ProviderConfig,
    RequestExecutor,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::Instrument;

use crate::batch::{Batch, BatchId};
use crate::event::DispatchEvent;
use crate::executor_client::ExecutorClient;
use crate::options::DispatchOptions;
use state::{Command, DispatcherState, EventSink};

/// The dispatcher task is no longer running.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("dispatcher has shut down")]
pub struct DispatcherClosed;

/// Reasons a submission is rejected before any request is made.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The prompt is empty or only whitespace.
    #[error("prompt required")]
    PromptRequired,
    /// No enabled provider was given.
    #[error("no providers selected")]
    NoProvidersSelected,
    /// The dispatcher task is gone.
    #[error(transparent)]
    Closed(#[from] DispatcherClosed),
}

/// [`Dispatcher`] builder.
pub struct DispatcherBuilder {
    executor: ExecutorClient,
    credentials: Arc<dyn CredentialResolver>,
    on_event: Option<EventSink>,
}

impl DispatcherBuilder {
    /// Creates a new builder with the specified request executor.
    ///
    /// Credentials are read from environment variables unless
    /// [`DispatcherBuilder::with_credentials`] is called.
    #[inline]
    pub fn with_executor<E: RequestExecutor + 'static>(executor: E) -> Self {
        Self {
            executor: ExecutorClient::new(executor),
            credentials: Arc::new(EnvCredentialResolver),
            on_event: None,
        }
    }

    /// Replaces the credential resolver.
    #[inline]
    pub fn with_credentials<C: CredentialResolver + 'static>(
        mut self,
        credentials: C,
    ) -> Self {
        self.credentials = Arc::new(credentials);
        self
    }

    /// Attaches a callback to be invoked for every dispatch event.
    ///
    /// The callback runs on the dispatcher task and should return quickly.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(DispatchEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Arc::new(on_event));
        self
    }

    /// Builds the dispatcher and spawns its task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn build(self) -> Dispatcher {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (kill_tx, kill_rx) = watch::channel(false);
        let state = DispatcherState::new(
            self.executor,
            self.credentials,
            self.on_event,
            cmd_tx.downgrade(),
        );
        tokio::spawn(
            state
                .run(cmd_rx, kill_rx)
                .instrument(debug_span!("dispatcher")),
        );
        Dispatcher {
            cmd_tx,
            kill_tx: Arc::new(kill_tx),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

/// Fans a prompt out to many providers at once and collects the outcomes
/// into batches.
///
/// The dispatcher owns a background task holding all batch state. Every
/// provider call runs on its own task and reports back to it, so a slow or
/// failing provider never holds up the others. Cloning is cheap and clones
/// drive the same task.
#[derive(Clone)]
pub struct Dispatcher {
    cmd_tx: mpsc::UnboundedSender<Command>,
    kill_tx: Arc<watch::Sender<bool>>,
    next_id: Arc<AtomicU64>,
}

impl Dispatcher {
    /// Submits a prompt to every enabled provider in `configs`.
    ///
    /// Disabled configs are skipped, and a provider id appearing more than
    /// once is only dispatched for its first occurrence. The configs are
    /// copied, so later changes don't affect the batch.
    pub fn submit(
        &self,
        prompt: &str,
        configs: &[ProviderConfig],
        options: &DispatchOptions,
    ) -> Result<BatchHandle, SubmitError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SubmitError::PromptRequired);
        }

        let mut seen = HashSet::new();
        let configs: Vec<ProviderConfig> = configs
            .iter()
            .filter(|config| config.enabled)
            .filter(|config| seen.insert(config.id.clone()))
            .cloned()
            .collect();
        if configs.is_empty() {
            return Err(SubmitError::NoProvidersSelected);
        }

        let provider_count = configs.len();
        let id = BatchId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let providers = configs.iter().map(|c| c.id.clone()).collect();
        let batch = Batch::new(id, prompt.to_owned(), providers);

        let (waiter, done) = oneshot::channel();
        self.cmd_tx
            .send(Command::Submit {
                batch,
                configs,
                options: options.clone(),
                waiter,
            })
            .map_err(|_| DispatcherClosed)?;

        Ok(BatchHandle {
            id,
            provider_count,
            cmd_tx: self.cmd_tx.clone(),
            done,
        })
    }

    /// Stops the dispatcher task and aborts every unfinished batch.
    ///
    /// Handles of unfinished batches resolve to [`DispatcherClosed`].
    #[inline]
    pub fn shutdown(&self) {
        self.kill_tx.send(true).ok();
    }
}

/// A handle to a submitted batch.
#[derive(Debug)]
pub struct BatchHandle {
    id: BatchId,
    provider_count: usize,
    cmd_tx: mpsc::UnboundedSender<Command>,
    done: oneshot::Receiver<Batch>,
}

impl BatchHandle {
    /// Returns the batch id.
    #[inline]
    pub fn id(&self) -> BatchId {
        self.id
    }

    /// Returns how many providers the batch was dispatched to, after
    /// disabled and repeated ids were dropped.
    #[inline]
    pub fn provider_count(&self) -> usize {
        self.provider_count
    }

    /// Cancels the batch.
    ///
    /// Outstanding provider calls are aborted, and outcomes arriving later
    /// are discarded. Does nothing if the batch is already complete.
    #[inline]
    pub fn cancel(&self) {
        self.cmd_tx.send(Command::Cancel(self.id)).ok();
    }

    /// Returns a copy of the batch as it is now, or `None` if the batch is
    /// no longer in flight.
    pub async fn snapshot(&self) -> Option<Batch> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(Command::Snapshot(self.id, tx)).ok()?;
        rx.await.ok()
    }

    /// Waits until the batch completes or is cancelled.
    pub async fn wait(self) -> Result<Batch, DispatcherClosed> {
        self.done.await.map_err(|_| DispatcherClosed)
    }
}
