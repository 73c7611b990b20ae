use chatlist_core::{
    Batch, BatchHandle, DispatchEvent, DispatchOptions, Dispatcher,
    DispatcherBuilder, DispatcherClosed, SubmitError,
};
use chatlist_model::{
    CredentialResolver, ProviderConfig, RequestExecutor,
};
use chatlist_providers::HttpExecutor;

/// A comparison builder.
///
/// See [`Comparison`].
pub struct ComparisonBuilder {
    dispatcher_builder: DispatcherBuilder,
    options: DispatchOptions,
}

impl ComparisonBuilder {
    /// Creates a builder that talks to providers over HTTP and reads
    /// credentials from environment variables.
    #[inline]
    pub fn new() -> Self {
        Self::with_executor(HttpExecutor::default())
    }

    /// Creates a builder with a specified request executor.
    pub fn with_executor<E: RequestExecutor + 'static>(executor: E) -> Self {
        Self {
            dispatcher_builder: DispatcherBuilder::with_executor(executor),
            options: DispatchOptions::default(),
        }
    }

    /// Replaces the credential resolver.
    #[inline]
    pub fn with_credentials<C: CredentialResolver + 'static>(
        mut self,
        credentials: C,
    ) -> Self {
        self.dispatcher_builder =
            self.dispatcher_builder.with_credentials(credentials);
        self
    }

    /// Sets the options applied to every submission.
    #[inline]
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Attaches a callback to be invoked for every dispatch event.
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(DispatchEvent) + Send + Sync + 'static,
    ) -> Self {
        self.dispatcher_builder = self.dispatcher_builder.on_event(on_event);
        self
    }

    /// Builds a new comparison.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn build(self) -> Comparison {
        Comparison {
            dispatcher: self.dispatcher_builder.build(),
            options: self.options,
        }
    }
}

impl Default for ComparisonBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Errors of [`Comparison::compare`].
#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    /// The submission was rejected.
    #[error(transparent)]
    Submit(#[from] SubmitError),
    /// The dispatcher stopped before the batch finished.
    #[error(transparent)]
    Closed(#[from] DispatcherClosed),
}

/// Asks several providers the same question side by side.
///
/// The comparison is a thin wrapper around a [`Dispatcher`] that remembers
/// the options to submit with.
#[derive(Clone)]
pub struct Comparison {
    dispatcher: Dispatcher,
    options: DispatchOptions,
}

impl Comparison {
    /// Sends the prompt to every enabled provider and returns immediately.
    ///
    /// Progress is reported through the callback registered with
    /// [`ComparisonBuilder::on_event`].
    #[inline]
    pub fn submit(
        &self,
        prompt: &str,
        providers: &[ProviderConfig],
    ) -> Result<BatchHandle, SubmitError> {
        self.dispatcher.submit(prompt, providers, &self.options)
    }

    /// Sends the prompt to every enabled provider and waits for all of them.
    pub async fn compare(
        &self,
        prompt: &str,
        providers: &[ProviderConfig],
    ) -> Result<Batch, CompareError> {
        let batch = self.submit(prompt, providers)?.wait().await?;
        Ok(batch)
    }

    /// Returns the options submissions are made with.
    #[inline]
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Stops the underlying dispatcher.
    #[inline]
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }
}
