//! Batches and their aggregate state.

use std::collections::HashMap;
use std::fmt::{self, Display};

use chatlist_model::{ProviderId, RequestOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Identity of a batch, unique within one dispatcher.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
)]
pub struct BatchId(pub(crate) u64);

impl BatchId {
    /// Returns the numeric value.
    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum BatchState {
    /// Allocated, nothing launched yet.
    #[default]
    Created,
    /// Units are running.
    InFlight,
    /// Every provider has an outcome.
    Completed,
    /// The caller stopped waiting; some providers may lack an outcome.
    Cancelled,
}

/// An error returned when an outcome cannot be recorded.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The provider was not part of the batch.
    #[error("provider {0} is not part of this batch")]
    UnknownProvider(ProviderId),
    /// The provider's slot is already filled.
    #[error("provider {0} already has an outcome")]
    AlreadyRecorded(ProviderId),
    /// The batch doesn't accept outcomes in its current state.
    #[error("batch is {0:?}, not in flight")]
    NotInFlight(BatchState),
}

/// The outcomes launched together for one prompt submission.
///
/// The set of providers is fixed at creation. Each provider's slot goes from
/// empty to filled exactly once, and the batch becomes terminal once every
/// slot is filled or it has been cancelled.
#[derive(Clone, Debug)]
pub struct Batch {
    id: BatchId,
    prompt: String,
    submitted_at: DateTime<Utc>,
    providers: Vec<ProviderId>,
    slots: HashMap<ProviderId, Option<RequestOutcome>>,
    recorded: usize,
    state: BatchState,
}

impl Batch {
    /// Creates a batch over distinct providers.
    pub(crate) fn new(
        id: BatchId,
        prompt: String,
        providers: Vec<ProviderId>,
    ) -> Self {
        let slots = providers.iter().map(|id| (id.clone(), None)).collect();
        Self {
            id,
            prompt,
            submitted_at: Utc::now(),
            providers,
            slots,
            recorded: 0,
            state: BatchState::Created,
        }
    }

    /// Returns the batch id.
    #[inline]
    pub fn id(&self) -> BatchId {
        self.id
    }

    /// Returns the submitted prompt.
    #[inline]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns when the batch was submitted.
    #[inline]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Returns the providers in submission order.
    #[inline]
    pub fn providers(&self) -> &[ProviderId] {
        &self.providers
    }

    /// Returns the current state.
    #[inline]
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Returns `true` once the batch can no longer change.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, BatchState::Completed | BatchState::Cancelled)
    }

    /// Returns the outcome recorded for a provider, if any.
    pub fn outcome(&self, provider: &ProviderId) -> Option<&RequestOutcome> {
        self.slots.get(provider).and_then(Option::as_ref)
    }

    /// Iterates over recorded outcomes in submission order.
    pub fn outcomes(&self) -> impl Iterator<Item = &RequestOutcome> {
        self.providers.iter().filter_map(|id| self.outcome(id))
    }

    /// Iterates over providers still lacking an outcome.
    pub fn pending(&self) -> impl Iterator<Item = &ProviderId> {
        self.providers
            .iter()
            .filter(|id| self.outcome(id).is_none())
    }

    /// Returns the number of recorded outcomes.
    #[inline]
    pub fn recorded_count(&self) -> usize {
        self.recorded
    }

    pub(crate) fn start(&mut self) {
        if self.state == BatchState::Created {
            self.state = BatchState::InFlight;
        }
    }

    /// Fills the outcome's slot. Returns `true` if this completed the batch.
    pub(crate) fn record(
        &mut self,
        outcome: RequestOutcome,
    ) -> Result<bool, RecordError> {
        if self.state != BatchState::InFlight {
            return Err(RecordError::NotInFlight(self.state));
        }
        let provider = outcome.provider_id().clone();
        let Some(slot) = self.slots.get_mut(&provider) else {
            return Err(RecordError::UnknownProvider(provider));
        };
        if slot.is_some() {
            return Err(RecordError::AlreadyRecorded(provider));
        }
        *slot = Some(outcome);
        self.recorded += 1;

        if self.recorded == self.providers.len() {
            self.state = BatchState::Completed;
            return Ok(true);
        }
        Ok(false)
    }

    pub(crate) fn cancel(&mut self) {
        if !self.is_terminal() {
            self.state = BatchState::Cancelled;
        }
    }

    /// Counts outcomes by success.
    pub fn summary(&self) -> BatchSummary {
        let succeeded = self.outcomes().filter(|o| o.is_success()).count();
        BatchSummary {
            succeeded,
            failed: self.recorded - succeeded,
            total: self.providers.len(),
        }
    }

    /// Builds the record a persistence collaborator stores for one provider.
    ///
    /// Returns `None` if the provider has no outcome.
    pub fn result_record(
        &self,
        provider: &ProviderId,
        prompt_id: impl Into<String>,
    ) -> Option<ResultRecord> {
        let outcome = self.outcome(provider)?;

        let mut metadata = Map::new();
        metadata.insert("success".to_owned(), outcome.is_success().into());
        if let Some(tokens) = outcome.tokens_used() {
            metadata.insert("tokens_used".to_owned(), tokens.into());
        }
        let secs = (outcome.duration().as_secs_f64() * 100.0).round() / 100.0;
        metadata.insert("response_time".to_owned(), secs.into());
        if let Some(model) = outcome.model_used() {
            metadata.insert("model_used".to_owned(), model.into());
        }
        if let Some(error) = outcome.error() {
            metadata.insert("error".to_owned(), error.into());
        }

        Some(ResultRecord {
            prompt_id: prompt_id.into(),
            provider_id: provider.clone(),
            response_text: outcome.display_text().to_owned(),
            metadata: Value::Object(metadata),
            saved_at: Utc::now(),
        })
    }
}

/// Success and failure counts of a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BatchSummary {
    /// Outcomes that succeeded.
    pub succeeded: usize,
    /// Outcomes that failed.
    pub failed: usize,
    /// Providers in the batch.
    pub total: usize,
}

impl BatchSummary {
    /// Providers without an outcome, non-zero only for cancelled batches.
    #[inline]
    pub fn pending(&self) -> usize {
        self.total - self.succeeded - self.failed
    }

    /// Returns a one-line status suitable for reporting.
    pub fn status(&self) -> String {
        let pending = self.pending();
        if pending > 0 {
            return format!(
                "{} succeeded, {} failed, {pending} cancelled",
                self.succeeded, self.failed
            );
        }
        if self.failed == 0 {
            "all succeeded".to_owned()
        } else if self.succeeded == 0 {
            "all failed".to_owned()
        } else {
            format!("{} succeeded, {} failed", self.succeeded, self.failed)
        }
    }
}

impl Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status())
    }
}

/// A saved answer, as handed to the persistence collaborator.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRecord {
    /// The stored prompt this answer belongs to.
    pub prompt_id: String,
    /// The provider that answered.
    pub provider_id: ProviderId,
    /// The answer, or the error description for failures.
    pub response_text: String,
    /// Usage, timing and model details.
    pub metadata: Value,
    /// When the record was built.
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chatlist_model::ParsedResponse;

    use super::*;

    fn batch(ids: &[&str]) -> Batch {
        let mut batch = Batch::new(
            BatchId(1),
            "Hello".to_owned(),
            ids.iter().map(|id| ProviderId::new(*id)).collect(),
        );
        batch.start();
        batch
    }

    fn success(id: &str) -> RequestOutcome {
        RequestOutcome::success(
            ProviderId::new(id),
            id,
            ParsedResponse {
                text: format!("answer from {id}"),
                tokens_used: Some(42),
                model_used: Some("gpt-3.5-turbo".to_owned()),
            },
            Duration::from_millis(1500),
        )
    }

    fn failure(id: &str) -> RequestOutcome {
        RequestOutcome::failure(
            ProviderId::new(id),
            id,
            "connection failed: refused",
            Duration::from_millis(10),
        )
    }

    #[test]
    fn test_record_until_complete() {
        let mut batch = batch(&["a", "b"]);
        assert_eq!(batch.state(), BatchState::InFlight);

        assert_eq!(batch.record(success("b")), Ok(false));
        assert_eq!(batch.pending().collect::<Vec<_>>(), [&ProviderId::new("a")]);
        assert_eq!(batch.record(failure("a")), Ok(true));
        assert_eq!(batch.state(), BatchState::Completed);

        // Submission order, not arrival order.
        let order: Vec<_> =
            batch.outcomes().map(|o| o.provider_id().as_str()).collect();
        assert_eq!(order, ["a", "b"]);
    }

    #[test]
    fn test_slots_are_written_once() {
        let mut batch = batch(&["a", "b"]);
        batch.record(success("a")).unwrap();
        assert_eq!(
            batch.record(failure("a")),
            Err(RecordError::AlreadyRecorded(ProviderId::new("a")))
        );
        assert_eq!(
            batch.record(success("z")),
            Err(RecordError::UnknownProvider(ProviderId::new("z")))
        );
        assert_eq!(batch.recorded_count(), 1);
        assert!(batch.outcome(&ProviderId::new("a")).unwrap().is_success());
    }

    #[test]
    fn test_cancelled_batch_rejects_outcomes() {
        let mut batch = batch(&["a", "b"]);
        batch.record(success("a")).unwrap();
        batch.cancel();
        assert!(batch.is_terminal());
        assert_eq!(
            batch.record(success("b")),
            Err(RecordError::NotInFlight(BatchState::Cancelled))
        );
        assert_eq!(batch.summary().status(), "1 succeeded, 0 failed, 1 cancelled");
    }

    #[test]
    fn test_summary_status() {
        let mut all_ok = batch(&["a", "b"]);
        all_ok.record(success("a")).unwrap();
        all_ok.record(success("b")).unwrap();
        assert_eq!(all_ok.summary().status(), "all succeeded");

        let mut mixed = batch(&["a", "b", "c"]);
        mixed.record(success("a")).unwrap();
        mixed.record(failure("b")).unwrap();
        mixed.record(failure("c")).unwrap();
        let summary = mixed.summary();
        assert_eq!(
            summary,
            BatchSummary {
                succeeded: 1,
                failed: 2,
                total: 3
            }
        );
        assert_eq!(summary.to_string(), "1 succeeded, 2 failed");

        let mut all_bad = batch(&["a"]);
        all_bad.record(failure("a")).unwrap();
        assert_eq!(all_bad.summary().status(), "all failed");
    }

    #[test]
    fn test_result_record() {
        let mut batch = batch(&["a", "b"]);
        batch.record(success("a")).unwrap();
        batch.record(failure("b")).unwrap();

        let record = batch.result_record(&ProviderId::new("a"), "17").unwrap();
        assert_eq!(record.prompt_id, "17");
        assert_eq!(record.response_text, "answer from a");
        assert_eq!(record.metadata["tokens_used"], 42);
        assert_eq!(record.metadata["response_time"], 1.5);
        assert_eq!(record.metadata["model_used"], "gpt-3.5-turbo");

        let record = batch.result_record(&ProviderId::new("b"), "17").unwrap();
        assert_eq!(record.response_text, "connection failed: refused");
        assert_eq!(record.metadata["success"], false);

        assert!(batch.result_record(&ProviderId::new("z"), "17").is_none());
    }
}
