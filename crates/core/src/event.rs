use chatlist_model::{ProviderId, RequestOutcome};

use crate::batch::{Batch, BatchId};

/// A notification emitted by the dispatcher.
///
/// For one batch, every [`DispatchEvent::OutcomeRecorded`] is emitted before
/// the single terminal event. Events of different providers arrive in
/// completion order, not submission order.
#[derive(Clone, Debug)]
pub enum DispatchEvent {
    /// A provider's outcome has been recorded.
    OutcomeRecorded {
        /// The batch the outcome belongs to.
        batch_id: BatchId,
        /// The provider that finished.
        provider_id: ProviderId,
        /// The recorded outcome.
        outcome: RequestOutcome,
    },
    /// Every provider of the batch has an outcome.
    BatchCompleted(Batch),
    /// The batch was cancelled before completing.
    BatchCancelled(Batch),
}

impl DispatchEvent {
    /// Returns the batch this event is about.
    pub fn batch_id(&self) -> BatchId {
        match self {
            DispatchEvent::OutcomeRecorded { batch_id, .. } => *batch_id,
            DispatchEvent::BatchCompleted(batch)
            | DispatchEvent::BatchCancelled(batch) => batch.id(),
        }
    }
}
