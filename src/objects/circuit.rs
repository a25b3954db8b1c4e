use crate::{
    objects::{CeremonyId, ParticipantId},
    CoordinatorError,
};

use serde::{Deserialize, Serialize};
use serde_aux::prelude::*;
use serde_diff::SerdeDiff;
use std::fmt;

pub type CircuitId = String;

///
/// The per-circuit FIFO of participant IDs awaiting their turn.
///
/// The current contributor always mirrors the head of the queue; the two
/// fields are only ever written together so the mirror cannot drift.
///
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde(rename_all = "camelCase")]
pub struct WaitingQueue {
    #[serde(default)]
    contributors: Vec<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_diff(opaque)]
    current_contributor: Option<ParticipantId>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    completed_contributions: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    failed_contributions: u64,
}

impl WaitingQueue {
    /// Returns the queued participant IDs, head first.
    #[inline]
    pub fn contributors(&self) -> &[ParticipantId] {
        &self.contributors
    }

    /// Returns the participant currently holding the turn, if any.
    #[inline]
    pub fn current_contributor(&self) -> Option<&str> {
        self.current_contributor.as_deref()
    }

    /// Returns the number of contributions completed on this circuit.
    #[inline]
    pub fn completed_contributions(&self) -> u64 {
        self.completed_contributions
    }

    /// Returns the number of contributions that failed on this circuit.
    #[inline]
    pub fn failed_contributions(&self) -> u64 {
        self.failed_contributions
    }

    ///
    /// Pops the head of the queue and promotes the next participant, if
    /// any, to current contributor.
    ///
    /// Returns the popped participant ID and the promoted participant ID.
    ///
    fn pop_head(&mut self) -> Result<(ParticipantId, Option<ParticipantId>), CoordinatorError> {
        // Check that the queue holds a participant to pop.
        if self.contributors.is_empty() {
            return Err(CoordinatorError::QueueIsEmpty);
        }

        // Check that the head of the queue mirrors the current contributor.
        match &self.current_contributor {
            Some(current) if *current == self.contributors[0] => (),
            _ => return Err(CoordinatorError::CurrentContributorMismatch),
        }

        let popped = self.contributors.remove(0);
        self.current_contributor = self.contributors.first().cloned();

        Ok((popped, self.current_contributor.clone()))
    }
}

/// The contribution timing baseline of a circuit.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde(rename_all = "camelCase")]
pub struct AvgTimings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    full_contribution: i64,
}

impl AvgTimings {
    /// Returns the moving average of past full contributions in milliseconds.
    #[inline]
    pub fn full_contribution(&self) -> i64 {
        self.full_contribution
    }
}

///
/// One zero-knowledge circuit of a ceremony, carrying the mutable waiting
/// queue and the contribution timing baseline.
///
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    id: CircuitId,
    ceremony_id: CeremonyId,
    waiting_queue: WaitingQueue,
    avg_timings: AvgTimings,
    /// Tolerance percentage widening the dynamic contribution deadline.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    dynamic_threshold: i64,
    /// Fixed contribution window in minutes.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    fixed_time_window: i64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    last_updated: i64,
}

impl Circuit {
    /// Creates a new instance of `Circuit` with the given queue order.
    #[inline]
    pub fn new(
        id: CircuitId,
        ceremony_id: CeremonyId,
        contributors: Vec<ParticipantId>,
        avg_full_contribution: i64,
        dynamic_threshold: i64,
        fixed_time_window: i64,
        now: i64,
    ) -> Self {
        let current_contributor = contributors.first().cloned();
        Self {
            id,
            ceremony_id,
            waiting_queue: WaitingQueue {
                contributors,
                current_contributor,
                completed_contributions: 0,
                failed_contributions: 0,
            },
            avg_timings: AvgTimings {
                full_contribution: avg_full_contribution,
            },
            dynamic_threshold,
            fixed_time_window,
            last_updated: now,
        }
    }

    /// Returns the ID of the circuit.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the ID of the ceremony this circuit belongs to.
    #[inline]
    pub fn ceremony_id(&self) -> &str {
        &self.ceremony_id
    }

    /// Returns the waiting queue of the circuit.
    #[inline]
    pub fn waiting_queue(&self) -> &WaitingQueue {
        &self.waiting_queue
    }

    /// Returns the timing baseline of the circuit.
    #[inline]
    pub fn avg_timings(&self) -> &AvgTimings {
        &self.avg_timings
    }

    /// Returns the dynamic deadline tolerance percentage.
    #[inline]
    pub fn dynamic_threshold(&self) -> i64 {
        self.dynamic_threshold
    }

    /// Returns the fixed contribution window in minutes.
    #[inline]
    pub fn fixed_time_window(&self) -> i64 {
        self.fixed_time_window
    }

    /// Returns the timestamp of the last mutation of this document.
    #[inline]
    pub fn last_updated(&self) -> i64 {
        self.last_updated
    }

    ///
    /// Records a completed contribution on this circuit. Driven by the
    /// external ceremony-lifecycle after verification succeeds.
    ///
    #[inline]
    pub fn record_completed_contribution(&mut self, now: i64) {
        self.waiting_queue.completed_contributions += 1;
        self.last_updated = now;
    }

    ///
    /// Removes the current contributor from the queue after an eviction,
    /// counting the failed contribution and promoting the next participant.
    ///
    /// Returns the evicted participant ID and the promoted participant ID,
    /// if the queue still holds one.
    ///
    pub(crate) fn evict_current_contributor(
        &mut self,
        now: i64,
    ) -> Result<(ParticipantId, Option<ParticipantId>), CoordinatorError> {
        let (evicted, promoted) = self.waiting_queue.pop_head()?;

        self.waiting_queue.failed_contributions += 1;
        self.last_updated = now;

        Ok((evicted, promoted))
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
