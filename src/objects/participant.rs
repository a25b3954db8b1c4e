use crate::CoordinatorError;

use serde::{Deserialize, Serialize};
use serde_aux::prelude::*;
use serde_diff::SerdeDiff;
use std::fmt;

pub type ParticipantId = String;

///
/// The lifecycle status of a participant across the whole ceremony.
///
/// The coordinator core owns the `WAITING`, `DONE`, `TIMEDOUT`, and
/// `EXHUMED` transitions; `READY`, `CONTRIBUTING`, and `FINALIZING` are
/// written by the external ceremony-lifecycle and accepted as valid
/// persisted states.
///
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde_diff(opaque)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    Waiting,
    Ready,
    Contributing,
    Done,
    Timedout,
    Exhumed,
    Finalizing,
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

///
/// The sub-step of the contribution currently being produced.
///
/// Steps only ever advance in the declared order. The single backward
/// transition in the system is the eviction path, which rehabilitates a
/// timed-out participant to `DOWNLOADING` through [Participant::exhume].
///
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde_diff(opaque)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionStep {
    Downloading,
    Computing,
    Uploading,
    Verifying,
    Completed,
}

impl ContributionStep {
    /// Returns the next step in the contribution chain,
    /// or `None` if the contribution is already complete.
    #[inline]
    pub fn next(&self) -> Option<ContributionStep> {
        match self {
            ContributionStep::Downloading => Some(ContributionStep::Computing),
            ContributionStep::Computing => Some(ContributionStep::Uploading),
            ContributionStep::Uploading => Some(ContributionStep::Verifying),
            ContributionStep::Verifying => Some(ContributionStep::Completed),
            ContributionStep::Completed => None,
        }
    }
}

impl fmt::Display for ContributionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One completed contribution of this participant to one circuit.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    hash: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    computation_time: i64,
}

impl Contribution {
    /// Returns the hash of the contribution artifact.
    #[inline]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Returns the computation time of the contribution in milliseconds.
    #[inline]
    pub fn computation_time(&self) -> i64 {
        self.computation_time
    }
}

/// One uploaded part of a multi-part contribution upload.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
pub struct UploadedChunk {
    #[serde(rename = "ETag")]
    e_tag: String,
    #[serde(rename = "PartNumber", deserialize_with = "deserialize_number_from_string")]
    part_number: u64,
}

impl UploadedChunk {
    /// Returns the entity tag the object store assigned to this part.
    #[inline]
    pub fn e_tag(&self) -> &str {
        &self.e_tag
    }

    /// Returns the 1-based part number of this chunk.
    #[inline]
    pub fn part_number(&self) -> u64 {
        self.part_number
    }
}

///
/// Scratch data for the contribution currently in flight.
///
/// Dropped by the external ceremony-lifecycle once the contribution is
/// verified; the core only merges fields into it.
///
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde(rename_all = "camelCase")]
pub struct TempContributionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_diff(opaque)]
    contribution_computation_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_diff(opaque)]
    upload_id: Option<String>,
    #[serde(default)]
    chunks: Vec<UploadedChunk>,
}

impl TempContributionData {
    /// Returns the self-reported computation time, if one was stored.
    #[inline]
    pub fn contribution_computation_time(&self) -> Option<i64> {
        self.contribution_computation_time
    }

    /// Returns the multi-part upload ID, if one was stored.
    #[inline]
    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    /// Returns the chunks uploaded so far.
    #[inline]
    pub fn chunks(&self) -> &[UploadedChunk] {
        &self.chunks
    }
}

///
/// A participant of a ceremony, keyed by the authenticated caller ID.
///
/// The document is created on the first `CheckParticipantForCeremony` call
/// and never deleted. Every mutation stamps `lastUpdated` with the
/// server-side clock.
///
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    id: ParticipantId,
    status: ParticipantStatus,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    contribution_progress: u64,
    contribution_step: ContributionStep,
    #[serde(default)]
    contributions: Vec<Contribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_diff(opaque)]
    temp_contribution_data: Option<TempContributionData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_diff(opaque)]
    contribution_started_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde_diff(opaque)]
    verification_started_at: Option<i64>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    last_updated: i64,
}

impl Participant {
    /// Creates a new waiting participant for a ceremony.
    #[inline]
    pub fn new(id: ParticipantId, now: i64) -> Self {
        Self {
            id,
            status: ParticipantStatus::Waiting,
            contribution_progress: 0,
            contribution_step: ContributionStep::Downloading,
            contributions: Vec::new(),
            temp_contribution_data: None,
            contribution_started_at: None,
            verification_started_at: None,
            last_updated: now,
        }
    }

    /// Returns the ID of the participant.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the lifecycle status of the participant.
    #[inline]
    pub fn status(&self) -> ParticipantStatus {
        self.status
    }

    /// Returns the index of the circuit the participant is working on.
    #[inline]
    pub fn contribution_progress(&self) -> u64 {
        self.contribution_progress
    }

    /// Returns the current contribution sub-step.
    #[inline]
    pub fn contribution_step(&self) -> ContributionStep {
        self.contribution_step
    }

    /// Returns the completed contributions of the participant.
    #[inline]
    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }

    /// Returns the scratch data of the contribution in flight, if any.
    #[inline]
    pub fn temp_contribution_data(&self) -> Option<&TempContributionData> {
        self.temp_contribution_data.as_ref()
    }

    /// Returns the timestamp the current contribution was started at, if any.
    #[inline]
    pub fn contribution_started_at(&self) -> Option<i64> {
        self.contribution_started_at
    }

    /// Returns the timestamp verification was entered at, if any.
    #[inline]
    pub fn verification_started_at(&self) -> Option<i64> {
        self.verification_started_at
    }

    /// Returns the timestamp of the last mutation of this document.
    #[inline]
    pub fn last_updated(&self) -> i64 {
        self.last_updated
    }

    ///
    /// Returns `true` if the participant has contributed to every circuit
    /// of the ceremony.
    ///
    #[inline]
    pub fn is_finished(&self, number_of_circuits: u64) -> bool {
        self.status == ParticipantStatus::Done && self.contribution_progress == number_of_circuits
    }

    ///
    /// Signals the participant that it reached the head of a waiting queue
    /// and may start its turn.
    ///
    #[inline]
    pub fn mark_waiting(&mut self, now: i64) {
        self.status = ParticipantStatus::Waiting;
        self.last_updated = now;
    }

    ///
    /// Promotes the participant to the ready state once it is the current
    /// contributor of a circuit. Driven by the external ceremony-lifecycle.
    ///
    #[inline]
    pub fn mark_ready(&mut self, now: i64) -> Result<(), CoordinatorError> {
        // Check that the participant is waiting for its turn.
        if self.status != ParticipantStatus::Waiting {
            return Err(CoordinatorError::ParticipantNotReady);
        }

        self.status = ParticipantStatus::Ready;
        self.last_updated = now;

        Ok(())
    }

    ///
    /// Starts the participant on its next contribution. Driven by the
    /// external ceremony-lifecycle once the participant holds the turn.
    ///
    #[inline]
    pub fn start_contributing(&mut self, now: i64) -> Result<(), CoordinatorError> {
        // Check that the participant is ready to take a turn,
        // or was rehabilitated after a timeout.
        match self.status {
            ParticipantStatus::Ready | ParticipantStatus::Exhumed => (),
            _ => return Err(CoordinatorError::ParticipantNotReady),
        }

        self.status = ParticipantStatus::Contributing;
        self.contribution_step = ContributionStep::Downloading;
        self.contribution_started_at = Some(now);
        self.verification_started_at = None;
        self.last_updated = now;

        Ok(())
    }

    ///
    /// Advances the contribution sub-step by exactly one along
    /// DOWNLOADING → COMPUTING → UPLOADING → VERIFYING → COMPLETED.
    ///
    /// Entering VERIFYING records the verification start time. Entering
    /// COMPLETED increments the contribution progress of the participant.
    ///
    pub fn advance_contribution_step(&mut self, now: i64) -> Result<ContributionStep, CoordinatorError> {
        // Check that the participant is actively contributing.
        if self.status != ParticipantStatus::Contributing {
            return Err(CoordinatorError::ParticipantNotContributing);
        }

        // Check that the contribution is not already complete.
        let next = match self.contribution_step.next() {
            Some(next) => next,
            None => return Err(CoordinatorError::ContributionStepAlreadyComplete),
        };

        if next == ContributionStep::Verifying {
            self.verification_started_at = Some(now);
        }
        if next == ContributionStep::Completed {
            self.contribution_progress += 1;
        }

        self.contribution_step = next;
        self.last_updated = now;

        Ok(next)
    }

    ///
    /// Returns the participant to DOWNLOADING of the next circuit after a
    /// completed contribution. Driven by the external ceremony-lifecycle.
    ///
    pub fn start_next_circuit(&mut self, now: i64) -> Result<(), CoordinatorError> {
        // Check that the participant is actively contributing.
        if self.status != ParticipantStatus::Contributing {
            return Err(CoordinatorError::ParticipantNotContributing);
        }

        // Check that the previous contribution is complete.
        if self.contribution_step != ContributionStep::Completed {
            return Err(CoordinatorError::ContributionStepMismatch);
        }

        self.contribution_step = ContributionStep::Downloading;
        self.contribution_started_at = Some(now);
        self.verification_started_at = None;
        self.temp_contribution_data = None;
        self.last_updated = now;

        Ok(())
    }

    ///
    /// Marks the participant as done once it has contributed to every
    /// circuit of the ceremony.
    ///
    pub fn finish(&mut self, number_of_circuits: u64, now: i64) -> Result<(), CoordinatorError> {
        // Check that the participant is actively contributing.
        if self.status != ParticipantStatus::Contributing {
            return Err(CoordinatorError::ParticipantNotContributing);
        }

        // Check that every circuit received a contribution.
        if self.contribution_progress != number_of_circuits {
            return Err(CoordinatorError::ContributionStepMismatch);
        }

        self.status = ParticipantStatus::Done;
        self.last_updated = now;

        Ok(())
    }

    ///
    /// Places the participant into the finalizing state. Driven by the
    /// coordinator of the ceremony when closing it out.
    ///
    #[inline]
    pub fn begin_finalizing(&mut self, now: i64) {
        self.status = ParticipantStatus::Finalizing;
        self.last_updated = now;
    }

    ///
    /// Marks the participant as timed out after a scheduler eviction.
    ///
    /// No status precondition is enforced: a handler racing the scheduler
    /// may already have completed the contribution, in which case the
    /// spurious timeout is rehabilitated by the next participant check.
    ///
    #[inline]
    pub fn mark_timed_out(&mut self, now: i64) {
        self.status = ParticipantStatus::Timedout;
        self.last_updated = now;
    }

    ///
    /// Rehabilitates a timed-out participant whose penalty has expired,
    /// resetting the contribution step for a fresh attempt.
    ///
    pub fn exhume(&mut self, now: i64) -> Result<(), CoordinatorError> {
        // Check that the participant is serving a timeout.
        if self.status != ParticipantStatus::Timedout {
            return Err(CoordinatorError::ParticipantNotTimedOut);
        }

        self.status = ParticipantStatus::Exhumed;
        self.contribution_step = ContributionStep::Downloading;
        self.last_updated = now;

        Ok(())
    }

    ///
    /// Stores the self-reported computation time of the contribution in
    /// flight into the scratch data.
    ///
    pub fn store_computation_time(&mut self, computation_time: i64, now: i64) -> Result<(), CoordinatorError> {
        // Check that the participant is computing its contribution.
        if self.contribution_step != ContributionStep::Computing {
            return Err(CoordinatorError::ContributionStepMismatch);
        }

        let data = self.temp_contribution_data.get_or_insert_with(TempContributionData::default);
        data.contribution_computation_time = Some(computation_time);
        self.last_updated = now;

        Ok(())
    }

    ///
    /// Appends a completed contribution record. The step and claim guards
    /// are enforced by the calling handler.
    ///
    #[inline]
    pub fn record_contribution(&mut self, hash: String, computation_time: i64, now: i64) {
        self.contributions.push(Contribution { hash, computation_time });
        self.last_updated = now;
    }

    ///
    /// Stores the multi-part upload ID of the contribution in flight and
    /// resets the uploaded chunk list.
    ///
    pub fn store_upload_id(&mut self, upload_id: String, now: i64) -> Result<(), CoordinatorError> {
        // Check that the participant is uploading its contribution.
        if self.contribution_step != ContributionStep::Uploading {
            return Err(CoordinatorError::ContributionStepMismatch);
        }

        let data = self.temp_contribution_data.get_or_insert_with(TempContributionData::default);
        data.upload_id = Some(upload_id);
        data.chunks = Vec::new();
        self.last_updated = now;

        Ok(())
    }

    ///
    /// Appends one uploaded chunk to the scratch data, preserving the
    /// chunks stored so far.
    ///
    pub fn append_uploaded_chunk(&mut self, e_tag: String, part_number: u64, now: i64) -> Result<(), CoordinatorError> {
        // Check that the participant is uploading its contribution.
        if self.contribution_step != ContributionStep::Uploading {
            return Err(CoordinatorError::ContributionStepMismatch);
        }

        let data = self.temp_contribution_data.get_or_insert_with(TempContributionData::default);
        data.chunks.push(UploadedChunk { e_tag, part_number });
        self.last_updated = now;

        Ok(())
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
