use crate::{
    authentication::{AuthenticatedCaller, Authentication},
    clock::Clock,
    environment::Environment,
    objects::{Ceremony, CeremonyState, Circuit, ContributionStep, Participant, ParticipantStatus},
    storage::{Collection, Locator, Object, QueryFilter, Storage},
};

use rayon::prelude::*;
use std::{
    fmt,
    sync::{Arc, RwLock},
};
use tracing::{debug, info, trace};

#[derive(Debug)]
pub enum CoordinatorError {
    CeremonyIdMissing,
    CeremonyMissing,
    CeremonyNotOpen,
    ChunkETagMissing,
    ChunkPartNumberInvalid,
    ComputationTimeInvalid,
    ContributionHashMissing,
    ContributionStepAlreadyComplete,
    ContributionStepMismatch,
    CurrentContributorMismatch,
    Error(anyhow::Error),
    IOError(std::io::Error),
    JsonError(serde_json::Error),
    ParticipantMissing,
    ParticipantNotContributing,
    ParticipantNotReady,
    ParticipantNotTimedOut,
    QueueIsEmpty,
    StorageFailed,
    StorageLocatorAlreadyExists,
    StorageLocatorMissing,
    StorageObjectMismatch,
    UnauthenticatedCaller,
    UploadIdMissing,
}

/// The wire-level failure category surfaced to RPC callers.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorCategory {
    Unauthenticated,
    InvalidArgument,
    FailedPrecondition,
    NotFound,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let category = match self {
            ErrorCategory::Unauthenticated => "UNAUTHENTICATED",
            ErrorCategory::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCategory::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorCategory::NotFound => "NOT_FOUND",
            ErrorCategory::Internal => "INTERNAL",
        };
        write!(f, "{}", category)
    }
}

impl CoordinatorError {
    /// Returns the failure category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoordinatorError::UnauthenticatedCaller => ErrorCategory::Unauthenticated,
            CoordinatorError::CeremonyIdMissing
            | CoordinatorError::ChunkETagMissing
            | CoordinatorError::ChunkPartNumberInvalid
            | CoordinatorError::ComputationTimeInvalid
            | CoordinatorError::ContributionHashMissing
            | CoordinatorError::UploadIdMissing => ErrorCategory::InvalidArgument,
            CoordinatorError::CeremonyNotOpen
            | CoordinatorError::ContributionStepAlreadyComplete
            | CoordinatorError::ContributionStepMismatch
            | CoordinatorError::ParticipantNotContributing
            | CoordinatorError::ParticipantNotReady
            | CoordinatorError::ParticipantNotTimedOut => ErrorCategory::FailedPrecondition,
            CoordinatorError::CeremonyMissing | CoordinatorError::ParticipantMissing => ErrorCategory::NotFound,
            _ => ErrorCategory::Internal,
        }
    }
}

impl From<anyhow::Error> for CoordinatorError {
    fn from(error: anyhow::Error) -> Self {
        CoordinatorError::Error(error)
    }
}

impl From<serde_json::Error> for CoordinatorError {
    fn from(error: serde_json::Error) -> Self {
        CoordinatorError::JsonError(error)
    }
}

impl From<std::io::Error> for CoordinatorError {
    fn from(error: std::io::Error) -> Self {
        CoordinatorError::IOError(error)
    }
}

impl fmt::Display for CoordinatorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<CoordinatorError> for anyhow::Error {
    fn from(error: CoordinatorError) -> Self {
        Self::msg(error.to_string())
    }
}

///
/// The coordination core of a trusted-setup ceremony.
///
/// Handlers are short-lived authenticated RPCs mutating ceremony documents
/// through the storage lock; the eviction scheduler independently reads the
/// same documents on a timer. Every multi-document mutation commits as one
/// storage batch.
///
#[derive(Clone)]
pub struct Coordinator {
    /// The parameters and settings of this coordinator.
    environment: Environment,
    /// The authentication scheme resolving caller tokens into claims.
    authentication: Arc<dyn Authentication>,
    /// The server-side clock stamping every persisted timestamp.
    clock: Arc<dyn Clock>,
    /// The storage system of this coordinator.
    storage: Arc<RwLock<Box<dyn Storage>>>,
}

impl Coordinator {
    ///
    /// Creates a new instance of the `Coordinator`, for a given environment,
    /// with the given authentication scheme and clock.
    ///
    /// The coordinator loads and instantiates an internal instance of storage.
    /// All subsequent interactions with the coordinator are directly from
    /// the RPC handlers and the eviction scheduler.
    ///
    pub fn new(
        environment: Environment,
        authentication: Box<dyn Authentication>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CoordinatorError> {
        let storage = environment.storage()?;
        Ok(Self {
            environment,
            authentication: Arc::from(authentication),
            clock,
            storage: Arc::new(RwLock::new(storage)),
        })
    }

    /// Returns the environment of the coordinator.
    #[inline]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Returns the authentication scheme of the coordinator.
    #[inline]
    pub fn authentication(&self) -> &dyn Authentication {
        &*self.authentication
    }

    /// Returns the clock of the coordinator.
    #[inline]
    pub(crate) fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    /// Returns the storage handle of the coordinator.
    #[inline]
    pub fn storage(&self) -> Arc<RwLock<Box<dyn Storage>>> {
        self.storage.clone()
    }

    ///
    /// Checks whether the given caller may contribute to the given ceremony.
    ///
    /// Creates the participant document on first contact. A timed-out
    /// participant is rehabilitated once every penalty record has expired.
    ///
    /// Returns `true` if the caller may contribute or resume contributing.
    ///
    pub fn check_participant_for_ceremony(
        &self,
        caller: &AuthenticatedCaller,
        ceremony_id: &str,
    ) -> Result<bool, CoordinatorError> {
        Self::authorize(caller)?;
        Self::validate_ceremony_id(ceremony_id)?;

        let now = self.clock.now_millis();

        // Acquire the storage write lock.
        let mut storage = self.storage.write().unwrap();

        let _ceremony = Self::load_opened_ceremony(&**storage, ceremony_id)?;

        let locator = Locator::Participant(ceremony_id.to_string(), caller.uid().to_string());

        // A first contact registers the caller into the waiting state.
        if !storage.exists(&locator) {
            info!("Registering participant {} for ceremony {}", caller, ceremony_id);
            let participant = Participant::new(caller.uid().to_string(), now);
            storage.insert(locator, Object::Participant(participant))?;
            return Ok(true);
        }

        let participant = storage.get(&locator)?.into_participant()?;

        // A participant who finished every circuit has no further turns.
        let number_of_circuits = storage.query(&Collection::Circuits(ceremony_id.to_string()), None)?.len() as u64;
        if participant.is_finished(number_of_circuits) {
            trace!("Participant {} already finished ceremony {}", caller, ceremony_id);
            return Ok(false);
        }

        // A timed-out participant may retry once every penalty has expired.
        if participant.status() == ParticipantStatus::Timedout {
            let active_timeouts = storage.query(
                &Collection::Timeouts(ceremony_id.to_string(), caller.uid().to_string()),
                Some(&QueryFilter::EndDateAtOrAfter(now)),
            )?;
            if !active_timeouts.is_empty() {
                debug!("Participant {} is still serving a timeout penalty", caller);
                return Ok(false);
            }

            let mut participant = participant;
            participant.exhume(now)?;
            storage.update(&locator, Object::Participant(participant))?;
            info!("Participant {} was rehabilitated for ceremony {}", caller, ceremony_id);
            return Ok(true);
        }

        Ok(true)
    }

    ///
    /// Advances the contribution sub-step of the caller by exactly one along
    /// DOWNLOADING → COMPUTING → UPLOADING → VERIFYING → COMPLETED,
    /// and returns the step that was entered.
    ///
    pub fn progress_to_next_contribution_step(
        &self,
        caller: &AuthenticatedCaller,
        ceremony_id: &str,
    ) -> Result<ContributionStep, CoordinatorError> {
        Self::authorize(caller)?;
        Self::validate_ceremony_id(ceremony_id)?;

        let now = self.clock.now_millis();

        // Acquire the storage write lock.
        let mut storage = self.storage.write().unwrap();

        let _ceremony = Self::load_opened_ceremony(&**storage, ceremony_id)?;
        let locator = Locator::Participant(ceremony_id.to_string(), caller.uid().to_string());
        let mut participant = Self::load_participant(&**storage, &locator)?;

        let step = participant.advance_contribution_step(now)?;
        storage.update(&locator, Object::Participant(participant))?;

        info!("Participant {} entered the {} step", caller, step);
        Ok(step)
    }

    ///
    /// Stores the self-reported computation time of the contribution in
    /// flight into the scratch data of the caller.
    ///
    pub fn temporary_store_current_contribution_computation_time(
        &self,
        caller: &AuthenticatedCaller,
        ceremony_id: &str,
        contribution_computation_time: i64,
    ) -> Result<(), CoordinatorError> {
        Self::authorize(caller)?;
        Self::validate_ceremony_id(ceremony_id)?;

        // Check that the reported computation time is positive.
        if contribution_computation_time <= 0 {
            return Err(CoordinatorError::ComputationTimeInvalid);
        }

        let now = self.clock.now_millis();

        // Acquire the storage write lock.
        let mut storage = self.storage.write().unwrap();

        let _ceremony = Self::load_opened_ceremony(&**storage, ceremony_id)?;
        let locator = Locator::Participant(ceremony_id.to_string(), caller.uid().to_string());
        let mut participant = Self::load_participant(&**storage, &locator)?;

        participant.store_computation_time(contribution_computation_time, now)?;
        storage.update(&locator, Object::Participant(participant))?;

        debug!("Stored the computation time of participant {}", caller);
        Ok(())
    }

    ///
    /// Permanently records the hash and computation time of the current
    /// contribution of the caller.
    ///
    /// Accepted while the caller is computing, or from a coordinator-claimed
    /// caller finalizing the ceremony.
    ///
    pub fn permanently_store_current_contribution_time_and_hash(
        &self,
        caller: &AuthenticatedCaller,
        ceremony_id: &str,
        contribution_computation_time: i64,
        contribution_hash: &str,
    ) -> Result<(), CoordinatorError> {
        Self::authorize(caller)?;
        Self::validate_ceremony_id(ceremony_id)?;

        // Check that the reported computation time is positive.
        if contribution_computation_time <= 0 {
            return Err(CoordinatorError::ComputationTimeInvalid);
        }
        // Check that a contribution hash was supplied.
        if contribution_hash.is_empty() {
            return Err(CoordinatorError::ContributionHashMissing);
        }

        let now = self.clock.now_millis();

        // Acquire the storage write lock.
        let mut storage = self.storage.write().unwrap();

        let _ceremony = Self::load_opened_ceremony(&**storage, ceremony_id)?;
        let locator = Locator::Participant(ceremony_id.to_string(), caller.uid().to_string());
        let mut participant = Self::load_participant(&**storage, &locator)?;

        // Check that the caller is computing its contribution, or is the
        // coordinator finalizing the ceremony.
        let is_computing = participant.contribution_step() == ContributionStep::Computing;
        let is_finalizing =
            caller.claims().coordinator && participant.status() == ParticipantStatus::Finalizing;
        if !is_computing && !is_finalizing {
            return Err(CoordinatorError::ContributionStepMismatch);
        }

        participant.record_contribution(contribution_hash.to_string(), contribution_computation_time, now);
        storage.update(&locator, Object::Participant(participant))?;

        info!("Recorded a contribution of participant {} to ceremony {}", caller, ceremony_id);
        Ok(())
    }

    ///
    /// Stores the multi-part upload ID of the contribution in flight and
    /// resets the uploaded chunk list of the caller.
    ///
    pub fn temporary_store_current_contribution_multi_part_upload_id(
        &self,
        caller: &AuthenticatedCaller,
        ceremony_id: &str,
        upload_id: &str,
    ) -> Result<(), CoordinatorError> {
        Self::authorize(caller)?;
        Self::validate_ceremony_id(ceremony_id)?;

        // Check that an upload ID was supplied.
        if upload_id.is_empty() {
            return Err(CoordinatorError::UploadIdMissing);
        }

        let now = self.clock.now_millis();

        // Acquire the storage write lock.
        let mut storage = self.storage.write().unwrap();

        let _ceremony = Self::load_opened_ceremony(&**storage, ceremony_id)?;
        let locator = Locator::Participant(ceremony_id.to_string(), caller.uid().to_string());
        let mut participant = Self::load_participant(&**storage, &locator)?;

        participant.store_upload_id(upload_id.to_string(), now)?;
        storage.update(&locator, Object::Participant(participant))?;

        debug!("Stored the upload ID of participant {}", caller);
        Ok(())
    }

    ///
    /// Appends one uploaded chunk to the scratch data of the caller,
    /// preserving the chunks stored so far.
    ///
    pub fn temporary_store_current_contribution_uploaded_chunk_data(
        &self,
        caller: &AuthenticatedCaller,
        ceremony_id: &str,
        e_tag: &str,
        part_number: u64,
    ) -> Result<(), CoordinatorError> {
        Self::authorize(caller)?;
        Self::validate_ceremony_id(ceremony_id)?;

        // Check that an entity tag was supplied.
        if e_tag.is_empty() {
            return Err(CoordinatorError::ChunkETagMissing);
        }
        // Check that the part number is positive.
        if part_number == 0 {
            return Err(CoordinatorError::ChunkPartNumberInvalid);
        }

        let now = self.clock.now_millis();

        // Acquire the storage write lock.
        let mut storage = self.storage.write().unwrap();

        let _ceremony = Self::load_opened_ceremony(&**storage, ceremony_id)?;
        let locator = Locator::Participant(ceremony_id.to_string(), caller.uid().to_string());
        let mut participant = Self::load_participant(&**storage, &locator)?;

        participant.append_uploaded_chunk(e_tag.to_string(), part_number, now)?;
        storage.update(&locator, Object::Participant(participant))?;

        debug!("Stored chunk {} of participant {}", part_number, caller);
        Ok(())
    }

    ///
    /// Returns a per-circuit summary of every opened ceremony, one line per
    /// circuit, for the scheduler loop to log each tick.
    ///
    pub fn status_report(&self) -> Result<String, CoordinatorError> {
        // Acquire the storage read lock.
        let storage = self.storage.read().unwrap();

        let opened = storage.query(
            &Collection::Ceremonies,
            Some(&QueryFilter::StateEquals(CeremonyState::Opened)),
        )?;

        let mut circuits = Vec::new();
        for (_, object) in opened {
            let ceremony = object.into_ceremony()?;
            for (_, object) in storage.query(&Collection::Circuits(ceremony.id().to_string()), None)? {
                circuits.push((ceremony.id().to_string(), object.into_circuit()?));
            }
        }

        let lines: Vec<String> = circuits
            .par_iter()
            .map(|(ceremony_id, circuit)| {
                let queue = circuit.waiting_queue();
                format!(
                    "ceremony {} circuit {}: {} queued, current {}, {} completed, {} failed",
                    ceremony_id,
                    circuit.id(),
                    queue.contributors().len(),
                    queue.current_contributor().unwrap_or("none"),
                    queue.completed_contributions(),
                    queue.failed_contributions(),
                )
            })
            .collect();

        Ok(lines.join("\n\t"))
    }

    /// Rejects callers holding neither the participant nor the coordinator claim.
    pub(crate) fn authorize(caller: &AuthenticatedCaller) -> Result<(), CoordinatorError> {
        match caller.claims().is_authorized() {
            true => Ok(()),
            false => Err(CoordinatorError::UnauthenticatedCaller),
        }
    }

    /// Rejects requests carrying no ceremony ID.
    pub(crate) fn validate_ceremony_id(ceremony_id: &str) -> Result<(), CoordinatorError> {
        match ceremony_id.is_empty() {
            true => Err(CoordinatorError::CeremonyIdMissing),
            false => Ok(()),
        }
    }

    ///
    /// Loads the ceremony with the given ID from storage, rejecting
    /// ceremonies that are not accepting contributions.
    ///
    pub(crate) fn load_opened_ceremony(
        storage: &dyn Storage,
        ceremony_id: &str,
    ) -> Result<Ceremony, CoordinatorError> {
        let locator = Locator::Ceremony(ceremony_id.to_string());

        // Check that the ceremony exists.
        if !storage.exists(&locator) {
            return Err(CoordinatorError::CeremonyMissing);
        }

        let ceremony = storage.get(&locator)?.into_ceremony()?;

        // Check that the ceremony is accepting contributions.
        if !ceremony.is_open() {
            return Err(CoordinatorError::CeremonyNotOpen);
        }

        Ok(ceremony)
    }

    /// Loads the participant at the given locator from storage.
    pub(crate) fn load_participant(
        storage: &dyn Storage,
        locator: &Locator,
    ) -> Result<Participant, CoordinatorError> {
        // Check that the participant exists.
        if !storage.exists(locator) {
            return Err(CoordinatorError::ParticipantMissing);
        }

        storage.get(locator)?.into_participant()
    }

    /// Loads the circuits of the given ceremony from storage.
    pub(crate) fn load_circuits(
        storage: &dyn Storage,
        ceremony_id: &str,
    ) -> Result<Vec<(Locator, Circuit)>, CoordinatorError> {
        storage
            .query(&Collection::Circuits(ceremony_id.to_string()), None)?
            .into_iter()
            .map(|(locator, object)| Ok((locator, object.into_circuit()?)))
            .collect()
    }
}
