use crate::{
    environment::Environment,
    objects::{Ceremony, CeremonyId, CeremonyState, Circuit, CircuitId, Participant, ParticipantId, Timeout},
    CoordinatorError,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// A data structure representing all possible document keys in storage.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Locator {
    Ceremony(CeremonyId),
    Circuit(CeremonyId, CircuitId),
    Participant(CeremonyId, ParticipantId),
    Timeout(CeremonyId, ParticipantId, String),
}

impl Locator {
    /// Returns the stable document path for this locator.
    pub fn to_path(&self) -> String {
        match self {
            Locator::Ceremony(ceremony_id) => format!("ceremonies/{}", ceremony_id),
            Locator::Circuit(ceremony_id, circuit_id) => {
                format!("ceremonies/{}/circuits/{}", ceremony_id, circuit_id)
            }
            Locator::Participant(ceremony_id, participant_id) => {
                format!("ceremonies/{}/participants/{}", ceremony_id, participant_id)
            }
            Locator::Timeout(ceremony_id, participant_id, timeout_id) => format!(
                "ceremonies/{}/participants/{}/timeouts/{}",
                ceremony_id, participant_id, timeout_id
            ),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

/// A data structure representing all possible collections in storage.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Ceremonies,
    Circuits(CeremonyId),
    Participants(CeremonyId),
    Timeouts(CeremonyId, ParticipantId),
}

impl Collection {
    /// Returns the stable collection path for this collection.
    pub fn to_path(&self) -> String {
        match self {
            Collection::Ceremonies => "ceremonies/".to_string(),
            Collection::Circuits(ceremony_id) => format!("ceremonies/{}/circuits/", ceremony_id),
            Collection::Participants(ceremony_id) => format!("ceremonies/{}/participants/", ceremony_id),
            Collection::Timeouts(ceremony_id, participant_id) => {
                format!("ceremonies/{}/participants/{}/timeouts/", ceremony_id, participant_id)
            }
        }
    }

    /// Returns `true` if the given locator addresses a document in this collection.
    pub fn contains(&self, locator: &Locator) -> bool {
        match (self, locator) {
            (Collection::Ceremonies, Locator::Ceremony(_)) => true,
            (Collection::Circuits(ceremony_id), Locator::Circuit(cid, _)) => ceremony_id == cid,
            (Collection::Participants(ceremony_id), Locator::Participant(cid, _)) => ceremony_id == cid,
            (Collection::Timeouts(ceremony_id, participant_id), Locator::Timeout(cid, pid, _)) => {
                ceremony_id == cid && participant_id == pid
            }
            _ => false,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

/// A data structure representing all possible document values in storage.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Object {
    Ceremony(Ceremony),
    Circuit(Circuit),
    Participant(Participant),
    Timeout(Timeout),
}

impl Object {
    /// Serializes the document to its JSON wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoordinatorError> {
        let bytes = match self {
            Object::Ceremony(ceremony) => serde_json::to_vec_pretty(ceremony)?,
            Object::Circuit(circuit) => serde_json::to_vec_pretty(circuit)?,
            Object::Participant(participant) => serde_json::to_vec_pretty(participant)?,
            Object::Timeout(timeout) => serde_json::to_vec_pretty(timeout)?,
        };
        Ok(bytes)
    }

    /// Returns the inner ceremony document, if this is one.
    pub fn into_ceremony(self) -> Result<Ceremony, CoordinatorError> {
        match self {
            Object::Ceremony(ceremony) => Ok(ceremony),
            _ => Err(CoordinatorError::StorageObjectMismatch),
        }
    }

    /// Returns the inner circuit document, if this is one.
    pub fn into_circuit(self) -> Result<Circuit, CoordinatorError> {
        match self {
            Object::Circuit(circuit) => Ok(circuit),
            _ => Err(CoordinatorError::StorageObjectMismatch),
        }
    }

    /// Returns the inner participant document, if this is one.
    pub fn into_participant(self) -> Result<Participant, CoordinatorError> {
        match self {
            Object::Participant(participant) => Ok(participant),
            _ => Err(CoordinatorError::StorageObjectMismatch),
        }
    }

    /// Returns the inner timeout document, if this is one.
    pub fn into_timeout(self) -> Result<Timeout, CoordinatorError> {
        match self {
            Object::Timeout(timeout) => Ok(timeout),
            _ => Err(CoordinatorError::StorageObjectMismatch),
        }
    }
}

///
/// A single-field predicate a collection query can push down to storage.
///
/// The store supports equality and one-sided range filters; anything
/// richer is composed in the caller.
///
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum QueryFilter {
    /// Matches ceremony documents in the given lifecycle state.
    StateEquals(CeremonyState),
    /// Matches documents whose end date is at or after the given time.
    EndDateAtOrAfter(i64),
}

impl QueryFilter {
    /// Returns `true` if the given document satisfies this filter.
    pub fn matches(&self, object: &Object) -> bool {
        match (self, object) {
            (QueryFilter::StateEquals(state), Object::Ceremony(ceremony)) => ceremony.state() == *state,
            (QueryFilter::EndDateAtOrAfter(time), Object::Ceremony(ceremony)) => ceremony.end_date() >= *time,
            (QueryFilter::EndDateAtOrAfter(time), Object::Timeout(timeout)) => timeout.end_date() >= *time,
            _ => false,
        }
    }
}

/// A single conditional write inside a batch.
#[derive(Debug, Clone)]
pub enum Write {
    /// Creates the document; fails if the locator already exists.
    Insert(Locator, Object),
    /// Overwrites the document; fails if the locator does not exist.
    Update(Locator, Object),
}

///
/// An ordered set of conditional writes committed as one transaction.
///
/// Every core mutation touching more than one document goes through a
/// batch; a batch that fails validation applies nothing.
///
#[derive(Debug, Clone, Default)]
pub struct Batch {
    writes: Vec<Write>,
}

impl Batch {
    /// Creates a new empty batch.
    #[inline]
    pub fn new() -> Self {
        Self { writes: Vec::new() }
    }

    /// Adds a document creation to the batch.
    #[inline]
    pub fn insert(&mut self, locator: Locator, object: Object) {
        self.writes.push(Write::Insert(locator, object));
    }

    /// Adds a document overwrite to the batch.
    #[inline]
    pub fn update(&mut self, locator: Locator, object: Object) {
        self.writes.push(Write::Update(locator, object));
    }

    /// Returns the writes of the batch in commit order.
    #[inline]
    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Returns the number of writes in the batch.
    #[inline]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Returns `true` if the batch holds no writes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// A standard model for document storage.
pub trait Storage: Send + Sync {
    /// Loads a new instance of `Storage`.
    fn load(environment: &Environment) -> Result<Self, CoordinatorError>
    where
        Self: Sized;

    /// Returns `true` if a given locator exists in storage. Otherwise, returns `false`.
    fn exists(&self, locator: &Locator) -> bool;

    /// Returns a copy of the document at the given locator, if it exists.
    fn get(&self, locator: &Locator) -> Result<Object, CoordinatorError>;

    /// Inserts a new document at the given locator, if it does not exist.
    fn insert(&mut self, locator: Locator, object: Object) -> Result<(), CoordinatorError>;

    /// Updates an existing document at the given locator, if it exists.
    fn update(&mut self, locator: &Locator, object: Object) -> Result<(), CoordinatorError>;

    /// Returns the documents of a collection matching the given filter,
    /// in stable path order.
    fn query(
        &self,
        collection: &Collection,
        filter: Option<&QueryFilter>,
    ) -> Result<Vec<(Locator, Object)>, CoordinatorError>;

    /// Commits the given batch atomically; a failed batch applies nothing.
    fn commit(&mut self, batch: Batch) -> Result<(), CoordinatorError>;

    /// Returns a fresh unique document ID for auto-ID collections.
    fn generate_id(&mut self) -> String;
}
