use crate::{
    environment::Environment,
    storage::{Batch, Collection, Locator, Object, QueryFilter, Storage, Write},
    CoordinatorError,
};

use std::collections::HashMap;
use tracing::trace;

///
/// An in-memory document store.
///
/// The coordinator serializes access through its storage lock, so the
/// map needs no interior synchronization; batch commits validate every
/// write before applying any of them.
///
#[derive(Debug, Default)]
pub struct InMemory {
    documents: HashMap<Locator, Object>,
    next_id: u64,
}

impl Storage for InMemory {
    /// Loads a new instance of `InMemory`.
    #[inline]
    fn load(_environment: &Environment) -> Result<Self, CoordinatorError> {
        Ok(Self {
            documents: HashMap::default(),
            next_id: 0,
        })
    }

    /// Returns `true` if a given locator exists in storage. Otherwise, returns `false`.
    #[inline]
    fn exists(&self, locator: &Locator) -> bool {
        self.documents.contains_key(locator)
    }

    /// Returns a copy of the document at the given locator, if it exists.
    fn get(&self, locator: &Locator) -> Result<Object, CoordinatorError> {
        match self.documents.get(locator) {
            Some(object) => Ok(object.clone()),
            None => Err(CoordinatorError::StorageLocatorMissing),
        }
    }

    /// Inserts a new document at the given locator, if it does not exist.
    fn insert(&mut self, locator: Locator, object: Object) -> Result<(), CoordinatorError> {
        // Check that the locator does not exist in storage.
        if self.exists(&locator) {
            return Err(CoordinatorError::StorageLocatorAlreadyExists);
        }

        trace!("Inserting {}", locator);
        self.documents.insert(locator, object);

        Ok(())
    }

    /// Updates an existing document at the given locator, if it exists.
    fn update(&mut self, locator: &Locator, object: Object) -> Result<(), CoordinatorError> {
        // Check that the locator exists in storage.
        if !self.exists(locator) {
            return Err(CoordinatorError::StorageLocatorMissing);
        }

        trace!("Updating {}", locator);
        self.documents.insert(locator.clone(), object);

        Ok(())
    }

    /// Returns the documents of a collection matching the given filter,
    /// in stable path order.
    fn query(
        &self,
        collection: &Collection,
        filter: Option<&QueryFilter>,
    ) -> Result<Vec<(Locator, Object)>, CoordinatorError> {
        let mut matches: Vec<(Locator, Object)> = self
            .documents
            .iter()
            .filter(|(locator, _)| collection.contains(locator))
            .filter(|(_, object)| filter.map_or(true, |filter| filter.matches(object)))
            .map(|(locator, object)| (locator.clone(), object.clone()))
            .collect();

        matches.sort_by_key(|(locator, _)| locator.to_path());

        Ok(matches)
    }

    /// Commits the given batch atomically; a failed batch applies nothing.
    fn commit(&mut self, batch: Batch) -> Result<(), CoordinatorError> {
        // Check that every write is applicable before applying any of them.
        for write in batch.writes() {
            match write {
                Write::Insert(locator, _) => {
                    if self.exists(locator) {
                        return Err(CoordinatorError::StorageLocatorAlreadyExists);
                    }
                }
                Write::Update(locator, _) => {
                    if !self.exists(locator) {
                        return Err(CoordinatorError::StorageLocatorMissing);
                    }
                }
            }
        }

        trace!("Committing a batch of {} writes", batch.len());
        for write in batch.writes() {
            match write {
                Write::Insert(locator, object) | Write::Update(locator, object) => {
                    self.documents.insert(locator.clone(), object.clone());
                }
            }
        }

        Ok(())
    }

    /// Returns a fresh unique document ID for auto-ID collections.
    fn generate_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:020}", self.next_id)
    }
}
