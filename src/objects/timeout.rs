use serde::{Deserialize, Serialize};
use serde_aux::prelude::*;
use serde_diff::SerdeDiff;
use std::fmt;

/// Why the scheduler evicted a participant.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde_diff(opaque)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeoutType {
    /// The participant overran its contribution deadline while
    /// downloading, computing, or uploading.
    BlockingContribution,
    /// The verification of the contribution overran its deadline.
    BlockingCloudFunction,
}

impl fmt::Display for TimeoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

///
/// A penalty record created when the scheduler evicts a participant.
///
/// Timeout documents are never mutated; they expire by wall clock and
/// gate when a timed-out participant may retry.
///
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde(rename_all = "camelCase")]
pub struct Timeout {
    id: String,
    #[serde(rename = "type")]
    kind: TimeoutType,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    start_date: i64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    end_date: i64,
}

impl Timeout {
    /// Creates a new instance of `Timeout`.
    #[inline]
    pub fn new(id: String, kind: TimeoutType, start_date: i64, end_date: i64) -> Self {
        Self {
            id,
            kind,
            start_date,
            end_date,
        }
    }

    /// Returns the auto-assigned document ID of the timeout.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the reason for the eviction.
    #[inline]
    pub fn kind(&self) -> TimeoutType {
        self.kind
    }

    /// Returns the start of the penalty in epoch milliseconds.
    #[inline]
    pub fn start_date(&self) -> i64 {
        self.start_date
    }

    /// Returns the end of the penalty in epoch milliseconds.
    #[inline]
    pub fn end_date(&self) -> i64 {
        self.end_date
    }

    /// Returns `true` if the penalty has expired at the given time.
    #[inline]
    pub fn is_expired(&self, now: i64) -> bool {
        self.end_date < now
    }
}
