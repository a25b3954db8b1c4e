use serde::{Deserialize, Serialize};
use serde_aux::prelude::*;
use serde_diff::SerdeDiff;
use std::fmt;

pub type CeremonyId = String;

/// The lifecycle state of a ceremony. Only OPENED ceremonies accept calls.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde_diff(opaque)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CeremonyState {
    Scheduled,
    Opened,
    Paused,
    Closed,
    Finalized,
}

impl fmt::Display for CeremonyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// How contribution deadlines are derived for the circuits of a ceremony.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde_diff(opaque)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CeremonyTimeoutType {
    /// Deadlines follow the moving average of past full contributions,
    /// widened by the circuit tolerance percentage.
    Dynamic,
    /// Deadlines are a fixed wall-clock window from contribution start.
    Fixed,
}

///
/// A multi-party randomness contribution event over an ordered list of
/// circuits.
///
/// Ceremony documents are created and mutated by the external
/// ceremony-lifecycle; the coordination core only reads them.
///
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, SerdeDiff)]
#[serde(rename_all = "camelCase")]
pub struct Ceremony {
    id: CeremonyId,
    state: CeremonyState,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    start_date: i64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    end_date: i64,
    timeout_type: CeremonyTimeoutType,
    /// Minutes a timed-out participant must wait before retrying.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    penalty: i64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    last_updated: i64,
}

impl Ceremony {
    /// Creates a new instance of `Ceremony`.
    #[inline]
    pub fn new(
        id: CeremonyId,
        state: CeremonyState,
        start_date: i64,
        end_date: i64,
        timeout_type: CeremonyTimeoutType,
        penalty: i64,
        now: i64,
    ) -> Self {
        Self {
            id,
            state,
            start_date,
            end_date,
            timeout_type,
            penalty,
            last_updated: now,
        }
    }

    /// Returns the ID of the ceremony.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the lifecycle state of the ceremony.
    #[inline]
    pub fn state(&self) -> CeremonyState {
        self.state
    }

    /// Returns the scheduled start of the ceremony in epoch milliseconds.
    #[inline]
    pub fn start_date(&self) -> i64 {
        self.start_date
    }

    /// Returns the scheduled end of the ceremony in epoch milliseconds.
    #[inline]
    pub fn end_date(&self) -> i64 {
        self.end_date
    }

    /// Returns the deadline policy of the ceremony.
    #[inline]
    pub fn timeout_type(&self) -> CeremonyTimeoutType {
        self.timeout_type
    }

    /// Returns the retry penalty in minutes.
    #[inline]
    pub fn penalty(&self) -> i64 {
        self.penalty
    }

    /// Returns the retry penalty in milliseconds.
    #[inline]
    pub fn penalty_millis(&self) -> i64 {
        self.penalty * 60_000
    }

    /// Returns `true` if the ceremony is accepting contributions.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == CeremonyState::Opened
    }
}

impl fmt::Display for Ceremony {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
