use crate::Coordinator;

use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
    Outcome,
    State,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The claim set attached to an authenticated caller.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub participant: bool,
    pub coordinator: bool,
}

impl Claims {
    /// Returns `true` if the caller holds at least one recognized claim.
    #[inline]
    pub fn is_authorized(&self) -> bool {
        self.participant || self.coordinator
    }
}

///
/// An authenticated RPC caller.
///
/// The caller UID doubles as the participant document ID — identity is
/// external, ownership is by ID equality.
///
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AuthenticatedCaller {
    uid: String,
    claims: Claims,
}

impl AuthenticatedCaller {
    /// Creates a new instance of `AuthenticatedCaller`.
    #[inline]
    pub fn new(uid: String, claims: Claims) -> Self {
        Self { uid, claims }
    }

    /// Returns the UID of the caller.
    #[inline]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Returns the claim set of the caller.
    #[inline]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

impl fmt::Display for AuthenticatedCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uid)
    }
}

impl<'a, 'r> FromRequest<'a, 'r> for AuthenticatedCaller {
    type Error = String;

    fn from_request(request: &'a Request<'r>) -> request::Outcome<Self, String> {
        // Fetch the bearer token from the authorization header.
        let token = match request.headers().get_one("Authorization") {
            Some(header) => header.trim_start_matches("Bearer").trim(),
            None => {
                return Outcome::Failure((Status::Unauthorized, "Missing authorization header".to_string()));
            }
        };

        // Fetch the coordinator to access its authentication scheme.
        let coordinator = match request.guard::<State<Coordinator>>() {
            Outcome::Success(coordinator) => coordinator,
            _ => {
                return Outcome::Failure((Status::InternalServerError, "Coordinator is unmanaged".to_string()));
            }
        };

        match coordinator.authentication().authenticate(token) {
            Ok(caller) => Outcome::Success(caller),
            Err(error) => Outcome::Failure((Status::Unauthorized, error.to_string())),
        }
    }
}
