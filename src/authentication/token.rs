use crate::{authentication::AuthenticatedCaller, CoordinatorError};

/// A core structure for authentication of RPC callers.
pub trait Authentication: Send + Sync {
    /// Returns the name of the authentication scheme.
    fn name(&self) -> String;

    /// Returns `true` if the authentication scheme is safe for use in production.
    fn is_secure(&self) -> bool;

    /// Resolves the given opaque bearer token into an authenticated caller
    /// with its claim set, and returns an error if the token is invalid.
    fn authenticate(&self, token: &str) -> Result<AuthenticatedCaller, CoordinatorError>;
}
