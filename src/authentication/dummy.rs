use crate::{
    authentication::{Authentication, AuthenticatedCaller, Claims},
    CoordinatorError,
};

///
/// A dummy authentication scheme for development and tests.
///
/// Tokens have the form `uid:claim[,claim]` where a claim is either
/// `participant` or `coordinator`.
///
pub struct Dummy;

impl Authentication for Dummy {
    /// Returns the name of the authentication scheme.
    fn name(&self) -> String {
        Self::warning();
        "DummyAuthenticationScheme".to_string()
    }

    /// Returns `true` if the authentication scheme is safe for use in production.
    fn is_secure(&self) -> bool {
        Self::warning();
        false
    }

    /// Resolves the given opaque bearer token into an authenticated caller
    /// with its claim set, and returns an error if the token is invalid.
    fn authenticate(&self, token: &str) -> Result<AuthenticatedCaller, CoordinatorError> {
        Self::warning();

        let mut parts = token.splitn(2, ':');
        let uid = match parts.next() {
            Some(uid) if !uid.is_empty() => uid.to_string(),
            _ => return Err(CoordinatorError::UnauthenticatedCaller),
        };

        let mut claims = Claims::default();
        if let Some(names) = parts.next() {
            for name in names.split(',').filter(|name| !name.is_empty()) {
                match name {
                    "participant" => claims.participant = true,
                    "coordinator" => claims.coordinator = true,
                    _ => return Err(CoordinatorError::UnauthenticatedCaller),
                }
            }
        }

        Ok(AuthenticatedCaller::new(uid, claims))
    }
}

impl Dummy {
    /// Outputs an explicit message that the authentication scheme should not be used.
    fn warning() {
        #[cfg(not(test))]
        {
            tracing::warn!("DUMMY AUTHENTICATION SCHEME IS NOT SAFE FOR USE IN PRODUCTION");
        }
    }
}
