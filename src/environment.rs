use crate::{
    storage::{InMemory, Storage},
    CoordinatorError,
};

use rocket_cors::{AllowedHeaders, AllowedOrigins, Cors};
use std::time::Duration;
use tracing::Level;
use url::Url;

type VerificationTimeout = i64;
type EvictionInterval = u64;

/// The tuning values of the coordinator:
/// the verification deadline in milliseconds and
/// the interval between eviction scheduler ticks in seconds.
pub type Settings = (VerificationTimeout, EvictionInterval);

#[derive(Debug, Clone)]
pub enum Parameters {
    /// Production tuning: a 59 minute verification deadline and a
    /// scheduler tick once per minute.
    Default,
    /// Shortened tuning for local development runs.
    Quick,
    Custom(Settings),
}

impl Parameters {
    /// Returns the corresponding settings for each parameter type.
    fn to_settings(&self) -> Settings {
        match self {
            Parameters::Default => (3_540_000, 60),
            Parameters::Quick => (30_000, 5),
            Parameters::Custom(settings) => *settings,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Environment {
    Test(Parameters),
    Development(Parameters),
    Production(Parameters),
}

impl Environment {
    /// Returns the parameter settings of the coordinator.
    pub fn to_settings(&self) -> Settings {
        match self {
            Environment::Test(parameters) => parameters.to_settings(),
            Environment::Development(parameters) => parameters.to_settings(),
            Environment::Production(parameters) => parameters.to_settings(),
        }
    }

    ///
    /// Returns the maximum time a contribution verification may run before
    /// its contributor is considered blocking, in milliseconds.
    ///
    pub fn verification_timeout(&self) -> i64 {
        let (verification_timeout, _) = self.to_settings();
        verification_timeout
    }

    /// Returns the interval between eviction scheduler ticks.
    pub fn eviction_interval(&self) -> Duration {
        let (_, eviction_interval) = self.to_settings();
        Duration::from_secs(eviction_interval)
    }

    /// Returns the logging verbosity of the coordinator.
    pub const fn verbosity(&self) -> Level {
        match self {
            Environment::Test(_) => Level::TRACE,
            Environment::Development(_) => Level::DEBUG,
            Environment::Production(_) => Level::INFO,
        }
    }

    /// Returns the network address of the coordinator.
    pub const fn address(&self) -> &str {
        match self {
            Environment::Test(_) => "localhost",
            Environment::Development(_) => "0.0.0.0",
            Environment::Production(_) => "0.0.0.0",
        }
    }

    /// Returns the network port of the coordinator.
    pub const fn port(&self) -> u16 {
        match self {
            Environment::Test(_) => 8080,
            Environment::Development(_) => 8080,
            Environment::Production(_) => 8080,
        }
    }

    /// Returns the base URL for the coordinator.
    pub fn base_url(&self) -> Url {
        format!("http://{}:{}", self.address(), self.port())
            .parse()
            .expect("Unable to parse base URL")
    }

    /// Returns the CORS policy of the server.
    pub fn cors(&self) -> Cors {
        let allowed_origins = match self {
            Environment::Test(_) => AllowedOrigins::all(),
            Environment::Development(_) => AllowedOrigins::all(),
            Environment::Production(_) => AllowedOrigins::all(),
        };

        let allowed_headers = match self {
            Environment::Test(_) => AllowedHeaders::all(),
            Environment::Development(_) => AllowedHeaders::all(),
            Environment::Production(_) => AllowedHeaders::all(),
        };

        Cors {
            allowed_origins,
            allowed_headers,
            allow_credentials: true,
            ..Default::default()
        }
    }

    /// Returns the storage system of the coordinator.
    pub(crate) fn storage(&self) -> Result<Box<dyn Storage>, CoordinatorError> {
        Ok(Box::new(InMemory::load(self)?))
    }
}
