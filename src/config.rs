//! Environment configuration.
//!
//! Credentials for the Strava API and the webhook verify token are read from
//! the environment. `ROUTE_CATALOG_PATH` optionally points at a static JSON
//! catalog; without it routes are fetched from the athlete's saved routes.

use std::fmt;
use std::path::PathBuf;

use crate::{Result, RouteEffortsError};

pub const CLIENT_ID_VAR: &str = "STRAVA_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "STRAVA_CLIENT_SECRET";
pub const REFRESH_TOKEN_VAR: &str = "STRAVA_REFRESH_TOKEN";
pub const VERIFY_TOKEN_VAR: &str = "STRAVA_VERIFY_TOKEN";
pub const CATALOG_PATH_VAR: &str = "ROUTE_CATALOG_PATH";

/// Strava credentials and webhook settings.
#[derive(Clone, PartialEq, Eq)]
pub struct StravaConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub verify_token: String,
    /// Static route catalog; `None` means use the live saved routes
    pub catalog_path: Option<PathBuf>,
}

impl StravaConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| RouteEffortsError::Config {
                    message: format!("{} is not set", key),
                })
        };

        Ok(Self {
            client_id: required(CLIENT_ID_VAR)?,
            client_secret: required(CLIENT_SECRET_VAR)?,
            refresh_token: required(REFRESH_TOKEN_VAR)?,
            verify_token: required(VERIFY_TOKEN_VAR)?,
            catalog_path: lookup(CATALOG_PATH_VAR)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        })
    }
}

impl fmt::Debug for StravaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StravaConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("verify_token", &"[REDACTED]")
            .field("catalog_path", &self.catalog_path)
            .finish()
    }
}
