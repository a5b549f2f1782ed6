//! # Client configuration
//!
//! [`ConfigEnvironment`] describes which deployment of the platform the client talks to. All
//! service hosts are derived from a single base URL which can be overridden through the
//! environment (see [`ConfigEnvironment::from_env`]).
//!
//! Access tokens are obtained outside of this library. The OAuth client ID and scope carried by
//! the environment are the ones a token for this deployment has to be issued with, and
//! [`ConfigEnvironment::api_host`] is where it is exchanged.

use std::env;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_BASE_URL, DEFAULT_CLIENT_ID, DEFAULT_SCOPE, ENV_BASE_URL, ENV_CHANNELS_URL,
    ENV_CLIENT_ID, ENV_SCOPE,
};

/// Configuration environment of the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfigEnvironment {
    base_url: String,
    client_id: String,
    scope: String,
    #[cfg_attr(feature = "serde", serde(default))]
    channels_url: Option<String>,
}

impl Default for ConfigEnvironment {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ConfigEnvironment {
    /// Creates configuration for a deployment at `base_url` with default OAuth settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            channels_url: None,
        }
    }

    /// Reads configuration from environment variables.
    ///
    /// | Variable            | Default                      |
    /// |---------------------|------------------------------|
    /// | `TQ42_BASE_URL`     | [`DEFAULT_BASE_URL`]         |
    /// | `TQ42_CLIENT_ID`    | [`DEFAULT_CLIENT_ID`]        |
    /// | `TQ42_SCOPE`        | [`DEFAULT_SCOPE`]            |
    /// | `TQ42_CHANNELS_URL` | `https://channels.<base>`    |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut environment =
            Self::new(lookup(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()));
        if let Some(client_id) = lookup(ENV_CLIENT_ID) {
            environment.client_id = client_id;
        }
        if let Some(scope) = lookup(ENV_SCOPE) {
            environment.scope = scope;
        }
        environment.channels_url = lookup(ENV_CHANNELS_URL);
        environment
    }

    /// Overrides URL of the channels endpoint.
    ///
    /// Useful for local deployments where the service is reachable over plain HTTP/2, for
    /// example `http://127.0.0.1:50051`.
    pub fn with_channels_url(mut self, url: impl Into<String>) -> Self {
        self.channels_url = Some(url.into());
        self
    }

    /// Platform domain.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// OAuth client ID that access tokens are issued for.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// OAuth scope that access tokens are requested with.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Host of the main API, which also issues access tokens.
    pub fn api_host(&self) -> String {
        format!("api.{}", self.base_url)
    }

    /// Host of the channels service.
    pub fn channels_host(&self) -> String {
        format!("channels.{}", self.base_url)
    }

    /// URL of the channels endpoint.
    pub fn channels_url(&self) -> String {
        match &self.channels_url {
            Some(url) => url.clone(),
            None => format!("https://{}", self.channels_host()),
        }
    }
}
