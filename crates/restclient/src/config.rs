//! Client configuration and default header values.

use reqwest::{redirect, Client, ClientBuilder};

use crate::error::{RestError, Result};

/// User agent sent when the caller does not provide one.
pub const DEFAULT_USER_AGENT: &str = concat!("restclient/", env!("CARGO_PKG_VERSION"));

/// `Accept` value sent for JSON responses when the caller does not provide one.
pub const JSON_ACCEPT: &str = "application/json";

/// Environment variable names.
pub mod vars {
    /// Overrides [`super::DEFAULT_USER_AGENT`].
    pub const USER_AGENT: &str = "RESTCLIENT_USER_AGENT";
}

/// Header values filled in when a request leaves them unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderDefaults {
    /// `User-Agent` value.
    pub user_agent: String,
    /// `Accept` value for JSON responses.
    pub json_accept: String,
}

impl Default for HeaderDefaults {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            json_accept: JSON_ACCEPT.to_string(),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    /// Default header values.
    pub defaults: HeaderDefaults,
}

impl ClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(user_agent) = std::env::var(vars::USER_AGENT) {
            if !user_agent.trim().is_empty() {
                config.defaults.user_agent = user_agent;
            }
        }

        config
    }

    /// Replace the default user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.defaults.user_agent = user_agent.into();
        self
    }
}

/// Build the underlying transport.
///
/// Redirects are returned to the caller as-is and idle connections are not
/// kept, so each request stands alone. The user agent set here is only a
/// fallback; requests carry their own `User-Agent` header.
pub fn build_client(config: &ClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .user_agent(&config.defaults.user_agent)
        .redirect(redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .build()
        .map_err(RestError::ClientBuild)
}
