//! Client configuration: where to send requests and how to authenticate.

use std::fmt;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";

const API_KEY_PARAM: &str = "hapikey";

/// How requests are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Sent as the `hapikey` query parameter.
    ApiKey(String),
    /// Sent as a bearer token. Refreshing it is the caller's job.
    OAuth { access_token: String },
}

impl Credentials {
    /// Query parameter carrying the credential, if this scheme uses one.
    pub(crate) fn query_param(&self) -> Option<(&'static str, String)> {
        match self {
            Credentials::ApiKey(key) => Some((API_KEY_PARAM, key.clone())),
            Credentials::OAuth { .. } => None,
        }
    }

    /// Header carrying the credential, if this scheme uses one.
    pub(crate) fn header(&self) -> Option<(String, String)> {
        match self {
            Credentials::ApiKey(_) => None,
            Credentials::OAuth { access_token } => {
                Some(("authorization".to_string(), format!("Bearer {access_token}")))
            }
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiKey(_) => f.write_str("ApiKey(***)"),
            Credentials::OAuth { .. } => f.write_str("OAuth { access_token: *** }"),
        }
    }
}

/// Everything a `HubSpotClient` needs to build requests.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub credentials: Credentials,
    /// Portal application id, used by endpoints scoped to an app.
    pub app_id: Option<i64>,
    pub user_agent: Option<String>,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
            app_id: None,
            user_agent: None,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url.to_string()));
        }
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    pub fn with_app_id(mut self, app_id: i64) -> Self {
        self.app_id = Some(app_id);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Read configuration from `HUBSPOT_API_KEY` or `HUBSPOT_ACCESS_TOKEN`,
    /// plus the optional `HUBSPOT_BASE_URL` and `HUBSPOT_APP_ID`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let credentials = match (present("HUBSPOT_API_KEY"), present("HUBSPOT_ACCESS_TOKEN")) {
            (_, Some(access_token)) => Credentials::OAuth { access_token },
            (Some(key), None) => Credentials::ApiKey(key),
            (None, None) => return Err(ConfigError::MissingCredentials),
        };
        let mut config = Self::new(credentials);
        if let Some(base_url) = present("HUBSPOT_BASE_URL") {
            config = config.with_base_url(&base_url)?;
        }
        config.app_id = present("HUBSPOT_APP_ID").and_then(|id| id.trim().parse().ok());
        Ok(config)
    }
}
