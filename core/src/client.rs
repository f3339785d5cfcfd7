//! Stateless request builder shared by every resource facade.
//!
//! # Design
//! `HubSpotClient` holds only its `ClientConfig`. Facades borrow it to turn
//! a route, query, and optional JSON body into an authenticated
//! `HttpRequest`, and use the parse helpers here to turn an `HttpResponse`
//! into JSON or a transport error. No state survives between calls, so one
//! client can serve any number of concurrent callers.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorKind, MarshallingError};
use crate::http::{with_query, HttpMethod, HttpRequest, HttpResponse};
use crate::resources::{
    CampaignsApi, CompaniesApi, ContactsApi, DealsApi, EngagementsApi, OwnersApi, PropertiesApi,
    PropertyObject, SubscriptionsApi, TimelineApi,
};

/// Synchronous, stateless client for the CRM API.
#[derive(Debug, Clone)]
pub struct HubSpotClient {
    config: ClientConfig,
}

impl HubSpotClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn contacts(&self) -> ContactsApi<'_> {
        ContactsApi::new(self)
    }

    pub fn companies(&self) -> CompaniesApi<'_> {
        CompaniesApi::new(self)
    }

    pub fn deals(&self) -> DealsApi<'_> {
        DealsApi::new(self)
    }

    pub fn engagements(&self) -> EngagementsApi<'_> {
        EngagementsApi::new(self)
    }

    pub fn campaigns(&self) -> CampaignsApi<'_> {
        CampaignsApi::new(self)
    }

    pub fn subscriptions(&self) -> SubscriptionsApi<'_> {
        SubscriptionsApi::new(self)
    }

    pub fn owners(&self) -> OwnersApi<'_> {
        OwnersApi::new(self)
    }

    /// Timeline events for the application in `ClientConfig::app_id`.
    pub fn timeline(&self) -> TimelineApi<'_> {
        TimelineApi::new(self)
    }

    pub fn contact_properties(&self) -> PropertiesApi<'_> {
        PropertiesApi::new(self, PropertyObject::Contacts)
    }

    pub fn company_properties(&self) -> PropertiesApi<'_> {
        PropertiesApi::new(self, PropertyObject::Companies)
    }

    /// Build an authenticated request for `route` (which starts with `/`).
    pub(crate) fn request(
        &self,
        operation: &'static str,
        method: HttpMethod,
        route: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(header) = self.config.credentials.header() {
            headers.push(header);
        }
        if let Some(agent) = &self.config.user_agent {
            headers.push(("user-agent".to_string(), agent.clone()));
        }
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }

        debug!(operation, %method, route, "building request");

        let mut query = query.to_vec();
        query.extend(self.config.credentials.query_param());
        HttpRequest {
            method,
            path: with_query(format!("{}{route}", self.config.base_url), &query),
            headers,
            body: body.map(Value::to_string),
        }
    }
}

/// Percent-encode one path segment (emails, property names, tokens).
pub(crate) fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Fail with a transport error unless the response is a 2xx.
pub(crate) fn check_status(operation: &'static str, response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    warn!(operation, status = response.status, "request rejected by service");
    Err(ApiError::new(
        operation,
        ErrorKind::Transport {
            status: response.status,
            body: response.body.clone(),
        },
    ))
}

/// Check the status, then parse the body as JSON.
pub(crate) fn parse_json(operation: &'static str, response: &HttpResponse) -> Result<Value, ApiError> {
    check_status(operation, response)?;
    serde_json::from_str(&response.body).map_err(|e| {
        warn!(operation, error = %e, "response body is not valid JSON");
        ApiError::new(operation, MarshallingError::Json(e))
    })
}

/// Check the status, then deserialize the body into a plain serde record.
pub(crate) fn parse_record<T: DeserializeOwned>(operation: &'static str, response: &HttpResponse) -> Result<T, ApiError> {
    let raw = parse_json(operation, response)?;
    serde_json::from_value(raw).map_err(|e| {
        warn!(operation, error = %e, "response does not match the expected record");
        ApiError::new(operation, MarshallingError::Json(e))
    })
}

/// Check the status and ignore the body.
pub(crate) fn parse_empty(operation: &'static str, response: &HttpResponse) -> Result<(), ApiError> {
    check_status(operation, response)
}
