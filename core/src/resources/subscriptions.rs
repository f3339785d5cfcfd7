//! Email subscription preferences (`/email/public/v1/subscriptions`).
//!
//! # Design
//! Subscribing to a type id that the portal does not define is rejected by
//! the service only after the fact. Per-id builders therefore check ids
//! against a `SubscriptionTypeList` the caller fetched earlier and fail with
//! a `LookupError` before any request exists. The many-id builders check
//! every id first, so they return either all requests or none.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::{parse_empty, parse_json, parse_record, segment, HubSpotClient};
use crate::error::{ApiError, LookupError, Operation};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::list::{decode_list, CursorField, HasMore, ListSpec, Page};
use crate::resources::ListOptions;

const ROUTE: &str = "/email/public/v1/subscriptions";

pub const TIMELINE_LIST: ListSpec = ListSpec {
    items_key: "timeline",
    has_more: HasMore::Flag("hasMore"),
    offset: Some(CursorField::new("offset", "offset")),
    time_offset: None,
    limit_param: "limit",
    default_limit: 1000,
    total_key: None,
};

/// One subscription type defined by the portal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionType {
    pub id: i64,
    #[serde(default)]
    pub portal_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

/// The portal's subscription types as last fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionTypeList {
    #[serde(rename = "subscriptionDefinitions", default)]
    pub types: Vec<SubscriptionType>,
}

impl SubscriptionTypeList {
    pub fn find(&self, id: i64) -> Option<&SubscriptionType> {
        self.types.iter().find(|t| t.id == id)
    }

    fn require(&self, id: i64) -> Result<&SubscriptionType, LookupError> {
        self.find(id).ok_or_else(|| LookupError {
            resource: "subscription type",
            key: id.to_string(),
        })
    }
}

wire_enum! {
    /// GDPR opt state attached to a subscription change.
    pub enum OptState {
        OptIn => "OPT_IN",
        OptOut => "OPT_OUT",
        NotOpted => "NOT_OPTED",
    }
}

wire_enum! {
    /// GDPR legal basis for processing a contact's data.
    pub enum LegalBasis {
        LegitimateInterestPql => "LEGITIMATE_INTEREST_PQL",
        LegitimateInterestClient => "LEGITIMATE_INTEREST_CLIENT",
        PerformanceOfContract => "PERFORMANCE_OF_CONTRACT",
        ConsentWithNotice => "CONSENT_WITH_NOTICE",
        NonGdpr => "NON_GDPR",
        ProcessAndStore => "PROCESS_AND_STORE",
        LegitimateInterestOther => "LEGITIMATE_INTEREST_OTHER",
    }
}

/// Legal basis and opt state recorded with a subscribe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consent {
    pub legal_basis: LegalBasis,
    pub explanation: String,
    pub opt_state: OptState,
}

impl Consent {
    /// Opt-in under `legal_basis`.
    pub fn new(legal_basis: LegalBasis, explanation: impl Into<String>) -> Self {
        Self {
            legal_basis,
            explanation: explanation.into(),
            opt_state: OptState::OptIn,
        }
    }

    pub fn with_opt_state(mut self, opt_state: OptState) -> Self {
        self.opt_state = opt_state;
        self
    }
}

/// Subscription state for one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusDetail {
    pub id: i64,
    pub subscribed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opt_state: Option<OptState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_basis: Option<LegalBasis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_basis_explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl SubscriptionStatusDetail {
    fn change(id: i64, subscribed: bool, opt_state: OptState, consent: Option<&Consent>) -> Self {
        Self {
            id,
            subscribed,
            opt_state: Some(consent.map_or(opt_state, |c| c.opt_state)),
            legal_basis: consent.map(|c| c.legal_basis),
            legal_basis_explanation: consent.map(|c| c.explanation.clone()),
            updated_at: None,
        }
    }
}

/// Subscription state of one email address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionStatus {
    pub subscribed: bool,
    pub marked_as_spam: bool,
    pub unsubscribe_from_portal: bool,
    pub bounced: bool,
    pub email: Option<String>,
    pub status: Option<String>,
    pub subscription_statuses: Vec<SubscriptionStatusDetail>,
}

/// One entry of the subscription change timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionChange {
    pub portal_id: Option<i64>,
    pub recipient: String,
    pub timestamp: Option<i64>,
    pub changes: Vec<Value>,
}

#[derive(Debug, Clone, Copy)]
pub struct SubscriptionsApi<'a> {
    client: &'a HubSpotClient,
}

impl<'a> SubscriptionsApi<'a> {
    pub(crate) fn new(client: &'a HubSpotClient) -> Self {
        Self { client }
    }

    pub fn build_get_types(&self) -> HttpRequest {
        self.send("subscriptions.get_types", HttpMethod::Get, "", &[], None)
    }

    pub fn parse_get_types(&self, response: HttpResponse) -> Result<SubscriptionTypeList, ApiError> {
        parse_record("subscriptions.get_types", &response)
    }

    pub fn build_get_status(&self, email: &str) -> HttpRequest {
        self.send("subscriptions.get_status", HttpMethod::Get, &email_route(email), &[], None)
    }

    pub fn parse_get_status(&self, response: HttpResponse) -> Result<SubscriptionStatus, ApiError> {
        parse_record("subscriptions.get_status", &response)
    }

    pub fn build_timeline(&self, opts: &ListOptions) -> HttpRequest {
        let query = TIMELINE_LIST.page_params(opts.cursor.as_ref(), opts.limit);
        self.send("subscriptions.timeline", HttpMethod::Get, "/timeline", &query, None)
    }

    pub fn parse_timeline(&self, response: HttpResponse) -> Result<Page<SubscriptionChange>, ApiError> {
        const OP: &str = "subscriptions.timeline";
        let raw = parse_json(OP, &response)?;
        decode_list(&raw, &TIMELINE_LIST, |item| Ok(serde_json::from_value(item.clone())?)).during(OP)
    }

    pub fn build_unsubscribe_all(&self, email: &str) -> HttpRequest {
        let body = json!({ "unsubscribeFromAll": true });
        self.send("subscriptions.unsubscribe_all", HttpMethod::Put, &email_route(email), &[], Some(&body))
    }

    /// Opt in to every type in `known`.
    pub fn build_subscribe_all(&self, email: &str, known: &SubscriptionTypeList, consent: Option<&Consent>) -> HttpRequest {
        let statuses = known
            .types
            .iter()
            .map(|t| SubscriptionStatusDetail::change(t.id, true, OptState::OptIn, consent))
            .collect();
        self.status_change("subscriptions.subscribe_all", email, statuses)
    }

    pub fn build_subscribe_to(
        &self,
        email: &str,
        id: i64,
        known: &SubscriptionTypeList,
        consent: Option<&Consent>,
    ) -> Result<HttpRequest, ApiError> {
        const OP: &str = "subscriptions.subscribe_to";
        let subscription = known.require(id).during(OP)?;
        let status = SubscriptionStatusDetail::change(subscription.id, true, OptState::OptIn, consent);
        Ok(self.status_change(OP, email, vec![status]))
    }

    /// One request per id, or an error naming the first unknown id.
    pub fn build_subscribe_to_many(
        &self,
        email: &str,
        ids: &[i64],
        known: &SubscriptionTypeList,
        consent: Option<&Consent>,
    ) -> Result<Vec<HttpRequest>, ApiError> {
        validate_all("subscriptions.subscribe_to", ids, known)?;
        ids.iter()
            .map(|id| self.build_subscribe_to(email, *id, known, consent))
            .collect()
    }

    pub fn build_unsubscribe_from(&self, email: &str, id: i64, known: &SubscriptionTypeList) -> Result<HttpRequest, ApiError> {
        const OP: &str = "subscriptions.unsubscribe_from";
        let subscription = known.require(id).during(OP)?;
        let status = SubscriptionStatusDetail::change(subscription.id, false, OptState::OptOut, None);
        Ok(self.status_change(OP, email, vec![status]))
    }

    pub fn build_unsubscribe_from_many(
        &self,
        email: &str,
        ids: &[i64],
        known: &SubscriptionTypeList,
    ) -> Result<Vec<HttpRequest>, ApiError> {
        validate_all("subscriptions.unsubscribe_from", ids, known)?;
        ids.iter()
            .map(|id| self.build_unsubscribe_from(email, *id, known))
            .collect()
    }

    /// Parses the reply to any subscription change; the service sends no body.
    pub fn parse_change(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty("subscriptions.change", &response)
    }

    fn status_change(&self, operation: &'static str, email: &str, statuses: Vec<SubscriptionStatusDetail>) -> HttpRequest {
        let body = json!({ "subscriptionStatuses": statuses });
        self.send(operation, HttpMethod::Put, &email_route(email), &[], Some(&body))
    }

    fn send(
        &self,
        operation: &'static str,
        method: HttpMethod,
        route: &str,
        query: &[(&'static str, String)],
        body: Option<&Value>,
    ) -> HttpRequest {
        self.client
            .request(operation, method, &format!("{ROUTE}{route}"), query, body)
    }
}

fn email_route(email: &str) -> String {
    format!("/{}", segment(email))
}

fn validate_all(operation: &'static str, ids: &[i64], known: &SubscriptionTypeList) -> Result<(), ApiError> {
    ids.iter()
        .try_for_each(|id| known.require(*id).map(|_| ()))
        .during(operation)
}
