//! Email campaigns (`/email/public/v1/campaigns`). Read-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::{parse_json, parse_record, HubSpotClient};
use crate::error::{ApiError, MarshallingError, Operation};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::list::{decode_list, CursorField, HasMore, ListSpec, Page};
use crate::resources::ListOptions;

const ROUTE: &str = "/email/public/v1/campaigns";

/// Campaign pages sometimes arrive without `hasMore`; the offset then
/// decides.
pub const CAMPAIGN_LIST: ListSpec = ListSpec {
    items_key: "campaigns",
    has_more: HasMore::FlagOrCursor("hasMore"),
    offset: Some(CursorField::new("offset", "offset")),
    time_offset: None,
    limit_param: "limit",
    default_limit: 250,
    total_key: None,
};

/// Campaign summary as listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailCampaign {
    pub id: i64,
    #[serde(default)]
    pub app_id: Option<i64>,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub last_updated_time: Option<i64>,
}

/// Campaign detail with delivery counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignData {
    pub id: i64,
    #[serde(default)]
    pub app_id: Option<i64>,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub content_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default, rename = "type")]
    pub campaign_type: Option<String>,
    #[serde(default)]
    pub num_included: Option<i64>,
    #[serde(default)]
    pub num_queued: Option<i64>,
    /// `sent`, `delivered`, `open`, `click`, ... keyed as the service names them.
    #[serde(default)]
    pub counters: BTreeMap<String, i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy)]
pub struct CampaignsApi<'a> {
    client: &'a HubSpotClient,
}

impl<'a> CampaignsApi<'a> {
    pub(crate) fn new(client: &'a HubSpotClient) -> Self {
        Self { client }
    }

    /// Every campaign, ordered by id.
    pub fn build_list(&self, opts: &ListOptions) -> HttpRequest {
        let query = CAMPAIGN_LIST.page_params(opts.cursor.as_ref(), opts.limit);
        self.send("campaigns.list", "/by-id", &query)
    }

    /// Campaigns ordered by last update, most recent first.
    pub fn build_recently_updated(&self, opts: &ListOptions) -> HttpRequest {
        let query = CAMPAIGN_LIST.page_params(opts.cursor.as_ref(), opts.limit);
        self.send("campaigns.recently_updated", "", &query)
    }

    pub fn parse_list(&self, response: HttpResponse) -> Result<Page<EmailCampaign>, ApiError> {
        const OP: &str = "campaigns.list";
        let raw = parse_json(OP, &response)?;
        decode_list(&raw, &CAMPAIGN_LIST, |item| {
            serde_json::from_value(item.clone()).map_err(MarshallingError::from)
        })
        .during(OP)
    }

    /// Campaign detail. `app_id` falls back to the configured one; without
    /// either the call fails before a request exists.
    pub fn build_get_data(&self, campaign_id: i64, app_id: Option<i64>) -> Result<HttpRequest, ApiError> {
        const OP: &str = "campaigns.get_data";
        let app_id = app_id
            .or(self.client.config().app_id)
            .ok_or(MarshallingError::MissingField {
                entity: "campaign data",
                field: "appId",
            })
            .during(OP)?;
        Ok(self.send(OP, &format!("/{campaign_id}"), &[("appId", app_id.to_string())]))
    }

    pub fn parse_get_data(&self, response: HttpResponse) -> Result<CampaignData, ApiError> {
        parse_record("campaigns.get_data", &response)
    }

    fn send(&self, operation: &'static str, route: &str, query: &[(&'static str, String)]) -> HttpRequest {
        self.client
            .request(operation, HttpMethod::Get, &format!("{ROUTE}{route}"), query, None)
    }
}
