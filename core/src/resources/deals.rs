//! Deals (`/deals/v1`).

use serde_json::Value;

use crate::client::{parse_empty, parse_json, HubSpotClient};
use crate::envelope::{self, EnvelopeSpec, IdField};
use crate::error::{ApiError, Operation};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::list::{decode_list, CursorField, HasMore, ListSpec, Page};
use crate::property::NameKey;
use crate::resources::{ListOptions, ObjectType, RecentOptions};
use crate::types::Deal;

const ROUTE: &str = "/deals/v1";

pub const DEAL: EnvelopeSpec = EnvelopeSpec {
    entity: "deal",
    id: IdField::TopLevel("dealId"),
    properties: Some(NameKey::Name),
};

pub const DEAL_LIST: ListSpec = ListSpec {
    items_key: "deals",
    has_more: HasMore::Flag("hasMore"),
    offset: Some(CursorField::new("offset", "offset")),
    time_offset: None,
    limit_param: "limit",
    default_limit: 250,
    total_key: None,
};

pub const DEAL_RECENT: ListSpec = ListSpec {
    items_key: "results",
    default_limit: 20,
    total_key: Some("total"),
    ..DEAL_LIST
};

#[derive(Debug, Clone, Copy)]
pub struct DealsApi<'a> {
    client: &'a HubSpotClient,
}

impl<'a> DealsApi<'a> {
    pub(crate) fn new(client: &'a HubSpotClient) -> Self {
        Self { client }
    }

    /// Associations on the deal are sent alongside its properties.
    pub fn build_create(&self, deal: &Deal) -> Result<HttpRequest, ApiError> {
        const OP: &str = "deals.create";
        let body = envelope::encode_for_create(deal, &DEAL).during(OP)?;
        Ok(self.send(OP, HttpMethod::Post, "/deal", &[], Some(&body)))
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<Deal, ApiError> {
        parse_deal("deals.create", &response)
    }

    pub fn build_get(&self, id: i64) -> HttpRequest {
        self.send("deals.get", HttpMethod::Get, &format!("/deal/{id}"), &[], None)
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<Deal, ApiError> {
        parse_deal("deals.get", &response)
    }

    pub fn build_update(&self, deal: &Deal) -> Result<HttpRequest, ApiError> {
        const OP: &str = "deals.update";
        let id = envelope::require_id(deal, &DEAL).during(OP)?;
        let body = envelope::encode_for_update(deal, &DEAL).during(OP)?;
        Ok(self.send(OP, HttpMethod::Put, &format!("/deal/{id}"), &[], Some(&body)))
    }

    pub fn parse_update(&self, response: HttpResponse) -> Result<Deal, ApiError> {
        parse_deal("deals.update", &response)
    }

    pub fn build_delete(&self, id: i64) -> HttpRequest {
        self.send("deals.delete", HttpMethod::Delete, &format!("/deal/{id}"), &[], None)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty("deals.delete", &response)
    }

    pub fn build_list(&self, opts: &ListOptions, include_associations: bool) -> HttpRequest {
        let mut query = opts.query(&DEAL_LIST, "properties");
        if include_associations {
            query.push(("includeAssociations", "true".to_string()));
        }
        self.send("deals.list", HttpMethod::Get, "/deal/paged", &query, None)
    }

    /// Parses `build_list` and `build_list_associated` responses.
    pub fn parse_list(&self, response: HttpResponse) -> Result<Page<Deal>, ApiError> {
        parse_deals("deals.list", &response, &DEAL_LIST)
    }

    /// Deals linked to one contact or company.
    pub fn build_list_associated(&self, object: ObjectType, object_id: i64, opts: &ListOptions) -> HttpRequest {
        let route = format!("/deal/associated/{}/{object_id}/paged", object.path_name());
        let query = opts.query(&DEAL_LIST, "properties");
        self.send("deals.list_associated", HttpMethod::Get, &route, &query, None)
    }

    pub fn build_recently_created(&self, opts: &RecentOptions) -> HttpRequest {
        let query = opts.query(&DEAL_RECENT);
        self.send("deals.recently_created", HttpMethod::Get, "/deal/recent/created", &query, None)
    }

    pub fn build_recently_modified(&self, opts: &RecentOptions) -> HttpRequest {
        let query = opts.query(&DEAL_RECENT);
        self.send("deals.recently_modified", HttpMethod::Get, "/deal/recent/modified", &query, None)
    }

    pub fn parse_recent(&self, response: HttpResponse) -> Result<Page<Deal>, ApiError> {
        parse_deals("deals.recent", &response, &DEAL_RECENT)
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

fn parse_deal(operation: &'static str, response: &HttpResponse) -> Result<Deal, ApiError> {
    let raw = parse_json(operation, response)?;
    envelope::decode_single(&raw, &DEAL).during(operation)
}

fn parse_deals(operation: &'static str, response: &HttpResponse, spec: &ListSpec) -> Result<Page<Deal>, ApiError> {
    let raw = parse_json(operation, response)?;
    decode_list(&raw, spec, |item| envelope::decode_single(item, &DEAL)).during(operation)
}
