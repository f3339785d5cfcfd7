//! Engagements (`/engagements/v1`): notes, calls, emails, meetings, tasks.

use serde_json::Value;

use crate::client::{parse_empty, parse_json, HubSpotClient};
use crate::envelope::{self, EnvelopeSpec, IdField};
use crate::error::{ApiError, Operation};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::list::{decode_list, CursorField, HasMore, ListSpec, Page};
use crate::resources::{ListOptions, ObjectType, RecentOptions};
use crate::types::Engagement;

const ROUTE: &str = "/engagements/v1/engagements";

pub const ENGAGEMENT: EnvelopeSpec = EnvelopeSpec {
    entity: "engagement",
    id: IdField::Nested("engagement", "id"),
    properties: None,
};

pub const ENGAGEMENT_LIST: ListSpec = ListSpec {
    items_key: "results",
    has_more: HasMore::Flag("hasMore"),
    offset: Some(CursorField::new("offset", "offset")),
    time_offset: None,
    limit_param: "limit",
    default_limit: 250,
    total_key: None,
};

pub const ENGAGEMENT_RECENT: ListSpec = ListSpec {
    limit_param: "count",
    default_limit: 20,
    total_key: Some("total"),
    ..ENGAGEMENT_LIST
};

#[derive(Debug, Clone, Copy)]
pub struct EngagementsApi<'a> {
    client: &'a HubSpotClient,
}

impl<'a> EngagementsApi<'a> {
    pub(crate) fn new(client: &'a HubSpotClient) -> Self {
        Self { client }
    }

    pub fn build_create(&self, engagement: &Engagement) -> Result<HttpRequest, ApiError> {
        const OP: &str = "engagements.create";
        let body = envelope::encode_for_create(engagement, &ENGAGEMENT).during(OP)?;
        Ok(self.send(OP, HttpMethod::Post, "", &[], Some(&body)))
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<Engagement, ApiError> {
        parse_engagement("engagements.create", &response)
    }

    pub fn build_get(&self, id: i64) -> HttpRequest {
        self.send("engagements.get", HttpMethod::Get, &format!("/{id}"), &[], None)
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<Engagement, ApiError> {
        parse_engagement("engagements.get", &response)
    }

    /// Partial update of header, associations and metadata.
    pub fn build_update(&self, engagement: &Engagement) -> Result<HttpRequest, ApiError> {
        const OP: &str = "engagements.update";
        let id = envelope::require_id(engagement, &ENGAGEMENT).during(OP)?;
        let body = envelope::encode_for_update(engagement, &ENGAGEMENT).during(OP)?;
        Ok(self.send(OP, HttpMethod::Patch, &format!("/{id}"), &[], Some(&body)))
    }

    pub fn parse_update(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty("engagements.update", &response)
    }

    pub fn build_delete(&self, id: i64) -> HttpRequest {
        self.send("engagements.delete", HttpMethod::Delete, &format!("/{id}"), &[], None)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty("engagements.delete", &response)
    }

    /// Attach an existing engagement to another record.
    pub fn build_associate(&self, id: i64, object: ObjectType, object_id: i64) -> HttpRequest {
        let route = format!("/{id}/associations/{}/{object_id}", object.as_str());
        self.send("engagements.associate", HttpMethod::Put, &route, &[], None)
    }

    pub fn parse_associate(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty("engagements.associate", &response)
    }

    pub fn build_list(&self, opts: &ListOptions) -> HttpRequest {
        let query = ENGAGEMENT_LIST.page_params(opts.cursor.as_ref(), opts.limit);
        self.send("engagements.list", HttpMethod::Get, "/paged", &query, None)
    }

    /// Parses `build_list` and `build_list_associated` responses.
    pub fn parse_list(&self, response: HttpResponse) -> Result<Page<Engagement>, ApiError> {
        parse_engagements("engagements.list", &response, &ENGAGEMENT_LIST)
    }

    pub fn build_list_associated(&self, object: ObjectType, object_id: i64, opts: &ListOptions) -> HttpRequest {
        let route = format!("/associated/{}/{object_id}/paged", object.as_str());
        let query = ENGAGEMENT_LIST.page_params(opts.cursor.as_ref(), opts.limit);
        self.send("engagements.list_associated", HttpMethod::Get, &route, &query, None)
    }

    pub fn build_recently_modified(&self, opts: &RecentOptions) -> HttpRequest {
        let query = opts.query(&ENGAGEMENT_RECENT);
        self.send(
            "engagements.recently_modified",
            HttpMethod::Get,
            "/recent/modified",
            &query,
            None,
        )
    }

    pub fn parse_recent(&self, response: HttpResponse) -> Result<Page<Engagement>, ApiError> {
        parse_engagements("engagements.recent", &response, &ENGAGEMENT_RECENT)
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

fn parse_engagement(operation: &'static str, response: &HttpResponse) -> Result<Engagement, ApiError> {
    let raw = parse_json(operation, response)?;
    envelope::decode_single(&raw, &ENGAGEMENT).during(operation)
}

fn parse_engagements(
    operation: &'static str,
    response: &HttpResponse,
    spec: &ListSpec,
) -> Result<Page<Engagement>, ApiError> {
    let raw = parse_json(operation, response)?;
    decode_list(&raw, spec, |item| envelope::decode_single(item, &ENGAGEMENT)).during(operation)
}
