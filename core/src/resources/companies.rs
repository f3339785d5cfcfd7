//! Companies (`/companies/v2`).

use serde_json::{json, Value};

use crate::client::{parse_empty, parse_json, segment, HubSpotClient};
use crate::envelope::{self, EnvelopeSpec, IdField};
use crate::error::{ApiError, Operation};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::list::{decode_list, CursorField, CursorToken, HasMore, ListSpec, Page};
use crate::property::NameKey;
use crate::resources::ListOptions;
use crate::types::Company;

const ROUTE: &str = "/companies/v2/companies";

pub const COMPANY: EnvelopeSpec = EnvelopeSpec {
    entity: "company",
    id: IdField::TopLevel("companyId"),
    properties: Some(NameKey::Name),
};

pub const COMPANY_LIST: ListSpec = ListSpec {
    items_key: "companies",
    has_more: HasMore::Flag("has-more"),
    offset: Some(CursorField::new("offset", "offset")),
    time_offset: None,
    limit_param: "count",
    default_limit: 100,
    total_key: None,
};

/// Domain search pages are requested through the POST body, and the
/// offset comes back as `{"isPrimary": …, "companyId": …}`.
pub const COMPANY_DOMAIN_SEARCH: ListSpec = ListSpec {
    items_key: "results",
    has_more: HasMore::Flag("hasMore"),
    offset: Some(CursorField::nested("offset", "companyId", "companyId")),
    time_offset: None,
    limit_param: "limit",
    default_limit: 100,
    total_key: None,
};

#[derive(Debug, Clone, Copy)]
pub struct CompaniesApi<'a> {
    client: &'a HubSpotClient,
}

impl<'a> CompaniesApi<'a> {
    pub(crate) fn new(client: &'a HubSpotClient) -> Self {
        Self { client }
    }

    pub fn build_create(&self, company: &Company) -> Result<HttpRequest, ApiError> {
        const OP: &str = "companies.create";
        let body = envelope::encode_for_create(company, &COMPANY).during(OP)?;
        Ok(self.send(OP, HttpMethod::Post, "", &[], Some(&body)))
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<Company, ApiError> {
        parse_company("companies.create", &response)
    }

    pub fn build_get(&self, id: i64) -> HttpRequest {
        self.send("companies.get", HttpMethod::Get, &format!("/{id}"), &[], None)
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<Company, ApiError> {
        parse_company("companies.get", &response)
    }

    /// Full update: every always-emitted field is sent, so `None` clears.
    pub fn build_update(&self, company: &Company) -> Result<HttpRequest, ApiError> {
        const OP: &str = "companies.update";
        let id = envelope::require_id(company, &COMPANY).during(OP)?;
        let body = envelope::encode_for_update(company, &COMPANY).during(OP)?;
        Ok(self.send(OP, HttpMethod::Put, &format!("/{id}"), &[], Some(&body)))
    }

    /// The service echoes the stored company.
    pub fn parse_update(&self, response: HttpResponse) -> Result<Company, ApiError> {
        parse_company("companies.update", &response)
    }

    pub fn build_delete(&self, id: i64) -> HttpRequest {
        self.send("companies.delete", HttpMethod::Delete, &format!("/{id}"), &[], None)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty("companies.delete", &response)
    }

    pub fn build_list(&self, opts: &ListOptions) -> HttpRequest {
        let query = opts.query(&COMPANY_LIST, "properties");
        self.send("companies.list", HttpMethod::Get, "/paged", &query, None)
    }

    pub fn parse_list(&self, response: HttpResponse) -> Result<Page<Company>, ApiError> {
        const OP: &str = "companies.list";
        let raw = parse_json(OP, &response)?;
        decode_list(&raw, &COMPANY_LIST, |item| envelope::decode_single(item, &COMPANY)).during(OP)
    }

    /// Companies whose domain matches `domain`. `opts.properties` selects
    /// the properties returned for each match.
    pub fn build_search_by_domain(&self, domain: &str, opts: &ListOptions) -> HttpRequest {
        let mut body = json!({
            "limit": opts.limit.unwrap_or(COMPANY_DOMAIN_SEARCH.default_limit),
            "requestOptions": {"properties": opts.properties},
        });
        if let Some(token) = opts.cursor.as_ref().and_then(|c| c.offset.as_ref()) {
            let company_id = match token {
                CursorToken::Number(n) => Value::from(*n),
                CursorToken::Text(s) => Value::from(s.as_str()),
            };
            body["offset"] = json!({"isPrimary": true, "companyId": company_id});
        }
        let route = format!("/companies/v2/domains/{}/companies", segment(domain));
        self.client
            .request("companies.search_by_domain", HttpMethod::Post, &route, &[], Some(&body))
    }

    pub fn parse_search_by_domain(&self, response: HttpResponse) -> Result<Page<Company>, ApiError> {
        const OP: &str = "companies.search_by_domain";
        let raw = parse_json(OP, &response)?;
        decode_list(&raw, &COMPANY_DOMAIN_SEARCH, |item| envelope::decode_single(item, &COMPANY)).during(OP)
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

fn parse_company(operation: &'static str, response: &HttpResponse) -> Result<Company, ApiError> {
    let raw = parse_json(operation, response)?;
    envelope::decode_single(&raw, &COMPANY).during(operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, Credentials};
    use crate::error::{ErrorKind, MarshallingError};
    use crate::list::Cursor;
    use serde_json::json;

    fn client() -> HubSpotClient {
        HubSpotClient::new(
            ClientConfig::new(Credentials::OAuth {
                access_token: "tok".into(),
            })
            .with_base_url("http://localhost:3000")
            .unwrap(),
        )
    }

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn create_sends_name_keyed_properties() {
        let company = Company {
            name: Some("Squared Up".into()),
            domain: Some("squaredup.com".into()),
            ..Default::default()
        };
        let client = client();
        let req = client.companies().build_create(&company).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/companies/v2/companies");
        assert_eq!(
            req.json_body().unwrap(),
            json!({"properties": [
                {"name": "name", "value": "Squared Up"},
                {"name": "domain", "value": "squaredup.com"}
            ]})
        );
    }

    #[test]
    fn create_refuses_a_company_that_already_exists() {
        let company = Company {
            id: Some(12),
            ..Default::default()
        };
        let client = client();
        let err = client.companies().build_create(&company).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Marshalling(MarshallingError::UnexpectedId { id: 12, .. })
        ));
    }

    #[test]
    fn update_puts_to_the_company_route() {
        let company = Company {
            id: Some(12),
            name: Some("Renamed".into()),
            ..Default::default()
        };
        let client = client();
        let req = client.companies().build_update(&company).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:3000/companies/v2/companies/12");
        let body = req.json_body().unwrap();
        assert_eq!(body["companyId"], json!(12));
        assert_eq!(body["properties"][1], json!({"name": "domain", "value": null}));
    }

    #[test]
    fn parse_get_reads_typed_properties() {
        let body = r#"{
            "companyId": 12,
            "portalId": 62515,
            "properties": {
                "name": {"value": "Squared Up", "timestamp": 1, "source": "API"},
                "numberofemployees": {"value": "40"},
                "annualrevenue": {"value": "1250000.5"},
                "is_public": {"value": "false"},
                "createdate": {"value": "1457513066540"}
            }
        }"#;
        let client = client();
        let company = client.companies().parse_get(ok(body)).unwrap();
        assert_eq!(company.id, Some(12));
        assert_eq!(company.name.as_deref(), Some("Squared Up"));
        assert_eq!(company.employees, Some(40));
        assert_eq!(company.annual_revenue, Some(1_250_000.5));
        assert_eq!(company.is_public, Some(false));
        assert_eq!(
            company.created_at.map(|d| d.timestamp_millis()),
            Some(1_457_513_066_540)
        );
    }

    #[test]
    fn parse_get_reports_the_offending_property() {
        let body = r#"{"companyId": 1, "properties": {"numberofemployees": {"value": "lots"}}}"#;
        let client = client();
        let err = client.companies().parse_get(ok(body)).unwrap_err();
        assert_eq!(err.operation, "companies.get");
        assert!(matches!(
            err.kind,
            ErrorKind::Marshalling(MarshallingError::Coercion { ref property, .. }) if property == "numberofemployees"
        ));
    }

    #[test]
    fn search_by_domain_posts_paging_in_the_body() {
        let client = client();
        let req = client
            .companies()
            .build_search_by_domain("squaredup.com", &ListOptions::new().with_properties(["name", "domain"]));
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/companies/v2/domains/squaredup.com/companies");
        assert_eq!(
            req.json_body().unwrap(),
            json!({"limit": 100, "requestOptions": {"properties": ["name", "domain"]}})
        );

        let body = r#"{
            "results": [{"companyId": 81, "properties": {"name": {"value": "Squared Up"}}}],
            "hasMore": true,
            "offset": {"isPrimary": true, "companyId": 81}
        }"#;
        let page = client.companies().parse_search_by_domain(ok(body)).unwrap();
        assert_eq!(page.items[0].name.as_deref(), Some("Squared Up"));
        let next = page.next_cursor().cloned().unwrap();
        assert_eq!(next, Cursor::offset(81));

        let req = client
            .companies()
            .build_search_by_domain("squaredup.com", &ListOptions::new().with_limit(2).after(next));
        assert_eq!(
            req.json_body().unwrap(),
            json!({
                "limit": 2,
                "requestOptions": {"properties": []},
                "offset": {"isPrimary": true, "companyId": 81}
            })
        );
    }

    #[test]
    fn list_pages_by_offset() {
        let client = client();
        let req = client.companies().build_list(
            &ListOptions::new()
                .after(Cursor::offset(2))
                .with_properties(["name"]),
        );
        assert_eq!(
            req.path,
            "http://localhost:3000/companies/v2/companies/paged?count=100&offset=2&properties=name"
        );

        let body = r#"{"companies": [{"companyId": 3, "properties": {}}], "has-more": true, "offset": 3}"#;
        let page = client.companies().parse_list(ok(body)).unwrap();
        assert_eq!(page.items[0].id, Some(3));
        assert_eq!(page.next_cursor(), Some(&Cursor::offset(3)));
    }
}
