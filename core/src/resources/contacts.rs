//! Contacts (`/contacts/v1`).

use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::{check_status, parse_empty, parse_json, parse_record, segment, HubSpotClient};
use crate::codec;
use crate::envelope::{self, EnvelopeSpec, IdField};
use crate::error::{ApiError, MarshallingError, Operation};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::list::{decode_list, CursorField, HasMore, ListSpec, Page};
use crate::property::NameKey;
use crate::resources::ListOptions;
use crate::types::Contact;

const ROUTE: &str = "/contacts/v1";

pub const CONTACT: EnvelopeSpec = EnvelopeSpec {
    entity: "contact",
    id: IdField::TopLevel("vid"),
    properties: Some(NameKey::Property),
};

pub const CONTACT_LIST: ListSpec = ListSpec {
    items_key: "contacts",
    has_more: HasMore::Flag("has-more"),
    offset: Some(CursorField::new("vid-offset", "vidOffset")),
    time_offset: None,
    limit_param: "count",
    default_limit: 20,
    total_key: None,
};

pub const CONTACT_RECENT: ListSpec = ListSpec {
    time_offset: Some(CursorField::new("time-offset", "timeOffset")),
    ..CONTACT_LIST
};

pub const CONTACT_SEARCH: ListSpec = ListSpec {
    offset: Some(CursorField::new("offset", "offset")),
    total_key: Some("total"),
    ..CONTACT_LIST
};

/// Result of a create-or-update by email.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpsertOutcome {
    #[serde(rename = "vid")]
    pub id: i64,
    #[serde(rename = "isNew", default)]
    pub is_new: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ContactsApi<'a> {
    client: &'a HubSpotClient,
}

impl<'a> ContactsApi<'a> {
    pub(crate) fn new(client: &'a HubSpotClient) -> Self {
        Self { client }
    }

    pub fn build_create(&self, contact: &Contact) -> Result<HttpRequest, ApiError> {
        const OP: &str = "contacts.create";
        let body = envelope::encode_for_create(contact, &CONTACT).during(OP)?;
        Ok(self.send(OP, HttpMethod::Post, "/contact", &[], Some(&body)))
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<Contact, ApiError> {
        parse_contact("contacts.create", &response)
    }

    /// Create or update keyed on the contact's own `email` property.
    pub fn build_create_or_update(&self, contact: &Contact) -> Result<HttpRequest, ApiError> {
        const OP: &str = "contacts.create_or_update";
        let bag = codec::encode(contact);
        let email = bag
            .get("email")
            .and_then(|v| v.as_text())
            .filter(|email| !email.is_empty())
            .ok_or(MarshallingError::MissingField {
                entity: CONTACT.entity,
                field: "email",
            })
            .during(OP)?;
        let route = format!("/contact/createOrUpdate/email/{}", segment(&email));
        let body = json!({ "properties": bag.to_wire(NameKey::Property) });
        Ok(self.send(OP, HttpMethod::Post, &route, &[], Some(&body)))
    }

    /// Create or update the contact the service knows as `original_email`,
    /// for when the entity's email is itself being changed.
    pub fn build_create_or_update_by_email(&self, original_email: &str, contact: &Contact) -> Result<HttpRequest, ApiError> {
        const OP: &str = "contacts.create_or_update";
        if original_email.is_empty() {
            return Err(ApiError::new(
                OP,
                MarshallingError::MissingField {
                    entity: CONTACT.entity,
                    field: "email",
                },
            ));
        }
        let route = format!("/contact/createOrUpdate/email/{}", segment(original_email));
        let body = json!({ "properties": codec::encode(contact).to_wire(NameKey::Property) });
        Ok(self.send(OP, HttpMethod::Post, &route, &[], Some(&body)))
    }

    pub fn parse_create_or_update(&self, response: HttpResponse) -> Result<UpsertOutcome, ApiError> {
        parse_record("contacts.create_or_update", &response)
    }

    /// Fetch by id. Without history the service returns current values only.
    pub fn build_get(&self, id: i64, include_history: bool) -> HttpRequest {
        self.profile("contacts.get", &format!("/contact/vid/{id}/profile"), include_history)
    }

    pub fn build_get_by_email(&self, email: &str, include_history: bool) -> HttpRequest {
        let route = format!("/contact/email/{}/profile", segment(email));
        self.profile("contacts.get_by_email", &route, include_history)
    }

    /// Fetch by the `hubspotutk` tracking cookie value.
    pub fn build_get_by_user_token(&self, token: &str, include_history: bool) -> HttpRequest {
        let route = format!("/contact/utk/{}/profile", segment(token));
        self.profile("contacts.get_by_user_token", &route, include_history)
    }

    pub fn parse_get(&self, response: HttpResponse) -> Result<Contact, ApiError> {
        parse_contact("contacts.get", &response)
    }

    pub fn build_update(&self, contact: &Contact) -> Result<HttpRequest, ApiError> {
        const OP: &str = "contacts.update";
        let id = envelope::require_id(contact, &CONTACT).during(OP)?;
        let body = envelope::encode_for_update(contact, &CONTACT).during(OP)?;
        let route = format!("/contact/vid/{id}/profile");
        Ok(self.send(OP, HttpMethod::Post, &route, &[], Some(&body)))
    }

    /// The service answers updates with an empty 204.
    pub fn parse_update(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty("contacts.update", &response)
    }

    pub fn build_delete(&self, id: i64) -> HttpRequest {
        self.send("contacts.delete", HttpMethod::Delete, &format!("/contact/vid/{id}"), &[], None)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty("contacts.delete", &response)
    }

    /// Create or update many contacts in one call, keyed by email (or vid
    /// when set). Every item is encoded before the request exists, so a bad
    /// item means nothing is sent.
    pub fn build_batch(&self, contacts: &[Contact]) -> Result<HttpRequest, ApiError> {
        const OP: &str = "contacts.batch";
        let items = contacts
            .iter()
            .map(|contact| {
                let item = envelope::encode_batch_item(contact, &CONTACT)?;
                if item["email"].is_null() && contact.id.unwrap_or(0) < 1 {
                    return Err(MarshallingError::MissingField {
                        entity: CONTACT.entity,
                        field: "email",
                    });
                }
                Ok(item)
            })
            .collect::<Result<Vec<Value>, _>>()
            .during(OP)?;
        let body = Value::Array(items);
        Ok(self.send(OP, HttpMethod::Post, "/contact/batch", &[], Some(&body)))
    }

    /// Per-item failures come back verbatim in the transport error body.
    pub fn parse_batch(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status("contacts.batch", &response)
    }

    pub fn build_list(&self, opts: &ListOptions) -> HttpRequest {
        let query = opts.query(&CONTACT_LIST, "property");
        self.send("contacts.list", HttpMethod::Get, "/lists/all/contacts/all", &query, None)
    }

    pub fn parse_list(&self, response: HttpResponse) -> Result<Page<Contact>, ApiError> {
        parse_contacts("contacts.list", &response, &CONTACT_LIST)
    }

    pub fn build_recently_updated(&self, opts: &ListOptions) -> HttpRequest {
        let query = opts.query(&CONTACT_RECENT, "property");
        self.send(
            "contacts.recently_updated",
            HttpMethod::Get,
            "/lists/recently_updated/contacts/recent",
            &query,
            None,
        )
    }

    pub fn build_recently_created(&self, opts: &ListOptions) -> HttpRequest {
        let query = opts.query(&CONTACT_RECENT, "property");
        self.send(
            "contacts.recently_created",
            HttpMethod::Get,
            "/lists/all/contacts/recent",
            &query,
            None,
        )
    }

    /// Parses both recently-updated and recently-created feeds.
    pub fn parse_recent(&self, response: HttpResponse) -> Result<Page<Contact>, ApiError> {
        parse_contacts("contacts.recent", &response, &CONTACT_RECENT)
    }

    pub fn build_search(&self, query_text: &str, opts: &ListOptions) -> HttpRequest {
        let mut query = vec![("q", query_text.to_string())];
        query.extend(opts.query(&CONTACT_SEARCH, "property"));
        self.send("contacts.search", HttpMethod::Get, "/search/query", &query, None)
    }

    pub fn parse_search(&self, response: HttpResponse) -> Result<Page<Contact>, ApiError> {
        parse_contacts("contacts.search", &response, &CONTACT_SEARCH)
    }

    fn profile(&self, operation: &'static str, route: &str, include_history: bool) -> HttpRequest {
        let query = if include_history {
            Vec::new()
        } else {
            vec![("propertyMode", "value_only".to_string())]
        };
        self.send(operation, HttpMethod::Get, route, &query, None)
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

fn parse_contact(operation: &'static str, response: &HttpResponse) -> Result<Contact, ApiError> {
    let raw = parse_json(operation, response)?;
    envelope::decode_single(&raw, &CONTACT).during(operation)
}

fn parse_contacts(operation: &'static str, response: &HttpResponse, spec: &ListSpec) -> Result<Page<Contact>, ApiError> {
    let raw = parse_json(operation, response)?;
    decode_list(&raw, spec, |item| envelope::decode_single(item, &CONTACT)).during(operation)
}
