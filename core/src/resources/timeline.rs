//! Timeline events and event types (`/integrations/v1/{appId}/timeline`).
//!
//! # Design
//! Every route is scoped to the application in `ClientConfig::app_id`, so
//! each builder fails with `MissingField` before a request exists when no
//! app id is configured. Events are keyed by a caller-chosen string id and
//! written with a single create-or-update PUT.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::{parse_empty, parse_record, segment, HubSpotClient};
use crate::error::{ApiError, MarshallingError, Operation};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// One event on a contact's, company's or deal's timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    /// Chosen by the caller; writing the same id again updates the event.
    pub id: String,
    pub event_type_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<i64>,
    /// Tracking cookie token, the third way to name the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utk: Option<String>,
    /// Epoch milliseconds; the service uses the write time when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Values the event type's templates render.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra_data: Map<String, Value>,
}

/// A kind of timeline event defined by the application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEventType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_template: Option<String>,
    /// `CONTACT`, `COMPANY` or `DEAL`; contacts when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct TimelineApi<'a> {
    client: &'a HubSpotClient,
}

impl<'a> TimelineApi<'a> {
    pub(crate) fn new(client: &'a HubSpotClient) -> Self {
        Self { client }
    }

    pub fn build_create_or_update_event(&self, event: &TimelineEvent) -> Result<HttpRequest, ApiError> {
        const OP: &str = "timeline.put_event";
        let body = event_body(event).during(OP)?;
        self.send(OP, HttpMethod::Put, "/event", Some(&body))
    }

    /// The service answers a stored event with 204.
    pub fn parse_create_or_update_event(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty("timeline.put_event", &response)
    }

    pub fn build_get_event(&self, event_type_id: i64, event_id: &str) -> Result<HttpRequest, ApiError> {
        let route = format!("/event/{event_type_id}/{}", segment(event_id));
        self.send("timeline.get_event", HttpMethod::Get, &route, None)
    }

    pub fn parse_get_event(&self, response: HttpResponse) -> Result<TimelineEvent, ApiError> {
        parse_record("timeline.get_event", &response)
    }

    pub fn build_list_event_types(&self) -> Result<HttpRequest, ApiError> {
        self.send("timeline.list_event_types", HttpMethod::Get, "/event-types", None)
    }

    pub fn parse_list_event_types(&self, response: HttpResponse) -> Result<Vec<TimelineEventType>, ApiError> {
        parse_record("timeline.list_event_types", &response)
    }

    pub fn build_create_event_type(&self, event_type: &TimelineEventType) -> Result<HttpRequest, ApiError> {
        const OP: &str = "timeline.create_event_type";
        if let Some(id) = event_type.id.filter(|id| *id >= 1) {
            return Err(MarshallingError::UnexpectedId {
                entity: "timeline event type",
                id,
            })
            .during(OP);
        }
        let body = event_type_body(event_type).during(OP)?;
        self.send(OP, HttpMethod::Post, "/event-types", Some(&body))
    }

    pub fn parse_create_event_type(&self, response: HttpResponse) -> Result<TimelineEventType, ApiError> {
        parse_record("timeline.create_event_type", &response)
    }

    pub fn build_update_event_type(&self, event_type: &TimelineEventType) -> Result<HttpRequest, ApiError> {
        const OP: &str = "timeline.update_event_type";
        let id = event_type
            .id
            .filter(|id| *id >= 1)
            .ok_or(MarshallingError::MissingId {
                entity: "timeline event type",
            })
            .during(OP)?;
        let body = event_type_body(event_type).during(OP)?;
        self.send(OP, HttpMethod::Put, &format!("/event-types/{id}"), Some(&body))
    }

    pub fn parse_update_event_type(&self, response: HttpResponse) -> Result<TimelineEventType, ApiError> {
        parse_record("timeline.update_event_type", &response)
    }

    pub fn build_delete_event_type(&self, id: i64) -> Result<HttpRequest, ApiError> {
        self.send("timeline.delete_event_type", HttpMethod::Delete, &format!("/event-types/{id}"), None)
    }

    pub fn parse_delete_event_type(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty("timeline.delete_event_type", &response)
    }

    fn send(
        &self,
        operation: &'static str,
        method: HttpMethod,
        route: &str,
        body: Option<&Value>,
    ) -> Result<HttpRequest, ApiError> {
        let app_id = self
            .client
            .config()
            .app_id
            .ok_or(MarshallingError::MissingField {
                entity: "timeline",
                field: "appId",
            })
            .during(operation)?;
        let route = format!("/integrations/v1/{app_id}/timeline{route}");
        Ok(self.client.request(operation, method, &route, &[], body))
    }
}

fn event_body(event: &TimelineEvent) -> Result<Value, MarshallingError> {
    if event.id.trim().is_empty() {
        return Err(MarshallingError::MissingField {
            entity: "timeline event",
            field: "id",
        });
    }
    if event.email.is_none() && event.object_id.is_none() && event.utk.is_none() {
        return Err(MarshallingError::MissingField {
            entity: "timeline event",
            field: "email",
        });
    }
    Ok(serde_json::to_value(event)?)
}

fn event_type_body(event_type: &TimelineEventType) -> Result<Value, MarshallingError> {
    if event_type.name.trim().is_empty() {
        return Err(MarshallingError::MissingField {
            entity: "timeline event type",
            field: "name",
        });
    }
    Ok(serde_json::to_value(event_type)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, Credentials};
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client(app_id: Option<i64>) -> HubSpotClient {
        let mut config = ClientConfig::new(Credentials::OAuth {
            access_token: "t".into(),
        })
        .with_base_url("http://localhost:3000")
        .unwrap();
        if let Some(id) = app_id {
            config = config.with_app_id(id);
        }
        HubSpotClient::new(config)
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    fn signup() -> TimelineEvent {
        let mut extra_data = Map::new();
        extra_data.insert("plan".into(), json!("pro"));
        TimelineEvent {
            id: "signup-1".into(),
            event_type_id: 305,
            email: Some("ada@example.com".into()),
            timestamp: Some(1_520_000_000_000),
            extra_data,
            ..Default::default()
        }
    }

    fn missing_field(err: &ApiError) -> Option<&'static str> {
        match &err.kind {
            ErrorKind::Marshalling(MarshallingError::MissingField { field, .. }) => Some(*field),
            _ => None,
        }
    }

    #[test]
    fn events_are_put_under_the_app_route() {
        let client = client(Some(113));
        let req = client.timeline().build_create_or_update_event(&signup()).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:3000/integrations/v1/113/timeline/event");
        assert_eq!(
            req.json_body().unwrap(),
            json!({
                "id": "signup-1",
                "eventTypeId": 305,
                "email": "ada@example.com",
                "timestamp": 1520000000000_i64,
                "extraData": {"plan": "pro"}
            })
        );
        client
            .timeline()
            .parse_create_or_update_event(response(204, ""))
            .unwrap();
    }

    #[test]
    fn every_route_needs_an_app_id() {
        let client = client(None);
        let timeline = client.timeline();
        let errors = [
            timeline.build_create_or_update_event(&signup()).unwrap_err(),
            timeline.build_get_event(305, "signup-1").unwrap_err(),
            timeline.build_list_event_types().unwrap_err(),
            timeline.build_delete_event_type(305).unwrap_err(),
        ];
        for err in &errors {
            assert_eq!(missing_field(err), Some("appId"), "{}", err.operation);
        }
    }

    #[test]
    fn events_need_an_id_and_a_target() {
        let client = client(Some(113));
        let mut event = signup();
        event.id = " ".into();
        let err = client.timeline().build_create_or_update_event(&event).unwrap_err();
        assert_eq!(missing_field(&err), Some("id"));

        let mut event = signup();
        event.email = None;
        assert!(client.timeline().build_create_or_update_event(&event).is_err());
        event.object_id = Some(42);
        assert!(client.timeline().build_create_or_update_event(&event).is_ok());
    }

    #[test]
    fn get_event_reads_the_stored_event() {
        let client = client(Some(113));
        let req = client.timeline().build_get_event(305, "signup 1").unwrap();
        assert_eq!(
            req.path,
            "http://localhost:3000/integrations/v1/113/timeline/event/305/signup%201"
        );

        let body = r#"{"id": "signup-1", "eventTypeId": 305, "objectId": 9, "extraData": {"plan": "pro"}}"#;
        let event = client.timeline().parse_get_event(response(200, body)).unwrap();
        assert_eq!(event.object_id, Some(9));
        assert_eq!(event.extra_data["plan"], json!("pro"));
    }

    #[test]
    fn event_types_follow_create_and_update_rules() {
        let client = client(Some(113));
        let timeline = client.timeline();
        let mut event_type = TimelineEventType {
            name: "Signed up".into(),
            header_template: Some("Signed up for {{plan}}".into()),
            ..Default::default()
        };

        let req = timeline.build_create_event_type(&event_type).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/integrations/v1/113/timeline/event-types");
        assert_eq!(
            req.json_body().unwrap(),
            json!({"name": "Signed up", "headerTemplate": "Signed up for {{plan}}"})
        );

        let err = timeline.build_update_event_type(&event_type).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Marshalling(MarshallingError::MissingId { .. })));

        event_type.id = Some(305);
        assert!(timeline.build_create_event_type(&event_type).is_err());
        let req = timeline.build_update_event_type(&event_type).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert!(req.path.ends_with("/timeline/event-types/305"));

        event_type.name = String::new();
        let err = timeline.build_update_event_type(&event_type).unwrap_err();
        assert_eq!(missing_field(&err), Some("name"));
    }

    #[test]
    fn event_types_list_as_a_bare_array() {
        let client = client(Some(113));
        let body = r#"[{"id": 305, "applicationId": 113, "name": "Signed up", "objectType": "CONTACT"}]"#;
        let types = client
            .timeline()
            .parse_list_event_types(response(200, body))
            .unwrap();
        assert_eq!(types[0].id, Some(305));
        assert_eq!(types[0].object_type.as_deref(), Some("CONTACT"));

        let err = client
            .timeline()
            .parse_delete_event_type(response(404, "{}"))
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
