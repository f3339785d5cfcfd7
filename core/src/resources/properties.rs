//! Property definitions (`/properties/v1/{contacts|companies}/properties`):
//! the schema behind contact and company property bags.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{parse_empty, parse_record, segment, HubSpotClient};
use crate::error::{ApiError, MarshallingError, Operation};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Object whose property schema is being managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyObject {
    Contacts,
    Companies,
}

impl PropertyObject {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyObject::Contacts => "contacts",
            PropertyObject::Companies => "companies",
        }
    }
}

/// One allowed value of an enumeration property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyOption {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    /// `string`, `number`, `date`, `datetime` or `enumeration`.
    #[serde(rename = "type", default)]
    pub property_type: String,
    /// `text`, `textarea`, `select`, `radio`, `checkbox`, ...
    #[serde(default)]
    pub field_type: String,
    #[serde(default)]
    pub options: Vec<PropertyOption>,
    #[serde(default)]
    pub form_field: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hubspot_defined: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PropertiesApi<'a> {
    client: &'a HubSpotClient,
    object: PropertyObject,
}

impl<'a> PropertiesApi<'a> {
    pub(crate) fn new(client: &'a HubSpotClient, object: PropertyObject) -> Self {
        Self { client, object }
    }

    pub fn object(&self) -> PropertyObject {
        self.object
    }

    pub fn build_list(&self) -> HttpRequest {
        self.send("properties.list", HttpMethod::Get, "", None)
    }

    pub fn parse_list(&self, response: HttpResponse) -> Result<Vec<PropertyDefinition>, ApiError> {
        parse_record("properties.list", &response)
    }

    pub fn build_create(&self, definition: &PropertyDefinition) -> Result<HttpRequest, ApiError> {
        const OP: &str = "properties.create";
        let body = definition_body(definition).during(OP)?;
        Ok(self.send(OP, HttpMethod::Post, "", Some(&body)))
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<PropertyDefinition, ApiError> {
        parse_record("properties.create", &response)
    }

    /// Update the definition named `definition.name`.
    pub fn build_update(&self, definition: &PropertyDefinition) -> Result<HttpRequest, ApiError> {
        const OP: &str = "properties.update";
        let body = definition_body(definition).during(OP)?;
        let route = format!("/named/{}", segment(&definition.name));
        Ok(self.send(OP, HttpMethod::Put, &route, Some(&body)))
    }

    pub fn parse_update(&self, response: HttpResponse) -> Result<PropertyDefinition, ApiError> {
        parse_record("properties.update", &response)
    }

    pub fn build_delete(&self, name: &str) -> Result<HttpRequest, ApiError> {
        const OP: &str = "properties.delete";
        require_name(name).during(OP)?;
        Ok(self.send(OP, HttpMethod::Delete, &format!("/named/{}", segment(name)), None))
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        parse_empty("properties.delete", &response)
    }

    fn send(&self, operation: &'static str, method: HttpMethod, route: &str, body: Option<&Value>) -> HttpRequest {
        let route = format!("/properties/v1/{}/properties{route}", self.object.as_str());
        self.client.request(operation, method, &route, &[], body)
    }
}

fn require_name(name: &str) -> Result<(), MarshallingError> {
    if name.trim().is_empty() {
        return Err(MarshallingError::MissingField {
            entity: "property definition",
            field: "name",
        });
    }
    Ok(())
}

fn definition_body(definition: &PropertyDefinition) -> Result<Value, MarshallingError> {
    require_name(&definition.name)?;
    Ok(serde_json::to_value(definition)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, Credentials};
    use crate::error::ErrorKind;
    use serde_json::json;

    fn client() -> HubSpotClient {
        HubSpotClient::new(
            ClientConfig::new(Credentials::ApiKey("k".into()))
                .with_base_url("http://localhost:3000")
                .unwrap(),
        )
    }

    fn favorite_color() -> PropertyDefinition {
        PropertyDefinition {
            name: "favorite_color".into(),
            label: "Favorite color".into(),
            group_name: Some("contactinformation".into()),
            property_type: "enumeration".into(),
            field_type: "select".into(),
            options: vec![PropertyOption {
                label: "Blue".into(),
                value: "blue".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn routes_follow_the_object() {
        let client = client();
        assert_eq!(
            client.contact_properties().build_list().path,
            "http://localhost:3000/properties/v1/contacts/properties?hapikey=k"
        );
        let req = client.company_properties().build_delete("founded year").unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(
            req.path,
            "http://localhost:3000/properties/v1/companies/properties/named/founded%20year?hapikey=k"
        );
    }

    #[test]
    fn create_serializes_the_definition() {
        let client = client();
        let body = client
            .contact_properties()
            .build_create(&favorite_color())
            .unwrap()
            .json_body()
            .unwrap();
        assert_eq!(body["type"], json!("enumeration"));
        assert_eq!(body["groupName"], json!("contactinformation"));
        assert_eq!(body["options"][0], json!({"label": "Blue", "value": "blue", "hidden": false}));
        assert!(body.get("hubspotDefined").is_none());
    }

    #[test]
    fn blank_names_never_reach_the_wire() {
        let client = client();
        let api = client.contact_properties();
        let mut nameless = favorite_color();
        nameless.name = "  ".into();
        for err in [
            api.build_create(&nameless).unwrap_err(),
            api.build_update(&nameless).unwrap_err(),
            api.build_delete("").unwrap_err(),
        ] {
            assert!(matches!(
                err.kind,
                ErrorKind::Marshalling(MarshallingError::MissingField { field: "name", .. })
            ));
        }
    }

    #[test]
    fn update_puts_to_the_named_route() {
        let client = client();
        let req = client
            .contact_properties()
            .build_update(&favorite_color())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert!(req.path.contains("/properties/v1/contacts/properties/named/favorite_color?"));
    }
}
