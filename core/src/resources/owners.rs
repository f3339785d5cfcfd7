//! Owners (`/owners/v2/owners`).

use serde::{Deserialize, Serialize};

use crate::client::{parse_record, HubSpotClient};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// A user who can own CRM records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub owner_id: i64,
    #[serde(default)]
    pub portal_id: Option<i64>,
    #[serde(default, rename = "type")]
    pub owner_type: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
pub struct OwnersApi<'a> {
    client: &'a HubSpotClient,
}

impl<'a> OwnersApi<'a> {
    pub(crate) fn new(client: &'a HubSpotClient) -> Self {
        Self { client }
    }

    /// All owners in the portal. The service does not page this list.
    pub fn build_list(&self) -> HttpRequest {
        self.client
            .request("owners.list", HttpMethod::Get, "/owners/v2/owners", &[], None)
    }

    pub fn parse_list(&self, response: HttpResponse) -> Result<Vec<Owner>, ApiError> {
        parse_record("owners.list", &response)
    }
}
