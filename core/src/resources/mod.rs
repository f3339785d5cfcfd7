//! Per-resource facades.
//!
//! Every facade borrows a `HubSpotClient` and offers `build_*` / `parse_*`
//! pairs. The envelope and list descriptions each resource needs live as
//! constants next to its facade.

pub mod campaigns;
pub mod companies;
pub mod contacts;
pub mod deals;
pub mod engagements;
pub mod owners;
pub mod properties;
pub mod subscriptions;
pub mod timeline;

use chrono::{DateTime, Utc};

use crate::list::{Cursor, ListSpec};

pub use campaigns::{CampaignData, CampaignsApi, EmailCampaign};
pub use companies::CompaniesApi;
pub use contacts::{ContactsApi, UpsertOutcome};
pub use deals::DealsApi;
pub use engagements::EngagementsApi;
pub use owners::{Owner, OwnersApi};
pub use properties::{PropertiesApi, PropertyDefinition, PropertyObject, PropertyOption};
pub use subscriptions::{
    Consent, LegalBasis, OptState, SubscriptionStatus, SubscriptionStatusDetail, SubscriptionType,
    SubscriptionTypeList, SubscriptionsApi,
};
pub use timeline::{TimelineApi, TimelineEvent, TimelineEventType};

/// Paging and projection options for list calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    /// Page size; the resource default applies when unset.
    pub limit: Option<u32>,
    /// Cursor from the previous page.
    pub cursor: Option<Cursor>,
    /// Property names to include for each item.
    pub properties: Vec<String>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn after(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties.extend(names.into_iter().map(Into::into));
        self
    }

    /// Paging params for `spec`, followed by one `property_param` per
    /// requested property.
    pub(crate) fn query(&self, spec: &ListSpec, property_param: &'static str) -> Vec<(&'static str, String)> {
        let mut query = spec.page_params(self.cursor.as_ref(), self.limit);
        query.extend(self.properties.iter().map(|name| (property_param, name.clone())));
        query
    }
}

/// Options for "recently created / modified" feeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecentOptions {
    pub limit: Option<u32>,
    pub cursor: Option<Cursor>,
    /// Only return records changed after this instant.
    pub since: Option<DateTime<Utc>>,
    pub include_property_versions: bool,
}

impl RecentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn after(mut self, cursor: Cursor) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub(crate) fn query(&self, spec: &ListSpec) -> Vec<(&'static str, String)> {
        let mut query = spec.page_params(self.cursor.as_ref(), self.limit);
        if let Some(since) = self.since {
            query.push(("since", since.timestamp_millis().to_string()));
        }
        if self.include_property_versions {
            query.push(("includePropertyVersions", "true".to_string()));
        }
        query
    }
}

/// CRM object kinds that other records can be associated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Contact,
    Company,
    Deal,
    Owner,
    Ticket,
}

impl ObjectType {
    /// Upper-case form used by engagement routes.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Contact => "CONTACT",
            ObjectType::Company => "COMPANY",
            ObjectType::Deal => "DEAL",
            ObjectType::Owner => "OWNER",
            ObjectType::Ticket => "TICKET",
        }
    }

    /// Lower-case form used by deal routes.
    pub fn path_name(self) -> &'static str {
        match self {
            ObjectType::Contact => "contact",
            ObjectType::Company => "company",
            ObjectType::Deal => "deal",
            ObjectType::Owner => "owner",
            ObjectType::Ticket => "ticket",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::{CursorField, HasMore};
    use chrono::TimeZone;

    const SPEC: ListSpec = ListSpec {
        items_key: "results",
        has_more: HasMore::Flag("hasMore"),
        offset: Some(CursorField::new("offset", "offset")),
        time_offset: None,
        limit_param: "limit",
        default_limit: 250,
        total_key: None,
    };

    #[test]
    fn list_options_append_properties_after_paging() {
        let opts = ListOptions::new()
            .with_limit(10)
            .after(Cursor::offset(30))
            .with_properties(["name", "domain"]);
        assert_eq!(
            opts.query(&SPEC, "properties"),
            vec![
                ("limit", "10".to_string()),
                ("offset", "30".to_string()),
                ("properties", "name".to_string()),
                ("properties", "domain".to_string()),
            ]
        );
    }

    #[test]
    fn recent_options_send_since_as_millis() {
        let since = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let opts = RecentOptions::new().since(since);
        assert_eq!(
            opts.query(&SPEC),
            vec![
                ("limit", "250".to_string()),
                ("since", "1700000000000".to_string()),
            ]
        );
    }
}
