//! Typed CRM entities.
//!
//! # Design
//! Each struct lists its property-bag fields through `property_map!` and
//! implements `Entity` for its identifier and any metadata that travels next
//! to the bag. Fields marked `[omit_unset]` are left out of writes while
//! `None`; the rest go out as null so callers can clear them remotely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::codec::{BagReader, BagWriter, PropertyMapped};
use crate::envelope::Entity;
use crate::error::MarshallingError;
use crate::property::PropertyBag;
use crate::property_map;

/// A person record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contact {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub website: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub lifecycle_stage: Option<String>,
    pub owner_id: Option<i64>,
    pub extra: PropertyBag,
}

property_map!(Contact {
    email,
    firstname [omit_unset],
    lastname [omit_unset],
    website [omit_unset],
    company [omit_unset],
    phone [omit_unset],
    address [omit_unset],
    city [omit_unset],
    state [omit_unset],
    zip [omit_unset],
    lifecycle_stage = "lifecyclestage" [omit_unset],
    owner_id = "hubspot_owner_id" [omit_unset],
} extras: extra);

impl Entity for Contact {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }
}

/// An organisation record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Company {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub employees: Option<i64>,
    pub annual_revenue: Option<f64>,
    pub is_public: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub extra: PropertyBag,
}

property_map!(Company {
    name,
    domain,
    description [omit_unset],
    website [omit_unset],
    industry [omit_unset],
    phone [omit_unset],
    city [omit_unset],
    country [omit_unset],
    employees = "numberofemployees" [omit_unset],
    annual_revenue = "annualrevenue" [omit_unset],
    is_public [omit_unset],
    created_at = "createdate" [omit_unset],
} extras: extra);

impl Entity for Company {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }
}

/// Records a deal is linked to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealAssociations {
    #[serde(default)]
    pub associated_vids: Vec<i64>,
    #[serde(default)]
    pub associated_company_ids: Vec<i64>,
    #[serde(default)]
    pub associated_deal_ids: Vec<i64>,
}

impl DealAssociations {
    pub fn is_empty(&self) -> bool {
        self.associated_vids.is_empty()
            && self.associated_company_ids.is_empty()
            && self.associated_deal_ids.is_empty()
    }
}

/// A sales opportunity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deal {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub stage: Option<String>,
    pub pipeline: Option<String>,
    pub amount: Option<f64>,
    pub close_date: Option<DateTime<Utc>>,
    pub owner_id: Option<i64>,
    pub deal_type: Option<String>,
    pub description: Option<String>,
    pub associations: DealAssociations,
    pub extra: PropertyBag,
}

property_map!(Deal {
    name = "dealname",
    stage = "dealstage",
    pipeline,
    amount,
    close_date = "closedate" [omit_unset],
    owner_id = "hubspot_owner_id" [omit_unset],
    deal_type = "dealtype" [omit_unset],
    description [omit_unset],
} extras: extra);

impl Entity for Deal {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    fn read_metadata(&mut self, envelope: &Map<String, Value>) -> Result<(), MarshallingError> {
        if let Some(raw) = envelope.get("associations").filter(|v| !v.is_null()) {
            self.associations = serde_json::from_value(raw.clone())?;
        }
        Ok(())
    }

    fn write_metadata(&self, envelope: &mut Map<String, Value>) -> Result<(), MarshallingError> {
        if !self.associations.is_empty() {
            envelope.insert("associations".to_string(), serde_json::to_value(&self.associations)?);
        }
        Ok(())
    }
}

wire_enum! {
    /// Kind of activity an engagement records. The service adds kinds over
    /// time (`INCOMING_EMAIL`, `FORWARDED_EMAIL`, ...); those decode as `Other`.
    #[derive(Default)]
    pub enum EngagementType {
        #[default]
        Note => "NOTE",
        Email => "EMAIL",
        Task => "TASK",
        Meeting => "MEETING",
        Call => "CALL",
        _ => Other,
    }
}

/// The `engagement` sub-object, minus its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementHeader {
    #[serde(rename = "type")]
    pub kind: EngagementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Default for EngagementHeader {
    fn default() -> Self {
        Self {
            kind: EngagementType::default(),
            owner_id: None,
            timestamp: None,
            active: default_active(),
        }
    }
}

/// Records an engagement is attached to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementAssociations {
    #[serde(default)]
    pub contact_ids: Vec<i64>,
    #[serde(default)]
    pub company_ids: Vec<i64>,
    #[serde(default)]
    pub deal_ids: Vec<i64>,
    #[serde(default)]
    pub owner_ids: Vec<i64>,
    #[serde(default)]
    pub ticket_ids: Vec<i64>,
}

/// A logged activity (note, call, email, ...). Engagements have no property
/// bag: everything travels as metadata, with the id nested in the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Engagement {
    pub id: Option<i64>,
    pub engagement: EngagementHeader,
    pub associations: EngagementAssociations,
    /// Type-specific body (`{"body": "…"}` for notes, etc.), kept raw.
    pub metadata: Value,
}

impl PropertyMapped for Engagement {
    fn write_properties(&self, _bag: &mut BagWriter) {}

    fn read_properties(&mut self, _bag: &mut BagReader<'_>) -> Result<(), MarshallingError> {
        Ok(())
    }
}

impl Entity for Engagement {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }

    fn read_metadata(&mut self, envelope: &Map<String, Value>) -> Result<(), MarshallingError> {
        if let Some(raw) = envelope.get("engagement") {
            self.engagement = serde_json::from_value(raw.clone())?;
        }
        if let Some(raw) = envelope.get("associations").filter(|v| !v.is_null()) {
            self.associations = serde_json::from_value(raw.clone())?;
        }
        self.metadata = envelope.get("metadata").cloned().unwrap_or(Value::Null);
        Ok(())
    }

    fn write_metadata(&self, envelope: &mut Map<String, Value>) -> Result<(), MarshallingError> {
        envelope.insert("engagement".to_string(), serde_json::to_value(&self.engagement)?);
        envelope.insert("associations".to_string(), serde_json::to_value(&self.associations)?);
        if !self.metadata.is_null() {
            envelope.insert("metadata".to_string(), self.metadata.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::property::Property;
    use crate::value::PropertyValue;

    #[test]
    fn company_with_name_and_domain_encodes_two_properties() {
        let company = Company {
            name: Some("Squared Up".into()),
            domain: Some("squaredup.com".into()),
            ..Default::default()
        };
        let bag = codec::encode(&company);
        assert_eq!(
            bag.iter().cloned().collect::<Vec<_>>(),
            vec![
                Property::new("name", "Squared Up"),
                Property::new("domain", "squaredup.com"),
            ]
        );
        let back: Company = codec::decode(&bag).unwrap();
        assert_eq!(back, company);
    }

    #[test]
    fn contact_only_sends_email_when_otherwise_empty() {
        let bag = codec::encode(&Contact::default());
        assert_eq!(bag.names().collect::<Vec<_>>(), ["email"]);
        assert_eq!(bag.get("email"), Some(&PropertyValue::Null));
    }

    #[test]
    fn deal_uses_wire_aliases() {
        let deal = Deal {
            name: Some("Renewal".into()),
            amount: Some(1200.5),
            owner_id: Some(9),
            ..Default::default()
        };
        let bag = codec::encode(&deal);
        assert_eq!(
            bag.names().collect::<Vec<_>>(),
            ["dealname", "dealstage", "pipeline", "amount", "hubspot_owner_id"]
        );
    }

    #[test]
    fn engagement_header_serializes_type_in_capitals() {
        let header = EngagementHeader {
            kind: EngagementType::Call,
            owner_id: Some(4),
            timestamp: None,
            active: true,
        };
        let value = serde_json::to_value(&header).unwrap();
        assert_eq!(value, serde_json::json!({"type": "CALL", "ownerId": 4, "active": true}));
    }

    #[test]
    fn unlisted_engagement_types_are_kept_verbatim() {
        let kind: EngagementType = serde_json::from_value(serde_json::json!("INCOMING_EMAIL")).unwrap();
        assert_eq!(kind, EngagementType::Other("INCOMING_EMAIL".into()));
        assert_eq!(serde_json::to_value(&kind).unwrap(), serde_json::json!("INCOMING_EMAIL"));

        let kind: EngagementType = serde_json::from_value(serde_json::json!("MEETING")).unwrap();
        assert_eq!(kind, EngagementType::Meeting);
    }

    #[test]
    fn default_header_is_active_like_a_decoded_one() {
        let decoded: EngagementHeader = serde_json::from_value(serde_json::json!({"type": "NOTE"})).unwrap();
        assert_eq!(decoded, EngagementHeader::default());
        assert!(EngagementHeader::default().active);
    }
}
