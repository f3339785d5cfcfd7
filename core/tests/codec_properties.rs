//! Property-based tests for the property bag codec and its envelopes.
//!
//! These check the laws every mapped entity must satisfy:
//! - Round trip: decode(encode(E)) == E for representable values
//! - Encoding emits exactly the mapped fields that should travel
//! - Unknown names fail soft, duplicates resolve last-wins
//! - The batch email field always mirrors the bag's own `email`
//! - List cursors normalize regardless of wire field names

use chrono::{DateTime, TimeZone, Utc};
use hubspot_core::envelope::{self, encode_batch_item};
use hubspot_core::list::decode_list;
use hubspot_core::resources::companies::COMPANY;
use hubspot_core::resources::contacts::{CONTACT, CONTACT_LIST};
use hubspot_core::{
    codec, property_map, Company, Contact, CursorToken, Deal, MarshallingError, NameKey, PropertyBag, PropertyValue,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 @.'-]{0,40}").unwrap()
}

fn opt_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of(text_strategy())
}

fn finite_f64() -> impl Strategy<Value = f64> {
    -1.0e12f64..1.0e12f64
}

fn date_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_102_444_800_000).prop_map(|ms| Utc.timestamp_millis_opt(ms).unwrap())
}

fn id_strategy() -> impl Strategy<Value = Option<i64>> {
    prop::option::of(1i64..i64::MAX)
}

fn company_strategy() -> impl Strategy<Value = Company> {
    (
        (opt_text(), opt_text(), opt_text(), opt_text(), opt_text(), opt_text()),
        (
            opt_text(),
            opt_text(),
            prop::option::of(any::<i64>()),
            prop::option::of(finite_f64()),
            prop::option::of(any::<bool>()),
            prop::option::of(date_strategy()),
        ),
    )
        .prop_map(
            |(
                (name, domain, description, website, industry, phone),
                (city, country, employees, annual_revenue, is_public, created_at),
            )| Company {
                id: None,
                name,
                domain,
                description,
                website,
                industry,
                phone,
                city,
                country,
                employees,
                annual_revenue,
                is_public,
                created_at,
                extra: PropertyBag::new(),
            },
        )
}

fn contact_strategy() -> impl Strategy<Value = Contact> {
    (
        id_strategy(),
        opt_text(),
        opt_text(),
        opt_text(),
        prop::option::of(any::<i64>()),
    )
        .prop_map(|(id, email, firstname, lifecycle_stage, owner_id)| Contact {
            id,
            email,
            firstname,
            lifecycle_stage,
            owner_id,
            ..Default::default()
        })
}

fn deal_strategy() -> impl Strategy<Value = Deal> {
    (
        opt_text(),
        opt_text(),
        prop::option::of(finite_f64()),
        prop::option::of(date_strategy()),
        prop::option::of(any::<i64>()),
    )
        .prop_map(|(name, stage, amount, close_date, owner_id)| Deal {
            name,
            stage,
            amount,
            close_date,
            owner_id,
            ..Default::default()
        })
}

/// Names that no entity in this file maps.
fn unknown_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("x_[a-z]{1,12}").unwrap()
}

const COMPANY_NAMES: [&str; 12] = [
    "name",
    "domain",
    "description",
    "website",
    "industry",
    "phone",
    "city",
    "country",
    "numberofemployees",
    "annualrevenue",
    "is_public",
    "createdate",
];

#[derive(Debug, Default, PartialEq)]
struct Slim {
    email: Option<String>,
}

property_map!(Slim { email });

// =============================================================================
// ROUND TRIP
// =============================================================================

mod round_trip {
    use super::*;

    proptest! {
        #[test]
        fn company_survives_encode_decode(company in company_strategy()) {
            let back: Company = codec::decode(&codec::encode(&company)).unwrap();
            prop_assert_eq!(back, company);
        }

        #[test]
        fn deal_survives_encode_decode(deal in deal_strategy()) {
            let back: Deal = codec::decode(&codec::encode(&deal)).unwrap();
            prop_assert_eq!(back, deal);
        }

        /// Through the full envelope and both wire forms.
        #[test]
        fn company_survives_the_envelope(company in company_strategy()) {
            let raw = envelope::encode_for_create(&company, &COMPANY).unwrap();
            let back: Company = envelope::decode_single(&raw, &COMPANY).unwrap();
            prop_assert_eq!(&back, &company);

            // The keyed-map read form carries the same values.
            let keyed: serde_json::Map<String, Value> = codec::encode(&company)
                .iter()
                .map(|p| (p.name.clone(), json!({"value": p.value.to_json()})))
                .collect();
            let back: Company = envelope::decode_single(&json!({"properties": keyed}), &COMPANY).unwrap();
            prop_assert_eq!(back, company);
        }
    }
}

// =============================================================================
// ENCODING SHAPE
// =============================================================================

mod encoding {
    use super::*;

    proptest! {
        /// Only mapped names appear, and every set field appears.
        #[test]
        fn emits_exactly_the_mapped_fields(company in company_strategy()) {
            let bag = codec::encode(&company);
            for name in bag.names() {
                prop_assert!(COMPANY_NAMES.contains(&name), "unmapped name {}", name);
            }
            let set = [
                ("name", company.name.is_some()),
                ("domain", company.domain.is_some()),
                ("description", company.description.is_some()),
                ("numberofemployees", company.employees.is_some()),
                ("annualrevenue", company.annual_revenue.is_some()),
                ("is_public", company.is_public.is_some()),
                ("createdate", company.created_at.is_some()),
            ];
            for (name, is_set) in set {
                if is_set {
                    prop_assert!(bag.get(name).is_some_and(|v| !v.is_null()), "{} missing", name);
                }
            }
            // Always-emitted fields go out even when unset.
            prop_assert!(bag.get("name").is_some());
            prop_assert!(bag.get("domain").is_some());
        }

        /// Create never carries an id; update always does.
        #[test]
        fn identifiers_follow_the_operation(mut contact in contact_strategy()) {
            contact.id = None;
            let created = envelope::encode_for_create(&contact, &CONTACT).unwrap();
            prop_assert!(created.get("vid").is_none());

            let err = envelope::encode_for_update(&contact, &CONTACT).unwrap_err();
            let is_missing_id = matches!(err, MarshallingError::MissingId { .. });
            prop_assert!(is_missing_id);

            contact.id = Some(0);
            prop_assert!(envelope::encode_for_update(&contact, &CONTACT).is_err());
        }
    }
}

// =============================================================================
// DECODING
// =============================================================================

mod decoding {
    use super::*;

    proptest! {
        /// Unknown names never fail; they land in extras verbatim.
        #[test]
        fn unknown_names_go_to_extras(company in company_strategy(), name in unknown_name(), value in text_strategy()) {
            let mut bag = codec::encode(&company);
            bag.push(name.clone(), value.clone());
            let back: Company = codec::decode(&bag).unwrap();
            prop_assert_eq!(back.extra.get(&name), Some(&PropertyValue::String(value)));
            let mut mapped_only = back.clone();
            mapped_only.extra = PropertyBag::new();
            prop_assert_eq!(mapped_only, company);
        }

        /// Without a sink, unknown names are dropped without error.
        #[test]
        fn unknown_names_are_ignored_without_a_sink(email in opt_text(), name in unknown_name()) {
            let mut bag = PropertyBag::new();
            bag.push("email", email.clone().map(PropertyValue::from).unwrap_or(PropertyValue::Null));
            bag.push(name, "ignored");
            let back: Slim = codec::decode(&bag).unwrap();
            prop_assert_eq!(back, Slim { email });
        }

        /// Duplicate names resolve to the last occurrence.
        #[test]
        fn last_duplicate_wins(first in text_strategy(), last in text_strategy()) {
            let mut bag = PropertyBag::new();
            bag.push("name", first);
            bag.push("domain", "squaredup.com");
            bag.push("name", last.clone());
            let back: Company = codec::decode(&bag).unwrap();
            prop_assert_eq!(back.name, Some(last));
        }
    }
}

// =============================================================================
// BATCH AND LIST ENVELOPES
// =============================================================================

mod envelopes {
    use super::*;

    proptest! {
        /// The convenience `email` always equals the bag's `email` pair.
        #[test]
        fn batch_email_mirrors_the_bag(contact in contact_strategy()) {
            let item = encode_batch_item(&contact, &CONTACT).unwrap();
            let in_bag = item["properties"]
                .as_array()
                .unwrap()
                .iter()
                .find(|p| p["property"] == "email")
                .map(|p| p["value"].clone())
                .unwrap_or(Value::Null);
            prop_assert_eq!(&item["email"], &in_bag);
            prop_assert_eq!(item["email"].as_str(), contact.email.as_deref());
        }

        #[test]
        fn list_cursor_is_normalized(offset in any::<i64>(), has_more in any::<bool>()) {
            let raw = json!({"contacts": [], "has-more": has_more, "vid-offset": offset});
            let page = decode_list(&raw, &CONTACT_LIST, |item| envelope::decode_single::<Contact>(item, &CONTACT)).unwrap();
            prop_assert_eq!(page.cursor.offset, Some(CursorToken::Number(offset)));
            prop_assert_eq!(page.has_more, has_more);
        }
    }

    #[test]
    fn absent_flag_and_cursor_mean_no_more_pages() {
        let page = decode_list(&json!({"contacts": []}), &CONTACT_LIST, |item| {
            envelope::decode_single::<Contact>(item, &CONTACT)
        })
        .unwrap();
        assert!(!page.has_more);
        assert!(page.next_cursor().is_none());
    }
}

// =============================================================================
// SCENARIO
// =============================================================================

#[test]
fn squared_up_scenario() {
    let company = Company {
        name: Some("Squared Up".into()),
        domain: Some("squaredup.com".into()),
        ..Default::default()
    };
    let wire = codec::encode(&company).to_wire(NameKey::Property);
    assert_eq!(
        wire,
        json!([
            {"property": "name", "value": "Squared Up"},
            {"property": "domain", "value": "squaredup.com"}
        ])
    );
    let back: Company = codec::decode(&PropertyBag::from_wire(&wire).unwrap()).unwrap();
    assert_eq!(back, company);
}
