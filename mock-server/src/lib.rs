//! In-memory stand-in for the subset of the CRM API the core client covers.
//!
//! Records are stored as flat string properties and rendered back in the
//! keyed-map form (`{"properties": {"name": {"value": "..."}}}`) the real
//! service uses for reads. Writes accept the pair-array form only.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// One stored record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    pub properties: BTreeMap<String, String>,
    /// Deal associations, stored verbatim.
    pub associations: Option<Value>,
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: i64,
    pub contacts: BTreeMap<i64, Record>,
    pub companies: BTreeMap<i64, Record>,
    pub deals: BTreeMap<i64, Record>,
    /// Subscription type id to subscribed flag, per email.
    pub subscriptions: HashMap<String, BTreeMap<i64, bool>>,
}

impl Store {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

pub type Db = Arc<RwLock<Store>>;

type Failure = (StatusCode, Json<Value>);
type Reply = Result<Json<Value>, Failure>;

pub const SUBSCRIPTION_TYPES: [(i64, &str); 2] = [(7, "Newsletter"), (8, "Product updates")];

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/contacts/v1/contact", post(create_contact))
        .route("/contacts/v1/contact/batch", post(batch_contacts))
        .route(
            "/contacts/v1/contact/createOrUpdate/email/{email}",
            post(upsert_contact),
        )
        .route(
            "/contacts/v1/contact/vid/{id}/profile",
            get(get_contact).post(update_contact),
        )
        .route("/contacts/v1/contact/vid/{id}", delete(delete_contact))
        .route("/contacts/v1/contact/email/{email}/profile", get(get_contact_by_email))
        .route("/contacts/v1/lists/all/contacts/all", get(list_contacts))
        .route("/companies/v2/companies", post(create_company))
        .route("/companies/v2/companies/paged", get(list_companies))
        .route(
            "/companies/v2/companies/{id}",
            get(get_company).put(update_company).delete(delete_company),
        )
        .route("/deals/v1/deal", post(create_deal))
        .route("/deals/v1/deal/paged", get(list_deals))
        .route(
            "/deals/v1/deal/{id}",
            get(get_deal).put(update_deal).delete(delete_deal),
        )
        .route("/email/public/v1/subscriptions", get(subscription_types))
        .route(
            "/email/public/v1/subscriptions/{email}",
            get(subscription_status).put(change_subscriptions),
        )
        .route("/owners/v2/owners", get(list_owners))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn failure(status: StatusCode, message: impl Into<String>) -> Failure {
    (
        status,
        Json(json!({"status": "error", "message": message.into()})),
    )
}

fn not_found(entity: &str) -> Failure {
    failure(StatusCode::NOT_FOUND, format!("{entity} does not exist"))
}

/// Apply a pair-array bag keyed by `name_key`. Null values clear.
pub fn apply_properties(record: &mut Record, raw: Option<&Value>, name_key: &str) -> Result<(), Failure> {
    let Some(raw) = raw else {
        return Ok(());
    };
    let pairs = raw
        .as_array()
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "properties must be an array"))?;
    for pair in pairs {
        let name = pair
            .get(name_key)
            .and_then(Value::as_str)
            .ok_or_else(|| failure(StatusCode::BAD_REQUEST, format!("property is missing `{name_key}`")))?;
        match pair.get("value") {
            None | Some(Value::Null) => {
                record.properties.remove(name);
            }
            Some(Value::String(s)) => {
                record.properties.insert(name.to_string(), s.clone());
            }
            Some(other) => {
                record.properties.insert(name.to_string(), other.to_string());
            }
        }
    }
    Ok(())
}

/// Render a record in the keyed-map read form.
pub fn render(id_key: &str, id: i64, record: &Record) -> Value {
    let properties: Map<String, Value> = record
        .properties
        .iter()
        .map(|(name, value)| (name.clone(), json!({ "value": value })))
        .collect();
    let mut out = Map::new();
    out.insert(id_key.to_string(), Value::from(id));
    out.insert("properties".to_string(), Value::Object(properties));
    if let Some(associations) = &record.associations {
        out.insert("associations".to_string(), associations.clone());
    }
    Value::Object(out)
}

/// Records after `offset`, at most `count` of them, plus whether more remain.
fn page(records: &BTreeMap<i64, Record>, offset: Option<i64>, count: usize) -> (Vec<(i64, &Record)>, bool) {
    let mut rest = records
        .range(offset.map_or(i64::MIN, |o| o.saturating_add(1))..)
        .map(|(id, record)| (*id, record));
    let items: Vec<_> = rest.by_ref().take(count).collect();
    let has_more = rest.next().is_some();
    (items, has_more)
}

fn body_object<'a>(body: &'a Value) -> Result<&'a Map<String, Value>, Failure> {
    body.as_object()
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "body must be an object"))
}

// --- contacts ---

fn find_by_email(contacts: &BTreeMap<i64, Record>, email: &str) -> Option<i64> {
    contacts
        .iter()
        .find(|(_, r)| r.properties.get("email").is_some_and(|e| e.eq_ignore_ascii_case(email)))
        .map(|(id, _)| *id)
}

async fn create_contact(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    let body = body_object(&body)?;
    if body.contains_key("vid") {
        return Err(failure(StatusCode::BAD_REQUEST, "vid must not be sent on create"));
    }
    let mut record = Record::default();
    apply_properties(&mut record, body.get("properties"), "property")?;
    let mut store = db.write().await;
    if let Some(email) = record.properties.get("email") {
        if find_by_email(&store.contacts, email).is_some() {
            return Err(failure(StatusCode::CONFLICT, "contact already exists"));
        }
    }
    let id = store.allocate();
    store.contacts.insert(id, record.clone());
    Ok(Json(render("vid", id, &record)))
}

async fn get_contact(State(db): State<Db>, Path(id): Path<i64>) -> Reply {
    let store = db.read().await;
    let record = store.contacts.get(&id).ok_or_else(|| not_found("contact"))?;
    Ok(Json(render("vid", id, record)))
}

async fn get_contact_by_email(State(db): State<Db>, Path(email): Path<String>) -> Reply {
    let store = db.read().await;
    let id = find_by_email(&store.contacts, &email).ok_or_else(|| not_found("contact"))?;
    Ok(Json(render("vid", id, &store.contacts[&id])))
}

async fn update_contact(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<StatusCode, Failure> {
    let body = body_object(&body)?;
    let mut store = db.write().await;
    let record = store.contacts.get_mut(&id).ok_or_else(|| not_found("contact"))?;
    apply_properties(record, body.get("properties"), "property")?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_contact(State(db): State<Db>, Path(id): Path<i64>) -> Reply {
    let mut store = db.write().await;
    store.contacts.remove(&id).ok_or_else(|| not_found("contact"))?;
    Ok(Json(json!({"vid": id, "deleted": true, "reason": "OK"})))
}

async fn upsert_contact(State(db): State<Db>, Path(email): Path<String>, Json(body): Json<Value>) -> Reply {
    let body = body_object(&body)?;
    let mut store = db.write().await;
    let (id, is_new) = match find_by_email(&store.contacts, &email) {
        Some(id) => (id, false),
        None => {
            let id = store.allocate();
            let mut record = Record::default();
            record.properties.insert("email".to_string(), email.clone());
            store.contacts.insert(id, record);
            (id, true)
        }
    };
    if let Some(record) = store.contacts.get_mut(&id) {
        apply_properties(record, body.get("properties"), "property")?;
    }
    Ok(Json(json!({"vid": id, "isNew": is_new})))
}

async fn batch_contacts(State(db): State<Db>, Json(body): Json<Value>) -> Result<StatusCode, Failure> {
    let items = body
        .as_array()
        .ok_or_else(|| failure(StatusCode::BAD_REQUEST, "batch body must be an array"))?;
    // Validate everything before touching the store.
    let mut staged = Vec::with_capacity(items.len());
    for item in items {
        let item = body_object(item)?;
        let vid = item.get("vid").and_then(Value::as_i64);
        let email = item.get("email").and_then(Value::as_str).map(str::to_string);
        if vid.is_none() && email.is_none() {
            return Err(failure(StatusCode::BAD_REQUEST, "batch item needs an email or vid"));
        }
        let mut patch = Record::default();
        apply_properties(&mut patch, item.get("properties"), "property")?;
        staged.push((vid, email, item.get("properties").cloned()));
    }

    let mut store = db.write().await;
    for (vid, email, properties) in staged {
        let existing = vid
            .filter(|id| store.contacts.contains_key(id))
            .or_else(|| email.as_deref().and_then(|e| find_by_email(&store.contacts, e)));
        let id = match existing {
            Some(id) => id,
            None => {
                let id = store.allocate();
                store.contacts.insert(id, Record::default());
                id
            }
        };
        if let Some(record) = store.contacts.get_mut(&id) {
            apply_properties(record, properties.as_ref(), "property")?;
            if let Some(email) = email {
                record.properties.entry("email".to_string()).or_insert(email);
            }
        }
    }
    Ok(StatusCode::ACCEPTED)
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactPaging {
    pub count: Option<usize>,
    #[serde(rename = "vidOffset")]
    pub vid_offset: Option<i64>,
}

async fn list_contacts(State(db): State<Db>, Query(paging): Query<ContactPaging>) -> Json<Value> {
    let store = db.read().await;
    let (items, has_more) = page(&store.contacts, paging.vid_offset, paging.count.unwrap_or(20));
    let last = items.last().map(|(id, _)| *id).or(paging.vid_offset).unwrap_or(0);
    let contacts: Vec<Value> = items.iter().map(|(id, r)| render("vid", *id, r)).collect();
    Json(json!({"contacts": contacts, "has-more": has_more, "vid-offset": last}))
}

// --- companies ---

#[derive(Debug, Default, Deserialize)]
pub struct OffsetPaging {
    pub count: Option<usize>,
    pub limit: Option<usize>,
    pub offset: Option<i64>,
}

async fn create_company(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    let body = body_object(&body)?;
    if body.contains_key("companyId") {
        return Err(failure(StatusCode::BAD_REQUEST, "companyId must not be sent on create"));
    }
    let mut record = Record::default();
    apply_properties(&mut record, body.get("properties"), "name")?;
    let mut store = db.write().await;
    let id = store.allocate();
    store.companies.insert(id, record.clone());
    Ok(Json(render("companyId", id, &record)))
}

async fn get_company(State(db): State<Db>, Path(id): Path<i64>) -> Reply {
    let store = db.read().await;
    let record = store.companies.get(&id).ok_or_else(|| not_found("company"))?;
    Ok(Json(render("companyId", id, record)))
}

async fn update_company(State(db): State<Db>, Path(id): Path<i64>, Json(body): Json<Value>) -> Reply {
    let body = body_object(&body)?;
    let mut store = db.write().await;
    let record = store.companies.get_mut(&id).ok_or_else(|| not_found("company"))?;
    apply_properties(record, body.get("properties"), "name")?;
    Ok(Json(render("companyId", id, record)))
}

async fn delete_company(State(db): State<Db>, Path(id): Path<i64>) -> Reply {
    let mut store = db.write().await;
    store.companies.remove(&id).ok_or_else(|| not_found("company"))?;
    Ok(Json(json!({"companyId": id, "deleted": true})))
}

async fn list_companies(State(db): State<Db>, Query(paging): Query<OffsetPaging>) -> Json<Value> {
    let store = db.read().await;
    let (items, has_more) = page(&store.companies, paging.offset, paging.count.unwrap_or(100));
    let last = items.last().map(|(id, _)| *id).or(paging.offset).unwrap_or(0);
    let companies: Vec<Value> = items.iter().map(|(id, r)| render("companyId", *id, r)).collect();
    Json(json!({"companies": companies, "has-more": has_more, "offset": last}))
}

// --- deals ---

async fn create_deal(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    let body = body_object(&body)?;
    if body.contains_key("dealId") {
        return Err(failure(StatusCode::BAD_REQUEST, "dealId must not be sent on create"));
    }
    let mut record = Record {
        associations: body.get("associations").cloned(),
        ..Default::default()
    };
    apply_properties(&mut record, body.get("properties"), "name")?;
    let mut store = db.write().await;
    let id = store.allocate();
    store.deals.insert(id, record.clone());
    Ok(Json(render("dealId", id, &record)))
}

async fn get_deal(State(db): State<Db>, Path(id): Path<i64>) -> Reply {
    let store = db.read().await;
    let record = store.deals.get(&id).ok_or_else(|| not_found("deal"))?;
    Ok(Json(render("dealId", id, record)))
}

async fn update_deal(State(db): State<Db>, Path(id): Path<i64>, Json(body): Json<Value>) -> Reply {
    let body = body_object(&body)?;
    let mut store = db.write().await;
    let record = store.deals.get_mut(&id).ok_or_else(|| not_found("deal"))?;
    apply_properties(record, body.get("properties"), "name")?;
    if let Some(associations) = body.get("associations") {
        record.associations = Some(associations.clone());
    }
    Ok(Json(render("dealId", id, record)))
}

async fn delete_deal(State(db): State<Db>, Path(id): Path<i64>) -> Result<StatusCode, Failure> {
    let mut store = db.write().await;
    store.deals.remove(&id).ok_or_else(|| not_found("deal"))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_deals(State(db): State<Db>, Query(paging): Query<OffsetPaging>) -> Json<Value> {
    let store = db.read().await;
    let (items, has_more) = page(&store.deals, paging.offset, paging.limit.unwrap_or(250));
    let last = items.last().map(|(id, _)| *id).or(paging.offset).unwrap_or(0);
    let deals: Vec<Value> = items.iter().map(|(id, r)| render("dealId", *id, r)).collect();
    Json(json!({"deals": deals, "hasMore": has_more, "offset": last}))
}

// --- subscriptions ---

async fn subscription_types() -> Json<Value> {
    let definitions: Vec<Value> = SUBSCRIPTION_TYPES
        .iter()
        .map(|(id, name)| json!({"id": id, "portalId": 62515, "name": name, "active": true}))
        .collect();
    Json(json!({ "subscriptionDefinitions": definitions }))
}

async fn subscription_status(State(db): State<Db>, Path(email): Path<String>) -> Json<Value> {
    let store = db.read().await;
    let states = store.subscriptions.get(&email.to_lowercase());
    let statuses: Vec<Value> = states
        .into_iter()
        .flatten()
        .map(|(id, subscribed)| {
            json!({
                "id": id,
                "subscribed": subscribed,
                "optState": if *subscribed { "OPT_IN" } else { "OPT_OUT" }
            })
        })
        .collect();
    let subscribed = states.map_or(true, |s| s.values().any(|v| *v));
    Json(json!({
        "email": email,
        "subscribed": subscribed,
        "markedAsSpam": false,
        "bounced": false,
        "subscriptionStatuses": statuses
    }))
}

async fn change_subscriptions(
    State(db): State<Db>,
    Path(email): Path<String>,
    Json(body): Json<Value>,
) -> Result<StatusCode, Failure> {
    let body = body_object(&body)?;
    let mut changes = Vec::new();
    if body.get("unsubscribeFromAll").and_then(Value::as_bool) == Some(true) {
        changes.extend(SUBSCRIPTION_TYPES.iter().map(|(id, _)| (*id, false)));
    }
    for status in body
        .get("subscriptionStatuses")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let id = status.get("id").and_then(Value::as_i64).unwrap_or_default();
        if !SUBSCRIPTION_TYPES.iter().any(|(known, _)| *known == id) {
            return Err(failure(StatusCode::BAD_REQUEST, format!("unknown subscription type {id}")));
        }
        let subscribed = status.get("subscribed").and_then(Value::as_bool).unwrap_or(false);
        changes.push((id, subscribed));
    }
    let mut store = db.write().await;
    store
        .subscriptions
        .entry(email.to_lowercase())
        .or_default()
        .extend(changes);
    Ok(StatusCode::OK)
}

// --- owners ---

async fn list_owners() -> Json<Value> {
    Json(json!([
        {"portalId": 62515, "ownerId": 64, "type": "PERSON", "firstName": "Holly",
         "lastName": "Flax", "email": "holly@example.com", "createdAt": 1416600000000_i64}
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_applied_and_null_clears() {
        let mut record = Record::default();
        let raw = json!([
            {"property": "email", "value": "a@b.com"},
            {"property": "score", "value": 12},
            {"property": "phone", "value": "555"}
        ]);
        apply_properties(&mut record, Some(&raw), "property").unwrap();
        assert_eq!(record.properties["score"], "12");

        let raw = json!([{"property": "phone", "value": null}]);
        apply_properties(&mut record, Some(&raw), "property").unwrap();
        assert!(!record.properties.contains_key("phone"));
        assert_eq!(record.properties.len(), 2);
    }

    #[test]
    fn pairs_with_the_wrong_key_are_rejected() {
        let mut record = Record::default();
        let raw = json!([{"property": "name", "value": "x"}]);
        let (status, _) = apply_properties(&mut record, Some(&raw), "name").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn render_uses_the_keyed_map_form() {
        let mut record = Record::default();
        record.properties.insert("name".into(), "Squared Up".into());
        assert_eq!(
            render("companyId", 4, &record),
            json!({"companyId": 4, "properties": {"name": {"value": "Squared Up"}}})
        );
    }

    #[test]
    fn paging_skips_past_the_offset() {
        let records: BTreeMap<i64, Record> = (1..=5).map(|id| (id, Record::default())).collect();
        let (items, more) = page(&records, None, 2);
        assert_eq!(items.iter().map(|(id, _)| *id).collect::<Vec<_>>(), [1, 2]);
        assert!(more);
        let (items, more) = page(&records, Some(4), 2);
        assert_eq!(items.iter().map(|(id, _)| *id).collect::<Vec<_>>(), [5]);
        assert!(!more);
    }
}
