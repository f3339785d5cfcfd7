//! Single-entity envelopes: identifier and metadata around a property bag.
//!
//! # Design
//! Every resource describes its envelope with a static `EnvelopeSpec`: where
//! the identifier lives and which name key its bag uses. Fields outside the
//! bag (associations, engagement headers) are handled by the entity itself
//! through `Entity::read_metadata` / `write_metadata`.

use serde_json::{Map, Value};

use crate::codec::{self, PropertyMapped};
use crate::error::MarshallingError;
use crate::property::{NameKey, PropertyBag};
use crate::value::PropertyValue;

const PROPERTIES_KEY: &str = "properties";

/// Where an envelope keeps its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdField {
    /// `{"vid": 1, …}`
    TopLevel(&'static str),
    /// `{"engagement": {"id": 1, …}, …}`
    Nested(&'static str, &'static str),
}

/// Static description of one resource's single-entity envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeSpec {
    /// Singular entity name, used in diagnostics.
    pub entity: &'static str,
    pub id: IdField,
    /// Name key of the bag under `properties`; `None` when the resource has
    /// no property bag.
    pub properties: Option<NameKey>,
}

/// A record with an identifier that travels inside an envelope.
pub trait Entity: PropertyMapped {
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: Option<i64>);

    /// Copy non-mapped sibling keys out of a decoded envelope.
    fn read_metadata(&mut self, _envelope: &Map<String, Value>) -> Result<(), MarshallingError> {
        Ok(())
    }

    /// Write non-mapped sibling keys into an outgoing envelope.
    fn write_metadata(&self, _envelope: &mut Map<String, Value>) -> Result<(), MarshallingError> {
        Ok(())
    }
}

/// Envelope for a create call. The identifier key is never written, and an
/// entity that already has a server id is rejected.
pub fn encode_for_create<E: Entity>(entity: &E, spec: &EnvelopeSpec) -> Result<Value, MarshallingError> {
    if let Some(id) = entity.id().filter(|id| *id >= 1) {
        return Err(MarshallingError::UnexpectedId {
            entity: spec.entity,
            id,
        });
    }
    let mut envelope = encode_body(entity, spec)?;
    remove_id(&mut envelope, spec.id);
    Ok(Value::Object(envelope))
}

/// Envelope for an update call. Fails before anything is sent when the
/// entity has no id of at least 1.
pub fn encode_for_update<E: Entity>(entity: &E, spec: &EnvelopeSpec) -> Result<Value, MarshallingError> {
    let id = require_id(entity, spec)?;
    let mut envelope = encode_body(entity, spec)?;
    insert_id(&mut envelope, spec.id, id);
    Ok(Value::Object(envelope))
}

/// Item for an email-keyed batch call: the full bag plus an `email` field
/// read out of that same bag, so the two cannot disagree.
pub fn encode_batch_item<E: Entity>(entity: &E, spec: &EnvelopeSpec) -> Result<Value, MarshallingError> {
    let bag = codec::encode(entity);
    let key = spec.properties.unwrap_or(NameKey::Property);
    let mut envelope = Map::new();
    envelope.insert(
        "email".to_string(),
        bag.get("email").map(PropertyValue::to_json).unwrap_or(Value::Null),
    );
    envelope.insert(PROPERTIES_KEY.to_string(), bag.to_wire(key));
    if let Some(id) = entity.id().filter(|id| *id >= 1) {
        insert_id(&mut envelope, spec.id, id);
    }
    Ok(Value::Object(envelope))
}

/// Decode one envelope into `E`.
pub fn decode_single<E: Entity>(raw: &Value, spec: &EnvelopeSpec) -> Result<E, MarshallingError> {
    let envelope = raw.as_object().ok_or_else(|| {
        MarshallingError::Malformed(format!("{} envelope must be an object, got {raw}", spec.entity))
    })?;

    let mut entity = E::default();
    if spec.properties.is_some() {
        let bag = match envelope.get(PROPERTIES_KEY) {
            Some(properties) => PropertyBag::from_wire(properties)?,
            None => PropertyBag::new(),
        };
        codec::decode_into(&mut entity, &bag)?;
    }
    entity.read_metadata(envelope)?;
    entity.set_id(read_id(envelope, spec.id)?);
    Ok(entity)
}

pub(crate) fn require_id<E: Entity>(entity: &E, spec: &EnvelopeSpec) -> Result<i64, MarshallingError> {
    entity
        .id()
        .filter(|id| *id >= 1)
        .ok_or(MarshallingError::MissingId {
            entity: spec.entity,
        })
}

fn encode_body<E: Entity>(entity: &E, spec: &EnvelopeSpec) -> Result<Map<String, Value>, MarshallingError> {
    let mut envelope = Map::new();
    entity.write_metadata(&mut envelope)?;
    if let Some(key) = spec.properties {
        envelope.insert(PROPERTIES_KEY.to_string(), codec::encode(entity).to_wire(key));
    }
    Ok(envelope)
}

fn insert_id(envelope: &mut Map<String, Value>, field: IdField, id: i64) {
    match field {
        IdField::TopLevel(key) => {
            envelope.insert(key.to_string(), Value::from(id));
        }
        IdField::Nested(parent, key) => {
            let slot = envelope
                .entry(parent.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                inner.insert(key.to_string(), Value::from(id));
            }
        }
    }
}

fn remove_id(envelope: &mut Map<String, Value>, field: IdField) {
    match field {
        IdField::TopLevel(key) => {
            envelope.remove(key);
        }
        IdField::Nested(parent, key) => {
            if let Some(Value::Object(inner)) = envelope.get_mut(parent) {
                inner.remove(key);
            }
        }
    }
}

fn read_id(envelope: &Map<String, Value>, field: IdField) -> Result<Option<i64>, MarshallingError> {
    let (raw, name) = match field {
        IdField::TopLevel(key) => (envelope.get(key), key),
        IdField::Nested(parent, key) => (envelope.get(parent).and_then(|p| p.get(key)), key),
    };
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| id_error(name, raw)),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| id_error(name, raw)),
        Some(_) => Err(id_error(name, raw)),
    }
}

fn id_error(name: &str, raw: Option<&Value>) -> MarshallingError {
    MarshallingError::Coercion {
        property: name.to_string(),
        expected: "a 64-bit integer",
        found: raw.map(Value::to_string).unwrap_or_default(),
    }
}
