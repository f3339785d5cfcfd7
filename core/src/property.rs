//! Property bags: the ordered `{name, value}` collections entities travel in.
//!
//! # Design
//! A bag only exists to cross the wire. Writes go out as an array of pairs
//! whose name key depends on the endpoint generation (`property` vs `name`).
//! Reads accept that array form as well as the keyed-map form single-entity
//! responses use (`{"email": {"value": "…"}}`).

use serde_json::{Map, Value};

use crate::error::MarshallingError;
use crate::value::PropertyValue;

/// Which key carries the property name in the pair-array form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKey {
    /// `{"property": "email", "value": …}` (contacts).
    Property,
    /// `{"name": "dealname", "value": …}` (companies, deals).
    Name,
}

impl NameKey {
    pub fn as_str(self) -> &'static str {
        match self {
            NameKey::Property => "property",
            NameKey::Name => "name",
        }
    }
}

/// One `(name, value)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An ordered sequence of properties.
///
/// Order is kept for round-trip fidelity. `set` keeps names unique; `push`
/// does not, which is how bags decoded off the wire may end up with
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    entries: Vec<Property>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Property> {
        self.entries.iter()
    }

    /// Append without checking for an existing entry of the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.entries.push(Property::new(name, value));
    }

    /// Replace the value of `name` in place, or append it.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Property { name, value }),
        }
    }

    /// Value of the last entry called `name`.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries
            .iter()
            .rev()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| p.name.as_str())
    }

    /// Entries whose value differs from `baseline`, for callers that want to
    /// send only what they changed.
    pub fn changed_since(&self, baseline: &PropertyBag) -> PropertyBag {
        self.entries
            .iter()
            .filter(|p| baseline.get(&p.name) != Some(&p.value))
            .cloned()
            .collect()
    }

    /// Pair-array wire form.
    pub fn to_wire(&self, key: NameKey) -> Value {
        let pairs = self
            .entries
            .iter()
            .map(|p| {
                let mut pair = Map::new();
                pair.insert(key.as_str().to_string(), Value::String(p.name.clone()));
                pair.insert("value".to_string(), p.value.to_json());
                Value::Object(pair)
            })
            .collect();
        Value::Array(pairs)
    }

    /// Parse either wire form. Pair names may use either name key.
    pub fn from_wire(raw: &Value) -> Result<Self, MarshallingError> {
        match raw {
            Value::Null => Ok(Self::new()),
            Value::Array(pairs) => pairs.iter().map(pair_from_wire).collect(),
            Value::Object(map) => Ok(map
                .iter()
                .map(|(name, entry)| Property::new(name.clone(), keyed_value(entry)))
                .collect()),
            other => Err(MarshallingError::Malformed(format!(
                "properties must be an array or object, got {other}"
            ))),
        }
    }
}

fn pair_from_wire(pair: &Value) -> Result<Property, MarshallingError> {
    let name = [NameKey::Property, NameKey::Name]
        .iter()
        .find_map(|key| pair.get(key.as_str()).and_then(Value::as_str))
        .ok_or_else(|| MarshallingError::Malformed(format!("property pair without a name: {pair}")))?;
    let value = pair.get("value").cloned().unwrap_or(Value::Null);
    Ok(Property::new(name, PropertyValue::from_json(value)))
}

/// `{"value": v, "versions": […]}` yields `v`; anything else is taken as is.
fn keyed_value(entry: &Value) -> PropertyValue {
    match entry {
        Value::Object(inner) if inner.contains_key("value") => {
            PropertyValue::from_json(inner.get("value").cloned().unwrap_or(Value::Null))
        }
        other => PropertyValue::from_json(other.clone()),
    }
}

impl FromIterator<Property> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for PropertyBag {
    type Item = Property;
    type IntoIter = std::vec::IntoIter<Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a PropertyBag {
    type Item = &'a Property;
    type IntoIter = std::slice::Iter<'a, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
