//! Property bag codec: typed entities to and from `PropertyBag`.
//!
//! # Design
//! Entities opt in by implementing `PropertyMapped`, normally through
//! `property_map!`. Encoding is full serialization: every mapped field is
//! written with its current value, and `None` goes out as null unless the
//! field is marked `[omit_unset]`. Decoding builds a last-write-wins lookup,
//! leaves absent fields at their defaults, and routes names no field asked
//! for into the entity's extras sink when it has one.

use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::error::MarshallingError;
use crate::property::PropertyBag;
use crate::value::{FromPropertyValue, PropertyValue, ToPropertyValue};

/// A type whose mapped fields travel in a property bag.
pub trait PropertyMapped: Default {
    fn write_properties(&self, bag: &mut BagWriter);

    fn read_properties(&mut self, bag: &mut BagReader<'_>) -> Result<(), MarshallingError>;

    /// Sink for properties no mapped field claims.
    fn extra_properties(&mut self) -> Option<&mut PropertyBag> {
        None
    }
}

/// Collects mapped fields during encode.
#[derive(Debug, Default)]
pub struct BagWriter {
    bag: PropertyBag,
}

impl BagWriter {
    /// Write `value` under `name`; `None` is written as null.
    pub fn put<V: ToPropertyValue + ?Sized>(&mut self, name: &str, value: &V) -> &mut Self {
        self.bag.set(name, value.to_property_value());
        self
    }

    /// Write `value` under `name` only when it is set.
    pub fn put_if_set<V: ToPropertyValue>(&mut self, name: &str, value: &Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.bag.set(name, value.to_property_value());
        }
        self
    }

    pub fn finish(self) -> PropertyBag {
        self.bag
    }
}

/// Name lookup over a decoded bag, remembering which names were claimed.
#[derive(Debug)]
pub struct BagReader<'a> {
    lookup: HashMap<&'a str, &'a PropertyValue>,
    claimed: HashSet<String>,
}

impl<'a> BagReader<'a> {
    pub fn new(bag: &'a PropertyBag) -> Self {
        // Later entries overwrite earlier ones: last write wins.
        let lookup = bag
            .iter()
            .map(|p| (p.name.as_str(), &p.value))
            .collect();
        Self {
            lookup,
            claimed: HashSet::new(),
        }
    }

    /// Read `name` into `T`, falling back to `T::default()` when the property
    /// is absent, null, or blank for a non-text type.
    pub fn get<T: FromPropertyValue + Default>(&mut self, name: &str) -> Result<T, MarshallingError> {
        self.claimed.insert(name.to_string());
        let value = match self.lookup.get(name) {
            None | Some(PropertyValue::Null) => return Ok(T::default()),
            Some(value) => *value,
        };
        if T::BLANK_IS_UNSET && matches!(value, PropertyValue::String(s) if s.is_empty()) {
            return Ok(T::default());
        }
        T::from_property_value(value).map_err(|c| MarshallingError::Coercion {
            property: name.to_string(),
            expected: c.expected,
            found: c.found,
        })
    }

    pub fn is_claimed(&self, name: &str) -> bool {
        self.claimed.contains(name)
    }
}

/// Encode every mapped field of `entity`.
pub fn encode<E: PropertyMapped>(entity: &E) -> PropertyBag {
    let mut writer = BagWriter::default();
    entity.write_properties(&mut writer);
    writer.finish()
}

/// Decode `bag` into a fresh `E`.
pub fn decode<E: PropertyMapped>(bag: &PropertyBag) -> Result<E, MarshallingError> {
    let mut entity = E::default();
    decode_into(&mut entity, bag)?;
    Ok(entity)
}

/// Decode `bag` into an existing entity, overwriting its mapped fields.
pub fn decode_into<E: PropertyMapped>(entity: &mut E, bag: &PropertyBag) -> Result<(), MarshallingError> {
    let mut reader = BagReader::new(bag);
    entity.read_properties(&mut reader)?;

    let mut unclaimed = PropertyBag::new();
    for property in bag {
        if !reader.is_claimed(&property.name) {
            unclaimed.set(property.name.clone(), property.value.clone());
        }
    }
    if unclaimed.is_empty() {
        return Ok(());
    }
    match entity.extra_properties() {
        Some(sink) => {
            for property in unclaimed {
                sink.set(property.name, property.value);
            }
        }
        None => {
            for name in unclaimed.names() {
                trace!(property = name, "discarding unmapped property");
            }
        }
    }
    Ok(())
}

/// Implement `PropertyMapped` for a struct by listing its mapped fields.
///
/// ```
/// use hubspot_core::{property_map, PropertyBag};
///
/// #[derive(Debug, Default)]
/// struct Lead {
///     email: Option<String>,
///     score: Option<i64>,
///     source: Option<String>,
///     extra: PropertyBag,
/// }
///
/// property_map!(Lead {
///     email,
///     score = "hubspotscore",
///     source [omit_unset],
/// } extras: extra);
/// ```
///
/// The wire name is the field identifier unless `= "alias"` is given.
/// `[omit_unset]` skips a `None` field instead of sending null.
#[macro_export]
macro_rules! property_map {
    (@wire $field:ident) => {
        stringify!($field)
    };
    (@wire $field:ident $wire:literal) => {
        $wire
    };
    (@put $bag:ident, $value:expr, $name:expr) => {
        $bag.put($name, $value)
    };
    (@put $bag:ident, $value:expr, $name:expr, omit_unset) => {
        $bag.put_if_set($name, $value)
    };
    (
        $ty:ty {
            $( $field:ident $(= $wire:literal)? $([$mode:ident])? ),* $(,)?
        }
        $(extras: $extras:ident)?
    ) => {
        impl $crate::codec::PropertyMapped for $ty {
            fn write_properties(&self, bag: &mut $crate::codec::BagWriter) {
                $(
                    $crate::property_map!(
                        @put bag,
                        &self.$field,
                        $crate::property_map!(@wire $field $($wire)?)
                        $(, $mode)?
                    );
                )*
            }

            fn read_properties(
                &mut self,
                bag: &mut $crate::codec::BagReader<'_>,
            ) -> ::std::result::Result<(), $crate::error::MarshallingError> {
                $(
                    self.$field = bag.get($crate::property_map!(@wire $field $($wire)?))?;
                )*
                Ok(())
            }

            $(
                fn extra_properties(&mut self) -> ::std::option::Option<&mut $crate::property::PropertyBag> {
                    ::std::option::Option::Some(&mut self.$extras)
                }
            )?
        }
    };
}
