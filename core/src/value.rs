//! Dynamically typed property values and their coercion rules.
//!
//! The service does not tell the client what type a property has, so values
//! decoded off the wire stay in their raw JSON shape until a typed field asks
//! for them. `Date` only ever originates from typed entity fields.

use std::borrow::Cow;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Number, Value};

/// A single property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    String(String),
    Number(Number),
    Bool(bool),
    /// Travels as epoch milliseconds.
    Date(DateTime<Utc>),
    /// Objects and arrays, passed through without interpretation.
    Raw(Value),
}

impl PropertyValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => PropertyValue::Null,
            Value::String(s) => PropertyValue::String(s),
            Value::Number(n) => PropertyValue::Number(n),
            Value::Bool(b) => PropertyValue::Bool(b),
            raw @ (Value::Array(_) | Value::Object(_)) => PropertyValue::Raw(raw),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Null => Value::Null,
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Number(n) => Value::Number(n.clone()),
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Date(d) => Value::from(d.timestamp_millis()),
            PropertyValue::Raw(raw) => raw.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    /// Textual form, as the service would render the value.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            PropertyValue::Null => None,
            PropertyValue::String(s) => Some(Cow::Borrowed(s)),
            PropertyValue::Number(n) => Some(Cow::Owned(n.to_string())),
            PropertyValue::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
            PropertyValue::Date(d) => Some(Cow::Owned(d.timestamp_millis().to_string())),
            PropertyValue::Raw(raw) => Some(Cow::Owned(raw.to_string())),
        }
    }

    fn describe(&self) -> String {
        match self {
            PropertyValue::String(s) => format!("{s:?}"),
            other => other
                .as_text()
                .map(Cow::into_owned)
                .unwrap_or_else(|| "null".to_string()),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Number(value.into())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

/// Why a value could not be coerced; the reader adds the property name.
#[derive(Debug, Clone, PartialEq)]
pub struct Coercion {
    pub expected: &'static str,
    pub found: String,
}

impl Coercion {
    fn new(expected: &'static str, value: &PropertyValue) -> Self {
        Self {
            expected,
            found: value.describe(),
        }
    }
}

/// Types a mapped field can write into a property bag.
pub trait ToPropertyValue {
    fn to_property_value(&self) -> PropertyValue;
}

/// Types a mapped field can be read back into.
///
/// Readers never hand `Null` to `from_property_value`: a null or missing
/// property leaves the field at its default. When `BLANK_IS_UNSET` holds, an
/// empty string is treated the same way, since the service renders cleared
/// numeric and date properties as `""`.
pub trait FromPropertyValue: Sized {
    const BLANK_IS_UNSET: bool = true;

    fn from_property_value(value: &PropertyValue) -> Result<Self, Coercion>;
}

impl ToPropertyValue for String {
    fn to_property_value(&self) -> PropertyValue {
        PropertyValue::String(self.clone())
    }
}

impl ToPropertyValue for str {
    fn to_property_value(&self) -> PropertyValue {
        PropertyValue::String(self.to_string())
    }
}

impl FromPropertyValue for String {
    const BLANK_IS_UNSET: bool = false;

    fn from_property_value(value: &PropertyValue) -> Result<Self, Coercion> {
        value
            .as_text()
            .map(Cow::into_owned)
            .ok_or_else(|| Coercion::new("text", value))
    }
}

impl ToPropertyValue for bool {
    fn to_property_value(&self) -> PropertyValue {
        PropertyValue::Bool(*self)
    }
}

impl FromPropertyValue for bool {
    fn from_property_value(value: &PropertyValue) -> Result<Self, Coercion> {
        match value {
            PropertyValue::Bool(b) => Ok(*b),
            PropertyValue::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            PropertyValue::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(Coercion::new("a boolean", other)),
        }
    }
}

fn integer_of(value: &PropertyValue) -> Option<i128> {
    match value {
        PropertyValue::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        PropertyValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

macro_rules! integer_property {
    ($($ty:ty => $expected:literal),+ $(,)?) => {$(
        impl ToPropertyValue for $ty {
            fn to_property_value(&self) -> PropertyValue {
                PropertyValue::Number(Number::from(*self))
            }
        }

        impl FromPropertyValue for $ty {
            fn from_property_value(value: &PropertyValue) -> Result<Self, Coercion> {
                integer_of(value)
                    .and_then(|n| <$ty>::try_from(n).ok())
                    .ok_or_else(|| Coercion::new($expected, value))
            }
        }
    )+};
}

integer_property!(
    i32 => "a 32-bit integer",
    i64 => "a 64-bit integer",
    u32 => "an unsigned 32-bit integer",
    u64 => "an unsigned 64-bit integer",
);

impl ToPropertyValue for f64 {
    fn to_property_value(&self) -> PropertyValue {
        Number::from_f64(*self)
            .map(PropertyValue::Number)
            .unwrap_or(PropertyValue::Null)
    }
}

impl FromPropertyValue for f64 {
    fn from_property_value(value: &PropertyValue) -> Result<Self, Coercion> {
        let parsed = match value {
            PropertyValue::Number(n) => n.as_f64(),
            PropertyValue::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|f| f.is_finite())
            .ok_or_else(|| Coercion::new("a number", value))
    }
}

impl ToPropertyValue for DateTime<Utc> {
    fn to_property_value(&self) -> PropertyValue {
        PropertyValue::Date(*self)
    }
}

impl FromPropertyValue for DateTime<Utc> {
    fn from_property_value(value: &PropertyValue) -> Result<Self, Coercion> {
        let from_millis = |ms: i64| Utc.timestamp_millis_opt(ms).single();
        let parsed = match value {
            PropertyValue::Date(d) => Some(*d),
            PropertyValue::Number(n) => n.as_i64().and_then(from_millis),
            PropertyValue::String(s) => {
                let s = s.trim();
                match s.parse::<i64>() {
                    Ok(ms) => from_millis(ms),
                    Err(_) => DateTime::parse_from_rfc3339(s)
                        .ok()
                        .map(|d| d.with_timezone(&Utc)),
                }
            }
            _ => None,
        };
        parsed.ok_or_else(|| Coercion::new("a timestamp", value))
    }
}

impl ToPropertyValue for Value {
    fn to_property_value(&self) -> PropertyValue {
        PropertyValue::from_json(self.clone())
    }
}

impl FromPropertyValue for Value {
    const BLANK_IS_UNSET: bool = false;

    fn from_property_value(value: &PropertyValue) -> Result<Self, Coercion> {
        Ok(value.to_json())
    }
}

impl ToPropertyValue for PropertyValue {
    fn to_property_value(&self) -> PropertyValue {
        self.clone()
    }
}

impl<T: ToPropertyValue> ToPropertyValue for Option<T> {
    fn to_property_value(&self) -> PropertyValue {
        match self {
            Some(value) => value.to_property_value(),
            None => PropertyValue::Null,
        }
    }
}

impl<T: FromPropertyValue> FromPropertyValue for Option<T> {
    const BLANK_IS_UNSET: bool = T::BLANK_IS_UNSET;

    fn from_property_value(value: &PropertyValue) -> Result<Self, Coercion> {
        T::from_property_value(value).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_scalars_keep_their_shape() {
        assert_eq!(PropertyValue::from_json(json!(null)), PropertyValue::Null);
        assert_eq!(PropertyValue::from_json(json!("x")), PropertyValue::from("x"));
        assert_eq!(PropertyValue::from_json(json!(12)), PropertyValue::from(12));
        assert_eq!(PropertyValue::from_json(json!(true)), PropertyValue::Bool(true));
        assert!(matches!(
            PropertyValue::from_json(json!({"a": 1})),
            PropertyValue::Raw(_)
        ));
    }

    #[test]
    fn dates_travel_as_epoch_millis() {
        let when = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(PropertyValue::Date(when).to_json(), json!(1_700_000_000_123_i64));
    }

    #[test]
    fn numeric_strings_coerce_into_numbers() {
        let value = PropertyValue::from("250");
        assert_eq!(i64::from_property_value(&value), Ok(250));
        assert_eq!(u32::from_property_value(&value), Ok(250));
        assert_eq!(f64::from_property_value(&PropertyValue::from("12.5")), Ok(12.5));
    }

    #[test]
    fn non_numeric_strings_fail_to_coerce() {
        let err = i64::from_property_value(&PropertyValue::from("lots")).unwrap_err();
        assert_eq!(err.expected, "a 64-bit integer");
        assert_eq!(err.found, "\"lots\"");
        assert!(f64::from_property_value(&PropertyValue::from("NaN")).is_err());
    }

    #[test]
    fn out_of_range_integers_fail() {
        let value = PropertyValue::from(i64::from(i32::MAX) + 1);
        assert!(i32::from_property_value(&value).is_err());
        assert!(u64::from_property_value(&PropertyValue::from(-1)).is_err());
    }

    #[test]
    fn booleans_accept_text() {
        assert_eq!(bool::from_property_value(&PropertyValue::from("TRUE")), Ok(true));
        assert_eq!(bool::from_property_value(&PropertyValue::from("false")), Ok(false));
        assert!(bool::from_property_value(&PropertyValue::from("yes")).is_err());
    }

    #[test]
    fn timestamps_accept_millis_and_rfc3339() {
        let expected = Utc.timestamp_millis_opt(1_600_000_000_000).unwrap();
        let from_text = DateTime::<Utc>::from_property_value(&PropertyValue::from("1600000000000"));
        let from_number = DateTime::<Utc>::from_property_value(&PropertyValue::from(1_600_000_000_000));
        let from_rfc = DateTime::<Utc>::from_property_value(&PropertyValue::from(
            "2020-09-13T12:26:40Z",
        ));
        assert_eq!(from_text, Ok(expected));
        assert_eq!(from_number, Ok(expected));
        assert_eq!(from_rfc, Ok(expected));
    }

    #[test]
    fn strings_render_any_scalar() {
        assert_eq!(String::from_property_value(&PropertyValue::from(7)), Ok("7".to_string()));
        assert_eq!(
            String::from_property_value(&PropertyValue::Bool(false)),
            Ok("false".to_string())
        );
    }

    #[test]
    fn non_finite_floats_encode_as_null() {
        assert_eq!(f64::NAN.to_property_value(), PropertyValue::Null);
    }
}
