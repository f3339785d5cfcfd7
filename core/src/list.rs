//! Paginated list envelopes and the normalized cursor.
//!
//! # Design
//! Each list endpoint names its items array, its cursor fields, and its
//! "more results" flag differently. A static `ListSpec` per endpoint records
//! those names, so decoding and next-page query construction are the same
//! two functions for every resource. Cursors are opaque and forward-only:
//! page N+1 needs page N's cursor, and nothing guarantees stability if the
//! collection changes between calls.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::MarshallingError;

/// A single pagination token as the service sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorToken {
    Number(i64),
    Text(String),
}

impl fmt::Display for CursorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorToken::Number(n) => write!(f, "{n}"),
            CursorToken::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for CursorToken {
    fn from(value: i64) -> Self {
        CursorToken::Number(value)
    }
}

impl From<&str> for CursorToken {
    fn from(value: &str) -> Self {
        CursorToken::Text(value.to_string())
    }
}

/// Normalized pagination position: an offset plus an optional time offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub offset: Option<CursorToken>,
    pub time_offset: Option<CursorToken>,
}

impl Cursor {
    pub fn offset(offset: impl Into<CursorToken>) -> Self {
        Self {
            offset: Some(offset.into()),
            time_offset: None,
        }
    }

    pub fn with_time_offset(mut self, time_offset: impl Into<CursorToken>) -> Self {
        self.time_offset = Some(time_offset.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.offset.is_none() && self.time_offset.is_none()
    }
}

/// How a list endpoint says whether more pages exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasMore {
    /// Boolean flag under this key; absent means no more.
    Flag(&'static str),
    /// More pages exist whenever a cursor came back.
    CursorPresent,
    /// The flag when present, otherwise cursor presence.
    FlagOrCursor(&'static str),
}

/// One cursor field: its name in responses and in requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorField {
    pub response_key: &'static str,
    /// Set when the response wraps the token in an object under
    /// `response_key`.
    pub inner_key: Option<&'static str>,
    pub request_param: &'static str,
}

impl CursorField {
    pub const fn new(response_key: &'static str, request_param: &'static str) -> Self {
        Self {
            response_key,
            inner_key: None,
            request_param,
        }
    }

    /// A token read from `response_key.inner_key`.
    pub const fn nested(response_key: &'static str, inner_key: &'static str, request_param: &'static str) -> Self {
        Self {
            response_key,
            inner_key: Some(inner_key),
            request_param,
        }
    }
}

/// Static description of one list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSpec {
    pub items_key: &'static str,
    pub has_more: HasMore,
    pub offset: Option<CursorField>,
    pub time_offset: Option<CursorField>,
    pub limit_param: &'static str,
    pub default_limit: u32,
    pub total_key: Option<&'static str>,
}

impl ListSpec {
    /// Query parameters for the page at `cursor`.
    pub fn page_params(&self, cursor: Option<&Cursor>, limit: Option<u32>) -> Vec<(&'static str, String)> {
        let mut params = vec![(self.limit_param, limit.unwrap_or(self.default_limit).to_string())];
        let Some(cursor) = cursor else {
            return params;
        };
        if let (Some(field), Some(token)) = (self.offset, &cursor.offset) {
            params.push((field.request_param, token.to_string()));
        }
        if let (Some(field), Some(token)) = (self.time_offset, &cursor.time_offset) {
            params.push((field.request_param, token.to_string()));
        }
        params
    }
}

/// One decoded page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub cursor: Cursor,
    pub has_more: bool,
    /// Total result count, for endpoints that report one.
    pub total: Option<u64>,
}

impl<T> Page<T> {
    /// Cursor for the following page, while there is one.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.has_more.then_some(&self.cursor)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Decode a list envelope, applying `decode_item` to every element.
pub fn decode_list<T, F>(raw: &Value, spec: &ListSpec, mut decode_item: F) -> Result<Page<T>, MarshallingError>
where
    F: FnMut(&Value) -> Result<T, MarshallingError>,
{
    let envelope = raw
        .as_object()
        .ok_or_else(|| MarshallingError::Malformed(format!("list envelope must be an object, got {raw}")))?;

    let items = match envelope.get(spec.items_key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(&mut decode_item)
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(MarshallingError::Malformed(format!(
                "`{}` must be an array, got {other}",
                spec.items_key
            )))
        }
    };

    let cursor = Cursor {
        offset: read_token(envelope, spec.offset)?,
        time_offset: read_token(envelope, spec.time_offset)?,
    };
    let flag = |key: &str| envelope.get(key).and_then(Value::as_bool);
    let has_more = match spec.has_more {
        HasMore::Flag(key) => flag(key).unwrap_or(false),
        HasMore::CursorPresent => !cursor.is_empty(),
        HasMore::FlagOrCursor(key) => flag(key).unwrap_or(!cursor.is_empty()),
    };
    let total = spec
        .total_key
        .and_then(|key| envelope.get(key))
        .and_then(Value::as_u64);

    Ok(Page {
        items,
        cursor,
        has_more,
        total,
    })
}

fn read_token(envelope: &Map<String, Value>, field: Option<CursorField>) -> Result<Option<CursorToken>, MarshallingError> {
    let Some(field) = field else {
        return Ok(None);
    };
    let raw = match (envelope.get(field.response_key), field.inner_key) {
        (Some(Value::Object(outer)), Some(inner)) => outer.get(inner),
        (raw, _) => raw,
    };
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(|n| Some(CursorToken::Number(n))).ok_or_else(|| {
            MarshallingError::Malformed(format!("`{}` is not an integer: {n}", field.response_key))
        }),
        Some(Value::String(s)) => Ok(Some(CursorToken::Text(s.clone()))),
        Some(other) => Err(MarshallingError::Malformed(format!(
            "`{}` must be a number or string, got {other}",
            field.response_key
        ))),
    }
}
