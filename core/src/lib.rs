//! Synchronous client core for the HubSpot CRM API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual HTTP round-trip, so the core is deterministic and testable.
//!
//! # Design
//! - `PropertyBag` is the wire form of most CRM records: an ordered list of
//!   name/value pairs. `property_map!` declares how a typed entity maps onto
//!   one, and `codec::encode` / `codec::decode` convert between the two.
//! - `envelope` adds the identifier and metadata around a bag; `list`
//!   decodes paged envelopes into a `Page` with a normalized `Cursor`.
//! - `HubSpotClient` is stateless and hands out one facade per resource,
//!   each split into `build_*` (produces a request) and `parse_*` (consumes
//!   a response), so the I/O boundary is explicit.

#[macro_use]
mod macros;

pub mod client;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod list;
pub mod property;
pub mod resources;
pub mod types;
pub mod value;

pub use client::HubSpotClient;
pub use codec::{decode, encode, BagReader, BagWriter, PropertyMapped};
pub use config::{ClientConfig, Credentials};
pub use envelope::{Entity, EnvelopeSpec, IdField};
pub use error::{ApiError, ConfigError, ErrorKind, LookupError, MarshallingError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use list::{Cursor, CursorField, CursorToken, HasMore, ListSpec, Page};
pub use property::{NameKey, Property, PropertyBag};
pub use resources::{ListOptions, ObjectType, RecentOptions};
pub use types::{
    Company, Contact, Deal, DealAssociations, Engagement, EngagementAssociations, EngagementHeader,
    EngagementType,
};
pub use value::{FromPropertyValue, PropertyValue, ToPropertyValue};
