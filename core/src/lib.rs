//! Synchronous client binding for the relay messaging platform's REST API.
//!
//! # Overview
//! Remote resources (projects, contacts, messages, ...) are mirrored by local
//! types that wrap one HTTP call per operation. Reads of a stub load it
//! lazily; writes stay local until `save`. List endpoints are walked with
//! [`ApiCursor`].
//!
//! # Design
//! - `ApiClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values itself; the round-trip goes through a [`Transport`], by default
//!   [`UreqTransport`]. Tests swap in their own transport.
//! - Every resource is a newtype over [`Entity`], which owns the field map,
//!   custom variables and dirty state.
//! - Errors from the server envelope, the network and decoding all surface
//!   as [`ApiError`]. Nothing is retried.
//!
//! ```no_run
//! use relay_core::{ApiClient, ClientConfig};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), relay_core::ApiError> {
//! let client = ApiClient::new(ClientConfig::from_env()?)?;
//! let project = client.init_project_by_id("PJ1");
//! let mut contact = project.get_or_create_contact(json!({"phone_number": "+15550001"}))?;
//! contact.set_name("Ana");
//! contact.save()?;
//! for message in project.query_messages(json!({"direction": "incoming"}))?.limit(50) {
//!     println!("{:?}", message?.content()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod cursor;
pub mod entity;
pub mod error;
pub mod http;
pub mod params;
pub mod resources;

pub use client::{parse_response, ApiClient};
pub use config::ClientConfig;
pub use cursor::{ApiCursor, FromApi, MAX_PAGE_SIZE};
pub use entity::{CustomVars, Entity};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use resources::{
    Broadcast, Contact, DataRow, DataTable, Group, Label, Message, Organization, Phone, Project,
    Route, ScheduledMessage, Service, Task,
};
