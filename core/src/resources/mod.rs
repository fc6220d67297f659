//! Typed resources of the relay API.
//!
//! Every resource is a thin newtype over [`Entity`](crate::entity::Entity)
//! that knows its API path. Generic operations (`get`, `set`, `save`,
//! `delete`, `vars`) come through `Deref`; each type adds typed field
//! accessors and the endpoint operations specific to it.

use serde_json::{Map, Value};

/// Declare a resource newtype addressed by the given id fields.
macro_rules! resource {
    (
        $(#[$meta:meta])*
        $name:ident {
            ids: [$($id:literal),+ $(,)?],
            path: |$data:ident| $path:expr $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            entity: $crate::entity::Entity,
        }

        impl $name {
            const ID_FIELDS: &'static [&'static str] = &[$($id),+];

            fn api_path($data: &::serde_json::Map<String, ::serde_json::Value>) -> String {
                $path
            }

            fn from_data(
                client: &$crate::client::ApiClient,
                data: ::serde_json::Map<String, ::serde_json::Value>,
                loaded: bool,
            ) -> Self {
                let path = Self::api_path(&data);
                Self {
                    entity: $crate::entity::Entity::new(client.clone(), path, data, loaded),
                }
            }

            /// Unloaded instance known only by its id fields.
            pub(crate) fn stub(client: &$crate::client::ApiClient, ids: &[(&str, &str)]) -> Self {
                let data = ids
                    .iter()
                    .map(|(k, v)| (k.to_string(), ::serde_json::Value::from(*v)))
                    .collect();
                Self::from_data(client, data, false)
            }

            /// Fetch the instance with the given id fields.
            pub(crate) fn fetch(
                client: &$crate::client::ApiClient,
                ids: &[(&str, &str)],
            ) -> Result<Self, $crate::error::ApiError> {
                let mut item = Self::stub(client, ids);
                item.entity.load()?;
                Ok(item)
            }

            pub fn into_entity(self) -> $crate::entity::Entity {
                self.entity
            }
        }

        impl $crate::cursor::FromApi for $name {
            fn from_api(
                client: &$crate::client::ApiClient,
                value: ::serde_json::Value,
            ) -> Result<Self, $crate::error::ApiError> {
                let data = match value {
                    ::serde_json::Value::Object(data) => data,
                    other => {
                        return Err($crate::error::ApiError::DeserializationError(format!(
                            "expected {} object, got {other}",
                            stringify!($name)
                        )))
                    }
                };
                for field in Self::ID_FIELDS {
                    if !data.get(*field).is_some_and(::serde_json::Value::is_string) {
                        return Err($crate::error::ApiError::MissingField(field.to_string()));
                    }
                }
                Ok(Self::from_data(client, data, true))
            }
        }

        impl ::std::ops::Deref for $name {
            type Target = $crate::entity::Entity;

            fn deref(&self) -> &Self::Target {
                &self.entity
            }
        }

        impl ::std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.entity
            }
        }
    };
}

/// Typed getters; a stub loads on first use.
macro_rules! fields {
    ($($(#[$meta:meta])* $field:ident: $ty:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $field(&mut self) -> Result<Option<$ty>, $crate::error::ApiError> {
                self.entity.get_as(stringify!($field))
            }
        )*
    };
}

/// Setters for writable fields; values persist on `save`.
macro_rules! setters {
    ($($(#[$meta:meta])* $setter:ident => $field:ident: $ty:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $setter(&mut self, value: $ty) {
                self.entity.set(stringify!($field), value);
            }
        )*
    };
}

mod broadcast;
mod contact;
mod data_row;
mod data_table;
mod group;
mod label;
mod message;
mod organization;
mod phone;
mod project;
mod route;
mod scheduled_message;
mod service;
mod task;

pub use broadcast::Broadcast;
pub use contact::Contact;
pub use data_row::DataRow;
pub use data_table::DataTable;
pub use group::Group;
pub use label::Label;
pub use message::Message;
pub use organization::Organization;
pub use phone::Phone;
pub use project::Project;
pub use route::Route;
pub use scheduled_message::ScheduledMessage;
pub use service::Service;
pub use task::Task;

/// String id field, empty when absent.
pub(crate) fn id_field<'a>(data: &'a Map<String, Value>, name: &str) -> &'a str {
    data.get(name).and_then(Value::as_str).unwrap_or_default()
}

/// Id field escaped for use as one path segment.
pub(crate) fn path_id(data: &Map<String, Value>, name: &str) -> String {
    crate::params::path_segment(id_field(data, name))
}

/// Insert `key` into a parameter object, accepting `null` as an empty one.
pub(crate) fn with_param(params: Value, key: &str, value: impl Into<Value>) -> Result<Value, crate::ApiError> {
    let mut params = crate::params::object(params)?;
    params.insert(key.to_string(), value.into());
    Ok(Value::Object(params))
}
