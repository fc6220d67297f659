//! Remote entity base: lazy field access and dirty tracking.
//!
//! # Design
//! An `Entity` is a JSON field map plus the API path that addresses it. It is
//! either loaded (built from a full API response) or a stub (built from
//! identifying fields only). Reading a field a stub does not have fetches the
//! full representation once; writes only mark fields dirty until `save`
//! sends them as a partial update.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::http::HttpMethod;

/// Wire name of the custom variable map.
const VARS_FIELD: &str = "vars";

/// Custom variables attached to an entity, with their own dirty set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomVars {
    vars: Map<String, Value>,
    dirty: Map<String, Value>,
}

impl CustomVars {
    pub fn new(vars: Map<String, Value>) -> Self {
        Self {
            vars,
            dirty: Map::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Set a variable locally. Setting `null` deletes it on the next save.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        self.vars.insert(name.to_string(), value.clone());
        self.dirty.insert(name.to_string(), value);
    }

    pub fn all(&self) -> &Map<String, Value> {
        &self.vars
    }

    pub fn dirty(&self) -> &Map<String, Value> {
        &self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Replace the stored variables with `vars`, keeping unsaved local edits.
    fn reload(&mut self, vars: Map<String, Value>) {
        self.vars = vars;
        for (name, value) in &self.dirty {
            self.vars.insert(name.clone(), value.clone());
        }
    }
}

/// Local proxy for one remote resource.
#[derive(Debug, Clone)]
pub struct Entity {
    client: ApiClient,
    path: String,
    data: Map<String, Value>,
    vars: CustomVars,
    dirty: Map<String, Value>,
    loaded: bool,
}

impl Entity {
    pub(crate) fn new(client: ApiClient, path: String, mut data: Map<String, Value>, loaded: bool) -> Self {
        let vars = take_vars(&mut data);
        Self {
            client,
            path,
            data,
            vars: CustomVars::new(vars),
            dirty: Map::new(),
            loaded,
        }
    }

    pub fn id(&self) -> &str {
        self.data.get("id").and_then(Value::as_str).unwrap_or_default()
    }

    /// API path of this entity, relative to the client's base URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Path of a sub-resource or action below this entity.
    pub(crate) fn sub_path(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.path)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Fetch the full representation if this entity is a stub.
    ///
    /// Locally modified fields and variables are re-applied on top of the
    /// fetched data so unsaved edits survive.
    pub fn load(&mut self) -> Result<&mut Self, ApiError> {
        if self.loaded {
            return Ok(self);
        }
        debug!(path = %self.path, "loading entity");
        let value = self.client.get(&self.path, None)?;
        let mut data = match value {
            Value::Object(map) => map,
            other => {
                return Err(ApiError::DeserializationError(format!(
                    "expected object for {}, got {other}",
                    self.path
                )))
            }
        };
        let vars = take_vars(&mut data);
        self.vars.reload(vars);
        for (name, value) in &self.dirty {
            data.insert(name.clone(), value.clone());
        }
        self.data = data;
        self.loaded = true;
        Ok(self)
    }

    /// Read a field, loading a stub first when the field is unknown.
    pub fn get(&mut self, name: &str) -> Result<Option<&Value>, ApiError> {
        if !self.loaded && !self.data.contains_key(name) {
            self.load()?;
        }
        Ok(self.data.get(name))
    }

    /// Read a field and decode it as `T`. `null` reads as `None`.
    pub fn get_as<T: DeserializeOwned>(&mut self, name: &str) -> Result<Option<T>, ApiError> {
        match self.get(name)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ApiError::DeserializationError(format!("field `{name}`: {e}"))),
        }
    }

    /// Read a field without ever loading.
    pub fn cached(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Known fields, excluding custom variables.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Set a field locally and mark it dirty. Custom variables go through
    /// `vars_mut`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        if name == VARS_FIELD {
            match value {
                Value::Object(vars) => {
                    for (k, v) in vars {
                        self.vars.set(&k, v);
                    }
                }
                other => warn!(path = %self.path, value = %other, "ignoring non-object `vars`"),
            }
            return;
        }
        self.data.insert(name.to_string(), value.clone());
        self.dirty.insert(name.to_string(), value);
    }

    /// Custom variables, loading a stub first since a stub never carries them.
    pub fn vars(&mut self) -> Result<&CustomVars, ApiError> {
        self.load()?;
        Ok(&self.vars)
    }

    /// Custom variables as currently known, without ever loading.
    pub fn cached_vars(&self) -> &CustomVars {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut CustomVars {
        &mut self.vars
    }

    pub fn dirty_fields(&self) -> &Map<String, Value> {
        &self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty() || self.vars.is_dirty()
    }

    /// Persist dirty fields and variables as a partial update.
    ///
    /// Always issues the request, even when nothing is dirty.
    pub fn save(&mut self) -> Result<(), ApiError> {
        let mut update = self.dirty.clone();
        if self.vars.is_dirty() {
            update.insert(VARS_FIELD.to_string(), Value::Object(self.vars.dirty().clone()));
        }
        trace!(path = %self.path, fields = update.len(), "saving entity");
        self.client.post(&self.path, Some(&Value::Object(update)))?;
        self.dirty.clear();
        self.vars.clear_dirty();
        Ok(())
    }

    /// Delete the remote resource. The local value is stale afterwards.
    pub fn delete(&self) -> Result<(), ApiError> {
        self.client.request(HttpMethod::Delete, &self.path, None)?;
        Ok(())
    }

    /// Field holding an id list (`group_ids`, `label_ids`) contains `id`.
    pub(crate) fn list_contains(&mut self, field: &str, id: &str) -> Result<bool, ApiError> {
        Ok(self
            .get(field)?
            .and_then(Value::as_array)
            .is_some_and(|ids| ids.iter().any(|v| v.as_str() == Some(id))))
    }

    /// Add or remove `id` from a known id list without marking it dirty.
    /// A list the entity has not loaded yet is left for the next load.
    pub(crate) fn toggle_list_entry(&mut self, field: &str, id: &str, present: bool) {
        let Some(Value::Array(ids)) = self.data.get_mut(field) else {
            return;
        };
        ids.retain(|v| v.as_str() != Some(id));
        if present {
            ids.push(Value::from(id));
        }
    }
}

fn take_vars(data: &mut Map<String, Value>) -> Map<String, Value> {
    match data.remove(VARS_FIELD) {
        Some(Value::Object(vars)) => vars,
        _ => Map::new(),
    }
}
