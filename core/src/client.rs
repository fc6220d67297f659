//! Request dispatcher for the relay API.
//!
//! # Design
//! `ApiClient` splits each call into building a request and parsing a
//! response: `build_request` produces an `HttpRequest` and `parse_response`
//! consumes an `HttpResponse`, both free of I/O. `request` glues them
//! together through the configured `Transport`, counting every executed
//! call. Clones share the transport and the counter.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::cursor::{ApiCursor, FromApi};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::params;
use crate::resources::{Organization, Project};

/// Synchronous client for the relay messaging API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    num_requests: AtomicU64,
}

impl ApiClient {
    /// Client using the blocking ureq transport.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let transport = UreqTransport::new(&config);
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                num_requests: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Number of requests executed through this client and its clones.
    pub fn num_requests(&self) -> u64 {
        self.inner.num_requests.load(Ordering::Relaxed)
    }

    /// Describe one API call as an `HttpRequest`.
    ///
    /// `path` is relative to the configured API URL. GET and DELETE encode
    /// `params` into the query string; POST and PUT send them as JSON.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&Value>,
    ) -> Result<HttpRequest, ApiError> {
        let config = &self.inner.config;
        let mut url = format!("{}{path}", config.api_url);
        let mut headers = vec![
            ("authorization".to_string(), config.authorization()),
            ("user-agent".to_string(), config.user_agent.clone()),
            ("accept".to_string(), "application/json".to_string()),
        ];

        let body = if method.sends_body() {
            match params {
                Some(params) => {
                    let body = serde_json::to_string(params)
                        .map_err(|e| ApiError::SerializationError(e.to_string()))?;
                    headers.push(("content-type".to_string(), "application/json".to_string()));
                    Some(body)
                }
                None => None,
            }
        } else {
            if let Some(params) = params {
                let query = params::encode_query(params);
                if !query.is_empty() {
                    url.push('?');
                    url.push_str(&query);
                }
            }
            None
        };

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Send one request and return the parsed JSON response.
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let request = self.build_request(method, path, params)?;
        self.inner.num_requests.fetch_add(1, Ordering::Relaxed);
        debug!(%method, path, "sending API request");

        let response = self.inner.transport.execute(&request)?;
        debug!(%method, path, status = response.status, "received API response");
        parse_response(response)
    }

    pub(crate) fn get(&self, path: &str, params: Option<&Value>) -> Result<Value, ApiError> {
        self.request(HttpMethod::Get, path, params)
    }

    pub(crate) fn post(&self, path: &str, params: Option<&Value>) -> Result<Value, ApiError> {
        self.request(HttpMethod::Post, path, params)
    }

    /// POST `params` and convert the response into `T`, filling in parent
    /// ids the response leaves out.
    pub(crate) fn create<T: FromApi>(
        &self,
        path: &str,
        params: Value,
        ids: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let body = Value::Object(params::object(params)?);
        let mut value = self.post(path, Some(&body))?;
        fill_ids(&mut value, ids);
        T::from_api(self, value)
    }

    /// Cursor over a list endpoint whose items belong under `ids`.
    pub(crate) fn cursor<T: FromApi>(
        &self,
        path: String,
        params: Value,
        ids: &[(&str, &str)],
    ) -> Result<ApiCursor<T>, ApiError> {
        Ok(ApiCursor::new(self.clone(), path, params::object(params)?)?.with_ids(ids))
    }

    pub fn get_organization_by_id(&self, id: &str) -> Result<Organization, ApiError> {
        Organization::fetch(self, &[("id", id)])
    }

    /// Organization stub; fields load on first access.
    pub fn init_organization_by_id(&self, id: &str) -> Organization {
        Organization::stub(self, &[("id", id)])
    }

    /// Organizations the API key can access.
    pub fn query_organizations(&self, params: Value) -> Result<ApiCursor<Organization>, ApiError> {
        self.cursor("/organizations".to_string(), params, &[])
    }

    pub fn get_project_by_id(&self, id: &str) -> Result<Project, ApiError> {
        Project::fetch(self, &[("id", id)])
    }

    /// Project stub; fields load on first access.
    pub fn init_project_by_id(&self, id: &str) -> Project {
        Project::stub(self, &[("id", id)])
    }

    /// Projects the API key can access.
    pub fn query_projects(&self, params: Value) -> Result<ApiCursor<Project>, ApiError> {
        self.cursor("/projects".to_string(), params, &[])
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.inner.config)
            .field("num_requests", &self.num_requests())
            .finish()
    }
}

/// Add `ids` to an object response where it lacks them.
pub(crate) fn fill_ids(value: &mut Value, ids: &[(&str, &str)]) {
    if let Value::Object(map) = value {
        for (key, id) in ids {
            map.entry(key.to_string()).or_insert_with(|| Value::from(*id));
        }
    }
}

/// Parse a response body, mapping the platform's error envelope to
/// `ApiError`.
pub fn parse_response(response: HttpResponse) -> Result<Value, ApiError> {
    let success = (200..300).contains(&response.status);
    if response.body.trim().is_empty() {
        if success {
            return Ok(Value::Object(Map::new()));
        }
        return Err(ApiError::HttpError {
            status: response.status,
            body: response.body,
        });
    }

    let value: Value = match serde_json::from_str(&response.body) {
        Ok(value) => value,
        Err(e) if success => return Err(ApiError::DeserializationError(e.to_string())),
        Err(_) => {
            return Err(ApiError::HttpError {
                status: response.status,
                body: response.body,
            })
        }
    };

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        return Err(server_error(error));
    }
    if !success {
        return Err(ApiError::HttpError {
            status: response.status,
            body: response.body,
        });
    }
    Ok(value)
}

fn server_error(error: &Value) -> ApiError {
    match error {
        Value::Object(fields) => {
            let code = fields.get("code").and_then(Value::as_str).unwrap_or("unknown");
            let message = fields.get("message").and_then(Value::as_str).unwrap_or_default();
            let param = fields.get("param").and_then(Value::as_str);
            ApiError::from_server(code, message, param)
        }
        Value::String(message) => ApiError::from_server("unknown", message, None),
        other => ApiError::from_server("unknown", &other.to_string(), None),
    }
}
