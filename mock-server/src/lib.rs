//! In-memory stand-in for the relay messaging API.
//!
//! Every route lives under `/v1/{*path}` and is dispatched on its path
//! segments: odd-length paths name a collection (`projects/PJ1/contacts`),
//! even-length paths name an item (`projects/PJ1/contacts/CT1`). A handful
//! of action endpoints (`messages/send`, group and label membership, cancel)
//! are matched before the generic collection rules.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

/// The only API key the mock accepts.
pub const MOCK_API_KEY: &str = "mock-api-key";
/// Organization present in every fresh store.
pub const MOCK_ORGANIZATION_ID: &str = "OR0000000000000001";

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

/// Collection names the generic rules serve.
const COLLECTIONS: &[&str] = &[
    "organizations",
    "projects",
    "contacts",
    "messages",
    "broadcasts",
    "groups",
    "labels",
    "phones",
    "tables",
    "rows",
    "scheduled",
    "tasks",
    "services",
    "routes",
];

/// Query parameters that control listing rather than filter it.
const LIST_CONTROLS: &[&str] = &["count", "page_size", "offset", "marker", "sort", "sort_dir"];

pub type Item = Map<String, Value>;

/// Items keyed by collection path (`/projects/PJ1/contacts`), in insertion
/// order.
#[derive(Debug)]
pub struct Store {
    collections: HashMap<String, Vec<Item>>,
}

pub type Db = Arc<RwLock<Store>>;

/// Error in the platform's envelope format.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    code: &'static str,
    message: String,
    param: Option<String>,
}

impl ApiFailure {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: message.into(),
            param: None,
        }
    }

    fn invalid_param(param: &str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_param",
            message: message.into(),
            param: Some(param.to_string()),
        }
    }

    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "unauthorized",
            message: "invalid API key".to_string(),
            param: None,
        }
    }

    pub fn code(&self) -> &str {
        self.code
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let mut error = json!({"code": self.code, "message": self.message});
        if let Some(param) = self.param {
            error["param"] = Value::from(param);
        }
        (self.status, Json(json!({ "error": error }))).into_response()
    }
}

/// A request after auth, reduced to what the store needs.
#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Item,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::new()));
    Router::new()
        .route("/v1/{*path}", any(dispatch))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn dispatch(
    State(db): State<Db>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiFailure> {
    debug!(%method, path = %path, "mock request");
    if !authorized(&headers) {
        return Err(ApiFailure::unauthorized());
    }

    let query = query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();
    let body = if body.is_empty() {
        Map::new()
    } else {
        match serde_json::from_slice(&body) {
            Ok(Value::Object(body)) => body,
            _ => return Err(ApiFailure::invalid_param("body", "request body must be a JSON object")),
        }
    };
    let request = ApiRequest {
        method,
        segments: path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        query,
        body,
    };

    let mut store = db.write().await;
    store.handle(&request).map(Json)
}

fn authorized(headers: &HeaderMap) -> bool {
    let Some(credentials) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
    else {
        return false;
    };
    let Ok(decoded) = STANDARD.decode(credentials) else {
        return false;
    };
    let decoded = String::from_utf8_lossy(&decoded);
    decoded.split_once(':').map(|(user, _)| user) == Some(MOCK_API_KEY)
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Store seeded with the mock organization.
    pub fn new() -> Self {
        let mut organization = Map::new();
        organization.insert("id".to_string(), Value::from(MOCK_ORGANIZATION_ID));
        organization.insert("name".to_string(), Value::from("Mock Organization"));
        organization.insert("company_name".to_string(), Value::from("Mock Ltd"));
        let mut collections = HashMap::new();
        collections.insert("/organizations".to_string(), vec![organization]);
        Self { collections }
    }

    pub fn handle(&mut self, req: &ApiRequest) -> Result<Value, ApiFailure> {
        let segs: Vec<&str> = req.segments.iter().map(String::as_str).collect();
        match (req.method.as_str(), segs.as_slice()) {
            ("GET", ["organizations", org, "projects"]) => {
                self.find("/organizations", org)?;
                let org = *org;
                self.list("/projects", &req.query, |p| field_is(p, "organization_id", org))
            }
            ("POST", ["organizations", org, "projects"]) => {
                self.find("/organizations", org)?;
                let mut body = req.body.clone();
                body.insert("organization_id".to_string(), Value::from(*org));
                Ok(Value::Object(self.insert("/projects", "projects", body)))
            }
            ("POST", ["projects", pid, "messages", "send"]) => self.send_message(pid, &req.body),
            ("POST", ["projects", pid, "messages", "receive"]) => {
                self.receive_message(pid, &req.body)
            }
            ("GET", ["projects", pid, "groups", gid, "contacts"]) => {
                self.find(&format!("/projects/{pid}/groups"), gid)?;
                let gid = *gid;
                self.list(&format!("/projects/{pid}/contacts"), &req.query, |c| {
                    list_has(c, "group_ids", gid)
                })
            }
            (method @ ("PUT" | "DELETE"), ["projects", pid, "groups", gid, "contacts", cid]) => self
                .set_membership(
                    pid,
                    ("groups", *gid),
                    ("contacts", *cid),
                    "group_ids",
                    method == "PUT",
                ),
            ("GET", ["projects", pid, "labels", lid, "messages"]) => {
                self.find(&format!("/projects/{pid}/labels"), lid)?;
                let lid = *lid;
                self.list(&format!("/projects/{pid}/messages"), &req.query, |m| {
                    list_has(m, "label_ids", lid)
                })
            }
            (method @ ("PUT" | "DELETE"), ["projects", pid, "labels", lid, "messages", mid]) => self
                .set_membership(
                    pid,
                    ("labels", *lid),
                    ("messages", *mid),
                    "label_ids",
                    method == "PUT",
                ),
            ("GET", ["projects", pid, "contacts", cid, "messages"]) => {
                self.find(&format!("/projects/{pid}/contacts"), cid)?;
                let cid = *cid;
                self.list(&format!("/projects/{pid}/messages"), &req.query, |m| {
                    field_is(m, "contact_id", cid)
                })
            }
            ("GET", ["projects", pid, "contacts", cid, "groups"]) => {
                let contact = self.find(&format!("/projects/{pid}/contacts"), cid)?.clone();
                self.list(&format!("/projects/{pid}/groups"), &req.query, |g| {
                    g.get("id")
                        .and_then(Value::as_str)
                        .is_some_and(|gid| list_has(&contact, "group_ids", gid))
                })
            }
            (
                "POST",
                ["projects", pid, kind @ ("messages" | "broadcasts" | "tasks"), id, "cancel"],
            ) => {
                let item = self.find_mut(&format!("/projects/{pid}/{kind}"), id)?;
                item.insert("status".to_string(), Value::from("cancelled"));
                Ok(Value::Object(item.clone()))
            }
            (method, segs) if segs.len() % 2 == 1 && is_collection(segs) => {
                self.require_parent(segs)?;
                let key = collection_key(segs);
                match method {
                    "GET" => self.list(&key, &req.query, |_| true),
                    "POST" => self.create(segs, &req.body),
                    _ => Err(ApiFailure::not_found(format!("no {method} on {key}"))),
                }
            }
            (method, [parent @ .., id]) if !parent.is_empty() && is_collection(parent) => {
                let key = collection_key(parent);
                match method {
                    "GET" => Ok(Value::Object(self.find(&key, id)?.clone())),
                    "POST" => {
                        let item = self.find_mut(&key, id)?;
                        apply_update(item, &req.body);
                        Ok(Value::Object(item.clone()))
                    }
                    "DELETE" => {
                        self.remove(&key, id)?;
                        Ok(json!({}))
                    }
                    _ => Err(ApiFailure::not_found(format!("no {method} on {key}/{id}"))),
                }
            }
            _ => Err(ApiFailure::not_found(format!(
                "no route for {} /{}",
                req.method,
                segs.join("/")
            ))),
        }
    }

    fn items(&self, key: &str) -> &[Item] {
        self.collections.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    fn find(&self, key: &str, id: &str) -> Result<&Item, ApiFailure> {
        self.items(key)
            .iter()
            .find(|item| field_is(item, "id", id))
            .ok_or_else(|| ApiFailure::not_found(format!("{key}/{id} not found")))
    }

    fn find_mut(&mut self, key: &str, id: &str) -> Result<&mut Item, ApiFailure> {
        self.collections
            .get_mut(key)
            .and_then(|items| items.iter_mut().find(|item| field_is(item, "id", id)))
            .ok_or_else(|| ApiFailure::not_found(format!("{key}/{id} not found")))
    }

    fn remove(&mut self, key: &str, id: &str) -> Result<(), ApiFailure> {
        let items = self.collections.get_mut(key);
        let position = items
            .as_ref()
            .and_then(|items| items.iter().position(|item| field_is(item, "id", id)));
        match (items, position) {
            (Some(items), Some(position)) => {
                items.remove(position);
                Ok(())
            }
            _ => Err(ApiFailure::not_found(format!("{key}/{id} not found"))),
        }
    }

    /// The item a nested collection hangs off must exist.
    fn require_parent(&self, segs: &[&str]) -> Result<(), ApiFailure> {
        if let [parent @ .., id, _] = segs {
            if !parent.is_empty() {
                self.find(&collection_key(parent), id)?;
            }
        }
        Ok(())
    }

    fn insert(&mut self, key: &str, kind: &str, fields: Item) -> Item {
        let mut item = defaults(kind);
        item.insert("id".to_string(), Value::from(new_id(kind)));
        item.insert("time_created".to_string(), Value::from(now()));
        apply_update(&mut item, &fields);
        self.collections
            .entry(key.to_string())
            .or_default()
            .push(item.clone());
        item
    }

    /// POST to a collection: create, or update the item matching the
    /// collection's natural key.
    fn create(&mut self, segs: &[&str], body: &Item) -> Result<Value, ApiFailure> {
        let key = collection_key(segs);
        let kind = segs.last().copied().unwrap_or_default();
        let natural_key = match kind {
            "contacts" => Some("phone_number"),
            "groups" | "labels" | "tables" => Some("name"),
            _ => None,
        };
        if natural_key == Some("name") && !body.get("name").is_some_and(Value::is_string) {
            return Err(ApiFailure::invalid_param("name", "name is required"));
        }

        if let Some(field) = natural_key {
            if let Some(value) = body.get(field).and_then(Value::as_str) {
                let existing = self
                    .collections
                    .get_mut(&key)
                    .and_then(|items| items.iter_mut().find(|item| field_is(item, field, value)));
                if let Some(item) = existing {
                    apply_update(item, body);
                    return Ok(Value::Object(item.clone()));
                }
            }
        }

        let mut fields = parent_ids(segs);
        fields.extend(body.clone());
        Ok(Value::Object(self.insert(&key, kind, fields)))
    }

    /// Contact with `phone_number`, created when missing.
    fn contact_for(&mut self, pid: &str, phone_number: &str) -> String {
        let key = format!("/projects/{pid}/contacts");
        if let Some(id) = self
            .items(&key)
            .iter()
            .find(|c| field_is(c, "phone_number", phone_number))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_str)
        {
            return id.to_string();
        }
        let mut fields = Map::new();
        fields.insert("project_id".to_string(), Value::from(pid));
        fields.insert("phone_number".to_string(), Value::from(phone_number));
        let contact = self.insert(&key, "contacts", fields);
        contact
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn send_message(&mut self, pid: &str, body: &Item) -> Result<Value, ApiFailure> {
        self.find("/projects", pid)?;
        let contact_id = match (body.get("to_number"), body.get("contact_id")) {
            (Some(Value::String(to)), _) => self.contact_for(pid, to),
            (_, Some(Value::String(cid))) => {
                self.find(&format!("/projects/{pid}/contacts"), cid)?;
                cid.clone()
            }
            _ => {
                return Err(ApiFailure::invalid_param(
                    "to_number",
                    "to_number or contact_id is required",
                ))
            }
        };
        let mut fields = body.clone();
        fields.insert("project_id".to_string(), Value::from(pid));
        fields.insert("contact_id".to_string(), Value::from(contact_id));
        fields.insert("direction".to_string(), Value::from("outgoing"));
        fields.insert("status".to_string(), Value::from("queued"));
        let message = self.insert(&format!("/projects/{pid}/messages"), "messages", fields);
        Ok(Value::Object(message))
    }

    fn receive_message(&mut self, pid: &str, body: &Item) -> Result<Value, ApiFailure> {
        self.find("/projects", pid)?;
        let Some(from) = body.get("from_number").and_then(Value::as_str) else {
            return Err(ApiFailure::invalid_param("from_number", "from_number is required"));
        };
        let contact_id = self.contact_for(pid, from);
        let mut fields = body.clone();
        fields.insert("project_id".to_string(), Value::from(pid));
        fields.insert("contact_id".to_string(), Value::from(contact_id));
        fields.insert("direction".to_string(), Value::from("incoming"));
        fields.insert("status".to_string(), Value::from("received"));
        let message = self.insert(&format!("/projects/{pid}/messages"), "messages", fields);
        Ok(Value::Object(message))
    }

    /// Add or remove `parent` in the child's id list (`group_ids`,
    /// `label_ids`).
    fn set_membership(
        &mut self,
        pid: &str,
        (parent_kind, parent_id): (&str, &str),
        (child_kind, child_id): (&str, &str),
        field: &str,
        present: bool,
    ) -> Result<Value, ApiFailure> {
        self.find(&format!("/projects/{pid}/{parent_kind}"), parent_id)?;
        let child = self.find_mut(&format!("/projects/{pid}/{child_kind}"), child_id)?;
        let ids = child
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(ids) = ids {
            ids.retain(|v| v.as_str() != Some(parent_id));
            if present {
                ids.push(Value::from(parent_id));
            }
        }
        Ok(json!({}))
    }

    fn list(
        &self,
        key: &str,
        query: &[(String, String)],
        keep: impl Fn(&Item) -> bool,
    ) -> Result<Value, ApiFailure> {
        let list = ListQuery::parse(query)?;
        let matching: Vec<&Item> = self
            .items(key)
            .iter()
            .filter(|item| keep(*item))
            .filter(|item| list.filters.iter().all(|f| f.matches(item)))
            .collect();
        if list.count {
            return Ok(json!({ "count": matching.len() }));
        }

        let start = list.offset.min(matching.len());
        let end = (start + list.page_size).min(matching.len());
        let data: Vec<Value> = matching[start..end]
            .iter()
            .map(|item| Value::Object((*item).clone()))
            .collect();
        let truncated = end < matching.len();
        Ok(json!({
            "data": data,
            "truncated": truncated,
            "next_marker": truncated.then(|| end.to_string()),
        }))
    }
}

#[derive(Debug, PartialEq)]
enum Filter {
    Equals(String, String),
    NotEquals(String, String),
    Prefix(String, String),
    Var(String, String),
}

impl Filter {
    fn matches(&self, item: &Item) -> bool {
        match self {
            Filter::Equals(field, value) => item.get(field).map(param_text).as_deref() == Some(value.as_str()),
            Filter::NotEquals(field, value) => {
                item.get(field).map(param_text).as_deref() != Some(value.as_str())
            }
            Filter::Prefix(field, prefix) => item
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            Filter::Var(name, value) => {
                item.get("vars").and_then(|vars| vars.get(name)).map(param_text).as_deref()
                    == Some(value.as_str())
            }
        }
    }
}

#[derive(Debug)]
struct ListQuery {
    count: bool,
    page_size: usize,
    offset: usize,
    filters: Vec<Filter>,
}

impl ListQuery {
    fn parse(query: &[(String, String)]) -> Result<Self, ApiFailure> {
        let lookup = |name: &str| query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());

        let page_size = match lookup("page_size") {
            None => DEFAULT_PAGE_SIZE,
            Some(raw) => match raw.parse::<usize>() {
                Ok(size) if (1..=MAX_PAGE_SIZE).contains(&size) => size,
                _ => {
                    return Err(ApiFailure::invalid_param(
                        "page_size",
                        format!("page_size must be between 1 and {MAX_PAGE_SIZE}"),
                    ))
                }
            },
        };
        let offset = match lookup("marker").or(lookup("offset")) {
            None => 0,
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| ApiFailure::invalid_param("marker", "invalid marker"))?,
        };

        let mut filters = Vec::new();
        for (key, value) in query {
            if LIST_CONTROLS.contains(&key.as_str()) {
                continue;
            }
            let filter = match key.split_once('[') {
                None => Filter::Equals(key.clone(), value.clone()),
                Some((field, rest)) => {
                    let op = rest.strip_suffix(']').unwrap_or(rest);
                    match (field, op) {
                        ("vars", name) => Filter::Var(name.to_string(), value.clone()),
                        (field, "prefix") => Filter::Prefix(field.to_string(), value.clone()),
                        (field, "ne") => Filter::NotEquals(field.to_string(), value.clone()),
                        _ => {
                            return Err(ApiFailure::invalid_param(
                                key,
                                format!("unsupported filter `{key}`"),
                            ))
                        }
                    }
                }
            };
            filters.push(filter);
        }

        Ok(Self {
            count: lookup("count").is_some_and(|v| v == "1" || v == "true"),
            page_size,
            offset,
            filters,
        })
    }
}

/// Merge `fields` into `item`; `vars` merge key by key and `null` removes a
/// variable.
fn apply_update(item: &mut Item, fields: &Item) {
    for (name, value) in fields {
        if name == "id" {
            continue;
        }
        if name == "vars" {
            let Value::Object(updates) = value else { continue };
            let vars = item
                .entry("vars".to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(vars) = vars {
                for (k, v) in updates {
                    if v.is_null() {
                        vars.remove(k);
                    } else {
                        vars.insert(k.clone(), v.clone());
                    }
                }
            }
            continue;
        }
        item.insert(name.clone(), value.clone());
    }
}

fn defaults(kind: &str) -> Item {
    let defaults = match kind {
        "contacts" => json!({"group_ids": [], "send_blocked": false, "conversation_status": "closed", "vars": {}}),
        "messages" => json!({"label_ids": [], "starred": false, "message_type": "sms", "vars": {}}),
        "groups" => json!({"dynamic": false, "allow_sending": true}),
        "tables" | "rows" | "projects" => json!({"vars": {}}),
        _ => json!({}),
    };
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Parent ids implied by a collection path, e.g. `project_id` and
/// `table_id` for `projects/PJ1/tables/DT1/rows`.
fn parent_ids(segs: &[&str]) -> Item {
    let mut ids = Map::new();
    for pair in segs.chunks_exact(2) {
        let field = match pair[0] {
            "organizations" => "organization_id",
            "projects" => "project_id",
            "tables" => "table_id",
            _ => continue,
        };
        ids.insert(field.to_string(), Value::from(pair[1]));
    }
    ids
}

fn is_collection(segs: &[&str]) -> bool {
    segs.last().is_some_and(|name| COLLECTIONS.contains(name))
}

fn collection_key(segs: &[&str]) -> String {
    format!("/{}", segs.join("/"))
}

fn new_id(kind: &str) -> String {
    let prefix = match kind {
        "projects" => "PJ",
        "contacts" => "CT",
        "messages" => "SM",
        "broadcasts" => "BC",
        "groups" => "CG",
        "labels" => "LB",
        "phones" => "PN",
        "tables" => "DT",
        "rows" => "DR",
        "scheduled" => "SC",
        "tasks" => "TK",
        "services" => "SV",
        "routes" => "RT",
        _ => "ID",
    };
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", &hex[..16])
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn field_is(item: &Item, field: &str, value: &str) -> bool {
    item.get(field).and_then(Value::as_str) == Some(value)
}

fn list_has(item: &Item, field: &str, id: &str) -> bool {
    item.get(field)
        .and_then(Value::as_array)
        .is_some_and(|ids| ids.iter().any(|v| v.as_str() == Some(id)))
}

/// A JSON value as the client encodes it in a query string.
fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
