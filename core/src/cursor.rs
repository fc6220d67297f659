//! Pagination cursor over list endpoints.
//!
//! # Design
//! List endpoints answer with `data`, `truncated` and `next_marker`. The
//! cursor buffers one page at a time and follows `next_marker` only when the
//! buffered page is exhausted and the server said more data exists, skipping
//! over empty truncated pages. Counting
//! is a separate request (`count=1`) so it never interferes with iteration.

use std::marker::PhantomData;

use serde_json::{Map, Value};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::ApiError;

/// Largest page the cursor asks for when it derives `page_size` from a limit.
pub const MAX_PAGE_SIZE: usize = 200;

/// Conversion from one JSON item of an API response.
pub trait FromApi: Sized {
    fn from_api(client: &ApiClient, value: Value) -> Result<Self, ApiError>;
}

impl FromApi for Value {
    fn from_api(_client: &ApiClient, value: Value) -> Result<Self, ApiError> {
        Ok(value)
    }
}

/// Iterator over every item matching a list query.
#[derive(Debug)]
pub struct ApiCursor<T> {
    client: ApiClient,
    path: String,
    params: Map<String, Value>,
    limit: Option<usize>,
    count: Option<u64>,
    page: Option<Vec<Value>>,
    pos: usize,
    truncated: bool,
    next_marker: Option<String>,
    ids: Vec<(String, String)>,
    yielded: usize,
    failed: bool,
    _item: PhantomData<fn() -> T>,
}

impl<T: FromApi> ApiCursor<T> {
    pub(crate) fn new(
        client: ApiClient,
        path: String,
        params: Map<String, Value>,
    ) -> Result<Self, ApiError> {
        if params.contains_key("count") {
            return Err(ApiError::InvalidArgument(
                "cannot construct a cursor with a `count` parameter; call total_count() instead".to_string(),
            ));
        }
        Ok(Self {
            client,
            path,
            params,
            limit: None,
            count: None,
            page: None,
            pos: 0,
            truncated: false,
            next_marker: None,
            ids: Vec::new(),
            yielded: 0,
            failed: false,
            _item: PhantomData,
        })
    }

    /// Stop after `limit` items.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Parent ids to fill into items that lack them.
    pub(crate) fn with_ids(mut self, ids: &[(&str, &str)]) -> Self {
        self.ids = ids.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Total number of items matching the query, from a single count request.
    pub fn total_count(&mut self) -> Result<u64, ApiError> {
        if let Some(count) = self.count {
            return Ok(count);
        }
        let mut params = self.params.clone();
        params.insert("count".to_string(), Value::from(1));
        let response = self.client.get(&self.path, Some(&Value::Object(params)))?;
        let count = response
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| ApiError::MissingField("count".to_string()))?;
        self.count = Some(count);
        Ok(count)
    }

    /// Whether another item is available, fetching a page if needed.
    pub fn has_next(&mut self) -> Result<bool, ApiError> {
        if self.limit_reached() {
            return Ok(false);
        }
        while self.needs_page() {
            self.load_next_page()?;
        }
        Ok(self.buffered() > 0)
    }

    /// Next item, or `None` at the end of the sequence.
    pub fn next_item(&mut self) -> Result<Option<T>, ApiError> {
        if self.limit_reached() {
            return Ok(None);
        }
        while self.needs_page() {
            self.load_next_page()?;
        }
        let Some(mut value) = self.page.as_mut().and_then(|page| {
            page.get_mut(self.pos).map(Value::take)
        }) else {
            return Ok(None);
        };
        self.pos += 1;
        self.yielded += 1;
        if let Value::Object(item) = &mut value {
            for (key, id) in &self.ids {
                item.entry(key.clone()).or_insert_with(|| Value::from(id.as_str()));
            }
        }
        T::from_api(&self.client, value).map(Some)
    }

    /// Collect every remaining item.
    pub fn all(mut self) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item()? {
            items.push(item);
        }
        Ok(items)
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.yielded >= limit)
    }

    fn buffered(&self) -> usize {
        self.page.as_ref().map_or(0, |page| page.len().saturating_sub(self.pos))
    }

    fn needs_page(&self) -> bool {
        self.page.is_none() || (self.buffered() == 0 && self.truncated)
    }

    fn load_next_page(&mut self) -> Result<(), ApiError> {
        let mut params = self.params.clone();
        if let Some(marker) = &self.next_marker {
            params.insert("marker".to_string(), Value::from(marker.as_str()));
        }
        if let Some(limit) = self.limit {
            if !params.contains_key("page_size") {
                params.insert("page_size".to_string(), Value::from(limit.min(MAX_PAGE_SIZE)));
            }
        }

        let response = self.client.get(&self.path, Some(&Value::Object(params)))?;
        let Value::Object(mut response) = response else {
            return Err(ApiError::DeserializationError(format!(
                "expected object from {}",
                self.path
            )));
        };
        let data = match response.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(ApiError::MissingField("data".to_string())),
        };
        self.truncated = response.get("truncated").and_then(Value::as_bool).unwrap_or(false);
        self.next_marker = response
            .get("next_marker")
            .and_then(Value::as_str)
            .map(str::to_string);
        debug!(path = %self.path, items = data.len(), truncated = self.truncated, "fetched page");

        // A truncated page without a marker would refetch the first page forever.
        if self.truncated && self.next_marker.is_none() {
            self.truncated = false;
        }
        self.page = Some(data);
        self.pos = 0;
        Ok(())
    }
}

impl<T: FromApi> Iterator for ApiCursor<T> {
    type Item = Result<T, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_item().transpose();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::testing::scripted_client;

    fn cursor(client: &ApiClient, params: Value) -> Result<ApiCursor<Value>, ApiError> {
        ApiCursor::new(client.clone(), "/projects/PJ1/contacts".to_string(), crate::params::object(params)?)
    }

    fn page(ids: &[&str], next_marker: Option<&str>) -> Value {
        let data: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
        json!({"data": data, "truncated": next_marker.is_some(), "next_marker": next_marker})
    }

    fn query_value(query: &[(String, String)], key: &str) -> Option<String> {
        query.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn yields_all_items_across_pages_in_order() {
        let (client, transport) = scripted_client();
        transport.push_json(200, page(&["a", "b"], Some("m1")));
        transport.push_json(200, page(&["c", "d"], Some("m2")));
        transport.push_json(200, page(&["e"], None));

        let ids: Vec<String> = cursor(&client, json!({"name": "x"}))
            .unwrap()
            .map(|item| item.unwrap()["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["a", "b", "c", "d", "e"]);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert!(!requests[0].url.contains("marker"));
        assert!(requests[1].url.contains("marker=m1"));
        assert!(requests[2].url.contains("marker=m2"));
        assert!(requests.iter().all(|r| r.url.contains("name=x")));
    }

    #[test]
    fn stops_when_not_truncated() {
        let (client, transport) = scripted_client();
        transport.push_json(200, page(&["a"], None));
        let mut cursor = cursor(&client, Value::Null).unwrap();
        assert!(cursor.next_item().unwrap().is_some());
        assert!(cursor.next_item().unwrap().is_none());
        assert!(!cursor.has_next().unwrap());
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn empty_truncated_page_is_followed() {
        let (client, transport) = scripted_client();
        transport.push_json(200, page(&["a"], Some("m1")));
        transport.push_json(200, page(&[], Some("m2")));
        transport.push_json(200, page(&["c"], None));

        let mut cursor = cursor(&client, Value::Null).unwrap();
        assert_eq!(cursor.next_item().unwrap().unwrap()["id"], "a");
        assert!(cursor.has_next().unwrap());
        assert_eq!(transport.request_count(), 3);
        assert_eq!(cursor.next_item().unwrap().unwrap()["id"], "c");
        assert!(cursor.next_item().unwrap().is_none());
        assert!(transport.requests()[2].url.contains("marker=m2"));
    }

    #[test]
    fn count_is_not_iterator_count() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({"count": 7}));
        let mut cursor = cursor(&client, Value::Null).unwrap();
        let total: u64 = cursor.total_count().unwrap();
        assert_eq!(total, 7);
        assert_eq!(transport.request_count(), 1);
        assert!(transport.requests()[0].url.contains("count=1"));
        assert!(!transport.requests()[0].url.contains("marker"));
    }

    #[test]
    fn empty_result_yields_nothing() {
        let (client, transport) = scripted_client();
        transport.push_json(200, page(&[], None));
        let items = cursor(&client, Value::Null).unwrap().all().unwrap();
        assert!(items.is_empty());
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn has_next_does_not_consume() {
        let (client, transport) = scripted_client();
        transport.push_json(200, page(&["a"], Some("m1")));
        transport.push_json(200, page(&["b"], None));
        let mut cursor = cursor(&client, Value::Null).unwrap();
        assert!(cursor.has_next().unwrap());
        assert!(cursor.has_next().unwrap());
        assert_eq!(cursor.next_item().unwrap().unwrap()["id"], "a");
        assert!(cursor.has_next().unwrap());
        assert_eq!(transport.request_count(), 2);
        assert_eq!(cursor.next_item().unwrap().unwrap()["id"], "b");
        assert!(!cursor.has_next().unwrap());
    }

    #[test]
    fn count_issues_one_request_and_skips_iteration() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({"count": 42}));
        let mut cursor = cursor(&client, json!({"name": "x"})).unwrap();
        assert_eq!(cursor.total_count().unwrap(), 42);
        assert_eq!(cursor.total_count().unwrap(), 42);
        assert_eq!(transport.request_count(), 1);

        let (path, query) = transport.last_target();
        assert_eq!(path, "/projects/PJ1/contacts");
        assert_eq!(query_value(&query, "count").as_deref(), Some("1"));
        assert_eq!(query_value(&query, "name").as_deref(), Some("x"));
    }

    #[test]
    fn count_param_is_rejected_at_construction() {
        let (client, transport) = scripted_client();
        let err = cursor(&client, json!({"count": 1})).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn limit_caps_items_and_page_size() {
        let (client, transport) = scripted_client();
        transport.push_json(200, page(&["a", "b", "c"], Some("m1")));
        let items = cursor(&client, Value::Null).unwrap().limit(2).all().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(transport.request_count(), 1);
        let (_, query) = transport.last_target();
        assert_eq!(query_value(&query, "page_size").as_deref(), Some("2"));
    }

    #[test]
    fn explicit_page_size_wins_over_limit() {
        let (client, transport) = scripted_client();
        transport.push_json(200, page(&["a"], None));
        let items = cursor(&client, json!({"page_size": 50}))
            .unwrap()
            .limit(500)
            .all()
            .unwrap();
        assert_eq!(items.len(), 1);
        let (_, query) = transport.last_target();
        assert_eq!(query_value(&query, "page_size").as_deref(), Some("50"));
    }

    #[test]
    fn large_limit_is_clamped_to_max_page_size() {
        let (client, transport) = scripted_client();
        transport.push_json(200, page(&[], None));
        cursor(&client, Value::Null).unwrap().limit(10_000).all().unwrap();
        let (_, query) = transport.last_target();
        assert_eq!(query_value(&query, "page_size").as_deref(), Some("200"));
    }

    #[test]
    fn iterator_fuses_after_error() {
        let (client, transport) = scripted_client();
        transport.push_json(500, json!({"error": {"code": "server_error", "message": "boom"}}));
        let mut cursor = cursor(&client, Value::Null).unwrap();
        assert!(matches!(cursor.next(), Some(Err(ApiError::Api { .. }))));
        assert!(cursor.next().is_none());
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn missing_data_is_an_error() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({"truncated": false}));
        let err = cursor(&client, Value::Null).unwrap().next_item().unwrap_err();
        assert!(matches!(err, ApiError::MissingField(ref f) if f == "data"));
    }
}
