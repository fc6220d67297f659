use serde_json::Value;

use super::path_id;
use crate::error::ApiError;
use crate::params;

resource! {
    /// Automated behavior triggered by messages, contacts or explicit calls.
    Service {
        ids: ["project_id", "id"],
        path: |data| format!(
            "/projects/{}/services/{}",
            path_id(data, "project_id"),
            path_id(data, "id")
        ),
    }
}

impl Service {
    fields! {
        name: String,
        service_type: String,
        active: bool,
        priority: i64,
        contact_filter: Value,
        message_filter: Value,
        config: Value,
        apply_mode: String,
        response_table_id: String,
        phone_ids: Vec<String>,
        project_id: String,
    }

    setters! {
        set_name => name: &str,
        set_active => active: bool,
        set_priority => priority: i64,
    }

    /// Run the service against a context such as
    /// `{"context": "contact", "contact_id": "CT1"}`. Returns the raw result.
    pub fn invoke(&self, params: Value) -> Result<Value, ApiError> {
        let params = Value::Object(params::object(params)?);
        self.entity
            .client()
            .post(&self.entity.sub_path("invoke"), Some(&params))
    }
}
