use serde_json::Value;

use super::{path_id, Project};
use crate::cursor::ApiCursor;
use crate::error::ApiError;
use crate::params;

resource! {
    /// An organization: the billing owner of one or more projects.
    Organization {
        ids: ["id"],
        path: |data| format!("/organizations/{}", path_id(data, "id")),
    }
}

impl Organization {
    fields! {
        name: String,
        company_name: String,
    }

    setters! {
        set_name => name: &str,
        set_company_name => company_name: &str,
    }

    /// Create a project owned by this organization.
    pub fn create_project(&self, params: Value) -> Result<Project, ApiError> {
        self.entity.client().create(
            &self.entity.sub_path("projects"),
            params,
            &[("organization_id", self.entity.id())],
        )
    }

    pub fn query_projects(&self, params: Value) -> Result<ApiCursor<Project>, ApiError> {
        self.entity.client().cursor(
            self.entity.sub_path("projects"),
            params,
            &[("organization_id", self.entity.id())],
        )
    }

    pub fn get_billing_details(&self) -> Result<Value, ApiError> {
        self.entity.client().get(&self.entity.sub_path("billing"), None)
    }

    /// Usage counters of one kind (`api`, `messages`, ...).
    pub fn get_usage(&self, usage_type: &str) -> Result<Value, ApiError> {
        self.entity
            .client()
            .get(
                &self.entity.sub_path(&format!("usage/{}", params::path_segment(usage_type))),
                None,
            )
    }

    /// Message statistics across every project in the organization.
    pub fn get_message_stats(&self, params: Value) -> Result<Value, ApiError> {
        let params = Value::Object(params::object(params)?);
        self.entity
            .client()
            .get(&self.entity.sub_path("message_stats"), Some(&params))
    }
}
