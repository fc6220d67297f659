use serde_json::Value;

use super::{id_field, path_id, Contact, ScheduledMessage};
use crate::cursor::ApiCursor;
use crate::error::ApiError;

resource! {
    /// A named set of contacts, either curated or defined by filters.
    Group {
        ids: ["project_id", "id"],
        path: |data| format!(
            "/projects/{}/groups/{}",
            path_id(data, "project_id"),
            path_id(data, "id")
        ),
    }
}

impl Group {
    fields! {
        name: String,
        /// Members come from a filter rather than explicit membership.
        dynamic: bool,
        num_members: i64,
        time_created: i64,
        allow_sending: bool,
        add_time_variable: String,
        project_id: String,
    }

    setters! {
        set_name => name: &str,
        set_allow_sending => allow_sending: bool,
        set_add_time_variable => add_time_variable: &str,
    }

    fn project_ids(&self) -> [(&str, &str); 1] {
        [("project_id", id_field(self.entity.data(), "project_id"))]
    }

    pub fn query_contacts(&self, params: Value) -> Result<ApiCursor<Contact>, ApiError> {
        self.entity
            .client()
            .cursor(self.entity.sub_path("contacts"), params, &self.project_ids())
    }

    pub fn query_scheduled_messages(
        &self,
        params: Value,
    ) -> Result<ApiCursor<ScheduledMessage>, ApiError> {
        self.entity
            .client()
            .cursor(self.entity.sub_path("scheduled"), params, &self.project_ids())
    }
}
