use serde_json::Value;

use super::{id_field, path_id, Message};
use crate::cursor::ApiCursor;
use crate::error::ApiError;

resource! {
    /// A tag attached to messages.
    Label {
        ids: ["project_id", "id"],
        path: |data| format!(
            "/projects/{}/labels/{}",
            path_id(data, "project_id"),
            path_id(data, "id")
        ),
    }
}

impl Label {
    fields! {
        name: String,
        time_created: i64,
        project_id: String,
    }

    setters! {
        set_name => name: &str,
    }

    pub fn query_messages(&self, params: Value) -> Result<ApiCursor<Message>, ApiError> {
        self.entity.client().cursor(
            self.entity.sub_path("messages"),
            params,
            &[("project_id", id_field(self.entity.data(), "project_id"))],
        )
    }
}
