use serde_json::Value;

use super::{id_field, path_id};
use crate::error::ApiError;

resource! {
    /// A background job applying one action to a filtered set of items.
    Task {
        ids: ["project_id", "id"],
        path: |data| format!(
            "/projects/{}/tasks/{}",
            path_id(data, "project_id"),
            path_id(data, "id")
        ),
    }
}

impl Task {
    fields! {
        task_type: String,
        task_params: Value,
        filter_type: String,
        filter_params: Value,
        table_id: String,
        user_id: String,
        /// `created`, `queued`, `active`, `complete`, `failed` or `cancelled`.
        status: String,
        time_created: i64,
        time_active: i64,
        time_complete: i64,
        total_rows: i64,
        current_row: i64,
        project_id: String,
    }

    /// Stop the task; items already processed stay processed.
    pub fn cancel(&self) -> Result<Task, ApiError> {
        self.entity.client().create(
            &self.entity.sub_path("cancel"),
            Value::Null,
            &[("project_id", id_field(self.entity.data(), "project_id"))],
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::http::testing::scripted_client;

    #[test]
    fn cancel_returns_updated_task() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({"id": "TK1", "status": "cancelled", "current_row": 4}));
        let project = client.init_project_by_id("PJ1");
        let task = project.init_task_by_id("TK1");

        let mut task = task.cancel().unwrap();
        assert_eq!(transport.last_target().0, "/projects/PJ1/tasks/TK1/cancel");
        assert_eq!(task.status().unwrap().as_deref(), Some("cancelled"));
        assert_eq!(task.current_row().unwrap(), Some(4));
        assert_eq!(task.project_id().unwrap().as_deref(), Some("PJ1"));
    }
}
