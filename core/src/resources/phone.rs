use serde_json::Value;

use super::{id_field, path_id, Message};
use crate::cursor::ApiCursor;
use crate::error::ApiError;

resource! {
    /// An Android phone or virtual number that sends and receives messages.
    Phone {
        ids: ["project_id", "id"],
        path: |data| format!(
            "/projects/{}/phones/{}",
            path_id(data, "project_id"),
            path_id(data, "id")
        ),
    }
}

impl Phone {
    fields! {
        name: String,
        phone_number: String,
        country: String,
        phone_type: String,
        time_created: i64,
        last_active_time: i64,
        app_version: String,
        android_release: String,
        android_sdk: i64,
        manufacturer: String,
        model: String,
        battery: i64,
        charging: bool,
        /// Outgoing messages are held on the server while set.
        send_paused: bool,
        send_limit: i64,
        send_limit_interval: i64,
        project_id: String,
    }

    setters! {
        set_name => name: &str,
        set_send_paused => send_paused: bool,
        set_send_limit => send_limit: i64,
        set_send_limit_interval => send_limit_interval: i64,
    }

    /// Messages sent or received through this phone.
    pub fn query_messages(&self, params: Value) -> Result<ApiCursor<Message>, ApiError> {
        self.entity.client().cursor(
            self.entity.sub_path("messages"),
            params,
            &[("project_id", id_field(self.entity.data(), "project_id"))],
        )
    }
}
