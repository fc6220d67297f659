use serde_json::Value;

use super::{id_field, path_id};
use crate::error::ApiError;

resource! {
    /// A message sent to many recipients at once.
    Broadcast {
        ids: ["project_id", "id"],
        path: |data| format!(
            "/projects/{}/broadcasts/{}",
            path_id(data, "project_id"),
            path_id(data, "id")
        ),
    }
}

impl Broadcast {
    fields! {
        status: String,
        message_type: String,
        content: String,
        time_created: i64,
        last_message_time: i64,
        num_recipients: i64,
        recipient_ids: Vec<String>,
        media: Vec<Value>,
        route_params: Value,
        audio_url: String,
        tts_lang: String,
        tts_voice: String,
        track_clicks: bool,
        short_urls: Vec<Value>,
        replies: bool,
        service_id: String,
        user_id: String,
        scheduled_id: String,
        project_id: String,
    }

    /// Cancel every message of the broadcast that has not been sent yet.
    pub fn cancel(&self) -> Result<Broadcast, ApiError> {
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
    use crate::http::HttpMethod;

    #[test]
    fn cancel_posts_to_action_path() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({"id": "BC1", "status": "cancelled"}));
        let project = client.init_project_by_id("PJ1");
        let broadcast = project.init_broadcast_by_id("BC1");

        let mut cancelled = broadcast.cancel().unwrap();
        let req = transport.requests().pop().unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(transport.last_target().0, "/projects/PJ1/broadcasts/BC1/cancel");
        assert_eq!(cancelled.path(), "/projects/PJ1/broadcasts/BC1");
        assert_eq!(cancelled.status().unwrap().as_deref(), Some("cancelled"));
    }

    #[test]
    fn recipients_decode_as_id_list() {
        let (client, transport) = scripted_client();
        transport.push_json(
            200,
            json!({"id": "BC1", "project_id": "PJ1", "num_recipients": 2, "recipient_ids": ["CT1", "CT2"]}),
        );
        let project = client.init_project_by_id("PJ1");
        let mut broadcast = project.get_broadcast_by_id("BC1").unwrap();
        assert_eq!(broadcast.num_recipients().unwrap(), Some(2));
        assert_eq!(
            broadcast.recipient_ids().unwrap(),
            Some(vec!["CT1".to_string(), "CT2".to_string()])
        );
        assert_eq!(transport.request_count(), 1);
    }
}
