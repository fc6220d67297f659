use serde_json::Value;

use super::{id_field, path_id, Broadcast, Contact, Label};
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::params::path_segment;

resource! {
    /// One SMS, MMS, call or chat message, incoming or outgoing.
    Message {
        ids: ["project_id", "id"],
        path: |data| format!(
            "/projects/{}/messages/{}",
            path_id(data, "project_id"),
            path_id(data, "id")
        ),
    }
}

impl Message {
    fields! {
        /// `incoming` or `outgoing`.
        direction: String,
        status: String,
        message_type: String,
        source: String,
        time_created: i64,
        time_sent: i64,
        time_updated: i64,
        from_number: String,
        to_number: String,
        content: String,
        starred: bool,
        simulated: bool,
        label_ids: Vec<String>,
        route_params: Value,
        priority: i64,
        error_message: String,
        external_id: String,
        price: f64,
        price_currency: String,
        duration: i64,
        ring_time: i64,
        audio_url: String,
        tts_lang: String,
        tts_voice: String,
        track_clicks: bool,
        short_urls: Vec<Value>,
        media: Vec<Value>,
        mms_parts: Vec<Value>,
        service_id: String,
        user_id: String,
        phone_id: String,
        contact_id: String,
        broadcast_id: String,
        scheduled_id: String,
        project_id: String,
    }

    setters! {
        set_starred => starred: bool,
    }

    fn project_id_field(&self) -> &str {
        id_field(self.entity.data(), "project_id")
    }

    pub fn has_label(&mut self, label: &Label) -> Result<bool, ApiError> {
        self.entity.list_contains("label_ids", label.id())
    }

    pub fn add_label(&mut self, label: &Label) -> Result<(), ApiError> {
        let path = format!("{}/messages/{}", label.path(), path_segment(self.entity.id()));
        self.entity.client().request(HttpMethod::Put, &path, None)?;
        self.entity.toggle_list_entry("label_ids", label.id(), true);
        Ok(())
    }

    pub fn remove_label(&mut self, label: &Label) -> Result<(), ApiError> {
        let path = format!("{}/messages/{}", label.path(), path_segment(self.entity.id()));
        self.entity.client().request(HttpMethod::Delete, &path, None)?;
        self.entity.toggle_list_entry("label_ids", label.id(), false);
        Ok(())
    }

    /// Queue a failed or cancelled outgoing message again. Returns the
    /// message as the server now sees it.
    pub fn resend(&self, params: Value) -> Result<Message, ApiError> {
        self.entity.client().create(
            &self.entity.sub_path("resend"),
            params,
            &[("project_id", self.project_id_field())],
        )
    }

    /// Cancel a queued or scheduled outgoing message.
    pub fn cancel(&self) -> Result<Message, ApiError> {
        self.entity.client().create(
            &self.entity.sub_path("cancel"),
            Value::Null,
            &[("project_id", self.project_id_field())],
        )
    }

    /// The contact this message was exchanged with, if any.
    pub fn get_contact(&mut self) -> Result<Option<Contact>, ApiError> {
        let Some(contact_id) = self.contact_id()? else {
            return Ok(None);
        };
        let project_id = self.project_id_field().to_string();
        Contact::fetch(
            self.entity.client(),
            &[("project_id", project_id.as_str()), ("id", contact_id.as_str())],
        )
        .map(Some)
    }

    /// The broadcast this message was part of, if any.
    pub fn get_broadcast(&mut self) -> Result<Option<Broadcast>, ApiError> {
        let Some(broadcast_id) = self.broadcast_id()? else {
            return Ok(None);
        };
        let project_id = self.project_id_field().to_string();
        Broadcast::fetch(
            self.entity.client(),
            &[("project_id", project_id.as_str()), ("id", broadcast_id.as_str())],
        )
        .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::http::testing::scripted_client;
    use crate::http::HttpMethod;

    #[test]
    fn labels_use_label_path() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({}));
        transport.push_json(200, json!({"id": "SM1", "project_id": "PJ1", "label_ids": ["LB1"]}));
        let project = client.init_project_by_id("PJ1");
        let label = project.init_label_by_id("LB1");
        let mut message = project.init_message_by_id("SM1");

        message.add_label(&label).unwrap();
        let req = transport.requests().pop().unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(transport.last_target().0, "/projects/PJ1/labels/LB1/messages/SM1");

        // Adding a label did not load the stub; has_label does.
        assert!(message.has_label(&label).unwrap());
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn related_contact_is_fetched_only_when_asked() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({"id": "CT7", "project_id": "PJ1", "name": "Ana"}));
        let mut message = <super::Message as crate::cursor::FromApi>::from_api(
            &client,
            json!({"id": "SM1", "project_id": "PJ1", "contact_id": "CT7"}),
        )
        .unwrap();
        assert_eq!(transport.request_count(), 0);

        let mut contact = message.get_contact().unwrap().unwrap();
        assert_eq!(transport.last_target().0, "/projects/PJ1/contacts/CT7");
        assert_eq!(contact.name().unwrap().as_deref(), Some("Ana"));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn missing_relation_returns_none_without_request() {
        let (client, transport) = scripted_client();
        let mut message = <super::Message as crate::cursor::FromApi>::from_api(
            &client,
            json!({"id": "SM1", "project_id": "PJ1", "broadcast_id": null}),
        )
        .unwrap();
        assert!(message.get_broadcast().unwrap().is_none());
        assert!(message.get_contact().unwrap().is_none());
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn resend_and_cancel_post_actions() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({"id": "SM1", "status": "queued"}));
        transport.push_json(200, json!({"id": "SM1", "status": "cancelled"}));
        let project = client.init_project_by_id("PJ1");
        let message = project.init_message_by_id("SM1");

        let mut resent = message.resend(serde_json::Value::Null).unwrap();
        assert_eq!(transport.last_target().0, "/projects/PJ1/messages/SM1/resend");
        assert_eq!(resent.status().unwrap().as_deref(), Some("queued"));

        let mut cancelled = message.cancel().unwrap();
        assert_eq!(transport.last_target().0, "/projects/PJ1/messages/SM1/cancel");
        assert_eq!(transport.last_body(), json!({}));
        assert_eq!(cancelled.status().unwrap().as_deref(), Some("cancelled"));
    }

    #[test]
    fn starred_round_trips_through_save() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({}));
        let project = client.init_project_by_id("PJ1");
        let mut message = project.init_message_by_id("SM1");
        message.set_starred(true);
        assert_eq!(message.starred().unwrap(), Some(true));
        message.save().unwrap();
        assert_eq!(transport.last_body(), json!({"starred": true}));
        assert_eq!(transport.request_count(), 1);
    }
}
