use serde_json::Value;

use super::{id_field, path_id, DataRow, Group, Message, ScheduledMessage};
use crate::cursor::ApiCursor;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::params::path_segment;

resource! {
    /// A person (or phone number) the project exchanges messages with.
    Contact {
        ids: ["project_id", "id"],
        path: |data| format!(
            "/projects/{}/contacts/{}",
            path_id(data, "project_id"),
            path_id(data, "id")
        ),
    }
}

impl Contact {
    fields! {
        name: String,
        phone_number: String,
        time_created: i64,
        time_updated: i64,
        send_blocked: bool,
        /// `closed`, `active` or `handled`.
        conversation_status: String,
        last_message_time: i64,
        last_incoming_message_time: i64,
        last_outgoing_message_time: i64,
        message_count: i64,
        incoming_message_count: i64,
        outgoing_message_count: i64,
        last_message_id: String,
        default_route_id: String,
        group_ids: Vec<String>,
        project_id: String,
    }

    setters! {
        set_name => name: &str,
        set_phone_number => phone_number: &str,
        set_send_blocked => send_blocked: bool,
        set_conversation_status => conversation_status: &str,
        set_default_route_id => default_route_id: &str,
    }

    fn project_ids(&self) -> [(&str, &str); 1] {
        [("project_id", id_field(self.entity.data(), "project_id"))]
    }

    /// Whether the contact belongs to `group`, according to `group_ids`.
    pub fn is_in_group(&mut self, group: &Group) -> Result<bool, ApiError> {
        self.entity.list_contains("group_ids", group.id())
    }

    pub fn add_to_group(&mut self, group: &Group) -> Result<(), ApiError> {
        let path = format!("{}/contacts/{}", group.path(), path_segment(self.entity.id()));
        self.entity.client().request(HttpMethod::Put, &path, None)?;
        self.entity.toggle_list_entry("group_ids", group.id(), true);
        Ok(())
    }

    pub fn remove_from_group(&mut self, group: &Group) -> Result<(), ApiError> {
        let path = format!("{}/contacts/{}", group.path(), path_segment(self.entity.id()));
        self.entity.client().request(HttpMethod::Delete, &path, None)?;
        self.entity.toggle_list_entry("group_ids", group.id(), false);
        Ok(())
    }

    /// Messages sent to or received from this contact.
    pub fn query_messages(&self, params: Value) -> Result<ApiCursor<Message>, ApiError> {
        self.entity
            .client()
            .cursor(self.entity.sub_path("messages"), params, &self.project_ids())
    }

    pub fn query_groups(&self, params: Value) -> Result<ApiCursor<Group>, ApiError> {
        self.entity
            .client()
            .cursor(self.entity.sub_path("groups"), params, &self.project_ids())
    }

    pub fn query_scheduled_messages(
        &self,
        params: Value,
    ) -> Result<ApiCursor<ScheduledMessage>, ApiError> {
        self.entity
            .client()
            .cursor(self.entity.sub_path("scheduled"), params, &self.project_ids())
    }

    /// Data rows linked to this contact, across all tables.
    pub fn query_data_rows(&self, params: Value) -> Result<ApiCursor<DataRow>, ApiError> {
        self.entity
            .client()
            .cursor(self.entity.sub_path("rows"), params, &self.project_ids())
    }
}
