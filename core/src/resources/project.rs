use serde_json::Value;

use super::{
    path_id, with_param, Broadcast, Contact, DataTable, Group, Label, Message, Phone, Route,
    ScheduledMessage, Service, Task,
};
use crate::cursor::ApiCursor;
use crate::error::ApiError;
use crate::params;

resource! {
    /// A project: the container for contacts, messages and everything else.
    Project {
        ids: ["id"],
        path: |data| format!("/projects/{}", path_id(data, "id")),
    }
}

/// `query_*`, `get_*_by_id` and `init_*_by_id` for a collection below the
/// project.
macro_rules! collection {
    ($($ty:ident at $segment:literal: $query:ident, $get:ident, $init:ident;)*) => {
        $(
            #[doc = concat!("Query `", $segment, "` in this project.")]
            pub fn $query(&self, params: Value) -> Result<ApiCursor<$ty>, ApiError> {
                self.entity.client().cursor(
                    self.entity.sub_path($segment),
                    params,
                    &[("project_id", self.entity.id())],
                )
            }

            pub fn $get(&self, id: &str) -> Result<$ty, ApiError> {
                $ty::fetch(self.entity.client(), &[("project_id", self.entity.id()), ("id", id)])
            }

            /// Stub that loads on first field access.
            pub fn $init(&self, id: &str) -> $ty {
                $ty::stub(self.entity.client(), &[("project_id", self.entity.id()), ("id", id)])
            }
        )*
    };
}

impl Project {
    fields! {
        name: String,
        timezone_id: String,
        url_slug: String,
        auto_create_contacts: bool,
        organization_id: String,
    }

    setters! {
        set_name => name: &str,
        set_timezone_id => timezone_id: &str,
        set_url_slug => url_slug: &str,
        set_auto_create_contacts => auto_create_contacts: bool,
    }

    collection! {
        Contact at "contacts": query_contacts, get_contact_by_id, init_contact_by_id;
        Message at "messages": query_messages, get_message_by_id, init_message_by_id;
        Broadcast at "broadcasts": query_broadcasts, get_broadcast_by_id, init_broadcast_by_id;
        Group at "groups": query_groups, get_group_by_id, init_group_by_id;
        Label at "labels": query_labels, get_label_by_id, init_label_by_id;
        Phone at "phones": query_phones, get_phone_by_id, init_phone_by_id;
        DataTable at "tables": query_data_tables, get_data_table_by_id, init_data_table_by_id;
        ScheduledMessage at "scheduled": query_scheduled_messages, get_scheduled_message_by_id, init_scheduled_message_by_id;
        Task at "tasks": query_tasks, get_task_by_id, init_task_by_id;
        Service at "services": query_services, get_service_by_id, init_service_by_id;
        Route at "routes": query_routes, get_route_by_id, init_route_by_id;
    }

    fn create_in<T: crate::cursor::FromApi>(&self, segment: &str, params: Value) -> Result<T, ApiError> {
        self.entity.client().create(
            &self.entity.sub_path(segment),
            params,
            &[("project_id", self.entity.id())],
        )
    }

    /// Send one message, e.g. `{"content": "hi", "to_number": "+1555..."}`.
    pub fn send_message(&self, params: Value) -> Result<Message, ApiError> {
        self.create_in("messages/send", params)
    }

    /// Send the same message to a group or a list of numbers.
    pub fn send_broadcast(&self, params: Value) -> Result<Broadcast, ApiError> {
        self.create_in("send_broadcast", params)
    }

    /// Send several distinct messages in one call. Returns the raw response
    /// (`messages`, optional `broadcast_id`).
    pub fn send_multi(&self, params: Value) -> Result<Value, ApiError> {
        let params = Value::Object(params::object(params)?);
        self.entity
            .client()
            .post(&self.entity.sub_path("send_multi"), Some(&params))
    }

    pub fn schedule_message(&self, params: Value) -> Result<ScheduledMessage, ApiError> {
        self.create_in("scheduled", params)
    }

    /// Record an incoming message as if a phone had received it.
    pub fn receive_message(&self, params: Value) -> Result<Message, ApiError> {
        self.create_in("messages/receive", params)
    }

    /// Find a contact by `phone_number` (or `lookup_key`), creating it when
    /// missing. Other params update the matched contact.
    pub fn get_or_create_contact(&self, params: Value) -> Result<Contact, ApiError> {
        self.create_in("contacts", params)
    }

    pub fn get_or_create_group(&self, name: &str) -> Result<Group, ApiError> {
        self.create_in("groups", with_param(Value::Null, "name", name)?)
    }

    pub fn get_or_create_label(&self, name: &str) -> Result<Label, ApiError> {
        self.create_in("labels", with_param(Value::Null, "name", name)?)
    }

    pub fn get_or_create_data_table(&self, name: &str) -> Result<DataTable, ApiError> {
        self.create_in("tables", with_param(Value::Null, "name", name)?)
    }

    /// Start a background task such as `update_contact` or `send_message`
    /// over a filtered set of items.
    pub fn create_task(&self, params: Value) -> Result<Task, ApiError> {
        self.create_in("tasks", params)
    }

    pub fn get_message_stats(&self, params: Value) -> Result<Value, ApiError> {
        let params = Value::Object(params::object(params)?);
        self.entity
            .client()
            .get(&self.entity.sub_path("message_stats"), Some(&params))
    }
}
