use serde_json::Value;

use super::path_id;

resource! {
    /// A message queued to be sent later, once or on a recurrence rule.
    ScheduledMessage {
        ids: ["project_id", "id"],
        path: |data| format!(
            "/projects/{}/scheduled/{}",
            path_id(data, "project_id"),
            path_id(data, "id")
        ),
    }
}

impl ScheduledMessage {
    fields! {
        content: String,
        message_type: String,
        /// iCalendar recurrence rule, e.g. `FREQ=DAILY;COUNT=3`.
        rrule: String,
        timezone_id: String,
        start_time: i64,
        end_time: i64,
        prev_time: i64,
        next_time: i64,
        occurrences: i64,
        time_created: i64,
        recipient: Value,
        recipient_params: Value,
        to_number: String,
        group_id: String,
        contact_id: String,
        media: Vec<Value>,
        route_params: Value,
        service_id: String,
        audio_url: String,
        tts_lang: String,
        tts_voice: String,
        track_clicks: bool,
        label_ids: Vec<String>,
        relative_scheduled_id: String,
        user_id: String,
        project_id: String,
    }

    setters! {
        set_content => content: &str,
        set_rrule => rrule: &str,
        set_timezone_id => timezone_id: &str,
        /// `None` removes the end of the recurrence.
        set_end_time => end_time: Option<i64>,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::http::testing::scripted_client;

    #[test]
    fn reschedule_saves_rule_and_clears_end_time() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({}));
        let project = client.init_project_by_id("PJ1");
        let mut scheduled = project.init_scheduled_message_by_id("SC1");

        scheduled.set_rrule("FREQ=WEEKLY");
        scheduled.set_end_time(None);
        assert_eq!(scheduled.end_time().unwrap(), None);
        scheduled.save().unwrap();

        assert_eq!(transport.last_target().0, "/projects/PJ1/scheduled/SC1");
        assert_eq!(transport.last_body(), json!({"rrule": "FREQ=WEEKLY", "end_time": null}));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn delete_cancels_schedule() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({}));
        let project = client.init_project_by_id("PJ1");
        let scheduled = project.init_scheduled_message_by_id("SC1");
        scheduled.delete().unwrap();
        assert_eq!(transport.requests()[0].method, crate::http::HttpMethod::Delete);
        assert_eq!(transport.last_target().0, "/projects/PJ1/scheduled/SC1");
    }
}
