use super::path_id;

resource! {
    /// A custom routing rule selecting which phone sends a message.
    Route {
        ids: ["project_id", "id"],
        path: |data| format!(
            "/projects/{}/routes/{}",
            path_id(data, "project_id"),
            path_id(data, "id")
        ),
    }
}

impl Route {
    fields! {
        name: String,
        project_id: String,
    }

    setters! {
        set_name => name: &str,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::http::testing::scripted_client;

    #[test]
    fn query_routes_and_rename() {
        let (client, transport) = scripted_client();
        transport.push_json(200, json!({"data": [{"id": "RT1", "name": "Default"}], "truncated": false}));
        transport.push_json(200, json!({}));
        let project = client.init_project_by_id("PJ1");

        let mut routes = project.query_routes(serde_json::Value::Null).unwrap().all().unwrap();
        let route = &mut routes[0];
        assert_eq!(route.name().unwrap().as_deref(), Some("Default"));
        route.set_name("Primary");
        route.save().unwrap();
        assert_eq!(transport.last_target().0, "/projects/PJ1/routes/RT1");
        assert_eq!(transport.last_body(), json!({"name": "Primary"}));
    }
}
