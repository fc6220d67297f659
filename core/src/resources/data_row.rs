use super::{id_field, path_id, DataTable};
use crate::error::ApiError;

resource! {
    /// One row of a data table. Row values live in the custom variables.
    DataRow {
        ids: ["project_id", "table_id", "id"],
        path: |data| format!(
            "/projects/{}/tables/{}/rows/{}",
            path_id(data, "project_id"),
            path_id(data, "table_id"),
            path_id(data, "id")
        ),
    }
}

impl DataRow {
    fields! {
        contact_id: String,
        from_number: String,
        time_created: i64,
        time_updated: i64,
        table_id: String,
        project_id: String,
    }

    setters! {
        set_contact_id => contact_id: &str,
        set_from_number => from_number: &str,
    }

    /// Fetch the table this row belongs to.
    pub fn get_table(&self) -> Result<DataTable, ApiError> {
        let data = self.entity.data();
        DataTable::fetch(
            self.entity.client(),
            &[
                ("project_id", id_field(data, "project_id")),
                ("id", id_field(data, "table_id")),
            ],
        )
    }
}
