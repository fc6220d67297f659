use serde_json::Value;

use super::{id_field, path_id, with_param, DataRow};
use crate::cursor::ApiCursor;
use crate::error::ApiError;
use crate::params;

resource! {
    /// A table of rows with free-form fields, typically filled by services.
    DataTable {
        ids: ["project_id", "id"],
        path: |data| format!(
            "/projects/{}/tables/{}",
            path_id(data, "project_id"),
            path_id(data, "id")
        ),
    }
}

impl DataTable {
    fields! {
        name: String,
        num_rows: i64,
        show_add_row: bool,
        show_stats: bool,
        show_contact_columns: bool,
        project_id: String,
    }

    setters! {
        set_name => name: &str,
        set_show_add_row => show_add_row: bool,
        set_show_stats => show_stats: bool,
        set_show_contact_columns => show_contact_columns: bool,
    }

    fn row_ids(&self) -> [(&str, &str); 2] {
        [
            ("project_id", id_field(self.entity.data(), "project_id")),
            ("table_id", self.entity.id()),
        ]
    }

    pub fn query_rows(&self, params: Value) -> Result<ApiCursor<DataRow>, ApiError> {
        self.entity
            .client()
            .cursor(self.entity.sub_path("rows"), params, &self.row_ids())
    }

    /// Add a row, e.g. `{"contact_id": "CT1", "vars": {"answer": "yes"}}`.
    pub fn create_row(&self, params: Value) -> Result<DataRow, ApiError> {
        self.entity
            .client()
            .create(&self.entity.sub_path("rows"), params, &self.row_ids())
    }

    pub fn get_row_by_id(&self, id: &str) -> Result<DataRow, ApiError> {
        let [project, table] = self.row_ids();
        DataRow::fetch(self.entity.client(), &[project, table, ("id", id)])
    }

    pub fn init_row_by_id(&self, id: &str) -> DataRow {
        let [project, table] = self.row_ids();
        DataRow::stub(self.entity.client(), &[project, table, ("id", id)])
    }

    /// Field metadata of the table, one object per variable.
    pub fn get_fields(&self) -> Result<Vec<Value>, ApiError> {
        match self.entity.client().get(&self.entity.sub_path("fields"), None)? {
            Value::Array(fields) => Ok(fields),
            Value::Object(mut response) => match response.remove("data") {
                Some(Value::Array(fields)) => Ok(fields),
                _ => Err(ApiError::MissingField("data".to_string())),
            },
            other => Err(ApiError::DeserializationError(format!(
                "expected field list, got {other}"
            ))),
        }
    }

    /// Update display metadata (`name`, `type`, `order`, ...) of one field.
    pub fn set_field_metadata(&self, variable: &str, params: Value) -> Result<Value, ApiError> {
        let params = Value::Object(params::object(params)?);
        self.entity.client().post(
            &self.entity.sub_path(&format!("fields/{}", params::path_segment(variable))),
            Some(&params),
        )
    }

    /// Number of rows per distinct value of `variable`.
    pub fn count_rows_by_value(&self, variable: &str) -> Result<Value, ApiError> {
        let params = with_param(Value::Null, "variable", variable)?;
        self.entity
            .client()
            .get(&self.entity.sub_path("count_rows_by_value"), Some(&params))
    }
}
