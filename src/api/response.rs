use serde_json::{Map, Value};

/// One completed API call: the request path, the HTTP status, and the body
/// parsed as JSON. Built once per call and never mutated.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub path: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Error message embedded in the body, if any. The API reports failures
    /// as `{"status": {"code": ..., "msg": "..."}}`.
    pub fn error_message(&self) -> Option<&str> {
        self.body
            .get("status")
            .and_then(|s| s.get("msg"))
            .and_then(Value::as_str)
    }
}

/// Row-oriented view of one response's `property` array. Columns are the
/// union of dotted-path keys across all rows, in first-seen order; cells
/// missing from a row are JSON null.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl PropertyTable {
    /// Flatten an array of property objects into rows. Nested objects become
    /// dotted column names (`address.line1`); arrays are kept as JSON values.
    pub fn from_properties(properties: &[Value]) -> Self {
        let flat_rows: Vec<Map<String, Value>> = properties
            .iter()
            .map(|p| {
                let mut flat = Map::new();
                flatten_into(&mut flat, "", p);
                flat
            })
            .collect();

        let mut columns: Vec<String> = Vec::new();
        for row in &flat_rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = flat_rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|col| row.get(col).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rebuild the rows as JSON objects keyed by column name, for export.
    pub fn to_json(&self) -> Value {
        let objects: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                let map: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(map)
            })
            .collect();
        Value::Array(objects)
    }
}

fn flatten_into(out: &mut Map<String, Value>, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(out, &path, nested);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

/// Extract property tables from a batch of responses.
///
/// Responses with an HTTP error status are skipped, as are successful
/// responses whose body carries no `property` array, so the output can be
/// shorter than the input. Relative order of the kept tables is preserved.
pub fn extract_properties(responses: &[ApiResponse]) -> Vec<PropertyTable> {
    responses
        .iter()
        .filter(|r| r.is_success())
        .filter_map(|r| r.body.get("property").and_then(Value::as_array))
        .map(|properties| PropertyTable::from_properties(properties))
        .collect()
}
