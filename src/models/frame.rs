use serde::Serialize;

/// A labeled series in the host's time-series shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub target: String,
    /// `[value, unix-ms]` pairs.
    pub datapoints: Vec<(serde_json::Value, i64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub text: String,
}

impl Column {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// One table cell. `Absent` marks a tag column the row's group lacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Tag(String),
    Value(serde_json::Value),
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
    #[serde(rename = "type")]
    pub kind: String,
}

fn table_type() -> String {
    "table".to_string()
}

impl Table {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            kind: table_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataItem {
    Table(Table),
    Series(TimeSeries),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResponse {
    pub data: Vec<DataItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasourceStatus {
    pub status: String,
    pub message: String,
    pub title: String,
}

impl DatasourceStatus {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: "Data source is working".to_string(),
            title: "Success".to_string(),
        }
    }
}
