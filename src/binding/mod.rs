// Data binding: sources, views and rows read count-then-page through a key-path client

pub mod memory;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use tracing::{debug, warn};

use crate::columns::{ColumnMeta, XAxisColumn, YAxisColumn};
use crate::editor::{EditorState, Filter};
use crate::error::{GraphError, Result};
use crate::value::{locale_compare, Row, Value};

pub use memory::MemoryStore;

/// Rows fetched per ranged read.
pub const PAGE_SIZE: usize = 500;

/// One segment of a key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    pub fn key(key: impl Into<String>) -> Self {
        Segment::Key(key.into())
    }

    /// The object key this segment addresses.
    pub fn as_key(&self) -> String {
        match self {
            Segment::Key(k) => k.clone(),
            Segment::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index)
    }
}

impl From<i64> for Segment {
    fn from(id: i64) -> Self {
        Segment::Key(id.to_string())
    }
}

pub fn path_string(path: &[Segment]) -> String {
    path.iter().map(Segment::to_string).collect::<Vec<_>>().join(".")
}

/// Build a reference value pointing at `path`.
pub fn reference(path: &[Segment]) -> JsonValue {
    let value: Vec<JsonValue> = path
        .iter()
        .map(|s| match s {
            Segment::Key(k) => JsonValue::from(k.as_str()),
            Segment::Index(i) => JsonValue::from(*i),
        })
        .collect();
    serde_json::json!({ "$type": "ref", "value": value })
}

/// The path a reference value points at, if `value` is one.
pub fn as_reference(value: &JsonValue) -> Option<Vec<Segment>> {
    let object = value.as_object()?;
    if object.get("$type").and_then(JsonValue::as_str) != Some("ref") {
        return None;
    }
    object
        .get("value")?
        .as_array()?
        .iter()
        .map(|s| match s {
            JsonValue::String(k) => Some(Segment::Key(k.clone())),
            JsonValue::Number(n) => n.as_u64().map(|i| Segment::Index(i as usize)),
            _ => None,
        })
        .collect()
}

/// A key-path data service.
pub trait DataClient {
    /// The value stored at `path`, or `None` if nothing is there.
    fn get(&self, path: &[Segment]) -> Result<Option<JsonValue>>;

    /// Values at `base.from` through `base.(to - 1)`.
    fn get_range(&self, base: &[Segment], from: usize, to: usize) -> Result<Vec<Option<JsonValue>>> {
        (from..to)
            .map(|i| {
                let mut path = base.to_vec();
                path.push(Segment::Index(i));
                self.get(&path)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default)]
    pub columns: Vec<ColumnMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub source_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: SourceMetadata,
    #[serde(default)]
    pub categories: Vec<Vec<String>>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Source {
    pub fn in_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c.iter().any(|name| name == category))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.metadata.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub view_id: i64,
    #[serde(default)]
    pub source_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingConfig {
    /// Data namespace environment.
    pub pg_env: String,
    /// Only sources tagged with this category are offered.
    pub category: String,
}

impl Default for BindingConfig {
    fn default() -> Self {
        BindingConfig {
            pg_env: "hazmit_dama".to_string(),
            category: "Cenrep".to_string(),
        }
    }
}

/// Everything needed to fetch the rows behind the current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRequest {
    pub view_id: i64,
    pub x_axis_column: Option<XAxisColumn>,
    pub y_axis_columns: Vec<YAxisColumn>,
    pub filters: Vec<Filter>,
}

impl DataRequest {
    /// `None` until a view is active.
    pub fn from_state(state: &EditorState) -> Option<Self> {
        let view = state.active_view.as_ref()?;
        Some(DataRequest {
            view_id: view.view_id,
            x_axis_column: state.x_axis_column.clone(),
            y_axis_columns: state.y_axis_columns.clone(),
            filters: state.filters.clone(),
        })
    }

    /// Columns to read from each row: the selection plus filtered columns.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        let names = self
            .x_axis_column
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.y_axis_columns.iter().map(|c| c.name.as_str()))
            .chain(self.filters.iter().map(|f| f.column.as_str()));
        for name in names {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        columns
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewRows {
    pub rows: Vec<Row>,
    /// Total row count of the view before filtering.
    pub length: usize,
}

/// Resolves sources, views and rows for one environment.
pub struct DataBinding<'a, C: DataClient + ?Sized> {
    client: &'a C,
    config: BindingConfig,
}

impl<'a, C: DataClient + ?Sized> DataBinding<'a, C> {
    pub fn new(client: &'a C, config: BindingConfig) -> Self {
        DataBinding { client, config }
    }

    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    fn path<I, S>(&self, tail: I) -> Vec<Segment>
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        let mut path = vec![Segment::key("dama"), Segment::key(self.config.pg_env.as_str())];
        path.extend(tail.into_iter().map(Into::into));
        path
    }

    fn length(&self, base: &[Segment]) -> Result<usize> {
        let mut path = base.to_vec();
        path.push(Segment::key("length"));
        let length = match self.client.get(&path)? {
            None | Some(JsonValue::Null) => 0,
            Some(JsonValue::Number(n)) => n.as_f64().filter(|n| *n >= 0.0).map_or(0, |n| n as usize),
            Some(other) => {
                return Err(GraphError::Binding(format!(
                    "length at {} is not a number: {}",
                    path_string(&path),
                    other
                )))
            }
        };
        debug!(path = %path_string(&path), length, "length probe");
        Ok(length)
    }

    /// Follow every `base.byIndex.i` reference, appending `suffix` to it.
    fn read_indexed(&self, base: &[Segment], index_key: &str, suffix: &[Segment]) -> Result<Vec<JsonValue>> {
        let length = self.length(base)?;
        let mut index_path = base.to_vec();
        index_path.push(Segment::key(index_key));

        let mut values = Vec::with_capacity(length);
        let mut from = 0;
        while from < length {
            let to = (from + PAGE_SIZE).min(length);
            for slot in self.client.get_range(&index_path, from, to)? {
                // Holes are entries the service has not delivered
                let Some(mut target) = slot.as_ref().and_then(as_reference) else {
                    continue;
                };
                target.extend_from_slice(suffix);
                if let Some(value) = self.client.get(&target)? {
                    values.push(value);
                }
            }
            from = to;
        }
        Ok(values)
    }

    pub fn try_sources(&self) -> Result<Vec<Source>> {
        let base = self.path(["sources"]);
        let mut sources: Vec<Source> = self
            .read_indexed(&base, "byIndex", &[Segment::key("attributes")])?
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Source>(value) {
                Ok(source) => Some(source),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable source");
                    None
                }
            })
            .filter(|source| source.in_category(&self.config.category))
            .collect();
        sources.sort_by(|a, b| locale_compare(&a.name, &b.name));
        Ok(sources)
    }

    pub fn try_views(&self, source_id: i64) -> Result<Vec<View>> {
        let base = self.path([Segment::key("sources"), Segment::key("byId"), Segment::from(source_id), Segment::key("views")]);
        let mut views: Vec<View> = self
            .read_indexed(&base, "byIndex", &[Segment::key("attributes")])?
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<View>(value) {
                Ok(view) => Some(view),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable view");
                    None
                }
            })
            .collect();
        views.sort_by(|a, b| b.view_id.cmp(&a.view_id));
        Ok(views)
    }

    pub fn try_view_data(&self, request: &DataRequest) -> Result<ViewRows> {
        let columns = request.columns();
        if columns.is_empty() {
            return Ok(ViewRows::default());
        }
        let base = self.path([Segment::key("viewsbyId"), Segment::from(request.view_id), Segment::key("data")]);
        let length = self.length(&base)?;

        let mut data_path = self.path([Segment::key("viewsbyId"), Segment::from(request.view_id)]);
        data_path.push(Segment::key("databyIndex"));

        let mut rows = Vec::new();
        let mut from = 0;
        while from < length {
            let to = (from + PAGE_SIZE).min(length);
            for slot in self.client.get_range(&data_path, from, to)? {
                let Some(target) = slot.as_ref().and_then(as_reference) else {
                    continue;
                };
                let Some(JsonValue::Object(object)) = self.client.get(&target)? else {
                    continue;
                };
                let row: Row = columns
                    .iter()
                    .map(|name| {
                        let value = object
                            .get(name)
                            .and_then(|v| serde_json::from_value::<Value>(v.clone()).ok())
                            .unwrap_or_default();
                        (name.clone(), value)
                    })
                    .collect();
                if request.filters.iter().all(|f| f.matches(&row)) {
                    rows.push(row);
                }
            }
            from = to;
        }
        debug!(view_id = request.view_id, length, kept = rows.len(), "fetched view data");
        Ok(ViewRows { rows, length })
    }

    /// Sources tagged with the configured category, by name. A failed
    /// fetch reads as no sources yet.
    pub fn sources(&self) -> Vec<Source> {
        self.try_sources().unwrap_or_else(|e| {
            warn!(error = %e, "could not fetch sources");
            Vec::new()
        })
    }

    /// Views of a source, newest id first.
    pub fn views(&self, source_id: i64) -> Vec<View> {
        self.try_views(source_id).unwrap_or_else(|e| {
            warn!(source_id, error = %e, "could not fetch views");
            Vec::new()
        })
    }

    pub fn view_data(&self, request: &DataRequest) -> ViewRows {
        self.try_view_data(request).unwrap_or_else(|e| {
            warn!(view_id = request.view_id, error = %e, "could not fetch view data");
            ViewRows::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::AggMethod;
    use serde_json::json;

    fn source(id: i64, name: &str, category: &str) -> Source {
        Source {
            source_id: id,
            name: name.to_string(),
            metadata: SourceMetadata::default(),
            categories: vec![vec![category.to_string()]],
            kind: None,
        }
    }

    fn view(id: i64, source_id: i64) -> View {
        View {
            view_id: id,
            source_id,
            version: None,
            metadata: None,
        }
    }

    fn rows() -> Vec<Row> {
        serde_json::from_value(json!([
            {"cat": "a", "v": 1, "extra": true},
            {"cat": "b", "v": 2, "extra": false},
            {"cat": "a", "v": 3, "extra": true}
        ]))
        .unwrap()
    }

    fn make_store() -> MemoryStore {
        let env = "hazmit_dama";
        MemoryStore::new()
            .with_source(env, &source(2, "Zoning", "Cenrep"), vec![(view(10, 2), rows()), (view(12, 2), vec![])])
            .with_source(env, &source(1, "Acreage", "Cenrep"), vec![])
            .with_source(env, &source(3, "Hidden", "Other"), vec![])
    }

    struct FailingClient;

    impl DataClient for FailingClient {
        fn get(&self, path: &[Segment]) -> Result<Option<JsonValue>> {
            Err(GraphError::Binding(format!("unreachable: {}", path_string(path))))
        }
    }

    #[test]
    fn test_reference_round_trip() {
        let path = vec![Segment::key("dama"), Segment::Index(3)];
        assert_eq!(as_reference(&reference(&path)), Some(path));
        assert_eq!(as_reference(&json!({"value": ["a"]})), None);
        assert_eq!(as_reference(&json!(["a"])), None);
    }

    #[test]
    fn test_sources_filtered_and_sorted() {
        let store = make_store();
        let binding = DataBinding::new(&store, BindingConfig::default());
        let names: Vec<String> = binding.sources().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Acreage", "Zoning"]);
    }

    #[test]
    fn test_sources_sorted_ignoring_case() {
        let env = "hazmit_dama";
        let store = MemoryStore::new()
            .with_source(env, &source(1, "Zoning", "Cenrep"), vec![])
            .with_source(env, &source(2, "acreage", "Cenrep"), vec![])
            .with_source(env, &source(3, "Buildings", "Cenrep"), vec![]);
        let binding = DataBinding::new(&store, BindingConfig::default());
        let names: Vec<String> = binding.sources().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["acreage", "Buildings", "Zoning"]);
    }

    #[test]
    fn test_views_newest_first() {
        let store = make_store();
        let binding = DataBinding::new(&store, BindingConfig::default());
        let ids: Vec<i64> = binding.views(2).into_iter().map(|v| v.view_id).collect();
        assert_eq!(ids, vec![12, 10]);
        assert!(binding.views(99).is_empty());
    }

    #[test]
    fn test_view_data_projects_and_filters() {
        let store = make_store();
        let binding = DataBinding::new(&store, BindingConfig::default());
        let mut request = DataRequest {
            view_id: 10,
            x_axis_column: Some(XAxisColumn::new("cat")),
            y_axis_columns: vec![YAxisColumn::new("v", AggMethod::Sum)],
            filters: vec![],
        };

        let data = binding.view_data(&request);
        assert_eq!(data.length, 3);
        assert_eq!(data.rows.len(), 3);
        assert!(data.rows[0].get("extra").is_none());
        assert_eq!(data.rows[2]["v"], Value::Number(3.0));

        request.filters.push(Filter::new("cat", vec![Value::from("a")]));
        let data = binding.view_data(&request);
        assert_eq!(data.length, 3);
        assert_eq!(data.rows.len(), 2);
    }

    #[test]
    fn test_view_data_without_columns() {
        let store = make_store();
        let binding = DataBinding::new(&store, BindingConfig::default());
        let request = DataRequest {
            view_id: 10,
            x_axis_column: None,
            y_axis_columns: vec![],
            filters: vec![],
        };
        assert_eq!(binding.view_data(&request), ViewRows::default());
    }

    #[test]
    fn test_other_env_is_empty() {
        let store = make_store();
        let config = BindingConfig {
            pg_env: "npmrds".into(),
            ..Default::default()
        };
        assert!(DataBinding::new(&store, config).sources().is_empty());
    }

    #[test]
    fn test_failures_read_as_no_data() {
        let binding = DataBinding::new(&FailingClient, BindingConfig::default());
        assert!(binding.try_sources().is_err());
        assert!(binding.sources().is_empty());
        assert!(binding.views(1).is_empty());
        let request = DataRequest {
            view_id: 1,
            x_axis_column: Some(XAxisColumn::new("cat")),
            y_axis_columns: vec![],
            filters: vec![],
        };
        assert_eq!(binding.view_data(&request), ViewRows::default());
    }

    #[test]
    fn test_request_from_state() {
        let mut state = EditorState::default();
        assert!(DataRequest::from_state(&state).is_none());

        state.active_view = Some(view(10, 2));
        state.x_axis_column = Some(XAxisColumn::new("cat"));
        state.y_axis_columns = vec![YAxisColumn::new("cat", AggMethod::Count), YAxisColumn::new("v", AggMethod::Sum)];
        state.filters = vec![Filter::new("year", vec![])];
        let request = DataRequest::from_state(&state).unwrap();
        assert_eq!(request.view_id, 10);
        assert_eq!(request.columns(), vec!["cat", "v", "year"]);
    }

    #[test]
    fn test_source_json() {
        let parsed: Source = serde_json::from_value(json!({
            "source_id": 4,
            "name": "Flood",
            "metadata": {"columns": [{"name": "depth", "type": "number"}], "other": 1},
            "categories": [["Cenrep", "Hazards"]],
            "type": "tiger"
        }))
        .unwrap();
        assert!(parsed.in_category("Cenrep"));
        assert!(!parsed.in_category("Hazards2"));
        assert!(parsed.column("depth").unwrap().is_numeric());
        assert_eq!(parsed.kind.as_deref(), Some("tiger"));
    }
}
