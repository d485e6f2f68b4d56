use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

use crate::binding::{Source, View};
use crate::color::ColorPolicy;
use crate::columns::{XAxisColumn, YAxisColumn};
use crate::format::GraphFormat;
use crate::value::{cell, Row, Value};

/// Graph variants the editor can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "GraphOption", into = "GraphOption")]
pub enum GraphType {
    #[default]
    Bar,
    Line,
}

impl GraphType {
    pub const ALL: [GraphType; 2] = [GraphType::Bar, GraphType::Line];

    pub fn label(self) -> &'static str {
        match self {
            GraphType::Bar => "Bar Graph",
            GraphType::Line => "Line Graph",
        }
    }

    fn component(self) -> &'static str {
        match self {
            GraphType::Bar => "BarGraph",
            GraphType::Line => "LineGraph",
        }
    }

    fn data_generator(self) -> &'static str {
        match self {
            GraphType::Bar => "generateBarData",
            GraphType::Line => "generateLineData",
        }
    }

    /// Only bars color each value individually; lines take one color per series.
    pub fn supports_scale_colors(self) -> bool {
        matches!(self, GraphType::Bar)
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Persisted shape of a graph type selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphOption {
    #[serde(rename = "type", default)]
    pub label: Option<String>,
    #[serde(rename = "GraphComp", default)]
    pub component: Option<String>,
    #[serde(rename = "dataGenerator", default)]
    pub data_generator: Option<String>,
}

impl TryFrom<GraphOption> for GraphType {
    type Error = String;

    fn try_from(option: GraphOption) -> Result<Self, Self::Error> {
        GraphType::ALL
            .into_iter()
            .find(|t| {
                option.label.as_deref() == Some(t.label())
                    || option.component.as_deref() == Some(t.component())
            })
            .ok_or_else(|| format!("unknown graph type {:?}", option.label))
    }
}

impl From<GraphType> for GraphOption {
    fn from(graph_type: GraphType) -> Self {
        GraphOption {
            label: Some(graph_type.label().to_string()),
            component: Some(graph_type.component().to_string()),
            data_generator: Some(graph_type.data_generator().to_string()),
        }
    }
}

/// Keep rows whose `column` value matches one of `values`. Values are
/// compared by their string form, so `"2020"` matches the number 2020.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub values: Vec<Value>,
}

impl Filter {
    pub fn new(column: impl Into<String>, values: Vec<Value>) -> Self {
        Filter {
            column: column.into(),
            values,
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        let key = cell(row, &self.column).to_key_string();
        self.values.iter().any(|v| v.to_key_string() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_view: Option<View>,
    pub active_graph_type: GraphType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis_column: Option<XAxisColumn>,
    pub y_axis_columns: Vec<YAxisColumn>,
    pub graph_format: GraphFormat,
    pub filters: Vec<Filter>,
}

impl EditorState {
    /// Decode a persisted state object field by field. A field that is
    /// missing or fails to decode takes its default; this never fails.
    pub fn from_json(state: &Map<String, JsonValue>) -> Self {
        let decoded = EditorState {
            active_source: decode_field(state, "activeSource"),
            active_view: decode_field(state, "activeView"),
            active_graph_type: decode_field(state, "activeGraphType"),
            x_axis_column: decode_field(state, "xAxisColumn"),
            y_axis_columns: decode_field(state, "yAxisColumns"),
            graph_format: decode_field(state, "graphFormat"),
            filters: decode_field(state, "filters"),
        };
        decoded.normalized()
    }

    /// Repair combinations that a persisted blob can carry but no
    /// transition can produce.
    pub fn normalized(mut self) -> Self {
        if !self.active_graph_type.supports_scale_colors()
            && matches!(self.graph_format.colors, ColorPolicy::Scale(_))
        {
            warn!(graph_type = %self.active_graph_type, "scale colors not supported, resetting to palette");
            self.graph_format.colors = ColorPolicy::default();
        }
        if let Err(e) = self.graph_format.colors.validate() {
            warn!(error = %e, "invalid persisted colors, resetting to palette");
            self.graph_format.colors = ColorPolicy::default();
        }

        let mut seen = HashSet::new();
        let before = self.y_axis_columns.len();
        self.y_axis_columns.retain(|c| seen.insert(c.name.clone()));
        if self.y_axis_columns.len() != before {
            warn!("dropped duplicate y-axis columns from persisted state");
        }
        self
    }

    /// Column identities the current selection reads from the view.
    pub fn requested_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .x_axis_column
            .iter()
            .map(|c| c.name.clone())
            .chain(self.y_axis_columns.iter().map(|c| c.name.clone()))
            .collect();
        let mut seen = HashSet::new();
        columns.retain(|c| seen.insert(c.clone()));
        columns
    }
}

fn decode_field<T: DeserializeOwned + Default>(state: &Map<String, JsonValue>, key: &str) -> T {
    match state.get(key) {
        None | Some(JsonValue::Null) => T::default(),
        Some(value) => match serde_json::from_value(value.clone()) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(field = key, error = %e, "could not decode persisted field, using default");
                T::default()
            }
        },
    }
}
