// Graph format settings and batched path edits

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::color::{ColorPolicy, ColorPolicyKind, ScaleKind};
use crate::error::{GraphError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidthKeyword {
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Width {
    Pixels(u32),
    Keyword(WidthKeyword),
}

impl Width {
    pub const FULL: Width = Width::Keyword(WidthKeyword::Full);

    /// Pixel width, resolving `"full"` against the available width.
    pub fn resolve(self, available: u32) -> u32 {
        match self {
            Width::Pixels(px) => px,
            Width::Keyword(WidthKeyword::Full) => available,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Default for Margin {
    fn default() -> Self {
        Margin {
            top: 20,
            right: 20,
            bottom: 50,
            left: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XAxisFormat {
    pub label: String,
    pub rotate_labels: bool,
    pub tick_density: f64,
}

impl Default for XAxisFormat {
    fn default() -> Self {
        XAxisFormat {
            label: String::new(),
            rotate_labels: false,
            tick_density: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YAxisFormat {
    pub label: String,
    pub show_grid_lines: bool,
}

impl Default for YAxisFormat {
    fn default() -> Self {
        YAxisFormat {
            label: String::new(),
            show_grid_lines: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphFormat {
    pub title: String,
    pub description: String,
    pub height: u32,
    pub width: Width,
    pub margin: Margin,
    pub x_axis: XAxisFormat,
    pub y_axis: YAxisFormat,
    pub colors: ColorPolicy,
}

impl Default for GraphFormat {
    fn default() -> Self {
        GraphFormat {
            title: String::new(),
            description: String::new(),
            height: 300,
            width: Width::FULL,
            margin: Margin::default(),
            x_axis: XAxisFormat::default(),
            y_axis: YAxisFormat::default(),
            colors: ColorPolicy::default(),
        }
    }
}

impl GraphFormat {
    pub fn create() -> Self {
        GraphFormat::default()
    }
}

/// Set `value` at `path`, a sequence of field names from the format root.
/// Array elements are addressed by their decimal index.
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub path: Vec<String>,
    pub value: JsonValue,
}

impl Edit {
    pub fn new<P, S>(path: P, value: impl Into<JsonValue>) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Edit {
            path: path.into_iter().map(Into::into).collect(),
            value: value.into(),
        }
    }

    fn path_string(&self) -> String {
        self.path.join(".")
    }
}

/// Apply `edits` in order to a copy of `format`.
///
/// Intermediate states inside the batch are never checked, so paired edits
/// (a new color type with its new value) are applied together. The result
/// must deserialize as a format, every edited path must name a real field,
/// and the color policy must validate.
pub fn apply_edits(format: &GraphFormat, edits: &[Edit]) -> Result<GraphFormat> {
    let mut doc = serde_json::to_value(format)?;
    for edit in edits {
        if edit.path.is_empty() {
            return Err(invalid(edit, "path is empty"));
        }
        set_path(&mut doc, &edit.path, edit.value.clone()).map_err(|reason| invalid(edit, &reason))?;
    }

    let next: GraphFormat = serde_json::from_value(doc).map_err(|e| GraphError::InvalidEdit {
        path: edits.iter().map(Edit::path_string).collect::<Vec<_>>().join(", "),
        reason: e.to_string(),
    })?;

    let normalized = serde_json::to_value(&next)?;
    if let Some(edit) = edits.iter().find(|e| lookup(&normalized, &e.path).is_none()) {
        return Err(invalid(edit, "no such field"));
    }

    next.colors.validate()?;
    Ok(next)
}

fn invalid(edit: &Edit, reason: &str) -> GraphError {
    GraphError::InvalidEdit {
        path: edit.path_string(),
        reason: reason.to_string(),
    }
}

fn set_path(doc: &mut JsonValue, path: &[String], value: JsonValue) -> std::result::Result<(), String> {
    let (last, parents) = match path.split_last() {
        Some(split) => split,
        None => return Err("path is empty".to_string()),
    };

    let mut node = doc;
    for segment in parents {
        if node.is_null() {
            *node = JsonValue::Object(Default::default());
        }
        node = match node {
            JsonValue::Object(map) => map
                .entry(segment.clone())
                .or_insert_with(|| JsonValue::Object(Default::default())),
            JsonValue::Array(items) => {
                let len = items.len();
                array_slot(items, segment, len)?
            }
            _ => return Err(format!("cannot descend into '{}'", segment)),
        };
    }

    if node.is_null() {
        *node = JsonValue::Object(Default::default());
    }
    match node {
        JsonValue::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        JsonValue::Array(items) => {
            let len = items.len();
            *array_slot(items, last, len)? = value;
            Ok(())
        }
        _ => Err(format!("cannot set '{}' on a scalar", last)),
    }
}

fn array_slot<'a>(
    items: &'a mut [JsonValue],
    segment: &str,
    len: usize,
) -> std::result::Result<&'a mut JsonValue, String> {
    segment
        .parse::<usize>()
        .ok()
        .and_then(|i| items.get_mut(i))
        .ok_or_else(|| format!("'{}' is not an index below {}", segment, len))
}

fn lookup<'a>(doc: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    path.iter().try_fold(doc, |node, segment| match node {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Edits switching the color policy kind, paired with its initial value.
pub fn color_type_edits(kind: ColorPolicyKind) -> Vec<Edit> {
    let initial = serde_json::to_value(ColorPolicy::initial(kind)).unwrap_or(JsonValue::Null);
    vec![
        Edit::new(["colors", "type"], initial["type"].clone()),
        Edit::new(["colors", "value"], initial["value"].clone()),
    ]
}

/// Edits switching the scale type, paired with the domain it requires.
pub fn scale_type_edits(kind: ScaleKind) -> Vec<Edit> {
    let domain = match kind {
        ScaleKind::Threshold => JsonValue::Array(Vec::new()),
        _ => JsonValue::Null,
    };
    let kind = serde_json::to_value(kind).unwrap_or(JsonValue::Null);
    vec![
        Edit::new(["colors", "value", "type"], kind),
        Edit::new(["colors", "value", "domain"], domain),
    ]
}
