// Column selections for the x and y axes

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortMethod {
    #[default]
    None,
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggMethod {
    Sum,
    Avg,
    Count,
}

/// Column metadata as published by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ColumnMeta {
    pub fn is_numeric(&self) -> bool {
        is_numeric_type(&self.column_type)
    }
}

/// Column types that count non-null values rather than rows.
pub fn is_numeric_type(column_type: &str) -> bool {
    matches!(column_type, "number" | "integer")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XAxisColumn {
    pub name: String,
    #[serde(default)]
    pub sort_method: SortMethod,
    #[serde(rename = "type", default)]
    pub column_type: String,
}

impl XAxisColumn {
    pub fn new(name: impl Into<String>) -> Self {
        XAxisColumn {
            name: name.into(),
            sort_method: SortMethod::None,
            column_type: String::new(),
        }
    }

    pub fn with_sort(mut self, sort_method: SortMethod) -> Self {
        self.sort_method = sort_method;
        self
    }

    pub fn from_meta(meta: &ColumnMeta) -> Self {
        XAxisColumn {
            name: meta.name.clone(),
            sort_method: SortMethod::None,
            column_type: meta.column_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YAxisColumn {
    pub name: String,
    pub agg_method: AggMethod,
    #[serde(rename = "type", default)]
    pub column_type: String,
}

impl YAxisColumn {
    pub fn new(name: impl Into<String>, agg_method: AggMethod) -> Self {
        YAxisColumn {
            name: name.into(),
            agg_method,
            column_type: String::new(),
        }
    }

    pub fn with_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = column_type.into();
        self
    }

    pub fn from_meta(meta: &ColumnMeta) -> Self {
        YAxisColumn {
            name: meta.name.clone(),
            agg_method: AggMethod::Sum,
            column_type: meta.column_type.clone(),
        }
    }
}

/// Partial update for the x-axis column; unset fields are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XAxisUpdate {
    pub sort_method: Option<SortMethod>,
}

/// Partial update for a single y-axis column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YAxisUpdate {
    pub agg_method: Option<AggMethod>,
    pub column_type: Option<String>,
}
