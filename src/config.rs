use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::binding::BindingConfig;
use crate::color::{ColorPolicyKind, ScaleKind};
use crate::columns::{AggMethod, SortMethod};
use crate::editor::{Filter, GraphType};
use crate::value::Value;

#[derive(Parser, Debug)]
#[command(name = "graphcomp")]
#[command(about = "Aggregate CSV data into bar and line graphs", long_about = None)]
pub struct Args {
    #[arg(short = 'x', long = "x", help = "X-axis column (name or 0-based index)")]
    pub x_column: Option<String>,

    #[arg(
        short = 'y',
        long = "y",
        value_parser = parse_y_column,
        help = "Y-axis column as NAME[:SUM|AVG|COUNT], repeatable"
    )]
    pub y_columns: Vec<(String, Option<AggMethod>)>,

    #[arg(long = "sort", value_enum, help = "Sort the x-axis by key")]
    pub sort: Option<SortArg>,

    #[arg(short = 'g', long = "graph", value_enum, help = "Graph type (defaults to bar)")]
    pub graph: Option<GraphArg>,

    #[arg(short = 't', long = "title", help = "Graph title")]
    pub title: Option<String>,

    #[arg(long = "x-label", help = "X-axis label")]
    pub x_label: Option<String>,

    #[arg(long = "y-label", help = "Y-axis label")]
    pub y_label: Option<String>,

    #[arg(long = "rotate-labels", help = "Draw x-axis labels vertically")]
    pub rotate_labels: bool,

    #[arg(long = "no-grid", help = "Hide y-axis grid lines")]
    pub no_grid: bool,

    #[arg(long = "colors", value_enum, help = "Color by palette or by value scale")]
    pub colors: Option<ColorsArg>,

    #[arg(long = "scale", value_enum, help = "Scale type for --colors scale")]
    pub scale: Option<ScaleArg>,

    #[arg(long = "scheme", help = "Named color range, e.g. Set1 or RdYlGn")]
    pub scheme: Option<String>,

    #[arg(long = "scheme-size", help = "Number of colors taken from --scheme")]
    pub scheme_size: Option<usize>,

    #[arg(
        long = "domain",
        value_parser = parse_domain,
        help = "Comma separated break points for threshold scales"
    )]
    pub domain: Option<::std::vec::Vec<f64>>,

    #[arg(
        long = "filter",
        value_parser = parse_filter,
        help = "Keep rows where COLUMN=VALUE, repeatable"
    )]
    pub filters: Vec<(String, String)>,

    #[arg(long = "width", default_value = "800", help = "Output width in pixels when the format width is full")]
    pub width: u32,

    #[arg(long = "height", help = "Output height in pixels")]
    pub height: Option<u32>,

    #[arg(short = 'o', long = "output", value_enum, default_value = "png", help = "Output kind")]
    pub output: OutputKind,

    #[arg(long = "state", help = "Load a persisted editor envelope")]
    pub state: Option<PathBuf>,

    #[arg(long = "save", help = "Write the editor envelope here when it changes")]
    pub save: Option<PathBuf>,

    #[arg(long = "list-schemes", help = "List the color ranges offered at SIZE and exit")]
    pub list_schemes: Option<usize>,

    #[arg(long = "pg-env", env = "GRAPHCOMP_PG_ENV", default_value = "hazmit_dama", help = "Data namespace environment")]
    pub pg_env: String,

    #[arg(long = "category", env = "GRAPHCOMP_CATEGORY", default_value = "Cenrep", help = "Source category to offer")]
    pub category: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortArg {
    None,
    Asc,
    Desc,
}

impl From<SortArg> for SortMethod {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::None => SortMethod::None,
            SortArg::Asc => SortMethod::Asc,
            SortArg::Desc => SortMethod::Desc,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphArg {
    Bar,
    Line,
}

impl From<GraphArg> for GraphType {
    fn from(arg: GraphArg) -> Self {
        match arg {
            GraphArg::Bar => GraphType::Bar,
            GraphArg::Line => GraphType::Line,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorsArg {
    Palette,
    Scale,
}

impl From<ColorsArg> for ColorPolicyKind {
    fn from(arg: ColorsArg) -> Self {
        match arg {
            ColorsArg::Palette => ColorPolicyKind::Palette,
            ColorsArg::Scale => ColorPolicyKind::Scale,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleArg {
    Quantize,
    Quantile,
    Threshold,
}

impl From<ScaleArg> for ScaleKind {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::Quantize => ScaleKind::Quantize,
            ScaleArg::Quantile => ScaleKind::Quantile,
            ScaleArg::Threshold => ScaleKind::Threshold,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    Png,
    Json,
}

impl Args {
    pub fn binding(&self) -> BindingConfig {
        BindingConfig {
            pg_env: self.pg_env.clone(),
            category: self.category.clone(),
        }
    }

    /// Repeated `--filter` options on one column merge into one filter.
    pub fn filter_list(&self) -> Vec<Filter> {
        let mut filters: Vec<Filter> = Vec::new();
        for (column, value) in &self.filters {
            let value = Value::from(value.as_str());
            match filters.iter_mut().find(|f| f.column == *column) {
                Some(filter) => filter.values.push(value),
                None => filters.push(Filter::new(column.clone(), vec![value])),
            }
        }
        filters
    }
}

pub fn parse_y_column(input: &str) -> Result<(String, Option<AggMethod>), String> {
    let (name, agg) = match input.rsplit_once(':') {
        Some((name, agg)) => (name, Some(agg)),
        None => (input, None),
    };
    if name.trim().is_empty() {
        return Err(format!("missing column name in '{}'", input));
    }
    let agg = match agg.map(|a| a.trim().to_ascii_uppercase()) {
        None => None,
        Some(a) if a == "SUM" => Some(AggMethod::Sum),
        Some(a) if a == "AVG" => Some(AggMethod::Avg),
        Some(a) if a == "COUNT" => Some(AggMethod::Count),
        Some(a) => return Err(format!("unknown aggregation '{}', expected SUM, AVG or COUNT", a)),
    };
    Ok((name.trim().to_string(), agg))
}

pub fn parse_filter(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected COLUMN=VALUE, got '{}'", input)),
    }
}

pub fn parse_domain(input: &str) -> Result<Vec<f64>, String> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    input
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid break point '{}': {}", part.trim(), e))
        })
        .collect()
}
