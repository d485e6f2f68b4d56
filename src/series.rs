use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::aggregate::{group_rows, reduce_column, reduce_groups, sort_by_key_string};
use crate::color::ColorPolicy;
use crate::columns::{XAxisColumn, YAxisColumn};
use crate::editor::GraphType;
use crate::error::Result;
use crate::value::{Row, Value};

/// A bar record: the x key, one value per y column, and a color per y column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub index: Value,
    #[serde(flatten)]
    pub values: IndexMap<String, Option<f64>>,
    pub colors: IndexMap<String, String>,
}

impl BarRecord {
    pub fn color(&self, key: &str) -> Option<&str> {
        self.colors.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub x: Value,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    pub id: String,
    pub color: String,
    pub data: Vec<LinePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesOutput {
    Bar { keys: Vec<String>, data: Vec<BarRecord> },
    Line { data: Vec<LineSeries> },
}

impl SeriesOutput {
    pub fn empty(graph_type: GraphType) -> Self {
        match graph_type {
            GraphType::Bar => SeriesOutput::Bar {
                keys: Vec::new(),
                data: Vec::new(),
            },
            GraphType::Line => SeriesOutput::Line { data: Vec::new() },
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SeriesOutput::Bar { data, .. } => data.is_empty(),
            SeriesOutput::Line { data } => data.iter().all(|s| s.data.is_empty()),
        }
    }

    /// Long-format snapshot: one entry per (x key, y column).
    pub fn view_data(&self) -> Vec<ViewDatum> {
        match self {
            SeriesOutput::Bar { keys, data } => data
                .iter()
                .flat_map(|record| {
                    keys.iter().map(move |k| ViewDatum {
                        index: record.index.clone(),
                        value: record.values.get(k).copied().flatten(),
                        key: k.clone(),
                    })
                })
                .collect(),
            SeriesOutput::Line { data } => data
                .iter()
                .flat_map(|series| {
                    series.data.iter().map(move |p| ViewDatum {
                        index: p.x.clone(),
                        value: p.y,
                        key: series.id.clone(),
                    })
                })
                .collect(),
        }
    }
}

/// One derived row of the persisted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDatum {
    pub index: Value,
    pub value: Option<f64>,
    #[serde(rename = "type")]
    pub key: String,
}

/// Series plus the flat list of every reduced value, for scale coloring.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesBundle {
    pub output: SeriesOutput,
    pub domain: Vec<f64>,
}

impl SeriesBundle {
    pub fn empty(graph_type: GraphType) -> Self {
        SeriesBundle {
            output: SeriesOutput::empty(graph_type),
            domain: Vec::new(),
        }
    }
}

/// Build the series for a graph type. Missing selections or no rows give
/// an empty series; an unusable color policy is an error.
pub fn build_series(
    graph_type: GraphType,
    rows: &[Row],
    x: Option<&XAxisColumn>,
    ys: &[YAxisColumn],
    colors: &ColorPolicy,
) -> Result<SeriesBundle> {
    let x = match x {
        Some(x) if !rows.is_empty() && !ys.is_empty() => x,
        _ => return Ok(SeriesBundle::empty(graph_type)),
    };
    match graph_type {
        GraphType::Bar => build_bar_series(rows, x, ys, colors),
        GraphType::Line => build_line_series(rows, x, ys, colors),
    }
}

pub fn build_bar_series(
    rows: &[Row],
    x: &XAxisColumn,
    ys: &[YAxisColumn],
    colors: &ColorPolicy,
) -> Result<SeriesBundle> {
    let keys: Vec<String> = ys.iter().map(|y| y.name.clone()).collect();
    let mut groups = reduce_groups(rows, &x.name, ys);

    // Domain follows discovery order, before any sort
    let domain: Vec<f64> = groups
        .iter()
        .flat_map(|g| g.values.values().filter_map(|v| *v))
        .collect();
    sort_by_key_string(&mut groups, x.sort_method, |g| &g.index);

    let resolver = colors.bar_resolver(&keys, &domain)?;
    let data = groups
        .into_iter()
        .map(|g| BarRecord {
            colors: resolver.colors_for(&g.values),
            index: g.index,
            values: g.values,
        })
        .collect();

    Ok(SeriesBundle {
        output: SeriesOutput::Bar { keys, data },
        domain,
    })
}

pub fn build_line_series(
    rows: &[Row],
    x: &XAxisColumn,
    ys: &[YAxisColumn],
    colors: &ColorPolicy,
) -> Result<SeriesBundle> {
    let resolver = colors.line_resolver()?;
    let groups = group_rows(rows, &x.name);
    let mut domain = Vec::new();

    let data: Vec<LineSeries> = ys
        .iter()
        .enumerate()
        .map(|(i, y)| {
            let mut points: Vec<LinePoint> = groups
                .iter()
                .map(|g| LinePoint {
                    x: g.key.clone(),
                    y: reduce_column(&g.rows, y),
                })
                .collect();
            domain.extend(points.iter().filter_map(|p| p.y));
            sort_by_key_string(&mut points, x.sort_method, |p| &p.x);
            LineSeries {
                id: y.name.clone(),
                color: resolver.color(i),
                data: points,
            }
        })
        .collect();

    Ok(SeriesBundle {
        output: SeriesOutput::Line { data },
        domain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ColorScale, ScaleKind};
    use crate::columns::{AggMethod, SortMethod};
    use crate::error::GraphError;
    use crate::palette::default_palette;
    use serde_json::json;

    fn make_rows() -> Vec<Row> {
        serde_json::from_value(json!([
            {"cat": "a", "v": 1},
            {"cat": "a", "v": 3},
            {"cat": "b", "v": 2}
        ]))
        .unwrap()
    }

    fn sum_v() -> Vec<YAxisColumn> {
        vec![YAxisColumn::new("v", AggMethod::Sum)]
    }

    #[test]
    fn test_bar_series_example() {
        let palette = default_palette();
        let bundle = build_series(
            GraphType::Bar,
            &make_rows(),
            Some(&XAxisColumn::new("cat")),
            &sum_v(),
            &ColorPolicy::default(),
        )
        .unwrap();

        let expected = json!({
            "keys": ["v"],
            "data": [
                {"index": "a", "v": 4.0, "colors": {"v": palette[0]}},
                {"index": "b", "v": 2.0, "colors": {"v": palette[0]}}
            ]
        });
        assert_eq!(serde_json::to_value(&bundle.output).unwrap(), expected);
        assert_eq!(bundle.domain, vec![4.0, 2.0]);
    }

    #[test]
    fn test_bar_series_desc() {
        let x = XAxisColumn::new("cat").with_sort(SortMethod::Desc);
        let bundle =
            build_series(GraphType::Bar, &make_rows(), Some(&x), &sum_v(), &ColorPolicy::default())
                .unwrap();
        match bundle.output {
            SeriesOutput::Bar { data, .. } => {
                let order: Vec<&Value> = data.iter().map(|r| &r.index).collect();
                assert_eq!(order, vec![&Value::from("b"), &Value::from("a")]);
            }
            _ => panic!("Expected bar series"),
        }
        // Domain keeps discovery order
        assert_eq!(bundle.domain, vec![4.0, 2.0]);

        let line = build_series(GraphType::Line, &make_rows(), Some(&x), &sum_v(), &ColorPolicy::default())
            .unwrap();
        assert_eq!(line.domain, vec![4.0, 2.0]);
    }

    #[test]
    fn test_bar_series_scale_colors() {
        let colors = ColorPolicy::Scale(ColorScale::new(
            ScaleKind::Quantize,
            vec!["red".into(), "blue".into()],
        ));
        let bundle = build_series(
            GraphType::Bar,
            &make_rows(),
            Some(&XAxisColumn::new("cat")),
            &sum_v(),
            &colors,
        )
        .unwrap();
        match &bundle.output {
            SeriesOutput::Bar { data, .. } => {
                // domain is [4, 2]: 4 is the top bucket, 2 the bottom
                assert_eq!(data[0].color("v"), Some("blue"));
                assert_eq!(data[1].color("v"), Some("red"));
            }
            _ => panic!("Expected bar series"),
        }
    }

    #[test]
    fn test_line_series() {
        let ys = vec![
            YAxisColumn::new("v", AggMethod::Sum),
            YAxisColumn::new("v", AggMethod::Count).with_type("number"),
        ];
        let x = XAxisColumn::new("cat").with_sort(SortMethod::Desc);
        let palette = vec!["red".to_string(), "blue".to_string()];
        let bundle = build_series(
            GraphType::Line,
            &make_rows(),
            Some(&x),
            &ys,
            &ColorPolicy::Palette(palette),
        )
        .unwrap();

        match &bundle.output {
            SeriesOutput::Line { data } => {
                assert_eq!(data.len(), 2);
                assert_eq!(data[0].color, "red");
                assert_eq!(data[1].color, "blue");
                assert_eq!(data[0].data[0].x, Value::from("b"));
                assert_eq!(data[0].data[0].y, Some(2.0));
                assert_eq!(data[0].data[1].y, Some(4.0));
                assert_eq!(data[1].data[1].y, Some(2.0));
            }
            _ => panic!("Expected line series"),
        }
        assert_eq!(bundle.domain.len(), 4);
    }

    #[test]
    fn test_line_series_json_shape() {
        let bundle = build_series(
            GraphType::Line,
            &make_rows(),
            Some(&XAxisColumn::new("cat")),
            &sum_v(),
            &ColorPolicy::Palette(vec!["red".into()]),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&bundle.output).unwrap(),
            json!({"data": [{"id": "v", "color": "red", "data": [
                {"x": "a", "y": 4.0},
                {"x": "b", "y": 2.0}
            ]}]})
        );
    }

    #[test]
    fn test_line_series_rejects_scale() {
        let res = build_series(
            GraphType::Line,
            &make_rows(),
            Some(&XAxisColumn::new("cat")),
            &sum_v(),
            &ColorPolicy::initial(crate::color::ColorPolicyKind::Scale),
        );
        assert!(matches!(res, Err(GraphError::ScaleNotSupported(GraphType::Line))));
    }

    #[test]
    fn test_empty_inputs_give_empty_series() {
        let colors = ColorPolicy::default();
        let empty = build_series(GraphType::Bar, &[], Some(&XAxisColumn::new("cat")), &sum_v(), &colors)
            .unwrap();
        assert!(empty.output.is_empty());
        assert_eq!(empty, SeriesBundle::empty(GraphType::Bar));

        let no_x = build_series(GraphType::Line, &make_rows(), None, &sum_v(), &colors).unwrap();
        assert_eq!(no_x, SeriesBundle::empty(GraphType::Line));

        let no_y =
            build_series(GraphType::Bar, &make_rows(), Some(&XAxisColumn::new("cat")), &[], &colors)
                .unwrap();
        assert!(no_y.output.is_empty());
    }

    #[test]
    fn test_view_data_flattening() {
        let bundle = build_series(
            GraphType::Bar,
            &make_rows(),
            Some(&XAxisColumn::new("cat")),
            &sum_v(),
            &ColorPolicy::default(),
        )
        .unwrap();
        let view_data = bundle.output.view_data();
        assert_eq!(view_data.len(), 2);
        assert_eq!(
            serde_json::to_value(&view_data[0]).unwrap(),
            json!({"index": "a", "value": 4.0, "type": "v"})
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
            prop::collection::vec((0u8..5, -50i32..50, 0i32..10), 0..30).prop_map(|cells| {
                cells
                    .into_iter()
                    .map(|(k, v, w)| {
                        let mut row = Row::new();
                        row.insert("k".into(), Value::Number(k as f64));
                        row.insert("v".into(), Value::Number(v as f64));
                        row.insert("w".into(), Value::Number(w as f64));
                        row
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn series_builder_is_deterministic(rows in arb_rows(), desc in any::<bool>(), bar in any::<bool>()) {
                let sort = if desc { SortMethod::Desc } else { SortMethod::Asc };
                let graph_type = if bar { GraphType::Bar } else { GraphType::Line };
                let x = XAxisColumn::new("k").with_sort(sort);
                let ys = vec![YAxisColumn::new("v", AggMethod::Avg), YAxisColumn::new("w", AggMethod::Sum)];
                let colors = ColorPolicy::default();
                let first = build_series(graph_type, &rows, Some(&x), &ys, &colors).unwrap();
                let second = build_series(graph_type, &rows, Some(&x), &ys, &colors).unwrap();
                prop_assert_eq!(first, second);
            }
        }
    }
}
