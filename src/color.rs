// Color policies (palette or scale) and the resolvers built from them

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::editor::GraphType;
use crate::error::{GraphError, Result};
use crate::palette::{default_palette, default_scale_range, ColorPalette};
use crate::scale::ColorScaleFn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    Quantize,
    Quantile,
    Threshold,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScale {
    #[serde(rename = "type")]
    pub kind: ScaleKind,
    pub range: Vec<String>,
    #[serde(default)]
    pub domain: Option<Vec<f64>>,
}

impl ColorScale {
    pub fn new(kind: ScaleKind, range: Vec<String>) -> Self {
        let domain = match kind {
            ScaleKind::Threshold => Some(Vec::new()),
            _ => None,
        };
        ColorScale { kind, range, domain }
    }

    /// Build the concrete scale, falling back to the data domain when the
    /// scale carries none of its own.
    pub fn build(&self, data_domain: &[f64]) -> Result<ColorScaleFn> {
        let range = self.range.clone();
        let scale = match self.kind {
            ScaleKind::Quantize => {
                ColorScaleFn::quantize(self.domain.as_deref().unwrap_or(data_domain), range)
            }
            ScaleKind::Quantile => {
                ColorScaleFn::quantile(self.domain.as_deref().unwrap_or(data_domain), range)
            }
            ScaleKind::Threshold => {
                let domain = self.domain.as_deref().ok_or(GraphError::MissingThresholdDomain)?;
                ColorScaleFn::threshold(domain, range)
            }
        };
        Ok(scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorPolicyKind {
    Palette,
    Scale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ColorPolicy {
    Palette(Vec<String>),
    Scale(ColorScale),
}

impl Default for ColorPolicy {
    fn default() -> Self {
        ColorPolicy::Palette(default_palette())
    }
}

impl ColorPolicy {
    /// The policy a freshly selected kind starts from.
    pub fn initial(kind: ColorPolicyKind) -> Self {
        match kind {
            ColorPolicyKind::Palette => ColorPolicy::Palette(default_palette()),
            ColorPolicyKind::Scale => {
                ColorPolicy::Scale(ColorScale::new(ScaleKind::Quantize, default_scale_range()))
            }
        }
    }

    pub fn kind(&self) -> ColorPolicyKind {
        match self {
            ColorPolicy::Palette(_) => ColorPolicyKind::Palette,
            ColorPolicy::Scale(_) => ColorPolicyKind::Scale,
        }
    }

    /// Check the policy can always produce a color.
    pub fn validate(&self) -> Result<()> {
        let colors = match self {
            ColorPolicy::Palette(colors) => colors,
            ColorPolicy::Scale(scale) => {
                match (scale.kind, &scale.domain) {
                    (ScaleKind::Threshold, None) => return Err(GraphError::MissingThresholdDomain),
                    (ScaleKind::Threshold, Some(domain)) => {
                        if domain.windows(2).any(|w| !(w[0] <= w[1])) {
                            return Err(GraphError::UnsortedThresholdDomain(domain.clone()));
                        }
                    }
                    _ => {}
                }
                &scale.range
            }
        };
        if colors.is_empty() {
            return Err(GraphError::EmptyColorRange);
        }
        colors.iter().try_for_each(|c| validate_color(c))
    }

    /// Resolver for bar graphs: one color per key on every record.
    pub fn bar_resolver(&self, keys: &[String], data_domain: &[f64]) -> Result<BarColors> {
        self.validate()?;
        Ok(match self {
            ColorPolicy::Palette(colors) => {
                BarColors::Fixed(ColorPalette::new(colors.clone()).assign_colors(keys))
            }
            ColorPolicy::Scale(scale) => BarColors::Scaled {
                keys: keys.to_vec(),
                scale: scale.build(data_domain)?,
            },
        })
    }

    /// Resolver for line graphs: one color per series.
    pub fn line_resolver(&self) -> Result<LineColors> {
        self.validate()?;
        match self {
            ColorPolicy::Palette(colors) => Ok(LineColors {
                palette: ColorPalette::new(colors.clone()),
            }),
            ColorPolicy::Scale(_) => Err(GraphError::ScaleNotSupported(GraphType::Line)),
        }
    }
}

fn validate_color(color: &str) -> Result<()> {
    csscolorparser::parse(color)
        .map(|_| ())
        .map_err(|e| GraphError::InvalidColor {
            color: color.to_string(),
            reason: e.to_string(),
        })
}

pub enum BarColors {
    /// Every record shares the same key to color mapping.
    Fixed(IndexMap<String, String>),
    Scaled { keys: Vec<String>, scale: ColorScaleFn },
}

impl BarColors {
    pub fn colors_for(&self, values: &IndexMap<String, Option<f64>>) -> IndexMap<String, String> {
        match self {
            BarColors::Fixed(colors) => colors.clone(),
            BarColors::Scaled { keys, scale } => keys
                .iter()
                .map(|k| {
                    let value = values.get(k).copied().flatten();
                    (k.clone(), scale.map(value).to_string())
                })
                .collect(),
        }
    }
}

pub struct LineColors {
    palette: ColorPalette,
}

impl LineColors {
    pub fn color(&self, series_index: usize) -> String {
        self.palette.get_color(series_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_policy_json_shape() {
        let palette = ColorPolicy::Palette(vec!["red".into()]);
        assert_eq!(
            serde_json::to_value(&palette).unwrap(),
            json!({"type": "palette", "value": ["red"]})
        );

        let scale = ColorPolicy::initial(ColorPolicyKind::Scale);
        let value = serde_json::to_value(&scale).unwrap();
        assert_eq!(value["type"], "scale");
        assert_eq!(value["value"]["type"], "quantize");
        assert_eq!(value["value"]["domain"], serde_json::Value::Null);
        assert_eq!(value["value"]["range"].as_array().unwrap().len(), 7);
    }

    #[test]
    fn test_unknown_scale_type_rejected() {
        let res: std::result::Result<ColorPolicy, _> = serde_json::from_value(json!({
            "type": "scale",
            "value": {"type": "log", "range": ["red"]}
        }));
        assert!(res.is_err());
    }

    #[test]
    fn test_validate_threshold_domain() {
        let missing = ColorPolicy::Scale(ColorScale {
            kind: ScaleKind::Threshold,
            range: vec!["red".into(), "blue".into()],
            domain: None,
        });
        assert!(matches!(missing.validate(), Err(GraphError::MissingThresholdDomain)));

        let unsorted = ColorPolicy::Scale(ColorScale {
            kind: ScaleKind::Threshold,
            range: vec!["red".into(), "blue".into()],
            domain: Some(vec![5.0, 1.0]),
        });
        assert!(matches!(unsorted.validate(), Err(GraphError::UnsortedThresholdDomain(_))));

        let empty = ColorPolicy::Scale(ColorScale::new(ScaleKind::Threshold, vec!["red".into()]));
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn test_validate_colors() {
        assert!(matches!(
            ColorPolicy::Palette(vec![]).validate(),
            Err(GraphError::EmptyColorRange)
        ));
        assert!(matches!(
            ColorPolicy::Palette(vec!["#zzzzzz".into()]).validate(),
            Err(GraphError::InvalidColor { .. })
        ));
        assert!(ColorPolicy::Palette(vec!["rgb(1, 2, 3)".into(), "coral".into()]).validate().is_ok());
    }

    #[test]
    fn test_bar_palette_by_key_position() {
        let policy = ColorPolicy::Palette(vec!["red".into(), "blue".into()]);
        let resolver = policy.bar_resolver(&keys(&["a", "b", "c"]), &[]).unwrap();
        let colors = resolver.colors_for(&IndexMap::new());
        assert_eq!(colors["a"], "red");
        assert_eq!(colors["b"], "blue");
        assert_eq!(colors["c"], "red");
    }

    #[test]
    fn test_bar_scale_uses_data_domain() {
        let policy = ColorPolicy::Scale(ColorScale::new(
            ScaleKind::Quantize,
            vec!["red".into(), "blue".into()],
        ));
        let resolver = policy.bar_resolver(&keys(&["v"]), &[0.0, 10.0]).unwrap();
        let low: IndexMap<String, Option<f64>> = [("v".to_string(), Some(1.0))].into_iter().collect();
        let high: IndexMap<String, Option<f64>> = [("v".to_string(), Some(9.0))].into_iter().collect();
        assert_eq!(resolver.colors_for(&low)["v"], "red");
        assert_eq!(resolver.colors_for(&high)["v"], "blue");
    }

    #[test]
    fn test_line_rejects_scale() {
        let policy = ColorPolicy::initial(ColorPolicyKind::Scale);
        assert!(matches!(
            policy.line_resolver(),
            Err(GraphError::ScaleNotSupported(GraphType::Line))
        ));

        let resolver = ColorPolicy::Palette(vec!["red".into(), "blue".into()]).line_resolver().unwrap();
        assert_eq!(resolver.color(0), "red");
        assert_eq!(resolver.color(5), "blue");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn palette_is_cyclic(len in 1usize..12, n_keys in 0usize..40) {
                let palette: Vec<String> = crate::palette::default_palette().into_iter().take(len).collect();
                let names: Vec<String> = (0..n_keys).map(|i| format!("k{}", i)).collect();
                let colors = ColorPolicy::Palette(palette.clone())
                    .bar_resolver(&names, &[])
                    .unwrap()
                    .colors_for(&IndexMap::new());
                for (i, name) in names.iter().enumerate() {
                    prop_assert_eq!(&colors[name], &palette[i % len]);
                }
            }
        }
    }
}
