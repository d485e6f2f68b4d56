// Named color ranges for palettes and scale ranges

use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemeKind {
    Diverging,
    Qualitative,
    Sequential,
}

impl SchemeKind {
    pub fn label(self) -> &'static str {
        match self {
            SchemeKind::Diverging => "Diverging",
            SchemeKind::Qualitative => "Qualitative",
            SchemeKind::Sequential => "Sequential",
        }
    }
}

/// A color scheme. Qualitative schemes can be cut to any length from 3 up
/// to their full size; the others only exist at the sizes listed.
struct Scheme {
    name: &'static str,
    kind: SchemeKind,
    classes: &'static [&'static [&'static str]],
}

const SCHEMES: &[Scheme] = &[
    Scheme {
        name: "Set3",
        kind: SchemeKind::Qualitative,
        classes: &[&[
            "#8dd3c7", "#ffffb3", "#bebada", "#fb8072", "#80b1d3", "#fdb462",
            "#b3de69", "#fccde5", "#d9d9d9", "#bc80bd", "#ccebc5", "#ffed6f",
        ]],
    },
    Scheme {
        name: "Set1",
        kind: SchemeKind::Qualitative,
        classes: &[&[
            "#e41a1c", "#377eb8", "#4daf4a", "#984ea3", "#ff7f00", "#ffff33",
            "#a65628", "#f781bf", "#999999",
        ]],
    },
    Scheme {
        name: "Category10",
        kind: SchemeKind::Qualitative,
        classes: &[&[
            "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
            "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
        ]],
    },
    Scheme {
        name: "RdYlGn",
        kind: SchemeKind::Diverging,
        classes: &[
            &["#fc8d59", "#ffffbf", "#91cf60"],
            &["#d7191c", "#fdae61", "#a6d96a", "#1a9641"],
            &["#d7191c", "#fdae61", "#ffffbf", "#a6d96a", "#1a9641"],
            &["#d73027", "#fc8d59", "#fee08b", "#d9ef8b", "#91cf60", "#1a9850"],
            &["#d73027", "#fc8d59", "#fee08b", "#ffffbf", "#d9ef8b", "#91cf60", "#1a9850"],
            &[
                "#d73027", "#f46d43", "#fdae61", "#fee08b", "#d9ef8b", "#a6d96a",
                "#66bd63", "#1a9850",
            ],
            &[
                "#d73027", "#f46d43", "#fdae61", "#fee08b", "#ffffbf", "#d9ef8b",
                "#a6d96a", "#66bd63", "#1a9850",
            ],
        ],
    },
    Scheme {
        name: "Blues",
        kind: SchemeKind::Sequential,
        classes: &[
            &["#deebf7", "#9ecae1", "#3182bd"],
            &["#eff3ff", "#bdd7e7", "#6baed6", "#2171b5"],
            &["#eff3ff", "#bdd7e7", "#6baed6", "#3182bd", "#08519c"],
            &["#eff3ff", "#c6dbef", "#9ecae1", "#6baed6", "#3182bd", "#08519c"],
            &["#eff3ff", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#084594"],
        ],
    },
];

const MIN_CLASSES: usize = 3;

impl Scheme {
    fn at_size(&self, size: usize) -> Option<&'static [&'static str]> {
        if size < MIN_CLASSES {
            return None;
        }
        match self.kind {
            SchemeKind::Qualitative => {
                let full = self.classes[0];
                (size <= full.len()).then(|| &full[..size])
            }
            _ => self.classes.iter().copied().find(|c| c.len() == size),
        }
    }
}

/// Look up a named color range of a given length.
pub fn get_color_range(size: usize, name: &str) -> Option<Vec<String>> {
    SCHEMES
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
        .and_then(|s| s.at_size(size))
        .map(|colors| colors.iter().map(|c| c.to_string()).collect())
}

/// A named range offered for a given length.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRange {
    pub name: String,
    pub kind: SchemeKind,
    pub colors: Vec<String>,
}

/// All ranges available at `size`, grouped by scheme kind.
pub fn ranges_of_size(size: usize, reverse: bool) -> IndexMap<SchemeKind, Vec<ColorRange>> {
    let mut by_kind: IndexMap<SchemeKind, Vec<ColorRange>> = IndexMap::new();
    for scheme in SCHEMES {
        if let Some(colors) = scheme.at_size(size) {
            let mut colors: Vec<String> = colors.iter().map(|c| c.to_string()).collect();
            if reverse {
                colors.reverse();
            }
            by_kind.entry(scheme.kind).or_default().push(ColorRange {
                name: scheme.name.to_string(),
                kind: scheme.kind,
                colors,
            });
        }
    }
    by_kind.sort_keys();
    by_kind
}

/// Every length some scheme is offered at, ascending.
pub fn available_sizes() -> Vec<usize> {
    let max = SCHEMES
        .iter()
        .flat_map(|s| s.classes.iter().map(|c| c.len()))
        .max()
        .unwrap_or(MIN_CLASSES);
    (MIN_CLASSES..=max)
        .filter(|&n| SCHEMES.iter().any(|s| s.at_size(n).is_some()))
        .collect()
}

/// Palette used for new graphs and for any reset back to palette coloring.
pub fn default_palette() -> Vec<String> {
    get_color_range(12, "Set3").unwrap_or_default()
}

/// Range used when a color scale is first created.
pub fn default_scale_range() -> Vec<String> {
    get_color_range(7, "RdYlGn").unwrap_or_default()
}

/// Color palette for categorical data
pub struct ColorPalette {
    colors: Vec<String>,
}

impl ColorPalette {
    pub fn new(colors: Vec<String>) -> Self {
        ColorPalette { colors }
    }

    /// Get color for a specific index (wraps around if index > palette size)
    pub fn get_color(&self, index: usize) -> String {
        self.colors[index % self.colors.len()].clone()
    }

    /// Assign colors to a list of keys, in key order.
    pub fn assign_colors(&self, keys: &[String]) -> IndexMap<String, String> {
        keys.iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), self.get_color(i)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_palette() {
        let palette = default_palette();
        assert_eq!(palette.len(), 12);
        assert_eq!(palette[0], "#8dd3c7");
        assert_eq!(palette[11], "#ffed6f");
    }

    #[test]
    fn test_default_scale_range() {
        let range = default_scale_range();
        assert_eq!(range.len(), 7);
        assert_eq!(range[0], "#d73027");
        assert_eq!(range[6], "#1a9850");
    }

    #[test]
    fn test_qualitative_prefix() {
        let set3 = get_color_range(11, "Set3").unwrap();
        assert_eq!(set3.len(), 11);
        assert_eq!(set3[..], default_palette()[..11]);
        assert!(get_color_range(13, "Set3").is_none());
        assert!(get_color_range(2, "Set3").is_none());
    }

    #[test]
    fn test_diverging_fixed_sizes() {
        assert_eq!(get_color_range(5, "rdylgn").unwrap()[0], "#d7191c");
        assert!(get_color_range(10, "RdYlGn").is_none());
        assert!(get_color_range(5, "Nope").is_none());
    }

    #[test]
    fn test_ranges_of_size_grouped_and_reversed() {
        let ranges = ranges_of_size(7, true);
        let kinds: Vec<SchemeKind> = ranges.keys().copied().collect();
        assert_eq!(
            kinds,
            vec![SchemeKind::Diverging, SchemeKind::Qualitative, SchemeKind::Sequential]
        );
        let rdylgn = &ranges[&SchemeKind::Diverging][0];
        assert_eq!(rdylgn.colors[0], "#1a9850");
    }

    #[test]
    fn test_available_sizes() {
        let sizes = available_sizes();
        assert_eq!(sizes.first(), Some(&3));
        assert_eq!(sizes.last(), Some(&12));
    }

    #[test]
    fn test_color_palette_wraps() {
        let palette = ColorPalette::new(vec!["red".into(), "blue".into()]);
        assert_eq!(palette.get_color(0), "red");
        assert_eq!(palette.get_color(3), "blue");

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let colors = palette.assign_colors(&keys);
        assert_eq!(colors["c"], "red");
        assert_eq!(colors.len(), 3);
    }
}
