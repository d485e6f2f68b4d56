// Configuration handed to a chart renderer: the series plus resolved
// presentation settings.

use serde::Serialize;

use crate::editor::GraphType;
use crate::format::{GraphFormat, Margin, Width};
use crate::series::{BarRecord, LineSeries, SeriesOutput};

/// Used when a record carries no color for a key.
pub const FALLBACK_COLOR: &str = "#000";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisBottom {
    pub label: String,
    pub rotate_labels: bool,
    pub tick_density: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisLeft {
    pub label: String,
    pub show_grid_lines: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderConfig {
    pub graph_type: GraphType,
    pub title: String,
    pub description: String,
    pub height: u32,
    pub width: Width,
    pub margin: Margin,
    pub axis_bottom: AxisBottom,
    pub axis_left: AxisLeft,
    pub series: SeriesOutput,
}

impl RenderConfig {
    pub fn new(graph_type: GraphType, format: &GraphFormat, series: SeriesOutput) -> Self {
        RenderConfig {
            graph_type,
            title: format.title.clone(),
            description: format.description.clone(),
            height: format.height,
            width: format.width,
            margin: format.margin,
            axis_bottom: AxisBottom {
                label: format.x_axis.label.clone(),
                rotate_labels: format.x_axis.rotate_labels,
                tick_density: format.x_axis.tick_density,
            },
            axis_left: AxisLeft {
                label: format.y_axis.label.clone(),
                show_grid_lines: format.y_axis.show_grid_lines,
            },
            series,
        }
    }

    /// Pixel size of the drawing area once `"full"` is resolved.
    pub fn size(&self, available_width: u32) -> (u32, u32) {
        (self.width.resolve(available_width), self.height)
    }

    /// Number of x-axis labels to draw for `slots` categories in
    /// `plot_width` pixels: one label per `tick_density * 50` pixels.
    pub fn label_count(&self, slots: usize, plot_width: u32) -> usize {
        let spacing = (self.axis_bottom.tick_density.max(0.1) * 50.0) as u32;
        let fit = (plot_width / spacing.max(1)).max(1) as usize;
        slots.min(fit)
    }
}

pub fn bar_color<'a>(record: &'a BarRecord, key: &str) -> &'a str {
    record.color(key).unwrap_or(FALLBACK_COLOR)
}

pub fn line_color(series: &LineSeries) -> &str {
    if series.color.is_empty() {
        FALLBACK_COLOR
    } else {
        &series.color
    }
}
