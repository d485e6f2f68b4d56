use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::prelude::*;
use std::ops::Range;

use crate::render::{bar_color, line_color, RenderConfig};
use crate::series::SeriesOutput;
use crate::value::{GroupKey, Value};

/// Fraction of each category slot covered by its bar group.
const GROUP_WIDTH: f64 = 0.8;

/// Render a configuration to PNG bytes. `available_width` is used when the
/// format asks for the full width.
pub fn render_png(config: &RenderConfig, available_width: u32) -> Result<Vec<u8>> {
    let (width, height) = config.size(available_width);
    if width == 0 || height == 0 {
        anyhow::bail!("Cannot render a {}x{} graph", width, height);
    }

    let mut buffer = vec![0u8; (width * height * 3) as usize];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();

        root.fill(&WHITE).context("Failed to fill background")?;

        let slots = categories(&config.series);
        let labels: Vec<String> = slots.iter().map(Value::to_key_string).collect();
        let x_range = -0.5..(slots.len().max(1) as f64 - 0.5);
        let y_range = pad_range(value_extent(&config.series));

        let margin = config.margin;
        let mut chart = ChartBuilder::on(&root)
            .caption(&config.title, ("sans-serif", 20))
            .margin_top(margin.top)
            .margin_right(margin.right)
            .x_label_area_size(margin.bottom)
            .y_label_area_size(margin.left)
            .build_cartesian_2d(x_range, y_range)
            .context("Failed to build chart")?;

        let plot_width = width.saturating_sub(margin.left + margin.right);
        let label_style = if config.axis_bottom.rotate_labels {
            ("sans-serif", 12).into_font().transform(FontTransform::Rotate90)
        } else {
            ("sans-serif", 12).into_font()
        };
        let formatter = |x: &f64| slot_label(&labels, *x);

        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .x_labels(config.label_count(slots.len(), plot_width))
            .x_label_formatter(&formatter)
            .x_label_style(label_style)
            .x_desc(&config.axis_bottom.label)
            .y_desc(&config.axis_left.label);
        if !config.axis_left.show_grid_lines {
            mesh.disable_y_mesh();
        }
        mesh.draw().context("Failed to draw mesh")?;

        match &config.series {
            SeriesOutput::Bar { keys, data } => {
                let bar_width = GROUP_WIDTH / keys.len().max(1) as f64;
                for (i, record) in data.iter().enumerate() {
                    let left = i as f64 - GROUP_WIDTH / 2.0;
                    let bars = keys.iter().enumerate().filter_map(|(j, key)| {
                        let value = record.values.get(key).copied().flatten()?;
                        let x0 = left + j as f64 * bar_width;
                        let color = parse_color(bar_color(record, key));
                        Some(Rectangle::new([(x0, 0.0), (x0 + bar_width, value)], color.filled()))
                    });
                    chart.draw_series(bars).context("Failed to draw bars")?;
                }
            }
            SeriesOutput::Line { data } => {
                for series in data {
                    let color = parse_color(line_color(series));
                    let points: Vec<(f64, f64)> = series
                        .data
                        .iter()
                        .filter_map(|p| {
                            let slot = slots.iter().position(|s| s.group_key() == p.x.group_key())?;
                            Some((slot as f64, p.y?))
                        })
                        .collect();
                    chart
                        .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
                        .context("Failed to draw line series")?;
                    chart
                        .draw_series(points.into_iter().map(|p| Circle::new(p, 3, color.filled())))
                        .context("Failed to draw line points")?;
                }
            }
        }

        root.present().context("Failed to present drawing")?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

/// Distinct x values in first-seen order.
fn categories(series: &SeriesOutput) -> Vec<Value> {
    let mut seen: Vec<GroupKey> = Vec::new();
    let mut slots = Vec::new();
    let xs: Box<dyn Iterator<Item = &Value> + '_> = match series {
        SeriesOutput::Bar { data, .. } => Box::new(data.iter().map(|r| &r.index)),
        SeriesOutput::Line { data } => Box::new(data.iter().flat_map(|s| s.data.iter().map(|p| &p.x))),
    };
    for x in xs {
        let key = x.group_key();
        if !seen.contains(&key) {
            seen.push(key);
            slots.push(x.clone());
        }
    }
    slots
}

fn value_extent(series: &SeriesOutput) -> (f64, f64) {
    let values: Vec<f64> = match series {
        SeriesOutput::Bar { data, .. } => data
            .iter()
            .flat_map(|r| r.values.values().filter_map(|v| *v))
            .collect(),
        SeriesOutput::Line { data } => data
            .iter()
            .flat_map(|s| s.data.iter().filter_map(|p| p.y))
            .collect(),
    };
    // Bars grow from zero
    let min = values.iter().cloned().fold(0.0, f64::min);
    let max = values.iter().cloned().fold(0.0, f64::max);
    (min, max)
}

fn pad_range((min, max): (f64, f64)) -> Range<f64> {
    if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding)..(max + padding)
    }
}

fn slot_label(labels: &[String], x: f64) -> String {
    let slot = x.round();
    if (x - slot).abs() > 1e-6 || slot < 0.0 {
        return String::new();
    }
    labels.get(slot as usize).cloned().unwrap_or_default()
}

fn parse_color(color: &str) -> RGBColor {
    match csscolorparser::parse(color) {
        Ok(c) => {
            let channel = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;
            RGBColor(channel(c.r as f64), channel(c.g as f64), channel(c.b as f64))
        }
        Err(_) => BLACK,
    }
}
