use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde_json::Value as JsonValue;
use std::fs;
use std::io::{self, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

use graphcomp::binding::{BindingConfig, DataBinding, DataRequest, MemoryStore, Source, SourceMetadata, View};
use graphcomp::color::ColorPolicyKind;
use graphcomp::columns::{AggMethod, XAxisColumn, XAxisUpdate, YAxisColumn};
use graphcomp::config::{Args, OutputKind};
use graphcomp::csv_reader::{self, CsvData};
use graphcomp::editor::{Action, Editor, EnvelopeSink, FileSink, NullSink};
use graphcomp::format::{color_type_edits, scale_type_edits, Edit};
use graphcomp::{graph, palette};

const STDIN_SOURCE_ID: i64 = 1;
const STDIN_VIEW_ID: i64 = 1;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("graphcomp=info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Some(size) = args.list_schemes {
        return list_schemes(size);
    }

    let csv_data = csv_reader::read_csv_from_stdin().context("Failed to read CSV from stdin")?;
    let store = stdin_store(&csv_data, &args.binding());
    let binding = DataBinding::new(&store, args.binding());

    let persisted = match &args.state {
        Some(path) => Some(
            fs::read_to_string(path).with_context(|| format!("Failed to read state from {}", path.display()))?,
        ),
        None => None,
    };
    let sink: Box<dyn EnvelopeSink> = match &args.save {
        Some(path) => Box::new(FileSink::new(path)),
        None => Box::new(NullSink),
    };
    let mut editor = Editor::new(persisted.as_deref(), sink);

    let source = select_source(&mut editor, &binding)?;
    for action in selection_actions(&args, &csv_data, &source)? {
        dispatch(&mut editor, action)?;
    }
    // Edits are built against the state the selection left behind
    let edits = format_edits(&args, &editor)?;
    if !edits.is_empty() {
        dispatch(&mut editor, Action::EditGraphFormat(edits))?;
    }

    let rows = DataRequest::from_state(editor.state())
        .map(|request| binding.view_data(&request).rows)
        .unwrap_or_default();
    let frame = editor.render(&rows).context("Failed to build graph")?;
    info!(rows = rows.len(), saved = frame.saved, "built graph");

    let bytes = match args.output {
        OutputKind::Png => graph::render_png(&frame.config, args.width).context("Failed to generate graph")?,
        OutputKind::Json => {
            let mut json = serde_json::to_vec_pretty(&frame.config).context("Failed to serialize graph")?;
            json.push(b'\n');
            json
        }
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(&bytes)
        .context("Failed to write output to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

/// Publish the CSV as a single source with a single view.
fn stdin_store(csv_data: &CsvData, config: &BindingConfig) -> MemoryStore {
    let source = Source {
        source_id: STDIN_SOURCE_ID,
        name: "stdin".to_string(),
        metadata: SourceMetadata {
            columns: csv_data.infer_columns(),
        },
        categories: vec![vec![config.category.clone()]],
        kind: Some("csv".to_string()),
    };
    let view = View {
        view_id: STDIN_VIEW_ID,
        source_id: STDIN_SOURCE_ID,
        version: None,
        metadata: None,
    };
    MemoryStore::new().with_source(&config.pg_env, &source, vec![(view, csv_data.to_rows())])
}

/// Point the editor at the first offered source and its newest view,
/// keeping a persisted selection when it is still offered.
fn select_source<S: EnvelopeSink>(editor: &mut Editor<S>, binding: &DataBinding<'_, MemoryStore>) -> Result<Source> {
    let sources = binding.sources();
    let current = editor.state().active_source.as_ref().map(|s| s.source_id);
    let source = match sources.iter().find(|s| Some(s.source_id) == current) {
        Some(source) => source.clone(),
        None => {
            let first = sources
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("No source in category '{}'", binding.config().category))?;
            editor.dispatch(Action::SetActiveSource(Some(first.clone())))?;
            first
        }
    };

    let views = binding.views(source.source_id);
    let current = editor.state().active_view.as_ref().map(|v| v.view_id);
    if !views.iter().any(|v| Some(v.view_id) == current) {
        editor.dispatch(Action::SetActiveView(views.first().cloned()))?;
    }
    Ok(source)
}

fn dispatch<S: EnvelopeSink>(editor: &mut Editor<S>, action: Action) -> Result<()> {
    let name = action.name();
    editor
        .dispatch(action)
        .with_context(|| format!("Failed to apply {}", name))
}

/// Graph type, columns and filters from the command line, in dispatch order.
fn selection_actions(args: &Args, csv_data: &CsvData, source: &Source) -> Result<Vec<Action>> {
    let mut actions = Vec::new();

    if let Some(graph) = args.graph {
        actions.push(Action::SetActiveGraphType(graph.into()));
    }

    match &args.x_column {
        Some(x) => {
            let name = csv_data
                .resolve_column(csv_reader::parse_column_selector(x))
                .context("Failed to resolve X column")?;
            let column = match source.column(&name) {
                Some(meta) => XAxisColumn::from_meta(meta),
                None => XAxisColumn::new(name),
            };
            let column = match args.sort {
                Some(sort) => column.with_sort(sort.into()),
                None => column,
            };
            actions.push(Action::SetXAxisColumn(Some(column)));
        }
        None => {
            if let Some(sort) = args.sort {
                actions.push(Action::UpdateXAxisColumn(XAxisUpdate {
                    sort_method: Some(sort.into()),
                }));
            }
        }
    }

    if !args.y_columns.is_empty() {
        let mut columns = Vec::new();
        for (y, agg) in &args.y_columns {
            let name = csv_data
                .resolve_column(csv_reader::parse_column_selector(y))
                .context("Failed to resolve Y column")?;
            let mut column = match source.column(&name) {
                Some(meta) => YAxisColumn::from_meta(meta),
                None => YAxisColumn::new(name, AggMethod::Sum),
            };
            if let Some(agg) = agg {
                column.agg_method = *agg;
            }
            columns.push(column);
        }
        actions.push(Action::SetYAxisColumns(columns));
    }

    for filter in args.filter_list() {
        actions.push(Action::AddFilter(filter));
    }
    Ok(actions)
}

/// All presentation options as one batch, so paired edits land together.
fn format_edits<S: EnvelopeSink>(args: &Args, editor: &Editor<S>) -> Result<Vec<Edit>> {
    let current = &editor.state().graph_format;
    let mut edits = Vec::new();

    if let Some(title) = &args.title {
        edits.push(Edit::new(["title"], title.as_str()));
    }
    if let Some(label) = &args.x_label {
        edits.push(Edit::new(["xAxis", "label"], label.as_str()));
    }
    if let Some(label) = &args.y_label {
        edits.push(Edit::new(["yAxis", "label"], label.as_str()));
    }
    if args.rotate_labels {
        edits.push(Edit::new(["xAxis", "rotateLabels"], true));
    }
    if args.no_grid {
        edits.push(Edit::new(["yAxis", "showGridLines"], false));
    }
    if let Some(height) = args.height {
        edits.push(Edit::new(["height"], height));
    }

    let kind = match args.colors {
        Some(colors) => {
            let kind: ColorPolicyKind = colors.into();
            if kind != current.colors.kind() {
                edits.extend(color_type_edits(kind));
            }
            kind
        }
        None => current.colors.kind(),
    };
    if let Some(scale) = args.scale {
        edits.extend(scale_type_edits(scale.into()));
    }
    if let Some(name) = &args.scheme {
        // Without a size, take the longest form of the scheme
        let colors = match args.scheme_size {
            Some(size) => palette::get_color_range(size, name),
            None => palette::available_sizes()
                .into_iter()
                .rev()
                .find_map(|size| palette::get_color_range(size, name)),
        };
        let colors = colors.ok_or_else(|| {
            anyhow!(
                "No color range '{}' with {} colors (sizes offered: {:?})",
                name,
                args.scheme_size.map_or("any".to_string(), |n| n.to_string()),
                palette::available_sizes()
            )
        })?;
        let path: &[&str] = match kind {
            ColorPolicyKind::Palette => &["colors", "value"],
            ColorPolicyKind::Scale => &["colors", "value", "range"],
        };
        edits.push(Edit::new(path.iter().copied(), colors));
    }
    if let Some(domain) = &args.domain {
        edits.push(Edit::new(["colors", "value", "domain"], domain.clone()));
    }
    Ok(edits)
}

fn list_schemes(size: usize) -> Result<()> {
    let ranges = palette::ranges_of_size(size, false);
    let listing: serde_json::Map<String, JsonValue> = ranges
        .into_iter()
        .map(|(kind, ranges)| {
            let entries = ranges
                .into_iter()
                .map(|r| serde_json::json!({ "name": r.name, "colors": r.colors }))
                .collect();
            (kind.label().to_string(), JsonValue::Array(entries))
        })
        .collect();
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &listing).context("Failed to write scheme listing")?;
    writeln!(handle).context("Failed to write scheme listing")?;
    Ok(())
}
