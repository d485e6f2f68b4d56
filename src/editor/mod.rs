// Graph editor: state, reducer and the save-on-change loop

pub mod persist;
pub mod reducer;
pub mod state;

pub use persist::{Envelope, EnvelopeSink, FileSink, MemorySink, NullSink, SaveTracker};
pub use reducer::{reduce, Action};
pub use state::{EditorState, Filter, GraphOption, GraphType};

use tracing::debug;

use crate::error::Result;
use crate::render::RenderConfig;
use crate::series::{build_series, SeriesBundle};
use crate::value::Row;

/// Everything one render of the editor produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub config: RenderConfig,
    pub domain: Vec<f64>,
    pub saved: bool,
}

/// Hosts the state machine. Actions are applied one at a time; each
/// produces a whole new snapshot before the next is looked at.
pub struct Editor<S: EnvelopeSink> {
    state: EditorState,
    tracker: SaveTracker,
    sink: S,
}

impl<S: EnvelopeSink> Editor<S> {
    /// Start from a persisted envelope, or from defaults if there is none.
    pub fn new(value: Option<&str>, sink: S) -> Self {
        let envelope = Envelope::load(value);
        let tracker = if envelope.view_data.is_empty() {
            SaveTracker::default()
        } else {
            SaveTracker::new(Some(envelope.clone()))
        };
        Editor {
            state: envelope.state,
            tracker,
            sink,
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Apply an action. A rejected action leaves the state as it was.
    pub fn dispatch(&mut self, action: Action) -> Result<()> {
        self.state = reduce(&self.state, action)?;
        Ok(())
    }

    /// Series for the current selection over `rows`.
    pub fn series(&self, rows: &[Row]) -> Result<SeriesBundle> {
        let state = &self.state;
        build_series(
            state.active_graph_type,
            rows,
            state.x_axis_column.as_ref(),
            &state.y_axis_columns,
            &state.graph_format.colors,
        )
    }

    /// Recompute everything derived from the state and `rows`, then save
    /// the envelope if it differs from the last one persisted.
    ///
    /// `rows` is whatever the data binding has delivered so far; an empty
    /// slice renders an empty graph and never triggers a save.
    pub fn render(&mut self, rows: &[Row]) -> Result<Frame> {
        let bundle = self.series(rows)?;
        let view_data = bundle.output.view_data();
        let saved = self.tracker.persist(&self.state, view_data, &mut self.sink)?;
        debug!(rows = rows.len(), saved, "rendered frame");

        Ok(Frame {
            config: RenderConfig::new(self.state.active_graph_type, &self.state.graph_format, bundle.output),
            domain: bundle.domain,
            saved,
        })
    }

    pub fn last_saved(&self) -> Option<&Envelope> {
        self.tracker.last()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
