use std::collections::HashSet;
use tracing::debug;

use super::state::{EditorState, Filter, GraphType};
use crate::binding::{Source, View};
use crate::color::ColorPolicy;
use crate::columns::{XAxisColumn, XAxisUpdate, YAxisColumn, YAxisUpdate};
use crate::error::{GraphError, Result};
use crate::format::{apply_edits, Edit};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetActiveSource(Option<Source>),
    SetActiveView(Option<View>),
    SetActiveGraphType(GraphType),
    SetXAxisColumn(Option<XAxisColumn>),
    UpdateXAxisColumn(XAxisUpdate),
    SetYAxisColumns(Vec<YAxisColumn>),
    UpdateYAxisColumn { name: String, update: YAxisUpdate },
    EditGraphFormat(Vec<Edit>),
    AddFilter(Filter),
    RemoveFilter { column: String },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetActiveSource(_) => "set-active-source",
            Action::SetActiveView(_) => "set-active-view",
            Action::SetActiveGraphType(_) => "set-active-graph-type",
            Action::SetXAxisColumn(_) => "set-x-axis-column",
            Action::UpdateXAxisColumn(_) => "update-x-axis-column",
            Action::SetYAxisColumns(_) => "set-y-axis-columns",
            Action::UpdateYAxisColumn { .. } => "update-y-axis-column",
            Action::EditGraphFormat(_) => "edit-graph-format",
            Action::AddFilter(_) => "add-filter",
            Action::RemoveFilter { .. } => "remove-filter",
        }
    }
}

/// Apply one action to a state, producing the next state.
///
/// The input state is never modified. A rejected action returns an error
/// and the caller keeps its current state.
pub fn reduce(state: &EditorState, action: Action) -> Result<EditorState> {
    debug!(action = action.name(), "editor transition");
    let mut next = state.clone();
    match action {
        Action::SetActiveSource(source) => {
            next.active_source = source;
            next.x_axis_column = None;
            next.y_axis_columns.clear();
            next.filters.clear();
        }
        Action::SetActiveView(view) => {
            next.active_view = view;
        }
        Action::SetActiveGraphType(graph_type) => {
            next.active_graph_type = graph_type;
            if !graph_type.supports_scale_colors() {
                next.graph_format.colors = ColorPolicy::default();
            }
        }
        Action::SetXAxisColumn(column) => {
            next.x_axis_column = column;
        }
        Action::UpdateXAxisColumn(update) => {
            if let Some(column) = next.x_axis_column.as_mut() {
                if let Some(sort_method) = update.sort_method {
                    column.sort_method = sort_method;
                }
            }
        }
        Action::SetYAxisColumns(columns) => {
            let mut seen = HashSet::new();
            if let Some(dup) = columns.iter().find(|c| !seen.insert(c.name.as_str())) {
                return Err(GraphError::DuplicateColumn(dup.name.clone()));
            }
            next.y_axis_columns = columns;
        }
        Action::UpdateYAxisColumn { name, update } => {
            for column in next.y_axis_columns.iter_mut().filter(|c| c.name == name) {
                if let Some(agg_method) = update.agg_method {
                    column.agg_method = agg_method;
                }
                if let Some(column_type) = &update.column_type {
                    column.column_type = column_type.clone();
                }
            }
        }
        Action::EditGraphFormat(edits) => {
            let format = apply_edits(&state.graph_format, &edits)?;
            if !state.active_graph_type.supports_scale_colors()
                && matches!(format.colors, ColorPolicy::Scale(_))
            {
                return Err(GraphError::ScaleNotSupported(state.active_graph_type));
            }
            next.graph_format = format;
        }
        Action::AddFilter(filter) => {
            match next.filters.iter_mut().find(|f| f.column == filter.column) {
                Some(existing) => *existing = filter,
                None => next.filters.push(filter),
            }
        }
        Action::RemoveFilter { column } => {
            next.filters.retain(|f| f.column != column);
        }
    }
    Ok(next)
}
