use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::state::EditorState;
use crate::error::Result;
use crate::series::ViewDatum;

/// The persisted `{ state, viewData }` blob for one editor instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub state: EditorState,
    pub view_data: Vec<ViewDatum>,
}

impl Envelope {
    /// Parse a persisted envelope. Absent or unparseable input gives the
    /// defaults; individual bad fields fall back on their own.
    ///
    /// A top-level object without a `state` key is read as a bare state.
    pub fn load(value: Option<&str>) -> Self {
        let Some(text) = value.filter(|t| !t.trim().is_empty()) else {
            return Envelope::default();
        };
        let parsed: JsonValue = match serde_json::from_str(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "persisted editor value is not JSON, using defaults");
                return Envelope::default();
            }
        };
        let Some(root) = parsed.as_object() else {
            warn!("persisted editor value is not an object, using defaults");
            return Envelope::default();
        };

        let state = match root.get("state").and_then(JsonValue::as_object) {
            Some(state) => EditorState::from_json(state),
            None => EditorState::from_json(root),
        };
        let view_data = match root.get("viewData") {
            Some(data) => serde_json::from_value(data.clone()).unwrap_or_else(|e| {
                warn!(error = %e, "could not decode persisted view data");
                Vec::new()
            }),
            None => Vec::new(),
        };
        Envelope { state, view_data }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Receives every envelope the editor decides to persist.
pub trait EnvelopeSink {
    fn save(&mut self, envelope: &str) -> Result<()>;
}

impl<S: EnvelopeSink + ?Sized> EnvelopeSink for Box<S> {
    fn save(&mut self, envelope: &str) -> Result<()> {
        (**self).save(envelope)
    }
}

/// Keeps every saved envelope in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub saved: Vec<String>,
}

impl EnvelopeSink for MemorySink {
    fn save(&mut self, envelope: &str) -> Result<()> {
        self.saved.push(envelope.to_string());
        Ok(())
    }
}

/// Overwrites a file with the latest envelope.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into() }
    }
}

impl EnvelopeSink for FileSink {
    fn save(&mut self, envelope: &str) -> Result<()> {
        fs::write(&self.path, envelope)?;
        Ok(())
    }
}

/// Discards envelopes.
#[derive(Debug, Default)]
pub struct NullSink;

impl EnvelopeSink for NullSink {
    fn save(&mut self, _envelope: &str) -> Result<()> {
        Ok(())
    }
}

/// Remembers the last persisted envelope so unchanged frames are not saved.
#[derive(Debug, Default)]
pub struct SaveTracker {
    last: Option<Envelope>,
}

impl SaveTracker {
    pub fn new(last: Option<Envelope>) -> Self {
        SaveTracker { last }
    }

    /// True when there is derived data and either half of the envelope
    /// differs from what was last persisted.
    pub fn ok_to_save(&self, state: &EditorState, view_data: &[ViewDatum]) -> bool {
        if view_data.is_empty() {
            return false;
        }
        match &self.last {
            None => true,
            Some(last) => last.state != *state || last.view_data != view_data,
        }
    }

    /// Save through `sink` if needed. Returns whether a save happened.
    pub fn persist<S: EnvelopeSink>(
        &mut self,
        state: &EditorState,
        view_data: Vec<ViewDatum>,
        sink: &mut S,
    ) -> Result<bool> {
        if !self.ok_to_save(state, &view_data) {
            debug!("envelope unchanged, skipping save");
            return Ok(false);
        }
        let envelope = Envelope {
            state: state.clone(),
            view_data,
        };
        sink.save(&envelope.to_json()?)?;
        debug!(rows = envelope.view_data.len(), "saved envelope");
        self.last = Some(envelope);
        Ok(true)
    }

    pub fn last(&self) -> Option<&Envelope> {
        self.last.as_ref()
    }
}
