// In-process key-path store laid out the way the data service publishes
// sources, views and rows.

use serde_json::{Map, Value as JsonValue};

use super::{as_reference, reference, DataClient, Segment, Source, View};
use crate::error::{GraphError, Result};
use crate::value::Row;

/// References followed while walking a single path.
const MAX_HOPS: usize = 16;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    root: Map<String, JsonValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Store `value` at `path`, creating intermediate objects.
    pub fn insert(&mut self, path: &[Segment], value: JsonValue) {
        insert_at(&mut self.root, path, value);
    }

    /// Publish a source with its views and each view's rows.
    pub fn with_source(mut self, pg_env: &str, source: &Source, views: Vec<(View, Vec<Row>)>) -> Self {
        let dama = |tail: &[Segment]| -> Vec<Segment> {
            let mut path = vec![Segment::key("dama"), Segment::key(pg_env)];
            path.extend_from_slice(tail);
            path
        };

        let sources_len = self.length_at(&dama(&[Segment::key("sources")]));
        let by_id = dama(&[Segment::key("sources"), Segment::key("byId"), Segment::from(source.source_id)]);
        self.insert(
            &dama(&[Segment::key("sources"), Segment::key("byIndex"), Segment::Index(sources_len)]),
            reference(&by_id),
        );
        self.insert(&dama(&[Segment::key("sources"), Segment::key("length")]), JsonValue::from(sources_len + 1));
        self.insert(
            &[by_id.as_slice(), &[Segment::key("attributes")]].concat(),
            serde_json::to_value(source).unwrap_or(JsonValue::Null),
        );

        let views_base = [by_id.as_slice(), &[Segment::key("views")]].concat();
        let mut view_count = self.length_at(&views_base);
        for (view, rows) in views {
            let view_id = dama(&[Segment::key("views"), Segment::key("byId"), Segment::from(view.view_id)]);
            self.insert(
                &[views_base.as_slice(), &[Segment::key("byIndex"), Segment::Index(view_count)]].concat(),
                reference(&view_id),
            );
            self.insert(
                &[view_id.as_slice(), &[Segment::key("attributes")]].concat(),
                serde_json::to_value(&view).unwrap_or(JsonValue::Null),
            );
            view_count += 1;

            let data = dama(&[Segment::key("viewsbyId"), Segment::from(view.view_id)]);
            self.insert(
                &[data.as_slice(), &[Segment::key("data"), Segment::key("length")]].concat(),
                JsonValue::from(rows.len()),
            );
            for (i, row) in rows.iter().enumerate() {
                let row_path = [data.as_slice(), &[Segment::key("databyId"), Segment::Index(i)]].concat();
                self.insert(
                    &[data.as_slice(), &[Segment::key("databyIndex"), Segment::Index(i)]].concat(),
                    reference(&row_path),
                );
                self.insert(&row_path, serde_json::to_value(row).unwrap_or(JsonValue::Null));
            }
        }
        self.insert(
            &[views_base.as_slice(), &[Segment::key("length")]].concat(),
            JsonValue::from(view_count),
        );
        self
    }

    fn length_at(&self, base: &[Segment]) -> usize {
        let path = [base, &[Segment::key("length")]].concat();
        self.lookup(&path)
            .ok()
            .flatten()
            .and_then(|v| v.as_u64())
            .map_or(0, |n| n as usize)
    }

    fn lookup(&self, path: &[Segment]) -> Result<Option<JsonValue>> {
        let mut pending = path.to_vec();
        for _ in 0..=MAX_HOPS {
            match self.step(&pending) {
                Step::Found(value) => return Ok(value.cloned()),
                Step::Redirect(target) => pending = target,
            }
        }
        Err(GraphError::Binding(format!(
            "too many references resolving {}",
            super::path_string(path)
        )))
    }

    /// Walk `path` until it ends or passes through a reference.
    fn step(&self, path: &[Segment]) -> Step<'_> {
        let mut node: Option<&JsonValue> = None;
        for (depth, segment) in path.iter().enumerate() {
            let next = match node {
                None => self.root.get(&segment.as_key()),
                Some(JsonValue::Object(map)) => map.get(&segment.as_key()),
                Some(JsonValue::Array(items)) => match segment {
                    Segment::Index(i) => items.get(*i),
                    Segment::Key(_) => None,
                },
                Some(_) => None,
            };
            let Some(next) = next else {
                return Step::Found(None);
            };
            // A reference in the middle of a path is followed
            if depth + 1 < path.len() {
                if let Some(mut target) = as_reference(next) {
                    target.extend_from_slice(&path[depth + 1..]);
                    return Step::Redirect(target);
                }
            }
            node = Some(next);
        }
        Step::Found(node)
    }
}

enum Step<'a> {
    Found(Option<&'a JsonValue>),
    Redirect(Vec<Segment>),
}

fn insert_at(map: &mut Map<String, JsonValue>, path: &[Segment], value: JsonValue) {
    match path {
        [] => {}
        [last] => {
            map.insert(last.as_key(), value);
        }
        [head, rest @ ..] => {
            let slot = map
                .entry(head.as_key())
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if !slot.is_object() {
                *slot = JsonValue::Object(Map::new());
            }
            if let JsonValue::Object(child) = slot {
                insert_at(child, rest, value);
            }
        }
    }
}

impl DataClient for MemoryStore {
    fn get(&self, path: &[Segment]) -> Result<Option<JsonValue>> {
        self.lookup(path)
    }
}
