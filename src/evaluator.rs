// Mapping evaluator
// Walks a compiled mapping against a document and builds the output tree

use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

use crate::ast::{Entry, EntryValue, Leaf, MappingNode, Path, Segment};
use crate::compiler::CompiledMapping;
use crate::options::MapperOptions;
use crate::transpose::transpose;
use crate::utils::push_or_merge;
use crate::value::JValue;

/// Evaluator errors
///
/// A missing field or a `*` over something that is not a list is never an
/// error: it reads as absent and the surrounding key is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluatorError {
    #[error("List field '{field}' has {found} items but '{reference}' has {expected}")]
    RaggedTranspose {
        field: String,
        reference: String,
        expected: usize,
        found: usize,
    },
}

/// Resolve `path` against `data`.
///
/// Returns `None` as soon as a field is missing or null, or when a `*` meets
/// something that is not a list. A `*` resolves the nested path against every
/// element (element misses become `null` so parallel lists stay aligned) and
/// ends the walk. Nested `*` levels always merge their lists; `merge` decides
/// whether those lists are spliced into this level's result or kept as items.
pub fn resolve_path(data: &JValue, path: &Path, merge: bool) -> Option<JValue> {
    let mut current = data;
    for segment in &path.segments {
        match segment {
            Segment::Field(name) => match current.field(name) {
                Some(next) => current = next,
                None => {
                    trace!(field = %name, "field missing");
                    return None;
                }
            },
            Segment::FanOut(inner) => {
                let items = match current.as_array() {
                    Some(items) => items,
                    None => {
                        trace!(found = current.type_name(), "fan-out over a non-list");
                        return None;
                    }
                };
                let mut out = Vec::with_capacity(items.len());
                for item in items.iter() {
                    let value = resolve_path(item, inner, true).unwrap_or(JValue::Null);
                    push_or_merge(&mut out, value, merge);
                }
                return Some(JValue::array(out));
            }
        }
    }
    Some(current.clone())
}

/// Evaluator for compiled mappings
pub struct Evaluator {
    options: MapperOptions,
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            options: MapperOptions::default(),
        }
    }

    pub fn with_options(options: MapperOptions) -> Self {
        Evaluator { options }
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    /// Evaluate a mapping against a document.
    ///
    /// `Ok(None)` means nothing resolved: the spec was a missing path, or a
    /// record whose every key was dropped.
    pub fn evaluate(
        &self,
        mapping: &CompiledMapping,
        document: &JValue,
    ) -> Result<Option<JValue>, EvaluatorError> {
        self.evaluate_node(mapping.root(), document, true)
    }

    fn evaluate_node(
        &self,
        node: &MappingNode,
        data: &JValue,
        merge: bool,
    ) -> Result<Option<JValue>, EvaluatorError> {
        match node {
            MappingNode::Leaf(leaf) => Ok(evaluate_leaf(leaf, data, merge)),
            MappingNode::Record(entries) => {
                Ok(self.evaluate_record(entries, data, merge)?.map(JValue::object))
            }
        }
    }

    /// Evaluate record entries in order, dropping keys that resolve to nothing.
    /// An empty result collapses to `None`.
    fn evaluate_record(
        &self,
        entries: &[Entry],
        data: &JValue,
        merge: bool,
    ) -> Result<Option<IndexMap<String, JValue>>, EvaluatorError> {
        let mut out = IndexMap::with_capacity(entries.len());
        for entry in entries {
            match &entry.value {
                // Always yields a list, possibly empty
                EntryValue::Records(records) => {
                    let rows = self.concat_records(records, data)?;
                    out.insert(entry.key.clone(), JValue::array(rows));
                }
                EntryValue::Node(node) => {
                    if let Some(value) = self.evaluate_node(node, data, merge)? {
                        out.insert(entry.key.clone(), value);
                    }
                }
            }
        }
        Ok(if out.is_empty() { None } else { Some(out) })
    }

    fn concat_records(
        &self,
        records: &[Vec<Entry>],
        data: &JValue,
    ) -> Result<Vec<JValue>, EvaluatorError> {
        let mut rows = Vec::new();
        for entries in records {
            rows.extend(self.transpose_entries(entries, data)?);
        }
        Ok(rows)
    }

    /// Build the field record with merging off, then transpose it.
    fn transpose_entries(&self, entries: &[Entry], data: &JValue) -> Result<Vec<JValue>, EvaluatorError> {
        match self.evaluate_record(entries, data, false)? {
            Some(fields) => transpose(&fields, &self.options.transpose()),
            None => Ok(Vec::new()),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn evaluate_leaf(leaf: &Leaf, data: &JValue, merge: bool) -> Option<JValue> {
    match leaf {
        Leaf::Literal(text) => Some(JValue::String(text.clone())),
        Leaf::Lookup(path) => resolve_path(data, path, merge),
    }
}
