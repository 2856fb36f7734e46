//! Mapping compiler: lowers a spec given as a generic `JValue` tree into the
//! closed `MappingNode` AST.
//!
//! Compilation is a single recursive traversal. String leaves are parsed once
//! and identical path strings share one `Rc<Path>`, so evaluation never splits
//! a string. Shape errors are reported here, with the location of the
//! offending node, and never during evaluation.

use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::ast::{Entry, Leaf, MappingNode, Path};
use crate::options::MapperOptions;
use crate::parser::{self, ParserError};
use crate::value::JValue;

/// Spec shape errors. `at` is a slash-separated location, `/` for the root.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Invalid leaf at '{at}': expected a path string, found {found}")]
    InvalidLeaf { at: String, found: &'static str },

    #[error("Empty path at '{at}'")]
    EmptyPath { at: String },

    #[error("Invalid array mapping at '{at}': expected an object or a list of objects, found {found}")]
    InvalidArrayMapping { at: String, found: &'static str },

    #[error("Unexpected list at '{at}': lists are only allowed under keys ending in '.*'")]
    UnexpectedList { at: String },

    #[error("Mapping nests deeper than {limit} levels at '{at}'")]
    TooDeep { at: String, limit: usize },
}

/// A mapping spec ready for evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledMapping {
    root: MappingNode,
    path_count: usize,
}

impl CompiledMapping {
    pub fn root(&self) -> &MappingNode {
        &self.root
    }

    /// Number of distinct path strings in the spec.
    pub fn path_count(&self) -> usize {
        self.path_count
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

impl TryFrom<&JValue> for CompiledMapping {
    type Error = CompileError;

    fn try_from(spec: &JValue) -> Result<Self, Self::Error> {
        compile(spec, &MapperOptions::default())
    }
}

impl FromStr for CompiledMapping {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = JValue::from_json_str(s)?;
        Ok(compile(&spec, &MapperOptions::default())?)
    }
}

/// Compile a spec tree.
///
/// The root may be a string leaf or an object; a list is only valid as the
/// value of a `.*` key.
pub fn compile(spec: &JValue, options: &MapperOptions) -> Result<CompiledMapping, CompileError> {
    let mut compiler = MappingCompiler::new(options);
    let root = compiler.compile_node(spec, 1)?;
    debug!(
        paths = compiler.paths.len(),
        depth = root.depth(),
        "compiled mapping"
    );
    Ok(CompiledMapping {
        root,
        path_count: compiler.paths.len(),
    })
}

// ---------------------------------------------------------------------------
// Compiler state
// ---------------------------------------------------------------------------

struct MappingCompiler<'a> {
    options: &'a MapperOptions,
    /// Interned lookup paths, keyed by the leaf string they came from.
    paths: HashMap<String, Rc<Path>>,
    /// Keys and list indices from the root to the node being compiled.
    trail: Vec<String>,
}

impl<'a> MappingCompiler<'a> {
    fn new(options: &'a MapperOptions) -> Self {
        MappingCompiler {
            options,
            paths: HashMap::new(),
            trail: Vec::new(),
        }
    }

    fn location(&self) -> String {
        format!("/{}", self.trail.join("/"))
    }

    fn check_depth(&self, depth: usize) -> Result<(), CompileError> {
        if depth > self.options.max_depth {
            return Err(CompileError::TooDeep {
                at: self.location(),
                limit: self.options.max_depth,
            });
        }
        Ok(())
    }

    fn compile_node(&mut self, spec: &JValue, depth: usize) -> Result<MappingNode, CompileError> {
        self.check_depth(depth)?;
        match spec {
            JValue::String(text) => self.compile_leaf(text, depth),
            JValue::Object(map) => Ok(MappingNode::Record(self.compile_entries(map, depth + 1)?)),
            JValue::Array(_) => Err(CompileError::UnexpectedList {
                at: self.location(),
            }),
            other => Err(CompileError::InvalidLeaf {
                at: self.location(),
                found: other.type_name(),
            }),
        }
    }

    /// Each `*` of a lookup counts as one more level below `depth`.
    fn compile_leaf(&mut self, text: &str, depth: usize) -> Result<MappingNode, CompileError> {
        if let Some(path) = self.paths.get(text) {
            let path = path.clone();
            self.check_depth(depth + path.fan_out_depth())?;
            return Ok(MappingNode::Leaf(Leaf::Lookup(path)));
        }
        let max_fan_out = self.options.max_depth.saturating_sub(depth);
        let leaf = match parser::parse_leaf_within(text, max_fan_out) {
            Ok(leaf) => leaf,
            Err(ParserError::EmptyPath) => {
                return Err(CompileError::EmptyPath {
                    at: self.location(),
                });
            }
            Err(ParserError::TooDeep { .. }) => {
                return Err(CompileError::TooDeep {
                    at: self.location(),
                    limit: self.options.max_depth,
                });
            }
        };
        if let Leaf::Lookup(path) = &leaf {
            self.paths.insert(text.to_string(), path.clone());
        }
        Ok(MappingNode::Leaf(leaf))
    }

    fn compile_entries(
        &mut self,
        map: &IndexMap<String, JValue>,
        depth: usize,
    ) -> Result<Vec<Entry>, CompileError> {
        let mut entries = Vec::with_capacity(map.len());
        for (raw_key, value) in map {
            self.trail.push(raw_key.clone());
            let (key, is_array) = parser::split_array_key(raw_key);
            let entry = if is_array {
                Entry::records(key, self.compile_array(value, depth)?)
            } else {
                Entry::value(key, self.compile_node(value, depth)?)
            };
            self.trail.pop();
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Value of a `.*` key: one record, or a list of records.
    fn compile_array(&mut self, spec: &JValue, depth: usize) -> Result<Vec<Vec<Entry>>, CompileError> {
        self.check_depth(depth)?;
        match spec {
            JValue::Object(map) => Ok(vec![self.compile_entries(map, depth + 1)?]),
            JValue::Array(items) => {
                let mut records = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    self.trail.push(index.to_string());
                    let map = match item {
                        JValue::Object(map) => map,
                        other => {
                            return Err(CompileError::InvalidArrayMapping {
                                at: self.location(),
                                found: other.type_name(),
                            });
                        }
                    };
                    records.push(self.compile_entries(map, depth + 1)?);
                    self.trail.pop();
                }
                Ok(records)
            }
            other => Err(CompileError::InvalidArrayMapping {
                at: self.location(),
                found: other.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EntryValue, Segment};
    use crate::options::DEFAULT_MAX_DEPTH;
    use serde_json::json;

    fn compile_json(spec: serde_json::Value) -> Result<CompiledMapping, CompileError> {
        compile(&JValue::from(spec), &MapperOptions::default())
    }

    #[test]
    fn test_compile_record() {
        let mapping = compile_json(json!({"my_id": "id", "fixed": "#x"})).unwrap();
        match mapping.root() {
            MappingNode::Record(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].key, "my_id");
                assert!(!entries[0].is_array());
                assert_eq!(entries[1].value, EntryValue::Node(MappingNode::literal("x")));
            }
            other => panic!("expected record, got {:?}", other),
        }
        assert_eq!(mapping.path_count(), 1);
        assert_eq!(mapping.depth(), 2);
    }

    #[test]
    fn test_compile_bare_leaf() {
        let mapping = compile_json(json!("a.*.b")).unwrap();
        assert_eq!(
            mapping.root(),
            &MappingNode::lookup(Path::new(vec![
                Segment::Field("a".to_string()),
                Segment::FanOut(Path::new(vec![Segment::Field("b".to_string())])),
            ]))
        );
    }

    #[test]
    fn test_array_keys_are_stripped() {
        let mapping = compile_json(json!({
            "items.*": {"id": "nested.*.id"},
            "merged.*": [{"id": "a.*.id"}, {"id": "b.*.id"}]
        }))
        .unwrap();
        match mapping.root() {
            MappingNode::Record(entries) => {
                assert_eq!(entries[0].key, "items");
                assert!(matches!(&entries[0].value, EntryValue::Records(r) if r.len() == 1));
                assert_eq!(entries[1].key, "merged");
                assert!(matches!(&entries[1].value, EntryValue::Records(r) if r.len() == 2));
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_identical_paths_are_shared() {
        let mapping = compile_json(json!({
            "a": "nested.*.id",
            "b": {"c": "nested.*.id"},
            "d": "other"
        }))
        .unwrap();
        assert_eq!(mapping.path_count(), 2);

        let entries = match mapping.root() {
            MappingNode::Record(entries) => entries,
            other => panic!("expected record, got {:?}", other),
        };
        let first = match &entries[0].value {
            EntryValue::Node(MappingNode::Leaf(Leaf::Lookup(path))) => path.clone(),
            other => panic!("expected lookup, got {:?}", other),
        };
        let second = match &entries[1].value {
            EntryValue::Node(MappingNode::Record(inner)) => match &inner[0].value {
                EntryValue::Node(MappingNode::Leaf(Leaf::Lookup(path))) => path.clone(),
                other => panic!("expected lookup, got {:?}", other),
            },
            other => panic!("expected record, got {:?}", other),
        };
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_literals_not_counted_as_paths() {
        let mapping = compile_json(json!({"a": "#x", "b": "#x", "c": "##x"})).unwrap();
        assert_eq!(mapping.path_count(), 1);
    }

    #[test]
    fn test_rejects_non_string_leaf() {
        assert_eq!(
            compile_json(json!({"a": {"b": 5}})),
            Err(CompileError::InvalidLeaf {
                at: "/a/b".to_string(),
                found: "number",
            })
        );
        assert!(matches!(
            compile_json(json!({"a": null})),
            Err(CompileError::InvalidLeaf { found: "null", .. })
        ));
        assert!(matches!(
            compile_json(json!(true)),
            Err(CompileError::InvalidLeaf { found: "boolean", .. })
        ));
    }

    #[test]
    fn test_rejects_empty_path() {
        assert_eq!(
            compile_json(json!({"a": ""})),
            Err(CompileError::EmptyPath {
                at: "/a".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_list_outside_array_key() {
        assert_eq!(
            compile_json(json!({"a": [{"id": "id"}]})),
            Err(CompileError::UnexpectedList {
                at: "/a".to_string()
            })
        );
        assert_eq!(
            compile_json(json!([{"id": "id"}])),
            Err(CompileError::UnexpectedList { at: "/".to_string() })
        );
    }

    #[test]
    fn test_rejects_bad_array_value() {
        assert_eq!(
            compile_json(json!({"items.*": "nested.*.id"})),
            Err(CompileError::InvalidArrayMapping {
                at: "/items.*".to_string(),
                found: "string",
            })
        );
        assert_eq!(
            compile_json(json!({"items.*": [{"id": "a.*.id"}, "b.*.id"]})),
            Err(CompileError::InvalidArrayMapping {
                at: "/items.*/1".to_string(),
                found: "string",
            })
        );
    }

    #[test]
    fn test_depth_limit() {
        let options = MapperOptions::new().with_max_depth(3);
        let spec = JValue::from(json!({"a": {"b": "x"}}));
        assert!(compile(&spec, &options).is_ok());

        let spec = JValue::from(json!({"a": {"b": {"c": "x"}}}));
        assert!(matches!(
            compile(&spec, &options),
            Err(CompileError::TooDeep { limit: 3, .. })
        ));

        // Fan-out levels count as well
        let spec = JValue::from(json!({"a": {"b": "x.*.y"}}));
        assert_eq!(
            compile(&spec, &options),
            Err(CompileError::TooDeep {
                at: "/a/b".to_string(),
                limit: 3
            })
        );
    }

    #[test]
    fn test_wildcard_flood_is_too_deep() {
        let spec = JValue::from(json!({"a": vec!["*"; 10_000].join(".")}));
        assert_eq!(
            compile(&spec, &MapperOptions::default()),
            Err(CompileError::TooDeep {
                at: "/a".to_string(),
                limit: DEFAULT_MAX_DEPTH
            })
        );

        // The same path string is checked again at a deeper position
        let options = MapperOptions::new().with_max_depth(4);
        let spec = JValue::from(json!({"a": "x.*.*", "b": {"c": "x.*.*"}}));
        assert!(matches!(
            compile(&spec, &options),
            Err(CompileError::TooDeep { ref at, limit: 4 }) if at == "/b/c"
        ));
    }

    #[test]
    fn test_from_str() {
        let mapping: CompiledMapping = r#"{"my_id": "id"}"#.parse().unwrap();
        assert_eq!(mapping.path_count(), 1);
        assert!("{not json".parse::<CompiledMapping>().is_err());
        assert!(matches!(
            r#"{"a": 1}"#.parse::<CompiledMapping>(),
            Err(crate::Error::Compile(CompileError::InvalidLeaf { .. }))
        ));
    }
}
