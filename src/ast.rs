// Compiled mapping tree
// Produced once by the compiler, walked by the evaluator

use std::fmt;
use std::rc::Rc;

use serde::Serialize;

/// One step of a resolved dot-path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Segment {
    /// Descend into the named field of an object
    Field(String),

    /// Iterate a list and resolve the nested path against every element.
    /// Always the last segment at its level: the nested path owns the rest
    /// of the original string.
    FanOut(Path),
}

/// A dot-path split into segments, e.g. `plans.*.id` becomes
/// `[Field("plans"), FanOut([Field("id")])]`.
///
/// A top-level path is never empty. The nested path of a trailing `*` may be,
/// in which case each element is taken as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Path {
    pub segments: Vec<Segment>,
}

impl Path {
    pub fn new(segments: Vec<Segment>) -> Self {
        Path { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of `*` levels nested inside this path.
    pub fn fan_out_depth(&self) -> usize {
        match self.segments.last() {
            Some(Segment::FanOut(inner)) => 1 + inner.fan_out_depth(),
            _ => 0,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match segment {
                Segment::Field(name) => write!(f, "{}", name)?,
                Segment::FanOut(inner) if inner.is_empty() => write!(f, "*")?,
                Segment::FanOut(inner) => write!(f, "*.{}", inner)?,
            }
        }
        Ok(())
    }
}

/// A string leaf of the mapping spec.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Leaf {
    /// Constant emitted as-is (`"#text"`)
    Literal(Rc<str>),

    /// Path looked up in the document. Shared between identical path strings.
    Lookup(Rc<Path>),
}

/// Child of a record key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EntryValue {
    /// Plain key: evaluated, and the key dropped when it misses
    Node(MappingNode),

    /// Key declared with the `.*` suffix: every field record is transposed
    /// and the resulting records are concatenated in order. A single object
    /// spec is a list of one.
    Records(Vec<Vec<Entry>>),
}

/// One `key: child` pair of a record spec, key already stripped of its suffix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub key: String,
    pub value: EntryValue,
}

/// Mapping spec node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MappingNode {
    Leaf(Leaf),

    /// Output object, entries kept in declaration order
    Record(Vec<Entry>),
}

impl Entry {
    pub fn value(key: impl Into<String>, node: MappingNode) -> Self {
        Entry {
            key: key.into(),
            value: EntryValue::Node(node),
        }
    }

    pub fn records(key: impl Into<String>, records: Vec<Vec<Entry>>) -> Self {
        Entry {
            key: key.into(),
            value: EntryValue::Records(records),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self.value, EntryValue::Records(_))
    }

    fn depth(&self) -> usize {
        match &self.value {
            EntryValue::Node(node) => node.depth(),
            EntryValue::Records(records) => {
                1 + records.iter().map(|r| entries_depth(r)).max().unwrap_or(0)
            }
        }
    }
}

impl MappingNode {
    /// Create a literal leaf node
    pub fn literal(s: impl Into<Rc<str>>) -> Self {
        MappingNode::Leaf(Leaf::Literal(s.into()))
    }

    /// Create a lookup leaf node
    pub fn lookup(path: Path) -> Self {
        MappingNode::Leaf(Leaf::Lookup(Rc::new(path)))
    }

    /// Nesting depth, counting records and `*` levels in paths.
    pub fn depth(&self) -> usize {
        match self {
            MappingNode::Leaf(Leaf::Literal(_)) => 1,
            MappingNode::Leaf(Leaf::Lookup(path)) => 1 + path.fan_out_depth(),
            MappingNode::Record(entries) => 1 + entries_depth(entries),
        }
    }
}

fn entries_depth(entries: &[Entry]) -> usize {
    entries.iter().map(Entry::depth).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Segment {
        Segment::Field(name.to_string())
    }

    #[test]
    fn test_path_display() {
        let path = Path::new(vec![
            field("plans"),
            Segment::FanOut(Path::new(vec![
                field("items"),
                Segment::FanOut(Path::new(vec![field("id")])),
            ])),
        ]);
        assert_eq!(path.to_string(), "plans.*.items.*.id");
        assert_eq!(path.fan_out_depth(), 2);

        let trailing = Path::new(vec![field("tags"), Segment::FanOut(Path::default())]);
        assert_eq!(trailing.to_string(), "tags.*");
        assert_eq!(trailing.fan_out_depth(), 1);
    }

    #[test]
    fn test_node_depth() {
        let leaf = MappingNode::literal("x");
        assert_eq!(leaf.depth(), 1);

        let record = MappingNode::Record(vec![
            Entry::value("a", MappingNode::literal("x")),
            Entry::value(
                "b",
                MappingNode::Record(vec![Entry::value(
                    "c",
                    MappingNode::lookup(Path::new(vec![
                        field("list"),
                        Segment::FanOut(Path::new(vec![field("id")])),
                    ])),
                )]),
            ),
        ]);
        // record -> record -> lookup with one fan-out
        assert_eq!(record.depth(), 4);
        assert_eq!(MappingNode::Record(vec![]).depth(), 1);

        // record -> records -> literal
        let array = MappingNode::Record(vec![Entry::records(
            "items",
            vec![vec![], vec![Entry::value("k", MappingNode::literal("x"))]],
        )]);
        assert_eq!(array.depth(), 3);
    }

    #[test]
    fn test_entry_kind() {
        assert!(Entry::records("items", vec![vec![]]).is_array());
        assert!(!Entry::value("id", MappingNode::literal("1")).is_array());
    }
}
