// Mapper configuration
// Loadable from JSON next to a spec; every field has a default

use serde::{Deserialize, Serialize};

/// Default limit on spec nesting (records plus `*` levels).
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// What to do when the list fields of one array-of-records key differ in length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaggedPolicy {
    /// Emit as many records as the shortest list has elements
    #[default]
    Truncate,

    /// Fail the evaluation with `EvaluatorError::RaggedTranspose`
    Reject,

    /// Emit as many records as the longest list has elements; a field whose
    /// list is exhausted is left out of the trailing records
    Pad,
}

/// How many records a field record without any list field produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarRecordPolicy {
    /// No records
    #[default]
    Empty,

    /// One record holding the scalars
    Single,
}

/// Transpose settings, split out so the transpose module does not depend on
/// the rest of the configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransposeOptions {
    pub ragged: RaggedPolicy,
    pub scalar_records: ScalarRecordPolicy,
}

/// Options for compiling and evaluating a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapperOptions {
    /// Deepest spec accepted by the compiler
    pub max_depth: usize,
    pub ragged: RaggedPolicy,
    pub scalar_records: ScalarRecordPolicy,
}

impl Default for MapperOptions {
    fn default() -> Self {
        MapperOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            ragged: RaggedPolicy::default(),
            scalar_records: ScalarRecordPolicy::default(),
        }
    }
}

impl MapperOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_ragged(mut self, ragged: RaggedPolicy) -> Self {
        self.ragged = ragged;
        self
    }

    pub fn with_scalar_records(mut self, scalar_records: ScalarRecordPolicy) -> Self {
        self.scalar_records = scalar_records;
        self
    }

    pub fn transpose(&self) -> TransposeOptions {
        TransposeOptions {
            ragged: self.ragged,
            scalar_records: self.scalar_records,
        }
    }

    /// Parse options from a JSON object; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = MapperOptions::default();
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(options.ragged, RaggedPolicy::Truncate);
        assert_eq!(options.scalar_records, ScalarRecordPolicy::Empty);
    }

    #[test]
    fn test_builder() {
        let options = MapperOptions::new()
            .with_max_depth(8)
            .with_ragged(RaggedPolicy::Reject)
            .with_scalar_records(ScalarRecordPolicy::Single);
        assert_eq!(options.max_depth, 8);
        assert_eq!(
            options.transpose(),
            TransposeOptions {
                ragged: RaggedPolicy::Reject,
                scalar_records: ScalarRecordPolicy::Single,
            }
        );
    }

    #[test]
    fn test_from_json_partial() {
        let options = MapperOptions::from_json_str(r#"{"ragged": "pad"}"#).unwrap();
        assert_eq!(options.ragged, RaggedPolicy::Pad);
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);

        let options = MapperOptions::from_json_str("{}").unwrap();
        assert_eq!(options, MapperOptions::default());
    }

    #[test]
    fn test_from_json_rejects_unknown() {
        assert!(MapperOptions::from_json_str(r#"{"ragged": "sideways"}"#).is_err());
        assert!(MapperOptions::from_json_str(r#"{"merge": true}"#).is_err());
    }
}
