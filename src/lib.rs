// jsonmap - declarative reshaping of JSON documents
// Licensed under the MIT License

//! # jsonmap_core
//!
//! Reshape a JSON document into another schema by describing the output
//! shape, instead of writing per-field glue code.
//!
//! A mapping spec is itself JSON. Objects describe output objects, string
//! leaves are dot-paths into the source document:
//!
//! - `"a.b.c"` reads a nested field
//! - `"plans.*.id"` reads `id` from every element of `plans`
//! - `"#text"` is the constant `"text"`; `"##name"` reads the field `#name`
//! - a key ending in `.*` builds an array of records from parallel lists,
//!   repeating scalar values into every record. Its value is an object, or a
//!   list of objects whose record arrays are concatenated
//!
//! Keys that resolve to nothing are left out, and an object whose keys are all
//! left out disappears as well.
//!
//! ```
//! use jsonmap_core::map_json;
//!
//! let out = map_json(
//!     r#"{"nested":[{"id":"1","title":"a"},{"id":"2","title":"b"}]}"#,
//!     r#"{"items.*":{"id":"nested.*.id","name":"nested.*.title"}}"#,
//! ).unwrap();
//! assert_eq!(out, r#"{"items":[{"id":"1","name":"a"},{"id":"2","name":"b"}]}"#);
//! ```
//!
//! ## Architecture
//!
//! - `value` - the document model (`JValue`)
//! - `parser` - dot-path and leaf syntax
//! - `ast` - the compiled mapping tree
//! - `compiler` - spec `JValue` to AST, with path interning
//! - `evaluator` - path resolution and spec interpretation
//! - `transpose` - field records to arrays of records
//! - `options` - configuration

pub mod ast;
pub mod compiler;
pub mod evaluator;
pub mod options;
pub mod parser;
pub mod transpose;
pub mod value;
mod utils;

#[doc(hidden)]
pub use indexmap;

use thiserror::Error;

pub use compiler::{CompileError, CompiledMapping};
pub use evaluator::{Evaluator, EvaluatorError};
pub use options::{MapperOptions, RaggedPolicy, ScalarRecordPolicy};
pub use value::JValue;

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid mapping: {0}")]
    Compile(#[from] CompileError),

    #[error("Evaluation failed: {0}")]
    Evaluate(#[from] EvaluatorError),
}

/// Compile a mapping spec with default options.
///
/// Compile once and evaluate many times when the same spec is applied to
/// several documents.
pub fn compile(spec: &JValue) -> Result<CompiledMapping, Error> {
    Ok(compiler::compile(spec, &MapperOptions::default())?)
}

/// Map a document through a spec in one step.
///
/// Returns `None` when nothing in the spec resolved.
///
/// # Examples
///
/// ```
/// use jsonmap_core::{jvalue, map};
///
/// let doc = jvalue!({"id": "abc", "type": "x"});
/// let spec = jvalue!({"my_id": "id", "my_type": "missing"});
/// assert_eq!(map(&doc, &spec).unwrap(), Some(jvalue!({"my_id": "abc"})));
/// ```
pub fn map(document: &JValue, spec: &JValue) -> Result<Option<JValue>, Error> {
    map_with(document, spec, &MapperOptions::default())
}

/// Map a document through a spec with explicit options.
pub fn map_with(
    document: &JValue,
    spec: &JValue,
    options: &MapperOptions,
) -> Result<Option<JValue>, Error> {
    let mapping = compiler::compile(spec, options)?;
    let evaluator = Evaluator::with_options(options.clone());
    Ok(evaluator.evaluate(&mapping, document)?)
}

/// Map with JSON text in and out.
///
/// An empty result is written as `null`.
pub fn map_json(document: &str, spec: &str) -> Result<String, Error> {
    let document = JValue::from_json_str(document)?;
    let spec = JValue::from_json_str(spec)?;
    let result = map(&document, &spec)?;
    Ok(result.unwrap_or(JValue::Null).to_json_string()?)
}
