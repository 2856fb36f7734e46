// Field-record transpose
// Turns {field: [v0, v1, ..], other: scalar} into [{field: v0, other: scalar}, ..]

use indexmap::IndexMap;
use tracing::warn;

use crate::evaluator::EvaluatorError;
use crate::options::{RaggedPolicy, ScalarRecordPolicy, TransposeOptions};
use crate::utils::list_len;
use crate::value::JValue;

/// Transpose a field record into one record per list index.
///
/// The record count comes from the first list-valued field in insertion
/// order. Scalars are repeated into every record. Lists of other lengths are
/// handled according to `options.ragged`; a record with no list field yields
/// nothing unless `options.scalar_records` asks for a single record.
pub fn transpose(
    record: &IndexMap<String, JValue>,
    options: &TransposeOptions,
) -> Result<Vec<JValue>, EvaluatorError> {
    let len = target_len(record, options)?;

    let mut rows = Vec::with_capacity(len);
    for index in 0..len {
        let mut row = IndexMap::with_capacity(record.len());
        for (field, value) in record {
            match value {
                JValue::Array(items) => {
                    // Exhausted lists only happen under RaggedPolicy::Pad
                    if let Some(item) = items.get(index) {
                        row.insert(field.clone(), item.clone());
                    }
                }
                scalar => {
                    row.insert(field.clone(), scalar.clone());
                }
            }
        }
        rows.push(JValue::object(row));
    }
    Ok(rows)
}

fn target_len(
    record: &IndexMap<String, JValue>,
    options: &TransposeOptions,
) -> Result<usize, EvaluatorError> {
    let mut lists = record
        .iter()
        .filter_map(|(field, value)| list_len(value).map(|len| (field, len)));

    let (first_field, first_len) = match lists.next() {
        Some(first) => first,
        None => {
            return Ok(match options.scalar_records {
                ScalarRecordPolicy::Single if !record.is_empty() => 1,
                _ => 0,
            });
        }
    };

    let mut len = first_len;
    for (field, found) in lists {
        if found == first_len {
            continue;
        }
        match options.ragged {
            RaggedPolicy::Reject => {
                return Err(EvaluatorError::RaggedTranspose {
                    field: field.clone(),
                    reference: first_field.clone(),
                    expected: first_len,
                    found,
                });
            }
            RaggedPolicy::Truncate => len = len.min(found),
            RaggedPolicy::Pad => len = len.max(found),
        }
        warn!(
            field = %field,
            reference = %first_field,
            expected = first_len,
            found,
            policy = ?options.ragged,
            "list lengths differ in array-of-records mapping"
        );
    }
    Ok(len)
}
