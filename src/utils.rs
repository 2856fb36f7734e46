// Small list helpers shared by the evaluator

use crate::value::JValue;

/// Push `value` onto `out`, splicing its elements in instead when it is a
/// list and `merge` is set. Only one level is flattened.
pub fn push_or_merge(out: &mut Vec<JValue>, value: JValue, merge: bool) {
    match value {
        JValue::Array(items) if merge => out.extend(items.iter().cloned()),
        other => out.push(other),
    }
}

/// Length of the list if the value is one.
pub fn list_len(value: &JValue) -> Option<usize> {
    value.as_array().map(Vec::len)
}
