//! Deep merge of two validated outputs, used by intersections.

use crate::types::{Object, PathSegment, Value};

/// Two values that cannot be combined, and where they sit relative to the merge root.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Conflict {
    pub path: Vec<PathSegment>,
    pub left: Value,
    pub right: Value,
}

/// Merge `left` and `right`.
///
/// - equal values merge to themselves
/// - objects merge key-wise, recursing on shared keys
/// - arrays merge element-wise and need equal length
/// - dates need the same instant
pub(crate) fn merge_values(left: Value, right: Value) -> Result<Value, Conflict> {
    let mut path = Vec::new();
    merge_at(left, right, &mut path)
}

fn merge_at(left: Value, right: Value, path: &mut Vec<PathSegment>) -> Result<Value, Conflict> {
    match (left, right) {
        (Value::Object(left), Value::Object(right)) => merge_objects(left, right, path),
        (Value::Array(left), Value::Array(right)) if left.len() == right.len() => {
            let mut merged = Vec::with_capacity(left.len());
            for (index, (a, b)) in left.into_iter().zip(right).enumerate() {
                path.push(PathSegment::Index(index));
                merged.push(merge_at(a, b, path)?);
                path.pop();
            }
            Ok(Value::Array(merged))
        }
        (Value::Date(a), Value::Date(b)) if a == b => Ok(Value::Date(a)),
        (left, right) if left == right => Ok(left),
        (left, right) => Err(Conflict {
            path: path.clone(),
            left,
            right,
        }),
    }
}

fn merge_objects(
    left: Object,
    mut right: Object,
    path: &mut Vec<PathSegment>,
) -> Result<Value, Conflict> {
    let mut merged = Object::with_capacity(left.len() + right.len());
    for (key, a) in left {
        let value = match right.shift_remove(&key) {
            Some(b) => {
                path.push(PathSegment::Key(key.clone()));
                let value = merge_at(a, b, path)?;
                path.pop();
                value
            }
            None => a,
        };
        merged.insert(key, value);
    }
    merged.extend(right);
    Ok(Value::Object(merged))
}
