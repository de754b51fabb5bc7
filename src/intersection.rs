//! Intersection schema: both branches must accept, outputs are deep-merged.

use std::sync::Arc;

use crate::context::{ParseResult, ValidationContext};
use crate::error::{IssueKind, SchematicError};
use crate::merge::merge_values;
use crate::schema::{Schema, SchemaBase, SchemaKind, Schematic};
use crate::types::Value;

/// Schema accepting values both branches accept.
#[derive(Debug, Clone)]
pub struct IntersectionSchema {
    left: Arc<Schema>,
    right: Arc<Schema>,
    base: SchemaBase,
}

/// Intersection of two schemas.
pub fn intersection(left: impl Schematic, right: impl Schematic) -> IntersectionSchema {
    IntersectionSchema::new(left.into(), right.into())
}

impl IntersectionSchema {
    pub(crate) fn new(left: Schema, right: Schema) -> Self {
        Self {
            left: Arc::new(left),
            right: Arc::new(right),
            base: SchemaBase::default(),
        }
    }

    /// Intersect with one more schema. Chains nest to the right:
    /// `a.and(b).and(c)` is `a & (b & c)`.
    ///
    /// An intersection carrying its own checks, message, default or coercion
    /// is kept whole as the left side instead.
    pub fn and(self, other: impl Schematic) -> Self {
        if !self.base.is_plain() {
            return IntersectionSchema::new(self.into(), other.into());
        }
        let right = nest_right(Schema::clone(&self.right), other.into());
        Self {
            right: Arc::new(right),
            ..self
        }
    }

    pub fn left(&self) -> &Schema {
        &self.left
    }

    pub fn right(&self) -> &Schema {
        &self.right
    }
}

impl Schematic for IntersectionSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl From<IntersectionSchema> for Schema {
    fn from(schema: IntersectionSchema) -> Self {
        Schema {
            kind: SchemaKind::Intersection(schema.left, schema.right),
            base: schema.base,
        }
    }
}

fn nest_right(right: Schema, other: Schema) -> Schema {
    if right.base.is_plain() {
        if let SchemaKind::Intersection(inner_left, inner_right) = &right.kind {
            let nested = nest_right(Schema::clone(inner_right), other);
            return Schema {
                kind: SchemaKind::Intersection(Arc::clone(inner_left), Arc::new(nested)),
                base: right.base.clone(),
            };
        }
    }
    IntersectionSchema::new(right, other).into()
}

pub(crate) fn parse_intersection(
    left: &Schema,
    right: &Schema,
    value: Value,
    ctx: &mut ValidationContext,
) -> ParseResult {
    let mut left_ctx = ctx.fork();
    let left_result = left.run_validation(value.clone(), &mut left_ctx);
    let mut right_ctx = ctx.fork();
    let right_result = right.run_validation(value, &mut right_ctx);

    tracing::trace!(
        left = left_ctx.error_count(),
        right = right_ctx.error_count(),
        "intersection branches evaluated"
    );

    let (Some(a), Some(b)) = (left_result.value(), right_result.value()) else {
        return reject(ctx, left_ctx, right_ctx);
    };
    if left_ctx.has_errors() || right_ctx.has_errors() {
        return reject(ctx, left_ctx, right_ctx);
    }

    match merge_values(a.clone(), b.clone()) {
        Ok(merged) => ParseResult::Valid(merged),
        Err(conflict) => {
            let mut path = ctx.path().to_vec();
            path.extend(conflict.path);
            ctx.push_error(SchematicError::new(
                IssueKind::InvalidExactValue {
                    expected: conflict.left,
                    received: conflict.right,
                },
                path,
                "Intersection results could not be merged",
            ));
            ParseResult::Invalid
        }
    }
}

fn reject(
    ctx: &mut ValidationContext,
    left: ValidationContext,
    right: ValidationContext,
) -> ParseResult {
    let mut errors = left.into_errors();
    errors.extend(right.into_errors());
    ctx.add_error(
        IssueKind::InvalidIntersection { errors },
        "Value did not match every type in the intersection",
    );
    ParseResult::Invalid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::object;
    use crate::primitive::{number, string};
    use crate::types::PathSegment;
    use serde_json::json;

    #[test]
    fn merges_object_outputs() {
        let schema = object([("a", string())]).and(object([("b", number())]));
        assert_eq!(
            schema.parse(json!({"a": "x", "b": 1, "c": true})).unwrap(),
            Value::from(json!({"a": "x", "b": 1}))
        );
    }

    #[test]
    fn branch_failures_are_nested() {
        let schema = intersection(object([("a", string())]), object([("b", number())]));
        let err = schema.parse(json!({"a": 1})).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].code(), "invalid_intersection");
        let nested: Vec<_> = err.errors[0]
            .kind
            .nested()
            .iter()
            .map(|e| e.path.clone())
            .collect();
        assert_eq!(
            nested,
            vec![vec![PathSegment::from("a")], vec![PathSegment::from("b")]]
        );
    }

    #[test]
    fn primitive_intersection() {
        let schema = string().min(2).and(string().max(4));
        assert!(schema.parse("abc").is_ok());
        assert!(schema.parse("a").is_err());
        assert!(schema.parse("abcde").is_err());
    }

    #[test]
    fn conflicting_outputs_fail_at_conflict_path() {
        let upper = object([("a", string().to_uppercase())]);
        let lower = object([("a", string().to_lowercase())]);
        let err = upper.and(lower).parse(json!({"a": "Mixed"})).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].code(), "invalid_exact_value");
        assert_eq!(err.errors[0].path, vec![PathSegment::from("a")]);
    }

    #[test]
    fn chained_and_nests_to_the_right() {
        let schema = string().and(string()).and(string().min(1));
        assert_eq!(schema.left().kind_name(), "string");
        assert_eq!(schema.right().kind_name(), "intersection");
        assert!(schema.parse("x").is_ok());
        assert!(schema.parse("").is_err());
    }

    #[test]
    fn chained_failure_nests_under_right_pair() {
        let schema = object([("a", number())])
            .and(object([("b", number())]))
            .and(object([("c", number())]));
        let err = schema.parse(json!({"a": 1, "b": 2})).unwrap_err();
        assert_eq!(err.errors.len(), 1);

        let outer = err.errors[0].kind.nested();
        assert_eq!(outer.len(), 1);
        assert_eq!(outer[0].code(), "invalid_intersection");
        let inner = outer[0].kind.nested();
        assert_eq!(inner.len(), 1);
        assert_eq!(inner[0].message, "c is required");
    }

    #[test]
    fn refined_intersection_stays_on_the_left() {
        let pair = string().and(string()).ensure(|_, _| {});
        let schema = pair.and(string());
        assert_eq!(schema.left().kind_name(), "intersection");
        assert_eq!(schema.right().kind_name(), "string");
    }
}
