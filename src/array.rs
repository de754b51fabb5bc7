//! Array schema: every element validated, every failure reported.

use std::sync::Arc;

use crate::context::{ParseResult, ParseStatus, ValidationContext};
use crate::error::IssueKind;
use crate::schema::{Bound, Schema, SchemaBase, SchemaKind, Schematic};
use crate::types::{format_number, Value};

/// Schema for arrays whose elements follow one schema.
#[derive(Debug, Clone)]
pub struct ArraySchema {
    element: Arc<Schema>,
    base: SchemaBase,
}

/// Create an array schema over `element`.
pub fn array(element: impl Schematic) -> ArraySchema {
    ArraySchema::new(element.into())
}

impl ArraySchema {
    pub(crate) fn new(element: Schema) -> Self {
        Self {
            element: Arc::new(element),
            base: SchemaBase::default(),
        }
    }

    /// The element schema.
    pub fn element(&self) -> &Schema {
        &self.element
    }

    /// Require exactly `n` elements.
    pub fn length(self, n: usize) -> Self {
        self.ensure(move |value, ctx| {
            let Some(items) = value.as_array() else { return };
            if items.len() != n {
                ctx.add_error(
                    IssueKind::InvalidExactValue {
                        expected: Value::from(n),
                        received: Value::from(items.len()),
                    },
                    format!("Array must contain exactly {} element(s)", n),
                );
            }
        })
    }

    pub fn min(self, n: usize) -> Self {
        self.count_bound(Bound::min(n as f64, false))
    }

    pub fn min_exclusive(self, n: usize) -> Self {
        self.count_bound(Bound::min(n as f64, true))
    }

    pub fn max(self, n: usize) -> Self {
        self.count_bound(Bound::max(n as f64, false))
    }

    pub fn max_exclusive(self, n: usize) -> Self {
        self.count_bound(Bound::max(n as f64, true))
    }

    /// Require at least one element.
    pub fn nonempty(self) -> Self {
        self.min(1)
    }

    fn count_bound(self, bound: Bound) -> Self {
        self.ensure(move |value, ctx| {
            let Some(items) = value.as_array() else { return };
            if bound.accepts(items.len() as f64) {
                return;
            }
            let phrase = bound.phrase(["at least", "more than", "at most", "fewer than"]);
            bound.report(
                ctx,
                Value::Number(bound.value),
                Value::from(items.len()),
                format!(
                    "Array must contain {} {} element(s)",
                    phrase,
                    format_number(bound.value)
                ),
            );
        })
    }
}

impl Schematic for ArraySchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl From<ArraySchema> for Schema {
    fn from(schema: ArraySchema) -> Self {
        Schema {
            kind: SchemaKind::Array(schema.element),
            base: schema.base,
        }
    }
}

pub(crate) fn parse_array(
    element: &Schema,
    base: &SchemaBase,
    value: Value,
    ctx: &mut ValidationContext,
) -> ParseResult {
    let items = match value {
        Value::Array(items) => items,
        other => {
            ctx.invalid_type("array", &other, base.type_message());
            return ParseResult::Invalid;
        }
    };

    let mut status = ParseStatus::Valid;
    let mut output = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let mut child = ctx.child(index);
        let result = element.run_validation(item, &mut child);
        ctx.merge(child);
        status.absorb(result.status());
        if let Some(parsed) = result.into_value() {
            output.push(parsed);
        }
    }

    status.into_result(Value::Array(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{number, string};
    use crate::types::PathSegment;
    use serde_json::json;

    #[test]
    fn validates_elements() {
        let schema = array(string());
        assert_eq!(
            schema.parse(json!(["a", "b"])).unwrap(),
            Value::from(json!(["a", "b"]))
        );
    }

    #[test]
    fn rejects_non_arrays() {
        let err = array(string()).parse("a").unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].code(), "invalid_type");
    }

    #[test]
    fn reports_every_invalid_index() {
        let err = array(string())
            .parse(json!(["hello", 1, "world", 2, "foo", 3]))
            .unwrap_err();
        let paths: Vec<_> = err.errors.iter().map(|e| e.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                vec![PathSegment::Index(1)],
                vec![PathSegment::Index(3)],
                vec![PathSegment::Index(5)],
            ]
        );
        assert_eq!(err.message(), "3 errors occurred");
    }

    #[test]
    fn holes_validate_as_undefined() {
        let input = Value::Array(vec![Value::from("a"), Value::Undefined]);
        let err = array(string()).parse(input.clone()).unwrap_err();
        assert_eq!(err.errors[0].path, vec![PathSegment::Index(1)]);
        assert_eq!(err.errors[0].message, "[1] is required");

        assert!(array(string().optional()).parse(input).is_ok());
    }

    #[test]
    fn count_refinements() {
        assert!(array(string()).min(2).parse(json!(["a"])).is_err());
        assert_eq!(
            array(string()).min(2).parse(json!(["a", "b"])).unwrap(),
            Value::from(json!(["a", "b"]))
        );
        assert!(array(string()).max(1).parse(json!(["a", "b"])).is_err());
        assert!(array(string()).max_exclusive(2).parse(json!(["a", "b"])).is_err());
        assert!(array(string()).min_exclusive(1).parse(json!(["a"])).is_err());
        assert!(array(string()).nonempty().parse(json!([])).is_err());
        assert!(array(string()).length(2).parse(json!(["a"])).is_err());
    }

    #[test]
    fn count_checks_skip_when_elements_fail() {
        let err = array(number()).min(3).parse(json!(["x"])).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].code(), "invalid_type");
    }

    #[test]
    fn array_combinator_wraps_element() {
        let schema = number().array();
        assert_eq!(schema.element().kind_name(), "number");
        assert!(schema.parse(json!([1, 2])).is_ok());
    }
}
