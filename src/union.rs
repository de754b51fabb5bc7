//! Union schema: the first branch that accepts the value wins.

use std::sync::Arc;

use crate::context::{ParseResult, ValidationContext};
use crate::error::IssueKind;
use crate::schema::{Schema, SchemaBase, SchemaKind, Schematic};
use crate::types::Value;

/// Schema accepting any value one of its branches accepts.
#[derive(Debug, Clone)]
pub struct UnionSchema {
    branches: Vec<Schema>,
    base: SchemaBase,
}

/// Create a union over `branches`, tried in order.
pub fn union<I, S>(branches: I) -> UnionSchema
where
    I: IntoIterator<Item = S>,
    S: Into<Schema>,
{
    UnionSchema::new(branches.into_iter().map(Into::into).collect())
}

impl UnionSchema {
    pub(crate) fn new(branches: Vec<Schema>) -> Self {
        Self {
            branches,
            base: SchemaBase::default(),
        }
    }

    /// Append a branch instead of nesting unions.
    ///
    /// A union carrying its own checks, message, default or coercion is kept
    /// whole as the first branch of a new union, so that configuration still
    /// covers only its original branches.
    pub fn or(mut self, other: impl Schematic) -> Self {
        if !self.base.is_plain() {
            return UnionSchema::new(vec![self.into(), other.into()]);
        }
        self.branches.push(other.into());
        self
    }

    pub fn branches(&self) -> &[Schema] {
        &self.branches
    }
}

impl Schematic for UnionSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl From<UnionSchema> for Schema {
    fn from(schema: UnionSchema) -> Self {
        Schema {
            kind: SchemaKind::Union(Arc::new(schema.branches)),
            base: schema.base,
        }
    }
}

pub(crate) fn parse_union(
    branches: &[Schema],
    value: Value,
    ctx: &mut ValidationContext,
) -> ParseResult {
    let mut failures = Vec::new();
    for (index, branch) in branches.iter().enumerate() {
        let mut trial = ctx.fork();
        let result = branch.run_validation(value.clone(), &mut trial);
        if !result.is_invalid() && !trial.has_errors() {
            tracing::trace!(branch = index, kind = branch.kind_name(), "union branch matched");
            return result;
        }
        tracing::trace!(
            branch = index,
            errors = trial.error_count(),
            "union branch rejected value"
        );
        failures.extend(trial.into_errors());
    }

    ctx.add_error(
        IssueKind::InvalidUnion { errors: failures },
        "Value did not match any types",
    );
    ParseResult::Invalid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{boolean, number, string};
    use serde_json::json;

    #[test]
    fn first_matching_branch_wins() {
        let schema = union([string().into_schema(), number().coerce().into_schema()]);
        // The string branch accepts "5" before coercion is tried.
        assert_eq!(schema.parse("5").unwrap(), Value::from("5"));
        assert_eq!(schema.parse(5).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn branch_errors_are_discarded_on_success() {
        let schema = string().or(number());
        let result = schema.safe_parse(3);
        assert!(result.is_valid());
        assert!(result.errors().is_empty());
    }

    #[test]
    fn failure_nests_branch_errors() {
        let schema = string().or(number()).or(boolean());
        assert_eq!(schema.branches().len(), 3);

        let err = schema.parse(json!(null)).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.message(), "Value did not match any types");
        let nested = err.errors[0].kind.nested();
        assert_eq!(nested.len(), 3);
        assert!(nested.iter().all(|e| e.code() == "invalid_type"));
    }

    #[test]
    fn empty_union_rejects_everything() {
        let schema = union(Vec::<Schema>::new());
        let err = schema.parse("anything").unwrap_err();
        assert_eq!(err.errors[0].code(), "invalid_union");
        assert!(err.errors[0].kind.nested().is_empty());
    }

    #[test]
    fn refined_union_is_not_flattened() {
        let text_or_number = string().or(number()).test(
            |v| v.as_str().is_some() || v.as_f64().is_some(),
            "must be text or number",
        );
        let schema = text_or_number.or(boolean());
        assert_eq!(schema.branches().len(), 2);

        assert_eq!(schema.parse(true).unwrap(), Value::Bool(true));
        assert_eq!(schema.parse("x").unwrap(), Value::from("x"));
    }

    #[test]
    fn plain_union_still_flattens() {
        let schema = string().or(number()).or(boolean());
        assert_eq!(schema.branches().len(), 3);
    }

    #[test]
    fn branch_refinements_participate() {
        let schema = string().min(3).or(number());
        assert!(schema.parse("ab").is_err());
        assert!(schema.parse("abc").is_ok());
    }
}
