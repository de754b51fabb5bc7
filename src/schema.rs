//! Schema nodes and the validation protocol shared by every kind.
//!
//! A [`Schema`] is an immutable node. Builders such as [`StringSchema`] or
//! [`ObjectSchema`] hold kind-specific configuration and convert into a
//! `Schema` when composed. Every combinator returns a new value; children are
//! shared behind `Arc` and never mutated.
//!
//! Validation of one node (`run_validation`):
//! 1. substitute the default when the input is `Undefined`
//! 2. `parse_type` for the node's kind; `Invalid` stops here
//! 3. run checks in registration order
//! 4. any error recorded during steps 2-3 makes the result `Invalid`

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::array::ArraySchema;
use crate::context::{ParseResult, SafeParse, ValidationContext};
use crate::error::{IssueKind, ParseError, ProjectError};
use crate::intersection::IntersectionSchema;
use crate::object::ObjectShape;
use crate::primitive::StringRules;
use crate::types::Value;
use crate::union::UnionSchema;

/// Refinement run after a successful type check. Records errors on the context.
pub type Check = Arc<dyn Fn(&Value, &mut ValidationContext) + Send + Sync>;

/// Output mapping applied by `transform`.
pub type Transformer = Arc<dyn Fn(Value, &mut ValidationContext) -> Value + Send + Sync>;

#[derive(Clone)]
pub(crate) enum DefaultValue {
    Static(Value),
    Supplier(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    fn produce(&self) -> Value {
        match self {
            DefaultValue::Static(value) => value.clone(),
            DefaultValue::Supplier(supplier) => supplier(),
        }
    }
}

/// State shared by every schema kind.
#[derive(Clone, Default)]
pub struct SchemaBase {
    pub(crate) checks: Vec<Check>,
    pub(crate) coerce: bool,
    pub(crate) type_message: Option<String>,
    pub(crate) default: Option<DefaultValue>,
}

impl SchemaBase {
    pub(crate) fn type_message(&self) -> Option<&str> {
        self.type_message.as_deref()
    }

    /// No checks, message, default or coercion configured.
    pub(crate) fn is_plain(&self) -> bool {
        self.checks.is_empty()
            && !self.coerce
            && self.type_message.is_none()
            && self.default.is_none()
    }
}

impl fmt::Debug for SchemaBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBase")
            .field("checks", &self.checks.len())
            .field("coerce", &self.coerce)
            .field("type_message", &self.type_message)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub(crate) enum SchemaKind {
    String(StringRules),
    Number,
    Boolean,
    Date,
    Enum(Arc<Vec<Value>>),
    Array(Arc<Schema>),
    Object(Arc<ObjectShape>),
    Record {
        key: Option<Arc<Schema>>,
        value: Arc<Schema>,
    },
    Union(Arc<Vec<Schema>>),
    Intersection(Arc<Schema>, Arc<Schema>),
    Optional(Arc<Schema>),
    Nullable(Arc<Schema>),
    Transform(Arc<Schema>, Transformer),
    Pipe(Arc<Schema>, Arc<Schema>),
}

/// A type-erased schema node.
#[derive(Clone)]
pub struct Schema {
    pub(crate) kind: SchemaKind,
    pub(crate) base: SchemaBase,
}

impl Schema {
    pub(crate) fn from_kind(kind: SchemaKind) -> Self {
        Self {
            kind,
            base: SchemaBase::default(),
        }
    }

    /// Name of this node's kind, as used in logs.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::String(_) => "string",
            SchemaKind::Number => "number",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Date => "date",
            SchemaKind::Enum(_) => "enum",
            SchemaKind::Array(_) => "array",
            SchemaKind::Object(_) => "object",
            SchemaKind::Record { .. } => "record",
            SchemaKind::Union(_) => "union",
            SchemaKind::Intersection(..) => "intersection",
            SchemaKind::Optional(_) => "optional",
            SchemaKind::Nullable(_) => "nullable",
            SchemaKind::Transform(..) => "transform",
            SchemaKind::Pipe(..) => "pipe",
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.kind, SchemaKind::Optional(_))
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self.kind, SchemaKind::Nullable(_))
    }

    /// Remove one level of `optional`. No-op on a non-optional schema.
    pub fn required(self) -> Schema {
        match self.kind {
            SchemaKind::Optional(inner) => Schema::clone(&inner),
            _ => self,
        }
    }

    /// Validate `value` at the position described by `ctx`.
    pub fn run_validation(&self, value: Value, ctx: &mut ValidationContext) -> ParseResult {
        let mark = ctx.error_count();
        let value = match (&self.base.default, value) {
            (Some(default), Value::Undefined) => default.produce(),
            (_, value) => value,
        };

        let result = self.parse_type(value, ctx);
        let Some(parsed) = result.value() else {
            return ParseResult::Invalid;
        };

        for check in &self.base.checks {
            check(parsed, ctx);
        }

        if ctx.error_count() > mark {
            ParseResult::Invalid
        } else {
            result
        }
    }

    fn parse_type(&self, value: Value, ctx: &mut ValidationContext) -> ParseResult {
        match &self.kind {
            SchemaKind::String(rules) => crate::primitive::parse_string(rules, &self.base, value, ctx),
            SchemaKind::Number => crate::primitive::parse_number(&self.base, value, ctx),
            SchemaKind::Boolean => crate::primitive::parse_boolean(&self.base, value, ctx),
            SchemaKind::Date => crate::primitive::parse_date(&self.base, value, ctx),
            SchemaKind::Enum(options) => {
                crate::enumeration::parse_enum(options, &self.base, value, ctx)
            }
            SchemaKind::Array(element) => {
                crate::array::parse_array(element, &self.base, value, ctx)
            }
            SchemaKind::Object(shape) => crate::object::parse_object(shape, &self.base, value, ctx),
            SchemaKind::Record { key, value: item } => {
                crate::record::parse_record(key.as_deref(), item, &self.base, value, ctx)
            }
            SchemaKind::Union(branches) => crate::union::parse_union(branches, value, ctx),
            SchemaKind::Intersection(left, right) => {
                crate::intersection::parse_intersection(left, right, value, ctx)
            }
            SchemaKind::Optional(inner) => match value {
                Value::Undefined => ParseResult::Valid(Value::Undefined),
                value => inner.run_validation(value, ctx),
            },
            SchemaKind::Nullable(inner) => match value {
                Value::Null => ParseResult::Valid(Value::Null),
                value => inner.run_validation(value, ctx),
            },
            SchemaKind::Transform(inner, transformer) => {
                let Some(validated) = inner.run_validation(value, ctx).into_value() else {
                    return ParseResult::Invalid;
                };
                let mark = ctx.error_count();
                let output = transformer(validated, ctx);
                if ctx.error_count() > mark {
                    ParseResult::Invalid
                } else {
                    ParseResult::Valid(output)
                }
            }
            SchemaKind::Pipe(first, next) => match first.run_validation(value, ctx).into_value() {
                Some(intermediate) => next.run_validation(intermediate, ctx),
                None => ParseResult::Invalid,
            },
        }
    }

    fn evaluate(&self, value: Value) -> SafeParse {
        let mut ctx = ValidationContext::new();
        let outcome = match self.run_validation(value, &mut ctx) {
            ParseResult::Valid(value) | ParseResult::Dirty(value) if !ctx.has_errors() => {
                SafeParse::Valid(value)
            }
            _ => SafeParse::Invalid(ctx.into_errors()),
        };
        tracing::debug!(
            kind = self.kind_name(),
            valid = outcome.is_valid(),
            errors = outcome.errors().len(),
            "validated value"
        );
        outcome
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("kind", &self.kind_name())
            .field("base", &self.base)
            .finish()
    }
}

/// Operations available on every schema builder.
///
/// Methods that keep the builder's kind (`coerce`, `ensure`, `default`, ...)
/// return `Self`, so kind-specific refinements can still follow. Methods that
/// wrap the node return a different schema type.
pub trait Schematic: Clone + Into<Schema> {
    #[doc(hidden)]
    fn base_mut(&mut self) -> &mut SchemaBase;

    /// Erase the builder type.
    fn into_schema(self) -> Schema {
        self.into()
    }

    /// Enable best-effort conversion before the strict type check.
    fn coerce(mut self) -> Self {
        self.base_mut().coerce = true;
        self
    }

    /// Custom message for this node's type mismatch error.
    fn message(mut self, message: impl Into<String>) -> Self {
        self.base_mut().type_message = Some(message.into());
        self
    }

    /// Substitute `value` when the input is undefined. The value is still validated.
    fn default(mut self, value: impl Into<Value>) -> Self {
        self.base_mut().default = Some(DefaultValue::Static(value.into()));
        self
    }

    /// Substitute the supplier's result when the input is undefined.
    fn default_with<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.base_mut().default = Some(DefaultValue::Supplier(Arc::new(supplier)));
        self
    }

    /// Attach a custom check.
    fn ensure<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value, &mut ValidationContext) + Send + Sync + 'static,
    {
        self.base_mut().checks.push(Arc::new(check));
        self
    }

    /// Attach a predicate; failing it records `message`.
    fn test<F>(self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        self.ensure(move |value, ctx| {
            if !predicate(value) {
                ctx.add_error(
                    IssueKind::InvalidExactValue {
                        expected: Value::Undefined,
                        received: value.clone(),
                    },
                    message.clone(),
                );
            }
        })
    }

    /// Restrict accepted values to an explicit list.
    fn allow<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let allowed: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.ensure(move |value, ctx| {
            if !allowed.contains(value) {
                let listed = allowed
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                ctx.add_error(
                    IssueKind::InvalidExactValue {
                        expected: Value::Array(allowed.clone()),
                        received: value.clone(),
                    },
                    format!("Value must be one of: {}", listed),
                );
            }
        })
    }

    /// Accept `Undefined` without validating it. Wrapping twice is a no-op.
    fn optional(self) -> Schema {
        let schema: Schema = self.into();
        if schema.is_optional() {
            return schema;
        }
        Schema::from_kind(SchemaKind::Optional(Arc::new(schema)))
    }

    /// Accept `Null` without validating it. Wrapping twice is a no-op.
    fn nullable(self) -> Schema {
        let schema: Schema = self.into();
        if schema.is_nullable() {
            return schema;
        }
        Schema::from_kind(SchemaKind::Nullable(Arc::new(schema)))
    }

    /// Union of this schema and `other`; first match wins.
    fn or(self, other: impl Schematic) -> UnionSchema {
        UnionSchema::new(vec![self.into(), other.into()])
    }

    /// Intersection of this schema and `other`; outputs are deep-merged.
    fn and(self, other: impl Schematic) -> IntersectionSchema {
        IntersectionSchema::new(self.into(), other.into())
    }

    /// Array whose elements follow this schema.
    fn array(self) -> ArraySchema {
        ArraySchema::new(self.into())
    }

    /// Map the validated output. Errors recorded by `f` fail the parse.
    fn transform<F>(self, f: F) -> Schema
    where
        F: Fn(Value, &mut ValidationContext) -> Value + Send + Sync + 'static,
    {
        Schema::from_kind(SchemaKind::Transform(Arc::new(self.into()), Arc::new(f)))
    }

    /// Feed this schema's output into `next`.
    fn pipe(self, next: impl Schematic) -> Schema {
        Schema::from_kind(SchemaKind::Pipe(Arc::new(self.into()), Arc::new(next.into())))
    }

    /// Validate `value`, returning the output or every collected error.
    fn parse(&self, value: impl Into<Value>) -> Result<Value, ParseError> {
        self.safe_parse(value).into_result()
    }

    /// Validate `value` without failing; inspect the returned outcome.
    fn safe_parse(&self, value: impl Into<Value>) -> SafeParse {
        let schema: Schema = self.clone().into();
        schema.evaluate(value.into())
    }

    /// Validate `value` and deserialize the output into `T`.
    fn parse_into<T: DeserializeOwned>(&self, value: impl Into<Value>) -> Result<T, ProjectError> {
        let output = self.parse(value)?;
        serde_json::from_value(serde_json::Value::from(output))
            .map_err(|source| ProjectError::Deserialize { source })
    }
}

impl Schematic for Schema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

/// Which side of a range a bound limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Limit {
    Min,
    Max,
}

/// A lower or upper bound with optional exclusivity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bound {
    pub limit: Limit,
    pub value: f64,
    pub exclusive: bool,
}

impl Bound {
    pub fn min(value: f64, exclusive: bool) -> Self {
        Self {
            limit: Limit::Min,
            value,
            exclusive,
        }
    }

    pub fn max(value: f64, exclusive: bool) -> Self {
        Self {
            limit: Limit::Max,
            value,
            exclusive,
        }
    }

    pub fn accepts(&self, actual: f64) -> bool {
        match (self.limit, self.exclusive) {
            (Limit::Min, false) => actual >= self.value,
            (Limit::Min, true) => actual > self.value,
            (Limit::Max, false) => actual <= self.value,
            (Limit::Max, true) => actual < self.value,
        }
    }

    /// Record the TooSmall/TooBig error for a value outside this bound.
    pub fn report(
        &self,
        ctx: &mut ValidationContext,
        bound: Value,
        received: Value,
        message: String,
    ) {
        let inclusive = !self.exclusive;
        let kind = match self.limit {
            Limit::Min => IssueKind::TooSmall {
                minimum: bound,
                received,
                inclusive,
            },
            Limit::Max => IssueKind::TooBig {
                maximum: bound,
                received,
                inclusive,
            },
        };
        ctx.add_error(kind, message);
    }

    /// Pick the phrase matching this bound's direction and exclusivity.
    pub fn phrase<'a>(&self, phrases: [&'a str; 4]) -> &'a str {
        let [at_least, more_than, at_most, fewer_than] = phrases;
        match (self.limit, self.exclusive) {
            (Limit::Min, false) => at_least,
            (Limit::Min, true) => more_than,
            (Limit::Max, false) => at_most,
            (Limit::Max, true) => fewer_than,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{number, string};

    #[test]
    fn optional_is_idempotent() {
        let once = string().optional();
        let twice = string().optional().optional();
        assert!(once.is_optional());
        assert!(twice.is_optional());
        assert!(matches!(&twice.kind, SchemaKind::Optional(inner) if !inner.is_optional()));
    }

    #[test]
    fn nullable_is_idempotent() {
        let twice = number().nullable().nullable();
        assert!(matches!(&twice.kind, SchemaKind::Nullable(inner) if !inner.is_nullable()));
    }

    #[test]
    fn required_unwraps_one_level() {
        let schema = string().optional().required();
        assert_eq!(schema.kind_name(), "string");

        let untouched = string().into_schema().required();
        assert_eq!(untouched.kind_name(), "string");
    }

    #[test]
    fn combinators_leave_receiver_untouched() {
        let base = string();
        let refined = base.clone().min(3);
        assert!(base.parse("ab").is_ok());
        assert!(refined.parse("ab").is_err());
    }

    #[test]
    fn bound_accepts_by_exclusivity() {
        assert!(Bound::min(5.0, false).accepts(5.0));
        assert!(!Bound::min(5.0, true).accepts(5.0));
        assert!(Bound::max(5.0, false).accepts(5.0));
        assert!(!Bound::max(5.0, true).accepts(5.0));
        assert!(!Bound::max(5.0, false).accepts(6.0));
    }

    #[test]
    fn checks_are_skipped_after_type_failure() {
        let schema = number().ensure(|_, ctx| {
            ctx.add_error(
                IssueKind::InvalidExactValue {
                    expected: Value::Undefined,
                    received: Value::Undefined,
                },
                "check ran",
            );
        });
        let err = schema.parse("nope").unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].code(), "invalid_type");
    }

    #[test]
    fn default_is_validated() {
        let schema = number().default("not a number");
        assert!(schema.parse(Value::Undefined).is_err());

        let schema = number().default(4);
        assert_eq!(schema.parse(Value::Undefined).unwrap(), Value::Number(4.0));
    }

    #[test]
    fn default_supplier_runs_per_parse() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let schema = number().default_with(move || {
            Value::from(counter.fetch_add(1, Ordering::SeqCst) as f64)
        });
        assert_eq!(schema.parse(Value::Undefined).unwrap(), Value::Number(0.0));
        assert_eq!(schema.parse(Value::Undefined).unwrap(), Value::Number(1.0));
        assert_eq!(schema.parse(7).unwrap(), Value::Number(7.0));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn schemas_are_shareable_across_threads() {
        let schema = Arc::new(string().min(2).into_schema());
        std::thread::scope(|scope| {
            for input in ["ok", "x", "fine"] {
                let schema = Arc::clone(&schema);
                scope.spawn(move || {
                    let result = schema.safe_parse(input);
                    assert_eq!(result.is_valid(), input.len() >= 2);
                });
            }
        });
    }
}
