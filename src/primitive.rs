//! String, number, boolean and date schemas.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::context::{ParseResult, ValidationContext};
use crate::error::IssueKind;
use crate::schema::{Bound, Schema, SchemaBase, SchemaKind, Schematic};
use crate::types::{date_from_millis, format_date, format_number, Value};

const EMAIL_PATTERN: &str =
    r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

// =============================================================================
// String
// =============================================================================

/// Normalization applied to a string right after its type check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Normalize {
    Trim,
    Lowercase,
    Uppercase,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StringRules {
    normalize: Vec<Normalize>,
}

impl StringRules {
    fn apply(&self, mut text: String) -> String {
        for step in &self.normalize {
            text = match step {
                Normalize::Trim => text.trim().to_string(),
                Normalize::Lowercase => text.to_lowercase(),
                Normalize::Uppercase => text.to_uppercase(),
            };
        }
        text
    }
}

/// Schema for string values.
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    rules: StringRules,
    base: SchemaBase,
}

/// Create a string schema.
pub fn string() -> StringSchema {
    Default::default()
}

impl StringSchema {
    /// Require exactly `n` characters.
    pub fn length(self, n: usize) -> Self {
        self.ensure(move |value, ctx| {
            let Some(text) = value.as_str() else { return };
            let actual = text.chars().count();
            if actual != n {
                ctx.add_error(
                    IssueKind::InvalidExactValue {
                        expected: Value::from(n),
                        received: Value::from(actual),
                    },
                    format!("String must contain exactly {} character(s)", n),
                );
            }
        })
    }

    /// Require at least `n` characters.
    pub fn min(self, n: usize) -> Self {
        self.length_bound(Bound::min(n as f64, false))
    }

    /// Require more than `n` characters.
    pub fn min_exclusive(self, n: usize) -> Self {
        self.length_bound(Bound::min(n as f64, true))
    }

    /// Require at most `n` characters.
    pub fn max(self, n: usize) -> Self {
        self.length_bound(Bound::max(n as f64, false))
    }

    /// Require fewer than `n` characters.
    pub fn max_exclusive(self, n: usize) -> Self {
        self.length_bound(Bound::max(n as f64, true))
    }

    /// Require at least one character.
    pub fn nonempty(self) -> Self {
        self.min(1)
    }

    fn length_bound(self, bound: Bound) -> Self {
        self.ensure(move |value, ctx| {
            let Some(text) = value.as_str() else { return };
            let actual = text.chars().count();
            if !bound.accepts(actual as f64) {
                let phrase = bound.phrase(["at least", "more than", "at most", "fewer than"]);
                bound.report(
                    ctx,
                    Value::Number(bound.value),
                    Value::from(actual),
                    format!(
                        "String must contain {} {} character(s)",
                        phrase,
                        format_number(bound.value)
                    ),
                );
            }
        })
    }

    /// Require a match of `pattern` somewhere in the string.
    pub fn pattern(self, pattern: Regex) -> Self {
        self.ensure(move |value, ctx| {
            let Some(text) = value.as_str() else { return };
            if !pattern.is_match(text) {
                ctx.add_error(
                    IssueKind::InvalidExactValue {
                        expected: Value::from(pattern.as_str()),
                        received: value.clone(),
                    },
                    format!("String must match pattern {}", pattern.as_str()),
                );
            }
        })
    }

    pub fn starts_with(self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.substring_check(prefix, "start with", |text, p| text.starts_with(p))
    }

    pub fn ends_with(self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.substring_check(suffix, "end with", |text, s| text.ends_with(s))
    }

    pub fn includes(self, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        self.substring_check(needle, "include", |text, n| text.contains(n))
    }

    fn substring_check(
        self,
        expected: String,
        verb: &'static str,
        accepts: fn(&str, &str) -> bool,
    ) -> Self {
        self.ensure(move |value, ctx| {
            let Some(text) = value.as_str() else { return };
            if !accepts(text, &expected) {
                ctx.add_error(
                    IssueKind::InvalidExactValue {
                        expected: Value::from(expected.as_str()),
                        received: value.clone(),
                    },
                    format!("String must {} \"{}\"", verb, expected),
                );
            }
        })
    }

    /// Require an email address.
    pub fn email(self) -> Self {
        self.ensure(|value, ctx| {
            let Some(text) = value.as_str() else { return };
            if !email_regex().is_match(text) {
                ctx.add_error(
                    IssueKind::InvalidExactValue {
                        expected: Value::from("email"),
                        received: value.clone(),
                    },
                    "Invalid email",
                );
            }
        })
    }

    /// Strip leading and trailing whitespace before refinements run.
    pub fn trim(mut self) -> Self {
        self.rules.normalize.push(Normalize::Trim);
        self
    }

    pub fn to_lowercase(mut self) -> Self {
        self.rules.normalize.push(Normalize::Lowercase);
        self
    }

    pub fn to_uppercase(mut self) -> Self {
        self.rules.normalize.push(Normalize::Uppercase);
        self
    }
}

impl Schematic for StringSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl From<StringSchema> for Schema {
    fn from(schema: StringSchema) -> Self {
        Schema {
            kind: SchemaKind::String(schema.rules),
            base: schema.base,
        }
    }
}

pub(crate) fn parse_string(
    rules: &StringRules,
    base: &SchemaBase,
    value: Value,
    ctx: &mut ValidationContext,
) -> ParseResult {
    let value = match value {
        Value::String(_) => value,
        other if base.coerce => Value::String(other.to_display_string()),
        other => other,
    };
    match value {
        Value::String(text) => ParseResult::Valid(Value::String(rules.apply(text))),
        other => {
            ctx.invalid_type("string", &other, base.type_message());
            ParseResult::Invalid
        }
    }
}

// =============================================================================
// Number
// =============================================================================

/// Schema for numeric values. NaN is always rejected.
#[derive(Debug, Clone, Default)]
pub struct NumberSchema {
    base: SchemaBase,
}

/// Create a number schema.
pub fn number() -> NumberSchema {
    Default::default()
}

impl NumberSchema {
    pub fn min(self, n: f64) -> Self {
        self.bound(Bound::min(n, false))
    }

    pub fn min_exclusive(self, n: f64) -> Self {
        self.bound(Bound::min(n, true))
    }

    pub fn max(self, n: f64) -> Self {
        self.bound(Bound::max(n, false))
    }

    pub fn max_exclusive(self, n: f64) -> Self {
        self.bound(Bound::max(n, true))
    }

    /// Strictly greater than zero.
    pub fn positive(self) -> Self {
        self.min_exclusive(0.0)
    }

    /// Strictly less than zero.
    pub fn negative(self) -> Self {
        self.max_exclusive(0.0)
    }

    /// Zero or greater.
    pub fn nonnegative(self) -> Self {
        self.min(0.0)
    }

    /// Reject values with a fractional part.
    pub fn int(self) -> Self {
        self.ensure(|value, ctx| {
            let Some(n) = value.as_f64() else { return };
            if n.fract() != 0.0 || !n.is_finite() {
                ctx.add_error(
                    IssueKind::InvalidType {
                        expected: "integer".to_string(),
                        received: "float".to_string(),
                    },
                    "Expected integer but received float",
                );
            }
        })
    }

    fn bound(self, bound: Bound) -> Self {
        self.ensure(move |value, ctx| {
            let Some(n) = value.as_f64() else { return };
            if !bound.accepts(n) {
                let phrase = bound.phrase([
                    "greater than or equal to",
                    "greater than",
                    "less than or equal to",
                    "less than",
                ]);
                bound.report(
                    ctx,
                    Value::Number(bound.value),
                    value.clone(),
                    format!("Number must be {} {}", phrase, format_number(bound.value)),
                );
            }
        })
    }
}

impl Schematic for NumberSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl From<NumberSchema> for Schema {
    fn from(schema: NumberSchema) -> Self {
        Schema {
            kind: SchemaKind::Number,
            base: schema.base,
        }
    }
}

fn coerce_number(value: Value) -> Value {
    match value {
        Value::String(text) => {
            let parsed = text.trim().parse::<f64>().ok().filter(|n| n.is_finite());
            Value::Number(parsed.unwrap_or(f64::NAN))
        }
        Value::Bool(b) => Value::Number(if b { 1.0 } else { 0.0 }),
        other => other,
    }
}

pub(crate) fn parse_number(base: &SchemaBase, value: Value, ctx: &mut ValidationContext) -> ParseResult {
    let value = if base.coerce { coerce_number(value) } else { value };
    match value {
        Value::Number(n) if !n.is_nan() => ParseResult::Valid(Value::Number(n)),
        other => {
            ctx.invalid_type("number", &other, base.type_message());
            ParseResult::Invalid
        }
    }
}

// =============================================================================
// Boolean
// =============================================================================

/// Schema for boolean values.
#[derive(Debug, Clone, Default)]
pub struct BooleanSchema {
    base: SchemaBase,
}

/// Create a boolean schema.
pub fn boolean() -> BooleanSchema {
    Default::default()
}

impl Schematic for BooleanSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl From<BooleanSchema> for Schema {
    fn from(schema: BooleanSchema) -> Self {
        Schema {
            kind: SchemaKind::Boolean,
            base: schema.base,
        }
    }
}

fn coerce_boolean(value: Value) -> Value {
    match value {
        Value::String(text) if text.eq_ignore_ascii_case("true") => Value::Bool(true),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Value::Bool(false),
        Value::Number(n) if n == 1.0 => Value::Bool(true),
        Value::Number(n) if n == 0.0 => Value::Bool(false),
        other => other,
    }
}

pub(crate) fn parse_boolean(base: &SchemaBase, value: Value, ctx: &mut ValidationContext) -> ParseResult {
    let value = if base.coerce { coerce_boolean(value) } else { value };
    match value {
        Value::Bool(b) => ParseResult::Valid(Value::Bool(b)),
        other => {
            ctx.invalid_type("boolean", &other, base.type_message());
            ParseResult::Invalid
        }
    }
}

// =============================================================================
// Date
// =============================================================================

/// Something a date can be compared against.
pub trait DateBound {
    fn epoch_millis(&self) -> f64;
}

impl DateBound for DateTime<Utc> {
    fn epoch_millis(&self) -> f64 {
        self.timestamp_millis() as f64
    }
}

impl DateBound for i64 {
    fn epoch_millis(&self) -> f64 {
        *self as f64
    }
}

impl DateBound for f64 {
    fn epoch_millis(&self) -> f64 {
        *self
    }
}

/// Schema for date values.
#[derive(Debug, Clone, Default)]
pub struct DateSchema {
    base: SchemaBase,
}

/// Create a date schema.
pub fn date() -> DateSchema {
    Default::default()
}

impl DateSchema {
    pub fn min(self, bound: impl DateBound) -> Self {
        self.bound(Bound::min(bound.epoch_millis(), false))
    }

    pub fn min_exclusive(self, bound: impl DateBound) -> Self {
        self.bound(Bound::min(bound.epoch_millis(), true))
    }

    pub fn max(self, bound: impl DateBound) -> Self {
        self.bound(Bound::max(bound.epoch_millis(), false))
    }

    pub fn max_exclusive(self, bound: impl DateBound) -> Self {
        self.bound(Bound::max(bound.epoch_millis(), true))
    }

    fn bound(self, bound: Bound) -> Self {
        self.ensure(move |value, ctx| {
            let Some(date) = value.as_date() else { return };
            if bound.accepts(date.epoch_millis()) {
                return;
            }
            let phrase = bound.phrase([
                "greater than or equal to",
                "greater than",
                "less than or equal to",
                "less than",
            ]);
            // Bounds chrono cannot represent are reported as raw epoch millis.
            let (limit, shown) = match date_from_millis(bound.value) {
                Some(limit) => (Value::Date(limit), format_date(&limit)),
                None => (Value::Number(bound.value), format_number(bound.value)),
            };
            bound.report(
                ctx,
                limit,
                value.clone(),
                format!("Date must be {} {}", phrase, shown),
            );
        })
    }
}

impl Schematic for DateSchema {
    fn base_mut(&mut self) -> &mut SchemaBase {
        &mut self.base
    }
}

impl From<DateSchema> for Schema {
    fn from(schema: DateSchema) -> Self {
        Schema {
            kind: SchemaKind::Date,
            base: schema.base,
        }
    }
}

/// Parse a date string: RFC 3339, a bare `YYYY-MM-DD`, or a zone-less timestamp as UTC.
pub(crate) fn parse_date_str(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Run a value through the date constructor. `None` is an invalid instant.
fn construct_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Date(d) => Some(*d),
        Value::Number(n) => date_from_millis(*n),
        Value::String(text) => parse_date_str(text),
        Value::Bool(b) => date_from_millis(if *b { 1.0 } else { 0.0 }),
        Value::Null => date_from_millis(0.0),
        _ => None,
    }
}

pub(crate) fn parse_date(base: &SchemaBase, value: Value, ctx: &mut ValidationContext) -> ParseResult {
    if let Value::Date(d) = value {
        return ParseResult::Valid(Value::Date(d));
    }
    if !base.coerce || value.is_undefined() {
        ctx.invalid_type("date", &value, base.type_message());
        return ParseResult::Invalid;
    }
    match construct_date(&value) {
        Some(d) => ParseResult::Valid(Value::Date(d)),
        None => {
            ctx.add_error(
                IssueKind::InvalidType {
                    expected: "date".to_string(),
                    received: "invalid date".to_string(),
                },
                base.type_message().unwrap_or("Invalid date"),
            );
            ParseResult::Invalid
        }
    }
}
