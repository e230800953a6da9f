//! Schema validation with a single repair pass.
//!
//! ```text
//! value ──► check ──ok──► deserialize ──► T
//!             │ violations
//!             ▼
//!     clone + repair ──► check ──ok──► deserialize ──► T   (warn: repaired)
//!                          │ violations
//!                          ▼
//!                     SchemaError { path: message, ... }
//! ```
//!
//! A [`Schema`] describes its contract twice: `check` walks a JSON value and
//! records every unmet constraint by dotted path, and `repair` fills in
//! missing fields with conservative defaults. Repair only ever touches fields
//! that are absent or `null`. A value that is present but wrong (an unknown
//! ratio, a string that is too short) is left alone and fails the second
//! check, so the error names the field.
//!
//! Validation is a pure function of its input: the caller's value is never
//! mutated.

pub mod content_plan;
pub mod director;
pub mod market;
pub mod strategy;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::{ClassifiedError, ErrorKind, FieldViolation};
use crate::locale::Language;

pub use content_plan::{ContentItem, ContentPlan, ItemType, Ratio};
pub use director::{DirectorOutput, MarketingRoute, ProductAnalysis, PromptData};
pub use market::{BuyerPersona, Competitor, MarketAnalysis, MarketPositioning, ProductCoreValue};
pub use strategy::{ContentStrategy, ContentTopic, InteractiveElement, SeoGuidance};

/// A structured result type with a checkable, repairable JSON contract.
pub trait Schema: DeserializeOwned + Serialize {
    /// Name used in logs and error messages.
    const NAME: &'static str;

    /// Record every unmet constraint in `value`.
    fn check(value: &Value, violations: &mut Violations);

    /// Fill missing fields with their documented defaults.
    fn repair(value: &mut Value);
}

/// Validation failed even after the repair pass.
#[derive(Debug, Clone, Error)]
#[error("{result_type} failed validation: {}", summarize(.violations))]
pub struct SchemaError {
    pub result_type: &'static str,
    pub violations: Vec<FieldViolation>,
}

impl SchemaError {
    /// Convert into a Validation error carrying the violations.
    pub fn classify(self, language: Language) -> ClassifiedError {
        let technical = self.to_string();
        ClassifiedError::new(ErrorKind::Validation, technical, language)
            .with_violations(self.violations)
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate `value` as `S`, attempting one repair pass on failure.
pub fn validate<S: Schema>(value: &Value) -> Result<S, SchemaError> {
    let first = violations_of::<S>(value);
    if first.is_empty() {
        return deserialize(value);
    }
    debug!(
        result_type = S::NAME,
        violations = first.len(),
        "strict validation failed; attempting repair"
    );

    let mut repaired = value.clone();
    S::repair(&mut repaired);

    let second = violations_of::<S>(&repaired);
    if second.is_empty() {
        warn!(
            result_type = S::NAME,
            repaired = first.len(),
            "validation failed; repaired response format"
        );
        return deserialize(&repaired);
    }

    warn!(
        result_type = S::NAME,
        violations = second.len(),
        "validation failed after repair"
    );
    Err(SchemaError {
        result_type: S::NAME,
        violations: second.into_vec(),
    })
}

/// Strict check only, no repair.
pub fn check<S: Schema>(value: &Value) -> Result<(), SchemaError> {
    let violations = violations_of::<S>(value);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError {
            result_type: S::NAME,
            violations: violations.into_vec(),
        })
    }
}

fn violations_of<S: Schema>(value: &Value) -> Violations {
    let mut violations = Violations::default();
    S::check(value, &mut violations);
    violations
}

fn deserialize<S: Schema>(value: &Value) -> Result<S, SchemaError> {
    serde_json::from_value(value.clone()).map_err(|err| SchemaError {
        result_type: S::NAME,
        violations: vec![FieldViolation::new("", err.to_string())],
    })
}

/// Length bounds, counted in characters for strings and items for arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Len {
    pub min: usize,
    pub max: Option<usize>,
}

impl Len {
    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    pub const ANY: Len = Len::at_least(0);
    pub const NON_EMPTY: Len = Len::at_least(1);
}

/// Dotted path of a child field.
pub fn join(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

/// Absent and `null` are both "missing".
pub fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|value| !value.is_null())
}

/// Collector for path-qualified constraint failures.
#[derive(Debug, Default)]
pub struct Violations {
    items: Vec<FieldViolation>,
}

impl Violations {
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.items.push(FieldViolation::new(path, message));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<FieldViolation> {
        self.items
    }

    /// The value at `path` must be an object.
    pub fn root<'a>(&mut self, value: &'a Value, path: &str) -> Option<&'a Map<String, Value>> {
        match value.as_object() {
            Some(map) => Some(map),
            None => {
                self.push(path, "expected object");
                None
            }
        }
    }

    pub fn object<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        base: &str,
        key: &str,
    ) -> Option<&'a Map<String, Value>> {
        let path = join(base, key);
        match present(obj, key) {
            None => {
                self.push(path, "required");
                None
            }
            Some(value) => self.root(value, &path),
        }
    }

    pub fn string(&mut self, obj: &Map<String, Value>, base: &str, key: &str, len: Len) {
        let path = join(base, key);
        match present(obj, key) {
            None => self.push(path, "required"),
            Some(value) => self.string_value(value, &path, len),
        }
    }

    pub fn optional_string(&mut self, obj: &Map<String, Value>, base: &str, key: &str, len: Len) {
        if let Some(value) = present(obj, key) {
            self.string_value(value, &join(base, key), len);
        }
    }

    pub fn string_value(&mut self, value: &Value, path: &str, len: Len) {
        let Some(text) = value.as_str() else {
            self.push(path, "expected string");
            return;
        };
        let count = text.chars().count();
        if count < len.min {
            self.push(path, format!("must be at least {} characters", len.min));
        } else if let Some(max) = len.max.filter(|max| count > *max) {
            self.push(path, format!("must be at most {max} characters"));
        }
    }

    pub fn one_of(&mut self, obj: &Map<String, Value>, base: &str, key: &str, allowed: &[&str]) {
        let path = join(base, key);
        match present(obj, key) {
            None => self.push(path, "required"),
            Some(Value::String(s)) if allowed.contains(&s.as_str()) => {}
            Some(Value::String(s)) => self.push(
                path,
                format!("invalid value '{s}', expected one of {}", allowed.join(", ")),
            ),
            Some(_) => self.push(path, "expected string"),
        }
    }

    /// Check an array's cardinality and hand back its items for per-item checks.
    pub fn array<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        base: &str,
        key: &str,
        len: Len,
    ) -> Option<&'a [Value]> {
        let path = join(base, key);
        let Some(value) = present(obj, key) else {
            self.push(path, "required");
            return None;
        };
        let Some(items) = value.as_array() else {
            self.push(path, "expected array");
            return None;
        };
        if items.len() < len.min {
            self.push(path, format!("must contain at least {} items", len.min));
        } else if let Some(max) = len.max.filter(|max| items.len() > *max) {
            self.push(path, format!("must contain at most {max} items"));
        }
        Some(items)
    }

    pub fn string_array(
        &mut self,
        obj: &Map<String, Value>,
        base: &str,
        key: &str,
        count: Len,
        item: Len,
    ) {
        let path = join(base, key);
        if let Some(items) = self.array(obj, base, key, count) {
            for (idx, value) in items.iter().enumerate() {
                self.string_value(value, &join(&path, &idx.to_string()), item);
            }
        }
    }
}

/// Repair helpers. Each one fills a field only when it is missing.
pub mod fill {
    use serde_json::{Map, Value};

    use super::present;

    pub fn default(obj: &mut Map<String, Value>, key: &str, value: Value) {
        if present(obj, key).is_none() {
            obj.insert(key.to_string(), value);
        }
    }

    pub fn string(obj: &mut Map<String, Value>, key: &str, value: impl Into<String>) {
        default(obj, key, Value::String(value.into()))
    }

    pub fn array(obj: &mut Map<String, Value>, key: &str) {
        default(obj, key, Value::Array(Vec::new()))
    }

    /// Ensure `key` holds an object and return it for further filling.
    /// A present non-object is left alone.
    pub fn object<'a>(obj: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
        default(obj, key, Value::Object(Map::new()));
        obj.get_mut(key).and_then(Value::as_object_mut)
    }

    /// Object items of the array under `key`, with their positions.
    pub fn items<'a>(
        obj: &'a mut Map<String, Value>,
        key: &str,
    ) -> impl Iterator<Item = (usize, &'a mut Map<String, Value>)> {
        obj.get_mut(key)
            .and_then(Value::as_array_mut)
            .into_iter()
            .flat_map(|items| items.iter_mut().enumerate())
            .filter_map(|(idx, item)| item.as_object_mut().map(|map| (idx, map)))
    }
}
