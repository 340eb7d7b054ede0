//! Declarative form validation.

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A submitted form field value.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// String form used for the required and pattern checks.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            // Integral values print without a fraction; past 2^53 `as i64` would saturate.
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                format!("{}", *n as i64)
            }
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }

    /// Whether the non-required checks apply to this value.
    fn is_present(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Text(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Length in characters; only text has one.
    fn char_len(&self) -> Option<usize> {
        match self {
            FieldValue::Text(s) => Some(s.chars().count()),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Submitted form data keyed by field name.
pub type FormData = HashMap<String, FieldValue>;

static MISSING: FieldValue = FieldValue::Null;

type CustomCheck = Arc<dyn Fn(&FieldValue) -> Option<String> + Send + Sync>;

/// Rules for a single field.
///
/// Length, pattern and custom checks only run when the field holds a
/// non-empty value; an empty or missing value can only fail `required`.
#[derive(Clone, Default)]
pub struct FieldRule {
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
    pattern_message: Option<String>,
    custom: Option<CustomCheck>,
}

impl FieldRule {
    /// A rule with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `FieldRule::new().required()`.
    pub fn mandatory() -> Self {
        Self::new().required()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Message used instead of "<field> format is invalid".
    pub fn pattern_message(mut self, message: impl Into<String>) -> Self {
        self.pattern_message = Some(message.into());
        self
    }

    /// A predicate returning an error message, or `None` when the value is fine.
    pub fn custom<F>(mut self, check: F) -> Self
    where
        F: Fn(&FieldValue) -> Option<String> + Send + Sync + 'static,
    {
        self.custom = Some(Arc::new(check));
        self
    }

    /// Errors for one field, in check order.
    fn check(&self, field: &str, value: Option<&FieldValue>) -> Vec<String> {
        let mut errors = Vec::new();
        let value = value.unwrap_or(&MISSING);

        if self.required && value.to_text().trim().is_empty() {
            errors.push(format!("{} is required", field));
        }

        if !value.is_present() {
            return errors;
        }

        if let (Some(min), Some(len)) = (self.min_length, value.char_len()) {
            if len < min {
                errors.push(format!("{} must be at least {} characters", field, min));
            }
        }

        if let (Some(max), Some(len)) = (self.max_length, value.char_len()) {
            if len > max {
                errors.push(format!("{} must not exceed {} characters", field, max));
            }
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&value.to_text()) {
                errors.push(
                    self.pattern_message
                        .clone()
                        .unwrap_or_else(|| format!("{} format is invalid", field)),
                );
            }
        }

        if let Some(custom) = &self.custom {
            if let Some(message) = custom(value) {
                errors.push(message);
            }
        }

        errors
    }
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("required", &self.required)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("pattern", &self.pattern.as_ref().map(Regex::as_str))
            .field("pattern_message", &self.pattern_message)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

/// Field rules in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(String, FieldRule)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add rules for `field`. Redeclaring a field replaces its rules but
    /// keeps its original position.
    pub fn field(mut self, field: impl Into<String>, rule: FieldRule) -> Self {
        let field = field.into();
        match self.rules.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = rule,
            None => self.rules.push((field, rule)),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }
}

/// Per-field errors from [`validate_form`].
///
/// Fields appear in rule declaration order; fields without errors are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValidation {
    fields: Vec<(String, Vec<String>)>,
}

impl FormValidation {
    /// True when no field has errors.
    pub fn is_valid(&self) -> bool {
        self.fields.is_empty()
    }

    /// Errors for one field, if it has any.
    pub fn errors_for(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, errors)| errors.as_slice())
    }

    /// Fields with errors, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, errors)| (name.as_str(), errors.as_slice()))
    }

    /// Number of fields with errors.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for FormValidation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Errors<'a>(&'a [(String, Vec<String>)]);

        impl Serialize for Errors<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (field, errors) in self.0 {
                    map.serialize_entry(field, errors)?;
                }
                map.end()
            }
        }

        let mut state = serializer.serialize_struct("FormValidation", 2)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.serialize_field("errors", &Errors(&self.fields))?;
        state.end()
    }
}

/// Check `data` against every field in `rules`.
pub fn validate_form(data: &FormData, rules: &RuleSet) -> FormValidation {
    let fields = rules
        .iter()
        .filter_map(|(field, rule)| {
            let errors = rule.check(field, data.get(field));
            (!errors.is_empty()).then(|| (field.to_string(), errors))
        })
        .collect();

    FormValidation { fields }
}
