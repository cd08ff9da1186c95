//! Field-level validation for incoming JSON bodies.
//!
//! Each record type reads its fields one by one through a [`FieldReader`],
//! which collects every problem it finds instead of stopping at the first.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_NULL: &str = "This field may not be null.";
pub const MSG_BLANK: &str = "This field may not be blank.";
pub const MSG_NOT_STRING: &str = "Not a valid string.";
pub const MSG_DATE_FORMAT: &str =
    "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

/// Validation errors keyed by field name.
///
/// Serializes as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Names of the fields with errors, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Whether absent fields are an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Create and full replace: every writable field must be present.
    Required,
    /// Partial update: only present fields are checked.
    Optional,
}

/// Message for a string longer than `max` characters.
#[must_use]
pub fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {max} characters.")
}

/// Message for a primary key that matches no record.
#[must_use]
pub fn missing_pk_message(pk: i64) -> String {
    format!("Invalid pk \"{pk}\" - object does not exist.")
}

/// Name of a JSON value's type, as reported in error messages.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Reads fields out of a JSON object, accumulating errors.
pub struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    presence: Presence,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    /// Start reading `body`, which must be a JSON object.
    ///
    /// # Errors
    ///
    /// Returns a `non_field_errors` entry if `body` is not an object.
    pub fn new(body: &'a Value, presence: Presence) -> Result<Self, FieldErrors> {
        let Value::Object(object) = body else {
            let mut errors = FieldErrors::new();
            errors.add(
                NON_FIELD_ERRORS,
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    type_name(body)
                ),
            );
            return Err(errors);
        };

        Ok(Self {
            object,
            presence,
            errors: FieldErrors::new(),
        })
    }

    /// Fetch a non-null value, recording missing/null errors.
    fn value(&mut self, field: &str) -> Option<&'a Value> {
        match self.object.get(field) {
            None => {
                if self.presence == Presence::Required {
                    self.errors.add(field, MSG_REQUIRED);
                }
                None
            }
            Some(Value::Null) => {
                self.errors.add(field, MSG_NULL);
                None
            }
            Some(value) => Some(value),
        }
    }

    /// Read a non-blank text field of at most `max_chars` characters.
    ///
    /// Surrounding whitespace is trimmed. Numbers are accepted and rendered
    /// as text.
    pub fn text(&mut self, field: &str, max_chars: usize) -> Option<String> {
        let text = match self.value(field)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => {
                self.errors.add(field, MSG_NOT_STRING);
                return None;
            }
        };

        if text.is_empty() {
            self.errors.add(field, MSG_BLANK);
            return None;
        }
        if text.chars().count() > max_chars {
            self.errors.add(field, max_length_message(max_chars));
            return None;
        }
        Some(text)
    }

    /// Read an ISO-8601 calendar date (`YYYY-MM-DD`).
    pub fn date(&mut self, field: &str) -> Option<NaiveDate> {
        let parsed = match self.value(field)? {
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(field, MSG_DATE_FORMAT);
        }
        parsed
    }

    /// Read a primary key reference: an integer or a numeric string.
    ///
    /// Existence of the referenced record is not checked here.
    pub fn pk(&mut self, field: &str) -> Option<i64> {
        let value = self.value(field)?;
        let parsed = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.errors.add(
                field,
                format!(
                    "Incorrect type. Expected pk value, received {}.",
                    type_name(value)
                ),
            );
        }
        parsed
    }

    /// Finish reading, returning the collected errors if there are any.
    ///
    /// # Errors
    ///
    /// Returns the accumulated field errors when at least one field failed.
    pub fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}
