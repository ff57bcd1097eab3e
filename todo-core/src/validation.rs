//! Validation pass for todo writes.
//!
//! Request bodies arrive as a loosely typed [`TodoPayload`] so that every
//! field can be checked on its own and all violations reported together.
//! Each field has one validator; [`validate_create`] and [`validate_update`]
//! compose them into a typed [`NewTodo`] or [`TodoPatch`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{NewTodo, TodoPatch, TodoPriority, TodoStatus};

pub const TITLE_MAX_CHARS: usize = 255;

/// Raw write body. An absent key deserializes to `None`, an explicit `null`
/// to `Some(Value::Null)`, so updates can tell "leave alone" from "clear".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPayload {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub priority: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Every violation found by one validation pass, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    pub fn push(&mut self, violation: FieldViolation) {
        self.violations.push(violation);
    }

    /// Messages grouped by field name, the shape used in 422 bodies.
    pub fn by_field(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for violation in &self.violations {
            map.entry(violation.field.clone())
                .or_default()
                .push(violation.message.clone());
        }
        map
    }

    pub fn from_field_map(map: BTreeMap<String, Vec<String>>) -> Self {
        let violations = map
            .into_iter()
            .flat_map(|(field, messages)| {
                messages
                    .into_iter()
                    .map(move |message| FieldViolation::new(&field, message))
            })
            .collect();
        Self { violations }
    }

    fn check<T>(&mut self, result: Result<T, FieldViolation>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(violation) => {
                self.push(violation);
                None
            }
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.split_first() {
            None => f.write_str("the given data was invalid"),
            Some((first, [])) => f.write_str(&first.message),
            Some((first, rest)) => {
                let noun = if rest.len() == 1 { "error" } else { "errors" };
                write!(f, "{} (and {} more {noun})", first.message, rest.len())
            }
        }
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Optional,
}

/// Trimmed string content of a nullable text value. Blank strings count as
/// absent.
fn text(field: &str, value: &Value) -> Result<Option<String>, FieldViolation> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        _ => Err(FieldViolation::new(field, format!("{field} must be a string"))),
    }
}

fn validate_title(
    value: Option<&Value>,
    presence: Presence,
) -> Result<Option<String>, FieldViolation> {
    let Some(value) = value else {
        return match presence {
            Presence::Required => Err(FieldViolation::new("title", "title is required")),
            Presence::Optional => Ok(None),
        };
    };
    let title = text("title", value)?
        .ok_or_else(|| FieldViolation::new("title", "title is required"))?;
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(FieldViolation::new(
            "title",
            format!("title may not be longer than {TITLE_MAX_CHARS} characters"),
        ));
    }
    Ok(Some(title))
}

fn validate_description(value: Option<&Value>) -> Result<Option<Option<String>>, FieldViolation> {
    value.map(|value| text("description", value)).transpose()
}

fn validate_choice<T>(
    field: &str,
    value: Option<&Value>,
    presence: Presence,
    allowed: &[&str],
) -> Result<Option<T>, FieldViolation>
where
    T: FromStr,
{
    let invalid = || {
        FieldViolation::new(
            field,
            format!("{field} must be one of: {}", allowed.join(", ")),
        )
    };
    match value {
        None if presence == Presence::Required => {
            Err(FieldViolation::new(field, format!("{field} is required")))
        }
        None => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<T>().map(Some).map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

fn validate_status(
    value: Option<&Value>,
    presence: Presence,
) -> Result<Option<TodoStatus>, FieldViolation> {
    let allowed = TodoStatus::ALL.map(TodoStatus::as_str);
    validate_choice("status", value, presence, &allowed)
}

fn validate_priority(
    value: Option<&Value>,
    presence: Presence,
) -> Result<Option<TodoPriority>, FieldViolation> {
    let allowed = TodoPriority::ALL.map(TodoPriority::as_str);
    validate_choice("priority", value, presence, &allowed)
}

/// Accepts `YYYY-MM-DD`, or an RFC 3339 timestamp whose calendar date is kept.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(input).ok().map(|dt| dt.date_naive()))
}

fn validate_due_date(value: Option<&Value>) -> Result<Option<Option<NaiveDate>>, FieldViolation> {
    let Some(value) = value else {
        return Ok(None);
    };
    match text("dueDate", value)? {
        None => Ok(Some(None)),
        Some(raw) => parse_date(&raw).map(|date| Some(Some(date))).ok_or_else(|| {
            FieldViolation::new("dueDate", "dueDate must be a valid date (YYYY-MM-DD)")
        }),
    }
}

pub fn validate_create(payload: &TodoPayload) -> Result<NewTodo, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let title = errors
        .check(validate_title(payload.title.as_ref(), Presence::Required))
        .flatten();
    let description = errors
        .check(validate_description(payload.description.as_ref()))
        .flatten()
        .flatten();
    let status = errors
        .check(validate_status(payload.status.as_ref(), Presence::Required))
        .flatten();
    let priority = errors
        .check(validate_priority(payload.priority.as_ref(), Presence::Required))
        .flatten();
    let due_date = errors
        .check(validate_due_date(payload.due_date.as_ref()))
        .flatten()
        .flatten();

    match (title, status, priority) {
        (Some(title), Some(status), Some(priority)) if errors.is_empty() => Ok(NewTodo {
            title,
            description,
            status,
            priority,
            due_date,
        }),
        _ => Err(errors),
    }
}

pub fn validate_update(payload: &TodoPayload) -> Result<TodoPatch, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let patch = TodoPatch {
        title: errors
            .check(validate_title(payload.title.as_ref(), Presence::Optional))
            .flatten(),
        description: errors
            .check(validate_description(payload.description.as_ref()))
            .flatten(),
        status: errors
            .check(validate_status(payload.status.as_ref(), Presence::Optional))
            .flatten(),
        priority: errors
            .check(validate_priority(payload.priority.as_ref(), Presence::Optional))
            .flatten(),
        due_date: errors
            .check(validate_due_date(payload.due_date.as_ref()))
            .flatten(),
    };

    if errors.is_empty() { Ok(patch) } else { Err(errors) }
}
