//! Property type capabilities.
//!
//! Every property format is one small type implementing [`PropertyType`].
//! The composition root builds a [`PropertyTypeRegistry`] and hands it to
//! whatever needs to resolve type names.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::{CoreError, Result};
use crate::types::{Value, ValueType};

/// Behaviour shared by all property formats.
pub trait PropertyType: Send + Sync {
    /// Name used by statements and schemas, e.g. `"url"`.
    fn type_name(&self) -> &'static str;

    /// Kind of value this property holds.
    fn value_type(&self) -> ValueType;

    /// Check that a value is well-formed for this type.
    fn validate(&self, value: &Value) -> Result<()> {
        expect_kind(self.type_name(), self.value_type(), value)
    }

    /// Value a new statement of this type starts with.
    fn default_value(&self) -> Value {
        match self.value_type() {
            ValueType::String => Value::String(Vec::new()),
            ValueType::Number => Value::Number(0.0),
            ValueType::Boolean => Value::Boolean(false),
            ValueType::Relation => Value::Relation(Vec::new()),
        }
    }

    fn is_relation(&self) -> bool {
        self.value_type() == ValueType::Relation
    }
}

/// Resolves a type name to its capabilities.
pub trait PropertyTypeLookup: Send + Sync {
    fn property_type(&self, type_name: &str) -> Option<&dyn PropertyType>;
}

fn expect_kind(type_name: &str, expected: ValueType, value: &Value) -> Result<()> {
    if value.value_type() == expected {
        Ok(())
    } else {
        Err(invalid(
            type_name,
            format!("expected {expected:?} value, got {:?}", value.value_type()),
        ))
    }
}

fn invalid(type_name: &str, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidValue {
        type_name: type_name.to_string(),
        reason: reason.into(),
    }
}

/// Apply `check` to every part of a string value.
fn validate_parts(
    type_name: &'static str,
    value: &Value,
    check: impl Fn(&str) -> bool,
) -> Result<()> {
    expect_kind(type_name, ValueType::String, value)?;
    if let Value::String(parts) = value {
        if let Some(bad) = parts.iter().find(|p| !check(p)) {
            return Err(invalid(type_name, format!("malformed part {bad:?}")));
        }
    }
    Ok(())
}

// ── Formats ───────────────────────────────────────────────────────

pub struct TextType;

impl PropertyType for TextType {
    fn type_name(&self) -> &'static str {
        "text"
    }

    fn value_type(&self) -> ValueType {
        ValueType::String
    }
}

pub struct UrlType;

impl PropertyType for UrlType {
    fn type_name(&self) -> &'static str {
        "url"
    }

    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn validate(&self, value: &Value) -> Result<()> {
        validate_parts(self.type_name(), value, |p| {
            let rest = p
                .strip_prefix("https://")
                .or_else(|| p.strip_prefix("http://"));
            matches!(rest, Some(host) if !host.is_empty())
        })
    }
}

pub struct EmailType;

impl PropertyType for EmailType {
    fn type_name(&self) -> &'static str {
        "email"
    }

    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn validate(&self, value: &Value) -> Result<()> {
        validate_parts(self.type_name(), value, |p| match p.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.'),
            None => false,
        })
    }
}

pub struct NumberType;

impl PropertyType for NumberType {
    fn type_name(&self) -> &'static str {
        "number"
    }

    fn value_type(&self) -> ValueType {
        ValueType::Number
    }

    fn validate(&self, value: &Value) -> Result<()> {
        match value {
            Value::Number(n) if n.is_finite() => Ok(()),
            Value::Number(_) => Err(invalid(self.type_name(), "number is not finite")),
            other => expect_kind(self.type_name(), ValueType::Number, other),
        }
    }
}

pub struct BooleanType;

impl PropertyType for BooleanType {
    fn type_name(&self) -> &'static str {
        "boolean"
    }

    fn value_type(&self) -> ValueType {
        ValueType::Boolean
    }
}

/// Calendar date stored as `YYYY-MM-DD`.
pub struct DateType;

impl PropertyType for DateType {
    fn type_name(&self) -> &'static str {
        "date"
    }

    fn value_type(&self) -> ValueType {
        ValueType::String
    }

    fn validate(&self, value: &Value) -> Result<()> {
        validate_parts(self.type_name(), value, |p| {
            NaiveDate::parse_from_str(p, "%Y-%m-%d").is_ok()
        })
    }
}

pub struct SelectType;

impl PropertyType for SelectType {
    fn type_name(&self) -> &'static str {
        "select"
    }

    fn value_type(&self) -> ValueType {
        ValueType::String
    }
}

pub struct RelationPropertyType;

impl PropertyType for RelationPropertyType {
    fn type_name(&self) -> &'static str {
        "relation"
    }

    fn value_type(&self) -> ValueType {
        ValueType::Relation
    }
}

// ── Registry ──────────────────────────────────────────────────────

/// Explicitly constructed set of known property types.
#[derive(Default)]
pub struct PropertyTypeRegistry {
    types: HashMap<&'static str, Box<dyn PropertyType>>,
}

impl PropertyTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every built-in format.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(TextType));
        registry.register(Box::new(UrlType));
        registry.register(Box::new(EmailType));
        registry.register(Box::new(NumberType));
        registry.register(Box::new(BooleanType));
        registry.register(Box::new(DateType));
        registry.register(Box::new(SelectType));
        registry.register(Box::new(RelationPropertyType));
        registry
    }

    /// Register a type, replacing any previous type of the same name.
    pub fn register(&mut self, property_type: Box<dyn PropertyType>) {
        self.types.insert(property_type.type_name(), property_type);
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl PropertyTypeLookup for PropertyTypeRegistry {
    fn property_type(&self, type_name: &str) -> Option<&dyn PropertyType> {
        self.types.get(type_name).map(|t| t.as_ref())
    }
}
