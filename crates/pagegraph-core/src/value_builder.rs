//! Conversion of statement values into graph scalars.

use std::collections::HashMap;

use crate::types::{ScalarValue, Value};

/// Turns a value into the scalars stored on a graph node.
pub type ValueBuilder = Box<dyn Fn(&Value) -> Vec<ScalarValue> + Send + Sync>;

/// Builders keyed by property type name.
///
/// Relation-valued types are never registered: relations become edges.
#[derive(Default)]
pub struct ValueBuilderRegistry {
    builders: HashMap<String, ValueBuilder>,
}

impl ValueBuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with builders for every scalar-bearing built-in type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for type_name in ["text", "url", "email", "date", "select"] {
            registry.register_builder(type_name, Box::new(build_strings));
        }
        registry.register_builder("number", Box::new(build_number));
        registry.register_builder("boolean", Box::new(build_boolean));
        registry
    }

    pub fn register_builder(&mut self, type_name: impl Into<String>, builder: ValueBuilder) {
        self.builders.insert(type_name.into(), builder);
    }

    /// `None` when no builder exists for `type_name`.
    pub fn build_value(&self, type_name: &str, value: &Value) -> Option<Vec<ScalarValue>> {
        self.builders.get(type_name).map(|build| build(value))
    }

    pub fn has_builder(&self, type_name: &str) -> bool {
        self.builders.contains_key(type_name)
    }
}

fn build_strings(value: &Value) -> Vec<ScalarValue> {
    match value {
        Value::String(parts) => parts.iter().cloned().map(ScalarValue::String).collect(),
        _ => Vec::new(),
    }
}

fn build_number(value: &Value) -> Vec<ScalarValue> {
    match value {
        Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            vec![ScalarValue::Integer(*n as i64)]
        }
        Value::Number(n) => vec![ScalarValue::Float(*n)],
        _ => Vec::new(),
    }
}

fn build_boolean(value: &Value) -> Vec<ScalarValue> {
    match value {
        Value::Boolean(b) => vec![ScalarValue::Boolean(*b)],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_exclude_relation() {
        let registry = ValueBuilderRegistry::with_defaults();
        assert!(registry.has_builder("text"));
        assert!(registry.has_builder("number"));
        assert!(!registry.has_builder("relation"));
        assert_eq!(registry.build_value("relation", &Value::Relation(vec![])), None);
    }

    #[test]
    fn test_string_builder_keeps_every_part() {
        let registry = ValueBuilderRegistry::with_defaults();
        let built = registry
            .build_value("url", &Value::string(["https://a.example", "https://b.example"]))
            .unwrap();
        assert_eq!(
            built,
            vec![
                ScalarValue::from("https://a.example"),
                ScalarValue::from("https://b.example")
            ]
        );
    }

    #[test]
    fn test_number_builder() {
        let registry = ValueBuilderRegistry::with_defaults();
        assert_eq!(
            registry.build_value("number", &Value::Number(42.0)),
            Some(vec![ScalarValue::Integer(42)])
        );
        assert_eq!(
            registry.build_value("number", &Value::Number(4.5)),
            Some(vec![ScalarValue::Float(4.5)])
        );
        // Wrong kind builds nothing.
        assert_eq!(
            registry.build_value("number", &Value::Boolean(true)),
            Some(vec![])
        );
    }

    #[test]
    fn test_custom_builder_replaces_default() {
        let mut registry = ValueBuilderRegistry::with_defaults();
        registry.register_builder(
            "text",
            Box::new(|v| match v {
                Value::String(parts) => vec![ScalarValue::String(parts.join(", "))],
                _ => vec![],
            }),
        );

        assert_eq!(
            registry.build_value("text", &Value::string(["a", "b"])),
            Some(vec![ScalarValue::from("a, b")])
        );
    }
}
