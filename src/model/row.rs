//! Result rows: ordered sets of named field values

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record of an input or output batch.
///
/// Field order is significant: positional arguments are taken from a row in field
/// order, so the underlying map keeps insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: Map<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String rendering of a field; `None` when the field is absent or null
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(render_value)
    }

    /// String renderings of every field in row order, nulls rendered as empty strings
    pub fn values_as_strings(&self) -> Vec<String> {
        self.fields
            .values()
            .map(|v| render_value(v).unwrap_or_default())
            .collect()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a JSON object into a row, `None` for any other JSON value
    pub fn from_json_object(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_values_keep_insertion_order() {
        let row = Row::new()
            .with_field("zeta", "last-name")
            .with_field("alpha", 42)
            .with_field("mid", Value::Null);

        assert_eq!(row.values_as_strings(), vec!["last-name", "42", ""]);
        let names: Vec<&str> = row.field_names().collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_get_string_renders_scalars() {
        let row = Row::new()
            .with_field("s", "text")
            .with_field("n", 1.5)
            .with_field("b", true)
            .with_field("null", Value::Null);

        assert_eq!(row.get_string("s").as_deref(), Some("text"));
        assert_eq!(row.get_string("n").as_deref(), Some("1.5"));
        assert_eq!(row.get_string("b").as_deref(), Some("true"));
        assert_eq!(row.get_string("null"), None);
        assert_eq!(row.get_string("absent"), None);
    }

    #[test]
    fn test_from_json_object() {
        assert!(Row::from_json_object(json!({"a": 1})).is_some());
        assert!(Row::from_json_object(json!([1, 2])).is_none());
    }
}
