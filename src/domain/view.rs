//! Named views and the property payloads they are rendered with.
//!
//! A [`ViewRequest`] is what a handler hands to the rendering pipeline: the
//! name of a top-level client component plus the properties it receives. The
//! properties are kept in an ordered map and serialized canonically (object
//! keys sorted at every depth) so the same payload always produces the same
//! bytes, no matter how it was assembled.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::error::DomainError;

/// Ordered `string -> JSON value` mapping passed to a view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties(BTreeMap<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Convert any serializable value into a property payload.
    ///
    /// The value must serialize to a JSON object. Anything else (a scalar, a
    /// map with non-string keys, a type whose `Serialize` impl fails) is a
    /// caller error and no render is attempted.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, DomainError> {
        let value = serde_json::to_value(value)
            .map_err(|err| DomainError::serialization(err.to_string()))?;
        match value {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(DomainError::serialization(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical JSON text: compact, object keys sorted recursively.
    pub fn to_canonical_json(&self) -> String {
        let mut out = String::new();
        out.push('{');
        for (index, (key, value)) in self.0.iter().enumerate() {
            if index > 0 {
                out.push(',');
            }
            write_json_string(&mut out, key);
            out.push(':');
            write_canonical(&mut out, value);
        }
        out.push('}');
        out
    }
}

impl FromIterator<(String, Value)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A request to render a named view with a property payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRequest {
    name: String,
    properties: Properties,
}

impl ViewRequest {
    pub fn new(name: impl Into<String>, properties: Properties) -> Result<Self, DomainError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("view name must not be empty"));
        }
        Ok(Self { name, properties })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => write_sorted_object(out, map),
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        Value::String(text) => write_json_string(out, text),
        // Scalars have a single compact form.
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_sorted_object(out: &mut String, map: &Map<String, Value>) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));

    out.push('{');
    for (index, (key, value)) in entries.into_iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_json_string(out, key);
        out.push(':');
        write_canonical(out, value);
    }
    out.push('}');
}

fn write_json_string(out: &mut String, text: &str) {
    out.push_str(&Value::String(text.to_owned()).to_string());
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn empty_properties_serialize_as_empty_object() {
        assert_eq!(Properties::new().to_canonical_json(), "{}");
    }

    #[test]
    fn nested_objects_are_sorted() {
        let props = Properties::new().with("doc", json!({"name": "a.svg", "backend": "local"}));
        assert_eq!(
            props.to_canonical_json(),
            r#"{"doc":{"backend":"local","name":"a.svg"}}"#
        );
    }

    #[test]
    fn strings_keep_markup_verbatim_in_json() {
        let props = Properties::new().with("title", "<script>alert(1)</script>");
        assert_eq!(
            props.to_canonical_json(),
            r#"{"title":"<script>alert(1)</script>"}"#
        );
    }

    #[test]
    fn from_serializable_accepts_struct() {
        #[derive(Serialize)]
        struct Doc {
            name: &'static str,
            pages: u32,
        }

        let props = Properties::from_serializable(&Doc {
            name: "logo.svg",
            pages: 2,
        })
        .expect("struct should serialize");
        assert_eq!(props.get("pages"), Some(&json!(2)));
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn from_serializable_rejects_non_object() {
        let err = Properties::from_serializable(&vec![1, 2, 3]).expect_err("array is not props");
        assert!(matches!(err, DomainError::Serialization { .. }));
    }

    #[test]
    fn from_serializable_rejects_non_string_keys() {
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple key");
        let err = Properties::from_serializable(&map).expect_err("tuple keys are not JSON");
        assert!(matches!(err, DomainError::Serialization { .. }));
    }

    #[test]
    fn view_request_requires_name() {
        let err = ViewRequest::new("  ", Properties::new()).expect_err("blank name");
        assert!(matches!(err, DomainError::Validation { .. }));
    }
}
