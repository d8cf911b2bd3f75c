//! Request parameters
//!
//! [`RequestParams`] is the per-call mapping of field name to value. Keys are
//! kept sorted so the encoded body is deterministic regardless of insertion
//! order.

use serde_json::{Map, Value};
use url::form_urlencoded;

use crate::error::{Error, Result};

/// Keys whose values never appear in logs
const REDACTED_KEYS: &[&str] = &["username", "password"];

/// Placeholder written instead of a redacted value
pub const REDACTED: &str = "<REDACTED>";

/// Ordered mapping of field name to scalar or nested value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    fields: Map<String, Value>,
}

impl RequestParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field only if it is not already present
    pub fn insert_default(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.entry(key.into()).or_insert_with(|| value.into());
        self
    }

    /// Look up a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Whether a field is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Remove a field
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Field names in encoding order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encode as an `application/x-www-form-urlencoded` body
    ///
    /// Nested values are flattened with bracket notation
    /// (`domains[0][dname]=example.ru`).
    pub fn to_form(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.fields {
            append_value(&mut serializer, key, value);
        }
        serializer.finish()
    }

    /// Copy of the parameters with credential fields masked, for logging
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for key in REDACTED_KEYS {
            if let Some(value) = copy.fields.get_mut(*key) {
                *value = Value::String(REDACTED.to_string());
            }
        }
        copy
    }

    /// View the parameters as a JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }
}

fn append_value(
    serializer: &mut form_urlencoded::Serializer<'_, String>,
    key: &str,
    value: &Value,
) {
    match value {
        Value::Object(map) => {
            for (sub_key, sub_value) in map {
                append_value(serializer, &format!("{}[{}]", key, sub_key), sub_value);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                append_value(serializer, &format!("{}[{}]", key, index), item);
            }
        }
        scalar => {
            serializer.append_pair(key, &scalar_to_string(scalar));
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl std::fmt::Display for RequestParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.fields.clone()))
    }
}

impl TryFrom<Value> for RequestParams {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::invalid_input(format!(
                "Request parameters must be a JSON object, got: {}",
                other
            ))),
        }
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl<K, V> FromIterator<(K, V)> for RequestParams
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}
