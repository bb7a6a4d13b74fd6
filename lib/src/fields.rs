//! Ordered field mapping for submitted forms.
//!
//! Forms are open-ended (the apply form passes its whole body through), so
//! fields are kept as an explicitly ordered list of key/value pairs rather
//! than a fixed schema. Values are only interpreted when rendered.
use serde_json::Value;

use crate::error::{Error, UploadError};

/// A submitted value: a single string or an ordered list of strings
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Flattens the value for display; lists are joined with ", "
    pub fn display(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::List(items) => items.join(", "),
        }
    }

    /// Returns the text if this is a scalar value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::List(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, FieldValue)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the value as text when it is set and non-empty; lists are
    /// joined with ", "
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(FieldValue::display)
            .filter(|s| !s.is_empty())
    }

    /// Sets `key`, replacing an existing value in its original position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Adds a submitted value for `key`.
    ///
    /// Repeated keys collect into a list. Keys written as `name[]` are
    /// stored under `name` and are always lists.
    pub fn append(&mut self, key: &str, value: String) {
        let (key, force_list) = match key.strip_suffix("[]") {
            Some(bare) => (bare, true),
            None => (key, false),
        };

        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => {
                let mut items = match std::mem::replace(existing, FieldValue::List(Vec::new())) {
                    FieldValue::Text(s) => vec![s],
                    FieldValue::List(items) => items,
                };
                items.push(value);
                *existing = FieldValue::List(items);
            }
            None if force_list => self.entries.push((key.to_string(), FieldValue::List(vec![value]))),
            None => self.entries.push((key.to_string(), FieldValue::Text(value))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses an `application/x-www-form-urlencoded` body
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut fields = Self::new();
        for (k, v) in url::form_urlencoded::parse(body).into_owned() {
            fields.append(&k, v);
        }
        fields
    }

    /// Parses a JSON object body.
    ///
    /// Scalars become text, `null` becomes an empty string and arrays become
    /// lists. Anything other than an object is rejected.
    pub fn from_json(body: &[u8]) -> Result<Self, Error> {
        let object = match serde_json::from_slice::<Value>(body)? {
            Value::Object(object) => object,
            _ => {
                return Err(UploadError::Malformed("expected a JSON object".to_string()).into());
            }
        };

        let fields = object
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::Array(items) => FieldValue::List(items.into_iter().map(json_text).collect()),
                    other => FieldValue::Text(json_text(other)),
                };
                (k, value)
            })
            .collect();

        Ok(fields)
    }
}

fn json_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
