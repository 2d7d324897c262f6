// SPDX-License-Identifier: Apache-2.0

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::error::ModelError;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Acceptable value(s) for one config key.
///
/// The comparator dispatches on this tag; it never inspects runtime types.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedValue {
    Scalar(Scalar),
    List(Vec<ExpectedValue>),
    /// Sub-keys in document order.
    Mapping(Vec<(String, ExpectedValue)>),
    /// Any one of these values is acceptable. Written as `{"choices": [...]}`.
    Choices(Vec<String>),
}

const CHOICES_KEY: &str = "choices";

impl ExpectedValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Text(value.into()))
    }

    #[must_use]
    pub fn number(value: f64) -> Self {
        Self::Scalar(Scalar::Number(value))
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Converts a JSON document; integers and floats both become `Number`.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => Self::Scalar(Scalar::Number(n.as_f64().unwrap_or(f64::NAN))),
            Value::String(s) => Self::text(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) if map.len() == 1 && map.contains_key(CHOICES_KEY) => {
                match map.get(CHOICES_KEY) {
                    Some(Value::Array(items)) => {
                        Self::Choices(items.iter().map(choice_text).collect())
                    }
                    _ => Self::Mapping(
                        map.iter()
                            .map(|(k, v)| (k.clone(), Self::from_json(v)))
                            .collect(),
                    ),
                }
            }
            Value::Object(map) => Self::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(Scalar::Null) => Value::Null,
            Self::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            Self::Scalar(Scalar::Number(n)) => number_to_json(*n),
            Self::Scalar(Scalar::Text(s)) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Mapping(entries) => {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.to_json());
                }
                Value::Object(map)
            }
            Self::Choices(choices) => {
                let mut map = Map::new();
                map.insert(
                    CHOICES_KEY.to_string(),
                    Value::Array(choices.iter().cloned().map(Value::String).collect()),
                );
                Value::Object(map)
            }
        }
    }

    /// Text as written, numbers without a trailing `.0`, composites as JSON.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::Scalar(Scalar::Text(s)) => s.clone(),
            Self::Scalar(Scalar::Null) => String::new(),
            Self::Choices(choices) => choices.join(" | "),
            other => other.to_json().to_string(),
        }
    }
}

fn choice_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.first().map(choice_text).unwrap_or_default(),
        other => other.to_string(),
    }
}

fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl Serialize for ExpectedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scalar(Scalar::Null) => serializer.serialize_unit(),
            Self::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Self::Scalar(Scalar::Number(n)) => number_to_json(*n).serialize(serializer),
            Self::Scalar(Scalar::Text(s)) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::Choices(choices) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(CHOICES_KEY, choices)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ExpectedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

/// Ordered, duplicate-free set of expected entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedConfig {
    entries: Vec<(String, ExpectedValue)>,
}

impl ExpectedConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K>(entries: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (K, ExpectedValue)>,
        K: Into<String>,
    {
        let mut config = Self::new();
        for (key, value) in entries {
            config.insert(key, value)?;
        }
        Ok(config)
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: ExpectedValue,
    ) -> Result<(), ModelError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ModelError::EmptyKey);
        }
        if self.get(&key).is_some() {
            return Err(ModelError::DuplicateKey(key));
        }
        self.entries.push((key, value));
        Ok(())
    }

    /// Merges `other`; a key already present keeps its position and takes the
    /// newer value.
    pub fn merge_overwriting(&mut self, other: ExpectedConfig) {
        for (key, value) in other.entries {
            if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
                slot.1 = value;
            } else {
                self.entries.push((key, value));
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ExpectedValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExpectedValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (k, v) in &self.entries {
            map.insert(k.clone(), v.to_json());
        }
        Value::Object(map)
    }
}

impl Serialize for ExpectedConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
