use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Scalar metadata attached to a group or dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Float(f64),
    Text(String),
    TextList(Vec<String>),
}

impl AttributeValue {
    /// Numeric view of the attribute; text values are not coerced.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(value) => Some(*value as f64),
            AttributeValue::Float(value) => Some(*value),
            AttributeValue::Text(_) | AttributeValue::TextList(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Integer(value) => write!(f, "{value}"),
            AttributeValue::Float(value) => write!(f, "{value}"),
            AttributeValue::Text(value) => f.write_str(value),
            AttributeValue::TextList(values) => f.write_str(&values.join(", ")),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        AttributeValue::TextList(values)
    }
}

pub type Metadata = BTreeMap<String, AttributeValue>;

/// Hierarchical `/`-separated key such as `brewing_0002/B004/level`.
/// The empty path addresses the root group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let mut segments = Vec::new();
        for segment in raw.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(StoreError::InvalidPath {
                    path: raw.to_string(),
                    reason: format!("relative segment '{segment}' is not allowed"),
                });
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Splits into the parent group path and the final segment.
    pub fn split_last(&self) -> Option<(StorePath, &str)> {
        let (last, parent) = self.segments.split_last()?;
        Some((
            StorePath {
                segments: parent.to_vec(),
            },
            last.as_str(),
        ))
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("/")
        } else {
            f.write_str(&self.segments.join("/"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Group(Group),
    Dataset(Dataset),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub attributes: Metadata,
    #[serde(default)]
    pub children: BTreeMap<String, Node>,
    /// Child names in creation order.
    #[serde(default)]
    pub order: Vec<String>,
}

impl Group {
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn child_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .order
            .iter()
            .filter(|name| self.children.contains_key(name.as_str()))
            .cloned()
            .collect();
        for name in self.children.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    pub fn insert_child(&mut self, name: &str, node: Node) {
        if self.children.insert(name.to_string(), node).is_none() {
            self.order.retain(|existing| existing != name);
            self.order.push(name.to_string());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(with = "nan_as_null")]
    pub values: Vec<f64>,
    #[serde(default)]
    pub attributes: Metadata,
}

impl Dataset {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            attributes: Metadata::new(),
        }
    }
}

/// JSON has no NaN, so missing samples travel as `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded: Vec<Option<f64>> = values
            .iter()
            .map(|value| if value.is_nan() { None } else { Some(*value) })
            .collect();
        encoded.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let decoded: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(decoded
            .into_iter()
            .map(|value| value.unwrap_or(f64::NAN))
            .collect())
    }
}
