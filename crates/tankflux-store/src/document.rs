use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::model::{AttributeValue, Dataset, Group, Metadata, Node, StorePath};

/// The whole store as one tree rooted at an unnamed group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub root: Group,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a node; `None` when any segment is absent or a dataset sits on the way.
    pub fn node(&self, path: &StorePath) -> Option<&Node> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.root.child(first)?;
        for segment in rest {
            current = match current {
                Node::Group(group) => group.child(segment)?,
                Node::Dataset(_) => return None,
            };
        }
        Some(current)
    }

    pub fn group(&self, path: &StorePath) -> Result<Option<&Group>, StoreError> {
        if path.is_root() {
            return Ok(Some(&self.root));
        }
        match self.node(path) {
            Some(Node::Group(group)) => Ok(Some(group)),
            Some(Node::Dataset(_)) => Err(StoreError::NodeKind {
                path: path.to_string(),
                expected: "group",
            }),
            None => Ok(None),
        }
    }

    pub fn dataset(&self, path: &StorePath) -> Result<Option<&Dataset>, StoreError> {
        match self.node(path) {
            Some(Node::Dataset(dataset)) => Ok(Some(dataset)),
            Some(Node::Group(_)) => Err(StoreError::NodeKind {
                path: path.to_string(),
                expected: "dataset",
            }),
            None => Ok(None),
        }
    }

    /// Walks to a group, creating intermediate groups as needed.
    pub fn group_mut_or_create(&mut self, path: &StorePath) -> Result<&mut Group, StoreError> {
        let mut current = &mut self.root;
        for segment in path.segments() {
            if current.child(segment).is_none() {
                current.insert_child(segment, Node::Group(Group::default()));
            }
            current = match current.children.get_mut(segment.as_str()) {
                Some(Node::Group(group)) => group,
                _ => {
                    return Err(StoreError::NodeKind {
                        path: path.to_string(),
                        expected: "group",
                    })
                }
            };
        }
        Ok(current)
    }

    pub fn put_dataset(&mut self, path: &StorePath, values: Vec<f64>) -> Result<(), StoreError> {
        let (parent, name) = path.split_last().ok_or_else(|| StoreError::InvalidPath {
            path: path.to_string(),
            reason: "a dataset cannot live at the root".to_string(),
        })?;
        let group = self.group_mut_or_create(&parent)?;
        if let Some(Node::Group(_)) = group.child(name) {
            return Err(StoreError::NodeKind {
                path: path.to_string(),
                expected: "dataset",
            });
        }
        group.insert_child(name, Node::Dataset(Dataset::new(values)));
        Ok(())
    }

    pub fn put_attribute(
        &mut self,
        group_path: &StorePath,
        key: &str,
        value: AttributeValue,
    ) -> Result<(), StoreError> {
        validate_attribute(group_path, key, &value)?;
        let group = self.group_mut_or_create(group_path)?;
        group.attributes.insert(key.to_string(), value);
        Ok(())
    }

    pub fn attribute(
        &self,
        group_path: &StorePath,
        key: &str,
    ) -> Result<Option<&AttributeValue>, StoreError> {
        Ok(self
            .group(group_path)?
            .and_then(|group| group.attributes.get(key)))
    }

    /// Replaces the group at `path` with the given datasets (kept in order) and attributes.
    pub fn put_group(
        &mut self,
        path: &StorePath,
        datasets: Vec<(String, Vec<f64>)>,
        attributes: Metadata,
    ) -> Result<(), StoreError> {
        for (key, value) in &attributes {
            validate_attribute(path, key, value)?;
        }

        let mut replacement = Group {
            attributes,
            ..Group::default()
        };
        for (name, values) in datasets {
            let segment = StorePath::parse(&name)?;
            if segment.segments().len() != 1 {
                return Err(StoreError::InvalidPath {
                    path: name,
                    reason: "table column names must be a single path segment".to_string(),
                });
            }
            replacement.insert_child(&segment.segments()[0], Node::Dataset(Dataset::new(values)));
        }

        match path.split_last() {
            None => self.root = replacement,
            Some((parent, name)) => {
                let group = self.group_mut_or_create(&parent)?;
                if let Some(Node::Dataset(_)) = group.child(name) {
                    return Err(StoreError::NodeKind {
                        path: path.to_string(),
                        expected: "group",
                    });
                }
                group.insert_child(name, Node::Group(replacement));
            }
        }
        Ok(())
    }
}

fn validate_attribute(
    path: &StorePath,
    key: &str,
    value: &AttributeValue,
) -> Result<(), StoreError> {
    if key.trim().is_empty() {
        return Err(StoreError::InvalidAttribute {
            path: path.to_string(),
            key: key.to_string(),
            reason: "attribute key is empty".to_string(),
        });
    }
    if let AttributeValue::Float(number) = value {
        if !number.is_finite() {
            return Err(StoreError::InvalidAttribute {
                path: path.to_string(),
                key: key.to_string(),
                reason: format!("non-finite value {number}"),
            });
        }
    }
    Ok(())
}
