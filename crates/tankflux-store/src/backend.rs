use std::borrow::Cow;

use polars::prelude::DataFrame;

use crate::document::Document;
use crate::errors::StoreError;
use crate::model::{AttributeValue, Metadata, Node, StorePath};
use crate::table::{columns_to_dataframe, dataframe_to_columns};

/// Read/write access to named float arrays, scalar attributes and tables.
///
/// Lookups distinguish "not there" (`Ok(None)`) from a failing store (`Err`).
pub trait DataStore {
    fn read_array(&self, path: &str) -> Result<Option<Vec<f64>>, StoreError>;

    fn read_attribute(&self, group: &str, key: &str)
        -> Result<Option<AttributeValue>, StoreError>;

    /// Numeric attribute lookup; `group` may be empty for the root.
    fn read_scalar_attribute(&self, group: &str, key: &str) -> Result<Option<f64>, StoreError> {
        match self.read_attribute(group, key)? {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| StoreError::InvalidAttribute {
                    path: group.to_string(),
                    key: key.to_string(),
                    reason: format!("expected a number, found '{value}'"),
                }),
        }
    }

    /// Child names of a group in creation order.
    fn list_group(&self, group: &str) -> Result<Option<Vec<String>>, StoreError>;

    fn write_array(&mut self, path: &str, values: &[f64]) -> Result<(), StoreError>;

    fn write_attribute(
        &mut self,
        group: &str,
        key: &str,
        value: AttributeValue,
    ) -> Result<(), StoreError>;

    /// Replaces `group` with one dataset per column plus the metadata as attributes.
    fn write_table(
        &mut self,
        group: &str,
        table: &DataFrame,
        metadata: &Metadata,
    ) -> Result<(), StoreError>;

    fn read_table(&self, group: &str) -> Result<Option<(DataFrame, Metadata)>, StoreError>;
}

/// Whole-document load/save; every [`DataStore`] operation is built on top of it.
pub trait DocumentBackend {
    fn load(&self) -> Result<Cow<'_, Document>, StoreError>;
    fn save(&mut self, document: Document) -> Result<(), StoreError>;
}

impl<B: DocumentBackend> DataStore for B {
    fn read_array(&self, path: &str) -> Result<Option<Vec<f64>>, StoreError> {
        let path = StorePath::parse(path)?;
        let document = self.load()?;
        Ok(document
            .dataset(&path)?
            .map(|dataset| dataset.values.clone()))
    }

    fn read_attribute(
        &self,
        group: &str,
        key: &str,
    ) -> Result<Option<AttributeValue>, StoreError> {
        let group = StorePath::parse(group)?;
        let document = self.load()?;
        Ok(document.attribute(&group, key)?.cloned())
    }

    fn list_group(&self, group: &str) -> Result<Option<Vec<String>>, StoreError> {
        let group = StorePath::parse(group)?;
        let document = self.load()?;
        Ok(document.group(&group)?.map(|group| group.child_names()))
    }

    fn write_array(&mut self, path: &str, values: &[f64]) -> Result<(), StoreError> {
        let path = StorePath::parse(path)?;
        let mut document = self.load()?.into_owned();
        document.put_dataset(&path, values.to_vec())?;
        self.save(document)
    }

    fn write_attribute(
        &mut self,
        group: &str,
        key: &str,
        value: AttributeValue,
    ) -> Result<(), StoreError> {
        let group = StorePath::parse(group)?;
        let mut document = self.load()?.into_owned();
        document.put_attribute(&group, key, value)?;
        self.save(document)
    }

    fn write_table(
        &mut self,
        group: &str,
        table: &DataFrame,
        metadata: &Metadata,
    ) -> Result<(), StoreError> {
        let group = StorePath::parse(group)?;
        let columns = dataframe_to_columns(table)?;
        let mut document = self.load()?.into_owned();
        document.put_group(&group, columns, metadata.clone())?;
        self.save(document)
    }

    fn read_table(&self, group: &str) -> Result<Option<(DataFrame, Metadata)>, StoreError> {
        let path = StorePath::parse(group)?;
        let document = self.load()?;
        let Some(found) = document.group(&path)? else {
            return Ok(None);
        };

        let mut columns = Vec::new();
        for name in found.child_names() {
            // nested groups are not table columns
            if let Some(Node::Dataset(dataset)) = found.child(&name) {
                columns.push((name, dataset.values.clone()));
            }
        }

        let table = columns_to_dataframe(columns)?;
        Ok(Some((table, found.attributes.clone())))
    }
}
