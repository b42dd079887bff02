//! Column-wise record trees.
//!
//! A [`Tree`] is a named table: a set of typed columns of equal length plus a
//! cursor selecting the current entry. Input trees are read through the
//! cursor; output trees are written by staging one value per column and then
//! calling [`Tree::fill`].

use crate::columns::{ColumnBuffer, ColumnData, ColumnType};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

/// One named column of a tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeColumn {
    pub name: String,
    pub data: ColumnData,
    #[serde(skip, default = "default_enabled")]
    enabled: bool,
}

impl TreeColumn {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
            enabled: true,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        self.data.column_type()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// A named, schema'd sequence of records stored column by column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    name: String,
    #[serde(default)]
    title: String,
    entries: usize,
    columns: Vec<TreeColumn>,
    #[serde(skip)]
    cursor: Option<usize>,
    #[serde(skip)]
    pending: Vec<Option<ColumnBuffer>>,
}

impl Tree {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            entries: 0,
            columns: Vec::new(),
            cursor: None,
            pending: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Build a tree from complete columns. All columns must have the same length.
    pub fn from_columns(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (String, ColumnData)>,
    ) -> Result<Self> {
        let mut tree = Tree::new(name);
        let columns: Vec<TreeColumn> = columns
            .into_iter()
            .map(|(name, data)| TreeColumn::new(name, data))
            .collect();
        tree.entries = columns.first().map(|c| c.data.len()).unwrap_or(0);
        tree.columns = columns;
        tree.validate()?;
        tree.pending = vec![None; tree.columns.len()];
        Ok(tree)
    }

    /// Check column lengths and name uniqueness.
    pub fn validate(&self) -> Result<()> {
        for (index, column) in self.columns.iter().enumerate() {
            if column.data.len() != self.entries {
                return Err(AnalysisError::StreamConfiguration(format!(
                    "column '{}' of tree '{}' has {} entries, expected {}",
                    column.name,
                    self.name,
                    column.data.len(),
                    self.entries
                )));
            }
            if self.columns[..index].iter().any(|c| c.name == column.name) {
                return Err(AnalysisError::StreamConfiguration(format!(
                    "duplicate column '{}' in tree '{}'",
                    column.name, self.name
                )));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn columns(&self) -> &[TreeColumn] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    fn missing(&self, name: &str) -> AnalysisError {
        AnalysisError::ColumnMissing {
            column: name.to_string(),
            tree: self.name.clone(),
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.index_of(name).map(|i| self.columns[i].column_type())
    }

    pub fn column_data(&self, name: &str) -> Option<&ColumnData> {
        self.index_of(name).map(|i| &self.columns[i].data)
    }

    /// Enable or disable columns matching `pattern` (`*` matches every column).
    ///
    /// Returns the number of columns affected.
    pub fn set_enabled(&mut self, pattern: &str, enabled: bool) -> usize {
        let mut count = 0;
        for column in &mut self.columns {
            if pattern == "*" || column.name == pattern {
                column.enabled = enabled;
                count += 1;
            }
        }
        count
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.index_of(name)
            .map(|i| self.columns[i].enabled)
            .unwrap_or(false)
    }

    pub fn enabled_count(&self) -> usize {
        self.columns.iter().filter(|c| c.enabled).count()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn set_cursor(&mut self, entry: usize) -> Result<()> {
        if entry >= self.entries {
            return Err(AnalysisError::StreamConfiguration(format!(
                "entry {} out of range for tree '{}' with {} entries",
                entry, self.name, self.entries
            )));
        }
        self.cursor = Some(entry);
        Ok(())
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = None;
    }

    /// Ensure a column `name` of `column_type` exists, creating it if needed.
    ///
    /// A new column is back-filled with default values for existing entries.
    pub fn declare(&mut self, name: &str, column_type: ColumnType) -> Result<()> {
        if let Some(existing) = self.column_type(name) {
            if existing != column_type {
                return Err(AnalysisError::BindingTypeMismatch {
                    column: name.to_string(),
                    stored: existing.tag(),
                    requested: column_type.tag(),
                });
            }
            return Ok(());
        }

        let mut data = ColumnData::new(column_type);
        for _ in 0..self.entries {
            data.push_default();
        }
        self.columns.push(TreeColumn::new(name, data));
        self.pending.resize(self.columns.len(), None);
        Ok(())
    }

    /// Copy the value of `name` at the cursor into `buffer`.
    pub fn read(&self, name: &str, buffer: &mut ColumnBuffer) -> Result<()> {
        let index = self.index_of(name).ok_or_else(|| self.missing(name))?;
        let column = &self.columns[index];

        if !column.enabled {
            return Err(AnalysisError::StreamConfiguration(format!(
                "column '{}' of tree '{}' is disabled",
                name, self.name
            )));
        }
        if column.column_type() != buffer.column_type() {
            return Err(AnalysisError::BindingTypeMismatch {
                column: name.to_string(),
                stored: column.column_type().tag(),
                requested: buffer.column_type().tag(),
            });
        }
        let entry = self.cursor.ok_or_else(|| {
            AnalysisError::StreamConfiguration(format!("no entry loaded in tree '{}'", self.name))
        })?;

        if column.data.read_into(entry, buffer) {
            Ok(())
        } else {
            Err(AnalysisError::StreamConfiguration(format!(
                "entry {} out of range for column '{}'",
                entry, name
            )))
        }
    }

    /// Stage `buffer` as the value of `name` for the next [`Tree::fill`].
    pub fn stage(&mut self, name: &str, buffer: &ColumnBuffer) -> Result<()> {
        let index = self.index_of(name).ok_or_else(|| self.missing(name))?;
        let stored = self.columns[index].column_type();
        if stored != buffer.column_type() {
            return Err(AnalysisError::BindingTypeMismatch {
                column: name.to_string(),
                stored: stored.tag(),
                requested: buffer.column_type().tag(),
            });
        }
        self.sync_pending();
        self.pending[index] = Some(buffer.clone());
        Ok(())
    }

    /// Keep one pending value per column, also for trees that were
    /// deserialized without going through [`RecordFile::take_tree`].
    ///
    /// [`RecordFile::take_tree`]: crate::stream::RecordFile::take_tree
    fn sync_pending(&mut self) {
        if self.pending.len() != self.columns.len() {
            self.pending.resize(self.columns.len(), None);
        }
    }

    /// Append one entry from the staged values. Columns with nothing staged
    /// get their default value. Returns the new entry count.
    pub fn fill(&mut self) -> usize {
        self.sync_pending();
        for (column, pending) in self.columns.iter_mut().zip(self.pending.iter_mut()) {
            match pending.take() {
                Some(buffer) => {
                    column.data.push(&buffer);
                }
                None => column.data.push_default(),
            }
        }
        self.entries += 1;
        self.entries
    }

    /// Prepare a deserialized tree for reading.
    pub(crate) fn reset_runtime_state(&mut self) {
        self.cursor = None;
        self.pending = vec![None; self.columns.len()];
        self.set_enabled("*", true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnValue;

    fn sample_tree() -> Tree {
        Tree::from_columns(
            "tree",
            vec![
                ("my_int".to_string(), ColumnData::from_values(vec![3i32, 5, 7])),
                (
                    "my_vector_float".to_string(),
                    ColumnData::from_values(vec![vec![1.0f32], vec![], vec![2.0, 4.0]]),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_columns_rejects_ragged() {
        let err = Tree::from_columns(
            "tree",
            vec![
                ("a".to_string(), ColumnData::from_values(vec![1i32, 2])),
                ("b".to_string(), ColumnData::from_values(vec![1i32])),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::StreamConfiguration(_)));
    }

    #[test]
    fn test_read_at_cursor() {
        let mut tree = sample_tree();
        let mut buffer = ColumnBuffer::new(<Vec<f32>>::COLUMN_TYPE);

        assert!(tree.read("my_vector_float", &mut buffer).is_err());
        tree.set_cursor(2).unwrap();
        tree.read("my_vector_float", &mut buffer).unwrap();
        assert_eq!(buffer.get::<Vec<f32>>(), Some(&vec![2.0, 4.0]));
        assert!(tree.set_cursor(3).is_err());
    }

    #[test]
    fn test_disabled_column_is_not_readable() {
        let mut tree = sample_tree();
        tree.set_cursor(0).unwrap();
        assert_eq!(tree.set_enabled("*", false), 2);
        assert_eq!(tree.enabled_count(), 0);

        let mut buffer = ColumnBuffer::new(i32::COLUMN_TYPE);
        assert!(tree.read("my_int", &mut buffer).is_err());
        tree.set_enabled("my_int", true);
        tree.read("my_int", &mut buffer).unwrap();
        assert_eq!(buffer.get::<i32>(), Some(&3));
    }

    #[test]
    fn test_read_type_mismatch() {
        let mut tree = sample_tree();
        tree.set_cursor(0).unwrap();
        let mut buffer = ColumnBuffer::new(f32::COLUMN_TYPE);
        assert!(matches!(
            tree.read("my_int", &mut buffer),
            Err(AnalysisError::BindingTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_stage_on_deserialized_tree() {
        let text = serde_json::to_string(&sample_tree()).unwrap();
        let mut tree: Tree = serde_json::from_str(&text).unwrap();

        tree.stage("my_int", &11i32.into_buffer()).unwrap();
        assert_eq!(tree.fill(), 4);
        assert_eq!(
            tree.column_data("my_int").unwrap().values::<i32>().unwrap(),
            &[3, 5, 7, 11]
        );
        assert_eq!(
            tree.column_data("my_vector_float").unwrap().len(),
            4
        );
    }

    #[test]
    fn test_declare_stage_fill() {
        let mut tree = Tree::new("out");
        tree.declare("x", f32::COLUMN_TYPE).unwrap();
        tree.stage("x", &1.5f32.into_buffer()).unwrap();
        assert_eq!(tree.fill(), 1);

        // New column is back-filled for the existing entry
        tree.declare("v", <Vec<i32>>::COLUMN_TYPE).unwrap();
        tree.stage("v", &vec![1i32, 2].into_buffer()).unwrap();
        assert_eq!(tree.fill(), 2);

        assert_eq!(
            tree.column_data("x").unwrap().values::<f32>().unwrap().to_vec(),
            vec![1.5f32, 0.0]
        );
        assert_eq!(
            tree.column_data("v").unwrap().values::<Vec<i32>>().unwrap().to_vec(),
            vec![vec![], vec![1i32, 2]]
        );
        tree.validate().unwrap();
    }

    #[test]
    fn test_declare_conflicting_type() {
        let mut tree = Tree::new("out");
        tree.declare("x", f32::COLUMN_TYPE).unwrap();
        tree.declare("x", f32::COLUMN_TYPE).unwrap();
        assert!(matches!(
            tree.declare("x", f64::COLUMN_TYPE),
            Err(AnalysisError::BindingTypeMismatch { .. })
        ));
    }
}
