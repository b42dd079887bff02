//! Test data builders for creating trees, backends and steering files

use eventsel::columns::{ColumnData, ColumnValue};
use eventsel::stream::{MemoryBackend, RecordFile, Tree};

/// Builder for creating test trees column by column
pub struct TreeBuilder {
    name: String,
    columns: Vec<(String, ColumnData)>,
}

impl TreeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
        }
    }

    pub fn column<T: ColumnValue>(mut self, name: &str, values: Vec<T>) -> Self {
        self.columns
            .push((name.to_string(), ColumnData::from_values(values)));
        self
    }

    /// `my_int` counting from `first`, plus a constant `my_float`
    pub fn counting(name: &str, first: i32, entries: usize) -> Self {
        let ids: Vec<i32> = (first..first + entries as i32).collect();
        Self::new(name)
            .column("my_int", ids)
            .column("my_float", vec![1.0f32; entries])
    }

    pub fn build(self) -> Tree {
        Tree::from_columns(self.name, self.columns).unwrap()
    }

    pub fn into_file(self) -> RecordFile {
        RecordFile::with_tree(self.build())
    }
}

/// Memory backend holding the given files
pub fn backend_with(files: Vec<(&str, RecordFile)>) -> MemoryBackend {
    let backend = MemoryBackend::new();
    for (name, file) in files {
        backend.insert(name, file);
    }
    backend
}

/// Builder for steering file text
#[derive(Default)]
pub struct SteeringBuilder {
    lines: Vec<String>,
}

impl SteeringBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inputs(self, files: &[&str]) -> Self {
        self.line(&format!("sequence<string> inputFileNames = {}", files.join(" ")))
    }

    pub fn selectors(self, names: &[&str]) -> Self {
        self.line(&format!("sequence<string> selectors = {}", names.join(" ")))
    }

    pub fn line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn build(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_builder() {
        let tree = TreeBuilder::counting("tree", 5, 3).build();
        assert_eq!(tree.entries(), 3);
        assert_eq!(
            tree.column_data("my_int").unwrap().values::<i32>().unwrap().to_vec(),
            vec![5i32, 6, 7]
        );
    }
}
