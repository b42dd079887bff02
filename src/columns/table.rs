//! Run-wide column buffers.
//!
//! A [`ColumnTable`] holds one buffer per bound column name for the whole
//! run. Stages reference entries through their [`ColumnRegistry`] slots, so a
//! column written by one stage is the value every later stage reads and the
//! value staged into the output row.
//!
//! Entries are reference counted by the slots pointing at them. The last
//! release of an entry frees its buffer.
//!
//! [`ColumnRegistry`]: crate::columns::ColumnRegistry

use crate::columns::buffer::ColumnBuffer;
use crate::columns::kind::ColumnType;
use crate::error::Result;
use crate::stream::Tree;
use std::collections::HashMap;

/// Whether a column is read from the input tree or only written to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// One column buffer shared by every slot bound to its name.
#[derive(Debug)]
pub struct SharedColumn {
    pub name: String,
    pub column_type: ColumnType,
    pub direction: Direction,
    buffer: ColumnBuffer,
    refs: usize,
}

impl SharedColumn {
    pub fn buffer(&self) -> &ColumnBuffer {
        &self.buffer
    }

    /// Number of slots bound to this column.
    pub fn refs(&self) -> usize {
        self.refs
    }
}

#[derive(Debug, Default)]
pub struct ColumnTable {
    entries: Vec<Option<SharedColumn>>,
    by_name: HashMap<String, usize>,
}

impl ColumnTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live columns.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SharedColumn> {
        self.index_of(name).and_then(|index| self.entry(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedColumn> {
        self.entries.iter().flatten()
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Take a reference to column `name`, creating it with a default value.
    ///
    /// The caller checks that an existing entry has `column_type`.
    pub(crate) fn acquire(
        &mut self,
        name: &str,
        column_type: ColumnType,
        direction: Direction,
    ) -> usize {
        if let Some(index) = self.index_of(name) {
            if let Some(entry) = self.entries.get_mut(index).and_then(Option::as_mut) {
                entry.refs += 1;
                return index;
            }
        }

        let index = self.entries.len();
        self.entries.push(Some(SharedColumn {
            name: name.to_string(),
            column_type,
            direction,
            buffer: ColumnBuffer::new(column_type),
            refs: 1,
        }));
        self.by_name.insert(name.to_string(), index);
        index
    }

    pub(crate) fn entry(&self, index: usize) -> Option<&SharedColumn> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn buffer_mut(&mut self, index: usize) -> Option<&mut ColumnBuffer> {
        self.entries
            .get_mut(index)
            .and_then(Option::as_mut)
            .map(|entry| &mut entry.buffer)
    }

    /// Drop one reference. Returns the freed type when it was the last one.
    pub(crate) fn release(&mut self, index: usize) -> Option<ColumnType> {
        let entry = self.entries.get_mut(index)?;
        let last = match entry.as_mut() {
            Some(shared) => {
                shared.refs -= 1;
                shared.refs == 0
            }
            None => return None,
        };
        if !last {
            return None;
        }

        let shared = entry.take()?;
        self.by_name.remove(&shared.name);
        if self.by_name.is_empty() {
            self.entries.clear();
        }
        Some(shared.buffer.release())
    }

    /// Copy the current input record into every input column.
    pub fn load(&mut self, input: &Tree) -> Result<()> {
        for shared in self.entries.iter_mut().flatten() {
            if shared.direction == Direction::Input {
                input.read(&shared.name, &mut shared.buffer)?;
            }
        }
        Ok(())
    }

    /// Stage every column's value into the pending output row.
    pub fn stage_outputs(&self, output: &mut Tree) -> Result<()> {
        for shared in self.iter() {
            output.stage(&shared.name, &shared.buffer)?;
        }
        Ok(())
    }
}
