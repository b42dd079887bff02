//! Heterogeneous key/value store parsed from steering files.
//!
//! # Steering format
//!
//! ```text
//! <type> <key> = <value...>
//!
//! bool             applyCorr   = true
//! double           Muons_ptmin = 25000.
//! sequence<string> jetTools    = JetCleaning AnotherJetTool
//! ```
//!
//! `<type>` is one of `bool`, `int`, `float`, `double`, `string` or
//! `sequence<T>` (also spelled `vector<T>`) over those scalars. Blank lines and
//! lines whose first token starts with `#` are ignored. Parsing is strict: the
//! first malformed line aborts with its line number and nothing is returned.

use crate::config::field::{Field, FieldKind, FieldValue};
use crate::error::{AnalysisError, Result};
use crate::log::Log;
use std::collections::BTreeMap;
use std::path::Path;

/// Map from key to typed [`Field`].
///
/// Cloning a store clones every field; stores never share payloads.
#[derive(Debug, Clone)]
pub struct Store {
    data: BTreeMap<String, Field>,
    log: Log,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_log(Log::new("Store"))
    }

    pub fn with_log(log: Log) -> Self {
        Self {
            data: BTreeMap::new(),
            log,
        }
    }

    /// Parse a store from steering text.
    pub fn parse(source: &str) -> Result<Self> {
        Self::parse_with_log(source, Log::new("Store"))
    }

    /// Parse a store from steering text, logging through `log`.
    pub fn parse_with_log(source: &str, log: Log) -> Result<Self> {
        let mut store = Store::with_log(log);

        for (index, line) in source.lines().enumerate() {
            let line_number = index + 1;
            let tokens: Vec<&str> = line.split_whitespace().collect();

            if tokens.is_empty() || tokens[0].starts_with('#') {
                continue;
            }

            store.log.debug(format_args!("parse() : {}", line));

            if let Err(reason) = store.parse_tokens(&tokens) {
                store.log.error(format_args!(
                    "parse() : line {} in steering file : {}",
                    line_number, reason
                ));
                return Err(AnalysisError::ConfigParse {
                    line: line_number,
                    reason,
                });
            }
        }

        Ok(store)
    }

    fn parse_tokens(&mut self, tokens: &[&str]) -> std::result::Result<(), String> {
        if tokens.len() < 4 {
            return Err(format!(
                "expected at least 4 tokens, but got {}",
                tokens.len()
            ));
        }
        if tokens[2] != "=" {
            return Err(format!("expected 3rd token to be '=', but got '{}'", tokens[2]));
        }

        let kind =
            FieldKind::parse(tokens[0]).ok_or_else(|| format!("unknown type '{}'", tokens[0]))?;
        let field = Field::from_tokens(kind, &tokens[3..])?;
        self.data.insert(tokens[1].to_string(), field);
        Ok(())
    }

    /// Read and parse a steering file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!(
                "Failed to read steering file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content)
    }

    /// Get a copy of the value stored under `key`.
    ///
    /// The requested type must match the stored kind exactly.
    pub fn get<T: FieldValue>(&self, key: &str) -> Result<T> {
        let field = self
            .data
            .get(key)
            .ok_or_else(|| AnalysisError::MissingKey(key.to_string()))?;
        self.typed(key, field).cloned()
    }

    /// Copy the value under `key` into `out` if the key is present.
    ///
    /// Returns whether `out` was written. A present key of another kind is
    /// still a type mismatch.
    pub fn getif<T: FieldValue>(&self, key: &str, out: &mut T) -> Result<bool> {
        match self.data.get(key) {
            Some(field) => {
                *out = self.typed::<T>(key, field)?.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Like [`Store::getif`], returning `default` when the key is absent.
    pub fn get_or<T: FieldValue>(&self, key: &str, default: T) -> Result<T> {
        let mut value = default;
        self.getif(key, &mut value)?;
        Ok(value)
    }

    fn typed<'a, T: FieldValue>(&self, key: &str, field: &'a Field) -> Result<&'a T> {
        T::from_field(field).ok_or_else(|| {
            self.log.error(format_args!(
                "get() : field '{}' is {}, requested as {}",
                key,
                field.kind(),
                T::KIND
            ));
            AnalysisError::ConfigTypeMismatch {
                key: key.to_string(),
                expected: T::KIND.name(),
                found: field.kind().name(),
            }
        })
    }

    /// Insert `value` under `key`.
    ///
    /// Without `overwrite` an existing key is left untouched and `false` is
    /// returned.
    pub fn put<T: FieldValue>(&mut self, key: &str, value: T, overwrite: bool) -> bool {
        if !overwrite && self.data.contains_key(key) {
            self.log.debug(format_args!(
                "put() : field '{}' exists and overwrite is off",
                key
            ));
            return false;
        }
        self.data.insert(key.to_string(), value.into_field());
        true
    }

    /// Remove the field under `key`, warning if it does not exist.
    pub fn remove(&mut self, key: &str) -> Option<Field> {
        let removed = self.data.remove(key);
        if removed.is_none() {
            self.log
                .warning(format_args!("remove() : field with name {} doesn't exist!", key));
        }
        removed
    }

    /// Drop every field.
    pub fn flush(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn kind_of(&self, key: &str) -> Option<FieldKind> {
        self.data.get(key).map(Field::kind)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }
}
