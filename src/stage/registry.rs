//! Selector factory keyed by name.
//!
//! The steering file lists selectors by name; the driver turns each name into
//! an instance through a [`SelectorRegistry`]. Built-in selectors are
//! enumerated by [`BuiltinSelector`].

use crate::stage::selectors::ExampleSelector;
use crate::stage::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Creates a selector instance called by the given name.
pub type SelectorFactory = Box<dyn Fn(&str) -> Box<dyn Selector>>;

/// Selectors that ship with the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuiltinSelector {
    /// Derived columns plus a count-based cut on `my_vector_float`.
    Example,
}

impl BuiltinSelector {
    /// Name used in the `selectors` steering key.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinSelector::Example => "ExampleSelector",
        }
    }

    pub fn all() -> &'static [BuiltinSelector] {
        &[BuiltinSelector::Example]
    }

    pub fn description(&self) -> &'static str {
        match self {
            BuiltinSelector::Example => {
                "Computes new_float = my_float + my_int and new_vector_float.\n\
                 Skips records with fewer than my_int_min entries of\n\
                 my_vector_float below my_float_min."
            }
        }
    }

    pub fn create(&self, name: &str) -> Box<dyn Selector> {
        match self {
            BuiltinSelector::Example => Box::new(ExampleSelector::new(name)),
        }
    }
}

/// Name to factory map.
#[derive(Default)]
pub struct SelectorRegistry {
    factories: BTreeMap<String, SelectorFactory>,
}

impl SelectorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every [`BuiltinSelector`].
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for builtin in BuiltinSelector::all() {
            let builtin = *builtin;
            registry.register(builtin.name(), move |name| builtin.create(name));
        }
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&str) -> Box<dyn Selector> + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn create(&self, name: &str) -> Option<Box<dyn Selector>> {
        self.factories.get(name).map(|factory| factory(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for SelectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
