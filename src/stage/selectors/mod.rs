//! Built-in selector implementations.

mod example;

pub use example::ExampleSelector;
