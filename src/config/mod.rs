//! Steering configuration.
//!
//! - [`Field`] / [`FieldKind`] - one typed value and its discriminator
//! - [`Store`] - the key/value map parsed from a steering file
//! - [`ConfigView`] - the read-only handle handed to selectors
//!
//! # Example
//!
//! ```
//! use eventsel::config::Store;
//!
//! let store = Store::parse("float ExampleSelector::my_float_min = 30.\n").unwrap();
//! let cut: f32 = store.get("ExampleSelector::my_float_min").unwrap();
//! assert_eq!(cut, 30.0);
//! ```

pub mod field;
pub mod store;
pub mod view;

pub use field::{Field, FieldKind, FieldValue};
pub use store::Store;
pub use view::ConfigView;
