#![forbid(unsafe_code)]

//! Core: a dependency-tracking computed-property engine.
//!
//! Declare a computed property by name, its dependency paths, and a
//! derivation closure; the engine evaluates lazily, memoizes, and marks
//! the cache stale exactly when a declared dependency is written.
//!
//! ```
//! use cellbind_core::{Binder, Value};
//!
//! let binder = Binder::new();
//! binder.set("firstName", "Ada")?;
//! binder.set("lastName", "Lovelace")?;
//! binder.compute("fullName", &["firstName", "lastName"], |b| {
//!     let first = b.get("firstName").unwrap_or_default();
//!     let last = b.get("lastName").unwrap_or_default();
//!     Value::str(format!("{first} {last}"))
//! })?;
//!
//! assert_eq!(binder.get("fullName")?, Value::str("Ada Lovelace"));
//! binder.set("firstName", "Grace")?;
//! assert_eq!(binder.get("fullName")?, Value::str("Grace Lovelace"));
//! # Ok::<(), cellbind_core::BindError>(())
//! ```

pub mod binder;
pub mod error;
pub mod value;

mod cells;
mod path;
mod registry;
mod store;

pub use binder::Binder;
pub use error::{BindError, Result};
pub use value::Value;
