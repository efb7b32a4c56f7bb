#![forbid(unsafe_code)]

//! Public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub use cellbind_core as core;
pub use cellbind_memo as memo;

pub mod prelude {
    pub use cellbind_core::{BindError, Binder, Result, Value};
    pub use cellbind_memo::Memo;
}
