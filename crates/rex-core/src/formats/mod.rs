//! # Formats Module
//!
//! Serialization and format handling for REX content snapshots.
//!
//! This module contains the binary snapshot format (postcard + header), used
//! both by the `file` backend and by `rex export --format canonical`.
//!
//! Note: File I/O operations remain in the app layer (apps/rex).
//! This module only handles format conversion (pure transformations).

mod persistence;

pub use persistence::*;
