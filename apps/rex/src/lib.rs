//! # REX Library
//!
//! This library exposes the REX server and CLI modules for testing and
//! integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod backend;
pub mod cli;
pub mod config;
pub mod directory;
pub mod error;

// Re-export rex_core for convenience
pub use rex_core;
