//! # Command Line Interface
//!
//! `rex serve` runs the HTTP API; the other commands operate on a database
//! directly, acting as a configured user where the engine needs a caller.

mod args;
mod commands;

pub use args::{Cli, Command};
pub use commands::{
    StatusReport, cmd_export, cmd_fork, cmd_import, cmd_init, cmd_publish, cmd_save, cmd_serve,
    cmd_show, cmd_status,
};
