//! Command-line application layer.
//!
//! This module wires configuration, collaborators and the run together for
//! each subcommand, and handles Ctrl-C.

pub mod commands;
pub mod shutdown;

// Re-export public API
pub use commands::execute;
pub use shutdown::{cancel_on_ctrl_c, shutdown_gracefully};
