//! Command line front end for hubsync.
//!
//! Parses arguments, loads `hubsync.toml`, sets up tracing and runs an
//! export or import against a [`RestHub`].

pub mod cli;
pub mod commands;
pub mod logging;
pub mod rest;

pub use cli::Cli;
pub use commands::run;
pub use rest::RestHub;
