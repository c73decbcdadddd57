//! CLI module for factory - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for dispatching work,
//! recording outcomes, retrospectives and status.

pub mod commands;

pub use commands::Cli;
