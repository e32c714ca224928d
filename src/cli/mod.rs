//! CLI module for snitchloop - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for running the loop
//! against recorded fixes, probing the lookup API, and showing config.

pub mod commands;

pub use commands::Cli;
