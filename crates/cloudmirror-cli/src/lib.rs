//! Command-line front end for cloudmirror.
//!
//! Parses arguments, serves a local directory as the remote tree, runs the
//! mirror engine and renders progress and the final summary.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Used by main.rs
use anyhow as _;
use dotenvy as _;
use tracing_subscriber as _;

pub mod config;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;
pub mod signals;
pub mod source;

// Re-export primary types for convenient access
pub use config::build_config;
pub use error::CliError;
pub use parser::Cli;
pub use source::DirectorySource;
