//! Domain time tracker CLI library.
//!
//! This crate provides the CLI interface and the event loop that feeds
//! browser events to the accountant.

mod cli;
pub mod commands;
mod config;
pub mod feed;

pub use cli::{Cli, Commands};
pub use config::Config;
