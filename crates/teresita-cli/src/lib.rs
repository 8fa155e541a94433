//! Teresita CLI - Command-line interface for the Teresita content loader
//!
//! This crate provides the operator tool that builds a loader against a
//! deployed site or a local folder and prints what the site would render.

pub mod config;
pub mod output;

pub use config::{Command, Config, OutputFormat};
