//! Teresita Client - Content sources for the content loader
//!
//! This crate provides the [`ContentSource`](teresita_core::source::ContentSource)
//! implementations used outside of tests:
//!
//! - [`http`] - a deployed site, fetched over HTTP
//! - [`directory`] - a local checkout of the site's public folder
//!
//! Both map failures onto `ContentError` the same way, so the loader's retry
//! and suppression rules behave identically whichever one is plugged in.

pub mod directory;
pub mod http;

pub use directory::DirectorySource;
pub use http::HttpSource;
