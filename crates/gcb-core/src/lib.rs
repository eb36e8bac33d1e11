//! Core domain + application logic for the Gemini chat relay bot.
//!
//! This crate is intentionally framework-agnostic. Discord / Gemini / SQLite
//! live behind ports (traits) implemented in adapter crates.

pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod listener;
pub mod logging;
pub mod messaging;
pub mod model;
pub mod registry;
pub mod relay;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result, UpstreamError};
