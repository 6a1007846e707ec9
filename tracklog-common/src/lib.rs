//! # tracklog common library
//!
//! Shared code for the tracklog poller and API service:
//! - Error type and result alias
//! - TOML configuration loading
//! - Track-play and fallback-image models
//! - SQLite document store
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
