//! # livewatch-core
//!
//! Core crate for LiveWatch. Contains the configuration schemas, typed
//! identifiers, platform and live-status types, the collaborator traits
//! (platform adapters, chat client, backup transport), and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other LiveWatch crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
