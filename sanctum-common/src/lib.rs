//! # Sanctum Common Library
//!
//! Shared code for the Ambience Sanctum service including:
//! - Error and result types
//! - Configuration loading (CLI / ENV / TOML / defaults)
//! - Credential & token service (password hashing, signed session tokens)
//! - Built-in sound catalog
//! - Domain models (users, tracks, environments, section configuration)
//! - Database connection and schema migrations

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
