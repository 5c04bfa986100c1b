//! # Songbook Common Library
//!
//! Shared code for the songbook services:
//! - Error and result types
//! - Bootstrap configuration (TOML) and root folder resolution
//! - Whole-document file writes

pub mod config;
pub mod error;
pub mod fs_utils;

pub use error::{Error, Result};
