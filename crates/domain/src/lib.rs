//! # DeskAuth Domain
//!
//! Domain types shared by every DeskAuth crate.
//!
//! This crate contains:
//! - The sign-in error taxonomy and Result definition
//! - The sign-in configuration structure
//! - Protocol and runtime constants
//!
//! ## Architecture
//! - No dependencies on other DeskAuth crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
