//! CLI module for liftassist
//!
//! This module provides:
//! - Command implementations (analyze, resolve, users, documents, etc.)
//! - Output handlers (console, JSON, quiet)

pub mod commands;
pub mod output;

pub use output::{OutputMode, create_handler};
