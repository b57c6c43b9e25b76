//! Librarian Core Library
//!
//! This crate provides the foundational utilities for the librarian
//! answering engine:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Site configuration loading and validation

pub mod error;
pub mod logging;
pub mod site;

// Re-export commonly used types
pub use error::{AppError, AppResult, GenerationStage};
pub use site::{LibrarySpec, SiteConfig};
