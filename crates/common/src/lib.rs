//! LearnForge Common Library
//!
//! Shared code for the LearnForge services including:
//! - Database models and repository patterns
//! - The learning store abstraction (Postgres and in-memory)
//! - The course generation pipeline
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod generation;
pub mod learning;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use generation::{CourseGenerationService, CourseGenerator};
pub use learning::{LearningStore, MemoryStore};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default chat model used for course generation
pub const DEFAULT_GENERATION_MODEL: &str = "gpt-4o";
