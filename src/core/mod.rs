//! Core module - shared infrastructure for Planwise
//!
//! This module contains foundational types, configuration, and error handling
//! used throughout the application.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AgentConfig, Config, LlmConfig, ProviderType, WorkspaceConfig};
pub use error::{PlanwiseError, Result};
pub use types::*;
