//! gradelens-providers — Remote inference clients and configuration.
//!
//! Implements the `InferenceClient` trait for OpenAI-compatible
//! chat-completions endpoints, provides a scriptable mock for tests, and
//! loads `gradelens.toml`.

pub mod config;
pub mod mock;
pub mod openai;

pub use config::{create_client, load_config, load_config_from, AnalysisConfig, GradelensConfig, InferenceConfig};
pub use gradelens_core::error::InferenceError;
