//! Prompt system for PostApply.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions (system + user templates, generation defaults)
//! - A built-in catalogue with per-workspace overrides
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt, PromptCatalog};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, GenerationParams, PromptDefinition, PromptInputSpec,
    PromptOutputSpec,
};
