//! Prompt manifests.
//!
//! A manifest is a versioned list of prompts, validated against an embedded
//! JSON Schema and then parsed into closed [`PromptTarget`] variants.

mod parser;
mod schema;

pub use parser::{
    ManifestError, PromptManifest, PromptSpec, PromptTarget, DEFAULT_BASE_CURRENCY,
    DEFAULT_QUOTE_CURRENCY,
};
pub use schema::validate_manifest_schema;
