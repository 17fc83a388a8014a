//! Typecast Core - schema-guided translation of natural language into typed JSON
//!
//! This crate turns free-form user text into a JSON instance conforming to a
//! caller-described shape, by prompting a pluggable language-model backend
//! and validating (and, when needed, repairing) its output.
//!
//! # Main Components
//!
//! - **Shapes and Vocabularies**: caller-constructed descriptions of the
//!   target data shape and named sets of allowed string tokens
//! - **Schema Generation**: deterministic schema text plus the structural
//!   object used for validation
//! - **Validation**: tolerant JSON extraction, structural checks, and
//!   vocabulary membership with diagnostics
//! - **Translation**: a bounded generate → validate → repair loop over any
//!   [`LanguageModel`] backend
//!
//! # Example
//!
//! ```no_run
//! use typecast_core::{
//!     generate_schema, FieldDescriptor, FieldKind, Result, ShapeDecl, ShapeDescription,
//!     Translator, Vocabulary, VocabularyRegistry,
//! };
//! use typecast_core::backends::{OpenAiConfig, OpenAiModel};
//!
//! # async fn example() -> Result<()> {
//! let mut vocabs = VocabularyRegistry::new();
//! vocabs.register(Vocabulary::new(
//!     "sentiment",
//!     ["negative", "neutral", "positive"],
//!     true,
//! ))?;
//!
//! let shape = ShapeDescription::new(ShapeDecl::new("SentimentResponse").field(
//!     FieldDescriptor::new("sentiment", FieldKind::Vocab("sentiment".to_string())),
//! ));
//! let artifact = generate_schema(&shape, &vocabs)?;
//!
//! let model = OpenAiModel::new(OpenAiConfig::from_env()?)?;
//! let translator = Translator::new(model, artifact);
//! let outcome = translator.translate("tickets were expensive but the show was great").await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod cancel;
pub mod error;
pub mod prompt;
pub mod schema;
pub mod translator;
pub mod types;
pub mod validate;
pub mod vocab;

// Re-export main types for convenience
pub use backends::LanguageModel;
pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use prompt::{PromptBuilder, RepairContext};
pub use schema::{generate_schema, SchemaArtifact, UNRECOGNIZED_TOKEN};
pub use translator::{Translator, DEFAULT_MAX_REPAIR_ATTEMPTS};
pub use types::{
    // Shape descriptors
    FieldDescriptor, FieldKind, ShapeDecl, ShapeDescription,

    // Request types
    ConversationEntry, Role, SamplingParams, TranslationRequest,

    // Outcome types
    Diagnostic, DiagnosticKind, TranslatedInstance, TranslationMetadata,
    TranslationOutcome, UnrecognizedValue,
};
pub use validate::{extract_json, ValidationReport, Validator};
pub use vocab::{Vocabulary, VocabularyRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_creation() {
        let err = Error::UnsupportedShape {
            message: "Test error".to_string(),
            shape: None,
        };
        assert!(err.to_string().contains("Test error"));
    }
}
