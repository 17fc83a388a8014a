//! Request orchestration: the generate → validate → repair loop
//!
//! The translator is the only component holding per-request control state.
//! Each request walks an explicit state machine: `Building → Generating →
//! Validating → {Succeeded | Repairing → Building | Failed}`. Cancellation is
//! observed at every transition boundary. Backend failures are hard errors;
//! they are never retried here and never count as repair attempts.
//!
//! Copyright (c) 2025 Typecast Team
//! Licensed under the MIT or Apache-2.0 license

use std::sync::Arc;
use std::time::Instant;

use crate::backends::LanguageModel;
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::prompt::{PromptBuilder, RepairContext};
use crate::schema::SchemaArtifact;
use crate::types::{
    Diagnostic, TranslationMetadata, TranslationOutcome, TranslationRequest,
};
use crate::validate::{ValidationReport, Validator};

/// Default cap on generation calls per request
pub const DEFAULT_MAX_REPAIR_ATTEMPTS: u32 = 3;

/// Per-request control state
enum State {
    Building,
    Generating { prompt: String },
    Validating { raw: String },
    Repairing { raw: String, diagnostics: Vec<Diagnostic> },
}

/// Translates natural-language requests into instances of one schema
///
/// Holds the schema artifact behind an `Arc`, so concurrent requests against
/// the same schema share it without coordination. The attempt loop of a
/// single request is strictly sequential: a repair prompt depends on the
/// previous attempt's validation result.
pub struct Translator<M> {
    model: M,
    artifact: Arc<SchemaArtifact>,
    builder: PromptBuilder,
    max_repair_attempts: u32,
}

impl<M: LanguageModel> Translator<M> {
    pub fn new(model: M, artifact: SchemaArtifact) -> Self {
        Self {
            model,
            artifact: Arc::new(artifact),
            builder: PromptBuilder::new(),
            max_repair_attempts: DEFAULT_MAX_REPAIR_ATTEMPTS,
        }
    }

    /// Cap the total generation calls per request (minimum 1)
    pub fn with_max_repair_attempts(mut self, attempts: u32) -> Self {
        self.max_repair_attempts = attempts.max(1);
        self
    }

    pub fn with_prompt_builder(mut self, builder: PromptBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// The schema artifact this translator validates against
    pub fn artifact(&self) -> &SchemaArtifact {
        &self.artifact
    }

    /// Translate a bare request with default sampling and no history
    pub async fn translate(&self, text: &str) -> Result<TranslationOutcome> {
        self.translate_request(&TranslationRequest::new(text), &CancelToken::new())
            .await
    }

    /// Translate a full request, observing the cancellation token
    ///
    /// Returns `Ok(Failed { .. })` when the output never validates within the
    /// attempt budget; returns `Err` only for backend failures, cancellation,
    /// or programmer errors.
    pub async fn translate_request(
        &self,
        request: &TranslationRequest,
        cancel: &CancelToken,
    ) -> Result<TranslationOutcome> {
        let start = Instant::now();
        let mut attempts = 0u32;
        let mut repair: Option<(String, Vec<Diagnostic>)> = None;
        let mut state = State::Building;

        loop {
            if cancel.is_cancelled() {
                tracing::debug!(attempts, "request cancelled");
                return Err(Error::Cancelled);
            }

            state = match state {
                State::Building => {
                    let context = repair.as_ref().map(|(raw, diagnostics)| RepairContext {
                        raw_output: raw,
                        diagnostics,
                    });
                    let prompt = self.builder.build(
                        &self.artifact,
                        &request.text,
                        &request.history,
                        context.as_ref(),
                    );
                    State::Generating { prompt }
                }
                State::Generating { prompt } => {
                    attempts += 1;
                    tracing::debug!(attempt = attempts, "invoking language model");
                    let raw = self
                        .model
                        .generate(&prompt, &request.sampling, cancel)
                        .await?;
                    State::Validating { raw }
                }
                State::Validating { raw } => {
                    match Validator::new(&self.artifact).validate(&raw) {
                        ValidationReport::Valid(instance) => {
                            tracing::debug!(attempts, "translation succeeded");
                            return Ok(TranslationOutcome::Succeeded {
                                instance,
                                metadata: self.metadata(attempts, start),
                            });
                        }
                        ValidationReport::Invalid(diagnostics) => {
                            if attempts >= self.max_repair_attempts {
                                tracing::warn!(attempts, "repair attempts exhausted");
                                return Ok(TranslationOutcome::Failed {
                                    diagnostics,
                                    attempts,
                                    metadata: self.metadata(attempts, start),
                                });
                            }
                            State::Repairing { raw, diagnostics }
                        }
                    }
                }
                State::Repairing { raw, diagnostics } => {
                    tracing::debug!(
                        attempt = attempts,
                        diagnostics = diagnostics.len(),
                        "attempt invalid, building repair prompt"
                    );
                    repair = Some((raw, diagnostics));
                    State::Building
                }
            };
        }
    }

    fn metadata(&self, attempts: u32, start: Instant) -> TranslationMetadata {
        TranslationMetadata {
            attempts,
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
