//! Named vocabularies and the registry that resolves them
//!
//! A vocabulary is a named, ordered set of allowed string tokens. Closed
//! vocabularies reject unknown values during validation; open vocabularies
//! admit them but record them in the instance's unrecognized side-list.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A named, immutable set of allowed string tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    name: String,
    tokens: Vec<String>,
    closed: bool,
    /// Whether an out-of-vocabulary value in an open vocabulary should drive
    /// the repair loop instead of being recorded and accepted
    #[serde(default)]
    repair_on_unrecognized: bool,
}

impl Vocabulary {
    /// Create a vocabulary from the given tokens
    ///
    /// Duplicate tokens are dropped, keeping first-occurrence order so the
    /// generated schema text stays deterministic.
    pub fn new<I, S>(name: impl Into<String>, tokens: I, closed: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = Vec::new();
        for token in tokens {
            let token = token.into();
            if !seen.contains(&token) {
                seen.push(token);
            }
        }
        Self {
            name: name.into(),
            tokens: seen,
            closed,
            repair_on_unrecognized: false,
        }
    }

    /// Opt an open vocabulary into strict handling: unrecognized values emit
    /// a diagnostic and trigger repair rather than being accepted.
    ///
    /// Has no effect on closed vocabularies, which always repair.
    pub fn with_repair_on_unrecognized(mut self, repair: bool) -> Self {
        self.repair_on_unrecognized = repair;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tokens in registration order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether an out-of-vocabulary value should fail validation
    pub fn rejects_unrecognized(&self) -> bool {
        self.closed || self.repair_on_unrecognized
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }
}

/// Name-keyed collection of vocabularies, read-only after registration
///
/// Registration happens once during setup; after that the registry is shared
/// immutably across concurrent translation requests.
#[derive(Debug, Clone, Default)]
pub struct VocabularyRegistry {
    vocabularies: HashMap<String, Vocabulary>,
}

impl VocabularyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a vocabulary under its name
    ///
    /// Fails with `DuplicateVocabulary` if the name is already taken.
    pub fn register(&mut self, vocabulary: Vocabulary) -> Result<()> {
        if self.vocabularies.contains_key(vocabulary.name()) {
            return Err(Error::DuplicateVocabulary {
                name: vocabulary.name().to_string(),
            });
        }
        self.vocabularies
            .insert(vocabulary.name().to_string(), vocabulary);
        Ok(())
    }

    /// Resolve a vocabulary by name
    ///
    /// Fails with `UnknownVocabulary` if no vocabulary was registered under it.
    pub fn resolve(&self, name: &str) -> Result<&Vocabulary> {
        self.vocabularies
            .get(name)
            .ok_or_else(|| Error::UnknownVocabulary {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vocabularies.contains_key(name)
    }
}
