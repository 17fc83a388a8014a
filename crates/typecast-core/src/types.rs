//! Core types and data structures for the typecast translation engine
//!
//! This module defines the shape descriptors used to generate schemas, the
//! request/outcome types that flow through a translation, and the diagnostics
//! produced by validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// The kind of value a field holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// UTF-8 text
    String,
    /// Any JSON number
    Number,
    /// true / false
    Boolean,
    /// Date or time value; carried as a string (JSON has no temporal primitive)
    Date,
    /// Free-form object accepting arbitrary structure
    Any,
    /// Reference to a named vocabulary constraining the value
    Vocab(String),
    /// Reference to another named shape declaration
    Shape(String),
}

/// A single typed field within a shape declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name as it appears in the JSON instance
    pub name: String,

    /// What the field holds
    pub kind: FieldKind,

    /// Whether the field may be absent or null
    #[serde(default)]
    pub optional: bool,

    /// Whether the field is an ordered sequence of the element kind
    #[serde(default)]
    pub repeated: bool,

    /// Optional comment rendered into the schema text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl FieldDescriptor {
    /// Create a required, scalar field
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            repeated: false,
            comment: None,
        }
    }

    /// Mark the field as optional (absent or null permitted)
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark the field as an ordered collection of the element kind
    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// Attach a comment rendered into the schema text
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A named shape declaration: an ordered list of typed fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDecl {
    /// Declaration name, referenced by `FieldKind::Shape`
    pub name: String,

    /// Optional comment rendered above the declaration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Fields in declaration order
    pub fields: Vec<FieldDescriptor>,
}

impl ShapeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            comment: None,
            fields: Vec::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

/// A shape graph: an arena of named declarations plus the root name
///
/// Shapes reference each other by name rather than by live references, so
/// nested and self-referential shapes need no pointer cycles. Each named
/// declaration is emitted once regardless of how many fields reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDescription {
    root: String,
    shapes: Vec<ShapeDecl>,
}

impl ShapeDescription {
    /// Create a description whose root is the given declaration
    pub fn new(root: ShapeDecl) -> Self {
        Self {
            root: root.name.clone(),
            shapes: vec![root],
        }
    }

    /// Add a nested shape declaration to the arena
    pub fn with_shape(mut self, decl: ShapeDecl) -> Self {
        self.shapes.push(decl);
        self
    }

    /// Name of the root shape
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Look up a declaration by name
    pub fn get(&self, name: &str) -> Option<&ShapeDecl> {
        self.shapes.iter().find(|s| s.name == name)
    }

    /// All declarations, in insertion order
    pub fn shapes(&self) -> &[ShapeDecl] {
        &self.shapes
    }
}

/// Role of a conversation entry supplied with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One prior conversation entry, supplied by the caller per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub text: String,
}

impl ConversationEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
        }
    }
}

/// Sampling parameters forwarded to the language-model backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// One translation request: the text to translate plus optional context
#[derive(Debug, Clone, Default)]
pub struct TranslationRequest {
    /// Natural-language text to translate
    pub text: String,

    /// Prior conversation entries, oldest first
    pub history: Vec<ConversationEntry>,

    /// Sampling configuration for the backend
    pub sampling: SamplingParams,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<ConversationEntry>) -> Self {
        self.history = history;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }
}

/// Classification of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// No parseable JSON value was found in the model output
    MalformedJson,
    /// A required field is absent or null
    MissingField,
    /// A field holds a value of the wrong JSON kind
    TypeMismatch,
    /// A vocabulary-constrained field holds a token outside the vocabulary
    UnknownVocabValue,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::MalformedJson => write!(f, "malformed JSON"),
            DiagnosticKind::MissingField => write!(f, "missing field"),
            DiagnosticKind::TypeMismatch => write!(f, "type mismatch"),
            DiagnosticKind::UnknownVocabValue => write!(f, "unknown vocabulary value"),
        }
    }
}

/// A validation finding with its field path in dot/bracket notation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Field path such as `items[2].price`; `$` for the whole document
    pub path: String,
    pub message: String,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.path, self.message, self.kind)
    }
}

/// A value accepted by an open vocabulary but absent from its token set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnrecognizedValue {
    /// Field path where the value occurred
    pub path: String,
    /// Name of the open vocabulary that admitted it
    pub vocabulary: String,
    /// The out-of-vocabulary token
    pub value: String,
}

/// A validated instance plus any out-of-vocabulary values it carried
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedInstance {
    /// The JSON instance conforming to the schema
    pub value: Value,

    /// Values admitted by open vocabularies but not in their token sets
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unrecognized: Vec<UnrecognizedValue>,
}

impl TranslatedInstance {
    /// Deserialize the instance into a concrete caller type
    pub fn into_typed<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.value).map_err(Error::from)
    }
}

/// Metadata recorded about one completed translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationMetadata {
    /// Generation calls issued
    pub attempts: u32,
    /// Wall-clock duration of the whole request
    pub duration_ms: u64,
    /// RFC 3339 completion timestamp
    pub timestamp: String,
}

/// Terminal result of one translation request
///
/// Validation failure after the attempt limit is a normal terminal result,
/// not an error: `translate` never returns `Err` for recoverable findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TranslationOutcome {
    Succeeded {
        instance: TranslatedInstance,
        metadata: TranslationMetadata,
    },
    Failed {
        /// Diagnostics from the final attempt
        diagnostics: Vec<Diagnostic>,
        /// Generation calls issued before giving up
        attempts: u32,
        metadata: TranslationMetadata,
    },
}

impl TranslationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TranslationOutcome::Succeeded { .. })
    }

    /// The validated instance, if the translation succeeded
    pub fn instance(&self) -> Option<&TranslatedInstance> {
        match self {
            TranslationOutcome::Succeeded { instance, .. } => Some(instance),
            TranslationOutcome::Failed { .. } => None,
        }
    }

    /// Generation calls issued for this request
    pub fn attempts(&self) -> u32 {
        match self {
            TranslationOutcome::Succeeded { metadata, .. } => metadata.attempts,
            TranslationOutcome::Failed { attempts, .. } => *attempts,
        }
    }
}
