//! Validation of raw model output against a schema artifact
//!
//! The validator extracts the first JSON value from the raw text, walks it
//! against the structural schema, and checks vocabulary-constrained fields.
//! All findings are collected rather than stopping at the first, so a repair
//! prompt can report everything wrong with an attempt at once.
//!
//! Copyright (c) 2025 Typecast Team
//! Licensed under the MIT or Apache-2.0 license

mod extract;

pub use extract::extract_json;

use serde_json::Value;

use crate::schema::SchemaArtifact;
use crate::types::{
    Diagnostic, DiagnosticKind, FieldKind, ShapeDecl, TranslatedInstance, UnrecognizedValue,
};

/// Result of validating one raw model output
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationReport {
    /// Zero structural diagnostics; unrecognized open-vocabulary values may
    /// still be recorded on the instance
    Valid(TranslatedInstance),
    /// One or more diagnostics; drives the repair loop
    Invalid(Vec<Diagnostic>),
}

/// Validates raw text against one schema artifact
///
/// Holds only a shared reference to the artifact, so one validator per
/// request is cheap and concurrent requests need no coordination.
pub struct Validator<'a> {
    artifact: &'a SchemaArtifact,
}

impl<'a> Validator<'a> {
    pub fn new(artifact: &'a SchemaArtifact) -> Self {
        Self { artifact }
    }

    /// Extract, parse, and check raw model output
    pub fn validate(&self, raw: &str) -> ValidationReport {
        let Some(candidate) = extract_json(raw) else {
            return ValidationReport::Invalid(vec![Diagnostic::new(
                DiagnosticKind::MalformedJson,
                "$",
                "no JSON value found in the response",
            )]);
        };

        let value: Value = match serde_json::from_str(candidate) {
            Ok(value) => value,
            Err(err) => {
                return ValidationReport::Invalid(vec![Diagnostic::new(
                    DiagnosticKind::MalformedJson,
                    "$",
                    format!("extracted JSON does not parse: {}", err),
                )]);
            }
        };

        let mut diagnostics = Vec::new();
        let mut unrecognized = Vec::new();
        let root = self
            .artifact
            .shape(self.artifact.root())
            .expect("artifact always contains its root shape");
        self.check_shape(root, &value, "$", &mut diagnostics, &mut unrecognized);

        if diagnostics.is_empty() {
            ValidationReport::Valid(TranslatedInstance {
                value,
                unrecognized,
            })
        } else {
            ValidationReport::Invalid(diagnostics)
        }
    }

    fn check_shape(
        &self,
        decl: &ShapeDecl,
        value: &Value,
        path: &str,
        diagnostics: &mut Vec<Diagnostic>,
        unrecognized: &mut Vec<UnrecognizedValue>,
    ) {
        let Some(object) = value.as_object() else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::TypeMismatch,
                path,
                format!("expected an object of type '{}'", decl.name),
            ));
            return;
        };

        for field in &decl.fields {
            let field_path = join_path(path, &field.name);
            match object.get(&field.name) {
                None | Some(Value::Null) => {
                    if !field.optional {
                        diagnostics.push(Diagnostic::new(
                            DiagnosticKind::MissingField,
                            &field_path,
                            format!("required field '{}' is missing", field.name),
                        ));
                    }
                }
                Some(present) => {
                    if field.repeated {
                        let Some(items) = present.as_array() else {
                            diagnostics.push(Diagnostic::new(
                                DiagnosticKind::TypeMismatch,
                                &field_path,
                                "expected an array",
                            ));
                            continue;
                        };
                        for (i, item) in items.iter().enumerate() {
                            let item_path = format!("{}[{}]", field_path, i);
                            self.check_value(
                                &field.kind,
                                item,
                                &item_path,
                                diagnostics,
                                unrecognized,
                            );
                        }
                    } else {
                        self.check_value(
                            &field.kind,
                            present,
                            &field_path,
                            diagnostics,
                            unrecognized,
                        );
                    }
                }
            }
        }
        // Fields not declared by the shape are tolerated and pass through.
    }

    fn check_value(
        &self,
        kind: &FieldKind,
        value: &Value,
        path: &str,
        diagnostics: &mut Vec<Diagnostic>,
        unrecognized: &mut Vec<UnrecognizedValue>,
    ) {
        match kind {
            FieldKind::String | FieldKind::Date => {
                if !value.is_string() {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::TypeMismatch,
                        path,
                        "expected a string",
                    ));
                }
            }
            FieldKind::Number => {
                if !value.is_number() {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::TypeMismatch,
                        path,
                        "expected a number",
                    ));
                }
            }
            FieldKind::Boolean => {
                if !value.is_boolean() {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::TypeMismatch,
                        path,
                        "expected a boolean",
                    ));
                }
            }
            FieldKind::Any => {}
            FieldKind::Vocab(name) => {
                let Some(token) = value.as_str() else {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::TypeMismatch,
                        path,
                        "expected a string",
                    ));
                    return;
                };
                let vocab = self
                    .artifact
                    .vocabulary(name)
                    .expect("artifact resolves vocabularies at generation time");
                if vocab.contains(token) {
                    return;
                }
                if vocab.rejects_unrecognized() {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnknownVocabValue,
                        path,
                        format!(
                            "'{}' is not one of the allowed values: {}",
                            token,
                            vocab.tokens().join(", ")
                        ),
                    ));
                } else {
                    unrecognized.push(UnrecognizedValue {
                        path: path.to_string(),
                        vocabulary: name.clone(),
                        value: token.to_string(),
                    });
                }
            }
            FieldKind::Shape(name) => {
                let decl = self
                    .artifact
                    .shape(name)
                    .expect("artifact contains every discovered shape");
                self.check_shape(decl, value, path, diagnostics, unrecognized);
            }
        }
    }
}

/// Join a parent path and field name, eliding the `$` root marker
fn join_path(parent: &str, field: &str) -> String {
    if parent == "$" {
        field.to_string()
    } else {
        format!("{}.{}", parent, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::generate_schema;
    use crate::types::{FieldDescriptor, ShapeDescription};
    use crate::vocab::{Vocabulary, VocabularyRegistry};

    fn order_artifact() -> SchemaArtifact {
        let mut registry = VocabularyRegistry::new();
        registry
            .register(Vocabulary::new("size", ["small", "medium", "large"], true))
            .unwrap();

        let description = ShapeDescription::new(
            ShapeDecl::new("Order")
                .field(FieldDescriptor::new("customer", FieldKind::String))
                .field(FieldDescriptor::new("note", FieldKind::String).optional())
                .field(
                    FieldDescriptor::new("items", FieldKind::Shape("LineItem".to_string()))
                        .repeated(),
                ),
        )
        .with_shape(
            ShapeDecl::new("LineItem")
                .field(FieldDescriptor::new("name", FieldKind::String))
                .field(FieldDescriptor::new("size", FieldKind::Vocab("size".to_string())))
                .field(FieldDescriptor::new("quantity", FieldKind::Number)),
        );

        generate_schema(&description, &registry).unwrap()
    }

    #[test]
    fn test_valid_instance() {
        let artifact = order_artifact();
        let raw = r#"{"customer": "Ada", "items": [{"name": "latte", "size": "large", "quantity": 1}]}"#;

        match Validator::new(&artifact).validate(raw) {
            ValidationReport::Valid(instance) => {
                assert_eq!(instance.value["customer"], "Ada");
                assert!(instance.unrecognized.is_empty());
            }
            ValidationReport::Invalid(diags) => panic!("unexpected diagnostics: {:?}", diags),
        }
    }

    #[test]
    fn test_valid_with_surrounding_prose() {
        let artifact = order_artifact();
        let raw = "Here you go:\n```json\n{\"customer\": \"Ada\", \"items\": []}\n```";
        assert!(matches!(
            Validator::new(&artifact).validate(raw),
            ValidationReport::Valid(_)
        ));
    }

    #[test]
    fn test_missing_required_field() {
        let artifact = order_artifact();
        let raw = r#"{"items": []}"#;

        let ValidationReport::Invalid(diags) = Validator::new(&artifact).validate(raw) else {
            panic!("expected diagnostics");
        };
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::MissingField);
        assert_eq!(diags[0].path, "customer");
    }

    #[test]
    fn test_null_required_field_is_missing() {
        let artifact = order_artifact();
        let raw = r#"{"customer": null, "items": []}"#;

        let ValidationReport::Invalid(diags) = Validator::new(&artifact).validate(raw) else {
            panic!("expected diagnostics");
        };
        assert_eq!(diags[0].kind, DiagnosticKind::MissingField);
    }

    #[test]
    fn test_type_mismatch_in_nested_element() {
        let artifact = order_artifact();
        let raw = r#"{"customer": "Ada", "items": [{"name": "latte", "size": "large", "quantity": "one"}]}"#;

        let ValidationReport::Invalid(diags) = Validator::new(&artifact).validate(raw) else {
            panic!("expected diagnostics");
        };
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::TypeMismatch);
        assert_eq!(diags[0].path, "items[0].quantity");
    }

    #[test]
    fn test_closed_vocab_rejects_unknown_value() {
        let artifact = order_artifact();
        let raw = r#"{"customer": "Ada", "items": [{"name": "latte", "size": "venti", "quantity": 1}]}"#;

        let ValidationReport::Invalid(diags) = Validator::new(&artifact).validate(raw) else {
            panic!("expected diagnostics");
        };
        assert_eq!(diags[0].kind, DiagnosticKind::UnknownVocabValue);
        assert_eq!(diags[0].path, "items[0].size");
        assert!(diags[0].message.contains("venti"));
    }

    #[test]
    fn test_open_vocab_records_unrecognized_value() {
        let mut registry = VocabularyRegistry::new();
        registry
            .register(Vocabulary::new("genre", ["rock", "jazz"], false))
            .unwrap();
        let description = ShapeDescription::new(
            ShapeDecl::new("Track")
                .field(FieldDescriptor::new("genre", FieldKind::Vocab("genre".to_string()))),
        );
        let artifact = generate_schema(&description, &registry).unwrap();

        let ValidationReport::Valid(instance) =
            Validator::new(&artifact).validate(r#"{"genre": "zydeco"}"#)
        else {
            panic!("open vocabulary should not fail validation");
        };
        assert_eq!(instance.unrecognized.len(), 1);
        assert_eq!(instance.unrecognized[0].value, "zydeco");
        assert_eq!(instance.unrecognized[0].vocabulary, "genre");
        assert_eq!(instance.unrecognized[0].path, "genre");
    }

    #[test]
    fn test_open_vocab_with_repair_policy_fails() {
        let mut registry = VocabularyRegistry::new();
        registry
            .register(
                Vocabulary::new("genre", ["rock", "jazz"], false)
                    .with_repair_on_unrecognized(true),
            )
            .unwrap();
        let description = ShapeDescription::new(
            ShapeDecl::new("Track")
                .field(FieldDescriptor::new("genre", FieldKind::Vocab("genre".to_string()))),
        );
        let artifact = generate_schema(&description, &registry).unwrap();

        let ValidationReport::Invalid(diags) =
            Validator::new(&artifact).validate(r#"{"genre": "zydeco"}"#)
        else {
            panic!("repair policy should fail validation");
        };
        assert_eq!(diags[0].kind, DiagnosticKind::UnknownVocabValue);
    }

    #[test]
    fn test_undeclared_fields_are_tolerated() {
        let artifact = order_artifact();
        let raw = r#"{"customer": "Ada", "items": [], "confidence": 0.98}"#;
        assert!(matches!(
            Validator::new(&artifact).validate(raw),
            ValidationReport::Valid(_)
        ));
    }

    #[test]
    fn test_malformed_output() {
        let artifact = order_artifact();

        let ValidationReport::Invalid(diags) =
            Validator::new(&artifact).validate("I refuse to answer in JSON.")
        else {
            panic!("expected diagnostics");
        };
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::MalformedJson);
        assert_eq!(diags[0].path, "$");
    }

    #[test]
    fn test_multiple_diagnostics_collected() {
        let artifact = order_artifact();
        let raw = r#"{"note": 7, "items": [{"size": "large", "quantity": true}]}"#;

        let ValidationReport::Invalid(diags) = Validator::new(&artifact).validate(raw) else {
            panic!("expected diagnostics");
        };
        // customer missing, note wrong type, items[0].name missing, quantity wrong type
        assert_eq!(diags.len(), 4);
    }
}
