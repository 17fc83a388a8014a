//! Schema generation: shape graph in, schema artifact out
//!
//! Turns a [`ShapeDescription`] and the vocabularies it references into a
//! [`SchemaArtifact`]: TypeScript-flavored schema text shown to the model,
//! plus the structural tables the validator walks. Generation is a pure
//! function of its inputs; identical inputs produce byte-identical text.
//!
//! Copyright (c) 2025 Typecast Team
//! Licensed under the MIT or Apache-2.0 license

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{FieldKind, ShapeDecl, ShapeDescription};
use crate::vocab::{Vocabulary, VocabularyRegistry};

/// Marker token added to an open vocabulary's union so the model has a legal
/// way to signal a value outside the listed tokens
pub const UNRECOGNIZED_TOKEN: &str = "unrecognized";

/// Generated schema: the text sent to the model plus the structural tables
/// used for validation
///
/// Read-only after generation and safe to share across concurrent requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaArtifact {
    root: String,
    schema_text: String,
    shapes: BTreeMap<String, ShapeDecl>,
    vocabularies: BTreeMap<String, Vocabulary>,
}

impl SchemaArtifact {
    /// Name of the root shape
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The schema text rendered into prompts
    pub fn schema_text(&self) -> &str {
        &self.schema_text
    }

    /// Structural declaration for a named shape
    pub fn shape(&self, name: &str) -> Option<&ShapeDecl> {
        self.shapes.get(name)
    }

    /// A vocabulary referenced by the schema
    pub fn vocabulary(&self, name: &str) -> Option<&Vocabulary> {
        self.vocabularies.get(name)
    }
}

/// Generate a schema artifact from a shape description
///
/// Named shapes are emitted once each, in first-discovery order starting from
/// the root. Fails with `UnknownVocabulary` when a field references an
/// unregistered vocabulary, and with `UnsupportedShape` when a shape
/// reference is dangling or a cycle of required references admits no finite
/// instance.
pub fn generate_schema(
    description: &ShapeDescription,
    registry: &VocabularyRegistry,
) -> Result<SchemaArtifact> {
    let order = discover(description)?;
    check_termination(description, &order)?;

    let mut vocabularies = BTreeMap::new();
    for name in &order {
        let decl = description.get(name).expect("discovered shape exists");
        for field in &decl.fields {
            if let FieldKind::Vocab(vocab_name) = &field.kind {
                if !vocabularies.contains_key(vocab_name) {
                    let vocab = registry.resolve(vocab_name)?;
                    vocabularies.insert(vocab_name.clone(), vocab.clone());
                }
            }
        }
    }

    let schema_text = render(description, &order, &vocabularies);

    let shapes = order
        .iter()
        .map(|name| {
            let decl = description.get(name).expect("discovered shape exists");
            (name.clone(), decl.clone())
        })
        .collect();

    Ok(SchemaArtifact {
        root: description.root().to_string(),
        schema_text,
        shapes,
        vocabularies,
    })
}

/// Walk the shape graph from the root, recording first-discovery order
fn discover(description: &ShapeDescription) -> Result<Vec<String>> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    visit(description, description.root(), &mut order, &mut seen)?;
    Ok(order)
}

fn visit(
    description: &ShapeDescription,
    name: &str,
    order: &mut Vec<String>,
    seen: &mut HashSet<String>,
) -> Result<()> {
    if !seen.insert(name.to_string()) {
        return Ok(());
    }
    let decl = description
        .get(name)
        .ok_or_else(|| Error::UnsupportedShape {
            message: format!("shape '{}' is referenced but never declared", name),
            shape: Some(name.to_string()),
        })?;
    order.push(name.to_string());
    for field in &decl.fields {
        if let FieldKind::Shape(nested) = &field.kind {
            visit(description, nested, order, seen)?;
        }
    }
    Ok(())
}

/// Reject shape cycles that admit no finite instance
///
/// A shape terminates when every required, non-repeated shape-typed field
/// references a terminating shape. Optional and repeated fields terminate
/// trivially (absent field, empty array). Computed as a fixpoint over the
/// discovered declarations.
fn check_termination(description: &ShapeDescription, order: &[String]) -> Result<()> {
    let mut terminating: HashSet<&str> = HashSet::new();
    loop {
        let mut changed = false;
        for name in order {
            if terminating.contains(name.as_str()) {
                continue;
            }
            let decl = description.get(name).expect("discovered shape exists");
            let terminates = decl.fields.iter().all(|field| match &field.kind {
                FieldKind::Shape(nested) if !field.optional && !field.repeated => {
                    terminating.contains(nested.as_str())
                }
                _ => true,
            });
            if terminates {
                terminating.insert(name.as_str());
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    if let Some(stuck) = order.iter().find(|n| !terminating.contains(n.as_str())) {
        return Err(Error::UnsupportedShape {
            message: format!(
                "shape '{}' participates in a required reference cycle with no terminating primitive",
                stuck
            ),
            shape: Some(stuck.clone()),
        });
    }
    Ok(())
}

fn render(
    description: &ShapeDescription,
    order: &[String],
    vocabularies: &BTreeMap<String, Vocabulary>,
) -> String {
    let mut out = String::new();
    for (i, name) in order.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let decl = description.get(name).expect("discovered shape exists");
        render_decl(decl, vocabularies, &mut out);
    }
    out
}

fn render_decl(decl: &ShapeDecl, vocabularies: &BTreeMap<String, Vocabulary>, out: &mut String) {
    if let Some(comment) = &decl.comment {
        out.push_str(&format!("// {}\n", comment));
    }
    out.push_str(&format!("export interface {} {{\n", decl.name));
    for field in &decl.fields {
        if let Some(comment) = &field.comment {
            out.push_str(&format!("    // {}\n", comment));
        }
        let marker = if field.optional { "?" } else { "" };
        let ty = render_type(&field.kind, field.repeated, vocabularies);
        out.push_str(&format!("    {}{}: {};\n", field.name, marker, ty));
    }
    out.push_str("}\n");
}

fn render_type(
    kind: &FieldKind,
    repeated: bool,
    vocabularies: &BTreeMap<String, Vocabulary>,
) -> String {
    let element = match kind {
        FieldKind::String | FieldKind::Date => "string".to_string(),
        FieldKind::Number => "number".to_string(),
        FieldKind::Boolean => "boolean".to_string(),
        FieldKind::Any => "any".to_string(),
        FieldKind::Shape(name) => name.clone(),
        FieldKind::Vocab(name) => {
            let vocab = vocabularies
                .get(name)
                .expect("referenced vocabularies are resolved before rendering");
            let mut tokens: Vec<String> =
                vocab.tokens().iter().map(|t| format!("\"{}\"", t)).collect();
            if !vocab.is_closed() {
                tokens.push(format!("\"{}\"", UNRECOGNIZED_TOKEN));
            }
            tokens.join(" | ")
        }
    };

    if repeated {
        if element.contains('|') {
            format!("({})[]", element)
        } else {
            format!("{}[]", element)
        }
    } else {
        element
    }
}
