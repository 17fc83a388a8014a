//! Prompt assembly for initial and repair attempts
//!
//! The builder is pure: given the same artifact, request, history, and repair
//! context it produces the same text. It keeps no state between calls; the
//! translator supplies the full context for every attempt.

use crate::schema::SchemaArtifact;
use crate::types::{ConversationEntry, Diagnostic};

/// Context carried from a failed attempt into the next prompt
#[derive(Debug, Clone, Copy)]
pub struct RepairContext<'a> {
    /// Verbatim raw output of the previous attempt
    pub raw_output: &'a str,
    /// Diagnostics produced by validating that output
    pub diagnostics: &'a [Diagnostic],
}

/// Assembles the exact text sent to the language model for one attempt
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    instruction: Option<String>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the default system instruction
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Build the prompt for one attempt
    ///
    /// `repair` is `None` for the first attempt. History entries are rendered
    /// oldest first, before the current request.
    pub fn build(
        &self,
        artifact: &SchemaArtifact,
        request_text: &str,
        history: &[ConversationEntry],
        repair: Option<&RepairContext<'_>>,
    ) -> String {
        let mut prompt = String::new();

        match &self.instruction {
            Some(instruction) => {
                prompt.push_str(instruction);
                prompt.push('\n');
            }
            None => {
                prompt.push_str(&format!(
                    "You are a service that translates user requests into JSON objects of type \"{}\" according to the following TypeScript definitions:\n",
                    artifact.root()
                ));
            }
        }
        prompt.push_str("```\n");
        prompt.push_str(artifact.schema_text());
        prompt.push_str("```\n");

        if !history.is_empty() {
            prompt.push_str("The following is the conversation so far:\n");
            for entry in history {
                prompt.push_str(&format!("{}: {}\n", entry.role, entry.text));
            }
        }

        prompt.push_str("The following is a user request:\n");
        prompt.push_str("\"\"\"\n");
        prompt.push_str(request_text);
        prompt.push_str("\n\"\"\"\n");

        match repair {
            None => {
                prompt.push_str(
                    "The following is the user request translated into a JSON object with no properties whose value is undefined:\n",
                );
            }
            Some(context) => {
                prompt.push_str("The following is the latest attempt at a translation:\n");
                prompt.push_str("\"\"\"\n");
                prompt.push_str(context.raw_output);
                prompt.push_str("\n\"\"\"\n");
                prompt.push_str("The attempt is invalid for the following reasons:\n");
                for diagnostic in context.diagnostics {
                    prompt.push_str(&format!(
                        "- {}: {}\n",
                        diagnostic.path, diagnostic.message
                    ));
                }
                prompt.push_str(
                    "The following is a corrected JSON object that conforms to the schema:\n",
                );
            }
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::generate_schema;
    use crate::types::{
        DiagnosticKind, FieldDescriptor, FieldKind, ShapeDecl, ShapeDescription,
    };
    use crate::vocab::VocabularyRegistry;

    fn artifact() -> SchemaArtifact {
        let description = ShapeDescription::new(
            ShapeDecl::new("Reply").field(FieldDescriptor::new("text", FieldKind::String)),
        );
        generate_schema(&description, &VocabularyRegistry::new()).unwrap()
    }

    #[test]
    fn test_initial_prompt_contents() {
        let artifact = artifact();
        let prompt = PromptBuilder::new().build(&artifact, "say hi", &[], None);

        assert!(prompt.contains("JSON objects of type \"Reply\""));
        assert!(prompt.contains(artifact.schema_text()));
        assert!(prompt.contains("say hi"));
        assert!(!prompt.contains("invalid"));
    }

    #[test]
    fn test_history_is_rendered_oldest_first() {
        let artifact = artifact();
        let history = vec![
            ConversationEntry::user("first"),
            ConversationEntry::assistant("second"),
        ];
        let prompt = PromptBuilder::new().build(&artifact, "third", &history, None);

        let first = prompt.find("user: first").unwrap();
        let second = prompt.find("assistant: second").unwrap();
        let request = prompt.find("third").unwrap();
        assert!(first < second);
        assert!(second < request);
    }

    #[test]
    fn test_repair_prompt_carries_output_and_diagnostics() {
        let artifact = artifact();
        let diagnostics = vec![Diagnostic::new(
            DiagnosticKind::MissingField,
            "text",
            "required field 'text' is missing",
        )];
        let context = RepairContext {
            raw_output: r#"{"wrong": true}"#,
            diagnostics: &diagnostics,
        };
        let prompt = PromptBuilder::new().build(&artifact, "say hi", &[], Some(&context));

        assert!(prompt.contains(r#"{"wrong": true}"#));
        assert!(prompt.contains("- text: required field 'text' is missing"));
        assert!(prompt.contains("corrected JSON object"));
    }

    #[test]
    fn test_builder_is_pure() {
        let artifact = artifact();
        let builder = PromptBuilder::new();
        let a = builder.build(&artifact, "same input", &[], None);
        let b = builder.build(&artifact, "same input", &[], None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_instruction() {
        let artifact = artifact();
        let prompt = PromptBuilder::new()
            .with_instruction("Translate into the schema below.")
            .build(&artifact, "say hi", &[], None);
        assert!(prompt.starts_with("Translate into the schema below.\n"));
        assert!(!prompt.contains("You are a service"));
    }
}
