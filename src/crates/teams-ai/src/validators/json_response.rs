use super::{PromptResponseValidator, Validation};
use crate::error::{Result, TeamsAiError};
use crate::logging::log_text;
use crate::memory::Memory;
use crate::prompt::PromptResponse;
use crate::response::parse_all_json;
use crate::tokenizer::Tokenizer;
use async_trait::async_trait;
use jsonschema::error::{TypeKind, ValidationErrorKind};
use jsonschema::{JSONSchema, ValidationError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::debug;

/// Feedback when the response holds no JSON object
pub const DEFAULT_MISSING_JSON_FEEDBACK: &str =
    "No valid JSON objects were found in the response. Return a valid JSON object.";

/// Header placed above the list of schema fixes
pub const DEFAULT_ERROR_FEEDBACK: &str = "The JSON returned had errors. Apply these fixes:";

/// Finds a JSON object in the response and checks it against a JSON Schema
///
/// Every object in the response is tried in order and the first one that
/// passes wins. When none pass, the feedback describes what is wrong with
/// the first one, one fix per line:
///
/// ```text
/// The JSON returned had errors. Apply these fixes:
/// add the "action" property to "instance"
/// convert "instance.thoughts.plan" to a string
/// ```
pub struct JsonResponseValidator<T = Value> {
    schema: Option<Value>,
    compiled: Option<JSONSchema>,
    missing_json_feedback: String,
    error_feedback: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for JsonResponseValidator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonResponseValidator")
            .field("schema", &self.schema)
            .field("missing_json_feedback", &self.missing_json_feedback)
            .field("error_feedback", &self.error_feedback)
            .finish()
    }
}

impl<T> JsonResponseValidator<T> {
    /// Create a validator, compiling `schema` up front
    ///
    /// Without a schema any JSON object is accepted.
    pub fn new(schema: Option<Value>) -> Result<Self> {
        let compiled = schema
            .as_ref()
            .map(|schema| {
                JSONSchema::compile(schema).map_err(|e| TeamsAiError::InvalidSchema(e.to_string()))
            })
            .transpose()?;

        Ok(Self {
            schema,
            compiled,
            missing_json_feedback: DEFAULT_MISSING_JSON_FEEDBACK.to_string(),
            error_feedback: DEFAULT_ERROR_FEEDBACK.to_string(),
            _value: PhantomData,
        })
    }

    /// Feedback used when no JSON object is found
    pub fn with_missing_json_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.missing_json_feedback = feedback.into();
        self
    }

    /// Header placed above the schema fixes
    pub fn with_error_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.error_feedback = feedback.into();
        self
    }

    pub fn schema(&self) -> Option<&Value> {
        self.schema.as_ref()
    }

    /// Check an already-parsed value against the schema
    pub fn validate_value(&self, value: &Value) -> Validation<()> {
        let Some(compiled) = &self.compiled else {
            return Validation::valid(());
        };

        // Errors borrow the compiled schema, so render them before it goes away
        let fixes = match compiled.validate(value) {
            Ok(()) => return Validation::valid(()),
            Err(errors) => errors
                .flat_map(|error| error_fixes(&error, value))
                .collect::<Vec<_>>(),
        };

        Validation::invalid(format!("{}\n{}", self.error_feedback, fixes.join("\n")))
    }
}

impl<T: DeserializeOwned> JsonResponseValidator<T> {
    /// Validate raw response text
    pub fn validate_text(&self, text: &str) -> Validation<T> {
        let candidates = parse_all_json(text);
        if candidates.is_empty() {
            debug!(text = %log_text(text), "No JSON object in response");
            return Validation::invalid(self.missing_json_feedback.clone());
        }

        let mut first_feedback = None;
        for candidate in candidates {
            let feedback = match self.validate_value(&candidate) {
                Validation::Valid(()) => match serde_json::from_value::<T>(candidate) {
                    Ok(value) => return Validation::valid(value),
                    Err(e) => format!("{}\n{}", self.error_feedback, e),
                },
                Validation::Invalid { feedback } => feedback,
            };
            first_feedback.get_or_insert(feedback);
        }

        let feedback = first_feedback.unwrap_or_else(|| self.missing_json_feedback.clone());
        debug!(feedback = %feedback, "JSON response rejected");
        Validation::invalid(feedback)
    }
}

#[async_trait]
impl<T> PromptResponseValidator for JsonResponseValidator<T>
where
    T: DeserializeOwned + Send,
{
    type Value = T;

    async fn validate_response(
        &self,
        _memory: &dyn Memory,
        _tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        _remaining_attempts: usize,
    ) -> Validation<T> {
        self.validate_text(response.text())
    }
}

fn error_fixes(error: &ValidationError<'_>, root: &Value) -> Vec<String> {
    let path = render_path(root, &error.instance_path.to_string());
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            vec![format!(
                "add the \"{}\" property to \"{}\"",
                property_name(property),
                path
            )]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|property| format!("remove the \"{}\" property from \"{}\"", property, path))
            .collect(),
        ValidationErrorKind::Type {
            kind: TypeKind::Single(expected),
        } => vec![format!("convert \"{}\" to a {}", path, expected)],
        ValidationErrorKind::Type {
            kind: TypeKind::Multiple(_),
        }
        | ValidationErrorKind::AnyOf => vec![format!(
            "convert \"{}\" to one of the allowed types in the provided schema.",
            path
        )],
        _ => vec![format!("\"{}\" {}. Fix that", path, error)],
    }
}

fn property_name(property: &Value) -> String {
    match property {
        Value::String(name) => name.clone(),
        other => other.to_string(),
    }
}

/// Render a JSON pointer as `instance.a.b[0]`
///
/// The instance is walked alongside the pointer so array indexes and
/// numeric property names are told apart.
fn render_path(root: &Value, pointer: &str) -> String {
    let mut path = String::from("instance");
    let mut current = Some(root);

    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        match (current, segment.parse::<usize>()) {
            (Some(Value::Array(items)), Ok(index)) => {
                path.push_str(&format!("[{}]", index));
                current = items.get(index);
            }
            (value, _) => {
                path.push('.');
                path.push_str(&segment);
                current = value.and_then(|value| value.get(segment.as_str()));
            }
        }
    }

    path
}
