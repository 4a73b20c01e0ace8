//! Action declarations surfaced to the model
//!
//! A [`ChatCompletionAction`] describes something the host can do: a name,
//! an optional description and an optional JSON Schema for its parameters.
//! Augmentations render these into the prompt and check model output against
//! them. Dispatch to handlers stays with the host.

use crate::error::{Result, TeamsAiError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

fn action_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap())
}

/// Whether `name` is a legal action name
pub fn is_valid_action_name(name: &str) -> bool {
    action_name_pattern().is_match(name)
}

/// A capability the model may ask the host to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionAction {
    /// Letters, digits, `_` and `-`, at most 64 characters
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema of the parameters object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl ChatCompletionAction {
    /// Declare an action, rejecting names the model APIs would refuse
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let action = Self {
            name: name.into(),
            description: None,
            parameters: None,
        };
        action.validate()?;
        Ok(action)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Check the declaration
    ///
    /// Needed for actions built through deserialization, which skips
    /// [`ChatCompletionAction::new`].
    pub fn validate(&self) -> Result<()> {
        if !is_valid_action_name(&self.name) {
            return Err(TeamsAiError::InvalidAction {
                name: self.name.clone(),
                reason: "name must be 1-64 characters of letters, digits, '_' or '-'".to_string(),
            });
        }

        if let Some(parameters) = &self.parameters {
            if !parameters.is_object() {
                return Err(TeamsAiError::InvalidAction {
                    name: self.name.clone(),
                    reason: "parameters must be a JSON Schema object".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Names listed in the parameter schema's `required` array
    pub fn required_parameters(&self) -> Vec<&str> {
        self.parameters
            .as_ref()
            .and_then(|schema| schema.get("required"))
            .and_then(Value::as_array)
            .map(|required| required.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Validate a whole action list
pub fn validate_actions(actions: &[ChatCompletionAction]) -> Result<()> {
    actions.iter().try_for_each(ChatCompletionAction::validate)
}
