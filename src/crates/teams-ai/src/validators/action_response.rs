use super::{PromptResponseValidator, Validation};
use crate::actions::ChatCompletionAction;
use crate::memory::Memory;
use crate::messages::FunctionCall;
use crate::prompt::PromptResponse;
use crate::response::parse_json;
use crate::tokenizer::Tokenizer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// An action call that passed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedAction {
    pub name: String,

    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Checks an action call against the declared actions
///
/// The name must belong to a declared action and every parameter the
/// action's schema lists as `required` must be present. Other schema rules
/// are left to the action handler.
#[derive(Debug, Clone)]
pub struct ActionResponseValidator {
    actions: Vec<ChatCompletionAction>,
    is_required: bool,
    noun: String,
}

impl ActionResponseValidator {
    /// Create a validator over `actions`
    ///
    /// With `is_required`, a response that calls nothing is rejected.
    pub fn new(actions: Vec<ChatCompletionAction>, is_required: bool) -> Self {
        Self {
            actions,
            is_required,
            noun: "action".to_string(),
        }
    }

    /// Word used for actions in feedback ("action", "tool", "function")
    pub fn with_noun(mut self, noun: impl Into<String>) -> Self {
        self.noun = noun.into();
        self
    }

    pub fn actions(&self) -> &[ChatCompletionAction] {
        &self.actions
    }

    pub fn find_action(&self, name: &str) -> Option<&ChatCompletionAction> {
        self.actions.iter().find(|action| action.name == name)
    }

    /// Validate the function call carried by a model message
    pub fn validate_call(&self, call: Option<&FunctionCall>) -> Validation<Option<ValidatedAction>> {
        match call {
            Some(call) => self
                .validate_action(&call.name, &parse_arguments(&call.arguments))
                .map(Some),
            None if self.is_required => Validation::invalid(format!(
                "No {noun} was specified. Call a {noun} with valid arguments.",
                noun = self.noun
            )),
            None => Validation::valid(None),
        }
    }

    /// Validate a named action call with JSON arguments
    pub fn validate_action(&self, name: &str, arguments: &Value) -> Validation<ValidatedAction> {
        let noun = &self.noun;
        if name.is_empty() {
            return Validation::invalid(format!(
                "{} name missing. Specify a valid {} name.",
                capitalize(noun),
                noun
            ));
        }

        let Some(action) = self.find_action(name) else {
            debug!(action = %name, "Unknown action requested");
            return Validation::invalid(format!(
                "Unknown {noun} named \"{name}\". Specify a valid {noun} name."
            ));
        };

        let parameters = match arguments {
            Value::Object(parameters) => parameters.clone(),
            _ if action.parameters.is_some() => {
                return Validation::invalid(format!(
                    "No arguments were sent with called {noun}. Call the \"{name}\" {noun} with required arguments as a valid JSON object."
                ));
            }
            _ => Map::new(),
        };

        let fixes: Vec<String> = action
            .required_parameters()
            .into_iter()
            .filter(|required| !parameters.contains_key(*required))
            .map(|required| format!("add the \"{}\" property to \"instance\"", required))
            .collect();
        if !fixes.is_empty() {
            return Validation::invalid(format!(
                "The {noun} arguments had errors. Apply these fixes and call \"{name}\" {noun} again:\n{}",
                fixes.join("\n")
            ));
        }

        Validation::valid(ValidatedAction {
            name: name.to_string(),
            parameters,
        })
    }
}

#[async_trait]
impl PromptResponseValidator for ActionResponseValidator {
    type Value = Option<ValidatedAction>;

    async fn validate_response(
        &self,
        _memory: &dyn Memory,
        _tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        _remaining_attempts: usize,
    ) -> Validation<Option<ValidatedAction>> {
        let call = response
            .message
            .as_ref()
            .and_then(|message| message.function_call.as_ref());
        self.validate_call(call)
    }
}

/// Parse JSON-encoded call arguments; blank means no arguments
pub(crate) fn parse_arguments(arguments: &str) -> Value {
    if arguments.trim().is_empty() {
        return Value::Object(Map::new());
    }
    parse_json(arguments).unwrap_or(Value::Null)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn actions() -> Vec<ChatCompletionAction> {
        vec![
            ChatCompletionAction::new("lights_on")
                .unwrap()
                .with_description("Turn the lights on")
                .with_parameters(json!({
                    "type": "object",
                    "properties": {"room": {"type": "string"}},
                    "required": ["room"]
                })),
            ChatCompletionAction::new("reset").unwrap(),
        ]
    }

    #[test]
    fn test_unknown_action() {
        let validator = ActionResponseValidator::new(actions(), true);
        let validation = validator.validate_action("fly", &json!({}));
        assert_eq!(
            validation.feedback(),
            Some("Unknown action named \"fly\". Specify a valid action name.")
        );
    }

    #[test]
    fn test_missing_name_uses_noun() {
        let validator = ActionResponseValidator::new(actions(), true).with_noun("tool");
        assert_eq!(
            validator.validate_action("", &json!({})).feedback(),
            Some("Tool name missing. Specify a valid tool name.")
        );
    }

    #[test]
    fn test_missing_required_parameter() {
        let validator = ActionResponseValidator::new(actions(), true);
        let validation = validator.validate_action("lights_on", &json!({"level": 3}));
        assert_eq!(
            validation.feedback(),
            Some("The action arguments had errors. Apply these fixes and call \"lights_on\" action again:\nadd the \"room\" property to \"instance\"")
        );
    }

    #[test]
    fn test_non_object_arguments() {
        let validator = ActionResponseValidator::new(actions(), true);
        let validation = validator.validate_action("lights_on", &Value::Null);
        assert_eq!(
            validation.feedback(),
            Some("No arguments were sent with called action. Call the \"lights_on\" action with required arguments as a valid JSON object.")
        );

        let validation = validator.validate_action("reset", &Value::Null);
        assert!(validation.value().unwrap().parameters.is_empty());
    }

    #[test]
    fn test_valid_action_passes_arguments_through() {
        let validator = ActionResponseValidator::new(actions(), true);
        let validation = validator.validate_action("lights_on", &json!({"room": "den", "extra": 1}));
        let action = validation.into_value().unwrap();
        assert_eq!(action.name, "lights_on");
        assert_eq!(Value::Object(action.parameters), json!({"room": "den", "extra": 1}));
    }

    #[test]
    fn test_call_required() {
        let validator = ActionResponseValidator::new(actions(), true);
        assert_eq!(
            validator.validate_call(None).feedback(),
            Some("No action was specified. Call a action with valid arguments.")
        );

        let optional = ActionResponseValidator::new(actions(), false);
        assert_eq!(optional.validate_call(None).into_value(), Some(None));
    }

    #[test]
    fn test_call_with_blank_arguments() {
        let validator = ActionResponseValidator::new(actions(), true);
        let call = FunctionCall::new("reset", "");
        assert!(validator.validate_call(Some(&call)).is_valid());

        let call = FunctionCall::new("lights_on", "{\"room\": \"hall\"}");
        let action = validator.validate_call(Some(&call)).into_value().flatten().unwrap();
        assert_eq!(action.parameters["room"], "hall");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("function"), "Function");
        assert_eq!(capitalize(""), "");
    }
}
