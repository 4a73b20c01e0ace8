use super::{action_section::ActionAugmentationSection, Augmentation};
use crate::actions::ChatCompletionAction;
use crate::error::Result;
use crate::memory::Memory;
use crate::plan::{Plan, DO_COMMAND, SAY_COMMAND};
use crate::prompt::PromptResponse;
use crate::tokenizer::Tokenizer;
use crate::validators::{
    ActionResponseValidator, JsonResponseValidator, Validation, DEFAULT_ERROR_FEEDBACK,
};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

const CALL_TO_ACTION: &str = "Use the actions above to create a plan in the following JSON format:
{\"type\":\"plan\",\"commands\":[{\"type\":\"DO\",\"action\":\"<name>\",\"parameters\":{\"<name>\":<value>}},{\"type\":\"SAY\",\"response\":{\"role\":\"assistant\",\"content\":\"<response>\"}}]}";

const MISSING_JSON_FEEDBACK: &str =
    "Return a JSON object that uses the SAY command to say what you're thinking.";

const PLAN_SHAPE_FEEDBACK: &str = "Write each DO command as {\"type\":\"DO\",\"action\":\"<name>\",\"parameters\":{}} and each SAY command as {\"type\":\"SAY\",\"response\":\"<text>\"}.";

fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "type": {"type": "string", "enum": ["plan"]},
            "commands": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {
                        "type": {"type": "string"},
                        "action": {"type": "string"},
                        "parameters": {"type": "object"},
                        "response": {"type": ["object", "string"]}
                    },
                    "required": ["type"]
                }
            }
        },
        "required": ["type", "commands"]
    })
}

/// Multi-step plans returned as JSON
///
/// The prompt gains the action list and the plan format. A response is
/// accepted when it holds a plan whose every `DO` names a declared action
/// with its required parameters and whose every `SAY` has something to say.
#[derive(Debug)]
pub struct SequenceAugmentation {
    section: ActionAugmentationSection,
    plan_validator: JsonResponseValidator<Value>,
    action_validator: ActionResponseValidator,
}

impl SequenceAugmentation {
    pub fn new(actions: Vec<ChatCompletionAction>) -> Result<Self> {
        let section = ActionAugmentationSection::new(actions.clone(), CALL_TO_ACTION)?;
        let plan_validator = JsonResponseValidator::new(Some(plan_schema()))?
            .with_missing_json_feedback(MISSING_JSON_FEEDBACK);
        let action_validator = ActionResponseValidator::new(actions, false);

        Ok(Self {
            section,
            plan_validator,
            action_validator,
        })
    }

    fn check_commands(&self, commands: &[Value]) -> Option<String> {
        for (index, command) in commands.iter().enumerate() {
            let command_type = command.get("type").cloned().unwrap_or(Value::Null);
            match command_type.as_str() {
                Some(DO_COMMAND) => {
                    let action = command
                        .get("action")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    if action.is_empty() {
                        return Some(format!(
                            "The plan JSON is missing the DO \"action\" for command[{}]. Return the name of the action to DO.",
                            index
                        ));
                    }

                    let parameters = match command.get("parameters") {
                        None | Some(Value::Null) => Value::Object(Map::new()),
                        Some(parameters) => parameters.clone(),
                    };
                    if let Validation::Invalid { feedback } =
                        self.action_validator.validate_action(action, &parameters)
                    {
                        return Some(feedback);
                    }
                }
                Some(SAY_COMMAND) => {
                    if !has_response(command.get("response")) {
                        return Some(format!(
                            "The plan JSON is missing the SAY \"response\" for command[{}]. Return the response to SAY.",
                            index
                        ));
                    }
                }
                Some(other) => {
                    return Some(unknown_command_feedback(other));
                }
                None => {
                    return Some(unknown_command_feedback(&command_type.to_string()));
                }
            }
        }

        None
    }
}

fn has_response(response: Option<&Value>) -> bool {
    match response {
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Object(message)) => message
            .get("content")
            .and_then(Value::as_str)
            .is_some_and(|content| !content.is_empty()),
        _ => false,
    }
}

fn unknown_command_feedback(command_type: &str) -> String {
    format!(
        "The plan JSON contains an unknown command type of {}. Only use DO or SAY commands.",
        command_type
    )
}

#[async_trait]
impl Augmentation for SequenceAugmentation {
    type Content = Plan;

    fn name(&self) -> &'static str {
        "sequence"
    }

    fn create_prompt_section(&self) -> Option<&ActionAugmentationSection> {
        Some(&self.section)
    }

    async fn validate_response(
        &self,
        _memory: &dyn Memory,
        _tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        remaining_attempts: usize,
    ) -> Validation<Plan> {
        let value = match self.plan_validator.validate_text(response.text()) {
            Validation::Valid(value) => value,
            Validation::Invalid { feedback } => return Validation::invalid(feedback),
        };

        let commands = value
            .get("commands")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if let Some(feedback) = self.check_commands(commands) {
            debug!(remaining_attempts, feedback = %feedback, "Plan rejected");
            return Validation::invalid(feedback);
        }

        match serde_json::from_value::<Plan>(value) {
            Ok(plan) => Validation::valid(plan),
            Err(e) => {
                debug!(remaining_attempts, error = %e, "Plan did not deserialize");
                Validation::invalid(format!("{}\n{}", DEFAULT_ERROR_FEEDBACK, PLAN_SHAPE_FEEDBACK))
            }
        }
    }

    async fn create_plan_from_response(
        &self,
        _memory: &dyn Memory,
        response: PromptResponse<Plan>,
    ) -> Result<Plan> {
        Ok(response
            .message
            .and_then(|message| message.content)
            .unwrap_or_default())
    }
}
