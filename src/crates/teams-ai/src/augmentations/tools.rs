use super::{action_section::ActionAugmentationSection, Augmentation};
use crate::actions::ChatCompletionAction;
use crate::error::Result;
use crate::memory::Memory;
use crate::messages::ActionCall;
use crate::plan::{DoCommand, Plan, SayCommand};
use crate::prompt::PromptResponse;
use crate::tokenizer::Tokenizer;
use crate::validators::Validation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Set while the model is answering with tool calls whose outputs must be submitted
pub const SUBMIT_TOOL_OUTPUTS_VARIABLE: &str = "temp.submitToolOutputs";

/// Tool call id to action name for the calls being run this turn
pub const SUBMIT_TOOL_OUTPUTS_MAP: &str = "temp.submitToolMap";

/// Tool output messages collected for submission
pub const SUBMIT_TOOL_OUTPUTS_MESSAGES: &str = "temp.submitToolOutputsMessages";

/// Conversation history accumulated while in submit mode
pub const SUBMIT_TOOL_HISTORY: &str = "temp.submitToolHistory";

/// Validated content of a tools response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolsContent {
    /// Plain text answer
    Text(String),

    /// Tool calls to run, in the order the model issued them
    ActionCalls(Vec<ActionCall>),
}

/// Turn on tool submission mode for this turn
pub fn enable_submit_mode(memory: &dyn Memory) {
    memory.set_value(SUBMIT_TOOL_OUTPUTS_VARIABLE, Value::Bool(true));
}

/// Whether tool submission mode is on
pub fn is_submit_mode(memory: &dyn Memory) -> bool {
    matches!(
        memory.get_value(SUBMIT_TOOL_OUTPUTS_VARIABLE),
        Some(Value::Bool(true))
    )
}

/// Leave submission mode and forget its state
pub fn clear_submit_state(memory: &dyn Memory) {
    memory.set_value(SUBMIT_TOOL_OUTPUTS_VARIABLE, Value::Bool(false));
    memory.delete_value(SUBMIT_TOOL_OUTPUTS_MAP);
    memory.delete_value(SUBMIT_TOOL_OUTPUTS_MESSAGES);
    memory.delete_value(SUBMIT_TOOL_HISTORY);
}

/// Native tool calling
///
/// Adds nothing to the prompt; the host passes the actions to the model as
/// tools. Outside submission mode the response is plain text. In submission
/// mode each tool call naming a declared action becomes a `DO`; calls to
/// unknown tools are dropped. When nothing survives, submission mode is
/// switched off so the turn carries on as text.
#[derive(Debug, Clone)]
pub struct ToolsAugmentation {
    actions: Vec<ChatCompletionAction>,
    strict_arguments: bool,
}

impl ToolsAugmentation {
    pub fn new(actions: Vec<ChatCompletionAction>) -> Self {
        Self {
            actions,
            strict_arguments: false,
        }
    }

    /// Drop tool calls that miss required arguments
    ///
    /// Off by default: such calls are kept and their arguments forwarded
    /// as-is for the action handler to deal with.
    pub fn with_strict_arguments(mut self, strict: bool) -> Self {
        self.strict_arguments = strict;
        self
    }

    pub fn actions(&self) -> &[ChatCompletionAction] {
        &self.actions
    }

    fn accept_call(&self, call: &ActionCall) -> bool {
        let name = call.function.name.as_str();
        let Some(action) = self.actions.iter().find(|action| action.name == name) else {
            warn!(tool = %name, id = %call.id, "Dropping call to unknown tool");
            return false;
        };

        let required = action.required_parameters();
        if required.is_empty() {
            return true;
        }

        let arguments = parse_call_arguments(&call.function.arguments);
        let missing: Vec<&str> = required
            .into_iter()
            .filter(|param| !arguments.as_ref().is_some_and(|args| args.contains_key(*param)))
            .collect();
        if missing.is_empty() {
            return true;
        }

        if self.strict_arguments {
            warn!(tool = %name, id = %call.id, ?missing, "Dropping tool call with missing arguments");
            false
        } else {
            warn!(tool = %name, id = %call.id, ?missing, "Tool call is missing required arguments");
            true
        }
    }
}

fn parse_call_arguments(arguments: &str) -> Option<Map<String, Value>> {
    if arguments.trim().is_empty() {
        return Some(Map::new());
    }
    serde_json::from_str(arguments).ok()
}

#[async_trait]
impl Augmentation for ToolsAugmentation {
    type Content = ToolsContent;

    fn name(&self) -> &'static str {
        "tools"
    }

    fn create_prompt_section(&self) -> Option<&ActionAugmentationSection> {
        None
    }

    async fn validate_response(
        &self,
        memory: &dyn Memory,
        _tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        _remaining_attempts: usize,
    ) -> Validation<ToolsContent> {
        let text = ToolsContent::Text(response.text().to_string());
        if !is_submit_mode(memory) {
            return Validation::valid(text);
        }

        let calls = response
            .message
            .as_ref()
            .map(|message| message.action_calls())
            .unwrap_or_default();
        let valid: Vec<ActionCall> = calls
            .iter()
            .filter(|call| self.accept_call(call))
            .cloned()
            .collect();

        if valid.is_empty() {
            debug!(calls = calls.len(), "No usable tool calls, leaving submit mode");
            clear_submit_state(memory);
            return Validation::valid(if calls.is_empty() {
                text
            } else {
                ToolsContent::ActionCalls(Vec::new())
            });
        }

        let tool_map: Map<String, Value> = valid
            .iter()
            .map(|call| (call.id.clone(), Value::String(call.function.name.clone())))
            .collect();
        memory.set_value(SUBMIT_TOOL_OUTPUTS_MAP, Value::Object(tool_map));

        Validation::valid(ToolsContent::ActionCalls(valid))
    }

    async fn create_plan_from_response(
        &self,
        _memory: &dyn Memory,
        response: PromptResponse<ToolsContent>,
    ) -> Result<Plan> {
        let mut plan = Plan::new();
        let Some(mut message) = response.message else {
            return Ok(plan);
        };

        match message.content.take() {
            Some(ToolsContent::ActionCalls(calls)) => {
                for call in calls {
                    let parameters = parse_call_arguments(&call.function.arguments)
                        .unwrap_or_else(|| {
                            warn!(tool = %call.function.name, id = %call.id, "Tool arguments are not a JSON object, using {{}}");
                            Map::new()
                        });
                    plan.push(
                        DoCommand::new(call.function.name)
                            .with_parameters(parameters)
                            .with_action_id(call.id),
                    );
                }
            }
            Some(ToolsContent::Text(text)) if !text.trim().is_empty() => {
                plan.push(SayCommand::from_message(message.with_content(text)));
            }
            _ => {}
        }

        Ok(plan)
    }
}
