use super::{action_section::ActionAugmentationSection, Augmentation};
use crate::actions::ChatCompletionAction;
use crate::error::Result;
use crate::memory::Memory;
use crate::plan::{DoCommand, Plan, SayCommand, SAY_COMMAND};
use crate::prompt::PromptResponse;
use crate::tokenizer::Tokenizer;
use crate::validators::{
    ActionResponseValidator, JsonResponseValidator, Validation, DEFAULT_ERROR_FEEDBACK,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

const CALL_TO_ACTION: &str = "Return a JSON object with your thoughts and the next action to perform.
Only respond with the JSON format below and base your plan on the actions above.
If you're not sure what to do, you can always say something by returning a SAY action.
If you're told your JSON response has errors, do your best to fix them.
Response Format:
{\"thoughts\":{\"thought\":\"<your current thought>\",\"reasoning\":\"<self reflect on why you made this decision>\",\"plan\":\"- short bulleted\\n- list that conveys\\n- long-term plan\"},\"action\":{\"name\":\"<action name>\",\"parameters\":{\"<name>\":\"<value>\"}}}";

const MISSING_JSON_FEEDBACK: &str = "No valid JSON objects were found in the response. Return a valid JSON object with your thoughts and the next action to perform.";

const MISSING_ACTION_FEEDBACK: &str = "The JSON returned was missing an action. Return a valid JSON object that contains your thoughts and uses the SAY action.";

/// The model's reasoning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonologueThoughts {
    pub thought: String,
    pub reasoning: String,
    pub plan: String,
}

/// The single action the model picked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonologueAction {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

/// A thinking-aloud response: thoughts plus the next action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnerMonologue {
    pub thoughts: MonologueThoughts,
    pub action: MonologueAction,
}

fn monologue_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "thoughts": {
                "type": "object",
                "properties": {
                    "thought": {"type": "string", "minLength": 1},
                    "reasoning": {"type": "string", "minLength": 1},
                    "plan": {"type": "string", "minLength": 1}
                },
                "required": ["thought", "reasoning", "plan"]
            },
            "action": {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "parameters": {"type": "object"}
                },
                "required": ["name"]
            }
        },
        "required": ["thoughts", "action"]
    })
}

fn say_action() -> ChatCompletionAction {
    ChatCompletionAction {
        name: SAY_COMMAND.to_string(),
        description: Some("use to ask the user a question or say something".to_string()),
        parameters: Some(json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "text to say or question to ask"
                }
            },
            "required": ["text"]
        })),
    }
}

/// Inner-monologue responses: one action per turn, reasoning included
///
/// The prompt gains the action list (with a built-in `SAY` action) and the
/// exact JSON shape to answer with. A response is accepted when it matches
/// that shape and its action is one of the declared ones.
#[derive(Debug)]
pub struct MonologueAugmentation {
    section: ActionAugmentationSection,
    monologue_validator: JsonResponseValidator<InnerMonologue>,
    action_validator: ActionResponseValidator,
}

impl MonologueAugmentation {
    pub fn new(mut actions: Vec<ChatCompletionAction>) -> Result<Self> {
        if !actions.iter().any(|action| action.name == SAY_COMMAND) {
            actions.push(say_action());
        }

        let section = ActionAugmentationSection::new(actions.clone(), CALL_TO_ACTION)?;
        let monologue_validator = JsonResponseValidator::new(Some(monologue_schema()))?
            .with_missing_json_feedback(MISSING_JSON_FEEDBACK);
        let action_validator = ActionResponseValidator::new(actions, true);

        Ok(Self {
            section,
            monologue_validator,
            action_validator,
        })
    }
}

#[async_trait]
impl Augmentation for MonologueAugmentation {
    type Content = InnerMonologue;

    fn name(&self) -> &'static str {
        "monologue"
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
    ) -> Validation<InnerMonologue> {
        let monologue = match self.monologue_validator.validate_text(response.text()) {
            Validation::Valid(monologue) => monologue,
            Validation::Invalid { feedback } => {
                let feedback = redirect_missing_action(feedback);
                debug!(remaining_attempts, feedback = %feedback, "Monologue rejected");
                return Validation::invalid(feedback);
            }
        };

        let parameters = Value::Object(monologue.action.parameters.clone().unwrap_or_default());
        match self
            .action_validator
            .validate_action(&monologue.action.name, &parameters)
        {
            Validation::Valid(_) => Validation::valid(monologue),
            Validation::Invalid { feedback } => {
                debug!(
                    remaining_attempts,
                    action = %monologue.action.name,
                    "Monologue action rejected"
                );
                Validation::invalid(feedback)
            }
        }
    }

    async fn create_plan_from_response(
        &self,
        _memory: &dyn Memory,
        response: PromptResponse<InnerMonologue>,
    ) -> Result<Plan> {
        let mut plan = Plan::new();
        let Some(monologue) = response.message.and_then(|message| message.content) else {
            return Ok(plan);
        };

        let MonologueAction { name, parameters } = monologue.action;
        let parameters = parameters.unwrap_or_default();
        if name == SAY_COMMAND {
            let text = parameters
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default();
            plan.push(SayCommand::new(text));
        } else {
            plan.push(DoCommand::new(name).with_parameters(parameters));
        }

        Ok(plan)
    }
}

/// Swap the schema's missing-action fix for an explicit SAY instruction
///
/// The model tends to repeat a bare missing-action defect. Any other fixes
/// from the same response are kept after the instruction.
fn redirect_missing_action(feedback: String) -> String {
    const MISSING_ACTION_FIX: &str = "add the \"action\" property to \"instance\"";

    let Some(fixes) = feedback.strip_prefix(DEFAULT_ERROR_FEEDBACK) else {
        return feedback;
    };
    let fixes: Vec<&str> = fixes.lines().filter(|line| !line.is_empty()).collect();
    if !fixes.contains(&MISSING_ACTION_FIX) {
        return feedback;
    }

    let others: Vec<&str> = fixes
        .into_iter()
        .filter(|line| *line != MISSING_ACTION_FIX)
        .collect();
    if others.is_empty() {
        MISSING_ACTION_FEEDBACK.to_string()
    } else {
        format!(
            "{}\n{}\n{}",
            MISSING_ACTION_FEEDBACK,
            DEFAULT_ERROR_FEEDBACK,
            others.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::TurnMemory;
    use crate::messages::Message;
    use crate::plan::Command;
    use crate::testing::CharTokenizer;

    fn augmentation() -> MonologueAugmentation {
        MonologueAugmentation::new(vec![ChatCompletionAction::new("lights_on")
            .unwrap()
            .with_description("Turn the lights on")
            .with_parameters(json!({
                "type": "object",
                "properties": {"room": {"type": "string"}},
                "required": ["room"]
            }))])
        .unwrap()
    }

    async fn validate(text: &str) -> Validation<InnerMonologue> {
        let response = PromptResponse::success(Message::assistant(text));
        augmentation()
            .validate_response(&TurnMemory::new(), &CharTokenizer, &response, 1)
            .await
    }

    const THOUGHTS: &str = r#""thoughts":{"thought":"t","reasoning":"r","plan":"p"}"#;

    #[test]
    fn test_section_lists_say_action() {
        let augmentation = augmentation();
        let section = augmentation.create_prompt_section().unwrap();
        assert!(section.text().contains("  SAY:\n"));
        assert!(section.text().contains("Response Format:\n{\"thoughts\""));
        assert_eq!(section.actions().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_json() {
        let validation = validate("I think I should turn on the lights").await;
        assert_eq!(validation.feedback(), Some(MISSING_JSON_FEEDBACK));
    }

    #[tokio::test]
    async fn test_missing_action_redirects_to_say() {
        let validation = validate(&format!("{{{}}}", THOUGHTS)).await;
        assert_eq!(validation.feedback(), Some(MISSING_ACTION_FEEDBACK));
    }

    #[tokio::test]
    async fn test_missing_action_redirect_keeps_other_fixes() {
        let text = r#"{"thoughts":{"thought":"t","reasoning":"r"}}"#;
        let feedback = validate(text).await.feedback().unwrap().to_string();

        assert!(feedback.starts_with(MISSING_ACTION_FEEDBACK));
        assert!(feedback.contains("add the \"plan\" property to \"instance.thoughts\""));
        assert!(!feedback.contains("add the \"action\" property"));
    }

    #[test]
    fn test_redirect_leaves_unrelated_feedback() {
        let feedback = format!("{}\nconvert \"instance.action\" to a object", DEFAULT_ERROR_FEEDBACK);
        assert_eq!(redirect_missing_action(feedback.clone()), feedback);
        assert_eq!(redirect_missing_action(MISSING_JSON_FEEDBACK.to_string()), MISSING_JSON_FEEDBACK);
    }

    #[tokio::test]
    async fn test_empty_thought_rejected() {
        let text = r#"{"thoughts":{"thought":"","reasoning":"r","plan":"p"},"action":{"name":"SAY","parameters":{"text":"hi"}}}"#;
        let feedback = validate(text).await.feedback().unwrap().to_string();
        assert!(feedback.starts_with(DEFAULT_ERROR_FEEDBACK));
        assert!(feedback.contains("instance.thoughts.thought"));
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let text = format!(r#"{{{},"action":{{"name":"fly"}}}}"#, THOUGHTS);
        let validation = validate(&text).await;
        assert_eq!(
            validation.feedback(),
            Some("Unknown action named \"fly\". Specify a valid action name.")
        );
    }

    #[tokio::test]
    async fn test_missing_required_parameter() {
        let text = format!(r#"{{{},"action":{{"name":"lights_on","parameters":{{}}}}}}"#, THOUGHTS);
        let feedback = validate(&text).await.feedback().unwrap().to_string();
        assert!(feedback.ends_with("add the \"room\" property to \"instance\""));
    }

    #[tokio::test]
    async fn test_say_plan() {
        let text = format!(
            r#"Sure. {{{},"action":{{"name":"SAY","parameters":{{"text":"hi"}}}}}}"#,
            THOUGHTS
        );
        let augmentation = augmentation();
        let memory = TurnMemory::new();
        let response = PromptResponse::success(Message::assistant(text));
        let monologue = augmentation
            .validate_response(&memory, &CharTokenizer, &response, 1)
            .await
            .into_value()
            .unwrap();

        let plan = augmentation
            .create_plan_from_response(&memory, response.with_content(monologue))
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&plan).unwrap(),
            json!({
                "type": "plan",
                "commands": [{"type": "SAY", "response": {"role": "assistant", "content": "hi"}}]
            })
        );
    }

    #[tokio::test]
    async fn test_do_plan() {
        let text = format!(
            r#"{{{},"action":{{"name":"lights_on","parameters":{{"room":"den"}}}}}}"#,
            THOUGHTS
        );
        let augmentation = augmentation();
        let memory = TurnMemory::new();
        let response = PromptResponse::success(Message::assistant(text));
        let monologue = augmentation
            .validate_response(&memory, &CharTokenizer, &response, 1)
            .await
            .into_value()
            .unwrap();

        let plan = augmentation
            .create_plan_from_response(&memory, response.with_content(monologue))
            .await
            .unwrap();

        match &plan.commands[..] {
            [Command::Do(command)] => {
                assert_eq!(command.action, "lights_on");
                assert_eq!(command.parameters["room"], "den");
            }
            other => panic!("Expected one DO, got {:?}", other),
        }
    }
}
