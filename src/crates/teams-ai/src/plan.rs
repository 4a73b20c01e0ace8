//! Plan and command data model
//!
//! A [`Plan`] is the ordered list of commands interpreted from a model
//! response. The host walks the commands in order: each [`DoCommand`] is
//! dispatched to a registered action handler and each [`SayCommand`] is sent
//! back to the user.
//!
//! # Wire Format
//!
//! ```json
//! {
//!   "type": "plan",
//!   "commands": [
//!     {"type": "DO", "action": "lights_on", "parameters": {"room": "kitchen"}},
//!     {"type": "SAY", "response": {"role": "assistant", "content": "Done!"}}
//!   ]
//! }
//! ```
//!
//! The plan-level `type` tag is what distinguishes a plan object embedded in
//! free text from an unrelated JSON object, so it is required on input.

use crate::messages::{Message, MessageContext};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Keyword of the command that invokes an action
pub const DO_COMMAND: &str = "DO";

/// Keyword of the command that responds to the user
pub const SAY_COMMAND: &str = "SAY";

/// Structural tag of a plan object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlanType {
    #[default]
    #[serde(rename = "plan", alias = "Plan", alias = "PLAN")]
    Plan,
}

/// Ordered list of commands to execute
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "type")]
    pub kind: PlanType,

    #[serde(default)]
    pub commands: Vec<Command>,
}

impl Plan {
    /// Create an empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a plan from commands, preserving their order
    pub fn with_commands(commands: Vec<Command>) -> Self {
        Self {
            kind: PlanType::Plan,
            commands,
        }
    }

    /// Append a command
    pub fn push(&mut self, command: impl Into<Command>) {
        self.commands.push(command.into());
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the plan has no commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A single step of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename = "DO")]
    Do(DoCommand),

    #[serde(rename = "SAY")]
    Say(SayCommand),
}

impl Command {
    /// Wire keyword of this command
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Do(_) => DO_COMMAND,
            Command::Say(_) => SAY_COMMAND,
        }
    }
}

impl From<DoCommand> for Command {
    fn from(command: DoCommand) -> Self {
        Command::Do(command)
    }
}

impl From<SayCommand> for Command {
    fn from(command: SayCommand) -> Self {
        Command::Say(command)
    }
}

/// Invoke a named action with parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoCommand {
    pub action: String,

    #[serde(default, deserialize_with = "deserialize_parameters")]
    pub parameters: Map<String, Value>,

    /// Tool call id, present when the command came from a tool call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
}

impl DoCommand {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            parameters: Map::new(),
            action_id: None,
        }
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_action_id(mut self, id: impl Into<String>) -> Self {
        self.action_id = Some(id.into());
        self
    }
}

/// Send a message to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SayCommand {
    #[serde(deserialize_with = "deserialize_say_response")]
    pub response: Message,
}

impl SayCommand {
    /// SAY an assistant message with the given text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            response: Message::assistant(text),
        }
    }

    /// SAY an existing message, keeping its metadata
    pub fn from_message(response: Message) -> Self {
        Self { response }
    }

    /// Text of the response
    pub fn text(&self) -> &str {
        self.response.text()
    }
}

fn deserialize_parameters<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SayResponse {
    Text(String),
    Message(Message),
    Content {
        content: String,
        #[serde(default)]
        context: Option<MessageContext>,
    },
}

fn deserialize_say_response<'de, D>(deserializer: D) -> Result<Message, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match SayResponse::deserialize(deserializer)? {
        SayResponse::Text(text) => Message::assistant(text),
        SayResponse::Message(message) => message,
        SayResponse::Content { content, context } => {
            let message = Message::assistant(content);
            match context {
                Some(context) => message.with_context(context),
                None => message,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_wire_shape() {
        let plan = Plan::with_commands(vec![
            DoCommand::new("lights_on").with_parameter("room", "kitchen").into(),
            SayCommand::new("Done!").into(),
        ]);

        assert_eq!(
            serde_json::to_value(&plan).unwrap(),
            json!({
                "type": "plan",
                "commands": [
                    {"type": "DO", "action": "lights_on", "parameters": {"room": "kitchen"}},
                    {"type": "SAY", "response": {"role": "assistant", "content": "Done!"}}
                ]
            })
        );
    }

    #[test]
    fn test_plan_requires_plan_tag() {
        let result = serde_json::from_value::<Plan>(json!({"type": "other", "commands": []}));
        assert!(result.is_err());

        let result = serde_json::from_value::<Plan>(json!({"commands": []}));
        assert!(result.is_err());
    }

    #[test]
    fn test_say_accepts_bare_string_response() {
        let command: Command =
            serde_json::from_value(json!({"type": "SAY", "response": "hello"})).unwrap();

        match command {
            Command::Say(say) => assert_eq!(say.text(), "hello"),
            other => panic!("Expected SAY, got {:?}", other),
        }
    }

    #[test]
    fn test_say_response_without_role_is_assistant() {
        let command: Command = serde_json::from_value(json!({
            "type": "SAY",
            "response": {"content": "Hello", "context": {"intent": "greet"}}
        }))
        .unwrap();

        match command {
            Command::Say(say) => {
                assert_eq!(say.response.role, crate::messages::Role::Assistant);
                assert_eq!(say.text(), "Hello");
                assert_eq!(say.response.context.unwrap().intent, "greet");
            }
            other => panic!("Expected SAY, got {:?}", other),
        }
    }

    #[test]
    fn test_do_null_parameters_become_empty() {
        let command: Command =
            serde_json::from_value(json!({"type": "DO", "action": "reset", "parameters": null}))
                .unwrap();

        match command {
            Command::Do(do_command) => {
                assert_eq!(do_command.action, "reset");
                assert!(do_command.parameters.is_empty());
            }
            other => panic!("Expected DO, got {:?}", other),
        }
    }

    #[test]
    fn test_action_id_round_trips() {
        let command: Command = DoCommand::new("search").with_action_id("call_7").into();
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["action_id"], "call_7");

        let back: Command = serde_json::from_value(value).unwrap();
        assert_eq!(back, command);
        assert_eq!(back.keyword(), DO_COMMAND);
    }
}
