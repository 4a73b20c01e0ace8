//! Message types exchanged with the completion model
//!
//! These mirror the chat-completion wire format the host's model client
//! produces. The content type is generic so a validated value (a parsed
//! monologue, a plan, a list of tool calls) can travel in the same envelope
//! as the raw text it was validated from.

use serde::{Deserialize, Serialize};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
    Tool,
}

/// A function call requested by the model (legacy function-calling API)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function to call
    #[serde(default)]
    pub name: String,

    /// Arguments as a JSON encoded string
    #[serde(default)]
    pub arguments: String,
}

impl FunctionCall {
    /// Create a new function call
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Kind of a tool call. Only function tools exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionCallType {
    #[default]
    Function,
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCall {
    /// Identifier the tool output must be submitted under
    pub id: String,

    #[serde(rename = "type", default)]
    pub call_type: ActionCallType,

    /// Function name and JSON encoded arguments
    pub function: FunctionCall,
}

impl ActionCall {
    /// Create a new function tool call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: ActionCallType::Function,
            function: FunctionCall::new(name, arguments),
        }
    }
}

/// A source the model cited in its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
}

/// Grounding metadata attached to a model message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageContext {
    #[serde(default)]
    pub intent: String,

    #[serde(default)]
    pub citations: Vec<Citation>,
}

/// A chat message with content of type `C`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message<C = String> {
    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<C>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,

    #[serde(
        default,
        alias = "action_tool_calls",
        skip_serializing_if = "Option::is_none"
    )]
    pub action_calls: Option<Vec<ActionCall>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_call_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<MessageContext>,
}

impl<C> Message<C> {
    /// Create a message with the given role and content
    pub fn new(role: Role, content: C) -> Self {
        Self {
            role,
            content: Some(content),
            name: None,
            function_call: None,
            action_calls: None,
            action_call_id: None,
            context: None,
        }
    }

    /// Create a message with no content
    pub fn empty(role: Role) -> Self {
        Self {
            role,
            content: None,
            name: None,
            function_call: None,
            action_calls: None,
            action_call_id: None,
            context: None,
        }
    }

    /// Replace the content, keeping every other field
    pub fn with_content<D>(self, content: D) -> Message<D> {
        Message {
            role: self.role,
            content: Some(content),
            name: self.name,
            function_call: self.function_call,
            action_calls: self.action_calls,
            action_call_id: self.action_call_id,
            context: self.context,
        }
    }

    /// Transform the content, keeping every other field
    pub fn try_map_content<D, E>(
        self,
        f: impl FnOnce(C) -> std::result::Result<D, E>,
    ) -> std::result::Result<Message<D>, E> {
        Ok(Message {
            role: self.role,
            content: self.content.map(f).transpose()?,
            name: self.name,
            function_call: self.function_call,
            action_calls: self.action_calls,
            action_call_id: self.action_call_id,
            context: self.context,
        })
    }

    /// Attach a function call
    pub fn with_function_call(mut self, call: FunctionCall) -> Self {
        self.function_call = Some(call);
        self
    }

    /// Attach tool calls
    pub fn with_action_calls(mut self, calls: Vec<ActionCall>) -> Self {
        self.action_calls = Some(calls);
        self
    }

    /// Attach grounding metadata
    pub fn with_context(mut self, context: MessageContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Tool calls carried by the message, empty when there are none
    pub fn action_calls(&self) -> &[ActionCall] {
        self.action_calls.as_deref().unwrap_or_default()
    }
}

impl Message<String> {
    /// Assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into())
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content.into())
    }

    /// Text content, or an empty string when there is none
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}
