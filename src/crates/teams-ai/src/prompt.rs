//! Prompt-level boundary types
//!
//! [`PromptResponse`] is what the host's model client hands back after a
//! completion. [`RenderedPromptSection`] is what a prompt section produces
//! when rendered against a token budget.

use crate::messages::Message;
use serde::{Deserialize, Serialize};

/// Outcome reported by the model client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptResponseStatus {
    Success,
    Error,
    RateLimited,
    InvalidResponse,
    TooLong,
}

/// Response from a completion model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptResponse<C = String> {
    pub status: PromptResponseStatus,

    /// The input message that produced this response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Message>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message<C>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<C> PromptResponse<C> {
    /// Successful response carrying a message
    pub fn success(message: Message<C>) -> Self {
        Self {
            status: PromptResponseStatus::Success,
            input: None,
            message: Some(message),
            error: None,
        }
    }

    /// Failed response with an error description
    pub fn failure(status: PromptResponseStatus, error: impl Into<String>) -> Self {
        Self {
            status,
            input: None,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Whether the model client reported success
    pub fn is_success(&self) -> bool {
        self.status == PromptResponseStatus::Success
    }

    /// Swap the message content for a validated value
    ///
    /// A response without a message gets an assistant message holding the
    /// value, so the value is never dropped.
    pub fn with_content<D>(self, value: D) -> PromptResponse<D> {
        let message = match self.message {
            Some(message) => message.with_content(value),
            None => Message::new(crate::messages::Role::Assistant, value),
        };

        PromptResponse {
            status: self.status,
            input: self.input,
            message: Some(message),
            error: self.error,
        }
    }

    /// Transform the message content, failing when `f` fails
    pub fn try_map_content<D, E>(
        self,
        f: impl FnOnce(C) -> std::result::Result<D, E>,
    ) -> std::result::Result<PromptResponse<D>, E> {
        Ok(PromptResponse {
            status: self.status,
            input: self.input,
            message: self
                .message
                .map(|message| message.try_map_content(f))
                .transpose()?,
            error: self.error,
        })
    }

    /// Content of the message, if any
    pub fn content(&self) -> Option<&C> {
        self.message.as_ref().and_then(|message| message.content.as_ref())
    }
}

impl PromptResponse<String> {
    /// Text of the response message, empty when missing
    pub fn text(&self) -> &str {
        self.message.as_ref().map(|message| message.text()).unwrap_or_default()
    }
}

/// Output of rendering a prompt section within a token budget
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPromptSection<T> {
    pub output: T,

    /// Number of tokens the output uses
    pub length: usize,

    /// Set when the section had to be truncated to fit
    pub too_long: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Role;

    #[test]
    fn test_text_of_missing_message_is_empty() {
        let response: PromptResponse = PromptResponse::failure(PromptResponseStatus::Error, "boom");
        assert_eq!(response.text(), "");
        assert!(!response.is_success());
    }

    #[test]
    fn test_with_content_creates_message_when_missing() {
        let response: PromptResponse = PromptResponse::failure(PromptResponseStatus::Error, "boom");
        let typed = response.with_content(vec![1, 2]);

        let message = typed.message.unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, Some(vec![1, 2]));
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&PromptResponseStatus::RateLimited).unwrap(),
            "\"rate_limited\""
        );
    }
}
