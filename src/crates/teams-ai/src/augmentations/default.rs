use super::{action_section::ActionAugmentationSection, Augmentation};
use crate::error::Result;
use crate::memory::Memory;
use crate::plan::{Plan, SayCommand};
use crate::prompt::PromptResponse;
use crate::tokenizer::Tokenizer;
use crate::validators::Validation;
use async_trait::async_trait;

/// Plain text responses, spoken back as-is
///
/// Adds nothing to the prompt and accepts every response. The plan is one
/// `SAY` carrying the model's message unchanged, citations included.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAugmentation;

impl DefaultAugmentation {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Augmentation for DefaultAugmentation {
    type Content = String;

    fn name(&self) -> &'static str {
        "none"
    }

    fn create_prompt_section(&self) -> Option<&ActionAugmentationSection> {
        None
    }

    async fn validate_response(
        &self,
        _memory: &dyn Memory,
        _tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        _remaining_attempts: usize,
    ) -> Validation<String> {
        Validation::valid(response.text().to_string())
    }

    async fn create_plan_from_response(
        &self,
        _memory: &dyn Memory,
        response: PromptResponse<String>,
    ) -> Result<Plan> {
        let mut plan = Plan::new();
        if let Some(message) = response.message {
            plan.push(SayCommand::from_message(message));
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::TurnMemory;
    use crate::messages::{Citation, Message, MessageContext};
    use crate::plan::Command;
    use crate::testing::CharTokenizer;

    #[tokio::test]
    async fn test_echoes_message_with_context() {
        let memory = TurnMemory::new();
        let context = MessageContext {
            intent: "answer".to_string(),
            citations: vec![Citation {
                content: "doc".to_string(),
                title: None,
                url: Some("https://example.com".to_string()),
                filepath: None,
            }],
        };
        let response = PromptResponse::success(Message::assistant("  Hi there  ").with_context(context));

        let augmentation = DefaultAugmentation::new();
        let validation = augmentation
            .validate_response(&memory, &CharTokenizer, &response, 2)
            .await;
        let content = validation.into_value().unwrap();
        assert_eq!(content, "  Hi there  ");

        let plan = augmentation
            .create_plan_from_response(&memory, response.with_content(content))
            .await
            .unwrap();

        assert_eq!(plan.len(), 1);
        match &plan.commands[0] {
            Command::Say(say) => {
                assert_eq!(say.text(), "  Hi there  ");
                assert!(say.response.context.is_some());
            }
            other => panic!("Expected SAY, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_message_gives_empty_plan() {
        let memory = TurnMemory::new();
        let response: PromptResponse<String> = PromptResponse {
            status: crate::prompt::PromptResponseStatus::Success,
            input: None,
            message: None,
            error: None,
        };

        let plan = DefaultAugmentation
            .create_plan_from_response(&memory, response)
            .await
            .unwrap();
        assert!(plan.is_empty());
    }
}
