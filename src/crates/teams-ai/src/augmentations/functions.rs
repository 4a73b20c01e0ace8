use super::{action_section::ActionAugmentationSection, Augmentation};
use crate::error::Result;
use crate::memory::Memory;
use crate::messages::Message;
use crate::plan::{Plan, SayCommand};
use crate::prompt::PromptResponse;
use crate::tokenizer::Tokenizer;
use crate::validators::Validation;
use async_trait::async_trait;

/// Responses from a model driven through the function-calling API
///
/// Accepts every response. Only the text content is spoken back, in a fresh
/// assistant message without the call metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionsAugmentation;

impl FunctionsAugmentation {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Augmentation for FunctionsAugmentation {
    type Content = String;

    fn name(&self) -> &'static str {
        "functions"
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
        let content = response.content().cloned().unwrap_or_default();
        let mut plan = Plan::new();
        plan.push(SayCommand::from_message(Message::assistant(content)));
        Ok(plan)
    }
}
