use super::{PromptResponseValidator, Validation};
use crate::memory::Memory;
use crate::prompt::PromptResponse;
use crate::tokenizer::Tokenizer;
use async_trait::async_trait;

/// Accepts every response, yielding its text
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponseValidator;

impl DefaultResponseValidator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PromptResponseValidator for DefaultResponseValidator {
    type Value = String;

    async fn validate_response(
        &self,
        _memory: &dyn Memory,
        _tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        _remaining_attempts: usize,
    ) -> Validation<String> {
        Validation::valid(response.text().to_string())
    }
}
