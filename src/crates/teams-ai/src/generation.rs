//! Completion and repair loop
//!
//! [`PlanGenerator`] drives one turn: it adds the augmentation's prompt
//! section, asks the model, validates the answer and, while repairs remain,
//! sends invalid answers back with the validator's feedback.
//!
//! ```text
//! prompt ──► model ──► validate ──valid──► plan
//!              ▲           │
//!              └─feedback──┘ (at most max_repair_attempts times)
//! ```

use crate::augmentations::{Augmentation, AugmentationKind};
use crate::config::{CompletionConfig, PromptConfig};
use crate::error::{Result, TeamsAiError};
use crate::logging::{log_text, LogGuard};
use crate::memory::Memory;
use crate::messages::Message;
use crate::plan::Plan;
use crate::prompt::PromptResponse;
use crate::tokenizer::Tokenizer;
use crate::validators::Validation;
use async_trait::async_trait;
use tracing::{info, warn};

/// Model client boundary
///
/// Transport, retries and rate limiting belong to the implementation. The
/// returned status tells the loop whether a message is present.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete_prompt(&self, messages: &[Message]) -> PromptResponse;
}

/// Runs the completion and repair loop for an augmentation
#[derive(Debug)]
pub struct PlanGenerator<A> {
    augmentation: A,
    max_repair_attempts: usize,
    max_input_tokens: usize,
}

impl<A: Augmentation> PlanGenerator<A> {
    pub fn new(augmentation: A) -> Self {
        let defaults = CompletionConfig::default();
        Self {
            augmentation,
            max_repair_attempts: defaults.max_repair_attempts,
            max_input_tokens: defaults.max_input_tokens,
        }
    }

    /// Number of times an invalid response is sent back for repair
    pub fn with_max_repair_attempts(mut self, attempts: usize) -> Self {
        self.max_repair_attempts = attempts;
        self
    }

    /// Token budget for the augmentation's prompt section
    pub fn with_max_input_tokens(mut self, tokens: usize) -> Self {
        self.max_input_tokens = tokens;
        self
    }

    pub fn augmentation(&self) -> &A {
        &self.augmentation
    }

    /// Produce a plan for `prompt`
    ///
    /// Fails with [`TeamsAiError::Completion`] when the model client reports
    /// a non-success status and with [`TeamsAiError::InvalidResponse`] when
    /// the repairs run out. The error carries the last feedback.
    pub async fn generate(
        &self,
        model: &dyn CompletionModel,
        memory: &dyn Memory,
        tokenizer: &dyn Tokenizer,
        prompt: Vec<Message>,
    ) -> Result<Plan> {
        let _guard = LogGuard::new("generate_plan");
        let augmentation = self.augmentation.name();

        let mut messages = prompt;
        if let Some(section) = self.augmentation.create_prompt_section() {
            let rendered = section.render_as_messages(tokenizer, self.max_input_tokens);
            if rendered.too_long {
                warn!(
                    augmentation,
                    max_input_tokens = self.max_input_tokens,
                    "Prompt section was trimmed"
                );
            }
            messages.extend(rendered.output);
        }

        let mut remaining_attempts = self.max_repair_attempts;
        loop {
            let response = model.complete_prompt(&messages).await;
            if !response.is_success() {
                return Err(TeamsAiError::Completion {
                    status: response.status,
                    message: response.error.unwrap_or_default(),
                });
            }

            let validation = self
                .augmentation
                .validate_response(memory, tokenizer, &response, remaining_attempts)
                .await;

            let feedback = match validation {
                Validation::Valid(content) => {
                    let plan = self
                        .augmentation
                        .create_plan_from_response(memory, response.with_content(content))
                        .await?;
                    info!(
                        augmentation,
                        commands = plan.len(),
                        repairs = self.max_repair_attempts - remaining_attempts,
                        "Plan generated"
                    );
                    return Ok(plan);
                }
                Validation::Invalid { feedback } => feedback,
            };

            if remaining_attempts == 0 {
                warn!(augmentation, feedback = %feedback, "Repair attempts exhausted");
                return Err(TeamsAiError::InvalidResponse {
                    attempts: self.max_repair_attempts,
                    feedback,
                });
            }
            remaining_attempts -= 1;

            warn!(
                augmentation,
                remaining_attempts,
                response = %log_text(response.text()),
                feedback = %feedback,
                "Invalid response, asking the model to repair it"
            );
            if let Some(message) = response.message {
                messages.push(message);
            }
            messages.push(Message::user(feedback));
        }
    }
}

impl PlanGenerator<AugmentationKind> {
    /// Build the generator a prompt configuration describes
    pub fn from_config(config: &PromptConfig) -> Result<Self> {
        config.validate()?;
        let augmentation = AugmentationKind::from_config(&config.augmentation, config.actions.clone())?;

        Ok(Self::new(augmentation)
            .with_max_repair_attempts(config.completion.max_repair_attempts)
            .with_max_input_tokens(config.completion.max_input_tokens))
    }
}
