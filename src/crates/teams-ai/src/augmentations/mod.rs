//! Augmentation strategies
//!
//! An augmentation decides three things for a prompt: what extra section
//! the prompt gets, how the model's response is validated, and how a
//! validated response becomes a [`Plan`].
//!
//! | Augmentation | Prompt section | Response | Plan |
//! |---|---|---|---|
//! | [`DefaultAugmentation`] | none | any text | one `SAY` of the message |
//! | [`FunctionsAugmentation`] | none | any text | one `SAY` of the content |
//! | [`MonologueAugmentation`] | actions + format | [`InnerMonologue`] JSON | one `SAY` or `DO` |
//! | [`SequenceAugmentation`] | actions + format | plan JSON | the plan itself |
//! | [`ToolsAugmentation`] | none | native tool calls | one `DO` per call |
//!
//! [`AugmentationKind`] wraps all five behind one type so the strategy can
//! be picked from configuration at runtime.

pub mod action_section;
mod default;
mod functions;
mod monologue;
mod sequence;
mod tools;

pub use action_section::ActionAugmentationSection;
pub use default::DefaultAugmentation;
pub use functions::FunctionsAugmentation;
pub use monologue::{InnerMonologue, MonologueAction, MonologueAugmentation, MonologueThoughts};
pub use sequence::SequenceAugmentation;
pub use tools::{
    clear_submit_state, enable_submit_mode, is_submit_mode, ToolsAugmentation, ToolsContent,
    SUBMIT_TOOL_HISTORY, SUBMIT_TOOL_OUTPUTS_MAP, SUBMIT_TOOL_OUTPUTS_MESSAGES,
    SUBMIT_TOOL_OUTPUTS_VARIABLE,
};

use crate::actions::ChatCompletionAction;
use crate::config::AugmentationConfig;
use crate::error::{Result, TeamsAiError};
use crate::memory::Memory;
use crate::plan::Plan;
use crate::prompt::PromptResponse;
use crate::tokenizer::Tokenizer;
use crate::validators::Validation;
use async_trait::async_trait;

/// Prompt, validation and planning policy for one interaction style
#[async_trait]
pub trait Augmentation: Send + Sync {
    /// Value a validated response carries into planning
    type Content: Send + Sync;

    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Extra prompt section describing actions and the response format
    fn create_prompt_section(&self) -> Option<&ActionAugmentationSection>;

    /// Validate a response, producing the content or feedback for the model
    ///
    /// Malformed responses are reported as [`Validation::Invalid`], never as
    /// errors. Only the tools strategy touches `memory`.
    async fn validate_response(
        &self,
        memory: &dyn Memory,
        tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        remaining_attempts: usize,
    ) -> Validation<Self::Content>;

    /// Turn a validated response into a plan
    ///
    /// The response is the one passed to
    /// [`validate_response`](Augmentation::validate_response) with its content
    /// swapped for the validated value via [`PromptResponse::with_content`].
    async fn create_plan_from_response(
        &self,
        memory: &dyn Memory,
        response: PromptResponse<Self::Content>,
    ) -> Result<Plan>;
}

/// Validated content of any augmentation
#[derive(Debug, Clone, PartialEq)]
pub enum AugmentedContent {
    Text(String),
    Monologue(InnerMonologue),
    Plan(Plan),
    Tools(ToolsContent),
}

impl AugmentedContent {
    fn kind(&self) -> &'static str {
        match self {
            AugmentedContent::Text(_) => "text",
            AugmentedContent::Monologue(_) => "monologue",
            AugmentedContent::Plan(_) => "plan",
            AugmentedContent::Tools(_) => "tools",
        }
    }
}

/// Augmentation chosen at runtime
#[derive(Debug)]
pub enum AugmentationKind {
    None(DefaultAugmentation),
    Functions(FunctionsAugmentation),
    Monologue(MonologueAugmentation),
    Sequence(SequenceAugmentation),
    Tools(ToolsAugmentation),
}

impl AugmentationKind {
    /// Build the configured augmentation over `actions`
    pub fn from_config(
        config: &AugmentationConfig,
        actions: Vec<ChatCompletionAction>,
    ) -> Result<Self> {
        Ok(match config {
            AugmentationConfig::None => AugmentationKind::None(DefaultAugmentation::new()),
            AugmentationConfig::Functions => {
                AugmentationKind::Functions(FunctionsAugmentation::new())
            }
            AugmentationConfig::Monologue => {
                AugmentationKind::Monologue(MonologueAugmentation::new(actions)?)
            }
            AugmentationConfig::Sequence => {
                AugmentationKind::Sequence(SequenceAugmentation::new(actions)?)
            }
            AugmentationConfig::Tools { strict_arguments } => AugmentationKind::Tools(
                ToolsAugmentation::new(actions).with_strict_arguments(*strict_arguments),
            ),
        })
    }

    fn mismatch(&self, content: &AugmentedContent) -> TeamsAiError {
        TeamsAiError::ContentMismatch {
            augmentation: self.name(),
            content: content.kind(),
        }
    }
}

#[async_trait]
impl Augmentation for AugmentationKind {
    type Content = AugmentedContent;

    fn name(&self) -> &'static str {
        match self {
            AugmentationKind::None(augmentation) => augmentation.name(),
            AugmentationKind::Functions(augmentation) => augmentation.name(),
            AugmentationKind::Monologue(augmentation) => augmentation.name(),
            AugmentationKind::Sequence(augmentation) => augmentation.name(),
            AugmentationKind::Tools(augmentation) => augmentation.name(),
        }
    }

    fn create_prompt_section(&self) -> Option<&ActionAugmentationSection> {
        match self {
            AugmentationKind::None(augmentation) => augmentation.create_prompt_section(),
            AugmentationKind::Functions(augmentation) => augmentation.create_prompt_section(),
            AugmentationKind::Monologue(augmentation) => augmentation.create_prompt_section(),
            AugmentationKind::Sequence(augmentation) => augmentation.create_prompt_section(),
            AugmentationKind::Tools(augmentation) => augmentation.create_prompt_section(),
        }
    }

    async fn validate_response(
        &self,
        memory: &dyn Memory,
        tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        remaining_attempts: usize,
    ) -> Validation<AugmentedContent> {
        match self {
            AugmentationKind::None(augmentation) => augmentation
                .validate_response(memory, tokenizer, response, remaining_attempts)
                .await
                .map(AugmentedContent::Text),
            AugmentationKind::Functions(augmentation) => augmentation
                .validate_response(memory, tokenizer, response, remaining_attempts)
                .await
                .map(AugmentedContent::Text),
            AugmentationKind::Monologue(augmentation) => augmentation
                .validate_response(memory, tokenizer, response, remaining_attempts)
                .await
                .map(AugmentedContent::Monologue),
            AugmentationKind::Sequence(augmentation) => augmentation
                .validate_response(memory, tokenizer, response, remaining_attempts)
                .await
                .map(AugmentedContent::Plan),
            AugmentationKind::Tools(augmentation) => augmentation
                .validate_response(memory, tokenizer, response, remaining_attempts)
                .await
                .map(AugmentedContent::Tools),
        }
    }

    async fn create_plan_from_response(
        &self,
        memory: &dyn Memory,
        response: PromptResponse<AugmentedContent>,
    ) -> Result<Plan> {
        match self {
            AugmentationKind::None(augmentation) => {
                let response = response.try_map_content(|content| match content {
                    AugmentedContent::Text(text) => Ok(text),
                    other => Err(self.mismatch(&other)),
                })?;
                augmentation.create_plan_from_response(memory, response).await
            }
            AugmentationKind::Functions(augmentation) => {
                let response = response.try_map_content(|content| match content {
                    AugmentedContent::Text(text) => Ok(text),
                    other => Err(self.mismatch(&other)),
                })?;
                augmentation.create_plan_from_response(memory, response).await
            }
            AugmentationKind::Monologue(augmentation) => {
                let response = response.try_map_content(|content| match content {
                    AugmentedContent::Monologue(monologue) => Ok(monologue),
                    other => Err(self.mismatch(&other)),
                })?;
                augmentation.create_plan_from_response(memory, response).await
            }
            AugmentationKind::Sequence(augmentation) => {
                let response = response.try_map_content(|content| match content {
                    AugmentedContent::Plan(plan) => Ok(plan),
                    other => Err(self.mismatch(&other)),
                })?;
                augmentation.create_plan_from_response(memory, response).await
            }
            AugmentationKind::Tools(augmentation) => {
                let response = response.try_map_content(|content| match content {
                    AugmentedContent::Tools(tools) => Ok(tools),
                    other => Err(self.mismatch(&other)),
                })?;
                augmentation.create_plan_from_response(memory, response).await
            }
        }
    }
}
