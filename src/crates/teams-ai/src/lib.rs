//! Plan generation and validation for conversational agents
//!
//! This crate turns a completion model's answer into a [`Plan`] of `DO` and
//! `SAY` commands the host bot executes. The answer is checked by the active
//! augmentation; invalid answers produce feedback the model can repair from.
//!
//! # Modules
//!
//! - `plan` - Plan and command data model
//! - `parser` - DO/SAY free-text grammar and JSON plan detection
//! - `response` - JSON object scanning in free text
//! - `validators` - Validation results, JSON Schema and action validators
//! - `augmentations` - Default, functions, monologue, sequence and tools strategies
//! - `generation` - Completion and repair loop
//! - `actions` - Action declarations
//! - `memory` - Per-turn key-value memory
//! - `tokenizer` - Token counting
//! - `config` - Prompt configuration loading
//! - `logging` - Structured logging helpers
//!
//! # Example
//!
//! ```rust
//! use teams_ai::{Command, ResponseParser};
//!
//! let plan = ResponseParser::new()
//!     .parse_response("DO lights_on room=\"kitchen\" THEN SAY Done!");
//!
//! assert_eq!(plan.commands.len(), 2);
//! assert!(matches!(&plan.commands[0], Command::Do(c) if c.action == "lights_on"));
//! ```

pub mod actions;
pub mod augmentations;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod memory;
pub mod messages;
pub mod parser;
pub mod plan;
pub mod prompt;
pub mod response;
pub mod tokenizer;
pub mod validators;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::ChatCompletionAction;
pub use augmentations::{
    ActionAugmentationSection, Augmentation, AugmentationKind, AugmentedContent,
    DefaultAugmentation, FunctionsAugmentation, InnerMonologue, MonologueAugmentation,
    SequenceAugmentation, ToolsAugmentation, ToolsContent,
};
pub use config::{AugmentationConfig, CompletionConfig, PromptConfig};
pub use error::{Result, TeamsAiError};
pub use generation::{CompletionModel, PlanGenerator};
pub use memory::{Memory, TurnMemory};
pub use messages::{ActionCall, FunctionCall, Message, Role};
pub use parser::{GrammarConfig, ResponseParser};
pub use plan::{Command, DoCommand, Plan, SayCommand};
pub use prompt::{PromptResponse, PromptResponseStatus, RenderedPromptSection};
pub use tokenizer::{GptTokenizer, Tokenizer};
pub use validators::{
    ActionResponseValidator, DefaultResponseValidator, JsonResponseValidator,
    PromptResponseValidator, Validation,
};
