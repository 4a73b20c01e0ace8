//! Error types for the planning core
//!
//! Malformed model output is never an error here. It is reported as
//! [`Validation::Invalid`](crate::validators::Validation) so the feedback can
//! be sent back to the model. The variants below cover configuration
//! mistakes, caller contract violations and failures surfaced by the
//! completion loop.
//!
//! # Error Hierarchy
//!
//! ```text
//! TeamsAiError
//! ├── InvalidAction      - Action declaration rejected (bad name)
//! ├── InvalidSchema      - JSON Schema failed to compile
//! ├── InvalidArgument    - Caller passed tokens/values violating a contract
//! ├── Configuration      - Prompt configuration could not be loaded
//! ├── Tokenizer          - Tokenizer could not be initialised
//! ├── Completion         - Model client returned a non-success status
//! ├── InvalidResponse    - Repair attempts exhausted
//! ├── ContentMismatch    - Validated content does not belong to the augmentation
//! └── Yaml               - YAML errors
//! ```

use crate::prompt::PromptResponseStatus;
use thiserror::Error;

/// Result type for planning operations
pub type Result<T> = std::result::Result<T, TeamsAiError>;

/// Errors that can occur in the planning core
#[derive(Error, Debug)]
pub enum TeamsAiError {
    /// Action declaration is not usable
    #[error("Invalid action '{name}': {reason}")]
    InvalidAction { name: String, reason: String },

    /// JSON Schema could not be compiled
    #[error("Invalid JSON schema: {0}")]
    InvalidSchema(String),

    /// Caller contract violation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tokenizer error
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Completion model did not succeed
    #[error("Completion failed with status {status:?}: {message}")]
    Completion {
        status: PromptResponseStatus,
        message: String,
    },

    /// The model kept returning invalid responses
    #[error("Invalid response after {attempts} repair attempts: {feedback}")]
    InvalidResponse { attempts: usize, feedback: String },

    /// Validated content was handed to the wrong augmentation
    #[error("Augmentation '{augmentation}' cannot plan from {content} content")]
    ContentMismatch {
        augmentation: &'static str,
        content: &'static str,
    },

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
