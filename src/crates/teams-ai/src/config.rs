//! Prompt configuration
//!
//! A prompt's planning setup lives in a YAML or JSON file next to its
//! template:
//!
//! ```yaml
//! description: Controls the lights
//! augmentation:
//!   augmentation_type: sequence
//! completion:
//!   max_repair_attempts: ${LIGHTS_REPAIRS:3}
//!   max_input_tokens: 2800
//! actions:
//!   - name: lights_on
//!     description: Turn the lights on
//! ```
//!
//! `${VAR:default}` placeholders are replaced from the environment before
//! parsing, so they can stand in for numbers as well as strings.

use crate::actions::{validate_actions, ChatCompletionAction};
use crate::error::{Result, TeamsAiError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Which augmentation a prompt uses
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "augmentation_type", rename_all = "snake_case")]
pub enum AugmentationConfig {
    /// Plain text, spoken back verbatim
    #[default]
    None,

    /// Function-calling model, content spoken back
    Functions,

    /// Thoughts plus one action per turn
    Monologue,

    /// Multi-step JSON plans
    Sequence,

    /// Native tool calls
    Tools {
        /// Drop tool calls missing required arguments
        #[serde(default)]
        strict_arguments: bool,
    },
}

/// Completion loop settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// How many times an invalid response is sent back for repair
    #[serde(default = "default_max_repair_attempts")]
    pub max_repair_attempts: usize,

    /// Token budget for the augmentation's prompt section
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
}

fn default_max_repair_attempts() -> usize {
    3
}

fn default_max_input_tokens() -> usize {
    2048
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            max_repair_attempts: default_max_repair_attempts(),
            max_input_tokens: default_max_input_tokens(),
        }
    }
}

/// Planning configuration for one prompt
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub augmentation: AugmentationConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    /// Actions the model may call
    #[serde(default)]
    pub actions: Vec<ChatCompletionAction>,
}

impl PromptConfig {
    /// Load from a YAML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TeamsAiError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "Loading prompt config");
        Self::parse(&content)
    }

    /// Parse YAML or JSON text
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: PromptConfig = serde_yaml::from_str(&expanded)
            .map_err(|e| TeamsAiError::Configuration(format!("Invalid prompt config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.completion.max_input_tokens == 0 {
            return Err(TeamsAiError::Configuration(
                "completion.max_input_tokens must be greater than 0".to_string(),
            ));
        }
        validate_actions(&self.actions)
    }
}

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^:}]+)(?::([^}]*))?\}").unwrap())
}

/// Replace `${VAR}` and `${VAR:default}` with environment values
///
/// An unset variable without a default becomes an empty string.
pub fn expand_env_vars(input: &str) -> Cow<'_, str> {
    if !input.contains("${") {
        return Cow::Borrowed(input);
    }

    env_pattern().replace_all(input, |caps: &regex::Captures<'_>| {
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        std::env::var(&caps[1]).unwrap_or_else(|_| default.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PromptConfig::parse("{}").unwrap();
        assert_eq!(config.augmentation, AugmentationConfig::None);
        assert_eq!(config.completion.max_repair_attempts, 3);
        assert_eq!(config.completion.max_input_tokens, 2048);
        assert!(config.actions.is_empty());
    }

    #[test]
    fn test_json_config() {
        let config = PromptConfig::parse(
            r#"{
                "schema": 1.1,
                "description": "Lights",
                "augmentation": {"augmentation_type": "tools", "strict_arguments": true},
                "completion": {"max_input_tokens": 2800}
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.augmentation,
            AugmentationConfig::Tools {
                strict_arguments: true
            }
        );
        assert_eq!(config.completion.max_input_tokens, 2800);
        assert_eq!(config.completion.max_repair_attempts, 3);
    }

    #[test]
    fn test_env_expansion() {
        std::env::set_var("TEAMS_AI_TEST_REPAIRS", "5");
        let config = PromptConfig::parse(
            "completion:\n  max_repair_attempts: ${TEAMS_AI_TEST_REPAIRS:1}\n  max_input_tokens: ${TEAMS_AI_TEST_UNSET_TOKENS:100}\n",
        )
        .unwrap();
        std::env::remove_var("TEAMS_AI_TEST_REPAIRS");

        assert_eq!(config.completion.max_repair_attempts, 5);
        assert_eq!(config.completion.max_input_tokens, 100);
    }

    #[test]
    fn test_expand_without_placeholders_borrows() {
        assert!(matches!(expand_env_vars("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_unknown_augmentation_rejected() {
        let err = PromptConfig::parse("augmentation:\n  augmentation_type: telepathy\n").unwrap_err();
        assert!(matches!(err, TeamsAiError::Configuration(_)));
    }

    #[test]
    fn test_invalid_action_rejected() {
        let err = PromptConfig::parse("actions:\n  - name: not valid\n").unwrap_err();
        assert!(matches!(err, TeamsAiError::InvalidAction { .. }));
    }

    #[test]
    fn test_zero_token_budget_rejected() {
        let err = PromptConfig::parse("completion:\n  max_input_tokens: 0\n").unwrap_err();
        assert!(matches!(err, TeamsAiError::Configuration(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "augmentation:\n  augmentation_type: monologue\nactions:\n  - name: lights_on\n    parameters:\n      type: object\n      required: [room]\n"
        )
        .unwrap();

        let config = PromptConfig::from_file(file.path()).unwrap();
        assert_eq!(config.augmentation, AugmentationConfig::Monologue);
        assert_eq!(config.actions[0].required_parameters(), vec!["room"]);
    }

    #[test]
    fn test_missing_file() {
        let err = PromptConfig::from_file("/nonexistent/teams-ai/config.yaml").unwrap_err();
        assert!(matches!(err, TeamsAiError::Configuration(_)));
    }
}
