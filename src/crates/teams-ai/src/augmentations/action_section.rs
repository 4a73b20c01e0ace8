//! Prompt section listing the callable actions
//!
//! Renders as a single system message:
//!
//! ```text
//! actions:
//!   lights_on:
//!     description: Turn the lights on
//!     parameters:
//!       ...
//!
//! <call to action>
//! ```

use crate::actions::{validate_actions, ChatCompletionAction};
use crate::error::Result;
use crate::messages::Message;
use crate::prompt::RenderedPromptSection;
use crate::tokenizer::Tokenizer;
use serde_yaml::{Mapping, Value as YamlValue};
use std::sync::OnceLock;
use tracing::warn;

/// Action list plus instructions, rendered within a token budget
#[derive(Debug)]
pub struct ActionAugmentationSection {
    actions: Vec<ChatCompletionAction>,
    text: String,
    tokens: OnceLock<Vec<usize>>,
}

impl ActionAugmentationSection {
    /// Build the section text for `actions` followed by `call_to_action`
    pub fn new(actions: Vec<ChatCompletionAction>, call_to_action: impl AsRef<str>) -> Result<Self> {
        validate_actions(&actions)?;

        let mut listed = Mapping::new();
        for action in &actions {
            let mut entry = Mapping::new();
            if let Some(description) = &action.description {
                entry.insert("description".into(), description.as_str().into());
            }
            if let Some(parameters) = &action.parameters {
                entry.insert("parameters".into(), serde_yaml::to_value(parameters)?);
            }
            listed.insert(action.name.as_str().into(), YamlValue::Mapping(entry));
        }

        let mut root = Mapping::new();
        root.insert("actions".into(), YamlValue::Mapping(listed));
        let yaml = serde_yaml::to_string(&root)?;

        Ok(Self {
            actions,
            text: format!("{}\n\n{}", yaml.trim_end(), call_to_action.as_ref()),
            tokens: OnceLock::new(),
        })
    }

    pub fn actions(&self) -> &[ChatCompletionAction] {
        &self.actions
    }

    /// Full, untrimmed section text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Render as a system message of at most `max_tokens` tokens
    ///
    /// The text is tokenized once and reused by later renders. When it does
    /// not fit, it is cut to the budget and `too_long` is set.
    pub fn render_as_messages(
        &self,
        tokenizer: &dyn Tokenizer,
        max_tokens: usize,
    ) -> RenderedPromptSection<Vec<Message>> {
        let tokens = self.tokens.get_or_init(|| tokenizer.encode(&self.text));

        let (text, length, too_long) = if tokens.len() > max_tokens {
            warn!(
                tokens = tokens.len(),
                max_tokens, "Action section trimmed to fit the token budget"
            );
            (tokenizer.decode(&tokens[..max_tokens]), max_tokens, true)
        } else {
            (self.text.clone(), tokens.len(), false)
        };

        RenderedPromptSection {
            output: vec![Message::system(text)],
            length,
            too_long,
        }
    }
}
