//! Token counting boundary
//!
//! Prompt sections are budgeted in model tokens. [`Tokenizer`] is the seam;
//! [`GptTokenizer`] is the stock `cl100k_base` encoding used by current
//! OpenAI chat models.

use crate::error::{Result, TeamsAiError};
use tiktoken_rs::CoreBPE;

/// Converts between text and model tokens
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<usize>;

    /// Decode tokens back into text
    ///
    /// A run cut from a longer encoding may end inside a multi-byte
    /// character. Implementations return the longest prefix that decodes.
    fn decode(&self, tokens: &[usize]) -> String;
}

/// `cl100k_base` tokenizer backed by `tiktoken-rs`
pub struct GptTokenizer {
    bpe: CoreBPE,
}

impl GptTokenizer {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| TeamsAiError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl std::fmt::Debug for GptTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GptTokenizer")
            .field("encoding", &"cl100k_base")
            .finish()
    }
}

impl Tokenizer for GptTokenizer {
    fn encode(&self, text: &str) -> Vec<usize> {
        self.bpe.encode_ordinary(text)
    }

    fn decode(&self, tokens: &[usize]) -> String {
        // A character split across tokens needs at most 3 extra tokens to close
        let mut end = tokens.len();
        let floor = end.saturating_sub(4);
        while end > floor {
            if let Ok(text) = self.bpe.decode(tokens[..end].to_vec()) {
                return text;
            }
            end -= 1;
        }

        // Fall back to decoding token by token
        tokens
            .iter()
            .map_while(|token| self.bpe.decode(vec![*token]).ok())
            .collect()
    }
}
