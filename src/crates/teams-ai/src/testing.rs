//! Test doubles shared by unit tests

use crate::tokenizer::Tokenizer;

/// One token per character, so token budgets are easy to reason about
pub(crate) struct CharTokenizer;

impl Tokenizer for CharTokenizer {
    fn encode(&self, text: &str) -> Vec<usize> {
        text.chars().map(|ch| ch as usize).collect()
    }

    fn decode(&self, tokens: &[usize]) -> String {
        tokens
            .iter()
            .filter_map(|token| u32::try_from(*token).ok().and_then(char::from_u32))
            .collect()
    }
}

/// [`CharTokenizer`] that counts how often `encode` runs
#[derive(Default)]
pub(crate) struct CountingTokenizer {
    encodes: std::sync::atomic::AtomicUsize,
}

impl CountingTokenizer {
    pub(crate) fn encodes(&self) -> usize {
        self.encodes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Tokenizer for CountingTokenizer {
    fn encode(&self, text: &str) -> Vec<usize> {
        self.encodes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        CharTokenizer.encode(text)
    }

    fn decode(&self, tokens: &[usize]) -> String {
        CharTokenizer.decode(tokens)
    }
}
