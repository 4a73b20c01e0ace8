//! Free-text DO/SAY response parser
//!
//! When a model answers in prose instead of a JSON plan, the text is read
//! with a small command grammar:
//!
//! ```text
//! DO <action> [<entity>=<value> ...] [THEN] SAY <text>
//! ```
//!
//! Entity values may be bare (ended by whitespace), quoted with `'`, `"` or
//! `` ` `` (ended by the matching quote), or fenced with ```` ``` ```` for
//! multi-line content. Text that does not start with a command keyword is
//! treated as a `SAY`.
//!
//! The grammar tables live in [`GrammarConfig`] and are injected into the
//! parser, so tests can run alternate keyword sets.
//!
//! Malformed free text never fails: the parser keeps whatever it managed to
//! read. The only error is a caller handing a sub-parser a token list that
//! does not start with its keyword.

use crate::error::{Result, TeamsAiError};
use crate::logging::log_text;
use crate::messages::Message;
use crate::plan::{Command, DoCommand, Plan, SayCommand};
use crate::response::parse_all_json;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

const DEFAULT_BREAKING_CHARACTERS: &str = "`~!@#$%^&*()_+-={}|[]\\:\";'<>?,./ \r\n\t";
const DEFAULT_SPACE_CHARACTERS: &[char] = &[' ', '\t', '\n', '\r'];
const CONTENT_FENCE: &str = "`";

/// Token tables for the DO/SAY grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarConfig {
    /// Characters emitted as single-character tokens
    pub breaking_characters: Vec<char>,

    /// Characters that separate action names, entities and values
    pub space_characters: Vec<char>,

    pub do_command: String,
    pub say_command: String,

    /// Tokens dropped wherever they appear outside a quoted value
    pub ignored_tokens: Vec<String>,

    /// Command assumed when the text does not start with a keyword
    pub default_command: String,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            breaking_characters: DEFAULT_BREAKING_CHARACTERS.chars().collect(),
            space_characters: DEFAULT_SPACE_CHARACTERS.to_vec(),
            do_command: crate::plan::DO_COMMAND.to_string(),
            say_command: crate::plan::SAY_COMMAND.to_string(),
            ignored_tokens: vec!["THEN".to_string()],
            default_command: crate::plan::SAY_COMMAND.to_string(),
        }
    }
}

impl GrammarConfig {
    fn is_breaking(&self, ch: char) -> bool {
        self.breaking_characters.contains(&ch)
    }

    fn is_space(&self, token: &str) -> bool {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => self.space_characters.contains(&ch),
            _ => false,
        }
    }

    fn is_command(&self, token: &str) -> bool {
        token == self.do_command || token == self.say_command
    }

    fn is_ignored(&self, token: &str) -> bool {
        self.ignored_tokens.iter().any(|ignored| ignored == token)
    }
}

/// Outcome of a DO or SAY sub-parser
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    /// Number of tokens consumed, including the keyword
    pub length: usize,

    /// Parsed command, `None` when the tokens held nothing usable
    pub command: Option<Command>,
}

impl CommandResult {
    fn empty() -> Self {
        Self {
            length: 0,
            command: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DoParseState {
    FindActionName,
    InActionName,
    FindEntityName,
    InEntityName,
    FindEntityValue,
    InEntityValue,
    InEntityStringValue,
    InEntityContentValue,
}

impl DoParseState {
    fn in_quoted_value(self) -> bool {
        matches!(
            self,
            DoParseState::InEntityStringValue | DoParseState::InEntityContentValue
        )
    }
}

/// Parser turning model output into a [`Plan`]
#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    grammar: GrammarConfig,
}

impl ResponseParser {
    /// Create a parser with the standard DO/SAY grammar
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an alternate grammar
    pub fn with_grammar(mut self, grammar: GrammarConfig) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn grammar(&self) -> &GrammarConfig {
        &self.grammar
    }

    /// Interpret a model response as a plan
    ///
    /// A JSON object tagged `"type": "plan"` anywhere in the text wins and is
    /// returned as-is. Otherwise the whole text is read with the DO/SAY
    /// grammar.
    pub fn parse_response(&self, text: &str) -> Plan {
        if let Some(plan) = parse_all_json(text)
            .into_iter()
            .find_map(|value| serde_json::from_value::<Plan>(value).ok())
        {
            debug!(commands = plan.len(), "Found JSON plan in response");
            return plan;
        }

        let mut tokens = self.tokenize_text(text);
        let mut plan = Plan::new();
        if tokens.is_empty() {
            return plan;
        }

        if !self.grammar.is_command(&tokens[0]) {
            tokens.insert(0, self.grammar.default_command.clone());
        }

        let mut said = HashSet::new();
        let mut position = 0;
        while position < tokens.len() {
            let remaining = &tokens[position..];
            let parsed = if remaining[0] == self.grammar.do_command {
                self.parse_do_command(remaining)
            } else if remaining[0] == self.grammar.say_command {
                self.parse_say_command(remaining)
            } else {
                // Leftovers after a malformed command
                Ok(CommandResult::empty())
            };
            let result = parsed.unwrap_or_else(|_| CommandResult::empty());

            // At least one token is consumed per step, so a trailing bare
            // keyword cannot stall the loop.
            position += result.length.max(1);

            match result.command {
                Some(Command::Say(say)) => {
                    let normalized = say.text().trim().to_lowercase();
                    if said.insert(normalized) {
                        plan.push(say);
                    } else {
                        debug!(response = %log_text(say.text()), "Dropping duplicate SAY");
                    }
                }
                Some(command) => plan.push(command),
                None => {}
            }
        }

        debug!(
            commands = plan.len(),
            text = %log_text(text),
            "Parsed free-text response"
        );
        plan
    }

    /// Split text into tokens
    ///
    /// Every breaking character is its own token and runs of other
    /// characters form one token. Concatenating the tokens gives back the
    /// input.
    ///
    /// ```rust
    /// use teams_ai::parser::ResponseParser;
    ///
    /// let tokens = ResponseParser::new().tokenize_text("DO a=1");
    /// assert_eq!(tokens, vec!["DO", " ", "a", "=", "1"]);
    /// ```
    pub fn tokenize_text(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut token = String::new();

        for ch in text.chars() {
            if self.grammar.is_breaking(ch) {
                if !token.is_empty() {
                    tokens.push(std::mem::take(&mut token));
                }
                tokens.push(ch.to_string());
            } else {
                token.push(ch);
            }
        }

        if !token.is_empty() {
            tokens.push(token);
        }

        tokens
    }

    /// Parse a DO command starting at `tokens[0]`
    ///
    /// Returns a zero-length result when the keyword has nothing after it.
    pub fn parse_do_command(&self, tokens: &[String]) -> Result<CommandResult> {
        if tokens.len() <= 1 {
            return Ok(CommandResult::empty());
        }
        if tokens[0] != self.grammar.do_command {
            return Err(TeamsAiError::InvalidArgument(format!(
                "token list passed to parse_do_command starts with '{}' instead of '{}'",
                tokens[0], self.grammar.do_command
            )));
        }

        let mut length = 1;
        let mut action_name = String::new();
        let mut parameters = Map::new();
        let mut entity_name = String::new();
        let mut entity_value = String::new();
        let mut quote = String::new();
        let mut state = DoParseState::FindActionName;

        while length < tokens.len() {
            let token = tokens[length].as_str();

            if !state.in_quoted_value() {
                if self.grammar.is_ignored(token) {
                    length += 1;
                    continue;
                }
                if self.grammar.is_command(token) {
                    break;
                }
            }

            let is_space = self.grammar.is_space(token);
            match state {
                DoParseState::FindActionName => {
                    if !is_space {
                        action_name = token.to_string();
                        state = DoParseState::InActionName;
                    }
                }
                DoParseState::InActionName => {
                    if is_space {
                        state = DoParseState::FindEntityName;
                    } else {
                        action_name.push_str(token);
                    }
                }
                DoParseState::FindEntityName => {
                    if !is_space {
                        entity_name = token.to_string();
                        state = DoParseState::InEntityName;
                    }
                }
                DoParseState::InEntityName => {
                    if is_space || token == "=" {
                        state = DoParseState::FindEntityValue;
                    } else {
                        entity_name.push_str(token);
                    }
                }
                DoParseState::FindEntityValue => {
                    if matches!(token, "\"" | "'" | "`") {
                        if is_fence(tokens, length) {
                            length += 2;
                            state = DoParseState::InEntityContentValue;
                        } else {
                            quote = token.to_string();
                            state = DoParseState::InEntityStringValue;
                        }
                    } else if !is_space && token != "=" {
                        entity_value = token.to_string();
                        state = DoParseState::InEntityValue;
                    }
                }
                DoParseState::InEntityStringValue => {
                    if token == quote {
                        save_entity(&mut parameters, &mut entity_name, &mut entity_value);
                        state = DoParseState::FindEntityName;
                    } else {
                        entity_value.push_str(token);
                    }
                }
                DoParseState::InEntityContentValue => {
                    if is_fence(tokens, length) {
                        length += 2;
                        save_entity(&mut parameters, &mut entity_name, &mut entity_value);
                        state = DoParseState::FindEntityName;
                    } else {
                        entity_value.push_str(token);
                    }
                }
                DoParseState::InEntityValue => {
                    if is_space {
                        save_entity(&mut parameters, &mut entity_name, &mut entity_value);
                        state = DoParseState::FindEntityName;
                    } else {
                        entity_value.push_str(token);
                    }
                }
            }

            length += 1;
        }

        if action_name.is_empty() {
            return Ok(CommandResult {
                length,
                command: None,
            });
        }

        // Trailing entity with no terminating space or quote
        if !entity_name.is_empty() {
            save_entity(&mut parameters, &mut entity_name, &mut entity_value);
        }

        Ok(CommandResult {
            length,
            command: Some(Command::Do(
                DoCommand::new(action_name).with_parameters(parameters),
            )),
        })
    }

    /// Parse a SAY command starting at `tokens[0]`
    ///
    /// Everything up to the next command keyword becomes the response. A
    /// response that is empty once trimmed produces no command.
    pub fn parse_say_command(&self, tokens: &[String]) -> Result<CommandResult> {
        if tokens.len() <= 1 {
            return Ok(CommandResult::empty());
        }
        if tokens[0] != self.grammar.say_command {
            return Err(TeamsAiError::InvalidArgument(format!(
                "token list passed to parse_say_command starts with '{}' instead of '{}'",
                tokens[0], self.grammar.say_command
            )));
        }

        let mut length = 1;
        let mut response = String::new();
        for token in &tokens[1..] {
            if self.grammar.is_command(token) {
                break;
            }
            if !self.grammar.is_ignored(token) {
                response.push_str(token);
            }
            length += 1;
        }

        let response = response.trim();
        let command = if response.is_empty() {
            None
        } else {
            Some(Command::Say(SayCommand::from_message(Message::assistant(
                response,
            ))))
        };

        Ok(CommandResult { length, command })
    }
}

fn is_fence(tokens: &[String], at: usize) -> bool {
    tokens.len() > at + 2
        && tokens[at..at + 3]
            .iter()
            .all(|token| token.as_str() == CONTENT_FENCE)
}

fn save_entity(parameters: &mut Map<String, Value>, name: &mut String, value: &mut String) {
    parameters.insert(std::mem::take(name), Value::String(std::mem::take(value)));
}
