//! Response validation
//!
//! A validator inspects a model response and either accepts it with a typed
//! value or rejects it with feedback worded as an instruction to the model.
//! Rejections are ordinary values: the repair loop appends the feedback to
//! the conversation and asks again.
//!
//! # Validators
//!
//! - [`DefaultResponseValidator`] accepts anything and yields the text
//! - [`JsonResponseValidator`] finds a JSON object and checks it against a schema
//! - [`ActionResponseValidator`] checks an action call against the declared actions

mod action_response;
mod default;
mod json_response;

pub use action_response::{ActionResponseValidator, ValidatedAction};
pub use default::DefaultResponseValidator;
pub use json_response::{
    JsonResponseValidator, DEFAULT_ERROR_FEEDBACK, DEFAULT_MISSING_JSON_FEEDBACK,
};

use crate::memory::Memory;
use crate::prompt::PromptResponse;
use crate::tokenizer::Tokenizer;
use async_trait::async_trait;
use serde::de::{self, Deserialize, DeserializeOwned, Deserializer};
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Result of validating a model response
///
/// Serializes as `{"type": "Validation", "valid": bool, "value"?, "feedback"?}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    /// Accepted, with the value extracted from the response
    Valid(T),

    /// Rejected, with an instruction the model can act on
    Invalid { feedback: String },
}

impl<T> Validation<T> {
    pub fn valid(value: T) -> Self {
        Validation::Valid(value)
    }

    pub fn invalid(feedback: impl Into<String>) -> Self {
        Validation::Invalid {
            feedback: feedback.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Validation::Valid(value) => Some(value),
            Validation::Invalid { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Validation::Valid(value) => Some(value),
            Validation::Invalid { .. } => None,
        }
    }

    pub fn feedback(&self) -> Option<&str> {
        match self {
            Validation::Valid(_) => None,
            Validation::Invalid { feedback } => Some(feedback),
        }
    }

    /// Transform the accepted value, passing feedback through
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Validation<U> {
        match self {
            Validation::Valid(value) => Validation::Valid(f(value)),
            Validation::Invalid { feedback } => Validation::Invalid { feedback },
        }
    }
}

impl<T: Serialize> Serialize for Validation<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Validation", 3)?;
        state.serialize_field("type", "Validation")?;
        match self {
            Validation::Valid(value) => {
                state.serialize_field("valid", &true)?;
                state.serialize_field("value", value)?;
            }
            Validation::Invalid { feedback } => {
                state.serialize_field("valid", &false)?;
                state.serialize_field("feedback", feedback)?;
            }
        }
        state.end()
    }
}

#[derive(serde::Deserialize)]
struct ValidationRecord {
    valid: bool,
    #[serde(default)]
    value: serde_json::Value,
    feedback: Option<String>,
}

/// A missing `value` is read as `null`, so `Valid(None)` round-trips
impl<'de, T: DeserializeOwned> Deserialize<'de> for Validation<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = ValidationRecord::deserialize(deserializer)?;
        if record.valid {
            T::deserialize(record.value)
                .map(Validation::Valid)
                .map_err(de::Error::custom)
        } else {
            Ok(Validation::Invalid {
                feedback: record.feedback.unwrap_or_default(),
            })
        }
    }
}

/// Checks a model response before it is turned into a plan
#[async_trait]
pub trait PromptResponseValidator: Send + Sync {
    /// Value produced for an accepted response
    type Value: Send;

    /// Validate `response`
    ///
    /// `remaining_attempts` counts the repairs left after this one and may be
    /// used to soften feedback wording; validators never fail because of it.
    async fn validate_response(
        &self,
        memory: &dyn Memory,
        tokenizer: &dyn Tokenizer,
        response: &PromptResponse,
        remaining_attempts: usize,
    ) -> Validation<Self::Value>;
}
