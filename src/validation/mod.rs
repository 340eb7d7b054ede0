//! Input validation run before any upload or auth request leaves the client.
//!
//! Every validator here is a pure function. Failures are reported as
//! structured values carrying human-readable messages, never as errors.

mod auth;
mod file;
mod form;
mod params;
mod text;

pub use auth::{auth_rules, AuthMode};
pub use file::{validate_audio_file, validate_batch, AudioFile, FilePolicy};
pub use form::{validate_form, FieldRule, FieldValue, FormData, FormValidation, RuleSet};
pub use params::{validate_audio_params, AudioParams};
pub use text::{sanitize_input, validate_email, validate_url, MAX_SANITIZED_CHARS};

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Outcome of a validation that produces a flat list of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self { errors }
    }

    /// True when no errors were collected.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 2)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.serialize_field("errors", &self.errors)?;
        state.end()
    }
}
