//! Audio upload checks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ValidationResult;

const MIB: u64 = 1024 * 1024;

/// Metadata of a file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFile {
    /// File name as picked by the user
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// MIME type reported by the browser, possibly empty
    #[serde(default)]
    pub mime_type: String,
}

impl AudioFile {
    pub fn new(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
        }
    }
}

/// Which uploads are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePolicy {
    /// Largest accepted file in bytes (inclusive)
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    /// MIME types accepted outright
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,

    /// Lowercase extensions, without the dot, accepted when the MIME type is not
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_size_bytes() -> u64 {
    100 * MIB
}

fn default_allowed_mime_types() -> Vec<String> {
    [
        "audio/mpeg",
        "audio/mp3",
        "audio/wav",
        "audio/wave",
        "audio/flac",
        "audio/ogg",
        "audio/aac",
        "audio/m4a",
        "audio/x-wav",
        "audio/x-flac",
        "audio/webm",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_allowed_extensions() -> Vec<String> {
    ["mp3", "wav", "flac", "ogg", "aac", "m4a"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for FilePolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            allowed_mime_types: default_allowed_mime_types(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl FilePolicy {
    /// Check size, type and emptiness. All failing checks are reported.
    pub fn validate(&self, file: &AudioFile) -> ValidationResult {
        let mut errors = Vec::new();

        if file.size > self.max_size_bytes {
            errors.push(format!(
                "File size ({:.1}MB) exceeds the {} limit",
                file.size as f64 / MIB as f64,
                format_limit(self.max_size_bytes)
            ));
        }

        if !self.accepts_type(file) {
            errors.push(format!(
                "Invalid file format. Supported formats: {}",
                self.supported_formats()
            ));
        }

        if file.size == 0 {
            errors.push("File appears to be empty or corrupted".to_string());
        }

        if !errors.is_empty() {
            debug!(
                name = %file.name,
                size = file.size,
                mime_type = %file.mime_type,
                errors = errors.len(),
                "Rejected upload"
            );
        }

        ValidationResult::from_errors(errors)
    }

    /// A file passes on its MIME type, or failing that on its extension.
    fn accepts_type(&self, file: &AudioFile) -> bool {
        if self.allowed_mime_types.iter().any(|t| *t == file.mime_type) {
            return true;
        }

        let name = file.name.to_lowercase();
        self.allowed_extensions
            .iter()
            .any(|ext| name.ends_with(&format!(".{}", ext.to_lowercase())))
    }

    fn supported_formats(&self) -> String {
        self.allowed_extensions
            .iter()
            .map(|ext| ext.to_uppercase())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn format_limit(bytes: u64) -> String {
    if bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{:.1}MB", bytes as f64 / MIB as f64)
    }
}

/// Validate a file against the default upload policy.
pub fn validate_audio_file(file: &AudioFile) -> ValidationResult {
    FilePolicy::default().validate(file)
}

/// Validate a multi-file selection.
///
/// Up to `max_files` files are checked and each message is prefixed with the
/// file name. A selection larger than `max_files` adds one error and the
/// surplus files are not inspected.
pub fn validate_batch(policy: &FilePolicy, files: &[AudioFile], max_files: usize) -> ValidationResult {
    let mut errors: Vec<String> = files
        .iter()
        .take(max_files)
        .flat_map(|file| {
            policy
                .validate(file)
                .errors
                .into_iter()
                .map(move |e| format!("{}: {}", file.name, e))
        })
        .collect();

    if files.len() > max_files {
        errors.push(format!("Only {} files can be uploaded at once", max_files));
    }

    ValidationResult::from_errors(errors)
}
