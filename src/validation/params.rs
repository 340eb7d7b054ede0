//! Processing parameter range checks.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use super::ValidationResult;

const PITCH_SEMITONES: RangeInclusive<f64> = -12.0..=12.0;
const TEMPO_FACTOR: RangeInclusive<f64> = 0.5..=2.0;
const VOLUME_GAIN: RangeInclusive<f64> = 0.0..=2.0;

/// Pitch/tempo/volume settings for a processing job. Unset values are not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioParams {
    /// Pitch shift in semitones
    #[serde(default)]
    pub pitch: Option<f64>,
    /// Tempo multiplier
    #[serde(default)]
    pub tempo: Option<f64>,
    /// Volume multiplier
    #[serde(default)]
    pub volume: Option<f64>,
}

/// Each out-of-range or NaN value yields one error.
pub fn validate_audio_params(params: &AudioParams) -> ValidationResult {
    let checks = [
        (
            params.pitch,
            PITCH_SEMITONES,
            "Pitch must be between -12 and +12 semitones",
        ),
        (params.tempo, TEMPO_FACTOR, "Tempo must be between 0.5x and 2.0x"),
        (params.volume, VOLUME_GAIN, "Volume must be between 0 and 2.0"),
    ];

    let errors = checks
        .into_iter()
        .filter_map(|(value, range, message)| {
            // NaN is never contained in a range.
            value
                .filter(|v| !range.contains(v))
                .map(|_| message.to_string())
        })
        .collect();

    ValidationResult::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pitch(v: f64) -> AudioParams {
        AudioParams {
            pitch: Some(v),
            ..Default::default()
        }
    }

    fn tempo(v: f64) -> AudioParams {
        AudioParams {
            tempo: Some(v),
            ..Default::default()
        }
    }

    #[test]
    fn test_unset_params_are_valid() {
        assert!(validate_audio_params(&AudioParams::default()).is_valid());
    }

    #[test]
    fn test_pitch_bounds() {
        assert!(validate_audio_params(&pitch(12.0)).is_valid());
        assert!(validate_audio_params(&pitch(-12.0)).is_valid());
        assert!(!validate_audio_params(&pitch(12.0001)).is_valid());
        assert!(!validate_audio_params(&pitch(-12.5)).is_valid());
    }

    #[test]
    fn test_tempo_bounds() {
        assert!(validate_audio_params(&tempo(0.5)).is_valid());
        assert!(validate_audio_params(&tempo(2.0)).is_valid());
        assert_eq!(
            validate_audio_params(&tempo(0.49)).errors,
            vec!["Tempo must be between 0.5x and 2.0x".to_string()]
        );
    }

    #[test]
    fn test_nan_is_rejected() {
        let result = validate_audio_params(&pitch(f64::NAN));
        assert_eq!(
            result.errors,
            vec!["Pitch must be between -12 and +12 semitones".to_string()]
        );
    }

    #[test]
    fn test_errors_are_independent() {
        let params = AudioParams {
            pitch: Some(20.0),
            tempo: Some(1.0),
            volume: Some(-0.1),
        };
        assert_eq!(
            validate_audio_params(&params).errors,
            vec![
                "Pitch must be between -12 and +12 semitones".to_string(),
                "Volume must be between 0 and 2.0".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_from_json() {
        let params: AudioParams = serde_json::from_str(r#"{"volume": 1.5}"#).unwrap();
        assert_eq!(params.volume, Some(1.5));
        assert_eq!(params.pitch, None);
    }
}
