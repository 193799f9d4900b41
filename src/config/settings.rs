//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// InferenceConfig
// ---------------------------------------------------------------------------

/// Settings for the hosted inference endpoints.
///
/// Endpoint URLs are derived from `base_url` plus the per-capability model
/// identifier; they are configuration constants, never computed at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Opaque bearer credential. An empty string means "send no
    /// Authorization header" — useful against local gateways.
    pub api_token: String,
    /// Base URL of the inference API.
    pub base_url: String,
    /// Speech-to-text model identifier.
    pub asr_model: String,
    /// Text-generation model identifier.
    pub text_model: String,
    /// Visual-question-answering model identifier.
    pub vqa_model: String,
    /// Image-captioning model identifier.
    pub caption_model: String,
    /// Text-to-speech model identifier.
    pub tts_model: String,
    /// Upper bound on generated tokens, forwarded in the request parameters.
    pub max_new_tokens: u32,
    /// Maximum seconds to wait for any single inference call. An unbounded
    /// call is a design defect, so this has no "disabled" setting.
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: "https://api-inference.huggingface.co".into(),
            asr_model: "openai/whisper-large-v2".into(),
            text_model: "gpt2".into(),
            vqa_model: "dandelin/vilt-b32-finetuned-vqa".into(),
            caption_model: "Salesforce/blip-image-captioning-large".into(),
            tts_model: "facebook/mms-tts-eng".into(),
            max_new_tokens: 200,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for audio capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz of the WAV artifact sent to transcription.
    pub sample_rate: u32,
    /// Maximum recording length in seconds; when exceeded, only the tail of
    /// the recording is kept.
    pub max_recording_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            max_recording_secs: 60.0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_assistant::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Inference endpoint settings.
    pub inference: InferenceConfig,
    /// Audio capture settings.
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.inference.api_token, loaded.inference.api_token);
        assert_eq!(original.inference.base_url, loaded.inference.base_url);
        assert_eq!(original.inference.asr_model, loaded.inference.asr_model);
        assert_eq!(original.inference.text_model, loaded.inference.text_model);
        assert_eq!(original.inference.vqa_model, loaded.inference.vqa_model);
        assert_eq!(
            original.inference.caption_model,
            loaded.inference.caption_model
        );
        assert_eq!(original.inference.tts_model, loaded.inference.tts_model);
        assert_eq!(
            original.inference.max_new_tokens,
            loaded.inference.max_new_tokens
        );
        assert_eq!(
            original.inference.timeout_secs,
            loaded.inference.timeout_secs
        );

        assert_eq!(original.audio.sample_rate, loaded.audio.sample_rate);
        assert_eq!(
            original.audio.max_recording_secs,
            loaded.audio.max_recording_secs
        );
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.inference.base_url, default.inference.base_url);
        assert_eq!(config.inference.text_model, default.inference.text_model);
        assert_eq!(config.audio.sample_rate, default.audio.sample_rate);
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.inference.api_token = "hf_test_token".into();
        cfg.inference.base_url = "http://localhost:8080".into();
        cfg.inference.text_model = "mistralai/Mistral-7B-v0.1".into();
        cfg.inference.max_new_tokens = 64;
        cfg.inference.timeout_secs = 5;
        cfg.audio.max_recording_secs = 30.0;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.inference.api_token, "hf_test_token");
        assert_eq!(loaded.inference.base_url, "http://localhost:8080");
        assert_eq!(loaded.inference.text_model, "mistralai/Mistral-7B-v0.1");
        assert_eq!(loaded.inference.max_new_tokens, 64);
        assert_eq!(loaded.inference.timeout_secs, 5);
        assert_eq!(loaded.audio.max_recording_secs, 30.0);
    }

    /// Timeout must default to a bounded, non-zero value.
    #[test]
    fn default_timeout_is_bounded() {
        let cfg = InferenceConfig::default();
        assert!(cfg.timeout_secs > 0);
    }
}
