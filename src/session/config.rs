use serde::{Deserialize, Serialize};

/// Sample rates the recognition engine accepts
pub const SUPPORTED_SAMPLE_RATES: [u32; 5] = [8000, 16000, 32000, 44100, 48000];

/// Recognition configuration for a streaming session.
///
/// Deserialized straight from the client's `start_session` message.
/// `language` and `sample_rate` have no usable defaults on purpose: a
/// client that omits them gets an `invalid_config` rejection instead of a
/// session recognizing the wrong thing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Language tag for recognition (e.g. "en-US")
    #[serde(default)]
    pub language: String,

    /// Audio sample rate in Hz
    #[serde(default)]
    pub sample_rate: u32,

    /// Audio encoding format (e.g. "LINEAR16")
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Recognition model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Whether the engine should insert punctuation
    #[serde(default = "default_true")]
    pub punctuation: bool,

    /// Whether interim (provisional) results should be produced
    #[serde(default = "default_true")]
    pub interim_results: bool,
}

impl Default for StreamingConfig {
    /// Matches what deserializing an empty config object produces.
    fn default() -> Self {
        Self {
            language: String::new(),
            sample_rate: 0,
            encoding: default_encoding(),
            model: default_model(),
            punctuation: true,
            interim_results: true,
        }
    }
}

impl StreamingConfig {
    /// Check the config before any session resources are allocated.
    pub fn validate(&self) -> Result<(), String> {
        if self.language.trim().is_empty() {
            return Err("language is required".to_string());
        }
        if self.sample_rate == 0 {
            return Err("sample_rate is required".to_string());
        }
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(format!(
                "unsupported sample rate {} Hz (supported: {:?})",
                self.sample_rate, SUPPORTED_SAMPLE_RATES
            ));
        }
        if self.encoding.trim().is_empty() {
            return Err("encoding must not be blank".to_string());
        }
        Ok(())
    }
}

fn default_encoding() -> String {
    "LINEAR16".to_string()
}

fn default_model() -> String {
    "latest_long".to_string()
}

fn default_true() -> bool {
    true
}
