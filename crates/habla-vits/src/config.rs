//! Voice model configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use habla_core::{TtsError, TtsResult};

/// Configuration of a VITS-style voice, read from the model directory's
/// `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitsConfig {
    /// Voice identifier (e.g. "es-css10-vits").
    #[serde(default = "default_name")]
    pub name: String,
    /// Output sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Grapheme inventory; input characters outside it are dropped.
    #[serde(default = "default_characters")]
    pub characters: String,
    /// Text-encoder hidden size.
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
    /// Number of encoder convolution layers.
    #[serde(default = "default_encoder_layers")]
    pub encoder_layers: usize,
    /// Encoder convolution kernel width (odd, so length is preserved).
    #[serde(default = "default_encoder_kernel")]
    pub encoder_kernel: usize,
    /// Number of decoder convolution layers.
    #[serde(default = "default_decoder_layers")]
    pub decoder_layers: usize,
    /// Output samples per decoder frame.
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
    /// Hard cap on decoder frames per request, bounding inference cost.
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
}

fn default_name() -> String {
    "es-css10-vits".to_string()
}

fn default_sample_rate() -> u32 {
    22_050
}

fn default_characters() -> String {
    // Spanish grapheme set: letters, accented vowels, digits, punctuation.
    " abcdefghijklmnopqrstuvwxyzáéíóúüñ0123456789.,;:¡!¿?-'\"()".to_string()
}

fn default_hidden_size() -> usize {
    192
}

fn default_encoder_layers() -> usize {
    3
}

fn default_encoder_kernel() -> usize {
    5
}

fn default_decoder_layers() -> usize {
    2
}

fn default_hop_length() -> usize {
    256
}

fn default_max_frames() -> usize {
    30_000
}

impl Default for VitsConfig {
    fn default() -> Self {
        serde_json::from_str("{}").expect("empty config must deserialize to defaults")
    }
}

impl VitsConfig {
    /// Load the configuration from a JSON file.
    pub fn from_file(path: &Path) -> TtsResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| TtsError::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check the configuration before it is used to build a model.
    pub fn validate(&self) -> TtsResult<()> {
        if self.sample_rate == 0 {
            return Err(TtsError::config("sample_rate must be nonzero"));
        }
        if self.characters.is_empty() {
            return Err(TtsError::config("characters must not be empty"));
        }
        if self.encoder_kernel % 2 == 0 {
            return Err(TtsError::config("encoder_kernel must be odd"));
        }
        if self.hop_length == 0 || self.hidden_size == 0 {
            return Err(TtsError::config("hop_length and hidden_size must be nonzero"));
        }
        Ok(())
    }

    /// Vocabulary size for the text embedding.
    pub fn vocab_size(&self) -> usize {
        self.characters.chars().count()
    }

    /// Map text to grapheme ids. Characters outside the inventory are
    /// dropped; uppercase input is folded first.
    pub fn encode_text(&self, text: &str) -> Vec<u32> {
        let inventory: Vec<char> = self.characters.chars().collect();
        text.to_lowercase()
            .chars()
            .filter_map(|c| {
                let c = if c.is_whitespace() { ' ' } else { c };
                inventory.iter().position(|&k| k == c).map(|i| i as u32)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VitsConfig::default();
        assert_eq!(config.sample_rate, 22_050);
        assert_eq!(config.name, "es-css10-vits");
        assert!(config.vocab_size() > 40);
        config.validate().unwrap();
    }

    #[test]
    fn test_encode_text_folds_case_and_drops_unknown() {
        let config = VitsConfig::default();
        let ids = config.encode_text("Hola");
        assert_eq!(ids.len(), 4);
        assert_eq!(ids, config.encode_text("hola"));

        // Characters outside the inventory are dropped entirely.
        let ids = config.encode_text("héllo☃");
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_encode_text_keeps_spanish_punctuation() {
        let config = VitsConfig::default();
        assert!(!config.encode_text("¿Qué tal?").is_empty());
        assert!(!config.encode_text("¡Hola!").is_empty());
    }

    #[test]
    fn test_validate_rejects_even_kernel() {
        let config = VitsConfig {
            encoder_kernel: 4,
            ..VitsConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"sample_rate": 16000, "hop_length": 200}"#).unwrap();

        let config = VitsConfig::from_file(&path).unwrap();
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.hop_length, 200);
        assert_eq!(config.hidden_size, 192);
    }
}
