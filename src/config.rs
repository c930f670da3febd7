use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use crate::error::{Result, SubtranslateError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub endpoint: EndpointConfig,
    pub paths: PathsConfig,
    pub sanitizer: SanitizerConfig,
    pub prompt: PromptConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL of the ollama server
    pub url: String,
    /// Path of the model registry listing
    pub models_path: String,
    /// Path of the non-streaming generation call
    pub generate_path: String,
    /// Model used when the caller does not name one
    pub default_model: String,
    /// Timeout for the availability probe (seconds)
    pub probe_timeout_secs: u64,
    /// Timeout for a single generation call (seconds)
    pub generate_timeout_secs: u64,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Maximum number of tokens generated per entry
    pub num_predict: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Local mount point of the media share
    pub media_root: String,
    /// Substrings identifying a remote share path (UNC prefix, server address)
    pub share_markers: Vec<String>,
    /// Share name; everything up to and including it is dropped from remote paths
    pub share_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// Lines whose CJK fraction reaches this value are dropped for non-CJK targets
    pub cjk_threshold: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Extra per-language guidance, keyed by language code.
    /// Entries here override the built-in ones.
    pub style_guides: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            models_path: "/api/tags".to_string(),
            generate_path: "/api/generate".to_string(),
            default_model: "qwen2.5:14b".to_string(),
            probe_timeout_secs: 5,
            generate_timeout_secs: 180,
            temperature: 0.1,
            top_p: 0.8,
            num_predict: 500,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            media_root: "/mnt/media".to_string(),
            share_markers: vec!["\\\\".to_string(), "192.168.0.2".to_string()],
            share_base: "Media".to_string(),
        }
    }
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self { cjk_threshold: 0.5 }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubtranslateError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SubtranslateError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubtranslateError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubtranslateError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.sanitizer.cjk_threshold;
        // 0 would drop every line
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(SubtranslateError::Config(format!(
                "sanitizer.cjk_threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        if self.endpoint.generate_timeout_secs == 0 || self.endpoint.probe_timeout_secs == 0 {
            return Err(SubtranslateError::Config("endpoint timeouts must be positive".to_string()));
        }
        Ok(())
    }
}
