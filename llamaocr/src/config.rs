use serde::Deserialize;
use std::env;
use std::fmt;

pub const DEFAULT_MODEL: &str = "together/meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo";
pub const DEFAULT_LANGUAGE: &str = "tur";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

/// Reads a string variable, treating an empty value the same as an unset one.
fn non_empty_env(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ocr: OcrConfig,
}

#[derive(Clone, Deserialize)]
pub struct OcrConfig {
    /// `provider/model`, e.g. `together/meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo`
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    /// Language hint passed to the vision model, ISO 639-2 (`tur`, `eng`, ...)
    pub language: String,
    /// Whole-call timeout. `None` waits for the provider indefinitely.
    pub timeout_secs: Option<u64>,
    pub max_retries: u32,
    pub max_tokens: u32,
    pub max_file_size: u64,
}

// Hand-written so the credential never ends up in logs or panic messages.
impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("max_tokens", &self.max_tokens)
            .field("max_file_size", &self.max_file_size)
            .finish()
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: None,
            language: DEFAULT_LANGUAGE.to_string(),
            timeout_secs: None,
            max_retries: 0,
            max_tokens: 4096,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ocr: OcrConfig {
                model: non_empty_env("OCR_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                api_key: non_empty_env("OCR_API_KEY").or_else(|| non_empty_env("TOGETHER_API_KEY")),
                base_url: non_empty_env("OCR_BASE_URL"),
                language: non_empty_env("OCR_LANGUAGE")
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
                timeout_secs: parse_env_opt("OCR_TIMEOUT"),
                max_retries: parse_env_or("OCR_MAX_RETRIES", 0),
                max_tokens: parse_env_or("OCR_MAX_TOKENS", 4096),
                max_file_size: parse_env_or("OCR_MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Providers that expose an OpenAI-compatible chat completions endpoint
pub const KNOWN_OCR_PROVIDERS: &[&str] = &["together", "openai", "openrouter", "ollama", "lmstudio"];

/// Parse an OCR model name into (provider, model) tuple.
///
/// Model ids such as `meta-llama/Llama-3.2-11B-Vision-Instruct-Turbo` contain a
/// slash themselves, so only a known prefix is split off.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_OCR_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    ("together", model)
}
