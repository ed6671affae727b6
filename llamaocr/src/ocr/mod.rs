//! Text recognition through hosted vision models.
//!
//! The provider pattern mirrors a pluggable backend:
//! - `OcrClient` trait defines the interface the CLI drives
//! - `OcrProvider` picks a backend from `OcrConfig::model`
//! - `VisionApiClient` talks to OpenAI-compatible chat completions endpoints
//!   (Together AI by default, also OpenAI, OpenRouter, Ollama, LM Studio)
//!
//! # Configuration
//!
//! See `OcrConfig` in `config.rs`:
//! - `model`: `provider/model`, e.g. `together/meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo`
//! - `api_key`: credential for hosted providers
//! - `base_url`: custom endpoint for proxies or self-hosted servers
//! - `language`: ISO 639-2 hint passed to the model
//! - `timeout_secs`: optional limit on the whole call
//!
//! # Usage
//!
//! ```rust,ignore
//! let ocr = OcrProvider::new(&config.ocr);
//! let text = ocr.recognize(&OcrRequest { file_path, language }).await?;
//! ```

mod api;
mod image;
mod provider;

pub use api::VisionApiClient;
pub use image::ImageInput;
pub use provider::{OcrClient, OcrProvider, OcrRequest};
