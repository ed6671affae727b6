use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::error::{OcrCliError, Result};

use super::api::VisionApiClient;
use super::image::ImageInput;

/// One recognition job: which file, in which language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrRequest {
    pub file_path: PathBuf,
    pub language: String,
}

/// Anything that can turn an image file into text.
///
/// `Ok(None)` means the service answered but had nothing to say.
#[async_trait]
pub trait OcrClient: Send + Sync {
    async fn recognize(&self, request: &OcrRequest) -> Result<Option<String>>;
}

#[derive(Clone)]
enum OcrBackend {
    Api { client: VisionApiClient },
    Unavailable { reason: String },
}

#[derive(Clone)]
pub struct OcrProvider {
    backend: OcrBackend,
    config: OcrConfig,
}

impl OcrProvider {
    /// Never fails: a misconfigured backend only errors once it is asked to
    /// recognize something.
    pub fn new(config: &OcrConfig) -> Self {
        let backend = match VisionApiClient::new(config) {
            Ok(client) => {
                info!(model = %client.model(), base_url = %client.base_url(), "OCR API backend initialized");
                OcrBackend::Api { client }
            }
            Err(e) => {
                // Reported by `recognize`, stderr gets one line per failure.
                let reason = match e {
                    OcrCliError::Ocr(message) => message,
                    other => other.to_string(),
                };
                debug!("{}", reason);
                OcrBackend::Unavailable { reason }
            }
        };

        Self {
            backend,
            config: config.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, OcrBackend::Unavailable { .. })
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    async fn recognize_internal(&self, request: &OcrRequest) -> Result<Option<String>> {
        match &self.backend {
            OcrBackend::Api { client } => {
                let image = ImageInput::load(&request.file_path, self.config.max_file_size).await?;
                client.ocr(&image, &request.language).await
            }
            OcrBackend::Unavailable { reason } => Err(OcrCliError::OcrUnavailable(reason.clone())),
        }
    }
}

#[async_trait]
impl OcrClient for OcrProvider {
    async fn recognize(&self, request: &OcrRequest) -> Result<Option<String>> {
        let Some(timeout_secs) = self.config.timeout_secs else {
            return self.recognize_internal(request).await;
        };

        match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.recognize_internal(request),
        )
        .await
        {
            Ok(inner_result) => inner_result,
            Err(_) => Err(OcrCliError::Timeout(timeout_secs)),
        }
    }
}
