use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::{parse_provider_model, OcrConfig};
use crate::error::{OcrCliError, Result};

use super::image::ImageInput;

const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

/// Free-tier shortcut accepted in place of a Together model id.
const FREE_MODEL_ALIAS: &str = "free";
const FREE_MODEL: &str = "meta-llama/Llama-3.2-11B-Vision-Instruct-Turbo";

const BASE_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Client for any OpenAI-compatible chat completions endpoint that accepts
/// images as `image_url` content parts.
#[derive(Clone)]
pub struct VisionApiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_retries: u32,
    max_tokens: u32,
}

impl fmt::Debug for VisionApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionApiClient")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

impl VisionApiClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let (provider, model) = parse_provider_model(&config.model);
        let provider = provider.to_lowercase();

        if requires_api_key(&provider) && config.api_key.is_none() {
            return Err(OcrCliError::Ocr(format!(
                "API key required for {provider} OCR"
            )));
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(&provider).to_string());

        let model = if provider == "together" && model.eq_ignore_ascii_case(FREE_MODEL_ALIAS) {
            FREE_MODEL.to_string()
        } else {
            model.to_string()
        };

        // The overall deadline is enforced by `OcrProvider::recognize`.
        let client = Client::builder()
            .build()
            .map_err(|e| OcrCliError::Ocr(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_retries: config.max_retries,
            max_tokens: config.max_tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn ocr(&self, image: &ImageInput, language: &str) -> Result<Option<String>> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: vec![ContentPart::Text {
                        text: system_prompt(language),
                    }],
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: vec![ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.to_data_url(),
                        },
                    }],
                },
            ],
            max_tokens: self.max_tokens,
        };

        self.make_request(&request).await
    }

    async fn make_request(&self, request: &ChatRequest) -> Result<Option<String>> {
        let mut retries = 0;

        loop {
            let mut builder = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .json(request);
            if let Some(api_key) = &self.api_key {
                builder = builder.bearer_auth(api_key);
            }

            match builder.send().await {
                Ok(resp) if resp.status().is_success() => {
                    let chat_response: ChatResponse = resp.json().await.map_err(|e| {
                        OcrCliError::Ocr(format!("Failed to parse response: {e}"))
                    })?;

                    return chat_response
                        .choices
                        .into_iter()
                        .next()
                        .map(|choice| choice.message.content)
                        .ok_or_else(|| OcrCliError::Ocr("No response from API".to_string()));
                }
                Ok(resp) => {
                    let status = resp.status();
                    let retryable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

                    if retryable && retries < self.max_retries {
                        retries += 1;
                        tracing::debug!(%status, attempt = retries, "OCR request failed, retrying");
                        tokio::time::sleep(backoff_delay(retries)).await;
                        continue;
                    }

                    return Err(Self::status_error(resp).await);
                }
                Err(e) => {
                    if retries < self.max_retries {
                        retries += 1;
                        tracing::debug!(error = %e, attempt = retries, "OCR request failed, retrying");
                        tokio::time::sleep(backoff_delay(retries)).await;
                        continue;
                    }

                    return Err(OcrCliError::Http(e));
                }
            }
        }
    }

    async fn status_error(resp: Response) -> OcrCliError {
        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let body = resp.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                OcrCliError::ApiAuth(format!("{status} - {body}"))
            }
            StatusCode::TOO_MANY_REQUESTS => OcrCliError::ApiRateLimit { retry_after },
            _ => OcrCliError::Ocr(format!("API request failed: {status} - {body}")),
        }
    }
}

fn system_prompt(language: &str) -> String {
    format!(
        "Convert the provided image into Markdown format. Ensure that all content from the page \
         is included, such as headers, footers, subtexts, images (with alt text if possible), \
         tables, and any other elements. The document is written in the language with ISO 639-2 \
         code '{language}'; transcribe it in that language without translating.\n\n\
         Requirements:\n\
         - Output Only Markdown: Return solely the Markdown content without any additional \
         explanations or comments.\n\
         - No Delimiters: Do not use code fences or delimiters like ```markdown.\n\
         - Complete Content: Do not omit any part of the page, including headers, footers, and \
         subtext."
    )
}

/// `100ms * 2^attempt`, capped at [`MAX_BACKOFF`].
fn backoff_delay(attempt: u32) -> Duration {
    let millis = BASE_BACKOFF_MS.saturating_mul(2_u64.saturating_pow(attempt));
    Duration::from_millis(millis).min(MAX_BACKOFF)
}

fn requires_api_key(provider: &str) -> bool {
    !matches!(provider, "ollama" | "lmstudio")
}

fn default_base_url(provider: &str) -> &'static str {
    match provider {
        "openai" => OPENAI_BASE_URL,
        "openrouter" => OPENROUTER_BASE_URL,
        "ollama" => OLLAMA_BASE_URL,
        "lmstudio" => LMSTUDIO_BASE_URL,
        _ => TOGETHER_BASE_URL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config(model: &str) -> OcrConfig {
        OcrConfig {
            model: model.to_string(),
            ..OcrConfig::default()
        }
    }

    #[test]
    fn test_together_client_requires_api_key() {
        let config = create_test_config("together/meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo");
        let result = VisionApiClient::new(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key required"));
    }

    #[test]
    fn test_openai_client_requires_api_key() {
        let result = VisionApiClient::new(&create_test_config("openai/gpt-4o"));
        assert!(result.is_err());
    }

    #[test]
    fn test_local_providers_do_not_require_api_key() {
        let ollama = VisionApiClient::new(&create_test_config("ollama/llama3.2-vision")).unwrap();
        assert_eq!(ollama.base_url(), OLLAMA_BASE_URL);
        assert_eq!(ollama.model(), "llama3.2-vision");

        let lmstudio = VisionApiClient::new(&create_test_config("lmstudio/qwen2-vl")).unwrap();
        assert_eq!(lmstudio.base_url(), LMSTUDIO_BASE_URL);
    }

    #[test]
    fn test_default_base_urls() {
        let mut config = create_test_config("together/meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo");
        config.api_key = Some("test-key".to_string());

        let together = VisionApiClient::new(&config).unwrap();
        assert!(together.base_url().contains("together"));
        assert_eq!(together.model(), "meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo");

        config.model = "openai/gpt-4o".to_string();
        let openai = VisionApiClient::new(&config).unwrap();
        assert!(openai.base_url().contains("openai"));

        config.model = "openrouter/meta-llama/llama-3.2-11b-vision-instruct".to_string();
        let openrouter = VisionApiClient::new(&config).unwrap();
        assert!(openrouter.base_url().contains("openrouter"));
    }

    #[test]
    fn test_custom_base_url_trailing_slash_trimmed() {
        let mut config = create_test_config("openai/gpt-4o");
        config.api_key = Some("test-key".to_string());
        config.base_url = Some("https://custom.api.com/v1/".to_string());

        let client = VisionApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "https://custom.api.com/v1");
    }

    #[test]
    fn test_free_alias_resolves_to_small_vision_model() {
        let mut config = create_test_config("free");
        config.api_key = Some("test-key".to_string());

        let client = VisionApiClient::new(&config).unwrap();
        assert_eq!(client.model(), FREE_MODEL);
        assert_eq!(client.base_url(), TOGETHER_BASE_URL);
    }

    #[test]
    fn test_debug_output_redacts_api_key() {
        let mut config = create_test_config("openai/gpt-4o");
        config.api_key = Some("sk-very-secret".to_string());

        let client = VisionApiClient::new(&config).unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("sk-very-secret"));
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(1), Duration::from_millis(200));
        assert_eq!(backoff_delay(2), Duration::from_millis(400));
        assert_eq!(backoff_delay(6), Duration::from_millis(6400));
    }

    #[test]
    fn test_backoff_is_capped_for_large_retry_counts() {
        assert_eq!(backoff_delay(7), MAX_BACKOFF);
        assert_eq!(backoff_delay(64), MAX_BACKOFF);
        assert_eq!(backoff_delay(u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn test_system_prompt_mentions_language() {
        let prompt = system_prompt("tur");
        assert!(prompt.contains("'tur'"));
        assert!(prompt.contains("Markdown"));
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = ChatRequest {
            model: "m".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/png;base64,AA==".to_string(),
                    },
                }],
            }],
            max_tokens: 16,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["content"][0]["type"], "image_url");
        assert_eq!(
            value["messages"][0]["content"][0]["image_url"]["url"],
            "data:image/png;base64,AA=="
        );
        assert_eq!(value["max_tokens"], 16);
    }
}
