#![allow(dead_code)]

use std::io::Write;

use llamaocr::config::OcrConfig;
use serde_json::json;
use tempfile::{Builder, NamedTempFile};

/// Smallest byte sequence `infer` recognizes as a PNG.
pub const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

/// Write `contents` to a temp file with the given suffix.
pub fn image_fixture(suffix: &str, contents: &[u8]) -> NamedTempFile {
    let mut file = Builder::new()
        .prefix("receipt")
        .suffix(suffix)
        .tempfile()
        .unwrap_or_else(|e| panic!("Failed to create fixture: {e}"));
    file.write_all(contents)
        .unwrap_or_else(|e| panic!("Failed to write fixture: {e}"));
    file
}

pub fn ocr_config(base_url: String, max_retries: u32) -> OcrConfig {
    OcrConfig {
        model: "together/meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo".to_string(),
        api_key: Some("test-key".to_string()),
        base_url: Some(base_url),
        language: "tur".to_string(),
        timeout_secs: Some(5),
        max_retries,
        max_tokens: 4096,
        max_file_size: 1024 * 1024,
    }
}

pub fn completion_body(content: Option<&str>) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1,
        "model": "meta-llama/Llama-3.2-90B-Vision-Instruct-Turbo",
        "choices": [
            {
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }
        ],
        "usage": {
            "prompt_tokens": 1,
            "completion_tokens": 1,
            "total_tokens": 2
        }
    })
}
