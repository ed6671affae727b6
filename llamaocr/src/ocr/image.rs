use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{OcrCliError, Result};

/// Image types the hosted vision models accept.
const SUPPORTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// An image read from disk, ready to be embedded in a request.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    /// Read and validate the file at `path`.
    pub async fn load(path: &Path, max_file_size: u64) -> Result<Self> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            OcrCliError::UnsupportedFile(format!("Cannot read {}: {e}", path.display()))
        })?;

        if !metadata.is_file() {
            return Err(OcrCliError::UnsupportedFile(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        if metadata.len() > max_file_size {
            return Err(OcrCliError::UnsupportedFile(format!(
                "{} is {} bytes, maximum is {max_file_size}",
                path.display(),
                metadata.len()
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        let mime_type = detect_mime_type(path, &bytes).ok_or_else(|| {
            OcrCliError::UnsupportedFile(format!(
                "{} is not a supported image (expected one of: {})",
                path.display(),
                SUPPORTED_MIME_TYPES.join(", ")
            ))
        })?;

        tracing::debug!(
            path = %path.display(),
            mime_type,
            size = bytes.len(),
            "Loaded image"
        );

        Ok(Self { mime_type, bytes })
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// Sniff the content first; fall back to the extension for formats whose
/// magic bytes are not recognized.
fn detect_mime_type(path: &Path, bytes: &[u8]) -> Option<&'static str> {
    if let Some(kind) = infer::get(bytes) {
        return supported(kind.mime_type());
    }

    let is_jfif = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jfif"));
    if is_jfif {
        return Some("image/jpeg");
    }

    let guessed = mime_guess::from_path(path).first()?;
    supported(guessed.essence_str())
}

fn supported(mime_type: &str) -> Option<&'static str> {
    SUPPORTED_MIME_TYPES
        .iter()
        .copied()
        .find(|candidate| *candidate == mime_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_HEADER: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46];

    fn temp_file(suffix: &str, contents: &[u8]) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[tokio::test]
    async fn test_loads_png_by_content() {
        let file = temp_file(".bin", PNG_HEADER);
        let image = ImageInput::load(file.path(), 1024).await.unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.bytes, PNG_HEADER);
    }

    #[tokio::test]
    async fn test_content_wins_over_extension() {
        let file = temp_file(".png", JPEG_HEADER);
        let image = ImageInput::load(file.path(), 1024).await.unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_jfif_extension_is_jpeg() {
        let file = temp_file(".jfif", b"not really sniffable");
        let image = ImageInput::load(file.path(), 1024).await.unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_rejects_non_image() {
        let file = temp_file(".txt", b"hello world");
        let result = ImageInput::load(file.path(), 1024).await;
        assert!(matches!(result, Err(OcrCliError::UnsupportedFile(_))));
    }

    #[tokio::test]
    async fn test_rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageInput::load(&dir.path().join("missing.png"), 1024).await;
        assert!(matches!(result, Err(OcrCliError::UnsupportedFile(_))));
    }

    #[tokio::test]
    async fn test_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageInput::load(dir.path(), 1024).await;
        match result {
            Err(OcrCliError::UnsupportedFile(message)) => {
                assert!(message.contains("not a regular file"))
            }
            other => panic!("Expected UnsupportedFile, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejects_oversized_file() {
        let file = temp_file(".png", PNG_HEADER);
        let result = ImageInput::load(file.path(), 4).await;
        assert!(matches!(result, Err(OcrCliError::UnsupportedFile(_))));
    }

    #[test]
    fn test_data_url() {
        let image = ImageInput {
            mime_type: "image/jpeg",
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
        };
        assert_eq!(image.to_data_url(), "data:image/jpeg;base64,/9j/4A==");
    }
}
