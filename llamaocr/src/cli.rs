//! Command-line surface: argument parsing and the mapping from a recognition
//! outcome to stdout, stderr and the process exit status.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use crate::config::OcrConfig;
use crate::normalize::OcrResult;
use crate::ocr::{OcrClient, OcrRequest};
use crate::receipt::ReceiptFields;

#[derive(Parser, Debug)]
#[command(name = "llamaocr")]
#[command(about = "Extract text from an image with a hosted vision model")]
#[command(version)]
pub struct Args {
    /// Image to recognize (jpg, jpeg, jfif, png, webp, gif)
    pub image_path: Option<OsString>,

    /// Model as `provider/model`, overrides OCR_MODEL
    #[arg(long)]
    pub model: Option<String>,

    /// ISO 639-2 language hint, overrides OCR_LANGUAGE
    #[arg(short, long)]
    pub language: Option<String>,

    /// Give up after this many seconds, overrides OCR_TIMEOUT
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print receipt fields as JSON instead of the recognized text
    #[arg(long)]
    pub fields: bool,
}

impl Args {
    /// The image argument, with an empty string treated as absent.
    pub fn image_path(&self) -> Option<PathBuf> {
        self.image_path
            .as_ref()
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
    }

    pub fn output_format(&self) -> OutputFormat {
        if self.fields {
            OutputFormat::Fields
        } else {
            OutputFormat::Text
        }
    }

    /// Layer command-line overrides on top of the environment configuration.
    pub fn apply_to(&self, config: &mut OcrConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(language) = &self.language {
            config.language = language.clone();
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = Some(timeout);
        }
    }
}

/// What gets printed on success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// The normalized text.
    #[default]
    Text,
    /// Receipt fields extracted from the normalized text, as pretty JSON.
    Fields,
}

/// How a single invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Printed,
    MissingArgument,
    ProviderFailure,
    EmptyResult,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Printed => 0,
            Outcome::MissingArgument | Outcome::ProviderFailure | Outcome::EmptyResult => 1,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome.exit_code())
    }
}

/// Recognize `image_path` with `client` and report the result.
///
/// On success the normalized text (or, with [`OutputFormat::Fields`], the
/// receipt fields read from it) goes to `stdout` in a single write. Missing
/// arguments and provider errors produce one diagnostic on `stderr`. An empty
/// result writes nothing at all. The client is called at most once.
pub async fn run<C, O, E>(
    image_path: Option<&Path>,
    language: &str,
    format: OutputFormat,
    client: &C,
    stdout: &mut O,
    stderr: &mut E,
) -> io::Result<Outcome>
where
    C: OcrClient + ?Sized,
    O: Write,
    E: Write,
{
    let Some(image_path) = image_path else {
        writeln!(stderr, "No image path provided")?;
        return Ok(Outcome::MissingArgument);
    };

    let request = OcrRequest {
        file_path: image_path.to_path_buf(),
        language: language.to_string(),
    };

    let raw_text = match client.recognize(&request).await {
        Ok(raw_text) => raw_text,
        Err(e) => {
            writeln!(stderr, "Error during OCR processing: {e}")?;
            return Ok(Outcome::ProviderFailure);
        }
    };

    let result = OcrResult::from_raw(raw_text);
    if !result.succeeded {
        tracing::debug!(path = %image_path.display(), "OCR returned no text");
        return Ok(Outcome::EmptyResult);
    }

    let mut output = match format {
        OutputFormat::Text => result.normalized_text,
        OutputFormat::Fields => {
            serde_json::to_string_pretty(&ReceiptFields::extract(&result.normalized_text))?
        }
    };
    output.push('\n');
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;

    Ok(Outcome::Printed)
}
