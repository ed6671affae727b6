use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llamaocr::cli::{self, Args};
use llamaocr::config::Config;
use llamaocr::ocr::OcrProvider;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    // Logs share stderr with the diagnostics, so stay quiet unless asked.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "llamaocr=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut config = Config::from_env();
    args.apply_to(&mut config.ocr);

    tracing::debug!(config = ?config.ocr, "Configuration loaded");

    let ocr = OcrProvider::new(&config.ocr);

    let image_path = args.image_path();
    let outcome = cli::run(
        image_path.as_deref(),
        &config.ocr.language,
        args.output_format(),
        &ocr,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )
    .await?;

    Ok(outcome.into())
}
