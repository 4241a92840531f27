//! One capture -> recognize -> extract pass against the current config.
//! Run with: cargo run -p chartwatch-capture --bin capture_check [config.json]

use anyhow::{Context, Result};
use chartwatch_config::Config;
use chartwatch_core::{IdentityExtractor, PatternExtractor};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str::<Config>(&raw).with_context(|| format!("parsing {path}"))?
        }
        None => Config::default(),
    };
    config.apply_env();

    let mut surface = chartwatch_capture::open_surface(&config.capture)?;
    let mut recognizer = chartwatch_capture::open_recognizer(&config.ocr)?;
    let extractor = PatternExtractor::new(&config.extractor)?;

    surface.initialize().await?;
    recognizer.initialize().await?;

    let start = std::time::Instant::now();
    let snapshot = surface.snapshot().await?;
    tracing::info!(
        "Captured {}x{} ({} bytes) in {:?}",
        snapshot.width,
        snapshot.height,
        snapshot.png.len(),
        start.elapsed()
    );

    let start = std::time::Instant::now();
    let text = recognizer.recognize(&snapshot).await?;
    tracing::info!("Recognized {} chars in {:?}", text.chars().count(), start.elapsed());
    for line in text.lines().filter(|l| !l.trim().is_empty()).take(5) {
        tracing::debug!("> {line}");
    }

    let candidate = extractor.extract(&text);
    tracing::info!("MRN: {:?}, name: {:?}", candidate.mrn, candidate.name);

    recognizer.terminate().await;
    surface.stop().await;
    Ok(())
}
