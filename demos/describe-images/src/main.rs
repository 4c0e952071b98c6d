//! Describes local images or image URLs with a vision model.
//!
//! ```text
//! cargo run -p describe-images -- photo.png https://example.com/boardwalk.jpg
//! ```
//!
//! Local files are sent as base64 data URLs, URLs are passed through. The image
//! block is placed before the question, as many vision models expect.

use std::path::Path;

use anyhow::{Context, bail};
use kaiten::{BatchColumns, BatchInferenceWorker, ContentOrder, ImageSource, WorkerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_MODEL: &str = "google/gemma-3n-e4b-it";
const PROMPT: &str = "Describe this image in detail.";

fn load_image(arg: &str) -> anyhow::Result<ImageSource> {
    if arg.starts_with("http://") || arg.starts_with("https://") {
        return Ok(ImageSource::url(arg));
    }
    let path = Path::new(arg);
    let mime = match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "gif" => "image/gif",
        _ => bail!("unsupported image type: {}", arg),
    };
    let data = std::fs::read(path).with_context(|| format!("reading {}", arg))?;
    Ok(ImageSource::bytes(data, mime))
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "describe_images=info,kaiten=info".into()),
        )
        .init();

    let images = std::env::args()
        .skip(1)
        .map(|arg| load_image(&arg))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if images.is_empty() {
        bail!("usage: describe-images <path-or-url>...");
    }

    let model_id = std::env::var("MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let config = WorkerConfig::from_env().with_content_order(ContentOrder::ImageFirst);
    let worker = BatchInferenceWorker::new(config)?;

    let texts = vec![Some(PROMPT.to_string()); images.len()];
    let columns = BatchColumns::new(model_id, texts).with_images(images.into_iter().map(Some).collect());
    let batch = worker.run_columns(columns)?;
    info!(rows = batch.len(), failed = batch.failed(), "images described");

    for (arg, row) in std::env::args().skip(1).zip(batch) {
        match row.outcome {
            Ok(description) => println!("== {}\n{}\n", arg, description.trim()),
            Err(error) => println!("== {}\nerror: {}\n", arg, error),
        }
    }
    Ok(())
}
