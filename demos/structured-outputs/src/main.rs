//! Multiple-choice evaluation with guided decoding against a vLLM server.
//!
//! Start the server first, for example:
//!
//! ```text
//! python -m vllm.entrypoints.openai.api_server \
//!   --model google/gemma-3n-e4b-it \
//!   --guided-decoding-backend guidance \
//!   --dtype bfloat16 \
//!   --host 0.0.0.0 --port 8000
//! ```
//!
//! Reads `OPENAI_BASE_URL`, `OPENAI_API_KEY` and `MODEL` from the environment or `.env`.

mod eval;

use std::time::Instant;

use anyhow::Context;
use kaiten::{BatchColumns, BatchInferenceWorker, ExtraBody, SamplingParams, WorkerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::eval::{QUESTIONS, pass_rate};

const DEFAULT_MODEL: &str = "google/gemma-3n-e4b-it";

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "structured_outputs=info,kaiten=info".into()),
        )
        .init();

    let model_id = std::env::var("MODEL")
        .or_else(|_| std::env::var("OPENAI_MODEL_ID"))
        .unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let worker = BatchInferenceWorker::new(WorkerConfig::from_env())?;

    let models = worker
        .block_on(worker.adapter().list_models())
        .context("OpenAI-compatible server not reachable")?;
    if !models.contains(&model_id) {
        warn!(model = %model_id, served = ?models, "model not listed by server");
    }

    let texts = QUESTIONS.iter().map(|q| Some(q.prompt())).collect();
    let answers: Vec<&str> = QUESTIONS.iter().map(|q| q.answer).collect();
    let columns = BatchColumns::new(&model_id, texts)
        .with_sampling_params(SamplingParams::new().temperature(0.0))
        .with_extra_body(ExtraBody::new().guided_choice(["A", "B", "C", "D"]));

    let start = Instant::now();
    let batch = worker.run_columns(columns)?;
    let elapsed = start.elapsed().as_secs_f64();
    info!(
        rows = batch.len(),
        failed = batch.failed(),
        elapsed_secs = elapsed,
        rows_per_sec = batch.len() as f64 / elapsed,
        "batch processed"
    );

    for (row, answer) in batch.iter().zip(&answers) {
        match &row.outcome {
            Ok(output) => info!(index = row.index, output = %output.trim(), expected = %answer, "row"),
            Err(error) => warn!(index = row.index, %error, "row failed"),
        }
    }
    println!("Pass/Fail Rate: {}", pass_rate(&batch.outputs(), &answers));

    worker.close();
    Ok(())
}
