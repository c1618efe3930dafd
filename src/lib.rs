pub mod args;
pub mod audio;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod reddit;
pub mod render;
pub mod segment;
pub mod similarity;
pub mod subtitle;
pub mod tts;
pub mod utils;
pub mod video;

use anyhow::Context;
use args::Args;
use config::Config;
use error::PipelineError;
use pipeline::Pipeline;
use reddit::RedditClient;
use render::Renderer;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tts::Narrator;
use video::{AssemblySettings, Assembler, Ffmpeg};

pub async fn run(args: Args) -> anyhow::Result<()> {
    setup_tracing(args.verbose);
    info!("Starting reddit story video generation pipeline");

    let config = load_config(&args)?;
    let provider = RedditClient::connect(&config).await?;
    let narrator = Narrator::from_config(&config);
    let assembler = Assembler::new(Ffmpeg::new(), AssemblySettings::from_config(&config));

    let mut pipeline = Pipeline::new(config, provider, narrator, assembler).dry_run(args.dry_run);
    if !args.dry_run {
        let renderer = Renderer::from_config(pipeline.config())
            .map_err(|source| PipelineError::Render { chunk: 0, source })?;
        pipeline = pipeline.with_renderer(renderer);
    }

    let report = pipeline.run_batch().await;
    for path in &report.produced {
        info!("Video ready: {}", path.display());
    }
    if !report.success() {
        let ids: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
        anyhow::bail!("{} of the runs failed ({})", report.failed.len(), ids.join(", "));
    }
    info!("Process complete.");
    Ok(())
}

/// Config file plus command-line overrides, validated once both are applied.
pub fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = Config::read(&args.config)
        .with_context(|| format!("load config {}", args.config.display()))?;
    if let Some(post_id) = &args.post_id {
        config.reddit.thread.post_id = post_id.trim().to_string();
    }
    if let Some(times) = args.times {
        config.settings.times_to_run = times;
    }
    config.validate()?;
    Ok(config)
}

fn setup_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
