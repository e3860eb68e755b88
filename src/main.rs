use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use subtrans::config::{Config, Tone};
use subtrans::translate::{OpenAiClient, TranslationClient};
use subtrans::{print_summary, translate_file, PipelineContext};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "subtrans")]
#[command(version, about = "Translate SRT subtitles with OpenAI")]
#[command(long_about = "Translate SRT subtitles chunk by chunk with an OpenAI chat model, keeping numbering and timing. Interrupted runs resume from <name>_process.json.")]
struct Cli {
    /// Input .srt file
    filename: PathBuf,

    /// Tone of the translation: formal, informal
    #[arg(short, long, default_value = "informal")]
    tone: String,

    /// Only translate the first 3 chunks
    #[arg(long)]
    test: bool,

    /// Config file (defaults to ./subtrans.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// `RUST_LOG` wins when set and parseable; otherwise `--verbose` picks the level.
fn log_filter(rust_log: Option<&str>, verbose: bool) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "info" }))
}

fn init_logging(verbose: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();

    FmtSubscriber::builder()
        .with_env_filter(log_filter(rust_log.as_deref(), verbose))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let tone: Tone = cli.tone.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    // Load and validate configuration
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    let api_key = config.openai_api_key.clone().unwrap_or_default();
    let completion = OpenAiClient::new(api_key)
        .with_model(config.model.clone())
        .with_base_url(config.api_base.clone());

    info!("Input:    {}", cli.filename.display());
    info!("Language: {}", config.target_language);
    info!("Tone:     {}", tone);
    info!("Model:    {}", config.model);
    if cli.test {
        info!("Test mode: only the first chunks will be translated");
    }

    let ctx = PipelineContext::new(TranslationClient::from_config(Box::new(completion), &config))
        .with_tone(tone)
        .with_chunk_size(config.chunk_size)
        .with_test_mode(cli.test)
        .with_progress(!cli.no_progress);

    let result = translate_file(&ctx, &cli.filename)
        .await
        .with_context(|| format!("Failed to translate {}", cli.filename.display()))?;

    print_summary(&result);

    Ok(())
}
