//! Cotton Doctor capture client
//!
//! The `cotton` command classifies cotton plant images and delivers the
//! resulting advisory records to the collector.
//!
//! ## Commands
//!
//! - `detect`: classify one image and send the record
//! - `watch`: run the capture loop over a drop directory
//! - `categories`: print the knowledge base
//! - `history` / `latest`: read records back from the collector

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cotton_core::{
    CaptureLoop, CapturedAt, ClassifierAdapter, DetectionPipeline, DirectorySource, Frame,
    KnowledgeBase, LabelSet, Preprocessor, Record, RetryPolicy, SendOutcome, ServingConfig,
    ServingModel, TransportClient, TransportConfig, METRICS,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cotton")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cotton Doctor: cotton disease detection and advisory", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output and JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Collector root URL
    #[arg(
        long,
        global = true,
        env = "COTTON_COLLECTOR_URL",
        default_value = "http://localhost:8000"
    )]
    collector: String,

    /// Per-request timeout for the collector, in seconds
    #[arg(long, global = true, default_value_t = 5)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Model and delivery options shared by `detect` and `watch`.
#[derive(clap::Args, Debug, Clone)]
struct ModelArgs {
    /// Model server root URL (TensorFlow-Serving REST)
    #[arg(long, env = "COTTON_MODEL_URL", default_value = "http://localhost:8501")]
    model_url: String,

    /// Served model name
    #[arg(long, env = "COTTON_MODEL_NAME", default_value = "cotton_disease")]
    model_name: String,

    /// Class label file (JSON array, index order)
    #[arg(long, env = "COTTON_LABELS", default_value = "class_names.json")]
    labels: PathBuf,

    /// Accept labels outside the known categories (their advisory is empty)
    #[arg(long)]
    lenient_labels: bool,

    /// Square model input edge in pixels
    #[arg(long, default_value_t = cotton_core::DEFAULT_INPUT_SIZE)]
    input_size: u32,

    /// Extra send attempts when the collector is unavailable
    #[arg(long, default_value_t = 0)]
    retries: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one image and send the advisory record
    Detect {
        /// Image file (PNG or JPEG)
        image: PathBuf,

        /// Print the record without sending it
        #[arg(long)]
        no_send: bool,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Watch a drop directory and process every new image
    Watch {
        /// Directory a camera tool writes stills into
        dir: PathBuf,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        poll_ms: u64,

        /// Process the images present now, then exit
        #[arg(long)]
        once: bool,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Print the knowledge base
    Categories,

    /// Print every record held by the collector
    History,

    /// Print the collector's most recent record
    Latest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cotton_core::init_tracing(cli.json, cotton_core::level_for(cli.verbose));

    let transport = TransportClient::new(
        TransportConfig::new(&cli.collector).with_timeout(Duration::from_secs(cli.timeout_secs)),
    )
    .context("failed to build collector client")?;

    match cli.command {
        Commands::Detect {
            image,
            no_send,
            model,
        } => cmd_detect(&transport, &model, &image, no_send, cli.json).await,
        Commands::Watch {
            dir,
            poll_ms,
            once,
            model,
        } => cmd_watch(transport, &model, dir, poll_ms, once).await,
        Commands::Categories => cmd_categories(cli.json),
        Commands::History => cmd_history(&transport, cli.json).await,
        Commands::Latest => cmd_latest(&transport, cli.json).await,
    }
}

fn build_pipeline(args: &ModelArgs) -> Result<DetectionPipeline> {
    let labels = if args.lenient_labels {
        let raw = std::fs::read_to_string(&args.labels)
            .with_context(|| format!("failed to read {}", args.labels.display()))?;
        let names: Vec<String> = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a JSON array of labels", args.labels.display()))?;
        LabelSet::lenient(names)?
    } else {
        LabelSet::load(&args.labels)
            .with_context(|| format!("failed to load labels from {}", args.labels.display()))?
    };

    let preprocessor = Preprocessor::new(args.input_size);
    let config = ServingConfig::new(&args.model_url, &args.model_name)
        .with_input_shape(preprocessor.input_shape());
    let model = ServingModel::new(config).context("failed to build model client")?;

    info!(
        labels = labels.len(),
        model = %args.model_name,
        input_size = args.input_size,
        "classifier ready"
    );
    Ok(DetectionPipeline::new(
        preprocessor,
        ClassifierAdapter::new(Arc::new(model), labels),
    ))
}

async fn cmd_detect(
    transport: &TransportClient,
    args: &ModelArgs,
    image: &Path,
    no_send: bool,
    json: bool,
) -> Result<()> {
    let pipeline = build_pipeline(args)?;
    let captured_at = CapturedAt::now();
    let frame = Frame::open(image)?;
    let record = pipeline
        .detect(&frame, captured_at)
        .await
        .with_context(|| format!("detection failed for {}", image.display()))?;

    print_record(&record, json)?;

    if !no_send {
        let policy = RetryPolicy::with_retries(args.retries);
        match transport.send_with_retry(&record, &policy).await {
            SendOutcome::Ack => {
                if !json {
                    println!("✓ Sent to {}", transport.config().collector_url);
                }
            }
            SendOutcome::Unavailable(reason) => {
                warn!(reason = %reason, "collector unavailable; record not delivered");
            }
        }
    }
    Ok(())
}

async fn cmd_watch(
    transport: TransportClient,
    args: &ModelArgs,
    dir: PathBuf,
    poll_ms: u64,
    once: bool,
) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    let pipeline = build_pipeline(args)?;
    let capture = CaptureLoop::new(pipeline, transport)
        .with_retry(RetryPolicy::with_retries(args.retries));

    let mut source = DirectorySource::new(&dir);
    if !once {
        source = source.follow(Duration::from_millis(poll_ms));
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    info!(dir = %dir.display(), follow = !once, "watching for images");
    let summary = capture.run(&mut source, cancel).await;
    METRICS.flush();

    println!(
        "{} cycles: {} sent, {} unavailable, {} invalid frames, {} inference failures",
        summary.cycles,
        summary.sent,
        summary.unavailable,
        summary.invalid_frames,
        summary.inference_failures
    );
    Ok(())
}

fn cmd_categories(json: bool) -> Result<()> {
    let entries = KnowledgeBase::new().categories();
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in entries {
        let t = entry.template;
        println!(
            "{} [{}] treat={}",
            entry.category,
            t.severity.as_str(),
            if t.treat { "yes" } else { "no" }
        );
        println!("  {}", t.description_primary);
        println!("  guidance: {}", t.guidance_primary);
        println!("  agents:   {}", t.agent_primary);
        println!();
    }
    Ok(())
}

async fn cmd_history(transport: &TransportClient, json: bool) -> Result<()> {
    let records = transport
        .fetch_all()
        .await
        .context("failed to fetch history")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No predictions available");
    }
    for record in &records {
        println!("{}", history_line(record));
    }
    Ok(())
}

async fn cmd_latest(transport: &TransportClient, json: bool) -> Result<()> {
    match transport
        .fetch_latest()
        .await
        .context("failed to fetch latest record")?
    {
        Some(record) => print_record(&record, json),
        None => {
            println!("No predictions available");
            Ok(())
        }
    }
}

fn history_line(record: &Record) -> String {
    format!(
        "{}  {:<18} {:>6.2}%  treat={}",
        record.captured_at(),
        record.category(),
        record.confidence(),
        record.treat()
    )
}

fn print_record(record: &Record, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }
    println!("Detected:  {} ({:.2}%)", record.category(), record.confidence());
    println!("Treat now: {}", if record.treat() { "yes" } else { "no" });
    if !record.guidance_primary().is_empty() {
        println!("Guidance:  {}", record.guidance_primary());
        println!("           {}", record.guidance_secondary());
        println!("Agents:    {}", record.agent_primary());
        println!("           {}", record.agent_secondary());
    }
    println!("Captured:  {}", record.captured_at());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn detect_parses_model_args() {
        let cli = Cli::parse_from([
            "cotton",
            "detect",
            "leaf.jpg",
            "--model-url",
            "http://pi:8501",
            "--retries",
            "2",
            "--no-send",
        ]);
        match cli.command {
            Commands::Detect {
                image,
                no_send,
                model,
            } => {
                assert_eq!(image, PathBuf::from("leaf.jpg"));
                assert!(no_send);
                assert_eq!(model.model_url, "http://pi:8501");
                assert_eq!(model.retries, 2);
                assert_eq!(model.input_size, 224);
            }
            _ => panic!("expected detect"),
        }
    }

    #[test]
    fn global_collector_flag_after_subcommand() {
        let cli = Cli::parse_from(["cotton", "latest", "--collector", "http://10.0.0.5:8000"]);
        assert_eq!(cli.collector, "http://10.0.0.5:8000");
        assert!(matches!(cli.command, Commands::Latest));
    }

    #[test]
    fn history_line_format() {
        let record = Record::from_detection(
            "Aphids",
            91.23,
            CapturedAt::parse("2025-03-14 09:26:53").unwrap(),
        );
        let line = history_line(&record);
        assert!(line.starts_with("2025-03-14 09:26:53  Aphids"));
        assert!(line.contains("91.23%"));
        assert!(line.ends_with("treat=true"));
    }
}
