//! pdfscribe command-line interface.
//!
//! ```bash
//! pdfscribe                      # serve the webhook (same as `pdfscribe serve`)
//! pdfscribe serve -p 8080
//! pdfscribe extract scan.pdf -o scan.txt --no-structure
//! pdfscribe webhook set --url https://bot.example.com/webhook
//! pdfscribe webhook info
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use pdfscribe::structuring::{self, PassthroughStructurer, TextStructurer};
use pdfscribe::telegram::TelegramClient;
use pdfscribe::{PdfTextPipeline, ScribeConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdfscribe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Telegram bot that turns PDFs into text files", long_about = None)]
struct Cli {
    /// Configuration file (defaults to a discovered pdfscribe.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the Telegram webhook (default)
    Serve {
        /// Address to bind
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Extract text from a local PDF
    Extract {
        /// PDF file to read
        pdf: PathBuf,

        /// Write the text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip LLM structuring even when an API key is configured
        #[arg(long)]
        no_structure: bool,

        /// OCR every page, ignoring the text layer
        #[arg(long)]
        force_ocr: bool,

        /// Tesseract languages, e.g. "rus+eng"
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Manage the bot's webhook registration
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
}

#[derive(Subcommand)]
enum WebhookAction {
    /// Register the webhook URL with Telegram
    Set {
        /// Public HTTPS URL (defaults to WEBHOOK_URL)
        #[arg(long)]
        url: Option<String>,

        /// Discard updates queued while no webhook was set
        #[arg(long)]
        drop_pending: bool,
    },
    /// Remove the webhook
    Delete {
        /// Discard queued updates
        #[arg(long)]
        drop_pending: bool,
    },
    /// Show the current webhook status
    Info,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ScribeConfig> {
    ScribeConfig::load(path).context("Failed to load configuration")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            pdfscribe::run(config).await?;
        }
        Command::Extract {
            pdf,
            output,
            no_structure,
            force_ocr,
            language,
        } => {
            if force_ocr {
                config.extraction.force_ocr = true;
            }
            if let Some(language) = language {
                config.extraction.ocr.language = language;
            }
            extract(&config, &pdf, output.as_deref(), no_structure).await?;
        }
        Command::Webhook { action } => webhook(&config, action).await?,
    }

    Ok(())
}

async fn extract(config: &ScribeConfig, pdf: &Path, output: Option<&Path>, no_structure: bool) -> Result<()> {
    config.validate()?;

    let bytes = tokio::fs::read(pdf)
        .await
        .with_context(|| format!("Failed to read {}", pdf.display()))?;

    let pipeline = PdfTextPipeline::from_config(&config.extraction);
    let document = pipeline
        .extract(&bytes)
        .await
        .with_context(|| format!("Failed to extract text from {}", pdf.display()))?;

    if document.is_blank() {
        tracing::warn!(pages = document.page_count, "No text found in {}", pdf.display());
    }

    let structurer: Arc<dyn TextStructurer> = if no_structure {
        Arc::new(PassthroughStructurer)
    } else {
        structuring::from_config(&config.structuring)?
    };
    let result = structuring::structure_with_fallback(structurer.as_ref(), &document.content).await;

    tracing::info!(
        pages = document.page_count,
        method = %document.method,
        structured = result.structured,
        "Extracted {}",
        pdf.display()
    );

    match output {
        Some(path) => tokio::fs::write(path, result.text.as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", result.text),
    }
    Ok(())
}

async fn webhook(config: &ScribeConfig, action: WebhookAction) -> Result<()> {
    let client = TelegramClient::new(&config.telegram)?;

    match action {
        WebhookAction::Set { url, drop_pending } => {
            let Some(url) = url.or_else(|| config.telegram.webhook_url.clone()) else {
                bail!("No webhook URL given; pass --url or set WEBHOOK_URL");
            };
            if !url.starts_with("https://") {
                bail!("Webhook URL must use https://: {}", url);
            }
            client
                .set_webhook(
                    &url,
                    config.telegram.webhook_secret.as_deref(),
                    drop_pending || config.telegram.drop_pending_updates,
                )
                .await?;
            println!("Webhook set to {}", url);
        }
        WebhookAction::Delete { drop_pending } => {
            client.delete_webhook(drop_pending).await?;
            println!("Webhook deleted");
        }
        WebhookAction::Info => {
            let info = client.get_webhook_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }
    Ok(())
}
