//! Command-line tool for uploading documents to the RAG assistant.
//!
//! Every file is validated against the upload policy first; files that pass
//! are sent to the backend one at a time.
//!
//! # Usage
//!
//! ```bash
//! # Upload two documents
//! shapeshifter-upload report.pdf notes.txt
//!
//! # Machine-readable results
//! shapeshifter-upload --format json *.pdf
//!
//! # Allow larger files for one run
//! shapeshifter-upload --max-file-size-mb 50 handbook.pdf
//! ```
//!
//! The exit status is 1 if any file failed validation or transfer.

use std::path::PathBuf;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use tracing_subscriber::EnvFilter;

use shapeshifter::chat::{ChatArgs, ChatConfig};
use shapeshifter::render::format_upload;
use shapeshifter::{PlainTextRenderer, RagClient, UploadBatcher, UploadQueue, UploadedFile};

/// Output format for displaying upload results.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum OutputFormat {
    /// Plain text format (default) - one line per file with live progress.
    #[default]
    Text,
    /// JSON format - structured output suitable for parsing.
    Json,
    /// YAML format - structured output in YAML format.
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    /// Accepts "text", "json", "yaml", or "yml" (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            _ => Err(format!(
                "Invalid output format: {}. Valid options: text, json, yaml",
                s
            )),
        }
    }
}

/// Command-line arguments for the shapeshifter-upload tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
struct Args {
    /// Output format for results (text, json, yaml).
    #[arrrg(optional, "Output format: text, json, yaml", "FORMAT")]
    format: Option<String>,

    /// Backend base URL.
    #[arrrg(optional, "Backend URL (default: http://localhost:8001)", "URL")]
    api_url: Option<String>,

    /// Session id sent with every upload.
    #[arrrg(optional, "Backend session id (default: default)", "ID")]
    session_id: Option<String>,

    /// Upload size limit.
    #[arrrg(optional, "Largest accepted upload in MB (default: 10)", "MB")]
    max_file_size_mb: Option<u64>,

    /// Comma-separated accepted extensions.
    #[arrrg(optional, "Accepted extensions, comma separated", "TYPES")]
    accepted_types: Option<String>,

    /// Request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: 60)", "SECS")]
    timeout_secs: Option<u64>,

    /// YAML configuration file.
    #[arrrg(optional, "YAML configuration file", "FILE")]
    config: Option<String>,
}

impl From<Args> for ChatArgs {
    fn from(args: Args) -> Self {
        ChatArgs {
            api_url: args.api_url,
            session_id: args.session_id,
            max_file_size_mb: args.max_file_size_mb,
            accepted_types: args.accepted_types,
            timeout_secs: args.timeout_secs,
            config: args.config,
            ..ChatArgs::default()
        }
    }
}

/// Main entry point for the shapeshifter-upload command-line tool.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let (args, files) = Args::from_command_line_relaxed("shapeshifter-upload [OPTIONS] <FILES>...");

    if files.is_empty() {
        eprintln!("Error: Must specify at least one file to upload");
        std::process::exit(1);
    }

    let output_format = if let Some(format_str) = &args.format {
        format_str
            .parse()
            .map_err(|e| format!("Invalid format: {}", e))?
    } else {
        OutputFormat::Text
    };
    let config = ChatConfig::resolve(ChatArgs::from(args))?;
    let client = RagClient::with_options(Some(config.api_url.clone()), Some(config.timeout))?;
    let batcher = UploadBatcher::new(config.upload_policy.clone(), config.session_id.clone());
    let paths: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
    let mut queue = UploadQueue::new();

    let outcome = match output_format {
        OutputFormat::Text => {
            println!("{}", batcher.policy().describe());
            let mut renderer = PlainTextRenderer::with_color(false);
            batcher.run(&client, &mut queue, &paths, &mut renderer).await
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            batcher.run(&client, &mut queue, &paths, &mut ()).await
        }
    };

    let results: Vec<&UploadedFile> = queue.files().iter().collect();
    match output_format {
        OutputFormat::Text => {
            if !outcome.all_succeeded() {
                println!();
                println!("Failed uploads:");
                for file in &outcome.failed {
                    println!("  {}", format_upload(file, false));
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&results)?);
        }
    }

    if !outcome.all_succeeded() {
        std::process::exit(1);
    }

    Ok(())
}
