//! docket CLI - render JSON data as PDF reports, workbooks, and archives

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docket_core::{DocketConfig, DocketError, logging};
use docket_docs::{Document, DocumentService};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "docket")]
#[command(version, about = "Render JSON data as PDF reports, workbooks, and archives", long_about = None)]
struct Cli {
    /// Config file (created with defaults if missing)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding Templates/ and ExportFile/
    #[arg(long, global = true)]
    content_root: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `docket_docs=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a JSON value to PDF through the external converter
    Pdf {
        /// JSON input file
        input: PathBuf,

        /// Output file
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Write the PDF as base64 text
        #[arg(long)]
        base64: bool,
    },

    /// Write the HTML that would be sent to the converter
    Html {
        input: PathBuf,

        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Render a JSON value to an xlsx workbook
    Xlsx {
        input: PathBuf,

        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Write the workbook as base64 text
        #[arg(long)]
        base64: bool,
    },

    /// Zip an export folder into <folder>.zip beside it
    Zip {
        /// Folder name under the export directory
        folder: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("docket: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let filter = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    if let Err(e) = logging::init_logging(&filter) {
        eprintln!("docket: {e:#}");
    }

    match run(cli.command, DocumentService::new(config)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<DocketError>() {
                Some(docket_err) => {
                    error!(category = ?docket_err.category(), "{e:#}");
                    eprintln!("docket: {}", docket_err.user_message());
                }
                None => {
                    error!("{e:#}");
                    eprintln!("docket: {e:#}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<DocketConfig> {
    let mut config = match &cli.config {
        Some(path) => DocketConfig::load_from_path(path)?,
        None => {
            let mut config = DocketConfig::default();
            config.apply_env_overrides();
            config
        }
    };
    if let Some(root) = &cli.content_root {
        config.content_root = root.clone();
    }
    Ok(config)
}

async fn run(command: Commands, service: DocumentService) -> Result<()> {
    match command {
        Commands::Pdf {
            input,
            output,
            base64,
        } => {
            let document = read_document(&input)?;
            let pdf = service
                .generate_pdf_from_document(&document, &Default::default())
                .await?;
            write_output(&output, pdf, base64)?;
        }
        Commands::Html { input, output } => {
            let document = read_document(&input)?;
            let html = service.render_document_html(&document).await?;
            std::fs::write(&output, html)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(path = %output.display(), "wrote HTML");
        }
        Commands::Xlsx {
            input,
            output,
            base64,
        } => {
            let document = read_document(&input)?;
            let bytes = service.generate_excel_from_document(&document).await?;
            write_output(&output, bytes, base64)?;
        }
        Commands::Zip { folder } => {
            let path = service.create_zip_file(&folder).await?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// Parse a JSON file; the file stem becomes the report's shape name.
fn read_document(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;
    let shape = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Data".into());
    Ok(Document::from_json(shape, value))
}

fn write_output(path: &Path, bytes: Vec<u8>, base64: bool) -> Result<()> {
    let bytes = if base64 {
        docket_docs::service::encode_base64(&bytes).into_bytes()
    } else {
        bytes
    };
    std::fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote output");
    Ok(())
}
