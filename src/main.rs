//! # repodoc CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `repodoc generate <url>` | Document a GitHub repository |
//! | `repodoc generate --path <dir> --owner <o> --repo <r>` | Document a local checkout |
//! | `repodoc serve` | Start the HTTP server |
//!
//! Progress is logged to stderr (`RUST_LOG` controls verbosity) so stdout
//! carries only the requested output.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use repodoc::config::load_config;
use repodoc::server::run_server;
use repodoc::service::{new_meta, DocService, GenerateResponse};

/// repodoc: grounded, schema-validated documentation for source repositories.
#[derive(Parser)]
#[command(
    name = "repodoc",
    about = "Generate grounded, schema-validated documentation for a source repository",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults apply when it does not exist.
    #[arg(long, global = true, default_value = "./config/repodoc.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate documentation for a GitHub URL or a local directory.
    Generate {
        /// GitHub repository URL, e.g. `https://github.com/owner/repo/tree/main`.
        url: Option<String>,

        /// Document a local checkout instead of downloading.
        #[arg(long, conflicts_with = "url")]
        path: Option<PathBuf>,

        /// Owner recorded in metadata for `--path` runs.
        #[arg(long, default_value = "local")]
        owner: String,

        /// Repository name for `--path` runs (defaults to the directory name).
        #[arg(long)]
        repo: Option<String>,

        /// Ref recorded in metadata for `--path` runs.
        #[arg(long = "ref", default_value = "HEAD")]
        git_ref: String,

        /// What to print.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Write output to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Start the HTTP server.
    Serve,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// The full response envelope: doc_pack, readme_markdown, readme_html, meta.
    Json,
    Markdown,
    Html,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Generate {
            url,
            path,
            owner,
            repo,
            git_ref,
            format,
            out,
        } => {
            let service = DocService::new(config)?;
            let response = match (url, path) {
                (Some(url), None) => service.generate_from_url(&url).await?,
                (None, Some(path)) => {
                    let repo = match repo {
                        Some(r) => r,
                        None => dir_name(&path)?,
                    };
                    let meta = new_meta(&owner, &repo, &git_ref, None);
                    service.generate_from_dir(&path, meta).await?
                }
                _ => bail!("Provide a GitHub URL or --path <dir>"),
            };
            emit(&response, format, out.as_deref())?;
        }
        Commands::Serve => {
            run_server(config).await?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn dir_name(path: &std::path::Path) -> Result<String> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    Ok(canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repo".to_string()))
}

fn emit(response: &GenerateResponse, format: OutputFormat, out: Option<&std::path::Path>) -> Result<()> {
    let text = match format {
        OutputFormat::Json => serde_json::to_string_pretty(response)?,
        OutputFormat::Markdown => response.readme_markdown.clone(),
        OutputFormat::Html => response.readme_html.clone(),
    };

    match out {
        Some(path) => {
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => println!("{}", text),
    }
    Ok(())
}
