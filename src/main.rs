//! Command line front end: reads an export request as JSON and writes the PDF.
//!
//! ```text
//! eicr-pdf certificate request.json -o out/
//! eicr-pdf observations request.json --config eicr.toml
//! ```

use clap::{Parser, Subcommand};
use eicr_pdf::config::ExportConfig;
use eicr_pdf::{CertificateRequest, Exporter, ObservationsRequest};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "eicr-pdf", version)]
#[command(about = "Render EICR certificates and observation reports to PDF")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration (fonts, layout, watermark, photo store)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory the PDF is written to
    #[arg(short, long, global = true, default_value = ".")]
    output: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the full certificate from `{formData, options}`
    Certificate {
        /// JSON request file
        request: PathBuf,
    },
    /// Render the observations-only report from `{formData, observations, options}`
    Observations {
        /// JSON request file
        request: PathBuf,
    },
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> eicr_pdf::Result<T> {
    let source = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&source)?)
}

/// `RUST_LOG` when it's set, `info` otherwise; `--verbose` raises everything to debug
fn env_filter(rust_log: Option<&str>, verbose: bool) -> EnvFilter {
    let filter = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    if verbose {
        filter.add_directive(Level::DEBUG.into())
    } else {
        filter
    }
}

#[tokio::main]
async fn main() -> eicr_pdf::Result<()> {
    let args = Args::parse();

    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::registry()
        .with(env_filter(rust_log.as_deref(), args.verbose))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match &args.config {
        Some(path) => ExportConfig::load(path).await?,
        None => ExportConfig::default(),
    }
    .with_env_overrides();
    let exporter = Exporter::from_config(config)?;

    let exported = match &args.command {
        Command::Certificate { request } => {
            let request: CertificateRequest = read_json(request).await?;
            exporter
                .export_certificate(request.form_data, &request.options)
                .await?
        }
        Command::Observations { request } => {
            let request: ObservationsRequest = read_json(request).await?;
            exporter
                .export_observations(&request.form_data, &request.observations, &request.options)
                .await?
        }
    };

    let path = exported.save_to(&args.output).await?;
    info!(
        path = %path.display(),
        pages = exported.page_count,
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;

    #[test]
    fn rust_log_sets_the_level() {
        assert_eq!(
            env_filter(Some("warn"), false).max_level_hint(),
            Some(LevelFilter::WARN)
        );
        assert_eq!(
            env_filter(None, false).max_level_hint(),
            Some(LevelFilter::INFO)
        );
        assert_eq!(
            env_filter(Some("  "), false).max_level_hint(),
            Some(LevelFilter::INFO)
        );
        assert_eq!(
            env_filter(Some("warn"), true).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }
}
