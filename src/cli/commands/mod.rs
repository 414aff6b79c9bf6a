//! CLI parser and dispatch.

mod extract;
mod init;
mod run;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::config::Settings;
use crate::models::DataSource;

#[derive(Parser)]
#[command(name = "minefile")]
#[command(about = "Mining technical-report discovery and metric extraction")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./minefile.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    Init,

    /// Discover filings, extract their metrics and persist accepted projects
    Run(RunArgs),

    /// Extract and score a single document without persisting it
    Extract {
        /// Local file or URL
        location: String,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Maximum number of filings to process
    #[arg(short, long)]
    pub limit: Option<usize>,
    /// Ticker symbol for the filings API (repeatable)
    #[arg(long = "symbol")]
    pub symbols: Vec<String>,
    /// Company CIK for the submissions scan (repeatable)
    #[arg(long = "company")]
    pub companies: Vec<u64>,
    /// Earliest filing date (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,
    /// Latest filing date (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,
    /// Registry to query: edgar-search, edgar-company or filings-api (repeatable)
    #[arg(long = "source", value_parser = parse_source)]
    pub sources: Vec<DataSource>,
    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Fold command-line filters into the loaded settings.
    pub(crate) fn apply(&self, settings: &mut Settings) {
        if self.limit.is_some() {
            settings.pipeline.limit = self.limit;
        }
        if !self.symbols.is_empty() {
            settings.discovery.symbols = self.symbols.clone();
        }
        if !self.companies.is_empty() {
            settings.discovery.companies = self.companies.clone();
        }
        if self.from.is_some() {
            settings.discovery.date_from = self.from;
        }
        if self.to.is_some() {
            settings.discovery.date_to = self.to;
        }
        if !self.sources.is_empty() {
            settings.discovery.sources = self.sources.clone();
        } else if !self.symbols.is_empty() || !self.companies.is_empty() {
            // Naming symbols or companies implies the registry that takes them.
            let mut sources = Vec::new();
            if !self.companies.is_empty() {
                sources.push(DataSource::EdgarCompany);
            }
            if !self.symbols.is_empty() {
                sources.push(DataSource::FilingsApi);
            }
            settings.discovery.sources = sources;
        }
    }
}

fn parse_source(raw: &str) -> Result<DataSource, String> {
    match DataSource::from_str(raw) {
        Some(DataSource::Manual) | None => Err(format!(
            "unknown source '{}' (expected edgar-search, edgar-company or filings-api)",
            raw
        )),
        Some(source) => Ok(source),
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Run(args) => run::cmd_run(settings, &args).await,
        Commands::Extract { location, json } => {
            extract::cmd_extract(&settings, &location, json).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::try_parse_from([
            "minefile",
            "run",
            "--limit",
            "20",
            "--symbol",
            "LAC",
            "--symbol",
            "PLL",
            "--from",
            "2023-01-01",
            "--source",
            "filings-api",
            "--json",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.limit, Some(20));
        assert_eq!(args.symbols, vec!["LAC", "PLL"]);
        assert_eq!(args.from, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(args.sources, vec![DataSource::FilingsApi]);
        assert!(args.json);
    }

    #[test]
    fn test_manual_is_not_a_source() {
        assert!(Cli::try_parse_from(["minefile", "run", "--source", "manual"]).is_err());
        assert!(Cli::try_parse_from(["minefile", "run", "--source", "nope"]).is_err());
    }

    #[test]
    fn test_filters_imply_sources() {
        let mut settings = Settings::default();
        RunArgs {
            companies: vec![1_234_567],
            ..RunArgs::default()
        }
        .apply(&mut settings);
        assert_eq!(settings.discovery.sources, vec![DataSource::EdgarCompany]);
        assert_eq!(settings.discovery.companies, vec![1_234_567]);

        let mut settings = Settings::default();
        RunArgs {
            limit: Some(3),
            ..RunArgs::default()
        }
        .apply(&mut settings);
        assert_eq!(settings.discovery.sources, vec![DataSource::EdgarSearch]);
        assert_eq!(settings.pipeline.limit, Some(3));
    }
}
