use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use modrinth_compat::compat::analyzer::CompatAnalyzer;
use modrinth_compat::config::AppConfig;
use modrinth_compat::logging::{LogFormat, init_logging};
use modrinth_compat::version::fetcher::SegmentedFetcher;
use modrinth_compat::version::modrinth::ModrinthCatalog;
use modrinth_compat::version::resolver::VersionResolver;
use modrinth_compat::version::store::SqliteVersionStore;

#[derive(Parser)]
#[command(name = "modrinth-compat")]
#[command(version, about = "Find loader and game versions supported by a set of Modrinth projects")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the compatibility matrix of the given projects as JSON
    Check(CheckArgs),
}

#[derive(Args)]
struct CheckArgs {
    /// Project ids, slugs or URLs; read from stdin when omitted
    ids: Vec<String>,

    /// File with one project id, slug or URL per line
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite version cache
    #[arg(long)]
    db: Option<PathBuf>,

    /// Number of projects allowed to miss a game version
    #[arg(long)]
    acceptable_fail: Option<usize>,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl CheckArgs {
    fn read_input(&self) -> anyhow::Result<String> {
        let mut input = self.ids.join("\n");

        if let Some(file) = &self.file {
            let content = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            input.push('\n');
            input.push_str(&content);
        }

        if self.ids.is_empty() && self.file.is_none() {
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
        }

        Ok(input)
    }

    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => AppConfig::default(),
        };

        if let Some(db) = &self.db {
            config.cache.db_path = Some(db.clone());
        }
        if let Some(acceptable_fail) = self.acceptable_fail {
            config.compat.acceptable_fail_count = acceptable_fail;
        }

        Ok(config)
    }
}

async fn run_check(args: CheckArgs) -> anyhow::Result<()> {
    let config = args.load_config()?;
    let input = args.read_input()?;

    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    info!("Using version cache at {}", db_path.display());
    let store = SqliteVersionStore::new(&db_path)?;

    let catalog = ModrinthCatalog::with_timeouts(
        &config.catalog.base_url,
        Duration::from_millis(config.catalog.connect_timeout),
        Duration::from_millis(config.catalog.request_timeout),
    );
    let fetcher = SegmentedFetcher::new(Arc::new(catalog), &config.catalog);
    let resolver = VersionResolver::new(Arc::new(store), Arc::new(fetcher));
    let analyzer = CompatAnalyzer::new(resolver, config.compat.acceptable_fail_count);

    let report = analyzer.analyze(&input).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Check(args) => {
            let _guard = init_logging(args.log_file.as_deref(), args.log_format)?;
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(run_check(args))
        }
    }
}
