use anyhow::{Context, Result};
use clap::Parser;
use pezzottify_playlist_loader::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_DATA_DIR, DEFAULT_DB_PATH, DEFAULT_EXTENSION,
};
use pezzottify_playlist_loader::playlist_store::{AssociationPolicy, DEFAULT_BATCH_SIZE};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    match path_buf.canonicalize() {
        Ok(path) => Ok(path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(path_buf),
        Err(e) => Err(e).with_context(|| format!("Error resolving path: {}", s)),
    }
}

#[derive(Parser, Debug)]
#[command(name = "playlist-loader")]
#[command(about = "Load playlist export files into a SQLite database")]
struct CliArgs {
    /// Directory holding the export files. Only its direct entries are read.
    #[clap(long, value_parser = parse_path, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Path to the SQLite database file, created if missing.
    #[clap(long, value_parser = parse_path, default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// Extension of the files to load.
    #[clap(long, default_value = DEFAULT_EXTENSION)]
    pub extension: String,

    /// Number of parser threads. Defaults to the available parallelism.
    #[clap(long)]
    pub workers: Option<usize>,

    /// Rows per insert statement.
    #[clap(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// What to do with a playlist track that is already stored.
    #[clap(long, value_enum, default_value_t = AssociationPolicy::Ignore)]
    pub association_policy: AssociationPolicy,

    /// Show a progress bar while parsing.
    #[clap(long)]
    pub progress: bool,

    /// Parse and aggregate without touching the database.
    #[clap(long)]
    pub dry_run: bool,

    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            data_dir: self.data_dir.clone(),
            db_path: self.db_path.clone(),
            extension: self.extension.clone(),
            workers: self.workers,
            batch_size: self.batch_size,
            association_policy: self.association_policy,
            progress: self.progress,
            dry_run: self.dry_run,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialise logging")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    info!("Data directory: {}", config.data_dir.display());
    info!("Database: {}", config.db_path.display());

    let report = pezzottify_playlist_loader::run(&config)?;

    if report.dry_run {
        println!(
            "Dry run parsed {} files in {:.2}s",
            report.files,
            report.elapsed.as_secs_f64()
        );
    } else {
        println!(
            "Loaded {} files into {} in {:.2}s",
            report.files,
            config.db_path.display(),
            report.elapsed.as_secs_f64()
        );
    }
    Ok(())
}
