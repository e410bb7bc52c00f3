use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dissatisfied::store::{PersistenceMode, SettingValue, StorageKey};
use dissatisfied::{
    classify_site, sim, util, Config, Database, ExtensionContext, SettingsStore, Site,
    SqliteStorageArea,
};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;

/// dissatisfied - focus-mode state engine for YouTube and Twitter/X
#[derive(Parser)]
#[command(name = "dissatisfied")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory (default: ~/.dissatisfied)
    #[arg(long, value_name = "PATH", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print which supported site a URL belongs to
    Classify { url: String },

    /// Inspect or edit the persisted settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Run a two-tab toggle scenario in memory and print the outcome
    Simulate {
        #[arg(long, value_enum, default_value_t = SiteArg::Youtube)]
        site: SiteArg,

        #[arg(long, value_enum, default_value_t = ModeArg::Tab)]
        mode: ModeArg,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print every setting with defaults filled in
    Show,
    /// Store a JSON value under a key (clamped and normalised first)
    Set { key: String, value: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum SiteArg {
    Youtube,
    Twitter,
}

impl From<SiteArg> for Site {
    fn from(arg: SiteArg) -> Self {
        match arg {
            SiteArg::Youtube => Site::YouTube,
            SiteArg::Twitter => Site::Twitter,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Tab,
    Global,
}

impl From<ModeArg> for PersistenceMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Tab => PersistenceMode::Tab,
            ModeArg::Global => PersistenceMode::Global,
        }
    }
}

fn init_logging() -> Result<()> {
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false) // Disable ANSI colors in log file
        .init();
    Ok(())
}

fn open_store() -> Result<SettingsStore> {
    let db = Database::open_default().context("Failed to open settings database")?;
    let area = SqliteStorageArea::new(db);
    Ok(SettingsStore::new(Arc::new(area), ExtensionContext::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    util::init_data_dir(cli.data_dir);
    init_logging()?;

    match cli.command {
        Commands::Classify { url } => {
            match classify_site(&url) {
                Some(site) => println!("{}", site),
                None => println!("none"),
            }
            Ok(())
        }
        Commands::Settings { action } => {
            let store = open_store()?;
            match action {
                SettingsAction::Show => {
                    for value in store.snapshot().await? {
                        println!("{} = {}", value.key(), value.to_json());
                    }
                }
                SettingsAction::Set { key, value } => {
                    let key = StorageKey::parse(&key)
                        .ok_or_else(|| anyhow!("Unknown setting: {}", key))?;
                    let raw: serde_json::Value = serde_json::from_str(&value)
                        .with_context(|| format!("Invalid JSON value: {}", value))?;
                    let setting = SettingValue::try_decode(key, &raw)
                        .ok_or_else(|| anyhow!("Invalid value for {}: {}", key, value))?;
                    store.set_value(&setting).await?;
                    println!("{} = {}", key, store.get_value(key).await?.to_json());
                }
            }
            Ok(())
        }
        Commands::Simulate { site, mode } => {
            let report = sim::run_scenario(site.into(), mode.into(), Config::load()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
