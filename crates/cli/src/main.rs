//! `narrator` -- inspect and maintain the presentation library from a shell.
//!
//! Reads the same storage layout as an interactive host: `settings.json`
//! and the `library/` document store under the configured storage dir.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use narrator_common::NarratorConfig;
use narrator_project::{JsonDirStore, PersistenceAdapter};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "narrator")]
#[command(about = "Manage narrated presentations")]
#[command(version)]
struct Cli {
    /// Engine config file (TOML)
    #[arg(short, long, env = "NARRATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory, overriding the config file
    #[arg(short, long, env = "NARRATOR_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// List saved presentations, newest first
    List,
    /// Print the outline of a saved presentation
    Show { id: String },
    /// Write a saved presentation as a .narrator file
    Export {
        id: String,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Validate a .narrator file and add it to the library
    Import { file: PathBuf },
    /// Check a .narrator file without importing it
    Validate { file: PathBuf },
    /// Remove a saved presentation
    Delete { id: String },
    /// Build slides from a plain-text notes file with the offline generator
    Generate {
        notes: PathBuf,
        /// Save the result to the library under this name
        #[arg(long)]
        save: Option<String>,
    },
    /// Import the legacy single-document library
    Migrate {
        /// Legacy document, defaults to `legacy_document` from the config
        #[arg(long)]
        legacy: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,narrator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), cli.data_dir)?;
    debug!(storage = %config.storage_dir.display(), "Using storage directory");

    let mut out = std::io::stdout().lock();
    match cli.command {
        Command::List => commands::list(&open_library(&config).await?, &mut out).await,
        Command::Show { id } => commands::show(&open_library(&config).await?, &id, &mut out).await,
        Command::Export { id, out: dir } => {
            let library = open_library(&config).await?;
            commands::export(&library, &id, &dir, &mut out).await.map(drop)
        }
        Command::Import { file } => {
            let library = open_library(&config).await?;
            commands::import(&library, &file, &mut out).await.map(drop)
        }
        Command::Validate { file } => commands::validate(&file, &mut out).await,
        Command::Delete { id } => {
            commands::delete(&open_library(&config).await?, &id, &mut out).await
        }
        Command::Generate { notes, save } => {
            let store = open_store(&config).await?;
            commands::generate(&config, store, &notes, save.as_deref(), &mut out)
                .await
                .map(drop)
        }
        Command::Migrate { legacy } => {
            let legacy = legacy
                .or_else(|| config.legacy_document.clone())
                .context("No legacy document given; pass --legacy or set legacy_document")?;
            commands::migrate(&open_store(&config).await?, &legacy, &mut out).await
        }
    }
}

fn resolve_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<NarratorConfig> {
    let config = match path {
        Some(path) => NarratorConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => NarratorConfig::default(),
    };
    Ok(match data_dir {
        Some(dir) => config.with_storage_dir(dir),
        None => config,
    })
}

async fn open_store(config: &NarratorConfig) -> Result<JsonDirStore> {
    let dir = config.library_dir();
    JsonDirStore::open(&dir)
        .await
        .with_context(|| format!("Failed to open library at {}", dir.display()))
}

async fn open_library(config: &NarratorConfig) -> Result<PersistenceAdapter<JsonDirStore>> {
    Ok(PersistenceAdapter::new(open_store(config).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_options_and_subcommand() {
        let cli = Cli::try_parse_from([
            "narrator",
            "--data-dir",
            "/tmp/narrator",
            "export",
            "pres_1",
            "--out",
            "exports",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/narrator")));
        assert_eq!(
            cli.command,
            Command::Export {
                id: "pres_1".into(),
                out: PathBuf::from("exports"),
            }
        );
    }

    #[test]
    fn export_defaults_to_current_dir() {
        let cli = Cli::try_parse_from(["narrator", "export", "pres_1"]).unwrap();
        assert!(matches!(cli.command, Command::Export { out, .. } if out == Path::new(".")));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["narrator"]).is_err());
    }

    #[test]
    fn data_dir_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("narrator.toml");
        std::fs::write(&path, "storage_dir = \"/srv/narrator\"\nhistory_limit = 10\n").unwrap();

        let config = resolve_config(Some(&path), None).unwrap();
        assert_eq!(config.storage_dir, PathBuf::from("/srv/narrator"));

        let config = resolve_config(Some(&path), Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.storage_dir, dir.path());
        assert_eq!(config.history_limit, 10);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = resolve_config(Some(Path::new("/nonexistent/narrator.toml")), None).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }
}
