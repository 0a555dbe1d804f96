//! Gigasheet CLI - import, share and export sheets from the command line.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gigasheet::{Client, WaitOptions, API_KEY_ENV};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{AppendArgs, UploadArgs};

/// Gigasheet - big data spreadsheets from the command line
#[derive(Parser, Debug)]
#[command(name = "gigasheet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// API key to use; falls back to $GIGASHEET_API_KEY, then the config file
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Config file (default: <config dir>/gigasheet/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a file (or reuse a sheet), then rename, describe and share it
    Upload(UploadArgs),

    /// Append a local file to an existing sheet
    Append(AppendArgs),

    /// Export a sheet and print its download link
    Export {
        /// Sheet handle to export
        #[arg(long)]
        handle: String,
        /// Directory to save the export into; omit to only print the link
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Print sheet metadata
    Info {
        /// Sheet handle
        #[arg(long)]
        handle: String,
    },

    /// Check API key and connectivity
    Check,

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("gigasheet={log_level},gigasheet_cli={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Version = cli.command {
        println!("gigasheet {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let client = build_client(&cli, std::env::var(API_KEY_ENV).ok())?;
    let wait = WaitOptions::default();

    match &cli.command {
        Commands::Upload(args) => {
            commands::upload(&client, args, &wait)?;
        }
        Commands::Append(args) => commands::append(&client, args, &wait)?,
        Commands::Export { handle, output_dir } => {
            commands::export(&client, handle, output_dir.as_deref(), &wait)?;
        }
        Commands::Info { handle } => commands::info(&client, handle)?,
        Commands::Check => commands::check(&client)?,
        Commands::Version => {}
    }

    Ok(())
}

/// Resolve the client configuration; `env_api_key` is the value of `$GIGASHEET_API_KEY`.
fn build_client(cli: &Cli, env_api_key: Option<String>) -> anyhow::Result<Client> {
    let file = config::load(cli.config.as_deref())?;
    let client_config = file.into_client_config(config::Overrides {
        api_key: cli.api_key.clone(),
        env_api_key,
        base_url: cli.base_url.clone(),
        timeout_secs: cli.timeout,
    });
    tracing::debug!(config = ?client_config, "resolved client configuration");

    Client::new(client_config).context("failed to create Gigasheet client")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload_and_share() {
        let cli = Cli::try_parse_from([
            "gigasheet",
            "upload",
            "--input-url",
            "https://bucket.example/file.csv",
            "--file-name",
            "data.csv",
            "--share-to",
            "a@example.com",
            "--share-to",
            "b@example.com",
            "--share-write",
            "--message",
            "hello",
        ])
        .unwrap();

        let Commands::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(
            args.input_url.as_deref(),
            Some("https://bucket.example/file.csv")
        );
        assert_eq!(args.file_name.as_deref(), Some("data.csv"));
        assert_eq!(args.share_to, vec!["a@example.com", "b@example.com"]);
        assert!(args.share_write);
        assert_eq!(args.message.as_deref(), Some("hello"));
    }

    #[test]
    fn test_upload_aliases() {
        let cli = Cli::try_parse_from([
            "gigasheet",
            "upload",
            "--input-handle",
            "h",
            "--name",
            "renamed",
            "--share-message",
            "hi",
        ])
        .unwrap();

        let Commands::Upload(args) = cli.command else {
            panic!("expected upload");
        };
        assert_eq!(args.file_name.as_deref(), Some("renamed"));
        assert_eq!(args.message.as_deref(), Some("hi"));
    }

    #[test]
    fn test_upload_requires_exactly_one_input() {
        assert!(Cli::try_parse_from(["gigasheet", "upload"]).is_err());
        assert!(Cli::try_parse_from([
            "gigasheet",
            "upload",
            "--input-url",
            "https://x.example/a.csv",
            "--input-handle",
            "h",
        ])
        .is_err());
    }

    #[test]
    fn test_append_upsert_requires_columns() {
        assert!(Cli::try_parse_from([
            "gigasheet",
            "append",
            "--handle",
            "h",
            "--input-file",
            "rows.csv",
            "--upsert",
        ])
        .is_err());

        let cli = Cli::try_parse_from([
            "gigasheet",
            "append",
            "--handle",
            "h",
            "--input-file",
            "rows.csv",
            "--deduplicate-by-col-names",
            "email",
            "--upsert",
        ])
        .unwrap();
        let Commands::Append(args) = cli.command else {
            panic!("expected append");
        };
        assert_eq!(args.dedupe_columns, vec!["email"]);
        assert!(args.upsert);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["gigasheet", "check", "--api-key", "k", "-vv"]).unwrap();
        assert_eq!(cli.api_key.as_deref(), Some("k"));
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Check));
    }

    #[test]
    fn test_missing_key_fails_client_construction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"http://127.0.0.1:1\"\n").unwrap();

        let cli = Cli::try_parse_from([
            "gigasheet",
            "check",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();

        let err = build_client(&cli, None).unwrap_err();
        assert!(format!("{err:#}").contains(API_KEY_ENV));

        // The environment key fills the gap left by the file
        assert!(build_client(&cli, Some("env-key".to_string())).is_ok());
    }
}
