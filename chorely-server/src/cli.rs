use clap::{Parser, Subcommand};
use std::path::PathBuf;

const HELP_EPILOG: &str = r#"Server options can also be provided via environment variables:
  CONFIG_PATH (default: ./config.yaml)
  DB_PATH     (default: data/app.db)
  PORT        (default: 5151 or config.listen_port)

Flags take precedence over environment variables.
The `gen-config` command writes a starter config with a random JWT secret.
"#;

#[derive(Debug, Parser)]
#[command(
    name = "chorely-server",
    version,
    about = "Chorely household chores and rewards server",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Path to the SQLite database file
    #[arg(long)]
    pub db_path: Option<PathBuf>,
    /// TCP port to listen on
    #[arg(long)]
    pub port: Option<u16>,
    /// Optional subcommand. Without one, runs the server.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a default config with a freshly generated JWT secret
    GenConfig {
        /// Destination path (defaults to --config, $CONFIG_PATH or ./config.yaml)
        path: Option<PathBuf>,
        /// Overwrite the file if it already exists
        #[arg(long)]
        force: bool,
    },
}
