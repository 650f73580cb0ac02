use chorely_shared::api::rest::RestError;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod commands;
pub mod config;
pub mod session;

pub use cli::{Cli, Command};
pub use config::{CliConfig, load_config, resolve_config_path};
use session::{Registration, Session};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("server said {status}: {message}")]
    Api { status: u16, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not logged in; run `chorely login` first")]
    NotLoggedIn,
    #[error("session expired; run `chorely login` again")]
    SessionExpired,
}

impl From<RestError> for CliError {
    fn from(e: RestError) -> Self {
        match e {
            RestError::Status { status, body } => {
                // Server errors carry `{"error": "..."}`
                let message = serde_json::from_str::<serde_json::Value>(&body)
                    .ok()
                    .and_then(|v| v.get("error").and_then(|m| m.as_str()).map(str::to_string))
                    .unwrap_or(body);
                if status == 401 {
                    return CliError::SessionExpired;
                }
                CliError::Api { status, message }
            }
            other => CliError::Http(other.to_string()),
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    init_tracing();
    let cfg_path = resolve_config_path(cli.config)?;
    tracing::debug!(path = %cfg_path.display(), "using config");

    match cli.command {
        Command::Register {
            server,
            email,
            name,
            role,
            family_name,
            invite_code,
        } => {
            let reg = Registration {
                server,
                email,
                name,
                role: role.into(),
                family_name,
                invite_code,
            };
            session::register(reg, &cfg_path).await
        }
        Command::Login { server, email } => session::login(server, email, &cfg_path).await,
        Command::Logout => session::logout(&cfg_path).await,
        Command::Whoami => commands::whoami(&Session::load(&cfg_path)?).await,
        Command::Chores(cmd) => commands::chores(&Session::load(&cfg_path)?, cmd).await,
        Command::Rewards(cmd) => commands::rewards(&Session::load(&cfg_path)?, cmd).await,
        Command::Members => commands::members(&Session::load(&cfg_path)?).await,
        Command::Points(cmd) => commands::points(&Session::load(&cfg_path)?, cmd).await,
        Command::Dashboard => commands::dashboard(&Session::load(&cfg_path)?).await,
    }
}
