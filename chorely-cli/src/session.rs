use std::io::{self, Write};
use std::path::Path;

use chorely_shared::api::{self, rest};
use chorely_shared::auth::Role;
use chorely_shared::jwt::{self, JwtClaims};
use tracing::{debug, warn};

use crate::CliError;
use crate::config::{
    CliConfig, load_config, normalize_server_url, read_token, remove_token, save_config,
    token_path, write_token,
};

/// A stored login: where the server is and who we are on it.
#[derive(Debug, Clone)]
pub struct Session {
    pub server_url: String,
    pub token: String,
    pub claims: JwtClaims,
}

impl Session {
    pub fn load(config_path: &Path) -> Result<Self, CliError> {
        let cfg = load_config(config_path).map_err(|_| CliError::NotLoggedIn)?;
        let token = read_token(&token_path(config_path))?.ok_or(CliError::NotLoggedIn)?;
        let claims = jwt::decode_unverified(&token)
            .map_err(|e| CliError::Config(format!("stored token is invalid: {e}")))?;
        if claims.exp <= chrono::Utc::now().timestamp() {
            return Err(CliError::SessionExpired);
        }
        Ok(Self {
            server_url: cfg.server_url,
            token,
            claims,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.claims.sub
    }

    pub fn family_id(&self) -> &str {
        &self.claims.family_id
    }

    pub fn is_parent(&self) -> bool {
        self.claims.role == Role::Parent
    }
}

/// Server URL: CLI arg > config if present > prompt.
fn resolve_server(server_arg: Option<String>, config_path: &Path) -> Result<String, CliError> {
    if let Some(s) = server_arg {
        return Ok(normalize_server_url(&s));
    }
    if let Ok(cfg) = load_config(config_path) {
        return Ok(normalize_server_url(&cfg.server_url));
    }
    Ok(normalize_server_url(&prompt(
        "Server URL (e.g., 127.0.0.1:5151): ",
    )?))
}

fn prompt(msg: &str) -> Result<String, CliError> {
    print!("{}", msg);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf)?;
    Ok(buf.trim().to_string())
}

fn prompt_password(msg: &str) -> Result<String, CliError> {
    rpassword::prompt_password(msg).map_err(CliError::Io)
}

fn or_prompt(value: Option<String>, msg: &str) -> Result<String, CliError> {
    match value {
        Some(v) => Ok(v),
        None => prompt(msg),
    }
}

async fn sign_in(
    server_url: &str,
    email: String,
    password: String,
    config_path: &Path,
) -> Result<(), CliError> {
    let resp = rest::login(server_url, &api::AuthReq { email, password })
        .await
        .map_err(|e| match e {
            rest::RestError::Status { status: 401, .. } => CliError::Api {
                status: 401,
                message: "Invalid email or password".into(),
            },
            other => other.into(),
        })?;
    save_config(
        config_path,
        &CliConfig {
            server_url: server_url.to_string(),
        },
    )?;
    write_token(&token_path(config_path), &resp.token)?;
    debug!(path = %config_path.display(), "stored session");

    let me = rest::me(server_url, &resp.token).await?;
    println!(
        "Logged in as {} ({}) in family {}",
        me.name, me.role, me.family.name
    );
    Ok(())
}

pub struct Registration {
    pub server: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Role,
    pub family_name: Option<String>,
    pub invite_code: Option<String>,
}

pub async fn register(reg: Registration, config_path: &Path) -> Result<(), CliError> {
    let server_url = resolve_server(reg.server, config_path)?;
    let email = or_prompt(reg.email, "Email: ")?;
    let name = or_prompt(reg.name, "Name: ")?;
    let (family_name, invite_code) = match reg.role {
        Role::Parent => (Some(or_prompt(reg.family_name, "Family name: ")?), None),
        Role::Child => (None, Some(or_prompt(reg.invite_code, "Invite code: ")?)),
    };
    let password = prompt_password("Password: ")?;
    if prompt_password("Repeat password: ")? != password {
        return Err(CliError::Config("passwords do not match".into()));
    }

    let resp = rest::register(
        &server_url,
        &api::RegisterReq {
            email: email.clone(),
            password: password.clone(),
            name,
            role: reg.role,
            family_name,
            invite_code,
        },
    )
    .await?;
    println!("Registered {} <{}>", resp.user.name, resp.user.email);
    sign_in(&server_url, email, password, config_path).await
}

pub async fn login(
    server_arg: Option<String>,
    email_arg: Option<String>,
    config_path: &Path,
) -> Result<(), CliError> {
    let server_url = resolve_server(server_arg, config_path)?;
    let email = or_prompt(email_arg, "Email: ")?;
    let password = prompt_password("Password: ")?;
    sign_in(&server_url, email, password, config_path).await
}

/// Revokes the server session when possible; the local token is removed either way.
pub async fn logout(config_path: &Path) -> Result<(), CliError> {
    let token_file = token_path(config_path);
    match Session::load(config_path) {
        Ok(session) => match rest::logout(&session.server_url, &session.token).await {
            Ok(()) => {}
            Err(rest::RestError::Status { status: 401, .. }) => {
                debug!("session already revoked on server");
            }
            Err(e) => warn!(error = %e, "server logout failed; removing local token anyway"),
        },
        Err(CliError::NotLoggedIn) => {
            println!("Not logged in");
            return Ok(());
        }
        Err(e) => debug!(error = %e, "discarding unusable session"),
    }
    remove_token(&token_file)?;
    println!("Logged out");
    Ok(())
}
