use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::CliError;

pub const ENV_CONFIG: &str = "CHORELY_CONFIG";
const TOKEN_FILE: &str = "token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    pub server_url: String,
}

pub fn resolve_config_path(cli_value: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(p) = cli_value {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG) {
        return Ok(PathBuf::from(p));
    }
    default_config_path().ok_or_else(|| CliError::Config("could not determine config dir".into()))
}

pub fn default_config_path() -> Option<PathBuf> {
    let pd = ProjectDirs::from("dev", "chorely", "chorely")?;
    Some(pd.config_dir().join("cli.yaml"))
}

pub fn load_config(path: &Path) -> Result<CliConfig, CliError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| CliError::Config(format!("read {} failed: {e}", path.display())))?;
    let cfg: CliConfig = serde_yaml::from_str(&data)
        .map_err(|e| CliError::Config(format!("parse {} failed: {e}", path.display())))?;
    Ok(cfg)
}

pub fn save_config(path: &Path, cfg: &CliConfig) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let data = serde_yaml::to_string(cfg)
        .map_err(|e| CliError::Config(format!("serialize config failed: {e}")))?;
    std::fs::write(path, data)
        .map_err(|e| CliError::Config(format!("write {} failed: {e}", path.display())))
}

/// The token lives next to the config it was issued for.
pub fn token_path(config_path: &Path) -> PathBuf {
    config_path.with_file_name(TOKEN_FILE)
}

pub fn read_token(path: &Path) -> Result<Option<String>, CliError> {
    match std::fs::read_to_string(path) {
        Ok(s) => {
            let token = s.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CliError::Io(e)),
    }
}

/// Writes the token readable by the owner only.
pub fn write_token(path: &Path, token: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut opts = std::fs::OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        opts.mode(0o600);
        // mode() only applies on creation
        if path.exists() {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }
    }
    let mut file = opts.open(path)?;
    file.write_all(token.as_bytes())?;
    Ok(())
}

/// Returns `false` when there was no token to remove.
pub fn remove_token(path: &Path) -> Result<bool, CliError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CliError::Io(e)),
    }
}

pub fn normalize_server_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", trimmed.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_url_gets_scheme_and_loses_trailing_slash() {
        assert_eq!(normalize_server_url("127.0.0.1:5151"), "http://127.0.0.1:5151");
        assert_eq!(
            normalize_server_url(" https://chores.example.com/ "),
            "https://chores.example.com"
        );
        assert_eq!(normalize_server_url("http://host//"), "http://host");
    }

    #[test]
    fn explicit_config_path_wins() {
        let p = PathBuf::from("/tmp/custom.yaml");
        assert_eq!(resolve_config_path(Some(p.clone())).unwrap(), p);
    }

    #[test]
    fn config_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cli.yaml");
        let cfg = CliConfig {
            server_url: "http://localhost:5151".into(),
        };
        save_config(&path, &cfg).unwrap();
        assert_eq!(load_config(&path).unwrap(), cfg);
        assert!(matches!(
            load_config(&dir.path().join("missing.yaml")),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn token_file_sits_next_to_config() {
        let p = token_path(Path::new("/home/kid/.config/chorely/cli.yaml"));
        assert_eq!(p, PathBuf::from("/home/kid/.config/chorely/token"));
    }

    #[test]
    fn token_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        assert_eq!(read_token(&path).unwrap(), None);

        write_token(&path, "abc.def.ghi").unwrap();
        assert_eq!(read_token(&path).unwrap().as_deref(), Some("abc.def.ghi"));
        write_token(&path, "short").unwrap();
        assert_eq!(read_token(&path).unwrap().as_deref(), Some("short"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        assert!(remove_token(&path).unwrap());
        assert!(!remove_token(&path).unwrap());
    }
}
