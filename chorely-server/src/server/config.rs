use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Default bcrypt work factor for stored password hashes.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub jwt_secret: String,
    #[serde(default)]
    pub dev_cors_origin: Option<String>,
    #[serde(default)]
    pub listen_port: Option<u16>,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_bcrypt_cost() -> u32 {
    DEFAULT_BCRYPT_COST
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Fresh config with the given secret and defaults elsewhere.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            dev_cors_origin: None,
            listen_port: None,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&path)?;
        let cfg: AppConfig = serde_yaml::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let text = serde_yaml::to_string(self)?;
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().len() < 16 {
            return Err(ConfigError::Invalid(
                "jwt_secret must be at least 16 characters".into(),
            ));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Invalid(
                "bcrypt_cost must be between 4 and 31".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_minimal_yaml() {
        let cfg: AppConfig =
            serde_yaml::from_str("jwt_secret: 0123456789abcdef0123\n").unwrap();
        assert_eq!(cfg.bcrypt_cost, DEFAULT_BCRYPT_COST);
        assert!(cfg.listen_port.is_none());
        assert!(cfg.dev_cors_origin.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn short_secret_is_rejected() {
        let cfg = AppConfig::with_secret("short");
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut cfg = AppConfig::with_secret("a-very-long-secret-value");
        cfg.listen_port = Some(8080);
        cfg.save_to_path(&path).unwrap();
        let loaded = AppConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.listen_port, Some(8080));
        assert_eq!(loaded.jwt_secret, "a-very-long-secret-value");
    }
}
