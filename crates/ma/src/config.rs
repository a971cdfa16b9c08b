use clap::Args;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DB_PATH: &str = ".mutual-aid/aid.db";
pub const DEFAULT_PORT: u16 = 4830;
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 1024;
pub const DEFAULT_PROFILE_CACHE_TTL_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },
    #[error("invalid config file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid bind address: {value}")]
    Bind { value: String },
    #[error("notification_capacity must be greater than zero")]
    Capacity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: String,
    pub bind: IpAddr,
    pub port: u16,
    pub log_json: bool,
    pub notification_capacity: usize,
    pub profile_cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            log_json: false,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            profile_cache_ttl_secs: DEFAULT_PROFILE_CACHE_TTL_SECS,
        }
    }
}

/// Shape of the optional TOML file; every field may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    db_path: Option<String>,
    bind: Option<String>,
    port: Option<u16>,
    log_json: Option<bool>,
    notification_capacity: Option<usize>,
    profile_cache_ttl_secs: Option<u64>,
}

/// Environment and command-line layer. Flags win over their env var.
#[derive(Debug, Default, Clone, Args)]
pub struct Overrides {
    #[arg(long, global = true, env = "MUTUAL_AID_DB_PATH")]
    pub db_path: Option<String>,
    #[arg(long, global = true, env = "MUTUAL_AID_BIND")]
    pub bind: Option<String>,
    #[arg(long, global = true, env = "MUTUAL_AID_PORT")]
    pub port: Option<u16>,
    #[arg(long, global = true, env = "MUTUAL_AID_LOG_JSON")]
    pub log_json: Option<bool>,
    #[arg(long, global = true)]
    pub notification_capacity: Option<usize>,
    #[arg(long, global = true, env = "MUTUAL_AID_PROFILE_CACHE_TTL_SECS")]
    pub profile_cache_ttl_secs: Option<u64>,
}

impl Config {
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = file {
            let display = path.display().to_string();
            let text = std::fs::read_to_string(path).map_err(|err| ConfigError::Read {
                path: display.clone(),
                message: err.to_string(),
            })?;
            config.apply_toml(&display, &text)?;
        }
        config.apply_overrides(overrides)?;
        if config.notification_capacity == 0 {
            return Err(ConfigError::Capacity);
        }
        Ok(config)
    }

    fn apply_toml(&mut self, path: &str, text: &str) -> Result<(), ConfigError> {
        let file: FileConfig = toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        if let Some(db_path) = file.db_path {
            self.db_path = db_path;
        }
        if let Some(bind) = file.bind {
            self.bind = parse_bind(&bind)?;
        }
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(log_json) = file.log_json {
            self.log_json = log_json;
        }
        if let Some(capacity) = file.notification_capacity {
            self.notification_capacity = capacity;
        }
        if let Some(ttl) = file.profile_cache_ttl_secs {
            self.profile_cache_ttl_secs = ttl;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &Overrides) -> Result<(), ConfigError> {
        if let Some(db_path) = &overrides.db_path {
            self.db_path.clone_from(db_path);
        }
        if let Some(bind) = &overrides.bind {
            self.bind = parse_bind(bind)?;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(log_json) = overrides.log_json {
            self.log_json = log_json;
        }
        if let Some(capacity) = overrides.notification_capacity {
            self.notification_capacity = capacity;
        }
        if let Some(ttl) = overrides.profile_cache_ttl_secs {
            self.profile_cache_ttl_secs = ttl;
        }
        Ok(())
    }

    pub fn profile_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.profile_cache_ttl_secs)
    }
}

fn parse_bind(value: &str) -> Result<IpAddr, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Bind {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_file_or_overrides() {
        let config = Config::load(None, &Overrides::default()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 4830);
        assert_eq!(config.db_path, ".mutual-aid/aid.db");
    }

    #[test]
    fn overrides_win_over_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "db_path = \"/var/lib/aid.db\"\nport = 9000\nbind = \"0.0.0.0\"\nprofile_cache_ttl_secs = 5"
        )
        .unwrap();
        let overrides = Overrides {
            port: Some(9100),
            ..Overrides::default()
        };

        let config = Config::load(Some(file.path()), &overrides).unwrap();
        assert_eq!(config.db_path, "/var/lib/aid.db");
        assert_eq!(config.port, 9100);
        assert_eq!(config.bind.to_string(), "0.0.0.0");
        assert_eq!(config.profile_cache_ttl(), Duration::from_secs(5));
    }

    #[test]
    fn unknown_keys_and_bad_addresses_are_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prot = 9000").unwrap();
        assert!(matches!(
            Config::load(Some(file.path()), &Overrides::default()),
            Err(ConfigError::Parse { .. })
        ));

        let overrides = Overrides {
            bind: Some("localhost:80".to_string()),
            ..Overrides::default()
        };
        assert!(matches!(
            Config::load(None, &overrides),
            Err(ConfigError::Bind { .. })
        ));

        let overrides = Overrides {
            notification_capacity: Some(0),
            ..Overrides::default()
        };
        assert!(matches!(
            Config::load(None, &overrides),
            Err(ConfigError::Capacity)
        ));
    }
}
