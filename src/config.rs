// wirelessctl - wireless client history for Meraki Dashboard networks
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.meraki.com/api/v1";
pub const DEFAULT_LOG_FILE: &str = "wirelessctl.log";
pub const DEFAULT_SHORT_TTL_SECS: u64 = 300;
pub const DEFAULT_MEDIUM_TTL_SECS: u64 = 3600;

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: Option<String>,
    pub log_file: Option<PathBuf>,
    pub file_logging: Option<bool>,
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub short_ttl_secs: Option<u64>,
    pub medium_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    User,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not locate a writable config directory for the current user")]
    MissingConfigDir,
    #[error("Missing MK_CSM_KEY environment variable; export your Dashboard API key first")]
    MissingApiKey,
}

/// TTLs applied by the fetch layer; short for history, medium for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub short: Duration,
    pub medium: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(DEFAULT_SHORT_TTL_SECS),
            medium: Duration::from_secs(DEFAULT_MEDIUM_TTL_SECS),
        }
    }
}

#[derive(Debug)]
pub struct EffectiveConfig {
    pub base_url: String,
    pub log_file: PathBuf,
    pub file_logging: bool,
    pub ttls: CacheTtls,
}

pub fn config_path(scope: Scope, cwd: &Path) -> Result<PathBuf> {
    match scope {
        Scope::Local => Ok(cwd.join(".wirelessctl.yaml")),
        Scope::User => {
            if let Ok(custom) = env::var("WIRELESSCTL_CONFIG_DIR") {
                return Ok(PathBuf::from(custom).join("config.yaml"));
            }
            let base = config_dir().ok_or(ConfigError::MissingConfigDir)?;
            Ok(base.join("wirelessctl").join("config.yaml"))
        }
    }
}

pub fn load(cwd: &Path) -> Result<Config> {
    let user = read_if_exists(&config_path(Scope::User, cwd)?)?.unwrap_or_default();
    let local = read_if_exists(&config_path(Scope::Local, cwd)?)?.unwrap_or_default();
    Ok(merge(user, local))
}

pub fn load_scope(scope: Scope, cwd: &Path) -> Result<Config> {
    Ok(read_if_exists(&config_path(scope, cwd)?)?.unwrap_or_default())
}

pub fn save(scope: Scope, config: &Config, cwd: &Path) -> Result<PathBuf> {
    let path = config_path(scope, cwd)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let serialized = serde_yaml::to_string(config).context("serializing config")?;
    fs::write(&path, serialized).with_context(|| format!("writing {:?}", path))?;
    Ok(path)
}

pub fn resolve(cwd: &Path, base_url_override: Option<String>) -> Result<EffectiveConfig> {
    let mut merged = load(cwd)?;

    if let Some(url) = base_url_override {
        merged.base_url = Some(url);
    }

    let base_url = merged
        .base_url
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let log_file = match merged.log_file {
        Some(path) if path.is_absolute() => path,
        Some(path) => cwd.join(path),
        None => cwd.join(DEFAULT_LOG_FILE),
    };

    let cache = merged.cache.unwrap_or_default();
    let defaults = CacheTtls::default();
    let ttls = CacheTtls {
        short: cache
            .short_ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.short),
        medium: cache
            .medium_ttl_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.medium),
    };

    Ok(EffectiveConfig {
        base_url,
        log_file,
        file_logging: merged.file_logging.unwrap_or(true),
        ttls,
    })
}

fn read_if_exists(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let config = serde_yaml::from_str(&contents).with_context(|| format!("parsing {:?}", path))?;
    Ok(Some(config))
}

fn merge(user: Config, local: Config) -> Config {
    Config {
        base_url: local.base_url.or(user.base_url),
        log_file: local.log_file.or(user.log_file),
        file_logging: local.file_logging.or(user.file_logging),
        cache: match (user.cache, local.cache) {
            (Some(u), Some(l)) => Some(CacheConfig {
                short_ttl_secs: l.short_ttl_secs.or(u.short_ttl_secs),
                medium_ttl_secs: l.medium_ttl_secs.or(u.medium_ttl_secs),
            }),
            (Some(u), None) => Some(u),
            (None, Some(l)) => Some(l),
            (None, None) => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;
    use std::{env, fs};
    use tempfile::tempdir;

    static ENV_LOCK: OnceLock<std::sync::Mutex<()>> = OnceLock::new();

    #[test]
    fn merges_user_and_local_and_overrides() {
        let _guard = ENV_LOCK
            .get_or_init(|| std::sync::Mutex::new(()))
            .lock()
            .unwrap();
        let cwd = tempdir().unwrap();
        unsafe {
            env::set_var("WIRELESSCTL_CONFIG_DIR", cwd.path().join("config"));
        }
        fs::create_dir_all(cwd.path().join("config")).unwrap();

        let user_cfg = Config {
            base_url: Some("https://user.example.test/api/v1".into()),
            log_file: Some(PathBuf::from("/var/log/wirelessctl.log")),
            file_logging: Some(true),
            cache: Some(CacheConfig {
                short_ttl_secs: Some(60),
                medium_ttl_secs: Some(600),
            }),
        };
        save(Scope::User, &user_cfg, cwd.path()).unwrap();

        let local_cfg = Config {
            base_url: Some("https://local.example.test/api/v1".into()),
            log_file: None,
            file_logging: Some(false),
            cache: Some(CacheConfig {
                short_ttl_secs: Some(30),
                medium_ttl_secs: None,
            }),
        };
        save(Scope::Local, &local_cfg, cwd.path()).unwrap();

        let effective = resolve(cwd.path(), None).unwrap();
        assert_eq!(effective.base_url, "https://local.example.test/api/v1");
        assert_eq!(effective.log_file, PathBuf::from("/var/log/wirelessctl.log"));
        assert!(!effective.file_logging);
        assert_eq!(effective.ttls.short, Duration::from_secs(30));
        assert_eq!(effective.ttls.medium, Duration::from_secs(600));

        let overridden = resolve(cwd.path(), Some("https://override.test".into())).unwrap();
        assert_eq!(overridden.base_url, "https://override.test");
    }

    #[test]
    fn defaults_when_nothing_is_configured() {
        let _guard = ENV_LOCK
            .get_or_init(|| std::sync::Mutex::new(()))
            .lock()
            .unwrap();
        let cwd = tempdir().unwrap();
        unsafe {
            env::set_var("WIRELESSCTL_CONFIG_DIR", cwd.path().join("config"));
        }

        let effective = resolve(cwd.path(), None).unwrap();
        assert_eq!(effective.base_url, DEFAULT_BASE_URL);
        assert_eq!(effective.log_file, cwd.path().join(DEFAULT_LOG_FILE));
        assert!(effective.file_logging);
        assert_eq!(effective.ttls, CacheTtls::default());
        assert_eq!(effective.ttls.short, Duration::from_secs(300));
        assert_eq!(effective.ttls.medium, Duration::from_secs(3600));
    }

    #[test]
    fn relative_log_file_is_anchored_to_cwd() {
        let _guard = ENV_LOCK
            .get_or_init(|| std::sync::Mutex::new(()))
            .lock()
            .unwrap();
        let cwd = tempdir().unwrap();
        unsafe {
            env::set_var("WIRELESSCTL_CONFIG_DIR", cwd.path().join("config"));
        }
        let local_cfg = Config {
            log_file: Some(PathBuf::from("logs/app.log")),
            ..Config::default()
        };
        save(Scope::Local, &local_cfg, cwd.path()).unwrap();

        let effective = resolve(cwd.path(), None).unwrap();
        assert_eq!(effective.log_file, cwd.path().join("logs/app.log"));
    }
}
