use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use flate2::Compression;
use serde::{Deserialize, Serialize};

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(s) = path.to_str() {
        if let Some(stripped) = s.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if s == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

/// Configuration for minigit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Name of the repository's storage directory
    #[serde(default = "defaults::git_dir")]
    pub git_dir: String,
    /// Branch HEAD points at after `init`
    #[serde(default = "defaults::default_branch")]
    pub default_branch: String,
    /// zlib level for stored objects (0-9)
    #[serde(default = "defaults::compression_level")]
    pub compression_level: u32,
    /// Identity recorded by `commit-tree`
    #[serde(default = "defaults::user_name")]
    pub user_name: String,
    #[serde(default = "defaults::user_email")]
    pub user_email: String,
    /// User-Agent sent to remotes
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_dir: defaults::git_dir(),
            default_branch: defaults::default_branch(),
            compression_level: defaults::compression_level(),
            user_name: defaults::user_name(),
            user_email: defaults::user_email(),
            user_agent: defaults::user_agent(),
        }
    }
}

impl Config {
    /// Load configuration from the config file (if any) and environment variables
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        tracing::debug!("loading minigit config from {:?}", config_path);
        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Apply environment overrides; `lookup` is `std::env::var` outside tests
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("GIT_AUTHOR_NAME") {
            self.user_name = name;
        }

        if let Some(email) = lookup("GIT_AUTHOR_EMAIL") {
            self.user_email = email;
        }

        if let Some(branch) = lookup("MINIGIT_DEFAULT_BRANCH") {
            self.default_branch = branch;
        }

        if let Some(level) = lookup("MINIGIT_COMPRESSION_LEVEL") {
            self.compression_level = level
                .parse()
                .context("Failed to parse MINIGIT_COMPRESSION_LEVEL as u32")?;
        }

        self.validate()
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    #[allow(dead_code)]
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Config file path: `$MINIGIT_CONFIG`, else `~/.config/minigit/config.yaml`
    pub fn config_file_path() -> Result<PathBuf> {
        if let Ok(path) = env::var("MINIGIT_CONFIG") {
            return Ok(expand_tilde(&PathBuf::from(path)));
        }
        dirs::home_dir()
            .map(|home| home.join(".config/minigit/config.yaml"))
            .context("Could not determine home directory for config file")
    }

    pub fn compression(&self) -> Compression {
        Compression::new(self.compression_level)
    }

    fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            anyhow::bail!(
                "compression_level must be between 0 and 9, got {}",
                self.compression_level
            );
        }
        if self.git_dir.is_empty() || self.git_dir.contains(['/', '\\']) {
            anyhow::bail!("git_dir must be a single directory name, got {:?}", self.git_dir);
        }
        Ok(())
    }
}

mod defaults {
    pub(crate) fn git_dir() -> String {
        ".git".to_string()
    }

    pub(crate) fn default_branch() -> String {
        "main".to_string()
    }

    pub(crate) fn compression_level() -> u32 {
        6
    }

    pub(crate) fn user_name() -> String {
        "minigit".to_string()
    }

    pub(crate) fn user_email() -> String {
        "minigit@localhost".to_string()
    }

    pub(crate) fn user_agent() -> String {
        "git/2.0 (minigit)".to_string()
    }
}
