use crate::error::{ForkfixError, Result};
use crate::fixer::fork::ForkWait;
use crate::fixer::{FixOptions, FixVariant};
use crate::logging::LogFormat;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub github_token: Option<String>,
    /// API root for GitHub Enterprise; public GitHub when unset.
    pub github_api_url: Option<String>,
    pub branch_prefix: String,
    pub base_branch: String,
    pub variant: FixVariant,
    pub fork_check_attempts: u32,
    pub fork_check_delay_secs: u64,
    pub store_url: Option<String>,
    pub store_key: Option<String>,
    pub store_table: String,
    pub store_order_column: Option<String>,
    pub processed_path: PathBuf,
    pub poll_interval_secs: u64,
    pub max_cycles: Option<u64>,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("github_token", &self.github_token.as_ref().map(|_| "[REDACTED]"))
            .field("github_api_url", &self.github_api_url)
            .field("branch_prefix", &self.branch_prefix)
            .field("base_branch", &self.base_branch)
            .field("variant", &self.variant)
            .field("fork_check_attempts", &self.fork_check_attempts)
            .field("fork_check_delay_secs", &self.fork_check_delay_secs)
            .field("store_url", &self.store_url)
            .field("store_key", &self.store_key.as_ref().map(|_| "[REDACTED]"))
            .field("store_table", &self.store_table)
            .field("store_order_column", &self.store_order_column)
            .field("processed_path", &self.processed_path)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("max_cycles", &self.max_cycles)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: None,
            github_api_url: None,
            branch_prefix: "issue-fix".to_string(),
            base_branch: "main".to_string(),
            variant: FixVariant::Minimal,
            fork_check_attempts: 5,
            fork_check_delay_secs: 3,
            store_url: None,
            store_key: None,
            store_table: "issues".to_string(),
            store_order_column: None,
            processed_path: PathBuf::from("processed_issues.txt"),
            poll_interval_secs: 30,
            max_cycles: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<FixVariant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u64>,
}

impl Config {
    /// Layers, lowest first: defaults, config file, `FORKFIX_*` env,
    /// `GITHUB_TOKEN`/`SUPABASE_URL`/`SUPABASE_KEY`, command line.
    pub fn load(config_file: Option<&Path>, cli: CliOverrides) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match config_file {
            Some(path) if !path.exists() => {
                return Err(ForkfixError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                let default_file = config_dir().join("forkfix").join("config.toml");
                if default_file.exists() {
                    figment = figment.merge(Toml::file(default_file));
                }
            }
        }

        figment = figment
            .merge(Env::prefixed("FORKFIX_"))
            .merge(raw_env("GITHUB_TOKEN", "github_token"))
            .merge(raw_env("SUPABASE_URL", "store_url"))
            .merge(raw_env("SUPABASE_KEY", "store_key"))
            .merge(Serialized::defaults(cli));

        figment
            .extract()
            .map_err(|e| ForkfixError::Config(e.to_string()))
    }

    pub fn fix_options(&self) -> FixOptions {
        FixOptions {
            branch_prefix: self.branch_prefix.clone(),
            base_branch: self.base_branch.clone(),
            variant: self.variant,
            fork_wait: ForkWait {
                attempts: self.fork_check_attempts,
                delay: Duration::from_secs(self.fork_check_delay_secs),
            },
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn require_token(&self) -> Result<&str> {
        self.github_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ForkfixError::Config("no GitHub token: pass one or set GITHUB_TOKEN".to_string())
            })
    }

    /// `(url, key)` of the issue store.
    pub fn require_store(&self) -> Result<(&str, &str)> {
        let url = self.store_url.as_deref().filter(|v| !v.is_empty());
        let key = self.store_key.as_deref().filter(|v| !v.is_empty());
        match (url, key) {
            (Some(url), Some(key)) => Ok((url, key)),
            _ => Err(ForkfixError::Config(
                "issue store not configured: set SUPABASE_URL and SUPABASE_KEY".to_string(),
            )),
        }
    }
}

fn raw_env(var: &'static str, key: &'static str) -> Env {
    Env::raw().only(&[var]).map(move |_| key.into())
}

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}
