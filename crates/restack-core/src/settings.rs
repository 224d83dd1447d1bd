//! Daemon configuration.
//!
//! An immutable [`Settings`] value is constructed once at startup and passed
//! by reference to every component; there is no ambient mutable state.
//! Defaults can be overridden by an optional `restack.toml` in the repository
//! directory and by `RESTACK_*` environment variables (environment wins).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

/// Configuration for the updater, daemon, installer and cleanup tool.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Branch watched for new revisions.
    pub branch: String,
    /// Working copy of the watched repository.
    pub repo_dir: PathBuf,
    /// Compose file driving the managed stack.
    pub compose_file: PathBuf,
    /// Name prefix shared by the stack's containers.
    pub service_prefix: String,
    /// Stack network removed during cleanup.
    pub network_name: String,
    /// Persistent data volume. Never an argument to any destructive command.
    pub volume_name: String,
    /// systemd unit name registered by the installer.
    pub unit_name: String,
    /// Web URL of the repository, used to build commit links in notifications.
    pub repo_url: Option<Url>,
    /// Optional webhook endpoint; when absent the notifier is a no-op.
    pub webhook_url: Option<Url>,
    /// Wall-clock interval between update checks.
    pub poll_interval: Duration,
    /// Directory holding the daemon's log files.
    pub log_dir: PathBuf,
}

/// Subset of settings accepted from `restack.toml`. Every key is optional;
/// missing keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    branch: Option<String>,
    compose_file: Option<PathBuf>,
    service_prefix: Option<String>,
    network_name: Option<String>,
    volume_name: Option<String>,
    unit_name: Option<String>,
    repo_url: Option<Url>,
    webhook_url: Option<Url>,
    poll_interval_secs: Option<u64>,
    log_dir: Option<PathBuf>,
}

impl Settings {
    /// Default settings anchored at the given repository directory.
    pub fn for_repo(repo_dir: impl Into<PathBuf>) -> Self {
        let repo_dir = repo_dir.into();
        Self {
            branch: "main".to_string(),
            compose_file: repo_dir.join("docker-compose.yml"),
            service_prefix: "restack".to_string(),
            network_name: "restack_default".to_string(),
            volume_name: "restack_data".to_string(),
            unit_name: "restack-updater".to_string(),
            repo_url: None,
            webhook_url: None,
            poll_interval: Duration::from_secs(300),
            log_dir: repo_dir.join("logs"),
            repo_dir,
        }
    }

    /// Load settings: defaults, then `restack.toml` if present in the
    /// repository directory, then `RESTACK_*` environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let repo_dir = match std::env::var_os("RESTACK_REPO_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().context("Could not determine working directory")?,
        };

        let mut settings = Self::for_repo(repo_dir);
        let config_file = settings.repo_dir.join("restack.toml");
        if config_file.exists() {
            settings.merge_file(&config_file)?;
        }
        settings.apply_overrides(std::env::vars())?;
        Ok(settings)
    }

    /// Merge an on-disk TOML file into these settings.
    pub fn merge_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let file: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        if let Some(branch) = file.branch {
            self.branch = branch;
        }
        if let Some(compose_file) = file.compose_file {
            self.compose_file = self.repo_dir.join(compose_file);
        }
        if let Some(prefix) = file.service_prefix {
            self.service_prefix = prefix;
        }
        if let Some(network) = file.network_name {
            self.network_name = network;
        }
        if let Some(volume) = file.volume_name {
            self.volume_name = volume;
        }
        if let Some(unit) = file.unit_name {
            self.unit_name = unit;
        }
        if file.repo_url.is_some() {
            self.repo_url = file.repo_url;
        }
        if file.webhook_url.is_some() {
            self.webhook_url = file.webhook_url;
        }
        if let Some(secs) = file.poll_interval_secs {
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Some(log_dir) = file.log_dir {
            self.log_dir = self.repo_dir.join(log_dir);
        }
        Ok(())
    }

    /// Apply `RESTACK_*` overrides from an environment-shaped iterator.
    ///
    /// Taking the variables as an argument keeps this parsable in tests
    /// without mutating the process environment. Malformed values (bad URL,
    /// non-numeric interval) are errors here, at load time, not at use time.
    pub fn apply_overrides<I>(&mut self, vars: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "RESTACK_BRANCH" => self.branch = value,
                "RESTACK_COMPOSE_FILE" => self.compose_file = self.repo_dir.join(value),
                "RESTACK_SERVICE_PREFIX" => self.service_prefix = value,
                "RESTACK_NETWORK" => self.network_name = value,
                "RESTACK_VOLUME" => self.volume_name = value,
                "RESTACK_UNIT" => self.unit_name = value,
                "RESTACK_REPO_URL" => {
                    self.repo_url = Some(
                        Url::parse(&value)
                            .with_context(|| format!("Invalid RESTACK_REPO_URL: {value}"))?,
                    );
                }
                "RESTACK_WEBHOOK_URL" => {
                    self.webhook_url = Some(
                        Url::parse(&value)
                            .with_context(|| format!("Invalid RESTACK_WEBHOOK_URL: {value}"))?,
                    );
                }
                "RESTACK_POLL_INTERVAL_SECS" => {
                    let secs: u64 = value
                        .parse()
                        .with_context(|| format!("Invalid RESTACK_POLL_INTERVAL_SECS: {value}"))?;
                    self.poll_interval = Duration::from_secs(secs);
                }
                "RESTACK_LOG_DIR" => self.log_dir = self.repo_dir.join(value),
                _ => {}
            }
        }
        Ok(())
    }

    /// Log file for update cycles (mirrored to stdout by the updater).
    pub fn updater_log(&self) -> PathBuf {
        self.log_dir.join("update.log")
    }

    /// Log file for the polling daemon itself.
    pub fn daemon_log(&self) -> PathBuf {
        self.log_dir.join("daemon.log")
    }
}
