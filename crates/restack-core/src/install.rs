//! One-shot installation of the daemon as a systemd service.
//!
//! Renders a unit file and a logrotate policy from embedded templates and
//! registers the unit with systemd. Requires root for the writes under
//! `/etc` and the systemctl calls; everything else is plain file I/O.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;

use crate::settings::Settings;

/// Unit file template. The two substitution points are the operating user
/// and the repository path.
const UNIT_TEMPLATE: &str = "\
[Unit]
Description=restack self-update daemon
After=network-online.target docker.service
Wants=network-online.target

[Service]
Type=simple
User={user}
WorkingDirectory={repo_dir}
ExecStart=/usr/local/bin/restack daemon
Restart=on-failure
RestartSec=30

[Install]
WantedBy=multi-user.target
";

/// Fixed log rotation policy: daily, keep 7, compress one cycle late,
/// tolerate a missing file, skip empty files, recreate 0640 for the user.
const LOGROTATE_TEMPLATE: &str = "\
{log_glob} {
    daily
    rotate 7
    compress
    delaycompress
    missingok
    notifempty
    create 0640 {user} {user}
}
";

/// Render the systemd unit for the given user and repository path.
pub fn render_unit(user: &str, repo_dir: &Path) -> String {
    UNIT_TEMPLATE
        .replace("{user}", user)
        .replace("{repo_dir}", &repo_dir.display().to_string())
}

/// Render the logrotate policy for the daemon's log files.
pub fn render_logrotate(user: &str, log_dir: &Path) -> String {
    let glob = log_dir.join("*.log");
    LOGROTATE_TEMPLATE
        .replace("{log_glob}", &glob.display().to_string())
        .replace("{user}", user)
}

/// Control over the installed unit, narrow enough to fake in tests.
pub trait ServiceControl {
    fn unit_installed(&self) -> bool;
    fn stop_unit(&self) -> anyhow::Result<()>;
    fn disable_unit(&self) -> anyhow::Result<()>;
}

/// Real service control via systemctl.
#[derive(Debug)]
pub struct Systemctl {
    unit: String,
}

impl Systemctl {
    pub fn new(unit: impl Into<String>) -> Self {
        Self { unit: unit.into() }
    }
}

impl ServiceControl for Systemctl {
    fn unit_installed(&self) -> bool {
        Path::new("/etc/systemd/system")
            .join(format!("{}.service", self.unit))
            .exists()
    }

    fn stop_unit(&self) -> anyhow::Result<()> {
        systemctl(&["stop", &self.unit])
    }

    fn disable_unit(&self) -> anyhow::Result<()> {
        systemctl(&["disable", &self.unit])
    }
}

/// One-shot installer for the daemon service.
pub struct Installer<'a> {
    settings: &'a Settings,
}

impl<'a> Installer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Register the daemon: log directory, unit file, systemd reload,
    /// enable-on-boot + start, logrotate policy.
    pub fn install(&self) -> anyhow::Result<()> {
        let user = operating_user()?;

        std::fs::create_dir_all(&self.settings.log_dir).with_context(|| {
            format!(
                "Failed to create log directory: {}",
                self.settings.log_dir.display()
            )
        })?;

        let unit_path = self.unit_path();
        std::fs::write(
            &unit_path,
            render_unit(&user, &self.settings.repo_dir),
        )
        .with_context(|| format!("Failed to write unit file: {}", unit_path.display()))?;

        systemctl(&["daemon-reload"])?;
        systemctl(&["enable", "--now", &self.settings.unit_name])?;

        let logrotate_path = self.logrotate_path();
        std::fs::write(
            &logrotate_path,
            render_logrotate(&user, &self.settings.log_dir),
        )
        .with_context(|| {
            format!(
                "Failed to write logrotate policy: {}",
                logrotate_path.display()
            )
        })?;

        Ok(())
    }

    fn unit_path(&self) -> PathBuf {
        PathBuf::from("/etc/systemd/system").join(format!("{}.service", self.settings.unit_name))
    }

    fn logrotate_path(&self) -> PathBuf {
        PathBuf::from("/etc/logrotate.d").join(&self.settings.unit_name)
    }
}

/// The user the daemon should run as: the invoking user behind sudo, not
/// root itself.
fn operating_user() -> anyhow::Result<String> {
    std::env::var("SUDO_USER")
        .or_else(|_| std::env::var("USER"))
        .context("Could not determine the operating user")
}

/// Run a systemctl command, failing with captured stderr.
fn systemctl(args: &[&str]) -> anyhow::Result<()> {
    let output = Command::new("systemctl")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run systemctl {args:?}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("systemctl {:?} failed: {}", args, stderr.trim());
    }
    Ok(())
}
