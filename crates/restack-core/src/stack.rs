//! Controller for the managed container stack.
//!
//! A narrow capability interface over the container orchestration layer.
//! The real implementation drives the docker CLI; tests substitute fakes.
//! No method here ever names the persistent data volume.

use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;

/// Capability interface over the managed stack.
pub trait StackController {
    /// Whether the required orchestration tooling is installed.
    fn tools_available(&self) -> bool;

    /// Whether the stack descriptor (compose file) exists.
    fn compose_present(&self) -> bool;

    /// Stop the stack.
    fn stop(&self) -> anyhow::Result<()>;

    /// Build images and start the stack.
    fn build_and_start(&self) -> anyhow::Result<()>;

    /// Stop the stack and remove orphaned containers (teardown only).
    fn stop_with_orphans(&self) -> anyhow::Result<()>;

    /// Force-remove surviving containers whose names match the prefix.
    /// Returns how many were removed.
    fn remove_containers(&self, prefix: &str) -> anyhow::Result<u32>;

    /// Remove a network if it exists. Returns false when it was absent.
    fn remove_network(&self, name: &str) -> anyhow::Result<bool>;

    /// Prune unused networks.
    fn prune_networks(&self) -> anyhow::Result<()>;
}

/// Real implementation over the docker CLI and a compose file.
#[derive(Debug)]
pub struct ComposeStack {
    compose_file: PathBuf,
}

impl ComposeStack {
    pub fn new(compose_file: impl Into<PathBuf>) -> Self {
        Self {
            compose_file: compose_file.into(),
        }
    }

    fn compose(&self, args: &[&str]) -> anyhow::Result<()> {
        let file = self
            .compose_file
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid compose file path"))?;
        let mut full = vec!["compose", "-f", file];
        full.extend_from_slice(args);
        run_docker(&full)
    }
}

impl StackController for ComposeStack {
    fn tools_available(&self) -> bool {
        let docker = Command::new("docker")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        let compose = Command::new("docker")
            .args(["compose", "version"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        docker && compose
    }

    fn compose_present(&self) -> bool {
        self.compose_file.exists()
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.compose(&["down"])
    }

    fn build_and_start(&self) -> anyhow::Result<()> {
        self.compose(&["up", "-d", "--build"])
    }

    fn stop_with_orphans(&self) -> anyhow::Result<()> {
        self.compose(&["down", "--remove-orphans"])
    }

    fn remove_containers(&self, prefix: &str) -> anyhow::Result<u32> {
        let listing = docker_stdout(&[
            "ps",
            "-a",
            "--filter",
            &format!("name={prefix}"),
            "--format",
            "{{.Names}}",
        ])?;
        let names: Vec<&str> = listing.lines().filter(|l| !l.is_empty()).collect();
        for name in &names {
            run_docker(&["rm", "-f", name])?;
        }
        Ok(names.len() as u32)
    }

    fn remove_network(&self, name: &str) -> anyhow::Result<bool> {
        let exists = Command::new("docker")
            .args(["network", "inspect", name])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if !exists {
            return Ok(false);
        }
        run_docker(&["network", "rm", name])?;
        Ok(true)
    }

    fn prune_networks(&self) -> anyhow::Result<()> {
        run_docker(&["network", "prune", "-f"])
    }
}

/// Run a docker command, failing with captured stderr.
fn run_docker(args: &[&str]) -> anyhow::Result<()> {
    let output = Command::new("docker")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run docker {args:?}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Docker command failed {:?}: {}", args, stderr.trim());
    }
    Ok(())
}

/// Run a docker command and return its stdout.
fn docker_stdout(args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("docker")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run docker {args:?}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Docker command failed {:?}: {}", args, stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
