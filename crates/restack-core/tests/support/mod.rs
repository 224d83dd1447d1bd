//! Shared fakes for exercising the updater, daemon loop and cleanup tool
//! without touching git, docker or the network.

#![allow(dead_code)]

use std::sync::Mutex;

use restack_core::git::RevisionSource;
use restack_core::install::ServiceControl;
use restack_core::notify::{Notification, Notify};
use restack_core::revision::{CommitMeta, Revision};
use restack_core::stack::StackController;

pub const OLD_REV: &str = "abc1234def5678abc1234def5678abc1234def56";
pub const NEW_REV: &str = "def5678abc1234def5678abc1234def5678abc12";

/// Deterministic revision source. `pull` fast-forwards `local` to `remote`,
/// mirroring the real working copy.
pub struct FakeSource {
    pub local: Mutex<Revision>,
    pub remote: Revision,
    pub fetch_error: Option<String>,
    pub pull_error: Option<String>,
    pub meta: Option<CommitMeta>,
    pub fetches: Mutex<u32>,
    pub pulls: Mutex<u32>,
}

impl FakeSource {
    pub fn new(local: &str, remote: &str) -> Self {
        Self {
            local: Mutex::new(Revision::new(local)),
            remote: Revision::new(remote),
            fetch_error: None,
            pull_error: None,
            meta: None,
            fetches: Mutex::new(0),
            pulls: Mutex::new(0),
        }
    }

    pub fn with_meta(mut self, summary: &str, author: &str) -> Self {
        self.meta = Some(CommitMeta {
            summary: summary.to_string(),
            author: author.to_string(),
        });
        self
    }

    pub fn fetch_count(&self) -> u32 {
        *self.fetches.lock().unwrap()
    }

    pub fn pull_count(&self) -> u32 {
        *self.pulls.lock().unwrap()
    }

    pub fn local(&self) -> Revision {
        self.local.lock().unwrap().clone()
    }
}

impl RevisionSource for FakeSource {
    fn fetch(&self) -> anyhow::Result<()> {
        *self.fetches.lock().unwrap() += 1;
        match &self.fetch_error {
            Some(err) => anyhow::bail!("{err}"),
            None => Ok(()),
        }
    }

    fn local_revision(&self) -> anyhow::Result<Revision> {
        Ok(self.local.lock().unwrap().clone())
    }

    fn remote_revision(&self, _branch: &str) -> anyhow::Result<Revision> {
        Ok(self.remote.clone())
    }

    fn pull(&self, _branch: &str) -> anyhow::Result<()> {
        *self.pulls.lock().unwrap() += 1;
        if let Some(err) = &self.pull_error {
            anyhow::bail!("{err}");
        }
        *self.local.lock().unwrap() = self.remote.clone();
        Ok(())
    }

    fn commit_meta(&self, _revision: &Revision) -> anyhow::Result<CommitMeta> {
        self.meta
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no commit metadata"))
    }
}

/// Stack controller that records every invocation verbatim.
pub struct FakeStack {
    pub calls: Mutex<Vec<String>>,
    pub tools: bool,
    pub compose_present: bool,
    pub stop_error: bool,
    pub build_error: bool,
    pub stop_orphans_error: bool,
    pub matching_containers: u32,
    pub network_present: bool,
    pub prune_error: bool,
}

impl FakeStack {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            tools: true,
            compose_present: true,
            stop_error: false,
            build_error: false,
            stop_orphans_error: false,
            matching_containers: 0,
            network_present: false,
            prune_error: false,
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl StackController for FakeStack {
    fn tools_available(&self) -> bool {
        self.tools
    }

    fn compose_present(&self) -> bool {
        self.compose_present
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.record("stop".to_string());
        if self.stop_error {
            anyhow::bail!("stack not running");
        }
        Ok(())
    }

    fn build_and_start(&self) -> anyhow::Result<()> {
        self.record("build_and_start".to_string());
        if self.build_error {
            anyhow::bail!("image build failed");
        }
        Ok(())
    }

    fn stop_with_orphans(&self) -> anyhow::Result<()> {
        self.record("stop_with_orphans".to_string());
        if self.stop_orphans_error {
            anyhow::bail!("compose down failed");
        }
        Ok(())
    }

    fn remove_containers(&self, prefix: &str) -> anyhow::Result<u32> {
        self.record(format!("remove_containers {prefix}"));
        Ok(self.matching_containers)
    }

    fn remove_network(&self, name: &str) -> anyhow::Result<bool> {
        self.record(format!("remove_network {name}"));
        Ok(self.network_present)
    }

    fn prune_networks(&self) -> anyhow::Result<()> {
        self.record("prune_networks".to_string());
        if self.prune_error {
            anyhow::bail!("prune failed");
        }
        Ok(())
    }
}

/// Notifier that captures every payload it is asked to deliver.
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub delivery_error: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            delivery_error: false,
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notify for RecordingNotifier {
    async fn send(&self, note: &Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(note.clone());
        if self.delivery_error {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }
}

/// Service control fake for the cleanup tool.
pub struct FakeService {
    pub installed: bool,
    pub stop_error: bool,
    pub stops: Mutex<u32>,
    pub disables: Mutex<u32>,
}

impl FakeService {
    pub fn new(installed: bool) -> Self {
        Self {
            installed,
            stop_error: false,
            stops: Mutex::new(0),
            disables: Mutex::new(0),
        }
    }
}

impl ServiceControl for FakeService {
    fn unit_installed(&self) -> bool {
        self.installed
    }

    fn stop_unit(&self) -> anyhow::Result<()> {
        *self.stops.lock().unwrap() += 1;
        if self.stop_error {
            anyhow::bail!("unit stop failed");
        }
        Ok(())
    }

    fn disable_unit(&self) -> anyhow::Result<()> {
        *self.disables.lock().unwrap() += 1;
        Ok(())
    }
}
