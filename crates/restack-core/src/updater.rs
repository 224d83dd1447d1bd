//! The per-cycle update state machine.
//!
//! One invocation runs a full cycle: fetch, compare, and on divergence pull,
//! stop, rebuild and restart the stack, then notify. Every cycle yields
//! exactly one [`Outcome`]. A failed stop is downgraded to a warning (a stuck
//! or absent stack must not wedge future updates); a failed pull or
//! build+start aborts the cycle (redeploying an inconsistent revision would
//! be worse than not redeploying).

use thiserror::Error;

use crate::git::RevisionSource;
use crate::logging::CycleLog;
use crate::notify::{Notification, Notify};
use crate::revision::Revision;
use crate::settings::Settings;
use crate::stack::StackController;

/// Fatal per-cycle error taxonomy. Each variant corresponds to one aborting
/// transition of the cycle; stop failures are not represented here because
/// they never abort.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Required tooling missing or working directory inaccessible.
    #[error("environment error: {0}")]
    Environment(String),
    /// Could not read local or remote revisions.
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// Could not fast-forward the working copy; no redeploy is attempted.
    #[error("pull failed: {0}")]
    Pull(String),
    /// Build+start failed after a successful pull.
    #[error("redeploy failed: {0}")]
    Redeploy(String),
}

/// Per-cycle classification of an update attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Local and remote revisions were equal; nothing was done.
    UpToDate,
    /// The stack was rebuilt and restarted on the new revision.
    Updated { old: Revision, new: Revision },
    /// The cycle aborted; `detail` is always non-empty.
    Failed {
        old: Option<Revision>,
        new: Option<Revision>,
        detail: String,
    },
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

/// A fatal error together with whatever revisions were observed before it.
struct Failure {
    old: Option<Revision>,
    new: Option<Revision>,
    error: UpdateError,
}

impl Failure {
    /// Failure before any revision was read.
    fn bare(error: UpdateError) -> Self {
        Self {
            old: None,
            new: None,
            error,
        }
    }
}

/// Drives one update cycle over the injected capabilities.
pub struct Updater<'a, R, S, N> {
    settings: &'a Settings,
    source: &'a R,
    stack: &'a S,
    notifier: &'a N,
}

impl<'a, R, S, N> Updater<'a, R, S, N>
where
    R: RevisionSource,
    S: StackController,
    N: Notify,
{
    pub fn new(settings: &'a Settings, source: &'a R, stack: &'a S, notifier: &'a N) -> Self {
        Self {
            settings,
            source,
            stack,
            notifier,
        }
    }

    /// Run one full cycle and report its outcome.
    ///
    /// Notification delivery failures are logged and swallowed; they never
    /// change the returned outcome.
    pub async fn run_cycle(&self, log: &CycleLog) -> Outcome {
        log.line("Checking for updates...");

        let outcome = match self.advance(log) {
            Ok(outcome) => {
                if matches!(outcome, Outcome::Updated { .. }) {
                    log.line("Update complete.");
                }
                outcome
            }
            Err(failure) => {
                let detail = failure.error.to_string();
                log.line(&format!("Update failed: {detail}"));
                Outcome::Failed {
                    old: failure.old,
                    new: failure.new,
                    detail,
                }
            }
        };

        let meta = match &outcome {
            Outcome::Updated { new, .. } => match self.source.commit_meta(new) {
                Ok(meta) => Some(meta),
                Err(err) => {
                    tracing::warn!("Could not read commit metadata for {new}: {err:#}");
                    None
                }
            },
            _ => None,
        };

        if let Some(note) =
            Notification::for_outcome(&outcome, meta.as_ref(), self.settings.repo_url.as_ref())
        {
            if let Err(err) = self.notifier.send(&note).await {
                log.line(&format!("Warning: notification delivery failed: {err:#}"));
            }
        }

        outcome
    }

    /// The fatal path of the state machine: every `?` is one aborting
    /// transition. Revisions are read fresh here on every invocation.
    fn advance(&self, log: &CycleLog) -> Result<Outcome, Failure> {
        self.source
            .fetch()
            .map_err(|e| Failure::bare(UpdateError::Fetch(format!("{e:#}"))))?;

        let local = self
            .source
            .local_revision()
            .map_err(|e| Failure::bare(UpdateError::Fetch(format!("{e:#}"))))?;
        let remote = self
            .source
            .remote_revision(&self.settings.branch)
            .map_err(|e| Failure {
                old: Some(local.clone()),
                new: None,
                error: UpdateError::Fetch(format!("{e:#}")),
            })?;

        if local == remote {
            log.line("Already up to date. No action needed.");
            return Ok(Outcome::UpToDate);
        }

        log.line(&format!(
            "New revision detected: {} -> {}",
            local.short(),
            remote.short()
        ));

        let fail = |error: UpdateError| Failure {
            old: Some(local.clone()),
            new: Some(remote.clone()),
            error,
        };

        log.line("Pulling latest changes...");
        self.source
            .pull(&self.settings.branch)
            .map_err(|e| fail(UpdateError::Pull(format!("{e:#}"))))?;

        if !self.stack.tools_available() {
            return Err(fail(UpdateError::Environment(
                "docker compose tooling not found".to_string(),
            )));
        }

        log.line("Stopping stack...");
        if let Err(err) = self.stack.stop() {
            // Never fatal: an already-absent or stuck stack must not block
            // the redeploy.
            log.line(&format!("Warning: failed to stop stack: {err:#}"));
        }

        log.line("Rebuilding and starting stack...");
        self.stack
            .build_and_start()
            .map_err(|e| fail(UpdateError::Redeploy(format!("{e:#}"))))?;

        Ok(Outcome::Updated {
            old: local,
            new: remote,
        })
    }
}
