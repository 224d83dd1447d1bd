//! Restack Core Library
//!
//! Provides the domain logic for the self-update daemon: revision watching,
//! stack redeployment, outcome notification, service installation and
//! teardown.

pub mod cleanup;
pub mod daemon;
pub mod git;
pub mod install;
pub mod logging;
pub mod notify;
pub mod revision;
pub mod settings;
pub mod stack;
pub mod updater;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::settings::Settings;

    // Revisions
    pub use crate::revision::{CommitMeta, Revision};

    // Capabilities
    pub use crate::git::{GitSource, RevisionSource};
    pub use crate::notify::{NoopNotifier, Notification, Notifier, Notify, WebhookNotifier};
    pub use crate::stack::{ComposeStack, StackController};

    // Orchestration
    pub use crate::cleanup::{CleanupReport, StepStatus, run_cleanup};
    pub use crate::daemon::{FixedInterval, PollPolicy, run_daemon};
    pub use crate::install::Installer;
    pub use crate::logging::CycleLog;
    pub use crate::updater::{Outcome, UpdateError, Updater};
}
