//! Revision source over the working copy.
//!
//! Network operations (fetch, pull) shell out to the git CLI so that the
//! daemon uses whatever credentials and transport the host is configured
//! with; local reads (HEAD, commit metadata) go through git2.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use git2::Repository;

use crate::revision::{CommitMeta, Revision};

/// Capability interface over the watched source repository.
///
/// Implementations must read revisions fresh on every call; the updater
/// relies on never seeing a cached value across cycles.
pub trait RevisionSource {
    /// Update remote tracking refs for the configured remote.
    fn fetch(&self) -> anyhow::Result<()>;

    /// Revision the working copy currently sits on.
    fn local_revision(&self) -> anyhow::Result<Revision>;

    /// Latest revision of the given branch on the remote, as of the last fetch.
    fn remote_revision(&self, branch: &str) -> anyhow::Result<Revision>;

    /// Fast-forward the working copy to the remote branch head.
    fn pull(&self, branch: &str) -> anyhow::Result<()>;

    /// Message summary and author of the given revision.
    fn commit_meta(&self, revision: &Revision) -> anyhow::Result<CommitMeta>;
}

/// Real implementation over a local working copy.
#[derive(Debug)]
pub struct GitSource {
    repo_dir: PathBuf,
}

impl GitSource {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    fn open(&self) -> anyhow::Result<Repository> {
        Repository::open(&self.repo_dir).with_context(|| {
            format!("Not a git working copy: {}", self.repo_dir.display())
        })
    }

    /// Run a git command in the working copy.
    fn run_git(&self, args: &[&str]) -> anyhow::Result<()> {
        run_git_in(&self.repo_dir, args)
    }
}

impl RevisionSource for GitSource {
    fn fetch(&self) -> anyhow::Result<()> {
        self.run_git(&["fetch", "origin"])
    }

    fn local_revision(&self) -> anyhow::Result<Revision> {
        let repo = self.open()?;
        let head = repo
            .head()
            .context("Failed to resolve HEAD")?
            .peel_to_commit()
            .context("HEAD does not point at a commit")?;
        Ok(Revision::new(head.id().to_string()))
    }

    fn remote_revision(&self, branch: &str) -> anyhow::Result<Revision> {
        let repo = self.open()?;
        let reference = format!("origin/{branch}");
        let commit = repo
            .revparse_single(&reference)
            .with_context(|| format!("Unknown remote branch: {reference}"))?
            .peel_to_commit()
            .with_context(|| format!("{reference} does not point at a commit"))?;
        Ok(Revision::new(commit.id().to_string()))
    }

    fn pull(&self, branch: &str) -> anyhow::Result<()> {
        self.run_git(&["pull", "--ff-only", "origin", branch])
    }

    fn commit_meta(&self, revision: &Revision) -> anyhow::Result<CommitMeta> {
        let repo = self.open()?;
        let commit = repo
            .revparse_single(revision.as_str())
            .with_context(|| format!("Unknown revision: {revision}"))?
            .peel_to_commit()
            .with_context(|| format!("{revision} does not point at a commit"))?;
        let summary = commit.summary().unwrap_or_default().to_string();
        let author = commit.author().name().unwrap_or_default().to_string();
        Ok(CommitMeta { summary, author })
    }
}

/// Run a git command in the given directory, failing with captured stderr.
fn run_git_in(cwd: &Path, args: &[&str]) -> anyhow::Result<()> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .with_context(|| format!("Failed to run git {args:?}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Git command failed {:?}: {}", args, stderr.trim());
    }
    Ok(())
}
