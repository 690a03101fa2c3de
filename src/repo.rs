//! Working-copy acquisition for the documentation repository.
//!
//! Workflow:
//! 1. No working copy yet → shallow clone, then reset both stores.
//! 2. Working copy whose `origin` matches `repo` → keep it and its state.
//! 3. Working copy with a different (or unreadable) origin → delete it, reset
//!    both stores, then shallow clone again.
//!
//! The store reset is tied to every fresh clone so checkpoints and terms from
//! one source never survive into another. [`check_repository`] reports the
//! same decision without acting on it, for dry runs.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::glossary::GlossaryStore;

/// What [`prepare_repository`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    /// No working copy existed; a new one was cloned.
    Cloned,
    /// The existing working copy already tracks the configured URL.
    Ready,
    /// The working copy pointed elsewhere and was replaced.
    Recloned,
}

/// Decide what [`prepare_repository`] would do, without touching anything.
pub fn check_repository(config: &Config) -> RepoState {
    let workdir = &config.paths.workdir;
    if !workdir.exists() {
        return RepoState::Cloned;
    }
    match origin_url(workdir) {
        Some(url) if url == config.repo => RepoState::Ready,
        _ => RepoState::Recloned,
    }
}

pub fn prepare_repository(config: &Config) -> Result<RepoState> {
    let workdir = &config.paths.workdir;
    let state = check_repository(config);

    match state {
        RepoState::Ready => {
            info!(path = %workdir.display(), "repository is ready");
            return Ok(state);
        }
        RepoState::Cloned => {
            info!(url = %config.repo, "no repository found, cloning");
            git_clone(&config.repo, workdir)?;
            reset_state(config)?;
            return Ok(state);
        }
        RepoState::Recloned => match origin_url(workdir) {
            Some(url) => {
                info!(old = %url, new = %config.repo, "repository source changed, recloning");
            }
            None => {
                warn!(path = %workdir.display(), "working copy has no readable origin, recloning");
            }
        },
    }

    std::fs::remove_dir_all(workdir)
        .with_context(|| format!("Failed to remove old working copy: {}", workdir.display()))?;
    reset_state(config)?;
    git_clone(&config.repo, workdir)?;
    Ok(state)
}

/// A throwaway clone next to the working copy, removed on drop.
///
/// Dry runs list documents from it when the real working copy is missing or
/// tracks another URL, so neither the working copy nor the stores change.
pub struct ScratchClone {
    path: PathBuf,
}

impl ScratchClone {
    pub fn create(config: &Config) -> Result<Self> {
        let workdir = &config.paths.workdir;
        let mut name = workdir
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "repo".into());
        name.push(".dry-run");
        let scratch = Self {
            path: workdir.with_file_name(name),
        };
        if scratch.path.exists() {
            std::fs::remove_dir_all(&scratch.path).with_context(|| {
                format!("Failed to remove stale scratch clone: {}", scratch.path.display())
            })?;
        }
        info!(url = %config.repo, path = %scratch.path.display(), "cloning for dry run");
        git_clone(&config.repo, &scratch.path)?;
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchClone {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove scratch clone");
            }
        }
    }
}

/// Return the `origin` remote URL of the working copy at `repo_dir`, if any.
pub fn origin_url(repo_dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["remote", "get-url", "origin"])
        .current_dir(repo_dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if url.is_empty() {
        None
    } else {
        Some(url)
    }
}

fn reset_state(config: &Config) -> Result<()> {
    CheckpointStore::reset(&config.paths.checkpoints)?;
    GlossaryStore::reset(&config.paths.output)?;
    Ok(())
}

fn git_clone(url: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let output = Command::new("git")
        .args(["clone", "--depth", "1"])
        .arg(url)
        .arg(dest)
        .output()
        .with_context(|| "Failed to execute 'git clone'. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git clone of {} failed: {}", url, stderr.trim());
    }

    Ok(())
}
