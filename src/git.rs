//! Git repository cloning support.
//!
//! Corpora published on GitHub (PerseusDL, OpenGreekAndLatin, ...) can be
//! cloned straight into the conversion directory. This module is only
//! available when the `git` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use cts2json::git::clone_repository;
//!
//! let repo = clone_repository(
//!     "https://github.com/PerseusDL/canonical-latinLit",
//!     Path::new("canonical-latinLit"),
//!     None,
//! )?;
//! println!("HEAD is {}", repo.head_commit);
//! ```

use anyhow::{Context, Result};
use git2::{FetchOptions, RemoteCallbacks, Repository, build::RepoBuilder};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Result of cloning a repository.
#[derive(Debug, Clone)]
pub struct ClonedRepo {
    /// Root of the working tree.
    pub path: PathBuf,
    /// Hex SHA of the checked-out commit.
    pub head_commit: String,
}

/// Whether `url` points at a repository on the local file system.
fn is_local(url: &str) -> bool {
    url.starts_with("file://") || Path::new(url).exists()
}

/// Clones a git repository into `dest`.
///
/// # Arguments
///
/// * `url` - The git URL to clone (HTTPS, SSH or a local path)
/// * `dest` - Directory to clone into; must not exist or be empty
/// * `branch` - Optional branch name to checkout (defaults to the remote's default branch)
///
/// Remote repositories are cloned shallowly, since only the checked-out tree
/// and its last commit are needed.
pub fn clone_repository(url: &str, dest: &Path, branch: Option<&str>) -> Result<ClonedRepo> {
    info!("Cloning {} into {}", url, dest.display());

    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(|progress| {
        if progress.received_objects() == progress.total_objects() {
            debug!(
                "Resolving deltas: {}/{}",
                progress.indexed_deltas(),
                progress.total_deltas()
            );
        } else {
            debug!(
                "Receiving objects: {}/{} ({} bytes)",
                progress.received_objects(),
                progress.total_objects(),
                progress.received_bytes()
            );
        }
        true
    });

    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks);
    if !is_local(url) {
        fetch_opts.depth(1);
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_opts);

    if let Some(branch_name) = branch {
        debug!("Checking out branch: {}", branch_name);
        builder.branch(branch_name);
    }

    let repo = builder
        .clone(url, dest)
        .with_context(|| format!("Failed to clone repository: {}", url))?;

    let head_commit = head_commit(&repo)?;
    info!("Cloning done, HEAD at {}", head_commit);

    Ok(ClonedRepo {
        path: dest.to_path_buf(),
        head_commit,
    })
}

fn head_commit(repo: &Repository) -> Result<String> {
    let commit = repo
        .head()
        .context("Cloned repository has no HEAD")?
        .peel_to_commit()
        .context("HEAD does not point at a commit")?;
    Ok(commit.id().to_string())
}
