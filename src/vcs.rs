//! VCS adapter (§6): shells out to `git` to detect whether the working
//! directory is a repository, whether the generated files changed anything,
//! and to commit/push that change under a caller-supplied remote, branch,
//! and write-scoped token. Grounded in
//! `Philippe-arnd-Ink-Gateway/src/git.rs`'s `run_git` idiom.

use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::error::Error;

/// Committer identity resolved from `GITHUB_ACTOR`, falling back to the
/// standard Actions bot identity (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    /// Resolve from `GITHUB_ACTOR`. When unset, falls back to
    /// `github-actions[bot]` / `github-actions[bot]@users.noreply.github.com`.
    pub fn from_env() -> Self {
        match std::env::var("GITHUB_ACTOR") {
            Ok(actor) if !actor.trim().is_empty() => Identity {
                email: format!("{actor}@users.noreply.github.com"),
                name: actor,
            },
            _ => Identity {
                name: "github-actions[bot]".to_string(),
                email: "github-actions[bot]@users.noreply.github.com".to_string(),
            },
        }
    }
}

fn run_git(repo: &Path, args: &[&str]) -> Result<String, Error> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .map_err(|e| Error::Io(format!("failed to spawn git {args:?}: {e}")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(Error::Io(format!("git {args:?} failed: {stderr}")))
    }
}

/// `true` when `dir` is inside a git working tree.
pub fn is_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// `true` when the working tree has uncommitted changes.
pub fn has_changes(repo: &Path) -> Result<bool, Error> {
    let status = run_git(repo, &["status", "--porcelain"])?;
    Ok(!status.is_empty())
}

/// Stage everything and commit under the resolved identity. No-op (returns
/// `Ok(())`) if nothing is staged after `git add`.
pub fn commit(repo: &Path, identity: &Identity, message: &str) -> Result<(), Error> {
    run_git(repo, &["add", "."])?;

    let nothing_staged = run_git(repo, &["diff", "--cached", "--quiet"]).is_ok();
    if nothing_staged {
        info!("nothing staged after git add, skipping commit");
        return Ok(());
    }

    run_git(
        repo,
        &[
            "-c",
            &format!("user.name={}", identity.name),
            "-c",
            &format!("user.email={}", identity.email),
            "commit",
            "-m",
            message,
        ],
    )?;
    Ok(())
}

/// The name of the current branch (`git rev-parse --abbrev-ref HEAD`).
pub fn current_branch(repo: &Path) -> Result<String, Error> {
    run_git(repo, &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// Push `branch` to `remote`. When `token` is set, authenticates the push
/// with a one-shot `http.extraheader` override instead of rewriting the
/// remote URL, so the token never lands in `.git/config` (§6: the VCS
/// adapter takes the write-scoped token as a parameter rather than reading
/// it itself).
pub fn push(repo: &Path, remote: &str, branch: &str, token: Option<&str>) -> Result<(), Error> {
    match token {
        Some(t) if !t.is_empty() => {
            let header = format!("http.extraheader=AUTHORIZATION: bearer {t}");
            run_git(repo, &["-c", &header, "push", remote, branch])?;
        }
        _ => {
            run_git(repo, &["push", remote, branch])?;
        }
    }
    Ok(())
}
