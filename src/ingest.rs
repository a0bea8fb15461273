//! Repository Ingestor (§4.D): for one repository, drives the six-step
//! sequence (languages, commits, dated/hourly history, per-commit languages,
//! PR count) against whichever [`GitHubBackend`] it was built with.

use tracing::warn;

use crate::github::GitHubBackend;
use crate::languages::language_for_filename;
use crate::model::{CommitLanguageMix, DatedHistory, HourlyHistory, RepoData, Repository};

const MAX_COMMITS_FOR_LANGUAGE_MIX: u64 = 100;

/// Ingest everything for one repository. `repo` already carries
/// owner/name/is_fork/stargazers from the listing step; this fills in
/// languages, commit history, and PR count.
///
/// Per-step failures degrade gracefully (§4.D: "that repository contributes
/// zero data for that step; the run continues") except the REST fallback for
/// per-commit detail, whose individual failures are logged and skipped.
pub async fn ingest_repository<B: GitHubBackend, D: GitHubBackend>(
    backend: &B,
    detail_backend: &D,
    mut repo: Repository,
) -> RepoData {
    let owner = repo.owner_login.clone();
    let name = repo.name.clone();

    if repo.languages.is_empty() {
        match backend.fetch_languages(&owner, &name).await {
            Ok(langs) => repo.languages = langs,
            Err(e) => warn!(repo = %repo.key(), error = %e, "failed to fetch languages"),
        }
    }

    if repo.default_branch_history.is_empty() {
        match backend.fetch_commits(&owner, &name).await {
            Ok(commits) => repo.default_branch_history = commits,
            Err(e) => {
                warn!(repo = %repo.key(), error = %e, "failed to fetch commits");
                return RepoData::failed(repo, e.to_string());
            }
        }
    }
    repo.commit_count = repo.default_branch_history.len() as u64;

    let dated_history = bin_dated_history(&repo);
    let hourly_history = bin_hourly_history(&repo);

    let commit_languages = if repo.commit_count >= 1 && repo.commit_count <= MAX_COMMITS_FOR_LANGUAGE_MIX {
        fetch_commit_languages(detail_backend, &owner, &name, &repo).await
    } else {
        if repo.commit_count > MAX_COMMITS_FOR_LANGUAGE_MIX {
            warn!(
                repo = %repo.key(),
                commit_count = repo.commit_count,
                "skipping per-commit language mix: repo exceeds the 100-commit cap (§4.D open question a)"
            );
        }
        CommitLanguageMix::new()
    };

    match backend.fetch_prs(&owner, &name).await {
        Ok(count) => repo.pr_count = count,
        Err(e) => warn!(repo = %repo.key(), error = %e, "failed to fetch PR count"),
    }

    RepoData {
        repository: repo,
        dated_history,
        hourly_history,
        commit_languages,
        error: None,
    }
}

fn bin_dated_history(repo: &Repository) -> DatedHistory {
    let mut history = DatedHistory::new();
    for commit in &repo.default_branch_history {
        let day = commit.committed_at.format("%Y-%m-%d").to_string();
        *history.entry(day).or_insert(0) += 1;
    }
    history
}

fn bin_hourly_history(repo: &Repository) -> HourlyHistory {
    let mut history = HourlyHistory::new();
    for commit in &repo.default_branch_history {
        let hour = commit.committed_at.format("%H").to_string().parse::<u8>().unwrap_or(255);
        if hour <= 23 {
            *history.entry(hour).or_insert(0) += 1;
        }
    }
    history
}

async fn fetch_commit_languages<D: GitHubBackend>(
    backend: &D,
    owner: &str,
    name: &str,
    repo: &Repository,
) -> CommitLanguageMix {
    let mut mix = CommitLanguageMix::new();
    for commit in &repo.default_branch_history {
        let files = match &commit.changed_files {
            Some(files) => files.clone(),
            None => match backend.fetch_commit_detail(owner, name, &commit.sha).await {
                Ok(files) => files,
                Err(e) => {
                    warn!(repo = %repo.key(), sha = %commit.sha, error = %e, "failed to fetch commit detail");
                    continue;
                }
            },
        };
        let entry = mix.entry(commit.sha.clone()).or_default();
        for file in files {
            if let Some(lang) = language_for_filename(&file) {
                *entry.entry(lang.to_string()).or_insert(0) += 1;
            }
        }
    }
    mix
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crate::model::CommitRef;

    fn repo_with_commits(hours: &[u8]) -> Repository {
        Repository {
            owner_login: "me".into(),
            name: "r".into(),
            is_fork: false,
            stargazers: 0,
            languages: Default::default(),
            default_branch_history: hours
                .iter()
                .map(|h| {
                    let ts = Utc.with_ymd_and_hms(2024, 1, 1, *h as u32, 0, 0).unwrap();
                    CommitRef {
                        sha: format!("sha-{h}"),
                        committed_at: ts,
                        author_date: ts,
                        changed_files: None,
                    }
                })
                .collect(),
            commit_count: hours.len() as u64,
            pr_count: 0,
        }
    }

    #[test]
    fn bins_hourly_history_from_commit_timestamps() {
        let repo = repo_with_commits(&[9, 9, 10]);
        let history = bin_hourly_history(&repo);
        assert_eq!(history.get(&9), Some(&2));
        assert_eq!(history.get(&10), Some(&1));
    }

    #[test]
    fn bins_dated_history_by_utc_day() {
        let repo = repo_with_commits(&[0, 23]);
        let history = bin_dated_history(&repo);
        assert_eq!(history.get("2024-01-01"), Some(&2));
    }
}
