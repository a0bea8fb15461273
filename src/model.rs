//! Data model shared across ingestion, aggregation, and rendering (§3).
//!
//! Everything here is tree-shaped and lives only for the duration of a run;
//! nothing is persisted except the rendered charts and README.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated principal executing the run. The only valid data subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub login: String,
    pub id: String,
}

/// A single commit on a repository's default branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRef {
    pub sha: String,
    pub committed_at: DateTime<Utc>,
    pub author_date: DateTime<Utc>,
    pub changed_files: Option<Vec<String>>,
}

/// Mapping from language name to byte count, as reported by the languages endpoint.
pub type LanguageBytes = BTreeMap<String, u64>;

/// Mapping `YYYY-MM-DD` (UTC) -> commit count.
pub type DatedHistory = BTreeMap<String, u64>;

/// Mapping hour-of-day (0..23, UTC) -> commit count.
pub type HourlyHistory = BTreeMap<u8, u64>;

/// Mapping `commit_sha` -> mapping<language, occurrence_count>.
pub type CommitLanguageMix = BTreeMap<String, BTreeMap<String, u64>>;

/// One repository's harvested data. The composite key `owner_login/name`
/// uniquely identifies a repository within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub owner_login: String,
    pub name: String,
    pub is_fork: bool,
    pub stargazers: u64,
    pub languages: LanguageBytes,
    pub default_branch_history: Vec<CommitRef>,
    pub commit_count: u64,
    pub pr_count: u64,
}

impl Repository {
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner_login, self.name)
    }
}

/// Everything the Parallel Orchestrator collected for one repository, or the
/// reason it couldn't (§4.F: failures are captured per-task, never fatal).
#[derive(Debug, Clone)]
pub struct RepoData {
    pub repository: Repository,
    pub dated_history: DatedHistory,
    pub hourly_history: HourlyHistory,
    pub commit_languages: CommitLanguageMix,
    pub error: Option<String>,
}

impl RepoData {
    pub fn failed(repository: Repository, reason: impl Into<String>) -> Self {
        RepoData {
            repository,
            dated_history: DatedHistory::new(),
            hourly_history: HourlyHistory::new(),
            commit_languages: CommitLanguageMix::new(),
            error: Some(reason.into()),
        }
    }
}

/// One entry of the ranked-language-list aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLanguage {
    pub lang: String,
    pub bytes: u64,
    pub percentage: f64,
}

/// Totals shown on the summary card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    pub stars: u64,
    pub repo_count: u64,
    pub commits: u64,
    pub prs: u64,
}

/// The full set of aggregates the Workflow Driver hands to the chart renderer.
#[derive(Debug, Clone, Default)]
pub struct AggregateMetrics {
    pub ranked_languages: Vec<RankedLanguage>,
    pub summary: SummaryTotals,
    pub commit_history: DatedHistory,
    pub hourly_distribution: HourlyHistory,
    pub top_commit_languages: Vec<(String, u64)>,
}
