//! Repository Ingestor's two backends (§4.D, §9: "capability set... inject
//! one implementation"). [`GitHubBackend`] is the shared interface; `rest`
//! is the REST implementation (also the source of truth for per-commit
//! changed files), `graphql` is the bulk fast path.

pub mod graphql;
pub mod rest;
pub mod types;

use crate::error::Error;
use crate::model::{CommitRef, LanguageBytes, Repository};

/// A bulk summary the GraphQL fast path can produce for one repository in a
/// single round trip: everything except per-commit changed files, which only
/// the REST backend can provide (§4.D: "REST is the fallback and source of
/// truth for per-commit changed files").
#[derive(Debug, Clone)]
pub struct BulkRepoSummary {
    pub repository: Repository,
}

/// The five operations the Repository Ingestor drives (§9). Both backends
/// implement the full set so the ingestor can be written once against the
/// trait; only the GraphQL backend additionally offers [`fetch_bulk`].
///
/// [`fetch_bulk`]: GitHubBackend::fetch_bulk
pub trait GitHubBackend {
    async fn list_repos(&self, login: &str, exclude_forks: bool) -> Result<Vec<Repository>, Error>;

    async fn fetch_languages(&self, owner: &str, repo: &str) -> Result<LanguageBytes, Error>;

    async fn fetch_commits(&self, owner: &str, repo: &str) -> Result<Vec<CommitRef>, Error>;

    async fn fetch_commit_detail(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<String>, Error>;

    async fn fetch_prs(&self, owner: &str, repo: &str) -> Result<u64, Error>;

    /// The GraphQL fast path (§4.D). `None` means this backend has no bulk
    /// shortcut and the ingestor must fall back to the five operations above.
    async fn fetch_bulk(&self, _login: &str) -> Result<Option<Vec<BulkRepoSummary>>, Error> {
        Ok(None)
    }
}
