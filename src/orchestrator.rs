//! Parallel Orchestrator (§4.F): fans the per-repository ingestion sequence
//! across a bounded pool of workers. Grounded in
//! `news-indexer/src/bin/submitter.rs` (`Arc<Semaphore>`, `acquire_owned`,
//! `tokio::spawn`, handle collection, periodic progress logging).

use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Error;
use crate::github::GitHubBackend;
use crate::ingest::ingest_repository;
use crate::model::{RepoData, Repository};

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Ingest every repository in `repos`, at most `concurrency` in flight at
/// once. The result vector is index-preserving: `result[i]` corresponds to
/// `repos[i]` regardless of completion order (§4.F, §5).
pub async fn ingest_all<B>(
    backend: Arc<B>,
    repos: Vec<Repository>,
    concurrency: usize,
    cancel: CancellationToken,
) -> Result<Vec<RepoData>, Error>
where
    B: GitHubBackend + Send + Sync + 'static,
{
    let total = repos.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let results: Arc<Mutex<Vec<Option<RepoData>>>> = Arc::new(Mutex::new(vec![None; total]));
    let mut handles = Vec::with_capacity(total);

    for (index, repo) in repos.into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let permit = tokio::select! {
            p = semaphore.clone().acquire_owned() => p.expect("semaphore never closed"),
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        };
        let backend = backend.clone();
        let results = results.clone();
        let cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let _permit = permit;
            if cancel.is_cancelled() {
                return;
            }
            let data = ingest_repository(backend.as_ref(), backend.as_ref(), repo).await;
            let mut slot = results.lock().await;
            slot[index] = Some(data);
        });
        handles.push(handle);

        if (index + 1) % 20 == 0 || index + 1 == total {
            info!(completed_or_started = index + 1, total, "ingestion progress");
        }
    }

    for handle in handles {
        let _ = handle.await;
    }

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let mut guard = results.lock().await;
    let final_results = std::mem::take(&mut *guard);
    Ok(final_results.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::BulkRepoSummary;
    use crate::model::{CommitRef, LanguageBytes};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingBackend {
        in_flight: Arc<AtomicUsize>,
        max_observed: Arc<AtomicUsize>,
    }

    impl GitHubBackend for CountingBackend {
        async fn list_repos(&self, _login: &str, _exclude_forks: bool) -> Result<Vec<Repository>, Error> {
            Ok(Vec::new())
        }

        async fn fetch_languages(&self, _owner: &str, _repo: &str) -> Result<LanguageBytes, Error> {
            Ok(LanguageBytes::new())
        }

        async fn fetch_commits(&self, _owner: &str, _repo: &str) -> Result<Vec<CommitRef>, Error> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_observed.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn fetch_commit_detail(
            &self,
            _owner: &str,
            _repo: &str,
            _sha: &str,
        ) -> Result<Vec<String>, Error> {
            Ok(Vec::new())
        }

        async fn fetch_prs(&self, _owner: &str, _repo: &str) -> Result<u64, Error> {
            Ok(0)
        }

        async fn fetch_bulk(&self, _login: &str) -> Result<Option<Vec<BulkRepoSummary>>, Error> {
            Ok(None)
        }
    }

    fn repo(n: usize) -> Repository {
        Repository {
            owner_login: "me".into(),
            name: format!("r{n}"),
            is_fork: false,
            stargazers: 0,
            languages: LanguageBytes::new(),
            default_branch_history: Vec::new(),
            commit_count: 0,
            pr_count: 0,
        }
    }

    #[tokio::test]
    async fn never_exceeds_the_concurrency_cap() {
        //* Given
        let backend = Arc::new(CountingBackend {
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_observed: Arc::new(AtomicUsize::new(0)),
        });
        let repos: Vec<Repository> = (0..20).map(repo).collect();

        //* When
        let result = ingest_all(backend.clone(), repos, 3, CancellationToken::new())
            .await
            .unwrap();

        //* Then
        assert_eq!(result.len(), 20);
        assert!(backend.max_observed.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn preserves_input_order_in_results() {
        //* Given
        let backend = Arc::new(CountingBackend {
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_observed: Arc::new(AtomicUsize::new(0)),
        });
        let repos: Vec<Repository> = (0..5).map(repo).collect();

        //* When
        let result = ingest_all(backend, repos, 5, CancellationToken::new())
            .await
            .unwrap();

        //* Then
        for (i, data) in result.iter().enumerate() {
            assert_eq!(data.repository.name, format!("r{i}"));
        }
    }
}
