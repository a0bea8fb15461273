//! REST backend: the slow path and the source of truth for per-commit
//! changed files. Grounded in `news-indexer`'s `index_github_repos.rs` /
//! `index_github_issues.rs` (header parsing, pagination loop shape, header
//! names).

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Error;
use crate::github::types::{RestCommit, RestCommitDetailResponse, RestRepo};
use crate::github::GitHubBackend;
use crate::model::{CommitRef, LanguageBytes, Repository};
use crate::pagination::{paginate_offset, PageSignal, DEFAULT_PAGE_SIZE};
use crate::rate_limiter::RateGovernor;
use crate::retry::{with_retry, Failure};

const GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT_VALUE: &str = "gh-profile-stats/0.1";

pub struct RestBackend<'a> {
    client: Client,
    token: String,
    governor: &'a RateGovernor,
    cancel: &'a CancellationToken,
}

impl<'a> RestBackend<'a> {
    pub fn new(client: Client, token: String, governor: &'a RateGovernor, cancel: &'a CancellationToken) -> Self {
        Self {
            client,
            token,
            governor,
            cancel,
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .expect("token must be header-safe ASCII"),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));
        headers
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<(T, reqwest::header::HeaderMap, reqwest::StatusCode), Error> {
        let client = &self.client;
        let headers = self.headers();
        let response = with_retry(self.cancel, || {
            let client = client.clone();
            let headers = headers.clone();
            let url = url.to_string();
            async move {
                let resp = client
                    .get(&url)
                    .headers(headers)
                    .send()
                    .await
                    .map_err(|e| Failure {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    })?;
                let status = resp.status();
                if !status.is_success() {
                    let text = resp.text().await.unwrap_or_default();
                    return Err(Failure {
                        message: format!("status {status}: {text}"),
                        status: Some(status.as_u16()),
                    });
                }
                Ok(resp)
            }
        })
        .await?;

        let status = response.status();
        let rate_headers = extract_rate_headers(response.headers());
        let headers_clone = response.headers().clone();
        let body: T = response.json().await?;
        self.governor
            .record(rate_headers.0, rate_headers.1, rate_headers.2)
            .await;
        Ok((body, headers_clone, status))
    }
}

fn extract_rate_headers(headers: &reqwest::header::HeaderMap) -> (u64, u64, i64) {
    let remaining = header_u64(headers, "x-ratelimit-remaining").unwrap_or(u64::MAX);
    let limit = header_u64(headers, "x-ratelimit-limit").unwrap_or(u64::MAX);
    let reset = header_u64(headers, "x-ratelimit-reset").unwrap_or(0) as i64;
    (remaining, limit, reset)
}

fn header_u64(headers: &reqwest::header::HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

fn header_u32(headers: &reqwest::header::HeaderMap, name: &str) -> Option<u32> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

impl<'a> GitHubBackend for RestBackend<'a> {
    async fn list_repos(&self, login: &str, exclude_forks: bool) -> Result<Vec<Repository>, Error> {
        let repos: Vec<RestRepo> = paginate_offset(self.governor, self.cancel, |page| async move {
            let url = format!(
                "{GITHUB_API_URL}/user/repos?affiliation=owner&per_page={DEFAULT_PAGE_SIZE}&page={page}"
            );
            let (items, headers, _status): (Vec<RestRepo>, _, _) = self.get_json(&url).await?;
            let next_page = header_u32(&headers, "x-next-page").or(if items.is_empty() {
                Some(0)
            } else {
                None
            });
            let signal = PageSignal {
                remaining: header_u64(&headers, "x-ratelimit-remaining").unwrap_or(u64::MAX),
                limit: header_u64(&headers, "x-ratelimit-limit").unwrap_or(u64::MAX),
                reset_at: header_u64(&headers, "x-ratelimit-reset").unwrap_or(0) as i64,
                next_page,
                item_count: items.len(),
            };
            Ok((items, signal))
        })
        .await?;

        let repos = repos
            .into_iter()
            .map(|r| Repository {
                owner_login: r.owner.login,
                name: r.name,
                is_fork: r.fork,
                stargazers: r.stargazers_count,
                languages: LanguageBytes::new(),
                default_branch_history: Vec::new(),
                commit_count: 0,
                pr_count: 0,
            })
            .filter(|r| !(exclude_forks && r.is_fork))
            .collect();

        debug!(%login, "listed repositories via REST");
        Ok(repos)
    }

    async fn fetch_languages(&self, owner: &str, repo: &str) -> Result<LanguageBytes, Error> {
        self.governor.wait_if_needed(self.cancel).await?;
        let url = format!("{GITHUB_API_URL}/repos/{owner}/{repo}/languages");
        let (body, _headers, _status): (LanguageBytes, _, _) = self.get_json(&url).await?;
        Ok(body)
    }

    async fn fetch_commits(&self, owner: &str, repo: &str) -> Result<Vec<CommitRef>, Error> {
        let owner = owner.to_string();
        let repo = repo.to_string();
        let commits: Vec<RestCommit> = paginate_offset(self.governor, self.cancel, |page| {
            let owner = owner.clone();
            let repo = repo.clone();
            async move {
                let url = format!(
                    "{GITHUB_API_URL}/repos/{owner}/{repo}/commits?per_page={DEFAULT_PAGE_SIZE}&page={page}"
                );
                let (items, headers, _status): (Vec<RestCommit>, _, _) = self.get_json(&url).await?;
                let next_page = header_u32(&headers, "x-next-page").or(if items.is_empty() {
                    Some(0)
                } else {
                    None
                });
                let signal = PageSignal {
                    remaining: header_u64(&headers, "x-ratelimit-remaining").unwrap_or(u64::MAX),
                    limit: header_u64(&headers, "x-ratelimit-limit").unwrap_or(u64::MAX),
                    reset_at: header_u64(&headers, "x-ratelimit-reset").unwrap_or(0) as i64,
                    next_page,
                    item_count: items.len(),
                };
                Ok((items, signal))
            }
        })
        .await?;

        Ok(commits
            .into_iter()
            .filter_map(|c| {
                let committed_at = c.commit.committer.as_ref().and_then(|a| a.date)?;
                let author_date = c.commit.author.as_ref().and_then(|a| a.date).unwrap_or(committed_at);
                Some(CommitRef {
                    sha: c.sha,
                    committed_at,
                    author_date,
                    changed_files: None,
                })
            })
            .collect())
    }

    async fn fetch_commit_detail(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<String>, Error> {
        self.governor.wait_if_needed(self.cancel).await?;
        let url = format!("{GITHUB_API_URL}/repos/{owner}/{repo}/commits/{sha}");
        let (body, _headers, _status): (RestCommitDetailResponse, _, _) = self.get_json(&url).await?;
        Ok(body.files.into_iter().map(|f| f.filename).collect())
    }

    async fn fetch_prs(&self, owner: &str, repo: &str) -> Result<u64, Error> {
        let prs: Vec<serde_json::Value> = paginate_offset(self.governor, self.cancel, |page| async move {
            let url = format!(
                "{GITHUB_API_URL}/repos/{owner}/{repo}/pulls?state=all&per_page={DEFAULT_PAGE_SIZE}&page={page}"
            );
            let (items, headers, _status): (Vec<serde_json::Value>, _, _) = self.get_json(&url).await?;
            let next_page = header_u32(&headers, "x-next-page").or(if items.is_empty() {
                Some(0)
            } else {
                None
            });
            let signal = PageSignal {
                remaining: header_u64(&headers, "x-ratelimit-remaining").unwrap_or(u64::MAX),
                limit: header_u64(&headers, "x-ratelimit-limit").unwrap_or(u64::MAX),
                reset_at: header_u64(&headers, "x-ratelimit-reset").unwrap_or(0) as i64,
                next_page,
                item_count: items.len(),
            };
            Ok((items, signal))
        })
        .await?;
        Ok(prs.len() as u64)
    }
}
