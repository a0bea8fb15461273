//! GraphQL fast path (§4.D, §9): bulk repository/language/history/stargazer
//! data in a handful of queries. Query shape (cursor pagination, field
//! names) follows `rnaudi-gh-log/src/github.rs`'s `fetch_prs`; here it is
//! generalized from "search PRs" to "list the viewer's repositories with
//! languages and default-branch history".

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::github::{BulkRepoSummary, GitHubBackend};
use crate::model::{CommitRef, LanguageBytes, Repository};
use crate::pagination::{paginate_cursor, CursorSignal};
use crate::rate_limiter::RateGovernor;
use crate::retry::{with_retry, Failure};

const GRAPHQL_URL: &str = "https://api.github.com/graphql";
const REPOS_PAGE_SIZE: usize = 50;
const HISTORY_PAGE_SIZE: usize = 100;

pub struct GraphQlBackend<'a> {
    client: Client,
    token: String,
    governor: &'a RateGovernor,
    cancel: &'a CancellationToken,
}

impl<'a> GraphQlBackend<'a> {
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
        headers.insert(USER_AGENT, HeaderValue::from_static("gh-profile-stats/0.1"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .expect("token must be header-safe ASCII"),
        );
        headers
    }

    /// The `Viewer` query (§6): resolves the authenticated identity so the
    /// Workflow Driver can refuse any non-self target (§4.H step 2).
    pub async fn fetch_viewer_login(&self) -> Result<String, Error> {
        #[derive(Debug, Deserialize)]
        struct Data {
            viewer: Viewer,
        }
        #[derive(Debug, Deserialize)]
        struct Viewer {
            login: String,
        }
        let data: Data = self.query("{ viewer { login } }").await?;
        Ok(data.viewer.login)
    }

    async fn query<T: serde::de::DeserializeOwned>(&self, query: &str) -> Result<T, Error> {
        let client = &self.client;
        let headers = self.headers();
        with_retry(self.cancel, || {
            let client = client.clone();
            let headers = headers.clone();
            let body = serde_json::json!({ "query": query });
            async move {
                let resp = client
                    .post(GRAPHQL_URL)
                    .headers(headers)
                    .json(&body)
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
                let envelope: GraphQlEnvelope<T> = resp.json().await.map_err(|e| Failure {
                    message: e.to_string(),
                    status: None,
                })?;
                if let Some(errors) = envelope.errors {
                    let joined = errors.into_iter().map(|e| e.message).collect::<Vec<_>>().join(", ");
                    return Err(Failure {
                        message: format!("graphql error: {joined}"),
                        status: None,
                    });
                }
                envelope.data.ok_or_else(|| Failure {
                    message: "graphql response had no data".to_string(),
                    status: None,
                })
            }
        })
        .await
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ReposQueryData {
    viewer: ReposViewer,
}

#[derive(Debug, Deserialize)]
struct ReposViewer {
    repositories: ReposConnection,
}

#[derive(Debug, Deserialize)]
struct ReposConnection {
    nodes: Vec<ReposNode>,
    #[serde(rename = "pageInfo")]
    page_info: GraphQlPageInfo,
}

#[derive(Debug, Deserialize)]
struct GraphQlPageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReposNode {
    name: String,
    #[serde(rename = "isFork")]
    is_fork: bool,
    #[serde(rename = "stargazerCount")]
    stargazer_count: u64,
    owner: ReposOwner,
    languages: Option<LanguageConnection>,
    #[serde(rename = "defaultBranchRef")]
    default_branch_ref: Option<DefaultBranchRef>,
}

#[derive(Debug, Deserialize)]
struct ReposOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct LanguageConnection {
    edges: Vec<LanguageEdge>,
}

#[derive(Debug, Deserialize)]
struct LanguageEdge {
    size: u64,
    node: LanguageNode,
}

#[derive(Debug, Deserialize)]
struct LanguageNode {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DefaultBranchRef {
    target: Option<CommitTarget>,
}

#[derive(Debug, Deserialize)]
struct CommitTarget {
    history: Option<CommitHistoryConnection>,
}

#[derive(Debug, Deserialize)]
struct CommitHistoryConnection {
    nodes: Vec<CommitHistoryNode>,
}

#[derive(Debug, Deserialize)]
struct CommitHistoryNode {
    oid: String,
    #[serde(rename = "committedDate")]
    committed_date: DateTime<Utc>,
}

impl<'a> GitHubBackend for GraphQlBackend<'a> {
    async fn list_repos(&self, login: &str, exclude_forks: bool) -> Result<Vec<Repository>, Error> {
        let bulk = self.fetch_bulk(login).await?.unwrap_or_default();
        Ok(bulk
            .into_iter()
            .map(|b| b.repository)
            .filter(|r| !(exclude_forks && r.is_fork))
            .collect())
    }

    async fn fetch_languages(&self, owner: &str, repo: &str) -> Result<LanguageBytes, Error> {
        // The bulk query already embeds languages per repository; this
        // single-repo form exists to satisfy the shared capability set when
        // the ingestor falls back per-repository (e.g. after a partial bulk
        // failure).
        let query = format!(
            r#"{{ repository(owner: "{owner}", name: "{repo}") {{ languages(first: 20, orderBy: {{field: SIZE, direction: DESC}}) {{ edges {{ size node {{ name }} }} }} }} }}"#
        );
        #[derive(Debug, Deserialize)]
        struct Data {
            repository: Option<RepoLanguagesOnly>,
        }
        #[derive(Debug, Deserialize)]
        struct RepoLanguagesOnly {
            languages: Option<LanguageConnection>,
        }
        let data: Data = self.query(&query).await?;
        let mut bytes = LanguageBytes::new();
        if let Some(conn) = data.repository.and_then(|r| r.languages) {
            for edge in conn.edges {
                bytes.insert(edge.node.name, edge.size);
            }
        }
        Ok(bytes)
    }

    async fn fetch_commits(&self, owner: &str, repo: &str) -> Result<Vec<CommitRef>, Error> {
        let owner = owner.to_string();
        let repo = repo.to_string();
        paginate_cursor(self.governor, self.cancel, |cursor| {
            let owner = owner.clone();
            let repo = repo.clone();
            async move {
                let after_clause = cursor
                    .as_ref()
                    .map(|c| format!(r#", after: "{c}""#))
                    .unwrap_or_default();
                let query = format!(
                    r#"{{ repository(owner: "{owner}", name: "{repo}") {{ defaultBranchRef {{ target {{ ... on Commit {{ history(first: {HISTORY_PAGE_SIZE}{after_clause}) {{ pageInfo {{ hasNextPage endCursor }} nodes {{ oid committedDate }} }} }} }} }} }} }}"#
                );
                #[derive(Debug, Deserialize)]
                struct Data {
                    repository: Option<RepoHistoryOnly>,
                }
                #[derive(Debug, Deserialize)]
                struct RepoHistoryOnly {
                    #[serde(rename = "defaultBranchRef")]
                    default_branch_ref: Option<DefaultBranchRefHistory>,
                }
                #[derive(Debug, Deserialize)]
                struct DefaultBranchRefHistory {
                    target: Option<TargetHistory>,
                }
                #[derive(Debug, Deserialize)]
                struct TargetHistory {
                    history: Option<HistoryConnection>,
                }
                #[derive(Debug, Deserialize)]
                struct HistoryConnection {
                    #[serde(rename = "pageInfo")]
                    page_info: GraphQlPageInfo,
                    nodes: Vec<CommitHistoryNode>,
                }

                let data: Data = self.query(&query).await?;
                let history = data
                    .repository
                    .and_then(|r| r.default_branch_ref)
                    .and_then(|b| b.target)
                    .and_then(|t| t.history);
                let (nodes, page_info) = match history {
                    Some(h) => (h.nodes, h.page_info),
                    None => (
                        Vec::new(),
                        GraphQlPageInfo {
                            has_next_page: false,
                            end_cursor: None,
                        },
                    ),
                };
                let commits = nodes
                    .into_iter()
                    .map(|n| CommitRef {
                        sha: n.oid,
                        committed_at: n.committed_date,
                        author_date: n.committed_date,
                        changed_files: None,
                    })
                    .collect();
                let signal = CursorSignal {
                    has_next_page: page_info.has_next_page,
                    end_cursor: page_info.end_cursor,
                };
                Ok((commits, signal))
            }
        })
        .await
    }

    async fn fetch_commit_detail(
        &self,
        _owner: &str,
        _repo: &str,
        _sha: &str,
    ) -> Result<Vec<String>, Error> {
        // Per §4.D, per-commit changed files come from REST; the GraphQL
        // backend never sees individual commit detail requests in practice
        // because the ingestor routes that step to the REST backend.
        Ok(Vec::new())
    }

    async fn fetch_prs(&self, owner: &str, repo: &str) -> Result<u64, Error> {
        let query = format!(
            r#"{{ repository(owner: "{owner}", name: "{repo}") {{ pullRequests {{ totalCount }} }} }}"#
        );
        #[derive(Debug, Deserialize)]
        struct Data {
            repository: Option<RepoPrsOnly>,
        }
        #[derive(Debug, Deserialize)]
        struct RepoPrsOnly {
            #[serde(rename = "pullRequests")]
            pull_requests: PrConnectionCount,
        }
        #[derive(Debug, Deserialize)]
        struct PrConnectionCount {
            #[serde(rename = "totalCount")]
            total_count: u64,
        }
        let data: Data = self.query(&query).await?;
        Ok(data.repository.map(|r| r.pull_requests.total_count).unwrap_or(0))
    }

    async fn fetch_bulk(&self, login: &str) -> Result<Option<Vec<BulkRepoSummary>>, Error> {
        let mut all = Vec::new();
        let login = login.to_string();
        let items = paginate_cursor(self.governor, self.cancel, |cursor| {
            let login = login.clone();
            async move {
                let after_clause = cursor
                    .as_ref()
                    .map(|c| format!(r#", after: "{c}""#))
                    .unwrap_or_default();
                let query = format!(
                    r#"{{ viewer {{ login repositories(first: {REPOS_PAGE_SIZE}, ownerAffiliations: OWNER{after_clause}) {{ pageInfo {{ hasNextPage endCursor }} nodes {{ name isFork stargazerCount owner {{ login }} languages(first: 20, orderBy: {{field: SIZE, direction: DESC}}) {{ edges {{ size node {{ name }} }} }} defaultBranchRef {{ target {{ ... on Commit {{ history(first: {HISTORY_PAGE_SIZE}) {{ nodes {{ oid committedDate }} }} }} }} }} }} }} }} }}"#
                );
                let data: ReposQueryData = self.query(&query).await?;
                let signal = CursorSignal {
                    has_next_page: data.viewer.repositories.page_info.has_next_page,
                    end_cursor: data.viewer.repositories.page_info.end_cursor,
                };
                Ok((data.viewer.repositories.nodes, signal))
            }
        })
        .await?;

        for node in items {
            let mut languages = LanguageBytes::new();
            if let Some(conn) = node.languages {
                for edge in conn.edges {
                    languages.insert(edge.node.name, edge.size);
                }
            }
            let default_branch_history = node
                .default_branch_ref
                .and_then(|b| b.target)
                .and_then(|t| t.history)
                .map(|h| {
                    h.nodes
                        .into_iter()
                        .map(|n| CommitRef {
                            sha: n.oid,
                            committed_at: n.committed_date,
                            author_date: n.committed_date,
                            changed_files: None,
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            let commit_count = default_branch_history.len() as u64;

            all.push(BulkRepoSummary {
                repository: Repository {
                    owner_login: node.owner.login,
                    name: node.name,
                    is_fork: node.is_fork,
                    stargazers: node.stargazer_count,
                    languages,
                    default_branch_history,
                    commit_count,
                    pr_count: 0,
                },
            });
        }

        Ok(Some(all))
    }
}
