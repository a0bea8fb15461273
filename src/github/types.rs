//! Wire types for the REST backend. The GraphQL backend defines its query
//! response shapes locally in `graphql.rs`, scoped to the query that needs
//! them, since each bulk/single-repo query selects a different subset of
//! fields.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RestRepo {
    pub name: String,
    pub fork: bool,
    #[serde(default)]
    pub stargazers_count: u64,
    pub owner: RestOwner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestOwner {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestCommit {
    pub sha: String,
    pub commit: RestCommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestCommitDetail {
    pub author: Option<RestCommitAuthor>,
    pub committer: Option<RestCommitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestCommitAuthor {
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestCommitDetailResponse {
    pub sha: String,
    #[serde(default)]
    pub files: Vec<RestCommitFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestCommitFile {
    pub filename: String,
}
