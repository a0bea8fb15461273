//! Workflow Driver (§4.H): the linear, early-failing pipeline from config to
//! a pushed commit. Grounded in the teacher's `run_view_mode`/`run_print_mode`
//! — load config, fetch, transform, render — generalized from "one month of
//! PRs" to "one full profile run".

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aggregate::{
    aggregate_dated_history, aggregate_hourly, filter_by_threshold, rank_languages, sum_languages,
    summary_totals, top_commit_languages,
};
use crate::chart::render_all;
use crate::config::Config;
use crate::error::Error;
use crate::github::graphql::GraphQlBackend;
use crate::github::rest::RestBackend;
use crate::github::GitHubBackend;
use crate::model::{AggregateMetrics, RepoData};
use crate::orchestrator::ingest_all;
use crate::rate_limiter::RateGovernor;
use crate::readme::{normalize_tag, update_section, validate_tags};
use crate::vcs;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DIAL_TIMEOUT: Duration = Duration::from_secs(30);
const COMMIT_MESSAGE: &str = "chore: update profile stats";
const PUSH_REMOTE: &str = "origin";
const LANGUAGE_THRESHOLD_PERCENT: f64 = 0.0;
const EXCLUDED_LANGUAGES: &[&str] = &[];

/// One (tag name, chart file, title) triple the README gets updated with
/// (§4.H step 6).
const SECTIONS: &[(&str, &str, &str)] = &[
    ("LANGUAGE_STATS", "language_chart.svg", "Most Used Languages"),
    ("COMMIT_HISTORY", "commit_history_chart.svg", "Commit History"),
    ("COMMIT_TIME", "commit_time_chart.svg", "Commit Times"),
    ("COMMIT_LANGUAGES", "commit_languages_chart.svg", "Languages Touched by Commits"),
    ("SUMMARY_STATS", "summary_card.svg", "Summary"),
];

fn build_client() -> Result<Client, Error> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(DIAL_TIMEOUT)
        .build()
        .map_err(Error::from)
}

fn build_metrics(results: &[RepoData]) -> AggregateMetrics {
    let language_totals = sum_languages(results);
    let ranked = rank_languages(&language_totals);
    let ranked_languages = filter_by_threshold(ranked, LANGUAGE_THRESHOLD_PERCENT);

    let exclude: Vec<String> = EXCLUDED_LANGUAGES.iter().map(|s| s.to_string()).collect();

    AggregateMetrics {
        ranked_languages,
        summary: summary_totals(results),
        commit_history: aggregate_dated_history(results),
        hourly_distribution: aggregate_hourly(results),
        top_commit_languages: top_commit_languages(results, &exclude),
    }
}

/// Run the full pipeline once. `output_dir` also holds `README.md`.
pub async fn run(config: Config, cancel: CancellationToken) -> Result<(), Error> {
    let output_dir = Path::new(&config.output_dir);
    let readme_path = output_dir.join("README.md");

    info!("validating README tags before spending the ingestion budget");
    for (name, _, _) in SECTIONS {
        let tags = normalize_tag(name)?;
        match validate_tags(&readme_path, &tags.start, &tags.end) {
            Ok(()) => {}
            Err(Error::TagMissing(_)) => {
                info!(tag = %name, "tag pair missing, will be appended");
            }
            Err(e) => return Err(e),
        }
    }

    let client = build_client()?;
    let governor = RateGovernor::default();

    info!(username = %config.username, "resolving authenticated identity");
    let identity_login = {
        let graphql = GraphQlBackend::new(client.clone(), config.token_read.clone(), &governor, &cancel);
        graphql.fetch_viewer_login().await?
    };
    if identity_login != config.username {
        return Err(Error::Authorization(format!(
            "authenticated identity `{identity_login}` does not match GITHUB_USERNAME `{}`",
            config.username
        )));
    }

    info!("starting ingestion");
    let results = ingest(&client, &config, &cancel).await?;
    info!(repo_count = results.len(), "ingestion complete");

    let metrics = build_metrics(&results);

    std::fs::create_dir_all(output_dir)?;
    for chart in render_all(&metrics) {
        let path = output_dir.join(chart.filename);
        std::fs::write(&path, chart.svg)?;
        info!(path = %path.display(), "wrote chart");
    }

    for (name, filename, title) in SECTIONS {
        let tags = normalize_tag(name)?;
        let content = format!("![{title}]({filename})");
        update_section(&readme_path, &tags.start, &tags.end, &content)?;
    }
    info!(path = %readme_path.display(), "README updated");

    if config.dry_run {
        info!("dry run: skipping commit/push");
        return Ok(());
    }

    if vcs::is_repo(output_dir) && vcs::has_changes(output_dir)? {
        let identity = vcs::Identity::from_env();
        vcs::commit(output_dir, &identity, COMMIT_MESSAGE)?;
        let branch = vcs::current_branch(output_dir)?;
        vcs::push(output_dir, PUSH_REMOTE, &branch, Some(&config.token_write))?;
        info!("pushed updated profile");
    } else {
        info!("no changes to commit");
    }

    Ok(())
}

/// Prefer the GraphQL bulk fast path; fall back to per-repo REST ingestion
/// when the bulk query yields nothing (§4.D).
async fn ingest(client: &Client, config: &Config, cancel: &CancellationToken) -> Result<Vec<RepoData>, Error> {
    let read_governor = RateGovernor::default();
    let graphql = GraphQlBackend::new(client.clone(), config.token_read.clone(), &read_governor, cancel);

    let repos = match graphql.fetch_bulk(&config.username).await {
        Ok(Some(bulk)) if !bulk.is_empty() => {
            info!(count = bulk.len(), "using GraphQL bulk fast path");
            bulk.into_iter()
                .map(|b| b.repository)
                .filter(|r| !(config.exclude_forks && r.is_fork))
                .collect()
        }
        Ok(_) => {
            warn!("GraphQL bulk path returned no repositories, falling back to REST listing");
            list_repos_via_rest(client, config, cancel).await?
        }
        Err(e) => {
            warn!(error = %e, "GraphQL bulk path failed, falling back to REST listing");
            list_repos_via_rest(client, config, cancel).await?
        }
    };

    let backend = Arc::new(RestAndGraphQlBackend {
        client: client.clone(),
        token_read: config.token_read.clone(),
    });
    ingest_all(backend, repos, config.concurrency, cancel.clone()).await
}

async fn list_repos_via_rest(
    client: &Client,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<Vec<crate::model::Repository>, Error> {
    let governor = RateGovernor::default();
    let rest = RestBackend::new(client.clone(), config.token_read.clone(), &governor, cancel);
    rest.list_repos(&config.username, config.exclude_forks).await
}

/// A per-task [`GitHubBackend`] that owns its rate governor and builds a
/// fresh REST backend for the lifetime of each call. The orchestrator needs
/// `'static` backends to spawn tasks with, so this owns its client/token
/// rather than borrowing a governor the way [`RestBackend`] does.
struct RestAndGraphQlBackend {
    client: Client,
    token_read: String,
}

impl GitHubBackend for RestAndGraphQlBackend {
    async fn list_repos(&self, login: &str, exclude_forks: bool) -> Result<Vec<crate::model::Repository>, Error> {
        let governor = RateGovernor::default();
        let cancel = CancellationToken::new();
        let rest = RestBackend::new(self.client.clone(), self.token_read.clone(), &governor, &cancel);
        rest.list_repos(login, exclude_forks).await
    }

    async fn fetch_languages(&self, owner: &str, repo: &str) -> Result<crate::model::LanguageBytes, Error> {
        let governor = RateGovernor::default();
        let cancel = CancellationToken::new();
        let rest = RestBackend::new(self.client.clone(), self.token_read.clone(), &governor, &cancel);
        rest.fetch_languages(owner, repo).await
    }

    async fn fetch_commits(&self, owner: &str, repo: &str) -> Result<Vec<crate::model::CommitRef>, Error> {
        let governor = RateGovernor::default();
        let cancel = CancellationToken::new();
        let rest = RestBackend::new(self.client.clone(), self.token_read.clone(), &governor, &cancel);
        rest.fetch_commits(owner, repo).await
    }

    async fn fetch_commit_detail(&self, owner: &str, repo: &str, sha: &str) -> Result<Vec<String>, Error> {
        let governor = RateGovernor::default();
        let cancel = CancellationToken::new();
        let rest = RestBackend::new(self.client.clone(), self.token_read.clone(), &governor, &cancel);
        rest.fetch_commit_detail(owner, repo, sha).await
    }

    async fn fetch_prs(&self, owner: &str, repo: &str) -> Result<u64, Error> {
        let governor = RateGovernor::default();
        let cancel = CancellationToken::new();
        let rest = RestBackend::new(self.client.clone(), self.token_read.clone(), &governor, &cancel);
        rest.fetch_prs(owner, repo).await
    }
}
