use reqwest::header::LINK;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, info};
use url::Url;

use crate::error::{ReleaseNotifierError, Result};
use crate::format::is_valid_identifier;
use crate::types::{normalize_identifier, GitHubReleaseResponse, GitHubStarredRepo, ReleaseInfo};

const DEFAULT_GITHUB_API: &str = "https://api.github.com";

/// Page size requested when listing starred repositories (GitHub's maximum).
const STARRED_PAGE_SIZE: usize = 100;

/// Something that can report the latest release of a tracked item.
///
/// `Ok(None)` means the item has no release; any `Err` aborts the run.
#[allow(async_fn_in_trait)]
pub trait ReleaseSource {
    async fn latest_release(&self, item: &str) -> Result<Option<ReleaseInfo>>;
}

/// Fetches latest releases from the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubSource {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubSource {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_GITHUB_API.to_string(),
            token: None,
        }
    }

    /// Sets a custom base URL (GitHub Enterprise, or a mock server in tests).
    pub fn base_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if Url::parse(&url).is_err() {
            return Err(ReleaseNotifierError::InvalidBaseUrl(url));
        }
        self.base_url = url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Sets the GitHub API token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("User-Agent", "relnotify");

        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        request
    }

    /// Lists the repositories starred by the authenticated user.
    ///
    /// Follows `Link: rel="next"` pagination until the last page. Names are
    /// normalized; anything that is not a valid `owner/name` is dropped.
    pub async fn starred_repos(&self) -> Result<Vec<String>> {
        let mut repos: Vec<String> = Vec::new();
        let mut next = Some(format!(
            "{}/user/starred?per_page={}&page=1",
            self.base_url, STARRED_PAGE_SIZE
        ));

        while let Some(url) = next.take() {
            let response = self.get(&url).send().await?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let message = response.text().await.unwrap_or_default();
                return Err(ReleaseNotifierError::ApiError { status, message });
            }

            next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_link);

            let page: Vec<GitHubStarredRepo> = response.json().await?;
            for starred in page {
                let repo = normalize_identifier(&starred.full_name);
                if is_valid_identifier(&repo) && !repos.contains(&repo) {
                    repos.push(repo);
                }
            }
            debug!(count = repos.len(), "listed starred repositories");
        }

        info!(count = repos.len(), "loaded starred repositories");
        Ok(repos)
    }
}

/// Extracts the `rel="next"` target from a `Link` header.
fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim().replace(' ', "") == "rel=\"next\"");
        if !is_next {
            return None;
        }
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        Some(target.to_string())
    })
}

impl Default for GitHubSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReleaseSource for GitHubSource {
    async fn latest_release(&self, item: &str) -> Result<Option<ReleaseInfo>> {
        let url = format!("{}/repos/{}/releases/latest", self.base_url, item);
        let response = self.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(item = %item, "no published release");
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ReleaseNotifierError::ApiError { status, message });
        }

        let release: GitHubReleaseResponse = response.json().await?;
        Ok(release.into_release_info())
    }
}
