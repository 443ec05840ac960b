//! review::gitlab
//!
//! GitLab implementation of [`ReviewPlatform`] over the REST API v4.
//!
//! Requests authenticate with the `PRIVATE-TOKEN` header. List endpoints are
//! followed page by page through the `X-Next-Page` response header. Branch
//! names and project paths are percent-encoded as single path segments, so
//! `update-mirrors/main/20240102030405` becomes
//! `update-mirrors%2Fmain%2F20240102030405`.
//!
//! # Feature Flag
//!
//! This module is only available when the `gitlab` feature is enabled.

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ReviewError, ReviewPlatform, ReviewRequest, ReviewSettings};

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

const NEXT_PAGE_HEADER: &str = "X-Next-Page";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("lorry-mirror-updater/", env!("CARGO_PKG_VERSION"));

const PER_PAGE: &str = "100";

/// Blocking GitLab API client bound to one project.
pub struct GitLabClient {
    /// HTTP client for making requests
    client: Client,
    /// `<server>/api/v4`
    api_base: Url,
    /// Numeric id or full path of the project
    project_id: String,
    token: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("api_base", &self.api_base.as_str())
            .field("project_id", &self.project_id)
            .field("has_token", &!self.token.is_empty())
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct CreateMergeRequestBody<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
}

#[derive(Debug, Deserialize)]
struct GitLabMergeRequest {
    iid: u64,
    web_url: String,
    source_branch: String,
    target_branch: String,
}

impl From<GitLabMergeRequest> for ReviewRequest {
    fn from(mr: GitLabMergeRequest) -> Self {
        Self {
            iid: mr.iid,
            web_url: mr.web_url,
            source_branch: mr.source_branch,
            target_branch: mr.target_branch,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MergeRequestSummary {
    source_branch: String,
}

#[derive(Debug, Deserialize)]
struct GitLabBranch {
    name: String,
}

/// Turn a server URL such as `https://gitlab.com` into its API v4 base.
pub fn api_base_url(server_url: &str) -> Result<Url, ReviewError> {
    let invalid = |message: &str| ReviewError::InvalidServerUrl {
        url: server_url.to_string(),
        message: message.to_string(),
    };

    let mut url = Url::parse(server_url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http or https URL"));
    }
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| invalid("URL cannot be a base"))?
        .pop_if_empty()
        .extend(["api", "v4"]);
    Ok(url)
}

impl GitLabClient {
    /// Create a client from CI settings.
    pub fn new(settings: &ReviewSettings) -> Result<Self, ReviewError> {
        Self::with_server(&settings.server_url, &settings.project_id, &settings.token)
    }

    /// Create a client for an explicit server, project and token.
    pub fn with_server(
        server_url: &str,
        project_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ReviewError> {
        let client = Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(|e| ReviewError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base_url(server_url)?,
            project_id: project_id.into(),
            token: token.into(),
        })
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        self.api_base.as_str()
    }

    /// Build URL for a project endpoint, encoding each segment.
    fn project_url(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        // `api_base_url` only accepts http(s) URLs, which always have a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.push("projects")
                .push(&self.project_id)
                .extend(segments);
        }
        url
    }

    /// Send a request, mapping transport failures and error statuses.
    fn send(&self, request: RequestBuilder) -> Result<Response, ReviewError> {
        let response = request
            .header(TOKEN_HEADER, self.token.as_str())
            .send()
            .map_err(|e| ReviewError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response, status))
        }
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ReviewError> {
        let response = self.send(request)?;
        let status = response.status();
        response.json().map_err(|e| ReviewError::Api {
            status: status.as_u16(),
            message: format!("Failed to parse response: {}", e),
        })
    }

    /// GET every page of a list endpoint.
    fn get_all<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, ReviewError> {
        let mut items = Vec::new();
        let mut page = Some("1".to_string());

        while let Some(current) = page {
            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("per_page", PER_PAGE)
                .append_pair("page", &current);

            let response = self.send(self.client.get(page_url))?;
            page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty() && *v != current)
                .map(str::to_string);

            let status = response.status();
            let batch: Vec<T> = response.json().map_err(|e| ReviewError::Api {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })?;
            items.extend(batch);
        }

        Ok(items)
    }
}

/// Map an error response to a `ReviewError`, keeping GitLab's message.
fn error_from_response(response: Response, status: StatusCode) -> ReviewError {
    // GitLab reports `{"message": ...}` (string, list or object) or `{"error": "..."}`.
    let message = match response.json::<serde_json::Value>() {
        Ok(body) => match body.get("message").or_else(|| body.get("error")) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "Unknown error".to_string(),
        },
        Err(_) => "Unknown error".to_string(),
    };

    let message = match status {
        StatusCode::UNAUTHORIZED => "Invalid or expired token".to_string(),
        StatusCode::FORBIDDEN => format!("Permission denied: {}", message),
        _ if status.is_server_error() => format!("GitLab server error: {}", message),
        _ => message,
    };

    ReviewError::Api {
        status: status.as_u16(),
        message,
    }
}

impl ReviewPlatform for GitLabClient {
    fn create_review(
        &self,
        source: &str,
        target: &str,
        title: &str,
    ) -> Result<ReviewRequest, ReviewError> {
        let body = CreateMergeRequestBody {
            source_branch: source,
            target_branch: target,
            title,
        };
        let url = self.project_url(&["merge_requests"]);
        let mr: GitLabMergeRequest = self.send_json(self.client.post(url).json(&body))?;
        Ok(mr.into())
    }

    fn list_branches(&self, regex: &str) -> Result<Vec<String>, ReviewError> {
        let mut url = self.project_url(&["repository", "branches"]);
        url.query_pairs_mut().append_pair("regex", regex);
        let branches: Vec<GitLabBranch> = self.get_all(url)?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    fn open_review_branches(&self) -> Result<Vec<String>, ReviewError> {
        let mut url = self.project_url(&["merge_requests"]);
        url.query_pairs_mut().append_pair("state", "opened");
        let mrs: Vec<MergeRequestSummary> = self.get_all(url)?;
        Ok(mrs.into_iter().map(|mr| mr.source_branch).collect())
    }

    fn delete_merged_branches(&self) -> Result<(), ReviewError> {
        let url = self.project_url(&["repository", "merged_branches"]);
        self.send(self.client.delete(url))?;
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> Result<(), ReviewError> {
        let url = self.project_url(&["repository", "branches", name]);
        self.send(self.client.delete(url))?;
        Ok(())
    }
}
