//! GitHub contents API uploader.

use base64::Engine;
use cs_core::{BoxFuture, ContentUploader, UploadError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::GithubArgs;

const USER_AGENT: &str = concat!("codesync-cli/", env!("CARGO_PKG_VERSION"));

struct Credentials {
    token: String,
    owner: String,
    repo: String,
}

pub struct GithubUploader {
    client: reqwest::Client,
    api_url: String,
    branch: Option<String>,
    credentials: Result<Credentials, String>,
}

#[derive(Deserialize)]
struct ExistingFile {
    sha: String,
}

#[derive(Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

impl GithubUploader {
    pub fn new(args: GithubArgs) -> Self {
        let credentials = match (args.token, args.owner, args.repo) {
            (Some(token), Some(owner), Some(repo)) => Ok(Credentials { token, owner, repo }),
            (None, _, _) => Err("no GitHub token".to_string()),
            _ => Err("repository owner/name not set".to_string()),
        };
        Self {
            client: reqwest::Client::new(),
            api_url: args.api_url.trim_end_matches('/').to_string(),
            branch: args.branch,
            credentials,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_ok()
    }

    fn contents_url(&self, credentials: &Credentials, path: &str, filename: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}/{}",
            self.api_url,
            credentials.owner,
            credentials.repo,
            path.trim_matches('/'),
            filename
        )
    }

    fn request(&self, method: reqwest::Method, url: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, format!("token {}", token))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    /// Blob sha of an existing file, `None` when there is none.
    async fn existing_sha(&self, credentials: &Credentials, url: &str) -> Result<Option<String>, UploadError> {
        let mut request = self.request(reqwest::Method::GET, url, &credentials.token);
        if let Some(branch) = &self.branch {
            request = request.query(&[("ref", branch)]);
        }
        let response = request.send().await.map_err(|e| UploadError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let file: ExistingFile = response
                    .json()
                    .await
                    .map_err(|e| UploadError::Transport(format!("Failed to parse contents response: {}", e)))?;
                Ok(Some(file.sha))
            }
            status => Err(rejected(status, response).await),
        }
    }

    async fn put(
        &self,
        path: &str,
        filename: &str,
        content: &[u8],
        commit_message: &str,
        overwrite: bool,
    ) -> Result<bool, UploadError> {
        let credentials = self
            .credentials
            .as_ref()
            .map_err(|reason| UploadError::NotConfigured(reason.clone()))?;
        let url = self.contents_url(credentials, path, filename);

        let sha = self.existing_sha(credentials, &url).await?;
        if sha.is_some() && !overwrite {
            log::info!("{}/{} exists; not overwriting", path, filename);
            return Ok(false);
        }

        let body = PutContents {
            message: commit_message,
            content: base64::engine::general_purpose::STANDARD.encode(content),
            sha,
            branch: self.branch.as_deref(),
        };
        let response = self
            .request(reqwest::Method::PUT, &url, &credentials.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if response.status().is_success() {
            log::info!("Committed {}/{}", path, filename);
            Ok(true)
        } else {
            Err(rejected(response.status(), response).await)
        }
    }
}

async fn rejected(status: StatusCode, response: reqwest::Response) -> UploadError {
    let message = response.text().await.unwrap_or_default();
    UploadError::Rejected { status: status.as_u16(), message }
}

impl ContentUploader for GithubUploader {
    fn upload<'a>(
        &'a self,
        path: &'a str,
        filename: &'a str,
        content: &'a [u8],
        commit_message: &'a str,
        overwrite: bool,
    ) -> BoxFuture<'a, Result<bool, UploadError>> {
        Box::pin(self.put(path, filename, content, commit_message, overwrite))
    }
}
