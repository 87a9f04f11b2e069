//! Network collaborators: archive download and code-scanning SARIF upload.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use bridge_core::install::fetch::{FetchError, Fetcher, LocalFetcher};
use bridge_core::upload::sarif::{SarifError, SarifReceipt, SarifUpload, SarifUploader};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use tracing::debug;
use url::Url;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);
const API_TIMEOUT: Duration = Duration::from_secs(60);

fn user_agent() -> String {
    format!("{}/{}", bridge_core::TOOL_NAME, env!("CARGO_PKG_VERSION"))
}

/// Downloads archives over HTTP(S); local locations are copied.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(user_agent())
            .build()
            .map_err(|err| FetchError::Http {
                url: String::new(),
                reason: err.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, location: &str, destination: &Path) -> Result<(), FetchError> {
        if LocalFetcher::local_path(location)?.is_some() {
            return LocalFetcher.fetch(location, destination);
        }

        let url =
            Url::parse(location).map_err(|_| FetchError::InvalidLocation(location.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(FetchError::UnsupportedScheme(scheme.to_string())),
        }

        let http_err = |reason: String| FetchError::Http {
            url: location.to_string(),
            reason,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| http_err(err.to_string()))?;
        if !response.status().is_success() {
            return Err(http_err(format!("http status {}", response.status())));
        }

        let mut file = File::create(destination).map_err(|source| FetchError::Io {
            location: destination.display().to_string(),
            source,
        })?;
        let bytes = response
            .copy_to(&mut file)
            .map_err(|err| http_err(err.to_string()))?;
        debug!(bytes, "archive download complete");
        Ok(())
    }
}

/// Uploads SARIF to the GitHub code-scanning API.
#[derive(Debug, Clone)]
pub struct GithubSarifUploader {
    client: Client,
    endpoint: Url,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
    url: Option<String>,
}

impl GithubSarifUploader {
    pub fn new(api_url: &Url, repository: &str, token: &str) -> Result<Self, SarifError> {
        let mut base = api_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(&format!("repos/{repository}/code-scanning/sarifs"))
            .map_err(|err| SarifError::Rejected(format!("invalid API url: {err}")))?;
        let client = Client::builder()
            .timeout(API_TIMEOUT)
            .user_agent(user_agent())
            .build()
            .map_err(|err| SarifError::Rejected(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            token: token.to_string(),
        })
    }

    #[cfg(test)]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl SarifUploader for GithubSarifUploader {
    fn upload(&self, upload: &SarifUpload) -> Result<SarifReceipt, SarifError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, user_agent())
            .json(upload)
            .send()
            .map_err(|err| SarifError::Rejected(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SarifError::Rejected(format!("http status {status}: {body}")));
        }
        let body: UploadResponse = response
            .json()
            .map_err(|err| SarifError::Rejected(err.to_string()))?;
        Ok(SarifReceipt {
            id: body.id,
            url: body.url,
        })
    }
}
