use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;

use hlscan_core::error::HlError;

use crate::{ArchiveResponse, HostProvider};

pub struct GitHubProvider {
    client: reqwest::Client,
    api_url: url::Url,
}

impl GitHubProvider {
    pub fn new(api_url: url::Url, token: &str) -> Result<Self, HlError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            HlError::Config {
                message: "GitHub token contains characters not allowed in a header".into(),
            }
        })?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(concat!("hlscan/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| HlError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_url })
    }

    fn url(&self, path: &str) -> String {
        let base = self.api_url.as_str().trim_end_matches('/');
        format!("{base}{path}")
    }
}

fn transport(e: reqwest::Error) -> HlError {
    HlError::ApiError {
        status: 0,
        message: e.to_string(),
    }
}

#[async_trait]
impl HostProvider for GitHubProvider {
    async fn list_org_repos_page(
        &self,
        org: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>, HlError> {
        let url = format!(
            "{}?per_page={per_page}&page={page}",
            self.url(&format!("/orgs/{org}/repos"))
        );
        let resp = self.client.get(&url).send().await.map_err(transport)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(HlError::ApiError {
                status,
                message: body,
            });
        }

        resp.json().await.map_err(|e| HlError::ApiError {
            status: 0,
            message: format!("JSON parse error: {e}"),
        })
    }

    async fn download_archive(&self, url: &str) -> Result<ArchiveResponse, HlError> {
        let resp = self.client.get(url).send().await.map_err(transport)?;
        if !resp.status().is_success() {
            return Ok(ArchiveResponse::Rejected {
                status: resp.status().as_u16(),
            });
        }
        let bytes = resp.bytes().await.map_err(transport)?;
        Ok(ArchiveResponse::Body(bytes.to_vec()))
    }
}
