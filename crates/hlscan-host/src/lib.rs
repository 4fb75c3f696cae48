pub mod github;

use async_trait::async_trait;
use serde_json::Value;

use hlscan_core::error::HlError;

/// Repositories requested per listing page.
pub const PAGE_SIZE: u32 = 100;

/// Result of an archive request that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveResponse {
    /// 2xx; the body is the archive.
    Body(Vec<u8>),
    /// Any other status.
    Rejected { status: u16 },
}

/// Trait for the repository host the archives come from.
#[async_trait]
pub trait HostProvider: Send + Sync {
    /// One page of an organization's repositories, as raw JSON objects.
    async fn list_org_repos_page(
        &self,
        org: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Value>, HlError>;

    /// Fetch an archive. Transport failures are `Err`; HTTP failures are
    /// reported as `ArchiveResponse::Rejected`.
    async fn download_archive(&self, url: &str) -> Result<ArchiveResponse, HlError>;

    /// Every repository of the organization, in API order. Requests pages
    /// until one comes back empty; any error discards what was collected.
    async fn list_org_repos(&self, org: &str) -> Result<Vec<Value>, HlError> {
        let mut all = Vec::new();
        let mut page = 1u32;
        loop {
            let items = self.list_org_repos_page(org, page, PAGE_SIZE).await?;
            if items.is_empty() {
                break;
            }
            tracing::debug!("page {page}: {} repositories", items.len());
            all.extend(items);
            page += 1;
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct PagedFake {
        pages: Vec<Vec<Value>>,
        calls: AtomicU32,
        fail_on: Option<u32>,
    }

    #[async_trait]
    impl HostProvider for PagedFake {
        async fn list_org_repos_page(
            &self,
            _org: &str,
            page: u32,
            _per_page: u32,
        ) -> Result<Vec<Value>, HlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(page) {
                return Err(HlError::ApiError {
                    status: 502,
                    message: "bad gateway".into(),
                });
            }
            Ok(self
                .pages
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default())
        }

        async fn download_archive(&self, _url: &str) -> Result<ArchiveResponse, HlError> {
            Ok(ArchiveResponse::Rejected { status: 404 })
        }
    }

    fn repo(name: &str) -> Value {
        serde_json::json!({ "name": name })
    }

    #[tokio::test]
    async fn test_pagination_stops_on_empty_page() {
        let fake = PagedFake {
            pages: vec![vec![repo("a"), repo("b")], vec![repo("c")]],
            calls: AtomicU32::new(0),
            fail_on: None,
        };
        let repos = fake.list_org_repos("acme").await.unwrap();
        let names: Vec<_> = repos.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_pagination_error_discards_pages() {
        let fake = PagedFake {
            pages: vec![vec![repo("a")], vec![repo("b")]],
            calls: AtomicU32::new(0),
            fail_on: Some(2),
        };
        assert!(matches!(
            fake.list_org_repos("acme").await,
            Err(HlError::ApiError { status: 502, .. })
        ));
    }
}
