//! Existence checks of published hrefs.

use std::time::Duration;

use async_trait::async_trait;
use log::{error, warn};
use reqwest::StatusCode;

use crate::error::Result;

/// Tells whether a URL points to an existing page.
#[async_trait]
pub trait LinkChecker: Send + Sync {
    async fn exists(&self, url: &str) -> bool;
}

/// Outcome of one link check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Any 2xx response
    Found,
    /// 404, the expected answer for a missing page
    Missing,
    /// Any other status
    Anomaly,
    /// No response at all
    Unreachable,
}

impl LinkStatus {
    /// Classify the status of a response, `None` when the request failed.
    pub fn classify(status: Option<StatusCode>) -> Self {
        match status {
            Some(status) if status.is_success() => LinkStatus::Found,
            Some(StatusCode::NOT_FOUND) => LinkStatus::Missing,
            Some(_) => LinkStatus::Anomaly,
            None => LinkStatus::Unreachable,
        }
    }

    pub fn exists(self) -> bool {
        self == LinkStatus::Found
    }
}

/// Checks links with HTTP `HEAD` requests.
///
/// Only [`LinkStatus::Found`] counts as an existing page. Anomalies and
/// network failures are logged.
pub struct HttpLinkChecker {
    client: reqwest::Client,
}

impl HttpLinkChecker {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LinkChecker for HttpLinkChecker {
    async fn exists(&self, url: &str) -> bool {
        let status = match self.client.head(url).send().await {
            Ok(response) => {
                let code = response.status();
                let status = LinkStatus::classify(Some(code));
                if status == LinkStatus::Anomaly {
                    error!("HTTP response code on {} is {}", url, code);
                }
                status
            }
            Err(e) => {
                warn!("Request to {} failed: {}", url, e);
                LinkStatus::classify(None)
            }
        };
        status.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses_exist() {
        for code in [StatusCode::OK, StatusCode::NO_CONTENT] {
            let status = LinkStatus::classify(Some(code));
            assert_eq!(status, LinkStatus::Found);
            assert!(status.exists());
        }
    }

    #[test]
    fn test_not_found_is_missing() {
        let status = LinkStatus::classify(Some(StatusCode::NOT_FOUND));
        assert_eq!(status, LinkStatus::Missing);
        assert!(!status.exists());
    }

    #[test]
    fn test_other_statuses_are_anomalies() {
        for code in [
            StatusCode::MOVED_PERMANENTLY,
            StatusCode::FORBIDDEN,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let status = LinkStatus::classify(Some(code));
            assert_eq!(status, LinkStatus::Anomaly);
            assert!(!status.exists());
        }
    }

    #[test]
    fn test_failed_request_is_unreachable() {
        let status = LinkStatus::classify(None);
        assert_eq!(status, LinkStatus::Unreachable);
        assert!(!status.exists());
    }
}
