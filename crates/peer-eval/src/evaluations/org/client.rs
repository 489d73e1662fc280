use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::record::OrgEmployeePayload;
use super::{OrgFetchError, OrgSnapshotProvider};
use crate::config::OrgPlatformConfig;
use crate::evaluations::domain::Employee;

/// HTTP adapter for the organization platform REST API.
#[derive(Debug, Clone)]
pub struct OrgPlatformClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OrgPlatformClient {
    pub fn new(config: &OrgPlatformConfig) -> Result<Self, OrgFetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| OrgFetchError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    pub fn employees_url(&self) -> String {
        format!("{}/employees/", self.base_url)
    }

    fn map_error(&self, err: reqwest::Error) -> OrgFetchError {
        if err.is_timeout() {
            OrgFetchError::Timeout(self.timeout)
        } else if err.is_decode() {
            OrgFetchError::Decode(err.to_string())
        } else {
            OrgFetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl OrgSnapshotProvider for OrgPlatformClient {
    async fn fetch_employees(&self) -> Result<Vec<Employee>, OrgFetchError> {
        let url = self.employees_url();
        debug!(%url, "fetching organization snapshot");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| self.map_error(err))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "organization platform rejected request");
            return Err(OrgFetchError::Status(status.as_u16()));
        }

        let payload: OrgEmployeePayload =
            response.json().await.map_err(|err| self.map_error(err))?;
        Ok(payload.into_employees())
    }
}
