//! Backup transport uploading to a WebDAV collection over HTTP.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use tokio::fs;
use tracing::debug;

use livewatch_core::config::WebDavBackupConfig;
use livewatch_core::error::{AppError, ErrorKind};
use livewatch_core::result::AppResult;
use livewatch_core::traits::{BackupRef, BackupTransport};

use super::{latest_file_name, resolve_file_name, timestamped_name};

/// PUTs each backup under a timestamped name and again as `latest.json`.
///
/// Retention is left to the server.
#[derive(Debug, Clone)]
pub struct WebDavBackupTransport {
    base_url: String,
    username: String,
    password: String,
    client: Client,
}

impl WebDavBackupTransport {
    /// Create a transport for the configured collection.
    pub fn new(config: &WebDavBackupConfig, timeout: Duration) -> AppResult<Self> {
        let base_url = config.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AppError::configuration(
                "backup.webdav.url is required for the webdav provider",
            ));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
        })?;

        Ok(Self {
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    fn url(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url, file_name)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(&self.password))
        }
    }

    async fn put(&self, file_name: &str, body: Bytes) -> AppResult<()> {
        let url = self.url(file_name);
        let response = self
            .authorize(self.client.put(&url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Backup, format!("WebDAV PUT {url} failed"), e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::backup(format!(
                "WebDAV PUT {url} returned {status}"
            )));
        }
        debug!(url = %url, "WebDAV upload complete");
        Ok(())
    }
}

#[async_trait]
impl BackupTransport for WebDavBackupTransport {
    fn transport_type(&self) -> &str {
        "webdav"
    }

    async fn upload(&self, local_path: &Path) -> AppResult<BackupRef> {
        let bytes = Bytes::from(fs::read(local_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Backup,
                format!("Failed to read backup source: {}", local_path.display()),
                e,
            )
        })?);

        let uploaded_at = Utc::now();
        let name = timestamped_name(uploaded_at);
        self.put(&name, bytes.clone()).await?;
        self.put(&latest_file_name(), bytes.clone()).await?;

        Ok(BackupRef {
            location: self.url(&name),
            name,
            uploaded_at,
            size_bytes: bytes.len() as u64,
        })
    }

    async fn download(&self, name: &str) -> AppResult<Option<Bytes>> {
        let url = self.url(&resolve_file_name(name)?);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Backup, format!("WebDAV GET {url} failed"), e)
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.bytes().await.map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Backup,
                        format!("Failed to read WebDAV body from {url}"),
                        e,
                    )
                })?;
                Ok(Some(body))
            }
            status => Err(AppError::backup(format!(
                "WebDAV GET {url} returned {status}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_url_and_trims_slash() {
        let missing = WebDavBackupConfig::default();
        assert!(WebDavBackupTransport::new(&missing, Duration::from_secs(1)).is_err());

        let config = WebDavBackupConfig {
            url: "https://dav.example.com/backups/".into(),
            ..Default::default()
        };
        let transport = WebDavBackupTransport::new(&config, Duration::from_secs(1)).unwrap();
        assert_eq!(
            transport.url("latest.json"),
            "https://dav.example.com/backups/latest.json"
        );
    }
}
