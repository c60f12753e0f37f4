//! `app/*` endpoints: version probes and remote directory listing.

use reqwest::StatusCode;
use seedforge_core::DirectoryEntry;

use crate::client::{QbitClient, ensure_success, read_body, read_json};
use crate::error::{QbitError, QbitResult};
use crate::models::RemoteDirectoryItem;

/// First qBittorrent major version shipping the torrent creator API.
pub const CREATOR_MIN_MAJOR: u32 = 5;

/// True when an `app/version` string (`v5.0.1`) has the creator endpoints.
#[must_use]
pub fn creator_supported(app_version: &str) -> bool {
    app_version
        .trim()
        .trim_start_matches(['v', 'V'])
        .split('.')
        .next()
        .and_then(|major| major.parse::<u32>().ok())
        .is_some_and(|major| major >= CREATOR_MIN_MAJOR)
}

impl QbitClient {
    /// Application version, e.g. `v5.0.1`.
    ///
    /// # Errors
    ///
    /// Propagates transport and session failures.
    pub async fn app_version(&self) -> QbitResult<String> {
        self.get_text("app.version", "app/version").await
    }

    /// Web API version, e.g. `2.11.2`.
    ///
    /// # Errors
    ///
    /// Propagates transport and session failures.
    pub async fn webapi_version(&self) -> QbitResult<String> {
        self.get_text("app.webapi_version", "app/webapiVersion").await
    }

    async fn get_text(&self, operation: &'static str, endpoint: &str) -> QbitResult<String> {
        let request = self.http().get(self.url(endpoint));
        let response = self.execute(operation, request).await?;
        let response = ensure_success(operation, response).await?;
        Ok(read_body(operation, response).await?.trim().to_string())
    }

    /// List a directory as seen by qBittorrent.
    ///
    /// # Errors
    ///
    /// 400 and 404 map to [`QbitError::DirectoryNotFound`].
    pub async fn directory_content(&self, path: &str) -> QbitResult<Vec<DirectoryEntry>> {
        const OPERATION: &str = "app.directory_content";
        let request = self
            .http()
            .get(self.url("app/getDirectoryContent"))
            .query(&[("dirPath", path), ("mode", "all"), ("withMetadata", "true")]);
        let response = self.execute(OPERATION, request).await?;
        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST
        ) {
            return Err(QbitError::DirectoryNotFound {
                path: path.to_string(),
            });
        }
        let response = ensure_success(OPERATION, response).await?;
        let items: Vec<RemoteDirectoryItem> = read_json(OPERATION, response).await?;
        Ok(items
            .into_iter()
            .map(|item| item.into_entry(path))
            .collect())
    }
}
