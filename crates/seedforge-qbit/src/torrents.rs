//! `torrents/*` endpoints used for seeding a freshly created torrent.

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use seedforge_core::SeedOptions;
use tracing::debug;

use crate::client::{QbitClient, ensure_success, read_body};
use crate::error::{QbitError, QbitResult};

fn add_form(bytes: &[u8], file_name: &str, options: &SeedOptions) -> QbitResult<Form> {
    let part = Part::bytes(bytes.to_vec())
        .file_name(file_name.to_string())
        .mime_str("application/x-bittorrent")
        .map_err(|source| QbitError::ClientBuild { source })?;
    let mut form = Form::new()
        .part("torrents", part)
        .text("savepath", options.save_path.clone())
        .text("skip_checking", "false");
    if let Some(category) = options.category.as_ref().filter(|value| !value.is_empty()) {
        form = form.text("category", category.clone());
    }
    if !options.tags.is_empty() {
        form = form.text("tags", options.tags.join(","));
    }
    if options.ignore_share_ratio {
        form = form
            .text("ratioLimit", "-1")
            .text("seedingTimeLimit", "-1");
    }
    Ok(form)
}

impl QbitClient {
    /// Upload a `.torrent` file for seeding from `options.save_path`.
    ///
    /// # Errors
    ///
    /// Returns [`QbitError::Status`] when qBittorrent rejects the file (415) or answers
    /// `Fails.`.
    pub async fn add_torrent_file(
        &self,
        bytes: &[u8],
        file_name: &str,
        options: &SeedOptions,
    ) -> QbitResult<()> {
        const OPERATION: &str = "torrents.add";
        let request = self
            .http()
            .post(self.url("torrents/add"))
            .multipart(add_form(bytes, file_name, options)?);
        let response = self.execute(OPERATION, request).await?;
        let status = response.status();
        if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
            return Err(QbitError::Status {
                operation: OPERATION,
                status: status.as_u16(),
                body: read_body(OPERATION, response).await?,
            });
        }
        let response = ensure_success(OPERATION, response).await?;
        let body = read_body(OPERATION, response).await?;
        if body.trim() == "Fails." {
            return Err(QbitError::Status {
                operation: OPERATION,
                status: status.as_u16(),
                body,
            });
        }
        debug!(save_path = %options.save_path, "torrent added for seeding");
        Ok(())
    }

    /// Force a recheck so the torrent starts seeding existing data.
    ///
    /// # Errors
    ///
    /// Returns [`QbitError::Status`] for non-success responses.
    pub async fn recheck(&self, info_hash: &str) -> QbitResult<()> {
        const OPERATION: &str = "torrents.recheck";
        let request = self
            .http()
            .post(self.url("torrents/recheck"))
            .form(&[("hashes", info_hash)]);
        let response = self.execute(OPERATION, request).await?;
        ensure_success(OPERATION, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{config_for, mock_login};
    use httpmock::prelude::*;

    fn options() -> SeedOptions {
        SeedOptions {
            save_path: "/data/downloads".into(),
            category: Some("seedforge".into()),
            tags: vec!["created".into()],
            ignore_share_ratio: true,
            info_hash: Some("abc".into()),
        }
    }

    #[tokio::test]
    async fn add_and_recheck_hit_endpoints() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_login(&server);
        let add = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/torrents/add")
                .header("cookie", "SID=abc123");
            then.status(200).body("Ok.");
        });
        let recheck = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/torrents/recheck")
                .form_urlencoded_tuple("hashes", "abc");
            then.status(200);
        });
        let client = QbitClient::new(&config_for(&server))?;
        client
            .add_torrent_file(b"d4:infodee", "movie.torrent", &options())
            .await?;
        client.recheck("abc").await?;
        add.assert();
        recheck.assert();
        Ok(())
    }

    #[tokio::test]
    async fn rejected_file_is_an_error() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_login(&server);
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/add");
            then.status(200).body("Fails.");
        });
        let client = QbitClient::new(&config_for(&server))?;
        let result = client
            .add_torrent_file(b"garbage", "x.torrent", &options())
            .await;
        assert!(matches!(result, Err(QbitError::Status { .. })));
        Ok(())
    }
}
