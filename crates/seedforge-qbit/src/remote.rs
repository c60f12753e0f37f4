//! Domain trait implementations backed by [`QbitClient`].

use async_trait::async_trait;
use seedforge_core::metainfo::torrent_name;
use seedforge_core::{
    ConnectionInfo, CreationParams, CreationTask, DirectoryEntry, DirectoryLister, ListingResult,
    RemoteResult, RemoteTorrentClient, SeedOptions,
};
use tracing::{info, warn};

use crate::app::creator_supported;
use crate::client::QbitClient;

#[async_trait]
impl RemoteTorrentClient for QbitClient {
    async fn submit_creation_task(&self, params: &CreationParams) -> RemoteResult<String> {
        Ok(self.add_creation_task(params).await?)
    }

    async fn task_status(&self, task_id: &str) -> RemoteResult<CreationTask> {
        Ok(self.creation_task_status(task_id).await?)
    }

    async fn fetch_artifact(&self, task_id: &str) -> RemoteResult<Vec<u8>> {
        Ok(self.creation_torrent_file(task_id).await?)
    }

    async fn delete_task(&self, task_id: &str) -> RemoteResult<()> {
        Ok(self.delete_creation_task(task_id).await?)
    }

    async fn add_and_seed(&self, bytes: &[u8], options: &SeedOptions) -> RemoteResult<()> {
        let file_name = torrent_name(bytes)
            .ok()
            .flatten()
            .map_or_else(|| "seedforge.torrent".to_string(), |name| format!("{name}.torrent"));
        self.add_torrent_file(bytes, &file_name, options).await?;
        match options.info_hash.as_deref() {
            Some(hash) => self.recheck(hash).await?,
            None => warn!(save_path = %options.save_path, "no info hash; recheck skipped"),
        }
        Ok(())
    }

    async fn connection_info(&self) -> RemoteResult<ConnectionInfo> {
        self.reset_session().await;
        self.login().await?;
        let app_version = self.app_version().await?;
        let api_version = self.webapi_version().await?;
        let creator_supported = creator_supported(&app_version);
        info!(%app_version, %api_version, creator_supported, "qBittorrent reachable");
        Ok(ConnectionInfo {
            app_version,
            api_version,
            creator_supported,
        })
    }
}

#[async_trait]
impl DirectoryLister for QbitClient {
    async fn list_directory(&self, path: &str) -> ListingResult<Vec<DirectoryEntry>> {
        self.directory_content(path)
            .await
            .map_err(|err| err.into_listing(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{config_for, mock_login};
    use httpmock::prelude::*;
    use seedforge_core::{ListingError, RemoteError, TorrentFormat};

    #[tokio::test]
    async fn busy_creator_surfaces_as_busy() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_login(&server);
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrentcreator/addTask");
            then.status(409);
        });
        let client = QbitClient::new(&config_for(&server))?;
        let result = client
            .submit_creation_task(&CreationParams::minimal("/data/x", TorrentFormat::V1))
            .await;
        assert!(matches!(result, Err(RemoteError::Busy)));
        Ok(())
    }

    #[tokio::test]
    async fn connection_info_reports_versions() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let login = mock_login(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/app/version");
            then.status(200).body("v5.0.2");
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/app/webapiVersion");
            then.status(200).body("2.11.2\n");
        });
        let client = QbitClient::new(&config_for(&server))?;
        let info = client.connection_info().await?;
        assert_eq!(info.app_version, "v5.0.2");
        assert_eq!(info.api_version, "2.11.2");
        assert!(info.creator_supported);
        login.assert_calls(1);
        Ok(())
    }

    #[tokio::test]
    async fn connection_info_maps_bad_credentials() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).body("Fails.");
        });
        let client = QbitClient::new(&config_for(&server))?;
        assert!(matches!(
            client.connection_info().await,
            Err(RemoteError::Unauthorized {
                reason: "bad_credentials"
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn seeding_adds_then_rechecks_by_hash() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_login(&server);
        let add = server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/add");
            then.status(200).body("Ok.");
        });
        let recheck = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/torrents/recheck")
                .form_urlencoded_tuple("hashes", "deadbeef");
            then.status(200);
        });
        let client = QbitClient::new(&config_for(&server))?;
        let options = SeedOptions {
            save_path: "/data".into(),
            info_hash: Some("deadbeef".into()),
            ..SeedOptions::default()
        };
        client
            .add_and_seed(b"d4:infod4:name5:movieee", &options)
            .await?;
        add.assert();
        recheck.assert();
        Ok(())
    }

    #[tokio::test]
    async fn remote_listing_errors_map_to_listing_taxonomy() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_login(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/app/getDirectoryContent");
            then.status(400);
        });
        let client = QbitClient::new(&config_for(&server))?;
        assert!(matches!(
            client.list_directory("/missing").await,
            Err(ListingError::NotFound { .. })
        ));
        Ok(())
    }
}
