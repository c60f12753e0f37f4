//! `torrentcreator/*` endpoints.

use reqwest::StatusCode;
use seedforge_core::{CreationParams, CreationTask};
use tracing::debug;

use crate::client::{QbitClient, ensure_success, read_body, read_json};
use crate::error::{QbitError, QbitResult};
use crate::models::{AddTaskResponse, CreatorTaskStatus};

/// Encode tracker tiers: `|` between trackers, an empty entry between tiers.
#[must_use]
pub fn encode_trackers(tiers: &[Vec<String>]) -> String {
    tiers
        .iter()
        .map(|tier| tier.join("|"))
        .collect::<Vec<_>>()
        .join("||")
}

/// Form fields for `addTask`. Unset options are omitted so qBittorrent applies its own.
#[must_use]
pub fn creation_form(params: &CreationParams) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("sourcePath", params.source_path.clone()),
        ("format", params.format.as_str().to_string()),
        ("startSeeding", "false".to_string()),
    ];
    if let Some(piece_size) = params.piece_size {
        form.push(("pieceSize", piece_size.to_string()));
    }
    if let Some(private) = params.private {
        form.push(("private", private.to_string()));
    }
    if let Some(optimize) = params.optimize_alignment {
        form.push(("optimizeAlignment", optimize.to_string()));
    }
    if let Some(limit) = params.padded_file_size_limit {
        form.push(("paddedFileSizeLimit", limit.to_string()));
    }
    if let Some(comment) = &params.comment {
        form.push(("comment", comment.clone()));
    }
    if let Some(source) = &params.source {
        form.push(("source", source.clone()));
    }
    if !params.trackers.is_empty() {
        form.push(("trackers", encode_trackers(&params.trackers)));
    }
    if !params.url_seeds.is_empty() {
        form.push(("urlSeeds", params.url_seeds.join("|")));
    }
    form
}

impl QbitClient {
    /// Queue a creation task and return its identifier.
    ///
    /// # Errors
    ///
    /// 409 maps to [`QbitError::TooManyTasks`], 400 to [`QbitError::BadParameters`] and
    /// 404 to [`QbitError::SourceNotFound`].
    pub async fn add_creation_task(&self, params: &CreationParams) -> QbitResult<String> {
        const OPERATION: &str = "creator.add_task";
        let request = self
            .http()
            .post(self.url("torrentcreator/addTask"))
            .form(&creation_form(params));
        let response = self.execute(OPERATION, request).await?;
        match response.status() {
            StatusCode::CONFLICT => Err(QbitError::TooManyTasks),
            StatusCode::BAD_REQUEST => Err(QbitError::BadParameters {
                detail: read_body(OPERATION, response).await?,
            }),
            StatusCode::NOT_FOUND => Err(QbitError::SourceNotFound {
                path: params.source_path.clone(),
            }),
            _ => {
                let response = ensure_success(OPERATION, response).await?;
                let created: AddTaskResponse = read_json(OPERATION, response).await?;
                debug!(task_id = %created.task_id, minimal = params.is_minimal(), "creation task queued");
                Ok(created.task_id)
            }
        }
    }

    /// Current status of one task.
    ///
    /// # Errors
    ///
    /// Returns [`QbitError::TaskNotFound`] on 404 or when the array omits the task.
    pub async fn creation_task_status(&self, task_id: &str) -> QbitResult<CreationTask> {
        const OPERATION: &str = "creator.status";
        let request = self
            .http()
            .get(self.url("torrentcreator/status"))
            .query(&[("taskID", task_id)]);
        let response = self.execute(OPERATION, request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(task_not_found(task_id));
        }
        let response = ensure_success(OPERATION, response).await?;
        let items: Vec<CreatorTaskStatus> = read_json(OPERATION, response).await?;
        items
            .into_iter()
            .find(|item| item.task_id == task_id)
            .ok_or_else(|| task_not_found(task_id))?
            .into_task()
    }

    /// Download the finished metainfo.
    ///
    /// # Errors
    ///
    /// Returns [`QbitError::TaskNotFound`] on 404 and [`QbitError::Status`] with 409 while
    /// the task is unfinished.
    pub async fn creation_torrent_file(&self, task_id: &str) -> QbitResult<Vec<u8>> {
        const OPERATION: &str = "creator.torrent_file";
        let request = self
            .http()
            .get(self.url("torrentcreator/torrentFile"))
            .query(&[("taskID", task_id)]);
        let response = self.execute(OPERATION, request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(task_not_found(task_id));
        }
        let response = ensure_success(OPERATION, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| QbitError::transport(OPERATION, err))?;
        Ok(bytes.to_vec())
    }

    /// Remove a task from the creator queue.
    ///
    /// # Errors
    ///
    /// Returns [`QbitError::TaskNotFound`] on 404.
    pub async fn delete_creation_task(&self, task_id: &str) -> QbitResult<()> {
        const OPERATION: &str = "creator.delete_task";
        let request = self
            .http()
            .post(self.url("torrentcreator/deleteTask"))
            .form(&[("taskID", task_id)]);
        let response = self.execute(OPERATION, request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(task_not_found(task_id));
        }
        ensure_success(OPERATION, response).await?;
        Ok(())
    }
}

fn task_not_found(task_id: &str) -> QbitError {
    QbitError::TaskNotFound {
        task_id: task_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{config_for, mock_login};
    use httpmock::prelude::*;
    use seedforge_core::{TaskStatus, TorrentFormat};

    fn params() -> CreationParams {
        CreationParams {
            source_path: "/data/movie".into(),
            format: TorrentFormat::Hybrid,
            piece_size: Some(4_194_304),
            private: Some(true),
            optimize_alignment: Some(false),
            padded_file_size_limit: None,
            comment: Some("hello".into()),
            source: Some("SRC".into()),
            trackers: vec![
                vec!["udp://a/announce".into(), "udp://b/announce".into()],
                vec!["udp://c/announce".into()],
            ],
            url_seeds: vec!["https://seed/one".into()],
        }
    }

    #[test]
    fn tiers_are_separated_by_empty_entries() {
        assert_eq!(
            encode_trackers(&params().trackers),
            "udp://a/announce|udp://b/announce||udp://c/announce"
        );
        assert_eq!(encode_trackers(&[]), "");
    }

    #[test]
    fn minimal_form_has_only_path_and_format() {
        let form = creation_form(&CreationParams::minimal("/data/x", TorrentFormat::V2));
        let keys: Vec<_> = form.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec!["sourcePath", "format", "startSeeding"]);
        assert_eq!(form[1].1, "v2");
    }

    #[test]
    fn full_form_carries_every_option() {
        let form = creation_form(&params());
        let value = |key: &str| {
            form.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(value("pieceSize"), Some("4194304"));
        assert_eq!(value("private"), Some("true"));
        assert_eq!(value("source"), Some("SRC"));
        assert_eq!(value("urlSeeds"), Some("https://seed/one"));
        assert_eq!(value("paddedFileSizeLimit"), None);
    }

    #[tokio::test]
    async fn add_task_returns_task_id() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_login(&server);
        let add = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/torrentcreator/addTask")
                .header("cookie", "SID=abc123")
                .form_urlencoded_tuple("sourcePath", "/data/movie")
                .form_urlencoded_tuple("format", "hybrid");
            then.status(200).json_body(serde_json::json!({"taskID": "task-1"}));
        });
        let client = QbitClient::new(&config_for(&server))?;
        assert_eq!(client.add_creation_task(&params()).await?, "task-1");
        add.assert();
        Ok(())
    }

    #[tokio::test]
    async fn add_task_statuses_map_to_errors() -> anyhow::Result<()> {
        for (status, body) in [(409, ""), (400, "bad pieceSize"), (404, "")] {
            let server = MockServer::start_async().await;
            mock_login(&server);
            server.mock(|when, then| {
                when.method(POST).path("/api/v2/torrentcreator/addTask");
                then.status(status).body(body);
            });
            let client = QbitClient::new(&config_for(&server))?;
            let result = client.add_creation_task(&params()).await;
            match status {
                409 => assert!(matches!(result, Err(QbitError::TooManyTasks))),
                400 => assert!(
                    matches!(result, Err(QbitError::BadParameters { detail }) if detail == "bad pieceSize")
                ),
                _ => assert!(
                    matches!(result, Err(QbitError::SourceNotFound { path }) if path == "/data/movie")
                ),
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn status_selects_requested_task() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_login(&server);
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrentcreator/status")
                .query_param("taskID", "task-1");
            then.status(200).json_body(serde_json::json!([
                {"taskID": "task-1", "status": "Queued", "progress": 0}
            ]));
        });
        let client = QbitClient::new(&config_for(&server))?;
        let task = client.creation_task_status("task-1").await?;
        assert_eq!(task.status, TaskStatus::Queued);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_login(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrentcreator/status");
            then.status(404).body("Not Found");
        });
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrentcreator/deleteTask");
            then.status(404);
        });
        let client = QbitClient::new(&config_for(&server))?;
        assert!(matches!(
            client.creation_task_status("missing").await,
            Err(QbitError::TaskNotFound { .. })
        ));
        assert!(matches!(
            client.delete_creation_task("missing").await,
            Err(QbitError::TaskNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn torrent_file_returns_raw_bytes() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_login(&server);
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrentcreator/torrentFile")
                .query_param("taskID", "task-1");
            then.status(200)
                .header("content-type", "application/x-bittorrent")
                .body("d4:infod4:name1:xee");
        });
        let client = QbitClient::new(&config_for(&server))?;
        let bytes = client.creation_torrent_file("task-1").await?;
        assert_eq!(bytes, b"d4:infod4:name1:xee");
        Ok(())
    }

    #[tokio::test]
    async fn unfinished_torrent_file_is_a_conflict() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        mock_login(&server);
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrentcreator/torrentFile");
            then.status(409).body("not finished");
        });
        let client = QbitClient::new(&config_for(&server))?;
        assert!(matches!(
            client.creation_torrent_file("task-1").await,
            Err(QbitError::Status { status: 409, .. })
        ));
        Ok(())
    }
}
