//! Remote connectivity and server health commands.

use std::fmt::Write as _;

use seedforge_api_models::ConnectionInfo;
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;
use crate::client::{AppContext, CliResult};
use crate::output::{connection_table, render};

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct HealthReport {
    pub(crate) status: String,
    pub(crate) build: String,
    #[serde(default)]
    pub(crate) degraded: Vec<String>,
    pub(crate) remote: RemoteReport,
    pub(crate) jobs: JobCounts,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RemoteReport {
    pub(crate) reachable: bool,
    pub(crate) app_version: Option<String>,
    pub(crate) creator_supported: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct JobCounts {
    pub(crate) running: usize,
    pub(crate) finished: usize,
    pub(crate) failed: usize,
    pub(crate) cancelled: usize,
}

pub(crate) async fn handle_remote_test(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let info: ConnectionInfo = ctx.get_json("/v1/remote/test").await?;
    render(&info, format, connection_table)
}

pub(crate) async fn handle_health(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let report: HealthReport = ctx.get_json("/health/full").await?;
    render(&report, format, health_table)
}

fn health_table(report: &HealthReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "status: {} (build {})", report.status, report.build);
    if !report.degraded.is_empty() {
        let _ = writeln!(out, "degraded: {}", report.degraded.join(", "));
    }
    match (&report.remote.app_version, report.remote.reachable) {
        (Some(version), true) => {
            let _ = writeln!(
                out,
                "remote: qBittorrent {version}{}",
                if report.remote.creator_supported {
                    ""
                } else {
                    " (torrent creator unavailable)"
                }
            );
        }
        _ => {
            let _ = writeln!(out, "remote: unreachable");
        }
    }
    let jobs = &report.jobs;
    let _ = writeln!(
        out,
        "jobs: {} running, {} finished, {} failed, {} cancelled",
        jobs.running, jobs.finished, jobs.failed, jobs.cancelled
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use reqwest::Client;
    use serde_json::json;

    fn context_for(server: &MockServer) -> Result<AppContext> {
        Ok(AppContext {
            client: Client::new(),
            base_url: server.base_url().parse()?,
        })
    }

    #[tokio::test]
    async fn remote_test_reads_connection_info() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v1/remote/test");
            then.status(200).json_body(json!({
                "app_version": "v5.0.1",
                "api_version": "2.11.2",
                "creator_supported": true
            }));
        });
        handle_remote_test(&context_for(&server)?, OutputFormat::Table)
            .await
            .map_err(|err| anyhow::anyhow!(err.display_message()))?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn unauthorized_remote_is_a_failure() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/v1/remote/test");
            then.status(502).json_body(json!({
                "type": "https://seedforge.dev/problems/remote-unauthorized",
                "title": "remote client rejected credentials",
                "status": 502
            }));
        });
        let err = handle_remote_test(&context_for(&server)?, OutputFormat::Table)
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
        assert_eq!(err.exit_code(), 3);
        Ok(())
    }

    #[test]
    fn health_table_reports_unreachable_remote() -> Result<()> {
        let report: HealthReport = serde_json::from_value(json!({
            "status": "degraded",
            "build": "dev",
            "degraded": ["remote_client"],
            "remote": {"reachable": false, "app_version": null, "api_version": null,
                       "creator_supported": false},
            "metrics": {"active_creations": 0},
            "jobs": {"running": 1, "finished": 2, "failed": 0, "cancelled": 0}
        }))?;
        let table = health_table(&report);
        assert!(table.contains("degraded: remote_client"));
        assert!(table.contains("remote: unreachable"));
        assert!(table.contains("jobs: 1 running, 2 finished"));
        Ok(())
    }
}
