use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::inspector::PathInspectorService;
use crate::jobs::{JobRegistry, publish};
use crate::orchestrator::CreationOrchestrator;
use seedforge_api::CreationHandles;
use seedforge_config::{
    ConfigService, ConfigWatcher, QbittorrentConfig, Settings, config_path_from_env,
    mapping_diagnostics,
};
use seedforge_core::{
    CreationWorkflow, DiagnosticLevel, DirectoryLister, PathInspector, RemoteTorrentClient,
};
use seedforge_events::{Event, EventBus};
use seedforge_fsops::LocalLister;
use seedforge_qbit::{QbitClient, QbitClientConfig};
use seedforge_telemetry::{LogFormat, LoggingConfig, Metrics, build_sha, init_logging};
use tracing::{info, warn};

const CONFIG_WATCH_INTERVAL: Duration = Duration::from_secs(5);
const CONFIG_WATCHER_COMPONENT: &str = "config_watcher";

/// Dependencies required to bootstrap the seedforge service.
pub(crate) struct BootstrapDependencies {
    config: ConfigService,
    watcher: ConfigWatcher,
    events: EventBus,
    telemetry: Metrics,
    remote: Arc<QbitClient>,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) async fn from_env() -> AppResult<Self> {
        let config = ConfigService::load(config_path_from_env())
            .await
            .map_err(|err| AppError::config("config_service.load", err))?;
        let watcher = config.watch(CONFIG_WATCH_INTERVAL).await;

        let events = EventBus::new();
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

        let client_config = qbit_client_config(&config.snapshot().qbittorrent);
        let remote = QbitClient::new(&client_config)
            .map_err(|err| AppError::remote("qbit_client.new", err))?;

        Ok(Self {
            config,
            watcher,
            events,
            telemetry,
            remote: Arc::new(remote),
        })
    }
}

/// Entry point for the seedforge boot sequence.
///
/// # Errors
///
/// Returns an error if dependency construction or application startup fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env().await?;
    Box::pin(run_app_with(dependencies)).await
}

/// Boot sequence that relies entirely on injected dependencies.
pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let BootstrapDependencies {
        config,
        watcher,
        events,
        telemetry,
        remote,
    } = dependencies;
    let settings = config.snapshot();

    let logging = LoggingConfig {
        level: &settings.logging.level,
        format: LogFormat::from_setting(settings.logging.format.as_deref()),
        build_sha: build_sha(),
    };
    init_logging(&logging).map_err(|err| AppError::telemetry("telemetry.init", err))?;

    info!(
        config_path = ?config.path(),
        qbittorrent = %remote.base_url(),
        "seedforge bootstrap starting"
    );
    report_mapping_diagnostics(&settings);

    let local: Arc<dyn DirectoryLister> = Arc::new(LocalLister::new());
    let remote_lister: Arc<dyn DirectoryLister> = remote.clone();
    let inspector = Arc::new(PathInspectorService::new(
        local,
        remote_lister,
        config.clone(),
    ));
    let orchestrator = Arc::new(CreationOrchestrator::new(
        Arc::clone(&remote),
        telemetry.clone(),
    ));
    let registry = Arc::new(JobRegistry::new(
        orchestrator,
        inspector.clone(),
        config.clone(),
        events.clone(),
        telemetry.clone(),
    ));

    let workflow: Arc<dyn CreationWorkflow> = registry.clone();
    let path_inspector: Arc<dyn PathInspector> = inspector;
    let remote_client: Arc<dyn RemoteTorrentClient> = remote;
    let handles = CreationHandles::new(workflow, path_inspector, remote_client);
    let api = seedforge_api::ApiServer::new(
        config.clone(),
        events.clone(),
        handles,
        telemetry.clone(),
    );

    let addr = resolve_bind_addr(&settings.web_server.bind_addr()).await?;
    let config_task = spawn_config_watch_task(watcher, settings, events, telemetry);

    info!(addr = %addr, "launching API listener");
    let serve_result = api.serve(addr).await;

    registry.shutdown().await;
    if !config_task.is_finished() {
        config_task.abort();
    }
    if let Err(err) = config_task.await
        && !err.is_cancelled()
    {
        warn!(error = %err, "config watcher task join failed");
    }

    serve_result.map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("API server shutdown complete");
    Ok(())
}

/// Client settings derived from the `qbittorrent` configuration section.
#[must_use]
pub fn qbit_client_config(config: &QbittorrentConfig) -> QbitClientConfig {
    QbitClientConfig {
        base_url: config.base_url(),
        username: config.username.clone(),
        password: config.password.clone(),
        connection_timeout: config.connection_timeout(),
        read_timeout: config.read_timeout(),
        verify_tls: config.verify_tls,
    }
}

async fn resolve_bind_addr(bind: &str) -> AppResult<SocketAddr> {
    let invalid = || AppError::InvalidConfig {
        field: "web_server.host",
        reason: "unresolvable_bind_addr",
        value: Some(bind.to_string()),
    };
    if let Ok(addr) = bind.parse::<SocketAddr>() {
        return Ok(addr);
    }
    tokio::net::lookup_host(bind)
        .await
        .map_err(|_| invalid())?
        .next()
        .ok_or_else(invalid)
}

fn report_mapping_diagnostics(settings: &Settings) {
    match mapping_diagnostics(settings) {
        Ok(findings) => {
            for finding in findings {
                match finding.level {
                    DiagnosticLevel::Warning => {
                        warn!(code = finding.code, "{}", finding.message);
                    }
                    DiagnosticLevel::Info => {
                        info!(code = finding.code, "{}", finding.message);
                    }
                }
            }
        }
        Err(err) => warn!(error = %err, "path mapping diagnostics unavailable"),
    }
}

fn spawn_config_watch_task(
    mut watcher: ConfigWatcher,
    initial: Arc<Settings>,
    events: EventBus,
    telemetry: Metrics,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut current = initial;
        let mut config_degraded = false;
        loop {
            match watcher.next().await {
                Ok(settings) => {
                    for section in restart_required(&current, &settings) {
                        warn!(section, "changed settings take effect after a restart");
                    }
                    let description = describe_change(&current, &settings);
                    info!(%description, "configuration reloaded");
                    publish(&events, &telemetry, Event::SettingsChanged { description });
                    set_config_degraded(&events, &telemetry, &mut config_degraded, false);
                    current = settings;
                }
                Err(err) => {
                    // The broken file is consumed; keep watching for the next edit.
                    telemetry.inc_config_reload_failure();
                    warn!(error = %err, "configuration reload rejected; keeping previous settings");
                    set_config_degraded(&events, &telemetry, &mut config_degraded, true);
                }
            }
        }
    })
}

fn set_config_degraded(
    events: &EventBus,
    telemetry: &Metrics,
    config_degraded: &mut bool,
    degraded: bool,
) {
    if *config_degraded == degraded {
        return;
    }
    let degraded_list = if degraded {
        vec![CONFIG_WATCHER_COMPONENT.to_string()]
    } else {
        Vec::new()
    };
    publish(
        events,
        telemetry,
        Event::HealthChanged {
            degraded: degraded_list,
        },
    );
    *config_degraded = degraded;
}

fn describe_change(previous: &Settings, next: &Settings) -> String {
    let changed = changed_sections(previous, next);
    if changed.is_empty() {
        "configuration reloaded without effective changes".to_string()
    } else {
        format!("configuration reloaded: {}", changed.join(", "))
    }
}

fn changed_sections(previous: &Settings, next: &Settings) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if previous.qbittorrent != next.qbittorrent {
        changed.push("qbittorrent");
    }
    if previous.torrent_creation != next.torrent_creation {
        changed.push("torrent_creation");
    }
    if previous.scanning != next.scanning {
        changed.push("scanning");
    }
    if previous.web_server != next.web_server {
        changed.push("web_server");
    }
    if previous.logging != next.logging {
        changed.push("logging");
    }
    changed
}

/// Sections read once at startup; mappings, defaults and scan bounds apply per job.
fn restart_required(previous: &Settings, next: &Settings) -> Vec<&'static str> {
    let mut sections = Vec::new();
    if connection_changed(&previous.qbittorrent, &next.qbittorrent) {
        sections.push("qbittorrent");
    }
    if previous.web_server != next.web_server {
        sections.push("web_server");
    }
    if previous.logging != next.logging {
        sections.push("logging");
    }
    sections
}

fn connection_changed(previous: &QbittorrentConfig, next: &QbittorrentConfig) -> bool {
    previous.base_url() != next.base_url()
        || previous.username != next.username
        || previous.password != next.password
        || previous.verify_tls != next.verify_tls
        || previous.connection_timeout_secs != next.connection_timeout_secs
        || previous.read_timeout_secs != next.read_timeout_secs
}
