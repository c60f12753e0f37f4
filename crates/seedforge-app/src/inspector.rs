//! Scanning and browsing over the host and remote namespaces.

use std::sync::Arc;

use async_trait::async_trait;
use seedforge_config::ConfigService;
use seedforge_core::{
    DirectoryLister, DirectoryListing, ListingResult, ListingSource, PathAnalysis, PathInspector,
};
use seedforge_fsops::{PathAnalyzer, build_listing, default_roots, normalize_path};
use tracing::debug;

/// [`PathInspector`] backed by one lister per namespace.
pub struct PathInspectorService {
    local: Arc<dyn DirectoryLister>,
    remote: Arc<dyn DirectoryLister>,
    config: ConfigService,
}

impl PathInspectorService {
    /// Inspector reading scan bounds and the save path from `config`.
    #[must_use]
    pub fn new(
        local: Arc<dyn DirectoryLister>,
        remote: Arc<dyn DirectoryLister>,
        config: ConfigService,
    ) -> Self {
        Self {
            local,
            remote,
            config,
        }
    }

    fn lister(&self, source: ListingSource) -> &dyn DirectoryLister {
        match source {
            ListingSource::Local => self.local.as_ref(),
            ListingSource::Remote => self.remote.as_ref(),
        }
    }
}

#[async_trait]
impl PathInspector for PathInspectorService {
    async fn scan(&self, path: &str, source: ListingSource) -> ListingResult<PathAnalysis> {
        let scanning = self.config.snapshot().scanning.clone();
        let analyzer = PathAnalyzer::new(scanning.max_entries_per_directory, scanning.max_depth);
        let analysis = analyzer.analyze(path, self.lister(source)).await?;
        debug!(
            path = %analysis.path,
            source = ?source,
            total_bytes = analysis.total_bytes,
            files = analysis.file_count,
            "path scanned"
        );
        Ok(analysis)
    }

    async fn browse(&self, path: &str, source: ListingSource) -> ListingResult<DirectoryListing> {
        let directory = normalize_path(path);
        let entries = self.lister(source).list_directory(&directory).await?;
        Ok(build_listing(&directory, source, entries))
    }

    async fn roots(&self) -> Vec<String> {
        let settings = self.config.snapshot();
        // The save path is configured in the remote namespace; probe its host side.
        let save_path = settings.qbittorrent.save_path.as_deref().map(|path| {
            settings
                .qbittorrent
                .path_mapper()
                .map_or_else(|_| path.to_string(), |mapper| mapper.to_host(path))
        });
        default_roots(save_path.as_deref()).await
    }
}
