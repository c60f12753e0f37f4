//! Host/remote path translation for containerised torrent clients.

use serde::{Deserialize, Serialize};

use crate::error::MappingError;

/// One `(host, remote)` prefix pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
    /// Prefix in the host namespace.
    pub host: String,
    /// Prefix in the remote client's namespace.
    pub remote: String,
}

impl PathMapping {
    /// Construct a mapping pair.
    #[must_use]
    pub fn new(host: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            remote: remote.into(),
        }
    }
}

/// Severity attached to a mapping diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    /// Informational; translation still works.
    Info,
    /// Translation may surprise the user.
    Warning,
}

/// Finding about the configured mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDiagnostic {
    /// Severity.
    pub level: DiagnosticLevel,
    /// Machine-readable code (`nested_prefix`, `non_reversible`, `missing_host_path`).
    pub code: &'static str,
    /// Human-readable explanation.
    pub message: String,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Host,
    Remote,
}

impl Side {
    const fn label(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Remote => "remote",
        }
    }
}

/// Longest-prefix translator between host and remote paths.
///
/// The table is read-only once built. Prefixes match on whole path segments, so
/// `/mnt/data` applies to `/mnt/data/x` but not to `/mnt/database`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMapper {
    mappings: Vec<PathMapping>,
}

impl PathMapper {
    /// Build a mapper, normalising prefixes.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError`] when a prefix is blank or relative, or when two
    /// mappings share an identical prefix on either side.
    pub fn new(mappings: impl IntoIterator<Item = PathMapping>) -> Result<Self, MappingError> {
        let mut normalized: Vec<PathMapping> = Vec::new();
        for mapping in mappings {
            let host = normalize_prefix(&mapping.host, Side::Host)?;
            let remote = normalize_prefix(&mapping.remote, Side::Remote)?;
            if normalized.iter().any(|existing| existing.host == host) {
                return Err(MappingError::AmbiguousPrefix {
                    side: Side::Host.label(),
                    prefix: host,
                });
            }
            if normalized.iter().any(|existing| existing.remote == remote) {
                return Err(MappingError::AmbiguousPrefix {
                    side: Side::Remote.label(),
                    prefix: remote,
                });
            }
            normalized.push(PathMapping { host, remote });
        }
        Ok(Self {
            mappings: normalized,
        })
    }

    /// Mapper with no entries; every translation is the identity.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            mappings: Vec::new(),
        }
    }

    /// Configured mappings, normalised, in declaration order.
    #[must_use]
    pub fn mappings(&self) -> &[PathMapping] {
        &self.mappings
    }

    /// True when no mappings are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Translate a host path into the remote namespace.
    #[must_use]
    pub fn to_remote(&self, host_path: &str) -> String {
        self.translate(host_path, Side::Host)
    }

    /// Translate a remote path into the host namespace.
    #[must_use]
    pub fn to_host(&self, remote_path: &str) -> String {
        self.translate(remote_path, Side::Remote)
    }

    /// True when some host prefix applies to `host_path`.
    #[must_use]
    pub fn is_mapped(&self, host_path: &str) -> bool {
        self.rule_for(host_path).is_some()
    }

    /// Mapping that [`Self::to_remote`] would apply to `host_path`.
    #[must_use]
    pub fn rule_for(&self, host_path: &str) -> Option<&PathMapping> {
        self.best_match(host_path, Side::Host)
    }

    /// Findings about nested and non-reversible prefixes.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<MappingDiagnostic> {
        let mut findings = Vec::new();
        for (index, outer) in self.mappings.iter().enumerate() {
            for inner in self.mappings.iter().skip(index + 1) {
                if strip_segment_prefix(&inner.host, &outer.host).is_some()
                    || strip_segment_prefix(&outer.host, &inner.host).is_some()
                {
                    findings.push(MappingDiagnostic {
                        level: DiagnosticLevel::Info,
                        code: "nested_prefix",
                        message: format!(
                            "host prefixes {} and {} are nested; the longer one wins",
                            outer.host, inner.host
                        ),
                    });
                }
            }
        }
        for (host_probe, remote_probe) in self.probes() {
            if let Some(host) = host_probe {
                let remote = self.to_remote(&host);
                if self.to_host(&remote) != host {
                    findings.push(MappingDiagnostic {
                        level: DiagnosticLevel::Warning,
                        code: "non_reversible",
                        message: format!("{host} maps to {remote} but does not translate back"),
                    });
                }
            }
            if let Some(remote) = remote_probe {
                let host = self.to_host(&remote);
                if self.to_remote(&host) != remote {
                    findings.push(MappingDiagnostic {
                        level: DiagnosticLevel::Warning,
                        code: "non_reversible",
                        message: format!(
                            "{remote} maps back to {host} but does not translate forward"
                        ),
                    });
                }
            }
        }
        findings
    }

    /// Paths whose round trip can be captured by a competing prefix: every prefix,
    /// plus each prefix nested inside another one re-expressed through the outer rule.
    fn probes(&self) -> Vec<(Option<String>, Option<String>)> {
        let mut probes: Vec<(Option<String>, Option<String>)> = self
            .mappings
            .iter()
            .map(|mapping| (Some(mapping.host.clone()), Some(mapping.remote.clone())))
            .collect();
        for outer in &self.mappings {
            for inner in &self.mappings {
                if outer == inner {
                    continue;
                }
                if let Some(rest) = strip_segment_prefix(&inner.remote, &outer.remote) {
                    probes.push((Some(join_prefix(&outer.host, rest)), None));
                }
                if let Some(rest) = strip_segment_prefix(&inner.host, &outer.host) {
                    probes.push((None, Some(join_prefix(&outer.remote, rest))));
                }
            }
        }
        probes
    }

    fn best_match(&self, path: &str, side: Side) -> Option<&PathMapping> {
        self.mappings
            .iter()
            .filter(|mapping| strip_segment_prefix(path, prefix_of(mapping, side)).is_some())
            .max_by_key(|mapping| prefix_of(mapping, side).len())
    }

    fn translate(&self, path: &str, side: Side) -> String {
        let Some(mapping) = self.best_match(path, side) else {
            return path.to_string();
        };
        let (from, to) = match side {
            Side::Host => (&mapping.host, &mapping.remote),
            Side::Remote => (&mapping.remote, &mapping.host),
        };
        strip_segment_prefix(path, from)
            .map_or_else(|| path.to_string(), |rest| join_prefix(to, rest))
    }
}

fn prefix_of(mapping: &PathMapping, side: Side) -> &str {
    match side {
        Side::Host => &mapping.host,
        Side::Remote => &mapping.remote,
    }
}

/// Remainder of `path` after `prefix`, without the joining slash, when `prefix`
/// ends on a segment boundary of `path`.
fn strip_segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix == "/" {
        return path.strip_prefix('/');
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

fn join_prefix(prefix: &str, rest: &str) -> String {
    if rest.is_empty() {
        prefix.to_string()
    } else if prefix == "/" {
        format!("/{rest}")
    } else {
        format!("{prefix}/{rest}")
    }
}

fn normalize_prefix(value: &str, side: Side) -> Result<String, MappingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MappingError::EmptyPrefix { side: side.label() });
    }
    if !trimmed.starts_with('/') {
        return Err(MappingError::RelativePrefix {
            side: side.label(),
            value: trimmed.to_string(),
        });
    }
    let collapsed = trimmed.trim_end_matches('/');
    if collapsed.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(collapsed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(pairs: &[(&str, &str)]) -> Result<PathMapper, MappingError> {
        PathMapper::new(pairs.iter().map(|(h, r)| PathMapping::new(*h, *r)))
    }

    #[test]
    fn unraid_style_prefix_is_replaced() -> Result<(), MappingError> {
        let mapper = mapper(&[("/mnt/user/data", "/data")])?;
        assert_eq!(
            mapper.to_remote("/mnt/user/data/downloads/movie"),
            "/data/downloads/movie"
        );
        assert_eq!(
            mapper.to_host("/data/downloads/movie"),
            "/mnt/user/data/downloads/movie"
        );
        Ok(())
    }

    #[test]
    fn unmatched_paths_pass_through() -> Result<(), MappingError> {
        let mapper = mapper(&[("/mnt/user/data", "/data")])?;
        assert_eq!(mapper.to_remote("/srv/media/a"), "/srv/media/a");
        assert_eq!(mapper.to_remote("/mnt/user/database"), "/mnt/user/database");
        assert!(!mapper.is_mapped("/mnt/user/database"));
        assert_eq!(PathMapper::identity().to_host("/x/y"), "/x/y");
        Ok(())
    }

    #[test]
    fn longest_prefix_wins() -> Result<(), MappingError> {
        let mapper = mapper(&[("/mnt", "/m"), ("/mnt/user/data", "/data")])?;
        assert_eq!(mapper.to_remote("/mnt/user/data/tv"), "/data/tv");
        assert_eq!(mapper.to_remote("/mnt/other"), "/m/other");
        let rule = mapper.rule_for("/mnt/user/data/tv");
        assert_eq!(rule.map(|rule| rule.remote.as_str()), Some("/data"));
        Ok(())
    }

    #[test]
    fn exact_prefix_and_trailing_slashes_normalise() -> Result<(), MappingError> {
        let mapper = mapper(&[("/mnt/user/data/", "/data/")])?;
        assert_eq!(mapper.to_remote("/mnt/user/data"), "/data");
        assert_eq!(mapper.mappings()[0].host, "/mnt/user/data");
        Ok(())
    }

    #[test]
    fn root_prefixes_translate() -> Result<(), MappingError> {
        let mapper = mapper(&[("/", "/host")])?;
        assert_eq!(mapper.to_remote("/a/b"), "/host/a/b");
        assert_eq!(mapper.to_host("/host/a/b"), "/a/b");
        assert_eq!(mapper.to_host("/host"), "/");
        Ok(())
    }

    #[test]
    fn round_trip_holds_for_reversible_tables() -> Result<(), MappingError> {
        let mapper = mapper(&[
            ("/mnt/user/data", "/data"),
            ("/mnt/user/media", "/media"),
            ("/srv", "/storage/srv"),
        ])?;
        assert!(mapper.diagnostics().is_empty());
        for path in [
            "/mnt/user/data/a/b.mkv",
            "/mnt/user/media",
            "/srv/x",
            "/unmapped/thing",
        ] {
            assert_eq!(mapper.to_host(&mapper.to_remote(path)), path);
        }
        Ok(())
    }

    #[test]
    fn duplicate_prefixes_are_rejected() {
        assert!(matches!(
            mapper(&[("/a", "/x"), ("/a/", "/y")]),
            Err(MappingError::AmbiguousPrefix { side: "host", .. })
        ));
        assert!(matches!(
            mapper(&[("/a", "/x"), ("/b", "/x")]),
            Err(MappingError::AmbiguousPrefix { side: "remote", .. })
        ));
    }

    #[test]
    fn blank_and_relative_prefixes_are_rejected() {
        assert!(matches!(
            mapper(&[("  ", "/x")]),
            Err(MappingError::EmptyPrefix { side: "host" })
        ));
        assert!(matches!(
            mapper(&[("/a", "data")]),
            Err(MappingError::RelativePrefix { side: "remote", .. })
        ));
    }

    #[test]
    fn diagnostics_flag_nested_and_non_reversible() -> Result<(), MappingError> {
        let mapper = mapper(&[
            ("/mnt/a", "/data"),
            ("/mnt/a/b", "/data/b2"),
            ("/other", "/data/sub"),
        ])?;
        let findings = mapper.diagnostics();
        assert!(findings.iter().any(|f| f.code == "nested_prefix"));
        assert!(
            findings
                .iter()
                .any(|f| f.code == "non_reversible" && f.level == DiagnosticLevel::Warning)
        );
        Ok(())
    }
}
