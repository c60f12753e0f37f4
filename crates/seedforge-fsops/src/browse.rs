//! Browse helpers shared by local and remote listings.

use std::cmp::Ordering;

use seedforge_core::{DirectoryEntry, DirectoryListing, EntryKind, ListingSource};

/// Well-known mount points offered as browse roots when present.
const ROOT_CANDIDATES: &[&str] = &["/data", "/downloads", "/media", "/mnt"];

/// Normalise a user-supplied path: leading `/`, no repeated or trailing slashes.
///
/// `.` segments are dropped and `..` removes the previous segment; it never climbs
/// above `/`.
#[must_use]
pub fn normalize_path(input: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in input.trim().split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Parent of a normalised path; `None` at the root.
#[must_use]
pub fn parent_path(path: &str) -> Option<String> {
    let normalized = normalize_path(path);
    if normalized == "/" {
        return None;
    }
    normalized
        .rsplit_once('/')
        .map(|(parent, _)| if parent.is_empty() { "/" } else { parent }.to_string())
}

/// Join a directory and a child name.
#[must_use]
pub fn join_path(directory: &str, name: &str) -> String {
    if directory.ends_with('/') {
        format!("{directory}{name}")
    } else {
        format!("{directory}/{name}")
    }
}

/// Directories first, then everything else, case-insensitive by name.
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| {
        let rank = |entry: &DirectoryEntry| u8::from(entry.kind != EntryKind::Directory);
        rank(a)
            .cmp(&rank(b))
            .then_with(|| compare_names(&a.name, &b.name))
    });
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Assemble a sorted listing for `path`.
#[must_use]
pub fn build_listing(
    path: &str,
    source: ListingSource,
    mut entries: Vec<DirectoryEntry>,
) -> DirectoryListing {
    sort_entries(&mut entries);
    let path = normalize_path(path);
    DirectoryListing {
        parent: parent_path(&path),
        path,
        source,
        entries,
    }
}

/// Existing browse roots: `/`, the configured save path and common mount points.
pub async fn default_roots(save_path: Option<&str>) -> Vec<String> {
    let mut candidates = vec!["/".to_string()];
    if let Some(save_path) = save_path.filter(|value| !value.trim().is_empty()) {
        candidates.push(normalize_path(save_path));
    }
    candidates.extend(ROOT_CANDIDATES.iter().map(|root| (*root).to_string()));

    let mut roots = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if roots.contains(&candidate) {
            continue;
        }
        let is_dir = tokio::fs::metadata(&candidate)
            .await
            .is_ok_and(|meta| meta.is_dir());
        if is_dir {
            roots.push(candidate);
        }
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: EntryKind) -> DirectoryEntry {
        DirectoryEntry {
            name: name.into(),
            path: format!("/x/{name}"),
            kind,
            size: None,
        }
    }

    #[test]
    fn normalizes_slashes() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("data//movies/"), "/data/movies");
        assert_eq!(normalize_path("///"), "/");
    }

    #[test]
    fn dot_segments_collapse_without_escaping_root() {
        assert_eq!(normalize_path("/mnt/user/data/../../etc"), "/mnt/etc");
        assert_eq!(normalize_path("/data/./tv/.."), "/data");
        assert_eq!(normalize_path("/../../etc"), "/etc");
        assert_eq!(normalize_path("/data/Show..2024"), "/data/Show..2024");
    }

    #[test]
    fn parent_of_nested_and_root() {
        assert_eq!(parent_path("/data/movies").as_deref(), Some("/data"));
        assert_eq!(parent_path("/data").as_deref(), Some("/"));
        assert_eq!(parent_path("/"), None);
    }

    #[test]
    fn directories_sort_first_case_insensitively() {
        let listing = build_listing(
            "/x/",
            ListingSource::Local,
            vec![
                entry("b.mkv", EntryKind::File),
                entry("Zeta", EntryKind::Directory),
                entry("A.nfo", EntryKind::File),
                entry("alpha", EntryKind::Directory),
            ],
        );
        let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "Zeta", "A.nfo", "b.mkv"]);
        assert_eq!(listing.path, "/x");
        assert_eq!(listing.parent.as_deref(), Some("/"));
    }

    #[tokio::test]
    async fn roots_always_include_filesystem_root() {
        let roots = default_roots(Some("/definitely/missing/seedforge")).await;
        assert_eq!(roots.first().map(String::as_str), Some("/"));
        assert!(!roots.iter().any(|root| root.contains("seedforge")));
    }

    #[test]
    fn join_handles_root() {
        assert_eq!(join_path("/", "data"), "/data");
        assert_eq!(join_path("/data", "tv"), "/data/tv");
    }
}
