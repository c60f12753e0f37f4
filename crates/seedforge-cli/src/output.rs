//! Output renderers and formatting helpers for CLI commands.

use std::fmt::Write as _;

use anyhow::anyhow;
use seedforge_api_models::{
    ConnectionInfo, CreationAccepted, CreationJobResponse, CreationListResponse, DirectoryListing,
    EntryKind, MapDirection, MapResponse, MappingsResponse, PiecesResponse, RootsResponse,
    ScanResponse,
};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn to_json<T: Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

/// Print `value` as JSON or as the table produced by `table`.
pub(crate) fn render<T: Serialize>(
    value: &T,
    format: OutputFormat,
    table: impl FnOnce(&T) -> String,
) -> CliResult<()> {
    let text = match format {
        OutputFormat::Json => to_json(value)?,
        OutputFormat::Table => table(value),
    };
    println!("{}", text.trim_end());
    Ok(())
}

/// Human-readable byte count (binary units, one decimal).
pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut unit = 0;
    let mut whole = bytes;
    let mut remainder = 0;
    while whole >= 1024 && unit < UNITS.len() - 1 {
        remainder = whole % 1024;
        whole /= 1024;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{whole}.{} {}", remainder * 10 / 1024, UNITS[unit])
    }
}

pub(crate) fn scan_table(scan: &ScanResponse) -> String {
    let analysis = &scan.analysis;
    let mut out = String::new();
    let _ = writeln!(out, "path: {}", analysis.path);
    let _ = writeln!(out, "mode: {:?}", analysis.mode);
    let _ = writeln!(out, "size: {} ({} bytes)", scan.total_size, analysis.total_bytes);
    let _ = writeln!(
        out,
        "files: {}  folders: {}{}",
        analysis.file_count,
        analysis.folder_count,
        if analysis.truncated { "  (truncated)" } else { "" }
    );
    if let Some(plan) = &scan.suggested_plan {
        let _ = writeln!(
            out,
            "suggested piece size: {} ({} pieces)",
            format_bytes(plan.piece_size_bytes),
            plan.piece_count
        );
    }
    for warning in &analysis.warnings {
        let _ = writeln!(out, "warning: {warning}");
    }
    out
}

pub(crate) fn pieces_table(pieces: &PiecesResponse) -> String {
    let plan = &pieces.plan;
    let mut out = String::new();
    let _ = writeln!(out, "content: {}", pieces.total_size);
    let _ = writeln!(
        out,
        "piece size: {} ({} bytes)",
        pieces.piece_size, plan.piece_size_bytes
    );
    let _ = writeln!(out, "pieces: {}", plan.piece_count);
    let _ = writeln!(out, "efficiency: {:.2}%", plan.efficiency_percent);
    let _ = writeln!(out, "padding: {}", format_bytes(plan.wasted_bytes));
    out
}

pub(crate) fn listing_table(listing: &DirectoryListing) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", listing.path);
    if let Some(parent) = &listing.parent {
        let _ = writeln!(out, "  {:<5} {:>12} ..  ({parent})", "dir", "");
    }
    for entry in &listing.entries {
        let (kind, size) = match entry.kind {
            EntryKind::Directory => ("dir", String::new()),
            EntryKind::File => ("file", entry.size.map_or_else(String::new, format_bytes)),
            EntryKind::Symlink => ("link", String::new()),
        };
        let _ = writeln!(out, "  {kind:<5} {size:>12} {}", entry.name);
    }
    out
}

pub(crate) fn roots_table(roots: &RootsResponse) -> String {
    roots.roots.join("\n")
}

pub(crate) fn mappings_table(mappings: &MappingsResponse) -> String {
    let mut out = String::new();
    if mappings.mappings.is_empty() {
        let _ = writeln!(out, "no path mappings configured");
    }
    for mapping in &mappings.mappings {
        let _ = writeln!(out, "{} -> {}", mapping.host, mapping.remote);
    }
    for finding in &mappings.diagnostics {
        let _ = writeln!(
            out,
            "{:?} [{}]: {}",
            finding.level, finding.code, finding.message
        );
    }
    out
}

pub(crate) fn map_table(mapped: &MapResponse) -> String {
    let arrow = match mapped.direction {
        MapDirection::ToRemote => "->",
        MapDirection::ToHost => "<-",
    };
    let note = if mapped.mapped { "" } else { "  (no mapping applied)" };
    format!("{} {arrow} {}{note}", mapped.input, mapped.output)
}

pub(crate) fn accepted_table(accepted: &CreationAccepted) -> String {
    format!(
        "job: {}\nstatus: {}\nevents: {}",
        accepted.job_id, accepted.status_url, accepted.events_url
    )
}

pub(crate) fn job_table(response: &CreationJobResponse) -> String {
    let job = &response.job;
    let mut out = String::new();
    let _ = writeln!(out, "id: {}", job.id);
    let _ = writeln!(out, "source: {}", job.source_path);
    let _ = writeln!(out, "state: {}", job.state.as_str());
    if let Some(task_id) = &job.task_id {
        let _ = writeln!(out, "task: {task_id}");
    }
    if !job.state.is_terminal() {
        let _ = write!(out, "progress: {:.1}%", job.progress_percent);
        if let Some(eta) = job.eta_seconds {
            let _ = write!(out, " (eta {eta}s)");
        }
        let _ = writeln!(out);
    }
    if let Some(name) = &job.artifact_name {
        let _ = writeln!(out, "artifact: {name}");
    }
    if let Some(hash) = &job.info_hash {
        let _ = writeln!(out, "info hash: {hash}");
    }
    if job.seeded {
        let _ = writeln!(out, "seeding: yes");
    }
    if let Some(error) = &job.error {
        let _ = write!(out, "error: {}", error.message);
        if let Some(detail) = &error.detail {
            let _ = write!(out, " ({detail})");
        }
        let _ = writeln!(out);
    }
    for warning in &job.warnings {
        let _ = writeln!(out, "warning: {warning}");
    }
    if let Some(link) = response
        .result
        .as_ref()
        .and_then(|result| result.artifact_ref.as_ref())
    {
        let _ = writeln!(out, "download: {link}");
    }
    out
}

pub(crate) fn job_list_table(list: &CreationListResponse) -> String {
    let mut out = format!("{:<36} {:<10} {:>7} SOURCE\n", "ID", "STATE", "PROG");
    for entry in &list.jobs {
        let job = &entry.job;
        let progress = format!("{:.1}%", job.progress_percent);
        let _ = writeln!(
            out,
            "{:<36} {:<10} {progress:>7} {}",
            job.id,
            job.state.as_str(),
            job.source_path
        );
    }
    out
}

pub(crate) fn connection_table(info: &ConnectionInfo) -> String {
    format!(
        "qBittorrent {} (web API {})\ntorrent creator: {}",
        info.app_version,
        info.api_version,
        if info.creator_supported {
            "available"
        } else {
            "unavailable (requires qBittorrent 5.0 or newer)"
        }
    )
}
