//! Content inspection commands: scan, piece sizing, browsing, and path mapping.

use seedforge_api_models::{
    DirectoryListing, ListingSource, MapDirection, MapRequest, MapResponse, MappingsResponse,
    PiecesRequest, PiecesResponse, RootsResponse, ScanRequest, ScanResponse,
};

use crate::cli::{BrowseArgs, MapArgs, OutputFormat, PiecesArgs, ScanArgs};
use crate::client::{AppContext, CliError, CliResult, send_json};
use crate::output::{
    listing_table, map_table, mappings_table, pieces_table, render, roots_table, scan_table,
};

pub(crate) async fn handle_scan(
    ctx: &AppContext,
    args: ScanArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if args.path.trim().is_empty() {
        return Err(CliError::validation("path must not be empty"));
    }
    let request = ScanRequest {
        path: args.path,
        source: args.source.into(),
    };
    let scan: ScanResponse = ctx.post_json("/v1/scan", &request).await?;
    render(&scan, format, scan_table)
}

pub(crate) async fn handle_pieces(
    ctx: &AppContext,
    args: PiecesArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let request = PiecesRequest {
        total_bytes: args.total_bytes,
        target_piece_count: args.target,
        piece_size: args.piece_size,
    };
    let pieces: PiecesResponse = ctx.post_json("/v1/pieces", &request).await?;
    render(&pieces, format, pieces_table)
}

pub(crate) async fn handle_browse(
    ctx: &AppContext,
    args: BrowseArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut url = ctx.endpoint("/v1/browse")?;
    {
        let mut pairs = url.query_pairs_mut();
        if let Some(path) = &args.path {
            pairs.append_pair("path", path);
        }
        if ListingSource::from(args.source) == ListingSource::Remote {
            pairs.append_pair("source", "remote");
        }
    }
    let listing: DirectoryListing = send_json(ctx.client.get(url), "/v1/browse").await?;
    render(&listing, format, listing_table)
}

pub(crate) async fn handle_roots(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let roots: RootsResponse = ctx.get_json("/v1/browse/roots").await?;
    render(&roots, format, roots_table)
}

pub(crate) async fn handle_mappings(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let mappings: MappingsResponse = ctx.get_json("/v1/paths/mappings").await?;
    render(&mappings, format, mappings_table)
}

pub(crate) async fn handle_map(
    ctx: &AppContext,
    args: MapArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let request = MapRequest {
        path: args.path,
        direction: if args.to_host {
            MapDirection::ToHost
        } else {
            MapDirection::ToRemote
        },
    };
    let mapped: MapResponse = ctx.post_json("/v1/paths/map", &request).await?;
    render(&mapped, format, map_table)
}
