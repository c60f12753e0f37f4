//! Read-only helpers over bencoded `.torrent` payloads.

use std::fmt::Write as _;

use serde_bencode::value::Value;
use sha1::{Digest, Sha1};
use sha2::Sha256;

use crate::error::MetainfoError;
use crate::model::TorrentFormat;

fn info_dict(bytes: &[u8]) -> Result<Value, MetainfoError> {
    let root: Value =
        serde_bencode::from_bytes(bytes).map_err(|source| MetainfoError::Decode { source })?;
    match root {
        Value::Dict(mut entries) => entries
            .remove(b"info".as_slice())
            .ok_or(MetainfoError::MissingInfo),
        _ => Err(MetainfoError::MissingInfo),
    }
}

/// Hex info hash identifying the torrent in the remote client.
///
/// v1 and hybrid torrents use the SHA-1 of the bencoded info dictionary; v2-only
/// torrents use its SHA-256 truncated to 20 bytes.
///
/// # Errors
///
/// Returns [`MetainfoError`] when the payload is not bencode or lacks `info`.
pub fn info_hash(bytes: &[u8], format: TorrentFormat) -> Result<String, MetainfoError> {
    let info = info_dict(bytes)?;
    let encoded =
        serde_bencode::to_bytes(&info).map_err(|source| MetainfoError::Decode { source })?;
    let digest: Vec<u8> = match format {
        TorrentFormat::V1 | TorrentFormat::Hybrid => Sha1::digest(&encoded).to_vec(),
        TorrentFormat::V2 => Sha256::digest(&encoded).iter().take(20).copied().collect(),
    };
    Ok(digest.iter().fold(String::with_capacity(40), |mut hex, byte| {
        let _ = write!(hex, "{byte:02x}");
        hex
    }))
}

/// The `info.name` field, when present.
///
/// # Errors
///
/// Returns [`MetainfoError`] when the payload is not bencode or lacks `info`.
pub fn torrent_name(bytes: &[u8]) -> Result<Option<String>, MetainfoError> {
    let Value::Dict(info) = info_dict(bytes)? else {
        return Ok(None);
    };
    Ok(match info.get(b"name".as_slice()) {
        Some(Value::Bytes(name)) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    })
}
