//! Request validation performed before any remote call.

use crate::error::{CreationError, CreationResult};
use crate::model::{CreationRequest, PieceSizeMode};
use crate::pieces::{compute_piece_size, is_valid_piece_size};

fn invalid(field: &'static str, reason: &'static str, value: Option<String>) -> CreationError {
    CreationError::Validation {
        field,
        reason,
        value,
    }
}

/// Check a creation request against the piece size, tracker, alignment and path rules.
///
/// # Errors
///
/// Returns [`CreationError::Validation`] or [`CreationError::InvalidPieceSize`]
/// describing the first rule that failed.
pub fn validate_request(request: &CreationRequest) -> CreationResult<()> {
    let path = request.source_path.trim();
    if path.is_empty() {
        return Err(invalid("source_path", "required", None));
    }
    if !path.starts_with('/') {
        return Err(invalid(
            "source_path",
            "must_be_absolute",
            Some(path.to_string()),
        ));
    }
    // prefix mapping is lexical, so `..` could step outside a mapped root
    if path.split('/').any(|segment| segment == "..") {
        return Err(invalid(
            "source_path",
            "parent_segment",
            Some(path.to_string()),
        ));
    }

    match request.piece_size_mode {
        PieceSizeMode::Manual => match request.piece_size_bytes {
            None => return Err(invalid("piece_size_bytes", "required_for_manual", None)),
            Some(value) if !is_valid_piece_size(value) => {
                return Err(CreationError::InvalidPieceSize { value });
            }
            Some(_) => {}
        },
        PieceSizeMode::Auto => {
            if request.target_piece_count == 0 {
                return Err(invalid(
                    "target_piece_count",
                    "must_be_positive",
                    Some("0".to_string()),
                ));
            }
        }
    }

    for (index, tier) in request.announce_tiers.iter().enumerate() {
        if tier.is_empty() {
            return Err(invalid(
                "announce_tiers",
                "empty_tier",
                Some(format!("tier {}", index + 1)),
            ));
        }
        if tier.iter().any(|url| url.trim().is_empty()) {
            return Err(invalid(
                "announce_tiers",
                "blank_tracker",
                Some(format!("tier {}", index + 1)),
            ));
        }
    }

    if request.web_seeds.iter().any(|url| url.trim().is_empty()) {
        return Err(invalid("web_seeds", "blank_url", None));
    }

    if request.optimize_alignment && request.alignment_threshold_bytes.is_none() {
        return Err(invalid(
            "alignment_threshold_bytes",
            "required_with_alignment",
            None,
        ));
    }

    Ok(())
}

/// Piece size to submit for a validated request.
///
/// Manual requests use their override. Auto requests are sized from `total_bytes`
/// when a scan is available; otherwise `None` lets the remote client decide.
///
/// # Errors
///
/// Propagates calculator failures as [`CreationError`].
pub fn resolve_piece_size(
    request: &CreationRequest,
    total_bytes: Option<u64>,
) -> CreationResult<Option<u64>> {
    match (request.piece_size_mode, request.piece_size_bytes, total_bytes) {
        (PieceSizeMode::Manual, Some(size), _) => {
            compute_piece_size(total_bytes.unwrap_or(0), 1, Some(size))?;
            Ok(Some(size))
        }
        (PieceSizeMode::Manual, None, _) => {
            Err(invalid("piece_size_bytes", "required_for_manual", None))
        }
        (PieceSizeMode::Auto, _, Some(total)) => {
            let plan = compute_piece_size(total, request.target_piece_count, None)?;
            Ok(Some(plan.piece_size_bytes))
        }
        (PieceSizeMode::Auto, _, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn request() -> CreationRequest {
        CreationRequest::new("/data/movie")
    }

    #[test]
    fn default_request_is_valid() {
        assert!(validate_request(&request()).is_ok());
    }

    #[test]
    fn relative_path_is_rejected() {
        let mut request = request();
        request.source_path = "data/movie".into();
        let err = validate_request(&request).err();
        assert!(matches!(
            err,
            Some(CreationError::Validation {
                field: "source_path",
                reason: "must_be_absolute",
                ..
            })
        ));
    }

    #[test]
    fn parent_segments_are_rejected() {
        let mut request = request();
        request.source_path = "/mnt/user/data/../../etc".into();
        assert!(matches!(
            validate_request(&request),
            Err(CreationError::Validation {
                field: "source_path",
                reason: "parent_segment",
                ..
            })
        ));
        request.source_path = "/data/Show..2024".into();
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn manual_mode_requires_valid_size() {
        let mut request = request();
        request.piece_size_mode = PieceSizeMode::Manual;
        assert!(matches!(
            validate_request(&request),
            Err(CreationError::Validation {
                field: "piece_size_bytes",
                ..
            })
        ));
        request.piece_size_bytes = Some(100_000);
        let err = validate_request(&request).err();
        assert_eq!(
            err.as_ref().map(CreationError::kind),
            Some(ErrorKind::InvalidPieceSize)
        );
        request.piece_size_bytes = Some(256 * 1024);
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn empty_tracker_tier_is_rejected() {
        let mut request = request();
        request.announce_tiers = vec![vec!["udp://a".into()], Vec::new()];
        assert!(matches!(
            validate_request(&request),
            Err(CreationError::Validation {
                reason: "empty_tier",
                value: Some(ref tier),
                ..
            }) if tier == "tier 2"
        ));
    }

    #[test]
    fn alignment_requires_threshold() {
        let mut request = request();
        request.optimize_alignment = true;
        assert!(validate_request(&request).is_err());
        request.alignment_threshold_bytes = Some(0);
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn piece_size_resolution_follows_mode() -> CreationResult<()> {
        let mut request = request();
        assert_eq!(resolve_piece_size(&request, None)?, None);
        assert_eq!(
            resolve_piece_size(&request, Some(10_000_000_000))?,
            Some(4 * 1024 * 1024)
        );
        request.piece_size_mode = PieceSizeMode::Manual;
        request.piece_size_bytes = Some(1024 * 1024);
        assert_eq!(resolve_piece_size(&request, None)?, Some(1024 * 1024));
        Ok(())
    }
}
