//! Piece size calculator.

use crate::error::PieceSizeError;
use crate::model::PieceSizePlan;

/// Smallest piece size accepted for manual overrides (16 KiB).
pub const MIN_PIECE_SIZE: u64 = 16 * 1024;
/// Largest piece size used or accepted (16 MiB).
pub const MAX_PIECE_SIZE: u64 = 16 * 1024 * 1024;
/// Starting point for automatic sizing (64 KiB).
pub const AUTO_START_PIECE_SIZE: u64 = 64 * 1024;

/// Whether `value` is an acceptable manual piece size.
#[must_use]
pub const fn is_valid_piece_size(value: u64) -> bool {
    value.is_power_of_two() && value >= MIN_PIECE_SIZE && value <= MAX_PIECE_SIZE
}

/// Compute a piece size plan for `total_bytes` of content.
///
/// Without `manual`, the size starts at 64 KiB and doubles while the piece count
/// exceeds `target_pieces`, capped at 16 MiB.
///
/// # Errors
///
/// Returns [`PieceSizeError::InvalidArgument`] when `target_pieces` is zero and
/// [`PieceSizeError::InvalidPieceSize`] when `manual` is outside the accepted range.
pub fn compute_piece_size(
    total_bytes: u64,
    target_pieces: u64,
    manual: Option<u64>,
) -> Result<PieceSizePlan, PieceSizeError> {
    if target_pieces == 0 {
        return Err(PieceSizeError::InvalidArgument {
            field: "target_pieces",
            value: target_pieces,
        });
    }

    let piece_size = match manual {
        Some(value) if is_valid_piece_size(value) => value,
        Some(value) => return Err(PieceSizeError::InvalidPieceSize { value }),
        None => {
            let mut size = AUTO_START_PIECE_SIZE;
            while total_bytes.div_ceil(size) > target_pieces && size < MAX_PIECE_SIZE {
                size *= 2;
            }
            size
        }
    };

    let piece_count = total_bytes.div_ceil(piece_size);
    let capacity = u128::from(piece_count) * u128::from(piece_size);
    let wasted_bytes = u64::try_from(capacity - u128::from(total_bytes)).unwrap_or(u64::MAX);

    Ok(PieceSizePlan {
        piece_size_bytes: piece_size,
        piece_count,
        efficiency_percent: efficiency(total_bytes, capacity),
        wasted_bytes,
    })
}

#[allow(clippy::cast_precision_loss)]
fn efficiency(total_bytes: u64, capacity: u128) -> f64 {
    if capacity == 0 {
        100.0
    } else {
        (total_bytes as f64 / capacity as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn ten_gibibytes_double_past_the_target() -> Result<(), PieceSizeError> {
        let plan = compute_piece_size(10 * GIB, 2500, None)?;
        assert_eq!(plan.piece_size_bytes, 8 * 1024 * 1024);
        assert_eq!(plan.piece_count, 1280);
        Ok(())
    }

    #[test]
    fn ten_decimal_gigabytes_yield_expected_count() -> Result<(), PieceSizeError> {
        let plan = compute_piece_size(10_000_000_000, 2500, None)?;
        assert_eq!(plan.piece_size_bytes, 4 * 1024 * 1024);
        assert_eq!(plan.piece_count, 2385);
        Ok(())
    }

    #[test]
    fn empty_content_is_fully_efficient() -> Result<(), PieceSizeError> {
        let plan = compute_piece_size(0, 2500, None)?;
        assert_eq!(plan.piece_size_bytes, 65_536);
        assert_eq!(plan.piece_count, 0);
        assert!((plan.efficiency_percent - 100.0).abs() < f64::EPSILON);
        assert_eq!(plan.wasted_bytes, 0);
        Ok(())
    }

    #[test]
    fn manual_size_counts_waste() -> Result<(), PieceSizeError> {
        let plan = compute_piece_size(1_000_000, 2500, Some(128 * 1024))?;
        assert_eq!(plan.piece_count, 8);
        assert_eq!(plan.wasted_bytes, 48_576);
        assert!(plan.efficiency_percent < 100.0);
        Ok(())
    }

    #[test]
    fn manual_size_must_be_power_of_two_in_range() {
        for value in [0, 8 * 1024, 100_000, 32 * 1024 * 1024] {
            assert_eq!(
                compute_piece_size(1_000, 10, Some(value)),
                Err(PieceSizeError::InvalidPieceSize { value })
            );
        }
        assert!(compute_piece_size(1_000, 10, Some(MIN_PIECE_SIZE)).is_ok());
        assert!(compute_piece_size(1_000, 10, Some(MAX_PIECE_SIZE)).is_ok());
    }

    #[test]
    fn zero_target_is_rejected() {
        assert!(matches!(
            compute_piece_size(1_000, 0, None),
            Err(PieceSizeError::InvalidArgument {
                field: "target_pieces",
                ..
            })
        ));
    }

    #[test]
    fn auto_size_caps_at_sixteen_mebibytes() -> Result<(), PieceSizeError> {
        let plan = compute_piece_size(1024 * GIB, 100, None)?;
        assert_eq!(plan.piece_size_bytes, MAX_PIECE_SIZE);
        assert_eq!(plan.piece_count, 65_536);
        Ok(())
    }

    #[test]
    fn plan_invariants_hold_across_sizes() -> Result<(), PieceSizeError> {
        for total in [1, 65_535, 65_536, 65_537, 3 * GIB + 17] {
            let plan = compute_piece_size(total, 2500, None)?;
            assert_eq!(plan.piece_count, total.div_ceil(plan.piece_size_bytes));
            assert_eq!(
                plan.wasted_bytes,
                plan.piece_count * plan.piece_size_bytes - total
            );
            assert!(plan.efficiency_percent > 0.0 && plan.efficiency_percent <= 100.0);
        }
        Ok(())
    }
}
