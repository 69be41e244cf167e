//! Error-Correction Level Policy
//!
//! Levels use the 0-8 scale of the matrix encoder, where 8 is the highest
//! redundancy tier. `None` leaves the choice to the encoder.

use std::ops::RangeInclusive;

use crate::symbology::Symbology;

/// Highest QR error-correction tier.
pub const MAX_QR_ECC_LEVEL: u8 = 8;

/// A center image hides modules, so QR codes carrying one are forced to the
/// highest tier. Every other case is returned unchanged.
pub fn resolve_ecc_level(symbology: Symbology, requested: Option<u8>, has_overlay: bool) -> Option<u8> {
    if symbology != Symbology::QrCode || !has_overlay {
        return requested;
    }

    match requested {
        Some(level) if level >= MAX_QR_ECC_LEVEL => requested,
        _ => {
            log::info!(
                "To draw an image on a QR code the maximum ecc level is required, using {}",
                MAX_QR_ECC_LEVEL
            );
            Some(MAX_QR_ECC_LEVEL)
        }
    }
}

/// Fit a level into the range the encoder accepts for `symbology`.
///
/// `range == None` means the symbology has no error correction and the level
/// is dropped.
pub fn clamp_to_range(
    symbology: Symbology,
    level: Option<u8>,
    range: Option<RangeInclusive<u8>>,
) -> Option<u8> {
    let level = level?;
    let Some(range) = range else {
        log::debug!("{} has no error correction, ignoring ecc level {}", symbology, level);
        return None;
    };

    let clamped = level.clamp(*range.start(), *range.end());
    if clamped != level {
        log::warn!(
            "ecc level {} is outside {}..={} for {}, using {}",
            level,
            range.start(),
            range.end(),
            symbology,
            clamped
        );
    }
    Some(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_raises_low_qr_level() {
        assert_eq!(resolve_ecc_level(Symbology::QrCode, Some(3), true), Some(8));
        assert_eq!(resolve_ecc_level(Symbology::QrCode, Some(0), true), Some(8));
    }

    #[test]
    fn test_overlay_raises_unset_qr_level() {
        assert_eq!(resolve_ecc_level(Symbology::QrCode, None, true), Some(8));
    }

    #[test]
    fn test_max_level_is_kept() {
        assert_eq!(resolve_ecc_level(Symbology::QrCode, Some(8), true), Some(8));
    }

    #[test]
    fn test_no_overlay_keeps_level() {
        assert_eq!(resolve_ecc_level(Symbology::QrCode, Some(3), false), Some(3));
        assert_eq!(resolve_ecc_level(Symbology::QrCode, None, false), None);
    }

    #[test]
    fn test_non_qr_is_unaffected() {
        assert_eq!(resolve_ecc_level(Symbology::Code128, Some(3), true), Some(3));
        assert_eq!(resolve_ecc_level(Symbology::MicroQrCode, Some(3), true), Some(3));
        assert_eq!(resolve_ecc_level(Symbology::DataMatrix, None, true), None);
    }

    #[test]
    fn test_clamp_to_range() {
        assert_eq!(clamp_to_range(Symbology::QrCode, Some(12), Some(0..=8)), Some(8));
        assert_eq!(clamp_to_range(Symbology::MicroQrCode, Some(8), Some(0..=6)), Some(6));
        assert_eq!(clamp_to_range(Symbology::QrCode, Some(4), Some(0..=8)), Some(4));
        assert_eq!(clamp_to_range(Symbology::QrCode, None, Some(0..=8)), None);
    }

    #[test]
    fn test_clamp_drops_level_without_ecc() {
        assert_eq!(clamp_to_range(Symbology::Code128, Some(3), None), None);
    }
}
