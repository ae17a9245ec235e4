//! Color and string conversions at the host boundary.
//!
//! Host code speaks packed ARGB (`0xAARRGGBB`) colors and UTF-16 strings;
//! draw surfaces consume packed ABGR (`0xAABBGGRR`) and UTF-8.

/// Translucent black used for drop shadows (alpha 128), already in ABGR.
pub const SHADOW_COLOR: u32 = 0x8000_0000;

/// Reorder a packed ARGB color into ABGR by swapping the red and blue bytes.
///
/// ```
/// assert_eq!(quill_text::argb_to_abgr(0xFF11_2233), 0xFF33_2211);
/// ```
pub const fn argb_to_abgr(argb: u32) -> u32 {
    let a = (argb >> 24) & 0xFF;
    let r = (argb >> 16) & 0xFF;
    let g = (argb >> 8) & 0xFF;
    let b = argb & 0xFF;
    (a << 24) | (b << 16) | (g << 8) | r
}

/// Unpack an ABGR color into normalized `[r, g, b, a]`.
pub fn abgr_to_rgba_f32(abgr: u32) -> [f32; 4] {
    let channel = |shift: u32| ((abgr >> shift) & 0xFF) as f32 / 255.0;
    [channel(0), channel(8), channel(16), channel(24)]
}

/// Convert UTF-16 text to UTF-8.
///
/// Unpaired surrogates become U+FFFD. An empty input yields an empty
/// string, which every caller treats as "nothing to draw".
pub fn wide_to_utf8(text: &[u16]) -> String {
    if text.is_empty() {
        return String::new();
    }
    String::from_utf16_lossy(text)
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argb_to_abgr_swaps_red_and_blue() {
        assert_eq!(argb_to_abgr(0xFF11_2233), 0xFF33_2211);
        assert_eq!(argb_to_abgr(0x80FF_0000), 0x8000_00FF);
    }

    #[test]
    fn test_argb_to_abgr_keeps_symmetric_colors() {
        assert_eq!(argb_to_abgr(0xFFFF_FFFF), 0xFFFF_FFFF);
        assert_eq!(argb_to_abgr(0x0000_0000), 0x0000_0000);
        assert_eq!(argb_to_abgr(0x7F40_8040), 0x7F40_8040);
    }

    #[test]
    fn test_argb_to_abgr_is_an_involution() {
        for color in [0x1234_5678u32, 0xDEAD_BEEF, 0x00FF_00FF] {
            assert_eq!(argb_to_abgr(argb_to_abgr(color)), color);
        }
    }

    #[test]
    fn test_shadow_color_is_half_transparent_black() {
        assert_eq!(abgr_to_rgba_f32(SHADOW_COLOR), [0.0, 0.0, 0.0, 128.0 / 255.0]);
    }

    #[test]
    fn test_abgr_unpack_channel_order() {
        let rgba = abgr_to_rgba_f32(0xFF00_00FF);
        assert_eq!(rgba, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_wide_to_utf8_ascii_and_hangul() {
        let wide: Vec<u16> = "Hi 안녕".encode_utf16().collect();
        assert_eq!(wide_to_utf8(&wide), "Hi 안녕");
    }

    #[test]
    fn test_wide_to_utf8_empty() {
        assert!(wide_to_utf8(&[]).is_empty());
    }

    #[test]
    fn test_wide_to_utf8_unpaired_surrogate() {
        assert_eq!(wide_to_utf8(&[0x0041, 0xD800]), "A\u{FFFD}");
    }
}
