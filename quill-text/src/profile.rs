//! Font profiles and size-dependent rasterization parameters.
//!
//! A [`FontProfile`] is what a config block (or a direct load call)
//! authors: name, source path, pixel size, outline toggle. Everything
//! else is derived from the size:
//!
//! ```text
//!  size < 12        → oversample 3×3, brightness 1.3, pixel snap, light hinting
//!  12 ≤ size ≤ 24   → oversample 4×4, brightness 1.2,             light hinting
//!  size > 24        → oversample 2×2, brightness 1.0,             no hinting
//! ```
//!
//! Color glyphs are requested at every size.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;

/// Size used when a profile does not author one.
pub const DEFAULT_FONT_SIZE: f32 = 14.0;

/// Outline thickness as a fraction of the font size.
const OUTLINE_RATIO: f32 = 0.05;

// ── Rasterizer flags ────────────────────────────────────────────────

/// Rasterizer quality flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RasterFlags(u32);

impl RasterFlags {
    pub const NONE: Self = Self(0);
    /// Disable hinting entirely.
    pub const NO_HINTING: Self = Self(1 << 0);
    /// Light hinting (vertical only).
    pub const LIGHT_HINTING: Self = Self(1 << 3);
    /// Load color glyph bitmaps (emoji). Only glyphs inside the font's
    /// [`GlyphRanges`] are packed, and [`GlyphRanges::DEFAULT`] holds no
    /// emoji block; color glyphs need ranges that include one, such as
    /// [`GlyphRanges::WITH_EMOJI`].
    pub const LOAD_COLOR: Self = Self(1 << 8);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RasterFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RasterFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for RasterFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

// ── Glyph ranges ────────────────────────────────────────────────────

/// Inclusive Unicode ranges a font is baked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphRanges(&'static [(u32, u32)]);

impl GlyphRanges {
    /// Latin, Cyrillic, punctuation, Japanese kana, CJK ideographs, Hangul.
    pub const DEFAULT: Self = Self(&[
        (0x0020, 0x00FF), // Basic Latin + Latin-1 Supplement
        (0x0100, 0x017F), // Latin Extended-A
        (0x0180, 0x024F), // Latin Extended-B
        (0x0400, 0x052F), // Cyrillic + Cyrillic Supplement
        (0x2000, 0x206F), // General Punctuation
        (0x3000, 0x30FF), // CJK Symbols and Punctuation, Hiragana, Katakana
        (0x4E00, 0x9FAF), // CJK Ideographs
        (0xAC00, 0xD7A3), // Hangul Syllables
    ]);

    /// [`GlyphRanges::DEFAULT`] plus the pictographic emoji blocks.
    pub const WITH_EMOJI: Self = Self(&[
        (0x0020, 0x00FF),
        (0x0100, 0x017F),
        (0x0180, 0x024F),
        (0x0400, 0x052F),
        (0x2000, 0x206F),
        (0x2600, 0x27BF),   // Miscellaneous Symbols, Dingbats
        (0x3000, 0x30FF),
        (0x4E00, 0x9FAF),
        (0xAC00, 0xD7A3),
        (0x1F300, 0x1FAFF), // Pictographs, Emoticons, Transport, Supplemental
    ]);

    pub const fn new(ranges: &'static [(u32, u32)]) -> Self {
        Self(ranges)
    }

    pub fn ranges(&self) -> &'static [(u32, u32)] {
        self.0
    }

    /// Whether `ch` falls inside one of the ranges.
    pub fn contains(&self, ch: char) -> bool {
        let code = ch as u32;
        self.0.iter().any(|&(lo, hi)| (lo..=hi).contains(&code))
    }
}

impl Default for GlyphRanges {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ── Raster config ───────────────────────────────────────────────────

/// Derived rasterization parameters handed to the atlas with each font.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterConfig {
    /// Horizontal sub-pixel positioning resolution.
    pub oversample_h: u8,
    /// Vertical sub-pixel positioning resolution.
    pub oversample_v: u8,
    /// Glyph coverage multiplier (brightness boost).
    pub rasterizer_multiply: f32,
    /// Snap glyph pen positions to whole pixels horizontally.
    pub pixel_snap_h: bool,
    pub flags: RasterFlags,
    pub glyph_ranges: GlyphRanges,
}

impl RasterConfig {
    /// Quality tier for a pixel size.
    pub fn for_size(size: f32) -> Self {
        let (oversample, rasterizer_multiply, pixel_snap_h, hinting) = if size < 12.0 {
            (3, 1.3, true, RasterFlags::LIGHT_HINTING)
        } else if size <= 24.0 {
            (4, 1.2, false, RasterFlags::LIGHT_HINTING)
        } else {
            (2, 1.0, false, RasterFlags::NO_HINTING)
        };

        Self {
            oversample_h: oversample,
            oversample_v: oversample,
            rasterizer_multiply,
            pixel_snap_h,
            flags: hinting | RasterFlags::LOAD_COLOR,
            glyph_ranges: GlyphRanges::DEFAULT,
        }
    }

    /// Quantize a horizontal pen position.
    pub fn snap_x(&self, x: f32) -> f32 {
        if self.pixel_snap_h {
            x.round()
        } else {
            quantize(x, self.oversample_h)
        }
    }

    /// Quantize a vertical pen position.
    pub fn snap_y(&self, y: f32) -> f32 {
        quantize(y, self.oversample_v)
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self::for_size(DEFAULT_FONT_SIZE)
    }
}

fn quantize(value: f32, steps: u8) -> f32 {
    let steps = f32::from(steps.max(1));
    (value * steps).round() / steps
}

/// Outline ring offset in pixels; `0` disables the outline pass.
pub fn outline_thickness(size: f32, enable_outline: bool) -> u32 {
    if !enable_outline {
        return 0;
    }
    ((size * OUTLINE_RATIO).round() as u32).max(1)
}

// ── Profiles ────────────────────────────────────────────────────────

/// Manual overrides accepted from older config files.
///
/// They are parsed so they can be reported, but derivation from the size
/// always takes precedence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LegacyOverrides {
    pub oversample_h: Option<i32>,
    pub oversample_v: Option<i32>,
    pub rasterizer_multiply: Option<f32>,
    pub outline_thickness: Option<i32>,
    pub pixel_snap_h: Option<bool>,
}

impl LegacyOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An authored font request, consumed once by a load.
#[derive(Clone, Debug, PartialEq)]
pub struct FontProfile {
    pub name: String,
    /// Outline font file; empty for in-memory sources.
    pub path: PathBuf,
    /// Pixel size.
    pub size: f32,
    pub enable_outline: bool,
    pub legacy: LegacyOverrides,
}

impl Default for FontProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            path: PathBuf::new(),
            size: DEFAULT_FONT_SIZE,
            enable_outline: false,
            legacy: LegacyOverrides::default(),
        }
    }
}

impl FontProfile {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        size: f32,
        enable_outline: bool,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
            enable_outline,
            legacy: LegacyOverrides::default(),
        }
    }

    /// Compute the size-dependent parameters for this profile.
    pub fn derive(&self) -> DerivedProfile {
        DerivedProfile::new(self.size, self.enable_outline)
    }
}

/// Parameters computed from `(size, enable_outline)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DerivedProfile {
    pub raster: RasterConfig,
    pub outline_thickness: u32,
}

impl DerivedProfile {
    pub fn new(size: f32, enable_outline: bool) -> Self {
        Self {
            raster: RasterConfig::for_size(size),
            outline_thickness: outline_thickness(size, enable_outline),
        }
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(size: f32) -> (u8, u8, f32, bool) {
        let r = RasterConfig::for_size(size);
        (r.oversample_h, r.oversample_v, r.rasterizer_multiply, r.pixel_snap_h)
    }

    #[test]
    fn test_small_tier() {
        assert_eq!(tier(6.0), (3, 3, 1.3, true));
        assert_eq!(tier(11.9), (3, 3, 1.3, true));
    }

    #[test]
    fn test_medium_tier_inclusive_bounds() {
        assert_eq!(tier(12.0), (4, 4, 1.2, false));
        assert_eq!(tier(18.0), (4, 4, 1.2, false));
        assert_eq!(tier(24.0), (4, 4, 1.2, false));
    }

    #[test]
    fn test_large_tier() {
        assert_eq!(tier(24.1), (2, 2, 1.0, false));
        assert_eq!(tier(48.0), (2, 2, 1.0, false));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        for size in [6.0, 11.9, 12.0, 18.0, 24.0, 24.1, 48.0] {
            assert_eq!(RasterConfig::for_size(size), RasterConfig::for_size(size));
            assert_eq!(DerivedProfile::new(size, true), DerivedProfile::new(size, true));
        }
    }

    #[test]
    fn test_hinting_flags_per_tier() {
        let small = RasterConfig::for_size(10.0).flags;
        let large = RasterConfig::for_size(32.0).flags;
        assert!(small.contains(RasterFlags::LIGHT_HINTING));
        assert!(!small.contains(RasterFlags::NO_HINTING));
        assert!(large.contains(RasterFlags::NO_HINTING));
        assert!(!large.contains(RasterFlags::LIGHT_HINTING));
    }

    #[test]
    fn test_color_glyphs_always_requested() {
        for size in [6.0, 18.0, 48.0] {
            assert!(RasterConfig::for_size(size).flags.contains(RasterFlags::LOAD_COLOR));
        }
    }

    #[test]
    fn test_outline_thickness_formula() {
        assert_eq!(outline_thickness(10.0, true), 1);
        assert_eq!(outline_thickness(20.0, true), 1);
        assert_eq!(outline_thickness(40.0, true), 2);
        assert_eq!(outline_thickness(4.0, true), 1, "floored at 1");
    }

    #[test]
    fn test_outline_disabled_is_zero() {
        for size in [10.0, 20.0, 40.0, 200.0] {
            assert_eq!(outline_thickness(size, false), 0);
        }
    }

    #[test]
    fn test_profile_derive_uses_size_and_toggle() {
        let profile = FontProfile::new("Title", "fonts/title.ttf", 40.0, true);
        let derived = profile.derive();
        assert_eq!(derived.outline_thickness, 2);
        assert_eq!(derived.raster.oversample_h, 2);
    }

    #[test]
    fn test_profile_default_size() {
        let profile = FontProfile::default();
        assert_eq!(profile.size, DEFAULT_FONT_SIZE);
        assert!(!profile.enable_outline);
        assert!(profile.legacy.is_empty());
    }

    #[test]
    fn test_pixel_snap_rounds_to_whole_pixels() {
        let small = RasterConfig::for_size(10.0);
        assert_eq!(small.snap_x(3.4), 3.0);
        assert_eq!(small.snap_x(3.6), 4.0);
    }

    #[test]
    fn test_oversample_quantizes_to_fraction() {
        let medium = RasterConfig::for_size(16.0);
        assert_eq!(medium.snap_x(3.3), 3.25);
        assert_eq!(medium.snap_y(1.1), 1.0);
    }

    #[test]
    fn test_glyph_ranges_membership() {
        let ranges = GlyphRanges::DEFAULT;
        assert!(ranges.contains('A'));
        assert!(ranges.contains('Ж'));
        assert!(ranges.contains('あ'));
        assert!(ranges.contains('한'));
        assert!(ranges.contains('中'));
        assert!(!ranges.contains('\u{1F600}'));
        assert!(!ranges.contains('\n'));
    }

    #[test]
    fn test_color_glyphs_need_emoji_ranges() {
        let config = RasterConfig::for_size(18.0);
        assert!(config.flags.contains(RasterFlags::LOAD_COLOR));
        assert!(!config.glyph_ranges.contains('\u{1F600}'));

        let emoji = GlyphRanges::WITH_EMOJI;
        assert!(emoji.contains('\u{1F600}'));
        assert!(emoji.contains('\u{2764}'));
        for &(lo, hi) in GlyphRanges::DEFAULT.ranges() {
            assert!(emoji.ranges().contains(&(lo, hi)), "{lo:#X}..={hi:#X} missing");
        }
    }

    #[test]
    fn test_flags_display() {
        let flags = RasterFlags::LIGHT_HINTING | RasterFlags::LOAD_COLOR;
        assert_eq!(flags.to_string(), "0x108");
    }
}
