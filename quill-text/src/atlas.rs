//! Glyph atlas: CPU-side RGBA texture holding rasterized glyphs.
//!
//! Row-based "shelf" packing: each shelf is as tall as the tallest glyph
//! placed on it, and a new shelf opens when a glyph does not fit the
//! existing ones. The texture is uploaded by the render backend whenever
//! `dirty` is set.

use std::collections::HashMap;
use std::hash::Hash;

/// A region within the atlas texture (UV coordinates normalized to [0,1]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasRegion {
    pub u_min: f32,
    pub v_min: f32,
    pub u_max: f32,
    pub v_max: f32,
}

/// Source pixels for one glyph.
#[derive(Clone, Copy, Debug)]
pub enum GlyphBitmap<'a> {
    /// One coverage byte per pixel, drawn as white with that alpha.
    Mask(&'a [u8]),
    /// Four bytes per pixel, copied as-is (color glyphs).
    Rgba(&'a [u8]),
}

/// Pixel-space rectangle within the atlas.
#[derive(Clone, Copy, Debug)]
struct AtlasRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

struct Shelf {
    y: u32,
    height: u32,
    cursor_x: u32,
}

/// Square RGBA glyph texture keyed by `K`.
pub struct GlyphAtlas<K> {
    /// Width and height in pixels.
    pub size: u32,
    /// RGBA pixel data (size * size * 4 bytes).
    pub data: Vec<u8>,
    /// Whether data has changed since last GPU upload.
    pub dirty: bool,
    rects: HashMap<K, AtlasRect>,
    shelves: Vec<Shelf>,
    /// Padding between glyphs in pixels.
    padding: u32,
}

impl<K: Hash + Eq + Copy> GlyphAtlas<K> {
    /// Create an empty atlas of `size` × `size` pixels.
    pub fn new(size: u32) -> Self {
        let pixel_count = (size as usize) * (size as usize) * 4;
        Self {
            size,
            data: vec![0u8; pixel_count],
            dirty: false,
            rects: HashMap::new(),
            shelves: Vec::new(),
            padding: 1,
        }
    }

    pub fn glyph_count(&self) -> usize {
        self.rects.len()
    }

    pub fn get(&self, key: K) -> Option<AtlasRegion> {
        self.rects.get(&key).map(|r| self.rect_to_region(r))
    }

    /// Insert a glyph bitmap, scaling mask coverage by `multiply`.
    ///
    /// Returns the cached region if `key` is already present, or `None`
    /// when the atlas has no room left.
    pub fn insert(
        &mut self,
        key: K,
        width: u32,
        height: u32,
        bitmap: GlyphBitmap<'_>,
        multiply: f32,
    ) -> Option<AtlasRegion> {
        if let Some(region) = self.get(key) {
            return Some(region);
        }

        let rect = self.allocate(width, height)?;
        self.blit_bitmap(&rect, bitmap, multiply);

        self.rects.insert(key, rect);
        self.dirty = true;

        Some(self.rect_to_region(&rect))
    }

    /// Reset the atlas (clear all glyphs).
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.rects.clear();
        self.shelves.clear();
        self.dirty = true;
    }

    // ---------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------

    fn allocate(&mut self, width: u32, height: u32) -> Option<AtlasRect> {
        let padded_w = width + self.padding;
        let padded_h = height + self.padding;

        for shelf in &mut self.shelves {
            if shelf.height >= padded_h && shelf.cursor_x + padded_w <= self.size {
                let rect = AtlasRect {
                    x: shelf.cursor_x,
                    y: shelf.y,
                    width,
                    height,
                };
                shelf.cursor_x += padded_w;
                return Some(rect);
            }
        }

        let shelf_y = self.shelves.last().map(|s| s.y + s.height).unwrap_or(0);
        if shelf_y + padded_h > self.size || padded_w > self.size {
            return None;
        }

        self.shelves.push(Shelf {
            y: shelf_y,
            height: padded_h,
            cursor_x: padded_w,
        });

        Some(AtlasRect {
            x: 0,
            y: shelf_y,
            width,
            height,
        })
    }

    fn blit_bitmap(&mut self, rect: &AtlasRect, bitmap: GlyphBitmap<'_>, multiply: f32) {
        for row in 0..rect.height {
            for col in 0..rect.width {
                let dst_idx = (((rect.y + row) * self.size + rect.x + col) * 4) as usize;
                let src_idx = (row * rect.width + col) as usize;

                let pixel = match bitmap {
                    GlyphBitmap::Mask(coverage) => match coverage.get(src_idx) {
                        Some(&alpha) => [255, 255, 255, scale_alpha(alpha, multiply)],
                        None => continue,
                    },
                    GlyphBitmap::Rgba(rgba) => match rgba.get(src_idx * 4..src_idx * 4 + 4) {
                        Some(px) => [px[0], px[1], px[2], px[3]],
                        None => continue,
                    },
                };

                if let Some(dst) = self.data.get_mut(dst_idx..dst_idx + 4) {
                    dst.copy_from_slice(&pixel);
                }
            }
        }
    }

    fn rect_to_region(&self, rect: &AtlasRect) -> AtlasRegion {
        let inv = 1.0 / self.size as f32;
        AtlasRegion {
            u_min: rect.x as f32 * inv,
            v_min: rect.y as f32 * inv,
            u_max: (rect.x + rect.width) as f32 * inv,
            v_max: (rect.y + rect.height) as f32 * inv,
        }
    }
}

/// Brightness boost, saturating at full coverage.
fn scale_alpha(alpha: u8, multiply: f32) -> u8 {
    (alpha as f32 * multiply).round().min(255.0) as u8
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(len: usize, value: u8) -> Vec<u8> {
        vec![value; len]
    }

    #[test]
    fn test_atlas_creation() {
        let atlas = GlyphAtlas::<u16>::new(256);
        assert_eq!(atlas.size, 256);
        assert_eq!(atlas.data.len(), 256 * 256 * 4);
        assert_eq!(atlas.glyph_count(), 0);
        assert!(!atlas.dirty);
    }

    #[test]
    fn test_insert_single_glyph() {
        let mut atlas = GlyphAtlas::new(256);
        let bitmap = mask(8 * 8, 255);
        let r = atlas.insert(1u16, 8, 8, GlyphBitmap::Mask(&bitmap), 1.0).unwrap();
        assert_eq!(atlas.glyph_count(), 1);
        assert!(atlas.dirty);
        assert!(r.u_min >= 0.0 && r.u_min < r.u_max && r.u_max <= 1.0);
        assert!(r.v_min >= 0.0 && r.v_min < r.v_max && r.v_max <= 1.0);
    }

    #[test]
    fn test_insert_duplicate_returns_cached() {
        let mut atlas = GlyphAtlas::new(256);
        let bitmap = mask(10 * 10, 128);
        let r1 = atlas.insert(42u16, 10, 10, GlyphBitmap::Mask(&bitmap), 1.0).unwrap();
        let r2 = atlas.insert(42u16, 10, 10, GlyphBitmap::Mask(&bitmap), 1.0).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(atlas.glyph_count(), 1);
    }

    #[test]
    fn test_atlas_full_returns_none() {
        let mut atlas = GlyphAtlas::new(64);
        // 30x30 glyphs + 1px padding: two per shelf, two shelves.
        let bitmap = mask(30 * 30, 255);
        for key in 1u16..=4 {
            assert!(atlas.insert(key, 30, 30, GlyphBitmap::Mask(&bitmap), 1.0).is_some());
        }
        assert!(
            atlas.insert(5u16, 30, 30, GlyphBitmap::Mask(&bitmap), 1.0).is_none(),
            "Atlas should be full"
        );
    }

    #[test]
    fn test_get_missing_glyph() {
        let atlas = GlyphAtlas::<u16>::new(256);
        assert!(atlas.get(99).is_none());
    }

    #[test]
    fn test_clear() {
        let mut atlas = GlyphAtlas::new(256);
        let bitmap = mask(8 * 8, 255);
        atlas.insert(1u16, 8, 8, GlyphBitmap::Mask(&bitmap), 1.0);
        atlas.insert(2u16, 8, 8, GlyphBitmap::Mask(&bitmap), 1.0);
        atlas.dirty = false;

        atlas.clear();
        assert_eq!(atlas.glyph_count(), 0);
        assert!(atlas.dirty);
        assert!(atlas.get(1).is_none());
        assert!(atlas.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_rgba_bitmap_blit() {
        let mut atlas = GlyphAtlas::new(64);
        let bitmap = [
            255, 0, 0, 255, //
            0, 255, 0, 255, //
            0, 0, 255, 255, //
            255, 255, 0, 255,
        ];
        atlas.insert(10u16, 2, 2, GlyphBitmap::Rgba(&bitmap), 1.0).unwrap();
        assert_eq!(&atlas.data[0..4], &[255, 0, 0, 255]);
        assert_eq!(&atlas.data[4..8], &[0, 255, 0, 255]);
    }

    #[test]
    fn test_mask_blit_is_white_with_coverage() {
        let mut atlas = GlyphAtlas::new(64);
        atlas.insert(3u16, 1, 1, GlyphBitmap::Mask(&[100]), 1.0).unwrap();
        assert_eq!(&atlas.data[0..4], &[255, 255, 255, 100]);
    }

    #[test]
    fn test_multiply_brightens_and_saturates() {
        let mut atlas = GlyphAtlas::new(64);
        atlas.insert(1u16, 2, 1, GlyphBitmap::Mask(&[100, 250]), 1.3).unwrap();
        assert_eq!(atlas.data[3], 130);
        assert_eq!(atlas.data[7], 255);
    }

    #[test]
    fn test_multiply_does_not_touch_color_glyphs() {
        let mut atlas = GlyphAtlas::new(64);
        atlas.insert(1u16, 1, 1, GlyphBitmap::Rgba(&[10, 20, 30, 100]), 2.0).unwrap();
        assert_eq!(&atlas.data[0..4], &[10, 20, 30, 100]);
    }

    #[test]
    fn test_shelf_packing_fills_rows() {
        let mut atlas = GlyphAtlas::new(128);
        let bitmap = mask(10 * 10, 128);
        for key in 0..10u16 {
            assert!(atlas.insert(key, 10, 10, GlyphBitmap::Mask(&bitmap), 1.0).is_some());
        }
        // 10 * (10 + 1) = 110 < 128: one shelf.
        assert_eq!(atlas.shelves.len(), 1);

        atlas.insert(10u16, 10, 10, GlyphBitmap::Mask(&bitmap), 1.0).unwrap();
        atlas.insert(11u16, 10, 10, GlyphBitmap::Mask(&bitmap), 1.0).unwrap();
        assert_eq!(atlas.shelves.len(), 2);
    }

    #[test]
    fn test_short_bitmap_does_not_panic() {
        let mut atlas = GlyphAtlas::new(64);
        assert!(atlas.insert(1u16, 4, 4, GlyphBitmap::Mask(&[255; 3]), 1.0).is_some());
        assert!(atlas.insert(2u16, 4, 4, GlyphBitmap::Rgba(&[255; 5]), 1.0).is_some());
    }
}
