//! Text drawing: plain, drop-shadow and outline passes.
//!
//! Every effect is built from repeated plain draws on a [`DrawSurface`].
//! Colors come in as ARGB and are converted to the surface's ABGR once
//! per call.
//!
//! ```text
//!   NW  N  NE
//!    W  ·  E      outline: 8 ring stamps scaled by thickness,
//!   SW  S  SE              then the text itself at the center
//! ```

use crate::convert::{argb_to_abgr, SHADOW_COLOR};
use crate::draw::DrawSurface;
use crate::font_atlas::FontAtlas;
use crate::registry::FontEntry;

/// Unit offsets of the outline ring, clockwise from north.
pub const OUTLINE_OFFSETS: [(f32, f32); 8] = [
    (0.0, -1.0),
    (1.0, -1.0),
    (1.0, 0.0),
    (1.0, 1.0),
    (0.0, 1.0),
    (-1.0, 1.0),
    (-1.0, 0.0),
    (-1.0, -1.0),
];

/// Fixed drop-shadow offset in pixels, applied to both axes.
pub const SHADOW_OFFSET: f32 = 1.0;

/// How a string is stamped onto a surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextEffect {
    Plain,
    /// Semi-transparent black copy at (+1, +1) underneath.
    Shadow,
    /// Ring of copies in `color` (ARGB) underneath, if the font has an
    /// outline thickness.
    Outline { color: u32 },
}

/// Stamp `text` at `(x, y)` in `color` (ARGB).
///
/// Returns the number of primitive draws issued; empty text issues none.
pub fn draw_text<S: DrawSurface + ?Sized>(
    surface: &mut S,
    entry: &FontEntry,
    text: &str,
    x: f32,
    y: f32,
    color: u32,
    effect: TextEffect,
) -> usize {
    if text.is_empty() {
        return 0;
    }

    let mut passes = 0;
    match effect {
        TextEffect::Plain => {}
        TextEffect::Shadow => {
            surface.add_text(
                entry.handle,
                entry.size,
                [x + SHADOW_OFFSET, y + SHADOW_OFFSET],
                SHADOW_COLOR,
                text,
            );
            passes += 1;
        }
        TextEffect::Outline { color: outline } => {
            if entry.outline_thickness > 0 {
                let t = entry.outline_thickness as f32;
                let outline = argb_to_abgr(outline);
                for (dx, dy) in OUTLINE_OFFSETS {
                    surface.add_text(entry.handle, entry.size, [x + dx * t, y + dy * t], outline, text);
                }
                passes += OUTLINE_OFFSETS.len();
            }
        }
    }

    surface.add_text(entry.handle, entry.size, [x, y], argb_to_abgr(color), text);
    passes + 1
}

/// Single-line bounding box of `text` at the entry's baked size.
///
/// Unresolved fonts, stale handles and empty text all measure `(0, 0)`.
pub fn measure(atlas: &mut dyn FontAtlas, entry: Option<FontEntry>, text: &str) -> (u32, u32) {
    let Some(entry) = entry else {
        return (0, 0);
    };
    if text.is_empty() {
        return (0, 0);
    }
    if !atlas.is_live(entry.handle) {
        log::warn!("Text: measuring with a stale font handle {:?}", entry.handle);
        return (0, 0);
    }

    let [w, h] = atlas.calc_text_size(entry.handle, entry.size, f32::INFINITY, text);
    (w.max(0.0) as u32, h.max(0.0) as u32)
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::{DrawList, TextCommand};
    use crate::font_atlas::FontHandle;

    fn entry(thickness: u32) -> FontEntry {
        FontEntry {
            handle: FontHandle::new(0, 0),
            size: 20.0,
            outline_thickness: thickness,
        }
    }

    fn positions(commands: &[TextCommand]) -> Vec<[f32; 2]> {
        commands.iter().map(|c| c.pos).collect()
    }

    #[test]
    fn test_plain_is_one_pass() {
        let mut list = DrawList::new();
        let passes = draw_text(&mut list, &entry(0), "hi", 10.0, 20.0, 0xFF11_2233, TextEffect::Plain);
        assert_eq!(passes, 1);
        assert_eq!(list.commands()[0].pos, [10.0, 20.0]);
        assert_eq!(list.commands()[0].color, 0xFF33_2211);
        assert_eq!(list.commands()[0].text, "hi");
    }

    #[test]
    fn test_empty_text_draws_nothing() {
        let mut list = DrawList::new();
        for effect in [TextEffect::Plain, TextEffect::Shadow, TextEffect::Outline { color: 0 }] {
            assert_eq!(draw_text(&mut list, &entry(2), "", 0.0, 0.0, 0, effect), 0);
        }
        assert!(list.is_empty());
    }

    #[test]
    fn test_shadow_is_drawn_first_at_offset() {
        let mut list = DrawList::new();
        let passes = draw_text(&mut list, &entry(0), "x", 5.0, 5.0, 0xFFFF_FFFF, TextEffect::Shadow);
        assert_eq!(passes, 2);

        let commands = list.commands();
        assert_eq!(commands[0].pos, [6.0, 6.0]);
        assert_eq!(commands[0].color >> 24, 128);
        assert_eq!(commands[0].color & 0x00FF_FFFF, 0);
        assert_eq!(commands[1].pos, [5.0, 5.0]);
        assert_eq!(commands[1].color, 0xFFFF_FFFF);
    }

    #[test]
    fn test_outline_issues_nine_passes() {
        let mut list = DrawList::new();
        let passes = draw_text(
            &mut list,
            &entry(2),
            "x",
            100.0,
            50.0,
            0xFFFF_FFFF,
            TextEffect::Outline { color: 0xFF00_0000 },
        );
        assert_eq!(passes, 9);
        assert_eq!(list.len(), 9);

        assert_eq!(
            positions(list.commands()),
            vec![
                [100.0, 48.0],
                [102.0, 48.0],
                [102.0, 50.0],
                [102.0, 52.0],
                [100.0, 52.0],
                [98.0, 52.0],
                [98.0, 50.0],
                [98.0, 48.0],
                [100.0, 50.0],
            ]
        );
        assert!(list.commands()[..8].iter().all(|c| c.color == 0xFF00_0000));
        assert_eq!(list.commands()[8].color, 0xFFFF_FFFF);
    }

    #[test]
    fn test_outline_without_thickness_matches_plain() {
        let mut outlined = DrawList::new();
        let mut plain = DrawList::new();
        let passes = draw_text(
            &mut outlined,
            &entry(0),
            "abc",
            1.0,
            2.0,
            0xFF80_4020,
            TextEffect::Outline { color: 0xFF00_0000 },
        );
        draw_text(&mut plain, &entry(0), "abc", 1.0, 2.0, 0xFF80_4020, TextEffect::Plain);
        assert_eq!(passes, 1);
        assert_eq!(outlined.commands(), plain.commands());
    }

    #[test]
    fn test_outline_ring_is_centered() {
        let (sx, sy) = OUTLINE_OFFSETS
            .iter()
            .fold((0.0f32, 0.0f32), |(ax, ay), &(dx, dy)| (ax + dx, ay + dy));
        assert_eq!((sx, sy), (0.0, 0.0));
    }
}
