//! Font atlas service contract.
//!
//! The atlas owns every loaded font and the glyph texture. Callers hold
//! [`FontHandle`]s, which are plain `(slot, generation)` tokens: clearing
//! the atlas bumps the generation and every handle issued before it goes
//! stale. [`FontAtlas::is_live`] tells the two apart.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::atlas::AtlasRegion;
use crate::profile::RasterConfig;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Failed to read font file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Rasterizer rejected font data ({0})")]
    Rejected(String),
    #[error("Could not copy {len} bytes of font data into the atlas")]
    DataCopy { len: usize },
    #[error("Atlas build failed: {0}")]
    Build(String),
    #[error("Font handle {0:?} is stale")]
    StaleHandle(FontHandle),
}

/// Non-owning reference to a font inside an atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontHandle {
    slot: u32,
    generation: u32,
}

impl FontHandle {
    pub const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub const fn slot(self) -> u32 {
        self.slot
    }

    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Renderer-assigned identifier of the uploaded atlas texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Borrowed RGBA8 pixels of the atlas texture.
#[derive(Clone, Copy, Debug)]
pub struct TextureData<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

/// Metrics and atlas placement of a single glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphInfo {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
    pub advance_x: f32,
}

/// A rasterized glyph in screen space.
#[derive(Clone, Copy, Debug)]
pub struct GlyphQuad {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub region: AtlasRegion,
}

/// The glyph atlas a font registry loads into.
pub trait FontAtlas {
    /// Load an outline font file at `size` pixels.
    fn add_font_from_file(
        &mut self,
        path: &Path,
        size: f32,
        config: &RasterConfig,
    ) -> Result<FontHandle, AtlasError>;

    /// Load a font from bytes. The bytes are copied; the caller's buffer
    /// may be dropped as soon as this returns.
    fn add_font_from_memory(
        &mut self,
        data: &[u8],
        size: f32,
        config: &RasterConfig,
    ) -> Result<FontHandle, AtlasError>;

    /// Drop every font and glyph. Handles issued so far become stale.
    fn clear(&mut self);

    /// (Re)build the glyph texture for the loaded fonts.
    fn build(&mut self) -> Result<(), AtlasError>;

    /// Current handle generation.
    fn generation(&self) -> u32;

    /// Number of fonts loaded in the current generation.
    fn font_count(&self) -> usize;

    fn is_live(&self, handle: FontHandle) -> bool {
        handle.generation() == self.generation() && (handle.slot() as usize) < self.font_count()
    }

    /// Bounding box of `text` laid out at `size`, wrapping at `max_width`
    /// (`f32::INFINITY` for a single unwrapped line).
    fn calc_text_size(&mut self, font: FontHandle, size: f32, max_width: f32, text: &str) -> [f32; 2];

    /// Rasterize the glyphs of `text` and place them relative to `origin`,
    /// snapped to the font's sub-pixel grid.
    fn layout_glyphs(
        &mut self,
        font: FontHandle,
        size: f32,
        origin: [f32; 2],
        text: &str,
    ) -> Vec<GlyphQuad>;

    /// Metrics for one character; `None` if it has no visible glyph.
    fn glyph_info(&mut self, font: FontHandle, size: f32, ch: char) -> Option<GlyphInfo>;

    fn texture_data(&self) -> TextureData<'_>;

    /// Whether glyphs were packed since the texture was last uploaded.
    fn texture_dirty(&self) -> bool;

    fn mark_texture_uploaded(&mut self);

    /// True once after the atlas dropped its packed glyphs to make room.
    /// Quads laid out before the reset point at stale texture regions.
    fn take_texture_reset(&mut self) -> bool {
        false
    }

    fn set_texture_id(&mut self, id: Option<TextureId>);

    fn texture_id(&self) -> Option<TextureId>;
}
