//! # quill-text
//!
//! Font management for an immediate-mode text overlay. Parses font
//! config files, derives rasterization quality from the font size, keeps
//! a registry of named fonts with an active-font fallback, and records
//! plain, shadowed and outlined text into layered draw lists.
//!
//! ## Architecture
//!
//! ```text
//! fonts.txt ──► parse_config ──► FontProfile ──► derive() ──► RasterConfig
//!                                    │
//!                                    ▼
//!                 FontRegistry ──► FontAtlas (CosmicFontAtlas)
//!                     │                  │
//!                     ▼                  ▼
//!   draw_text(effect) ──► DrawLists   glyph texture (RGBA)
//! ```
//!
//! - **`config`**: Line-oriented font config parser.
//! - **`profile`**: Font profiles and size-derived raster parameters.
//! - **`registry`**: Named font store, active font, load operations.
//! - **`font_atlas`**: Atlas contract, handles, errors.
//! - **`engine`**: `cosmic-text` backed atlas implementation.
//! - **`atlas`**: CPU-side glyph texture with shelf packing.
//! - **`draw`**: Background/foreground draw lists.
//! - **`text`**: Shadow and outline passes, measuring.
//! - **`convert`**: ARGB/ABGR and UTF-16 conversions.

pub mod atlas;
pub mod config;
pub mod convert;
pub mod draw;
pub mod engine;
pub mod font_atlas;
pub mod profile;
pub mod registry;
pub mod text;

// Re-exports for ergonomic use.
pub use atlas::{AtlasRegion, GlyphAtlas, GlyphBitmap};
pub use config::{parse_config, parse_config_file};
pub use convert::{abgr_to_rgba_f32, argb_to_abgr, wide_to_utf8, SHADOW_COLOR};
pub use draw::{DrawList, DrawLists, DrawSurface, RenderLayer, TextCommand};
pub use engine::{find_system_font, CosmicFontAtlas, DEFAULT_ATLAS_SIZE};
pub use font_atlas::{
    AtlasError, FontAtlas, FontHandle, GlyphInfo, GlyphQuad, TextureData, TextureId,
};
pub use profile::{
    outline_thickness, DerivedProfile, FontProfile, GlyphRanges, LegacyOverrides, RasterConfig,
    RasterFlags, DEFAULT_FONT_SIZE,
};
pub use registry::{BatchReport, FontEntry, FontError, FontRegistry};
pub use text::{draw_text, measure, TextEffect, OUTLINE_OFFSETS, SHADOW_OFFSET};
