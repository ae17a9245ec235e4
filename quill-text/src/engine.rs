//! cosmic-text backed font atlas.
//!
//! Fonts are registered in a private `fontdb` database owned by a
//! `FontSystem`; each loaded face gets a slot recording its family, its
//! style attributes and the derived [`RasterConfig`]. Text is shaped with
//! cosmic-text, rasterized with its `SwashCache`, and packed into a
//! [`GlyphAtlas`] on demand. When the texture fills up outside `build`,
//! every packed glyph is dropped and the current text is packed again;
//! [`FontAtlas::take_texture_reset`] reports this so callers can redo the
//! quads they laid out before the reset.
//!
//! ```text
//! add_font_from_*() ──► fontdb face ──► FontSlot { family, raster }
//!                                            │
//! layout_glyphs(text) ── shape ── swash ─────┴──► GlyphAtlas (RGBA)
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cosmic_text::fontdb::{self, Database, Source};
use cosmic_text::{
    Attrs, Buffer, CacheKey, Family, FontSystem, Metrics, Shaping, Stretch, Style,
    SwashCache, SwashContent, SwashImage, Weight, Wrap,
};
use lru::LruCache;

use crate::atlas::{AtlasRegion, GlyphAtlas, GlyphBitmap};
use crate::font_atlas::{
    AtlasError, FontAtlas, FontHandle, GlyphInfo, GlyphQuad, TextureData, TextureId,
};
use crate::profile::{RasterConfig, RasterFlags};

/// Default atlas side length in pixels.
pub const DEFAULT_ATLAS_SIZE: u32 = 1024;

const MEASURE_CACHE_CAPACITY: usize = 512;

/// Glyph cache key: font slot plus cosmic-text's rasterization key.
type GlyphKey = (u32, CacheKey);

/// `(slot, size bits, wrap width bits, text hash)`.
type MeasureKey = (u32, u32, u32, u64);

/// Cached extent with the text it was measured for, checked on a hit.
type MeasureEntry = (Box<str>, [f32; 2]);

/// One loaded font face.
struct FontSlot {
    family: String,
    weight: Weight,
    style: Style,
    stretch: Stretch,
    /// Size the font was loaded at; used when building the atlas.
    size: f32,
    raster: RasterConfig,
    face_ids: Vec<fontdb::ID>,
}

impl FontSlot {
    fn attrs(&self) -> Attrs<'_> {
        Attrs::new()
            .family(Family::Name(&self.family))
            .weight(self.weight)
            .style(self.style)
            .stretch(self.stretch)
    }
}

/// [`FontAtlas`] implementation on top of cosmic-text.
pub struct CosmicFontAtlas {
    font_system: FontSystem,
    swash_cache: SwashCache,
    glyphs: GlyphAtlas<GlyphKey>,
    slots: Vec<FontSlot>,
    generation: u32,
    /// Set when packed glyphs were dropped to make room.
    texture_reset: bool,
    texture_id: Option<TextureId>,
    measure_cache: LruCache<MeasureKey, MeasureEntry>,
}

impl CosmicFontAtlas {
    /// Create an atlas that only knows the fonts loaded into it.
    pub fn new(atlas_size: u32) -> Self {
        let font_system = FontSystem::new_with_locale_and_db("en-US".to_owned(), Database::new());
        Self::with_font_system(font_system, atlas_size)
    }

    /// Create an atlas whose shaper may fall back to system fonts for
    /// characters missing from a loaded face.
    pub fn with_system_fallback(atlas_size: u32) -> Self {
        Self::with_font_system(FontSystem::new(), atlas_size)
    }

    fn with_font_system(font_system: FontSystem, atlas_size: u32) -> Self {
        let capacity =
            NonZeroUsize::new(MEASURE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            font_system,
            swash_cache: SwashCache::new(),
            glyphs: GlyphAtlas::new(atlas_size),
            slots: Vec::new(),
            generation: 0,
            texture_reset: false,
            texture_id: None,
            measure_cache: LruCache::new(capacity),
        }
    }

    /// Number of glyphs currently packed in the texture.
    pub fn glyph_count(&self) -> usize {
        self.glyphs.glyph_count()
    }

    /// Family name the face in `font` registered under.
    pub fn family_name(&self, font: FontHandle) -> Option<&str> {
        live_slot(&self.slots, self.generation, font).map(|slot| slot.family.as_str())
    }
}

impl Default for CosmicFontAtlas {
    fn default() -> Self {
        Self::new(DEFAULT_ATLAS_SIZE)
    }
}

impl FontAtlas for CosmicFontAtlas {
    fn add_font_from_file(
        &mut self,
        path: &Path,
        size: f32,
        config: &RasterConfig,
    ) -> Result<FontHandle, AtlasError> {
        let data = std::fs::read(path).map_err(|source| AtlasError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.register_face(data, size, config)
    }

    fn add_font_from_memory(
        &mut self,
        data: &[u8],
        size: f32,
        config: &RasterConfig,
    ) -> Result<FontHandle, AtlasError> {
        let mut owned = Vec::new();
        owned
            .try_reserve_exact(data.len())
            .map_err(|_| AtlasError::DataCopy { len: data.len() })?;
        owned.extend_from_slice(data);
        self.register_face(owned, size, config)
    }

    fn clear(&mut self) {
        // The FontSystem keeps every shaped face in its own cache, so it is
        // rebuilt around the database once our faces are removed.
        let empty = FontSystem::new_with_locale_and_db(String::new(), Database::new());
        let (locale, mut db) = std::mem::replace(&mut self.font_system, empty).into_locale_and_db();
        for slot in &self.slots {
            for &id in &slot.face_ids {
                db.remove_face(id);
            }
        }
        self.font_system = FontSystem::new_with_locale_and_db(locale, db);

        self.slots.clear();
        self.glyphs.clear();
        self.swash_cache = SwashCache::new();
        self.measure_cache.clear();
        self.texture_reset = false;
        self.generation = self.generation.wrapping_add(1);
        log::debug!("CosmicFontAtlas: cleared (generation {})", self.generation);
    }

    fn build(&mut self) -> Result<(), AtlasError> {
        self.glyphs.clear();
        self.measure_cache.clear();
        self.texture_reset = false;

        // Bake printable ASCII for every font up front.
        let warm: String = (' '..='~').collect();
        let mut complete = true;
        for index in 0..self.slots.len() {
            let font = FontHandle::new(index as u32, self.generation);
            let size = self.slots[index].size;
            complete &= self.pack_text(font, size, [0.0, 0.0], &warm).1;
        }

        if !complete {
            return Err(AtlasError::Build(format!(
                "{}px atlas is too small for {} fonts",
                self.glyphs.size,
                self.slots.len(),
            )));
        }

        log::info!(
            "CosmicFontAtlas: built {} fonts, {} glyphs in a {}px texture",
            self.slots.len(),
            self.glyphs.glyph_count(),
            self.glyphs.size,
        );
        Ok(())
    }

    fn generation(&self) -> u32 {
        self.generation
    }

    fn font_count(&self) -> usize {
        self.slots.len()
    }

    fn calc_text_size(&mut self, font: FontHandle, size: f32, max_width: f32, text: &str) -> [f32; 2] {
        let Some(slot) = live_slot(&self.slots, self.generation, font) else {
            return [0.0, 0.0];
        };
        if text.is_empty() || size <= 0.0 {
            return [0.0, 0.0];
        }

        let key = (font.slot(), size.to_bits(), max_width.to_bits(), text_hash(text));
        if let Some((cached_text, extent)) = self.measure_cache.get(&key) {
            if &**cached_text == text {
                return *extent;
            }
        }

        let buffer = shape(&mut self.font_system, slot, size, max_width, text);
        let mut width: f32 = 0.0;
        let mut lines = 0usize;
        for run in buffer.layout_runs() {
            lines += 1;
            width = width.max(run.line_w);
        }

        let extent = [width, lines as f32 * size];
        self.measure_cache.put(key, (text.into(), extent));
        extent
    }

    fn layout_glyphs(
        &mut self,
        font: FontHandle,
        size: f32,
        origin: [f32; 2],
        text: &str,
    ) -> Vec<GlyphQuad> {
        let (quads, complete) = self.pack_text(font, size, origin, text);
        if complete {
            return quads;
        }

        self.reset_texture();
        let (quads, complete) = self.pack_text(font, size, origin, text);
        if !complete {
            log::warn!(
                "CosmicFontAtlas: {:?} does not fit a {}px atlas, some glyphs dropped",
                text,
                self.glyphs.size,
            );
        }
        quads
    }

    fn glyph_info(&mut self, font: FontHandle, size: f32, ch: char) -> Option<GlyphInfo> {
        let Self {
            font_system,
            swash_cache,
            glyphs,
            slots,
            generation,
            texture_reset,
            ..
        } = self;

        let slot = live_slot(slots, *generation, font)?;
        if size <= 0.0 || !slot.raster.glyph_ranges.contains(ch) {
            return None;
        }

        let mut utf8 = [0u8; 4];
        let buffer = shape(font_system, slot, size, f32::INFINITY, ch.encode_utf8(&mut utf8));
        let run = buffer.layout_runs().next()?;
        let glyph = run.glyphs.first()?;

        let physical = glyph.physical((0.0, 0.0), 1.0);
        let image = swash_cache.get_image(font_system, physical.cache_key).as_ref()?;
        let region = match pack_glyph(glyphs, font.slot(), slot, physical.cache_key, image) {
            Packed::Region(region) => region,
            Packed::Invisible => return None,
            Packed::Full => {
                glyphs.clear();
                *texture_reset = true;
                match pack_glyph(glyphs, font.slot(), slot, physical.cache_key, image) {
                    Packed::Region(region) => region,
                    _ => return None,
                }
            }
        };

        let x0 = physical.x as f32 + image.placement.left as f32;
        let y0 = run.line_y + physical.y as f32 - image.placement.top as f32;
        Some(GlyphInfo {
            x0,
            y0,
            x1: x0 + image.placement.width as f32,
            y1: y0 + image.placement.height as f32,
            u0: region.u_min,
            v0: region.v_min,
            u1: region.u_max,
            v1: region.v_max,
            advance_x: glyph.w,
        })
    }

    fn texture_data(&self) -> TextureData<'_> {
        TextureData {
            width: self.glyphs.size,
            height: self.glyphs.size,
            pixels: &self.glyphs.data,
        }
    }

    fn texture_dirty(&self) -> bool {
        self.glyphs.dirty
    }

    fn mark_texture_uploaded(&mut self) {
        self.glyphs.dirty = false;
    }

    fn take_texture_reset(&mut self) -> bool {
        std::mem::take(&mut self.texture_reset)
    }

    fn set_texture_id(&mut self, id: Option<TextureId>) {
        self.texture_id = id;
    }

    fn texture_id(&self) -> Option<TextureId> {
        self.texture_id
    }
}

impl CosmicFontAtlas {
    /// Shape and pack `text`. The flag is false when a glyph did not fit.
    fn pack_text(
        &mut self,
        font: FontHandle,
        size: f32,
        origin: [f32; 2],
        text: &str,
    ) -> (Vec<GlyphQuad>, bool) {
        let Self {
            font_system,
            swash_cache,
            glyphs,
            slots,
            generation,
            ..
        } = self;

        let Some(slot) = live_slot(slots, *generation, font) else {
            return (Vec::new(), true);
        };
        if text.is_empty() || size <= 0.0 {
            return (Vec::new(), true);
        }

        let buffer = shape(font_system, slot, size, f32::INFINITY, text);
        let mut quads = Vec::new();
        let mut complete = true;

        for run in buffer.layout_runs() {
            for glyph in run.glyphs.iter() {
                let in_range = run
                    .text
                    .get(glyph.start..glyph.end)
                    .and_then(|cluster| cluster.chars().next())
                    .is_some_and(|ch| slot.raster.glyph_ranges.contains(ch));
                if !in_range {
                    continue;
                }

                let physical = glyph.physical((0.0, 0.0), 1.0);
                let Some(image) = swash_cache.get_image(font_system, physical.cache_key) else {
                    continue; // whitespace or missing glyph
                };
                let region = match pack_glyph(glyphs, font.slot(), slot, physical.cache_key, image) {
                    Packed::Region(region) => region,
                    Packed::Invisible => continue,
                    Packed::Full => {
                        complete = false;
                        continue;
                    }
                };

                let x = origin[0] + physical.x as f32 + image.placement.left as f32;
                let y = origin[1] + run.line_y + physical.y as f32 - image.placement.top as f32;
                quads.push(GlyphQuad {
                    x: slot.raster.snap_x(x),
                    y: slot.raster.snap_y(y),
                    width: image.placement.width as f32,
                    height: image.placement.height as f32,
                    region,
                });
            }
        }

        (quads, complete)
    }

    /// Drop every packed glyph to make room. Fonts and handles survive.
    fn reset_texture(&mut self) {
        log::info!(
            "CosmicFontAtlas: {}px texture full after {} glyphs, repacking",
            self.glyphs.size,
            self.glyphs.glyph_count(),
        );
        self.glyphs.clear();
        self.texture_reset = true;
    }

    fn register_face(
        &mut self,
        data: Vec<u8>,
        size: f32,
        config: &RasterConfig,
    ) -> Result<FontHandle, AtlasError> {
        let db = self.font_system.db_mut();
        let face_ids: Vec<fontdb::ID> = db
            .load_font_source(Source::Binary(Arc::new(data)))
            .iter()
            .copied()
            .collect();

        let Some(info) = face_ids.first().and_then(|&id| db.face(id)) else {
            return Err(AtlasError::Rejected("no usable font face in data".into()));
        };

        let family = info
            .families
            .first()
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| info.post_script_name.clone());
        let slot = FontSlot {
            family,
            weight: info.weight,
            style: info.style,
            stretch: info.stretch,
            size,
            raster: *config,
            face_ids,
        };

        log::debug!(
            "CosmicFontAtlas: registered '{}' at {size}px (oversample {}x{}, flags {})",
            slot.family,
            config.oversample_h,
            config.oversample_v,
            config.flags,
        );

        let handle = FontHandle::new(self.slots.len() as u32, self.generation);
        self.slots.push(slot);
        Ok(handle)
    }
}

fn live_slot(slots: &[FontSlot], generation: u32, font: FontHandle) -> Option<&FontSlot> {
    if font.generation() != generation {
        return None;
    }
    slots.get(font.slot() as usize)
}

/// Lay out `text` with the slot's face. `max_width` of infinity disables
/// wrapping.
fn shape(
    font_system: &mut FontSystem,
    slot: &FontSlot,
    size: f32,
    max_width: f32,
    text: &str,
) -> Buffer {
    let mut buffer = Buffer::new(font_system, Metrics::new(size, size));
    let width = max_width.is_finite().then_some(max_width);
    buffer.set_wrap(font_system, if width.is_some() { Wrap::Word } else { Wrap::None });
    buffer.set_size(font_system, width, None);
    buffer.set_text(font_system, text, slot.attrs(), Shaping::Advanced);
    buffer.shape_until_scroll(font_system, false);
    buffer
}

fn text_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

enum Packed {
    Region(AtlasRegion),
    /// Empty bitmap, or a color glyph the slot does not load.
    Invisible,
    /// No room left in the texture.
    Full,
}

/// Pack a rasterized glyph, honoring the slot's color and brightness
/// settings.
fn pack_glyph(
    glyphs: &mut GlyphAtlas<GlyphKey>,
    slot_index: u32,
    slot: &FontSlot,
    cache_key: CacheKey,
    image: &SwashImage,
) -> Packed {
    let (width, height) = (image.placement.width, image.placement.height);
    if width == 0 || height == 0 {
        return Packed::Invisible;
    }

    let bitmap = match image.content {
        SwashContent::Mask => GlyphBitmap::Mask(&image.data),
        SwashContent::Color if slot.raster.flags.contains(RasterFlags::LOAD_COLOR) => {
            GlyphBitmap::Rgba(&image.data)
        }
        SwashContent::Color => return Packed::Invisible,
        SwashContent::SubpixelMask => GlyphBitmap::Rgba(&image.data),
    };

    match glyphs.insert(
        (slot_index, cache_key),
        width,
        height,
        bitmap,
        slot.raster.rasterizer_multiply,
    ) {
        Some(region) => Packed::Region(region),
        None => {
            log::debug!("CosmicFontAtlas: no room for glyph {}", cache_key.glyph_id);
            Packed::Full
        }
    }
}

/// Path of the first file-backed system font, if the platform has any.
pub fn find_system_font() -> Option<PathBuf> {
    let mut db = Database::new();
    db.load_system_fonts();
    let found = db.faces().find_map(|face| match &face.source {
        Source::File(path) => Some(path.clone()),
        _ => None,
    });
    found
}

// ===================================================================
// Tests
// ===================================================================
