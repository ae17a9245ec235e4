//! Text overlay context: the object the host application owns.
//!
//! ```text
//!   Uninitialized ──initialize()──► Ready ──shutdown()──► Uninitialized
//!                                     │
//!                 begin_frame() ──► InFrame ──end_frame()──► Idle
//!                                     │
//!                 render(): tessellate lists ──► RenderBackend
//! ```
//!
//! Every operation is valid only while Ready. Outside it, loads and
//! font selection return [`OverlayError::NotInitialized`], queries return
//! an empty result and drawing does nothing.

use std::path::Path;

use thiserror::Error;

use quill_text::{
    wide_to_utf8, BatchReport, CosmicFontAtlas, DrawLists, FontAtlas, FontEntry, FontError,
    FontHandle, FontRegistry, GlyphInfo, RenderLayer, TextEffect, TextureId, DEFAULT_ATLAS_SIZE,
};

use crate::backend::{BackendError, FrameIo, PlatformBackend, RenderBackend, RenderToggle};
use crate::frame::{tessellate, DrawData, FramePhase, Projection};
use crate::state::RenderStateSnapshot;

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Text overlay is not initialized")]
    NotInitialized,
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Font error: {0}")]
    Font(#[from] FontError),
}

/// Runtime options for a [`TextOverlay`].
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayOptions {
    /// Glyph texture side length for the cosmic-text atlas.
    pub atlas_size: u32,
    /// Render toggles saved before and restored after each render.
    pub saved_toggles: Vec<RenderToggle>,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            atlas_size: DEFAULT_ATLAS_SIZE,
            saved_toggles: RenderToggle::ALL.to_vec(),
        }
    }
}

/// State that exists only between `initialize` and `shutdown`.
struct Ready<A, P, R> {
    atlas: A,
    platform: P,
    renderer: R,
    registry: FontRegistry,
    lists: DrawLists,
    io: FrameIo,
    phase: FramePhase,
}

impl<A: FontAtlas, P, R: RenderBackend> Ready<A, P, R> {
    /// Re-upload the atlas after its fonts changed.
    fn refresh_device_objects(&mut self) {
        self.renderer.invalidate_device_objects();
        if !self.renderer.create_device_objects(&mut self.atlas) {
            log::warn!("TextOverlay: failed to recreate device objects after font load");
        }
    }

    fn lookup(&self, font_name: &str) -> Option<FontEntry> {
        self.registry.resolve(font_name)
    }
}

/// Font registry, draw lists and backends behind one explicit context.
pub struct TextOverlay<A, P, R> {
    options: OverlayOptions,
    ready: Option<Ready<A, P, R>>,
}

impl<A, P, R> Default for TextOverlay<A, P, R> {
    fn default() -> Self {
        Self {
            options: OverlayOptions::default(),
            ready: None,
        }
    }
}

impl<P: PlatformBackend, R: RenderBackend> TextOverlay<CosmicFontAtlas, P, R> {
    /// Initialize with a fresh cosmic-text atlas of `options.atlas_size`.
    pub fn initialize_with_cosmic(&mut self, platform: P, renderer: R) -> Result<(), OverlayError> {
        let atlas = CosmicFontAtlas::new(self.options.atlas_size);
        self.initialize(atlas, platform, renderer)
    }
}

impl<A: FontAtlas, P: PlatformBackend, R: RenderBackend> TextOverlay<A, P, R> {
    pub fn new(options: OverlayOptions) -> Self {
        Self {
            options,
            ready: None,
        }
    }

    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Bring up both backends. Calling it again while Ready does nothing.
    ///
    /// If the render backend fails, the platform backend is shut down
    /// again and the overlay stays uninitialized.
    pub fn initialize(&mut self, atlas: A, mut platform: P, mut renderer: R) -> Result<(), OverlayError> {
        if self.ready.is_some() {
            log::debug!("TextOverlay: already initialized");
            return Ok(());
        }

        platform.init().map_err(|err| {
            log::error!("TextOverlay: platform backend init failed: {err}");
            err
        })?;
        if let Err(err) = renderer.init() {
            log::error!("TextOverlay: render backend init failed: {err}");
            platform.shutdown();
            return Err(err.into());
        }

        self.ready = Some(Ready {
            atlas,
            platform,
            renderer,
            registry: FontRegistry::new(),
            lists: DrawLists::new(),
            io: FrameIo::default(),
            phase: FramePhase::Idle,
        });
        log::info!("TextOverlay: initialized");
        Ok(())
    }

    /// Tear down the backends and drop every font. Safe to call twice.
    pub fn shutdown(&mut self) {
        let Some(mut ready) = self.ready.take() else {
            return;
        };
        ready.registry.clear();
        ready.atlas.clear();
        ready.renderer.shutdown();
        ready.platform.shutdown();
        log::info!("TextOverlay: shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.is_some()
    }

    fn ready_mut(&mut self) -> Result<&mut Ready<A, P, R>, OverlayError> {
        self.ready.as_mut().ok_or(OverlayError::NotInitialized)
    }

    // ── Font loading ────────────────────────────────────────────────

    /// Replace all fonts with those listed in a config file.
    pub fn load_fonts_from_config(&mut self, path: &Path) -> Result<BatchReport, OverlayError> {
        let ready = self.ready_mut()?;
        let report = ready.registry.load_from_config(&mut ready.atlas, path)?;
        ready.refresh_device_objects();
        Ok(report)
    }

    /// Load one font file under `name`, keeping the other fonts.
    pub fn load_font(
        &mut self,
        name: &str,
        path: &Path,
        size: f32,
        enable_outline: bool,
    ) -> Result<FontEntry, OverlayError> {
        let ready = self.ready_mut()?;
        let entry = ready
            .registry
            .load_font(&mut ready.atlas, name, path, size, enable_outline)?;
        ready.refresh_device_objects();
        Ok(entry)
    }

    /// Load a font from bytes. `data` may be dropped once this returns.
    pub fn load_font_from_memory(
        &mut self,
        name: &str,
        data: &[u8],
        size: f32,
        enable_outline: bool,
    ) -> Result<FontEntry, OverlayError> {
        let ready = self.ready_mut()?;
        let entry = ready
            .registry
            .load_font_from_memory(&mut ready.atlas, name, data, size, enable_outline)?;
        ready.refresh_device_objects();
        Ok(entry)
    }

    // ── Font selection ──────────────────────────────────────────────

    pub fn set_active_font(&mut self, name: &str) -> Result<(), OverlayError> {
        let ready = self.ready_mut()?;
        ready.registry.set_active(name)?;
        Ok(())
    }

    pub fn active_font_name(&self) -> Option<&str> {
        self.ready.as_ref()?.registry.active_name()
    }

    /// Resolve a font; an empty name means the active font.
    pub fn resolve(&self, font_name: &str) -> Option<FontEntry> {
        self.ready.as_ref()?.lookup(font_name)
    }

    /// Atlas handle of a font; an empty name means the active font.
    pub fn font(&self, font_name: &str) -> Option<FontHandle> {
        self.resolve(font_name).map(|entry| entry.handle)
    }

    // ── Frame lifecycle ─────────────────────────────────────────────

    /// Start a frame: renderer, then platform, then fresh draw lists.
    pub fn begin_frame(&mut self) {
        let Some(ready) = self.ready.as_mut() else {
            return;
        };
        if ready.phase == FramePhase::InFrame {
            log::debug!("TextOverlay: begin_frame while already in a frame");
            return;
        }
        ready.renderer.new_frame();
        ready.platform.new_frame(&mut ready.io);
        ready.lists.clear();
        ready.phase = FramePhase::InFrame;
    }

    pub fn end_frame(&mut self) {
        if let Some(ready) = self.ready.as_mut() {
            ready.phase = FramePhase::Idle;
        }
    }

    /// Tessellate the recorded text and submit it to the render backend.
    ///
    /// Ends the current frame first if needed. Render toggles listed in
    /// the options are saved before submission and restored after it.
    pub fn render(&mut self) {
        let saved_toggles = &self.options.saved_toggles;
        let Some(ready) = self.ready.as_mut() else {
            return;
        };
        ready.phase = FramePhase::Idle;

        let lists = tessellate(&mut ready.atlas, &ready.lists);
        let texture = ready.atlas.texture_dirty().then(|| ready.atlas.texture_data());
        let uploaded = texture.is_some();
        let draw_data = DrawData {
            display_size: ready.io.display_size,
            projection: Projection::orthographic(ready.io.display_size),
            lists,
            texture_id: ready.atlas.texture_id(),
            texture,
        };

        let snapshot = ready
            .renderer
            .device_state()
            .map(|device| RenderStateSnapshot::capture(&*device, saved_toggles));

        ready.renderer.render_draw_data(&draw_data);

        if let Some(snapshot) = snapshot {
            if let Some(device) = ready.renderer.device_state() {
                snapshot.restore(device);
            }
        }
        drop(draw_data);

        if uploaded {
            ready.atlas.mark_texture_uploaded();
        }
    }

    /// Render what has been drawn so far and start a new frame.
    pub fn flush_and_restart(&mut self) {
        if self.ready.is_none() {
            return;
        }
        log::trace!("TextOverlay: flushing mid-frame");
        self.end_frame();
        self.render();
        self.begin_frame();
    }

    pub fn phase(&self) -> Option<FramePhase> {
        self.ready.as_ref().map(|ready| ready.phase)
    }

    // ── Drawing ─────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn stamp(
        &mut self,
        font_name: Option<&str>,
        layer: RenderLayer,
        text: &str,
        x: f32,
        y: f32,
        color: u32,
        effect: TextEffect,
    ) {
        let Some(ready) = self.ready.as_mut() else {
            return;
        };
        if text.is_empty() {
            return;
        }
        let entry = match font_name {
            None => ready.registry.resolve(""),
            Some(name) => ready.registry.resolve_explicit(name),
        };
        let Some(entry) = entry else {
            log::trace!("TextOverlay: no font for {font_name:?}, skipping draw");
            return;
        };
        quill_text::draw_text(ready.lists.surface_mut(layer), &entry, text, x, y, color, effect);
    }

    /// Draw with the active font. Colors are ARGB.
    pub fn draw_text(&mut self, text: &str, x: f32, y: f32, color: u32, layer: RenderLayer) {
        self.stamp(None, layer, text, x, y, color, TextEffect::Plain);
    }

    /// Draw with a 1px translucent black shadow underneath.
    pub fn draw_text_shadowed(&mut self, text: &str, x: f32, y: f32, color: u32, layer: RenderLayer) {
        self.stamp(None, layer, text, x, y, color, TextEffect::Shadow);
    }

    /// Draw with an outline ring if the active font has one.
    pub fn draw_text_outlined(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        color: u32,
        outline_color: u32,
        layer: RenderLayer,
    ) {
        let effect = TextEffect::Outline { color: outline_color };
        self.stamp(None, layer, text, x, y, color, effect);
    }

    /// Draw with a named font on the foreground layer. An empty name
    /// draws nothing.
    pub fn draw_text_ex(&mut self, font_name: &str, text: &str, x: f32, y: f32, color: u32) {
        self.stamp(Some(font_name), RenderLayer::Foreground, text, x, y, color, TextEffect::Plain);
    }

    /// Named-font foreground draw with the 1px shadow underneath.
    pub fn draw_text_shadowed_ex(&mut self, font_name: &str, text: &str, x: f32, y: f32, color: u32) {
        self.stamp(Some(font_name), RenderLayer::Foreground, text, x, y, color, TextEffect::Shadow);
    }

    pub fn draw_text_outlined_ex(
        &mut self,
        font_name: &str,
        text: &str,
        x: f32,
        y: f32,
        color: u32,
        outline_color: u32,
    ) {
        let effect = TextEffect::Outline { color: outline_color };
        self.stamp(Some(font_name), RenderLayer::Foreground, text, x, y, color, effect);
    }

    pub fn draw_text_w(&mut self, text: &[u16], x: f32, y: f32, color: u32, layer: RenderLayer) {
        self.draw_text(&wide_to_utf8(text), x, y, color, layer);
    }

    pub fn draw_text_shadowed_w(&mut self, text: &[u16], x: f32, y: f32, color: u32, layer: RenderLayer) {
        self.draw_text_shadowed(&wide_to_utf8(text), x, y, color, layer);
    }

    pub fn draw_text_outlined_w(
        &mut self,
        text: &[u16],
        x: f32,
        y: f32,
        color: u32,
        outline_color: u32,
        layer: RenderLayer,
    ) {
        self.draw_text_outlined(&wide_to_utf8(text), x, y, color, outline_color, layer);
    }

    pub fn draw_text_ex_w(&mut self, font_name: &str, text: &[u16], x: f32, y: f32, color: u32) {
        self.draw_text_ex(font_name, &wide_to_utf8(text), x, y, color);
    }

    pub fn draw_text_shadowed_ex_w(&mut self, font_name: &str, text: &[u16], x: f32, y: f32, color: u32) {
        self.draw_text_shadowed_ex(font_name, &wide_to_utf8(text), x, y, color);
    }

    pub fn draw_text_outlined_ex_w(
        &mut self,
        font_name: &str,
        text: &[u16],
        x: f32,
        y: f32,
        color: u32,
        outline_color: u32,
    ) {
        self.draw_text_outlined_ex(font_name, &wide_to_utf8(text), x, y, color, outline_color);
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Single-line size of `text`; `(0, 0)` if it cannot be measured.
    pub fn measure_text(&mut self, text: &str, font_name: &str) -> (u32, u32) {
        let Some(ready) = self.ready.as_mut() else {
            return (0, 0);
        };
        let entry = ready.lookup(font_name);
        quill_text::measure(&mut ready.atlas, entry, text)
    }

    pub fn measure_text_w(&mut self, text: &[u16], font_name: &str) -> (u32, u32) {
        self.measure_text(&wide_to_utf8(text), font_name)
    }

    pub fn glyph_info(&mut self, ch: char, font_name: &str) -> Option<GlyphInfo> {
        let ready = self.ready.as_mut()?;
        let entry = ready.lookup(font_name)?;
        if !ready.atlas.is_live(entry.handle) {
            return None;
        }
        ready.atlas.glyph_info(entry.handle, entry.size, ch)
    }

    /// Atlas texture id of the resolved font's atlas.
    pub fn font_texture(&self, font_name: &str) -> Option<TextureId> {
        let ready = self.ready.as_ref()?;
        ready.lookup(font_name)?;
        ready.atlas.texture_id()
    }

    // ── Device and input ────────────────────────────────────────────

    pub fn on_lost_device(&mut self) {
        if let Some(ready) = self.ready.as_mut() {
            log::debug!("TextOverlay: device lost, releasing device objects");
            ready.renderer.invalidate_device_objects();
        }
    }

    pub fn on_reset_device(&mut self) {
        if let Some(ready) = self.ready.as_mut() {
            log::debug!("TextOverlay: device reset, recreating device objects");
            if !ready.renderer.create_device_objects(&mut ready.atlas) {
                log::warn!("TextOverlay: failed to recreate device objects after reset");
            }
        }
    }

    pub fn want_capture_keyboard(&self) -> bool {
        self.ready
            .as_ref()
            .is_some_and(|ready| ready.io.want_capture_keyboard)
    }

    pub fn want_capture_mouse(&self) -> bool {
        self.ready
            .as_ref()
            .is_some_and(|ready| ready.io.want_capture_mouse)
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn registry(&self) -> Option<&FontRegistry> {
        self.ready.as_ref().map(|ready| &ready.registry)
    }

    pub fn draw_lists(&self) -> Option<&DrawLists> {
        self.ready.as_ref().map(|ready| &ready.lists)
    }

    pub fn io(&self) -> Option<&FrameIo> {
        self.ready.as_ref().map(|ready| &ready.io)
    }

    pub fn atlas(&self) -> Option<&A> {
        self.ready.as_ref().map(|ready| &ready.atlas)
    }

    pub fn platform(&self) -> Option<&P> {
        self.ready.as_ref().map(|ready| &ready.platform)
    }

    pub fn renderer(&self) -> Option<&R> {
        self.ready.as_ref().map(|ready| &ready.renderer)
    }
}
