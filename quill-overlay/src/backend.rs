//! Backend contracts implemented by the host.
//!
//! The overlay never talks to a window or a graphics device directly.
//! The host supplies a [`PlatformBackend`] (window, input, timing) and a
//! [`RenderBackend`] (device objects, draw submission). The render
//! backend may also expose a [`DeviceState`] so the overlay can save and
//! restore render toggles around its own submission.

use thiserror::Error;

use quill_text::FontAtlas;

use crate::frame::DrawData;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Platform backend failed: {0}")]
    Platform(String),
    #[error("Render backend failed: {0}")]
    Renderer(String),
}

/// Per-frame IO filled in by the platform backend.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameIo {
    /// Display size in pixels.
    pub display_size: [f32; 2],
    /// Seconds since the previous frame.
    pub delta_time: f32,
    /// The overlay wants keyboard input this frame.
    pub want_capture_keyboard: bool,
    /// The overlay wants mouse input this frame.
    pub want_capture_mouse: bool,
}

/// Window, input and timing integration.
pub trait PlatformBackend {
    fn init(&mut self) -> Result<(), BackendError>;

    fn shutdown(&mut self);

    /// Update `io` for the frame about to start.
    fn new_frame(&mut self, io: &mut FrameIo);
}

/// Named boolean render toggles on the host device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderToggle {
    DepthTest,
    DepthWrite,
    AlphaBlend,
    AlphaTest,
    Fog,
    Lighting,
    ScissorTest,
    StencilTest,
}

impl RenderToggle {
    pub const ALL: [RenderToggle; 8] = [
        RenderToggle::DepthTest,
        RenderToggle::DepthWrite,
        RenderToggle::AlphaBlend,
        RenderToggle::AlphaTest,
        RenderToggle::Fog,
        RenderToggle::Lighting,
        RenderToggle::ScissorTest,
        RenderToggle::StencilTest,
    ];
}

/// Get/set access to the host device's render toggles.
pub trait DeviceState {
    fn render_toggle(&self, toggle: RenderToggle) -> bool;

    fn set_render_toggle(&mut self, toggle: RenderToggle, enabled: bool);
}

/// Graphics device integration.
pub trait RenderBackend {
    fn init(&mut self) -> Result<(), BackendError>;

    fn shutdown(&mut self);

    fn new_frame(&mut self);

    /// Draw one frame's tessellated text.
    fn render_draw_data(&mut self, draw_data: &DrawData<'_>);

    /// Release device objects (the device was lost).
    fn invalidate_device_objects(&mut self);

    /// Recreate device objects, uploading the atlas texture and assigning
    /// its texture id. Returns `false` if that failed.
    fn create_device_objects(&mut self, atlas: &mut dyn FontAtlas) -> bool;

    /// Render-toggle access, if the backend offers it.
    fn device_state(&mut self) -> Option<&mut dyn DeviceState> {
        None
    }
}
