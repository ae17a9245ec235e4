//! # quill-overlay
//!
//! Immediate-mode text overlay for a host render loop, built on
//! `quill-text`.
//!
//! ## Architecture
//!
//! ```text
//!  host ──► TextOverlay::initialize(atlas, platform, renderer)
//!                │
//!  per frame:    ▼
//!  begin_frame() ──► draw_text*/measure_text ──► end_frame()
//!                                                    │
//!                                                    ▼
//!  render() ── tessellate() ──► DrawData ──► RenderBackend
//!              (save/restore render toggles around submission)
//! ```
//!
//! ## Crate modules
//!
//! - [`overlay`]: the context object and its lifecycle
//! - [`backend`]: platform/render backend traits the host implements
//! - [`frame`]: vertex data, tessellation, draw data
//! - [`state`]: render-toggle snapshot

pub mod backend;
pub mod frame;
pub mod overlay;
pub mod state;

// Re-exports for convenience
pub use backend::{BackendError, DeviceState, FrameIo, PlatformBackend, RenderBackend, RenderToggle};
pub use frame::{tessellate, DrawData, DrawVertex, FramePhase, MeshList, Projection, QUAD_INDICES};
pub use overlay::{OverlayError, OverlayOptions, TextOverlay};
pub use state::RenderStateSnapshot;
