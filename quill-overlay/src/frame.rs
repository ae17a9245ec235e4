//! Frame data handed to the render backend.
//!
//! Draw lists hold text commands; [`tessellate`] turns them into indexed
//! textured quads at render time. Vertex and projection types derive
//! `bytemuck::Pod` + `Zeroable` so backends can upload them as-is.

use bytemuck::{Pod, Zeroable};

use quill_text::{DrawLists, FontAtlas, RenderLayer, TextureData, TextureId};

// ───────────────────────────────────────────────────────────────────
// Vertex data
// ───────────────────────────────────────────────────────────────────

/// One corner of a glyph quad. 20 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawVertex {
    /// Screen-space position in pixels.
    pub pos: [f32; 2],
    /// Atlas texture coordinates.
    pub uv: [f32; 2],
    /// Packed ABGR color.
    pub col: u32,
}

/// Index pattern of one quad (top-left, top-right, bottom-left, bottom-right).
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];

/// Orthographic projection mapping the display to clip space.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Projection {
    /// Column-major 4×4 matrix.
    pub matrix: [[f32; 4]; 4],
}

impl Projection {
    /// (0,0) is the top-left corner, `display_size` the bottom-right.
    pub fn orthographic(display_size: [f32; 2]) -> Self {
        let [w, h] = display_size.map(|v| if v > 0.0 { v } else { 1.0 });
        let sx = 2.0 / w;
        let sy = -2.0 / h; // y grows downward
        Self {
            matrix: [
                [sx,  0.0, 0.0, 0.0],
                [0.0, sy,  0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [-1.0, 1.0, 0.0, 1.0],
            ],
        }
    }

    /// Project a point; returns normalized device coordinates.
    pub fn apply(&self, p: [f32; 2]) -> [f32; 2] {
        let m = &self.matrix;
        [
            m[0][0] * p[0] + m[1][0] * p[1] + m[3][0],
            m[0][1] * p[0] + m[1][1] * p[1] + m[3][1],
        ]
    }
}

// ───────────────────────────────────────────────────────────────────
// Draw data
// ───────────────────────────────────────────────────────────────────

/// Geometry for one layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshList {
    pub layer: RenderLayer,
    pub vertices: Vec<DrawVertex>,
    pub indices: Vec<u32>,
}

impl MeshList {
    pub fn quad_count(&self) -> usize {
        self.indices.len() / QUAD_INDICES.len()
    }
}

/// Everything a render backend needs to draw one overlay frame.
#[derive(Clone, Debug)]
pub struct DrawData<'a> {
    pub display_size: [f32; 2],
    pub projection: Projection,
    /// Background first, then foreground.
    pub lists: Vec<MeshList>,
    /// Atlas texture id from the last `create_device_objects`.
    pub texture_id: Option<TextureId>,
    /// Atlas pixels, present only when glyphs were packed since the last upload.
    pub texture: Option<TextureData<'a>>,
}

impl DrawData<'_> {
    pub fn total_vertex_count(&self) -> usize {
        self.lists.iter().map(|l| l.vertices.len()).sum()
    }

    pub fn total_index_count(&self) -> usize {
        self.lists.iter().map(|l| l.indices.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_index_count() == 0
    }
}

/// Lay out every recorded command into quads, background list first.
///
/// Commands whose font handle is stale (the atlas was cleared since they
/// were recorded) are dropped. If the atlas repacks its texture midway,
/// the frame is laid out once more so every quad points at the new
/// texture.
pub fn tessellate(atlas: &mut dyn FontAtlas, lists: &DrawLists) -> Vec<MeshList> {
    atlas.take_texture_reset();
    let meshes = tessellate_pass(atlas, lists);
    if !atlas.take_texture_reset() {
        return meshes;
    }

    log::debug!("Frame: atlas repacked during layout, laying out again");
    let meshes = tessellate_pass(atlas, lists);
    if atlas.take_texture_reset() {
        log::warn!("Frame: glyphs of one frame do not fit the atlas texture");
    }
    meshes
}

fn tessellate_pass(atlas: &mut dyn FontAtlas, lists: &DrawLists) -> Vec<MeshList> {
    let mut meshes = Vec::with_capacity(2);

    for (layer, list) in lists.iter() {
        let mut mesh = MeshList {
            layer,
            ..MeshList::default()
        };

        for command in list.commands() {
            if !atlas.is_live(command.font) {
                log::trace!("Frame: dropping text with stale font {:?}", command.font);
                continue;
            }

            for quad in atlas.layout_glyphs(command.font, command.size, command.pos, &command.text) {
                let base = mesh.vertices.len() as u32;
                let (x0, y0) = (quad.x, quad.y);
                let (x1, y1) = (quad.x + quad.width, quad.y + quad.height);
                let r = quad.region;

                mesh.vertices.extend_from_slice(&[
                    DrawVertex { pos: [x0, y0], uv: [r.u_min, r.v_min], col: command.color },
                    DrawVertex { pos: [x1, y0], uv: [r.u_max, r.v_min], col: command.color },
                    DrawVertex { pos: [x0, y1], uv: [r.u_min, r.v_max], col: command.color },
                    DrawVertex { pos: [x1, y1], uv: [r.u_max, r.v_max], col: command.color },
                ]);
                mesh.indices.extend(QUAD_INDICES.iter().map(|i| base + i));
            }
        }

        meshes.push(mesh);
    }

    meshes
}

/// Where the overlay is within a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FramePhase {
    #[default]
    Idle,
    InFrame,
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use quill_text::{AtlasRegion, DrawSurface, FontHandle, GlyphQuad};

    #[test]
    fn test_draw_vertex_size() {
        assert_eq!(std::mem::size_of::<DrawVertex>(), 20);
    }

    #[test]
    fn test_projection_size() {
        assert_eq!(std::mem::size_of::<Projection>(), 64);
    }

    #[test]
    fn test_vertices_cast_to_bytes() {
        let vertices = [DrawVertex {
            pos: [1.0, 2.0],
            uv: [0.0, 1.0],
            col: 0xFF00_00FF,
        }; 4];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 80);
        assert_eq!(&bytes[16..20], &0xFF00_00FFu32.to_ne_bytes());
    }

    #[test]
    fn test_projection_top_left() {
        let p = Projection::orthographic([800.0, 600.0]);
        let [x, y] = p.apply([0.0, 0.0]);
        assert!((x - (-1.0)).abs() < 1e-5, "top-left x should be -1, got {x}");
        assert!((y - 1.0).abs() < 1e-5, "top-left y should be 1, got {y}");
    }

    #[test]
    fn test_projection_bottom_right() {
        let p = Projection::orthographic([800.0, 600.0]);
        let [x, y] = p.apply([800.0, 600.0]);
        assert!((x - 1.0).abs() < 1e-5, "bottom-right x should be 1, got {x}");
        assert!((y - (-1.0)).abs() < 1e-5, "bottom-right y should be -1, got {y}");
    }

    #[test]
    fn test_projection_zero_display_is_finite() {
        let p = Projection::orthographic([0.0, 0.0]);
        assert!(p.matrix.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn test_mesh_quad_count() {
        let mesh = MeshList {
            layer: RenderLayer::Foreground,
            vertices: vec![DrawVertex::zeroed(); 8],
            indices: vec![0; 12],
        };
        assert_eq!(mesh.quad_count(), 2);
    }

    #[test]
    fn test_default_phase_is_idle() {
        assert_eq!(FramePhase::default(), FramePhase::Idle);
    }

    /// One quad per layout call; the texture is repacked on the
    /// `reset_at`-th call, which moves every glyph to a new epoch.
    struct RepackingAtlas {
        layouts: usize,
        reset_at: usize,
        epoch: u32,
        reset: bool,
    }

    impl FontAtlas for RepackingAtlas {
        fn add_font_from_file(
            &mut self,
            _: &std::path::Path,
            _: f32,
            _: &quill_text::RasterConfig,
        ) -> Result<FontHandle, quill_text::AtlasError> {
            Ok(FontHandle::new(0, 0))
        }

        fn add_font_from_memory(
            &mut self,
            _: &[u8],
            _: f32,
            _: &quill_text::RasterConfig,
        ) -> Result<FontHandle, quill_text::AtlasError> {
            Ok(FontHandle::new(0, 0))
        }

        fn clear(&mut self) {}

        fn build(&mut self) -> Result<(), quill_text::AtlasError> {
            Ok(())
        }

        fn generation(&self) -> u32 {
            0
        }

        fn font_count(&self) -> usize {
            1
        }

        fn calc_text_size(&mut self, _: FontHandle, _: f32, _: f32, _: &str) -> [f32; 2] {
            [0.0, 0.0]
        }

        fn layout_glyphs(&mut self, _: FontHandle, _: f32, origin: [f32; 2], _: &str) -> Vec<GlyphQuad> {
            self.layouts += 1;
            if self.layouts == self.reset_at {
                self.epoch += 1;
                self.reset = true;
            }
            let v = self.epoch as f32;
            vec![GlyphQuad {
                x: origin[0],
                y: origin[1],
                width: 1.0,
                height: 1.0,
                region: AtlasRegion { u_min: 0.0, v_min: v, u_max: 1.0, v_max: v },
            }]
        }

        fn glyph_info(&mut self, _: FontHandle, _: f32, _: char) -> Option<quill_text::GlyphInfo> {
            None
        }

        fn texture_data(&self) -> TextureData<'_> {
            TextureData { width: 0, height: 0, pixels: &[] }
        }

        fn texture_dirty(&self) -> bool {
            false
        }

        fn mark_texture_uploaded(&mut self) {}

        fn take_texture_reset(&mut self) -> bool {
            std::mem::take(&mut self.reset)
        }

        fn set_texture_id(&mut self, _: Option<TextureId>) {}

        fn texture_id(&self) -> Option<TextureId> {
            None
        }
    }

    #[test]
    fn test_repack_mid_frame_lays_out_again() {
        let mut atlas = RepackingAtlas { layouts: 0, reset_at: 2, epoch: 0, reset: false };
        let mut lists = DrawLists::new();
        let font = FontHandle::new(0, 0);
        lists.background.add_text(font, 14.0, [0.0, 0.0], 0, "a");
        lists.foreground.add_text(font, 14.0, [5.0, 0.0], 0, "b");

        let meshes = tessellate(&mut atlas, &lists);

        assert_eq!(atlas.layouts, 4, "both commands are laid out twice");
        let epochs: Vec<f32> = meshes.iter().map(|m| m.vertices[0].uv[1]).collect();
        assert_eq!(epochs, vec![1.0, 1.0], "no quad points at the old texture");
    }

    #[test]
    fn test_no_repack_lays_out_once() {
        let mut atlas = RepackingAtlas { layouts: 0, reset_at: usize::MAX, epoch: 0, reset: false };
        let mut lists = DrawLists::new();
        lists.background.add_text(FontHandle::new(0, 0), 14.0, [0.0, 0.0], 0, "a");

        let meshes = tessellate(&mut atlas, &lists);
        assert_eq!(atlas.layouts, 1);
        assert_eq!(meshes[0].quad_count(), 1);
    }
}
