//! Draw lists: recorded text commands, routed by layer.
//!
//! Text is not rasterized when it is drawn; each call appends a
//! [`TextCommand`] to the list for its layer. The render step turns the
//! background list and then the foreground list into geometry, so
//! foreground text always lands on top.

use crate::font_atlas::FontHandle;

/// Layer a draw call lands on.
#[repr(i32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderLayer {
    #[default]
    Background = 0,
    Foreground = 1,
}

impl RenderLayer {
    pub const fn ordinal(self) -> i32 {
        self as i32
    }

    /// Anything at or above the foreground ordinal routes to the
    /// foreground list.
    pub const fn routes_to_foreground(ordinal: i32) -> bool {
        ordinal >= RenderLayer::Foreground.ordinal()
    }

    /// Map a raw ordinal from a caller onto a layer.
    pub const fn from_ordinal(ordinal: i32) -> Self {
        if Self::routes_to_foreground(ordinal) {
            RenderLayer::Foreground
        } else {
            RenderLayer::Background
        }
    }
}

/// Something text can be recorded onto.
pub trait DrawSurface {
    /// Record one text draw. `color` is packed ABGR.
    fn add_text(&mut self, font: FontHandle, size: f32, pos: [f32; 2], color: u32, text: &str);
}

/// One recorded text draw.
#[derive(Clone, Debug, PartialEq)]
pub struct TextCommand {
    pub font: FontHandle,
    pub size: f32,
    pub pos: [f32; 2],
    /// Packed ABGR.
    pub color: u32,
    pub text: String,
}

/// Ordered list of text commands for one layer.
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    commands: Vec<TextCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[TextCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl DrawSurface for DrawList {
    fn add_text(&mut self, font: FontHandle, size: f32, pos: [f32; 2], color: u32, text: &str) {
        self.commands.push(TextCommand {
            font,
            size,
            pos,
            color,
            text: text.to_owned(),
        });
    }
}

/// The background and foreground lists of one frame.
#[derive(Clone, Debug, Default)]
pub struct DrawLists {
    pub background: DrawList,
    pub foreground: DrawList,
}

impl DrawLists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface_mut(&mut self, layer: RenderLayer) -> &mut DrawList {
        match layer {
            RenderLayer::Background => &mut self.background,
            RenderLayer::Foreground => &mut self.foreground,
        }
    }

    pub fn get(&self, layer: RenderLayer) -> &DrawList {
        match layer {
            RenderLayer::Background => &self.background,
            RenderLayer::Foreground => &self.foreground,
        }
    }

    /// Lists in submission order: background first.
    pub fn iter(&self) -> impl Iterator<Item = (RenderLayer, &DrawList)> {
        [
            (RenderLayer::Background, &self.background),
            (RenderLayer::Foreground, &self.foreground),
        ]
        .into_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.background.is_empty() && self.foreground.is_empty()
    }

    pub fn clear(&mut self) {
        self.background.clear();
        self.foreground.clear();
    }
}

// ===================================================================
// Tests
// ===================================================================
