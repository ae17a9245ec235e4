//! Font registry: named fonts loaded into a [`FontAtlas`].
//!
//! Maps a case-sensitive font name to the atlas handle, the pixel size
//! the handle was baked at, and the outline thickness derived for it.
//! One name is *active*: it is what drawing and measuring use when the
//! caller passes an empty name.
//!
//! ```text
//! FontRegistry
//!   ├── entries: HashMap<String, FontEntry>   (borrowed &str lookup)
//!   ├── active_name                           (first loaded font)
//!   └── active_entry                          (cached copy, fast path)
//! ```
//!
//! Handles are only valid for the atlas generation that issued them.
//! Reloading a name replaces its entry; callers must not hold on to old
//! handles across a reload.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::parse_config_file;
use crate::font_atlas::{AtlasError, FontAtlas, FontHandle};
use crate::profile::FontProfile;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("Failed to open font config {}: {source}", .path.display())]
    ConfigOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No font profiles found in {}", .0.display())]
    NoProfiles(PathBuf),
    #[error("Font name must not be empty")]
    EmptyName,
    #[error("Invalid size {size} for font '{name}'")]
    InvalidSize { name: String, size: f32 },
    #[error("Font source for '{name}' not found: {}", .path.display())]
    SourceMissing { name: String, path: PathBuf },
    #[error("Atlas error: {0}")]
    Atlas(#[from] AtlasError),
    #[error("No fonts were loaded successfully")]
    NoFontsLoaded,
    #[error("Font not found: {0}")]
    UnknownFont(String),
}

/// A loaded font.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontEntry {
    /// Non-owning reference into the atlas.
    pub handle: FontHandle,
    /// Pixel size the handle was baked at.
    pub size: f32,
    /// Outline ring offset; `0` means no outline pass.
    pub outline_thickness: u32,
}

/// Outcome of a config batch load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    /// Names that loaded, in config order.
    pub loaded: Vec<String>,
    /// Names that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Name-keyed store of loaded fonts with an active-font fallback.
#[derive(Default)]
pub struct FontRegistry {
    entries: HashMap<String, FontEntry>,
    active_name: String,
    active_entry: Option<FontEntry>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Loaded font names (sorted).
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The active font name, or `None` before anything is loaded.
    pub fn active_name(&self) -> Option<&str> {
        (!self.active_name.is_empty()).then_some(self.active_name.as_str())
    }

    /// Make `name` the active font. Setting the current one again is fine.
    pub fn set_active(&mut self, name: &str) -> Result<(), FontError> {
        let Some(&entry) = self.entries.get(name) else {
            log::error!("FontRegistry: font '{name}' not found");
            return Err(FontError::UnknownFont(name.to_owned()));
        };
        if self.active_name != name {
            self.active_name = name.to_owned();
        }
        self.active_entry = Some(entry);
        Ok(())
    }

    /// Look up `name`; an empty name means the active font.
    pub fn resolve(&self, name: &str) -> Option<FontEntry> {
        if name.is_empty() || name == self.active_name {
            return self.active_entry;
        }
        self.entries.get(name).copied()
    }

    /// Look up an explicitly named font; an empty name resolves to nothing.
    pub fn resolve_explicit(&self, name: &str) -> Option<FontEntry> {
        if name.is_empty() {
            return None;
        }
        if name == self.active_name {
            log::trace!("FontRegistry: '{name}' is active, skipping lookup");
            return self.active_entry;
        }
        self.entries.get(name).copied()
    }

    /// Insert or replace an entry. The first font in an empty registry
    /// becomes active.
    pub fn insert(&mut self, name: &str, entry: FontEntry) {
        self.entries.insert(name.to_owned(), entry);
        if self.active_name.is_empty() {
            self.active_name = name.to_owned();
        }
        if self.active_name == name {
            self.active_entry = Some(entry);
        }
    }

    /// Drop every entry and the active name.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.active_name.clear();
        self.active_entry = None;
    }

    // ---------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------

    /// Replace every font with the ones listed in a config file.
    ///
    /// The config is parsed first; only then are the registry and atlas
    /// cleared. Each profile loads independently and failures are
    /// skipped. Fails only if parsing fails, nothing loads, or the atlas
    /// cannot be built. The previous active font stays active if the new
    /// batch contains it.
    pub fn load_from_config(
        &mut self,
        atlas: &mut dyn FontAtlas,
        path: &Path,
    ) -> Result<BatchReport, FontError> {
        let profiles = parse_config_file(path)?;

        let previous_active = std::mem::take(&mut self.active_name);
        self.clear();
        atlas.clear();

        let mut report = BatchReport::default();
        let mut loaded = Vec::new();
        for profile in &profiles {
            match load_profile(atlas, profile) {
                Ok(entry) => {
                    report.loaded.push(profile.name.clone());
                    loaded.push((profile.name.as_str(), entry));
                }
                Err(err) => {
                    log::warn!("FontRegistry: skipping '{}': {err}", profile.name);
                    report.failed.push((profile.name.clone(), err.to_string()));
                }
            }
        }

        if loaded.is_empty() {
            log::error!("FontRegistry: no fonts were loaded successfully");
            return Err(FontError::NoFontsLoaded);
        }

        atlas.build().map_err(|err| {
            log::error!("FontRegistry: failed to build font atlas: {err}");
            FontError::from(err)
        })?;

        for (name, entry) in loaded {
            self.insert(name, entry);
        }
        if !previous_active.is_empty() && self.contains(&previous_active) {
            self.set_active(&previous_active)?;
        }

        log::info!(
            "FontRegistry: loaded {}/{} fonts from {} (active '{}')",
            report.loaded.len(),
            profiles.len(),
            path.display(),
            self.active_name,
        );
        Ok(report)
    }

    /// Load one font file without disturbing the other entries.
    ///
    /// The first load into an empty registry clears the atlas.
    pub fn load_font(
        &mut self,
        atlas: &mut dyn FontAtlas,
        name: &str,
        path: &Path,
        size: f32,
        enable_outline: bool,
    ) -> Result<FontEntry, FontError> {
        let profile = FontProfile::new(name, path, size, enable_outline);
        validate(&profile)?;
        check_source(&profile)?;

        if self.is_empty() {
            atlas.clear();
        }
        let entry = load_profile(atlas, &profile)?;
        self.finish_single(atlas, name, entry)
    }

    /// Load a font from bytes. The atlas keeps its own copy of `data`.
    pub fn load_font_from_memory(
        &mut self,
        atlas: &mut dyn FontAtlas,
        name: &str,
        data: &[u8],
        size: f32,
        enable_outline: bool,
    ) -> Result<FontEntry, FontError> {
        let profile = FontProfile::new(name, PathBuf::new(), size, enable_outline);
        validate(&profile)?;

        if self.is_empty() {
            atlas.clear();
        }
        let derived = profile.derive();
        let handle = atlas
            .add_font_from_memory(data, size, &derived.raster)
            .map_err(|err| {
                log::error!("FontRegistry: failed to load '{name}' from memory: {err}");
                FontError::from(err)
            })?;

        let entry = FontEntry {
            handle,
            size,
            outline_thickness: derived.outline_thickness,
        };
        log_loaded(&profile, &entry);
        self.finish_single(atlas, name, entry)
    }

    fn finish_single(
        &mut self,
        atlas: &mut dyn FontAtlas,
        name: &str,
        entry: FontEntry,
    ) -> Result<FontEntry, FontError> {
        atlas.build().map_err(|err| {
            log::error!("FontRegistry: failed to build font atlas: {err}");
            FontError::from(err)
        })?;
        self.insert(name, entry);
        Ok(entry)
    }
}

impl fmt::Display for FontRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FontRegistry({} fonts, active '{}')",
            self.entries.len(),
            self.active_name,
        )
    }
}

fn validate(profile: &FontProfile) -> Result<(), FontError> {
    if profile.name.is_empty() {
        return Err(FontError::EmptyName);
    }
    if !(profile.size.is_finite() && profile.size > 0.0) {
        return Err(FontError::InvalidSize {
            name: profile.name.clone(),
            size: profile.size,
        });
    }
    Ok(())
}

fn check_source(profile: &FontProfile) -> Result<(), FontError> {
    if profile.path.is_file() {
        return Ok(());
    }
    log::error!(
        "FontRegistry: font file for '{}' not found: {}",
        profile.name,
        profile.path.display(),
    );
    Err(FontError::SourceMissing {
        name: profile.name.clone(),
        path: profile.path.clone(),
    })
}

/// Derive parameters and add a file-backed profile to the atlas.
fn load_profile(atlas: &mut dyn FontAtlas, profile: &FontProfile) -> Result<FontEntry, FontError> {
    validate(profile)?;
    check_source(profile)?;

    let derived = profile.derive();
    let handle = atlas
        .add_font_from_file(&profile.path, profile.size, &derived.raster)
        .map_err(|err| {
            log::error!(
                "FontRegistry: failed to load font '{}' from '{}': {err}",
                profile.name,
                profile.path.display(),
            );
            FontError::from(err)
        })?;

    let entry = FontEntry {
        handle,
        size: profile.size,
        outline_thickness: derived.outline_thickness,
    };
    log_loaded(profile, &entry);
    Ok(entry)
}

fn log_loaded(profile: &FontProfile, entry: &FontEntry) {
    log::info!(
        "FontRegistry: loaded font '{}' (size: {:.1}, outline: {}, thickness: {})",
        profile.name,
        entry.size,
        if profile.enable_outline { "yes" } else { "no" },
        entry.outline_thickness,
    );
}

// ===================================================================
// Tests
// ===================================================================
