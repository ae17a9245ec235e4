//! Font configuration file parser.
//!
//! Line-oriented, one directive per line:
//!
//! ```text
//! // UI fonts
//! FONT   Default
//! PATH   fonts/NotoSans-Regular.ttf
//! SIZE   14
//! ENABLE_OUTLINE 1      # outline ring, thickness derived from SIZE
//! ```
//!
//! Every `FONT` starts a new profile. Malformed numbers leave the field at
//! its default and lines without a separator are skipped; neither aborts
//! the parse.

use std::fs;
use std::path::{Path, PathBuf};

use crate::profile::FontProfile;
use crate::registry::FontError;

/// Read and parse a config file.
///
/// Fails if the file cannot be read or yields no profiles.
pub fn parse_config_file(path: &Path) -> Result<Vec<FontProfile>, FontError> {
    let bytes = fs::read(path).map_err(|source| {
        log::error!("FontConfig: failed to open {}: {source}", path.display());
        FontError::ConfigOpen {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let profiles = parse_config(&String::from_utf8_lossy(&bytes));
    if profiles.is_empty() {
        log::error!("FontConfig: no font profiles in {}", path.display());
        return Err(FontError::NoProfiles(path.to_path_buf()));
    }

    log::info!(
        "FontConfig: loaded {} font profiles from {}",
        profiles.len(),
        path.display(),
    );
    Ok(profiles)
}

/// Parse config text into profiles, in file order.
pub fn parse_config(source: &str) -> Vec<FontProfile> {
    let mut profiles = Vec::new();
    let mut current: Option<FontProfile> = None;

    for (index, raw) in source.lines().enumerate() {
        let line_number = index + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once([' ', '\t']) else {
            log::warn!("FontConfig: invalid syntax at line {line_number}: {line}");
            continue;
        };
        let value = value.trim_start_matches([' ', '\t']);

        if key == "FONT" {
            if let Some(done) = current.take().filter(|p| !p.name.is_empty()) {
                profiles.push(done);
            }
            current = Some(FontProfile {
                name: value.to_owned(),
                ..FontProfile::default()
            });
            continue;
        }

        let Some(profile) = current.as_mut() else {
            log::warn!("FontConfig: '{key}' outside a FONT block at line {line_number}");
            continue;
        };
        apply_directive(profile, key, value, line_number);
    }

    if let Some(done) = current.filter(|p| !p.name.is_empty()) {
        profiles.push(done);
    }
    profiles
}

fn apply_directive(profile: &mut FontProfile, key: &str, value: &str, line_number: usize) {
    match key {
        "PATH" => profile.path = PathBuf::from(value),
        "SIZE" => match parse_float_prefix(value).filter(|s| s.is_finite() && *s > 0.0) {
            Some(size) => profile.size = size,
            None => malformed(key, value, line_number),
        },
        "ENABLE_OUTLINE" => match parse_int_prefix(value) {
            Some(flag) => profile.enable_outline = flag != 0,
            None => malformed(key, value, line_number),
        },
        "OVERSAMPLE_H" | "OVERSAMPLE_V" | "RASTERIZER_MULTIPLY" | "OUTLINE_THICKNESS"
        | "PIXEL_SNAP_H" => apply_legacy(profile, key, value, line_number),
        _ => log::debug!("FontConfig: ignoring unknown key '{key}' at line {line_number}"),
    }
}

fn apply_legacy(profile: &mut FontProfile, key: &str, value: &str, line_number: usize) {
    let legacy = &mut profile.legacy;
    let parsed = match key {
        "OVERSAMPLE_H" => parse_int_prefix(value).map(|v| legacy.oversample_h = Some(v)),
        "OVERSAMPLE_V" => parse_int_prefix(value).map(|v| legacy.oversample_v = Some(v)),
        "RASTERIZER_MULTIPLY" => {
            parse_float_prefix(value).map(|v| legacy.rasterizer_multiply = Some(v))
        }
        "OUTLINE_THICKNESS" => parse_int_prefix(value).map(|v| legacy.outline_thickness = Some(v)),
        _ => parse_int_prefix(value).map(|v| legacy.pixel_snap_h = Some(v != 0)),
    };

    if parsed.is_none() {
        malformed(key, value, line_number);
        return;
    }
    log::warn!(
        "FontConfig: '{key}' at line {line_number} is deprecated and ignored; \
         '{}' derives it from SIZE",
        profile.name,
    );
}

fn malformed(key: &str, value: &str, line_number: usize) {
    log::warn!("FontConfig: malformed {key} value '{value}' at line {line_number}, keeping default");
}

/// Cut the line at the earliest `//` or `#`.
fn strip_comment(line: &str) -> &str {
    let slashes = line.find("//");
    let hash = line.find('#');
    let cut = match (slashes, hash) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    match cut {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Length of the leading `-?digits[.digits][e[+-]digits]` run, or 0.
fn numeric_prefix_len(s: &str, fraction: bool) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    if bytes.first() == Some(&b'-') {
        i += 1;
    }
    let int_end = digits_from(i);
    let mut digit_count = int_end - i;
    i = int_end;

    if fraction && bytes.get(i) == Some(&b'.') {
        let frac_end = digits_from(i + 1);
        digit_count += frac_end - (i + 1);
        i = frac_end;
    }
    if digit_count == 0 {
        return 0;
    }

    if fraction && matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_end = digits_from(j);
        if exp_end > j {
            i = exp_end;
        }
    }
    i
}

fn parse_float_prefix(value: &str) -> Option<f32> {
    let len = numeric_prefix_len(value, true);
    if len == 0 {
        return None;
    }
    value[..len].parse().ok()
}

fn parse_int_prefix(value: &str) -> Option<i32> {
    let len = numeric_prefix_len(value, false);
    if len == 0 {
        return None;
    }
    value[..len].parse().ok()
}

// ===================================================================
// Tests
// ===================================================================
