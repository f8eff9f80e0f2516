//! Request settings → validated [`LayoutConfig`].
//!
//! The engine assumes well-formed geometry. Everything a client can send is checked
//! here first, so a bad request becomes a 400 instead of a degenerate layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Page geometry
// ────────────────────────────────────────────────────────────────────────────

/// A4 width in points.
pub const PAGE_WIDTH: f32 = 595.2756;
/// A4 height in points.
pub const PAGE_HEIGHT: f32 = 841.8898;
/// Distance kept free between the last glyph and the right page edge.
pub const RIGHT_MARGIN: f32 = 70.0;
/// A new page starts once the vertical cursor falls below this line.
pub const PAGE_BOTTOM_MARGIN: f32 = 120.0;
/// Longest body text accepted in one request, in characters.
pub const MAX_TEXT_CHARS: usize = 200_000;

/// Closing punctuation that should neither end a measured line nor open a new one.
pub const DEFAULT_PUNCTUATION: &str = "，。！？：；、））》】,.!?:;)]}";

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Set of closing punctuation marks used by the wrap rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PunctuationSet(Vec<char>);

impl PunctuationSet {
    pub fn new(chars: &str) -> Self {
        let mut set: Vec<char> = chars.chars().filter(|c| !c.is_whitespace()).collect();
        set.sort_unstable();
        set.dedup();
        Self(set)
    }

    pub fn contains(&self, ch: char) -> bool {
        self.0.binary_search(&ch).is_ok()
    }
}

impl Default for PunctuationSet {
    fn default() -> Self {
        Self::new(DEFAULT_PUNCTUATION)
    }
}

/// Validated layout parameters consumed by [`crate::layout::engine::layout`].
///
/// Invariant: every value is finite, `max_width > 0`, `line_height > 0`,
/// `font_size > 0`, both jitters `>= 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub font_size: f32,
    pub start_x: f32,
    pub start_y: f32,
    pub line_height: f32,
    /// Vertical jitter bound in whole points, sampled once per line.
    pub line_jitter: i32,
    /// Horizontal jitter bound in points, sampled per character.
    pub char_jitter: f32,
    pub max_width: f32,
    pub page_bottom_margin: f32,
    pub punctuation: PunctuationSet,
}

/// Fixed-position text drawn on every page before the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderField {
    pub name: String,
    pub value: String,
    pub x: f32,
    pub y: f32,
}

/// Where a header field is drawn on the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldPosition {
    pub x: f32,
    pub y: f32,
}

/// Client-facing layout settings. Every field is optional in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub font_size: f32,
    pub start_x: f32,
    pub start_y: f32,
    pub line_height: f32,
    pub line_jitter: i32,
    pub char_jitter: f32,
    /// Positions of header fields, keyed by field name.
    pub fields: BTreeMap<String, FieldPosition>,
    /// Overrides [`DEFAULT_PUNCTUATION`] when present.
    pub punctuation: Option<String>,
    /// Seeds the jitter RNG for reproducible output.
    pub seed: Option<u64>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            font_size: 15.0,
            start_x: 64.0,
            start_y: 661.0,
            line_height: 30.0,
            line_jitter: 3,
            char_jitter: 2.0,
            fields: BTreeMap::new(),
            punctuation: None,
            seed: None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("{field} must be greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f32 },

    #[error("{field} cannot be negative (got {value})")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} cannot exceed {max} (got {value})")]
    TooLarge {
        field: &'static str,
        value: f32,
        max: f32,
    },

    #[error("start_x {start_x} leaves no room for text (usable width {max_width})")]
    NoHorizontalRoom { start_x: f32, max_width: f32 },

    #[error("start_y {start_y} is below the page bottom margin {margin}")]
    NoVerticalRoom { start_y: f32, margin: f32 },

    #[error("text is too long: {chars} characters (max {max})")]
    TextTooLong { chars: usize, max: usize },
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

impl RenderSettings {
    /// Checks the settings and derives the engine configuration.
    ///
    /// `max_width` is whatever remains of the page width after `start_x` and the
    /// fixed right margin.
    pub fn to_layout_config(&self) -> Result<LayoutConfig, ValidationError> {
        let font_size = finite("font_size", self.font_size)?;
        let start_x = finite("start_x", self.start_x)?;
        let start_y = finite("start_y", self.start_y)?;
        let line_height = finite("line_height", self.line_height)?;
        let char_jitter = finite("char_jitter", self.char_jitter)?;

        positive("font_size", font_size)?;
        positive("line_height", line_height)?;
        non_negative("char_jitter", char_jitter)?;
        non_negative("line_jitter", self.line_jitter as f32)?;
        // Larger values put glyphs off the page and overflow the jitter sampler.
        at_most("font_size", font_size, PAGE_WIDTH)?;
        at_most("char_jitter", char_jitter, PAGE_WIDTH)?;
        at_most("line_jitter", self.line_jitter as f32, PAGE_HEIGHT)?;

        let max_width = PAGE_WIDTH - start_x - RIGHT_MARGIN;
        if max_width <= 0.0 {
            return Err(ValidationError::NoHorizontalRoom { start_x, max_width });
        }
        if start_y < PAGE_BOTTOM_MARGIN {
            return Err(ValidationError::NoVerticalRoom {
                start_y,
                margin: PAGE_BOTTOM_MARGIN,
            });
        }

        let punctuation = self
            .punctuation
            .as_deref()
            .map(PunctuationSet::new)
            .unwrap_or_default();

        Ok(LayoutConfig {
            font_size,
            start_x,
            start_y,
            line_height,
            line_jitter: self.line_jitter,
            char_jitter,
            max_width,
            page_bottom_margin: PAGE_BOTTOM_MARGIN,
            punctuation,
        })
    }

    /// Joins field values with their configured positions.
    ///
    /// Values without a position are not drawn. Output order follows field name.
    pub fn header_fields(&self, values: &BTreeMap<String, String>) -> Vec<HeaderField> {
        values
            .iter()
            .filter_map(|(name, value)| {
                self.fields.get(name).map(|pos| HeaderField {
                    name: name.clone(),
                    value: value.clone(),
                    x: pos.x,
                    y: pos.y,
                })
            })
            .collect()
    }
}

/// Rejects body text the service will not lay out.
pub fn validate_text(text: &str) -> Result<(), ValidationError> {
    let chars = text.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(ValidationError::TextTooLong {
            chars,
            max: MAX_TEXT_CHARS,
        });
    }
    Ok(())
}

fn finite(field: &'static str, value: f32) -> Result<f32, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::NotFinite { field })
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ValidationError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NotPositive { field, value })
    }
}

fn at_most(field: &'static str, value: f32, max: f32) -> Result<(), ValidationError> {
    if value <= max {
        Ok(())
    } else {
        Err(ValidationError::TooLarge { field, value, max })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ValidationError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::Negative { field, value })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
