//! Text → page layout for simulated handwriting.
//!
//! # Algorithm
//! Input text is split on `\n`. Each non-blank line is wrapped greedily:
//! 1. Take the longest prefix whose measured width fits `max_width`.
//! 2. Pull back over closing punctuation at the end of that prefix.
//! 3. Push forward by one mark if the next line would open with punctuation.
//! 4. Always take at least one character.
//!
//! Each segment is placed on the current page; once the vertical cursor falls below
//! the bottom margin a fresh page is opened with the same background and header.
//! Jitter is sampled from the caller's RNG, so a seeded RNG gives reproducible output.
//!
//! Step 3 lets one closing mark hang past `max_width` rather than open the next line.

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::layout::font_metrics::TextMeasure;
use crate::layout::settings::{HeaderField, LayoutConfig, PAGE_HEIGHT, PAGE_WIDTH};

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// One positioned character.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Glyph {
    pub ch: char,
    pub x: f32,
    pub y: f32,
}

/// A wrapped segment as it was placed. Not drawn; kept for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRecord {
    pub text: String,
    /// Vertical cursor before jitter.
    pub baseline: f32,
    /// Vertical jitter applied to every glyph of the segment.
    pub jitter: i32,
}

/// What every page carries besides body text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageTemplate {
    /// Name of the background image asset, if one is drawn.
    pub background: Option<String>,
    pub header: Vec<HeaderField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub index: usize,
    pub background: Option<String>,
    pub header: Vec<HeaderField>,
    pub glyphs: Vec<Glyph>,
    pub lines: Vec<LineRecord>,
}

/// Laid-out document. Built fresh per call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub page_width: f32,
    pub page_height: f32,
    pub font_size: f32,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn glyph_count(&self) -> usize {
        self.pages.iter().map(|p| p.glyphs.len()).sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public entry point
// ────────────────────────────────────────────────────────────────────────────

/// Lays `text` out onto as many pages as it needs.
///
/// `config` must already be validated (see `RenderSettings::to_layout_config`).
pub fn layout<M, R>(
    text: &str,
    template: &PageTemplate,
    config: &LayoutConfig,
    metrics: &M,
    rng: &mut R,
) -> Document
where
    M: TextMeasure + ?Sized,
    R: Rng + ?Sized,
{
    let mut ctx = PageContext::new(template, config);

    for raw_line in text.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

        if line.trim().is_empty() {
            ctx.skip_line();
            continue;
        }

        // Char boundaries are computed once per input line; each segment is then
        // scanned once, so wrapping stays linear in the line length.
        let (chars, bounds) = char_table(line);
        let mut start = 0;
        while start < chars.len() {
            let cut = break_point(&chars[start..], config, metrics);
            let segment = &line[bounds[start]..bounds[start + cut]];

            ctx.ensure_room();
            ctx.place_segment(segment, metrics, rng);
            start += cut;
        }
    }

    let document = ctx.finish();
    debug!(
        pages = document.pages.len(),
        glyphs = document.glyph_count(),
        "Layout complete"
    );
    document
}

// ────────────────────────────────────────────────────────────────────────────
// Line breaking
// ────────────────────────────────────────────────────────────────────────────

/// Number of leading characters of `chars` to place on the current visual line.
/// Always `>= 1` for a non-empty slice.
pub fn break_point<M: TextMeasure + ?Sized>(
    chars: &[char],
    config: &LayoutConfig,
    metrics: &M,
) -> usize {
    if chars.is_empty() {
        return 0;
    }
    let is_punct = |idx: usize| config.punctuation.contains(chars[idx]);

    let mut cut = greedy_fit(chars, config, metrics).max(1);

    while cut > 0 && is_punct(cut - 1) {
        cut -= 1;
    }
    cut = cut.max(1);

    if cut < chars.len() && is_punct(cut) {
        cut += 1;
    }
    cut.max(1)
}

/// Largest character count whose summed width does not exceed `max_width`.
///
/// Scans forward with a running width and stops at the first overflow.
pub fn greedy_fit<M: TextMeasure + ?Sized>(
    chars: &[char],
    config: &LayoutConfig,
    metrics: &M,
) -> usize {
    let mut width = 0.0;
    for (count, &ch) in chars.iter().enumerate() {
        width += metrics.char_width(ch, config.font_size);
        if width > config.max_width {
            return count;
        }
    }
    chars.len()
}

/// Characters of `line` and the byte offset of each, plus `line.len()` at the end.
pub fn char_table(line: &str) -> (Vec<char>, Vec<usize>) {
    let mut chars = Vec::with_capacity(line.len());
    let mut bounds = Vec::with_capacity(line.len() + 1);
    for (idx, ch) in line.char_indices() {
        chars.push(ch);
        bounds.push(idx);
    }
    bounds.push(line.len());
    (chars, bounds)
}

// ────────────────────────────────────────────────────────────────────────────
// Page context
// ────────────────────────────────────────────────────────────────────────────

/// Current page plus vertical cursor. Replaces closures over shared outer state.
struct PageContext<'a> {
    template: &'a PageTemplate,
    config: &'a LayoutConfig,
    pages: Vec<Page>,
    y: f32,
}

impl<'a> PageContext<'a> {
    fn new(template: &'a PageTemplate, config: &'a LayoutConfig) -> Self {
        let mut ctx = Self {
            template,
            config,
            pages: Vec::new(),
            y: config.start_y,
        };
        ctx.open_page();
        ctx
    }

    fn open_page(&mut self) {
        self.pages.push(Page {
            index: self.pages.len(),
            background: self.template.background.clone(),
            header: self.template.header.clone(),
            glyphs: Vec::new(),
            lines: Vec::new(),
        });
        self.y = self.config.start_y;
    }

    fn skip_line(&mut self) {
        self.y -= self.config.line_height;
    }

    /// Opens a new page when the cursor has passed the bottom margin.
    fn ensure_room(&mut self) {
        if self.y < self.config.page_bottom_margin {
            self.open_page();
        }
    }

    fn place_segment<M, R>(&mut self, segment: &str, metrics: &M, rng: &mut R)
    where
        M: TextMeasure + ?Sized,
        R: Rng + ?Sized,
    {
        let config = self.config;
        let baseline = self.y;
        let jitter = sample_line_jitter(rng, config.line_jitter);
        let y = baseline + jitter as f32;

        let mut x = config.start_x;
        let mut glyphs = Vec::with_capacity(segment.len());
        for ch in segment.chars() {
            let dx = sample_char_jitter(rng, config.char_jitter);
            glyphs.push(Glyph { ch, x: x + dx, y });
            x += metrics.char_width(ch, config.font_size);
        }

        // The first page is opened in `new`, so there is always a current page.
        if let Some(page) = self.pages.last_mut() {
            page.glyphs.extend(glyphs);
            page.lines.push(LineRecord {
                text: segment.to_string(),
                baseline,
                jitter,
            });
        }
        self.y -= config.line_height;
    }

    fn finish(self) -> Document {
        Document {
            page_width: PAGE_WIDTH,
            page_height: PAGE_HEIGHT,
            font_size: self.config.font_size,
            pages: self.pages,
        }
    }
}

fn sample_line_jitter<R: Rng + ?Sized>(rng: &mut R, bound: i32) -> i32 {
    if bound == 0 {
        0
    } else {
        rng.gen_range(-bound..=bound)
    }
}

fn sample_char_jitter<R: Rng + ?Sized>(rng: &mut R, bound: f32) -> f32 {
    if bound == 0.0 {
        0.0
    } else {
        rng.gen_range(-bound..=bound)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
