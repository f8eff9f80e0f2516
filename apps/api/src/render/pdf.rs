//! Drawing sink and the PDF writer behind it.
//!
//! [`paint`] replays a laid-out [`Document`] into any [`DrawingSink`]. [`PdfCanvas`]
//! is the production sink: it records one content stream per page and assembles the
//! PDF in [`PdfCanvas::save`].
//!
//! Font handling:
//! - built-in font → Type1 base font, WinAnsi encoding, unencodable chars become `?`
//! - registered TrueType font → Type0 / CIDFontType2, Identity-H, glyph ids as CIDs,
//!   widths written only for glyphs that were drawn

use std::collections::BTreeSet;
use std::sync::Arc;

use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str};

use crate::assets::{ActiveFont, BackgroundImage, LoadedFont};
use crate::layout::font_metrics::winansi_code;
use crate::layout::Document;

const FONT_RESOURCE: Name<'static> = Name(b"F1");
const IMAGE_RESOURCE: Name<'static> = Name(b"Im1");
const COMPRESSION_LEVEL: u8 = 6;

// ────────────────────────────────────────────────────────────────────────────
// Sink interface
// ────────────────────────────────────────────────────────────────────────────

/// Receiver of drawing commands, one page at a time. A sink starts with page 1 open.
pub trait DrawingSink {
    /// Draws the background image stretched over the given rectangle.
    fn draw_background(&mut self, x: f32, y: f32, width: f32, height: f32);

    fn draw_string(&mut self, text: &str, x: f32, y: f32);

    fn draw_glyph(&mut self, ch: char, x: f32, y: f32) {
        let mut buf = [0u8; 4];
        self.draw_string(ch.encode_utf8(&mut buf), x, y);
    }

    /// Closes the current page and opens the next one.
    fn new_page(&mut self);
}

/// Replays `document` into `sink`: background, then header fields, then body glyphs.
pub fn paint<S: DrawingSink + ?Sized>(document: &Document, sink: &mut S) {
    for page in &document.pages {
        if page.index > 0 {
            sink.new_page();
        }
        if page.background.is_some() {
            sink.draw_background(0.0, 0.0, document.page_width, document.page_height);
        }
        for field in &page.header {
            sink.draw_string(&field.value, field.x, field.y);
        }
        for glyph in &page.glyphs {
            sink.draw_glyph(glyph.ch, glyph.x, glyph.y);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PDF canvas
// ────────────────────────────────────────────────────────────────────────────

pub struct PdfCanvas {
    font: ActiveFont,
    font_size: f32,
    background: Option<Arc<BackgroundImage>>,
    page_width: f32,
    page_height: f32,
    finished: Vec<Vec<u8>>,
    current: Content,
    used_glyphs: BTreeSet<u16>,
}

impl PdfCanvas {
    pub fn new(
        font: ActiveFont,
        font_size: f32,
        background: Option<Arc<BackgroundImage>>,
        page_width: f32,
        page_height: f32,
    ) -> Self {
        Self {
            font,
            font_size,
            background,
            page_width,
            page_height,
            finished: Vec::new(),
            current: Content::new(),
            used_glyphs: BTreeSet::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.finished.len() + 1
    }

    /// Assembles the document and returns the PDF bytes.
    pub fn save(self) -> Vec<u8> {
        let mut contents = self.finished;
        contents.push(self.current.finish());

        let mut refs = RefAllocator::default();
        let catalog_id = refs.bump();
        let pages_id = refs.bump();
        let font_id = refs.bump();
        let image_id = self.background.as_ref().map(|_| refs.bump());
        let page_ids: Vec<Ref> = contents.iter().map(|_| refs.bump()).collect();
        let content_ids: Vec<Ref> = contents.iter().map(|_| refs.bump()).collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);

        for (page_id, content_id) in page_ids.iter().zip(&content_ids) {
            let mut page = pdf.page(*page_id);
            page.media_box(Rect::new(0.0, 0.0, self.page_width, self.page_height))
                .parent(pages_id)
                .contents(*content_id);
            let mut resources = page.resources();
            resources.fonts().pair(FONT_RESOURCE, font_id);
            if let Some(id) = image_id {
                resources.x_objects().pair(IMAGE_RESOURCE, id);
            }
        }

        for (content_id, raw) in content_ids.iter().zip(&contents) {
            let compressed = compress_to_vec_zlib(raw, COMPRESSION_LEVEL);
            pdf.stream(*content_id, &compressed)
                .filter(Filter::FlateDecode);
        }

        match &self.font {
            ActiveFont::Builtin(table) => {
                pdf.type1_font(font_id)
                    .base_font(Name(table.base_font.as_bytes()))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
            }
            ActiveFont::Embedded(font) => {
                write_embedded_font(&mut pdf, &mut refs, font_id, font, &self.used_glyphs);
            }
        }

        if let (Some(id), Some(background)) = (image_id, &self.background) {
            let mut image = pdf.image_xobject(id, &background.rgb_deflated);
            image.filter(Filter::FlateDecode);
            image.width(background.width as i32);
            image.height(background.height as i32);
            image.color_space().device_rgb();
            image.bits_per_component(8);
        }

        pdf.finish()
    }

    fn encode(&mut self, text: &str) -> Vec<u8> {
        match &self.font {
            ActiveFont::Builtin(_) => text.chars().map(winansi_byte).collect(),
            ActiveFont::Embedded(font) => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for ch in text.chars() {
                    let glyph = font.glyph_index(ch);
                    self.used_glyphs.insert(glyph);
                    bytes.extend_from_slice(&glyph.to_be_bytes());
                }
                bytes
            }
        }
    }
}

impl DrawingSink for PdfCanvas {
    fn draw_background(&mut self, x: f32, y: f32, width: f32, height: f32) {
        if self.background.is_none() {
            return;
        }
        self.current
            .save_state()
            .transform([width, 0.0, 0.0, height, x, y])
            .x_object(IMAGE_RESOURCE)
            .restore_state();
    }

    fn draw_string(&mut self, text: &str, x: f32, y: f32) {
        let bytes = self.encode(text);
        self.current
            .begin_text()
            .set_font(FONT_RESOURCE, self.font_size)
            .set_text_matrix([1.0, 0.0, 0.0, 1.0, x, y])
            .show(Str(&bytes))
            .end_text();
    }

    fn new_page(&mut self) {
        let done = std::mem::replace(&mut self.current, Content::new());
        self.finished.push(done.finish());
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RefAllocator {
    last: i32,
}

impl RefAllocator {
    fn bump(&mut self) -> Ref {
        self.last += 1;
        Ref::new(self.last)
    }
}

fn write_embedded_font(
    pdf: &mut Pdf,
    refs: &mut RefAllocator,
    font_id: Ref,
    font: &LoadedFont,
    used_glyphs: &BTreeSet<u16>,
) {
    let cid_id = refs.bump();
    let descriptor_id = refs.bump();
    let file_id = refs.bump();
    let base_font = pdf_font_name(font.name());
    let base_font = Name(base_font.as_bytes());

    pdf.type0_font(font_id)
        .base_font(base_font)
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_id);

    let mut cid = pdf.cid_font(cid_id);
    cid.subtype(CidFontType::Type2)
        .base_font(base_font)
        .system_info(SystemInfo {
            registry: Str(b"Adobe"),
            ordering: Str(b"Identity"),
            supplement: 0,
        })
        .font_descriptor(descriptor_id)
        .default_width(1000.0)
        .cid_to_gid_map_predefined(Name(b"Identity"));
    {
        let mut widths = cid.widths();
        for &glyph in used_glyphs {
            widths.consecutive(glyph, [font.glyph_width(glyph)]);
        }
    }
    cid.finish();

    let (ascent, descent) = font.vertical_metrics();
    pdf.font_descriptor(descriptor_id)
        .name(base_font)
        .flags(FontFlags::SYMBOLIC)
        .bbox(Rect::new(0.0, descent, 1000.0, ascent))
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(descent)
        .cap_height(ascent)
        .stem_v(80.0)
        .font_file2(file_id);

    let program = compress_to_vec_zlib(font.data(), COMPRESSION_LEVEL);
    pdf.stream(file_id, &program)
        .filter(Filter::FlateDecode)
        .pair(Name(b"Length1"), font.data().len() as i32);
}

/// PDF font names: ASCII letters, digits and `-` only.
fn pdf_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if cleaned.is_empty() {
        "HandwriteFont".to_string()
    } else {
        cleaned
    }
}

/// WinAnsi byte for `ch`, `?` when the encoding has no slot for it.
fn winansi_byte(ch: char) -> u8 {
    winansi_code(ch).unwrap_or(b'?')
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
