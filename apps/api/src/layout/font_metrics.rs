//! Width measurement for the layout engine.
//!
//! Two providers implement [`TextMeasure`]:
//! - [`FontMetricTable`]: the static Helvetica table used when no custom font registered.
//! - [`crate::assets::LoadedFont`]: glyph advances read from a registered TrueType font.
//!
//! Widths are returned in PDF points at the requested font size. Measurement is a plain
//! sum of per-character advances (no kerning), so it is monotonic in prefix length.

// ────────────────────────────────────────────────────────────────────────────
// Measurement trait
// ────────────────────────────────────────────────────────────────────────────

/// Anything that can tell the layout engine how wide a run of text is.
pub trait TextMeasure {
    /// Advance width of a single character in points at `font_size`.
    fn char_width(&self, ch: char, font_size: f32) -> f32;

    /// Advance width of `text` in points at `font_size`.
    fn measure(&self, text: &str, font_size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c, font_size)).sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in font metric table
// ────────────────────────────────────────────────────────────────────────────

/// WinAnsi (Windows-1252) code for `ch`, the encoding used with built-in base fonts.
///
/// Printable ASCII and Latin-1 map to themselves; 0x80..=0x9F hold the typographic
/// quotes, dashes, ellipsis, euro sign and a few accented capitals.
pub fn winansi_code(ch: char) -> Option<u8> {
    let code = match ch as u32 {
        c @ (0x20..=0x7E | 0xA0..=0xFF) => c as u8,
        0x20AC => 0x80, // €
        0x201A => 0x82, // ‚
        0x0192 => 0x83, // ƒ
        0x201E => 0x84, // „
        0x2026 => 0x85, // …
        0x2020 => 0x86, // †
        0x2021 => 0x87, // ‡
        0x02C6 => 0x88, // ˆ
        0x2030 => 0x89, // ‰
        0x0160 => 0x8A, // Š
        0x2039 => 0x8B, // ‹
        0x0152 => 0x8C, // Œ
        0x017D => 0x8E, // Ž
        0x2018 => 0x91, // ‘
        0x2019 => 0x92, // ’
        0x201C => 0x93, // “
        0x201D => 0x94, // ”
        0x2022 => 0x95, // •
        0x2013 => 0x96, // –
        0x2014 => 0x97, // —
        0x02DC => 0x98, // ˜
        0x2122 => 0x99, // ™
        0x0161 => 0x9A, // š
        0x203A => 0x9B, // ›
        0x0153 => 0x9C, // œ
        0x017E => 0x9E, // ž
        0x0178 => 0x9F, // Ÿ
        _ => return None,
    };
    Some(code)
}

/// Static character-width table for a built-in PDF base font.
///
/// `widths[i]` is the width of WinAnsi code `(i + 0x20)` in em units, covering
/// 0x20 (space) through 0xFF (ÿ). Codes WinAnsi leaves undefined hold `0.0` and are
/// never looked up.
#[derive(Debug)]
pub struct FontMetricTable {
    /// PostScript name of the base font, written into the PDF font dictionary.
    pub base_font: &'static str,
    widths: [f32; 224],
    /// Width used for characters WinAnsi cannot encode. The PDF writer replaces
    /// them with `?`, so this is the width of `?`.
    pub fallback_width: f32,
}

impl FontMetricTable {
    /// Width of `ch` in em units.
    pub fn em_width(&self, ch: char) -> f32 {
        match winansi_code(ch) {
            Some(code) => self.widths[code as usize - 0x20],
            None => self.fallback_width,
        }
    }
}

impl TextMeasure for FontMetricTable {
    fn char_width(&self, ch: char, font_size: f32) -> f32 {
        self.em_width(ch) * font_size
    }
}

/// Helvetica, from the Adobe core-14 AFM widths.
pub static HELVETICA: FontMetricTable = FontMetricTable {
    base_font: "Helvetica",
    #[rustfmt::skip]
    widths: [
        // sp     !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.191, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.278, 0.278, 0.278, 0.469, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
        // {      |      }      ~      0x7F
        0.334, 0.260, 0.334, 0.584, 0.000,
        // €      0x81   ‚      ƒ      „      …      †      ‡      ˆ      ‰      Š      ‹      Œ      0x8D   Ž      0x8F
        0.556, 0.000, 0.222, 0.556, 0.333, 1.000, 0.556, 0.556, 0.333, 1.000, 0.667, 0.333, 1.000, 0.000, 0.611, 0.000,
        // 0x90   ‘      ’      “      ”      •      –      —      ˜      ™      š      ›      œ      0x9D   ž      Ÿ
        0.000, 0.222, 0.222, 0.333, 0.333, 0.350, 0.556, 1.000, 0.333, 1.000, 0.500, 0.333, 0.944, 0.000, 0.500, 0.667,
        // nbsp   ¡      ¢      £      ¤      ¥      ¦      §      ¨      ©      ª      «      ¬      shy    ®      ¯
        0.278, 0.333, 0.556, 0.556, 0.556, 0.556, 0.260, 0.556, 0.333, 0.737, 0.370, 0.556, 0.584, 0.333, 0.737, 0.333,
        // °      ±      ²      ³      ´      µ      ¶      ·      ¸      ¹      º      »      ¼      ½      ¾      ¿
        0.400, 0.584, 0.333, 0.333, 0.333, 0.556, 0.537, 0.278, 0.333, 0.333, 0.365, 0.556, 0.834, 0.834, 0.834, 0.611,
        // À      Á      Â      Ã      Ä      Å      Æ      Ç      È      É      Ê      Ë      Ì      Í      Î      Ï
        0.667, 0.667, 0.667, 0.667, 0.667, 0.667, 1.000, 0.722, 0.667, 0.667, 0.667, 0.667, 0.278, 0.278, 0.278, 0.278,
        // Ð      Ñ      Ò      Ó      Ô      Õ      Ö      ×      Ø      Ù      Ú      Û      Ü      Ý      Þ      ß
        0.722, 0.722, 0.778, 0.778, 0.778, 0.778, 0.778, 0.584, 0.778, 0.722, 0.722, 0.722, 0.722, 0.667, 0.667, 0.611,
        // à      á      â      ã      ä      å      æ      ç      è      é      ê      ë      ì      í      î      ï
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.889, 0.500, 0.556, 0.556, 0.556, 0.556, 0.278, 0.278, 0.278, 0.278,
        // ð      ñ      ò      ó      ô      õ      ö      ÷      ø      ù      ú      û      ü      ý      þ      ÿ
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.584, 0.611, 0.556, 0.556, 0.556, 0.556, 0.500, 0.556, 0.500,
    ],
    fallback_width: 0.556,
};

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_empty_returns_zero() {
        assert_eq!(HELVETICA.measure("", 15.0), 0.0);
    }

    #[test]
    fn test_measure_single_space() {
        let width = HELVETICA.measure(" ", 10.0);
        assert!(
            (width - 2.78).abs() < 1e-4,
            "space width at 10pt should be 2.78, got {width}"
        );
    }

    #[test]
    fn test_measure_ascii_word() {
        // "Rust" = R(0.722) + u(0.556) + s(0.500) + t(0.278) = 2.056em
        let width = HELVETICA.measure("Rust", 1.0);
        assert!(
            (width - 2.056).abs() < 1e-4,
            "Rust width should be ~2.056em, got {width}"
        );
    }

    #[test]
    fn test_measure_scales_with_font_size() {
        let small = HELVETICA.measure("handwriting", 10.0);
        let large = HELVETICA.measure("handwriting", 20.0);
        assert!((large - 2.0 * small).abs() < 1e-3);
    }

    #[test]
    fn test_unencodable_uses_question_mark_width() {
        assert_eq!(HELVETICA.em_width('字'), HELVETICA.em_width('?'));
        assert_eq!(HELVETICA.em_width('\t'), HELVETICA.fallback_width);
    }

    #[test]
    fn test_typographic_punctuation_widths() {
        assert_eq!(HELVETICA.em_width('’'), 0.222);
        assert_eq!(HELVETICA.em_width('‘'), 0.222);
        assert_eq!(HELVETICA.em_width('“'), 0.333);
        assert_eq!(HELVETICA.em_width('–'), 0.556);
        assert_eq!(HELVETICA.em_width('—'), 1.0);
        assert_eq!(HELVETICA.em_width('…'), 1.0);
        assert_eq!(HELVETICA.em_width('€'), 0.556);
    }

    #[test]
    fn test_latin1_widths() {
        assert_eq!(HELVETICA.em_width('é'), 0.556);
        assert_eq!(HELVETICA.em_width('Æ'), 1.0);
        assert_eq!(HELVETICA.em_width('ß'), 0.611);
        assert_eq!(HELVETICA.em_width('ÿ'), 0.5);
    }

    #[test]
    fn test_apostrophe_word_width() {
        // d(0.556) + o(0.556) + n(0.556) + ’(0.222) + t(0.278) = 2.168em
        let width = HELVETICA.measure("don’t", 1.0);
        assert!((width - 2.168).abs() < 1e-4, "got {width}");
    }

    #[test]
    fn test_winansi_code_table() {
        assert_eq!(winansi_code('A'), Some(b'A'));
        assert_eq!(winansi_code('é'), Some(0xE9));
        assert_eq!(winansi_code('€'), Some(0x80));
        assert_eq!(winansi_code('’'), Some(0x92));
        assert_eq!(winansi_code('“'), Some(0x93));
        assert_eq!(winansi_code('—'), Some(0x97));
        assert_eq!(winansi_code('Ÿ'), Some(0x9F));
        assert_eq!(winansi_code('字'), None);
        assert_eq!(winansi_code('\u{7F}'), None);
        assert_eq!(winansi_code('\u{85}'), None);
    }

    #[test]
    fn test_every_encodable_char_has_a_width() {
        for code in 0x20u32..=0x2122 {
            if let Some(ch) = char::from_u32(code) {
                if winansi_code(ch).is_some() {
                    assert!(HELVETICA.em_width(ch) > 0.0, "{ch:?} has no width");
                }
            }
        }
    }

    #[test]
    fn test_measure_is_monotonic_in_prefix_length() {
        let text = "The quick brown fox, jumps.";
        let mut previous = 0.0;
        for (idx, _) in text.char_indices().skip(1) {
            let width = HELVETICA.measure(&text[..idx], 15.0);
            assert!(width >= previous);
            previous = width;
        }
    }
}
