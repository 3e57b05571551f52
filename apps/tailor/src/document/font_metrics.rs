//! Fallback glyph widths for the four canonical redraw families.
//!
//! Widths are the standard base-14 AFM advance widths in 1/1000 em, covering
//! ASCII 0x20..=0x7E. Index = (char as usize) - 32. They are used when a font
//! carries no width array of its own, and to size text drawn by the mutator.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Font family enum
// ────────────────────────────────────────────────────────────────────────────

/// Canonical families a replacement can be redrawn in. Each resolves to a
/// base-14 font every PDF reader ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    Sans,
    Serif,
    Monospace,
    BoldSans,
}

impl FontFamily {
    pub fn base_font(self) -> &'static str {
        match self {
            FontFamily::Sans => "Helvetica",
            FontFamily::Serif => "Times-Roman",
            FontFamily::Monospace => "Courier",
            FontFamily::BoldSans => "Helvetica-Bold",
        }
    }

    /// Key under which the mutator registers the font in page resources.
    pub fn resource_name(self) -> &'static str {
        match self {
            FontFamily::Sans => "TlrHelv",
            FontFamily::Serif => "TlrTiro",
            FontFamily::Monospace => "TlrCour",
            FontFamily::BoldSans => "TlrHebo",
        }
    }

    pub fn metrics(self) -> &'static FontMetricTable {
        match self {
            FontFamily::Sans => &HELVETICA,
            FontFamily::Serif => &TIMES_ROMAN,
            FontFamily::Monospace => &COURIER,
            FontFamily::BoldSans => &HELVETICA_BOLD,
        }
    }
}

/// Redraw family for a PDF font name. Case-insensitive substring checks, first
/// hit wins: sans/arial/helvetica, serif/times, mono/courier/code, bold.
/// Anything else is drawn as sans.
pub fn map_font_family(font_name: &str) -> FontFamily {
    let name = font_name.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

    if has(&["sans", "arial", "helvetica"]) {
        FontFamily::Sans
    } else if has(&["serif", "times"]) {
        FontFamily::Serif
    } else if has(&["mono", "courier", "code"]) {
        FontFamily::Monospace
    } else if has(&["bold"]) {
        FontFamily::BoldSans
    } else {
        FontFamily::Sans
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

pub struct FontMetricTable {
    pub font: FontFamily,
    widths: &'static [u16; 95],
    /// Fallback for characters outside printable ASCII, in em.
    pub average_char_width: f32,
}

impl FontMetricTable {
    /// Advance width of one character in em.
    pub fn char_width(&self, c: char) -> f32 {
        let code = c as usize;
        if (32..=126).contains(&code) {
            self.widths[code - 32] as f32 / 1000.0
        } else {
            self.average_char_width
        }
    }

    /// Rendered width of a string in em units.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars().map(|c| self.char_width(c)).sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables  (95 ASCII printable characters each)
// ────────────────────────────────────────────────────────────────────────────

/// Helvetica.
#[rustfmt::skip]
static HELVETICA_WIDTHS: [u16; 95] = [
    // sp !  "  #  $  %  &  '  (  )  *  +  ,  -  .  /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // : ; < = > ? @
    278, 278, 584, 584, 584, 556, 1015,
    // A-M
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    // N-Z
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [ \ ] ^ _ `
    278, 278, 278, 469, 556, 333,
    // a-m
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    // n-z
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // { | } ~
    334, 260, 334, 584,
];

/// Helvetica-Bold.
#[rustfmt::skip]
static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    // sp !  "  #  $  %  &  '  (  )  *  +  ,  -  .  /
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // : ; < = > ? @
    333, 333, 584, 584, 584, 611, 975,
    // A-M
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    // N-Z
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [ \ ] ^ _ `
    333, 278, 333, 584, 556, 333,
    // a-m
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    // n-z
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    // { | } ~
    389, 280, 389, 584,
];

/// Times-Roman.
#[rustfmt::skip]
static TIMES_ROMAN_WIDTHS: [u16; 95] = [
    // sp !  "  #  $  %  &  '  (  )  *  +  ,  -  .  /
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    // 0-9
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    // : ; < = > ? @
    278, 278, 564, 564, 564, 444, 921,
    // A-M
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    // N-Z
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    // [ \ ] ^ _ `
    333, 278, 333, 469, 500, 333,
    // a-m
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    // n-z
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    // { | } ~
    480, 200, 480, 541,
];

/// Courier is fixed pitch.
static COURIER_WIDTHS: [u16; 95] = [600; 95];

static HELVETICA: FontMetricTable = FontMetricTable {
    font: FontFamily::Sans,
    widths: &HELVETICA_WIDTHS,
    average_char_width: 0.55,
};

static HELVETICA_BOLD: FontMetricTable = FontMetricTable {
    font: FontFamily::BoldSans,
    widths: &HELVETICA_BOLD_WIDTHS,
    average_char_width: 0.58,
};

static TIMES_ROMAN: FontMetricTable = FontMetricTable {
    font: FontFamily::Serif,
    widths: &TIMES_ROMAN_WIDTHS,
    average_char_width: 0.48,
};

static COURIER: FontMetricTable = FontMetricTable {
    font: FontFamily::Monospace,
    widths: &COURIER_WIDTHS,
    average_char_width: 0.6,
};
