//! Font resources as the text interpreter needs them: code length, decoding
//! to Unicode and glyph advance widths.

use std::collections::HashMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::{Deserialize, Serialize};

use super::encoding::{base_encoding_table, win_ansi_table, ToUnicodeMap};
use super::font_metrics::FontFamily;

/// Style bits derived from the font name and descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleFlags(u8);

impl StyleFlags {
    pub const BOLD: u8 = 1;
    pub const ITALIC: u8 = 1 << 1;
    pub const MONOSPACE: u8 = 1 << 2;
    pub const SERIF: u8 = 1 << 3;

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub fn is_bold(self) -> bool {
        self.contains(Self::BOLD)
    }

    pub fn is_italic(self) -> bool {
        self.contains(Self::ITALIC)
    }

    pub fn is_monospace(self) -> bool {
        self.contains(Self::MONOSPACE)
    }

    pub fn is_serif(self) -> bool {
        self.contains(Self::SERIF)
    }

    fn from_name(base_font: &str) -> Self {
        let n = base_font.to_lowercase();
        let mut bits = 0;
        if ["bold", "black", "heavy", "semibold"].iter().any(|w| n.contains(w)) {
            bits |= Self::BOLD;
        }
        if n.contains("italic") || n.contains("oblique") {
            bits |= Self::ITALIC;
        }
        if ["mono", "courier", "code", "consolas"].iter().any(|w| n.contains(w)) {
            bits |= Self::MONOSPACE;
        }
        let serif_name = ["times", "garamond", "georgia", "cambria", "roman"]
            .iter()
            .any(|w| n.contains(w));
        if serif_name || (n.contains("serif") && !n.contains("sans")) {
            bits |= Self::SERIF;
        }
        StyleFlags(bits)
    }

    /// `/FontDescriptor /Flags`: FixedPitch (1), Serif (2), Italic (7), ForceBold (19).
    fn from_descriptor(flags: i64) -> Self {
        let mut bits = 0;
        if flags & 1 != 0 {
            bits |= Self::MONOSPACE;
        }
        if flags & (1 << 1) != 0 {
            bits |= Self::SERIF;
        }
        if flags & (1 << 6) != 0 {
            bits |= Self::ITALIC;
        }
        if flags & (1 << 18) != 0 {
            bits |= Self::BOLD;
        }
        StyleFlags(bits)
    }
}

impl std::ops::BitOr for StyleFlags {
    type Output = StyleFlags;

    fn bitor(self, rhs: StyleFlags) -> StyleFlags {
        StyleFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FontInfo {
    pub base_font: String,
    pub style: StyleFlags,
    /// Bytes per character code: 1 for simple fonts, usually 2 for Type0.
    pub code_len: usize,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    default_width: Option<f32>,
    to_unicode: Option<ToUnicodeMap>,
    /// Single-byte code table when `/Encoding` names one; WinAnsi otherwise.
    byte_table: Option<Vec<String>>,
    fallback: FontFamily,
}

impl FontInfo {
    /// Helvetica without embedded metrics, used for unknown font keys.
    pub fn fallback() -> Self {
        Self::base14("Helvetica")
    }

    pub fn base14(base_font: &str) -> Self {
        let style = StyleFlags::from_name(base_font);
        Self {
            base_font: base_font.to_string(),
            style,
            code_len: 1,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: None,
            to_unicode: None,
            byte_table: None,
            fallback: metrics_family(style),
        }
    }

    pub fn load(doc: &Document, font: &Dictionary) -> Self {
        let subtype = entry(doc, font, b"Subtype").and_then(name).unwrap_or(&b"Type1"[..]);
        let base_font = entry(doc, font, b"BaseFont")
            .and_then(name)
            .map(|n| strip_subset_prefix(&String::from_utf8_lossy(n)).to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let to_unicode = entry(doc, font, b"ToUnicode")
            .and_then(|o| o.as_stream().ok())
            .and_then(|s| s.get_plain_content().ok())
            .map(|data| ToUnicodeMap::parse(&data))
            .filter(|m| !m.is_empty());

        let mut info = Self::base14(&base_font);

        if subtype == b"Type0" {
            info.code_len = to_unicode.as_ref().and_then(|m| m.code_len).unwrap_or(2);
            let descendant = entry(doc, font, b"DescendantFonts")
                .and_then(|o| o.as_array().ok())
                .and_then(|a| a.first())
                .and_then(|o| resolve_dict(doc, o));
            if let Some(cid_font) = descendant {
                info.default_width = Some(
                    entry(doc, cid_font, b"DW")
                        .and_then(number)
                        .unwrap_or(1000.0)
                        / 1000.0,
                );
                if let Some(w) = entry(doc, cid_font, b"W").and_then(|o| o.as_array().ok()) {
                    info.cid_widths = parse_cid_widths(doc, w);
                }
                info.apply_descriptor(doc, cid_font);
            }
        } else if subtype != b"Type3" {
            info.first_char = entry(doc, font, b"FirstChar")
                .and_then(number)
                .unwrap_or(0.0) as u32;
            if let Some(w) = entry(doc, font, b"Widths").and_then(|o| o.as_array().ok()) {
                info.widths = w
                    .iter()
                    .map(|o| number(resolve(doc, o)).unwrap_or(0.0) / 1000.0)
                    .collect();
            }
            info.byte_table = base_encoding_table(doc, font);
            info.apply_descriptor(doc, font);
        }

        info.to_unicode = to_unicode;
        info.fallback = metrics_family(info.style);
        info
    }

    fn apply_descriptor(&mut self, doc: &Document, font: &Dictionary) {
        let flags = entry(doc, font, b"FontDescriptor")
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| entry(doc, d, b"Flags"))
            .and_then(number);
        if let Some(flags) = flags {
            self.style = self.style | StyleFlags::from_descriptor(flags as i64);
        }
    }

    /// Splits a string operand into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks(self.code_len.max(1))
            .map(|chunk| chunk.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
            .collect()
    }

    pub fn decode(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.get(code)) {
            return text.to_string();
        }
        if self.code_len == 1 {
            let table = self.byte_table.as_deref().unwrap_or_else(|| win_ansi_table());
            table.get(code as usize).cloned().unwrap_or_default()
        } else {
            char::from_u32(code).map(String::from).unwrap_or_default()
        }
    }

    /// Advance width in em (glyph space / 1000).
    pub fn width(&self, code: u32, text: &str) -> f32 {
        if self.code_len == 1 {
            let idx = code.checked_sub(self.first_char).map(|i| i as usize);
            if let Some(w) = idx.and_then(|i| self.widths.get(i)).filter(|w| **w > 0.0) {
                return *w;
            }
        } else if let Some(w) = self.cid_widths.get(&code).or(self.default_width.as_ref()) {
            return *w;
        }
        let metrics = self.fallback.metrics();
        match text.chars().next() {
            Some(c) => metrics.char_width(c),
            None => metrics.average_char_width,
        }
    }
}

/// Width-table family for fonts without width arrays. Distinct from the
/// name-based redraw mapping: this one trusts the derived style bits.
fn metrics_family(style: StyleFlags) -> FontFamily {
    if style.is_monospace() {
        FontFamily::Monospace
    } else if style.is_serif() {
        FontFamily::Serif
    } else if style.is_bold() {
        FontFamily::BoldSans
    } else {
        FontFamily::Sans
    }
}

fn number(obj: &Object) -> Option<f32> {
    obj.as_float().ok()
}

fn name(obj: &Object) -> Option<&[u8]> {
    obj.as_name().ok()
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    doc.dereference(obj).map(|(_, o)| o).unwrap_or(obj)
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj).as_dict().ok()
}

fn entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get_deref(key, doc).ok()
}

/// Drops the six-letter subset tag, e.g. `ABCDEF+Calibri` → `Calibri`.
fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// `/W` array: `c [w1 w2 …]` or `c_first c_last w`.
fn parse_cid_widths(doc: &Document, w: &[Object]) -> HashMap<u32, f32> {
    let items: Vec<&Object> = w.iter().map(|o| resolve(doc, o)).collect();
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < items.len() {
        let Some(first) = number(items[i]) else {
            i += 1;
            continue;
        };
        let first = first as u32;
        match items.get(i + 1) {
            Some(Object::Array(list)) => {
                for (offset, o) in list.iter().enumerate() {
                    let code = u32::try_from(offset).ok().and_then(|o| first.checked_add(o));
                    if let (Some(code), Some(v)) = (code, number(resolve(doc, o))) {
                        widths.insert(code, v / 1000.0);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let last = number(last).unwrap_or(first as f32) as u32;
                let v = items.get(i + 2).and_then(|o| number(o)).unwrap_or(1000.0) / 1000.0;
                for code in first..=last.min(first.saturating_add(0xFFFF)) {
                    widths.insert(code, v);
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}

/// Fonts available to a page keyed by resource name (`F1`, `TT0`, …).
pub(crate) fn page_fonts(doc: &Document, page_id: ObjectId) -> HashMap<Vec<u8>, FontInfo> {
    doc.get_page_fonts(page_id)
        .map(|fonts| {
            fonts
                .into_iter()
                .map(|(key, dict)| (key, FontInfo::load(doc, dict)))
                .collect::<HashMap<_, _>>()
        })
        .unwrap_or_default()
}

/// Fonts declared in a resource dictionary, e.g. a form XObject's own.
pub(crate) fn resource_fonts(doc: &Document, resources: &Dictionary) -> HashMap<Vec<u8>, FontInfo> {
    let Ok(fonts) = doc.get_dict_in_dict(resources, b"Font") else {
        return HashMap::new();
    };
    fonts
        .iter()
        .filter_map(|(key, obj)| {
            let dict = resolve_dict(doc, obj)?;
            Some((key.clone(), FontInfo::load(doc, dict)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_style_from_name() {
        let s = StyleFlags::from_name("Arial-BoldItalicMT");
        assert!(s.is_bold() && s.is_italic());
        assert!(!s.is_serif());
        assert!(StyleFlags::from_name("TimesNewRomanPSMT").is_serif());
        assert!(!StyleFlags::from_name("OpenSans-Regular").is_serif());
        assert!(StyleFlags::from_name("SourceCodePro").is_monospace());
    }

    #[test]
    fn test_style_from_descriptor_flags() {
        let s = StyleFlags::from_descriptor(1 | (1 << 6));
        assert!(s.is_monospace() && s.is_italic());
        assert!(!s.is_bold());
    }

    #[test]
    fn test_strip_subset_prefix() {
        assert_eq!(strip_subset_prefix("ABCDEF+Calibri"), "Calibri");
        assert_eq!(strip_subset_prefix("Calibri"), "Calibri");
        assert_eq!(strip_subset_prefix("abc+Calibri"), "abc+Calibri");
    }

    #[test]
    fn test_simple_font_widths_and_fallback() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "XYZABC+Calibri",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(579), Object::Integer(544)],
        };
        let info = FontInfo::load(&doc, &font);
        assert_eq!(info.base_font, "Calibri");
        assert_eq!(info.code_len, 1);
        assert!((info.width(65, "A") - 0.579).abs() < 1e-6);
        assert!((info.width(66, "B") - 0.544).abs() < 1e-6);
        // outside the array: Helvetica table
        assert!((info.width(67, "C") - 0.722).abs() < 1e-6);
        assert_eq!(info.decode(65), "A");
    }

    #[test]
    fn test_cid_width_array_forms() {
        let doc = Document::with_version("1.5");
        let w = vec![
            Object::Integer(3),
            Object::Array(vec![Object::Integer(250), Object::Integer(500)]),
            Object::Integer(10),
            Object::Integer(12),
            Object::Integer(600),
        ];
        let widths = parse_cid_widths(&doc, &w);
        assert_eq!(widths.get(&3), Some(&0.25));
        assert_eq!(widths.get(&4), Some(&0.5));
        assert_eq!(widths.get(&11), Some(&0.6));
        assert_eq!(widths.get(&13), None);
    }

    #[test]
    fn test_cid_width_run_past_code_space_stops() {
        let doc = Document::with_version("1.5");
        let w = vec![
            Object::Integer(u32::MAX as i64),
            Object::Array(vec![Object::Integer(500), Object::Integer(600)]),
        ];
        let widths = parse_cid_widths(&doc, &w);
        assert_eq!(widths.len(), 1);
        assert_eq!(widths.get(&u32::MAX), Some(&0.5));
    }

    #[test]
    fn test_named_encoding_drives_decoding() {
        let doc = Document::with_version("1.5");
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "MacRomanEncoding",
        };
        let info = FontInfo::load(&doc, &font);
        assert_eq!(info.decode(0x8E), "é");
        // WinAnsi when no encoding is named
        assert_eq!(FontInfo::fallback().decode(0xE9), "é");
    }

    #[test]
    fn test_two_byte_codes() {
        let mut info = FontInfo::fallback();
        info.code_len = 2;
        assert_eq!(info.codes(&[0x00, 0x4A, 0x00, 0x61]), vec![0x4A, 0x61]);
        assert_eq!(info.decode(0x4A), "J");
    }
}
