//! Byte ↔ text mapping for PDF strings: `/ToUnicode` CMaps, and lopdf's
//! one-byte base encodings for simple fonts.

use std::collections::HashMap;
use std::sync::OnceLock;

use lopdf::{dictionary, Dictionary, Document, Encoding};

/// Base encodings lopdf maps to a one-byte code table.
const ONE_BYTE_ENCODINGS: [&str; 5] = [
    "StandardEncoding",
    "MacRomanEncoding",
    "MacExpertEncoding",
    "WinAnsiEncoding",
    "PDFDocEncoding",
];

fn win_ansi_font() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Text of every single-byte code under `encoding`; unassigned codes are empty.
fn byte_table(encoding: &Encoding) -> Vec<String> {
    (0..=255u8)
        .map(|b| Document::decode_text(encoding, &[b]).unwrap_or_default())
        .collect()
}

/// Code table of a simple font whose `/Encoding` names a one-byte base
/// encoding. `None` for `/Differences` dictionaries and missing entries.
pub(crate) fn base_encoding_table(doc: &Document, font: &Dictionary) -> Option<Vec<String>> {
    let encoding = font.get(b"Encoding").and_then(|o| o.as_name_str()).ok()?;
    if !font.type_is(b"Font") || !ONE_BYTE_ENCODINGS.contains(&encoding) {
        return None;
    }
    let encoding = font.get_font_encoding(doc).ok()?;
    Some(byte_table(&encoding))
}

/// WinAnsi code table, the default for simple fonts.
pub(crate) fn win_ansi_table() -> &'static [String] {
    static TABLE: OnceLock<Vec<String>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let doc = Document::new();
        base_encoding_table(&doc, &win_ansi_font()).unwrap_or_default()
    })
}

/// Encodes text for a simple font with `/WinAnsiEncoding`; unmappable
/// characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let doc = Document::new();
    let font = win_ansi_font();
    let Ok(encoding) = font.get_font_encoding(&doc) else {
        return text.chars().map(|c| if c.is_ascii() { c as u8 } else { b'?' }).collect();
    };
    let mut buf = [0u8; 4];
    text.chars()
        .flat_map(|c| {
            let bytes = Document::encode_text(&encoding, c.encode_utf8(&mut buf));
            if bytes.is_empty() {
                vec![b'?']
            } else {
                bytes
            }
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// ToUnicode CMap
// ────────────────────────────────────────────────────────────────────────────

/// Parsed `/ToUnicode` CMap: character code → Unicode text.
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeMap {
    map: HashMap<u32, String>,
    /// Byte width of codes, from the first codespace range when one is declared.
    pub code_len: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Word(String),
}

impl ToUnicodeMap {
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut cmap = ToUnicodeMap::default();
        let mut i = 0;

        while i < tokens.len() {
            match &tokens[i] {
                Token::Word(w) if w == "begincodespacerange" => {
                    if let Some(Token::Hex(lo)) = tokens.get(i + 1) {
                        cmap.code_len.get_or_insert(lo.len().max(1));
                    }
                    i = skip_to(&tokens, i, "endcodespacerange");
                }
                Token::Word(w) if w == "beginbfchar" => {
                    i += 1;
                    while let (Some(Token::Hex(src)), Some(Token::Hex(dst))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        cmap.map.insert(code_of(src), utf16_text(dst));
                        i += 2;
                    }
                }
                Token::Word(w) if w == "beginbfrange" => {
                    i += 1;
                    while let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        let (lo, hi) = (code_of(lo), code_of(hi));
                        match tokens.get(i + 2) {
                            Some(Token::Hex(dst)) => {
                                cmap.insert_range(lo, hi, dst);
                                i += 3;
                            }
                            Some(Token::ArrayStart) => {
                                let mut j = i + 3;
                                let mut code = lo;
                                while let Some(Token::Hex(dst)) = tokens.get(j) {
                                    if code <= hi {
                                        cmap.map.insert(code, utf16_text(dst));
                                    }
                                    code += 1;
                                    j += 1;
                                }
                                // skip the closing bracket
                                i = j + 1;
                            }
                            _ => break,
                        }
                    }
                }
                _ => i += 1,
            }
        }
        cmap
    }

    /// Consecutive codes map to consecutive values of the destination's last
    /// UTF-16 unit.
    fn insert_range(&mut self, lo: u32, hi: u32, dst: &[u8]) {
        // malformed ranges can span the whole code space
        let hi = hi.min(lo.saturating_add(0xFFFF));
        let base = utf16_units(dst);
        for (offset, code) in (lo..=hi).enumerate() {
            let mut units = base.clone();
            if let Some(last) = units.last_mut() {
                *last = last.wrapping_add(offset as u16);
            }
            self.map.insert(code, String::from_utf16_lossy(&units));
        }
    }

    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn skip_to(tokens: &[Token], from: usize, word: &str) -> usize {
    tokens[from..]
        .iter()
        .position(|t| matches!(t, Token::Word(w) if w == word))
        .map(|p| from + p + 1)
        .unwrap_or(tokens.len())
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32)
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => *single as u16,
            _ => 0,
        })
        .collect()
}

fn utf16_text(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        match b {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let end = data[i..]
                    .iter()
                    .position(|&c| c == b'>')
                    .map(|p| i + p)
                    .unwrap_or(data.len());
                tokens.push(Token::Hex(hex_bytes(&data[i + 1..end])));
                i = end + 1;
            }
            b'[' => {
                tokens.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayEnd);
                i += 1;
            }
            b'(' => {
                // literal strings only appear in the CMap header; skip them
                let mut depth = 0;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            c if c.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !b"<>[]()%/".contains(&data[i])
                {
                    i += 1;
                }
                if i == start {
                    // lone delimiter such as '/'
                    i += 1;
                } else {
                    tokens.push(Token::Word(String::from_utf8_lossy(&data[start..i]).into_owned()));
                }
            }
        }
    }
    tokens
}

fn hex_bytes(hex: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = hex
        .iter()
        .filter_map(|c| (*c as char).to_digit(16).map(|d| d as u8))
        .collect();
    digits
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => (hi << 4) | lo,
            [hi] => hi << 4,
            _ => 0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0011> <004A>
endbfchar
2 beginbfrange
<0044> <0046> <0061>
<0050> <0051> [<0066006C> <00E9>]
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end";

    #[test]
    fn test_parses_bfchar_and_bfrange() {
        let cmap = ToUnicodeMap::parse(CMAP);
        assert_eq!(cmap.code_len, Some(2));
        assert_eq!(cmap.get(0x03), Some(" "));
        assert_eq!(cmap.get(0x11), Some("J"));
        assert_eq!(cmap.get(0x44), Some("a"));
        assert_eq!(cmap.get(0x46), Some("c"));
        assert_eq!(cmap.get(0x50), Some("fl"));
        assert_eq!(cmap.get(0x51), Some("é"));
        assert_eq!(cmap.get(0x47), None);
    }

    #[test]
    fn test_empty_input_is_empty_map() {
        let cmap = ToUnicodeMap::parse(b"");
        assert!(cmap.is_empty());
        assert_eq!(cmap.code_len, None);
    }

    #[test]
    fn test_win_ansi_table_covers_typographic_quotes() {
        let table = win_ansi_table();
        assert_eq!(table.len(), 256);
        assert_eq!(table[0x92], "’");
        assert_eq!(table[b'J' as usize], "J");
        assert_eq!(encode_win_ansi("’–"), vec![0x92, 0x96]);
    }

    #[test]
    fn test_named_base_encoding_is_loaded() {
        let doc = Document::new();
        let font = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "Encoding" => "MacRomanEncoding",
        };
        let table = base_encoding_table(&doc, &font).unwrap();
        // 0x8E is é in MacRoman
        assert_eq!(table[0x8E], "é");

        let differences = dictionary! {
            "Type" => "Font",
            "Encoding" => dictionary! { "Differences" => Vec::<lopdf::Object>::new() },
        };
        assert!(base_encoding_table(&doc, &differences).is_none());
    }

    #[test]
    fn test_encode_replaces_unmappable() {
        assert_eq!(encode_win_ansi("Go → Rust"), b"Go ? Rust".to_vec());
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
    }
}
