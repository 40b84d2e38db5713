//! Single-byte text encodings used by form fields.
//!
//! Field values (`/V`) are PDF text strings: UTF-16BE with a byte order mark,
//! or PDFDocEncoding (ISO 32000-1:2008, Annex D, Table D.2). Appearance
//! streams show text with the standard Helvetica font under WinAnsiEncoding.

use lopdf::{Object, StringFormat};

/// PDFDocEncoding codes that differ from ISO Latin-1.
const PDFDOC_SPECIAL: [(u8, char); 40] = [
    (0x18, '\u{02D8}'), // breve
    (0x19, '\u{02C7}'), // caron
    (0x1A, '\u{02C6}'), // circumflex
    (0x1B, '\u{02D9}'), // dotaccent
    (0x1C, '\u{02DD}'), // hungarumlaut
    (0x1D, '\u{02DB}'), // ogonek
    (0x1E, '\u{02DA}'), // ring
    (0x1F, '\u{02DC}'), // tilde
    (0x80, '\u{2022}'), // bullet
    (0x81, '\u{2020}'), // dagger
    (0x82, '\u{2021}'), // daggerdbl
    (0x83, '\u{2026}'), // ellipsis
    (0x84, '\u{2014}'), // emdash
    (0x85, '\u{2013}'), // endash
    (0x86, '\u{0192}'), // florin
    (0x87, '\u{2044}'), // fraction
    (0x88, '\u{2039}'), // guilsinglleft
    (0x89, '\u{203A}'), // guilsinglright
    (0x8A, '\u{2212}'), // minus
    (0x8B, '\u{2030}'), // perthousand
    (0x8C, '\u{201E}'), // quotedblbase
    (0x8D, '\u{201C}'), // quotedblleft
    (0x8E, '\u{201D}'), // quotedblright
    (0x8F, '\u{2018}'), // quoteleft
    (0x90, '\u{2019}'), // quoteright
    (0x91, '\u{201A}'), // quotesinglbase
    (0x92, '\u{2122}'), // trademark
    (0x93, '\u{FB01}'), // fi
    (0x94, '\u{FB02}'), // fl
    (0x95, '\u{0141}'), // Lslash
    (0x96, '\u{0152}'), // OE
    (0x97, '\u{0160}'), // Scaron
    (0x98, '\u{0178}'), // Ydieresis
    (0x99, '\u{017D}'), // Zcaron
    (0x9A, '\u{0131}'), // dotlessi
    (0x9B, '\u{0142}'), // lslash
    (0x9C, '\u{0153}'), // oe
    (0x9D, '\u{0161}'), // scaron
    (0x9E, '\u{017E}'), // zcaron
    (0xA0, '\u{20AC}'), // Euro
];

/// Character for a PDFDocEncoding code, `None` for undefined codes.
pub fn pdfdoc_to_char(code: u8) -> Option<char> {
    match code {
        0x7F | 0x9F | 0xAD => None,
        0x18..=0x1F | 0x80..=0xA0 => PDFDOC_SPECIAL
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, ch)| *ch),
        _ => Some(code as char),
    }
}

/// PDFDocEncoding code for `ch`, if the encoding has one.
pub fn char_to_pdfdoc(ch: char) -> Option<u8> {
    let code = ch as u32;
    match code {
        0x00..=0x17 | 0x20..=0x7E => Some(code as u8),
        0xA1..=0xFF if code != 0xAD => Some(code as u8),
        _ => PDFDOC_SPECIAL
            .iter()
            .find(|(_, c)| *c == ch)
            .map(|(code, _)| *code),
    }
}

/// WinAnsiEncoding code for `ch`.
///
/// Identical to Latin-1 apart from 0x80..=0x9F.
pub fn char_to_winansi(ch: char) -> Option<u8> {
    let codepoint = ch as u32;
    if codepoint < 0x80 || (0xA0..=0xFF).contains(&codepoint) {
        return Some(codepoint as u8);
    }

    match codepoint {
        0x20AC => Some(0x80), // Euro sign
        0x201A => Some(0x82), // Single low-9 quotation mark
        0x0192 => Some(0x83), // Latin small letter f with hook
        0x201E => Some(0x84), // Double low-9 quotation mark
        0x2026 => Some(0x85), // Horizontal ellipsis
        0x2020 => Some(0x86), // Dagger
        0x2021 => Some(0x87), // Double dagger
        0x02C6 => Some(0x88), // Modifier letter circumflex accent
        0x2030 => Some(0x89), // Per mille sign
        0x0160 => Some(0x8A), // Latin capital letter S with caron
        0x2039 => Some(0x8B), // Single left-pointing angle quotation mark
        0x0152 => Some(0x8C), // Latin capital ligature OE
        0x017D => Some(0x8E), // Latin capital letter Z with caron
        0x2018 => Some(0x91), // Left single quotation mark
        0x2019 => Some(0x92), // Right single quotation mark
        0x201C => Some(0x93), // Left double quotation mark
        0x201D => Some(0x94), // Right double quotation mark
        0x2022 => Some(0x95), // Bullet
        0x2013 => Some(0x96), // En dash
        0x2014 => Some(0x97), // Em dash
        0x02DC => Some(0x98), // Small tilde
        0x2122 => Some(0x99), // Trade mark sign
        0x0161 => Some(0x9A), // Latin small letter s with caron
        0x203A => Some(0x9B), // Single right-pointing angle quotation mark
        0x0153 => Some(0x9C), // Latin small ligature oe
        0x017E => Some(0x9E), // Latin small letter z with caron
        0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
        _ => None,
    }
}

/// Decode a PDF text string (ISO 32000-1:2008, Section 7.9.2.2).
///
/// UTF-16BE and UTF-8 strings carry a byte order mark; anything else is
/// PDFDocEncoding. Undefined codes become U+FFFD.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(&bytes[3..]).into_owned()
    } else {
        bytes
            .iter()
            .map(|&b| pdfdoc_to_char(b).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

/// Encode a text string.
///
/// PDFDocEncoding when every character has a code (a literal when ASCII,
/// hex otherwise), else UTF-16BE with a byte order mark.
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    if let Some(bytes) = text.chars().map(char_to_pdfdoc).collect::<Option<Vec<u8>>>() {
        return Object::String(bytes, StringFormat::Hexadecimal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
