//! Text widget appearance streams.
//!
//! Filled values only show up in viewers that ignore `NeedAppearances` if the
//! widget carries a normal appearance (`/AP /N`). This module produces the
//! content for that form XObject from the widget size and its `/DA` string.

use super::encoding::char_to_winansi;
use lazy_static::lazy_static;
use regex::Regex;

/// Font resource used when `/DA` names none.
pub const DEFAULT_FONT: &str = "Helv";

const PADDING: f32 = 2.0;
const MIN_AUTO_SIZE: f32 = 4.0;
const MAX_AUTO_SIZE: f32 = 12.0;
const MULTILINE_AUTO_SIZE: f32 = 10.0;
const LEADING: f32 = 1.15;

lazy_static! {
    static ref RE_FONT: Regex = Regex::new(r"/([^\s/\[\]()<>]+)\s+(-?\d+(?:\.\d+)?)\s+Tf").unwrap();
    static ref RE_COLOR: Regex =
        Regex::new(r"((?:-?\d*\.?\d+\s+){1,4})(g|rg|k)(?:\s|$)").unwrap();
}

/// Layout for one text widget appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct TextAppearance {
    /// Widget width in points
    pub width: f32,
    /// Widget height in points
    pub height: f32,
    /// Font resource name without the leading slash
    pub font_name: String,
    /// Font size; 0 means auto
    pub font_size: f32,
    /// Colour operator from `/DA`, e.g. `0 g`
    pub color: String,
    /// Lay text out line by line
    pub multiline: bool,
}

impl TextAppearance {
    /// Build a layout from a widget size and an optional `/DA` string.
    pub fn new(width: f32, height: f32, default_appearance: Option<&str>, multiline: bool) -> Self {
        let (font_name, font_size) = default_appearance
            .and_then(|da| RE_FONT.captures(da))
            .map(|caps| {
                let size = caps[2].parse::<f32>().unwrap_or(0.0);
                (caps[1].to_string(), size)
            })
            .unwrap_or_else(|| (DEFAULT_FONT.to_string(), 0.0));

        let color = default_appearance
            .and_then(|da| RE_COLOR.captures(da))
            .map(|caps| format!("{}{}", &caps[1], &caps[2]))
            .unwrap_or_else(|| "0 g".to_string());

        Self {
            width: width.abs(),
            height: height.abs(),
            font_name,
            font_size,
            color,
            multiline,
        }
    }

    /// Font size actually used, resolving auto size.
    pub fn effective_font_size(&self) -> f32 {
        if self.font_size > 0.0 {
            return self.font_size;
        }
        if self.multiline {
            return MULTILINE_AUTO_SIZE;
        }
        (self.height * 0.7).clamp(MIN_AUTO_SIZE, MAX_AUTO_SIZE)
    }

    /// Content stream bytes for `text`, in WinAnsiEncoding.
    ///
    /// Characters WinAnsi cannot encode render as `?`.
    pub fn content(&self, text: &str) -> Vec<u8> {
        let size = self.effective_font_size();
        let mut stream = String::from("/Tx BMC\nq\n");
        stream.push_str(&format!(
            "{} {} {} {} re W n\n",
            PADDING / 2.0,
            PADDING / 2.0,
            (self.width - PADDING).max(0.0),
            (self.height - PADDING).max(0.0)
        ));

        if !text.is_empty() {
            stream.push_str("BT\n");
            stream.push_str(&format!("/{} {} Tf\n", self.font_name, size));
            stream.push_str(&self.color);
            stream.push('\n');

            if self.multiline {
                let leading = size * LEADING;
                let top = (self.height - PADDING - size).max(0.0);
                stream.push_str(&format!("{} {} Td\n", PADDING, top));
                for (i, line) in text.lines().enumerate() {
                    if i > 0 {
                        stream.push_str(&format!("0 {} Td\n", -leading));
                    }
                    stream.push_str(&format!("({}) Tj\n", escape_pdf_string(line)));
                }
            } else {
                // Center vertically
                let baseline = ((self.height - size) / 2.0 + size * 0.22).max(0.0);
                let single = text.replace(['\r', '\n'], " ");
                stream.push_str(&format!("{} {} Td\n", PADDING, baseline));
                stream.push_str(&format!("({}) Tj\n", escape_pdf_string(&single)));
            }
            stream.push_str("ET\n");
        }
        stream.push_str("Q\nEMC\n");

        stream
            .chars()
            .map(|c| char_to_winansi(c).unwrap_or(b'?'))
            .collect()
    }
}

/// Escape special characters for a PDF literal string.
fn escape_pdf_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '(' => result.push_str("\\("),
            ')' => result.push_str("\\)"),
            '\r' => result.push_str("\\r"),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}
