// 標準14フォント（Helvetica系）の文字幅計測とWinAnsiエンコード

use lopdf::{Dictionary, dictionary};

/// Helvetica advance widths for codes 32..=126, in 1/1000 text space units.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // 'a'..'m'
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // 'n'..'z'
    389, 280, 389, 584, // '{'..'~'
];

const DEFAULT_WIDTH: u16 = 556;
const ASCENT: f64 = 718.0;
const DESCENT: f64 = 207.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// ページResourcesの /Font に登録する名前。
    pub fn resource_name(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "TfHelv",
            StandardFont::HelveticaBold => "TfHelvB",
        }
    }

    pub fn font_dictionary(self) -> Dictionary {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font(),
            "Encoding" => "WinAnsiEncoding",
        }
    }

    fn char_width(self, byte: u8) -> u16 {
        let table = match self {
            StandardFont::Helvetica => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        match byte {
            32..=126 => table[(byte - 32) as usize],
            _ => DEFAULT_WIDTH,
        }
    }

    /// 指定サイズでのテキスト幅（pt）。
    pub fn text_width(self, text: &str, size: f64) -> f64 {
        let units: u32 = encode_win_ansi(text)
            .iter()
            .map(|&b| self.char_width(b) as u32)
            .sum();
        units as f64 * size / 1000.0
    }

    /// 指定サイズでのテキスト高さ（ascent + descent, pt）。
    pub fn text_height(self, size: f64) -> f64 {
        (ASCENT + DESCENT) * size / 1000.0
    }

    /// ベースラインからグリフ下端までの距離（pt）。
    pub fn descent(self, size: f64) -> f64 {
        DESCENT * size / 1000.0
    }
}

/// UTF-8文字列をWinAnsiEncodingのバイト列に変換する。
/// 表現できない文字は `?` になる。
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '\u{20ac}' => 0x80,
            '\u{201a}' => 0x82,
            '\u{201e}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\t' | '\n' | '\r' => b' ',
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_known_strings() {
        // "Hi" = H(722) + i(222)
        let w = StandardFont::Helvetica.text_width("Hi", 10.0);
        assert!((w - 9.44).abs() < 1e-9);
        let bold = StandardFont::HelveticaBold.text_width("Hi", 10.0);
        assert!(bold > w);
    }

    #[test]
    fn encodes_latin1_and_replaces_others() {
        assert_eq!(encode_win_ansi("Aé€"), vec![b'A', 0xe9, 0x80]);
        assert_eq!(encode_win_ansi("日本"), vec![b'?', b'?']);
    }

    #[test]
    fn height_scales_with_size() {
        assert!((StandardFont::Helvetica.text_height(10.0) - 9.25).abs() < 1e-9);
    }
}
