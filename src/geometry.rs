// 色文字列・9点アンカー・用紙サイズ・座標変換のヘルパー

use serde::Deserialize;

use crate::error::TransformError;

/// RGB色（各成分 0.0〜1.0）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
    pub const GRAY: Rgb = Rgb {
        r: 0.5,
        g: 0.5,
        b: 0.5,
    };
    pub const YELLOW: Rgb = Rgb {
        r: 1.0,
        g: 0.92,
        b: 0.23,
    };

    fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Rgb {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }
}

/// 色文字列をRGBに変換する。
///
/// 対応形式: `#RRGGBB`, `#RGB`, `rgb(r, g, b)`, 基本色名（`black`, `red` など）。
pub fn parse_color(s: &str) -> crate::error::Result<Rgb> {
    let trimmed = s.trim();
    let lower = trimmed.to_ascii_lowercase();

    if let Some(hex) = lower.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| invalid_color(trimmed));
    }

    if let Some(inner) = lower
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(invalid_color(trimmed));
        }
        let mut channels = [0u8; 3];
        for (slot, part) in channels.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid_color(trimmed))?;
        }
        return Ok(Rgb::from_bytes(channels[0], channels[1], channels[2]));
    }

    let named = match lower.as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "gray" | "grey" => (128, 128, 128),
        "lightgray" | "lightgrey" => (211, 211, 211),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        _ => {
            // 先頭の#が省略された16進表記も受け付ける
            return parse_hex(&lower).ok_or_else(|| invalid_color(trimmed));
        }
    };
    Ok(Rgb::from_bytes(named.0, named.1, named.2))
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some(Rgb::from_bytes(
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        3 => {
            let expand = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
            Some(Rgb::from_bytes(expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}

fn invalid_color(s: &str) -> TransformError {
    TransformError::validation(format!("invalid color '{s}'"))
}

/// 矩形（PDF座標系: 左下原点、単位pt）。
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }
}

/// 上下左右のマージン（pt）。
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// 9点アンカー。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    #[serde(alias = "middle-left")]
    CenterLeft,
    #[default]
    #[serde(alias = "middle", alias = "middle-center")]
    Center,
    #[serde(alias = "middle-right")]
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Clone, Copy)]
enum Horizontal {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy)]
enum Vertical {
    Top,
    Middle,
    Bottom,
}

impl Anchor {
    fn axes(self) -> (Horizontal, Vertical) {
        match self {
            Anchor::TopLeft => (Horizontal::Left, Vertical::Top),
            Anchor::TopCenter => (Horizontal::Center, Vertical::Top),
            Anchor::TopRight => (Horizontal::Right, Vertical::Top),
            Anchor::CenterLeft => (Horizontal::Left, Vertical::Middle),
            Anchor::Center => (Horizontal::Center, Vertical::Middle),
            Anchor::CenterRight => (Horizontal::Right, Vertical::Middle),
            Anchor::BottomLeft => (Horizontal::Left, Vertical::Bottom),
            Anchor::BottomCenter => (Horizontal::Center, Vertical::Bottom),
            Anchor::BottomRight => (Horizontal::Right, Vertical::Bottom),
        }
    }

    /// アンカーを要素の左下座標に解決する。
    ///
    /// `area` はページの可視領域（CropBox）。要素の幅・高さを考慮して
    /// `*-center` は中央揃え、`*-right` は右端揃えになる。
    pub fn resolve(self, area: &Rect, element_width: f64, element_height: f64, margin: f64) -> (f64, f64) {
        let (h, v) = self.axes();
        let x = match h {
            Horizontal::Left => area.x + margin,
            Horizontal::Center => area.x + (area.width - element_width) / 2.0,
            Horizontal::Right => area.right() - element_width - margin,
        };
        let y = match v {
            Vertical::Top => area.top() - element_height - margin,
            Vertical::Middle => area.y + (area.height - element_height) / 2.0,
            Vertical::Bottom => area.y + margin,
        };
        (x, y)
    }
}

/// 用紙サイズのプリセット。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagePreset {
    #[serde(alias = "A3")]
    A3,
    #[serde(alias = "A4")]
    A4,
    #[serde(alias = "A5")]
    A5,
    #[serde(alias = "Letter")]
    Letter,
    #[serde(alias = "Legal")]
    Legal,
    #[serde(alias = "Tabloid")]
    Tabloid,
    #[serde(alias = "Square")]
    Square,
}

impl PagePreset {
    /// (幅, 高さ) をptで返す。`Square` はレター幅の正方形。
    pub fn dimensions(self) -> (f64, f64) {
        match self {
            PagePreset::A3 => (841.89, 1190.55),
            PagePreset::A4 => (595.28, 841.89),
            PagePreset::A5 => (419.53, 595.28),
            PagePreset::Letter => (612.0, 792.0),
            PagePreset::Legal => (612.0, 1008.0),
            PagePreset::Tabloid => (792.0, 1224.0),
            PagePreset::Square => (612.0, 612.0),
        }
    }
}

/// UI座標（左上原点）のy値をPDF座標（左下原点）に変換する。
pub fn ui_to_pdf_y(page_height: f64, y_ui: f64, element_height: f64) -> f64 {
    page_height - y_ui - element_height
}

/// 画像などの描画サイズを決める。
///
/// 幅・高さの片方だけ指定された場合はアスペクト比を保ってもう一方を算出する。
/// どちらも未指定なら、ページ領域の80%に収まるよう縮小する（拡大はしない）。
pub fn fit_size(
    natural: (f64, f64),
    width: Option<f64>,
    height: Option<f64>,
    area: (f64, f64),
) -> (f64, f64) {
    let (nw, nh) = natural;
    if nw <= 0.0 || nh <= 0.0 {
        return (width.unwrap_or(0.0), height.unwrap_or(0.0));
    }
    let ratio = nh / nw;
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, w * ratio),
        (None, Some(h)) => (h / ratio, h),
        (None, None) => {
            let max_w = area.0 * 0.8;
            let max_h = area.1 * 0.8;
            let scale = (max_w / nw).min(max_h / nh).min(1.0);
            (nw * scale, nh * scale)
        }
    }
}
