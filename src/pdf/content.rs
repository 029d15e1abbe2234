// オーバーレイ用コンテンツストリームの組み立て（矩形・線・テキスト・画像）

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};

use crate::geometry::{Rect, Rgb};

/// 6要素アフィン変換行列 [a, b, c, d, e, f]
/// PDF仕様: [ a b 0 ]
///          [ c d 0 ]
///          [ e f 1 ]
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix {
    /// 単位行列を返す。
    pub fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            e: x,
            f: y,
            ..Self::identity()
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::identity()
        }
    }

    /// 反時計回りの回転（度）。
    pub fn rotate(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// self * other (行列の右乗算)
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// 点 (x, y) を変換する。
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn operands(&self) -> Vec<Object> {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .into_iter()
            .map(real)
            .collect()
    }
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// Bezier control-point factor for approximating a quarter ellipse.
const KAPPA: f64 = 0.552_284_8;

/// Accumulates content stream operations for one overlay.
///
/// Every builder output is wrapped in `q`/`Q`, so overlays never leak graphics
/// state into content drawn after them.
#[derive(Debug, Default)]
pub struct ContentBuilder {
    ops: Vec<Operation>,
}

impl ContentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn push(&mut self, operator: &str, operands: Vec<Object>) -> &mut Self {
        self.ops.push(Operation::new(operator, operands));
        self
    }

    pub fn save(&mut self) -> &mut Self {
        self.push("q", vec![])
    }

    pub fn restore(&mut self) -> &mut Self {
        self.push("Q", vec![])
    }

    pub fn transform(&mut self, m: &Matrix) -> &mut Self {
        self.push("cm", m.operands())
    }

    pub fn graphics_state(&mut self, name: &str) -> &mut Self {
        self.push("gs", vec![Object::Name(name.as_bytes().to_vec())])
    }

    pub fn fill_color(&mut self, color: Rgb) -> &mut Self {
        self.push(
            "rg",
            vec![real(color.r as f64), real(color.g as f64), real(color.b as f64)],
        )
    }

    pub fn stroke_color(&mut self, color: Rgb) -> &mut Self {
        self.push(
            "RG",
            vec![real(color.r as f64), real(color.g as f64), real(color.b as f64)],
        )
    }

    pub fn line_width(&mut self, width: f64) -> &mut Self {
        self.push("w", vec![real(width)])
    }

    /// 破線パターンを設定する。空配列で実線。
    pub fn dash(&mut self, pattern: &[f64]) -> &mut Self {
        let array = pattern.iter().copied().map(real).collect();
        self.push("d", vec![Object::Array(array), Object::Integer(0)])
    }

    pub fn rect(&mut self, r: &Rect) -> &mut Self {
        self.push(
            "re",
            vec![real(r.x), real(r.y), real(r.width), real(r.height)],
        )
    }

    pub fn fill(&mut self) -> &mut Self {
        self.push("f", vec![])
    }

    pub fn stroke(&mut self) -> &mut Self {
        self.push("S", vec![])
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.push("m", vec![real(x), real(y)])
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.push("l", vec![real(x), real(y)])
    }

    fn curve_to(&mut self, pts: [f64; 6]) -> &mut Self {
        self.push("c", pts.into_iter().map(real).collect())
    }

    pub fn close_path(&mut self) -> &mut Self {
        self.push("h", vec![])
    }

    /// 塗りつぶし矩形。
    pub fn fill_rect(&mut self, r: &Rect, color: Rgb) -> &mut Self {
        self.save().fill_color(color).rect(r).fill().restore()
    }

    /// 枠線のみの矩形。
    pub fn stroke_rect(&mut self, r: &Rect, color: Rgb, width: f64) -> &mut Self {
        self.save()
            .stroke_color(color)
            .line_width(width)
            .rect(r)
            .stroke()
            .restore()
    }

    /// 矩形に内接する楕円のパスを追加する（描画は呼び出し側で `S`/`f`）。
    pub fn ellipse(&mut self, r: &Rect) -> &mut Self {
        let rx = r.width / 2.0;
        let ry = r.height / 2.0;
        let cx = r.x + rx;
        let cy = r.y + ry;
        let ox = rx * KAPPA;
        let oy = ry * KAPPA;
        self.move_to(cx + rx, cy)
            .curve_to([cx + rx, cy + oy, cx + ox, cy + ry, cx, cy + ry])
            .curve_to([cx - ox, cy + ry, cx - rx, cy + oy, cx - rx, cy])
            .curve_to([cx - rx, cy - oy, cx - ox, cy - ry, cx, cy - ry])
            .curve_to([cx + ox, cy - ry, cx + rx, cy - oy, cx + rx, cy])
            .close_path()
    }

    /// テキストを1行描画する。`matrix` はテキスト行列（原点 = ベースライン左端）。
    pub fn text(
        &mut self,
        font_resource: &str,
        size: f64,
        matrix: &Matrix,
        encoded: Vec<u8>,
    ) -> &mut Self {
        self.push("BT", vec![])
            .push(
                "Tf",
                vec![Object::Name(font_resource.as_bytes().to_vec()), real(size)],
            )
            .push("Tm", matrix.operands())
            .push("Tj", vec![Object::String(encoded, StringFormat::Literal)])
            .push("ET", vec![])
    }

    /// 画像XObjectを矩形に描画する。
    pub fn image(&mut self, xobject_name: &str, r: &Rect) -> &mut Self {
        let placement = Matrix::scale(r.width, r.height).multiply(&Matrix::translate(r.x, r.y));
        self.save()
            .transform(&placement)
            .push("Do", vec![Object::Name(xobject_name.as_bytes().to_vec())])
            .restore()
    }

    /// Encode the accumulated operations, wrapped in a `q`/`Q` pair.
    pub fn encode(self) -> crate::error::Result<Vec<u8>> {
        let mut operations = Vec::with_capacity(self.ops.len() + 2);
        operations.push(Operation::new("q", vec![]));
        operations.extend(self.ops);
        operations.push(Operation::new("Q", vec![]));
        Content { operations }
            .encode()
            .map_err(|e| crate::error::TransformError::pdf_write(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_then_translation() {
        let m = Matrix::rotate(90.0).multiply(&Matrix::translate(10.0, 20.0));
        let (x, y) = m.apply(1.0, 0.0);
        assert!((x - 10.0).abs() < 1e-9);
        assert!((y - 21.0).abs() < 1e-9);
    }

    #[test]
    fn encode_wraps_in_save_restore() {
        let mut b = ContentBuilder::new();
        b.fill_rect(&Rect::new(1.0, 2.0, 3.0, 4.0), Rgb::BLACK);
        let bytes = b.encode().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.trim_start().starts_with('q'));
        assert!(text.trim_end().ends_with('Q'));
        assert!(text.contains("re"));
    }

    #[test]
    fn image_placement_scales_unit_square() {
        let mut b = ContentBuilder::new();
        b.image("Img1", &Rect::new(10.0, 20.0, 100.0, 50.0));
        let content = Content::decode(&b.encode().unwrap()).unwrap();
        let cm = content
            .operations
            .iter()
            .find(|op| op.operator == "cm")
            .expect("cm operator");
        let vals: Vec<f32> = cm.operands.iter().map(|o| o.as_float().unwrap()).collect();
        assert_eq!(vals, vec![100.0, 0.0, 0.0, 50.0, 10.0, 20.0]);
    }
}
