// 画像データ（base64）のデコードと画像XObjectの生成

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ColorType, DynamicImage, ImageFormat};
use lopdf::{Object, ObjectId, Stream, dictionary};

use crate::error::TransformError;
use crate::pdf::document::PdfDocument;
use crate::pdf::optimizer::deflate;

/// 埋め込み済みの画像XObject。
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedImage {
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
}

impl EmbeddedImage {
    /// 元画像の (幅, 高さ)。アスペクト比計算に使う。
    pub fn natural_size(&self) -> (f64, f64) {
        (self.width as f64, self.height as f64)
    }
}

/// base64文字列（`data:` URL形式も可）をバイト列にデコードする。
pub fn decode_base64(data: &str) -> crate::error::Result<Vec<u8>> {
    let payload = match data.split_once(',') {
        Some((header, rest)) if header.starts_with("data:") => rest,
        _ => data,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(TransformError::validation("image data is empty"));
    }
    Ok(STANDARD.decode(compact)?)
}

/// 画像バイト列をドキュメントに画像XObjectとして追加する。
///
/// JPEGはDCTDecodeのまま埋め込む。それ以外はRGBに変換してFlateDecodeし、
/// 透過があればSMaskを付ける。
pub fn embed_image(doc: &mut PdfDocument, bytes: &[u8]) -> crate::error::Result<EmbeddedImage> {
    let format = image::guess_format(bytes)
        .map_err(|e| TransformError::image(format!("unrecognized image data: {e}")))?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;
    let (width, height) = (decoded.width(), decoded.height());
    if width == 0 || height == 0 {
        return Err(TransformError::image("image has zero size"));
    }

    let stream = if format == ImageFormat::Jpeg {
        jpeg_xobject(bytes, &decoded)
    } else {
        flate_xobject(doc, &decoded)?
    };
    let id = doc.add_object(stream);
    Ok(EmbeddedImage { id, width, height })
}

fn jpeg_xobject(bytes: &[u8], decoded: &DynamicImage) -> Stream {
    let color_space = match decoded.color() {
        ColorType::L8 | ColorType::L16 => "DeviceGray",
        _ => "DeviceRGB",
    };
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => decoded.width() as i64,
            "Height" => decoded.height() as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        bytes.to_vec(),
    )
}

fn flate_xobject(doc: &mut PdfDocument, decoded: &DynamicImage) -> crate::error::Result<Stream> {
    let (width, height) = (decoded.width() as i64, decoded.height() as i64);
    let rgba = decoded.to_rgba8();
    let has_alpha = rgba.pixels().any(|p| p.0[3] < u8::MAX);

    let rgb: Vec<u8> = rgba.pixels().flat_map(|p| [p.0[0], p.0[1], p.0[2]]).collect();
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };

    if has_alpha {
        let alpha: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
        let mask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            deflate(&alpha)?,
        );
        let mask_id = doc.add_object(mask);
        dict.set("SMask", Object::Reference(mask_id));
    }

    Ok(Stream::new(dict, deflate(&rgb)?))
}
