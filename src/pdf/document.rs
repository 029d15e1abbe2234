// ドキュメントモデル: lopdf Documentをページ単位で変更するためのアダプタ

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, warn};

use crate::error::TransformError;
use crate::geometry::Rect;
use crate::pdf::fonts::StandardFont;
use crate::pdf::optimizer;

/// ページツリーから継承される属性。
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Rotate", b"Resources"];

/// Parent連鎖をたどる上限（循環参照対策）。
const MAX_TREE_DEPTH: usize = 64;

/// MediaBoxが見つからない場合に使うレターサイズ。
const FALLBACK_MEDIA_BOX: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 612.0,
    height: 792.0,
};

/// ページの寸法・回転・CropBox。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageInfo {
    pub width: f64,
    pub height: f64,
    pub rotation: i64,
    pub media_box: Rect,
    pub crop_box: Rect,
}

/// 変更可能なPDFドキュメント。
///
/// 1つの変換リクエストが排他的に所有する。ページ番号は全て0始まり。
#[derive(Clone)]
pub struct PdfDocument {
    doc: Document,
    fonts: HashMap<StandardFont, ObjectId>,
    opacity_states: HashMap<u32, ObjectId>,
    wrapped_pages: HashSet<ObjectId>,
}

impl PdfDocument {
    /// バイト列からドキュメントを読み込む。
    ///
    /// 暗号化されていて復号できない場合も読み込み自体は失敗させない。
    pub fn load(bytes: &[u8]) -> crate::error::Result<Self> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| TransformError::pdf_read(format!("failed to load PDF: {e}")))?;
        Ok(Self::from_document(doc))
    }

    /// ファイルからドキュメントを読み込む（復号済み一時ファイル用）。
    pub fn open(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let doc = Document::load(path).map_err(|e| {
            TransformError::pdf_read(format!("failed to open {}: {e}", path.display()))
        })?;
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: Document) -> Self {
        if doc.is_encrypted() {
            warn!("document is encrypted; loading without decryption");
        }
        debug!(pages = doc.get_pages().len(), "document loaded");
        Self {
            doc,
            fonts: HashMap::new(),
            opacity_states: HashMap::new(),
            wrapped_pages: HashSet::new(),
        }
    }

    /// 内部のlopdf Documentへの参照を返す。
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// ページ数を返す。
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// 文書順のページオブジェクトID。
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    /// 指定ページ(0-indexed)のオブジェクトIDを返す。
    pub fn page_id(&self, index: usize) -> crate::error::Result<ObjectId> {
        let ids = self.page_ids();
        ids.get(index).copied().ok_or_else(|| {
            TransformError::range(format!(
                "page {} out of range (document has {} pages)",
                index + 1,
                ids.len()
            ))
        })
    }

    /// 継承も考慮してページ属性を取得する。
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let mut current = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(obj) = current.get(key) {
                return Some(obj.clone());
            }
            let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
            current = self.doc.get_dictionary(parent_id).ok()?;
        }
        None
    }

    fn rect_attribute(&self, page_id: ObjectId, key: &[u8]) -> crate::error::Result<Option<Rect>> {
        let Some(obj) = self.inherited(page_id, key) else {
            return Ok(None);
        };
        let obj = match obj {
            Object::Reference(id) => self.doc.get_object(id)?.clone(),
            other => other,
        };
        let array = obj.as_array()?;
        if array.len() < 4 {
            return Err(TransformError::pdf_read(format!(
                "invalid {} on page object {:?}",
                String::from_utf8_lossy(key),
                page_id
            )));
        }
        let x0 = to_f64(&array[0])?;
        let y0 = to_f64(&array[1])?;
        let x1 = to_f64(&array[2])?;
        let y1 = to_f64(&array[3])?;
        Ok(Some(Rect::new(
            x0.min(x1),
            y0.min(y1),
            (x1 - x0).abs(),
            (y1 - y0).abs(),
        )))
    }

    /// 指定ページ(0-indexed)の寸法・回転・CropBoxを返す。
    pub fn page_info(&self, index: usize) -> crate::error::Result<PageInfo> {
        let page_id = self.page_id(index)?;
        let media_box = self
            .rect_attribute(page_id, b"MediaBox")?
            .unwrap_or(FALLBACK_MEDIA_BOX);
        let crop_box = self
            .rect_attribute(page_id, b"CropBox")?
            .unwrap_or(media_box);
        let rotation = self
            .inherited(page_id, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0)
            .rem_euclid(360);
        Ok(PageInfo {
            width: media_box.width,
            height: media_box.height,
            rotation,
            media_box,
            crop_box,
        })
    }

    fn page_dict_mut(&mut self, index: usize) -> crate::error::Result<&mut Dictionary> {
        let page_id = self.page_id(index)?;
        Ok(self.doc.get_dictionary_mut(page_id)?)
    }

    /// /Rotate を絶対値で設定する。
    pub fn set_rotation(&mut self, index: usize, degrees: i64) -> crate::error::Result<()> {
        let normalized = degrees.rem_euclid(360);
        self.page_dict_mut(index)?
            .set("Rotate", Object::Integer(normalized));
        Ok(())
    }

    pub fn set_crop_box(&mut self, index: usize, r: Rect) -> crate::error::Result<()> {
        self.page_dict_mut(index)?.set("CropBox", rect_object(&r));
        Ok(())
    }

    /// MediaBoxを設定し、古いCropBoxは取り除く（新しいMediaBox全体が可視になる）。
    pub fn set_media_box(&mut self, index: usize, r: Rect) -> crate::error::Result<()> {
        let page = self.page_dict_mut(index)?;
        page.set("MediaBox", rect_object(&r));
        page.remove(b"CropBox");
        Ok(())
    }

    /// 継承属性をページ辞書自身に書き込む。
    fn materialize_inherited(&mut self, page_id: ObjectId) -> crate::error::Result<()> {
        let mut missing = Vec::new();
        {
            let dict = self.doc.get_dictionary(page_id)?;
            for key in INHERITABLE_KEYS {
                if dict.get(key).is_err() {
                    missing.push(key);
                }
            }
        }
        let mut resolved = Vec::new();
        for key in missing {
            if let Some(value) = self.inherited(page_id, key) {
                resolved.push((key, value));
            } else if key == b"MediaBox" {
                resolved.push((key, rect_object(&FALLBACK_MEDIA_BOX)));
            }
        }
        let dict = self.doc.get_dictionary_mut(page_id)?;
        for (key, value) in resolved {
            dict.set(key.to_vec(), value);
        }
        Ok(())
    }

    fn pages_root_id(&self) -> crate::error::Result<ObjectId> {
        let catalog = self.doc.catalog()?;
        Ok(catalog.get(b"Pages")?.as_reference()?)
    }

    /// ページ列を丸ごと差し替える。
    ///
    /// 新しいKids配列を作り、各ページの継承属性を確定させてから
    /// ルートPagesノードへ一括で付け替える。到達不能になったオブジェクトは除去する。
    fn replace_page_list(&mut self, page_ids: Vec<ObjectId>) -> crate::error::Result<()> {
        if page_ids.is_empty() {
            return Err(TransformError::validation(
                "a document must keep at least one page",
            ));
        }
        let root_id = self.pages_root_id()?;
        for &id in &page_ids {
            self.materialize_inherited(id)?;
        }
        for &id in &page_ids {
            self.doc
                .get_dictionary_mut(id)?
                .set("Parent", Object::Reference(root_id));
        }
        let count = page_ids.len() as i64;
        let kids: Vec<Object> = page_ids.into_iter().map(Object::Reference).collect();
        let root = self.doc.get_dictionary_mut(root_id)?;
        root.set("Kids", Object::Array(kids));
        root.set("Count", Object::Integer(count));
        self.doc.prune_objects();
        self.forget_pruned();
        Ok(())
    }

    /// 除去済みオブジェクトを指すキャッシュを捨てる。
    fn forget_pruned(&mut self) {
        let objects = &self.doc.objects;
        self.fonts.retain(|_, id| objects.contains_key(id));
        self.opacity_states.retain(|_, id| objects.contains_key(id));
        self.wrapped_pages.retain(|id| objects.contains_key(id));
    }

    /// 指定順(0-indexed)でページ列を再構築する。
    ///
    /// 同じページを複数回指定した場合、2回目以降はページ辞書を複製する。
    pub fn rebuild_pages(&mut self, order: &[usize]) -> crate::error::Result<()> {
        let ids = self.page_ids();
        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(order.len());
        for &index in order {
            let source = *ids.get(index).ok_or_else(|| {
                TransformError::range(format!(
                    "page {} out of range (document has {} pages)",
                    index + 1,
                    ids.len()
                ))
            })?;
            if seen.insert(source) {
                selected.push(source);
            } else {
                self.materialize_inherited(source)?;
                let copy = self.doc.get_dictionary(source)?.clone();
                selected.push(self.doc.add_object(Object::Dictionary(copy)));
            }
        }
        debug!(before = ids.len(), after = selected.len(), "rebuilding page list");
        self.replace_page_list(selected)
    }

    /// 白紙ページを `at`(0-indexed, 挿入後の位置) に `count` 枚挿入する。
    pub fn insert_blank_pages(
        &mut self,
        at: usize,
        count: usize,
        size: (f64, f64),
    ) -> crate::error::Result<()> {
        let mut ids = self.page_ids();
        if at > ids.len() {
            return Err(TransformError::range(format!(
                "insert position {} out of range (document has {} pages)",
                at + 1,
                ids.len()
            )));
        }
        let root_id = self.pages_root_id()?;
        let mut blanks = Vec::with_capacity(count);
        for _ in 0..count {
            let content_id = self.doc.add_object(Stream::new(dictionary! {}, Vec::new()));
            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => root_id,
                "MediaBox" => rect_object(&Rect::new(0.0, 0.0, size.0, size.1)),
                "Resources" => dictionary! {},
                "Contents" => content_id,
            });
            blanks.push(page_id);
        }
        ids.splice(at..at, blanks);
        self.replace_page_list(ids)
    }

    /// Page `/Contents` as a flat list of references.
    fn content_refs(&self, page_id: ObjectId) -> crate::error::Result<Vec<Object>> {
        let page = self.doc.get_dictionary(page_id)?;
        let refs = match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id)? {
                Object::Array(items) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        Ok(refs)
    }

    fn add_stream(&mut self, content: Vec<u8>) -> ObjectId {
        self.doc.add_object(Stream::new(dictionary! {}, content))
    }

    /// 既存コンテンツの後ろ（前面）にストリームを追加する。
    ///
    /// 初回は既存コンテンツを q/Q で囲み、元のグラフィックス状態の影響を遮断する。
    pub fn append_content(&mut self, index: usize, content: Vec<u8>) -> crate::error::Result<()> {
        let page_id = self.page_id(index)?;
        let mut refs = self.content_refs(page_id)?;
        if self.wrapped_pages.insert(page_id) && !refs.is_empty() {
            let open = self.add_stream(b"q\n".to_vec());
            let close = self.add_stream(b"\nQ\n".to_vec());
            refs.insert(0, Object::Reference(open));
            refs.push(Object::Reference(close));
        }
        let new_id = self.add_stream(content);
        refs.push(Object::Reference(new_id));
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Contents", Object::Array(refs));
        Ok(())
    }

    /// 既存コンテンツの前（背面）にストリームを追加する。
    pub fn prepend_content(&mut self, index: usize, content: Vec<u8>) -> crate::error::Result<()> {
        let page_id = self.page_id(index)?;
        let mut refs = self.content_refs(page_id)?;
        let new_id = self.add_stream(content);
        refs.insert(0, Object::Reference(new_id));
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Contents", Object::Array(refs));
        Ok(())
    }

    /// 既存コンテンツ全体を `prefix` と `suffix` で挟む（座標変換用）。
    ///
    /// `prefix` は `q` で始まり `suffix` は `Q` で終わること。
    pub fn enclose_content(
        &mut self,
        index: usize,
        prefix: Vec<u8>,
        suffix: Vec<u8>,
    ) -> crate::error::Result<()> {
        let page_id = self.page_id(index)?;
        let mut refs = self.content_refs(page_id)?;
        let open = self.add_stream(prefix);
        let close = self.add_stream(suffix);
        refs.insert(0, Object::Reference(open));
        refs.push(Object::Reference(close));
        self.wrapped_pages.insert(page_id);
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Contents", Object::Array(refs));
        Ok(())
    }

    /// ページResourcesのカテゴリ（Font / XObject / ExtGState）に名前付きで登録する。
    ///
    /// Resources とカテゴリ辞書はインラインでも間接参照でもよい。
    pub fn add_resource(
        &mut self,
        index: usize,
        category: &str,
        name: &str,
        value: Object,
    ) -> crate::error::Result<()> {
        let page_id = self.page_id(index)?;
        self.materialize_inherited(page_id)?;

        let resources_ref = match self.doc.get_dictionary(page_id)?.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            Ok(Object::Dictionary(_)) => None,
            _ => {
                self.doc
                    .get_dictionary_mut(page_id)?
                    .set("Resources", Dictionary::new());
                None
            }
        };

        let category_ref = {
            let resources = match resources_ref {
                Some(id) => self.doc.get_dictionary(id)?,
                None => self
                    .doc
                    .get_dictionary(page_id)?
                    .get(b"Resources")?
                    .as_dict()?,
            };
            match resources.get(category.as_bytes()) {
                Ok(Object::Reference(id)) => Some(*id),
                _ => None,
            }
        };

        if let Some(category_id) = category_ref {
            self.doc.get_dictionary_mut(category_id)?.set(name, value);
            return Ok(());
        }

        let resources = match resources_ref {
            Some(id) => self.doc.get_dictionary_mut(id)?,
            None => self
                .doc
                .get_dictionary_mut(page_id)?
                .get_mut(b"Resources")?
                .as_dict_mut()?,
        };
        if !matches!(resources.get(category.as_bytes()), Ok(Object::Dictionary(_))) {
            resources.set(category, Dictionary::new());
        }
        resources
            .get_mut(category.as_bytes())?
            .as_dict_mut()?
            .set(name, value);
        Ok(())
    }

    /// 標準フォントをページに登録し、リソース名を返す。
    pub fn use_font(&mut self, index: usize, font: StandardFont) -> crate::error::Result<&'static str> {
        let font_id = match self.fonts.get(&font) {
            Some(id) => *id,
            None => {
                let id = self
                    .doc
                    .add_object(Object::Dictionary(font.font_dictionary()));
                self.fonts.insert(font, id);
                id
            }
        };
        self.add_resource(index, "Font", font.resource_name(), Object::Reference(font_id))?;
        Ok(font.resource_name())
    }

    /// 不透明度用のExtGStateをページに登録し、リソース名を返す。
    /// 不透明度1.0では登録せず `None`。
    pub fn use_opacity(&mut self, index: usize, opacity: f64) -> crate::error::Result<Option<String>> {
        let clamped = opacity.clamp(0.0, 1.0);
        if clamped >= 1.0 {
            return Ok(None);
        }
        let key = (clamped * 1000.0).round() as u32;
        let state_id = match self.opacity_states.get(&key) {
            Some(id) => *id,
            None => {
                let id = self.doc.add_object(dictionary! {
                    "Type" => "ExtGState",
                    "ca" => Object::Real(clamped as f32),
                    "CA" => Object::Real(clamped as f32),
                });
                self.opacity_states.insert(key, id);
                id
            }
        };
        let name = format!("TfGs{key}");
        self.add_resource(index, "ExtGState", &name, Object::Reference(state_id))?;
        Ok(Some(name))
    }

    /// XObjectをページに登録する。
    pub fn use_xobject(&mut self, index: usize, name: &str, xobject_id: ObjectId) -> crate::error::Result<()> {
        self.add_resource(index, "XObject", name, Object::Reference(xobject_id))
    }

    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    /// ページに注釈オブジェクトを追加する。
    pub fn add_annotation(&mut self, index: usize, mut annotation: Dictionary) -> crate::error::Result<ObjectId> {
        let page_id = self.page_id(index)?;
        annotation.set("P", Object::Reference(page_id));
        let annot_id = self.doc.add_object(Object::Dictionary(annotation));

        let annots_ref = match self.doc.get_dictionary(page_id)?.get(b"Annots") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
        if let Some(array_id) = annots_ref
            && let Ok(Object::Array(items)) = self.doc.get_object_mut(array_id)
        {
            items.push(Object::Reference(annot_id));
            return Ok(annot_id);
        }

        let page = self.doc.get_dictionary_mut(page_id)?;
        match page.get_mut(b"Annots") {
            Ok(Object::Array(items)) => items.push(Object::Reference(annot_id)),
            _ => page.set("Annots", vec![Object::Reference(annot_id)]),
        }
        Ok(annot_id)
    }

    /// 文書情報辞書（/Info）に値を設定する。
    pub fn set_info(&mut self, entries: Vec<(&str, Object)>) -> crate::error::Result<()> {
        let info_id = match self.doc.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => *id,
            _ => {
                let id = self.doc.add_object(Dictionary::new());
                self.doc.trailer.set("Info", Object::Reference(id));
                id
            }
        };
        let info = self.doc.get_dictionary_mut(info_id)?;
        for (key, value) in entries {
            info.set(key, value);
        }
        Ok(())
    }

    /// /Info の文字列値を取得する。
    pub fn info_string(&self, key: &[u8]) -> Option<String> {
        let info_id = self.doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
        let value = self.doc.get_dictionary(info_id).ok()?.get(key).ok()?;
        match value {
            Object::String(bytes, _) => Some(decode_text_string(bytes)),
            _ => None,
        }
    }

    /// 全ページのテキストをページごとに抽出する。
    pub fn page_texts(&self) -> crate::error::Result<Vec<String>> {
        let numbers: Vec<u32> = self.doc.get_pages().into_keys().collect();
        let mut texts = Vec::with_capacity(numbers.len());
        for number in numbers {
            let text = self.doc.extract_text(&[number]).map_err(|e| {
                TransformError::pdf_read(format!("text extraction failed on page {number}: {e}"))
            })?;
            texts.push(text);
        }
        Ok(texts)
    }

    /// 全文テキストを抽出する（ページ間は空行区切り）。
    pub fn extract_text(&self) -> crate::error::Result<String> {
        Ok(self.page_texts()?.join("\n\n"))
    }

    /// 最適化してバイト列として出力する。
    pub fn to_bytes(&mut self) -> crate::error::Result<Vec<u8>> {
        optimizer::optimize(&mut self.doc);
        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| TransformError::pdf_write(e.to_string()))?;
        Ok(buf)
    }
}

/// MediaBoxなどの数値は整数または実数の可能性がある。
fn to_f64(obj: &Object) -> crate::error::Result<f64> {
    match obj {
        Object::Integer(i) => Ok(*i as f64),
        Object::Real(f) => Ok(*f as f64),
        _ => Err(TransformError::pdf_read(format!(
            "expected numeric value, got {obj:?}"
        ))),
    }
}

fn rect_object(r: &Rect) -> Object {
    Object::Array(vec![
        Object::Real(r.x as f32),
        Object::Real(r.y as f32),
        Object::Real(r.right() as f32),
        Object::Real(r.top() as f32),
    ])
}

/// PDFテキスト文字列（UTF-16BE BOM付き or PDFDocEncoding相当）をデコードする。
fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
