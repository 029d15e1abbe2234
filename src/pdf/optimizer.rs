// 保存前の後処理: FlateDecode圧縮、孤立オブジェクト除去

use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document, Object, ObjectId};

/// バイト列をzlib(FlateDecode)で圧縮する。
pub fn deflate(data: &[u8]) -> crate::error::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// ドキュメント内の未圧縮ストリームにFlateDecode圧縮を適用する。
///
/// 既にフィルターが設定されているストリームはスキップする（二重圧縮防止）。
/// 戻り値は圧縮したストリーム数。
pub fn compress_streams(doc: &mut Document) -> usize {
    let ids: Vec<ObjectId> = doc.objects.keys().copied().collect();
    let mut compressed_count = 0;

    for id in ids {
        let needs_compression = {
            let Some(Object::Stream(stream)) = doc.objects.get(&id) else {
                continue;
            };
            stream.dict.get(b"Filter").is_err() && !stream.content.is_empty()
        };

        if needs_compression {
            let Some(Object::Stream(stream)) = doc.objects.get_mut(&id) else {
                continue;
            };
            let Ok(compressed) = deflate(&stream.content) else {
                continue;
            };

            stream.dict.set("Filter", "FlateDecode");
            stream.set_content(compressed);
            compressed_count += 1;
        }
    }

    compressed_count
}

/// 孤立オブジェクト（どこからも参照されていないオブジェクト）を除去する。
pub fn delete_unused_objects(doc: &mut Document) -> usize {
    doc.prune_objects().len()
}

/// 保存前の最適化を順序通りに実行する。
///
/// 1. 未圧縮ストリームを圧縮
/// 2. 孤立オブジェクトを除去
///
/// 暗号化されたままのドキュメントではストリームが暗号文なので何もしない。
pub fn optimize(doc: &mut Document) {
    if doc.is_encrypted() {
        return;
    }
    let compressed = compress_streams(doc);
    let pruned = delete_unused_objects(doc);
    tracing::debug!(compressed, pruned, "optimized document before save");
}
