// Pre-save optimization: stream compression and orphan pruning

use lopdf::{Document, Object, Stream, dictionary};

use pdf_transform::pdf::optimizer::{compress_streams, delete_unused_objects, optimize};

/// Helper: one page with an uncompressed content stream, plus one orphan object.
fn create_doc_with_orphan() -> (Document, lopdf::ObjectId, lopdf::ObjectId) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        b"q 1 0 0 rg 10 10 100 100 re f Q\n".repeat(20),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {},
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let orphan_id = doc.add_object(Stream::new(dictionary! {}, b"orphan".to_vec()));
    (doc, content_id, orphan_id)
}

#[test]
fn test_compress_streams() {
    let (mut doc, content_id, _) = create_doc_with_orphan();
    let original = doc.get_object(content_id).unwrap().as_stream().unwrap().content.clone();

    assert_eq!(compress_streams(&mut doc), 2);

    let stream = doc.get_object(content_id).unwrap().as_stream().unwrap();
    assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"FlateDecode");
    assert!(stream.content.len() < original.len());
    assert_eq!(stream.decompressed_content().unwrap(), original);
}

#[test]
fn test_compress_streams_skips_already_compressed() {
    let (mut doc, _, _) = create_doc_with_orphan();
    assert_eq!(compress_streams(&mut doc), 2);
    assert_eq!(compress_streams(&mut doc), 0, "second pass must not double-compress");
}

#[test]
fn test_delete_unused_objects() {
    let (mut doc, content_id, orphan_id) = create_doc_with_orphan();

    assert_eq!(delete_unused_objects(&mut doc), 1);
    assert!(doc.get_object(orphan_id).is_err());
    assert!(doc.get_object(content_id).is_ok());
}

#[test]
fn test_optimize_full() {
    let (mut doc, content_id, orphan_id) = create_doc_with_orphan();
    optimize(&mut doc);

    assert!(doc.get_object(orphan_id).is_err());
    let stream = doc.get_object(content_id).unwrap().as_stream().unwrap();
    assert!(stream.dict.get(b"Filter").is_ok());
}
