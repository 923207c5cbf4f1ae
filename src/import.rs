use bson::{Bson, Document};

use crate::db::LoadSink;
use crate::scan::DocumentScanner;

const PROGRESS_INTERVAL: usize = 1000;

/// Derive the row key for a document from its `_id` field.
///
/// Strings are used verbatim and ObjectIds as their 24-char hex form; other
/// value types fall back to their display form. Documents without an `_id`
/// key to the empty string.
pub fn document_key(doc: &Document) -> String {
    match doc.get("_id") {
        None => String::new(),
        Some(Bson::String(s)) => s.clone(),
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(other) => other.to_string(),
    }
}

/// Scan a raw dump buffer and upsert every decodable document into the sink.
///
/// A failed row write is logged and skipped; it neither aborts the run nor
/// rolls back earlier rows. Returns the number of rows written.
pub fn import_dump(sink: &LoadSink, data: &[u8]) -> usize {
    let mut count = 0usize;
    for doc in DocumentScanner::new(data) {
        let document_id = document_key(&doc);
        let json = Bson::Document(doc).into_relaxed_extjson().to_string();
        match sink.upsert(&document_id, &json) {
            Ok(()) => {
                count += 1;
                if count % PROGRESS_INTERVAL == 0 {
                    tracing::info!("Progress: {} documents processed", count);
                }
            }
            Err(e) => {
                tracing::warn!("Failed to insert document {:?}: {}", document_id, e);
            }
        }
    }
    tracing::info!("BSON import completed, {} documents", count);
    count
}
