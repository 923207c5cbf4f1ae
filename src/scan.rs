use bson::Document;

// Minimum legal value of a document's length prefix: the prefix itself.
const MIN_DOCUMENT_SIZE: usize = 4;

/// Forward-only iterator over the documents of a raw BSON dump buffer.
///
/// Each document declares its own size in a 4-byte little-endian prefix. The
/// scanner frames spans by that declared size and hands each span to the BSON
/// decoder. A span that fails to decode is skipped with a warning, but the
/// cursor still advances by the declared size, so a corrupted size field
/// loses every record after it. A declared size that is impossible (< 4) or
/// runs past the end of the buffer ends the scan; the tail is discarded.
pub struct DocumentScanner<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> DocumentScanner<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        DocumentScanner { data, offset: 0 }
    }
}

impl Iterator for DocumentScanner<'_> {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        loop {
            if self.offset + MIN_DOCUMENT_SIZE > self.data.len() {
                // clean end of stream
                return None;
            }
            let declared = u32::from_le_bytes(
                self.data[self.offset..self.offset + 4].try_into().unwrap(),
            ) as usize;
            if declared < MIN_DOCUMENT_SIZE {
                tracing::warn!(
                    "Invalid document size {} at offset {}, stopping scan",
                    declared,
                    self.offset
                );
                return None;
            }
            let end = self.offset.saturating_add(declared);
            if end > self.data.len() {
                tracing::warn!(
                    "Incomplete document at end of file (offset {}, expected size {})",
                    self.offset,
                    declared
                );
                return None;
            }
            let span = &self.data[self.offset..end];
            let offset = self.offset;
            self.offset = end;
            match Document::from_reader(span) {
                Ok(doc) => return Some(doc),
                Err(e) => {
                    tracing::warn!("Failed to decode document at offset {}: {}", offset, e);
                }
            }
        }
    }
}
