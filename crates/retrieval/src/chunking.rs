/// Splits a document on blank lines and packs paragraphs into chunks of at
/// most `max_chunk_chars` (a single oversized paragraph stays whole).
pub fn chunk_document(body: &str, max_chunk_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in body.split("\n\n") {
        let trimmed = paragraph.trim();
        if trimmed.is_empty() || is_heading_only(trimmed) {
            continue;
        }

        if current.len() + trimmed.len() + 2 > max_chunk_chars && !current.is_empty() {
            chunks.push(current.trim().to_string());
            current.clear();
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(trimmed);
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

fn is_heading_only(paragraph: &str) -> bool {
    !paragraph.contains('\n') && paragraph.starts_with('#')
}
