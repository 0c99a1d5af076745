use pdf_extract::{Document, OutputError, PlainTextOutput};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Text of the first `max_pages` pages of a PDF. Later pages are never
/// rendered. Empty when the document cannot be read; pdf-extract panics on
/// some malformed inputs.
pub fn extract_pdf_text(bytes: &[u8], max_pages: usize) -> String {
    let result = panic::catch_unwind(AssertUnwindSafe(|| leading_pages(bytes, max_pages)));

    match result {
        Ok(Ok(pages)) => pages.join("\n"),
        Ok(Err(err)) => {
            warn!(error = %err, "failed to extract pdf text");
            String::new()
        }
        Err(_) => {
            warn!("pdf extraction panicked");
            String::new()
        }
    }
}

fn leading_pages(bytes: &[u8], max_pages: usize) -> Result<Vec<String>, OutputError> {
    let mut doc = Document::load_mem(bytes)?;
    if doc.is_encrypted() {
        doc.decrypt("")?;
    }

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().take(max_pages).collect();
    debug!(pages = page_numbers.len(), max_pages, "extracting pdf pages");

    let mut pages = Vec::with_capacity(page_numbers.len());
    for page_num in page_numbers {
        let mut text = String::new();
        {
            let mut output = PlainTextOutput::new(&mut text);
            pdf_extract::output_doc_page(&doc, &mut output, page_num)?;
        }
        pages.push(text);
    }
    Ok(pages)
}
