use hyper::body::Bytes;
use tracing::info;

use crate::error::{Error, StudyResult};

/// Extracts the text layer of an uploaded PDF on the blocking pool.
pub async fn extract_text(data: Bytes) -> StudyResult<String> {
    if !data.starts_with(b"%PDF") {
        return Err(Error::Pdf("file is not a PDF document".into()));
    }
    let text = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&data).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| Error::Pdf(e.to_string()))?
        .map_err(Error::Pdf)?;
    info!("Extracted text length from PDF: {}", text.len());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_pdf_uploads() {
        let result = extract_text(Bytes::from_static(b"hello world")).await;
        assert!(matches!(result, Err(Error::Pdf(_))));
    }
}
