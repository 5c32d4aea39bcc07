//! Upload validation and data-URL encoding for the analysis pipeline.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use thiserror::Error;

pub const PDF_MIME_TYPE: &str = "application/pdf";
/// Upload ceiling. Matches the limit advertised to users.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// An uploaded file as received from the multipart form. Request-scoped;
/// never persisted.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub content_type: String,
    pub bytes: Bytes,
}

/// Rejection reasons, worded for direct display to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No file uploaded")]
    Missing,

    #[error("Invalid file type. Please upload a PDF file.")]
    NotPdf,

    #[error("File size should be less than 10MB")]
    TooLarge,
}

/// Applies the upload rules in order; the first failure wins.
/// Absence, then declared type, then size. Never panics.
pub fn validate(document: Option<&UploadedDocument>) -> Result<(), ValidationError> {
    let document = document.ok_or(ValidationError::Missing)?;

    if document.content_type != PDF_MIME_TYPE {
        return Err(ValidationError::NotPdf);
    }

    if document.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge);
    }

    Ok(())
}

/// A self-describing data URL: `data:<mime-type>;base64,<payload>`.
/// Invariant: decoding the base64 body reproduces the document bytes exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload(String);

impl EncodedPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn mime_type(&self) -> &str {
        self.split().0
    }

    pub fn base64_data(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        // Well-formed by construction in `encode`.
        let rest = self.0.strip_prefix("data:").unwrap_or(&self.0);
        rest.split_once(";base64,").unwrap_or(("", rest))
    }
}

/// Encodes a validated document as a data URL. Pure and deterministic.
pub fn encode(document: &UploadedDocument) -> EncodedPayload {
    let encoded = BASE64.encode(&document.bytes);
    EncodedPayload(format!(
        "data:{};base64,{}",
        document.content_type, encoded
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_document(bytes: Vec<u8>) -> UploadedDocument {
        UploadedDocument {
            content_type: PDF_MIME_TYPE.to_string(),
            bytes: Bytes::from(bytes),
        }
    }

    #[test]
    fn test_missing_document_rejected_first() {
        assert_eq!(validate(None), Err(ValidationError::Missing));
    }

    #[test]
    fn test_non_pdf_type_rejected() {
        let document = UploadedDocument {
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"\x89PNG"),
        };
        assert_eq!(validate(Some(&document)), Err(ValidationError::NotPdf));
    }

    #[test]
    fn test_oversized_document_rejected_even_when_pdf() {
        let document = pdf_document(vec![0u8; MAX_UPLOAD_BYTES + 1]);
        assert_eq!(validate(Some(&document)), Err(ValidationError::TooLarge));
    }

    #[test]
    fn test_type_check_precedes_size_check() {
        let document = UploadedDocument {
            content_type: "text/plain".to_string(),
            bytes: Bytes::from(vec![0u8; MAX_UPLOAD_BYTES + 1]),
        };
        assert_eq!(validate(Some(&document)), Err(ValidationError::NotPdf));
    }

    #[test]
    fn test_document_at_ceiling_is_valid() {
        let document = pdf_document(vec![0u8; MAX_UPLOAD_BYTES]);
        assert_eq!(validate(Some(&document)), Ok(()));
    }

    #[test]
    fn test_encode_produces_data_url_with_declared_type() {
        let document = pdf_document(b"%PDF-1.7 minimal".to_vec());
        let payload = encode(&document);
        assert!(payload.as_str().starts_with("data:application/pdf;base64,"));
        assert_eq!(payload.mime_type(), PDF_MIME_TYPE);
    }

    #[test]
    fn test_encode_round_trips_bytes_exactly() {
        // Lengths chosen to cover all three base64 padding cases.
        for len in [0usize, 1, 2, 3, 256, 1024 * 1024 + 1] {
            let bytes: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let document = pdf_document(bytes.clone());
            let payload = encode(&document);
            let decoded = BASE64.decode(payload.base64_data()).unwrap();
            assert_eq!(decoded, bytes, "round trip failed at len {len}");
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let document = pdf_document(b"%PDF-1.7 stable".to_vec());
        assert_eq!(encode(&document), encode(&document));
    }
}
