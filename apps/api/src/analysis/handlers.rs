//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::analysis::invoker::{analyze, RetryPolicy};
use crate::analysis::models::SalaryAnalysis;
use crate::analysis::upload::{encode, validate, UploadedDocument, ValidationError};
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/v1/analyze
///
/// Accepts a multipart form with a single `file` field holding the PDF
/// resume. Runs the full pipeline: validate → encode → retrying model
/// invocation → JSON response. Always 200 with a `SalaryAnalysis` once the
/// upload passes validation; invocation failures surface inside the body's
/// `error` field, not as an HTTP error.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SalaryAnalysis>, AppError> {
    let model = state
        .model
        .clone()
        .ok_or_else(|| AppError::Configuration("GOOGLE_API_KEY is not set".to_string()))?;

    let document = read_file_field(&mut multipart).await?;

    if let Err(reason) = validate(document.as_ref()) {
        return Err(AppError::Validation(reason.to_string()));
    }
    let Some(document) = document else {
        // validate rejects absent documents above; keep the compiler honest.
        return Err(AppError::Validation(ValidationError::Missing.to_string()));
    };

    tracing::debug!(
        "upload accepted: {} bytes of {}",
        document.bytes.len(),
        document.content_type
    );

    let payload = encode(&document);
    let analysis = analyze(model.as_ref(), &payload, RetryPolicy::default()).await;

    Ok(Json(analysis))
}

/// Pulls the `file` field out of the multipart form, buffering its bytes.
/// Other fields are ignored. Returns `None` when no `file` field is present.
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<UploadedDocument>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;

        return Ok(Some(UploadedDocument {
            content_type,
            bytes,
        }));
    }

    Ok(None)
}
