//! Request body guards shared by the JSON endpoints

use axum::http::{HeaderMap, header};
use http_body_util::LengthLimitError;

use crate::api::error::ApiError;

/// Require a JSON `Content-Type` header
///
/// Parameters such as `charset=utf-8` are accepted; `application/jsonp`,
/// `text/json` and structured suffixes like `+json` are not.
pub fn require_json(headers: &HeaderMap) -> Result<mime::Mime, ApiError> {
    let raw = headers
        .get(header::CONTENT_TYPE)
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?
        .to_str()
        .map_err(|_| ApiError::InvalidPayload("Content-Type is not valid ASCII".into()))?;

    let media_type: mime::Mime = raw
        .parse()
        .map_err(|_| ApiError::InvalidPayload(format!("invalid Content-Type: {raw}")))?;

    if media_type.essence_str() != mime::APPLICATION_JSON.essence_str() {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}",
            media_type.essence_str()
        )));
    }

    Ok(media_type)
}

/// Map a failed body read to an API error
///
/// Hitting the `Limited` cap becomes `PayloadTooLarge`; anything else
/// (truncated stream, corrupt gzip) is an invalid payload.
pub fn body_error(err: Box<dyn std::error::Error + Send + Sync>, limit: usize) -> ApiError {
    if err.is::<LengthLimitError>() {
        ApiError::PayloadTooLarge(limit)
    } else {
        ApiError::InvalidPayload(err.to_string())
    }
}
