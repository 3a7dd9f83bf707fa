use thiserror::Error;

use super::models::{DownloadRequest, UrlRequest};

const MAX_URL_LEN: usize = 2048;
const MAX_FORMAT_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum RequestValidationError {
    #[error("URL is required")]
    MissingUrl,
    #[error("URL exceeds {MAX_URL_LEN} characters")]
    UrlTooLong,
    #[error("format_id exceeds {MAX_FORMAT_LEN} characters")]
    FormatTooLong,
    #[error("format_id must not contain whitespace or control characters")]
    InvalidFormat,
}

pub fn validate_url_request(request: &UrlRequest) -> Result<(), RequestValidationError> {
    validate_url(&request.url)
}

pub fn validate_download_request(request: &DownloadRequest) -> Result<(), RequestValidationError> {
    validate_url(&request.url)?;

    if let Some(format_id) = &request.format_id {
        if format_id.len() > MAX_FORMAT_LEN {
            return Err(RequestValidationError::FormatTooLong);
        }
        if format_id
            .trim()
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(RequestValidationError::InvalidFormat);
        }
    }

    Ok(())
}

fn validate_url(url: &str) -> Result<(), RequestValidationError> {
    if url.trim().is_empty() {
        return Err(RequestValidationError::MissingUrl);
    }
    if url.len() > MAX_URL_LEN {
        return Err(RequestValidationError::UrlTooLong);
    }
    Ok(())
}
