//! Inbound frame validation rules.

use presencehub_core::error::AppError;

/// Maximum allowed frame size in bytes.
pub const MAX_FRAME_SIZE: usize = 65_536;

/// Maximum destination length in bytes.
const MAX_DESTINATION_LEN: usize = 256;

/// Validates a raw text frame before parsing.
pub fn validate_inbound(raw: &str) -> Result<(), AppError> {
    if raw.len() > MAX_FRAME_SIZE {
        return Err(AppError::validation(format!(
            "Frame exceeds maximum size of {MAX_FRAME_SIZE} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(AppError::validation("Empty frame"));
    }

    Ok(())
}

/// Validates destination syntax.
pub fn validate_destination(destination: &str) -> Result<(), AppError> {
    if !destination.starts_with('/') || destination.len() > MAX_DESTINATION_LEN {
        return Err(AppError::validation("Invalid destination"));
    }

    if destination
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(AppError::validation(
            "Destination contains invalid characters",
        ));
    }

    Ok(())
}

/// Validates a value used as one destination segment, such as a user name.
pub fn validate_segment(segment: &str) -> Result<(), AppError> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(AppError::validation("Invalid destination segment"));
    }

    if segment
        .chars()
        .any(|c| matches!(c, '/' | '*' | '?') || c.is_whitespace() || c.is_control())
    {
        return Err(AppError::validation(
            "Destination segment contains invalid characters",
        ));
    }

    Ok(())
}
