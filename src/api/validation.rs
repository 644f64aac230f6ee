use super::ApiError;
use crate::constants::limits::MAX_QUERY_DEPTH;

pub fn validate_max_depth(max_depth: Option<u32>) -> Result<Option<u32>, ApiError> {
    match max_depth {
        Some(depth) if depth > MAX_QUERY_DEPTH => Err(ApiError::validation(format!(
            "Invalid max_depth: {}. Must be between 0 and {}",
            depth, MAX_QUERY_DEPTH
        ))),
        other => Ok(other),
    }
}

pub fn validate_required<'a>(field: &str, value: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{} is required", field)));
    }
    Ok(trimmed)
}
