// API Helper Functions
//
// Error responses and input validation shared across API modules. Anything
// reaching `Explorer` has already passed through one of these parsers.

use axum::{http::StatusCode, Json};
use bitcoin::network::constants::Network;
use chrono::NaiveDate;
use tracing::{debug, error};

use super::types::ErrorMessage;
use crate::blocks::parse_block_date;
use crate::error::ExplorerError;
use crate::script_utils::is_valid_address;
use crate::types::Hash256;

pub type ApiError = (StatusCode, Json<ErrorMessage>);

/// Standard error result type for API handlers
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Helper to create a 404 Not Found error response
pub fn not_found(message: impl Into<String>) -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorMessage::new(message)))
}

/// Helper to create a 500 Internal Server Error response
pub fn internal_error(message: impl Into<String>) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorMessage::new(message)))
}

/// Helper to create a 400 Bad Request error response
pub fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorMessage::new(message)))
}

/// Map a core error onto its HTTP response
pub fn explorer_error(err: ExplorerError) -> ApiError {
    if err.is_not_found() {
        debug!(error = ?err, "Not found");
        return not_found(err.to_string());
    }
    error!(error = %err, "Request failed");
    internal_error(err.to_string())
}

/// Accept exactly 64 hex characters, either case
pub fn is_valid_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn parse_hash(s: &str, message: &str) -> Result<Hash256, ApiError> {
    if !is_valid_hash(s) {
        return Err(bad_request(message));
    }
    s.parse::<Hash256>().map_err(|_| bad_request(message))
}

/// Block heights are plain non-negative decimal integers
pub fn parse_height(s: &str) -> Result<u32, ApiError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad_request("Block index (height) is not valid"));
    }
    s.parse::<u32>()
        .map_err(|_| bad_request("Block index (height) is not valid"))
}

pub fn parse_address(s: &str, network: Network) -> Result<String, ApiError> {
    if !is_valid_address(s, network) {
        return Err(bad_request("Address is not valid"));
    }
    Ok(s.to_string())
}

/// Comma-separated address list. Empty entries from a trailing comma are
/// skipped; any other bad entry rejects the whole list.
pub fn parse_address_list(s: &str, network: Network) -> Result<Vec<String>, ApiError> {
    let addresses = s
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(|a| parse_address(a, network))
        .collect::<Result<Vec<_>, _>>()?;

    if addresses.is_empty() {
        return Err(bad_request("Address is not valid"));
    }
    Ok(addresses)
}

pub fn parse_date(s: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match s {
        None => Ok(None),
        Some(s) => parse_block_date(s)
            .map(Some)
            .ok_or_else(|| bad_request("Block date is not valid")),
    }
}

pub fn parse_optional_number<T: std::str::FromStr>(
    s: Option<&str>,
    name: &str,
) -> Result<Option<T>, ApiError> {
    match s {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|_| bad_request(format!("{} is not valid", name))),
    }
}

/// `1`/`true` switch a flag on, anything else leaves it off
pub fn parse_flag(s: Option<&str>) -> bool {
    matches!(s, Some("1") | Some("true"))
}
