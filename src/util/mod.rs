//! Internal utility functions and helpers.
//!
//! This module contains small helper functions used throughout the crate.
//! It is an implementation detail and not part of the public API.

use std::path::Path;

use crate::error::TransferError;

/// Rejects paths no file system can open.
///
/// Runs before any file is opened or buffer rented.
pub(crate) fn validate_path(path: &Path) -> Result<(), TransferError> {
    let raw = path.as_os_str();
    if raw.is_empty() {
        return Err(TransferError::invalid("path is empty"));
    }
    if raw.as_encoded_bytes().contains(&0) {
        return Err(TransferError::invalid("path contains a NUL byte"));
    }
    Ok(())
}
