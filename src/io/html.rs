//! Local HTML pages (saved listings, fixtures).

use std::path::Path;

use crate::error::AppError;

/// Read a saved page. Invalid UTF-8 is replaced rather than rejected, since
/// saved pages are sometimes Latin-1.
pub fn read_html(path: &Path) -> Result<String, AppError> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::new(2, format!("Failed to read HTML '{}': {e}", path.display())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
