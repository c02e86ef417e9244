/// Input validation for store operations
///
/// Guards against inputs that would bloat the data file or make a query
/// meaningless. Validation failures are user-input errors: the store turns
/// them into a negative result rather than propagating them.
use litekv_core::{Error, Result};

/// Largest accepted key, in bytes
pub const MAX_KEY_SIZE: usize = 16 * 1024 * 1024; // 16 MB

/// Validates a key
///
/// # Security
///
/// - Prevents oversized keys (>16MB)
///
/// # Errors
///
/// Returns Error::InvalidInput if validation fails
#[inline]
pub fn validate_key(key: &str) -> Result<()> {
    if key.len() > MAX_KEY_SIZE {
        return Err(Error::InvalidInput(format!(
            "Key size {} exceeds maximum {}",
            key.len(),
            MAX_KEY_SIZE
        )));
    }

    Ok(())
}

/// Validates a fuzzy search threshold
///
/// # Errors
///
/// Returns Error::InvalidInput unless the threshold is a number in `0..=100`
#[inline]
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&threshold) {
        return Err(Error::InvalidInput(format!(
            "Threshold {} is outside 0..=100",
            threshold
        )));
    }

    Ok(())
}
