//! Checked numeric conversions between model, geometry and `OpenCV` types

use crate::{Error, Result};

/// Convert usize to i32, failing on overflow
///
/// # Errors
///
/// Returns an error if the value exceeds `i32::MAX`
pub fn usize_to_i32(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Convert a non-negative i32 (an `OpenCV` dimension) to usize
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_usize(value: i32) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::InvalidInput(format!("Negative dimension {value}")))
}

/// Truncate an f64 toward zero into an i32 pixel coordinate
///
/// # Errors
///
/// Returns an error if the value is not finite or outside i32 range
#[allow(clippy::cast_possible_truncation)] // Range is checked first
pub fn f64_to_i32(value: f64) -> Result<i32> {
    if value.is_finite() && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Ok(value as i32)
    } else {
        Err(Error::InvalidInput(format!("Value {value} cannot be used as a pixel coordinate")))
    }
}

/// Truncate an f32 toward zero into an i32 pixel coordinate
///
/// # Errors
///
/// Returns an error if the value is not finite or outside i32 range
pub fn f32_to_i32(value: f32) -> Result<i32> {
    f64_to_i32(f64::from(value))
}
