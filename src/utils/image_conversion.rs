//! Conversions between `OpenCV` frames and ndarray tensors.

use super::safe_cast::i32_to_usize;
use crate::{Error, Result};
use ndarray::{Array3, Array4, Axis};
use opencv::core::{Mat, Vec3f, CV_32FC3};
use opencv::prelude::*;

/// Copy a 3-channel `CV_32F` Mat into an HWC `Array3<f32>`
///
/// # Errors
///
/// Returns an error if:
/// - The Mat is empty or not of type `CV_32FC3`
/// - The Mat data cannot be accessed
pub fn mat_to_array3_f32(mat: &Mat) -> Result<Array3<f32>> {
    if mat.empty() {
        return Err(Error::InvalidInput("Cannot convert an empty Mat".to_string()));
    }
    if mat.typ() != CV_32FC3 {
        return Err(Error::InvalidInput(format!(
            "Expected a CV_32FC3 Mat, got type {}",
            mat.typ()
        )));
    }

    if !mat.is_continuous() {
        // ROI views are strided; a clone is packed
        return mat_to_array3_f32(&mat.try_clone()?);
    }

    let rows = i32_to_usize(mat.rows())?;
    let cols = i32_to_usize(mat.cols())?;
    let pixels = mat.data_typed::<Vec3f>()?;

    let data: Vec<f32> = pixels.iter().flat_map(|px| [px[0], px[1], px[2]]).collect();

    Array3::from_shape_vec((rows, cols, 3), data)
        .map_err(|e| Error::ModelDataFormatError(format!("Failed to create array from Mat: {e}")))
}

/// Turn an HWC image into a single-item NCHW batch
#[must_use]
pub fn hwc_to_nchw(image: Array3<f32>) -> Array4<f32> {
    image.permuted_axes([2, 0, 1]).insert_axis(Axis(0))
}
