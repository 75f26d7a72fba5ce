use crate::{
    config::InferenceConfig,
    constants::{IMAGENET_MEAN, IMAGENET_STD, POSE_INPUT_SIZE},
    inference::build_session,
    pipeline::PoseRegress,
    rotation::rotation_from_ortho6d,
    utils::{
        image_conversion::{hwc_to_nchw, mat_to_array3_f32},
        safe_cast::{f64_to_i32, usize_to_i32},
    },
    Error, Result,
};
use log::debug;
use nalgebra::Matrix3;
use ndarray::{Array3, Array4, CowArray};
use opencv::core::{Mat, Rect, Size, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Session, Value};
use std::path::Path;

/// Head pose regressor producing a rotation per cropped face
///
/// Accepts models that emit either a full 3×3 rotation (9 values, row-major)
/// or the 6D continuous representation (6 values).
pub struct PoseRegressor {
    session: Session,
}

impl PoseRegressor {
    /// Load a pose regression ONNX model
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model cannot be loaded
    /// - The model declares no outputs
    pub fn new<P: AsRef<Path>>(model_path: P, inference: &InferenceConfig) -> Result<Self> {
        let session = build_session("pose_regressor", model_path, inference)?;

        if session.outputs.is_empty() {
            return Err(Error::ModelError("Pose regressor has no outputs".to_string()));
        }

        Ok(Self { session })
    }

    /// Predict the head rotation for a preprocessed `1×3×224×224` batch
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input does not have the expected shape
    /// - Inference fails
    /// - The output has neither 6 nor 9 values
    pub fn predict(&mut self, input: &Array4<f32>) -> Result<Matrix3<f64>> {
        let expected = [1, 3, POSE_INPUT_SIZE, POSE_INPUT_SIZE];
        if input.shape() != expected {
            return Err(Error::InvalidInput(format!(
                "Pose regressor expects input of shape {:?}, got {:?}",
                expected,
                input.shape()
            )));
        }

        let cow_array = CowArray::from(input.view().into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let output = outputs
            .first()
            .ok_or_else(|| Error::ModelOutputError("No output from pose regressor".to_string()))?;
        let tensor = output.try_extract::<f32>()?;
        let values: Vec<f32> = tensor.view().iter().copied().collect();

        decode_rotation(&values)
    }
}

impl PoseRegress for PoseRegressor {
    fn predict(&mut self, input: &Array4<f32>) -> Result<Matrix3<f64>> {
        PoseRegressor::predict(self, input)
    }
}

/// Interpret raw regressor output as a rotation matrix
///
/// # Errors
///
/// Returns an error if the value count is neither 6 nor 9, or a 6D output is degenerate
pub fn decode_rotation(values: &[f32]) -> Result<Matrix3<f64>> {
    match values.len() {
        9 => {
            let row_major: Vec<f64> = values.iter().copied().map(f64::from).collect();
            Ok(Matrix3::from_row_slice(&row_major))
        }
        6 => rotation_from_ortho6d(values),
        n => Err(Error::ModelOutputError(format!(
            "Pose regressor returned {n} values, expected a 3x3 rotation or 6D representation"
        ))),
    }
}

/// Turn a BGR face crop into the regressor's normalized NCHW input
///
/// The crop is converted to RGB, resized so its shorter side is 224, center
/// cropped to 224×224, scaled to `[0, 1]` and normalized with the ImageNet
/// channel statistics.
///
/// # Errors
///
/// Returns an error if the crop is empty or an `OpenCV` operation fails
pub fn preprocess_face(face: &Mat) -> Result<Array4<f32>> {
    if face.empty() || face.cols() == 0 || face.rows() == 0 {
        return Err(Error::InvalidInput("Cannot preprocess an empty face crop".to_string()));
    }

    let target = usize_to_i32(POSE_INPUT_SIZE)?;

    let mut rgb = Mat::default();
    imgproc::cvt_color(face, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

    let (width, height) = resized_dimensions(face.cols(), face.rows(), target);
    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(width, height),
        0.0,
        0.0,
        interpolation(face.cols().min(face.rows()), target),
    )?;

    let cropped = resized.roi(center_crop(width, height, target)?)?.try_clone()?;

    let mut scaled = Mat::default();
    cropped.convert_to(&mut scaled, CV_32F, 1.0 / 255.0, 0.0)?;

    let mut image = mat_to_array3_f32(&scaled)?;
    normalize(&mut image);
    Ok(hwc_to_nchw(image))
}

/// Size after scaling the shorter side to `target`, keeping the aspect ratio
fn resized_dimensions(width: i32, height: i32, target: i32) -> (i32, i32) {
    let scale = |long: i32, short: i32| {
        i32::try_from(i64::from(target) * i64::from(long) / i64::from(short)).unwrap_or(i32::MAX)
    };
    if width <= height {
        (target, scale(height, width))
    } else {
        (scale(width, height), target)
    }
}

/// Area averaging when shrinking, bilinear when enlarging
fn interpolation(shorter_side: i32, target: i32) -> i32 {
    if shorter_side > target {
        InterpolationFlags::INTER_AREA as i32
    } else {
        InterpolationFlags::INTER_LINEAR as i32
    }
}

/// Central `target × target` window, rounding offsets to the nearest pixel
fn center_crop(width: i32, height: i32, target: i32) -> Result<Rect> {
    let offset = |extent: i32| f64_to_i32((f64::from(extent - target) / 2.0).round());
    Ok(Rect::new(offset(width)?, offset(height)?, target, target))
}

/// Apply per-channel mean/std normalization in place
fn normalize(image: &mut Array3<f32>) {
    for ((_, _, channel), value) in image.indexed_iter_mut() {
        *value = (*value - IMAGENET_MEAN[channel]) / IMAGENET_STD[channel];
    }
    debug!("Normalized face tensor of shape {:?}", image.shape());
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, Vec3b, CV_8UC3};

    #[test]
    fn test_decode_row_major_matrix() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let m = decode_rotation(&values).unwrap();
        assert_eq!(m[(0, 1)], 2.0);
        assert_eq!(m[(1, 0)], 4.0);
        assert_eq!(m[(2, 2)], 9.0);
    }

    #[test]
    fn test_decode_ortho6d() {
        let m = decode_rotation(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        assert!((m - Matrix3::identity()).abs().max() < 1e-9);
    }

    #[test]
    fn test_decode_rejects_other_sizes() {
        assert!(matches!(decode_rotation(&[0.0; 4]), Err(Error::ModelOutputError(_))));
        assert!(decode_rotation(&[]).is_err());
    }

    #[test]
    fn test_resized_dimensions() {
        assert_eq!(resized_dimensions(100, 200, 224), (224, 448));
        assert_eq!(resized_dimensions(300, 150, 224), (448, 224));
        assert_eq!(resized_dimensions(50, 50, 224), (224, 224));
    }

    #[test]
    fn test_center_crop() {
        assert_eq!(center_crop(224, 448, 224).unwrap(), Rect::new(0, 112, 224, 224));
        assert_eq!(center_crop(225, 224, 224).unwrap(), Rect::new(1, 0, 224, 224));
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        // BGR (0, 0, 255) is pure red
        let face = Mat::new_rows_cols_with_default(90, 60, CV_8UC3, Scalar::new(0.0, 0.0, 255.0, 0.0)).unwrap();
        let tensor = preprocess_face(&face).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        let red = (1.0 - IMAGENET_MEAN[0]) / IMAGENET_STD[0];
        let green = -IMAGENET_MEAN[1] / IMAGENET_STD[1];
        assert!((tensor[[0, 0, 112, 112]] - red).abs() < 1e-4);
        assert!((tensor[[0, 1, 0, 0]] - green).abs() < 1e-4);
    }

    #[test]
    fn test_interpolation_choice() {
        assert_eq!(interpolation(448, 224), InterpolationFlags::INTER_AREA as i32);
        assert_eq!(interpolation(224, 224), InterpolationFlags::INTER_LINEAR as i32);
        assert_eq!(interpolation(96, 224), InterpolationFlags::INTER_LINEAR as i32);
    }

    #[test]
    fn test_downscale_averages_fine_detail() {
        // 1 px checkerboard shrunk 3x: each output pixel averages a 3x3 block
        let size = 672;
        let mut face = Mat::new_rows_cols_with_default(size, size, CV_8UC3, Scalar::all(0.0)).unwrap();
        for y in 0..size {
            for x in 0..size {
                if (x + y) % 2 == 0 {
                    *face.at_2d_mut::<Vec3b>(y, x).unwrap() = Vec3b::from([255, 255, 255]);
                }
            }
        }

        let tensor = preprocess_face(&face).unwrap();
        let extreme = tensor.iter().fold(0.0_f32, |acc, v| acc.max(v.abs()));
        assert!(extreme < 1.0, "aliased value {extreme}");
    }

    #[test]
    fn test_preprocess_empty_crop() {
        assert!(matches!(preprocess_face(&Mat::default()), Err(Error::InvalidInput(_))));
    }
}
