//! Helper functions and stub capabilities for tests
#![allow(dead_code)]

use head_pose_overlay::{
    face_detection::{BoundingBox, FaceDetection},
    pipeline::{FaceDetect, PoseRegress},
    Result,
};
use nalgebra::Matrix3;
use ndarray::Array4;
use opencv::{
    core::{Mat, Scalar, Size, CV_8UC3},
    prelude::*,
    videoio::VideoWriter,
};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Create a test image with specified dimensions and type
pub fn create_test_image(height: i32, width: i32, cv_type: i32) -> Result<Mat> {
    Mat::zeros(height, width, cv_type)?.to_mat().map_err(Into::into)
}

/// Create a BGR frame filled with one gray level
pub fn create_gray_frame(height: i32, width: i32, level: f64) -> Result<Mat> {
    Ok(Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(level))?)
}

/// Sum of absolute per-pixel differences over all channels
pub fn changed_intensity(a: &Mat, b: &Mat) -> Result<f64> {
    let mut diff = Mat::default();
    opencv::core::absdiff(a, b, &mut diff)?;
    let total = opencv::core::sum_elems(&diff)?;
    Ok(total[0] + total[1] + total[2])
}

/// Detection with no landmarks
pub fn face(x_min: i32, y_min: i32, x_max: i32, y_max: i32, score: f32) -> FaceDetection {
    FaceDetection {
        bbox: BoundingBox::new(x_min, y_min, x_max, y_max),
        landmarks: Vec::new(),
        score,
    }
}

/// Detector returning the same faces for every frame
pub struct StubDetector {
    pub faces: Vec<FaceDetection>,
    pub frames_seen: usize,
}

impl StubDetector {
    pub fn new(faces: Vec<FaceDetection>) -> Self {
        Self { faces, frames_seen: 0 }
    }
}

impl FaceDetect for StubDetector {
    fn detect(&mut self, _frame: &Mat) -> Result<Vec<FaceDetection>> {
        self.frames_seen += 1;
        Ok(self.faces.clone())
    }
}

/// Regressor returning rotations in turn, repeating the last one
///
/// Every input tensor is recorded in `inputs`, which can be cloned out
/// before the stub is moved into a pipeline.
pub struct StubRegressor {
    pub rotations: Vec<Matrix3<f64>>,
    pub inputs: Rc<RefCell<Vec<Array4<f32>>>>,
}

impl StubRegressor {
    pub fn new(rotation: Matrix3<f64>) -> Self {
        Self::sequence(vec![rotation])
    }

    pub fn sequence(rotations: Vec<Matrix3<f64>>) -> Self {
        Self {
            rotations,
            inputs: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl PoseRegress for StubRegressor {
    fn predict(&mut self, input: &Array4<f32>) -> Result<Matrix3<f64>> {
        let mut inputs = self.inputs.borrow_mut();
        let index = inputs.len().min(self.rotations.len().saturating_sub(1));
        inputs.push(input.clone());
        Ok(self.rotations.get(index).copied().unwrap_or_else(Matrix3::identity))
    }
}

/// Unique path under the system temp directory
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("head_pose_overlay_{}_{}", std::process::id(), name))
}

/// Write `frames` solid gray frames to an MJPG AVI
pub fn write_test_video(path: &Path, frames: usize, width: i32, height: i32) -> Result<()> {
    let fourcc = VideoWriter::fourcc('M', 'J', 'P', 'G')?;
    let mut writer = VideoWriter::new(&path.to_string_lossy(), fourcc, 10.0, Size::new(width, height), true)?;
    assert!(writer.is_opened()?, "Cannot create test video {}", path.display());

    for i in 0..frames {
        #[allow(clippy::cast_precision_loss)]
        let level = 40.0 + (i % 10) as f64 * 10.0;
        writer.write(&create_gray_frame(height, width, level)?)?;
    }
    writer.release()?;
    Ok(())
}
