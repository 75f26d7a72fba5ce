//! Tests for ONNX model loading and inference

mod test_helpers;

use head_pose_overlay::{
    config::{Config, InferenceConfig},
    face_detection::FaceDetector,
    pipeline::PoseEstimationPipeline,
    pose_regression::{preprocess_face, PoseRegressor},
    rotation::validate_model_rotation,
    Result,
};
use opencv::core::CV_8UC3;
use std::path::Path;
use test_helpers::{create_gray_frame, create_test_image};

#[test]
#[ignore = "Requires ONNX models"]
fn test_load_face_detector_model() -> Result<()> {
    let model_path = "assets/face_detector.onnx";
    assert!(Path::new(model_path).exists(), "Face detector model not found");

    let _detector = FaceDetector::new(model_path, 0.5, 0.4, &InferenceConfig::default())?;
    Ok(())
}

#[test]
#[ignore = "Requires ONNX models"]
fn test_blank_frame_has_no_faces() -> Result<()> {
    let mut detector = FaceDetector::new("assets/face_detector.onnx", 0.5, 0.4, &InferenceConfig::default())?;
    let frame = create_test_image(480, 640, CV_8UC3)?;

    assert!(detector.detect(&frame)?.is_empty());
    Ok(())
}

#[test]
#[ignore = "Requires ONNX models"]
fn test_pose_regressor_returns_rotation() -> Result<()> {
    let mut regressor = PoseRegressor::new("assets/head_pose.onnx", &InferenceConfig::default())?;
    let face = create_gray_frame(160, 120, 128.0)?;

    let rotation = regressor.predict(&preprocess_face(&face)?)?;
    validate_model_rotation(&rotation)?;
    Ok(())
}

#[test]
#[ignore = "Requires ONNX models"]
fn test_pipeline_from_default_config() -> Result<()> {
    let config = Config::default();
    config.check_model_paths()?;

    let mut pipeline = PoseEstimationPipeline::from_config(&config)?;
    let mut frame = create_test_image(480, 640, CV_8UC3)?;
    assert!(pipeline.process_frame(&mut frame)?.is_empty());
    Ok(())
}
