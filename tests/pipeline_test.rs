//! Pipeline tests driven by stub detector and regressor

mod test_helpers;

use head_pose_overlay::{
    config::{AxisAnchor, Config},
    face_detection::BoundingBox,
    orientation::{Gaze, Tilt},
    pipeline::{PipelineSettings, PoseEstimationPipeline},
    rotation::EulerAngles,
    Result,
};
use nalgebra::{Matrix3, Point2};
use opencv::prelude::*;
use test_helpers::{changed_intensity, create_gray_frame, face, StubDetector, StubRegressor};

fn rotation_deg(pitch: f64, yaw: f64, roll: f64) -> Matrix3<f64> {
    EulerAngles::new(pitch, yaw, roll).to_radians().to_rotation_matrix()
}

#[test]
fn test_multiple_faces_in_detection_order() -> Result<()> {
    let detector = StubDetector::new(vec![
        face(40, 40, 120, 140, 0.99),
        face(200, 60, 280, 160, 0.97),
    ]);
    let regressor = StubRegressor::sequence(vec![rotation_deg(0.0, 45.0, 0.0), rotation_deg(-30.0, 0.0, 25.0)]);
    let mut pipeline = PoseEstimationPipeline::new(detector, regressor, PipelineSettings::default());

    let mut frame = create_gray_frame(240, 320, 100.0)?;
    let poses = pipeline.process_frame(&mut frame)?;

    assert_eq!(poses.len(), 2);
    assert_eq!(poses[0].orientation.gaze, Gaze::Left);
    assert_eq!(poses[0].orientation.tilt, Tilt::Level);
    assert_eq!(poses[1].orientation.gaze, Gaze::Down);
    assert_eq!(poses[1].orientation.tilt, Tilt::Right);
    assert!((poses[1].angles_deg.roll - 25.0).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_all_faces_estimated_before_drawing() -> Result<()> {
    // Overlapping faces on a uniform frame: any overlay drawn before the
    // second crop would change its tensor
    let detector = StubDetector::new(vec![face(40, 40, 120, 140, 0.99), face(70, 40, 150, 140, 0.99)]);
    let regressor = StubRegressor::new(rotation_deg(10.0, 50.0, 0.0));
    let inputs = regressor.inputs.clone();
    let mut pipeline = PoseEstimationPipeline::new(detector, regressor, PipelineSettings::default());

    let mut frame = create_gray_frame(240, 320, 100.0)?;
    let poses = pipeline.process_frame(&mut frame)?;
    assert_eq!(poses.len(), 2);

    let inputs = inputs.borrow();
    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0], inputs[1]);
    Ok(())
}

#[test]
fn test_low_confidence_faces_not_drawn() -> Result<()> {
    let detector = StubDetector::new(vec![face(40, 40, 120, 140, 0.9)]);
    let mut pipeline =
        PoseEstimationPipeline::new(detector, StubRegressor::new(Matrix3::identity()), PipelineSettings::default());

    let mut frame = create_gray_frame(240, 320, 100.0)?;
    let before = frame.try_clone()?;
    let poses = pipeline.process_frame(&mut frame)?;

    assert!(poses.is_empty());
    assert_eq!(changed_intensity(&frame, &before)?, 0.0);
    Ok(())
}

#[test]
fn test_draw_threshold_from_config() -> Result<()> {
    let mut config = Config::default();
    config.detection.draw_threshold = 0.5;
    let settings = PipelineSettings::from_config(&config);

    let detector = StubDetector::new(vec![face(40, 40, 120, 140, 0.6)]);
    let mut pipeline = PoseEstimationPipeline::new(detector, StubRegressor::new(Matrix3::identity()), settings);
    assert_eq!(pipeline.settings().draw_threshold, 0.5);

    assert_eq!(pipeline.estimate(&create_gray_frame(240, 320, 100.0)?)?.len(), 1);
    Ok(())
}

#[test]
fn test_face_anchor_moves_axis() -> Result<()> {
    let run = |anchor: AxisAnchor| -> Result<Mat> {
        let mut settings = PipelineSettings::default();
        settings.render.draw_cube = false;
        settings.render.draw_label = false;
        settings.render.axis_anchor = anchor;

        let mut pipeline = PoseEstimationPipeline::new(
            StubDetector::new(vec![face(20, 20, 80, 90, 0.99)]),
            StubRegressor::new(Matrix3::identity()),
            settings,
        );
        let mut frame = create_gray_frame(240, 320, 0.0)?;
        pipeline.process_frame(&mut frame)?;
        Ok(frame)
    };

    let centered = run(AxisAnchor::FrameCenter)?;
    let on_face = run(AxisAnchor::Face)?;
    assert!(changed_intensity(&centered, &on_face)? > 0.0);
    Ok(())
}

#[test]
fn test_crop_reported_in_frame_coordinates() -> Result<()> {
    let detector = StubDetector::new(vec![face(-10, 5, 50, 65, 0.99)]);
    let mut pipeline =
        PoseEstimationPipeline::new(detector, StubRegressor::new(Matrix3::identity()), PipelineSettings::default());

    let poses = pipeline.estimate(&create_gray_frame(240, 320, 100.0)?)?;
    assert_eq!(poses[0].bbox, BoundingBox::new(0, 5, 50, 65));
    assert_eq!(poses[0].crop, BoundingBox::new(0, 0, 62, 77));
    Ok(())
}

#[test]
fn test_cube_sized_from_detector_box_at_frame_edge() -> Result<()> {
    let detector = StubDetector::new(vec![face(-10, 5, 50, 65, 0.99)]);
    let mut pipeline =
        PoseEstimationPipeline::new(detector, StubRegressor::new(Matrix3::identity()), PipelineSettings::default());

    let poses = pipeline.estimate(&create_gray_frame(240, 320, 100.0)?)?;
    assert_eq!(poses[0].cube_size, 60.0);
    assert_eq!(poses[0].overlay_center, Point2::new(31.0, 38.0));
    Ok(())
}
