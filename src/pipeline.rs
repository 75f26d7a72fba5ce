//! Per-frame head pose estimation and overlay.
//!
//! The detector and regressor sit behind [`FaceDetect`] and [`PoseRegress`]
//! so the geometry can be driven by stubs that return fixed detections and
//! rotations.

use crate::{
    config::{AxisAnchor, Config, RenderConfig},
    face_detection::{BoundingBox, FaceDetection, FaceDetector},
    orientation::{annotate, classify, Orientation, OrientationThresholds},
    pose_regression::{preprocess_face, PoseRegressor},
    render::{
        axis::{draw_axis, AxisStyle},
        cube::{draw_pose_cube, CubeStyle},
    },
    rotation::{euler_from_rotation, validate_model_rotation, EulerAngles},
    utils::pad_box,
    Result,
};
use log::{debug, warn};
use nalgebra::{Matrix3, Point2};
use ndarray::Array4;
use opencv::{core::Mat, prelude::*};

/// Source of face detections for a frame
pub trait FaceDetect {
    /// Detect faces in a BGR frame
    ///
    /// # Errors
    ///
    /// Returns an error if detection fails
    fn detect(&mut self, frame: &Mat) -> Result<Vec<FaceDetection>>;
}

/// Source of head rotations for a preprocessed face
pub trait PoseRegress {
    /// Predict the rotation for a `1×3×224×224` normalized RGB batch
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or the output is malformed
    fn predict(&mut self, input: &Array4<f32>) -> Result<Matrix3<f64>>;
}

/// Pose estimate for one face
#[derive(Debug, Clone, PartialEq)]
pub struct HeadPose {
    /// Box reported by the detector, clamped to the frame
    pub bbox: BoundingBox,
    /// Expanded region that was fed to the regressor
    pub crop: BoundingBox,
    /// Centre of the expanded box with only its top-left corner clamped
    pub overlay_center: Point2<f64>,
    /// Cube edge length: the width of the box the detector reported
    pub cube_size: f64,
    /// Detector confidence
    pub score: f32,
    /// Pitch, yaw and roll in degrees
    pub angles_deg: EulerAngles,
    pub orientation: Orientation,
}

/// Tunables for [`PoseEstimationPipeline`]
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Faces scoring below this are ignored
    pub draw_threshold: f32,
    /// Box expansion before cropping
    pub crop_margin: f32,
    pub render: RenderConfig,
    pub thresholds: OrientationThresholds,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            draw_threshold: config.detection.draw_threshold,
            crop_margin: config.crop.margin,
            render: config.render.clone(),
            thresholds: config.orientation,
        }
    }
}

/// Detect, estimate and draw head poses frame by frame
pub struct PoseEstimationPipeline<D, R> {
    detector: D,
    regressor: R,
    settings: PipelineSettings,
}

impl PoseEstimationPipeline<FaceDetector, PoseRegressor> {
    /// Load both ONNX models named in `config`
    ///
    /// # Errors
    ///
    /// Returns an error if either model cannot be loaded
    pub fn from_config(config: &Config) -> Result<Self> {
        let detector = FaceDetector::new(
            &config.models.face_detector,
            config.detection.score_threshold,
            config.detection.nms_threshold,
            &config.inference,
        )?;
        let regressor = PoseRegressor::new(&config.models.pose_regressor, &config.inference)?;

        Ok(Self::new(detector, regressor, PipelineSettings::from_config(config)))
    }
}

impl<D: FaceDetect, R: PoseRegress> PoseEstimationPipeline<D, R> {
    pub fn new(detector: D, regressor: R, settings: PipelineSettings) -> Self {
        Self {
            detector,
            regressor,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Estimate every face in `frame` and draw the overlays onto it
    ///
    /// All faces are estimated from the unmodified frame before anything is
    /// drawn.
    ///
    /// # Errors
    ///
    /// Returns an error if detection, inference or drawing fails
    pub fn process_frame(&mut self, frame: &mut Mat) -> Result<Vec<HeadPose>> {
        let poses = self.estimate(frame)?;
        self.render(frame, &poses)?;
        Ok(poses)
    }

    /// Estimate the pose of every sufficiently confident face
    ///
    /// Faces with an empty crop or an invalid predicted rotation are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if detection, cropping or inference fails
    pub fn estimate(&mut self, frame: &Mat) -> Result<Vec<HeadPose>> {
        let (width, height) = (frame.cols(), frame.rows());
        let detections = self.detector.detect(frame)?;
        let mut poses = Vec::with_capacity(detections.len());

        for detection in detections {
            if detection.score < self.settings.draw_threshold {
                continue;
            }

            let bbox = detection.bbox.clamp_to(width, height);
            let padded = pad_box(&detection.bbox, self.settings.crop_margin);
            let crop = padded.clamp_to(width, height);
            if crop.is_empty() {
                warn!("Skipping face with empty crop {:?}", detection.bbox);
                continue;
            }

            let face = frame.roi(crop.to_rect())?.try_clone()?;
            let input = preprocess_face(&face)?;
            let rotation = self.regressor.predict(&input)?;

            if let Err(e) = validate_model_rotation(&rotation) {
                warn!("Skipping face at {:?}: {}", bbox, e);
                continue;
            }

            let angles_deg = euler_from_rotation(&rotation).to_degrees();
            let orientation = classify(&angles_deg, &self.settings.thresholds);
            debug!(
                "Face {:?} score {:.3}: pitch {:.1}, yaw {:.1}, roll {:.1} ({})",
                bbox, detection.score, angles_deg.pitch, angles_deg.yaw, angles_deg.roll, orientation
            );

            let overlay = BoundingBox::new(padded.x_min.max(0), padded.y_min.max(0), padded.x_max, padded.y_max);
            poses.push(HeadPose {
                bbox,
                crop,
                overlay_center: overlay.center(),
                cube_size: f64::from(detection.bbox.width()),
                score: detection.score,
                angles_deg,
                orientation,
            });
        }

        Ok(poses)
    }

    /// Draw the enabled overlays for each pose
    ///
    /// # Errors
    ///
    /// Returns an error if drawing fails
    pub fn render(&self, frame: &mut Mat, poses: &[HeadPose]) -> Result<()> {
        let render = &self.settings.render;
        let axis_style = AxisStyle {
            length: render.axis_length,
            thickness: render.axis_thickness,
        };
        let cube_style = CubeStyle::default();

        for pose in poses {
            if render.draw_label {
                let anchor = Point2::new(f64::from(pose.bbox.x_min), f64::from((pose.bbox.y_min - 10).max(15)));
                annotate(frame, &pose.orientation, anchor)?;
            }

            if render.draw_axis {
                let origin = match render.axis_anchor {
                    AxisAnchor::FrameCenter => None,
                    AxisAnchor::Face => Some(pose.overlay_center),
                };
                draw_axis(frame, &pose.angles_deg, origin, &axis_style)?;
            }

            if render.draw_cube {
                draw_pose_cube(frame, &pose.angles_deg, Some(pose.overlay_center), pose.cube_size, &cube_style)?;
            }
        }

        Ok(())
    }
}
