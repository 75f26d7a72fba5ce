//! Configuration management for the head pose overlay application

use crate::{
    constants::{
        DEFAULT_AXIS_LENGTH, DEFAULT_AXIS_THICKNESS, DEFAULT_CROP_MARGIN, DEFAULT_DRAW_THRESHOLD,
    },
    inference::ExecutionTarget,
    orientation::OrientationThresholds,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model configuration
    pub models: ModelConfig,

    /// Face detection configuration
    pub detection: DetectionConfig,

    /// Face crop configuration
    pub crop: CropConfig,

    /// Overlay configuration
    pub render: RenderConfig,

    /// Orientation label thresholds
    pub orientation: OrientationThresholds,

    /// ONNX Runtime execution settings
    pub inference: InferenceConfig,

    /// Output video configuration
    pub recording: RecordingConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Model file paths configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the SCRFD face detection ONNX model
    pub face_detector: PathBuf,

    /// Path to the head pose regression ONNX model
    pub pose_regressor: PathBuf,
}

/// Face detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Detector score below which candidates are discarded (0.0-1.0)
    pub score_threshold: f32,

    /// IOU threshold for non-maximum suppression (0.0-1.0)
    pub nms_threshold: f32,

    /// Minimum score for a face to be estimated and drawn (0.0-1.0)
    pub draw_threshold: f32,
}

/// Face crop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Fraction of the opposite box dimension added on each side
    pub margin: f32,
}

/// Where the head axes are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisAnchor {
    /// Center of the frame
    #[default]
    FrameCenter,
    /// Center of the face crop
    Face,
}

/// Overlay parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Draw the three head axes
    pub draw_axis: bool,

    /// Draw the pose cube over each face
    pub draw_cube: bool,

    /// Write the orientation label above each face
    pub draw_label: bool,

    /// Origin of the head axes
    pub axis_anchor: AxisAnchor,

    /// Axis length in pixels
    pub axis_length: f64,

    /// Axis line thickness
    pub axis_thickness: i32,
}

/// ONNX Runtime session settings shared by both models
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Execution provider
    pub execution: ExecutionTarget,

    /// Intra-op thread count; runtime default when unset
    pub intra_threads: Option<i16>,
}

/// Output video parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Write annotated frames to disk
    pub enabled: bool,

    /// Output video path; missing parent directories are created
    pub output: PathBuf,

    /// Four character codec code
    pub fourcc: String,
}

/// Display parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show annotated frames in a window
    pub enabled: bool,

    /// Window title
    pub window_name: String,

    /// Overlay the measured frame rate
    pub show_fps: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detector.onnx"),
            pose_regressor: PathBuf::from("assets/head_pose.onnx"),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.5,
            nms_threshold: 0.4,
            draw_threshold: DEFAULT_DRAW_THRESHOLD,
        }
    }
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            margin: DEFAULT_CROP_MARGIN,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            draw_axis: true,
            draw_cube: true,
            draw_label: true,
            axis_anchor: AxisAnchor::FrameCenter,
            axis_length: DEFAULT_AXIS_LENGTH,
            axis_thickness: DEFAULT_AXIS_THICKNESS,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output: PathBuf::from("recordings/output.avi"),
            fourcc: "MJPG".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_name: "Demo".to_string(),
            show_fps: false,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f32| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(Error::ConfigError(format!("{name} must be between 0.0 and 1.0")))
            }
        };
        unit("Detector score threshold", self.detection.score_threshold)?;
        unit("NMS threshold", self.detection.nms_threshold)?;
        unit("Draw threshold", self.detection.draw_threshold)?;

        if !self.crop.margin.is_finite() || self.crop.margin < 0.0 {
            return Err(Error::ConfigError("Crop margin must be a non-negative number".to_string()));
        }

        if !self.render.axis_length.is_finite() || self.render.axis_length <= 0.0 {
            return Err(Error::ConfigError("Axis length must be greater than 0".to_string()));
        }
        if self.render.axis_thickness <= 0 {
            return Err(Error::ConfigError("Axis thickness must be greater than 0".to_string()));
        }

        let thresholds = &self.orientation;
        for (name, value) in [
            ("Yaw", thresholds.yaw_deg),
            ("Pitch", thresholds.pitch_deg),
            ("Roll", thresholds.roll_deg),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::ConfigError(format!(
                    "{name} threshold must be a non-negative number of degrees"
                )));
            }
        }

        if matches!(self.inference.intra_threads, Some(n) if n <= 0) {
            return Err(Error::ConfigError("Intra-op thread count must be greater than 0".to_string()));
        }

        if self.recording.fourcc.chars().count() != 4 {
            return Err(Error::ConfigError(format!(
                "Codec code must have four characters, got {:?}",
                self.recording.fourcc
            )));
        }

        Ok(())
    }

    /// Check that both model files exist
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing model
    pub fn check_model_paths(&self) -> Result<()> {
        if !self.models.face_detector.exists() {
            return Err(Error::ConfigError(format!(
                "Face detector model not found: {}",
                self.models.face_detector.display()
            )));
        }
        if !self.models.pose_regressor.exists() {
            return Err(Error::ConfigError(format!(
                "Pose regressor model not found: {}",
                self.models.pose_regressor.display()
            )));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head Pose Overlay Configuration

# Model paths
models:
  face_detector: "assets/face_detector.onnx"
  pose_regressor: "assets/head_pose.onnx"

# Face detection parameters
detection:
  score_threshold: 0.5
  nms_threshold: 0.4
  draw_threshold: 0.95

# Face crop expansion
crop:
  margin: 0.2

# Overlay
render:
  draw_axis: true
  draw_cube: true
  draw_label: true
  axis_anchor: frame_center
  axis_length: 100.0
  axis_thickness: 4

# Orientation label thresholds in degrees
orientation:
  yaw_deg: 30.0
  pitch_deg: 20.0
  roll_deg: 20.0
  boundary: inclusive

# ONNX Runtime
inference:
  execution: cpu

# Output video
recording:
  enabled: true
  output: "recordings/output.avi"
  fourcc: "MJPG"

# Display window
display:
  enabled: true
  window_name: "Demo"
  show_fps: false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed = Config::from_yaml("orientation:\n  yaw_deg: 45.0\n").unwrap();
        assert_eq!(parsed.orientation.yaw_deg, 45.0);
        assert_eq!(parsed.orientation.pitch_deg, 20.0);
        assert_eq!(parsed.detection, DetectionConfig::default());
    }

    #[test]
    fn test_validate_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.detection.draw_threshold = 1.5;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.recording.fourcc = "MJPEG".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.orientation.roll_deg = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.inference.intra_threads = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inference_section() {
        let parsed = Config::from_yaml("inference:\n  execution: cuda\n  intra_threads: 2\n").unwrap();
        assert_eq!(parsed.inference.execution, ExecutionTarget::Cuda);
        assert_eq!(parsed.inference.intra_threads, Some(2));
    }

    #[test]
    fn test_missing_models_reported() {
        let mut config = Config::default();
        config.models.face_detector = PathBuf::from("/nonexistent/detector.onnx");
        let err = config.check_model_paths().unwrap_err();
        assert!(err.to_string().contains("detector.onnx"));
    }
}
