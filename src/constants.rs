//! Constants used throughout the application

/// Side length of the square pose-regression input
pub const POSE_INPUT_SIZE: usize = 224;

/// Per-channel RGB mean of the pose network's training normalization
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel RGB standard deviation of the pose network's training normalization
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Minimum detection score for a face to be annotated
pub const DEFAULT_DRAW_THRESHOLD: f32 = 0.95;

/// Fraction of the opposite box dimension added on each side before cropping
pub const DEFAULT_CROP_MARGIN: f32 = 0.2;

/// Key code (lower byte) that stops the capture loop
pub const ESCAPE_KEY: i32 = 27;

/// Frame rate assumed when the capture device reports none
pub const DEFAULT_FPS: f64 = 30.0;

/// Column norm below which the Euler decomposition is treated as gimbal-locked
pub const GIMBAL_LOCK_EPSILON: f64 = 1e-6;

/// Tolerance used when checking model output for orthonormality
pub const ROTATION_TOLERANCE: f64 = 1e-3;

/// Default projected axis length in pixels
pub const DEFAULT_AXIS_LENGTH: f64 = 100.0;

/// Default axis line thickness
pub const DEFAULT_AXIS_THICKNESS: i32 = 4;

/// Default orientation thresholds in degrees
pub const DEFAULT_YAW_THRESHOLD: f64 = 30.0;
pub const DEFAULT_PITCH_THRESHOLD: f64 = 20.0;
pub const DEFAULT_ROLL_THRESHOLD: f64 = 20.0;

/// Number of SCRFD facial keypoints
pub const NUM_FACE_KEYPOINTS: usize = 5;

/// SCRFD input normalization constants
pub const DETECTOR_NORMALIZATION_OFFSET: f32 = 127.5;
pub const DETECTOR_NORMALIZATION_SCALE: f32 = 128.0;
