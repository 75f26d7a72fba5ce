//! Real-time head pose overlay.
//!
//! Faces are found with an SCRFD detector, each face crop is passed to a
//! rotation-regression network, and the predicted rotation is decomposed
//! into pitch, yaw and roll. The angles drive an axis gizmo, a wireframe
//! pose cube and a discrete orientation label drawn onto the frame.

/// Capture, record and display loop
pub mod app;

/// Command line arguments
pub mod cli;

/// YAML configuration
pub mod config;

/// Application-wide constants
pub mod constants;

/// Error types
pub mod error;

/// SCRFD face detection
pub mod face_detection;

/// ONNX Runtime session setup
pub mod inference;

/// Discrete orientation labels
pub mod orientation;

/// Per-frame estimation and overlay
pub mod pipeline;

/// Head rotation regression
pub mod pose_regression;

/// Axis and cube overlays
pub mod render;

/// Rotation matrix and Euler angle conversions
pub mod rotation;

/// Utility functions
pub mod utils;

pub use error::{Error, Result};
