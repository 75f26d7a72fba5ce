//! Pose visualization on video frames.
//!
//! Both renderers share one convention: a direction `v` in head space is
//! rotated by `Rx(pitch) * Ry(-yaw) * Rz(roll)` and projected
//! orthographically by dropping its depth component. Image X grows to the
//! right and image Y grows downward, so positive yaw swings the Z axis
//! toward the left of the image and positive pitch tips it upward.

/// Three-axis gizmo renderer
pub mod axis;

/// Wireframe pose cube renderer
pub mod cube;

use crate::{rotation::EulerAngles, utils::safe_cast::f64_to_i32, Result};
use nalgebra::{Matrix3, Point2, Rotation3, Vector3};
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc,
    prelude::*,
};

/// Red in `OpenCV` BGR order
#[must_use]
pub fn red() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

/// Green in `OpenCV` BGR order
#[must_use]
pub fn green() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

/// Blue in `OpenCV` BGR order
#[must_use]
pub fn blue() -> Scalar {
    Scalar::new(255.0, 0.0, 0.0, 0.0)
}

/// Color and thickness of a line group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: Scalar,
    pub thickness: i32,
}

impl LineStyle {
    #[must_use]
    pub fn new(color: Scalar, thickness: i32) -> Self {
        Self { color, thickness }
    }
}

/// Rotation applied to head-space directions before projection
///
/// `angles_deg` is in degrees.
#[must_use]
pub fn view_rotation(angles_deg: &EulerAngles) -> Matrix3<f64> {
    let a = angles_deg.to_radians();
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), a.pitch);
    let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), -a.yaw);
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), a.roll);
    (rx * ry * rz).into_inner()
}

/// Orthographic projection of a camera-space offset around `origin`
#[must_use]
pub fn project(offset: &Vector3<f64>, origin: Point2<f64>) -> Point2<f64> {
    origin + offset.xy()
}

/// Center of the frame in pixel coordinates
#[must_use]
pub fn frame_center(frame: &Mat) -> Point2<f64> {
    Point2::new(f64::from(frame.cols()) / 2.0, f64::from(frame.rows()) / 2.0)
}

/// Truncate a projected point to a pixel
///
/// # Errors
///
/// Returns an error if a coordinate is not finite or out of `i32` range
pub fn to_pixel(p: Point2<f64>) -> Result<Point> {
    Ok(Point::new(f64_to_i32(p.x)?, f64_to_i32(p.y)?))
}

/// Draw a straight segment between two projected points
///
/// # Errors
///
/// Returns an error if a point cannot be converted or drawing fails
pub fn draw_segment(frame: &mut Mat, from: Point2<f64>, to: Point2<f64>, style: &LineStyle) -> Result<()> {
    imgproc::line(
        frame,
        to_pixel(from)?,
        to_pixel(to)?,
        style.color,
        style.thickness,
        imgproc::LINE_8,
        0,
    )?;
    Ok(())
}
