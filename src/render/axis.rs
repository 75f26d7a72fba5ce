use super::{blue, draw_segment, frame_center, green, project, red, view_rotation, LineStyle};
use crate::{
    constants::{DEFAULT_AXIS_LENGTH, DEFAULT_AXIS_THICKNESS},
    rotation::EulerAngles,
    Result,
};
use nalgebra::{Point2, Vector3};
use opencv::core::Mat;

/// Length and thickness of the drawn axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisStyle {
    pub length: f64,
    pub thickness: i32,
}

impl Default for AxisStyle {
    fn default() -> Self {
        Self {
            length: DEFAULT_AXIS_LENGTH,
            thickness: DEFAULT_AXIS_THICKNESS,
        }
    }
}

/// Projected endpoints of the X, Y and Z axes, in that order
#[must_use]
pub fn axis_endpoints(angles_deg: &EulerAngles, origin: Point2<f64>, length: f64) -> [Point2<f64>; 3] {
    let r = view_rotation(angles_deg);
    [0, 1, 2].map(|i| {
        let direction: Vector3<f64> = r.column(i).into_owned();
        project(&(direction * length), origin)
    })
}

/// Draw the head axes: X red, Y green, Z blue
///
/// `origin` defaults to the frame center.
///
/// # Errors
///
/// Returns an error if an endpoint is not representable or drawing fails
pub fn draw_axis(frame: &mut Mat, angles_deg: &EulerAngles, origin: Option<Point2<f64>>, style: &AxisStyle) -> Result<()> {
    let origin = match origin {
        Some(p) => p,
        None => frame_center(frame),
    };
    let [x_end, y_end, z_end] = axis_endpoints(angles_deg, origin, style.length);

    draw_segment(frame, origin, x_end, &LineStyle::new(red(), style.thickness))?;
    draw_segment(frame, origin, y_end, &LineStyle::new(green(), style.thickness))?;
    draw_segment(frame, origin, z_end, &LineStyle::new(blue(), style.thickness))?;
    Ok(())
}
