use super::{blue, draw_segment, frame_center, green, project, red, view_rotation, LineStyle};
use crate::{rotation::EulerAngles, Result};
use nalgebra::{Point2, Vector3};
use opencv::core::Mat;

/// Edges of the face nearest the camera (depth −size/2)
pub const FRONT_EDGES: [(usize, usize); 4] = [(0, 1), (1, 3), (3, 2), (2, 0)];

/// Edges of the far face (depth +size/2)
pub const BACK_EDGES: [(usize, usize); 4] = [(4, 5), (5, 7), (7, 6), (6, 4)];

/// Edges joining the two faces
pub const PILLAR_EDGES: [(usize, usize); 4] = [(0, 4), (1, 5), (2, 6), (3, 7)];

/// Line styles per edge group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeStyle {
    pub front: LineStyle,
    pub back: LineStyle,
    pub pillars: LineStyle,
}

impl Default for CubeStyle {
    fn default() -> Self {
        Self {
            front: LineStyle::new(red(), 3),
            back: LineStyle::new(green(), 2),
            pillars: LineStyle::new(blue(), 2),
        }
    }
}

/// Rotated cube corners relative to the cube center
///
/// Bit 0 of the index selects +x, bit 1 +y and bit 2 the far face, so
/// indices 0..4 form the front face and 4..8 the back face.
#[must_use]
pub fn cube_vertices(angles_deg: &EulerAngles, size: f64) -> [Vector3<f64>; 8] {
    let r = view_rotation(angles_deg);
    let half = size / 2.0;
    let sign = |bit: bool| if bit { half } else { -half };

    std::array::from_fn(|i| r * Vector3::new(sign(i & 1 != 0), sign(i & 2 != 0), sign(i & 4 != 0)))
}

/// Cube corners projected onto the image around `center`
#[must_use]
pub fn project_cube(angles_deg: &EulerAngles, center: Point2<f64>, size: f64) -> [Point2<f64>; 8] {
    cube_vertices(angles_deg, size).map(|v| project(&v, center))
}

/// Draw a wireframe cube oriented by `angles_deg`
///
/// `center` defaults to the frame center.
///
/// # Errors
///
/// Returns an error if a vertex is not representable or drawing fails
pub fn draw_pose_cube(
    frame: &mut Mat,
    angles_deg: &EulerAngles,
    center: Option<Point2<f64>>,
    size: f64,
    style: &CubeStyle,
) -> Result<()> {
    let center = match center {
        Some(p) => p,
        None => frame_center(frame),
    };
    let corners = project_cube(angles_deg, center, size);

    for (edges, line) in [
        (&BACK_EDGES, &style.back),
        (&PILLAR_EDGES, &style.pillars),
        (&FRONT_EDGES, &style.front),
    ] {
        for &(a, b) in edges {
            draw_segment(frame, corners[a], corners[b], line)?;
        }
    }
    Ok(())
}
