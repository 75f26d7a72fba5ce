//! Conversion between rotation matrices and pitch/yaw/roll angles.
//!
//! Angles follow the decomposition `R = Rz(roll) * Ry(yaw) * Rx(pitch)`:
//! pitch is the rotation about the camera X axis, yaw about Y and roll
//! about Z. The decomposition degenerates when yaw reaches ±90°; there roll
//! is pinned to zero and pitch absorbs the remaining in-plane rotation.

use crate::{
    constants::{GIMBAL_LOCK_EPSILON, ROTATION_TOLERANCE},
    Error, Result,
};
use nalgebra::{Matrix3, Rotation3, Vector3};

/// Head orientation as a pitch/yaw/roll triple
///
/// The unit is not encoded in the type: the core math produces radians and
/// the rest of the pipeline works in degrees after [`EulerAngles::to_degrees`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    /// Rotation about the X axis (nodding up and down)
    pub pitch: f64,
    /// Rotation about the Y axis (turning left and right)
    pub yaw: f64,
    /// Rotation about the Z axis (tilting the head sideways)
    pub roll: f64,
}

impl EulerAngles {
    #[must_use]
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Convert radians to degrees
    #[must_use]
    pub fn to_degrees(self) -> Self {
        Self::new(self.pitch.to_degrees(), self.yaw.to_degrees(), self.roll.to_degrees())
    }

    /// Convert degrees to radians
    #[must_use]
    pub fn to_radians(self) -> Self {
        Self::new(self.pitch.to_radians(), self.yaw.to_radians(), self.roll.to_radians())
    }

    /// Compose the rotation matrix these angles (in radians) decompose from
    #[must_use]
    pub fn to_rotation_matrix(self) -> Matrix3<f64> {
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), self.pitch);
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), self.yaw);
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), self.roll);
        (rz * ry * rx).into_inner()
    }
}

/// Decompose a rotation matrix into Euler angles in radians
#[must_use]
pub fn euler_from_rotation(r: &Matrix3<f64>) -> EulerAngles {
    let sy = r[(0, 0)].hypot(r[(1, 0)]);
    let yaw = (-r[(2, 0)]).atan2(sy);

    if sy < GIMBAL_LOCK_EPSILON {
        let pitch = (-r[(1, 2)]).atan2(r[(1, 1)]);
        EulerAngles::new(pitch, yaw, 0.0)
    } else {
        let pitch = r[(2, 1)].atan2(r[(2, 2)]);
        let roll = r[(1, 0)].atan2(r[(0, 0)]);
        EulerAngles::new(pitch, yaw, roll)
    }
}

/// Decompose a batch of rotation matrices, preserving order
#[must_use]
pub fn euler_from_rotations(rotations: &[Matrix3<f64>]) -> Vec<EulerAngles> {
    rotations.iter().map(euler_from_rotation).collect()
}

/// Build a rotation matrix from the 6D continuous representation
///
/// The first three values are the raw X column and the last three the raw Y
/// column. X is normalized, Z is the normalized cross product of X with the
/// raw Y, and Y is recomputed as `Z × X`, so the result is orthonormal.
///
/// # Errors
///
/// Returns an error if:
/// - The input does not hold exactly six values
/// - The two raw columns are degenerate (zero length or parallel)
pub fn rotation_from_ortho6d(values: &[f32]) -> Result<Matrix3<f64>> {
    if values.len() != 6 {
        return Err(Error::InvalidInput(format!(
            "Expected 6 values for a 6D rotation, got {}",
            values.len()
        )));
    }

    let x_raw = Vector3::new(f64::from(values[0]), f64::from(values[1]), f64::from(values[2]));
    let y_raw = Vector3::new(f64::from(values[3]), f64::from(values[4]), f64::from(values[5]));

    let x = x_raw
        .try_normalize(GIMBAL_LOCK_EPSILON)
        .ok_or_else(|| Error::InvalidInput("6D rotation has a zero-length X column".to_string()))?;
    let z = x
        .cross(&y_raw)
        .try_normalize(GIMBAL_LOCK_EPSILON)
        .ok_or_else(|| Error::InvalidInput("6D rotation columns are parallel".to_string()))?;
    let y = z.cross(&x);

    Ok(Matrix3::from_columns(&[x, y, z]))
}

/// Check that a matrix is a proper rotation within `tolerance`
///
/// # Errors
///
/// Returns an error if the matrix has non-finite entries, is not
/// orthonormal, or has a determinant other than +1.
pub fn validate_rotation(r: &Matrix3<f64>, tolerance: f64) -> Result<()> {
    if r.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidInput("Rotation matrix contains non-finite values".to_string()));
    }

    let deviation = (r.transpose() * r - Matrix3::identity()).abs().max();
    if deviation > tolerance {
        return Err(Error::InvalidInput(format!(
            "Matrix is not orthonormal (max deviation {deviation:.2e})"
        )));
    }

    let det = r.determinant();
    if (det - 1.0).abs() > tolerance {
        return Err(Error::InvalidInput(format!("Rotation determinant is {det:.4}, expected 1")));
    }

    Ok(())
}

/// [`validate_rotation`] with the default model-output tolerance
///
/// # Errors
///
/// See [`validate_rotation`].
pub fn validate_model_rotation(r: &Matrix3<f64>) -> Result<()> {
    validate_rotation(r, ROTATION_TOLERANCE)
}
