//! Discrete head orientation labels from pitch/yaw/roll.
//!
//! Yaw and pitch are banded independently and combined, so a head that is
//! both turned and raised is reported as e.g. "up-left" rather than one
//! band hiding the other. Roll is reported as a separate tilt.

use crate::{
    constants::{DEFAULT_PITCH_THRESHOLD, DEFAULT_ROLL_THRESHOLD, DEFAULT_YAW_THRESHOLD},
    render::to_pixel,
    rotation::EulerAngles,
    Result,
};
use nalgebra::Point2;
use opencv::{
    core::{Mat, Scalar},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Whether an angle exactly at a threshold falls into the band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    /// `|angle| >= threshold` triggers the band
    #[default]
    Inclusive,
    /// `|angle| > threshold` triggers the band
    Exclusive,
}

/// Band thresholds in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationThresholds {
    /// Yaw magnitude at which the head counts as turned left/right
    pub yaw_deg: f64,
    /// Pitch magnitude at which the head counts as raised/lowered
    pub pitch_deg: f64,
    /// Roll magnitude at which the head counts as tilted
    pub roll_deg: f64,
    /// Treatment of angles exactly at a threshold
    pub boundary: Boundary,
}

impl Default for OrientationThresholds {
    fn default() -> Self {
        Self {
            yaw_deg: DEFAULT_YAW_THRESHOLD,
            pitch_deg: DEFAULT_PITCH_THRESHOLD,
            roll_deg: DEFAULT_ROLL_THRESHOLD,
            boundary: Boundary::Inclusive,
        }
    }
}

/// Combined horizontal and vertical looking direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gaze {
    Forward,
    Left,
    Right,
    Up,
    Down,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Gaze {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Up => "up",
            Self::Down => "down",
            Self::UpLeft => "up-left",
            Self::UpRight => "up-right",
            Self::DownLeft => "down-left",
            Self::DownRight => "down-right",
        }
    }
}

/// Sideways head tilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tilt {
    Level,
    Left,
    Right,
}

/// Classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orientation {
    pub gaze: Gaze,
    pub tilt: Tilt,
}

impl Orientation {
    /// Neither turned, raised nor tilted
    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.gaze == Gaze::Forward && self.tilt == Tilt::Level
    }

    /// Human-readable label such as "looking up-left, tilted right"
    #[must_use]
    pub fn label(&self) -> String {
        match self.tilt {
            Tilt::Level => format!("looking {}", self.gaze.as_str()),
            Tilt::Left => format!("looking {}, tilted left", self.gaze.as_str()),
            Tilt::Right => format!("looking {}, tilted right", self.gaze.as_str()),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Side of a band an angle falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Negative,
    Neutral,
    Positive,
}

fn band(angle: f64, threshold: f64, boundary: Boundary) -> Band {
    let triggered = match boundary {
        Boundary::Inclusive => angle.abs() >= threshold,
        Boundary::Exclusive => angle.abs() > threshold,
    };
    if !triggered {
        return Band::Neutral;
    }
    // Signed zero and NaN have no direction
    match angle.partial_cmp(&0.0) {
        Some(Ordering::Greater) => Band::Positive,
        Some(Ordering::Less) => Band::Negative,
        _ => Band::Neutral,
    }
}

/// Classify angles in degrees
///
/// Positive yaw is left, positive pitch is up and positive roll tilts right.
/// Non-finite angles never trigger a band.
#[must_use]
pub fn classify(angles_deg: &EulerAngles, thresholds: &OrientationThresholds) -> Orientation {
    let horizontal = band(angles_deg.yaw, thresholds.yaw_deg, thresholds.boundary);
    let vertical = band(angles_deg.pitch, thresholds.pitch_deg, thresholds.boundary);

    let gaze = match (vertical, horizontal) {
        (Band::Neutral, Band::Neutral) => Gaze::Forward,
        (Band::Neutral, Band::Positive) => Gaze::Left,
        (Band::Neutral, Band::Negative) => Gaze::Right,
        (Band::Positive, Band::Neutral) => Gaze::Up,
        (Band::Negative, Band::Neutral) => Gaze::Down,
        (Band::Positive, Band::Positive) => Gaze::UpLeft,
        (Band::Positive, Band::Negative) => Gaze::UpRight,
        (Band::Negative, Band::Positive) => Gaze::DownLeft,
        (Band::Negative, Band::Negative) => Gaze::DownRight,
    };

    let tilt = match band(angles_deg.roll, thresholds.roll_deg, thresholds.boundary) {
        Band::Neutral => Tilt::Level,
        Band::Positive => Tilt::Right,
        Band::Negative => Tilt::Left,
    };

    Orientation { gaze, tilt }
}

/// Write the orientation label with its baseline at `anchor`
///
/// # Errors
///
/// Returns an error if the anchor is not representable or drawing fails
pub fn annotate(frame: &mut Mat, orientation: &Orientation, anchor: Point2<f64>) -> Result<()> {
    let color = if orientation.is_neutral() {
        Scalar::new(0.0, 255.0, 0.0, 0.0)
    } else {
        Scalar::new(0.0, 255.0, 255.0, 0.0)
    };

    imgproc::put_text(
        frame,
        &orientation.label(),
        to_pixel(anchor)?,
        FONT_HERSHEY_SIMPLEX,
        0.6,
        color,
        2,
        LINE_8,
        false,
    )?;
    Ok(())
}
