//! Utility functions for face regions and numeric conversions.

pub mod image_conversion;
pub mod safe_cast;

use crate::face_detection::BoundingBox;
use safe_cast::f32_to_i32;

/// Grow a detected face box by `margin` without clamping
///
/// The horizontal margin is a fraction of the box height and the vertical
/// margin a fraction of its width, so elongated detections become closer
/// to square.
#[allow(clippy::cast_precision_loss)] // Box dimensions are small
#[must_use]
pub fn pad_box(bbox: &BoundingBox, margin: f32) -> BoundingBox {
    let x_pad = f32_to_i32(margin * bbox.height() as f32).unwrap_or(0);
    let y_pad = f32_to_i32(margin * bbox.width() as f32).unwrap_or(0);

    BoundingBox::new(
        bbox.x_min - x_pad,
        bbox.y_min - y_pad,
        bbox.x_max + x_pad,
        bbox.y_max + y_pad,
    )
}

/// Grow a detected face box into the crop fed to the pose network
///
/// Same expansion as [`pad_box`], clamped to the frame.
#[must_use]
pub fn expand_box(bbox: &BoundingBox, margin: f32, frame_width: i32, frame_height: i32) -> BoundingBox {
    pad_box(bbox, margin).clamp_to(frame_width, frame_height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_box_uses_opposite_dimension() {
        // 100 wide, 50 tall: x grows by 0.2 * 50, y by 0.2 * 100
        let bbox = BoundingBox::new(200, 200, 300, 250);
        let expanded = expand_box(&bbox, 0.2, 640, 480);

        assert_eq!(expanded, BoundingBox::new(190, 180, 310, 270));
    }

    #[test]
    fn test_expand_box_clamps_to_frame() {
        let bbox = BoundingBox::new(5, 10, 630, 470);
        let expanded = expand_box(&bbox, 0.2, 640, 480);

        assert_eq!(expanded.x_min, 0);
        assert_eq!(expanded.y_min, 0);
        assert_eq!(expanded.x_max, 640);
        assert_eq!(expanded.y_max, 480);
    }

    #[test]
    fn test_expand_box_zero_margin() {
        let bbox = BoundingBox::new(20, 30, 60, 90);
        assert_eq!(expand_box(&bbox, 0.0, 640, 480), bbox);
    }

    #[test]
    fn test_pad_box_keeps_out_of_frame_corners() {
        let bbox = BoundingBox::new(-10, 5, 50, 65);
        assert_eq!(pad_box(&bbox, 0.2), BoundingBox::new(-22, -7, 62, 77));
    }

    #[test]
    fn test_expand_box_outside_frame_is_empty() {
        let bbox = BoundingBox::new(700, 500, 760, 560);
        assert!(expand_box(&bbox, 0.2, 640, 480).is_empty());
    }
}
