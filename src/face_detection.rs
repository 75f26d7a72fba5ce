//! SCRFD face detection with ONNX Runtime.

use crate::{
    config::InferenceConfig,
    constants::{DETECTOR_NORMALIZATION_OFFSET, DETECTOR_NORMALIZATION_SCALE, NUM_FACE_KEYPOINTS},
    inference::build_session,
    pipeline::FaceDetect,
    utils::{
        image_conversion::{hwc_to_nchw, mat_to_array3_f32},
        safe_cast::{f32_to_i32, usize_to_i32},
    },
    Error, Result,
};
use log::{debug, warn};
use nalgebra::Point2;
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Rect, Scalar, Size, CV_32F, CV_8UC3};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Session, Value};
use std::collections::HashMap;
use std::path::Path;

/// Default SCRFD input side when the model has dynamic dimensions
const DEFAULT_DETECTOR_INPUT: usize = 640;

/// Face region in integer pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self { x_min, y_min, x_max, y_max }
    }

    /// Build a box from float corners, truncating toward zero
    ///
    /// # Errors
    ///
    /// Returns an error if a corner is not finite
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self> {
        Ok(Self::new(f32_to_i32(x1)?, f32_to_i32(y1)?, f32_to_i32(x2)?, f32_to_i32(y2)?))
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        (self.x_max - self.x_min).abs()
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        (self.y_max - self.y_min).abs()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x_max <= self.x_min || self.y_max <= self.y_min
    }

    /// Center point, truncated to whole pixels
    #[must_use]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            f64::from(self.x_min + (self.x_max - self.x_min) / 2),
            f64::from(self.y_min + (self.y_max - self.y_min) / 2),
        )
    }

    /// Clamp to `[0, width] x [0, height]`
    #[must_use]
    pub fn clamp_to(&self, width: i32, height: i32) -> Self {
        Self::new(
            self.x_min.clamp(0, width),
            self.y_min.clamp(0, height),
            self.x_max.clamp(0, width),
            self.y_max.clamp(0, height),
        )
    }

    /// `OpenCV` rectangle covering the same pixels
    #[must_use]
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x_min, self.y_min, self.x_max - self.x_min, self.y_max - self.y_min)
    }
}

/// Face detection result
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetection {
    /// Bounding box of the detected face
    pub bbox: BoundingBox,
    /// Facial keypoints in frame coordinates (eyes, nose, mouth corners); empty if the model has none
    pub landmarks: Vec<(f32, f32)>,
    /// Confidence score in [0, 1]
    pub score: f32,
}

/// Output tensor arrangement of an SCRFD export
#[derive(Debug, Clone, PartialEq, Eq)]
struct OutputLayout {
    strides: Vec<usize>,
    num_anchors: usize,
    with_kps: bool,
}

impl OutputLayout {
    /// Infer the layout from the number of model outputs
    fn from_output_count(count: usize) -> Self {
        let (strides, num_anchors, with_kps) = match count {
            6 => (vec![8, 16, 32], 2, false),
            9 => (vec![8, 16, 32], 2, true),
            10 => (vec![8, 16, 32, 64, 128], 1, false),
            15 => (vec![8, 16, 32, 64, 128], 1, true),
            _ => {
                warn!("Unknown SCRFD configuration with {} outputs, assuming 3 strides", count);
                (vec![8, 16, 32], 2, false)
            }
        };
        Self {
            strides,
            num_anchors,
            with_kps,
        }
    }

    /// Number of outputs per group (scores, boxes, keypoints)
    fn group_len(&self) -> usize {
        self.strides.len()
    }
}

/// A decoded detection before non-maximum suppression, in detector input coordinates
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    bbox: [f32; 4],
    score: f32,
    keypoints: Vec<(f32, f32)>,
}

/// SCRFD face detector
pub struct FaceDetector {
    session: Session,
    input_size: (usize, usize),
    score_threshold: f32,
    nms_threshold: f32,
    layout: OutputLayout,
    center_cache: HashMap<(usize, usize, usize), Vec<(f32, f32)>>,
}

impl FaceDetector {
    /// Load an SCRFD ONNX model
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model cannot be loaded
    /// - The model declares no inputs
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        score_threshold: f32,
        nms_threshold: f32,
        inference: &InferenceConfig,
    ) -> Result<Self> {
        let session = build_session("face_detector", model_path, inference)?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelError("Face detector has no inputs".to_string()))?;
        // [batch, channels, height, width]; dynamic dimensions fall back to the default
        let dimension = |i: usize| {
            input
                .dimensions
                .get(i)
                .copied()
                .flatten()
                .map_or(DEFAULT_DETECTOR_INPUT, |d| d as usize)
        };
        let input_size = (dimension(3), dimension(2));

        let layout = OutputLayout::from_output_count(session.outputs.len());
        debug!("Face detector input {:?}, layout {:?}", input_size, layout);

        Ok(Self {
            session,
            input_size,
            score_threshold,
            nms_threshold,
            layout,
            center_cache: HashMap::new(),
        })
    }

    /// Detect faces in a BGR frame, best score first
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Resizing or color conversion fails
    /// - Inference fails or outputs have unexpected sizes
    pub fn detect(&mut self, image: &Mat) -> Result<Vec<FaceDetection>> {
        if image.empty() {
            return Ok(Vec::new());
        }

        let (input_width, input_height) = self.input_size;
        let (new_width, new_height, scale) = letterbox_size(
            image.cols(),
            image.rows(),
            usize_to_i32(input_width)?,
            usize_to_i32(input_height)?,
        );

        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        // Pad to the model input, image in the top-left corner
        let mut padded = Mat::new_rows_cols_with_default(
            usize_to_i32(input_height)?,
            usize_to_i32(input_width)?,
            CV_8UC3,
            Scalar::all(0.0),
        )?;
        let mut roi = padded.roi_mut(Rect::new(0, 0, new_width, new_height))?;
        resized.copy_to(&mut roi)?;

        let input = Self::preprocess(&padded)?;
        let candidates = self.forward(input)?;

        let detections = suppress(candidates, self.nms_threshold)
            .into_iter()
            .map(|c| {
                let [x1, y1, x2, y2] = c.bbox.map(|v| v / scale);
                Ok(FaceDetection {
                    bbox: BoundingBox::from_corners(x1, y1, x2, y2)?,
                    landmarks: c.keypoints.iter().map(|&(x, y)| (x / scale, y / scale)).collect(),
                    score: c.score,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Detected {} face(s)", detections.len());
        Ok(detections)
    }

    /// BGR u8 → normalized RGB NCHW tensor
    fn preprocess(image: &Mat) -> Result<Array4<f32>> {
        let mut rgb = Mat::default();
        imgproc::cvt_color(image, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let mut normalized = Mat::default();
        rgb.convert_to(
            &mut normalized,
            CV_32F,
            1.0 / f64::from(DETECTOR_NORMALIZATION_SCALE),
            -f64::from(DETECTOR_NORMALIZATION_OFFSET) / f64::from(DETECTOR_NORMALIZATION_SCALE),
        )?;

        Ok(hwc_to_nchw(mat_to_array3_f32(&normalized)?))
    }

    /// Run the model and decode every anchor above the score threshold
    fn forward(&mut self, input: Array4<f32>) -> Result<Vec<Candidate>> {
        let input_height = input.shape()[2];
        let input_width = input.shape()[3];

        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let group = self.layout.group_len();
        let expected = if self.layout.with_kps { group * 3 } else { group * 2 };
        if outputs.len() < expected {
            return Err(Error::ModelOutputError(format!(
                "Face detector returned {} outputs, expected {}",
                outputs.len(),
                expected
            )));
        }

        let mut candidates = Vec::new();
        for (idx, &stride) in self.layout.strides.iter().enumerate() {
            let scores = output_values(&outputs[idx])?;
            let distances = output_values(&outputs[idx + group])?;
            let kps = if self.layout.with_kps {
                Some(output_values(&outputs[idx + group * 2])?)
            } else {
                None
            };

            let key = (input_height / stride, input_width / stride, stride);
            let num_anchors = self.layout.num_anchors;
            let centers = self
                .center_cache
                .entry(key)
                .or_insert_with(|| anchor_centers(key.0, key.1, stride, num_anchors));

            if scores.len() != centers.len() || distances.len() != centers.len() * 4 {
                return Err(Error::ModelDataFormatError(format!(
                    "Stride {} has {} scores and {} box values for {} anchors",
                    stride,
                    scores.len(),
                    distances.len(),
                    centers.len()
                )));
            }

            #[allow(clippy::cast_precision_loss)] // Strides are small
            let stride_f = stride as f32;
            for (i, (&score, &center)) in scores.iter().zip(centers.iter()).enumerate() {
                if score < self.score_threshold {
                    continue;
                }
                let d = &distances[i * 4..i * 4 + 4];
                let scaled = [d[0] * stride_f, d[1] * stride_f, d[2] * stride_f, d[3] * stride_f];

                let keypoints = kps
                    .as_ref()
                    .and_then(|k| k.get(i * NUM_FACE_KEYPOINTS * 2..(i + 1) * NUM_FACE_KEYPOINTS * 2))
                    .map(|k| {
                        k.chunks_exact(2)
                            .map(|p| (center.0 + p[0] * stride_f, center.1 + p[1] * stride_f))
                            .collect()
                    })
                    .unwrap_or_default();

                candidates.push(Candidate {
                    bbox: distance_to_bbox(center, scaled),
                    score,
                    keypoints,
                });
            }
        }

        Ok(candidates)
    }
}

impl FaceDetect for FaceDetector {
    fn detect(&mut self, frame: &Mat) -> Result<Vec<FaceDetection>> {
        FaceDetector::detect(self, frame)
    }
}

/// Flatten an output tensor into a vector
fn output_values(value: &Value) -> Result<Vec<f32>> {
    let tensor = value.try_extract::<f32>()?;
    let view = tensor.view();
    Ok(view.iter().copied().collect())
}

/// Size of the image inside the letterboxed input, and the applied scale
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn letterbox_size(image_width: i32, image_height: i32, input_width: i32, input_height: i32) -> (i32, i32, f32) {
    let image_ratio = image_height as f32 / image_width as f32;
    let model_ratio = input_height as f32 / input_width as f32;

    let (new_width, new_height) = if image_ratio > model_ratio {
        ((input_height as f32 / image_ratio) as i32, input_height)
    } else {
        (input_width, (input_width as f32 * image_ratio) as i32)
    };

    (new_width, new_height, new_height as f32 / image_height as f32)
}

/// Anchor centers in row-major order, repeated `num_anchors` times per cell
#[allow(clippy::cast_precision_loss)]
fn anchor_centers(height: usize, width: usize, stride: usize, num_anchors: usize) -> Vec<(f32, f32)> {
    let mut centers = Vec::with_capacity(height * width * num_anchors);
    for y in 0..height {
        for x in 0..width {
            let center = ((x * stride) as f32, (y * stride) as f32);
            centers.extend(std::iter::repeat(center).take(num_anchors.max(1)));
        }
    }
    centers
}

/// Convert (left, top, right, bottom) distances from an anchor center into corners
fn distance_to_bbox(center: (f32, f32), distances: [f32; 4]) -> [f32; 4] {
    [
        center.0 - distances[0],
        center.1 - distances[1],
        center.0 + distances[2],
        center.1 + distances[3],
    ]
}

/// Intersection over union with inclusive pixel extents
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let area = |r: &[f32; 4]| (r[2] - r[0] + 1.0) * (r[3] - r[1] + 1.0);

    let w = (a[2].min(b[2]) - a[0].max(b[0]) + 1.0).max(0.0);
    let h = (a[3].min(b[3]) - a[1].max(b[1]) + 1.0).max(0.0);
    let inter = w * h;

    inter / (area(a) + area(b) - inter)
}

/// Greedy non-maximum suppression, returns survivors sorted by descending score
fn suppress(mut candidates: Vec<Candidate>, threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| iou(&k.bbox, &candidate.bbox) <= threshold) {
            kept.push(candidate);
        }
    }
    kept
}
