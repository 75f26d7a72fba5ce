//! Main application module: capture, estimate, record and display.

use crate::{
    config::Config,
    constants::{DEFAULT_FPS, ESCAPE_KEY},
    error::{Error, Result},
    face_detection::FaceDetector,
    pipeline::{FaceDetect, PoseEstimationPipeline, PoseRegress},
    pose_regression::PoseRegressor,
};
use log::{debug, info, warn};
use opencv::{
    core::{Mat, Point, Scalar, Size},
    highgui::{self, WINDOW_AUTOSIZE},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter, CAP_PROP_BUFFERSIZE, CAP_PROP_FPS},
};
use std::fmt;
use std::time::{Duration, Instant};

/// Video source type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

impl Default for VideoSource {
    fn default() -> Self {
        Self::Camera(0)
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera(index) => write!(f, "camera {index}"),
            Self::File(path) => write!(f, "file {path}"),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Camera index or video file path
    pub video_source: VideoSource,
    /// Models, overlay, recording and display settings
    pub config: Config,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
}

/// Totals reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames read and processed
    pub frames: u64,
    /// Faces estimated across all frames
    pub faces: usize,
}

/// Main application struct
pub struct HeadPoseApp<D: FaceDetect = FaceDetector, R: PoseRegress = PoseRegressor> {
    config: AppConfig,
    pipeline: PoseEstimationPipeline<D, R>,
    video_capture: VideoCapture,
    video_writer: Option<VideoWriter>,
    window_open: bool,
    released: bool,
}

impl HeadPoseApp {
    /// Create the application with the ONNX models named in the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - Either model cannot be loaded
    /// - The video source cannot be opened
    pub fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing head pose overlay application");
        config.config.validate()?;
        let pipeline = PoseEstimationPipeline::from_config(&config.config)?;
        Self::with_pipeline(config, pipeline)
    }
}

impl<D: FaceDetect, R: PoseRegress> HeadPoseApp<D, R> {
    /// Create the application around an existing pipeline
    ///
    /// # Errors
    ///
    /// Returns an error if the video source cannot be opened or the window cannot be created
    pub fn with_pipeline(config: AppConfig, pipeline: PoseEstimationPipeline<D, R>) -> Result<Self> {
        let video_capture = open_capture(&config.video_source)?;

        let window_open = config.config.display.enabled;
        if window_open {
            highgui::named_window(&config.config.display.window_name, WINDOW_AUTOSIZE)?;
        }

        Ok(Self {
            config,
            pipeline,
            video_capture,
            video_writer: None,
            window_open,
            released: false,
        })
    }

    /// Run the main loop until end of stream, ESC or the frame limit
    ///
    /// Capture, writer and window are released before returning, on success
    /// and on error.
    ///
    /// # Errors
    ///
    /// Returns an error if processing, recording or display fails
    pub fn run(&mut self) -> Result<RunSummary> {
        info!("Starting main loop on {}", self.config.video_source);
        let result = self.run_loop();
        let released = self.shutdown();

        let summary = result?;
        released?;
        info!("Processed {} frame(s), {} face(s)", summary.frames, summary.faces);
        Ok(summary)
    }

    fn run_loop(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let start_time = Instant::now();
        let mut last_fps_update = Instant::now();
        let mut fps = 0.0;

        loop {
            if self.config.max_frames.is_some_and(|max| summary.frames >= max) {
                info!("Frame limit reached");
                break;
            }

            let mut frame = Mat::default();
            let read = self.video_capture.read(&mut frame);
            if !frame_available(read, &frame) {
                info!("End of stream");
                break;
            }

            let poses = self.pipeline.process_frame(&mut frame)?;
            summary.frames += 1;
            summary.faces += poses.len();
            debug!("Frame {}: {} face(s)", summary.frames, poses.len());

            if last_fps_update.elapsed() >= Duration::from_secs(1) {
                #[allow(clippy::cast_precision_loss)] // Frame counts stay small
                let frames = summary.frames as f64;
                fps = frames / start_time.elapsed().as_secs_f64();
                last_fps_update = Instant::now();
            }
            if self.config.config.display.show_fps {
                draw_fps(&mut frame, fps)?;
            }

            if self.config.config.recording.enabled {
                self.record(&frame)?;
            }

            if self.window_open {
                highgui::imshow(&self.config.config.display.window_name, &frame)?;
                let key = highgui::wait_key(1)?;
                if key & 0xFF == ESCAPE_KEY {
                    info!("Exit requested by user");
                    break;
                }
            }
        }

        Ok(summary)
    }

    /// Append a frame to the output video, opening it on first use
    fn record(&mut self, frame: &Mat) -> Result<()> {
        if self.video_writer.is_none() {
            self.video_writer = Some(self.open_writer(frame.size()?)?);
        }
        if let Some(writer) = self.video_writer.as_mut() {
            writer.write(frame)?;
        }
        Ok(())
    }

    fn open_writer(&self, frame_size: Size) -> Result<VideoWriter> {
        let recording = &self.config.config.recording;
        if let Some(parent) = recording.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let reported = self.video_capture.get(CAP_PROP_FPS)?;
        let fps = if reported.is_finite() && reported > 0.0 {
            reported
        } else {
            warn!("Source reports no frame rate, recording at {} fps", DEFAULT_FPS);
            DEFAULT_FPS
        };

        let mut code = recording.fourcc.chars();
        let (Some(c1), Some(c2), Some(c3), Some(c4)) = (code.next(), code.next(), code.next(), code.next()) else {
            return Err(Error::ConfigError(format!("Invalid codec code {:?}", recording.fourcc)));
        };
        let fourcc = VideoWriter::fourcc(c1, c2, c3, c4)?;

        let path = recording.output.to_string_lossy();
        info!(
            "Recording {}x{} at {:.1} fps to {}",
            frame_size.width, frame_size.height, fps, path
        );
        let writer = VideoWriter::new(&path, fourcc, fps, frame_size, true)?;
        if !writer.is_opened()? {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Cannot open video writer for {path}"),
            )));
        }
        Ok(writer)
    }

    /// Release capture, writer and window; repeated calls are no-ops
    ///
    /// # Errors
    ///
    /// Returns an error if a resource fails to release
    pub fn shutdown(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        info!("Releasing video resources");

        if let Some(mut writer) = self.video_writer.take() {
            writer.release()?;
        }
        self.video_capture.release()?;
        if self.window_open {
            self.window_open = false;
            highgui::destroy_window(&self.config.config.display.window_name)?;
        }
        Ok(())
    }
}

impl<D: FaceDetect, R: PoseRegress> Drop for HeadPoseApp<D, R> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Failed to release video resources: {}", e);
        }
    }
}

/// Whether a capture read produced a frame; read errors end the stream
fn frame_available(read: opencv::Result<bool>, frame: &Mat) -> bool {
    match read {
        Ok(grabbed) => grabbed && !frame.empty(),
        Err(e) => {
            warn!("Failed to read frame: {}", e);
            false
        }
    }
}

/// Open a camera or video file
///
/// # Errors
///
/// Returns an I/O error if the source cannot be opened
pub fn open_capture(source: &VideoSource) -> Result<VideoCapture> {
    let capture = match source {
        VideoSource::Camera(index) => {
            info!("Opening camera {}", index);
            let mut cap = VideoCapture::new(*index, videoio::CAP_ANY)?;
            if cap.is_opened()? {
                // Keep latency low on live devices
                cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
            }
            cap
        }
        VideoSource::File(path) => {
            info!("Opening video file: {}", path);
            VideoCapture::from_file(path, videoio::CAP_ANY)?
        }
    };

    if !capture.is_opened()? {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Cannot open video source: {source}"),
        )));
    }
    Ok(capture)
}

fn draw_fps(frame: &mut Mat, fps: f64) -> Result<()> {
    imgproc::put_text(
        frame,
        &format!("FPS: {fps:.1}"),
        Point::new(10, 30),
        FONT_HERSHEY_SIMPLEX,
        0.7,
        Scalar::new(255.0, 255.0, 255.0, 0.0),
        2,
        LINE_8,
        false,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_source_display() {
        assert_eq!(VideoSource::Camera(2).to_string(), "camera 2");
        assert_eq!(VideoSource::File("in.mp4".into()).to_string(), "file in.mp4");
    }

    #[test]
    fn test_default_source_is_first_camera() {
        assert_eq!(AppConfig::default().video_source, VideoSource::Camera(0));
    }

    #[test]
    fn test_read_error_ends_stream() {
        let frame = Mat::new_rows_cols_with_default(4, 4, opencv::core::CV_8UC3, Scalar::all(0.0)).unwrap();
        let failed = Err(opencv::Error::new(opencv::core::StsError, "device lost"));

        assert!(!frame_available(failed, &frame));
        assert!(!frame_available(Ok(false), &frame));
        assert!(!frame_available(Ok(true), &Mat::default()));
        assert!(frame_available(Ok(true), &frame));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = open_capture(&VideoSource::File("/nonexistent/clip.avi".into()));
        match result {
            Err(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            Err(other) => panic!("expected an I/O error, got {other}"),
            Ok(_) => panic!("expected an I/O error"),
        }
    }
}
