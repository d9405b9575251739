// Opens the stereo camera and converts frames into a buffer suitable for the window.
// Visual expectation: when the frame loop calls `read_frame()`, you get one raw
// sensor image holding both eyes, as 0x00RRGGBB pixels.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{FrameBuffer, Side, pack_rgb};

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, ControlValueSetter, FrameFormat, KnownCameraControl, RequestedFormat,
        RequestedFormatType, Resolution,
    },
};

/// The live frame source the session reads once per tick.
pub trait LiveCapture {
    /// Newest raw frame, or an error for this tick only.
    fn read_frame(&mut self) -> Result<FrameBuffer, Error>;

    /// Frames per second the device delivers.
    fn frame_rate(&self) -> u32;

    /// Time between live ticks: `1000 / fps` ms, truncated.
    fn nominal_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.frame_rate().max(1)))
    }
}

/// Per-eye sensor settings, in the units the control panel sliders use.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub exposure: u32,      // 1..=100
    pub gain: f64,          // 1.0..=10.0
    pub white_balance: u32, // Kelvin, 2800..=6500
    pub focus: u32,         // 0..=255
    pub denoising: f64,     // 0.0..=1.0
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self { exposure: 50, gain: 1.0, white_balance: 4000, focus: 128, denoising: 0.5 }
    }
}

impl CameraSettings {
    pub fn clamped(self) -> Self {
        Self {
            exposure: self.exposure.clamp(1, 100),
            gain: if self.gain.is_nan() { 1.0 } else { self.gain.clamp(1.0, 10.0) },
            white_balance: self.white_balance.clamp(2800, 6500),
            focus: self.focus.min(255),
            denoising: if self.denoising.is_nan() { 0.5 } else { self.denoising.clamp(0.0, 1.0) },
        }
    }
}

/// Sink for exposure/gain/etc. Driver semantics are the device's business.
pub trait CameraControl {
    fn apply(&mut self, side: Side, settings: &CameraSettings) -> Result<(), Error>;
}

// A small wrapper around nokhwa::Camera so our main loop stays clean.
pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
    fps: u32,
}

impl CameraCapture {
    /// Try to open camera `index` near the requested resolution and rate.
    /// On success, nothing is shown on screen yet; we just hold an open stream.
    pub fn new(index: u32, width: u32, height: u32, fps: u32) -> Result<Self, Error> {
        // 1) Choose the device (0 = default webcam)
        let idx = CameraIndex::Index(index);

        let fmt = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            fps,
        );

        // 2) Ask for RGB frames, prioritizing the format closest to our request.
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        // 3) Create the camera (this might fail if no device exists).
        let mut cam = Camera::new(idx, req).map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;

        // 4) Start streaming frames from the camera.
        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

        // 5) The actual stream might choose a slightly different format.
        let actual = cam.resolution();
        let actual_fps = match cam.frame_rate() {
            0 => {
                log::warn!("Camera reports 0 fps, assuming {fps}");
                fps
            }
            n => n,
        };
        log::info!(
            "Camera {index} streaming {}x{} @ {actual_fps} fps",
            actual.width(),
            actual.height()
        );

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
            fps: actual_fps.max(1),
        })
    }

    /// Report the actual resolution the camera is delivering.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl LiveCapture for CameraCapture {
    /// Grab one frame from the camera and convert it to 0x00RRGGBB pixels.
    fn read_frame(&mut self) -> Result<FrameBuffer, Error> {
        // 1) Pull a frame from the camera (this blocks until a new frame is ready).
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        // 2) Decode to an RGB image (handles the various raw formats safely).
        let rgb_img = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

        // 3) Pack for the window (u32 per pixel, 0x00RRGGBB).
        let (w, h) = rgb_img.dimensions();
        let mut out = Vec::with_capacity((w as usize) * (h as usize));
        for pixel in rgb_img.pixels() {
            out.push(pack_rgb(pixel[0], pixel[1], pixel[2]));
        }

        Ok(FrameBuffer {
            width: w as usize,
            height: h as usize,
            pixels: out,
        })
    }

    fn frame_rate(&self) -> u32 {
        self.fps
    }
}

impl CameraControl for CameraCapture {
    /// Both eyes come from one sensor, so each side's settings go to the same
    /// device; whichever side is applied last wins.
    fn apply(&mut self, side: Side, settings: &CameraSettings) -> Result<(), Error> {
        let s = settings.clamped();
        let controls = [
            (KnownCameraControl::Exposure, i64::from(s.exposure)),
            (KnownCameraControl::Gain, s.gain.round() as i64),
            (KnownCameraControl::WhiteBalance, i64::from(s.white_balance)),
            (KnownCameraControl::Focus, i64::from(s.focus)),
        ];

        let mut failed = Vec::new();
        for (control, value) in controls {
            let label = format!("{control:?}={value}");
            if let Err(e) = self.cam.set_camera_control(control, ControlValueSetter::Integer(value)) {
                failed.push(format!("{label}: {e}"));
            }
        }
        log::debug!("{} camera: denoising {:.2} has no driver control", side.label(), s.denoising);

        if failed.is_empty() {
            log::info!("Applied {} camera settings {:?}", side.label(), s);
            Ok(())
        } else {
            Err(Error::CameraControl(format!("{} camera: {}", side.label(), failed.join(", "))))
        }
    }
}
