// Error types, one enum per concern.
// Every variant states *where* things went wrong; the Display text is what the
// user sees in the HUD and the log.
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Side;

/// Window and camera failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Window init error: {0}")]
    WindowInit(String), // Creating the window failed
    #[error("Window update error: {0}")]
    WindowUpdate(String), // Updating the window buffer failed
    #[error("Camera init error: {0}")]
    CameraInit(String), // Opening/starting the camera failed
    #[error("Camera frame error: {0}")]
    CameraFrame(String), // Grabbing/decoding a frame failed
    #[error("Camera control error: {0}")]
    CameraControl(String), // The driver refused a setting
}

/// Encoding or decoding of still images and MJPEG/AVI streams.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Malformed AVI: {0}")]
    Malformed(String),

    #[error("Unsupported video codec: {0}")]
    UnsupportedCodec(String),

    #[error("GStreamer pipeline error: {0}")]
    Pipeline(String),

    #[error("Frame is {found:?}, stream expects {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Cannot encode an empty frame")]
    EmptyFrame,
}

/// Reasons a media folder could not become a playback source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not find a {} media file in {}", side.label(), folder.display())]
    MissingFile { side: Side, folder: PathBuf },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Video declares an unusable frame rate ({0} fps)")]
    InvalidFrameRate(f64),

    #[error("Media contains no complete stereo pair")]
    EmptyStream,

    #[error("Left frame is {left:?} but right frame is {right:?}")]
    PairDimensions {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Reasons a still or a recording was not written.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Nothing to save: the recording is empty")]
    NothingToSave,

    #[error("No frame has been displayed yet")]
    NoFrame,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A session request that the current state does not accept.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("{request} is not available while {state}")]
    NotAllowed {
        request: &'static str,
        state: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Any failure while handling a user request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Save failed: {0}")]
    Save(#[from] SaveError),
}
