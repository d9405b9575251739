pub mod avi;
pub mod camera;
pub mod cli;
pub mod config;
pub mod controller;
pub mod draw;
pub mod error;
pub mod frame_loop;
pub mod layout;
pub mod media;
pub mod playback;
pub mod recording;
pub mod render;
pub mod scheduler;
pub mod splitter;
pub mod types;

pub use error::{Error, LoadError, RequestError, SaveError, SessionError};
pub use frame_loop::{FrameLoop, Mode, Session, TickOutcome};
pub use types::{FrameBuffer, Side, StereoPair};
