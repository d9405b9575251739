// Derives the left/right views from one raw frame of the stereo camera.
// Visual expectation: the left eye is the square at the top-left of the
// sensor image, the right eye the square at its bottom-right.

use crate::types::{FrameBuffer, StereoPair};

/// Split one frame into two `s×s` crops, `s = min(width, height)`.
/// No scaling happens here; a square input yields two copies of itself.
pub fn split(frame: &FrameBuffer) -> StereoPair {
    let s = frame.width.min(frame.height);
    let left = frame.crop(0, 0, s, s);
    let right = frame.crop(frame.width - s, frame.height - s, s, s);
    StereoPair { left, right }
}
