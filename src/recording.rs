// Accumulates stereo pairs while a recording is active.
// Visual: nothing on screen changes except the REC marker; frames pile up in
// RAM until "stop & save" hands them to the codec.

use crate::types::StereoPair;

#[derive(Debug, Default)]
pub struct RecordingBuffer {
    frames: Vec<StereoPair>,
    recording: bool,
}

impl RecordingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop anything buffered and begin a fresh recording.
    pub fn start(&mut self) {
        self.frames.clear();
        self.recording = true;
    }

    /// Store one pair; ignored unless a recording is active.
    pub fn append(&mut self, pair: StereoPair) {
        if self.recording {
            self.frames.push(pair);
        }
    }

    /// End the recording and take the frames in insertion order.
    /// Calling this while idle (or twice) returns an empty sequence.
    pub fn stop(&mut self) -> Vec<StereoPair> {
        self.recording = false;
        std::mem::take(&mut self.frames)
    }

    /// Frames buffered so far, without ending the recording.
    pub fn frames(&self) -> &[StereoPair] {
        &self.frames
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameBuffer;

    fn pair(tag: u32) -> StereoPair {
        StereoPair::new(FrameBuffer::filled(2, 2, tag), FrameBuffer::filled(2, 2, tag + 100))
    }

    #[test]
    fn stop_returns_frames_in_order_then_nothing() {
        let mut buf = RecordingBuffer::new();
        buf.start();
        buf.append(pair(1));
        buf.append(pair(2));

        assert_eq!(buf.stop(), vec![pair(1), pair(2)]);
        assert!(!buf.is_recording());
        assert!(buf.stop().is_empty());
    }

    #[test]
    fn append_while_idle_is_ignored() {
        let mut buf = RecordingBuffer::new();
        buf.append(pair(1));
        assert!(buf.is_empty());
    }

    #[test]
    fn frames_can_be_read_without_stopping() {
        let mut buf = RecordingBuffer::new();
        buf.start();
        buf.append(pair(1));

        assert_eq!(buf.frames(), &[pair(1)]);
        assert!(buf.is_recording());
        buf.append(pair(2));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn start_clears_previous_frames() {
        let mut buf = RecordingBuffer::new();
        buf.start();
        buf.append(pair(1));
        buf.start();
        assert_eq!(buf.len(), 0);
        assert!(buf.is_recording());
    }
}
