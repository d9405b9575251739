// Replays a previously saved stereo pair stream in place of the live camera.
// Visual: the loaded pair loops forever at the rate it was recorded at; a
// still pair simply stays on screen.

use std::time::Duration;

use crate::error::{CodecError, LoadError};
use crate::types::{FrameBuffer, StereoPair};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Still,
    Video,
}

/// Finite, ordered, endlessly looping sequence of stereo pairs.
#[derive(Debug)]
pub struct PlaybackSource {
    pairs: Vec<StereoPair>,
    cursor: usize,
    interval: Duration,
    kind: SourceKind,
}

impl PlaybackSource {
    /// One still pair, ticked at the camera's own rate.
    pub fn still(pair: StereoPair, live_interval: Duration) -> Result<Self, LoadError> {
        check_pair(&pair)?;
        Ok(Self {
            pairs: vec![pair],
            cursor: 0,
            interval: live_interval,
            kind: SourceKind::Still,
        })
    }

    /// Read two decoded streams in lock-step. The shorter stream bounds the
    /// sequence; the tick interval comes from the left stream's declared fps.
    pub fn from_streams<L, R>(left: L, right: R, declared_fps: f64) -> Result<Self, LoadError>
    where
        L: IntoIterator<Item = Result<FrameBuffer, CodecError>>,
        R: IntoIterator<Item = Result<FrameBuffer, CodecError>>,
    {
        let interval = interval_for_fps(declared_fps)?;

        let mut pairs = Vec::new();
        for (l, r) in left.into_iter().zip(right) {
            let pair = StereoPair::new(l?, r?);
            check_pair(&pair)?;
            pairs.push(pair);
        }
        if pairs.is_empty() {
            return Err(LoadError::EmptyStream);
        }

        log::debug!("Video playback source: {} pairs at {:?}/frame", pairs.len(), interval);
        Ok(Self { pairs, cursor: 0, interval, kind: SourceKind::Video })
    }

    /// Pair under the cursor; the cursor then advances and wraps to 0.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> &StereoPair {
        let idx = self.cursor;
        self.cursor = (self.cursor + 1) % self.pairs.len();
        &self.pairs[idx]
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }
}

/// `1000 / fps` milliseconds, truncated; never shorter than 1 ms.
pub fn interval_for_fps(fps: f64) -> Result<Duration, LoadError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(LoadError::InvalidFrameRate(fps));
    }
    let millis = (1000.0 / fps) as u64;
    Ok(Duration::from_millis(millis.max(1)))
}

fn check_pair(pair: &StereoPair) -> Result<(), LoadError> {
    let (left, right) = (pair.left.dimensions(), pair.right.dimensions());
    if left != right {
        return Err(LoadError::PairDimensions { left, right });
    }
    if pair.left.is_empty() {
        return Err(LoadError::EmptyStream);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(count: u32) -> Vec<Result<FrameBuffer, CodecError>> {
        (0..count).map(|i| Ok(FrameBuffer::filled(2, 2, i))).collect()
    }

    #[test]
    fn shorter_stream_bounds_the_sequence() {
        let source = PlaybackSource::from_streams(frames(10), frames(7), 30.0).unwrap();
        assert_eq!(source.len(), 7);
        assert_eq!(source.kind(), SourceKind::Video);
        assert_eq!(source.interval(), Duration::from_millis(33));
    }

    #[test]
    fn next_wraps_after_the_last_pair() {
        let mut source = PlaybackSource::from_streams(frames(3), frames(3), 10.0).unwrap();
        let first = source.next().clone();
        source.next();
        source.next();
        assert_eq!(source.next(), &first);
        assert_eq!(source.cursor(), 1);

        source.reset();
        assert_eq!(source.next(), &first);
    }

    #[test]
    fn zero_fps_is_a_load_error() {
        let err = PlaybackSource::from_streams(frames(2), frames(2), 0.0).unwrap_err();
        assert!(matches!(err, LoadError::InvalidFrameRate(_)));
    }

    #[test]
    fn empty_stream_is_a_load_error() {
        let err = PlaybackSource::from_streams(frames(0), frames(4), 25.0).unwrap_err();
        assert!(matches!(err, LoadError::EmptyStream));
    }

    #[test]
    fn decode_failure_aborts_the_load() {
        let mut right = frames(2);
        right[1] = Err(CodecError::Malformed("truncated chunk".into()));
        let err = PlaybackSource::from_streams(frames(2), right, 25.0).unwrap_err();
        assert!(matches!(err, LoadError::Codec(_)));
    }

    #[test]
    fn still_source_uses_the_live_interval() {
        let pair = StereoPair::new(FrameBuffer::new(4, 4), FrameBuffer::new(4, 4));
        let mut source = PlaybackSource::still(pair.clone(), Duration::from_millis(40)).unwrap();
        assert_eq!(source.interval(), Duration::from_millis(40));
        assert_eq!(source.next(), &pair);
        assert_eq!(source.next(), &pair);
    }

    #[test]
    fn mismatched_pair_is_rejected() {
        let pair = StereoPair::new(FrameBuffer::new(4, 4), FrameBuffer::new(3, 3));
        let err = PlaybackSource::still(pair, Duration::from_millis(40)).unwrap_err();
        assert!(matches!(err, LoadError::PairDimensions { .. }));
    }
}
