// The session state machine: once per tick, get a pair from the live camera
// or the playback source, feed the recorder, and hand the pair to the renderer.
// Request handlers (start/stop recording, playback, ratios) run between ticks.

use std::time::Duration;

use crate::camera::LiveCapture;
use crate::error::SessionError;
use crate::layout::{self, Layout, Ratios};
use crate::playback::PlaybackSource;
use crate::recording::RecordingBuffer;
use crate::render::{Overlay, Renderer};
use crate::splitter;
use crate::types::StereoPair;

/// Where frames come from. Recording only exists inside `Preview`.
#[derive(Debug)]
pub enum Session {
    Preview { recorder: RecordingBuffer },
    Playback { source: PlaybackSource },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Preview,
    Playback,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Preview => "PREVIEW",
            Mode::Playback => "PLAYBACK",
        }
    }
}

/// What one tick did, and how long until the next one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered { next: Duration },
    /// Camera read failed; nothing was rendered and recording is untouched.
    CaptureFailed { retry_in: Duration },
    /// A pair was produced but the renderer refused it.
    RenderFailed { next: Duration },
}

impl TickOutcome {
    pub fn delay(&self) -> Duration {
        match *self {
            TickOutcome::Rendered { next } | TickOutcome::RenderFailed { next } => next,
            TickOutcome::CaptureFailed { retry_in } => retry_in,
        }
    }
}

pub struct FrameLoop<C, R> {
    capture: C,
    renderer: R,
    session: Session,
    ratios: Ratios,
    canvas: (u32, u32),
    layout: Layout,
    retry_backoff: Duration,
    last_pair: Option<StereoPair>,
}

impl<C: LiveCapture, R: Renderer> FrameLoop<C, R> {
    /// Starts in live preview, not recording.
    pub fn new(capture: C, renderer: R, ratios: Ratios, canvas: (u32, u32), retry_backoff: Duration) -> Self {
        let ratios = ratios.clamped();
        Self {
            capture,
            renderer,
            session: Session::Preview { recorder: RecordingBuffer::new() },
            ratios,
            canvas,
            layout: layout::compute(canvas.0, canvas.1, &ratios),
            retry_backoff,
            last_pair: None,
        }
    }

    /// Run one tick to completion.
    pub fn tick(&mut self) -> TickOutcome {
        let overlay = self.overlay();

        let (pair, next) = match &mut self.session {
            Session::Preview { recorder } => {
                let frame = match self.capture.read_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::warn!("Failed to capture frame: {e}");
                        return TickOutcome::CaptureFailed { retry_in: self.retry_backoff };
                    }
                };
                let pair = splitter::split(&frame);
                if recorder.is_recording() {
                    recorder.append(pair.clone());
                }
                let pair: &StereoPair = self.last_pair.insert(pair);
                (pair, self.capture.nominal_interval())
            }
            Session::Playback { source } => {
                let next = source.interval();
                (source.next(), next)
            }
        };

        match self.renderer.render(pair, &self.layout, &overlay) {
            Ok(()) => TickOutcome::Rendered { next },
            Err(e) => {
                log::error!("Failed to render frame: {e}");
                TickOutcome::RenderFailed { next }
            }
        }
    }

    pub fn start_recording(&mut self) -> Result<(), SessionError> {
        if let Session::Preview { recorder } = &mut self.session {
            if !recorder.is_recording() {
                recorder.start();
                log::info!("Recording started");
                return Ok(());
            }
        }
        Err(self.not_allowed("Recording"))
    }

    /// End the recording and take its pairs for saving (possibly none).
    pub fn stop_recording(&mut self) -> Result<Vec<StereoPair>, SessionError> {
        if let Session::Preview { recorder } = &mut self.session {
            if recorder.is_recording() {
                let frames = recorder.stop();
                log::info!("Recording stopped with {} frames", frames.len());
                return Ok(frames);
            }
        }
        Err(self.not_allowed("Stop & save"))
    }

    /// The active recording's frames, left in place so a failed save loses nothing.
    pub fn recorded_frames(&self) -> Result<&[StereoPair], SessionError> {
        match &self.session {
            Session::Preview { recorder } if recorder.is_recording() => Ok(recorder.frames()),
            _ => Err(self.not_allowed("Stop & save")),
        }
    }

    /// Swap live capture for `source`. An active recording is dropped; the
    /// number of discarded pairs is returned so the caller can tell the user.
    pub fn enter_playback(&mut self, mut source: PlaybackSource) -> Result<usize, SessionError> {
        if self.mode() != Mode::Preview {
            return Err(self.not_allowed("Loading media"));
        }
        let discarded = self.recorded_len();
        if self.is_recording() {
            log::warn!("Recording discarded ({discarded} frames) by switching to playback");
        }

        source.reset();
        log::info!("Playback started: {} pairs, {:?} per frame", source.len(), source.interval());
        // Replacing the session drops the recorder and anything it buffered.
        self.session = Session::Playback { source };
        self.last_pair = None;
        Ok(discarded)
    }

    pub fn resume_preview(&mut self) -> Result<(), SessionError> {
        if self.mode() != Mode::Playback {
            return Err(self.not_allowed("Preview"));
        }
        self.session = Session::Preview { recorder: RecordingBuffer::new() };
        log::info!("Live preview resumed");
        Ok(())
    }

    pub fn set_ratios(&mut self, ratios: Ratios) {
        self.ratios = ratios.clamped();
        self.relayout();
    }

    pub fn resize_canvas(&mut self, width: u32, height: u32) {
        if self.canvas != (width, height) {
            self.canvas = (width, height);
            self.relayout();
        }
    }

    fn relayout(&mut self) {
        self.layout = layout::compute(self.canvas.0, self.canvas.1, &self.ratios);
        log::debug!("Layout for {:?}: {:?}", self.canvas, self.layout);
    }

    fn overlay(&self) -> Overlay {
        Overlay { mode_label: self.mode().label(), recording: self.is_recording() }
    }

    fn not_allowed(&self, request: &'static str) -> SessionError {
        SessionError::NotAllowed { request, state: self.state_label() }
    }
}

impl<C, R> FrameLoop<C, R> {
    pub fn mode(&self) -> Mode {
        match self.session {
            Session::Preview { .. } => Mode::Preview,
            Session::Playback { .. } => Mode::Playback,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(&self.session, Session::Preview { recorder } if recorder.is_recording())
    }

    /// Pairs buffered by the current recording so far.
    pub fn recorded_len(&self) -> usize {
        match &self.session {
            Session::Preview { recorder } => recorder.len(),
            Session::Playback { .. } => 0,
        }
    }

    /// Human-readable state, used in "not available while ..." messages.
    pub fn state_label(&self) -> &'static str {
        match self.mode() {
            Mode::Preview if self.is_recording() => "recording",
            Mode::Preview => "previewing",
            Mode::Playback => "playing back",
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Last pair shown in live preview; cleared when playback starts.
    pub fn last_pair(&self) -> Option<&StereoPair> {
        self.last_pair.as_ref()
    }

    pub fn ratios(&self) -> Ratios {
        self.ratios
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn capture(&self) -> &C {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut C {
        &mut self.capture
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::FrameBuffer;
    use std::collections::VecDeque;

    /// Camera double: replays queued results, then keeps failing.
    struct FakeCamera {
        frames: VecDeque<Result<FrameBuffer, Error>>,
    }

    impl LiveCapture for FakeCamera {
        fn read_frame(&mut self) -> Result<FrameBuffer, Error> {
            self.frames
                .pop_front()
                .unwrap_or_else(|| Err(Error::CameraFrame("no frame".into())))
        }

        fn frame_rate(&self) -> u32 {
            25
        }
    }

    #[derive(Default)]
    struct Recorder {
        shown: Vec<(StereoPair, Overlay)>,
    }

    impl Renderer for Recorder {
        fn render(&mut self, pair: &StereoPair, _layout: &Layout, overlay: &Overlay) -> Result<(), Error> {
            self.shown.push((pair.clone(), *overlay));
            Ok(())
        }
    }

    fn frame(tag: u32) -> FrameBuffer {
        FrameBuffer::filled(4, 2, tag)
    }

    fn frame_loop(frames: Vec<Result<FrameBuffer, Error>>) -> FrameLoop<FakeCamera, Recorder> {
        let camera = FakeCamera { frames: frames.into() };
        FrameLoop::new(camera, Recorder::default(), Ratios::default(), (1000, 500), Duration::from_millis(100))
    }

    #[test]
    fn preview_tick_splits_and_renders() {
        let mut fl = frame_loop(vec![Ok(frame(1))]);
        assert_eq!(fl.tick(), TickOutcome::Rendered { next: Duration::from_millis(40) });

        let (pair, overlay) = &fl.renderer().shown[0];
        assert_eq!(pair.left.dimensions(), (2, 2));
        assert_eq!(overlay.mode_label, "PREVIEW");
        assert!(fl.last_pair().is_some());
    }

    #[test]
    fn capture_failure_backs_off_without_touching_recording() {
        let mut fl = frame_loop(vec![Ok(frame(1)), Err(Error::CameraFrame("usb".into())), Ok(frame(2))]);
        fl.start_recording().unwrap();

        fl.tick();
        assert_eq!(fl.tick(), TickOutcome::CaptureFailed { retry_in: Duration::from_millis(100) });
        assert!(fl.is_recording());
        assert_eq!(fl.recorded_len(), 1);

        fl.tick();
        assert_eq!(fl.renderer().shown.len(), 2);
        assert_eq!(fl.stop_recording().unwrap().len(), 2);
    }

    #[test]
    fn recorded_frames_leave_the_recording_running() {
        let mut fl = frame_loop(vec![Ok(frame(1)), Ok(frame(2))]);
        assert!(fl.recorded_frames().is_err());

        fl.start_recording().unwrap();
        fl.tick();
        assert_eq!(fl.recorded_frames().unwrap().len(), 1);
        assert!(fl.is_recording());

        fl.tick();
        assert_eq!(fl.stop_recording().unwrap().len(), 2);
    }

    #[test]
    fn recording_is_discarded_by_playback() {
        let mut fl = frame_loop(vec![Ok(frame(1)), Ok(frame(2))]);
        fl.start_recording().unwrap();
        fl.tick();
        fl.tick();

        let pair = StereoPair::new(FrameBuffer::new(2, 2), FrameBuffer::new(2, 2));
        let source = PlaybackSource::still(pair, Duration::from_millis(40)).unwrap();
        assert_eq!(fl.enter_playback(source), Ok(2));
        assert_eq!(fl.mode(), Mode::Playback);
        assert!(!fl.is_recording());

        fl.resume_preview().unwrap();
        assert_eq!(fl.mode(), Mode::Preview);
        assert!(!fl.is_recording());
        assert_eq!(fl.recorded_len(), 0);
    }

    #[test]
    fn playback_ticks_use_the_source_interval() {
        let mut fl = frame_loop(vec![]);
        let frames = |n: u32| (0..n).map(|i| Ok(FrameBuffer::filled(2, 2, i))).collect::<Vec<_>>();
        let source = PlaybackSource::from_streams(frames(2), frames(2), 10.0).unwrap();
        fl.enter_playback(source).unwrap();

        for _ in 0..3 {
            assert_eq!(fl.tick(), TickOutcome::Rendered { next: Duration::from_millis(100) });
        }
        let shown: Vec<u32> = fl.renderer().shown.iter().map(|(p, _)| p.left.pixels[0]).collect();
        assert_eq!(shown, vec![0, 1, 0]);
        assert_eq!(fl.renderer().shown[0].1.mode_label, "PLAYBACK");
    }

    #[test]
    fn requests_outside_their_state_are_rejected() {
        let mut fl = frame_loop(vec![]);
        assert!(fl.stop_recording().is_err());
        assert!(fl.resume_preview().is_err());

        fl.start_recording().unwrap();
        assert_eq!(
            fl.start_recording(),
            Err(SessionError::NotAllowed { request: "Recording", state: "recording" })
        );
    }

    #[test]
    fn layout_follows_ratios_and_canvas() {
        let mut fl = frame_loop(vec![]);
        assert_eq!(fl.layout().viewport_size, 300);

        fl.set_ratios(Ratios::new(0.5, 0.5, 0.0));
        assert_eq!(fl.layout().viewport_size, 500);

        fl.resize_canvas(200, 100);
        assert_eq!(fl.layout().viewport_size, 100);
        assert_eq!(fl.layout().center_y, 50);
    }
}
