// User requests (keys on the window) and what each one does to the session.
// Handlers run between ticks; every outcome comes back as a short message
// for the HUD status line.

use std::path::PathBuf;

use crate::camera::LiveCapture;
use crate::error::{RequestError, SaveError, SessionError};
use crate::frame_loop::{FrameLoop, Mode};
use crate::layout::Ratios;
use crate::media::{self, StillFormat};
use crate::render::Renderer;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Request {
    CaptureStill,
    StartRecording,
    StopAndSave,
    LoadMedia,
    ResumePreview,
    UpdateRatios(Ratios),
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::CaptureStill => "Capture",
            Request::StartRecording => "Recording",
            Request::StopAndSave => "Stop & save",
            Request::LoadMedia => "Loading media",
            Request::ResumePreview => "Preview",
            Request::UpdateRatios(_) => "Ratio update",
        }
    }

    /// Which requests the control panel would have enabled in this state.
    pub fn is_available(&self, mode: Mode, recording: bool) -> bool {
        match self {
            Request::CaptureStill | Request::StartRecording => mode == Mode::Preview && !recording,
            Request::StopAndSave => mode == Mode::Preview && recording,
            Request::LoadMedia => mode == Mode::Preview,
            Request::ResumePreview => mode == Mode::Playback,
            Request::UpdateRatios(_) => true,
        }
    }
}

/// What the save/load requests need from the folder chooser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FolderPurpose {
    Save,
    Load,
}

/// Asks the user for a folder. `None` means the user cancelled.
pub trait FolderPicker {
    fn pick_folder(&mut self, purpose: FolderPurpose) -> Option<PathBuf>;
}

/// Always answers with the folder from the config file (or cancels when unset).
#[derive(Clone, Debug, Default)]
pub struct ConfiguredFolder(pub Option<PathBuf>);

impl FolderPicker for ConfiguredFolder {
    fn pick_folder(&mut self, purpose: FolderPurpose) -> Option<PathBuf> {
        if self.0.is_none() {
            log::info!("No media folder configured; {purpose:?} request cancelled");
        }
        self.0.clone()
    }
}

pub struct Controller<P> {
    picker: P,
    still_format: StillFormat,
    jpeg_quality: u8,
}

impl<P: FolderPicker> Controller<P> {
    pub fn new(picker: P, still_format: StillFormat, jpeg_quality: u8) -> Self {
        Self { picker, still_format, jpeg_quality }
    }

    /// Apply one request. `Ok(None)` means there is nothing to tell the user
    /// (ratio tweaks, cancelled folder selection).
    pub fn handle<C: LiveCapture, R: Renderer>(
        &mut self,
        session: &mut FrameLoop<C, R>,
        request: Request,
    ) -> Result<Option<String>, RequestError> {
        if !request.is_available(session.mode(), session.is_recording()) {
            return Err(SessionError::NotAllowed { request: request.name(), state: session.state_label() }.into());
        }

        match request {
            Request::CaptureStill => self.capture_still(session),
            Request::StartRecording => {
                session.start_recording()?;
                Ok(Some("Recording...".to_string()))
            }
            Request::StopAndSave => self.stop_and_save(session),
            Request::LoadMedia => self.load_media(session),
            Request::ResumePreview => {
                session.resume_preview()?;
                Ok(Some("Live preview".to_string()))
            }
            Request::UpdateRatios(ratios) => {
                session.set_ratios(ratios);
                Ok(None)
            }
        }
    }

    /// Like `handle`, but folds errors into the message and logs them.
    pub fn handle_and_report<C: LiveCapture, R: Renderer>(
        &mut self,
        session: &mut FrameLoop<C, R>,
        request: Request,
    ) -> Option<String> {
        match self.handle(session, request) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("{} request failed: {e}", request.name());
                Some(e.to_string())
            }
        }
    }

    fn capture_still<C: LiveCapture, R: Renderer>(
        &mut self,
        session: &mut FrameLoop<C, R>,
    ) -> Result<Option<String>, RequestError> {
        let Some(folder) = self.picker.pick_folder(FolderPurpose::Save) else {
            return Ok(None);
        };
        let pair = session.last_pair().ok_or(SaveError::NoFrame)?;
        media::save_still_pair(&folder, &media::timestamp(), pair, self.still_format)?;
        Ok(Some(format!("Saved images to {}", folder.display())))
    }

    /// The folder is chosen before the recording stops, so cancelling keeps it running.
    /// The recording only ends once the files are written (or there was nothing
    /// to write); any other failure keeps it running with every frame intact.
    fn stop_and_save<C: LiveCapture, R: Renderer>(
        &mut self,
        session: &mut FrameLoop<C, R>,
    ) -> Result<Option<String>, RequestError> {
        let Some(folder) = self.picker.pick_folder(FolderPurpose::Save) else {
            return Ok(None);
        };
        let fps = session.capture().frame_rate();
        let frames = session.recorded_frames()?;
        match media::save_recording(&folder, &media::timestamp(), frames, fps, self.jpeg_quality) {
            Ok(saved) => {
                session.stop_recording()?;
                Ok(Some(format!("Saved {} frames to {}", saved.frames, folder.display())))
            }
            Err(SaveError::NothingToSave) => {
                session.stop_recording()?;
                Err(SaveError::NothingToSave.into())
            }
            Err(e) => {
                log::warn!("Save failed, still recording with {} frames buffered", session.recorded_len());
                Err(e.into())
            }
        }
    }

    fn load_media<C: LiveCapture, R: Renderer>(
        &mut self,
        session: &mut FrameLoop<C, R>,
    ) -> Result<Option<String>, RequestError> {
        let Some(folder) = self.picker.pick_folder(FolderPurpose::Load) else {
            return Ok(None);
        };
        let (left, right) = media::find_pair_files(&folder)?;
        let source = media::load_pair_files(&left, &right, session.capture().nominal_interval())?;
        let pairs = source.len();
        let discarded = session.enter_playback(source)?;

        // A folder can hold many saves; name the one that was picked.
        let picked = left.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let mut message = format!("Playing {pairs} pairs from {picked}");
        if discarded > 0 {
            message.push_str(&format!(" (recording of {discarded} frames discarded)"));
        }
        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, LoadError};
    use crate::layout::Layout;
    use crate::render::Overlay;
    use crate::types::{FrameBuffer, StereoPair};
    use std::time::Duration;

    struct SteadyCamera;

    impl LiveCapture for SteadyCamera {
        fn read_frame(&mut self) -> Result<FrameBuffer, Error> {
            Ok(FrameBuffer::filled(8, 4, 0x00_40_80_C0))
        }

        fn frame_rate(&self) -> u32 {
            20
        }
    }

    struct NullRenderer;

    impl Renderer for NullRenderer {
        fn render(&mut self, _pair: &StereoPair, _layout: &Layout, _overlay: &Overlay) -> Result<(), Error> {
            Ok(())
        }
    }

    fn session() -> FrameLoop<SteadyCamera, NullRenderer> {
        FrameLoop::new(SteadyCamera, NullRenderer, Ratios::default(), (640, 320), Duration::from_millis(100))
    }

    fn controller(folder: Option<PathBuf>) -> Controller<ConfiguredFolder> {
        Controller::new(ConfiguredFolder(folder), StillFormat::Png, 90)
    }

    fn files_in(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn availability_mirrors_the_control_panel() {
        use Request::*;
        let idle: Vec<_> = [CaptureStill, StartRecording, StopAndSave, LoadMedia, ResumePreview]
            .iter()
            .map(|r| r.is_available(Mode::Preview, false))
            .collect();
        assert_eq!(idle, vec![true, true, false, true, false]);

        assert!(StopAndSave.is_available(Mode::Preview, true));
        assert!(!CaptureStill.is_available(Mode::Preview, true));
        assert!(ResumePreview.is_available(Mode::Playback, false));
        assert!(!LoadMedia.is_available(Mode::Playback, false));
        assert!(UpdateRatios(Ratios::default()).is_available(Mode::Playback, false));
    }

    #[test]
    fn capture_before_first_frame_reports_no_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut fl = session();
        let err = controller(Some(dir.path().to_path_buf()))
            .handle(&mut fl, Request::CaptureStill)
            .unwrap_err();
        assert!(matches!(err, RequestError::Save(SaveError::NoFrame)));
    }

    #[test]
    fn capture_writes_left_and_right_images() {
        let dir = tempfile::tempdir().unwrap();
        let mut fl = session();
        fl.tick();

        let msg = controller(Some(dir.path().to_path_buf())).handle(&mut fl, Request::CaptureStill).unwrap();
        assert!(msg.unwrap().starts_with("Saved images"));
        let names = files_in(dir.path());
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("_left_image.png"));
        assert!(names[1].ends_with("_right_image.png"));
    }

    #[test]
    fn cancelled_folder_changes_nothing() {
        let mut fl = session();
        let mut ctl = controller(None);
        ctl.handle(&mut fl, Request::StartRecording).unwrap();
        fl.tick();

        assert_eq!(ctl.handle(&mut fl, Request::StopAndSave).unwrap(), None);
        assert!(fl.is_recording());
        assert_eq!(fl.recorded_len(), 1);

        assert_eq!(ctl.handle(&mut fl, Request::LoadMedia).unwrap(), None);
        assert_eq!(fl.mode(), Mode::Preview);
    }

    #[test]
    fn empty_recording_reports_nothing_to_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut fl = session();
        let mut ctl = controller(Some(dir.path().to_path_buf()));
        ctl.handle(&mut fl, Request::StartRecording).unwrap();

        let err = ctl.handle(&mut fl, Request::StopAndSave).unwrap_err();
        assert!(matches!(err, RequestError::Save(SaveError::NothingToSave)));
        assert!(!fl.is_recording());
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn saving_into_a_new_folder_creates_it() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("StereoRig");
        let mut fl = session();
        let mut ctl = controller(Some(media.clone()));

        ctl.handle(&mut fl, Request::StartRecording).unwrap();
        for _ in 0..3 {
            fl.tick();
        }
        let msg = ctl.handle(&mut fl, Request::StopAndSave).unwrap().unwrap();
        assert!(msg.starts_with("Saved 3 frames"));
        assert!(!fl.is_recording());
        assert_eq!(files_in(&media).len(), 2);

        let other = dir.path().join("stills");
        controller(Some(other.clone())).handle(&mut fl, Request::CaptureStill).unwrap();
        assert_eq!(files_in(&other).len(), 2);
    }

    #[test]
    fn failed_save_keeps_the_recording() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("not_a_dir"), b"").unwrap();
        let mut fl = session();
        let mut ctl = controller(Some(dir.path().join("not_a_dir").join("media")));

        ctl.handle(&mut fl, Request::StartRecording).unwrap();
        for _ in 0..3 {
            fl.tick();
        }
        let err = ctl.handle(&mut fl, Request::StopAndSave).unwrap_err();
        assert!(matches!(err, RequestError::Save(SaveError::Io(_))));
        assert!(fl.is_recording());
        assert_eq!(fl.recorded_len(), 3);

        // a retry into a usable folder still gets every frame
        let mut ctl = controller(Some(dir.path().join("media")));
        let msg = ctl.handle(&mut fl, Request::StopAndSave).unwrap().unwrap();
        assert!(msg.starts_with("Saved 3 frames"));
    }

    #[test]
    fn load_names_the_oldest_pair_in_a_shared_folder() {
        let dir = tempfile::tempdir().unwrap();
        let pair = StereoPair::new(FrameBuffer::filled(4, 4, 1), FrameBuffer::filled(4, 4, 2));
        media::save_still_pair(dir.path(), "20240102_000000", &pair, StillFormat::Png).unwrap();
        media::save_still_pair(dir.path(), "20240101_000000", &pair, StillFormat::Png).unwrap();

        let mut fl = session();
        let msg = controller(Some(dir.path().to_path_buf()))
            .handle(&mut fl, Request::LoadMedia)
            .unwrap()
            .unwrap();
        assert_eq!(msg, "Playing 1 pairs from 20240101_000000_left_image.png");
    }

    #[test]
    fn record_save_load_and_resume() {
        let dir = tempfile::tempdir().unwrap();
        let mut fl = session();
        let mut ctl = controller(Some(dir.path().to_path_buf()));

        ctl.handle(&mut fl, Request::StartRecording).unwrap();
        for _ in 0..3 {
            fl.tick();
        }
        let msg = ctl.handle(&mut fl, Request::StopAndSave).unwrap().unwrap();
        assert!(msg.starts_with("Saved 3 frames"));

        let msg = ctl.handle(&mut fl, Request::LoadMedia).unwrap().unwrap();
        assert!(msg.starts_with("Playing 3 pairs"));
        assert_eq!(fl.mode(), Mode::Playback);

        // 20 fps declared in the stream header
        assert_eq!(fl.tick().delay(), Duration::from_millis(50));

        let err = ctl.handle(&mut fl, Request::StartRecording).unwrap_err();
        assert_eq!(err.to_string(), "Recording is not available while playing back");

        ctl.handle(&mut fl, Request::ResumePreview).unwrap();
        assert_eq!(fl.mode(), Mode::Preview);
    }

    #[test]
    fn loading_while_recording_reports_the_discard() {
        let media = tempfile::tempdir().unwrap();
        let mut fl = session();
        fl.tick();
        controller(Some(media.path().to_path_buf())).handle(&mut fl, Request::CaptureStill).unwrap();

        let mut ctl = controller(Some(media.path().to_path_buf()));
        ctl.handle(&mut fl, Request::StartRecording).unwrap();
        fl.tick();
        fl.tick();

        let msg = ctl.handle(&mut fl, Request::LoadMedia).unwrap().unwrap();
        assert!(msg.ends_with("(recording of 2 frames discarded)"));
        assert!(!fl.is_recording());
        // still pairs repeat at the live rate
        assert_eq!(fl.tick().delay(), Duration::from_millis(50));
    }

    #[test]
    fn load_errors_leave_preview_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut fl = session();
        let err = controller(Some(dir.path().to_path_buf()))
            .handle(&mut fl, Request::LoadMedia)
            .unwrap_err();
        assert!(matches!(err, RequestError::Load(LoadError::MissingFile { .. })));
        assert_eq!(fl.mode(), Mode::Preview);
    }

    #[test]
    fn ratio_updates_are_silent_and_clamped() {
        let mut fl = session();
        let mut ctl = controller(None);
        let out = ctl.handle(&mut fl, Request::UpdateRatios(Ratios { size: 9.0, spacing: 0.5, offset: 0.0 }));
        assert_eq!(out.unwrap(), None);
        assert_eq!(fl.ratios().size, 0.5);
    }
}
