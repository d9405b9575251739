// Motion-JPEG in an AVI container, muxed and demuxed by GStreamer.
//
// Writing: frames are JPEG-encoded with `image`, then pushed through
//   appsrc (image/jpeg) -> avimux -> filesink
// Reading:
//   filesrc -> avidemux -> appsink
// and the JPEG payloads are decoded lazily.

use std::fs;
use std::path::{Path, PathBuf};

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;

use crate::error::CodecError;
use crate::types::FrameBuffer;

/// How long to wait for a pipeline to drain before giving up.
const DRAIN_TIMEOUT_SECS: u64 = 30;

fn init() -> Result<(), CodecError> {
    gst::init().map_err(|e| CodecError::Pipeline(e.to_string()))
}

fn make(factory: &str) -> Result<gst::Element, CodecError> {
    gst::ElementFactory::make(factory)
        .build()
        .map_err(|e| CodecError::Pipeline(format!("Failed to create {factory}: {e}")))
}

/// Pipeline that is set to `Null` however it is left.
struct Running(gst::Pipeline);

impl Running {
    fn start(pipeline: gst::Pipeline) -> Result<Self, CodecError> {
        let running = Self(pipeline);
        running
            .0
            .set_state(gst::State::Playing)
            .map_err(|e| CodecError::Pipeline(format!("Failed to start pipeline: {e:?}")))?;
        Ok(running)
    }

    /// Block until end of stream; the first error message wins.
    fn wait_for_eos(&self) -> Result<(), CodecError> {
        let bus = self
            .0
            .bus()
            .ok_or_else(|| CodecError::Pipeline("pipeline has no bus".into()))?;
        for msg in bus.iter_timed(gst::ClockTime::from_seconds(DRAIN_TIMEOUT_SECS)) {
            match msg.view() {
                gst::MessageView::Eos(..) => return Ok(()),
                gst::MessageView::Error(err) => {
                    return Err(CodecError::Pipeline(format!("{} ({:?})", err.error(), err.debug())));
                }
                _ => {}
            }
        }
        Err(CodecError::Pipeline("timed out waiting for end of stream".into()))
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        let _ = self.0.set_state(gst::State::Null);
    }
}

/// Buffers JPEG-encoded frames and muxes the finished file in one pass.
pub struct AviWriter {
    path: PathBuf,
    width: usize,
    height: usize,
    fps: u32,
    quality: u8,
    chunks: Vec<Vec<u8>>,
}

impl AviWriter {
    pub fn new(path: impl Into<PathBuf>, width: usize, height: usize, fps: u32, quality: u8) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            fps: fps.max(1),
            quality: quality.clamp(1, 100),
            chunks: Vec::new(),
        }
    }

    /// JPEG-encode one frame; every frame must match the stream size.
    pub fn push(&mut self, frame: &FrameBuffer) -> Result<(), CodecError> {
        if frame.is_empty() {
            return Err(CodecError::EmptyFrame);
        }
        if frame.dimensions() != (self.width, self.height) {
            return Err(CodecError::DimensionMismatch {
                expected: (self.width, self.height),
                found: frame.dimensions(),
            });
        }
        let mut jpeg = Vec::with_capacity(self.width * self.height / 4);
        JpegEncoder::new_with_quality(&mut jpeg, self.quality).encode_image(&frame.to_rgb_image())?;
        self.chunks.push(jpeg);
        Ok(())
    }

    pub fn frame_count(&self) -> usize {
        self.chunks.len()
    }

    /// Mux every buffered frame into the file; returns the file path.
    pub fn finish(self) -> Result<PathBuf, CodecError> {
        if self.chunks.is_empty() {
            return Err(CodecError::Pipeline("no frames to write".into()));
        }
        init()?;

        let caps = gst::Caps::builder("image/jpeg")
            .field("width", self.width as i32)
            .field("height", self.height as i32)
            .field("framerate", gst::Fraction::new(self.fps as i32, 1))
            .build();
        let appsrc = gst_app::AppSrc::builder()
            .name("src")
            .caps(&caps)
            .format(gst::Format::Time)
            .build();
        let muxer = make("avimux")?;
        let filesink = gst::ElementFactory::make("filesink")
            .property("location", self.path.to_string_lossy().to_string())
            .property("async", false)
            .build()
            .map_err(|e| CodecError::Pipeline(format!("Failed to create filesink: {e}")))?;

        let pipeline = gst::Pipeline::new();
        pipeline
            .add_many([appsrc.upcast_ref(), &muxer, &filesink])
            .map_err(|e| CodecError::Pipeline(format!("Failed to add elements: {e}")))?;
        gst::Element::link_many([appsrc.upcast_ref(), &muxer, &filesink])
            .map_err(|e| CodecError::Pipeline(format!("Failed to link elements: {e}")))?;
        let running = Running::start(pipeline)?;

        let frame_ns = 1_000_000_000 / u64::from(self.fps);
        let count = self.chunks.len();
        for (i, jpeg) in self.chunks.into_iter().enumerate() {
            let mut buffer = gst::Buffer::from_mut_slice(jpeg);
            let buffer_ref = buffer
                .get_mut()
                .ok_or_else(|| CodecError::Pipeline("frame buffer is shared".into()))?;
            buffer_ref.set_pts(gst::ClockTime::from_nseconds(i as u64 * frame_ns));
            buffer_ref.set_duration(gst::ClockTime::from_nseconds(frame_ns));
            appsrc
                .push_buffer(buffer)
                .map_err(|e| CodecError::Pipeline(format!("Failed to push frame {i}: {e:?}")))?;
        }
        appsrc
            .end_of_stream()
            .map_err(|e| CodecError::Pipeline(format!("Failed to send EOS: {e:?}")))?;
        running.wait_for_eos()?;
        drop(running);

        log::debug!("Wrote {count} MJPEG frames to {}", self.path.display());
        Ok(self.path)
    }
}

/// Stream facts from the demuxed caps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AviInfo {
    pub width: u32,
    pub height: u32,
    pub rate: u32,
    pub scale: u32,
    pub frame_count: usize,
}

impl AviInfo {
    /// `rate / scale`; 0 when the stream leaves it undefined.
    pub fn fps(&self) -> f64 {
        if self.scale == 0 { 0.0 } else { self.rate as f64 / self.scale as f64 }
    }
}

/// Demuxes the first video stream of an AVI file; frames are decoded lazily.
pub struct AviReader {
    info: AviInfo,
    chunks: Vec<Vec<u8>>,
}

impl AviReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CodecError> {
        let path = path.as_ref();
        fs::metadata(path)?;
        init()?;

        let filesrc = gst::ElementFactory::make("filesrc")
            .property("location", path.to_string_lossy().to_string())
            .build()
            .map_err(|e| CodecError::Pipeline(format!("Failed to create filesrc: {e}")))?;
        let demuxer = make("avidemux")?;
        let appsink = gst_app::AppSink::builder().name("sink").sync(false).build();

        let pipeline = gst::Pipeline::new();
        pipeline
            .add_many([&filesrc, &demuxer, appsink.upcast_ref()])
            .map_err(|e| CodecError::Pipeline(format!("Failed to add elements: {e}")))?;
        filesrc
            .link(&demuxer)
            .map_err(|e| CodecError::Pipeline(format!("Failed to link filesrc to avidemux: {e}")))?;

        // Only the first video pad reaches the sink; audio and text are left unlinked.
        let appsink_weak = appsink.downgrade();
        demuxer.connect_pad_added(move |_demux, src_pad| {
            let Some(appsink) = appsink_weak.upgrade() else {
                return;
            };
            let caps = src_pad.current_caps().unwrap_or_else(|| src_pad.query_caps(None));
            let Some(name) = caps.structure(0).map(|s| s.name().to_string()) else {
                return;
            };
            if !(name == "image/jpeg" || name.starts_with("video/")) {
                log::debug!("Ignoring AVI stream with caps '{name}'");
                return;
            }
            let Some(sink_pad) = appsink.static_pad("sink") else {
                return;
            };
            if !sink_pad.is_linked() {
                if let Err(e) = src_pad.link(&sink_pad) {
                    log::warn!("Failed to link video pad: {e:?}");
                }
            }
        });

        let running = Running::start(pipeline)?;
        running.wait_for_eos()?;

        let caps = appsink.static_pad("sink").and_then(|pad| pad.current_caps());
        let mut chunks = Vec::new();
        while let Some(sample) = appsink.try_pull_sample(gst::ClockTime::ZERO) {
            let buffer = sample
                .buffer()
                .ok_or_else(|| CodecError::Malformed("sample without a buffer".into()))?;
            let map = buffer
                .map_readable()
                .map_err(|e| CodecError::Pipeline(format!("Failed to map frame: {e}")))?;
            chunks.push(map.as_slice().to_vec());
        }
        drop(running);

        let info = stream_info(caps.as_ref(), chunks.len())?;
        Ok(Self { info, chunks })
    }

    pub fn info(&self) -> &AviInfo {
        &self.info
    }

    pub fn declared_fps(&self) -> f64 {
        self.info.fps()
    }

    pub fn frame_count(&self) -> usize {
        self.chunks.len()
    }

    /// Decode frames in stream order.
    pub fn frames(&self) -> impl Iterator<Item = Result<FrameBuffer, CodecError>> + '_ {
        self.chunks.iter().map(|chunk| decode_jpeg(chunk))
    }
}

/// Size and `framerate` fraction of a demuxed stream. No caps means no frames
/// ever arrived, which reads as an empty stream with an undefined rate.
fn stream_info(caps: Option<&gst::Caps>, frame_count: usize) -> Result<AviInfo, CodecError> {
    let Some(structure) = caps.and_then(|caps| caps.structure(0)) else {
        return Ok(AviInfo { width: 0, height: 0, rate: 0, scale: 0, frame_count });
    };
    if !structure.has_name("image/jpeg") {
        return Err(CodecError::UnsupportedCodec(structure.name().to_string()));
    }
    let dimension = |field: &str| structure.get::<i32>(field).unwrap_or(0).max(0) as u32;
    let (rate, scale) = structure
        .get::<gst::Fraction>("framerate")
        .map(|f| (f.numer().max(0) as u32, f.denom().max(0) as u32))
        .unwrap_or((0, 0));
    Ok(AviInfo { width: dimension("width"), height: dimension("height"), rate, scale, frame_count })
}

fn decode_jpeg(bytes: &[u8]) -> Result<FrameBuffer, CodecError> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
    Ok(FrameBuffer::from_rgb_image(&img.to_rgb8()))
}
