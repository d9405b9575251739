// Saving stills/recordings to a folder and loading a folder back as a
// playback source.
//
// Files on disk:
//   {timestamp}_left_image.png  / {timestamp}_right_image.png   (stills)
//   {timestamp}_left_video.avi  / {timestamp}_right_video.avi   (recordings)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::avi::{AviReader, AviWriter};
use crate::error::{CodecError, LoadError, SaveError};
use crate::playback::PlaybackSource;
use crate::types::{FrameBuffer, Side, StereoPair};

const STILL_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const VIDEO_EXTENSIONS: [&str; 1] = ["avi"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StillFormat {
    #[default]
    Png,
    Jpg,
}

impl StillFormat {
    pub fn extension(self) -> &'static str {
        match self {
            StillFormat::Png => "png",
            StillFormat::Jpg => "jpg",
        }
    }
}

/// The two files written by one save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedFiles {
    pub left: PathBuf,
    pub right: PathBuf,
    pub frames: usize,
}

/// Local time as used in file names, e.g. `20241018_142501`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

pub fn still_path(folder: &Path, stamp: &str, side: Side, format: StillFormat) -> PathBuf {
    folder.join(format!("{stamp}_{}_image.{}", side.label(), format.extension()))
}

pub fn video_path(folder: &Path, stamp: &str, side: Side) -> PathBuf {
    folder.join(format!("{stamp}_{}_video.avi", side.label()))
}

/// Write the pair as two still images.
pub fn save_still_pair(
    folder: &Path,
    stamp: &str,
    pair: &StereoPair,
    format: StillFormat,
) -> Result<SavedFiles, SaveError> {
    fs::create_dir_all(folder)?;
    let [left, right] = Side::BOTH.map(|side| still_path(folder, stamp, side, format));
    for (side, path) in [(Side::Left, &left), (Side::Right, &right)] {
        if let Err(e) = pair.get(side).to_rgb_image().save(path) {
            remove_partial(&left);
            remove_partial(&right);
            return Err(CodecError::from(e).into());
        }
    }
    log::info!("Saved stereo images: {} and {}", left.display(), right.display());
    Ok(SavedFiles { left, right, frames: 1 })
}

/// Write a recording as two synchronized MJPEG AVI files.
/// An empty recording writes nothing, and a failed save leaves no half pair behind.
pub fn save_recording(
    folder: &Path,
    stamp: &str,
    pairs: &[StereoPair],
    fps: u32,
    jpeg_quality: u8,
) -> Result<SavedFiles, SaveError> {
    let Some(first) = pairs.first() else {
        return Err(SaveError::NothingToSave);
    };
    let (width, height) = first.left.dimensions();
    fs::create_dir_all(folder)?;

    let write_side = |side: Side| -> Result<PathBuf, SaveError> {
        let mut writer = AviWriter::new(video_path(folder, stamp, side), width, height, fps, jpeg_quality);
        for pair in pairs {
            writer.push(pair.get(side))?;
        }
        Ok(writer.finish()?)
    };
    let left = write_side(Side::Left).inspect_err(|_| {
        remove_partial(&video_path(folder, stamp, Side::Left));
    })?;
    let right = write_side(Side::Right).inspect_err(|_| {
        remove_partial(&left);
        remove_partial(&video_path(folder, stamp, Side::Right));
    })?;

    log::info!("Saved stereo videos: {} and {} ({} frames)", left.display(), right.display(), pairs.len());
    Ok(SavedFiles { left, right, frames: pairs.len() })
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!("Removed partial file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove partial file {}: {e}", path.display()),
    }
}

/// Find the left and right media files in `folder`.
/// Names are scanned in sorted order; the first name containing "left" is the
/// left file and the first other name containing "right" is the right file.
/// With timestamped names this is the oldest pair in the folder.
pub fn find_pair_files(folder: &Path) -> Result<(PathBuf, PathBuf), LoadError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => log::debug!("Skipping non UTF-8 file name {name:?}"),
        }
    }
    names.sort();

    let mut left = None;
    let mut right = None;
    for name in names {
        if name.contains("left") {
            left.get_or_insert(name);
        } else if name.contains("right") {
            right.get_or_insert(name);
        }
    }

    let missing = |side| LoadError::MissingFile { side, folder: folder.to_path_buf() };
    let left = left.ok_or_else(|| missing(Side::Left))?;
    let right = right.ok_or_else(|| missing(Side::Right))?;
    Ok((folder.join(left), folder.join(right)))
}

/// Load a folder as a playback source; see `find_pair_files` for which
/// pair is picked when the folder holds several.
pub fn load_pair(folder: &Path, live_interval: Duration) -> Result<PlaybackSource, LoadError> {
    let (left, right) = find_pair_files(folder)?;
    load_pair_files(&left, &right, live_interval)
}

/// The left file's extension decides whether this is a still pair or a video pair.
pub fn load_pair_files(left: &Path, right: &Path, live_interval: Duration) -> Result<PlaybackSource, LoadError> {
    let ext = left
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let source = if STILL_EXTENSIONS.contains(&ext.as_str()) {
        let pair = StereoPair::new(load_still(left)?, load_still(right)?);
        PlaybackSource::still(pair, live_interval)?
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        let left_stream = AviReader::open(left)?;
        let right_stream = AviReader::open(right)?;
        log::debug!(
            "Left stream {:?}, right stream {:?}",
            left_stream.info(),
            right_stream.info()
        );
        PlaybackSource::from_streams(left_stream.frames(), right_stream.frames(), left_stream.declared_fps())?
    } else {
        return Err(LoadError::UnsupportedFormat(ext));
    };

    log::info!("Loaded stereo media: {} and {}", left.display(), right.display());
    Ok(source)
}

fn load_still(path: &Path) -> Result<FrameBuffer, CodecError> {
    let img = image::open(path)?;
    Ok(FrameBuffer::from_rgb_image(&img.to_rgb8()))
}
