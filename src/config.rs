// Configuration for the stereo rig, stored as TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::camera::CameraSettings;
use crate::error::ConfigError;
use crate::layout::Ratios;
use crate::media::StillFormat;
use crate::render::ResizeFilter;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera device index (0 = default webcam)
    pub camera_index: u32,

    /// Requested capture size of the combined side-by-side frame
    pub capture_width: u32,
    pub capture_height: u32,

    /// Requested capture rate; the device may pick another
    pub capture_fps: u32,

    /// Folder used by capture, stop & save and load.
    /// When unset those requests are treated as cancelled.
    pub media_dir: Option<PathBuf>,

    /// File format for captured stills
    pub still_format: StillFormat,

    /// JPEG quality (1-100) of recorded video frames
    pub jpeg_quality: u8,

    /// Wait before retrying after a failed camera read
    pub retry_backoff_ms: u64,

    /// Filter used to scale each eye into its viewport
    pub resize_filter: ResizeFilter,

    /// Initial window size
    pub window_width: usize,
    pub window_height: usize,

    /// Display ratios at startup
    pub ratios: Ratios,

    /// Sensor settings per eye
    pub left_camera: CameraSettings,
    pub right_camera: CameraSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_index: 0,
            capture_width: 1280,
            capture_height: 480,
            capture_fps: 30,
            media_dir: default_media_dir(),
            still_format: StillFormat::default(),
            jpeg_quality: 90,
            retry_backoff_ms: 100,
            resize_filter: ResizeFilter::default(),
            window_width: 1280,
            window_height: 640,
            ratios: Ratios::default(),
            left_camera: CameraSettings::default(),
            right_camera: CameraSettings::default(),
        }
    }
}

impl Config {
    /// Load config from `path` (or the default location) or return defaults
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Self::default(),
            },
        };

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config.sanitized())
    }

    /// Save config to disk
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Force every value into the range the rest of the program expects.
    pub fn sanitized(mut self) -> Self {
        self.capture_fps = self.capture_fps.max(1);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self.ratios = self.ratios.clamped();
        self.window_width = self.window_width.max(1);
        self.window_height = self.window_height.max(1);
        self.left_camera = self.left_camera.clamped();
        self.right_camera = self.right_camera.clamped();
        self
    }
}

/// `<config dir>/stereo-rig/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stereo-rig").join("config.toml"))
}

fn default_media_dir() -> Option<PathBuf> {
    dirs::picture_dir().map(|p| p.join("StereoRig"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "camera_index = 2\nstill_format = \"jpg\"\n\n[ratios]\nsize = 0.45\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.camera_index, 2);
        assert_eq!(config.still_format, StillFormat::Jpg);
        assert_eq!(config.ratios, Ratios { size: 0.45, spacing: 0.5, offset: 0.0 });
        assert_eq!(config.retry_backoff_ms, 100);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "jpeg_quality = 0\n[ratios]\noffset = 3.0\n[left_camera]\nexposure = 500\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.jpeg_quality, 1);
        assert_eq!(config.ratios.offset, 0.25);
        assert_eq!(config.left_camera.exposure, 100);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "camera_index = \"not a number\"").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
        assert_eq!(Config::load_or_default(Some(&path)), Config::default());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            media_dir: Some(dir.path().to_path_buf()),
            resize_filter: ResizeFilter::Lanczos3,
            ..Config::default()
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
