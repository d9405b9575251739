// cli.rs - Command-line overrides on top of the config file
use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "stereo-rig")]
#[command(about = "Stereo camera preview, recording and playback", long_about = None)]
pub struct Cli {
    /// Camera device index
    #[arg(long)]
    pub camera: Option<u32>,

    /// Requested capture width of the combined frame
    #[arg(long)]
    pub width: Option<u32>,

    /// Requested capture height
    #[arg(long)]
    pub height: Option<u32>,

    /// Folder for saved and loaded media
    #[arg(long = "media-dir")]
    pub media_dir: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the effective config to the config path and exit
    #[arg(long = "write-config", default_value = "false")]
    pub write_config: bool,
}

impl Cli {
    /// Flags given on the command line win over the config file.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(camera) = self.camera {
            config.camera_index = camera;
        }
        if let Some(width) = self.width {
            config.capture_width = width;
        }
        if let Some(height) = self.height {
            config.capture_height = height;
        }
        if let Some(dir) = &self.media_dir {
            config.media_dir = Some(dir.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from(["stereo-rig", "--camera", "1", "--width", "2560", "--media-dir", "/tmp/shots"]);
        let config = cli.apply(Config { capture_height: 720, ..Config::default() });

        assert_eq!(config.camera_index, 1);
        assert_eq!(config.capture_width, 2560);
        assert_eq!(config.capture_height, 720);
        assert_eq!(config.media_dir, Some(PathBuf::from("/tmp/shots")));
        assert!(!cli.write_config);
    }

    #[test]
    fn no_flags_changes_nothing() {
        let config = Config::default();
        assert_eq!(Cli::parse_from(["stereo-rig"]).apply(config.clone()), config);
    }
}
