// Core pixel types shared by capture, splitting, rendering and the codec.

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// One raw or derived video frame.
/// Visual: exactly what minifb can push to the screen, row by row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is (pixels)
    pub height: usize,     // how tall the frame is (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// A black frame of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self { width, height, pixels: vec![color; width * height] }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    /// Copy out the `w×h` rectangle whose top-left corner is (x,y).
    /// The rectangle must lie inside the frame.
    pub fn crop(&self, x: usize, y: usize, w: usize, h: usize) -> FrameBuffer {
        debug_assert!(x + w <= self.width && y + h <= self.height);
        let mut pixels = Vec::with_capacity(w * h);
        for row in y..y + h {
            let start = row * self.width + x;
            pixels.extend_from_slice(&self.pixels[start..start + w]);
        }
        FrameBuffer { width: w, height: h, pixels }
    }

    /// Unpack to an RGB8 image so the `image` crate can resize or encode it.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Rgb(unpack_rgb(self.pixel(x as usize, y as usize)))
        })
    }

    /// Pack an RGB8 image into 0x00RRGGBB pixels.
    pub fn from_rgb_image(img: &RgbImage) -> Self {
        let (w, h) = img.dimensions();
        let mut pixels = Vec::with_capacity((w as usize) * (h as usize));
        for pixel in img.pixels() {
            pixels.push(pack_rgb(pixel[0], pixel[1], pixel[2]));
        }
        FrameBuffer { width: w as usize, height: h as usize, pixels }
    }
}

#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

#[inline]
pub fn unpack_rgb(px: u32) -> [u8; 3] {
    [((px >> 16) & 0xFF) as u8, ((px >> 8) & 0xFF) as u8, (px & 0xFF) as u8]
}

/// Two views captured (or loaded) at the same logical instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StereoPair {
    pub left: FrameBuffer,
    pub right: FrameBuffer,
}

impl StereoPair {
    pub fn new(left: FrameBuffer, right: FrameBuffer) -> Self {
        Self { left, right }
    }

    pub fn get(&self, side: Side) -> &FrameBuffer {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// Which eye of the rig a frame, file or camera setting belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// Lowercase name used in file names and log lines.
    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}
