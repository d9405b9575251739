// Composes a stereo pair onto the canvas at the positions the layout asks for.
// Visual: black background, two square viewports centered on
// (left_center_x, center_y) and (right_center_x, center_y).

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::layout::Layout;
use crate::types::{FrameBuffer, StereoPair};

/// What the HUD needs to know about the session this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overlay {
    pub mode_label: &'static str,
    pub recording: bool,
}

/// Anything that can put a stereo pair in front of the user.
pub trait Renderer {
    fn render(&mut self, pair: &StereoPair, layout: &Layout, overlay: &Overlay) -> Result<(), Error>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Double-buffered canvas: each tick draws into the back buffer, then the
/// buffers swap. Both allocations are reused until the canvas size changes.
pub struct Compositor {
    front: FrameBuffer,
    back: FrameBuffer,
    filter: ResizeFilter,
}

impl Compositor {
    pub fn new(filter: ResizeFilter) -> Self {
        Self {
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            filter,
        }
    }

    /// Draw `pair` on a `width×height` canvas and make it the front buffer.
    pub fn compose(&mut self, width: usize, height: usize, pair: &StereoPair, layout: &Layout) -> &mut FrameBuffer {
        let back = &mut self.back;
        back.width = width;
        back.height = height;
        back.pixels.clear();
        back.pixels.resize(width * height, 0);

        let size = layout.viewport_size;
        blit_scaled(back, &pair.left, layout.left_center_x, layout.center_y, size, self.filter);
        blit_scaled(back, &pair.right, layout.right_center_x, layout.center_y, size, self.filter);

        std::mem::swap(&mut self.front, &mut self.back);
        &mut self.front
    }

    /// The most recently composed canvas.
    pub fn front(&self) -> &FrameBuffer {
        &self.front
    }
}

/// Scale `src` to `size×size` and copy it centered on (cx,cy), clipped to `dst`.
fn blit_scaled(dst: &mut FrameBuffer, src: &FrameBuffer, cx: i64, cy: i64, size: u32, filter: ResizeFilter) {
    if src.is_empty() || dst.is_empty() {
        return;
    }
    let scaled;
    let view = if src.width == size as usize && src.height == size as usize {
        src
    } else {
        let img = imageops::resize(&src.to_rgb_image(), size, size, filter.into());
        scaled = FrameBuffer::from_rgb_image(&img);
        &scaled
    };

    let left = cx - (size / 2) as i64;
    let top = cy - (size / 2) as i64;
    for sy in 0..view.height {
        let dy = top + sy as i64;
        if dy < 0 || dy >= dst.height as i64 {
            continue;
        }
        // Horizontal clip, then copy the visible run in one go.
        let x0 = left.max(0);
        let x1 = (left + view.width as i64).min(dst.width as i64);
        if x0 >= x1 {
            return;
        }
        let src_start = sy * view.width + (x0 - left) as usize;
        let dst_start = dy as usize * dst.width + x0 as usize;
        let run = (x1 - x0) as usize;
        dst.pixels[dst_start..dst_start + run].copy_from_slice(&view.pixels[src_start..src_start + run]);
    }
}
