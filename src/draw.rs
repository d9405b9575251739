// Window + software drawing utilities.
// Visual effects provided here:
// 1) A resizable window showing the two eyes side by side.
// 2) A red "REC" marker while a recording is running.
// 3) A tiny 5x7 bitmap font for the mode/FPS/status HUD.

use crate::controller::Request;
use crate::error::Error;
use crate::layout::{Layout, RatioKind, Ratios};
use crate::render::{Compositor, Overlay, Renderer, ResizeFilter};
use crate::types::{FrameBuffer, StereoPair};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

const HUD_COLOR: u32 = 0x00_FF_FF_FF;
const REC_COLOR: u32 = 0x00_FF_20_20;

/// Keys that nudge a display ratio by one slider step.
const RATIO_KEYS: [(Key, RatioKind, i32); 6] = [
    (Key::Key1, RatioKind::Size, -1),
    (Key::Key2, RatioKind::Size, 1),
    (Key::Key3, RatioKind::Spacing, -1),
    (Key::Key4, RatioKind::Spacing, 1),
    (Key::Key5, RatioKind::Offset, -1),
    (Key::Key6, RatioKind::Offset, 1),
];

pub struct Drawer {
    window: Window, // the on-screen window you see
    compositor: Compositor,
    fps_text: String,
    status: String,
}

impl Drawer {
    /// Create a resizable window.
    /// Visual: a new black window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize, filter: ResizeFilter) -> Result<Self, Error> {
        let options = WindowOptions { resize: true, ..WindowOptions::default() };
        let window = Window::new(title, width, height, options).map_err(|e| Error::WindowInit(e.to_string()))?;
        Ok(Self {
            window,
            compositor: Compositor::new(filter),
            fps_text: String::from("FPS: 0.0"),
            status: String::new(),
        })
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// True while ESC is held down (we'll exit when this is pressed).
    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Current drawable size in pixels; changes when the user resizes the window.
    pub fn canvas_size(&self) -> (usize, usize) {
        self.window.get_size()
    }

    /// Process window events between ticks without presenting a new frame.
    pub fn pump(&mut self) {
        self.window.update();
    }

    pub fn set_fps(&mut self, fps: f32) {
        self.fps_text = format!("FPS: {fps:.1}");
    }

    /// Visual: replaces the bottom HUD line (errors, "saved ..." notices).
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    /// Translate key presses since the last update into session requests.
    pub fn poll_requests(&self, ratios: &Ratios) -> Vec<Request> {
        let mut requests = Vec::new();
        let pressed = |key| self.window.is_key_pressed(key, KeyRepeat::No);

        if pressed(Key::C) {
            requests.push(Request::CaptureStill);
        }
        if pressed(Key::R) {
            requests.push(Request::StartRecording);
        }
        if pressed(Key::S) {
            requests.push(Request::StopAndSave);
        }
        if pressed(Key::L) {
            requests.push(Request::LoadMedia);
        }
        if pressed(Key::P) {
            requests.push(Request::ResumePreview);
        }

        let mut updated = *ratios;
        for (key, kind, steps) in RATIO_KEYS {
            if self.window.is_key_pressed(key, KeyRepeat::Yes) {
                updated.nudge(kind, steps);
            }
        }
        if updated != *ratios {
            requests.push(Request::UpdateRatios(updated));
        }
        requests
    }
}

impl Renderer for Drawer {
    /// Visual: the window immediately shows the new pair plus the HUD.
    fn render(&mut self, pair: &StereoPair, layout: &Layout, overlay: &Overlay) -> Result<(), Error> {
        let (w, h) = self.canvas_size();
        let canvas = self.compositor.compose(w, h, pair, layout);

        if overlay.recording {
            fill_disc(canvas, 24, 24, 5, REC_COLOR);
            draw_text_5x7(canvas, 34, 21, "REC", REC_COLOR);
        }
        let hud = format!("{} | {}", overlay.mode_label, self.fps_text);
        let bottom = h as i32 - 12;
        draw_text_5x7(canvas, 8, bottom - 10, &hud, HUD_COLOR);
        draw_text_5x7(canvas, 8, bottom, &self.status, HUD_COLOR);

        self.window
            .update_with_buffer(&canvas.pixels, canvas.width, canvas.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }
}

/* ---------- Software drawing: pixels, discs, tiny bitmap font ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Solid circle centered at (cx,cy).
pub fn fill_disc(fb: &mut FrameBuffer, cx: i32, cy: i32, radius: i32, color: u32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel(fb, cx + dx, cy + dy, color);
            }
        }
    }
}

/* ---------- 5x7 bitmap font (uppercase ASCII subset) ---------- */

/// Return a 5x7 glyph bitmap for a limited character set.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    // Helper macro to define a glyph quickly
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch {
        // Digits 0..9
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        // Letters
        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        // Punctuation
        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        ',' => g!(0b00000,0b00000,0b00000,0b00000,0b00110,0b00100,0b01000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '_' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b11111),
        '/' => g!(0b00001,0b00010,0b00010,0b00100,0b01000,0b01000,0b10000),
        '(' => g!(0b00010,0b00100,0b01000,0b01000,0b01000,0b00100,0b00010),
        ')' => g!(0b01000,0b00100,0b00010,0b00010,0b00010,0b00100,0b01000),
        '!' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00000,0b00100),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y).
/// Visual: a tiny glyph appears with a 1-pixel black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    if let Some(rows) = glyph5x7(ch) {
        // Shadow pass first, glyph on top
        for (dx, dy, c) in [(1, 1, 0x00000000), (0, 0, color)] {
            for (ry, rowbits) in rows.iter().enumerate() {
                for rx in 0..5 {
                    if (rowbits & (1 << (4 - rx))) != 0 {
                        put_pixel(fb, x + rx as i32 + dx, y + ry as i32 + dy, c);
                    }
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs; lowercase is shown as uppercase and
/// characters without a glyph are skipped (but still advance the cursor).
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch.to_ascii_uppercase(), color);
        x += 6; // 5 pixels glyph width + 1 pixel spacing
    }
}
