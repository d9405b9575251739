// What you SEE:
// • A window with the left and right eye side by side, scaled into two squares.
// • C saves a still pair, R starts recording, S stops and saves it.
// • L loads a pair from the media folder and plays it on a loop; P goes back to live.
// • 1/2, 3/4, 5/6 shrink/grow the eyes, their spacing and the horizontal offset.
// • ESC quits.

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;

use stereo_rig::camera::{CameraCapture, CameraControl};
use stereo_rig::cli::Cli;
use stereo_rig::config::{self, Config};
use stereo_rig::controller::{ConfiguredFolder, Controller};
use stereo_rig::draw::Drawer;
use stereo_rig::scheduler::{CancellationToken, Clock, SystemClock, Ticker};
use stereo_rig::{FrameLoop, Side, TickOutcome};

/// Longest sleep between loop turns, so key presses stay responsive.
const MAX_IDLE: Duration = Duration::from_millis(5);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().or_else(config::default_config_path);
    let config = cli.apply(Config::load_or_default(config_path.as_deref()));

    if cli.write_config {
        let path = config_path.context("No config directory on this system; pass --config")?;
        config.save(&path).with_context(|| format!("Writing {}", path.display()))?;
        log::info!("Wrote config to {}", path.display());
        return Ok(());
    }

    /* --- Camera + window setup ---
       Visual: window opens with the live stereo feed. */
    let mut cam = CameraCapture::new(
        config.camera_index,
        config.capture_width,
        config.capture_height,
        config.capture_fps,
    )
    .context("Opening the stereo camera")?;
    for (side, settings) in [(Side::Left, &config.left_camera), (Side::Right, &config.right_camera)] {
        if let Err(e) = cam.apply(side, settings) {
            log::warn!("{e}");
        }
    }

    let drawer = Drawer::new("Stereo Rig", config.window_width, config.window_height, config.resize_filter)
        .context("Opening the window")?;
    let canvas = canvas_dims(drawer.canvas_size());
    let mut session = FrameLoop::new(
        cam,
        drawer,
        config.ratios,
        canvas,
        Duration::from_millis(config.retry_backoff_ms),
    );
    let mut controller = Controller::new(
        ConfiguredFolder(config.media_dir.clone()),
        config.still_format,
        config.jpeg_quality,
    );
    if let Some(dir) = &config.media_dir {
        log::info!("Media folder: {}", dir.display());
    }

    /* --- Tick timer + HUD FPS --- */
    let mut clock = SystemClock;
    let mut ticker = Ticker::new(clock.now(), CancellationToken::new());
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;

    /* ------------------------------ Main loop ------------------------------ */
    while session.renderer().is_open() && !session.renderer().esc_pressed() {
        /* 1) Requests from the keyboard, handled between ticks.
           Visual: the bottom HUD line reports what happened. */
        let requests = session.renderer().poll_requests(&session.ratios());
        for request in requests {
            if let Some(message) = controller.handle_and_report(&mut session, request) {
                session.renderer_mut().set_status(message);
            }
        }

        /* 2) Window resized? Visual: the eyes re-center and re-scale. */
        let (w, h) = canvas_dims(session.renderer().canvas_size());
        session.resize_canvas(w, h);

        /* 3) Run the tick if it is due; it picks its own follow-up delay. */
        let mut outcome = None;
        ticker.poll(&clock, || {
            let tick = session.tick();
            outcome = Some(tick);
            tick.delay()
        });
        match outcome {
            Some(TickOutcome::Rendered { .. }) => frames_this_second += 1,
            // nothing presented this turn; keep the window responsive
            _ => session.renderer_mut().pump(),
        }

        /* 4) FPS counter (log + HUD once per second) */
        let now = Instant::now();
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let fps = frames_this_second as f32 / secs;
            log::debug!("FPS: {fps:.1}");
            session.renderer_mut().set_fps(fps);
            frames_this_second = 0;
            last_fps_time = now;
        }

        let wait = ticker.time_until_due(clock.now()).min(MAX_IDLE);
        clock.sleep(wait);
    }

    if session.is_recording() {
        log::warn!("Exiting with an unsaved recording of {} frames", session.recorded_len());
    }
    Ok(())
}

fn canvas_dims((w, h): (usize, usize)) -> (u32, u32) {
    (u32::try_from(w).unwrap_or(u32::MAX), u32::try_from(h).unwrap_or(u32::MAX))
}
