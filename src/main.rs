// src/main.rs

//! Headless smoke run of the video core.
//!
//! Brings up the configured (or first available) video driver, opens a
//! window, renders a few primitives and a texture built from a surface, reads
//! the result back and shuts everything down again.

use anyhow::Context;
use core_video::config::CONFIG;
use core_video::{
    BlendMode, Color, PixelFormat, Rect, RendererFlags, Surface, VideoSubsystem, WindowFlags,
    WINDOWPOS_CENTERED,
};
use log::{info, warn};

const WINDOW_WIDTH: i32 = 320;
const WINDOW_HEIGHT: i32 = 240;

fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting core-video...");
    let config = &*CONFIG;

    let mut video = VideoSubsystem::new();
    for index in 0..video.num_video_drivers() {
        if let Some(name) = video.video_driver_name(index) {
            info!("Compiled-in video driver: {}", name);
        }
    }

    let device = video
        .init(None, config)
        .context("Failed to initialize the video subsystem")?;
    info!(
        "Running on '{}' with {} display(s), desktop {}",
        device.driver_name(),
        device.num_displays(),
        device.desktop_display_mode()
    );
    for index in 0..device.num_display_modes() {
        let mode = device.display_mode(index)?;
        info!("  mode {}: {}", index, mode);
    }

    let window = device
        .create_window(
            Some("core-video"),
            WINDOWPOS_CENTERED,
            WINDOWPOS_CENTERED,
            WINDOW_WIDTH,
            WINDOW_HEIGHT,
            WindowFlags::SHOWN,
        )
        .context("Failed to create the window")?;
    device
        .create_renderer(window, None, RendererFlags::empty())
        .context("Failed to create a renderer")?;
    info!("Renderer: {:?}", device.renderer_info()?);

    // A small checkerboard, materialized in whatever format the renderer prefers.
    let mut checker = Surface::new(16, 16, PixelFormat::RGB565)?;
    for y in 0..16 {
        for x in 0..16 {
            let on = (x / 4 + y / 4) % 2 == 0;
            checker.put_pixel(x, y, if on { 0xFFFF } else { 0x001F });
        }
    }
    let texture = device
        .create_texture_from_surface(PixelFormat::UNKNOWN, &mut checker)
        .context("Failed to create a texture from the checkerboard")?;
    let (format, _, w, h) = device.query_texture(texture)?;
    info!("Checkerboard texture: {}x{} {}", w, h, format);

    device.set_render_draw_color(Color::rgba(0x20, 0x20, 0x40, 0xFF))?;
    device.render_fill(None)?;
    device.set_render_draw_color(Color::WHITE)?;
    device.render_line(0, 0, WINDOW_WIDTH - 1, WINDOW_HEIGHT - 1)?;
    device.render_copy(texture, None, Some(&Rect::new(WINDOW_WIDTH - 32, WINDOW_HEIGHT - 32, 64, 64)))?;
    device.set_render_draw_blend_mode(BlendMode::BLEND)?;
    device.set_render_draw_color(Color::rgba(0xFF, 0, 0, 0x80))?;
    device.render_fill(Some(&Rect::new(8, 8, 32, 32)))?;
    device.render_present()?;

    let mut pixel = [0u8; 4];
    match device.render_read_pixels(Some(&Rect::new(20, 20, 1, 1)), PixelFormat::ARGB8888, &mut pixel, 4) {
        Ok(()) => info!("Pixel at (20, 20): {:#010x}", u32::from_ne_bytes(pixel)),
        Err(e) => warn!("Couldn't read back pixels: {}", e),
    }

    for notification in device.drain_window_events() {
        info!("{}: {:?}", notification.window, notification.event);
    }

    device.destroy_window(window)?;
    video.quit();
    info!("core-video exited cleanly.");
    Ok(())
}
