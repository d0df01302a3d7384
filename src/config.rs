// src/config.rs

//! Defines the configuration structures for the video core.
//!
//! The configuration is deserialized from a JSON file whose path is taken
//! from `CORE_VIDEO_CONFIG`. Every section carries defaults, so a partial file
//! (or no file at all) yields a usable configuration. Environment variables
//! override the driver selections after the file is read.

use crate::display::DisplayMode;
use crate::pixels::PixelFormat;
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the video driver to use.
pub const VIDEO_DRIVER_ENV: &str = "CORE_VIDEO_DRIVER";
/// Environment variable naming the render driver to prefer.
pub const RENDER_DRIVER_ENV: &str = "CORE_VIDEO_RENDERER";
/// Environment variable holding the path of a JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "CORE_VIDEO_CONFIG";

/// Process-wide configuration, loaded on first use.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::load);

// --- Top-Level Configuration Structure ---

/// Root of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Video driver selection and the headless backend's display layout.
    pub video: VideoConfig,
    /// Render driver selection.
    pub render: RenderConfig,
    /// Default OpenGL attributes applied to every new device.
    pub gl: GlConfig,
}

impl Config {
    /// Loads the configuration file named by `CORE_VIDEO_CONFIG` (if any) and
    /// applies environment overrides. Parse failures fall back to defaults.
    pub fn load() -> Config {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => match Config::from_file(Path::new(&path)) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to load configuration from {}: {}. Using defaults.", path, e);
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        };
        config.apply_env_overrides();
        config
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Config> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var(VIDEO_DRIVER_ENV) {
            if !name.is_empty() {
                self.video.driver = Some(name);
            }
        }
        if let Ok(name) = std::env::var(RENDER_DRIVER_ENV) {
            if !name.is_empty() {
                self.render.driver = Some(name);
            }
        }
    }
}

// --- Video Configuration ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VideoConfig {
    /// Explicit video driver name, matched case-insensitively.
    /// If `None`, drivers are tried in registration order.
    pub driver: Option<String>,
    /// Displays reported by the headless driver.
    pub headless: HeadlessConfig,
}

/// Layout of the headless backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    pub displays: Vec<HeadlessDisplayConfig>,
    /// Whether the headless driver pretends to support OpenGL contexts.
    pub opengl: bool,
    /// Extension string reported for `gl_extension_supported`.
    pub gl_extensions: String,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        HeadlessConfig {
            displays: vec![HeadlessDisplayConfig::default()],
            opengl: true,
            gl_extensions: "GL_ARB_texture_rectangle GL_EXT_bgra".to_string(),
        }
    }
}

/// One headless display: its desktop mode and any extra modes it offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessDisplayConfig {
    pub desktop: ModeConfig,
    pub modes: Vec<ModeConfig>,
}

impl Default for HeadlessDisplayConfig {
    fn default() -> Self {
        HeadlessDisplayConfig {
            desktop: ModeConfig::default(),
            modes: vec![
                ModeConfig::new(PixelFormat::RGB888, 1024, 768, 60),
                ModeConfig::new(PixelFormat::RGB888, 640, 480, 60),
                ModeConfig::new(PixelFormat::RGB565, 640, 480, 60),
                ModeConfig::new(PixelFormat::INDEX8, 640, 480, 60),
            ],
        }
    }
}

/// Serializable form of a display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    pub format: PixelFormat,
    pub w: i32,
    pub h: i32,
    pub refresh_rate: i32,
}

impl ModeConfig {
    pub const fn new(format: PixelFormat, w: i32, h: i32, refresh_rate: i32) -> Self {
        ModeConfig {
            format,
            w,
            h,
            refresh_rate,
        }
    }
}

impl Default for ModeConfig {
    fn default() -> Self {
        ModeConfig::new(PixelFormat::RGB888, 800, 600, 60)
    }
}

impl From<ModeConfig> for DisplayMode {
    fn from(mode: ModeConfig) -> Self {
        DisplayMode::new(mode.format, mode.w, mode.h, mode.refresh_rate)
    }
}

// --- Render Configuration ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RenderConfig {
    /// Preferred render driver name, tried before capability matching.
    pub driver: Option<String>,
}

// --- OpenGL Configuration ---

/// Requested OpenGL framebuffer and context attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlConfig {
    pub red_size: i32,
    pub green_size: i32,
    pub blue_size: i32,
    pub alpha_size: i32,
    pub buffer_size: i32,
    pub depth_size: i32,
    pub stencil_size: i32,
    pub double_buffer: i32,
    pub accum_red_size: i32,
    pub accum_green_size: i32,
    pub accum_blue_size: i32,
    pub accum_alpha_size: i32,
    pub stereo: i32,
    pub multisample_buffers: i32,
    pub multisample_samples: i32,
    pub retained_backing: i32,
    /// -1 means "don't care".
    pub accelerated: i32,
    pub major_version: i32,
    pub minor_version: i32,
}

impl Default for GlConfig {
    fn default() -> Self {
        GlConfig {
            red_size: 3,
            green_size: 3,
            blue_size: 2,
            alpha_size: 0,
            buffer_size: 0,
            depth_size: 16,
            stencil_size: 0,
            double_buffer: 1,
            accum_red_size: 0,
            accum_green_size: 0,
            accum_blue_size: 0,
            accum_alpha_size: 0,
            stereo: 0,
            multisample_buffers: 0,
            multisample_samples: 0,
            retained_backing: 1,
            accelerated: -1,
            major_version: 2,
            minor_version: 1,
        }
    }
}
