// src/driver/mod.rs
//! Video driver SPI and the registry of compiled-in drivers.
//!
//! A backend implements [`VideoDriver`]; the registry knows how to check and
//! construct each one through a [`VideoBootstrap`]. Every hook except
//! `video_init` has a default body that reports `Unsupported`, which is how a
//! backend says "I don't do this". The device decides per hook whether a
//! missing implementation is an error or simply nothing to do.
//!
//! ## Lifecycle
//! 1. `VideoBootstrap::available()` - cheap check, no side effects
//! 2. `VideoBootstrap::create()` - construct the driver
//! 3. `video_init()` - add displays (and their modes)
//! 4. hooks, driven by `VideoDevice`
//! 5. `video_quit()` - release backend resources

pub mod headless;
#[cfg(test)]
pub mod mock;

use crate::config::Config;
use crate::display::{DisplayMode, GammaRamp, VideoDisplay};
use crate::error::{Result, VideoError};
use crate::pixels::Palette;
use crate::rect::Rect;
use crate::render::RenderDriver;
use crate::surface::Surface;
use crate::video::events::WindowNotification;
use crate::video::window::Window;
use log::debug;
use std::any::Any;
use std::rc::Rc;

/// Opaque handle to a GL context created by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlContext(pub u64);

/// Address of a GL entry point as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlProcAddress(pub usize);

/// Window-manager details of a native window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WmInfo {
    /// Name of the windowing subsystem (e.g. "headless").
    pub subsystem: String,
    /// Native window handle, as an integer.
    pub handle: u64,
}

/// Platform-specific video backend.
pub trait VideoDriver {
    /// Adds this backend's displays to `displays`.
    fn video_init(&mut self, displays: &mut Vec<VideoDisplay>) -> Result<()>;

    fn video_quit(&mut self) {}

    // --- Display modes ---

    /// Enumerates the modes of a display. Called once, the first time the
    /// mode list is needed and still empty.
    fn get_display_modes(&mut self, _display: usize) -> Result<Vec<DisplayMode>> {
        Err(VideoError::Unsupported("get_display_modes"))
    }

    fn set_display_mode(&mut self, _display: usize, _mode: &DisplayMode) -> Result<()> {
        Err(VideoError::Unsupported("set_display_mode"))
    }

    fn set_display_palette(&mut self, _display: usize, _palette: &Palette) -> Result<()> {
        Err(VideoError::Unsupported("set_display_palette"))
    }

    fn set_display_gamma_ramp(&mut self, _display: usize, _ramp: &GammaRamp) -> Result<()> {
        Err(VideoError::Unsupported("set_display_gamma_ramp"))
    }

    fn get_display_gamma_ramp(&mut self, _display: usize) -> Result<GammaRamp> {
        Err(VideoError::Unsupported("get_display_gamma_ramp"))
    }

    // --- Windows ---

    fn create_window(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("create_window"))
    }

    /// Wraps an existing native window.
    fn create_window_from(&mut self, _window: &mut Window, _native: &dyn Any) -> Result<()> {
        Err(VideoError::Unsupported("create_window_from"))
    }

    fn set_window_title(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("set_window_title"))
    }

    fn set_window_icon(&mut self, _window: &mut Window, _icon: &Surface) -> Result<()> {
        Err(VideoError::Unsupported("set_window_icon"))
    }

    fn set_window_position(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("set_window_position"))
    }

    fn set_window_size(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("set_window_size"))
    }

    fn show_window(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("show_window"))
    }

    fn hide_window(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("hide_window"))
    }

    fn raise_window(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("raise_window"))
    }

    fn maximize_window(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("maximize_window"))
    }

    fn minimize_window(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("minimize_window"))
    }

    fn restore_window(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("restore_window"))
    }

    /// Applies the window's `INPUT_GRABBED` flag.
    fn set_window_grab(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("set_window_grab"))
    }

    fn destroy_window(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("destroy_window"))
    }

    fn get_window_wm_info(&mut self, _window: &Window) -> Result<WmInfo> {
        Err(VideoError::Unsupported("get_window_wm_info"))
    }

    // --- OpenGL ---

    /// Whether this backend can create GL contexts at all.
    fn supports_opengl(&self) -> bool {
        false
    }

    fn gl_load_library(&mut self, _path: Option<&str>) -> Result<()> {
        Err(VideoError::Unsupported("gl_load_library"))
    }

    fn gl_get_proc_address(&mut self, _name: &str) -> Result<GlProcAddress> {
        Err(VideoError::Unsupported("gl_get_proc_address"))
    }

    fn gl_unload_library(&mut self) {}

    /// Space-separated extension string of the loaded GL implementation.
    fn gl_extensions(&mut self) -> Result<String> {
        Err(VideoError::Unsupported("gl_extensions"))
    }

    fn gl_create_context(&mut self, _window: &mut Window) -> Result<GlContext> {
        Err(VideoError::Unsupported("gl_create_context"))
    }

    /// Binds `context` to `window`; `None` for both unbinds.
    fn gl_make_current(
        &mut self,
        _window: Option<&mut Window>,
        _context: Option<GlContext>,
    ) -> Result<()> {
        Err(VideoError::Unsupported("gl_make_current"))
    }

    fn gl_set_swap_interval(&mut self, _interval: i32) -> Result<()> {
        Err(VideoError::Unsupported("gl_set_swap_interval"))
    }

    fn gl_get_swap_interval(&mut self) -> Result<i32> {
        Err(VideoError::Unsupported("gl_get_swap_interval"))
    }

    fn gl_swap_window(&mut self, _window: &mut Window) -> Result<()> {
        Err(VideoError::Unsupported("gl_swap_window"))
    }

    fn gl_delete_context(&mut self, _context: GlContext) -> Result<()> {
        Err(VideoError::Unsupported("gl_delete_context"))
    }

    // --- Events, screensaver, text input ---

    /// Native window events that occurred since the last call.
    fn pump_events(&mut self) -> Vec<WindowNotification> {
        Vec::new()
    }

    /// Applies the screensaver state; `suspend` is the new state.
    fn suspend_screensaver(&mut self, _suspend: bool) -> Result<()> {
        Err(VideoError::Unsupported("suspend_screensaver"))
    }

    fn start_text_input(&mut self) -> Result<()> {
        Err(VideoError::Unsupported("start_text_input"))
    }

    fn stop_text_input(&mut self) -> Result<()> {
        Err(VideoError::Unsupported("stop_text_input"))
    }

    fn set_text_input_rect(&mut self, _rect: &Rect) -> Result<()> {
        Err(VideoError::Unsupported("set_text_input_rect"))
    }

    // --- Rendering ---

    /// Render drivers usable on a display, in preference order.
    fn render_drivers(&self, _display: usize) -> Vec<Rc<dyn RenderDriver>> {
        Vec::new()
    }
}

/// How the registry checks and constructs one backend.
#[derive(Clone, Copy)]
pub struct VideoBootstrap {
    pub name: &'static str,
    pub description: &'static str,
    /// Cheap availability check.
    pub available: fn() -> bool,
    pub create: fn(&Config) -> Result<Box<dyn VideoDriver>>,
}

impl std::fmt::Debug for VideoBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoBootstrap")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Compiled-in drivers, in probing order.
pub fn bootstraps() -> Vec<VideoBootstrap> {
    vec![headless::BOOTSTRAP]
}

/// Picks and constructs a driver.
///
/// An explicit `name` is matched case-insensitively and must both exist and
/// report itself available. Without a name, each driver is tried in order
/// and the first one that is available and constructs successfully wins.
pub fn select_driver(
    bootstraps: &[VideoBootstrap],
    name: Option<&str>,
    config: &Config,
) -> Result<(&'static str, Box<dyn VideoDriver>)> {
    match name {
        Some(name) => {
            let bootstrap = bootstraps
                .iter()
                .find(|b| b.name.eq_ignore_ascii_case(name))
                .filter(|b| (b.available)())
                .ok_or_else(|| VideoError::DriverNotFound(name.to_string()))?;
            let driver = (bootstrap.create)(config)
                .map_err(|_| VideoError::DriverNotFound(name.to_string()))?;
            Ok((bootstrap.name, driver))
        }
        None => bootstraps
            .iter()
            .filter(|b| (b.available)())
            .find_map(|b| match (b.create)(config) {
                Ok(driver) => Some((b.name, driver)),
                Err(e) => {
                    debug!("Video driver '{}' failed to start: {}", b.name, e);
                    None
                }
            })
            .ok_or(VideoError::NoDriverAvailable),
    }
}
