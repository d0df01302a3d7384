// src/display/mod.rs

//! Physical displays and their mode, palette and gamma state.
//!
//! - `mode`: display modes, their ordering and the closest-mode matcher
//! - `gamma`: gamma translation tables
//!
//! A `VideoDisplay` is created by the video driver during `video_init` and
//! owns everything that lives on that output: windows (and through them
//! renderers and textures), the render drivers usable on it, and the
//! texture registry that maps texture ids to the window whose renderer
//! owns them.

pub mod gamma;
pub mod mode;

pub use gamma::GammaRamp;
pub use mode::{closest_display_mode, cmp_modes, DisplayMode, ModeData};

use crate::pixels::Palette;
use crate::render::texture::TextureRegistry;
use crate::render::RenderDriver;
use crate::video::window::{Window, WindowFlags, WindowId};
use std::any::Any;
use std::rc::Rc;

/// One physical output.
pub struct VideoDisplay {
    pub(crate) desktop_mode: DisplayMode,
    pub(crate) current_mode: DisplayMode,
    pub(crate) fullscreen_mode: DisplayMode,
    pub(crate) modes: Vec<DisplayMode>,
    pub(crate) palette: Option<Palette>,
    pub(crate) gamma: Option<GammaRamp>,
    pub(crate) saved_gamma: Option<GammaRamp>,
    pub(crate) windows: Vec<Window>,
    pub(crate) render_drivers: Vec<Rc<dyn RenderDriver>>,
    pub(crate) textures: TextureRegistry,
    /// Window whose renderer is current on this display.
    pub(crate) current_renderer: Option<WindowId>,
    /// Backend-private data.
    pub driver_data: Option<Box<dyn Any>>,
}

impl VideoDisplay {
    /// A display whose current mode starts out as its desktop mode.
    pub fn new(desktop_mode: DisplayMode) -> Self {
        VideoDisplay {
            current_mode: desktop_mode.clone(),
            desktop_mode,
            fullscreen_mode: DisplayMode::default(),
            modes: Vec::new(),
            palette: None,
            gamma: None,
            saved_gamma: None,
            windows: Vec::new(),
            render_drivers: Vec::new(),
            textures: TextureRegistry::default(),
            current_renderer: None,
            driver_data: None,
        }
    }

    /// Adds a mode to the sorted mode list. Returns `false` if an identical
    /// mode is already present.
    pub fn add_display_mode(&mut self, mode: DisplayMode) -> bool {
        mode::insert_mode(&mut self.modes, mode)
    }

    pub fn modes(&self) -> &[DisplayMode] {
        &self.modes
    }

    pub fn desktop_mode(&self) -> &DisplayMode {
        &self.desktop_mode
    }

    pub fn current_mode(&self) -> &DisplayMode {
        &self.current_mode
    }

    pub fn fullscreen_mode(&self) -> &DisplayMode {
        &self.fullscreen_mode
    }

    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn render_drivers(&self) -> &[Rc<dyn RenderDriver>] {
        &self.render_drivers
    }

    pub(crate) fn window_index(&self, id: WindowId) -> Option<usize> {
        self.windows.iter().position(|w| w.id == id)
    }

    pub(crate) fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub(crate) fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    /// Ids of windows that are fullscreen, shown and not minimized.
    pub(crate) fn fullscreen_visible_windows(&self) -> Vec<WindowId> {
        self.windows
            .iter()
            .filter(|w| w.is_fullscreen_visible())
            .map(|w| w.id)
            .collect()
    }

    pub(crate) fn fullscreen_windows(&self) -> Vec<WindowId> {
        self.windows
            .iter()
            .filter(|w| w.flags.contains(WindowFlags::FULLSCREEN))
            .map(|w| w.id)
            .collect()
    }
}
