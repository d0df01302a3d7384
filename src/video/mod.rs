// src/video/mod.rs

//! The video device: the explicit context object every operation goes
//! through.
//!
//! - `window`: window records, the window manager and its state machine
//! - `events`: window events and the notifications queued for the caller
//! - `gl`: GL library, attribute and context plumbing
//!
//! A [`VideoSubsystem`] owns the compiled-in driver list and at most one
//! active [`VideoDevice`]. The device owns the driver, the displays (and
//! through them windows, renderers and textures), the object-id counter, GL
//! defaults and the screensaver state. Dropping the device tears everything
//! down top-down.

pub mod events;
pub mod gl;
pub mod window;

#[cfg(test)]
mod tests;

use crate::config::{Config, GlConfig};
use crate::display::{closest_display_mode, DisplayMode, GammaRamp, VideoDisplay};
use crate::driver::{self, VideoBootstrap, VideoDriver};
use crate::error::{tolerate_unsupported, Result, VideoError};
use crate::pixels::{Color, Palette};
use crate::rect::Rect;
use crate::surface::{BasicConverter, SurfaceConverter};
use events::WindowNotification;
use log::{debug, info, warn};
use std::collections::VecDeque;

pub use window::{Window, WindowFlags, WindowId, WINDOWPOS_CENTERED, WINDOWPOS_UNDEFINED};

/// Reference-counted state of the GL library.
#[derive(Debug, Default)]
pub(crate) struct GlLibrary {
    pub(crate) loaded: u32,
    pub(crate) path: Option<String>,
}

/// The active video device.
pub struct VideoDevice {
    name: &'static str,
    pub(crate) driver: Box<dyn VideoDriver>,
    pub(crate) displays: Vec<VideoDisplay>,
    pub(crate) current_display: usize,
    next_object_id: u32,
    pub(crate) gl_config: GlConfig,
    pub(crate) gl_library: GlLibrary,
    suspend_screensaver: bool,
    pub(crate) events: VecDeque<WindowNotification>,
    pub(crate) converter: Box<dyn SurfaceConverter>,
    pub(crate) config: Config,
    shut_down: bool,
}

impl VideoDevice {
    /// Brings up `driver`: it adds its displays, then each display learns
    /// which render drivers it can use.
    ///
    /// If the driver fails to initialize, or adds no displays, it is shut
    /// down again before the error is returned.
    pub fn new(name: &'static str, mut driver: Box<dyn VideoDriver>, config: Config) -> Result<Self> {
        let mut displays = Vec::new();
        if let Err(e) = driver.video_init(&mut displays) {
            driver.video_quit();
            return Err(e);
        }
        if displays.is_empty() {
            driver.video_quit();
            return Err(VideoError::driver("The video driver did not add any displays"));
        }
        for (index, display) in displays.iter_mut().enumerate() {
            display.render_drivers = driver.render_drivers(index);
            info!(
                "Display {}: desktop {} with {} render driver(s)",
                index,
                display.desktop_mode,
                display.render_drivers.len()
            );
        }
        info!("Video driver '{}' initialized", name);

        Ok(VideoDevice {
            name,
            driver,
            displays,
            current_display: 0,
            next_object_id: 0,
            gl_config: config.gl,
            gl_library: GlLibrary::default(),
            suspend_screensaver: false,
            events: VecDeque::new(),
            converter: Box::new(BasicConverter),
            config,
            shut_down: false,
        })
    }

    /// Tears the device down. Equivalent to dropping it.
    pub fn quit(self) {}

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if let Err(e) = self.enable_screen_saver() {
            warn!("Couldn't re-enable the screensaver: {}", e);
        }
        for d in (0..self.displays.len()).rev() {
            let ids: Vec<WindowId> = self.displays[d].windows.iter().rev().map(|w| w.id).collect();
            for id in ids {
                if let Err(e) = self.destroy_window(id) {
                    warn!("Couldn't destroy {} during shutdown: {}", id, e);
                }
            }
            self.displays[d].render_drivers.clear();
        }
        self.driver.video_quit();
        for display in &mut self.displays {
            display.modes.clear();
            display.palette = None;
            display.gamma = None;
            display.saved_gamma = None;
        }
        self.displays.clear();
        info!("Video driver '{}' shut down", self.name);
    }

    /// Name of the driver this device runs on.
    pub fn driver_name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the collaborator used to convert surfaces into texture formats.
    pub fn set_surface_converter(&mut self, converter: Box<dyn SurfaceConverter>) {
        self.converter = converter;
    }

    /// Ids are shared by windows and textures and never reused.
    pub(crate) fn next_object_id(&mut self) -> u32 {
        self.next_object_id += 1;
        self.next_object_id
    }

    // --- Displays ---

    pub fn num_displays(&self) -> usize {
        self.displays.len()
    }

    pub fn select_display(&mut self, index: usize) -> Result<()> {
        if index >= self.displays.len() {
            return Err(VideoError::invalid(format!(
                "index must be in the range 0 - {}",
                self.displays.len() - 1
            )));
        }
        self.current_display = index;
        Ok(())
    }

    pub fn current_display_index(&self) -> usize {
        self.current_display
    }

    pub fn display(&self, index: usize) -> Result<&VideoDisplay> {
        self.displays
            .get(index)
            .ok_or_else(|| VideoError::invalid(format!("invalid display index {}", index)))
    }

    pub fn current_display(&self) -> &VideoDisplay {
        &self.displays[self.current_display]
    }

    // --- Modes ---

    /// Fills the mode list from the driver the first time it is needed.
    fn populate_modes(&mut self, d: usize) {
        if !self.displays[d].modes.is_empty() {
            return;
        }
        match self.driver.get_display_modes(d) {
            Ok(modes) => {
                for mode in modes {
                    self.displays[d].add_display_mode(mode);
                }
                debug!("Display {} reports {} modes", d, self.displays[d].modes.len());
            }
            Err(e) if e.is_unsupported() => {}
            Err(e) => warn!("Couldn't enumerate the modes of display {}: {}", d, e),
        }
    }

    pub fn num_display_modes(&mut self) -> usize {
        let d = self.current_display;
        self.populate_modes(d);
        self.displays[d].modes.len()
    }

    pub fn display_mode(&mut self, index: usize) -> Result<DisplayMode> {
        let d = self.current_display;
        self.populate_modes(d);
        let modes = &self.displays[d].modes;
        modes.get(index).cloned().ok_or_else(|| {
            VideoError::invalid(format!(
                "index must be in the range of 0 - {}",
                modes.len().saturating_sub(1)
            ))
        })
    }

    pub fn desktop_display_mode(&self) -> DisplayMode {
        self.current_display().desktop_mode.clone()
    }

    pub fn current_display_mode(&self) -> DisplayMode {
        self.current_display().current_mode.clone()
    }

    fn closest_mode_for(&mut self, d: usize, requested: &DisplayMode) -> Option<DisplayMode> {
        self.populate_modes(d);
        let display = &self.displays[d];
        closest_display_mode(&display.modes, requested, &display.desktop_mode)
    }

    /// The listed mode of the current display that best satisfies `requested`.
    pub fn closest_display_mode(&mut self, requested: &DisplayMode) -> Result<DisplayMode> {
        let d = self.current_display;
        self.closest_mode_for(d, requested)
            .ok_or(VideoError::NoMatchingMode {
                w: requested.w,
                h: requested.h,
            })
    }

    /// Switches the current display to the mode closest to `mode`, or back to
    /// the desktop mode for `None`.
    pub fn set_display_mode(&mut self, mode: Option<&DisplayMode>) -> Result<()> {
        self.set_display_mode_for(self.current_display, mode)
    }

    pub(crate) fn set_display_mode_for(&mut self, d: usize, mode: Option<&DisplayMode>) -> Result<()> {
        let display = &self.displays[d];
        let mut requested = mode.cloned().unwrap_or_else(|| display.desktop_mode.clone());
        let current = &display.current_mode;
        if requested.format.is_unknown() {
            requested.format = current.format;
        }
        if requested.w == 0 {
            requested.w = current.w;
        }
        if requested.h == 0 {
            requested.h = current.h;
        }
        if requested.refresh_rate == 0 {
            requested.refresh_rate = current.refresh_rate;
        }

        let target = self
            .closest_mode_for(d, &requested)
            .ok_or(VideoError::NoMatchingMode {
                w: requested.w,
                h: requested.h,
            })?;
        if target == self.displays[d].current_mode {
            return Ok(());
        }

        self.driver.set_display_mode(d, &target)?;
        debug!("Display {} switched to {}", d, target);
        let display = &mut self.displays[d];
        display.palette = target
            .format
            .is_indexed()
            .then(|| Palette::dithered(target.format.bits_per_pixel()));
        display.current_mode = target;

        for id in display.fullscreen_visible_windows() {
            let (x, y) = self.window(id)?.position();
            self.set_window_position(id, x, y)?;
        }
        Ok(())
    }

    /// Sets the mode fullscreen windows on the current display use.
    ///
    /// `None` selects the desktop mode. If a fullscreen window is visible the
    /// mode is applied right away, and renderers of fullscreen windows are
    /// told the display changed.
    pub fn set_fullscreen_display_mode(&mut self, mode: Option<&DisplayMode>) -> Result<()> {
        let d = self.current_display;
        let requested = mode
            .cloned()
            .unwrap_or_else(|| self.displays[d].desktop_mode.clone());
        let fullscreen = self
            .closest_mode_for(d, &requested)
            .ok_or(VideoError::NoMatchingMode {
                w: requested.w,
                h: requested.h,
            })?;
        if fullscreen == self.displays[d].fullscreen_mode {
            return Ok(());
        }
        self.displays[d].fullscreen_mode = fullscreen.clone();

        if !self.displays[d].fullscreen_visible_windows().is_empty() {
            self.set_display_mode_for(d, Some(&fullscreen))?;
        }
        for id in self.displays[d].fullscreen_windows() {
            self.on_window_resized(id);
        }
        Ok(())
    }

    pub fn fullscreen_display_mode(&self) -> DisplayMode {
        self.current_display().fullscreen_mode.clone()
    }

    // --- Palette ---

    /// Overwrites palette entries starting at `first` and hands the palette to
    /// the driver.
    pub fn set_display_palette(&mut self, colors: &[Color], first: usize) -> Result<()> {
        let d = self.current_display;
        let palette = self.displays[d]
            .palette
            .as_mut()
            .ok_or_else(|| VideoError::invalid("display mode does not have a palette"))?;
        palette.set_colors(colors, first)?;
        tolerate_unsupported(self.driver.set_display_palette(d, palette))
    }

    pub fn display_palette(&self, first: usize, count: usize) -> Result<Vec<Color>> {
        let palette = self
            .current_display()
            .palette
            .as_ref()
            .ok_or_else(|| VideoError::invalid("display mode does not have a palette"))?;
        let end = first
            .checked_add(count)
            .filter(|&end| end <= palette.len())
            .ok_or_else(|| {
                VideoError::invalid(format!(
                    "first + ncolors must be in the range of 0 - {}",
                    palette.len()
                ))
            })?;
        Ok(palette.colors()[first..end].to_vec())
    }

    // --- Gamma ---

    /// Allocates the current/saved ramp pair of a display on first use.
    fn ensure_gamma(&mut self, d: usize) {
        if self.displays[d].gamma.is_some() {
            return;
        }
        let ramp = match self.driver.get_display_gamma_ramp(d) {
            Ok(ramp) => ramp,
            Err(e) => {
                if !e.is_unsupported() {
                    warn!("Couldn't read the gamma ramp of display {}: {}", d, e);
                }
                GammaRamp::identity()
            }
        };
        self.displays[d].saved_gamma = Some(ramp.clone());
        self.displays[d].gamma = Some(ramp);
    }

    /// Sets the gamma ramp of the current display.
    ///
    /// The ramp is remembered either way; it only reaches the driver while a
    /// window has focus, and is re-applied whenever one gains it.
    pub fn set_gamma_ramp(&mut self, ramp: &GammaRamp) -> Result<()> {
        let d = self.current_display;
        self.ensure_gamma(d);
        self.displays[d].gamma = Some(ramp.clone());
        if self.focus_window().is_some() {
            self.driver.set_display_gamma_ramp(d, ramp)?;
        }
        Ok(())
    }

    pub fn gamma_ramp(&mut self) -> GammaRamp {
        let d = self.current_display;
        self.ensure_gamma(d);
        self.displays[d].gamma.clone().unwrap_or_default()
    }

    // --- Screensaver ---

    pub fn is_screen_saver_enabled(&self) -> bool {
        !self.suspend_screensaver
    }

    pub fn enable_screen_saver(&mut self) -> Result<()> {
        self.apply_screensaver(false)
    }

    pub fn disable_screen_saver(&mut self) -> Result<()> {
        self.apply_screensaver(true)
    }

    fn apply_screensaver(&mut self, suspend: bool) -> Result<()> {
        if self.suspend_screensaver == suspend {
            return Ok(());
        }
        self.suspend_screensaver = suspend;
        debug!("Screensaver {}", if suspend { "suspended" } else { "enabled" });
        tolerate_unsupported(self.driver.suspend_screensaver(suspend))
    }

    // --- Text input ---

    pub fn start_text_input(&mut self) -> Result<()> {
        tolerate_unsupported(self.driver.start_text_input())
    }

    pub fn stop_text_input(&mut self) -> Result<()> {
        tolerate_unsupported(self.driver.stop_text_input())
    }

    pub fn set_text_input_rect(&mut self, rect: &Rect) -> Result<()> {
        tolerate_unsupported(self.driver.set_text_input_rect(rect))
    }

    // --- Events ---

    /// Feeds backend-originated window events through the state machine.
    pub fn pump_events(&mut self) {
        for notification in self.driver.pump_events() {
            if let Err(e) = self.send_window_event(notification.window, notification.event) {
                warn!("Dropping event for {}: {}", notification.window, e);
            }
        }
    }

    /// Oldest queued window notification.
    pub fn poll_window_event(&mut self) -> Option<WindowNotification> {
        self.events.pop_front()
    }

    pub fn drain_window_events(&mut self) -> Vec<WindowNotification> {
        self.events.drain(..).collect()
    }
}

impl Drop for VideoDevice {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Compiled-in drivers plus the device currently running on one of them.
pub struct VideoSubsystem {
    bootstraps: Vec<VideoBootstrap>,
    active: Option<VideoDevice>,
}

impl Default for VideoSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSubsystem {
    pub fn new() -> Self {
        Self::with_bootstraps(driver::bootstraps())
    }

    /// A subsystem that only knows the given drivers.
    pub fn with_bootstraps(bootstraps: Vec<VideoBootstrap>) -> Self {
        VideoSubsystem {
            bootstraps,
            active: None,
        }
    }

    pub fn num_video_drivers(&self) -> usize {
        self.bootstraps.len()
    }

    pub fn video_driver_name(&self, index: usize) -> Option<&'static str> {
        self.bootstraps.get(index).map(|b| b.name)
    }

    /// Starts a device, quitting the active one first.
    ///
    /// `name` takes precedence over `config.video.driver`; with neither, the
    /// drivers are tried in order.
    pub fn init(&mut self, name: Option<&str>, config: &Config) -> Result<&mut VideoDevice> {
        self.quit();
        let requested = name.map(str::to_string).or_else(|| config.video.driver.clone());
        let (name, driver) = driver::select_driver(&self.bootstraps, requested.as_deref(), config)?;
        info!("Selected video driver '{}'", name);
        let device = VideoDevice::new(name, driver, config.clone())?;
        Ok(self.active.insert(device))
    }

    pub fn quit(&mut self) {
        if let Some(device) = self.active.take() {
            device.quit();
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.active.is_some()
    }

    pub fn current_video_driver(&self) -> Option<&'static str> {
        self.active.as_ref().map(VideoDevice::driver_name)
    }

    pub fn device(&self) -> Result<&VideoDevice> {
        self.active.as_ref().ok_or(VideoError::NotInitialized("video subsystem"))
    }

    pub fn device_mut(&mut self) -> Result<&mut VideoDevice> {
        self.active.as_mut().ok_or(VideoError::NotInitialized("video subsystem"))
    }
}
