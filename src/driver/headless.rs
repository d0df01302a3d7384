// src/driver/headless.rs

//! Headless video driver.
//!
//! Reports the displays described by `video.headless` in the configuration,
//! accepts every mode switch and window operation, and remembers what it was
//! last asked to apply. GL contexts are plain counters. Windows render
//! through [`HeadlessRenderDriver`].

use crate::config::{Config, HeadlessConfig};
use crate::display::{DisplayMode, GammaRamp, VideoDisplay};
use crate::driver::{GlContext, GlProcAddress, VideoBootstrap, VideoDriver, WmInfo};
use crate::error::{Result, VideoError};
use crate::pixels::Palette;
use crate::render::headless::HeadlessRenderDriver;
use crate::render::RenderDriver;
use crate::video::window::{Window, WindowFlags};
use log::{debug, info, trace};
use std::collections::HashMap;
use std::rc::Rc;

pub const BOOTSTRAP: VideoBootstrap = VideoBootstrap {
    name: "headless",
    description: "In-memory video driver without any native output",
    available: || true,
    create: HeadlessVideoDriver::create,
};

/// What the driver was last asked to apply to one display.
#[derive(Debug, Default, Clone)]
pub struct HeadlessDisplayState {
    pub mode: Option<DisplayMode>,
    pub palette: Option<Palette>,
    pub gamma: Option<GammaRamp>,
}

pub struct HeadlessVideoDriver {
    config: HeadlessConfig,
    displays: Vec<HeadlessDisplayState>,
    render_driver: Rc<HeadlessRenderDriver>,
    gl_loaded: bool,
    next_context: u64,
    current_context: Option<GlContext>,
    swap_interval: i32,
    grabbed: HashMap<u32, bool>,
    screensaver_suspended: bool,
    text_input: bool,
}

impl HeadlessVideoDriver {
    pub fn new(config: HeadlessConfig) -> Self {
        info!(
            "HeadlessVideoDriver::new() with {} display(s)",
            config.displays.len()
        );
        HeadlessVideoDriver {
            config,
            displays: Vec::new(),
            render_driver: Rc::new(HeadlessRenderDriver::default()),
            gl_loaded: false,
            next_context: 0,
            current_context: None,
            swap_interval: 0,
            grabbed: HashMap::new(),
            screensaver_suspended: false,
            text_input: false,
        }
    }

    fn create(config: &Config) -> Result<Box<dyn VideoDriver>> {
        Ok(Box::new(HeadlessVideoDriver::new(config.video.headless.clone())))
    }

    pub fn display_state(&self, display: usize) -> Option<&HeadlessDisplayState> {
        self.displays.get(display)
    }

    pub fn is_screensaver_suspended(&self) -> bool {
        self.screensaver_suspended
    }

    fn state_mut(&mut self, display: usize) -> Result<&mut HeadlessDisplayState> {
        self.displays
            .get_mut(display)
            .ok_or_else(|| VideoError::invalid(format!("invalid display index {}", display)))
    }

    fn require_gl(&self) -> Result<()> {
        if !self.config.opengl {
            return Err(VideoError::Unsupported("OpenGL"));
        }
        if !self.gl_loaded {
            return Err(VideoError::NotInitialized("GL library"));
        }
        Ok(())
    }
}

impl VideoDriver for HeadlessVideoDriver {
    fn video_init(&mut self, displays: &mut Vec<VideoDisplay>) -> Result<()> {
        for (index, display) in self.config.displays.iter().enumerate() {
            let desktop: DisplayMode = display.desktop.into();
            info!("HeadlessVideoDriver: display {} desktop {}", index, desktop);
            displays.push(VideoDisplay::new(desktop));
            self.displays.push(HeadlessDisplayState::default());
        }
        Ok(())
    }

    fn video_quit(&mut self) {
        info!("HeadlessVideoDriver: quit");
        self.displays.clear();
        self.gl_loaded = false;
        self.current_context = None;
    }

    fn get_display_modes(&mut self, display: usize) -> Result<Vec<DisplayMode>> {
        let config = self
            .config
            .displays
            .get(display)
            .ok_or_else(|| VideoError::invalid(format!("invalid display index {}", display)))?;
        let mut modes: Vec<DisplayMode> = vec![config.desktop.into()];
        modes.extend(config.modes.iter().map(|m| DisplayMode::from(*m)));
        Ok(modes)
    }

    fn set_display_mode(&mut self, display: usize, mode: &DisplayMode) -> Result<()> {
        debug!("HeadlessVideoDriver: display {} -> {}", display, mode);
        self.state_mut(display)?.mode = Some(mode.clone());
        Ok(())
    }

    fn set_display_palette(&mut self, display: usize, palette: &Palette) -> Result<()> {
        self.state_mut(display)?.palette = Some(palette.clone());
        Ok(())
    }

    fn set_display_gamma_ramp(&mut self, display: usize, ramp: &GammaRamp) -> Result<()> {
        self.state_mut(display)?.gamma = Some(ramp.clone());
        Ok(())
    }

    fn get_display_gamma_ramp(&mut self, display: usize) -> Result<GammaRamp> {
        let state = self.state_mut(display)?;
        Ok(state.gamma.clone().unwrap_or_default())
    }

    fn create_window(&mut self, window: &mut Window) -> Result<()> {
        if window.flags().contains(WindowFlags::OPENGL) && !self.config.opengl {
            return Err(VideoError::Unsupported("OpenGL windows"));
        }
        debug!("HeadlessVideoDriver: create {}", window.id());
        Ok(())
    }

    fn create_window_from(&mut self, window: &mut Window, native: &dyn std::any::Any) -> Result<()> {
        let handle = native
            .downcast_ref::<u64>()
            .ok_or_else(|| VideoError::invalid("headless windows are adopted by u64 handle"))?;
        window.driver_data = Some(Box::new(*handle));
        debug!("HeadlessVideoDriver: adopt handle {:#x} as {}", handle, window.id());
        Ok(())
    }

    fn set_window_title(&mut self, window: &mut Window) -> Result<()> {
        info!("HeadlessVideoDriver: SetTitle '{}'", window.title().unwrap_or(""));
        Ok(())
    }

    fn set_window_icon(&mut self, window: &mut Window, icon: &crate::surface::Surface) -> Result<()> {
        trace!("HeadlessVideoDriver: {}x{} icon for {}", icon.w, icon.h, window.id());
        Ok(())
    }

    fn set_window_position(&mut self, _window: &mut Window) -> Result<()> {
        Ok(())
    }

    fn set_window_size(&mut self, _window: &mut Window) -> Result<()> {
        Ok(())
    }

    fn show_window(&mut self, _window: &mut Window) -> Result<()> {
        Ok(())
    }

    fn hide_window(&mut self, _window: &mut Window) -> Result<()> {
        Ok(())
    }

    fn raise_window(&mut self, _window: &mut Window) -> Result<()> {
        Ok(())
    }

    fn maximize_window(&mut self, _window: &mut Window) -> Result<()> {
        Ok(())
    }

    fn minimize_window(&mut self, _window: &mut Window) -> Result<()> {
        Ok(())
    }

    fn restore_window(&mut self, _window: &mut Window) -> Result<()> {
        Ok(())
    }

    fn set_window_grab(&mut self, window: &mut Window) -> Result<()> {
        let grabbed = window.flags().contains(WindowFlags::INPUT_GRABBED)
            && window.flags().contains(WindowFlags::INPUT_FOCUS);
        self.grabbed.insert(window.id().0, grabbed);
        Ok(())
    }

    fn destroy_window(&mut self, window: &mut Window) -> Result<()> {
        self.grabbed.remove(&window.id().0);
        debug!("HeadlessVideoDriver: destroy {}", window.id());
        Ok(())
    }

    fn get_window_wm_info(&mut self, window: &Window) -> Result<WmInfo> {
        let handle = window
            .driver_data
            .as_ref()
            .and_then(|d| d.downcast_ref::<u64>())
            .copied()
            .unwrap_or(window.id().0 as u64);
        Ok(WmInfo {
            subsystem: "headless".to_string(),
            handle,
        })
    }

    fn supports_opengl(&self) -> bool {
        self.config.opengl
    }

    fn gl_load_library(&mut self, path: Option<&str>) -> Result<()> {
        if !self.config.opengl {
            return Err(VideoError::Unsupported("gl_load_library"));
        }
        debug!("HeadlessVideoDriver: load GL library {:?}", path);
        self.gl_loaded = true;
        Ok(())
    }

    fn gl_get_proc_address(&mut self, name: &str) -> Result<GlProcAddress> {
        self.require_gl()?;
        // Stable fake address derived from the name.
        let address = name
            .bytes()
            .fold(0x1000usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
        Ok(GlProcAddress(address))
    }

    fn gl_unload_library(&mut self) {
        self.gl_loaded = false;
    }

    fn gl_extensions(&mut self) -> Result<String> {
        self.require_gl()?;
        Ok(self.config.gl_extensions.clone())
    }

    fn gl_create_context(&mut self, window: &mut Window) -> Result<GlContext> {
        self.require_gl()?;
        self.next_context += 1;
        let context = GlContext(self.next_context);
        self.current_context = Some(context);
        debug!("HeadlessVideoDriver: GL context {} for {}", context.0, window.id());
        Ok(context)
    }

    fn gl_make_current(&mut self, _window: Option<&mut Window>, context: Option<GlContext>) -> Result<()> {
        self.current_context = context;
        Ok(())
    }

    fn gl_set_swap_interval(&mut self, interval: i32) -> Result<()> {
        self.require_gl()?;
        self.swap_interval = interval;
        Ok(())
    }

    fn gl_get_swap_interval(&mut self) -> Result<i32> {
        self.require_gl()?;
        Ok(self.swap_interval)
    }

    fn gl_swap_window(&mut self, window: &mut Window) -> Result<()> {
        self.require_gl()?;
        trace!("HeadlessVideoDriver: swap {}", window.id());
        Ok(())
    }

    fn gl_delete_context(&mut self, context: GlContext) -> Result<()> {
        if self.current_context == Some(context) {
            self.current_context = None;
        }
        Ok(())
    }

    fn suspend_screensaver(&mut self, suspend: bool) -> Result<()> {
        self.screensaver_suspended = suspend;
        Ok(())
    }

    fn start_text_input(&mut self) -> Result<()> {
        self.text_input = true;
        Ok(())
    }

    fn stop_text_input(&mut self) -> Result<()> {
        self.text_input = false;
        Ok(())
    }

    fn set_text_input_rect(&mut self, _rect: &crate::rect::Rect) -> Result<()> {
        Ok(())
    }

    fn render_drivers(&self, _display: usize) -> Vec<Rc<dyn RenderDriver>> {
        vec![self.render_driver.clone() as Rc<dyn RenderDriver>]
    }
}
