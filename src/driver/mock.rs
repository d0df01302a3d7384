// src/driver/mock.rs

//! Recording video and render drivers for unit tests.
//!
//! Every hook appends a [`Call`] to a shared log so tests can assert on what
//! the core asked the backend to do, and in which order.

use crate::config::Config;
use crate::display::{DisplayMode, GammaRamp, VideoDisplay};
use crate::driver::{GlContext, GlProcAddress, VideoDriver};
use crate::error::{Result, VideoError};
use crate::pixels::{Color, Palette, PixelFormat};
use crate::rect::Rect;
use crate::render::texture::{Texture, TextureId, TextureModulate};
use crate::render::{BlendMode, RenderBackend, RenderDriver, RendererFlags, RendererInfo, ScaleMode};
use crate::video::events::WindowNotification;
use crate::video::window::{Window, WindowId};
use crate::video::VideoDevice;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    VideoQuit,
    SetDisplayMode(DisplayMode),
    SetDisplayPalette(usize),
    SetGammaRamp(GammaRamp),
    CreateWindow(WindowId),
    DestroyWindow(WindowId),
    SetWindowTitle(WindowId, Option<String>),
    SetWindowPosition(WindowId, i32, i32),
    SetWindowSize(WindowId, i32, i32),
    ShowWindow(WindowId),
    HideWindow(WindowId),
    MaximizeWindow(WindowId),
    MinimizeWindow(WindowId),
    RestoreWindow(WindowId),
    SetWindowGrab(WindowId, bool),
    GlLoadLibrary,
    GlUnloadLibrary,
    GlCreateContext(WindowId),
    GlMakeCurrent(Option<GlContext>),
    GlDeleteContext(GlContext),
    SuspendScreensaver(bool),
    CreateRenderer(&'static str, WindowId),
    ActivateRenderer(&'static str),
    DisplayModeChanged(i32, i32),
    DestroyRenderer(&'static str),
    CreateTexture(TextureId),
    DestroyTexture(TextureId),
    UpdateTexture(TextureId, Rect),
    SetTextureBlendMode(TextureId, BlendMode),
    SetTexturePalette(TextureId, usize),
    SetDrawColor(Color),
    RenderPoint(i32, i32),
    RenderLine(i32, i32, i32, i32),
    RenderFill(Rect),
    RenderCopy(TextureId, Rect, Rect),
    ReadPixels(Rect, PixelFormat, usize),
    WritePixels(Rect, PixelFormat, usize),
    Present,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub fn call_log() -> CallLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Calls logged so far that satisfy `pred`.
pub fn count(log: &CallLog, pred: impl Fn(&Call) -> bool) -> usize {
    log.borrow().iter().filter(|c| pred(c)).count()
}

/// One display: 1280x720@60 RGB888 desktop, three more modes, and the
/// render drivers handed to it.
pub struct MockVideoDriver {
    log: CallLog,
    pub desktop: DisplayMode,
    pub modes: Vec<DisplayMode>,
    pub opengl: bool,
    pub fail_create_window: bool,
    pub fail_show_window: bool,
    pub pending_events: Rc<RefCell<Vec<WindowNotification>>>,
    pub render_drivers: Vec<Rc<dyn RenderDriver>>,
}

impl MockVideoDriver {
    pub fn new(log: &CallLog) -> Self {
        MockVideoDriver {
            log: log.clone(),
            desktop: DisplayMode::new(PixelFormat::RGB888, 1280, 720, 60),
            modes: vec![
                DisplayMode::new(PixelFormat::RGB888, 1920, 1080, 60),
                DisplayMode::new(PixelFormat::RGB888, 1280, 720, 60),
                DisplayMode::new(PixelFormat::RGB888, 1280, 720, 30),
                DisplayMode::new(PixelFormat::INDEX8, 640, 480, 60),
            ],
            opengl: false,
            fail_create_window: false,
            fail_show_window: false,
            pending_events: Rc::new(RefCell::new(Vec::new())),
            render_drivers: Vec::new(),
        }
    }

    pub fn with_opengl(mut self) -> Self {
        self.opengl = true;
        self
    }

    pub fn with_render_driver(mut self, driver: MockRenderDriver) -> Self {
        self.render_drivers.push(Rc::new(driver));
        self
    }

    /// Brings the driver up as a device.
    pub fn into_device(self) -> VideoDevice {
        VideoDevice::new("mock", Box::new(self), Config::default()).unwrap()
    }

    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl VideoDriver for MockVideoDriver {
    fn video_init(&mut self, displays: &mut Vec<VideoDisplay>) -> Result<()> {
        displays.push(VideoDisplay::new(self.desktop.clone()));
        Ok(())
    }

    fn video_quit(&mut self) {
        self.record(Call::VideoQuit);
    }

    fn get_display_modes(&mut self, _display: usize) -> Result<Vec<DisplayMode>> {
        Ok(self.modes.clone())
    }

    fn set_display_mode(&mut self, _display: usize, mode: &DisplayMode) -> Result<()> {
        self.record(Call::SetDisplayMode(mode.clone()));
        Ok(())
    }

    fn set_display_palette(&mut self, _display: usize, palette: &Palette) -> Result<()> {
        self.record(Call::SetDisplayPalette(palette.len()));
        Ok(())
    }

    fn set_display_gamma_ramp(&mut self, _display: usize, ramp: &GammaRamp) -> Result<()> {
        self.record(Call::SetGammaRamp(ramp.clone()));
        Ok(())
    }

    fn create_window(&mut self, window: &mut Window) -> Result<()> {
        if self.fail_create_window {
            return Err(VideoError::driver("no native window"));
        }
        self.record(Call::CreateWindow(window.id()));
        Ok(())
    }

    fn set_window_title(&mut self, window: &mut Window) -> Result<()> {
        self.record(Call::SetWindowTitle(window.id(), window.title().map(str::to_string)));
        Ok(())
    }

    fn set_window_position(&mut self, window: &mut Window) -> Result<()> {
        let (x, y) = window.position();
        self.record(Call::SetWindowPosition(window.id(), x, y));
        Ok(())
    }

    fn set_window_size(&mut self, window: &mut Window) -> Result<()> {
        let (w, h) = window.size();
        self.record(Call::SetWindowSize(window.id(), w, h));
        Ok(())
    }

    fn show_window(&mut self, window: &mut Window) -> Result<()> {
        self.record(Call::ShowWindow(window.id()));
        if self.fail_show_window {
            return Err(VideoError::driver("window can't be shown"));
        }
        Ok(())
    }

    fn hide_window(&mut self, window: &mut Window) -> Result<()> {
        self.record(Call::HideWindow(window.id()));
        Ok(())
    }

    fn maximize_window(&mut self, window: &mut Window) -> Result<()> {
        self.record(Call::MaximizeWindow(window.id()));
        Ok(())
    }

    fn minimize_window(&mut self, window: &mut Window) -> Result<()> {
        self.record(Call::MinimizeWindow(window.id()));
        Ok(())
    }

    fn restore_window(&mut self, window: &mut Window) -> Result<()> {
        self.record(Call::RestoreWindow(window.id()));
        Ok(())
    }

    fn set_window_grab(&mut self, window: &mut Window) -> Result<()> {
        let grabbed = window.flags().contains(crate::video::WindowFlags::INPUT_GRABBED);
        self.record(Call::SetWindowGrab(window.id(), grabbed));
        Ok(())
    }

    fn destroy_window(&mut self, window: &mut Window) -> Result<()> {
        self.record(Call::DestroyWindow(window.id()));
        Ok(())
    }

    fn supports_opengl(&self) -> bool {
        self.opengl
    }

    fn gl_load_library(&mut self, _path: Option<&str>) -> Result<()> {
        self.record(Call::GlLoadLibrary);
        Ok(())
    }

    fn gl_get_proc_address(&mut self, name: &str) -> Result<GlProcAddress> {
        Ok(GlProcAddress(name.len()))
    }

    fn gl_unload_library(&mut self) {
        self.record(Call::GlUnloadLibrary);
    }

    fn gl_extensions(&mut self) -> Result<String> {
        Ok("GL_ARB_multitexture GL_EXT_bgra".to_string())
    }

    fn gl_create_context(&mut self, window: &mut Window) -> Result<GlContext> {
        self.record(Call::GlCreateContext(window.id()));
        Ok(GlContext(window.id().0 as u64))
    }

    fn gl_make_current(&mut self, _window: Option<&mut Window>, context: Option<GlContext>) -> Result<()> {
        self.record(Call::GlMakeCurrent(context));
        Ok(())
    }

    fn gl_delete_context(&mut self, context: GlContext) -> Result<()> {
        self.record(Call::GlDeleteContext(context));
        Ok(())
    }

    fn pump_events(&mut self) -> Vec<WindowNotification> {
        self.pending_events.borrow_mut().drain(..).collect()
    }

    fn suspend_screensaver(&mut self, suspend: bool) -> Result<()> {
        self.record(Call::SuspendScreensaver(suspend));
        Ok(())
    }

    fn render_drivers(&self, _display: usize) -> Vec<Rc<dyn RenderDriver>> {
        self.render_drivers.clone()
    }
}

/// Render driver whose renderers log every call.
pub struct MockRenderDriver {
    info: RendererInfo,
    log: CallLog,
    pub fail_create: bool,
    pub fail_create_texture: bool,
}

impl MockRenderDriver {
    pub fn new(name: &'static str, flags: RendererFlags, formats: &[PixelFormat], log: &CallLog) -> Self {
        MockRenderDriver {
            info: RendererInfo {
                name,
                flags,
                mod_modes: TextureModulate::COLOR | TextureModulate::ALPHA,
                blend_modes: BlendMode::all(),
                scale_modes: ScaleMode::FAST,
                texture_formats: formats.to_vec(),
                max_texture_width: 0,
                max_texture_height: 0,
            },
            log: log.clone(),
            fail_create: false,
            fail_create_texture: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_textures(mut self) -> Self {
        self.fail_create_texture = true;
        self
    }
}

impl RenderDriver for MockRenderDriver {
    fn info(&self) -> &RendererInfo {
        &self.info
    }

    fn create_renderer(&self, window: &Window, _flags: RendererFlags) -> Result<Box<dyn RenderBackend>> {
        if self.fail_create {
            return Err(VideoError::driver("renderer unavailable"));
        }
        self.log
            .borrow_mut()
            .push(Call::CreateRenderer(self.info.name, window.id()));
        Ok(Box::new(MockRenderer {
            info: self.info.clone(),
            log: self.log.clone(),
            fail_create_texture: self.fail_create_texture,
            scratch: Vec::new(),
        }))
    }
}

pub struct MockRenderer {
    info: RendererInfo,
    log: CallLog,
    fail_create_texture: bool,
    scratch: Vec<u8>,
}

impl MockRenderer {
    fn record(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }
}

impl RenderBackend for MockRenderer {
    fn info(&self) -> &RendererInfo {
        &self.info
    }

    fn activate(&mut self) -> Result<()> {
        self.record(Call::ActivateRenderer(self.info.name));
        Ok(())
    }

    fn display_mode_changed(&mut self, w: i32, h: i32) -> Result<()> {
        self.record(Call::DisplayModeChanged(w, h));
        Ok(())
    }

    fn create_texture(&mut self, texture: &mut Texture) -> Result<()> {
        if self.fail_create_texture {
            return Err(VideoError::OutOfMemory);
        }
        self.record(Call::CreateTexture(texture.id()));
        Ok(())
    }

    fn set_texture_palette(&mut self, texture: &mut Texture, colors: &[Color], _first: usize) -> Result<()> {
        self.record(Call::SetTexturePalette(texture.id(), colors.len()));
        Ok(())
    }

    fn set_texture_blend_mode(&mut self, texture: &mut Texture) -> Result<()> {
        self.record(Call::SetTextureBlendMode(texture.id(), texture.blend_mode()));
        Ok(())
    }

    fn update_texture(&mut self, texture: &mut Texture, rect: &Rect, _pixels: &[u8], _pitch: usize) -> Result<()> {
        self.record(Call::UpdateTexture(texture.id(), *rect));
        Ok(())
    }

    fn lock_texture(&mut self, texture: &mut Texture, rect: &Rect, _mark_dirty: bool) -> Result<(&mut [u8], usize)> {
        let pitch = texture.size().0 as usize * texture.format().bytes_per_pixel() as usize;
        self.scratch = vec![0; pitch * rect.h as usize];
        Ok((self.scratch.as_mut_slice(), pitch))
    }

    fn destroy_texture(&mut self, texture: &mut Texture) {
        self.record(Call::DestroyTexture(texture.id()));
    }

    fn set_draw_color(&mut self, color: Color) -> Result<()> {
        self.record(Call::SetDrawColor(color));
        Ok(())
    }

    fn render_point(&mut self, x: i32, y: i32) -> Result<()> {
        self.record(Call::RenderPoint(x, y));
        Ok(())
    }

    fn render_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<()> {
        self.record(Call::RenderLine(x1, y1, x2, y2));
        Ok(())
    }

    fn render_fill(&mut self, rect: &Rect) -> Result<()> {
        self.record(Call::RenderFill(*rect));
        Ok(())
    }

    fn render_copy(&mut self, texture: &Texture, src: &Rect, dst: &Rect) -> Result<()> {
        self.record(Call::RenderCopy(texture.id(), *src, *dst));
        Ok(())
    }

    fn render_read_pixels(&mut self, rect: &Rect, format: PixelFormat, pixels: &mut [u8], _pitch: usize) -> Result<()> {
        self.record(Call::ReadPixels(*rect, format, pixels.len()));
        Ok(())
    }

    fn render_write_pixels(&mut self, rect: &Rect, format: PixelFormat, pixels: &[u8], _pitch: usize) -> Result<()> {
        self.record(Call::WritePixels(*rect, format, pixels.len()));
        Ok(())
    }

    fn render_present(&mut self) -> Result<()> {
        self.record(Call::Present);
        Ok(())
    }

    fn destroy(&mut self) {
        self.record(Call::DestroyRenderer(self.info.name));
    }
}
