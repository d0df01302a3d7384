// src/render/mod.rs

//! 2D renderers: the render driver SPI and the renderer lifecycle.
//!
//! - `texture`: texture records, the per-display texture registry and
//!   texture operations
//! - `format`: picks a texture format for arbitrary source surfaces
//! - `dispatch`: clipped draw/copy/read/write/present forwarding
//! - `headless`: an in-memory render driver
//!
//! A [`RenderDriver`] describes what a backend can do and instantiates a
//! [`RenderBackend`] for one window. The resulting [`Renderer`] is owned by
//! its window and in turn owns its textures, so destroying a window or a
//! renderer drops everything below it.

pub mod dispatch;
pub mod format;
pub mod headless;
pub mod texture;


use crate::config::RENDER_DRIVER_ENV;
use crate::error::{tolerate_unsupported, Result, VideoError};
use crate::pixels::{Color, PixelFormat};
use crate::rect::Rect;
use crate::video::window::{Window, WindowId};
use crate::video::VideoDevice;
use bitflags::bitflags;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub use texture::{Texture, TextureAccess, TextureId, TextureModulate, TextureRegistry};

bitflags! {
    /// Capabilities a renderer advertises and callers may request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RendererFlags: u32 {
        const SINGLEBUFFER = 0x0000_0001;
        const PRESENTCOPY = 0x0000_0002;
        const PRESENTFLIP2 = 0x0000_0004;
        const PRESENTFLIP3 = 0x0000_0008;
        const PRESENTDISCARD = 0x0000_0010;
        const PRESENTVSYNC = 0x0000_0020;
        const ACCELERATED = 0x0000_0040;
    }
}

bitflags! {
    /// How source pixels combine with the destination.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BlendMode: u32 {
        const NONE = 0x0000_0000;
        const MASK = 0x0000_0001;
        const BLEND = 0x0000_0002;
        const ADD = 0x0000_0004;
        const MOD = 0x0000_0008;
    }
}

bitflags! {
    /// Filtering used when a copy scales its source.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScaleMode: u32 {
        const NONE = 0x0000_0000;
        const FAST = 0x0000_0001;
        const SLOW = 0x0000_0002;
        const BEST = 0x0000_0004;
    }
}

/// Static capability descriptor of a render driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererInfo {
    pub name: &'static str,
    pub flags: RendererFlags,
    pub mod_modes: TextureModulate,
    pub blend_modes: BlendMode,
    pub scale_modes: ScaleMode,
    /// Texture formats in the driver's preference order.
    pub texture_formats: Vec<PixelFormat>,
    /// 0 means unlimited.
    pub max_texture_width: i32,
    pub max_texture_height: i32,
}

impl RendererInfo {
    pub fn supports_format(&self, format: PixelFormat) -> bool {
        self.texture_formats.contains(&format)
    }
}

/// Instantiates renderers of one kind.
pub trait RenderDriver {
    fn info(&self) -> &RendererInfo;

    fn create_renderer(&self, window: &Window, flags: RendererFlags) -> Result<Box<dyn RenderBackend>>;
}

/// One renderer instance, bound to a window.
///
/// As with [`crate::driver::VideoDriver`], hooks a backend does not provide
/// report `Unsupported`.
pub trait RenderBackend {
    /// Capabilities of this instance.
    fn info(&self) -> &RendererInfo;

    /// Called before the renderer becomes current again.
    fn activate(&mut self) -> Result<()> {
        Err(VideoError::Unsupported("activate_renderer"))
    }

    /// The window was resized or the display mode changed under it.
    fn display_mode_changed(&mut self, _w: i32, _h: i32) -> Result<()> {
        Ok(())
    }

    // --- Textures ---

    fn create_texture(&mut self, _texture: &mut Texture) -> Result<()> {
        Err(VideoError::Unsupported("create_texture"))
    }

    /// Direct read access to a texture's pixels and their pitch.
    fn query_texture_pixels(&mut self, _texture: &Texture) -> Result<(&[u8], usize)> {
        Err(VideoError::Unsupported("query_texture_pixels"))
    }

    fn set_texture_palette(&mut self, _texture: &mut Texture, _colors: &[Color], _first: usize) -> Result<()> {
        Err(VideoError::Unsupported("set_texture_palette"))
    }

    fn get_texture_palette(&mut self, _texture: &Texture, _first: usize, _count: usize) -> Result<Vec<Color>> {
        Err(VideoError::Unsupported("get_texture_palette"))
    }

    fn set_texture_color_mod(&mut self, _texture: &mut Texture) -> Result<()> {
        Err(VideoError::Unsupported("set_texture_color_mod"))
    }

    fn set_texture_alpha_mod(&mut self, _texture: &mut Texture) -> Result<()> {
        Err(VideoError::Unsupported("set_texture_alpha_mod"))
    }

    fn set_texture_blend_mode(&mut self, _texture: &mut Texture) -> Result<()> {
        Err(VideoError::Unsupported("set_texture_blend_mode"))
    }

    fn set_texture_scale_mode(&mut self, _texture: &mut Texture) -> Result<()> {
        Err(VideoError::Unsupported("set_texture_scale_mode"))
    }

    fn update_texture(&mut self, _texture: &mut Texture, _rect: &Rect, _pixels: &[u8], _pitch: usize) -> Result<()> {
        Err(VideoError::Unsupported("update_texture"))
    }

    /// Exposes the pixels of `rect` for writing; returns them with their pitch.
    fn lock_texture(&mut self, _texture: &mut Texture, _rect: &Rect, _mark_dirty: bool) -> Result<(&mut [u8], usize)> {
        Err(VideoError::Unsupported("lock_texture"))
    }

    fn unlock_texture(&mut self, _texture: &mut Texture) {}

    fn dirty_texture(&mut self, _texture: &mut Texture, _rects: &[Rect]) {}

    fn destroy_texture(&mut self, _texture: &mut Texture) {}

    // --- Drawing ---

    fn set_draw_color(&mut self, _color: Color) -> Result<()> {
        Err(VideoError::Unsupported("set_draw_color"))
    }

    fn set_draw_blend_mode(&mut self, _mode: BlendMode) -> Result<()> {
        Err(VideoError::Unsupported("set_draw_blend_mode"))
    }

    fn render_point(&mut self, _x: i32, _y: i32) -> Result<()> {
        Err(VideoError::Unsupported("render_point"))
    }

    fn render_line(&mut self, _x1: i32, _y1: i32, _x2: i32, _y2: i32) -> Result<()> {
        Err(VideoError::Unsupported("render_line"))
    }

    fn render_fill(&mut self, _rect: &Rect) -> Result<()> {
        Err(VideoError::Unsupported("render_fill"))
    }

    fn render_copy(&mut self, _texture: &Texture, _src: &Rect, _dst: &Rect) -> Result<()> {
        Err(VideoError::Unsupported("render_copy"))
    }

    fn render_read_pixels(&mut self, _rect: &Rect, _format: PixelFormat, _pixels: &mut [u8], _pitch: usize) -> Result<()> {
        Err(VideoError::Unsupported("render_read_pixels"))
    }

    fn render_write_pixels(&mut self, _rect: &Rect, _format: PixelFormat, _pixels: &[u8], _pitch: usize) -> Result<()> {
        Err(VideoError::Unsupported("render_write_pixels"))
    }

    fn render_present(&mut self) -> Result<()> {
        Err(VideoError::Unsupported("render_present"))
    }

    /// Releases backend resources. The renderer's textures are gone by now.
    fn destroy(&mut self) {}
}

/// The active 2D drawing context of one window.
pub struct Renderer {
    pub(crate) window: WindowId,
    pub(crate) backend: Box<dyn RenderBackend>,
    pub(crate) textures: BTreeMap<TextureId, Texture>,
    pub(crate) draw_color: Color,
    pub(crate) blend_mode: BlendMode,
}

impl Renderer {
    fn new(window: WindowId, backend: Box<dyn RenderBackend>) -> Self {
        Renderer {
            window,
            backend,
            textures: BTreeMap::new(),
            draw_color: Color::rgba(0, 0, 0, 0xFF),
            blend_mode: BlendMode::NONE,
        }
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn info(&self) -> &RendererInfo {
        self.backend.info()
    }

    pub fn draw_color(&self) -> Color {
        self.draw_color
    }

    pub fn draw_blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn textures(&self) -> impl Iterator<Item = &Texture> {
        self.textures.values()
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("window", &self.window)
            .field("driver", &self.backend.info().name)
            .field("textures", &self.textures.len())
            .finish()
    }
}

impl VideoDevice {
    // --- Render drivers ---

    pub fn num_render_drivers(&self) -> usize {
        self.current_display().render_drivers.len()
    }

    pub fn render_driver_info(&self, index: usize) -> Result<RendererInfo> {
        let drivers = &self.current_display().render_drivers;
        drivers.get(index).map(|d| d.info().clone()).ok_or_else(|| {
            VideoError::invalid(format!(
                "index must be in the range of 0 - {}",
                drivers.len().saturating_sub(1)
            ))
        })
    }

    /// Makes another render driver available on `display`.
    pub fn add_render_driver(&mut self, display: usize, driver: Rc<dyn RenderDriver>) -> Result<()> {
        let name = driver.info().name;
        self.displays
            .get_mut(display)
            .ok_or_else(|| VideoError::invalid(format!("invalid display index {}", display)))?
            .render_drivers
            .push(driver);
        debug!("Render driver '{}' added to display {}", name, display);
        Ok(())
    }

    // --- Lifecycle ---

    /// Creates the renderer of `window`, replacing any existing one.
    ///
    /// With `index` the given driver is used unconditionally. Without it, a
    /// renderer name from `CORE_VIDEO_RENDERER` (or the configuration) is
    /// honored; otherwise the first driver advertising every requested flag
    /// that also instantiates successfully wins. The new renderer becomes
    /// current on its display.
    pub fn create_renderer(&mut self, window: WindowId, index: Option<usize>, flags: RendererFlags) -> Result<()> {
        let (d, _) = self.locate_window(window)?;
        self.destroy_renderer(window)?;

        let drivers = self.displays[d].render_drivers.clone();
        let (d, i) = self.locate_window(window)?;
        let target = &self.displays[d].windows[i];
        let backend = match index {
            Some(index) => {
                let driver = drivers.get(index).ok_or_else(|| {
                    VideoError::invalid(format!(
                        "index must be -1 or in the range of 0 - {}",
                        drivers.len().saturating_sub(1)
                    ))
                })?;
                driver.create_renderer(target, flags)?
            }
            None => match self.render_driver_override() {
                Some(name) => drivers
                    .iter()
                    .find(|driver| driver.info().name.eq_ignore_ascii_case(&name))
                    .ok_or(VideoError::NoMatchingDriver)?
                    .create_renderer(target, flags)?,
                None => drivers
                    .iter()
                    .filter(|driver| driver.info().flags.contains(flags))
                    .find_map(|driver| match driver.create_renderer(target, flags) {
                        Ok(backend) => Some(backend),
                        Err(e) => {
                            debug!("Render driver '{}' failed: {}", driver.info().name, e);
                            None
                        }
                    })
                    .ok_or(VideoError::NoMatchingDriver)?,
            },
        };

        info!("Created '{}' renderer for {}", backend.info().name, window);
        self.displays[d].windows[i].renderer = Some(Renderer::new(window, backend));
        self.select_renderer(window)
    }

    fn render_driver_override(&self) -> Option<String> {
        std::env::var(RENDER_DRIVER_ENV)
            .ok()
            .filter(|name| !name.is_empty())
            .or_else(|| self.config.render.driver.clone())
    }

    /// Makes the renderer of `window` current on its display.
    pub fn select_renderer(&mut self, window: WindowId) -> Result<()> {
        let (d, i) = self.locate_window(window)?;
        let renderer = self.displays[d].windows[i]
            .renderer
            .as_mut()
            .ok_or_else(|| VideoError::invalid("Use create_renderer() to create a renderer"))?;
        tolerate_unsupported(renderer.backend.activate())?;
        self.displays[d].current_renderer = Some(window);
        Ok(())
    }

    /// Destroys the renderer of `window` and every texture it owns.
    ///
    /// A window without a renderer is left alone.
    pub fn destroy_renderer(&mut self, window: WindowId) -> Result<()> {
        let (d, i) = self.locate_window(window)?;
        if self.displays[d].windows[i].renderer.is_none() {
            return Ok(());
        }
        for id in self.displays[d].textures.owned_by(window) {
            self.destroy_texture(id);
        }
        if let Some(mut renderer) = self.displays[d].windows[i].renderer.take() {
            renderer.backend.destroy();
            info!("Destroyed '{}' renderer of {}", renderer.info().name, window);
        }
        if self.displays[d].current_renderer == Some(window) {
            self.displays[d].current_renderer = None;
        }
        Ok(())
    }

    /// Capabilities of the current renderer.
    pub fn renderer_info(&self) -> Result<RendererInfo> {
        Ok(self.current_renderer()?.info().clone())
    }

    /// The current renderer of the current display.
    pub fn current_renderer(&self) -> Result<&Renderer> {
        let display = self.current_display();
        display
            .current_renderer
            .and_then(|id| display.window(id))
            .and_then(|w| w.renderer.as_ref())
            .ok_or(VideoError::NotInitialized("renderer"))
    }

    /// The current renderer with the size of the window it draws into.
    pub(crate) fn current_renderer_mut(&mut self) -> Result<(&mut Renderer, Rect)> {
        let display = &mut self.displays[self.current_display];
        let id = display.current_renderer.ok_or(VideoError::NotInitialized("renderer"))?;
        let window = display
            .window_mut(id)
            .ok_or(VideoError::NotInitialized("renderer"))?;
        let bounds = Rect::sized(window.w, window.h);
        let renderer = window
            .renderer
            .as_mut()
            .ok_or(VideoError::NotInitialized("renderer"))?;
        Ok((renderer, bounds))
    }

    // --- Draw state ---

    pub fn set_render_draw_color(&mut self, color: Color) -> Result<()> {
        let (renderer, _) = self.current_renderer_mut()?;
        renderer.draw_color = color;
        tolerate_unsupported(renderer.backend.set_draw_color(color))
    }

    pub fn render_draw_color(&self) -> Result<Color> {
        Ok(self.current_renderer()?.draw_color)
    }

    pub fn set_render_draw_blend_mode(&mut self, mode: BlendMode) -> Result<()> {
        let (renderer, _) = self.current_renderer_mut()?;
        renderer.blend_mode = mode;
        tolerate_unsupported(renderer.backend.set_draw_blend_mode(mode))
    }

    pub fn render_draw_blend_mode(&self) -> Result<BlendMode> {
        Ok(self.current_renderer()?.blend_mode)
    }
}
