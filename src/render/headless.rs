// src/render/headless.rs

//! In-memory render driver.
//!
//! Draws into an ARGB8888 framebuffer the size of the window and keeps
//! texture pixels in plain surfaces. Nothing is shown anywhere; presents are
//! only counted. Used by the headless video driver and by tests that want
//! to read back what was drawn.

use crate::error::{Result, VideoError};
use crate::pixels::{Color, PixelFormat};
use crate::rect::Rect;
use crate::render::texture::{Texture, TextureId, TextureModulate};
use crate::render::{BlendMode, RenderBackend, RenderDriver, RendererFlags, RendererInfo, ScaleMode};
use crate::surface::Surface;
use crate::video::window::Window;
use log::{debug, trace};
use std::collections::HashMap;

/// Texture formats the headless renderer stores, in preference order.
pub const TEXTURE_FORMATS: [PixelFormat; 5] = [
    PixelFormat::ARGB8888,
    PixelFormat::ABGR8888,
    PixelFormat::RGB888,
    PixelFormat::RGB565,
    PixelFormat::INDEX8,
];

const MAX_TEXTURE_SIZE: i32 = 4096;

fn headless_info() -> RendererInfo {
    RendererInfo {
        name: "headless",
        flags: RendererFlags::SINGLEBUFFER | RendererFlags::PRESENTCOPY,
        mod_modes: TextureModulate::COLOR | TextureModulate::ALPHA,
        blend_modes: BlendMode::MASK | BlendMode::BLEND | BlendMode::ADD | BlendMode::MOD,
        scale_modes: ScaleMode::FAST | ScaleMode::SLOW | ScaleMode::BEST,
        texture_formats: TEXTURE_FORMATS.to_vec(),
        max_texture_width: MAX_TEXTURE_SIZE,
        max_texture_height: MAX_TEXTURE_SIZE,
    }
}

/// Factory for [`HeadlessRenderer`]s.
#[derive(Debug)]
pub struct HeadlessRenderDriver {
    info: RendererInfo,
}

impl Default for HeadlessRenderDriver {
    fn default() -> Self {
        HeadlessRenderDriver {
            info: headless_info(),
        }
    }
}

impl RenderDriver for HeadlessRenderDriver {
    fn info(&self) -> &RendererInfo {
        &self.info
    }

    fn create_renderer(&self, window: &Window, flags: RendererFlags) -> Result<Box<dyn RenderBackend>> {
        let (w, h) = window.size();
        debug!("HeadlessRenderer for {} ({}x{}, {:?})", window.id(), w, h, flags);
        Ok(Box::new(HeadlessRenderer::new(self.info.clone(), w, h)?))
    }
}

/// A renderer drawing into memory.
pub struct HeadlessRenderer {
    info: RendererInfo,
    framebuffer: Surface,
    textures: HashMap<TextureId, Surface>,
    draw_color: Color,
    blend_mode: BlendMode,
    presents: u64,
}

impl HeadlessRenderer {
    pub fn new(info: RendererInfo, w: i32, h: i32) -> Result<Self> {
        Ok(HeadlessRenderer {
            info,
            framebuffer: Surface::new(w, h, PixelFormat::ARGB8888)?,
            textures: HashMap::new(),
            draw_color: Color::BLACK,
            blend_mode: BlendMode::NONE,
            presents: 0,
        })
    }

    pub fn presents(&self) -> u64 {
        self.presents
    }

    pub fn framebuffer(&self) -> &Surface {
        &self.framebuffer
    }

    fn surface(&self, texture: &Texture) -> Result<&Surface> {
        self.textures
            .get(&texture.id())
            .ok_or_else(|| VideoError::invalid(format!("unknown {}", texture.id())))
    }

    fn surface_mut(&mut self, texture: &Texture) -> Result<&mut Surface> {
        self.textures
            .get_mut(&texture.id())
            .ok_or_else(|| VideoError::invalid(format!("unknown {}", texture.id())))
    }

    fn plot(&mut self, x: i32, y: i32, color: Color, mode: BlendMode) {
        let dst = self.framebuffer.decode(self.framebuffer.pixel(x, y));
        if let Some(out) = blend(color, dst, mode) {
            self.framebuffer.put_pixel(x, y, encode_argb(out));
        }
    }
}

fn encode_argb(c: Color) -> u32 {
    (c.a as u32) << 24 | (c.r as u32) << 16 | (c.g as u32) << 8 | c.b as u32
}

/// Combines `src` over `dst`; `None` leaves the destination untouched.
fn blend(src: Color, dst: Color, mode: BlendMode) -> Option<Color> {
    let mix = |s: u8, d: u8, a: u8| -> u8 {
        ((s as u32 * a as u32 + d as u32 * (255 - a as u32)) / 255) as u8
    };
    if mode.contains(BlendMode::BLEND) {
        Some(Color::rgba(
            mix(src.r, dst.r, src.a),
            mix(src.g, dst.g, src.a),
            mix(src.b, dst.b, src.a),
            dst.a.max(src.a),
        ))
    } else if mode.contains(BlendMode::ADD) {
        let add = |s: u8, d: u8| -> u8 { (d as u32 + s as u32 * src.a as u32 / 255).min(255) as u8 };
        Some(Color::rgba(add(src.r, dst.r), add(src.g, dst.g), add(src.b, dst.b), dst.a))
    } else if mode.contains(BlendMode::MOD) {
        let modulate = |s: u8, d: u8| -> u8 { (s as u32 * d as u32 / 255) as u8 };
        Some(Color::rgba(
            modulate(src.r, dst.r),
            modulate(src.g, dst.g),
            modulate(src.b, dst.b),
            dst.a,
        ))
    } else if mode.contains(BlendMode::MASK) {
        (src.a != 0).then_some(src)
    } else {
        Some(src)
    }
}

fn modulate(color: Color, texture: &Texture) -> Color {
    let mut c = color;
    if texture.mod_mode().contains(TextureModulate::COLOR) {
        let (r, g, b) = texture.color_mod();
        c.r = (c.r as u32 * r as u32 / 255) as u8;
        c.g = (c.g as u32 * g as u32 / 255) as u8;
        c.b = (c.b as u32 * b as u32 / 255) as u8;
    }
    if texture.mod_mode().contains(TextureModulate::ALPHA) {
        c.a = (c.a as u32 * texture.alpha_mod() as u32 / 255) as u8;
    }
    c
}

/// Copies `rows` rows of `row_bytes` bytes between two pitched buffers.
#[allow(clippy::too_many_arguments)]
fn copy_rows(
    dst: &mut [u8],
    dst_pitch: usize,
    dst_origin: usize,
    src: &[u8],
    src_pitch: usize,
    src_origin: usize,
    row_bytes: usize,
    rows: usize,
) -> Result<()> {
    for row in 0..rows {
        let d = dst_origin + row * dst_pitch;
        let s = src_origin + row * src_pitch;
        let (Some(d), Some(s)) = (dst.get_mut(d..d + row_bytes), src.get(s..s + row_bytes)) else {
            return Err(VideoError::invalid("pixel buffer is too small"));
        };
        d.copy_from_slice(s);
    }
    Ok(())
}

impl RenderBackend for HeadlessRenderer {
    fn info(&self) -> &RendererInfo {
        &self.info
    }

    fn activate(&mut self) -> Result<()> {
        Ok(())
    }

    fn display_mode_changed(&mut self, w: i32, h: i32) -> Result<()> {
        if (self.framebuffer.w, self.framebuffer.h) != (w, h) {
            debug!("HeadlessRenderer: framebuffer resized to {}x{}", w, h);
            self.framebuffer = Surface::new(w, h, PixelFormat::ARGB8888)?;
        }
        Ok(())
    }

    fn create_texture(&mut self, texture: &mut Texture) -> Result<()> {
        if !self.info.supports_format(texture.format()) {
            return Err(VideoError::UnsupportedFormat(texture.format().to_string()));
        }
        let (w, h) = texture.size();
        if w > MAX_TEXTURE_SIZE || h > MAX_TEXTURE_SIZE {
            return Err(VideoError::invalid(format!("texture size {}x{} exceeds {}", w, h, MAX_TEXTURE_SIZE)));
        }
        self.textures.insert(texture.id(), Surface::new(w, h, texture.format())?);
        Ok(())
    }

    fn query_texture_pixels(&mut self, texture: &Texture) -> Result<(&[u8], usize)> {
        let surface = self.surface(texture)?;
        Ok((surface.pixels.as_slice(), surface.pitch))
    }

    fn set_texture_palette(&mut self, texture: &mut Texture, colors: &[Color], first: usize) -> Result<()> {
        let surface = self.surface_mut(texture)?;
        match surface.palette.as_mut() {
            Some(palette) => palette.set_colors(colors, first),
            None => Err(VideoError::invalid("Texture not a palettized format")),
        }
    }

    fn get_texture_palette(&mut self, texture: &Texture, first: usize, count: usize) -> Result<Vec<Color>> {
        let palette = self
            .surface(texture)?
            .palette
            .as_ref()
            .ok_or_else(|| VideoError::invalid("Texture not a palettized format"))?;
        palette
            .colors()
            .get(first..first.saturating_add(count))
            .map(<[Color]>::to_vec)
            .ok_or_else(|| VideoError::invalid("palette indices are out of range"))
    }

    fn set_texture_color_mod(&mut self, _texture: &mut Texture) -> Result<()> {
        Ok(())
    }

    fn set_texture_alpha_mod(&mut self, _texture: &mut Texture) -> Result<()> {
        Ok(())
    }

    fn set_texture_blend_mode(&mut self, texture: &mut Texture) -> Result<()> {
        let mode = texture.blend_mode();
        if mode != BlendMode::NONE && !self.info.blend_modes.contains(mode) {
            return Err(VideoError::Unsupported("texture blend mode"));
        }
        Ok(())
    }

    fn set_texture_scale_mode(&mut self, texture: &mut Texture) -> Result<()> {
        let mode = texture.scale_mode();
        if mode != ScaleMode::NONE && !self.info.scale_modes.contains(mode) {
            return Err(VideoError::Unsupported("texture scale mode"));
        }
        Ok(())
    }

    fn update_texture(&mut self, texture: &mut Texture, rect: &Rect, pixels: &[u8], pitch: usize) -> Result<()> {
        let surface = self.surface_mut(texture)?;
        let bpp = surface.bytes_per_pixel();
        let origin = rect.y as usize * surface.pitch + rect.x as usize * bpp;
        let dst_pitch = surface.pitch;
        copy_rows(
            &mut surface.pixels,
            dst_pitch,
            origin,
            pixels,
            pitch,
            0,
            rect.w as usize * bpp,
            rect.h as usize,
        )
    }

    fn lock_texture(&mut self, texture: &mut Texture, rect: &Rect, _mark_dirty: bool) -> Result<(&mut [u8], usize)> {
        let surface = self.surface_mut(texture)?;
        let origin = rect.y as usize * surface.pitch + rect.x as usize * surface.bytes_per_pixel();
        let pitch = surface.pitch;
        let pixels = surface
            .pixels
            .get_mut(origin..)
            .ok_or_else(|| VideoError::invalid("lock rectangle is outside the texture"))?;
        Ok((pixels, pitch))
    }

    fn destroy_texture(&mut self, texture: &mut Texture) {
        self.textures.remove(&texture.id());
    }

    fn set_draw_color(&mut self, color: Color) -> Result<()> {
        self.draw_color = color;
        Ok(())
    }

    fn set_draw_blend_mode(&mut self, mode: BlendMode) -> Result<()> {
        self.blend_mode = mode;
        Ok(())
    }

    fn render_point(&mut self, x: i32, y: i32) -> Result<()> {
        self.plot(x, y, self.draw_color, self.blend_mode);
        Ok(())
    }

    fn render_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<()> {
        let (dx, dy) = ((x2 - x1).abs(), -(y2 - y1).abs());
        let (sx, sy) = ((x2 - x1).signum(), (y2 - y1).signum());
        let (mut x, mut y, mut err) = (x1, y1, dx + dy);
        loop {
            self.plot(x, y, self.draw_color, self.blend_mode);
            if x == x2 && y == y2 {
                return Ok(());
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn render_fill(&mut self, rect: &Rect) -> Result<()> {
        for y in rect.y..rect.y + rect.h {
            for x in rect.x..rect.x + rect.w {
                self.plot(x, y, self.draw_color, self.blend_mode);
            }
        }
        Ok(())
    }

    fn render_copy(&mut self, texture: &Texture, src: &Rect, dst: &Rect) -> Result<()> {
        let source = self
            .textures
            .get(&texture.id())
            .ok_or_else(|| VideoError::invalid(format!("unknown {}", texture.id())))?;
        trace!("HeadlessRenderer: copy {} {:?} -> {:?}", texture.id(), src, dst);
        for dy in 0..dst.h {
            let sy = src.y + dy * src.h / dst.h;
            for dx in 0..dst.w {
                let sx = src.x + dx * src.w / dst.w;
                let color = modulate(source.decode(source.pixel(sx, sy)), texture);
                let (x, y) = (dst.x + dx, dst.y + dy);
                let under = self.framebuffer.decode(self.framebuffer.pixel(x, y));
                if let Some(out) = blend(color, under, texture.blend_mode()) {
                    self.framebuffer.put_pixel(x, y, encode_argb(out));
                }
            }
        }
        Ok(())
    }

    fn render_read_pixels(&mut self, rect: &Rect, format: PixelFormat, pixels: &mut [u8], pitch: usize) -> Result<()> {
        if format != PixelFormat::ARGB8888 {
            return Err(VideoError::UnsupportedFormat(format.to_string()));
        }
        let fb = &self.framebuffer;
        let origin = rect.y as usize * fb.pitch + rect.x as usize * 4;
        copy_rows(pixels, pitch, 0, &fb.pixels, fb.pitch, origin, rect.w as usize * 4, rect.h as usize)
    }

    fn render_write_pixels(&mut self, rect: &Rect, format: PixelFormat, pixels: &[u8], pitch: usize) -> Result<()> {
        if format != PixelFormat::ARGB8888 {
            return Err(VideoError::UnsupportedFormat(format.to_string()));
        }
        let fb_pitch = self.framebuffer.pitch;
        let origin = rect.y as usize * fb_pitch + rect.x as usize * 4;
        copy_rows(
            &mut self.framebuffer.pixels,
            fb_pitch,
            origin,
            pixels,
            pitch,
            0,
            rect.w as usize * 4,
            rect.h as usize,
        )
    }

    fn render_present(&mut self) -> Result<()> {
        self.presents += 1;
        trace!("HeadlessRenderer: present #{}", self.presents);
        Ok(())
    }

    fn destroy(&mut self) {
        debug!("HeadlessRenderer: releasing {} textures", self.textures.len());
        self.textures.clear();
    }
}
