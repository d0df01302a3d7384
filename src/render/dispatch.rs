// src/render/dispatch.rs

//! Draw, copy and pixel-transfer dispatch.
//!
//! Geometry is clipped against the window before it reaches the driver;
//! copies are also clipped against the texture, and the source rectangle
//! shrinks by the same fraction the destination lost. Anything clipped away
//! entirely succeeds without calling the driver.

use crate::error::{Result, VideoError};
use crate::pixels::PixelFormat;
use crate::rect::{Point, Rect};
use crate::render::texture::TextureId;
use crate::video::VideoDevice;
use log::trace;

/// Adjusts `src` for a destination that was clipped from `requested` to
/// `clipped`.
///
/// `clipped` lies inside `requested`, so each adjusted edge stays within
/// `src`; the products are taken in i64 so extreme destinations can't
/// overflow.
pub fn shrink_source(src: Rect, requested: &Rect, clipped: &Rect) -> Rect {
    let scale = |delta: i64, extent: i32, total: i32| -> i32 { (delta * extent as i64 / total as i64) as i32 };
    let mut src = src;
    if requested.w != clipped.w {
        let deltax = clipped.x as i64 - requested.x as i64;
        let deltaw = clipped.w as i64 - requested.w as i64;
        let (x, w) = (scale(deltax, src.w, requested.w), scale(deltaw, src.w, requested.w));
        src.x += x;
        src.w += w;
    }
    if requested.h != clipped.h {
        let deltay = clipped.y as i64 - requested.y as i64;
        let deltah = clipped.h as i64 - requested.h as i64;
        let (y, h) = (scale(deltay, src.h, requested.h), scale(deltah, src.h, requested.h));
        src.y += y;
        src.h += h;
    }
    src
}

/// Byte offset of the clipped origin inside a caller buffer laid out for
/// `requested`. Saturates; an offset past the buffer is caught by the caller.
fn clipped_offset(requested: &Rect, clipped: &Rect, pitch: usize, bytes_per_pixel: usize) -> usize {
    let rows = (clipped.y as i64 - requested.y as i64).max(0) as usize;
    let cols = (clipped.x as i64 - requested.x as i64).max(0) as usize;
    rows.saturating_mul(pitch)
        .saturating_add(cols.saturating_mul(bytes_per_pixel))
}

impl VideoDevice {
    pub fn render_point(&mut self, x: i32, y: i32) -> Result<()> {
        let (renderer, bounds) = self.current_renderer_mut()?;
        if !bounds.contains(Point::new(x, y)) {
            return Ok(());
        }
        trace!("render_point({}, {})", x, y);
        renderer.backend.render_point(x, y)
    }

    pub fn render_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<()> {
        let (renderer, bounds) = self.current_renderer_mut()?;
        let Some((a, b)) = bounds.clip_line(Point::new(x1, y1), Point::new(x2, y2)) else {
            return Ok(());
        };
        trace!("render_line({}, {}) -> ({}, {})", a.x, a.y, b.x, b.y);
        renderer.backend.render_line(a.x, a.y, b.x, b.y)
    }

    /// Fills `rect`, or the whole window for `None`.
    pub fn render_fill(&mut self, rect: Option<&Rect>) -> Result<()> {
        let (renderer, bounds) = self.current_renderer_mut()?;
        let real = match rect {
            Some(rect) => match rect.intersect(&bounds) {
                Some(real) => real,
                None => return Ok(()),
            },
            None => bounds,
        };
        trace!("render_fill({:?})", real);
        renderer.backend.render_fill(&real)
    }

    /// Copies part of a texture into part of the window.
    ///
    /// `None` means the whole texture or the whole window. The texture must
    /// belong to the current renderer.
    pub fn render_copy(&mut self, texture: TextureId, src: Option<&Rect>, dst: Option<&Rect>) -> Result<()> {
        let owner = self.texture(texture)?.owner;
        let (renderer, bounds) = self.current_renderer_mut()?;
        if owner != renderer.window {
            return Err(VideoError::WrongRenderer);
        }
        let tex = renderer
            .textures
            .get(&texture)
            .ok_or(VideoError::WrongRenderer)?;

        let mut real_src = tex.bounds();
        if let Some(src) = src {
            match src.intersect(&real_src) {
                Some(clipped) => real_src = clipped,
                None => return Ok(()),
            }
        }

        let mut real_dst = bounds;
        if let Some(dst) = dst {
            match dst.intersect(&bounds) {
                Some(clipped) => {
                    real_src = shrink_source(real_src, dst, &clipped);
                    real_dst = clipped;
                }
                None => return Ok(()),
            }
        }

        trace!("render_copy({}, {:?} -> {:?})", texture, real_src, real_dst);
        renderer.backend.render_copy(tex, &real_src, &real_dst)
    }

    /// Reads window pixels into `pixels`, laid out with `pitch` for the
    /// requested rectangle. Rows and columns that fall outside the window
    /// are skipped in the buffer. [`PixelFormat::UNKNOWN`] means the display
    /// format.
    pub fn render_read_pixels(
        &mut self,
        rect: Option<&Rect>,
        format: PixelFormat,
        pixels: &mut [u8],
        pitch: usize,
    ) -> Result<()> {
        let mode_format = self.current_display().current_mode.format;
        let format = if format.is_unknown() { mode_format } else { format };
        let (renderer, bounds) = self.current_renderer_mut()?;
        let (real, offset) = match rect {
            Some(rect) => match rect.intersect(&bounds) {
                Some(real) => {
                    let bpp = mode_format.bytes_per_pixel() as usize;
                    (real, clipped_offset(rect, &real, pitch, bpp))
                }
                None => return Ok(()),
            },
            None => (bounds, 0),
        };
        let pixels = pixels
            .get_mut(offset..)
            .ok_or_else(|| VideoError::invalid("pixel buffer is too small"))?;
        trace!("render_read_pixels({:?}, {})", real, format);
        renderer.backend.render_read_pixels(&real, format, pixels, pitch)
    }

    /// Writes `pixels` into the window; the counterpart of
    /// [`VideoDevice::render_read_pixels`].
    pub fn render_write_pixels(
        &mut self,
        rect: Option<&Rect>,
        format: PixelFormat,
        pixels: &[u8],
        pitch: usize,
    ) -> Result<()> {
        let mode_format = self.current_display().current_mode.format;
        let format = if format.is_unknown() { mode_format } else { format };
        let (renderer, bounds) = self.current_renderer_mut()?;
        let (real, offset) = match rect {
            Some(rect) => match rect.intersect(&bounds) {
                Some(real) => {
                    let bpp = mode_format.bytes_per_pixel() as usize;
                    (real, clipped_offset(rect, &real, pitch, bpp))
                }
                None => return Ok(()),
            },
            None => (bounds, 0),
        };
        let pixels = pixels
            .get(offset..)
            .ok_or_else(|| VideoError::invalid("pixel buffer is too small"))?;
        trace!("render_write_pixels({:?}, {})", real, format);
        renderer.backend.render_write_pixels(&real, format, pixels, pitch)
    }

    pub fn render_present(&mut self) -> Result<()> {
        let (renderer, _) = self.current_renderer_mut()?;
        trace!("render_present({})", renderer.window);
        renderer.backend.render_present()
    }
}
