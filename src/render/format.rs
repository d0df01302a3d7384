// src/render/format.rs

//! Chooses the texture format used to materialize a surface, and builds the
//! texture.
//!
//! Opaque surfaces keep their own format when the renderer takes it, and
//! otherwise get the best opaque or indexed format the renderer advertises.
//! Surfaces that need alpha (an alpha channel, a color key, or mask/blend
//! copying) keep their own format if it has alpha, then try ARGB8888, then
//! the best alpha format the renderer advertises.

use crate::error::{tolerate_unsupported, Result, VideoError};
use crate::pixels::{Palette, PixelFormat};
use crate::render::texture::{TextureAccess, TextureId};
use crate::render::{BlendMode, RendererInfo};
use crate::surface::{CopyFlags, Surface};
use crate::video::VideoDevice;
use log::{debug, warn};

/// Opaque and indexed formats, best first.
pub const OPAQUE_FORMATS: [PixelFormat; 24] = [
    PixelFormat::ARGB8888,
    PixelFormat::RGBA8888,
    PixelFormat::ABGR8888,
    PixelFormat::BGRA8888,
    PixelFormat::RGB888,
    PixelFormat::BGR888,
    PixelFormat::RGB24,
    PixelFormat::BGR24,
    PixelFormat::RGB565,
    PixelFormat::BGR565,
    PixelFormat::ARGB1555,
    PixelFormat::ABGR1555,
    PixelFormat::RGB555,
    PixelFormat::BGR555,
    PixelFormat::ARGB4444,
    PixelFormat::ABGR4444,
    PixelFormat::RGB444,
    PixelFormat::ARGB2101010,
    PixelFormat::INDEX8,
    PixelFormat::INDEX4LSB,
    PixelFormat::INDEX4MSB,
    PixelFormat::RGB332,
    PixelFormat::INDEX1LSB,
    PixelFormat::INDEX1MSB,
];

/// Formats with an alpha channel, best first.
pub const ALPHA_FORMATS: [PixelFormat; 9] = [
    PixelFormat::ARGB8888,
    PixelFormat::RGBA8888,
    PixelFormat::ABGR8888,
    PixelFormat::BGRA8888,
    PixelFormat::ARGB1555,
    PixelFormat::ABGR1555,
    PixelFormat::ARGB4444,
    PixelFormat::ABGR4444,
    PixelFormat::ARGB2101010,
];

fn needs_alpha(surface: &Surface) -> bool {
    surface.masks.a != 0
        || surface
            .copy_flags
            .intersects(CopyFlags::COLORKEY | CopyFlags::MASK | CopyFlags::BLEND)
}

fn first_supported(ranked: &[PixelFormat], info: &RendererInfo) -> Option<PixelFormat> {
    ranked.iter().copied().find(|f| info.supports_format(*f))
}

/// Picks the texture format for `surface` given what the renderer supports.
///
/// Deterministic: the same surface format and flags against the same
/// capability set always produce the same answer.
pub fn negotiate_texture_format(surface: &Surface, info: &RendererInfo) -> Result<PixelFormat> {
    let native = surface.format();
    if !needs_alpha(surface) {
        if native.is_unknown() {
            return Err(VideoError::UnsupportedFormat("unknown surface format".to_string()));
        }
        if info.supports_format(native) {
            return Ok(native);
        }
        return first_supported(&OPAQUE_FORMATS, info).ok_or_else(|| {
            VideoError::UnsupportedFormat(
                "any of the supported pixel formats can't be found".to_string(),
            )
        });
    }

    if surface.masks.a != 0 && !native.is_unknown() && info.supports_format(native) {
        return Ok(native);
    }
    if info.supports_format(PixelFormat::ARGB8888) {
        return Ok(PixelFormat::ARGB8888);
    }
    first_supported(&ALPHA_FORMATS, info).ok_or_else(|| {
        VideoError::UnsupportedFormat("compatible pixel format can't be found".to_string())
    })
}

impl VideoDevice {
    /// Creates a static texture holding the pixels of `surface`.
    ///
    /// A known `format` is used as given; [`PixelFormat::UNKNOWN`] lets the
    /// negotiator choose. If a negotiated format can't be created, the
    /// desktop format is tried once. The surface's modulation, blend and
    /// scale state (and palette, for indexed results) carry over.
    pub fn create_texture_from_surface(&mut self, format: PixelFormat, surface: &mut Surface) -> Result<TextureId> {
        let requested = !format.is_unknown();
        let mut format = if requested {
            if format.masks().is_none() {
                return Err(VideoError::UnsupportedFormat(format.to_string()));
            }
            format
        } else {
            negotiate_texture_format(surface, self.current_renderer()?.info())?
        };
        debug!("Materializing {}x{} surface as {}", surface.w, surface.h, format);

        let id = match self.create_texture(format, TextureAccess::Static, surface.w, surface.h) {
            Ok(id) => id,
            Err(e) if !requested => {
                let desktop = self.current_display().desktop_mode.format;
                warn!("Couldn't create a {} texture ({}); trying desktop format {}", format, e, desktop);
                format = desktop;
                self.create_texture(format, TextureAccess::Static, surface.w, surface.h)?
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.upload_surface(id, format, surface) {
            self.destroy_texture(id);
            return Err(e);
        }
        self.copy_surface_state(id, format, surface);
        Ok(id)
    }

    /// Copies pixels directly when the layouts match, otherwise converts
    /// through the surface converter first.
    fn upload_surface(&mut self, id: TextureId, format: PixelFormat, surface: &mut Surface) -> Result<()> {
        let (bpp, masks) = format
            .masks()
            .ok_or_else(|| VideoError::UnsupportedFormat(format.to_string()))?;
        if bpp == surface.bits_per_pixel && masks == surface.masks {
            if surface.must_lock {
                surface.lock()?;
                let result = self.update_texture(id, None, &surface.pixels, surface.pitch);
                surface.unlock();
                return result;
            }
            return self.update_texture(id, None, &surface.pixels, surface.pitch);
        }

        let palette = format
            .is_indexed()
            .then(|| Palette::dithered(format.bits_per_pixel()));
        let converted = self.converter.convert(surface, bpp, masks, palette.as_ref())?;
        self.update_texture(id, None, &converted.pixels, converted.pitch)
    }

    /// Best effort: drivers that can't apply a property leave it at its
    /// default.
    fn copy_surface_state(&mut self, id: TextureId, format: PixelFormat, surface: &Surface) {
        let (r, g, b) = surface.color_mod;
        let results = [
            ("color mod", tolerate_unsupported(self.set_texture_color_mod(id, r, g, b))),
            ("alpha mod", tolerate_unsupported(self.set_texture_alpha_mod(id, surface.alpha_mod))),
            ("blend mode", tolerate_unsupported(self.set_texture_blend_mode(id, surface.blend_mode))),
            ("scale mode", tolerate_unsupported(self.set_texture_scale_mode(id, surface.scale_mode))),
        ];
        for (what, result) in results {
            if let Err(e) = result {
                warn!("Couldn't carry the surface {} over to {}: {}", what, id, e);
            }
        }
        if format.is_indexed() {
            if let Some(palette) = &surface.palette {
                if let Err(e) = tolerate_unsupported(self.set_texture_palette(id, palette.colors(), 0)) {
                    warn!("Couldn't copy the surface palette to {}: {}", id, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RendererFlags, ScaleMode, TextureModulate};
    use test_log::test;

    fn info(formats: &[PixelFormat]) -> RendererInfo {
        RendererInfo {
            name: "test",
            flags: RendererFlags::empty(),
            mod_modes: TextureModulate::all(),
            blend_modes: BlendMode::all(),
            scale_modes: ScaleMode::all(),
            texture_formats: formats.to_vec(),
            max_texture_width: 0,
            max_texture_height: 0,
        }
    }

    #[test]
    fn it_should_keep_an_advertised_opaque_format() -> Result<()> {
        let surface = Surface::new(4, 4, PixelFormat::RGB565)?;
        let caps = info(&[PixelFormat::ARGB8888, PixelFormat::RGB565]);
        assert_eq!(negotiate_texture_format(&surface, &caps)?, PixelFormat::RGB565);
        Ok(())
    }

    #[test]
    fn it_should_rank_opaque_fallbacks() -> Result<()> {
        let surface = Surface::new(4, 4, PixelFormat::RGB565)?;
        let caps = info(&[PixelFormat::INDEX8, PixelFormat::BGR888, PixelFormat::RGB24]);
        assert_eq!(negotiate_texture_format(&surface, &caps)?, PixelFormat::BGR888);
        Ok(())
    }

    #[test]
    fn it_should_prefer_argb8888_for_color_keyed_surfaces() -> Result<()> {
        let mut surface = Surface::new(4, 4, PixelFormat::RGB888)?;
        surface.set_color_key(Some(0));
        let caps = info(&[PixelFormat::RGB888, PixelFormat::ABGR8888, PixelFormat::ARGB8888]);
        assert_eq!(negotiate_texture_format(&surface, &caps)?, PixelFormat::ARGB8888);
        Ok(())
    }

    #[test]
    fn it_should_keep_a_surface_format_that_already_has_alpha() -> Result<()> {
        let surface = Surface::new(4, 4, PixelFormat::ABGR8888)?;
        let caps = info(&[PixelFormat::ARGB8888, PixelFormat::ABGR8888]);
        assert_eq!(negotiate_texture_format(&surface, &caps)?, PixelFormat::ABGR8888);
        Ok(())
    }

    #[test]
    fn it_should_fall_back_through_the_alpha_ranking() -> Result<()> {
        let mut surface = Surface::new(4, 4, PixelFormat::RGB565)?;
        surface.set_blend_mode(BlendMode::BLEND);
        let caps = info(&[PixelFormat::RGB565, PixelFormat::ARGB4444, PixelFormat::ARGB1555]);
        assert_eq!(negotiate_texture_format(&surface, &caps)?, PixelFormat::ARGB1555);
        Ok(())
    }

    #[test]
    fn it_should_fail_without_an_alpha_format() -> Result<()> {
        let mut surface = Surface::new(4, 4, PixelFormat::RGB888)?;
        surface.set_blend_mode(BlendMode::MASK);
        let caps = info(&[PixelFormat::RGB888, PixelFormat::RGB565]);
        assert!(matches!(
            negotiate_texture_format(&surface, &caps),
            Err(VideoError::UnsupportedFormat(_))
        ));
        Ok(())
    }

    #[test]
    fn it_should_choose_the_same_format_every_time() -> Result<()> {
        let mut surface = Surface::new(2, 2, PixelFormat::BGR565)?;
        surface.set_color_key(Some(1));
        let caps = info(&[PixelFormat::BGRA8888, PixelFormat::RGBA8888]);
        let first = negotiate_texture_format(&surface, &caps)?;
        for _ in 0..8 {
            assert_eq!(negotiate_texture_format(&surface, &caps)?, first);
        }
        assert_eq!(first, PixelFormat::RGBA8888);
        Ok(())
    }
}
