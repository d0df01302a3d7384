// src/render/texture.rs

//! Textures and the per-display texture registry.
//!
//! A texture lives inside the renderer that created it. The registry on each
//! display only records which window's renderer owns which texture id, so an
//! id can be resolved to its owner in one map lookup and a renderer can find
//! every texture it must destroy first.

use crate::error::{Result, VideoError};
use crate::pixels::{Color, PixelFormat};
use crate::rect::Rect;
use crate::render::{BlendMode, RenderBackend, ScaleMode};
use crate::video::window::WindowId;
use crate::video::VideoDevice;
use bitflags::bitflags;
use log::{debug, warn};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Unique, never reused identifier of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "texture {}", self.0)
    }
}

/// Whether a texture can be locked for direct pixel access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureAccess {
    #[default]
    Static,
    Streaming,
}

bitflags! {
    /// Modulation currently in effect on a texture.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureModulate: u32 {
        const NONE = 0x0000_0000;
        const COLOR = 0x0000_0001;
        const ALPHA = 0x0000_0002;
    }
}

/// A renderer-owned image usable as a copy source.
pub struct Texture {
    pub(crate) id: TextureId,
    pub(crate) format: PixelFormat,
    pub(crate) access: TextureAccess,
    pub(crate) w: i32,
    pub(crate) h: i32,
    pub(crate) mod_mode: TextureModulate,
    pub(crate) color_mod: (u8, u8, u8),
    pub(crate) alpha_mod: u8,
    pub(crate) blend_mode: BlendMode,
    pub(crate) scale_mode: ScaleMode,
    /// Window whose renderer owns the texture.
    pub(crate) owner: WindowId,
    /// Backend-private data.
    pub driver_data: Option<Box<dyn Any>>,
}

impl Texture {
    pub(crate) fn new(
        id: TextureId,
        format: PixelFormat,
        access: TextureAccess,
        w: i32,
        h: i32,
        owner: WindowId,
    ) -> Self {
        Texture {
            id,
            format,
            access,
            w,
            h,
            mod_mode: TextureModulate::NONE,
            color_mod: (0xFF, 0xFF, 0xFF),
            alpha_mod: 0xFF,
            blend_mode: BlendMode::NONE,
            scale_mode: ScaleMode::NONE,
            owner,
            driver_data: None,
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn access(&self) -> TextureAccess {
        self.access
    }

    pub fn size(&self) -> (i32, i32) {
        (self.w, self.h)
    }

    pub fn bounds(&self) -> Rect {
        Rect::sized(self.w, self.h)
    }

    pub fn mod_mode(&self) -> TextureModulate {
        self.mod_mode
    }

    pub fn color_mod(&self) -> (u8, u8, u8) {
        self.color_mod
    }

    pub fn alpha_mod(&self) -> u8 {
        self.alpha_mod
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    pub fn owner(&self) -> WindowId {
        self.owner
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("format", &self.format)
            .field("access", &self.access)
            .field("w", &self.w)
            .field("h", &self.h)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Texture id to owning window, for every live texture on a display.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    owners: HashMap<TextureId, WindowId>,
}

impl TextureRegistry {
    pub fn insert(&mut self, id: TextureId, owner: WindowId) {
        self.owners.insert(id, owner);
    }

    pub fn remove(&mut self, id: TextureId) -> Option<WindowId> {
        self.owners.remove(&id)
    }

    pub fn owner(&self, id: TextureId) -> Option<WindowId> {
        self.owners.get(&id).copied()
    }

    pub fn contains(&self, id: TextureId) -> bool {
        self.owners.contains_key(&id)
    }

    /// Ids owned by `window`'s renderer, in creation order.
    pub fn owned_by(&self, window: WindowId) -> Vec<TextureId> {
        let mut ids: Vec<TextureId> = self
            .owners
            .iter()
            .filter(|(_, owner)| **owner == window)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// `rect`, or the whole texture for `None`. The rect must lie inside the
/// texture.
fn texture_area(texture: &Texture, rect: Option<&Rect>) -> Result<Rect> {
    let bounds = texture.bounds();
    match rect {
        None => Ok(bounds),
        Some(rect) if bounds.contains_rect(rect) => Ok(*rect),
        Some(rect) => Err(VideoError::invalid(format!(
            "{:?} is outside the {}x{} {}",
            rect, texture.w, texture.h, texture.id
        ))),
    }
}

fn unknown_texture(id: TextureId) -> VideoError {
    VideoError::invalid(format!("invalid texture id {}", id.0))
}

impl VideoDevice {
    // --- Lookup ---

    /// (display index, owning window) of a live texture.
    fn locate_texture(&self, id: TextureId) -> Result<(usize, WindowId)> {
        self.displays
            .iter()
            .enumerate()
            .find_map(|(d, display)| display.textures.owner(id).map(|owner| (d, owner)))
            .ok_or_else(|| unknown_texture(id))
    }

    pub fn texture(&self, id: TextureId) -> Result<&Texture> {
        let (d, owner) = self.locate_texture(id)?;
        self.displays[d]
            .window(owner)
            .and_then(|w| w.renderer.as_ref())
            .and_then(|r| r.textures.get(&id))
            .ok_or_else(|| unknown_texture(id))
    }

    /// The texture together with the backend of the renderer that owns it.
    pub(crate) fn texture_parts(&mut self, id: TextureId) -> Result<(&mut dyn RenderBackend, &mut Texture)> {
        let (d, owner) = self.locate_texture(id)?;
        let renderer = self.displays[d]
            .window_mut(owner)
            .and_then(|w| w.renderer.as_mut())
            .ok_or_else(|| unknown_texture(id))?;
        let texture = renderer.textures.get_mut(&id).ok_or_else(|| unknown_texture(id))?;
        Ok((renderer.backend.as_mut(), texture))
    }

    // --- Creation and destruction ---

    /// Creates a texture on the current renderer.
    ///
    /// If the driver fails, its destroy hook is given a chance to release
    /// whatever it allocated before the error is returned.
    pub fn create_texture(
        &mut self,
        format: PixelFormat,
        access: TextureAccess,
        w: i32,
        h: i32,
    ) -> Result<TextureId> {
        if w <= 0 || h <= 0 {
            return Err(VideoError::invalid("texture dimensions must be positive"));
        }
        self.current_renderer_mut()?;
        let id = TextureId(self.next_object_id());
        let d = self.current_display;
        let (renderer, _) = self.current_renderer_mut()?;
        let owner = renderer.window;
        let mut texture = Texture::new(id, format, access, w, h, owner);
        match renderer.backend.create_texture(&mut texture) {
            Ok(()) => {}
            Err(VideoError::Unsupported(_)) => {
                return Err(VideoError::Unsupported("texture creation"));
            }
            Err(e) => {
                warn!("Render driver failed to create {}: {}", id, e);
                renderer.backend.destroy_texture(&mut texture);
                return Err(e);
            }
        }
        renderer.textures.insert(id, texture);
        self.displays[d].textures.insert(id, owner);
        debug!("Created {} ({}x{} {}, {:?})", id, w, h, format, access);
        Ok(id)
    }

    /// Destroys a texture. Unknown ids are ignored.
    pub fn destroy_texture(&mut self, id: TextureId) {
        let Ok((d, owner)) = self.locate_texture(id) else {
            return;
        };
        self.displays[d].textures.remove(id);
        let renderer = self.displays[d]
            .window_mut(owner)
            .and_then(|w| w.renderer.as_mut());
        if let Some(renderer) = renderer {
            if let Some(mut texture) = renderer.textures.remove(&id) {
                renderer.backend.destroy_texture(&mut texture);
                debug!("Destroyed {}", id);
            }
        }
    }

    // --- Queries ---

    /// Format, access and size of a texture.
    pub fn query_texture(&self, id: TextureId) -> Result<(PixelFormat, TextureAccess, i32, i32)> {
        let texture = self.texture(id)?;
        Ok((texture.format, texture.access, texture.w, texture.h))
    }

    /// Read access to a texture's pixels, if the driver keeps them reachable.
    pub fn query_texture_pixels(&mut self, id: TextureId) -> Result<(&[u8], usize)> {
        let (backend, texture) = self.texture_parts(id)?;
        backend.query_texture_pixels(texture)
    }

    // --- Palette ---

    pub fn set_texture_palette(&mut self, id: TextureId, colors: &[Color], first: usize) -> Result<()> {
        let (backend, texture) = self.texture_parts(id)?;
        if !texture.format.is_indexed() {
            return Err(VideoError::invalid("Texture not a palettized format"));
        }
        backend.set_texture_palette(texture, colors, first)
    }

    pub fn texture_palette(&mut self, id: TextureId, first: usize, count: usize) -> Result<Vec<Color>> {
        let (backend, texture) = self.texture_parts(id)?;
        if !texture.format.is_indexed() {
            return Err(VideoError::invalid("Texture not a palettized format"));
        }
        backend.get_texture_palette(texture, first, count)
    }

    // --- Modulation, blending and scaling ---

    /// Any component below 255 turns color modulation on; all 255 turns it off.
    /// If the driver refuses, the texture keeps its previous values.
    pub fn set_texture_color_mod(&mut self, id: TextureId, r: u8, g: u8, b: u8) -> Result<()> {
        let (backend, texture) = self.texture_parts(id)?;
        let saved = (texture.mod_mode, texture.color_mod);
        texture
            .mod_mode
            .set(TextureModulate::COLOR, r < 0xFF || g < 0xFF || b < 0xFF);
        texture.color_mod = (r, g, b);
        backend.set_texture_color_mod(texture).inspect_err(|_| {
            (texture.mod_mode, texture.color_mod) = saved;
        })
    }

    pub fn texture_color_mod(&self, id: TextureId) -> Result<(u8, u8, u8)> {
        Ok(self.texture(id)?.color_mod)
    }

    pub fn set_texture_alpha_mod(&mut self, id: TextureId, alpha: u8) -> Result<()> {
        let (backend, texture) = self.texture_parts(id)?;
        let saved = (texture.mod_mode, texture.alpha_mod);
        texture.mod_mode.set(TextureModulate::ALPHA, alpha < 0xFF);
        texture.alpha_mod = alpha;
        backend.set_texture_alpha_mod(texture).inspect_err(|_| {
            (texture.mod_mode, texture.alpha_mod) = saved;
        })
    }

    pub fn texture_alpha_mod(&self, id: TextureId) -> Result<u8> {
        Ok(self.texture(id)?.alpha_mod)
    }

    pub fn set_texture_blend_mode(&mut self, id: TextureId, mode: BlendMode) -> Result<()> {
        let (backend, texture) = self.texture_parts(id)?;
        let saved = texture.blend_mode;
        texture.blend_mode = mode;
        backend
            .set_texture_blend_mode(texture)
            .inspect_err(|_| texture.blend_mode = saved)
    }

    pub fn texture_blend_mode(&self, id: TextureId) -> Result<BlendMode> {
        Ok(self.texture(id)?.blend_mode)
    }

    pub fn set_texture_scale_mode(&mut self, id: TextureId, mode: ScaleMode) -> Result<()> {
        let (backend, texture) = self.texture_parts(id)?;
        let saved = texture.scale_mode;
        texture.scale_mode = mode;
        backend
            .set_texture_scale_mode(texture)
            .inspect_err(|_| texture.scale_mode = saved)
    }

    pub fn texture_scale_mode(&self, id: TextureId) -> Result<ScaleMode> {
        Ok(self.texture(id)?.scale_mode)
    }

    // --- Pixel access ---

    /// Uploads `pixels` into `rect`, or the whole texture for `None`.
    pub fn update_texture(&mut self, id: TextureId, rect: Option<&Rect>, pixels: &[u8], pitch: usize) -> Result<()> {
        let (backend, texture) = self.texture_parts(id)?;
        let rect = texture_area(texture, rect)?;
        backend.update_texture(texture, &rect, pixels, pitch)
    }

    /// Locks part of a streaming texture for writing. Static textures
    /// cannot be locked.
    pub fn lock_texture(&mut self, id: TextureId, rect: Option<&Rect>, mark_dirty: bool) -> Result<(&mut [u8], usize)> {
        let (backend, texture) = self.texture_parts(id)?;
        if texture.access != TextureAccess::Streaming {
            return Err(VideoError::TextureNotStreaming);
        }
        let rect = texture_area(texture, rect)?;
        backend.lock_texture(texture, &rect, mark_dirty)
    }

    /// Unlocking a static texture does nothing.
    pub fn unlock_texture(&mut self, id: TextureId) -> Result<()> {
        let (backend, texture) = self.texture_parts(id)?;
        if texture.access == TextureAccess::Streaming {
            backend.unlock_texture(texture);
        }
        Ok(())
    }

    /// Marks regions of a streaming texture as changed.
    pub fn dirty_texture(&mut self, id: TextureId, rects: &[Rect]) -> Result<()> {
        let (backend, texture) = self.texture_parts(id)?;
        if texture.access != TextureAccess::Streaming {
            return Err(VideoError::TextureNotStreaming);
        }
        for rect in rects {
            texture_area(texture, Some(rect))?;
        }
        backend.dirty_texture(texture, rects);
        Ok(())
    }
}
