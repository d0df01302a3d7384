// src/surface.rs

//! Source pixel surfaces and the conversion collaborator used when a surface
//! has to be turned into a texture of a different format.
//!
//! The video core only reads surfaces: their format, masks, palette, copy
//! flags and modulation state feed the format negotiator in
//! `render::format`. Converting between formats is delegated to a
//! [`SurfaceConverter`]; [`BasicConverter`] is the in-crate default.

use crate::error::{Result, VideoError};
use crate::pixels::{Color, FormatMasks, Palette, PixelFormat};
use crate::render::{BlendMode, ScaleMode};
use bitflags::bitflags;
use log::trace;

bitflags! {
    /// How a surface is meant to be copied. The negotiator only cares whether
    /// any of `COLORKEY`, `MASK` or `BLEND` is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CopyFlags: u32 {
        const MODULATE_COLOR = 0x0000_0001;
        const MODULATE_ALPHA = 0x0000_0002;
        const MASK = 0x0000_0010;
        const BLEND = 0x0000_0020;
        const ADD = 0x0000_0040;
        const MOD = 0x0000_0080;
        const COLORKEY = 0x0000_0100;
        const NEAREST = 0x0000_0200;
    }
}

/// A block of pixels in memory plus the metadata needed to interpret it.
#[derive(Debug, Clone)]
pub struct Surface {
    pub w: i32,
    pub h: i32,
    /// Bytes per row.
    pub pitch: usize,
    pub bits_per_pixel: u32,
    pub masks: FormatMasks,
    pub palette: Option<Palette>,
    pub pixels: Vec<u8>,
    pub copy_flags: CopyFlags,
    pub color_key: Option<u32>,
    pub color_mod: (u8, u8, u8),
    pub alpha_mod: u8,
    pub blend_mode: BlendMode,
    pub scale_mode: ScaleMode,
    /// Pixel access requires `lock()` first (e.g. RLE-encoded surfaces).
    pub must_lock: bool,
    lock_count: u32,
}

fn row_pitch(w: i32, bpp: u32) -> usize {
    let bits = w.max(0) as usize * bpp as usize;
    let bytes = bits.div_ceil(8);
    (bytes + 3) & !3
}

impl Surface {
    /// Allocates a zeroed surface of `format`.
    pub fn new(w: i32, h: i32, format: PixelFormat) -> Result<Self> {
        let (bpp, masks) = format
            .masks()
            .ok_or_else(|| VideoError::UnsupportedFormat(format.to_string()))?;
        Self::with_masks(w, h, bpp, masks)
    }

    /// Allocates a zeroed surface described by a depth and component masks.
    pub fn with_masks(w: i32, h: i32, bpp: u32, masks: FormatMasks) -> Result<Self> {
        if w < 0 || h < 0 {
            return Err(VideoError::invalid("surface dimensions must not be negative"));
        }
        if !matches!(bpp, 1 | 4 | 8 | 12 | 15 | 16 | 24 | 32) {
            return Err(VideoError::UnsupportedFormat(format!("{} bits per pixel", bpp)));
        }
        let pitch = row_pitch(w, bpp);
        let palette = (bpp <= 8 && masks == FormatMasks::default()).then(|| {
            if bpp == 8 {
                Palette::dithered(8)
            } else {
                Palette::new(1 << bpp)
            }
        });
        Ok(Self {
            w,
            h,
            pitch,
            bits_per_pixel: bpp,
            masks,
            palette,
            pixels: vec![0; pitch * h as usize],
            copy_flags: CopyFlags::empty(),
            color_key: None,
            color_mod: (0xFF, 0xFF, 0xFF),
            alpha_mod: 0xFF,
            blend_mode: BlendMode::NONE,
            scale_mode: ScaleMode::NONE,
            must_lock: false,
            lock_count: 0,
        })
    }

    /// The format tag matching this surface's depth and masks.
    pub fn format(&self) -> PixelFormat {
        PixelFormat::from_masks(self.bits_per_pixel, self.masks)
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self.bits_per_pixel {
            0..=8 => 1,
            9..=16 => 2,
            17..=24 => 3,
            _ => 4,
        }
    }

    pub fn lock(&mut self) -> Result<()> {
        self.lock_count += 1;
        Ok(())
    }

    pub fn unlock(&mut self) {
        self.lock_count = self.lock_count.saturating_sub(1);
    }

    pub fn is_locked(&self) -> bool {
        self.lock_count > 0
    }

    pub fn set_color_key(&mut self, key: Option<u32>) {
        self.color_key = key;
        self.copy_flags.set(CopyFlags::COLORKEY, key.is_some());
    }

    pub fn set_color_mod(&mut self, r: u8, g: u8, b: u8) {
        self.color_mod = (r, g, b);
        self.copy_flags
            .set(CopyFlags::MODULATE_COLOR, (r, g, b) != (0xFF, 0xFF, 0xFF));
    }

    pub fn set_alpha_mod(&mut self, alpha: u8) {
        self.alpha_mod = alpha;
        self.copy_flags.set(CopyFlags::MODULATE_ALPHA, alpha != 0xFF);
    }

    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
        self.copy_flags
            .remove(CopyFlags::MASK | CopyFlags::BLEND | CopyFlags::ADD | CopyFlags::MOD);
        if mode.contains(BlendMode::MASK) {
            self.copy_flags.insert(CopyFlags::MASK);
        }
        if mode.contains(BlendMode::BLEND) {
            self.copy_flags.insert(CopyFlags::BLEND);
        }
        if mode.contains(BlendMode::ADD) {
            self.copy_flags.insert(CopyFlags::ADD);
        }
        if mode.contains(BlendMode::MOD) {
            self.copy_flags.insert(CopyFlags::MOD);
        }
    }

    /// Raw pixel value at (`x`, `y`), in native byte order for the depth.
    pub fn pixel(&self, x: i32, y: i32) -> u32 {
        let bpp = self.bytes_per_pixel();
        let offset = y as usize * self.pitch + x as usize * bpp;
        read_pixel(&self.pixels[offset..offset + bpp])
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, value: u32) {
        let bpp = self.bytes_per_pixel();
        let offset = y as usize * self.pitch + x as usize * bpp;
        write_pixel(&mut self.pixels[offset..offset + bpp], value);
    }

    /// Decodes a raw pixel value into RGBA using masks or the palette.
    pub fn decode(&self, value: u32) -> Color {
        if let Some(palette) = &self.palette {
            return palette
                .colors()
                .get(value as usize)
                .copied()
                .unwrap_or(Color::BLACK);
        }
        let m = self.masks;
        Color::rgba(
            expand(value, m.r, 0),
            expand(value, m.g, 0),
            expand(value, m.b, 0),
            expand(value, m.a, 0xFF),
        )
    }
}

fn read_pixel(bytes: &[u8]) -> u32 {
    match bytes.len() {
        1 => bytes[0] as u32,
        2 => u16::from_ne_bytes([bytes[0], bytes[1]]) as u32,
        3 if cfg!(target_endian = "big") => {
            (bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32
        }
        3 => bytes[0] as u32 | (bytes[1] as u32) << 8 | (bytes[2] as u32) << 16,
        _ => u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
    }
}

fn write_pixel(bytes: &mut [u8], value: u32) {
    match bytes.len() {
        1 => bytes[0] = value as u8,
        2 => bytes.copy_from_slice(&(value as u16).to_ne_bytes()),
        3 if cfg!(target_endian = "big") => {
            bytes[0] = (value >> 16) as u8;
            bytes[1] = (value >> 8) as u8;
            bytes[2] = value as u8;
        }
        3 => {
            bytes[0] = value as u8;
            bytes[1] = (value >> 8) as u8;
            bytes[2] = (value >> 16) as u8;
        }
        _ => bytes.copy_from_slice(&value.to_ne_bytes()),
    }
}

fn expand(value: u32, mask: u32, missing: u8) -> u8 {
    if mask == 0 {
        return missing;
    }
    let shift = mask.trailing_zeros();
    let max = mask >> shift;
    let v = (value & mask) >> shift;
    ((v as u64 * 255 + max as u64 / 2) / max as u64) as u8
}

fn compress(component: u8, mask: u32) -> u32 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    let max = mask >> shift;
    let v = (component as u64 * max as u64 + 127) / 255;
    (v as u32) << shift
}

/// Converts surfaces between pixel formats.
///
/// This is the blit engine's contract as seen from the video core: given a
/// source surface and a destination description, produce a new surface
/// holding the same image in the destination format.
pub trait SurfaceConverter {
    fn convert(
        &self,
        src: &Surface,
        bpp: u32,
        masks: FormatMasks,
        palette: Option<&Palette>,
    ) -> Result<Surface>;
}

/// Per-pixel converter for byte-aligned depths.
///
/// Sub-byte indexed destinations are rejected. Color-keyed pixels become
/// fully transparent when the destination has an alpha channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicConverter;

impl SurfaceConverter for BasicConverter {
    fn convert(
        &self,
        src: &Surface,
        bpp: u32,
        masks: FormatMasks,
        palette: Option<&Palette>,
    ) -> Result<Surface> {
        if src.bits_per_pixel < 8 || bpp < 8 {
            return Err(VideoError::UnsupportedFormat(format!(
                "conversion from {} to {} bits per pixel",
                src.bits_per_pixel, bpp
            )));
        }
        let mut dst = Surface::with_masks(src.w, src.h, bpp, masks)?;
        if let Some(palette) = palette {
            dst.palette = Some(palette.clone());
        }
        trace!(
            "Converting {}x{} surface from {} to {} bpp",
            src.w,
            src.h,
            src.bits_per_pixel,
            bpp
        );

        for y in 0..src.h {
            for x in 0..src.w {
                let raw = src.pixel(x, y);
                let mut color = src.decode(raw);
                if src.color_key == Some(raw) {
                    color.a = 0;
                }
                let value = match &dst.palette {
                    Some(palette) => palette.nearest(color) as u32,
                    None => {
                        compress(color.r, masks.r)
                            | compress(color.g, masks.g)
                            | compress(color.b, masks.b)
                            | compress(color.a, masks.a)
                    }
                };
                dst.put_pixel(x, y, value);
            }
        }
        Ok(dst)
    }
}
