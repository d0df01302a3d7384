// src/pixels.rs

//! Pixel format tags, component masks, colors and palettes.
//!
//! A `PixelFormat` packs its type, component order, packed layout, bit depth
//! and byte size into one `u32` tag. The mode matcher sorts on the depth and
//! layout fields, and the format negotiator converts tags to and from
//! component masks.

use serde::{Deserialize, Serialize};
use std::fmt;

// Pixel types.
pub const PIXELTYPE_UNKNOWN: u32 = 0;
pub const PIXELTYPE_INDEX1: u32 = 1;
pub const PIXELTYPE_INDEX4: u32 = 2;
pub const PIXELTYPE_INDEX8: u32 = 3;
pub const PIXELTYPE_PACKED8: u32 = 4;
pub const PIXELTYPE_PACKED16: u32 = 5;
pub const PIXELTYPE_PACKED32: u32 = 6;
pub const PIXELTYPE_ARRAYU8: u32 = 7;

// Bitmap orders (indexed types).
const BITMAPORDER_NONE: u32 = 0;
const BITMAPORDER_4321: u32 = 1;
const BITMAPORDER_1234: u32 = 2;

// Packed component orders.
const PACKEDORDER_XRGB: u32 = 1;
const PACKEDORDER_RGBX: u32 = 2;
const PACKEDORDER_ARGB: u32 = 3;
const PACKEDORDER_RGBA: u32 = 4;
const PACKEDORDER_XBGR: u32 = 5;
const PACKEDORDER_BGRX: u32 = 6;
const PACKEDORDER_ABGR: u32 = 7;
const PACKEDORDER_BGRA: u32 = 8;

// Array component orders.
const ARRAYORDER_RGB: u32 = 1;
const ARRAYORDER_BGR: u32 = 4;

// Packed layouts.
pub const PACKEDLAYOUT_NONE: u32 = 0;
pub const PACKEDLAYOUT_332: u32 = 1;
pub const PACKEDLAYOUT_4444: u32 = 2;
pub const PACKEDLAYOUT_1555: u32 = 3;
pub const PACKEDLAYOUT_5551: u32 = 4;
pub const PACKEDLAYOUT_565: u32 = 5;
pub const PACKEDLAYOUT_8888: u32 = 6;
pub const PACKEDLAYOUT_2101010: u32 = 7;
pub const PACKEDLAYOUT_1010102: u32 = 8;

const fn define(kind: u32, order: u32, layout: u32, bits: u32, bytes: u32) -> PixelFormat {
    PixelFormat((1 << 31) | (kind << 24) | (order << 20) | (layout << 16) | (bits << 8) | bytes)
}

/// Opaque pixel format tag. `PixelFormat::UNKNOWN` (zero) means "unspecified".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PixelFormat(pub u32);

impl PixelFormat {
    pub const UNKNOWN: PixelFormat = PixelFormat(0);
    pub const INDEX1LSB: PixelFormat = define(PIXELTYPE_INDEX1, BITMAPORDER_4321, 0, 1, 0);
    pub const INDEX1MSB: PixelFormat = define(PIXELTYPE_INDEX1, BITMAPORDER_1234, 0, 1, 0);
    pub const INDEX4LSB: PixelFormat = define(PIXELTYPE_INDEX4, BITMAPORDER_4321, 0, 4, 0);
    pub const INDEX4MSB: PixelFormat = define(PIXELTYPE_INDEX4, BITMAPORDER_1234, 0, 4, 0);
    pub const INDEX8: PixelFormat = define(PIXELTYPE_INDEX8, BITMAPORDER_NONE, 0, 8, 1);
    pub const RGB332: PixelFormat =
        define(PIXELTYPE_PACKED8, PACKEDORDER_XRGB, PACKEDLAYOUT_332, 8, 1);
    pub const RGB444: PixelFormat =
        define(PIXELTYPE_PACKED16, PACKEDORDER_XRGB, PACKEDLAYOUT_4444, 12, 2);
    pub const RGB555: PixelFormat =
        define(PIXELTYPE_PACKED16, PACKEDORDER_XRGB, PACKEDLAYOUT_1555, 15, 2);
    pub const BGR555: PixelFormat =
        define(PIXELTYPE_PACKED16, PACKEDORDER_XBGR, PACKEDLAYOUT_1555, 15, 2);
    pub const ARGB4444: PixelFormat =
        define(PIXELTYPE_PACKED16, PACKEDORDER_ARGB, PACKEDLAYOUT_4444, 16, 2);
    pub const ABGR4444: PixelFormat =
        define(PIXELTYPE_PACKED16, PACKEDORDER_ABGR, PACKEDLAYOUT_4444, 16, 2);
    pub const ARGB1555: PixelFormat =
        define(PIXELTYPE_PACKED16, PACKEDORDER_ARGB, PACKEDLAYOUT_1555, 16, 2);
    pub const ABGR1555: PixelFormat =
        define(PIXELTYPE_PACKED16, PACKEDORDER_ABGR, PACKEDLAYOUT_1555, 16, 2);
    pub const RGB565: PixelFormat =
        define(PIXELTYPE_PACKED16, PACKEDORDER_XRGB, PACKEDLAYOUT_565, 16, 2);
    pub const BGR565: PixelFormat =
        define(PIXELTYPE_PACKED16, PACKEDORDER_XBGR, PACKEDLAYOUT_565, 16, 2);
    pub const RGB24: PixelFormat = define(PIXELTYPE_ARRAYU8, ARRAYORDER_RGB, 0, 24, 3);
    pub const BGR24: PixelFormat = define(PIXELTYPE_ARRAYU8, ARRAYORDER_BGR, 0, 24, 3);
    pub const RGB888: PixelFormat =
        define(PIXELTYPE_PACKED32, PACKEDORDER_XRGB, PACKEDLAYOUT_8888, 24, 4);
    pub const BGR888: PixelFormat =
        define(PIXELTYPE_PACKED32, PACKEDORDER_XBGR, PACKEDLAYOUT_8888, 24, 4);
    pub const ARGB8888: PixelFormat =
        define(PIXELTYPE_PACKED32, PACKEDORDER_ARGB, PACKEDLAYOUT_8888, 32, 4);
    pub const RGBA8888: PixelFormat =
        define(PIXELTYPE_PACKED32, PACKEDORDER_RGBA, PACKEDLAYOUT_8888, 32, 4);
    pub const ABGR8888: PixelFormat =
        define(PIXELTYPE_PACKED32, PACKEDORDER_ABGR, PACKEDLAYOUT_8888, 32, 4);
    pub const BGRA8888: PixelFormat =
        define(PIXELTYPE_PACKED32, PACKEDORDER_BGRA, PACKEDLAYOUT_8888, 32, 4);
    pub const ARGB2101010: PixelFormat =
        define(PIXELTYPE_PACKED32, PACKEDORDER_ARGB, PACKEDLAYOUT_2101010, 32, 4);

    /// Every format the tag/mask conversions know about.
    pub const ALL: [PixelFormat; 24] = [
        PixelFormat::INDEX1LSB,
        PixelFormat::INDEX1MSB,
        PixelFormat::INDEX4LSB,
        PixelFormat::INDEX4MSB,
        PixelFormat::INDEX8,
        PixelFormat::RGB332,
        PixelFormat::RGB444,
        PixelFormat::RGB555,
        PixelFormat::BGR555,
        PixelFormat::ARGB4444,
        PixelFormat::ABGR4444,
        PixelFormat::ARGB1555,
        PixelFormat::ABGR1555,
        PixelFormat::RGB565,
        PixelFormat::BGR565,
        PixelFormat::RGB24,
        PixelFormat::BGR24,
        PixelFormat::RGB888,
        PixelFormat::BGR888,
        PixelFormat::ARGB8888,
        PixelFormat::RGBA8888,
        PixelFormat::ABGR8888,
        PixelFormat::BGRA8888,
        PixelFormat::ARGB2101010,
    ];

    pub fn is_unknown(self) -> bool {
        self.0 == 0
    }

    pub fn pixel_type(self) -> u32 {
        (self.0 >> 24) & 0x0F
    }

    pub fn pixel_order(self) -> u32 {
        (self.0 >> 20) & 0x0F
    }

    pub fn pixel_layout(self) -> u32 {
        (self.0 >> 16) & 0x0F
    }

    pub fn bits_per_pixel(self) -> u32 {
        (self.0 >> 8) & 0xFF
    }

    pub fn bytes_per_pixel(self) -> u32 {
        self.0 & 0xFF
    }

    pub fn is_indexed(self) -> bool {
        matches!(
            self.pixel_type(),
            PIXELTYPE_INDEX1 | PIXELTYPE_INDEX4 | PIXELTYPE_INDEX8
        )
    }

    /// Bits per pixel and component masks for this format.
    ///
    /// Indexed formats report zero masks. Returns `None` for tags that carry
    /// no usable mask description.
    pub fn masks(self) -> Option<(u32, FormatMasks)> {
        let bpp = if self.bits_per_pixel() == 24 {
            self.bytes_per_pixel() * 8
        } else {
            self.bits_per_pixel()
        };

        if self == PixelFormat::RGB24 || self == PixelFormat::BGR24 {
            let (lo, hi) = (0x0000_00FF, 0x00FF_0000);
            let big = cfg!(target_endian = "big");
            let rgb = self == PixelFormat::RGB24;
            let (r, b) = if rgb != big { (lo, hi) } else { (hi, lo) };
            return Some((bpp, FormatMasks::new(r, 0x0000_FF00, b, 0)));
        }

        match self.pixel_type() {
            PIXELTYPE_INDEX1 | PIXELTYPE_INDEX4 | PIXELTYPE_INDEX8 => {
                return Some((bpp, FormatMasks::default()))
            }
            PIXELTYPE_PACKED8 | PIXELTYPE_PACKED16 | PIXELTYPE_PACKED32 => {}
            _ => return None,
        }

        let m: [u32; 4] = match self.pixel_layout() {
            PACKEDLAYOUT_332 => [0, 0xE0, 0x1C, 0x03],
            PACKEDLAYOUT_4444 => [0xF000, 0x0F00, 0x00F0, 0x000F],
            PACKEDLAYOUT_1555 => [0x8000, 0x7C00, 0x03E0, 0x001F],
            PACKEDLAYOUT_5551 => [0xF800, 0x07C0, 0x003E, 0x0001],
            PACKEDLAYOUT_565 => [0x0000, 0xF800, 0x07E0, 0x001F],
            PACKEDLAYOUT_8888 => [0xFF00_0000, 0x00FF_0000, 0x0000_FF00, 0x0000_00FF],
            PACKEDLAYOUT_2101010 => [0xC000_0000, 0x3FF0_0000, 0x000F_FC00, 0x0000_03FF],
            PACKEDLAYOUT_1010102 => [0xFFC0_0000, 0x003F_F000, 0x0000_0FFC, 0x0000_0003],
            _ => return None,
        };

        let masks = match self.pixel_order() {
            PACKEDORDER_XRGB => FormatMasks::new(m[1], m[2], m[3], 0),
            PACKEDORDER_RGBX => FormatMasks::new(m[0], m[1], m[2], 0),
            PACKEDORDER_ARGB => FormatMasks::new(m[1], m[2], m[3], m[0]),
            PACKEDORDER_RGBA => FormatMasks::new(m[0], m[1], m[2], m[3]),
            PACKEDORDER_XBGR => FormatMasks::new(m[3], m[2], m[1], 0),
            PACKEDORDER_BGRX => FormatMasks::new(m[2], m[1], m[0], 0),
            PACKEDORDER_BGRA => FormatMasks::new(m[2], m[1], m[0], m[3]),
            PACKEDORDER_ABGR => FormatMasks::new(m[3], m[2], m[1], m[0]),
            _ => return None,
        };
        Some((bpp, masks))
    }

    /// Inverse of [`PixelFormat::masks`]: the tag described by a depth and masks.
    ///
    /// All-zero masks pick the conventional format for the depth.
    pub fn from_masks(bpp: u32, masks: FormatMasks) -> PixelFormat {
        if masks == FormatMasks::default() {
            return match bpp {
                1 => PixelFormat::INDEX1MSB,
                4 => PixelFormat::INDEX4MSB,
                8 => PixelFormat::INDEX8,
                12 => PixelFormat::RGB444,
                15 => PixelFormat::RGB555,
                16 => PixelFormat::RGB565,
                24 => PixelFormat::RGB24,
                32 => PixelFormat::RGB888,
                _ => PixelFormat::UNKNOWN,
            };
        }
        // 15-bit masks may come in with a 16-bit depth.
        if bpp == 16 && masks.a == 0 {
            if masks == FormatMasks::new(0x7C00, 0x03E0, 0x001F, 0) {
                return PixelFormat::RGB555;
            }
            if masks == FormatMasks::new(0x001F, 0x03E0, 0x7C00, 0) {
                return PixelFormat::BGR555;
            }
        }
        PixelFormat::ALL
            .iter()
            .copied()
            .filter(|f| !f.is_indexed())
            .find(|f| match f.masks() {
                Some((fbpp, fmasks)) => {
                    let depth_matches = fbpp == bpp || f.bits_per_pixel() == bpp;
                    depth_matches && fmasks == masks
                }
                None => false,
            })
            .unwrap_or(PixelFormat::UNKNOWN)
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::UNKNOWN => "UNKNOWN",
            PixelFormat::INDEX1LSB => "INDEX1LSB",
            PixelFormat::INDEX1MSB => "INDEX1MSB",
            PixelFormat::INDEX4LSB => "INDEX4LSB",
            PixelFormat::INDEX4MSB => "INDEX4MSB",
            PixelFormat::INDEX8 => "INDEX8",
            PixelFormat::RGB332 => "RGB332",
            PixelFormat::RGB444 => "RGB444",
            PixelFormat::RGB555 => "RGB555",
            PixelFormat::BGR555 => "BGR555",
            PixelFormat::ARGB4444 => "ARGB4444",
            PixelFormat::ABGR4444 => "ABGR4444",
            PixelFormat::ARGB1555 => "ARGB1555",
            PixelFormat::ABGR1555 => "ABGR1555",
            PixelFormat::RGB565 => "RGB565",
            PixelFormat::BGR565 => "BGR565",
            PixelFormat::RGB24 => "RGB24",
            PixelFormat::BGR24 => "BGR24",
            PixelFormat::RGB888 => "RGB888",
            PixelFormat::BGR888 => "BGR888",
            PixelFormat::ARGB8888 => "ARGB8888",
            PixelFormat::RGBA8888 => "RGBA8888",
            PixelFormat::ABGR8888 => "ABGR8888",
            PixelFormat::BGRA8888 => "BGRA8888",
            PixelFormat::ARGB2101010 => "ARGB2101010",
            _ => "CUSTOM",
        }
    }

    pub fn from_name(name: &str) -> Option<PixelFormat> {
        if name.eq_ignore_ascii_case("UNKNOWN") {
            return Some(PixelFormat::UNKNOWN);
        }
        PixelFormat::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            "CUSTOM" => write!(f, "PixelFormat({:#010x})", self.0),
            name => f.write_str(name),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl TryFrom<String> for PixelFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PixelFormat::from_name(&value).ok_or_else(|| format!("unknown pixel format '{}'", value))
    }
}

impl From<PixelFormat> for String {
    fn from(value: PixelFormat) -> Self {
        value.name().to_string()
    }
}

/// Red/green/blue/alpha component masks of a direct-color format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormatMasks {
    pub r: u32,
    pub g: u32,
    pub b: u32,
    pub a: u32,
}

impl FormatMasks {
    pub const fn new(r: u32, g: u32, b: u32, a: u32) -> Self {
        Self { r, g, b, a }
    }
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(0xFF, 0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 0xFF);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// An indexed-color palette. Freshly allocated palettes are all white.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(ncolors: usize) -> Self {
        Self {
            colors: vec![Color::WHITE; ncolors],
        }
    }

    /// A palette sized for an indexed depth, filled with the default dither.
    pub fn dithered(bpp: u32) -> Self {
        let mut palette = Palette::new(1usize << bpp);
        dither_colors(&mut palette.colors, bpp);
        palette
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Overwrites `colors.len()` entries starting at `first`.
    pub fn set_colors(&mut self, colors: &[Color], first: usize) -> crate::error::Result<()> {
        let end = first
            .checked_add(colors.len())
            .filter(|end| *end <= self.colors.len())
            .ok_or_else(|| crate::error::VideoError::invalid("palette indices are out of range"))?;
        self.colors[first..end].copy_from_slice(colors);
        Ok(())
    }

    /// Nearest palette entry by squared RGB distance.
    pub fn nearest(&self, color: Color) -> u8 {
        let mut best = 0usize;
        let mut best_dist = u32::MAX;
        for (i, c) in self.colors.iter().enumerate() {
            let dr = c.r as i32 - color.r as i32;
            let dg = c.g as i32 - color.g as i32;
            let db = c.b as i32 - color.b as i32;
            let dist = (dr * dr + dg * dg + db * db) as u32;
            if dist < best_dist {
                best = i;
                best_dist = dist;
                if dist == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}

/// Fills an 8-bit palette with the 3-3-2 dither, mapping each bit field onto
/// the full `0..=255` range. Other depths are left untouched.
pub fn dither_colors(colors: &mut [Color], bpp: u32) {
    if bpp != 8 {
        return;
    }
    for (i, color) in colors.iter_mut().enumerate().take(256) {
        let i = i as u32;
        let mut r = i & 0xE0;
        r |= r >> 3 | r >> 6;
        let mut g = (i << 3) & 0xE0;
        g |= g >> 3 | g >> 6;
        let mut b = i & 0x3;
        b |= b << 2;
        b |= b << 4;
        *color = Color::rgba(r as u8, g as u8, b as u8, 0xFF);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_should_round_trip_every_known_format_through_its_masks() {
        for format in PixelFormat::ALL.iter().copied().filter(|f| !f.is_indexed()) {
            let (bpp, masks) = format.masks().expect("known format has masks");
            assert_eq!(PixelFormat::from_masks(bpp, masks), format, "{}", format);
        }
    }

    #[test]
    fn it_should_describe_argb8888() {
        let (bpp, masks) = PixelFormat::ARGB8888.masks().unwrap();
        assert_eq!(bpp, 32);
        assert_eq!(
            masks,
            FormatMasks::new(0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000)
        );
        assert_eq!(PixelFormat::ARGB8888.bytes_per_pixel(), 4);
        assert!(!PixelFormat::ARGB8888.is_indexed());
        assert!(PixelFormat::INDEX8.is_indexed());
    }

    #[test]
    fn it_should_dither_the_corners_of_the_palette() {
        let palette = Palette::dithered(8);
        assert_eq!(palette.len(), 256);
        assert_eq!(palette.colors()[0], Color::rgba(0, 0, 0, 0xFF));
        assert_eq!(palette.colors()[255], Color::rgba(0xFF, 0xFF, 0xFF, 0xFF));
    }

    #[test]
    fn it_should_reject_palette_writes_past_the_end() {
        let mut palette = Palette::new(4);
        assert!(palette.set_colors(&[Color::BLACK; 2], 3).is_err());
        assert!(palette.set_colors(&[Color::BLACK; 2], 2).is_ok());
        assert_eq!(palette.colors()[3], Color::BLACK);
    }

    #[test]
    fn it_should_parse_format_names_case_insensitively() {
        assert_eq!(PixelFormat::from_name("rgb565"), Some(PixelFormat::RGB565));
        assert_eq!(PixelFormat::from_name("nope"), None);
    }
}
