// src/lib.rs

//! Device-independent video core.
//!
//! - `driver`: the backend SPI, the compiled-in driver registry and the
//!   headless backend
//! - `display`: displays, display modes and the closest-mode matcher
//! - `video`: the video device, windows, window events and GL plumbing
//! - `render`: renderers, textures, format negotiation and draw dispatch
//! - `pixels`, `rect`, `surface`: the value types the layers above share
//! - `config`: JSON configuration with environment overrides
//!
//! Everything goes through an explicit [`VideoDevice`], usually obtained from
//! a [`VideoSubsystem`].

pub mod config;
pub mod display;
pub mod driver;
pub mod error;
pub mod pixels;
pub mod rect;
pub mod render;
pub mod surface;
pub mod video;

pub use config::{Config, CONFIG};
pub use display::{DisplayMode, GammaRamp};
pub use error::{Result, VideoError};
pub use pixels::{Color, PixelFormat};
pub use rect::{Point, Rect};
pub use render::{BlendMode, RendererFlags, RendererInfo, ScaleMode, TextureAccess, TextureId};
pub use surface::Surface;
pub use video::events::{WindowEvent, WindowNotification};
pub use video::gl::GlAttribute;
pub use video::{VideoDevice, VideoSubsystem, WindowFlags, WindowId, WINDOWPOS_CENTERED, WINDOWPOS_UNDEFINED};
