// src/video/gl.rs

//! OpenGL plumbing: library reference counting, attribute defaults and the
//! context lifecycle. The driver does the actual work; the device validates
//! windows and keeps the bookkeeping.

use crate::driver::{GlContext, GlProcAddress};
use crate::error::{tolerate_unsupported, Result, VideoError};
use crate::video::window::{WindowFlags, WindowId};
use crate::video::VideoDevice;
use log::{debug, info};

/// Attributes settable before a GL window is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlAttribute {
    RedSize,
    GreenSize,
    BlueSize,
    AlphaSize,
    BufferSize,
    DoubleBuffer,
    DepthSize,
    StencilSize,
    AccumRedSize,
    AccumGreenSize,
    AccumBlueSize,
    AccumAlphaSize,
    Stereo,
    MultisampleBuffers,
    MultisampleSamples,
    AcceleratedVisual,
    RetainedBacking,
    ContextMajorVersion,
    ContextMinorVersion,
}

impl VideoDevice {
    /// Loads the GL library, or bumps its reference count if already loaded.
    ///
    /// Asking for a different library while one is loaded is an error.
    pub fn gl_load_library(&mut self, path: Option<&str>) -> Result<()> {
        if self.gl_library.loaded > 0 {
            if let Some(path) = path {
                if self.gl_library.path.as_deref() != Some(path) {
                    return Err(VideoError::invalid("OpenGL library already loaded"));
                }
            }
        } else {
            match self.driver.gl_load_library(path) {
                Err(VideoError::Unsupported(_)) => {
                    return Err(VideoError::Unsupported("dynamic OpenGL loading"))
                }
                other => other?,
            }
            self.gl_library.path = path.map(str::to_string);
            info!("Loaded GL library {}", path.unwrap_or("(default)"));
        }
        self.gl_library.loaded += 1;
        Ok(())
    }

    pub fn gl_get_proc_address(&mut self, name: &str) -> Result<GlProcAddress> {
        if self.gl_library.loaded == 0 {
            return Err(VideoError::NotInitialized("GL library"));
        }
        self.driver.gl_get_proc_address(name)
    }

    /// Drops one reference; the last one unloads the library.
    pub fn gl_unload_library(&mut self) {
        if self.gl_library.loaded == 0 {
            return;
        }
        self.gl_library.loaded -= 1;
        if self.gl_library.loaded == 0 {
            self.driver.gl_unload_library();
            self.gl_library.path = None;
            info!("Unloaded GL library");
        }
    }

    /// Whether `extension` appears as a whole word in the driver's extension
    /// string. An environment variable of the same name set to `0` forces
    /// `false`.
    pub fn gl_extension_supported(&mut self, extension: &str) -> bool {
        if extension.is_empty() || extension.contains(' ') {
            return false;
        }
        if let Ok(value) = std::env::var(extension) {
            if value.starts_with('0') {
                return false;
            }
        }
        match self.driver.gl_extensions() {
            Ok(extensions) => extensions.split(' ').any(|e| e == extension),
            Err(_) => false,
        }
    }

    pub fn gl_set_attribute(&mut self, attr: GlAttribute, value: i32) {
        *self.gl_attribute_slot(attr) = value;
    }

    pub fn gl_get_attribute(&mut self, attr: GlAttribute) -> i32 {
        *self.gl_attribute_slot(attr)
    }

    fn gl_attribute_slot(&mut self, attr: GlAttribute) -> &mut i32 {
        let gl = &mut self.gl_config;
        match attr {
            GlAttribute::RedSize => &mut gl.red_size,
            GlAttribute::GreenSize => &mut gl.green_size,
            GlAttribute::BlueSize => &mut gl.blue_size,
            GlAttribute::AlphaSize => &mut gl.alpha_size,
            GlAttribute::BufferSize => &mut gl.buffer_size,
            GlAttribute::DoubleBuffer => &mut gl.double_buffer,
            GlAttribute::DepthSize => &mut gl.depth_size,
            GlAttribute::StencilSize => &mut gl.stencil_size,
            GlAttribute::AccumRedSize => &mut gl.accum_red_size,
            GlAttribute::AccumGreenSize => &mut gl.accum_green_size,
            GlAttribute::AccumBlueSize => &mut gl.accum_blue_size,
            GlAttribute::AccumAlphaSize => &mut gl.accum_alpha_size,
            GlAttribute::Stereo => &mut gl.stereo,
            GlAttribute::MultisampleBuffers => &mut gl.multisample_buffers,
            GlAttribute::MultisampleSamples => &mut gl.multisample_samples,
            GlAttribute::AcceleratedVisual => &mut gl.accelerated,
            GlAttribute::RetainedBacking => &mut gl.retained_backing,
            GlAttribute::ContextMajorVersion => &mut gl.major_version,
            GlAttribute::ContextMinorVersion => &mut gl.minor_version,
        }
    }

    fn require_gl_window(&self, id: WindowId) -> Result<(usize, usize)> {
        let (d, i) = self.locate_window(id)?;
        if !self.displays[d].windows[i].flags.contains(WindowFlags::OPENGL) {
            return Err(VideoError::invalid("The specified window isn't an OpenGL window"));
        }
        Ok((d, i))
    }

    pub fn gl_create_context(&mut self, id: WindowId) -> Result<GlContext> {
        let (d, i) = self.require_gl_window(id)?;
        let context = self.driver.gl_create_context(&mut self.displays[d].windows[i])?;
        debug!("Created GL context {:?} for {}", context, id);
        Ok(context)
    }

    /// Binds `context` to `window`. A `None` context unbinds whatever is
    /// current.
    pub fn gl_make_current(&mut self, window: Option<WindowId>, context: Option<GlContext>) -> Result<()> {
        let Some(context) = context else {
            return self.driver.gl_make_current(None, None);
        };
        match window {
            Some(id) => {
                let (d, i) = self.require_gl_window(id)?;
                self.driver
                    .gl_make_current(Some(&mut self.displays[d].windows[i]), Some(context))
            }
            None => self.driver.gl_make_current(None, Some(context)),
        }
    }

    pub fn gl_set_swap_interval(&mut self, interval: i32) -> Result<()> {
        self.driver.gl_set_swap_interval(interval)
    }

    pub fn gl_get_swap_interval(&mut self) -> Result<i32> {
        self.driver.gl_get_swap_interval()
    }

    pub fn gl_swap_window(&mut self, id: WindowId) -> Result<()> {
        let (d, i) = self.require_gl_window(id)?;
        self.driver.gl_swap_window(&mut self.displays[d].windows[i])
    }

    /// Unbinds, then deletes `context`.
    pub fn gl_delete_context(&mut self, context: GlContext) -> Result<()> {
        tolerate_unsupported(self.driver.gl_make_current(None, None))?;
        self.driver.gl_delete_context(context)?;
        debug!("Deleted GL context {:?}", context);
        Ok(())
    }
}
