// src/video/window.rs

//! Window records and the window manager.
//!
//! Every visible change to a window goes through `send_window_event`, the
//! single state machine that flips flags, updates geometry and runs the
//! focus/visibility side effects (display mode switches, gamma restore,
//! input grab). The public operations below check their precondition, call
//! the driver hook and then feed the matching event through that machine, so
//! a notification is queued exactly when the window's state changed.

use crate::display::DisplayMode;
use crate::driver::WmInfo;
use crate::error::{tolerate_unsupported, Result, VideoError};
use crate::render::Renderer;
use crate::surface::Surface;
use crate::video::events::{WindowEvent, WindowNotification};
use crate::video::VideoDevice;
use bitflags::bitflags;
use log::{debug, info, warn};
use std::any::Any;
use std::fmt;

/// Position value meaning "leave this coordinate alone".
pub const WINDOWPOS_UNDEFINED: i32 = 0x7FF_FFFF;
/// Position value meaning "center on the display".
pub const WINDOWPOS_CENTERED: i32 = 0x7FF_FFFE;

/// Unique, never reused identifier of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window {}", self.0)
    }
}

bitflags! {
    /// Window state and creation flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowFlags: u32 {
        const FULLSCREEN = 0x0000_0001;
        const OPENGL = 0x0000_0002;
        const SHOWN = 0x0000_0004;
        const BORDERLESS = 0x0000_0008;
        const RESIZABLE = 0x0000_0010;
        const MINIMIZED = 0x0000_0020;
        const MAXIMIZED = 0x0000_0040;
        const INPUT_GRABBED = 0x0000_0100;
        const INPUT_FOCUS = 0x0000_0200;
        const MOUSE_FOCUS = 0x0000_0400;
        /// Wraps a native window the core did not create.
        const FOREIGN = 0x0000_0800;
    }
}

/// Flags a new window keeps from its creation request; the rest are applied
/// as transitions once the backend window exists.
const CREATE_FLAGS: WindowFlags = WindowFlags::OPENGL
    .union(WindowFlags::BORDERLESS)
    .union(WindowFlags::RESIZABLE)
    .union(WindowFlags::INPUT_GRABBED);

/// An on-screen window, owned by its display.
pub struct Window {
    pub(crate) id: WindowId,
    pub(crate) title: Option<String>,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) w: i32,
    pub(crate) h: i32,
    pub(crate) flags: WindowFlags,
    pub(crate) display: usize,
    pub(crate) renderer: Option<Renderer>,
    pub(crate) userdata: Option<Box<dyn Any>>,
    /// Backend-private data.
    pub driver_data: Option<Box<dyn Any>>,
}

impl Window {
    fn new(id: WindowId, display: usize) -> Self {
        Window {
            id,
            title: None,
            x: 0,
            y: 0,
            w: 0,
            h: 0,
            flags: WindowFlags::empty(),
            display,
            renderer: None,
            userdata: None,
            driver_data: None,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn size(&self) -> (i32, i32) {
        (self.w, self.h)
    }

    pub fn flags(&self) -> WindowFlags {
        self.flags
    }

    pub fn display_index(&self) -> usize {
        self.display
    }

    pub fn renderer(&self) -> Option<&Renderer> {
        self.renderer.as_ref()
    }

    /// Fullscreen, shown and not minimized.
    pub fn is_fullscreen_visible(&self) -> bool {
        self.flags.contains(WindowFlags::FULLSCREEN | WindowFlags::SHOWN)
            && !self.flags.contains(WindowFlags::MINIMIZED)
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("w", &self.w)
            .field("h", &self.h)
            .field("flags", &self.flags)
            .field("display", &self.display)
            .field("has_renderer", &self.renderer.is_some())
            .finish()
    }
}

fn resolve_position(pos: i32, extent: i32, display_extent: i32) -> i32 {
    match pos {
        WINDOWPOS_UNDEFINED => 0,
        WINDOWPOS_CENTERED => (display_extent - extent) / 2,
        p => p,
    }
}

impl VideoDevice {
    // --- Lookup ---

    /// (display index, window index) of a live window.
    pub(crate) fn locate_window(&self, id: WindowId) -> Result<(usize, usize)> {
        self.displays
            .iter()
            .enumerate()
            .find_map(|(d, display)| display.window_index(id).map(|i| (d, i)))
            .ok_or_else(|| VideoError::invalid(format!("invalid window id {}", id.0)))
    }

    pub fn window(&self, id: WindowId) -> Result<&Window> {
        let (d, i) = self.locate_window(id)?;
        Ok(&self.displays[d].windows[i])
    }

    pub(crate) fn window_mut(&mut self, id: WindowId) -> Result<&mut Window> {
        let (d, i) = self.locate_window(id)?;
        Ok(&mut self.displays[d].windows[i])
    }

    /// Runs a driver hook against a window. Missing hooks are ignored.
    fn window_hook(
        &mut self,
        id: WindowId,
        hook: impl FnOnce(&mut dyn crate::driver::VideoDriver, &mut Window) -> Result<()>,
    ) -> Result<()> {
        let (d, i) = self.locate_window(id)?;
        let window = &mut self.displays[d].windows[i];
        tolerate_unsupported(hook(self.driver.as_mut(), window))
    }

    fn queue_event(&mut self, id: WindowId, event: WindowEvent) {
        self.events.push_back(WindowNotification::new(id, event));
    }

    // --- Creation and destruction ---

    /// Creates a window on the current display.
    ///
    /// `x`/`y` accept [`WINDOWPOS_UNDEFINED`] and [`WINDOWPOS_CENTERED`].
    /// `SHOWN`, `MINIMIZED`, `MAXIMIZED` and `FULLSCREEN` are applied in that
    /// order after the backend window exists, each as a normal transition.
    pub fn create_window(
        &mut self,
        title: Option<&str>,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        flags: WindowFlags,
    ) -> Result<WindowId> {
        if w <= 0 || h <= 0 {
            return Err(VideoError::invalid("window size must be positive"));
        }
        if flags.contains(WindowFlags::OPENGL) {
            if !self.driver.supports_opengl() {
                return Err(VideoError::Unsupported("OpenGL windows"));
            }
            if let Err(e) = self.gl_load_library(None) {
                warn!("Couldn't load the GL library for a new window: {}", e);
            }
        }

        let display = self.current_display;
        let id = WindowId(self.next_object_id());
        let mode = &self.displays[display].current_mode;
        let mut window = Window::new(id, display);
        window.x = resolve_position(x, w, mode.w);
        window.y = resolve_position(y, h, mode.h);
        window.w = w;
        window.h = h;
        window.flags = flags & CREATE_FLAGS;

        if let Err(e) = tolerate_unsupported(self.driver.create_window(&mut window)) {
            if flags.contains(WindowFlags::OPENGL) {
                self.gl_unload_library();
            }
            return Err(e);
        }
        self.displays[display].windows.push(window);
        info!("Created {} ({}x{}) on display {}", id, w, h, display);

        if let Err(e) = self.apply_creation_flags(id, title, flags) {
            if let Err(cleanup) = self.destroy_window(id) {
                warn!("Couldn't tear down half-created {}: {}", id, cleanup);
            }
            return Err(e);
        }
        Ok(id)
    }

    /// Runs the requested initial state through the regular transitions.
    fn apply_creation_flags(&mut self, id: WindowId, title: Option<&str>, flags: WindowFlags) -> Result<()> {
        if title.is_some() {
            self.set_window_title(id, title)?;
        }
        if flags.contains(WindowFlags::SHOWN) {
            self.show_window(id)?;
        }
        if flags.contains(WindowFlags::MINIMIZED) {
            self.minimize_window(id)?;
        }
        if flags.contains(WindowFlags::MAXIMIZED) {
            self.maximize_window(id)?;
        }
        if flags.contains(WindowFlags::FULLSCREEN) {
            self.set_window_fullscreen(id, true)?;
        }
        self.update_window_grab(id)
    }

    /// Wraps an existing native window. The backend must support it.
    pub fn create_window_from(&mut self, native: &dyn Any) -> Result<WindowId> {
        let display = self.current_display;
        let id = WindowId(self.next_object_id());
        let mut window = Window::new(id, display);
        window.flags = WindowFlags::FOREIGN;
        self.driver.create_window_from(&mut window, native)?;
        self.displays[display].windows.push(window);
        info!("Adopted foreign {} on display {}", id, display);
        Ok(id)
    }

    /// Destroys a window, its renderer and its textures.
    ///
    /// A focus-lost transition runs first so a fullscreen window gives the
    /// desktop mode and gamma back before it disappears.
    pub fn destroy_window(&mut self, id: WindowId) -> Result<()> {
        self.locate_window(id)?;
        self.send_window_event(id, WindowEvent::FocusLost)?;
        self.destroy_renderer(id)?;

        let (d, i) = self.locate_window(id)?;
        let window = &mut self.displays[d].windows[i];
        if let Err(e) = tolerate_unsupported(self.driver.destroy_window(window)) {
            warn!("Driver failed to destroy {}: {}", id, e);
        }
        let opengl = window.flags.contains(WindowFlags::OPENGL);
        self.displays[d].windows.remove(i);
        if opengl {
            self.gl_unload_library();
        }
        info!("Destroyed {}", id);
        Ok(())
    }

    // --- Attributes ---

    pub fn window_flags(&self, id: WindowId) -> Result<WindowFlags> {
        Ok(self.window(id)?.flags)
    }

    /// Sets the title; the driver is only told when it actually changes.
    pub fn set_window_title(&mut self, id: WindowId, title: Option<&str>) -> Result<()> {
        let window = self.window_mut(id)?;
        if window.title.as_deref() == title {
            return Ok(());
        }
        window.title = title.map(str::to_string);
        self.window_hook(id, |driver, window| driver.set_window_title(window))
    }

    pub fn window_title(&self, id: WindowId) -> Result<Option<&str>> {
        Ok(self.window(id)?.title())
    }

    pub fn set_window_icon(&mut self, id: WindowId, icon: &Surface) -> Result<()> {
        self.window_hook(id, |driver, window| driver.set_window_icon(window, icon))
    }

    /// Attaches application data, returning what was there before.
    pub fn set_window_data(
        &mut self,
        id: WindowId,
        data: Option<Box<dyn Any>>,
    ) -> Result<Option<Box<dyn Any>>> {
        let window = self.window_mut(id)?;
        Ok(std::mem::replace(&mut window.userdata, data))
    }

    pub fn window_data(&self, id: WindowId) -> Result<Option<&dyn Any>> {
        Ok(self.window(id)?.userdata.as_deref())
    }

    pub fn set_window_position(&mut self, id: WindowId, x: i32, y: i32) -> Result<()> {
        let (d, i) = self.locate_window(id)?;
        let mode_w = self.displays[d].current_mode.w;
        let mode_h = self.displays[d].current_mode.h;
        let window = &mut self.displays[d].windows[i];
        let old = (window.x, window.y);
        if x != WINDOWPOS_UNDEFINED {
            window.x = resolve_position(x, window.w, mode_w);
        }
        if y != WINDOWPOS_UNDEFINED {
            window.y = resolve_position(y, window.h, mode_h);
        }
        let new = (window.x, window.y);
        let fullscreen = window.flags.contains(WindowFlags::FULLSCREEN);
        self.window_hook(id, |driver, window| driver.set_window_position(window))?;
        if new != old && !fullscreen {
            self.queue_event(id, WindowEvent::Moved { x: new.0, y: new.1 });
        }
        Ok(())
    }

    pub fn window_position(&self, id: WindowId) -> Result<(i32, i32)> {
        Ok(self.window(id)?.position())
    }

    /// Resizes the window and tells its renderer about the new size.
    pub fn set_window_size(&mut self, id: WindowId, w: i32, h: i32) -> Result<()> {
        if w <= 0 || h <= 0 {
            return Err(VideoError::invalid("window size must be positive"));
        }
        let window = self.window_mut(id)?;
        let changed = (window.w, window.h) != (w, h);
        let fullscreen = window.flags.contains(WindowFlags::FULLSCREEN);
        window.w = w;
        window.h = h;
        self.window_hook(id, |driver, window| driver.set_window_size(window))?;
        self.on_window_resized(id);
        if changed && !fullscreen {
            self.queue_event(id, WindowEvent::Resized { w, h });
        }
        Ok(())
    }

    pub fn window_size(&self, id: WindowId) -> Result<(i32, i32)> {
        Ok(self.window(id)?.size())
    }

    // --- Visibility transitions ---

    pub fn show_window(&mut self, id: WindowId) -> Result<()> {
        if self.window(id)?.flags.contains(WindowFlags::SHOWN) {
            return Ok(());
        }
        self.window_hook(id, |driver, window| driver.show_window(window))?;
        self.send_window_event(id, WindowEvent::Shown)?;
        Ok(())
    }

    pub fn hide_window(&mut self, id: WindowId) -> Result<()> {
        if !self.window(id)?.flags.contains(WindowFlags::SHOWN) {
            return Ok(());
        }
        self.window_hook(id, |driver, window| driver.hide_window(window))?;
        self.send_window_event(id, WindowEvent::Hidden)?;
        Ok(())
    }

    /// Brings a shown window to the front. Hidden windows are left alone.
    pub fn raise_window(&mut self, id: WindowId) -> Result<()> {
        if !self.window(id)?.flags.contains(WindowFlags::SHOWN) {
            return Ok(());
        }
        self.window_hook(id, |driver, window| driver.raise_window(window))
    }

    pub fn maximize_window(&mut self, id: WindowId) -> Result<()> {
        if self.window(id)?.flags.contains(WindowFlags::MAXIMIZED) {
            return Ok(());
        }
        self.window_hook(id, |driver, window| driver.maximize_window(window))?;
        self.send_window_event(id, WindowEvent::Maximized)?;
        Ok(())
    }

    pub fn minimize_window(&mut self, id: WindowId) -> Result<()> {
        if self.window(id)?.flags.contains(WindowFlags::MINIMIZED) {
            return Ok(());
        }
        self.window_hook(id, |driver, window| driver.minimize_window(window))?;
        self.send_window_event(id, WindowEvent::Minimized)?;
        Ok(())
    }

    /// Leaves the minimized or maximized state; otherwise does nothing.
    pub fn restore_window(&mut self, id: WindowId) -> Result<()> {
        if !self
            .window(id)?
            .flags
            .intersects(WindowFlags::MINIMIZED | WindowFlags::MAXIMIZED)
        {
            return Ok(());
        }
        self.window_hook(id, |driver, window| driver.restore_window(window))?;
        self.send_window_event(id, WindowEvent::Restored)?;
        Ok(())
    }

    /// Enters or leaves fullscreen.
    ///
    /// Entering while visible minimizes every other fullscreen-visible window
    /// on the display and switches to the display's fullscreen mode. Leaving
    /// while visible switches back to the desktop mode.
    pub fn set_window_fullscreen(&mut self, id: WindowId, fullscreen: bool) -> Result<()> {
        let (d, i) = self.locate_window(id)?;
        let window = &mut self.displays[d].windows[i];
        if window.flags.contains(WindowFlags::FULLSCREEN) == fullscreen {
            return Ok(());
        }
        if fullscreen {
            window.flags.insert(WindowFlags::FULLSCREEN);
            if window.is_fullscreen_visible() {
                for other in self.displays[d].fullscreen_visible_windows() {
                    if other != id {
                        self.minimize_window(other)?;
                    }
                }
                let mode = self.displays[d].fullscreen_mode.clone();
                self.set_display_mode_for(d, Some(&mode))?;
            }
        } else {
            let was_visible = window.is_fullscreen_visible();
            window.flags.remove(WindowFlags::FULLSCREEN);
            if was_visible {
                self.set_display_mode_for(d, None)?;
            }
        }
        debug!("{} fullscreen = {}", id, fullscreen);
        Ok(())
    }

    // --- Input grab and focus ---

    pub fn set_window_grab(&mut self, id: WindowId, grabbed: bool) -> Result<()> {
        let window = self.window_mut(id)?;
        if window.flags.contains(WindowFlags::INPUT_GRABBED) == grabbed {
            return Ok(());
        }
        window.flags.set(WindowFlags::INPUT_GRABBED, grabbed);
        self.update_window_grab(id)
    }

    pub fn window_grab(&self, id: WindowId) -> Result<bool> {
        Ok(self.window(id)?.flags.contains(WindowFlags::INPUT_GRABBED))
    }

    /// The grab only takes effect on the focused window.
    fn update_window_grab(&mut self, id: WindowId) -> Result<()> {
        if self.window(id)?.flags.contains(WindowFlags::INPUT_FOCUS) {
            self.window_hook(id, |driver, window| driver.set_window_grab(window))?;
        }
        Ok(())
    }

    /// The window on the current display that has keyboard focus.
    pub fn focus_window(&self) -> Option<WindowId> {
        self.displays[self.current_display]
            .windows
            .iter()
            .find(|w| w.flags.contains(WindowFlags::INPUT_FOCUS))
            .map(|w| w.id)
    }

    pub fn window_wm_info(&mut self, id: WindowId) -> Result<WmInfo> {
        let (d, i) = self.locate_window(id)?;
        self.driver.get_window_wm_info(&self.displays[d].windows[i])
    }

    // --- State machine ---

    /// Applies `event` to the window's state.
    ///
    /// Returns whether the state changed; only then is a notification queued.
    /// Moves and resizes are ignored for fullscreen windows, whose geometry
    /// is dictated by the display mode.
    pub fn send_window_event(&mut self, id: WindowId, event: WindowEvent) -> Result<bool> {
        let window = self.window_mut(id)?;
        let flags = window.flags;
        match event {
            WindowEvent::Shown => {
                if flags.contains(WindowFlags::SHOWN) {
                    return Ok(false);
                }
                window.flags.insert(WindowFlags::SHOWN);
                self.on_window_shown(id)?;
            }
            WindowEvent::Hidden => {
                if !flags.contains(WindowFlags::SHOWN) {
                    return Ok(false);
                }
                window.flags.remove(WindowFlags::SHOWN);
                self.on_window_hidden(id)?;
            }
            WindowEvent::Moved { x, y } => {
                if flags.contains(WindowFlags::FULLSCREEN) {
                    return Ok(false);
                }
                let x = if x == WINDOWPOS_UNDEFINED { window.x } else { x };
                let y = if y == WINDOWPOS_UNDEFINED { window.y } else { y };
                if (x, y) == (window.x, window.y) {
                    return Ok(false);
                }
                window.x = x;
                window.y = y;
            }
            WindowEvent::Resized { w, h } => {
                if flags.contains(WindowFlags::FULLSCREEN) || (w, h) == (window.w, window.h) {
                    return Ok(false);
                }
                window.w = w;
                window.h = h;
                self.on_window_resized(id);
            }
            WindowEvent::Minimized => {
                if flags.contains(WindowFlags::MINIMIZED) {
                    return Ok(false);
                }
                window.flags.insert(WindowFlags::MINIMIZED);
            }
            WindowEvent::Maximized => {
                if flags.contains(WindowFlags::MAXIMIZED) {
                    return Ok(false);
                }
                window.flags.insert(WindowFlags::MAXIMIZED);
            }
            WindowEvent::Restored => {
                if !flags.intersects(WindowFlags::MINIMIZED | WindowFlags::MAXIMIZED) {
                    return Ok(false);
                }
                window
                    .flags
                    .remove(WindowFlags::MINIMIZED | WindowFlags::MAXIMIZED);
            }
            WindowEvent::Enter => {
                if flags.contains(WindowFlags::MOUSE_FOCUS) {
                    return Ok(false);
                }
                window.flags.insert(WindowFlags::MOUSE_FOCUS);
            }
            WindowEvent::Leave => {
                if !flags.contains(WindowFlags::MOUSE_FOCUS) {
                    return Ok(false);
                }
                window.flags.remove(WindowFlags::MOUSE_FOCUS);
            }
            WindowEvent::FocusGained => {
                if flags.contains(WindowFlags::INPUT_FOCUS) {
                    return Ok(false);
                }
                window.flags.insert(WindowFlags::INPUT_FOCUS);
                self.on_window_focus_gained(id)?;
            }
            WindowEvent::FocusLost => {
                if !flags.contains(WindowFlags::INPUT_FOCUS) {
                    return Ok(false);
                }
                window.flags.remove(WindowFlags::INPUT_FOCUS);
                self.on_window_focus_lost(id)?;
            }
            WindowEvent::Exposed | WindowEvent::Close => {}
        }
        debug!("{}: {:?}", id, event);
        self.queue_event(id, event);
        Ok(true)
    }

    fn on_window_shown(&mut self, id: WindowId) -> Result<()> {
        if self.window(id)?.flags.contains(WindowFlags::FULLSCREEN) {
            self.send_window_event(id, WindowEvent::FocusGained)?;
        }
        Ok(())
    }

    fn on_window_hidden(&mut self, id: WindowId) -> Result<()> {
        if self.window(id)?.flags.contains(WindowFlags::FULLSCREEN) {
            self.send_window_event(id, WindowEvent::FocusLost)?;
        }
        Ok(())
    }

    /// Lets the window's renderer drop anything sized for the old geometry.
    pub(crate) fn on_window_resized(&mut self, id: WindowId) {
        if let Ok(window) = self.window_mut(id) {
            let (w, h) = (window.w, window.h);
            if let Some(renderer) = window.renderer.as_mut() {
                if let Err(e) = renderer.backend.display_mode_changed(w, h) {
                    warn!("Renderer of {} failed to handle a resize: {}", id, e);
                }
            }
        }
    }

    fn on_window_focus_gained(&mut self, id: WindowId) -> Result<()> {
        let (d, i) = self.locate_window(id)?;
        let flags = self.displays[d].windows[i].flags;
        if flags.contains(WindowFlags::FULLSCREEN) {
            let mode: DisplayMode = self.displays[d].fullscreen_mode.clone();
            if let Err(e) = self.set_display_mode_for(d, Some(&mode)) {
                warn!("Couldn't restore the fullscreen mode for {}: {}", id, e);
            }
        }
        if let Some(ramp) = self.displays[d].gamma.as_ref() {
            if let Err(e) = tolerate_unsupported(self.driver.set_display_gamma_ramp(d, ramp)) {
                warn!("Couldn't apply the gamma ramp of display {}: {}", d, e);
            }
        }
        if flags.intersects(WindowFlags::INPUT_GRABBED | WindowFlags::FULLSCREEN) {
            self.window_hook(id, |driver, window| driver.set_window_grab(window))?;
        }
        Ok(())
    }

    fn on_window_focus_lost(&mut self, id: WindowId) -> Result<()> {
        let (d, i) = self.locate_window(id)?;
        let flags = self.displays[d].windows[i].flags;
        if flags.contains(WindowFlags::FULLSCREEN) {
            self.minimize_window(id)?;
            if let Err(e) = self.set_display_mode_for(d, None) {
                warn!("Couldn't restore the desktop mode of display {}: {}", d, e);
            }
        }
        let display = &self.displays[d];
        if let (Some(_), Some(saved)) = (display.gamma.as_ref(), display.saved_gamma.as_ref()) {
            if let Err(e) = tolerate_unsupported(self.driver.set_display_gamma_ramp(d, saved)) {
                warn!("Couldn't restore the saved gamma ramp of display {}: {}", d, e);
            }
        }
        if flags.intersects(WindowFlags::INPUT_GRABBED | WindowFlags::FULLSCREEN) {
            self.window_hook(id, |driver, window| driver.set_window_grab(window))?;
        }
        Ok(())
    }
}
