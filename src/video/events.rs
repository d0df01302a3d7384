// src/video/events.rs
//! Window event types exchanged between the video driver and the core.
//!
//! Backends report what happened to a native window through
//! `VideoDriver::pump_events`; the core feeds each report through the window
//! state machine (`VideoDevice::send_window_event`) and queues a
//! notification for the application only when the window's state actually
//! changed.

use crate::video::window::WindowId;

/// Something that happened to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowEvent {
    /// Window became visible.
    Shown,

    /// Window was hidden.
    Hidden,

    /// Window contents need to be redrawn.
    Exposed,

    /// Window moved to (`x`, `y`).
    Moved { x: i32, y: i32 },

    /// Window was resized to `w`x`h`.
    Resized { w: i32, h: i32 },

    Minimized,

    Maximized,

    /// Window left the minimized or maximized state.
    Restored,

    /// Mouse pointer entered the window.
    Enter,

    /// Mouse pointer left the window.
    Leave,

    /// Window gained keyboard focus.
    FocusGained,

    /// Window lost keyboard focus.
    FocusLost,

    /// The window manager requested that the window be closed.
    Close,
}

/// A window event addressed to a specific window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowNotification {
    pub window: WindowId,
    pub event: WindowEvent,
}

impl WindowNotification {
    pub fn new(window: WindowId, event: WindowEvent) -> Self {
        Self { window, event }
    }
}
