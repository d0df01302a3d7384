// src/video/tests.rs

use super::*;
use crate::driver::mock::{call_log, count, Call, MockVideoDriver};
use crate::pixels::PixelFormat;
use crate::video::events::WindowEvent;
use crate::video::gl::GlAttribute;
use test_log::test;

fn events(device: &mut VideoDevice) -> Vec<WindowEvent> {
    device.drain_window_events().into_iter().map(|n| n.event).collect()
}

fn mode(w: i32, h: i32, refresh_rate: i32) -> DisplayMode {
    DisplayMode::new(PixelFormat::RGB888, w, h, refresh_rate)
}

// --- Device lifecycle ---

#[test]
fn it_should_refuse_a_driver_without_displays() {
    struct Empty;
    impl VideoDriver for Empty {
        fn video_init(&mut self, _displays: &mut Vec<VideoDisplay>) -> Result<()> {
            Ok(())
        }
    }
    let result = VideoDevice::new("empty", Box::new(Empty), Config::default());
    assert!(matches!(result, Err(VideoError::DriverFailure(_))));
}

#[test]
fn it_should_tear_everything_down_on_drop() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let a = device.create_window(None, 0, 0, 100, 100, WindowFlags::empty())?;
    let b = device.create_window(None, 0, 0, 100, 100, WindowFlags::empty())?;
    device.disable_screen_saver()?;
    drop(device);

    let calls = log.borrow();
    let tail: Vec<&Call> = calls.iter().rev().take(4).collect();
    assert_eq!(
        tail,
        vec![
            &Call::VideoQuit,
            &Call::DestroyWindow(a),
            &Call::DestroyWindow(b),
            &Call::SuspendScreensaver(false),
        ]
    );
    Ok(())
}

#[test]
fn it_should_switch_drivers_through_the_subsystem() -> Result<()> {
    let mut video = VideoSubsystem::new();
    assert!(video.num_video_drivers() >= 1);
    assert_eq!(video.video_driver_name(0), Some("headless"));
    assert!(matches!(video.device(), Err(VideoError::NotInitialized(_))));

    video.init(Some("HEADLESS"), &Config::default())?;
    assert_eq!(video.current_video_driver(), Some("headless"));
    assert_eq!(video.device()?.num_displays(), 1);

    assert!(matches!(
        video.init(Some("nope"), &Config::default()),
        Err(VideoError::DriverNotFound(_))
    ));
    assert!(!video.is_initialized());
    Ok(())
}

#[test]
fn it_should_reject_out_of_range_displays() {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    assert!(device.select_display(0).is_ok());
    assert!(matches!(device.select_display(1), Err(VideoError::InvalidArgument(_))));
    assert!(device.display(1).is_err());
}

// --- Modes ---

#[test]
fn it_should_list_modes_biggest_first() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    assert_eq!(device.num_display_modes(), 4);
    assert_eq!(device.display_mode(0)?, mode(1920, 1080, 60));
    assert_eq!(device.display_mode(3)?.format, PixelFormat::INDEX8);
    assert!(device.display_mode(4).is_err());
    Ok(())
}

#[test]
fn it_should_pick_the_smallest_mode_that_fits() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let requested = DisplayMode::new(PixelFormat::UNKNOWN, 1000, 600, 0);
    assert_eq!(device.closest_display_mode(&requested)?, mode(1280, 720, 60));
    assert!(matches!(
        device.closest_display_mode(&mode(2000, 2000, 0)),
        Err(VideoError::NoMatchingMode { w: 2000, h: 2000 })
    ));
    Ok(())
}

#[test]
fn it_should_not_touch_the_driver_when_the_mode_is_unchanged() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    device.set_display_mode(None)?;
    assert_eq!(count(&log, |c| matches!(c, Call::SetDisplayMode(_))), 0);

    device.set_display_mode(Some(&mode(1920, 1080, 0)))?;
    device.set_display_mode(Some(&mode(1920, 1080, 60)))?;
    assert_eq!(count(&log, |c| matches!(c, Call::SetDisplayMode(_))), 1);
    assert_eq!(device.current_display_mode(), mode(1920, 1080, 60));
    assert_eq!(device.desktop_display_mode(), mode(1280, 720, 60));
    Ok(())
}

// --- Palette and gamma ---

#[test]
fn it_should_only_keep_a_palette_for_indexed_modes() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    assert!(matches!(
        device.set_display_palette(&[Color::WHITE], 0),
        Err(VideoError::InvalidArgument(_))
    ));

    device.set_display_mode(Some(&DisplayMode::new(PixelFormat::INDEX8, 640, 480, 0)))?;
    device.set_display_palette(&[Color::WHITE, Color::BLACK], 10)?;
    assert_eq!(device.display_palette(10, 2)?, vec![Color::WHITE, Color::BLACK]);
    assert!(device.display_palette(255, 2).is_err());
    assert!(log.borrow().contains(&Call::SetDisplayPalette(256)));

    device.set_display_mode(None)?;
    assert!(device.current_display().palette().is_none());
    Ok(())
}

#[test]
fn it_should_hold_gamma_until_a_window_has_focus() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let mut ramp = GammaRamp::identity();
    ramp.red[255] = 0;

    device.set_gamma_ramp(&ramp)?;
    assert_eq!(count(&log, |c| matches!(c, Call::SetGammaRamp(_))), 0);
    assert_eq!(device.gamma_ramp(), ramp);

    let id = device.create_window(None, 0, 0, 64, 64, WindowFlags::SHOWN)?;
    device.send_window_event(id, WindowEvent::FocusGained)?;
    assert_eq!(log.borrow().last(), Some(&Call::SetGammaRamp(ramp.clone())));

    device.send_window_event(id, WindowEvent::FocusLost)?;
    assert_eq!(log.borrow().last(), Some(&Call::SetGammaRamp(GammaRamp::identity())));
    Ok(())
}

// --- Window creation ---

#[test]
fn it_should_apply_creation_flags_as_transitions() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let id = device.create_window(
        Some("demo"),
        10,
        20,
        640,
        480,
        WindowFlags::SHOWN | WindowFlags::MAXIMIZED | WindowFlags::RESIZABLE,
    )?;
    assert_eq!(events(&mut device), vec![WindowEvent::Shown, WindowEvent::Maximized]);
    let flags = device.window_flags(id)?;
    assert!(flags.contains(WindowFlags::SHOWN | WindowFlags::MAXIMIZED | WindowFlags::RESIZABLE));
    assert_eq!(device.window_title(id)?, Some("demo"));
    assert_eq!(device.window_position(id)?, (10, 20));
    Ok(())
}

#[test]
fn it_should_resolve_special_positions_at_creation() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let centered = device.create_window(None, WINDOWPOS_CENTERED, WINDOWPOS_CENTERED, 200, 100, WindowFlags::empty())?;
    assert_eq!(device.window_position(centered)?, (540, 310));
    let undefined = device.create_window(None, WINDOWPOS_UNDEFINED, WINDOWPOS_UNDEFINED, 200, 100, WindowFlags::empty())?;
    assert_eq!(device.window_position(undefined)?, (0, 0));
    Ok(())
}

#[test]
fn it_should_reject_empty_windows() {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    assert!(matches!(
        device.create_window(None, 0, 0, 0, 10, WindowFlags::empty()),
        Err(VideoError::InvalidArgument(_))
    ));
}

#[test]
fn it_should_refuse_gl_windows_without_gl_support() {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    assert!(matches!(
        device.create_window(None, 0, 0, 10, 10, WindowFlags::OPENGL),
        Err(VideoError::Unsupported(_))
    ));
}

#[test]
fn it_should_release_gl_when_the_native_window_fails() {
    let log = call_log();
    let mut driver = MockVideoDriver::new(&log).with_opengl();
    driver.fail_create_window = true;
    let mut device = driver.into_device();
    assert!(device.create_window(None, 0, 0, 10, 10, WindowFlags::OPENGL).is_err());
    assert_eq!(device.gl_library.loaded, 0);
    assert_eq!(*log.borrow(), vec![Call::GlLoadLibrary, Call::GlUnloadLibrary]);
    assert!(device.current_display().windows().is_empty());
}

#[test]
fn it_should_tear_down_a_window_whose_setup_fails() -> Result<()> {
    let log = call_log();
    let mut driver = MockVideoDriver::new(&log).with_opengl();
    driver.fail_show_window = true;
    let mut device = driver.into_device();

    let err = device.create_window(Some("broken"), 0, 0, 10, 10, WindowFlags::SHOWN | WindowFlags::OPENGL);
    assert!(matches!(err, Err(VideoError::DriverFailure(_))));
    assert!(device.current_display().windows().is_empty());
    assert_eq!(count(&log, |c| matches!(c, Call::DestroyWindow(_))), 1);
    assert_eq!(device.gl_library.loaded, 0);
    assert_eq!(log.borrow().last(), Some(&Call::GlUnloadLibrary));

    // Windows that don't need showing still come up.
    let window = device.create_window(None, 0, 0, 10, 10, WindowFlags::empty())?;
    assert_eq!(device.current_display().windows().len(), 1);
    assert!(!device.window_flags(window)?.contains(WindowFlags::SHOWN));
    Ok(())
}

#[test]
fn it_should_require_the_hook_for_foreign_windows() {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    assert!(matches!(device.create_window_from(&42u64), Err(VideoError::Unsupported(_))));
    assert!(device.current_display().windows().is_empty());
}

#[test]
fn it_should_hand_out_unique_ids() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let a = device.create_window(None, 0, 0, 10, 10, WindowFlags::empty())?;
    device.destroy_window(a)?;
    let b = device.create_window(None, 0, 0, 10, 10, WindowFlags::empty())?;
    assert_ne!(a, b);
    assert!(matches!(device.destroy_window(a), Err(VideoError::InvalidArgument(_))));
    Ok(())
}

// --- Attributes ---

#[test]
fn it_should_only_retitle_on_change() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let id = device.create_window(None, 0, 0, 10, 10, WindowFlags::empty())?;
    device.set_window_title(id, Some("a"))?;
    device.set_window_title(id, Some("a"))?;
    device.set_window_title(id, None)?;
    assert_eq!(count(&log, |c| matches!(c, Call::SetWindowTitle(..))), 2);
    assert_eq!(device.window_title(id)?, None);
    Ok(())
}

#[test]
fn it_should_swap_window_data() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let id = device.create_window(None, 0, 0, 10, 10, WindowFlags::empty())?;
    assert!(device.set_window_data(id, Some(Box::new(5u32)))?.is_none());
    let previous = device.set_window_data(id, Some(Box::new("next")))?;
    assert_eq!(previous.and_then(|d| d.downcast_ref::<u32>().copied()), Some(5));
    assert_eq!(
        device.window_data(id)?.and_then(|d| d.downcast_ref::<&str>().copied()),
        Some("next")
    );
    Ok(())
}

#[test]
fn it_should_report_moves_and_resizes_once() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let id = device.create_window(None, 0, 0, 10, 10, WindowFlags::empty())?;
    device.set_window_position(id, 10, 20)?;
    device.set_window_position(id, 10, 20)?;
    device.set_window_size(id, 30, 40)?;
    device.set_window_size(id, 30, 40)?;
    assert_eq!(
        events(&mut device),
        vec![WindowEvent::Moved { x: 10, y: 20 }, WindowEvent::Resized { w: 30, h: 40 }]
    );
    assert_eq!(device.window_size(id)?, (30, 40));
    assert!(device.set_window_size(id, 0, 40).is_err());
    Ok(())
}

// --- State machine ---

#[test]
fn it_should_queue_notifications_only_on_change() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let id = device.create_window(None, 0, 0, 10, 10, WindowFlags::SHOWN)?;
    device.drain_window_events();

    device.show_window(id)?;
    assert!(events(&mut device).is_empty());
    assert!(!device.send_window_event(id, WindowEvent::Moved { x: 0, y: 0 })?);
    assert!(!device.send_window_event(id, WindowEvent::Restored)?);

    device.hide_window(id)?;
    device.hide_window(id)?;
    device.minimize_window(id)?;
    device.restore_window(id)?;
    assert_eq!(
        events(&mut device),
        vec![WindowEvent::Hidden, WindowEvent::Minimized, WindowEvent::Restored]
    );
    assert_eq!(count(&log, |c| matches!(c, Call::HideWindow(_))), 1);
    Ok(())
}

#[test]
fn it_should_grab_input_only_while_focused() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let id = device.create_window(None, 0, 0, 10, 10, WindowFlags::SHOWN)?;
    device.set_window_grab(id, true)?;
    assert!(device.window_grab(id)?);
    assert_eq!(count(&log, |c| matches!(c, Call::SetWindowGrab(..))), 0);

    device.send_window_event(id, WindowEvent::FocusGained)?;
    assert_eq!(device.focus_window(), Some(id));
    assert!(log.borrow().contains(&Call::SetWindowGrab(id, true)));
    Ok(())
}

#[test]
fn it_should_feed_driver_events_through_the_state_machine() -> Result<()> {
    let log = call_log();
    let driver = MockVideoDriver::new(&log);
    let pending = driver.pending_events.clone();
    let mut device = driver.into_device();
    let id = device.create_window(None, 0, 0, 10, 10, WindowFlags::empty())?;

    pending.borrow_mut().extend([
        WindowNotification::new(id, WindowEvent::Moved { x: 5, y: 6 }),
        WindowNotification::new(id, WindowEvent::Moved { x: 5, y: 6 }),
        WindowNotification::new(WindowId(999), WindowEvent::Shown),
    ]);
    device.pump_events();

    assert_eq!(device.window_position(id)?, (5, 6));
    assert_eq!(
        device.poll_window_event(),
        Some(WindowNotification::new(id, WindowEvent::Moved { x: 5, y: 6 }))
    );
    assert_eq!(device.poll_window_event(), None);
    Ok(())
}

// --- Fullscreen ---

#[test]
fn it_should_switch_modes_when_entering_and_leaving_fullscreen() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    device.set_fullscreen_display_mode(Some(&mode(1920, 1080, 0)))?;
    assert_eq!(count(&log, |c| matches!(c, Call::SetDisplayMode(_))), 0);
    assert_eq!(device.fullscreen_display_mode(), mode(1920, 1080, 60));

    let id = device.create_window(None, 0, 0, 1920, 1080, WindowFlags::SHOWN | WindowFlags::FULLSCREEN)?;
    assert_eq!(device.current_display_mode(), mode(1920, 1080, 60));
    assert!(log.borrow().contains(&Call::SetWindowPosition(id, 0, 0)));

    device.set_window_fullscreen(id, false)?;
    assert_eq!(device.current_display_mode(), mode(1280, 720, 60));
    assert_eq!(log.borrow().last(), Some(&Call::SetDisplayMode(mode(1280, 720, 60))));
    Ok(())
}

#[test]
fn it_should_minimize_a_fullscreen_window_that_loses_focus() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    device.set_fullscreen_display_mode(Some(&mode(1920, 1080, 60)))?;
    let id = device.create_window(None, 0, 0, 1920, 1080, WindowFlags::SHOWN | WindowFlags::FULLSCREEN)?;
    device.send_window_event(id, WindowEvent::FocusGained)?;
    device.drain_window_events();

    assert!(device.send_window_event(id, WindowEvent::FocusLost)?);
    assert!(device.window_flags(id)?.contains(WindowFlags::MINIMIZED));
    assert_eq!(device.current_display_mode(), device.desktop_display_mode());
    assert_eq!(events(&mut device), vec![WindowEvent::Minimized, WindowEvent::FocusLost]);
    Ok(())
}

#[test]
fn it_should_keep_one_fullscreen_window_visible() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let flags = WindowFlags::SHOWN | WindowFlags::FULLSCREEN;
    let first = device.create_window(None, 0, 0, 100, 100, flags)?;
    let second = device.create_window(None, 0, 0, 100, 100, flags)?;
    assert!(device.window_flags(first)?.contains(WindowFlags::MINIMIZED));
    assert!(!device.window_flags(second)?.contains(WindowFlags::MINIMIZED));
    assert_eq!(device.current_display().fullscreen_visible_windows(), vec![second]);
    Ok(())
}

#[test]
fn it_should_ignore_geometry_events_for_fullscreen_windows() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    let id = device.create_window(None, 0, 0, 100, 100, WindowFlags::FULLSCREEN)?;
    assert!(!device.send_window_event(id, WindowEvent::Moved { x: 3, y: 3 })?);
    assert!(!device.send_window_event(id, WindowEvent::Resized { w: 3, h: 3 })?);
    assert_eq!(device.window_size(id)?, (100, 100));
    Ok(())
}

// --- Screensaver ---

#[test]
fn it_should_only_report_screensaver_changes() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    assert!(device.is_screen_saver_enabled());
    device.enable_screen_saver()?;
    device.disable_screen_saver()?;
    device.disable_screen_saver()?;
    assert!(!device.is_screen_saver_enabled());
    assert_eq!(*log.borrow(), vec![Call::SuspendScreensaver(true)]);
    Ok(())
}

// --- OpenGL ---

#[test]
fn it_should_refcount_the_gl_library_across_windows() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).with_opengl().into_device();
    let a = device.create_window(None, 0, 0, 10, 10, WindowFlags::OPENGL)?;
    let b = device.create_window(None, 0, 0, 10, 10, WindowFlags::OPENGL)?;
    assert_eq!(device.gl_library.loaded, 2);

    device.destroy_window(a)?;
    assert_eq!(count(&log, |c| *c == Call::GlUnloadLibrary), 0);
    device.destroy_window(b)?;
    assert_eq!(count(&log, |c| *c == Call::GlUnloadLibrary), 1);
    assert_eq!(count(&log, |c| *c == Call::GlLoadLibrary), 1);
    assert!(matches!(device.gl_get_proc_address("glClear"), Err(VideoError::NotInitialized(_))));
    Ok(())
}

#[test]
fn it_should_refuse_a_second_gl_library() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).with_opengl().into_device();
    device.gl_load_library(Some("libGL.so.1"))?;
    device.gl_load_library(Some("libGL.so.1"))?;
    device.gl_load_library(None)?;
    assert!(device.gl_load_library(Some("other.so")).is_err());
    assert_eq!(device.gl_library.loaded, 3);
    assert_eq!(device.gl_get_proc_address("glClear")?.0, 7);
    Ok(())
}

#[test]
fn it_should_match_whole_extension_names() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).with_opengl().into_device();
    assert!(device.gl_extension_supported("GL_EXT_bgra"));
    assert!(!device.gl_extension_supported("GL_EXT"));
    assert!(!device.gl_extension_supported("GL_EXT_bgra GL_ARB_multitexture"));
    assert!(!device.gl_extension_supported(""));
    Ok(())
}

#[test]
fn it_should_remember_gl_attributes() {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).into_device();
    assert_eq!(device.gl_get_attribute(GlAttribute::DepthSize), 16);
    device.gl_set_attribute(GlAttribute::DepthSize, 24);
    assert_eq!(device.gl_get_attribute(GlAttribute::DepthSize), 24);
    assert_eq!(device.gl_get_attribute(GlAttribute::ContextMajorVersion), 2);
}

#[test]
fn it_should_only_create_contexts_for_gl_windows() -> Result<()> {
    let log = call_log();
    let mut device = MockVideoDriver::new(&log).with_opengl().into_device();
    let plain = device.create_window(None, 0, 0, 10, 10, WindowFlags::empty())?;
    let gl = device.create_window(None, 0, 0, 10, 10, WindowFlags::OPENGL)?;
    assert!(matches!(device.gl_create_context(plain), Err(VideoError::InvalidArgument(_))));

    let context = device.gl_create_context(gl)?;
    device.gl_make_current(Some(gl), Some(context))?;
    device.gl_delete_context(context)?;
    let calls = log.borrow();
    assert_eq!(
        calls[calls.len() - 3..],
        [
            Call::GlMakeCurrent(Some(context)),
            Call::GlMakeCurrent(None),
            Call::GlDeleteContext(context),
        ]
    );
    Ok(())
}
