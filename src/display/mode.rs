// src/display/mode.rs

//! Display modes, their canonical ordering and the closest-mode matcher.
//!
//! The matcher's scan depends on the list being sorted by [`cmp_modes`]:
//! it stops at the first mode narrower than the request and keeps the last
//! qualifying entry, which is the smallest mode that still fits.

use crate::pixels::PixelFormat;
use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Backend-private payload attached to a mode.
///
/// Two payloads compare equal only if they are the same allocation, so modes
/// that differ only in backend data are distinct entries.
#[derive(Clone, Default)]
pub struct ModeData(pub Option<Rc<dyn Any>>);

impl ModeData {
    pub fn new<T: Any>(data: T) -> Self {
        ModeData(Some(Rc::new(data)))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|d| d.downcast_ref::<T>())
    }
}

impl PartialEq for ModeData {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for ModeData {}

impl fmt::Debug for ModeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("ModeData(..)"),
            None => f.write_str("ModeData(None)"),
        }
    }
}

/// A (format, width, height, refresh rate) tuple a display can be driven at.
/// Zero fields mean "unspecified".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayMode {
    pub format: PixelFormat,
    pub w: i32,
    pub h: i32,
    pub refresh_rate: i32,
    pub driver_data: ModeData,
}

impl DisplayMode {
    pub fn new(format: PixelFormat, w: i32, h: i32, refresh_rate: i32) -> Self {
        DisplayMode {
            format,
            w,
            h,
            refresh_rate,
            driver_data: ModeData::default(),
        }
    }

    pub fn with_driver_data(mut self, data: ModeData) -> Self {
        self.driver_data = data;
        self
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}@{}Hz {}",
            self.w, self.h, self.refresh_rate, self.format
        )
    }
}

/// Sort order of a display's mode list: the "biggest" mode comes first.
///
/// Width, height, bits per pixel, packed layout and refresh rate, all
/// descending.
pub fn cmp_modes(a: &DisplayMode, b: &DisplayMode) -> Ordering {
    b.w.cmp(&a.w)
        .then_with(|| b.h.cmp(&a.h))
        .then_with(|| b.format.bits_per_pixel().cmp(&a.format.bits_per_pixel()))
        .then_with(|| b.format.pixel_layout().cmp(&a.format.pixel_layout()))
        .then_with(|| b.refresh_rate.cmp(&a.refresh_rate))
}

/// Inserts `mode` into a sorted list. Returns `false` for a duplicate.
pub fn insert_mode(modes: &mut Vec<DisplayMode>, mode: DisplayMode) -> bool {
    if modes.contains(&mode) {
        return false;
    }
    modes.push(mode);
    modes.sort_by(cmp_modes);
    true
}

/// Finds the mode in `modes` that best satisfies `requested`.
///
/// Zero format or refresh in the request defaults to the `desktop` mode's
/// values when ranking. Returns `None` if no listed mode is large enough.
/// Fields the match leaves unset are back-filled from the request and then
/// from RGB888 at 640x480.
pub fn closest_display_mode(
    modes: &[DisplayMode],
    requested: &DisplayMode,
    desktop: &DisplayMode,
) -> Option<DisplayMode> {
    let target_format = if requested.format.is_unknown() {
        desktop.format
    } else {
        requested.format
    };
    let target_refresh = if requested.refresh_rate == 0 {
        desktop.refresh_rate
    } else {
        requested.refresh_rate
    };

    let mut best: Option<&DisplayMode> = None;
    for current in modes {
        if current.w != 0 && current.w < requested.w {
            // Out of sorts: everything after this is narrower still.
            break;
        }
        if current.h != 0 && current.h < requested.h {
            if current.w != 0 && current.w == requested.w {
                // Wider modes with this width are all exhausted.
                break;
            }
            // Wider but too short; a narrower, taller mode may follow.
            continue;
        }
        let m = match best {
            None => {
                best = Some(current);
                continue;
            }
            Some(m) => m,
        };
        if current.w < m.w || current.h < m.h {
            best = Some(current);
            continue;
        }
        if current.format != m.format {
            if current.format == target_format
                || (current.format.bits_per_pixel() >= target_format.bits_per_pixel()
                    && current.format.pixel_type() == target_format.pixel_type())
            {
                best = Some(current);
            }
            continue;
        }
        if current.refresh_rate != m.refresh_rate && current.refresh_rate >= target_refresh {
            best = Some(current);
        }
    }

    let m = best?;
    let mut closest = DisplayMode {
        format: if m.format.is_unknown() {
            requested.format
        } else {
            m.format
        },
        w: requested.w,
        h: requested.h,
        refresh_rate: if m.refresh_rate != 0 {
            m.refresh_rate
        } else {
            requested.refresh_rate
        },
        driver_data: m.driver_data.clone(),
    };
    if m.w != 0 && m.h != 0 {
        closest.w = m.w;
        closest.h = m.h;
    }
    if closest.format.is_unknown() {
        closest.format = PixelFormat::RGB888;
    }
    if closest.w == 0 {
        closest.w = 640;
    }
    if closest.h == 0 {
        closest.h = 480;
    }
    Some(closest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn mode(w: i32, h: i32, refresh: i32) -> DisplayMode {
        DisplayMode::new(PixelFormat::RGB888, w, h, refresh)
    }

    fn sorted(list: &[DisplayMode]) -> Vec<DisplayMode> {
        let mut modes = Vec::new();
        for m in list {
            insert_mode(&mut modes, m.clone());
        }
        modes
    }

    #[test]
    fn it_should_keep_modes_sorted_and_unique() {
        let modes = sorted(&[
            mode(640, 480, 60),
            mode(1280, 720, 30),
            mode(1920, 1080, 60),
            mode(1280, 720, 60),
            mode(640, 480, 60),
            DisplayMode::new(PixelFormat::RGB565, 1280, 720, 60),
        ]);
        assert_eq!(modes.len(), 5);
        for pair in modes.windows(2) {
            assert_ne!(cmp_modes(&pair[0], &pair[1]), Ordering::Greater);
        }
        assert_eq!(modes[0], mode(1920, 1080, 60));
        assert_eq!(modes[1], mode(1280, 720, 60));
        assert_eq!(modes[2], mode(1280, 720, 30));
        assert_eq!(modes[3].format, PixelFormat::RGB565);
    }

    #[test]
    fn it_should_treat_distinct_driver_data_as_distinct_modes() {
        let a = mode(640, 480, 60).with_driver_data(ModeData::new(1u8));
        let b = mode(640, 480, 60).with_driver_data(ModeData::new(1u8));
        let mut modes = Vec::new();
        assert!(insert_mode(&mut modes, a.clone()));
        assert!(!insert_mode(&mut modes, a));
        assert!(insert_mode(&mut modes, b));
    }

    #[test]
    fn it_should_default_to_the_desktop_refresh_rate() {
        let modes = sorted(&[mode(1920, 1080, 60), mode(1280, 720, 60), mode(1280, 720, 30)]);
        let desktop = mode(1280, 720, 60);
        let request = DisplayMode::new(PixelFormat::UNKNOWN, 1280, 720, 0);
        let closest = closest_display_mode(&modes, &request, &desktop).unwrap();
        assert_eq!(closest, mode(1280, 720, 60));
    }

    #[test]
    fn it_should_pick_the_smallest_mode_for_an_unsized_request() {
        let modes = sorted(&[mode(1920, 1080, 60), mode(1280, 720, 60), mode(1280, 720, 30)]);
        let desktop = mode(1280, 720, 60);
        let closest =
            closest_display_mode(&modes, &DisplayMode::default(), &desktop).unwrap();
        assert_eq!(closest, mode(1280, 720, 60));
    }

    #[test]
    fn it_should_round_up_to_the_next_larger_mode() {
        let modes = sorted(&[mode(1920, 1080, 60), mode(1280, 720, 60), mode(640, 480, 60)]);
        let desktop = mode(1920, 1080, 60);
        let request = DisplayMode::new(PixelFormat::UNKNOWN, 800, 600, 0);
        let closest = closest_display_mode(&modes, &request, &desktop).unwrap();
        assert_eq!((closest.w, closest.h), (1280, 720));
    }

    #[test]
    fn it_should_accept_a_taller_mode_of_a_different_aspect() {
        let modes = sorted(&[mode(1600, 900, 60), mode(1280, 1024, 60)]);
        let desktop = mode(1600, 900, 60);
        let request = DisplayMode::new(PixelFormat::UNKNOWN, 1024, 1000, 0);
        let closest = closest_display_mode(&modes, &request, &desktop).unwrap();
        assert_eq!((closest.w, closest.h), (1280, 1024));
    }

    #[test]
    fn it_should_fail_when_nothing_is_large_enough() {
        let modes = sorted(&[mode(1280, 720, 60), mode(640, 480, 60)]);
        let request = DisplayMode::new(PixelFormat::UNKNOWN, 2560, 1440, 0);
        assert_eq!(closest_display_mode(&modes, &request, &modes[0]), None);
    }

    #[test]
    fn it_should_prefer_the_target_format_among_equal_sizes() {
        let modes = sorted(&[
            mode(640, 480, 60),
            DisplayMode::new(PixelFormat::RGB565, 640, 480, 60),
        ]);
        let desktop = mode(640, 480, 60);
        let request = DisplayMode::new(PixelFormat::RGB565, 640, 480, 0);
        let closest = closest_display_mode(&modes, &request, &desktop).unwrap();
        assert_eq!(closest.format, PixelFormat::RGB565);
    }

    #[test]
    fn it_should_back_fill_unset_fields_with_defaults() {
        let modes = vec![DisplayMode::new(PixelFormat::UNKNOWN, 0, 0, 0)];
        let closest =
            closest_display_mode(&modes, &DisplayMode::default(), &DisplayMode::default())
                .unwrap();
        assert_eq!(closest.format, PixelFormat::RGB888);
        assert_eq!((closest.w, closest.h), (640, 480));
    }
}
