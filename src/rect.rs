// src/rect.rs

//! Integer rectangles, rectangle intersection and line clipping.

/// An axis-aligned rectangle. Empty when `w <= 0` or `h <= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

/// An integer point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

const CODE_BOTTOM: u8 = 1;
const CODE_TOP: u8 = 2;
const CODE_LEFT: u8 = 4;
const CODE_RIGHT: u8 = 8;

/// `a + delta * num / den`, truncating toward zero.
fn lerp(a: i64, delta: i64, num: i64, den: i64) -> i64 {
    a + (delta as i128 * num as i128 / den as i128) as i64
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// The rectangle at the origin covering `w`x`h`.
    pub const fn sized(w: i32, h: i32) -> Self {
        Self { x: 0, y: 0, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// One past the right edge, widened so extreme rects can't overflow.
    fn right(&self) -> i64 {
        self.x as i64 + self.w as i64
    }

    fn bottom(&self) -> i64 {
        self.y as i64 + self.h as i64
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && (p.x as i64) < self.right() && p.y >= self.y && (p.y as i64) < self.bottom()
    }

    /// Whether `other` is non-empty and lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        !other.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Intersection of `self` and `other`, or `None` if it is empty.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        // Both extents are bounded by the narrower input, so they fit in i32.
        let w = self.right().min(other.right()) - x as i64;
        let h = self.bottom().min(other.bottom()) - y as i64;
        if w <= 0 || h <= 0 {
            return None;
        }
        Some(Rect::new(x, y, w as i32, h as i32))
    }

    /// Clips the segment `a`..`b` against this rectangle.
    ///
    /// Returns the clipped endpoints, or `None` when no part of the segment
    /// lies inside. Horizontal and vertical segments are clamped directly;
    /// everything else goes through Cohen-Sutherland with integer division.
    pub fn clip_line(&self, a: Point, b: Point) -> Option<(Point, Point)> {
        if self.is_empty() {
            return None;
        }
        let (mut x1, mut y1, mut x2, mut y2) = (a.x as i64, a.y as i64, b.x as i64, b.y as i64);
        let (rx1, ry1) = (self.x as i64, self.y as i64);
        let (rx2, ry2) = (self.right() - 1, self.bottom() - 1);

        let inside = |x: i64, y: i64| x >= rx1 && x <= rx2 && y >= ry1 && y <= ry2;
        if inside(x1, y1) && inside(x2, y2) {
            return Some((a, b));
        }

        if (x1 < rx1 && x2 < rx1)
            || (x1 > rx2 && x2 > rx2)
            || (y1 < ry1 && y2 < ry1)
            || (y1 > ry2 && y2 > ry2)
        {
            return None;
        }

        let point = |x: i64, y: i64| Point::new(x as i32, y as i32);

        if y1 == y2 {
            return Some((point(x1.clamp(rx1, rx2), y1), point(x2.clamp(rx1, rx2), y2)));
        }

        if x1 == x2 {
            return Some((point(x1, y1.clamp(ry1, ry2)), point(x2, y2.clamp(ry1, ry2))));
        }

        let out_code = |x: i64, y: i64| -> u8 {
            let mut code = 0;
            if y < ry1 {
                code |= CODE_TOP;
            } else if y > ry2 {
                code |= CODE_BOTTOM;
            }
            if x < rx1 {
                code |= CODE_LEFT;
            } else if x > rx2 {
                code |= CODE_RIGHT;
            }
            code
        };

        // Interpolated coordinates stay between the endpoints, so they fit
        // back into i32; only the intermediate product needs i128.
        let mut code1 = out_code(x1, y1);
        let mut code2 = out_code(x2, y2);
        while code1 != 0 || code2 != 0 {
            if code1 & code2 != 0 {
                return None;
            }
            let code = if code1 != 0 { code1 } else { code2 };
            let (x, y) = if code & CODE_TOP != 0 {
                (lerp(x1, x2 - x1, ry1 - y1, y2 - y1), ry1)
            } else if code & CODE_BOTTOM != 0 {
                (lerp(x1, x2 - x1, ry2 - y1, y2 - y1), ry2)
            } else if code & CODE_LEFT != 0 {
                (rx1, lerp(y1, y2 - y1, rx1 - x1, x2 - x1))
            } else {
                (rx2, lerp(y1, y2 - y1, rx2 - x1, x2 - x1))
            };
            if code1 != 0 {
                x1 = x;
                y1 = y;
                code1 = out_code(x, y);
            } else {
                x2 = x;
                y2 = y;
                code2 = out_code(x, y);
            }
        }
        Some((point(x1, y1), point(x2, y2)))
    }
}
