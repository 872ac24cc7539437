//! Device/logical coordinate mapping.
//!
//! The core plots in oversampled device units measured against the canvas
//! height `ymax`; the renderer works in logical pixels with the Y axis flipped.
//! Both directions live here so the factor can never drift apart.

use serde::Serialize;

/// Device units per logical pixel.
pub const OVERSAMPLING: i32 = 10;
const OVERSAMPLING_F: f64 = OVERSAMPLING as f64;

/// Floating logical point, as sent for line work.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

/// Integer logical point, as sent for text and blits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Logical size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

/// Logical rectangle (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Map device coordinates to floating logical coordinates.
pub fn term_coord_f(x: u32, y: u32, ymax: u32) -> PointF {
    PointF {
        x: f64::from(x) / OVERSAMPLING_F,
        y: (i64::from(ymax) - i64::from(y)) as f64 / OVERSAMPLING_F,
    }
}

/// Map device coordinates to logical coordinates snapped to the nearest pixel.
pub fn term_coord(x: u32, y: u32, ymax: u32) -> Point {
    let p = term_coord_f(x, y, ymax);
    Point {
        x: round_to_i32(p.x),
        y: round_to_i32(p.y),
    }
}

/// Scale a device extent down to logical pixels.
pub fn descale_size(width: u32, height: u32) -> Size {
    Size {
        width: round_to_i32(f64::from(width) / OVERSAMPLING_F),
        height: round_to_i32(f64::from(height) / OVERSAMPLING_F),
    }
}

/// Map a renderer-reported logical position back into device space.
///
/// `height` is the logical window height the renderer is drawing into.
pub fn to_device(mx: i32, my: i32, height: i32) -> (i32, i32) {
    (
        mx.saturating_mul(OVERSAMPLING),
        height.saturating_sub(my).saturating_mul(OVERSAMPLING),
    )
}

fn round_to_i32(value: f64) -> i32 {
    value.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}
