// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! Zone geometry lives in the native pixel space of the active source.
//! The on-screen box the source is rendered into is a separate space whose
//! size can change at any time, so the display-to-native scale is derived
//! from the sizes passed in on every call and never cached.

use serde::{Deserialize, Serialize};

/// Intrinsic pixel dimensions of a source (the drawing buffer size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSize {
    pub width: u32,
    pub height: u32,
}

impl NativeSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Size of the rendered (on-screen) box, in display points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f32,
    pub height: f32,
}

impl DisplaySize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A point in native pixel coordinates, before rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativePoint {
    pub x: f64,
    pub y: f64,
}

impl NativePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in native pixels with `left <= right` and
/// `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl NativeRect {
    /// Build a rectangle spanning two corners given in any order.
    pub fn from_corners(a: NativePoint, b: NativePoint) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Snap every edge to the nearest whole pixel.
    pub fn rounded(&self) -> Self {
        Self {
            left: self.left.round(),
            top: self.top.round(),
            right: self.right.round(),
            bottom: self.bottom.round(),
        }
    }

    /// True when the rectangle covers no pixels at all.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

fn scale(native: u32, rendered: f32) -> f64 {
    if rendered > 0.0 {
        native as f64 / rendered as f64
    } else {
        0.0
    }
}

/// Convert a pointer offset inside the rendered box into native pixels.
///
/// `offset_x`/`offset_y` are relative to the rendered box's top-left corner.
/// The result is clamped into the native buffer, so a drag that leaves the
/// box still lands on its edge.
pub fn map_to_native(
    offset_x: f32,
    offset_y: f32,
    rendered: DisplaySize,
    native: NativeSize,
) -> NativePoint {
    let x = offset_x as f64 * scale(native.width, rendered.width);
    let y = offset_y as f64 * scale(native.height, rendered.height);
    NativePoint {
        x: x.clamp(0.0, native.width as f64),
        y: y.clamp(0.0, native.height as f64),
    }
}

/// Convert a native pixel coordinate back into an offset inside the
/// rendered box.
pub fn native_to_display(point: NativePoint, rendered: DisplaySize, native: NativeSize) -> (f32, f32) {
    let sx = scale(native.width, rendered.width);
    let sy = scale(native.height, rendered.height);
    let x = if sx > 0.0 { point.x / sx } else { 0.0 };
    let y = if sy > 0.0 { point.y / sy } else { 0.0 };
    (x as f32, y as f32)
}

/// Display box for a source: native size, capped at `max_width` with the
/// aspect ratio preserved.
pub fn constrained_display_size(native: NativeSize, max_width: f32) -> DisplaySize {
    let width = native.width as f32;
    let height = native.height as f32;
    if width > max_width && height > 0.0 {
        let ratio = width / height;
        DisplaySize::new(max_width, max_width / ratio)
    } else {
        DisplaySize::new(width, height)
    }
}

/// Largest box with the same aspect ratio as `wanted` that fits in
/// `available`.
pub fn fit_within(wanted: DisplaySize, available: DisplaySize) -> DisplaySize {
    if wanted.width <= 0.0 || wanted.height <= 0.0 {
        return wanted;
    }
    let factor = (available.width / wanted.width)
        .min(available.height / wanted.height)
        .min(1.0)
        .max(0.0);
    DisplaySize::new(wanted.width * factor, wanted.height * factor)
}
