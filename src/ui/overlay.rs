// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Zone overlay rendering.
//!
//! `render_zones` is the only code that draws zones. It clears the target
//! and draws every zone (and the rectangle being dragged, if any) from its
//! inputs alone, so drawing the same inputs twice gives the same picture.
//! Targets work in native pixels; the egui target scales to the screen.

use crate::models::zone::Zone;
use crate::util::geometry::{native_to_display, DisplaySize, NativePoint, NativeRect, NativeSize};

pub const ZONE_COLOR: [u8; 4] = [255, 0, 0, 255];
pub const LINE_WIDTH: f32 = 2.0;
/// Label position relative to the zone's top-left corner (text baseline).
pub const LABEL_OFFSET: (f64, f64) = (5.0, 20.0);
pub const LABEL_SIZE: f32 = 16.0;
const DASH: f32 = 5.0;

/// Outline style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: [u8; 4],
    pub width: f32,
    pub dashed: bool,
}

impl Stroke {
    pub const ZONE: Stroke = Stroke {
        color: ZONE_COLOR,
        width: LINE_WIDTH,
        dashed: false,
    };

    pub const PREVIEW: Stroke = Stroke {
        color: ZONE_COLOR,
        width: LINE_WIDTH,
        dashed: true,
    };
}

/// A surface zones can be drawn on, addressed in native pixels.
pub trait RenderTarget {
    fn clear(&mut self);

    fn stroke_rect(&mut self, rect: &NativeRect, stroke: Stroke);

    /// Draw `text` with its baseline starting at `(x, y)`.
    fn fill_text(&mut self, x: f64, y: f64, text: &str, size: f32, color: [u8; 4]);
}

/// Clear `target` and draw `zones` in order, then the in-progress
/// rectangle dashed on top.
pub fn render_zones<T: RenderTarget + ?Sized>(target: &mut T, zones: &[Zone], preview: Option<&NativeRect>) {
    target.clear();
    for zone in zones {
        target.stroke_rect(&zone.rect(), Stroke::ZONE);
        target.fill_text(
            zone.top_left_x as f64 + LABEL_OFFSET.0,
            zone.top_left_y as f64 + LABEL_OFFSET.1,
            &zone.label,
            LABEL_SIZE,
            ZONE_COLOR,
        );
    }
    if let Some(rect) = preview {
        target.stroke_rect(rect, Stroke::PREVIEW);
    }
}

fn color32(color: [u8; 4]) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color[0], color[1], color[2], color[3])
}

/// Draws onto an egui painter, mapping native pixels into `rect`.
pub struct PainterTarget<'a> {
    painter: &'a egui::Painter,
    rect: egui::Rect,
    native: NativeSize,
}

impl<'a> PainterTarget<'a> {
    pub fn new(painter: &'a egui::Painter, rect: egui::Rect, native: NativeSize) -> Self {
        Self { painter, rect, native }
    }

    fn to_screen(&self, x: f64, y: f64) -> egui::Pos2 {
        let rendered = DisplaySize::new(self.rect.width(), self.rect.height());
        let (dx, dy) = native_to_display(NativePoint::new(x, y), rendered, self.native);
        self.rect.min + egui::vec2(dx, dy)
    }

    fn scale(&self) -> f32 {
        if self.native.height == 0 {
            1.0
        } else {
            self.rect.height() / self.native.height as f32
        }
    }
}

impl RenderTarget for PainterTarget<'_> {
    fn clear(&mut self) {
        // egui rebuilds the frame every pass; nothing to erase.
    }

    fn stroke_rect(&mut self, rect: &NativeRect, stroke: Stroke) {
        let min = self.to_screen(rect.left, rect.top);
        let max = self.to_screen(rect.right, rect.bottom);
        let egui_stroke = egui::Stroke::new(stroke.width, color32(stroke.color));
        if stroke.dashed {
            let path = [
                min,
                egui::pos2(max.x, min.y),
                max,
                egui::pos2(min.x, max.y),
                min,
            ];
            self.painter
                .extend(egui::Shape::dashed_line(&path, egui_stroke, DASH, DASH));
        } else {
            self.painter
                .rect_stroke(egui::Rect::from_min_max(min, max), 0.0, egui_stroke);
        }
    }

    fn fill_text(&mut self, x: f64, y: f64, text: &str, size: f32, color: [u8; 4]) {
        let pos = self.to_screen(x, y);
        let font = egui::FontId::proportional((size * self.scale()).max(8.0));
        self.painter
            .text(pos, egui::Align2::LEFT_BOTTOM, text, font, color32(color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Clear,
        Rect(NativeRect, Stroke),
        Text(f64, f64, String),
    }

    #[derive(Default)]
    struct Recording {
        ops: Vec<Op>,
    }

    impl RenderTarget for Recording {
        fn clear(&mut self) {
            self.ops.clear();
            self.ops.push(Op::Clear);
        }

        fn stroke_rect(&mut self, rect: &NativeRect, stroke: Stroke) {
            self.ops.push(Op::Rect(*rect, stroke));
        }

        fn fill_text(&mut self, x: f64, y: f64, text: &str, _size: f32, _color: [u8; 4]) {
            self.ops.push(Op::Text(x, y, text.to_string()));
        }
    }

    /// Pixel target: outlines are drawn, each label is a solid block per
    /// character.
    struct Raster {
        image: RgbaImage,
    }

    impl Raster {
        fn put(&mut self, x: i64, y: i64, color: [u8; 4]) {
            if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
                self.image.put_pixel(x as u32, y as u32, Rgba(color));
            }
        }
    }

    impl RenderTarget for Raster {
        fn clear(&mut self) {
            for p in self.image.pixels_mut() {
                *p = Rgba([0, 0, 0, 0]);
            }
        }

        fn stroke_rect(&mut self, rect: &NativeRect, stroke: Stroke) {
            let (l, t, r, b) = (rect.left as i64, rect.top as i64, rect.right as i64, rect.bottom as i64);
            for x in l..=r {
                if !stroke.dashed || (x - l) % 10 < 5 {
                    self.put(x, t, stroke.color);
                    self.put(x, b, stroke.color);
                }
            }
            for y in t..=b {
                if !stroke.dashed || (y - t) % 10 < 5 {
                    self.put(l, y, stroke.color);
                    self.put(r, y, stroke.color);
                }
            }
        }

        fn fill_text(&mut self, x: f64, y: f64, text: &str, _size: f32, color: [u8; 4]) {
            for (i, _) in text.chars().enumerate() {
                for dx in 0..3 {
                    for dy in 0..4 {
                        self.put(x as i64 + i as i64 * 4 + dx, y as i64 - dy, color);
                    }
                }
            }
        }
    }

    fn zone(label: &str, l: u32, t: u32, r: u32, b: u32) -> Zone {
        Zone {
            label: label.into(),
            top_left_x: l,
            top_left_y: t,
            bottom_right_x: r,
            bottom_right_y: b,
            source_id: String::new(),
        }
    }

    #[test]
    fn test_render_order_and_label_offset() {
        let zones = vec![zone("A", 10, 10, 50, 60), zone("B", 70, 5, 90, 30)];
        let mut target = Recording::default();
        render_zones(&mut target, &zones, None);

        assert_eq!(target.ops.len(), 5);
        assert_eq!(target.ops[0], Op::Clear);
        assert_eq!(target.ops[1], Op::Rect(zones[0].rect(), Stroke::ZONE));
        assert_eq!(target.ops[2], Op::Text(15.0, 30.0, "A".into()));
        assert_eq!(target.ops[4], Op::Text(75.0, 25.0, "B".into()));
    }

    #[test]
    fn test_preview_is_drawn_dashed_last() {
        let zones = vec![zone("A", 10, 10, 50, 60)];
        let preview = NativeRect {
            left: 1.0,
            top: 2.0,
            right: 3.0,
            bottom: 4.0,
        };
        let mut target = Recording::default();
        render_zones(&mut target, &zones, Some(&preview));
        assert_eq!(target.ops.last(), Some(&Op::Rect(preview, Stroke::PREVIEW)));
    }

    #[test]
    fn test_rendering_twice_gives_identical_pixels() {
        let zones = vec![zone("Gate", 4, 4, 60, 40), zone("Exit", 30, 20, 90, 70)];
        let mut raster = Raster {
            image: RgbaImage::new(100, 80),
        };

        render_zones(&mut raster, &zones, None);
        let first = raster.image.clone();
        render_zones(&mut raster, &zones, None);
        assert_eq!(first, raster.image);

        // A preview frame in between leaves no trace once it is gone.
        let preview = NativeRect {
            left: 10.0,
            top: 10.0,
            right: 80.0,
            bottom: 70.0,
        };
        render_zones(&mut raster, &zones, Some(&preview));
        assert_ne!(first, raster.image);
        render_zones(&mut raster, &zones, None);
        assert_eq!(first, raster.image);
    }
}
