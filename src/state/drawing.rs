// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing interaction: pointer gestures to zones.
//!
//! `Idle -> Dragging -> Committing -> Idle`. A press records the anchor,
//! moves redraw a dashed preview, the release normalizes the rectangle and
//! asks for a label, and the label commits the zone to the store.

use super::zones::ZoneStore;
use super::{Effect, Notice};
use crate::error::NoActiveSourceError;
use crate::models::source::{DrawingSurface, SourceKind};
use crate::models::zone::Zone;
use crate::util::geometry::{map_to_native, DisplaySize, NativePoint, NativeRect};

/// A pointer position relative to the rendered box, with the box size at
/// the time of the event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub offset_x: f32,
    pub offset_y: f32,
    pub rendered: DisplaySize,
}

impl PointerSample {
    pub fn new(offset_x: f32, offset_y: f32, rendered: DisplaySize) -> Self {
        Self {
            offset_x,
            offset_y,
            rendered,
        }
    }

    fn to_native(self, surface: &DrawingSurface) -> NativePoint {
        map_to_native(self.offset_x, self.offset_y, self.rendered, surface.buffer)
    }
}

/// Ephemeral state of one gesture, from press to release.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingSession {
    pub anchor: NativePoint,
    pub target: SourceKind,
    pub source_id: String,
}

impl DrawingSession {
    fn targets(&self, surface: &DrawingSurface) -> bool {
        self.target == surface.kind && self.source_id == surface.source_id
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DrawingState {
    #[default]
    Idle,
    Dragging {
        session: DrawingSession,
        current: NativePoint,
    },
    Committing {
        rect: NativeRect,
        source_id: String,
    },
}

#[derive(Debug, Default)]
pub struct DrawingMachine {
    state: DrawingState,
}

impl DrawingMachine {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    pub fn is_committing(&self) -> bool {
        matches!(self.state, DrawingState::Committing { .. })
    }

    /// Rectangle to draw on top of the committed zones, if any.
    pub fn preview_rect(&self) -> Option<NativeRect> {
        match &self.state {
            DrawingState::Idle => None,
            DrawingState::Dragging { session, current } => Some(NativeRect::from_corners(session.anchor, *current)),
            DrawingState::Committing { rect, .. } => Some(*rect),
        }
    }

    /// Drop any gesture in progress.
    pub fn reset(&mut self) {
        if self.state != DrawingState::Idle {
            log::debug!("Drawing gesture abandoned");
        }
        self.state = DrawingState::Idle;
    }

    pub fn pointer_down(
        &mut self,
        sample: PointerSample,
        surface: Option<&DrawingSurface>,
    ) -> Result<Vec<Effect>, NoActiveSourceError> {
        let surface = surface.ok_or(NoActiveSourceError)?;
        if self.state != DrawingState::Idle {
            return Ok(Vec::new());
        }
        let anchor = sample.to_native(surface);
        log::debug!("Drag started at ({:.1}, {:.1})", anchor.x, anchor.y);
        self.state = DrawingState::Dragging {
            session: DrawingSession {
                anchor,
                target: surface.kind,
                source_id: surface.source_id.clone(),
            },
            current: anchor,
        };
        Ok(vec![Effect::Render])
    }

    pub fn pointer_move(&mut self, sample: PointerSample, surface: Option<&DrawingSurface>) -> Vec<Effect> {
        let DrawingState::Dragging { session, current } = &mut self.state else {
            return Vec::new();
        };
        match surface {
            Some(surface) if session.targets(surface) => {
                *current = sample.to_native(surface);
                vec![Effect::Render]
            }
            _ => {
                self.reset();
                vec![Effect::Render]
            }
        }
    }

    pub fn pointer_up(&mut self, sample: PointerSample, surface: Option<&DrawingSurface>) -> Vec<Effect> {
        let DrawingState::Dragging { session, .. } = &self.state else {
            return Vec::new();
        };
        let surface = match surface {
            Some(surface) if session.targets(surface) => surface,
            _ => {
                self.reset();
                return vec![Effect::Render];
            }
        };
        let end = sample.to_native(surface);
        let rect = NativeRect::from_corners(session.anchor, end).rounded();
        if rect.is_degenerate() {
            self.reset();
            return vec![
                Effect::Render,
                Effect::Notify(Notice::Info("Zone too small: drag to draw a rectangle.".into())),
            ];
        }
        self.state = DrawingState::Committing {
            rect,
            source_id: session.source_id.clone(),
        };
        vec![Effect::Render, Effect::PromptLabel]
    }

    /// Commit the pending rectangle under `label`. An empty label cancels;
    /// a label already in use asks again.
    pub fn label_provided(&mut self, label: &str, store: &mut ZoneStore) -> Vec<Effect> {
        let DrawingState::Committing { rect, source_id } = &self.state else {
            return Vec::new();
        };
        let label = label.trim();
        if label.is_empty() {
            return self.label_cancelled();
        }
        if store.contains_label(label) {
            return vec![
                Effect::Notify(Notice::Info(format!("A zone named '{}' already exists.", label))),
                Effect::PromptLabel,
            ];
        }
        let zone = Zone::from_rect(label.to_string(), rect, source_id.clone());
        self.state = DrawingState::Idle;
        let request = store.create(zone);
        vec![Effect::Render, Effect::Request(request)]
    }

    pub fn label_cancelled(&mut self) -> Vec<Effect> {
        if !self.is_committing() {
            return Vec::new();
        }
        self.state = DrawingState::Idle;
        vec![Effect::Render]
    }
}
