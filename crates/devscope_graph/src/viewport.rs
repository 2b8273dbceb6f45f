//! Pan and zoom for the graph surface.
//!
//! Pointer coordinates are in view space (relative to the drawing surface).
//! Content is drawn as `view = content * scale + translate`.

use devscope_core::{Scheduler, TimerId};
use indexmap::IndexMap;
use tracing::trace;

use crate::layout::Point;

pub const MIN_SCALE: f32 = 0.3;
pub const MAX_SCALE: f32 = 3.0;
/// Wheel delta to zoom exponent.
pub const WHEEL_ZOOM_RATE: f32 = 0.002;
/// Zoom step of the zoom in/out buttons.
pub const BUTTON_ZOOM_FACTOR: f32 = 1.2;
/// Pan distance (px) after which a press counts as a drag.
pub const DRAG_THRESHOLD: f32 = 3.0;

pub type PointerId = u64;

pub fn clamp_scale(scale: f32) -> f32 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl ViewTransform {
    /// Content point drawn at `view`.
    pub fn to_content(&self, view: Point) -> Point {
        Point::new(
            (view.x - self.translate_x) / self.scale,
            (view.y - self.translate_y) / self.scale,
        )
    }

    /// View point where `content` is drawn.
    pub fn to_view(&self, content: Point) -> Point {
        Point::new(
            content.x * self.scale + self.translate_x,
            content.y * self.scale + self.translate_y,
        )
    }

    /// SVG `transform` attribute value.
    pub fn to_svg(&self) -> String {
        format!(
            "translate({}, {}) scale({})",
            self.translate_x, self.translate_y, self.scale
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewportState {
    Idle,
    Panning,
    Pinching,
}

/// Keyboard modifiers held during an input event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::default()
        }
    }

    pub fn meta() -> Self {
        Self {
            meta: true,
            ..Self::default()
        }
    }

    /// Wheel events zoom only with ctrl or cmd held.
    pub fn zooms(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Clone, Copy, Debug)]
struct PanStart {
    origin: Point,
    translate_x: f32,
    translate_y: f32,
}

#[derive(Clone, Copy, Debug)]
struct PinchStart {
    distance: f32,
    scale: f32,
    content_mid: Point,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ViewportTask {
    ClearDrag,
}

/// Pan, pinch and wheel/button zoom.
///
/// After a pan that moved further than [`DRAG_THRESHOLD`] the controller
/// reports [`should_suppress_click`](Self::should_suppress_click) until the
/// tick after the last pointer is released, so the click that ends a drag
/// does not toggle a node.
#[derive(Debug)]
pub struct ViewportController {
    transform: ViewTransform,
    pointers: IndexMap<PointerId, Point>,
    pan: Option<PanStart>,
    pinch: Option<PinchStart>,
    dragging: bool,
    scheduler: Scheduler<ViewportTask>,
    /// The single pending drag reset, if any.
    clear_drag: Option<TimerId>,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportController {
    pub fn new() -> Self {
        Self {
            transform: ViewTransform::default(),
            pointers: IndexMap::new(),
            pan: None,
            pinch: None,
            dragging: false,
            scheduler: Scheduler::new(),
            clear_drag: None,
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn state(&self) -> ViewportState {
        if self.pinch.is_some() {
            ViewportState::Pinching
        } else if self.pan.is_some() {
            ViewportState::Panning
        } else {
            ViewportState::Idle
        }
    }

    pub fn active_pointers(&self) -> usize {
        self.pointers.len()
    }

    /// Scale by `factor` keeping the content under `point` in place.
    ///
    /// Returns `false` when the clamped scale did not change.
    pub fn zoom_at(&mut self, point: Point, factor: f32) -> bool {
        let current = self.transform.scale;
        let scale = clamp_scale(current * factor);
        if scale == current {
            return false;
        }
        let content = self.transform.to_content(point);
        self.transform = ViewTransform {
            scale,
            translate_x: point.x - scale * content.x,
            translate_y: point.y - scale * content.y,
        };
        true
    }

    /// Wheel event. Zooms about `point` when ctrl or cmd is held and returns
    /// whether the event was consumed.
    pub fn wheel(&mut self, point: Point, delta_y: f32, modifiers: Modifiers) -> bool {
        if !modifiers.zooms() {
            return false;
        }
        self.zoom_at(point, (-delta_y * WHEEL_ZOOM_RATE).exp());
        true
    }

    /// Zoom in one step about the center of a `view` sized surface.
    pub fn zoom_in(&mut self, view: (f32, f32)) -> bool {
        self.zoom_at(Point::new(view.0 / 2.0, view.1 / 2.0), BUTTON_ZOOM_FACTOR)
    }

    pub fn zoom_out(&mut self, view: (f32, f32)) -> bool {
        self.zoom_at(Point::new(view.0 / 2.0, view.1 / 2.0), 1.0 / BUTTON_ZOOM_FACTOR)
    }

    pub fn reset_view(&mut self) {
        self.transform = ViewTransform::default();
    }

    /// Pointer pressed. A single press on the background starts a pan; a
    /// second pointer starts a pinch and ends any pan.
    pub fn pointer_down(&mut self, id: PointerId, point: Point, on_background: bool) {
        self.pointers.insert(id, point);
        self.dragging = false;

        if self.pointers.len() == 2 {
            if let Some((a, b)) = self.pinch_points() {
                self.pinch = Some(PinchStart {
                    distance: a.distance(b),
                    scale: self.transform.scale,
                    content_mid: self.transform.to_content(a.midpoint(b)),
                });
                self.pan = None;
                trace!("pinch started");
            }
            return;
        }

        if self.pointers.len() == 1 && on_background {
            self.pan = Some(PanStart {
                origin: point,
                translate_x: self.transform.translate_x,
                translate_y: self.transform.translate_y,
            });
        }
    }

    /// Pointer moved. Returns whether the transform changed.
    pub fn pointer_move(&mut self, id: PointerId, point: Point) -> bool {
        let Some(slot) = self.pointers.get_mut(&id) else {
            return false;
        };
        *slot = point;

        if let Some(start) = self.pinch {
            let Some((a, b)) = self.pinch_points() else {
                return false;
            };
            let scale = if start.distance > 0.0 {
                clamp_scale(start.scale * a.distance(b) / start.distance)
            } else {
                start.scale
            };
            let mid = a.midpoint(b);
            self.transform = ViewTransform {
                scale,
                translate_x: mid.x - scale * start.content_mid.x,
                translate_y: mid.y - scale * start.content_mid.y,
            };
            return true;
        }

        if let Some(start) = self.pan {
            let dx = point.x - start.origin.x;
            let dy = point.y - start.origin.y;
            if dx.hypot(dy) > DRAG_THRESHOLD {
                self.dragging = true;
            }
            self.transform.translate_x = start.translate_x + dx;
            self.transform.translate_y = start.translate_y + dy;
            return true;
        }

        false
    }

    /// Pointer released, cancelled or left the surface.
    pub fn pointer_up(&mut self, id: PointerId) {
        self.pointers.shift_remove(&id);
        if self.pointers.len() < 2 {
            self.pinch = None;
        }
        if self.pointers.is_empty() {
            self.pan = None;
            if let Some(pending) = self.clear_drag.take() {
                self.scheduler.cancel(pending);
            }
            self.clear_drag = Some(self.scheduler.post(ViewportTask::ClearDrag));
        }
    }

    /// Number of deferred tasks waiting for the next tick.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending_count()
    }

    fn pinch_points(&self) -> Option<(Point, Point)> {
        let mut points = self.pointers.values().copied();
        Some((points.next()?, points.next()?))
    }

    /// Whether a click should be ignored because it ends a drag.
    pub fn should_suppress_click(&self) -> bool {
        self.dragging
    }

    /// Run work deferred to the next tick.
    pub fn tick(&mut self) {
        self.advance(0);
    }

    pub fn advance(&mut self, elapsed_ms: u64) {
        let deadline = self.scheduler.now().saturating_add(elapsed_ms);
        while let Some((_, task)) = self.scheduler.next_due(deadline) {
            match task {
                ViewportTask::ClearDrag => {
                    self.clear_drag = None;
                    self.dragging = false;
                }
            }
        }
        self.scheduler.settle(deadline);
    }
}
