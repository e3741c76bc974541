//! View transform for the schema canvas
//!
//! The camera looks at a world point (`center`) with a scale factor (`zoom`).
//! Controls only move the goals; `update(dt)` eases the visible values
//! toward them, so transforms should be read after the frame's update.

use egui::{Pos2, Rect, Vec2};

use super::animation::{Spring, SpringConfig};
use crate::config::InteractionConfig;

#[derive(Debug, Clone)]
pub struct Camera2D {
    /// World point at the middle of the canvas, stored as an offset from the origin.
    center: Spring<Vec2>,
    zoom: Spring<f32>,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::new(&InteractionConfig::default())
    }
}

impl Camera2D {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            center: Spring::new(Vec2::ZERO, SpringConfig::MEDIUM),
            zoom: Spring::new(1.0, SpringConfig::MEDIUM),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        }
    }

    pub fn center(&self) -> Pos2 {
        self.center.value().to_pos2()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom.value()
    }

    pub fn target_zoom(&self) -> f32 {
        self.zoom.goal()
    }

    pub fn update(&mut self, dt: f32) {
        self.center.advance(dt);
        self.zoom.advance(dt);
    }

    pub fn snap_to_target(&mut self) {
        self.center.settle();
        self.zoom.settle();
    }

    pub fn is_animating(&self) -> bool {
        self.center.is_moving() || self.zoom.is_moving()
    }

    fn clamp_zoom(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    // =========================================================================
    // CONTROLS
    // =========================================================================

    /// Drag the canvas by a screen delta; the content follows the pointer.
    pub fn pan(&mut self, screen_delta: Vec2) {
        let goal = self.center.goal() - screen_delta / self.zoom.value();
        self.center.aim(goal);
    }

    pub fn pan_to(&mut self, world: Pos2) {
        self.center.aim(world.to_vec2());
    }

    /// Scale by `factor` around `anchor`: the world point under the anchor
    /// stays under it once the camera settles.
    pub fn zoom_at(&mut self, factor: f32, anchor: Pos2, screen_rect: Rect) {
        let from = self.zoom.goal();
        let to = self.clamp_zoom(from * factor);
        if (to - from).abs() <= 1e-3 {
            return;
        }

        let lever = anchor - screen_rect.center();
        let shift = lever / from - lever / to;
        self.center.aim(self.center.goal() + shift);
        self.zoom.aim(to);
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        let zoom = self.clamp_zoom(zoom);
        self.zoom.aim(zoom);
    }

    /// Centre `bounds` and pick the largest zoom that shows all of it
    /// inside `screen_rect` less `padding`.
    pub fn fit_to_bounds(&mut self, bounds: Rect, screen_rect: Rect, padding: f32) {
        if bounds.is_negative() {
            return;
        }

        let room = screen_rect.shrink(padding).size();
        let extent = bounds.size().max(Vec2::splat(1.0));
        let zoom = self.clamp_zoom((room.x / extent.x).min(room.y / extent.y));

        tracing::trace!(?bounds, zoom, "fit view to graph");
        self.center.aim(bounds.center().to_vec2());
        self.zoom.aim(zoom);
    }

    pub fn reset(&mut self) {
        self.center.aim(Vec2::ZERO);
        self.zoom.aim(1.0);
    }

    // =========================================================================
    // TRANSFORMS
    // =========================================================================

    pub fn world_to_screen(&self, world: Pos2, screen_rect: Rect) -> Pos2 {
        screen_rect.center() + (world - self.center()) * self.zoom()
    }

    pub fn screen_to_world(&self, screen: Pos2, screen_rect: Rect) -> Pos2 {
        self.center() + (screen - screen_rect.center()) / self.zoom()
    }
}
