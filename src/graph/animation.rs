//! Critically damped springs for view transitions
//!
//! A [`Spring`] eases a value toward its goal each frame. With a damping
//! ratio of 1 it settles without overshoot, so a fit-to-graph zoom never
//! bounces past the requested level.

use std::ops::{Add, Mul, Sub};

use egui::Vec2;

/// Settled once both the distance to the goal and the speed fall below this.
const REST_EPSILON: f32 = 1e-4;
/// Frame gaps longer than this are integrated as this long.
const MAX_DT: f32 = 0.1;

/// Values a spring can drive.
pub trait SpringValue:
    Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self>
{
    const ZERO: Self;

    /// Length used for the rest test.
    fn magnitude(self) -> f32;
}

impl SpringValue for f32 {
    const ZERO: Self = 0.0;

    fn magnitude(self) -> f32 {
        self.abs()
    }
}

impl SpringValue for Vec2 {
    const ZERO: Self = Vec2::ZERO;

    fn magnitude(self) -> f32 {
        self.length()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f32,
    /// 1.0 is critical damping.
    pub damping: f32,
}

impl SpringConfig {
    pub const FAST: Self = Self {
        stiffness: 300.0,
        damping: 1.0,
    };
    pub const MEDIUM: Self = Self {
        stiffness: 150.0,
        damping: 1.0,
    };
    pub const SLOW: Self = Self {
        stiffness: 80.0,
        damping: 1.0,
    };

    fn friction(&self) -> f32 {
        2.0 * self.damping * self.stiffness.sqrt()
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::MEDIUM
    }
}

#[derive(Debug, Clone)]
pub struct Spring<T> {
    value: T,
    goal: T,
    velocity: T,
    config: SpringConfig,
}

/// Zoom factor spring.
pub type SpringF32 = Spring<f32>;
/// View centre spring.
pub type SpringVec2 = Spring<Vec2>;

impl<T: SpringValue> Spring<T> {
    pub fn new(value: T, config: SpringConfig) -> Self {
        Self {
            value,
            goal: value,
            velocity: T::ZERO,
            config,
        }
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn goal(&self) -> T {
        self.goal
    }

    pub fn aim(&mut self, goal: T) {
        self.goal = goal;
    }

    /// Move straight to `value` and stop.
    pub fn jump(&mut self, value: T) {
        self.value = value;
        self.goal = value;
        self.velocity = T::ZERO;
    }

    pub fn settle(&mut self) {
        self.jump(self.goal);
    }

    /// Semi-implicit Euler step of `a = -k·x - c·v`.
    pub fn advance(&mut self, dt: f32) {
        let dt = dt.clamp(0.0, MAX_DT);
        let offset = self.value - self.goal;
        let accel = offset * -self.config.stiffness - self.velocity * self.config.friction();

        self.velocity = self.velocity + accel * dt;
        self.value = self.value + self.velocity * dt;

        if !self.is_moving() {
            self.settle();
        }
    }

    pub fn is_moving(&self) -> bool {
        (self.value - self.goal).magnitude() > REST_EPSILON
            || self.velocity.magnitude() > REST_EPSILON * 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    #[test]
    fn reaches_goal_and_stops() {
        let mut zoom = SpringF32::new(1.0, SpringConfig::MEDIUM);
        zoom.aim(3.0);
        for _ in 0..600 {
            zoom.advance(FRAME);
        }
        assert_eq!(zoom.value(), 3.0);
        assert!(!zoom.is_moving());
    }

    #[test]
    fn critical_damping_never_overshoots() {
        let mut zoom = SpringF32::new(0.0, SpringConfig::FAST);
        zoom.aim(1.0);
        for _ in 0..300 {
            zoom.advance(FRAME);
            assert!(zoom.value() <= 1.0 + 1e-3, "overshot: {}", zoom.value());
        }
    }

    #[test]
    fn vector_spring_moves_along_the_line() {
        let mut centre = SpringVec2::new(Vec2::ZERO, SpringConfig::SLOW);
        centre.aim(Vec2::new(30.0, 40.0));
        centre.advance(FRAME);
        let v = centre.value();
        assert!(v.x > 0.0 && (v.y / v.x - 4.0 / 3.0).abs() < 1e-3);

        centre.jump(Vec2::new(1.0, 2.0));
        assert!(!centre.is_moving());
        assert_eq!(centre.goal(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn long_frame_gap_stays_stable() {
        let mut zoom = SpringF32::new(0.0, SpringConfig::FAST);
        zoom.aim(1.0);
        zoom.advance(5.0);
        assert!(zoom.value().is_finite() && zoom.value() < 5.0);
    }
}
