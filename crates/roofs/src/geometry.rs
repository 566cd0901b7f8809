use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Rotates about the origin. Canvas space is y-down, so positive angles
    /// turn clockwise on screen.
    pub fn rotated(self, radians: f32) -> Self {
        if radians == 0.0 {
            return self;
        }
        let (sin, cos) = radians.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub rotation_radians: f32,
}

impl Transform {
    pub fn from_degrees(position: Vec2, rotation_degrees: f32) -> Self {
        Self {
            position,
            rotation_radians: rotation_degrees.to_radians(),
        }
    }

    pub fn apply(&self, local: Vec2) -> Vec2 {
        self.position + local.rotated(self.rotation_radians)
    }

    pub fn to_local(&self, parent_point: Vec2) -> Vec2 {
        (parent_point - self.position).rotated(-self.rotation_radians)
    }
}

pub fn canvas_to_local(point: Vec2, chain: &[Transform]) -> Vec2 {
    chain
        .iter()
        .fold(point, |current, transform| transform.to_local(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq_vec2(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn quarter_turn_rotates_clockwise_in_y_down_space() {
        let rotated = Vec2::new(1.0, 0.0).rotated(90f32.to_radians());
        assert!(approx_eq_vec2(rotated, Vec2::new(0.0, 1.0)), "{rotated:?}");
    }

    #[test]
    fn to_local_inverts_apply() {
        let transform = Transform::from_degrees(Vec2::new(40.0, -12.0), 33.0);
        let local = Vec2::new(7.5, 19.0);
        let back = transform.to_local(transform.apply(local));
        assert!(approx_eq_vec2(back, local), "{back:?}");
    }

    #[test]
    fn chain_applies_outermost_transform_first() {
        let chain = [
            Transform::from_degrees(Vec2::new(100.0, 100.0), 0.0),
            Transform::from_degrees(Vec2::new(10.0, 0.0), 90.0),
        ];
        // (115, 100) is (15, 0) inside the outer node, (5, 0) from the inner
        // origin, which a quarter turn maps onto the inner -y axis.
        let local = canvas_to_local(Vec2::new(115.0, 100.0), &chain);
        assert!(approx_eq_vec2(local, Vec2::new(0.0, -5.0)), "{local:?}");
    }
}
