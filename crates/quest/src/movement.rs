//! Corner easing for the player-controlled body.
//!
//! When the physics pass leaves the mover pressed against a collider at a
//! shallow corner, the mover is nudged along the perpendicular axis instead
//! of staying fully blocked, so diagonal movement along walls feels smooth.
//! The eight octant cases carry direction-dependent sign conventions; they
//! are deliberately encoded one arm per case.

use runtime::{Rect, Vec2};

use crate::framework::{InputSnapshot, Touching};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EaseConfig {
    /// Max perpendicular overlap eased when pressing left/right.
    pub vertical_threshold: f32,
    /// Max perpendicular overlap eased when pressing up/down.
    pub horizontal_threshold: f32,
    /// Nudge applied per frame, in pixels.
    pub ease_speed: f32,
}

impl Default for EaseConfig {
    fn default() -> Self {
        Self {
            vertical_threshold: 8.0,
            horizontal_threshold: 10.0,
            ease_speed: 1.0,
        }
    }
}

/// The eight mutually exclusive corner cases: the edge the mover is pressing
/// against, plus which side of the collider's center it sits on along the
/// perpendicular axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Octant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    RightTop,
    RightBottom,
    LeftTop,
    LeftBottom,
}

/// First blocked edge wins, in up/down/left/right order.
pub fn classify_octant(mover: &Rect, collider: &Rect, touching: Touching) -> Option<Octant> {
    if touching.up {
        return Some(if mover.center_x() >= collider.center_x() {
            Octant::TopRight
        } else {
            Octant::TopLeft
        });
    }
    if touching.down {
        return Some(if mover.center_x() >= collider.center_x() {
            Octant::BottomRight
        } else {
            Octant::BottomLeft
        });
    }
    if touching.right {
        return Some(if mover.center_y() <= collider.center_y() {
            Octant::RightTop
        } else {
            Octant::RightBottom
        });
    }
    if touching.left {
        return Some(if mover.center_y() <= collider.center_y() {
            Octant::LeftTop
        } else {
            Octant::LeftBottom
        });
    }
    None
}

/// The per-frame easing correction, or zero when no octant applies or the
/// perpendicular overlap exceeds the threshold. Runs after the physics
/// collision pass and before rendering.
pub fn ease_movement(
    mover: &Rect,
    collider: &Rect,
    touching: Touching,
    config: &EaseConfig,
) -> Vec2 {
    let Some(octant) = classify_octant(mover, collider, touching) else {
        return Vec2::default();
    };
    match octant {
        Octant::TopRight | Octant::BottomRight => {
            let overlap = collider.right() - mover.x;
            if overlap > 0.0 && overlap <= config.horizontal_threshold {
                Vec2::new(config.ease_speed, 0.0)
            } else {
                Vec2::default()
            }
        }
        Octant::TopLeft | Octant::BottomLeft => {
            let overlap = mover.right() - collider.x;
            if overlap > 0.0 && overlap <= config.horizontal_threshold {
                Vec2::new(-config.ease_speed, 0.0)
            } else {
                Vec2::default()
            }
        }
        Octant::RightTop | Octant::LeftTop => {
            let overlap = mover.bottom() - collider.y;
            if overlap > 0.0 && overlap <= config.vertical_threshold {
                Vec2::new(0.0, -config.ease_speed)
            } else {
                Vec2::default()
            }
        }
        Octant::RightBottom | Octant::LeftBottom => {
            let overlap = collider.bottom() - mover.y;
            if overlap > 0.0 && overlap <= config.vertical_threshold {
                Vec2::new(0.0, config.ease_speed)
            } else {
                Vec2::default()
            }
        }
    }
}

/// Input-driven displacement for the frame, normalized so diagonals are not
/// faster than cardinal movement. Screen coordinates: +y is down.
pub fn movement_delta(input: &InputSnapshot, speed: f32, dt_seconds: f32) -> Vec2 {
    let mut x = 0.0f32;
    let mut y = 0.0f32;

    if input.right {
        x += 1.0;
    }
    if input.left {
        x -= 1.0;
    }
    if input.down {
        y += 1.0;
    }
    if input.up {
        y -= 1.0;
    }

    let len_sq = x * x + y * y;
    if len_sq > 0.0 {
        let inv_len = len_sq.sqrt().recip();
        x *= inv_len;
        y *= inv_len;
    }

    Vec2 {
        x: x * speed * dt_seconds,
        y: y * speed * dt_seconds,
    }
}
