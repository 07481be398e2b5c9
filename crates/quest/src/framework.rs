//! Narrow seams to the external 2D framework.
//!
//! The engine never draws or simulates physics itself. It creates sprites,
//! queues sprite-sheet loads, and reads collision contacts exclusively
//! through these traits; the host game supplies the implementations.

use runtime::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteHandle(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteRequest {
    pub image_key: String,
    pub position: Vec2,
    pub frame: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub frames: Vec<u32>,
    pub frame_rate: f32,
    pub repeat: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSheetRequest {
    pub key: String,
    pub path: String,
    pub frame_width: u32,
    pub frame_height: u32,
}

pub trait RenderContext {
    fn create_sprite(&mut self, request: &SpriteRequest) -> SpriteHandle;
    fn destroy_sprite(&mut self, sprite: SpriteHandle);
    fn set_sprite_visible(&mut self, sprite: SpriteHandle, visible: bool);
    fn set_sprite_position(&mut self, sprite: SpriteHandle, position: Vec2);
    fn play_animation(&mut self, sprite: SpriteHandle, name: &str);
    fn add_animation(&mut self, sprite: SpriteHandle, clip: &AnimationClip);
    fn queue_sprite_sheet(&mut self, request: &SpriteSheetRequest);
    fn sprite_bounds(&self, sprite: SpriteHandle) -> Rect;
    /// Debug-overlay drawing only; implementations may no-op in release.
    fn draw_debug_rect(&mut self, rect: Rect) {
        let _ = rect;
    }
}

/// Which edges the physics engine reports as blocked this frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Touching {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Touching {
    pub fn none(&self) -> bool {
        !(self.up || self.down || self.left || self.right)
    }
}

/// A moving body as the external physics step left it: resolved bounds plus
/// the edges it is pressing against.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Body {
    pub bounds: Rect,
    pub velocity: Vec2,
    pub touching: Touching,
}

impl Body {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.bounds.x, self.bounds.y)
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.bounds.x += dx;
        self.bounds.y += dy;
    }
}

/// One overlap between the mover and a collider, as reported by physics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub touching: Touching,
    pub collider_bounds: Rect,
}

pub trait CollisionProbe {
    /// Contacts involving `body` from the physics pass that just ran.
    fn contacts(&self, body: &Body) -> Vec<Contact>;
}

/// Frame input for the player-controlled entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub interact: bool,
}
