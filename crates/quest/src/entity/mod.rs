mod factory;
mod kinds;
mod service;
mod tracker;

pub use factory::{EntityFactory, EntityTypeRegistry, EntityTypeSpec, FALLBACK_TYPE};
pub use kinds::{
    Npc, Player, PointMarker, TileObject, TransitionArea, TriggerArea, PLAYER_CONTACTS_EVENT,
};
pub use service::{EntityGuid, EntityRecord, EntityRegistration, EntityService, RenderGroup};
pub use tracker::{ContactLevel, ContactTracker, RangeEdge, RangeTracker};

use runtime::{EventBus, Rect, Vec2};
use serde_json::{Map, Value};

use crate::framework::{Body, CollisionProbe, InputSnapshot, RenderContext, SpriteHandle};

/// Shared fields every entity variant carries, merged from the placing map
/// object, tileset defaults, and the registered config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityCore {
    pub name: String,
    pub type_key: String,
    pub position: Vec2,
    pub size: Vec2,
    pub z_index: i32,
    pub visible: bool,
    pub properties: Map<String, Value>,
    /// Initial mutable state blob from the entity config.
    pub state: Option<Value>,
    pub sprite: Option<SpriteHandle>,
    pub layer_sprites: Vec<(String, SpriteHandle)>,
    pub render_hook: Option<String>,
}

impl EntityCore {
    pub fn new(name: &str, type_key: &str) -> Self {
        Self {
            name: name.to_string(),
            type_key: type_key.to_string(),
            visible: true,
            ..Self::default()
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }

    pub fn sprite_handles(&self) -> Vec<SpriteHandle> {
        let mut handles = Vec::with_capacity(1 + self.layer_sprites.len());
        if let Some(sprite) = self.sprite {
            handles.push(sprite);
        }
        handles.extend(self.layer_sprites.iter().map(|(_, handle)| *handle));
        handles
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(Value::as_str)
    }

    pub fn property_f32(&self, name: &str) -> Option<f32> {
        self.property(name).and_then(Value::as_f64).map(|v| v as f32)
    }
}

/// Everything an entity may touch during the update phase.
pub struct UpdateContext<'a> {
    pub dt_seconds: f32,
    pub input: &'a InputSnapshot,
    pub render: &'a mut dyn RenderContext,
    pub probe: &'a dyn CollisionProbe,
    pub bus: &'a EventBus,
}

/// The capability surface shared by all registered entities. Every hook
/// beyond the core accessors is optional; variants implement only what they
/// need.
pub trait Entity {
    fn core(&self) -> &EntityCore;
    fn core_mut(&mut self) -> &mut EntityCore;

    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}

    fn render(&mut self, _ctx: &mut dyn RenderContext) {}

    /// Releases visual state. The default covers sprite-bearing entities;
    /// marker entities with no sprites inherit a no-op.
    fn destroy(&mut self, ctx: &mut dyn RenderContext) {
        for handle in self.core().sprite_handles() {
            ctx.destroy_sprite(handle);
        }
    }

    fn is_in_range(&self, point: Vec2, range: f32) -> bool {
        self.core().bounds().center().distance_to(point) <= range
    }

    /// Post-physics realignment against the player. Interactables drive
    /// their range machines here; areas track overlap.
    fn observe_player(&mut self, _player_bounds: Rect, _bus: &EventBus) {}

    /// Present on the player variant only.
    fn body_mut(&mut self) -> Option<&mut Body> {
        None
    }

    /// `(target level, entry point)` for transition areas the player is
    /// currently overlapping.
    fn pending_transition(&self) -> Option<(&str, &str)> {
        None
    }
}
