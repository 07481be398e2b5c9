//! Concrete entity variants. Each is the `EntityCore` plus only the
//! capabilities that variant needs; there is no inheritance chain.

use runtime::{EventBus, Rect, Vec2, OBJECT_UPDATE_INTERACTABLE};
use serde_json::json;

use crate::framework::Body;
use crate::movement::{ease_movement, movement_delta, EaseConfig};

use super::{ContactTracker, Entity, EntityCore, RangeTracker, UpdateContext};

const DEFAULT_MOVE_SPEED: f32 = 80.0;
const DEFAULT_INTERACT_RANGE: f32 = 48.0;
const DEFAULT_BODY_SIZE: f32 = 16.0;

pub const PLAYER_CONTACTS_EVENT: &str = "playerContactsChanged";

/// Zero-size marker (spawn points, script anchors). No visuals, no hooks.
pub struct PointMarker {
    core: EntityCore,
}

impl PointMarker {
    pub fn from_core(core: EntityCore) -> Self {
        Self { core }
    }
}

impl Entity for PointMarker {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

/// The player-controlled entity: input-driven movement, corner easing
/// against whatever the physics pass reports, and 0/1/many contact
/// tracking.
pub struct Player {
    core: EntityCore,
    pub body: Body,
    pub move_speed: f32,
    ease: EaseConfig,
    contacts: ContactTracker,
}

impl Player {
    pub fn from_core(mut core: EntityCore) -> Self {
        let move_speed = core
            .property_f32("moveSpeed")
            .unwrap_or(DEFAULT_MOVE_SPEED);
        // Spawn markers are zero-sized; the body still needs real extents.
        let width = if core.size.x > 0.0 {
            core.size.x
        } else {
            DEFAULT_BODY_SIZE
        };
        let height = if core.size.y > 0.0 {
            core.size.y
        } else {
            DEFAULT_BODY_SIZE
        };
        core.size = Vec2::new(width, height);
        let body = Body {
            bounds: Rect::new(core.position.x, core.position.y, width, height),
            ..Body::default()
        };
        Self {
            core,
            body,
            move_speed,
            ease: EaseConfig::default(),
            contacts: ContactTracker::new(),
        }
    }
}

impl Entity for Player {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        let delta = movement_delta(ctx.input, self.move_speed, ctx.dt_seconds);
        self.body.velocity = Vec2::new(delta.x / ctx.dt_seconds, delta.y / ctx.dt_seconds);
        self.body.translate(delta.x, delta.y);

        // Easing runs against the contacts the physics pass just produced.
        let contacts = ctx.probe.contacts(&self.body);
        if let Some(contact) = contacts.first() {
            self.body.touching = contact.touching;
            let nudge = ease_movement(
                &self.body.bounds,
                &contact.collider_bounds,
                contact.touching,
                &self.ease,
            );
            self.body.translate(nudge.x, nudge.y);
        } else {
            self.body.touching = Default::default();
        }

        if let Some(level) = self.contacts.observe(contacts.len()) {
            ctx.bus.emit(
                PLAYER_CONTACTS_EVENT,
                &json!({"count": contacts.len(), "level": format!("{level:?}").to_lowercase()}),
            );
        }

        self.core.position = self.body.position();
        if let Some(sprite) = self.core.sprite {
            ctx.render.set_sprite_position(sprite, self.core.position);
        }
    }

    fn body_mut(&mut self) -> Option<&mut Body> {
        Some(&mut self.body)
    }
}

/// A conversational character; interactable and range-tracked.
pub struct Npc {
    core: EntityCore,
    range: f32,
    tracker: RangeTracker,
}

impl Npc {
    pub fn from_core(core: EntityCore) -> Self {
        let range = core
            .property_f32("range")
            .unwrap_or(DEFAULT_INTERACT_RANGE);
        Self {
            core,
            range,
            tracker: RangeTracker::new(),
        }
    }

    pub fn in_range(&self) -> bool {
        self.tracker.is_in()
    }
}

impl Entity for Npc {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn observe_player(&mut self, player_bounds: Rect, bus: &EventBus) {
        let in_range = self.is_in_range(player_bounds.center(), self.range);
        if self.tracker.observe(in_range).is_some() {
            bus.emit(
                OBJECT_UPDATE_INTERACTABLE,
                &json!({
                    "name": self.core.name,
                    "type": self.core.type_key,
                    "inRange": in_range,
                }),
            );
        }
    }
}

/// Generic tile-derived interactable; the fallback for unknown types.
pub struct TileObject {
    core: EntityCore,
    range: f32,
    tracker: RangeTracker,
    interaction: Option<String>,
}

impl TileObject {
    pub fn from_core(core: EntityCore) -> Self {
        let range = core
            .property_f32("range")
            .unwrap_or(DEFAULT_INTERACT_RANGE);
        let interaction = core.property_str("interaction").map(str::to_string);
        Self {
            core,
            range,
            tracker: RangeTracker::new(),
            interaction,
        }
    }

    pub fn in_range(&self) -> bool {
        self.tracker.is_in()
    }
}

impl Entity for TileObject {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn observe_player(&mut self, player_bounds: Rect, bus: &EventBus) {
        let in_range = self.is_in_range(player_bounds.center(), self.range);
        if self.tracker.observe(in_range).is_some() {
            bus.emit(
                OBJECT_UPDATE_INTERACTABLE,
                &json!({
                    "name": self.core.name,
                    "type": self.core.type_key,
                    "interaction": self.interaction,
                    "inRange": in_range,
                }),
            );
        }
    }
}

/// Invisible area that fires its configured event on overlap edges.
pub struct TriggerArea {
    core: EntityCore,
    overlap: RangeTracker,
    event: Option<String>,
}

impl TriggerArea {
    pub fn from_core(core: EntityCore) -> Self {
        let event = core.property_str("event").map(str::to_string);
        Self {
            core,
            overlap: RangeTracker::new(),
            event,
        }
    }
}

impl Entity for TriggerArea {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn observe_player(&mut self, player_bounds: Rect, bus: &EventBus) {
        let overlapping = self.core.bounds().overlaps(&player_bounds);
        if self.overlap.observe(overlapping).is_some() {
            if let Some(event) = &self.event {
                bus.emit(
                    event,
                    &json!({"name": self.core.name, "entered": overlapping}),
                );
            }
        }
    }
}

/// Area that carries the player to another level while overlapped. The
/// orchestrator's transition latch absorbs the repeat reports from
/// consecutive frames.
pub struct TransitionArea {
    core: EntityCore,
    target_level: String,
    entry_point: String,
    overlapping: bool,
}

impl TransitionArea {
    pub fn from_core(core: EntityCore) -> Self {
        let target_level = core
            .property_str("level")
            .unwrap_or_default()
            .to_string();
        let entry_point = core
            .property_str("entryPoint")
            .unwrap_or("default")
            .to_string();
        Self {
            core,
            target_level,
            entry_point,
            overlapping: false,
        }
    }
}

impl Entity for TransitionArea {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn observe_player(&mut self, player_bounds: Rect, _bus: &EventBus) {
        self.overlapping = self.core.bounds().overlaps(&player_bounds);
    }

    fn pending_transition(&self) -> Option<(&str, &str)> {
        if self.overlapping && !self.target_level.is_empty() {
            Some((&self.target_level, &self.entry_point))
        } else {
            None
        }
    }
}
