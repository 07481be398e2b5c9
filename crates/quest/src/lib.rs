//! The dynamic-level runtime: turns a declarative tile map plus per-extension
//! entity configs into a live registry of interactive entities, and keeps
//! entities, their sprites, and global progression state synchronized across
//! frames. Rendering and physics stay behind the seams in [`framework`].

pub mod config;
pub mod entity;
pub mod framework;
pub mod level;
pub mod movement;
pub mod text;

#[cfg(test)]
pub(crate) mod testkit;

pub use config::{
    ConfigError, EntityConfig, EntityConfigService, EntityConfigurator, HookRegistry,
    InstanceSpriteProps,
};
pub use entity::{
    ContactLevel, Entity, EntityCore, EntityFactory, EntityGuid, EntityRecord, EntityService,
    EntityTypeRegistry, EntityTypeSpec, UpdateContext, FALLBACK_TYPE,
};
pub use framework::{
    AnimationClip, Body, CollisionProbe, Contact, InputSnapshot, RenderContext, SpriteHandle,
    SpriteRequest, SpriteSheetRequest, Touching,
};
pub use level::{
    DynamicLevel, EntitySelector, LevelConfig, LevelError, TransitionRequest, OBJECTS_GROUP,
    UI_GROUP,
};
pub use movement::{classify_octant, ease_movement, EaseConfig, Octant};
pub use text::InteractionText;
