use std::collections::HashMap;

use runtime::tiled::MapObject;
use runtime::{ResolvedMap, Vec2};
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::config::{EntityConfigService, InstanceSpriteProps};
use crate::framework::{RenderContext, SpriteRequest};

use super::{
    Entity, EntityCore, EntityGuid, EntityRegistration, EntityService, Npc, Player, PointMarker,
    TileObject, TransitionArea, TriggerArea,
};

/// Unrecognized object types degrade to this variant instead of failing.
pub const FALLBACK_TYPE: &str = "tile-object";

/// How one semantic type key becomes a live entity: its constructor, the
/// collections it is indexed under, and its render group.
pub struct EntityTypeSpec {
    pub collections: &'static [&'static str],
    pub group: Option<&'static str>,
    pub build: fn(EntityCore) -> Box<dyn Entity>,
}

/// Type key → spec table. Hosts may register additional variants; the
/// built-in table covers the shipped semantic types.
pub struct EntityTypeRegistry {
    specs: HashMap<String, EntityTypeSpec>,
}

impl EntityTypeRegistry {
    pub fn register(&mut self, key: &str, spec: EntityTypeSpec) {
        self.specs.insert(key.to_string(), spec);
    }

    pub fn get(&self, key: &str) -> Option<&EntityTypeSpec> {
        self.specs.get(key)
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.specs.contains_key(key)
    }
}

impl Default for EntityTypeRegistry {
    fn default() -> Self {
        let mut registry = Self {
            specs: HashMap::new(),
        };
        registry.register(
            "player",
            EntityTypeSpec {
                collections: &[],
                group: Some("objects"),
                build: |core| Box::new(Player::from_core(core)),
            },
        );
        registry.register(
            "npc",
            EntityTypeSpec {
                collections: &["npcs", "interactables"],
                group: Some("objects"),
                build: |core| Box::new(Npc::from_core(core)),
            },
        );
        registry.register(
            "tile-object",
            EntityTypeSpec {
                collections: &["interactables"],
                group: Some("objects"),
                build: |core| Box::new(TileObject::from_core(core)),
            },
        );
        registry.register(
            "trigger-area",
            EntityTypeSpec {
                collections: &["triggers"],
                group: None,
                build: |core| Box::new(TriggerArea::from_core(core)),
            },
        );
        registry.register(
            "transition",
            EntityTypeSpec {
                collections: &["transitions"],
                group: None,
                build: |core| Box::new(TransitionArea::from_core(core)),
            },
        );
        registry.register(
            "point",
            EntityTypeSpec {
                collections: &[],
                group: None,
                build: |core| Box::new(PointMarker::from_core(core)),
            },
        );
        registry
    }
}

/// The single conversion point from a declarative map object to a live,
/// registered entity.
pub struct EntityFactory<'a> {
    pub map: Option<&'a ResolvedMap>,
    pub configs: &'a EntityConfigService,
    pub registry: &'a EntityTypeRegistry,
}

impl EntityFactory<'_> {
    /// Builds and registers one entity. Returns `None` on the documented
    /// skip paths: a gid-less tile-object, or tile defaults that cannot be
    /// resolved.
    pub fn build(
        &self,
        ctx: &mut dyn RenderContext,
        object: &MapObject,
        entities: &mut EntityService,
    ) -> Option<EntityGuid> {
        // Tileset defaults first, then the author's explicit properties,
        // merged by property name so an instance value always wins.
        let mut properties = Map::new();
        if let (Some(gid), Some(map)) = (object.gid, self.map) {
            match map.tile_data(gid) {
                Ok(defaults) => properties = defaults,
                Err(lookup) => {
                    error!(name = %object.name, error = %lookup, "tile_defaults_unresolvable");
                    return None;
                }
            }
        }
        for property in &object.properties {
            properties.insert(property.name.clone(), property.value.clone());
        }

        let type_key = normalize_type(object);
        let (type_key, spec) = match self.registry.get(&type_key) {
            Some(spec) => (type_key, spec),
            None => {
                warn!(
                    object_type = %type_key,
                    name = %object.name,
                    "unknown_entity_type_falls_back"
                );
                let Some(fallback) = self.registry.get(FALLBACK_TYPE) else {
                    error!(name = %object.name, "fallback_entity_type_unregistered");
                    return None;
                };
                (FALLBACK_TYPE.to_string(), fallback)
            }
        };

        // A generic tile object with no tile reference has nothing to render.
        if type_key == FALLBACK_TYPE && object.gid.is_none() {
            error!(name = %object.name, "tile_object_without_gid_skipped");
            return None;
        }

        let mut position = Vec2::new(object.x, object.y);
        if object.gid.is_some() {
            // Tiled anchors tile objects at their bottom-left corner.
            position.y -= object.height;
        }

        let mut core = EntityCore::new(&object.name, &type_key);
        core.position = position;
        core.size = Vec2::new(object.width, object.height);
        core.z_index = properties
            .get("zIndex")
            .and_then(Value::as_i64)
            .unwrap_or(0) as i32;
        core.properties = properties;

        if spec.group.is_some() {
            self.attach_sprites(ctx, object, &mut core);
        }

        let instance = (spec.build)(core);
        Some(entities.register_entity(EntityRegistration {
            instance,
            collections: spec.collections.iter().map(|name| name.to_string()).collect(),
            group: spec.group.map(str::to_string),
        }))
    }

    fn attach_sprites(
        &self,
        ctx: &mut dyn RenderContext,
        object: &MapObject,
        core: &mut EntityCore,
    ) {
        let props = InstanceSpriteProps {
            position: core.position,
            gid: object.gid,
            image_key_override: core.property_str("imageKey").map(str::to_string),
        };
        match self.configs.get(&core.type_key) {
            Some(configurator) => {
                let sprite = configurator.create_sprite(ctx, self.map, &props);
                let layers = configurator.create_layer_sprites(ctx, core.position);
                configurator.add_animations(ctx, sprite, &layers);
                core.state = configurator.initial_state();
                core.render_hook = configurator.render_hook_name().map(str::to_string);
                core.sprite = Some(sprite);
                core.layer_sprites = layers;
            }
            None => {
                // Legacy config-less path: a bare sprite from the tile image.
                let (Some(gid), Some(map)) = (object.gid, self.map) else {
                    return;
                };
                match (map.image_key_for_gid(gid), map.local_id(gid)) {
                    (Ok(image_key), Ok(frame)) => {
                        core.sprite = Some(ctx.create_sprite(&SpriteRequest {
                            image_key,
                            position: core.position,
                            frame,
                        }));
                    }
                    (Err(lookup), _) | (_, Err(lookup)) => {
                        warn!(name = %object.name, error = %lookup, "legacy_sprite_unresolvable");
                    }
                }
            }
        }
    }
}

fn normalize_type(object: &MapObject) -> String {
    let trimmed = object.object_type.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    if object.is_zero_sized() {
        "point".to_string()
    } else {
        FALLBACK_TYPE.to_string()
    }
}
