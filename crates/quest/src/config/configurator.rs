use std::rc::Rc;

use runtime::{ResolvedMap, Vec2};
use serde_json::Value;
use tracing::warn;

use crate::framework::{
    AnimationClip, RenderContext, SpriteHandle, SpriteRequest, SpriteSheetRequest,
};

use super::EntityConfig;

/// Per-instance inputs to sprite construction, taken from the placed map
/// object rather than the shared config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceSpriteProps {
    pub position: Vec2,
    pub gid: Option<u32>,
    /// Author-specified image key; beats both the gid-derived image and the
    /// config default.
    pub image_key_override: Option<String>,
}

/// Builds sprites from one registered entity config.
#[derive(Clone)]
pub struct EntityConfigurator {
    config: Rc<EntityConfig>,
}

impl EntityConfigurator {
    pub(super) fn new(config: Rc<EntityConfig>) -> Self {
        Self { config }
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn config(&self) -> &EntityConfig {
        &self.config
    }

    pub fn initial_state(&self) -> Option<Value> {
        self.config.data.state.clone()
    }

    pub fn render_hook_name(&self) -> Option<&str> {
        self.config.data.render.as_deref()
    }

    /// Creates the base sprite. Image precedence: explicit override, then
    /// the placing tile's image, then the configured default sheet. The
    /// initial frame is either the fixed default or the tile's local id.
    pub fn create_sprite(
        &self,
        ctx: &mut dyn RenderContext,
        map: Option<&ResolvedMap>,
        props: &InstanceSpriteProps,
    ) -> SpriteHandle {
        let sprite = &self.config.data.properties.sprite;

        let gid_image = props.gid.and_then(|gid| {
            let map = map?;
            match map.image_key_for_gid(gid) {
                Ok(key) => Some(key),
                Err(error) => {
                    warn!(key = %self.config.key, error = %error, "gid_image_lookup_failed");
                    None
                }
            }
        });
        let image_key = props
            .image_key_override
            .clone()
            .or(gid_image)
            .unwrap_or_else(|| sprite.sprite_sheet.clone());

        let mut frame = sprite.default_frame_index;
        if sprite.use_gid_as_default_frame_index {
            if let (Some(gid), Some(map)) = (props.gid, map) {
                match map.local_id(gid) {
                    Ok(local) => frame = local,
                    Err(error) => {
                        warn!(key = %self.config.key, error = %error, "gid_frame_lookup_failed");
                    }
                }
            }
        }

        ctx.create_sprite(&SpriteRequest {
            image_key,
            position: props.position,
            frame,
        })
    }

    /// Creates the additional offset-composited layer sprites, in config
    /// order, returning `(layer name, handle)` pairs.
    pub fn create_layer_sprites(
        &self,
        ctx: &mut dyn RenderContext,
        base_position: Vec2,
    ) -> Vec<(String, SpriteHandle)> {
        self.config
            .data
            .properties
            .sprite
            .layers
            .iter()
            .map(|layer| {
                let handle = ctx.create_sprite(&SpriteRequest {
                    image_key: layer.sprite_sheet.clone(),
                    position: Vec2::new(
                        base_position.x + layer.offset_x,
                        base_position.y + layer.offset_y,
                    ),
                    frame: layer.frame,
                });
                (layer.name.clone(), handle)
            })
            .collect()
    }

    /// Registers every configured animation clip on the base sprite or on
    /// its named layer.
    pub fn add_animations(
        &self,
        ctx: &mut dyn RenderContext,
        base: SpriteHandle,
        layers: &[(String, SpriteHandle)],
    ) {
        for (name, def) in &self.config.data.animations {
            let target = match &def.layer {
                None => base,
                Some(layer_name) => {
                    match layers.iter().find(|(name, _)| name == layer_name) {
                        Some((_, handle)) => *handle,
                        None => {
                            warn!(
                                key = %self.config.key,
                                animation = %name,
                                layer = %layer_name,
                                "animation_layer_missing"
                            );
                            continue;
                        }
                    }
                }
            };
            ctx.add_animation(
                target,
                &AnimationClip {
                    name: name.clone(),
                    frames: def.frames.clone(),
                    frame_rate: def.frame_rate,
                    repeat: def.repeat,
                },
            );
        }
    }

    /// Issues load requests for every sprite sheet the config references.
    pub fn load_sprite_sheets(&self, ctx: &mut dyn RenderContext) {
        for (key, sheet) in &self.config.data.sprite_sheets {
            ctx.queue_sprite_sheet(&SpriteSheetRequest {
                key: key.clone(),
                path: sheet.path.clone(),
                frame_width: sheet.frame_width,
                frame_height: sheet.frame_height,
            });
        }
    }
}
