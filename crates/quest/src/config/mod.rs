mod configurator;
mod schema;

pub use configurator::{EntityConfigurator, InstanceSpriteProps};
pub use schema::{
    AnimationDef, ConfigProperties, EntityConfigData, SpriteConfig, SpriteLayerDef, SpriteSheetDef,
};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::framework::{RenderContext, SpriteHandle};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("entity config '{key}' could not be read from {path}: {source}")]
    Read {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("entity config '{key}' is not valid JSON: {detail}")]
    Parse { key: String, detail: String },
    #[error("entity config '{key}' failed validation at '{path}': {detail}")]
    Schema {
        key: String,
        path: String,
        detail: String,
    },
    #[error("entity config '{key}' references unknown sprite sheet '{sheet}'")]
    UnknownSpriteSheet { key: String, sheet: String },
    #[error("entity config '{key}' animation '{animation}' targets unknown layer '{layer}'")]
    UnknownAnimationLayer {
        key: String,
        animation: String,
        layer: String,
    },
}

pub type RenderHook = Rc<dyn Fn(&mut dyn RenderContext, SpriteHandle)>;
pub type EventHook = Rc<dyn Fn(&Value)>;

/// Host-registered callbacks that configs may reference by name. This is the
/// only way declarative content reaches executable behavior.
#[derive(Default)]
pub struct HookRegistry {
    render: HashMap<String, RenderHook>,
    events: HashMap<String, EventHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_render_hook(
        &mut self,
        name: &str,
        hook: impl Fn(&mut dyn RenderContext, SpriteHandle) + 'static,
    ) {
        self.render.insert(name.to_string(), Rc::new(hook));
    }

    pub fn register_event_hook(&mut self, name: &str, hook: impl Fn(&Value) + 'static) {
        self.events.insert(name.to_string(), Rc::new(hook));
    }

    pub fn render_hook(&self, name: &str) -> Option<RenderHook> {
        self.render.get(name).cloned()
    }

    pub fn event_hook(&self, name: &str) -> Option<EventHook> {
        self.events.get(name).cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityConfig {
    pub key: String,
    pub data: EntityConfigData,
}

/// Registry of validated entity configs, one per entity type key.
/// Re-registering a key replaces the previous config; extensions rely on
/// last-write-wins to override base-game entity types.
#[derive(Default)]
pub struct EntityConfigService {
    configs: HashMap<String, Rc<EntityConfig>>,
}

impl EntityConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: &str, raw: &Value) -> Result<(), ConfigError> {
        let data: EntityConfigData =
            serde_path_to_error::deserialize(raw.clone()).map_err(|error| {
                let path = error.path().to_string();
                ConfigError::Schema {
                    key: key.to_string(),
                    path,
                    detail: error.into_inner().to_string(),
                }
            })?;
        validate_references(key, &data)?;
        self.configs.insert(
            key.to_string(),
            Rc::new(EntityConfig {
                key: key.to_string(),
                data,
            }),
        );
        Ok(())
    }

    pub fn register_from_file(&mut self, key: &str, path: &Path) -> Result<(), ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            key: key.to_string(),
            path: path.to_path_buf(),
            source,
        })?;
        let value = serde_json::from_str::<Value>(&raw).map_err(|error| ConfigError::Parse {
            key: key.to_string(),
            detail: error.to_string(),
        })?;
        self.register(key, &value)
    }

    /// Returns a configurator bound to the key's config, or `None` with a
    /// warning; callers fall back to the config-less legacy path.
    pub fn get(&self, key: &str) -> Option<EntityConfigurator> {
        match self.configs.get(key) {
            Some(config) => Some(EntityConfigurator::new(Rc::clone(config))),
            None => {
                warn!(key, "entity_config_unregistered");
                None
            }
        }
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.configs.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.configs.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }
}

fn validate_references(key: &str, data: &EntityConfigData) -> Result<(), ConfigError> {
    let known_sheet = |sheet: &str| data.sprite_sheets.contains_key(sheet);
    let sprite = &data.properties.sprite;
    if !known_sheet(&sprite.sprite_sheet) {
        return Err(ConfigError::UnknownSpriteSheet {
            key: key.to_string(),
            sheet: sprite.sprite_sheet.clone(),
        });
    }
    for layer in &sprite.layers {
        if !known_sheet(&layer.sprite_sheet) {
            return Err(ConfigError::UnknownSpriteSheet {
                key: key.to_string(),
                sheet: layer.sprite_sheet.clone(),
            });
        }
    }
    for (name, animation) in &data.animations {
        if let Some(layer) = &animation.layer {
            if !sprite.layers.iter().any(|def| &def.name == layer) {
                return Err(ConfigError::UnknownAnimationLayer {
                    key: key.to_string(),
                    animation: name.clone(),
                    layer: layer.clone(),
                });
            }
        }
    }
    Ok(())
}
