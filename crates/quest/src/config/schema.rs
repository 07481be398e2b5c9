//! Declarative entity config schema.
//!
//! Configs are authored as `objects/<key>/config.json` inside an extension.
//! The shape is JS-flavored camelCase because extensions are author-facing
//! content. Dynamic `render`/`events` behavior is expressed as hook *names*
//! bound through [`super::HookRegistry`], never as embedded code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_frame_rate() -> f32 {
    6.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationDef {
    pub frames: Vec<u32>,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    #[serde(default)]
    pub repeat: bool,
    /// Composited layer the clip targets; `None` is the base sprite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteSheetDef {
    pub path: String,
    pub frame_width: u32,
    pub frame_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteLayerDef {
    pub name: String,
    pub sprite_sheet: String,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
    #[serde(default)]
    pub frame: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteConfig {
    pub sprite_sheet: String,
    #[serde(default)]
    pub layers: Vec<SpriteLayerDef>,
    #[serde(default)]
    pub default_frame_index: u32,
    /// Derive the initial frame from the placing tile's local id instead of
    /// `default_frame_index`.
    #[serde(default)]
    pub use_gid_as_default_frame_index: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigProperties {
    pub sprite: SpriteConfig,
    /// Default instance properties; per-object map properties override these
    /// by name.
    #[serde(flatten)]
    pub defaults: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntityConfigData {
    #[serde(default)]
    pub animations: BTreeMap<String, AnimationDef>,
    #[serde(default)]
    pub sprite_sheets: BTreeMap<String, SpriteSheetDef>,
    pub properties: ConfigProperties,
    /// Initial mutable state blob handed to the spawned entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    /// Event name → hook name in the host's `HookRegistry`.
    #[serde(default)]
    pub events: BTreeMap<String, String>,
    /// Render hook name in the host's `HookRegistry`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let data: EntityConfigData = serde_json::from_value(json!({
            "spriteSheets": {"chest": {"path": "art/chest.png", "frameWidth": 16, "frameHeight": 16}},
            "properties": {"sprite": {"spriteSheet": "chest"}}
        }))
        .expect("parse");
        assert_eq!(data.properties.sprite.default_frame_index, 0);
        assert!(!data.properties.sprite.use_gid_as_default_frame_index);
        assert!(data.animations.is_empty());
        assert!(data.render.is_none());
    }

    #[test]
    fn extra_property_defaults_are_captured() {
        let data: EntityConfigData = serde_json::from_value(json!({
            "spriteSheets": {"npc": {"path": "art/npc.png", "frameWidth": 16, "frameHeight": 24}},
            "properties": {
                "sprite": {"spriteSheet": "npc"},
                "range": 64,
                "interaction": "talk"
            }
        }))
        .expect("parse");
        assert_eq!(data.properties.defaults.get("range"), Some(&json!(64)));
        assert_eq!(
            data.properties.defaults.get("interaction"),
            Some(&json!("talk"))
        );
    }

    #[test]
    fn unknown_top_level_field_is_rejected() {
        let result = serde_json::from_value::<EntityConfigData>(json!({
            "properties": {"sprite": {"spriteSheet": "x"}},
            "mood": "happy"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn animation_frame_rate_defaults() {
        let def: AnimationDef =
            serde_json::from_value(json!({"frames": [0, 1, 2]})).expect("parse");
        assert!((def.frame_rate - 6.0).abs() < f32::EPSILON);
        assert!(!def.repeat);
        assert!(def.layer.is_none());
    }
}
