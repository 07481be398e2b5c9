//! Serde model of the Tiled JSON map format.
//!
//! This is an external, versioned, author-facing format. Every struct keeps a
//! flattened `extra` map so fields this engine does not consume survive the
//! external-tileset merge instead of being silently dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geom::Rect;

pub const LAYER_TYPE_TILE: &str = "tilelayer";
pub const LAYER_TYPE_OBJECT: &str = "objectgroup";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiledProperty {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl TiledProperty {
    pub fn new(name: &str, value: Value) -> Self {
        Self {
            name: name.to_string(),
            kind: None,
            value,
        }
    }
}

pub(crate) fn property_value<'a>(
    properties: &'a [TiledProperty],
    name: &str,
) -> Option<&'a Value> {
    properties
        .iter()
        .find(|property| property.name == name)
        .map(|property| &property.value)
}

/// An author-placed entry on an object layer. Read once per level load and
/// never mutated after entity creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapObject {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub object_type: String,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<TiledProperty>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MapObject {
    pub fn property(&self, name: &str) -> Option<&Value> {
        property_value(&self.properties, name)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn is_zero_sized(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapLayer {
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<TiledProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<MapObject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MapLayer {
    pub fn is_tile_layer(&self) -> bool {
        self.layer_type == LAYER_TYPE_TILE
    }

    pub fn is_object_layer(&self) -> bool {
        self.layer_type == LAYER_TYPE_OBJECT
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        property_value(&self.properties, name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileDef {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<TiledProperty>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tileset body, shared between embedded tilesets and the content of an
/// external tileset file. An image tileset carries `image` + `tilecount`; a
/// collection tileset enumerates its tiles with individual images.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TilesetData {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilecount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<TileDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<TiledProperty>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TilesetData {
    pub fn tile(&self, local_id: u32) -> Option<&TileDef> {
        self.tiles.iter().find(|tile| tile.id == local_id)
    }
}

/// A map's tileset entry: embedded (inline data) or external (`source`
/// reference). After resolution no `source` field remains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapTileset {
    pub firstgid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub data: TilesetData,
}

impl MapTileset {
    pub fn is_external(&self) -> bool {
        self.source.is_some()
    }

    /// Image tilesets claim a contiguous gid range; collection tilesets
    /// claim exactly the local ids listed in `tiles`.
    pub fn contains_gid(&self, gid: u32) -> bool {
        if gid < self.firstgid {
            return false;
        }
        let local = gid - self.firstgid;
        if let Some(tilecount) = self.data.tilecount {
            if self.data.image.is_some() {
                return local < tilecount;
            }
        }
        self.data.tiles.iter().any(|tile| tile.id == local)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileMap {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub tilewidth: u32,
    #[serde(default)]
    pub tileheight: u32,
    #[serde(default)]
    pub layers: Vec<MapLayer>,
    #[serde(default)]
    pub tilesets: Vec<MapTileset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<TiledProperty>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TileMap {
    pub fn property(&self, name: &str) -> Option<&Value> {
        property_value(&self.properties, name)
    }

    pub fn background_color(&self) -> Option<&str> {
        self.property("backgroundColor").and_then(Value::as_str)
    }

    pub fn tile_layers(&self) -> impl Iterator<Item = &MapLayer> {
        self.layers.iter().filter(|layer| layer.is_tile_layer())
    }

    pub fn object_layers(&self) -> impl Iterator<Item = &MapLayer> {
        self.layers.iter().filter(|layer| layer.is_object_layer())
    }
}
