mod map;
mod service;

pub use map::{
    MapLayer, MapObject, MapTileset, TileDef, TileMap, TiledProperty, TilesetData,
    LAYER_TYPE_OBJECT, LAYER_TYPE_TILE,
};
pub use service::{GidError, MapService, ResolvedMap};
