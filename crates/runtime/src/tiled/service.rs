use std::path::{Component, Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::content::LayeredFs;

use super::map::{MapLayer, MapTileset, TileDef, TileMap, TilesetData};

#[derive(Debug, Error)]
pub enum GidError {
    #[error("gid {gid} does not belong to any tileset in map '{map}'")]
    NoTileset { gid: u32, map: String },
    #[error("gid {gid} has no image in tileset '{tileset}' of map '{map}'")]
    NoImage {
        gid: u32,
        tileset: String,
        map: String,
    },
}

/// A map with every external tileset inlined, plus deterministic gid
/// arithmetic. Tilesets are kept sorted by ascending `firstgid`; a gid
/// belongs to the tileset whose range or explicit tile list claims it.
#[derive(Debug, Clone)]
pub struct ResolvedMap {
    name: String,
    owning_extension: String,
    map: TileMap,
}

impl ResolvedMap {
    /// Inlines each external tileset by resolving its `source` path relative
    /// to the map's directory through the layered filesystem. An entry whose
    /// file is missing or malformed is logged and dropped; the rest of the
    /// map still loads.
    pub fn resolve(
        fs: &LayeredFs,
        owning_extension: &str,
        map_rel_path: &Path,
        mut map: TileMap,
    ) -> Self {
        let map_name = map_rel_path.display().to_string();
        let map_dir = map_rel_path.parent().unwrap_or_else(|| Path::new(""));

        let mut resolved = Vec::<MapTileset>::with_capacity(map.tilesets.len());
        for mut tileset in map.tilesets.drain(..) {
            let Some(source) = tileset.source.take() else {
                resolved.push(tileset);
                continue;
            };
            let rel = normalize_rel_path(&map_dir.join(&source));
            let Some(tileset_path) = fs.resolve_file_for_extension(owning_extension, &rel) else {
                warn!(
                    map = %map_name,
                    source = %source,
                    "tileset_file_missing"
                );
                continue;
            };
            match load_tileset_data(&tileset_path) {
                Ok(data) => {
                    tileset.data = data;
                    resolved.push(tileset);
                }
                Err(error) => {
                    warn!(
                        map = %map_name,
                        path = %tileset_path.display(),
                        error = %error,
                        "tileset_file_unreadable"
                    );
                }
            }
        }
        resolved.sort_by_key(|tileset| tileset.firstgid);
        map.tilesets = resolved;

        Self {
            name: map_name,
            owning_extension: owning_extension.to_string(),
            map,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owning_extension(&self) -> &str {
        &self.owning_extension
    }

    pub fn tile_map(&self) -> &TileMap {
        &self.map
    }

    pub fn layers(&self) -> &[MapLayer] {
        &self.map.layers
    }

    pub fn tileset_for_gid(&self, gid: u32) -> Result<&MapTileset, GidError> {
        self.map
            .tilesets
            .iter()
            .find(|tileset| tileset.contains_gid(gid))
            .ok_or(GidError::NoTileset {
                gid,
                map: self.name.clone(),
            })
    }

    /// Maps a global id to the owning tileset's tile id.
    pub fn local_id(&self, gid: u32) -> Result<u32, GidError> {
        let tileset = self.tileset_for_gid(gid)?;
        Ok(gid - tileset.firstgid)
    }

    /// Per-tile metadata as a name→value map, or an empty map when the tile
    /// carries none. Empty-string values are pruned: Tiled emits them for
    /// unset fields and they must not shadow config defaults.
    pub fn tile_data(&self, gid: u32) -> Result<Map<String, Value>, GidError> {
        let tileset = self.tileset_for_gid(gid)?;
        let local = gid - tileset.firstgid;
        let Some(tile) = tileset.data.tile(local) else {
            return Ok(Map::new());
        };
        let mut data = Map::new();
        for property in &tile.properties {
            if matches!(&property.value, Value::String(text) if text.is_empty()) {
                continue;
            }
            data.insert(property.name.clone(), property.value.clone());
        }
        Ok(data)
    }

    /// The rendering image identifier for a gid: the tileset's single image,
    /// or the specific tile's own image for collection tilesets.
    pub fn image_key_for_gid(&self, gid: u32) -> Result<String, GidError> {
        let tileset = self.tileset_for_gid(gid)?;
        if let Some(image) = &tileset.data.image {
            return Ok(image_key(image));
        }
        let local = gid - tileset.firstgid;
        tileset
            .data
            .tile(local)
            .and_then(|tile| tile.image.as_deref())
            .map(image_key)
            .ok_or_else(|| GidError::NoImage {
                gid,
                tileset: tileset.data.name.clone(),
                map: self.name.clone(),
            })
    }

    pub fn tile_def(&self, gid: u32) -> Result<Option<&TileDef>, GidError> {
        let tileset = self.tileset_for_gid(gid)?;
        Ok(tileset.data.tile(gid - tileset.firstgid))
    }
}

/// Holds the level's resolved map. Loading problems are recoverable: the
/// service logs and stays empty so the level can still partially render.
#[derive(Debug, Clone, Default)]
pub struct MapService {
    current: Option<ResolvedMap>,
}

impl MapService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_map_file(&mut self, fs: &LayeredFs, owning_extension: &str, rel_path: &Path) {
        self.current = None;
        let Some(map_path) = fs.resolve_file_for_extension(owning_extension, rel_path) else {
            warn!(path = %rel_path.display(), "map_file_missing");
            return;
        };
        let raw = match std::fs::read_to_string(&map_path) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(path = %map_path.display(), error = %error, "map_file_unreadable");
                return;
            }
        };
        let map = match serde_json::from_str::<TileMap>(&raw) {
            Ok(map) => map,
            Err(error) => {
                warn!(path = %map_path.display(), error = %error, "map_parse_failed");
                return;
            }
        };
        self.current = Some(ResolvedMap::resolve(fs, owning_extension, rel_path, map));
    }

    pub fn map(&self) -> Option<&ResolvedMap> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

fn load_tileset_data(path: &Path) -> Result<TilesetData, std::io::Error> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(std::io::Error::other)
}

fn image_key(image_path: &str) -> String {
    Path::new(image_path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| image_path.to_string())
}

/// Lexically folds `.` and `..` components so tileset sources written
/// relative to the map directory become extension-relative lookups.
fn normalize_rel_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::content::{ExtensionRequest, LayeredFs};
    use crate::QuestPaths;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn layered_fs_with_base(temp: &TempDir) -> LayeredFs {
        let root = temp.path();
        let paths = QuestPaths {
            root: root.to_path_buf(),
            bundled_extensions_dir: root.join("extensions"),
            workshop_dir: root.join("workshop"),
        };
        fs::create_dir_all(paths.bundled_extensions_dir.join("base")).expect("base");
        LayeredFs::from_request(
            &paths,
            &ExtensionRequest {
                current_extension: Some("base".to_string()),
                enabled_extensions: Vec::new(),
            },
        )
        .expect("layered fs")
    }

    fn two_tileset_map(temp: &TempDir) -> ResolvedMap {
        let layered = layered_fs_with_base(temp);
        let base = temp.path().join("extensions/base");
        write_file(
            &base.join("tilesets/extra.json"),
            &json!({
                "name": "extra",
                "tiles": [
                    {
                        "id": 0,
                        "image": "art/chest.png",
                        "properties": [
                            {"name": "interaction", "type": "string", "value": "open"},
                            {"name": "sound", "type": "string", "value": ""}
                        ]
                    },
                    {"id": 2, "image": "art/door.png"}
                ]
            })
            .to_string(),
        );
        write_file(
            &base.join("maps/dock.json"),
            &json!({
                "width": 4, "height": 4, "tilewidth": 16, "tileheight": 16,
                "layers": [],
                "tilesets": [
                    {"firstgid": 1, "image": "art/ground.png", "tilecount": 10, "name": "ground"},
                    {"firstgid": 11, "source": "../tilesets/extra.json"}
                ]
            })
            .to_string(),
        );
        let mut service = MapService::new();
        service.register_map_file(&layered, "base", Path::new("maps/dock.json"));
        service.map().expect("resolved map").clone()
    }

    #[test]
    fn resolution_inlines_external_tilesets_and_clears_source() {
        let temp = TempDir::new().expect("tempdir");
        let map = two_tileset_map(&temp);

        assert_eq!(map.tile_map().tilesets.len(), 2);
        assert!(map
            .tile_map()
            .tilesets
            .iter()
            .all(|tileset| tileset.source.is_none()));
        assert_eq!(map.tile_map().tilesets[1].data.name, "extra");
    }

    #[test]
    fn gid_maps_to_tileset_relative_id() {
        let temp = TempDir::new().expect("tempdir");
        let map = two_tileset_map(&temp);

        assert_eq!(map.local_id(1).expect("gid 1"), 0);
        assert_eq!(map.local_id(7).expect("gid 7"), 6);
        assert_eq!(map.local_id(11).expect("gid 11"), 0);
        assert_eq!(map.local_id(13).expect("gid 13"), 2);
    }

    #[test]
    fn gid_outside_every_tileset_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let map = two_tileset_map(&temp);

        // gid 12 is inside the collection tileset's firstgid span but its
        // local id 1 is not a listed tile.
        assert!(matches!(
            map.tileset_for_gid(12),
            Err(GidError::NoTileset { gid: 12, .. })
        ));
        assert!(matches!(
            map.tileset_for_gid(99),
            Err(GidError::NoTileset { gid: 99, .. })
        ));
    }

    #[test]
    fn tile_data_returns_external_tile_properties_with_empty_strings_pruned() {
        let temp = TempDir::new().expect("tempdir");
        let map = two_tileset_map(&temp);

        let data = map.tile_data(11).expect("tile data");
        assert_eq!(data.get("interaction"), Some(&json!("open")));
        assert!(!data.contains_key("sound"));
    }

    #[test]
    fn tile_without_metadata_yields_empty_map() {
        let temp = TempDir::new().expect("tempdir");
        let map = two_tileset_map(&temp);
        assert!(map.tile_data(3).expect("tile data").is_empty());
    }

    #[test]
    fn image_key_prefers_tileset_image_then_tile_image() {
        let temp = TempDir::new().expect("tempdir");
        let map = two_tileset_map(&temp);

        assert_eq!(map.image_key_for_gid(5).expect("key"), "ground");
        assert_eq!(map.image_key_for_gid(11).expect("key"), "chest");
        assert_eq!(map.image_key_for_gid(13).expect("key"), "door");
    }

    #[test]
    fn missing_map_file_leaves_service_empty() {
        let temp = TempDir::new().expect("tempdir");
        let layered = layered_fs_with_base(&temp);
        let mut service = MapService::new();
        service.register_map_file(&layered, "base", Path::new("maps/nowhere.json"));
        assert!(service.map().is_none());
    }

    #[test]
    fn malformed_map_json_leaves_service_empty() {
        let temp = TempDir::new().expect("tempdir");
        let layered = layered_fs_with_base(&temp);
        write_file(
            &temp.path().join("extensions/base/maps/broken.json"),
            "{ not json",
        );
        let mut service = MapService::new();
        service.register_map_file(&layered, "base", Path::new("maps/broken.json"));
        assert!(service.map().is_none());
    }

    #[test]
    fn missing_external_tileset_is_dropped_but_map_loads() {
        let temp = TempDir::new().expect("tempdir");
        let layered = layered_fs_with_base(&temp);
        write_file(
            &temp.path().join("extensions/base/maps/dock.json"),
            &json!({
                "width": 1, "height": 1, "tilewidth": 16, "tileheight": 16,
                "layers": [],
                "tilesets": [
                    {"firstgid": 1, "image": "art/ground.png", "tilecount": 4},
                    {"firstgid": 5, "source": "../tilesets/ghost.json"}
                ]
            })
            .to_string(),
        );
        let mut service = MapService::new();
        service.register_map_file(&layered, "base", Path::new("maps/dock.json"));
        let map = service.map().expect("map");
        assert_eq!(map.tile_map().tilesets.len(), 1);
        assert!(matches!(
            map.tileset_for_gid(5),
            Err(GidError::NoTileset { .. })
        ));
    }

    #[test]
    fn tilesets_are_sorted_by_ascending_firstgid() {
        let temp = TempDir::new().expect("tempdir");
        let layered = layered_fs_with_base(&temp);
        write_file(
            &temp.path().join("extensions/base/maps/dock.json"),
            &json!({
                "width": 1, "height": 1, "tilewidth": 16, "tileheight": 16,
                "layers": [],
                "tilesets": [
                    {"firstgid": 9, "image": "b.png", "tilecount": 4},
                    {"firstgid": 1, "image": "a.png", "tilecount": 8}
                ]
            })
            .to_string(),
        );
        let mut service = MapService::new();
        service.register_map_file(&layered, "base", Path::new("maps/dock.json"));
        let map = service.map().expect("map");
        let firstgids = map
            .tile_map()
            .tilesets
            .iter()
            .map(|tileset| tileset.firstgid)
            .collect::<Vec<_>>();
        assert_eq!(firstgids, vec![1, 9]);
    }

    #[test]
    fn tileset_lookup_falls_through_to_other_extensions() {
        let temp = TempDir::new().expect("tempdir");
        let root = temp.path();
        let paths = QuestPaths {
            root: root.to_path_buf(),
            bundled_extensions_dir: root.join("extensions"),
            workshop_dir: root.join("workshop"),
        };
        fs::create_dir_all(paths.bundled_extensions_dir.join("base")).expect("base");
        fs::create_dir_all(paths.workshop_dir.join("pirates")).expect("pirates");
        // The map lives in "pirates" but references a tileset only "base" has.
        write_file(
            &paths.bundled_extensions_dir.join("base/tilesets/shared.json"),
            &json!({"name": "shared", "image": "shared.png", "tilecount": 4}).to_string(),
        );
        write_file(
            &paths.workshop_dir.join("pirates/maps/cove.json"),
            &json!({
                "width": 1, "height": 1, "tilewidth": 16, "tileheight": 16,
                "layers": [],
                "tilesets": [{"firstgid": 1, "source": "../tilesets/shared.json"}]
            })
            .to_string(),
        );
        let layered = LayeredFs::from_request(
            &paths,
            &ExtensionRequest {
                current_extension: Some("pirates".to_string()),
                enabled_extensions: Vec::new(),
            },
        )
        .expect("layered fs");

        let mut service = MapService::new();
        service.register_map_file(&layered, "pirates", Path::new("maps/cove.json"));
        let map = service.map().expect("map");
        assert_eq!(map.tile_map().tilesets[0].data.name, "shared");
        assert_eq!(map.owning_extension(), "pirates");
    }

    #[test]
    fn normalize_rel_path_folds_parent_components() {
        assert_eq!(
            normalize_rel_path(Path::new("maps/../tilesets/extra.json")),
            PathBuf::from("tilesets/extra.json")
        );
        assert_eq!(
            normalize_rel_path(Path::new("maps/./dock.json")),
            PathBuf::from("maps/dock.json")
        );
    }
}
