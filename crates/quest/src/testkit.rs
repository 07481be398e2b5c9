//! Shared test doubles: a recording render context, a canned collision
//! probe, and map fixtures.

use std::fs;
use std::path::Path;

use runtime::content::{ExtensionRequest, LayeredFs};
use runtime::{MapService, QuestPaths, Rect, ResolvedMap, Vec2};
use serde_json::json;
use tempfile::TempDir;

use crate::framework::{
    AnimationClip, Body, CollisionProbe, Contact, RenderContext, SpriteHandle, SpriteRequest,
    SpriteSheetRequest,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSprite {
    pub handle: SpriteHandle,
    pub image_key: String,
    pub position: Vec2,
    pub frame: u32,
    pub visible: bool,
    pub destroyed: bool,
}

#[derive(Default)]
pub struct RecordingRenderContext {
    next_handle: u64,
    pub sprites: Vec<RecordedSprite>,
    pub animations: Vec<(SpriteHandle, AnimationClip)>,
    pub played: Vec<(SpriteHandle, String)>,
    pub sheet_requests: Vec<SpriteSheetRequest>,
    pub debug_rects: Vec<Rect>,
}

impl RecordingRenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sprite(&self, handle: SpriteHandle) -> &RecordedSprite {
        self.sprites
            .iter()
            .find(|sprite| sprite.handle == handle)
            .expect("sprite exists")
    }

    fn sprite_mut(&mut self, handle: SpriteHandle) -> &mut RecordedSprite {
        self.sprites
            .iter_mut()
            .find(|sprite| sprite.handle == handle)
            .expect("sprite exists")
    }

    pub fn animation(&self, name: &str) -> Option<(SpriteHandle, &AnimationClip)> {
        self.animations
            .iter()
            .find(|(_, clip)| clip.name == name)
            .map(|(handle, clip)| (*handle, clip))
    }

    pub fn live_sprite_count(&self) -> usize {
        self.sprites.iter().filter(|sprite| !sprite.destroyed).count()
    }
}

impl RenderContext for RecordingRenderContext {
    fn create_sprite(&mut self, request: &SpriteRequest) -> SpriteHandle {
        let handle = SpriteHandle(self.next_handle);
        self.next_handle += 1;
        self.sprites.push(RecordedSprite {
            handle,
            image_key: request.image_key.clone(),
            position: request.position,
            frame: request.frame,
            visible: true,
            destroyed: false,
        });
        handle
    }

    fn destroy_sprite(&mut self, sprite: SpriteHandle) {
        self.sprite_mut(sprite).destroyed = true;
    }

    fn set_sprite_visible(&mut self, sprite: SpriteHandle, visible: bool) {
        self.sprite_mut(sprite).visible = visible;
    }

    fn set_sprite_position(&mut self, sprite: SpriteHandle, position: Vec2) {
        self.sprite_mut(sprite).position = position;
    }

    fn play_animation(&mut self, sprite: SpriteHandle, name: &str) {
        self.played.push((sprite, name.to_string()));
    }

    fn add_animation(&mut self, sprite: SpriteHandle, clip: &AnimationClip) {
        self.animations.push((sprite, clip.clone()));
    }

    fn queue_sprite_sheet(&mut self, request: &SpriteSheetRequest) {
        self.sheet_requests.push(request.clone());
    }

    fn sprite_bounds(&self, sprite: SpriteHandle) -> Rect {
        let sprite = self.sprite(sprite);
        Rect::new(sprite.position.x, sprite.position.y, 16.0, 16.0)
    }

    fn draw_debug_rect(&mut self, rect: Rect) {
        self.debug_rects.push(rect);
    }
}

#[derive(Default)]
pub struct StaticProbe {
    pub contacts: Vec<Contact>,
}

impl CollisionProbe for StaticProbe {
    fn contacts(&self, _body: &Body) -> Vec<Contact> {
        self.contacts.clone()
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, content).expect("write");
}

pub fn quest_paths(temp: &TempDir) -> QuestPaths {
    let root = temp.path();
    QuestPaths {
        root: root.to_path_buf(),
        bundled_extensions_dir: root.join("extensions"),
        workshop_dir: root.join("workshop"),
    }
}

pub fn base_layered_fs(temp: &TempDir) -> LayeredFs {
    let paths = quest_paths(temp);
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

/// A resolved map with an image tileset covering gids 1..=10 and a
/// collection tileset at firstgid 11 with tiles 0 ("chest") and 2 ("door").
pub fn map_with_collection_tileset(temp: &TempDir) -> ResolvedMap {
    let layered = base_layered_fs(temp);
    write_file(
        &temp.path().join("extensions/base/maps/dock.json"),
        &json!({
            "width": 8, "height": 8, "tilewidth": 16, "tileheight": 16,
            "layers": [],
            "tilesets": [
                {"firstgid": 1, "image": "art/ground.png", "tilecount": 10, "name": "ground"},
                {
                    "firstgid": 11,
                    "name": "props",
                    "tiles": [
                        {
                            "id": 0,
                            "image": "art/chest.png",
                            "properties": [
                                {"name": "interaction", "type": "string", "value": "open"},
                                {"name": "range", "type": "int", "value": 32}
                            ]
                        },
                        {"id": 2, "image": "art/door.png"}
                    ]
                }
            ]
        })
        .to_string(),
    );
    let mut service = MapService::new();
    service.register_map_file(&layered, "base", Path::new("maps/dock.json"));
    service.map().expect("resolved map").clone()
}
