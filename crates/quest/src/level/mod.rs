//! The level orchestrator: wires the map service, entity configs, factory,
//! and entity registry together and drives the frame phases
//! preload → create → update → post_update → render.
//!
//! Only `preload` performs filesystem IO; the remaining phases are
//! synchronous with the host framework's frame callback.

mod world_api;

pub use world_api::{DeferredQueue, EntitySelector, WorldAction, WorldCommand};

use std::path::PathBuf;
use std::rc::Rc;

use runtime::content::LayeredFs;
use runtime::tiled::TiledProperty;
use runtime::{
    ContextStore, EventBus, MapService, Rect, Subscription, LEVEL_DID_LOAD, LEVEL_WILL_UNLOAD,
    MAP_DID_LOAD,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{EntityConfigService, HookRegistry};
use crate::entity::{
    Entity, EntityFactory, EntityGuid, EntityService, EntityTypeRegistry, UpdateContext,
};
use crate::framework::{CollisionProbe, InputSnapshot, RenderContext};
use crate::text::InteractionText;

pub const OBJECTS_GROUP: &str = "objects";
pub const UI_GROUP: &str = "ui";
pub const PLAYER_TYPE: &str = "player";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub level: String,
    pub entry_point: String,
}

#[derive(Debug, Clone)]
pub struct LevelConfig {
    /// Level directory name under `levels/`.
    pub level_name: String,
    pub owning_extension: String,
    /// Which `player` marker spawns the player.
    pub player_entry_point: String,
    pub debug: bool,
}

impl LevelConfig {
    pub fn new(level_name: &str, owning_extension: &str) -> Self {
        Self {
            level_name: level_name.to_string(),
            owning_extension: owning_extension.to_string(),
            player_entry_point: "default".to_string(),
            debug: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level '{level}' does not exist in any extension (looked under {rel})")]
    LevelMissing { level: String, rel: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelPhase {
    New,
    Preloaded,
    Created,
    Unloaded,
}

type CreationCallback = Box<dyn FnOnce(&mut EntityService)>;

pub struct DynamicLevel {
    fs: LayeredFs,
    bus: Rc<EventBus>,
    context: Rc<ContextStore>,
    hooks: HookRegistry,
    maps: MapService,
    configs: EntityConfigService,
    registry: EntityTypeRegistry,
    entities: EntityService,
    text: InteractionText,
    config: LevelConfig,
    phase: LevelPhase,
    player: Option<EntityGuid>,
    transitioning: bool,
    pending_transition: Option<TransitionRequest>,
    event_subscriptions: Vec<Subscription>,
    deferred: DeferredQueue,
    elapsed_ms: f64,
    background_effect: Option<Box<dyn FnMut(f32)>>,
    on_creation_complete: Option<CreationCallback>,
}

impl DynamicLevel {
    pub fn new(
        fs: LayeredFs,
        bus: Rc<EventBus>,
        context: Rc<ContextStore>,
        config: LevelConfig,
    ) -> Self {
        Self {
            fs,
            bus,
            context,
            hooks: HookRegistry::new(),
            maps: MapService::new(),
            configs: EntityConfigService::new(),
            registry: EntityTypeRegistry::default(),
            entities: EntityService::new(),
            text: InteractionText::default(),
            config,
            phase: LevelPhase::New,
            player: None,
            transitioning: false,
            pending_transition: None,
            event_subscriptions: Vec::new(),
            deferred: DeferredQueue::default(),
            elapsed_ms: 0.0,
            background_effect: None,
            on_creation_complete: None,
        }
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn context(&self) -> &Rc<ContextStore> {
        &self.context
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    pub fn registry_mut(&mut self) -> &mut EntityTypeRegistry {
        &mut self.registry
    }

    pub fn entities(&self) -> &EntityService {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityService {
        &mut self.entities
    }

    pub fn map_service(&self) -> &MapService {
        &self.maps
    }

    pub fn config_service(&self) -> &EntityConfigService {
        &self.configs
    }

    pub fn interaction_text(&self) -> &InteractionText {
        &self.text
    }

    pub fn player(&self) -> Option<EntityGuid> {
        self.player
    }

    pub fn set_on_creation_complete(&mut self, callback: impl FnOnce(&mut EntityService) + 'static) {
        self.on_creation_complete = Some(Box::new(callback));
    }

    pub fn set_background_effect(&mut self, effect: impl FnMut(f32) + 'static) {
        self.background_effect = Some(Box::new(effect));
    }

    fn level_dir(&self) -> PathBuf {
        PathBuf::from("levels").join(&self.config.level_name)
    }

    /// Blocking resolution of everything the level needs: entity configs
    /// (layered, last write wins), the map and its tilesets, sprite-sheet
    /// load requests, and interaction text. Per-unit failures degrade the
    /// level; only a level that exists nowhere aborts.
    pub fn preload(&mut self, ctx: &mut dyn RenderContext) -> Result<(), LevelError> {
        let level_dir = self.level_dir();
        if self.fs.list_dir(&level_dir).is_empty() {
            return Err(LevelError::LevelMissing {
                level: self.config.level_name.clone(),
                rel: level_dir.display().to_string(),
            });
        }

        self.register_entity_configs();

        self.maps
            .register_map_file(&self.fs, &self.config.owning_extension, &level_dir.join("map.json"));
        if let Some(map) = self.maps.map() {
            self.bus.emit(
                MAP_DID_LOAD,
                &json!({
                    "map": map.name(),
                    "backgroundColor": map.tile_map().background_color(),
                }),
            );
        }

        for key in self.configs.keys() {
            if let Some(configurator) = self.configs.get(&key) {
                configurator.load_sprite_sheets(ctx);
            }
        }

        self.text = InteractionText::load(
            &self.fs,
            &self.config.owning_extension,
            &level_dir.join("interactions.json"),
        );

        self.bind_config_event_hooks();

        self.phase = LevelPhase::Preloaded;
        Ok(())
    }

    /// Connects each config's declared event handlers to the bus through the
    /// host's hook registry. Hooks must be registered before `preload`; a
    /// name with no registered hook is skipped with a warning so content can
    /// ship ahead of code.
    fn bind_config_event_hooks(&mut self) {
        for key in self.configs.keys() {
            let Some(configurator) = self.configs.get(&key) else {
                continue;
            };
            for (event_name, hook_name) in &configurator.config().data.events {
                match self.hooks.event_hook(hook_name) {
                    Some(hook) => {
                        let subscription = self
                            .bus
                            .subscribe(event_name, move |payload| hook(payload));
                        self.event_subscriptions.push(subscription);
                    }
                    None => {
                        warn!(key = %key, hook = %hook_name, "event_hook_unresolved");
                    }
                }
            }
        }
    }

    /// Sweeps `objects/<key>/config.json` across the extension layers in
    /// load order, so a later (higher-precedence) layer's registration
    /// overwrites an earlier one. A broken config skips that one entity
    /// type, never the level.
    fn register_entity_configs(&mut self) {
        let sources = self
            .fs
            .load_order()
            .map(|source| source.source_dir.clone())
            .collect::<Vec<_>>();
        for source_dir in sources {
            let objects_dir = source_dir.join("objects");
            if !objects_dir.is_dir() {
                continue;
            }
            let Ok(read) = std::fs::read_dir(&objects_dir) else {
                warn!(path = %objects_dir.display(), "objects_dir_unreadable");
                continue;
            };
            let mut keys = read
                .flatten()
                .filter(|entry| entry.path().is_dir())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect::<Vec<_>>();
            keys.sort();
            for key in keys {
                let config_path = objects_dir.join(&key).join("config.json");
                if !config_path.is_file() {
                    continue;
                }
                if let Err(error) = self.configs.register_from_file(&key, &config_path) {
                    warn!(key = %key, error = %error, "entity_config_skipped");
                }
            }
        }
    }

    /// Walks the resolved map: tile-layer groups in layer order, a lazy
    /// `objects` group on the first object layer, the `ui` group last so it
    /// always draws on top. Stamps layer-level z-indexes onto objects that
    /// don't carry their own and filters player markers down to the active
    /// entry point.
    pub fn create(&mut self, ctx: &mut dyn RenderContext) {
        if self.phase != LevelPhase::Preloaded {
            warn!(phase = ?self.phase, "create_called_out_of_phase");
            return;
        }

        let resolved = self.maps.map().cloned();
        if let Some(map) = &resolved {
            for layer in map.layers() {
                if layer.is_tile_layer() {
                    self.entities.create_group(&format!("tiles:{}", layer.name));
                }
            }

            let mut objects_group_created = false;
            for layer in map.layers() {
                if !layer.is_object_layer() {
                    continue;
                }
                if !objects_group_created {
                    self.entities.create_group(OBJECTS_GROUP);
                    objects_group_created = true;
                }
                let layer_z = layer.property("zIndex").and_then(Value::as_i64);
                for object in &layer.objects {
                    if object.object_type == PLAYER_TYPE
                        && object.name != self.config.player_entry_point
                    {
                        // Every other entry point is just a marker for some
                        // other way into this level.
                        continue;
                    }
                    let mut object = object.clone();
                    if let Some(z) = layer_z {
                        if object.property("zIndex").is_none() {
                            object
                                .properties
                                .push(TiledProperty::new("zIndex", json!(z)));
                        }
                    }
                    let factory = EntityFactory {
                        map: Some(map),
                        configs: &self.configs,
                        registry: &self.registry,
                    };
                    let guid = factory.build(ctx, &object, &mut self.entities);
                    if object.object_type == PLAYER_TYPE {
                        self.player = guid;
                    }
                }
            }
        }

        self.entities.create_group(UI_GROUP);
        self.phase = LevelPhase::Created;

        if let Some(callback) = self.on_creation_complete.take() {
            callback(&mut self.entities);
        }
        self.bus
            .emit(LEVEL_DID_LOAD, &json!({"level": self.config.level_name}));
        info!(
            level = %self.config.level_name,
            entities = self.entities.len(),
            "level_created"
        );
    }

    /// Per-frame advance: deferred script commands, entity updates (the
    /// player chief among them), the background effect, and the stable
    /// depth re-sort of the objects group.
    pub fn update(
        &mut self,
        ctx: &mut dyn RenderContext,
        input: &InputSnapshot,
        probe: &dyn CollisionProbe,
        dt_seconds: f32,
    ) {
        if self.phase != LevelPhase::Created {
            return;
        }
        self.elapsed_ms += f64::from(dt_seconds) * 1000.0;

        for command in self.deferred.drain_due(self.elapsed_ms) {
            self.apply_world_command(ctx, command);
        }

        for guid in self.entities.guids() {
            let Some(record) = self.entities.get_mut(guid) else {
                continue;
            };
            let mut update_ctx = UpdateContext {
                dt_seconds,
                input,
                render: &mut *ctx,
                probe,
                bus: &self.bus,
            };
            record.instance.update(&mut update_ctx);
        }

        if let Some(effect) = &mut self.background_effect {
            effect(dt_seconds);
        }

        self.entities.resort_group(OBJECTS_GROUP, &*ctx);
    }

    /// Runs after physics settles: realigns range finders and overlap
    /// trackers against the player's final position, then harvests
    /// transition areas (the latch absorbs repeats from consecutive
    /// frames).
    pub fn post_update(&mut self) {
        if self.phase != LevelPhase::Created {
            return;
        }
        let Some(player_bounds) = self.player_bounds() else {
            return;
        };

        for guid in self.entities.guids() {
            if Some(guid) == self.player {
                continue;
            }
            let Some(record) = self.entities.get_mut(guid) else {
                continue;
            };
            record.instance.observe_player(player_bounds, &self.bus);
        }

        let mut requested = None;
        for guid in self.entities.collection("transitions") {
            let Some(record) = self.entities.get(guid) else {
                continue;
            };
            if let Some((level, entry_point)) = record.instance.pending_transition() {
                requested = Some(TransitionRequest {
                    level: level.to_string(),
                    entry_point: entry_point.to_string(),
                });
                break;
            }
        }
        if let Some(request) = requested {
            self.request_transition(request);
        }
    }

    /// Debug-only overlay plus per-entity render hooks. Never mutates
    /// gameplay state.
    pub fn render(&mut self, ctx: &mut dyn RenderContext) {
        if self.phase != LevelPhase::Created {
            return;
        }
        for guid in self.entities.guids() {
            let Some(record) = self.entities.get_mut(guid) else {
                continue;
            };
            let core = record.instance.core();
            if let (Some(hook_name), Some(sprite)) = (core.render_hook.clone(), core.sprite) {
                match self.hooks.render_hook(&hook_name) {
                    Some(hook) => hook(ctx, sprite),
                    None => debug!(hook = %hook_name, "render_hook_unresolved"),
                }
            }
            record.instance.render(ctx);
        }
        if !self.config.debug {
            return;
        }
        for record in self.entities.all() {
            ctx.draw_debug_rect(record.instance.core().bounds());
        }
    }

    fn player_bounds(&self) -> Option<Rect> {
        let guid = self.player?;
        let record = self.entities.get(guid)?;
        Some(record.instance.core().bounds())
    }

    /// Latches the first request; duplicates (a transition area firing on
    /// consecutive frames, a script racing the player) coalesce into the
    /// in-flight one. Returns whether the request was accepted.
    pub fn request_transition(&mut self, request: TransitionRequest) -> bool {
        if self.transitioning {
            return false;
        }
        self.transitioning = true;
        info!(
            level = %request.level,
            entry_point = %request.entry_point,
            "level_transition_requested"
        );
        self.pending_transition = Some(request);
        true
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    /// The host takes the pending request, fully preloads the next level,
    /// and only then calls [`unload`](Self::unload) on this one, so no frame
    /// observes a half-built world.
    pub fn take_pending_transition(&mut self) -> Option<TransitionRequest> {
        self.pending_transition.take()
    }

    /// Tears the level down: announces the unload, then destroys every
    /// entity along with its visual state.
    pub fn unload(&mut self, ctx: &mut dyn RenderContext) {
        self.bus
            .emit(LEVEL_WILL_UNLOAD, &json!({"level": self.config.level_name}));
        self.entities.destroy_all(|_| true, ctx);
        for subscription in self.event_subscriptions.drain(..) {
            self.bus.unsubscribe(subscription);
        }
        self.player = None;
        self.phase = LevelPhase::Unloaded;
        info!(level = %self.config.level_name, "level_unloaded");
    }

    pub fn show_entities(
        &mut self,
        ctx: &mut dyn RenderContext,
        selector: EntitySelector,
        delay_ms: Option<f64>,
    ) {
        self.schedule_or_apply(
            ctx,
            WorldCommand {
                action: WorldAction::Show,
                selector,
            },
            delay_ms,
        );
    }

    pub fn hide_entities(
        &mut self,
        ctx: &mut dyn RenderContext,
        selector: EntitySelector,
        delay_ms: Option<f64>,
    ) {
        self.schedule_or_apply(
            ctx,
            WorldCommand {
                action: WorldAction::Hide,
                selector,
            },
            delay_ms,
        );
    }

    pub fn destroy_entities(
        &mut self,
        ctx: &mut dyn RenderContext,
        selector: EntitySelector,
        delay_ms: Option<f64>,
    ) {
        self.schedule_or_apply(
            ctx,
            WorldCommand {
                action: WorldAction::Destroy,
                selector,
            },
            delay_ms,
        );
    }

    pub fn for_each_entities(
        &mut self,
        ctx: &mut dyn RenderContext,
        selector: EntitySelector,
        visit: Rc<dyn Fn(&mut dyn Entity)>,
        delay_ms: Option<f64>,
    ) {
        self.schedule_or_apply(
            ctx,
            WorldCommand {
                action: WorldAction::ForEach(visit),
                selector,
            },
            delay_ms,
        );
    }

    fn schedule_or_apply(
        &mut self,
        ctx: &mut dyn RenderContext,
        command: WorldCommand,
        delay_ms: Option<f64>,
    ) {
        match delay_ms {
            Some(delay) => self.deferred.push(self.elapsed_ms + delay, command),
            None => self.apply_world_command(ctx, command),
        }
    }

    fn apply_world_command(&mut self, ctx: &mut dyn RenderContext, command: WorldCommand) {
        let guids = self
            .entities
            .guids_where(|record| command.selector.matches(record));
        match command.action {
            WorldAction::Show | WorldAction::Hide => {
                let visible = matches!(command.action, WorldAction::Show);
                for guid in guids {
                    let Some(record) = self.entities.get_mut(guid) else {
                        continue;
                    };
                    record.instance.core_mut().visible = visible;
                    for handle in record.instance.core().sprite_handles() {
                        ctx.set_sprite_visible(handle, visible);
                    }
                }
            }
            WorldAction::Destroy => {
                for guid in guids {
                    self.entities.destroy(guid, ctx);
                }
            }
            WorldAction::ForEach(visit) => {
                for guid in guids {
                    let Some(record) = self.entities.get_mut(guid) else {
                        continue;
                    };
                    visit(&mut *record.instance);
                }
            }
        }
    }
}
