//! Content validation for levels: loads a level's map, tilesets, and entity
//! configs through the same code paths the runtime uses, and reports every
//! content error instead of degrading the way the runtime does.

use std::path::{Path, PathBuf};

use quest::{EntityConfigService, EntityTypeRegistry, FALLBACK_TYPE};
use runtime::content::{ExtensionRequest, LayeredFs};
use runtime::tiled::TileMap;
use runtime::{resolve_quest_paths, QuestPaths, ResolvedMap};

#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    pub root: Option<PathBuf>,
    pub current_extension: Option<String>,
    pub enabled_extensions: Vec<String>,
    pub level: String,
}

#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub level: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub tilesets_checked: usize,
    pub objects_checked: usize,
    pub configs_checked: usize,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_clean() {
            "clean"
        } else {
            "broken"
        }
    }

    pub fn render_human_readable(&self) -> String {
        let mut output = format!(
            "level={} status={} tilesets={} objects={} configs={} errors={} warnings={}",
            self.level,
            self.status_label(),
            self.tilesets_checked,
            self.objects_checked,
            self.configs_checked,
            self.errors.len(),
            self.warnings.len()
        );
        for error in &self.errors {
            output.push('\n');
            output.push_str(&format!("error: {error}"));
        }
        for warning in &self.warnings {
            output.push('\n');
            output.push_str(&format!("warning: {warning}"));
        }
        output
    }
}

/// Startup problems (bad root, unknown extension) are `Err`; content
/// problems land in the report.
pub fn run_check(options: &CheckOptions) -> Result<CheckReport, String> {
    let paths = resolve_paths(options)?;
    let layered = LayeredFs::from_request(
        &paths,
        &ExtensionRequest {
            current_extension: options.current_extension.clone(),
            enabled_extensions: options.enabled_extensions.clone(),
        },
    )
    .map_err(|error| error.to_string())?;

    let owning_extension = options
        .current_extension
        .clone()
        .or_else(|| {
            layered
                .sources()
                .first()
                .map(|source| source.extension_id.clone())
        })
        .ok_or_else(|| "no extensions found; nothing to validate against".to_string())?;

    let mut report = CheckReport {
        level: options.level.clone(),
        ..CheckReport::default()
    };

    check_entity_configs(&layered, &mut report);
    check_map(&layered, &owning_extension, options, &mut report);

    Ok(report)
}

fn resolve_paths(options: &CheckOptions) -> Result<QuestPaths, String> {
    match &options.root {
        Some(root) => Ok(QuestPaths {
            root: root.clone(),
            bundled_extensions_dir: root.join("extensions"),
            workshop_dir: root.join("workshop"),
        }),
        None => resolve_quest_paths().map_err(|error| error.to_string()),
    }
}

fn check_entity_configs(layered: &LayeredFs, report: &mut CheckReport) {
    let mut service = EntityConfigService::new();
    for entry in layered.list_dir("objects") {
        if !entry.is_dir {
            continue;
        }
        let config_path = entry.path.join("config.json");
        if !config_path.is_file() {
            report.warnings.push(format!(
                "entity type '{}' has no config.json at {}",
                entry.name,
                entry.path.display()
            ));
            continue;
        }
        report.configs_checked += 1;
        if let Err(error) = service.register_from_file(&entry.name, &config_path) {
            report.errors.push(error.to_string());
        }
    }
}

fn check_map(
    layered: &LayeredFs,
    owning_extension: &str,
    options: &CheckOptions,
    report: &mut CheckReport,
) {
    let level_dir = Path::new("levels").join(&options.level);
    if layered.list_dir(&level_dir).is_empty() {
        report.errors.push(format!(
            "level '{}' does not exist in any extension",
            options.level
        ));
        return;
    }

    let map_rel = level_dir.join("map.json");
    let Some(map_path) = layered.resolve_file_for_extension(owning_extension, &map_rel) else {
        report
            .errors
            .push(format!("map file missing: {}", map_rel.display()));
        return;
    };
    let raw = match std::fs::read_to_string(&map_path) {
        Ok(raw) => raw,
        Err(error) => {
            report
                .errors
                .push(format!("map unreadable at {}: {error}", map_path.display()));
            return;
        }
    };
    let parsed = match serde_json::from_str::<TileMap>(&raw) {
        Ok(parsed) => parsed,
        Err(error) => {
            report
                .errors
                .push(format!("map malformed at {}: {error}", map_path.display()));
            return;
        }
    };

    let total_before = parsed.tilesets.len();
    let map = ResolvedMap::resolve(layered, owning_extension, &map_rel, parsed);
    report.tilesets_checked = total_before;
    let dropped = total_before - map.tile_map().tilesets.len();
    if dropped > 0 {
        report.errors.push(format!(
            "{dropped} external tileset(s) in {} could not be resolved",
            map_rel.display()
        ));
    }

    let registry = EntityTypeRegistry::default();
    for layer in map.layers() {
        if !layer.is_object_layer() {
            continue;
        }
        for object in &layer.objects {
            report.objects_checked += 1;
            if let Some(gid) = object.gid {
                if let Err(error) = map.tileset_for_gid(gid) {
                    report.errors.push(format!(
                        "object '{}' in layer '{}': {error}",
                        object.name, layer.name
                    ));
                }
            }
            let trimmed = object.object_type.trim();
            let type_key = if trimmed.is_empty() {
                if object.is_zero_sized() {
                    "point"
                } else {
                    FALLBACK_TYPE
                }
            } else {
                trimmed
            };
            if !registry.is_registered(type_key) {
                report.warnings.push(format!(
                    "object '{}' has unknown type '{}'; it will degrade to {}",
                    object.name, type_key, FALLBACK_TYPE
                ));
            }
            let falls_back = !registry.is_registered(type_key);
            if (type_key == FALLBACK_TYPE || falls_back) && object.gid.is_none() {
                report.errors.push(format!(
                    "object '{}' in layer '{}' is a {} without a gid and cannot render",
                    object.name, layer.name, FALLBACK_TYPE
                ));
            }
        }
    }
}
