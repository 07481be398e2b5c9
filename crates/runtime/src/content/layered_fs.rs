use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::QuestPaths;

use super::{discover_extension_sources, ExtensionPlanError, ExtensionRequest, ExtensionSource};

/// A directory entry resolved through the extension layers. `path` points at
/// the highest-precedence layer that contains the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Read-only view over the extension search order. Lookups return `None`
/// for absent resources; absence is an expected condition, not an error.
#[derive(Debug, Clone, Default)]
pub struct LayeredFs {
    sources: Vec<ExtensionSource>,
}

impl LayeredFs {
    pub fn new(sources: Vec<ExtensionSource>) -> Self {
        Self { sources }
    }

    pub fn from_request(
        paths: &QuestPaths,
        request: &ExtensionRequest,
    ) -> Result<Self, ExtensionPlanError> {
        Ok(Self::new(discover_extension_sources(paths, request)?))
    }

    pub fn sources(&self) -> &[ExtensionSource] {
        &self.sources
    }

    /// First layer containing `rel` wins.
    pub fn resolve_file(&self, rel: impl AsRef<Path>) -> Option<PathBuf> {
        let rel = rel.as_ref();
        self.sources.iter().find_map(|source| {
            let candidate = source.source_dir.join(rel);
            candidate.is_file().then_some(candidate)
        })
    }

    /// Like [`resolve_file`](Self::resolve_file), but the owning extension's
    /// layer is consulted first. Tileset `source` references resolve this way
    /// so a map always finds its sibling tileset before any override.
    pub fn resolve_file_for_extension(
        &self,
        extension_id: &str,
        rel: impl AsRef<Path>,
    ) -> Option<PathBuf> {
        let rel = rel.as_ref();
        if let Some(owner) = self
            .sources
            .iter()
            .find(|source| source.extension_id == extension_id)
        {
            let candidate = owner.source_dir.join(rel);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        self.resolve_file(rel)
    }

    /// De-duplicated union of directory entries across all layers, sorted by
    /// name. An entry present in several layers resolves to the first one.
    pub fn list_dir(&self, rel: impl AsRef<Path>) -> Vec<DirEntry> {
        let rel = rel.as_ref();
        let mut seen = HashSet::<String>::new();
        let mut entries = Vec::<DirEntry>::new();
        for source in &self.sources {
            let dir = source.source_dir.join(rel);
            if !dir.is_dir() {
                continue;
            }
            let read = match std::fs::read_dir(&dir) {
                Ok(read) => read,
                Err(error) => {
                    warn!(path = %dir.display(), error = %error, "list_dir_layer_unreadable");
                    continue;
                }
            };
            for entry in read.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !seen.insert(name.clone()) {
                    continue;
                }
                let path = entry.path();
                let is_dir = path.is_dir();
                entries.push(DirEntry { name, path, is_dir });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Layers lowest precedence first (bundled, then enabled, then current),
    /// for last-write-wins registration passes. The winner of a registration
    /// sweep in this order is always the layer `resolve_file` would pick.
    pub fn load_order(&self) -> impl Iterator<Item = &ExtensionSource> {
        self.sources.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::QuestPaths;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn setup(temp: &TempDir) -> (QuestPaths, LayeredFs) {
        let root = temp.path();
        let paths = QuestPaths {
            root: root.to_path_buf(),
            bundled_extensions_dir: root.join("extensions"),
            workshop_dir: root.join("workshop"),
        };
        fs::create_dir_all(paths.bundled_extensions_dir.join("base")).expect("base");
        fs::create_dir_all(paths.workshop_dir.join("pirates")).expect("pirates");
        let fs = LayeredFs::from_request(
            &paths,
            &ExtensionRequest {
                current_extension: Some("pirates".to_string()),
                enabled_extensions: Vec::new(),
            },
        )
        .expect("layered fs");
        (paths, fs)
    }

    #[test]
    fn resolve_file_prefers_current_extension() {
        let temp = TempDir::new().expect("tempdir");
        let (paths, layered) = setup(&temp);
        write_file(
            &paths.bundled_extensions_dir.join("base/maps/dock.json"),
            "base",
        );
        write_file(&paths.workshop_dir.join("pirates/maps/dock.json"), "mod");

        let resolved = layered.resolve_file("maps/dock.json").expect("resolved");
        assert!(resolved.starts_with(&paths.workshop_dir));
    }

    #[test]
    fn resolve_file_returns_none_for_absent_resource() {
        let temp = TempDir::new().expect("tempdir");
        let (_, layered) = setup(&temp);
        assert_eq!(layered.resolve_file("maps/nowhere.json"), None);
    }

    #[test]
    fn resolve_file_for_extension_checks_owner_first() {
        let temp = TempDir::new().expect("tempdir");
        let (paths, layered) = setup(&temp);
        write_file(
            &paths.bundled_extensions_dir.join("base/tilesets/town.json"),
            "base",
        );
        write_file(
            &paths.workshop_dir.join("pirates/tilesets/town.json"),
            "pirates",
        );

        let owned = layered
            .resolve_file_for_extension("base", "tilesets/town.json")
            .expect("resolved");
        assert!(owned.starts_with(&paths.bundled_extensions_dir));
    }

    #[test]
    fn resolve_file_for_extension_falls_through_layers() {
        let temp = TempDir::new().expect("tempdir");
        let (paths, layered) = setup(&temp);
        write_file(
            &paths.workshop_dir.join("pirates/tilesets/shared.json"),
            "pirates",
        );

        let resolved = layered
            .resolve_file_for_extension("base", "tilesets/shared.json")
            .expect("resolved");
        assert!(resolved.starts_with(&paths.workshop_dir));
    }

    #[test]
    fn list_dir_unions_and_dedupes_by_first_layer() {
        let temp = TempDir::new().expect("tempdir");
        let (paths, layered) = setup(&temp);
        write_file(
            &paths.bundled_extensions_dir.join("base/objects/chest/config.json"),
            "{}",
        );
        write_file(
            &paths.bundled_extensions_dir.join("base/objects/door/config.json"),
            "{}",
        );
        write_file(
            &paths.workshop_dir.join("pirates/objects/chest/config.json"),
            "{}",
        );

        let entries = layered.list_dir("objects");
        let names = entries
            .iter()
            .map(|entry| entry.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["chest", "door"]);
        let chest = entries.iter().find(|entry| entry.name == "chest").expect("chest");
        assert!(chest.path.starts_with(&paths.workshop_dir));
        assert!(chest.is_dir);
    }

    #[test]
    fn load_order_winner_matches_resolve_file() {
        let temp = TempDir::new().expect("tempdir");
        let (paths, layered) = setup(&temp);
        write_file(
            &paths.bundled_extensions_dir.join("base/objects/chest/config.json"),
            "base",
        );
        write_file(
            &paths.workshop_dir.join("pirates/objects/chest/config.json"),
            "pirates",
        );

        // Last write in load order...
        let mut last_writer = None;
        for source in layered.load_order() {
            if source.source_dir.join("objects/chest/config.json").is_file() {
                last_writer = Some(source.extension_id.clone());
            }
        }
        // ...is the same layer resolve_file picks.
        let resolved = layered
            .resolve_file("objects/chest/config.json")
            .expect("resolved");
        assert_eq!(last_writer.as_deref(), Some("pirates"));
        assert!(resolved.starts_with(&paths.workshop_dir));
    }
}
