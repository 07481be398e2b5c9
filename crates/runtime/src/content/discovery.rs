use std::collections::HashSet;
use std::path::PathBuf;

use crate::QuestPaths;

use super::ExtensionPlanError;

/// One extension directory, in file-lookup order: the current extension
/// first, then enabled workshop extensions, then bundled extensions.
#[derive(Debug, Clone)]
pub struct ExtensionSource {
    pub extension_id: String,
    pub lookup_index: u32,
    pub source_dir: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct ExtensionRequest {
    /// The extension the level being loaded belongs to, if any. Its files
    /// shadow every other layer.
    pub current_extension: Option<String>,
    pub enabled_extensions: Vec<String>,
}

pub fn discover_extension_sources(
    paths: &QuestPaths,
    request: &ExtensionRequest,
) -> Result<Vec<ExtensionSource>, ExtensionPlanError> {
    let mut seen = HashSet::<String>::new();
    let mut sources = Vec::<ExtensionSource>::new();

    if let Some(raw) = &request.current_extension {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ExtensionPlanError::EmptyExtensionId);
        }
        let dir = locate_extension_dir(paths, trimmed).ok_or_else(|| {
            ExtensionPlanError::CurrentExtensionMissing {
                extension_id: trimmed.to_string(),
                searched_dir: paths.workshop_dir.clone(),
            }
        })?;
        seen.insert(trimmed.to_string());
        sources.push(ExtensionSource {
            extension_id: trimmed.to_string(),
            lookup_index: 0,
            source_dir: dir,
        });
    }

    for raw in &request.enabled_extensions {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ExtensionPlanError::EmptyExtensionId);
        }
        if !seen.insert(trimmed.to_string()) {
            if Some(trimmed) == request.current_extension.as_deref().map(str::trim) {
                // The current extension may also appear in the enabled list;
                // it already occupies the front slot.
                continue;
            }
            return Err(ExtensionPlanError::DuplicateEnabledExtension {
                extension_id: trimmed.to_string(),
            });
        }
        let dir = locate_extension_dir(paths, trimmed).ok_or_else(|| {
            ExtensionPlanError::EnabledExtensionMissing {
                extension_id: trimmed.to_string(),
                searched_dir: paths.workshop_dir.clone(),
            }
        })?;
        sources.push(ExtensionSource {
            extension_id: trimmed.to_string(),
            lookup_index: sources.len() as u32,
            source_dir: dir,
        });
    }

    for (id, dir) in bundled_extension_dirs(paths)? {
        if !seen.insert(id.clone()) {
            continue;
        }
        sources.push(ExtensionSource {
            extension_id: id,
            lookup_index: sources.len() as u32,
            source_dir: dir,
        });
    }

    Ok(sources)
}

/// Workshop installs shadow bundled extensions with the same id.
fn locate_extension_dir(paths: &QuestPaths, extension_id: &str) -> Option<PathBuf> {
    let workshop = paths.workshop_dir.join(extension_id);
    if workshop.is_dir() {
        return Some(workshop);
    }
    let bundled = paths.bundled_extensions_dir.join(extension_id);
    if bundled.is_dir() {
        return Some(bundled);
    }
    None
}

fn bundled_extension_dirs(
    paths: &QuestPaths,
) -> Result<Vec<(String, PathBuf)>, ExtensionPlanError> {
    let root = &paths.bundled_extensions_dir;
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(root).map_err(|source| ExtensionPlanError::ReadDir {
        path: root.clone(),
        source,
    })?;
    let mut dirs = Vec::<(String, PathBuf)>::new();
    for entry in entries {
        let entry = entry.map_err(|source| ExtensionPlanError::ReadDir {
            path: root.clone(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::QuestPaths;

    fn setup_paths(root: &std::path::Path) -> QuestPaths {
        let bundled = root.join("extensions");
        let workshop = root.join("workshop");
        fs::create_dir_all(&bundled).expect("create extensions");
        fs::create_dir_all(&workshop).expect("create workshop");
        QuestPaths {
            root: root.to_path_buf(),
            bundled_extensions_dir: bundled,
            workshop_dir: workshop,
        }
    }

    #[test]
    fn current_then_enabled_then_bundled_order() {
        let temp = TempDir::new().expect("tempdir");
        let paths = setup_paths(temp.path());
        fs::create_dir_all(paths.bundled_extensions_dir.join("base")).expect("base");
        fs::create_dir_all(paths.bundled_extensions_dir.join("town")).expect("town");
        fs::create_dir_all(paths.workshop_dir.join("pirates")).expect("pirates");

        let sources = discover_extension_sources(
            &paths,
            &ExtensionRequest {
                current_extension: Some("town".to_string()),
                enabled_extensions: vec!["pirates".to_string()],
            },
        )
        .expect("discover");

        let ids = sources
            .iter()
            .map(|source| source.extension_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["town", "pirates", "base"]);
        assert_eq!(sources[0].lookup_index, 0);
        assert_eq!(sources[1].lookup_index, 1);
        assert_eq!(sources[2].lookup_index, 2);
    }

    #[test]
    fn missing_enabled_extension_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let paths = setup_paths(temp.path());
        let err = discover_extension_sources(
            &paths,
            &ExtensionRequest {
                current_extension: None,
                enabled_extensions: vec!["ghost".to_string()],
            },
        )
        .expect_err("err");
        assert!(matches!(
            err,
            ExtensionPlanError::EnabledExtensionMissing { .. }
        ));
    }

    #[test]
    fn duplicate_enabled_extension_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let paths = setup_paths(temp.path());
        fs::create_dir_all(paths.workshop_dir.join("pirates")).expect("pirates");
        let err = discover_extension_sources(
            &paths,
            &ExtensionRequest {
                current_extension: None,
                enabled_extensions: vec!["pirates".to_string(), "pirates".to_string()],
            },
        )
        .expect_err("err");
        assert!(matches!(
            err,
            ExtensionPlanError::DuplicateEnabledExtension { .. }
        ));
    }

    #[test]
    fn current_extension_listed_as_enabled_keeps_front_slot() {
        let temp = TempDir::new().expect("tempdir");
        let paths = setup_paths(temp.path());
        fs::create_dir_all(paths.workshop_dir.join("pirates")).expect("pirates");
        let sources = discover_extension_sources(
            &paths,
            &ExtensionRequest {
                current_extension: Some("pirates".to_string()),
                enabled_extensions: vec!["pirates".to_string()],
            },
        )
        .expect("discover");
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].extension_id, "pirates");
    }

    #[test]
    fn workshop_install_shadows_bundled_extension_with_same_id() {
        let temp = TempDir::new().expect("tempdir");
        let paths = setup_paths(temp.path());
        fs::create_dir_all(paths.bundled_extensions_dir.join("town")).expect("bundled town");
        fs::create_dir_all(paths.workshop_dir.join("town")).expect("workshop town");

        let sources = discover_extension_sources(
            &paths,
            &ExtensionRequest {
                current_extension: None,
                enabled_extensions: vec!["town".to_string()],
            },
        )
        .expect("discover");
        assert_eq!(sources.len(), 1);
        assert!(sources[0].source_dir.starts_with(&paths.workshop_dir));
    }
}
