use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod content;
pub mod context;
pub mod events;
pub mod fsm;
pub mod geom;
pub mod tiled;

pub use content::{
    discover_extension_sources, ExtensionPlanError, ExtensionRequest, ExtensionSource, LayeredFs,
};
pub use context::{ContextStore, COMBINED_CONTEXT_EVENT};
pub use events::{
    EventBus, Subscription, LEVEL_DID_LOAD, LEVEL_WILL_UNLOAD, MAP_DID_LOAD,
    OBJECT_UPDATE_INTERACTABLE,
};
pub use fsm::{StateDef, StateMachine};
pub use geom::{Rect, Vec2};
pub use tiled::{GidError, MapLayer, MapObject, MapService, MapTileset, ResolvedMap, TileMap};

pub const ROOT_ENV_VAR: &str = "QUEST_ROOT";

#[derive(Debug, Clone)]
pub struct QuestPaths {
    pub root: PathBuf,
    /// Extensions shipped with the game, one directory per extension id.
    pub bundled_extensions_dir: PathBuf,
    /// Player-installed extensions, enabled by id per session.
    pub workshop_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "QUEST_ROOT is set but does not point to a valid game root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or extensions/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect game root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or extensions/.\n\
Set {env_var} explicitly, for example:\n\
PowerShell: $env:{env_var}=\"C:\\path\\to\\quest\"\n\
Bash/zsh: export {env_var}=\"/path/to/quest\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_quest_paths() -> Result<QuestPaths, StartupError> {
    let root = resolve_root()?;
    let bundled_extensions_dir = root.join("extensions");
    let workshop_dir = root.join("workshop");

    Ok(QuestPaths {
        root,
        bundled_extensions_dir,
        workshop_dir,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_root_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_root_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_root_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_extensions = path.join("extensions").is_dir();

    cargo_toml && (has_crates || has_extensions)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_marker_requires_cargo_toml() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_root_marker(&cwd.join("definitely_not_a_marker")));
    }
}
