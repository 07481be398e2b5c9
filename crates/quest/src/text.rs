use std::collections::HashMap;
use std::path::Path;

use runtime::content::LayeredFs;
use tracing::{debug, warn};

/// Display lines for interactable entities, loaded from a level's
/// `interactions.json` (entity name → lines). A missing file is normal; a
/// malformed one is logged and ignored.
#[derive(Debug, Clone, Default)]
pub struct InteractionText {
    entries: HashMap<String, Vec<String>>,
}

impl InteractionText {
    pub fn load(fs: &LayeredFs, owning_extension: &str, rel_path: &Path) -> Self {
        let Some(path) = fs.resolve_file_for_extension(owning_extension, rel_path) else {
            debug!(path = %rel_path.display(), "interaction_text_absent");
            return Self::default();
        };
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "interaction_text_unreadable");
                return Self::default();
            }
        };
        match serde_json::from_str::<HashMap<String, Vec<String>>>(&raw) {
            Ok(entries) => Self { entries },
            Err(error) => {
                warn!(path = %path.display(), error = %error, "interaction_text_malformed");
                Self::default()
            }
        }
    }

    pub fn lines_for(&self, entity_name: &str) -> Option<&[String]> {
        self.entries.get(entity_name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
