use std::fs;
use std::path::{Path, PathBuf};

use crate::board;
use crate::catalog::{self, WordCatalog};

/// Resolves a path relative to the config directory.
fn config_path(sub: &str) -> PathBuf {
    let base = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());
    Path::new(&base).join(sub)
}

/// Initialize the config directory with defaults if missing.
pub fn init() {
    let base = config_path("");
    if !base.exists() {
        fs::create_dir_all(&base).expect("Failed to create config directory");
    }

    let words_path = config_path("words.json");
    if !words_path.exists() {
        let default = catalog::default_catalog();
        fs::write(
            &words_path,
            serde_json::to_string_pretty(&default).expect("Failed to serialize default catalog"),
        )
        .expect("Failed to write default words.json");
    }
}

/// Load the word catalog, falling back to the built-in one when the file
/// is missing, malformed, or too small to fill a board.
pub fn load_catalog() -> WordCatalog {
    let path = config_path("words.json");

    let data = match fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            return catalog::default_catalog();
        }
    };

    match serde_json::from_str::<WordCatalog>(&data) {
        Ok(loaded) => match board::validate_catalog(&loaded) {
            Ok(()) => loaded,
            Err(why) => {
                tracing::error!(
                    "Rejected {}: {}, using built-in catalog",
                    path.display(),
                    why
                );
                catalog::default_catalog()
            }
        },
        Err(e) => {
            tracing::error!("Failed to parse {}: {}", path.display(), e);
            catalog::default_catalog()
        }
    }
}
