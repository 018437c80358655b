use std::{collections::HashMap, fs, path::PathBuf};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub gallery_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gallery_dir: PathBuf::from("."),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("photosift.toml") {
        apply_file_config(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("PHOTOSIFT_GALLERY_DIR") {
        settings.gallery_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("APP__GALLERY_DIR") {
        settings.gallery_dir = PathBuf::from(v);
    }

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(value) = file_cfg.get("gallery_dir") {
            settings.gallery_dir = PathBuf::from(value);
        }
    }
}
