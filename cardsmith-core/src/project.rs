//! Project file: everything the CLI needs to render a card set
//!
//! The palette keys sit at the top level of the document next to the
//! templates, cards and asset paths. Relative asset paths resolve against the
//! project file's directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::assets::{AssetError, AssetStore};
use crate::card::CardData;
use crate::config::{EditorConfig, ExportConfig};
use crate::palette::Palette;
use crate::templates::{Template, TemplateId};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    #[serde(flatten)]
    pub palette: Palette,
    #[serde(default)]
    pub templates: Vec<Template>,
    #[serde(default)]
    pub cards: Vec<CardData>,
    /// Folder holding `<card name>.png` art files.
    #[serde(default)]
    pub art_folder_path: Option<String>,
    /// Template id to frame image path.
    #[serde(default)]
    pub frame_images: HashMap<TemplateId, String>,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl ProjectFile {
    /// A project with the starter palette and nothing else.
    pub fn starter() -> Self {
        Self { palette: Palette::starter(), ..Self::default() }
    }

    pub fn from_json(json: &str) -> Result<Self, ProjectError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reads the frame of every template and the art of every card that has a
    /// file. Missing or unreadable files are left as placeholders.
    pub fn load_assets(&self, base_dir: &Path) -> AssetStore {
        let mut store = AssetStore::new();
        for template in &self.templates {
            if let Some(path) = self.frame_images.get(&template.id) {
                let path = base_dir.join(path);
                store.load_frame(&template.id, || read_optional(&path));
            }
        }
        if let Some(folder) = &self.art_folder_path {
            let folder = base_dir.join(folder);
            for card in &self.cards {
                let path = art_path(&folder, &card.name);
                store.load_art(&card.name, || read_optional(&path));
            }
        }
        log::debug!("loaded {} image assets", store.len());
        store
    }
}

fn art_path(folder: &Path, card_name: &str) -> PathBuf {
    folder.join(format!("{}.png", card_name))
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, AssetError> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(fs::read(path)?))
}
