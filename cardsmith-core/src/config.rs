//! Editor and export settings

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::history::MAX_UNDO;

/// Snap grid spacing in pixels. Only 1, 5, 10 and 20 are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct GridSize(u32);

impl GridSize {
    pub const ALLOWED: [u32; 4] = [1, 5, 10, 20];

    pub fn px(&self) -> u32 {
        self.0
    }
}

impl Default for GridSize {
    fn default() -> Self {
        GridSize(5)
    }
}

impl TryFrom<u32> for GridSize {
    type Error = String;

    fn try_from(px: u32) -> Result<Self, Self::Error> {
        if Self::ALLOWED.contains(&px) {
            Ok(GridSize(px))
        } else {
            Err(format!("grid size must be one of {:?}, got {}", Self::ALLOWED, px))
        }
    }
}

impl From<GridSize> for u32 {
    fn from(size: GridSize) -> u32 {
        size.0
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    #[serde(default)]
    pub snap_grid_enabled: bool,
    #[serde(default)]
    pub snap_grid_size: GridSize,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize { MAX_UNDO }

impl EditorConfig {
    /// The grid to snap to, if snapping is on.
    pub fn snap(&self) -> Option<GridSize> {
        self.snap_grid_enabled.then_some(self.snap_grid_size)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_grid_enabled: false,
            snap_grid_size: GridSize::default(),
            history_limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportConfig {
    /// Archive directory that card images are written under.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    #[serde(default = "default_true")]
    pub include_manifest: bool,
}

fn default_image_dir() -> String { "pics/CUSTOM".to_string() }
fn default_true() -> bool { true }

impl ExportConfig {
    pub fn entry_name(&self, card_name: &str) -> String {
        format!("{}/{}.png", self.image_dir.trim_end_matches('/'), card_name)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            include_manifest: default_true(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_size_rejects_unlisted_values() {
        assert_eq!(serde_json::from_str::<GridSize>("10").unwrap().px(), 10);
        assert!(serde_json::from_str::<GridSize>("7").is_err());
        assert_eq!(serde_json::to_string(&GridSize::default()).unwrap(), "5");
    }

    #[test]
    fn test_editor_config_defaults() {
        let config: EditorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.snap(), None);

        let config: EditorConfig = serde_json::from_str(r#"{"snapGridEnabled":true,"snapGridSize":20}"#).unwrap();
        assert_eq!(config.snap().map(|g| g.px()), Some(20));
    }

    #[test]
    fn test_export_entry_names() {
        let config = ExportConfig::default();
        assert_eq!(config.entry_name("Axehand"), "pics/CUSTOM/Axehand.png");
        let config: ExportConfig = serde_json::from_str(r#"{"imageDir":"out/"}"#).unwrap();
        assert_eq!(config.entry_name("A"), "out/A.png");
        assert!(config.include_manifest);
    }
}
