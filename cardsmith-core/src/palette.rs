//! Project palette: class colours, rarity colours and phase labels.
//!
//! Consumed read-only by the renderers. Lookups return `Option` and callers
//! pick a fallback; a missing entry never fails a render.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::card::{CardType, Rarity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassConfig {
    pub primary: String,
    pub secondary: String,
    #[serde(default)]
    pub cockatrice_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarityConfig {
    #[serde(default)]
    pub aliases: Vec<String>,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Palette {
    #[serde(default)]
    pub class_colors: HashMap<String, ClassConfig>,
    #[serde(default)]
    pub rarity_config: HashMap<Rarity, RarityConfig>,
    #[serde(default)]
    pub phase_map: HashMap<CardType, Vec<String>>,
    #[serde(default)]
    pub phase_abbreviations: HashMap<String, String>,
}

impl Palette {
    /// The palette a new project starts with.
    pub fn starter() -> Self {
        let class = |primary: &str, secondary: &str, cockatrice: &str| ClassConfig {
            primary: primary.into(),
            secondary: secondary.into(),
            cockatrice_color: cockatrice.into(),
        };
        let rarity = |alias: &str, color: &str| RarityConfig {
            aliases: vec![alias.into()],
            color: color.into(),
        };
        let phases = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            class_colors: HashMap::from([
                ("Cleric".into(), class("#d4ac0d", "#9a7d0a", "W")),
                ("Hunter".into(), class("#27ae60", "#1e8449", "G")),
                ("Mage".into(), class("#2980b9", "#1a5276", "U")),
                ("Rogue".into(), class("#5d6d7e", "#2c3e50", "B")),
                ("Warlock".into(), class("#7d3c98", "#4a235a", "B")),
                ("Warrior".into(), class("#c0392b", "#7b241c", "R")),
            ]),
            rarity_config: HashMap::from([
                (Rarity::Common, rarity("comune", "#4ade80")),
                (Rarity::Rare, rarity("rara", "#f87171")),
                (Rarity::Epic, rarity("epica", "#60a5fa")),
            ]),
            phase_map: HashMap::from([
                (CardType::Slayer, phases(&["Encounter"])),
                (CardType::Errant, phases(&["Encounter"])),
                (CardType::Action, phases(&["Combat", "Camp"])),
                (CardType::Ploy, phases(&["Preparation", "Camp"])),
                (CardType::Intervention, phases(&["Camp"])),
                (CardType::Chamber, phases(&["Encounter"])),
                (CardType::Relic, phases(&["Preparation", "Combat"])),
                (CardType::Dungeon, vec![]),
                (CardType::Phase, vec![]),
            ]),
            phase_abbreviations: HashMap::from([
                ("Encounter".into(), "E".into()),
                ("Preparation".into(), "P".into()),
                ("Combat".into(), "B".into()),
                ("Camp".into(), "C".into()),
            ]),
        }
    }

    pub fn class(&self, class_name: &str) -> Option<&ClassConfig> {
        self.class_colors.get(class_name)
    }

    pub fn rarity_color(&self, rarity: Rarity) -> Option<&str> {
        self.rarity_config.get(&rarity).map(|r| r.color.as_str())
    }

    /// Resolves a rarity from its canonical name or one of its aliases, case-insensitively.
    pub fn rarity_from_label(&self, label: &str) -> Option<Rarity> {
        let label = label.trim().to_lowercase();
        let canonical: Option<Rarity> = serde_json::from_value(serde_json::Value::String(label.clone())).ok();
        canonical.or_else(|| {
            self.rarity_config
                .iter()
                .find(|(_, cfg)| cfg.aliases.iter().any(|a| a.to_lowercase() == label))
                .map(|(rarity, _)| *rarity)
        })
    }

    pub fn phases_for(&self, card_type: CardType) -> &[String] {
        self.phase_map.get(&card_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Abbreviation for a phase label; the first character when none is configured.
    pub fn abbreviation(&self, phase: &str) -> String {
        match self.phase_abbreviations.get(phase) {
            Some(abbr) => abbr.clone(),
            None => phase.chars().next().map(String::from).unwrap_or_default(),
        }
    }
}
