//! Export Pipeline - batch render of a card set into one archive
//!
//! Cards are processed strictly in input order, one render at a time. A card
//! that cannot be rendered is skipped with a warning; the batch itself only
//! fails when the archive sink does.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::archive::{ArchiveError, ArchiveSink, MemoryArchive};
use crate::assets::AssetStore;
use crate::card::{CardData, CardId};
use crate::config::ExportConfig;
use crate::hashing::{compute_manifest_hash, compute_render_hash, sha256_hex, template_fingerprint};
use crate::palette::Palette;
use crate::raster::HeadlessRenderer;
use crate::templates::{find_template_for, Template, TemplateId};
use crate::ENGINE_VERSION;

pub const MANIFEST_ENTRY: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPhase {
    Rendering,
    Packing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportProgress {
    pub phase: ExportPhase,
    pub current: usize,
    pub total: usize,
}

/// Caller-supplied catalogue document packed next to the images.
#[derive(Debug, Clone)]
pub struct Catalogue {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub card_id: CardId,
    pub card_name: String,
    pub template_id: TemplateId,
    pub entry: String,
    pub size: [u32; 2],
    pub sha256: String,
    pub template_fingerprint: String,
    pub render_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportManifest {
    pub id: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<ManifestEntry>,
    pub warnings: Vec<String>,
    pub manifest_hash: String,
}

#[derive(Debug, Clone)]
pub struct ExportOutcome<A> {
    pub archive: A,
    pub warnings: Vec<String>,
    pub manifest: ExportManifest,
}

pub struct ExportPipeline {
    renderer: HeadlessRenderer,
    config: ExportConfig,
}

impl ExportPipeline {
    pub fn new(renderer: HeadlessRenderer, config: ExportConfig) -> Self {
        Self { renderer, config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn renderer(&self) -> &HeadlessRenderer {
        &self.renderer
    }

    /// Renders every card with the first template that applies to its type
    /// and packs the images into `sink`, one entry per card name.
    ///
    /// `on_progress` sees one `rendering` event per card, skipped or not,
    /// then a single `packing` event once the archive is sealed.
    #[allow(clippy::too_many_arguments)]
    pub fn export_all<S, F>(
        &self,
        cards: &[CardData],
        templates: &[Template],
        palette: &Palette,
        assets: &AssetStore,
        catalogue: Option<&Catalogue>,
        mut sink: S,
        mut on_progress: F,
    ) -> Result<ExportOutcome<S::Output>, ExportError>
    where
        S: ArchiveSink,
        F: FnMut(ExportProgress),
    {
        let total = cards.len();
        let mut warnings = Vec::new();
        let mut entries = Vec::new();

        for (i, card) in cards.iter().enumerate() {
            if let Some(warning) = self.export_card(card, templates, palette, assets, &mut sink, &mut entries)? {
                log::warn!("{}", warning);
                warnings.push(warning);
            }
            on_progress(ExportProgress { phase: ExportPhase::Rendering, current: i + 1, total });
        }

        if let Some(catalogue) = catalogue {
            sink.add_entry(&catalogue.name, &catalogue.bytes)?;
        }

        let mut manifest = ExportManifest {
            id: Uuid::new_v4().to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            entries,
            warnings: warnings.clone(),
            manifest_hash: String::new(),  // Computed after
        };
        manifest.manifest_hash = compute_manifest_hash(&manifest)?;

        if self.config.include_manifest {
            let json = serde_json::to_vec_pretty(&manifest)?;
            sink.add_entry(MANIFEST_ENTRY, &json)?;
        }

        let archive = sink.pack()?;
        on_progress(ExportProgress { phase: ExportPhase::Packing, current: 1, total: 1 });

        log::info!(
            "exported {} of {} cards ({} skipped)",
            manifest.entries.len(),
            total,
            warnings.len()
        );

        Ok(ExportOutcome { archive, warnings, manifest })
    }

    /// One card. Returns the warning for a skipped card. When two cards share
    /// a name the first one wins and the later one is skipped.
    fn export_card<S: ArchiveSink>(
        &self,
        card: &CardData,
        templates: &[Template],
        palette: &Palette,
        assets: &AssetStore,
        sink: &mut S,
        entries: &mut Vec<ManifestEntry>,
    ) -> Result<Option<String>, ExportError> {
        let Some(template) = find_template_for(templates, card.card_type) else {
            return Ok(Some(format!(
                "Skipped \"{}\": no template for type \"{}\"",
                card.name, card.card_type
            )));
        };

        let entry = self.config.entry_name(&card.name);
        if sink.contains(&entry) {
            return Ok(Some(format!("Skipped \"{}\": duplicate card name", card.name)));
        }

        let image = match self.renderer.render_card(card, template, palette, assets) {
            Ok(image) => image,
            Err(e) => return Ok(Some(format!("Skipped \"{}\": render failed: {}", card.name, e))),
        };

        sink.add_entry(&entry, &image.png)?;

        let fingerprint = template_fingerprint(template)?;
        entries.push(ManifestEntry {
            card_id: card.id.clone(),
            card_name: card.name.clone(),
            template_id: template.id.clone(),
            entry,
            size: [image.width, image.height],
            sha256: sha256_hex(&image.png),
            render_hash: compute_render_hash(&fingerprint, card, ENGINE_VERSION)?,
            template_fingerprint: fingerprint,
        });
        Ok(None)
    }
}

impl Default for ExportPipeline {
    fn default() -> Self {
        Self::new(HeadlessRenderer::default(), ExportConfig::default())
    }
}

/// Exports into an in-memory archive with default settings and the host's
/// fonts.
pub fn export_all<F>(
    cards: &[CardData],
    templates: &[Template],
    palette: &Palette,
    assets: &AssetStore,
    on_progress: F,
) -> Result<ExportOutcome<MemoryArchive>, ExportError>
where
    F: FnMut(ExportProgress),
{
    ExportPipeline::default().export_all(cards, templates, palette, assets, None, MemoryArchive::new(), on_progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ZipSink;
    use crate::card::{CardType, Rarity};
    use crate::layers::{LayerType, TemplateLayer};

    fn slayer_template() -> Template {
        let mut t = Template::blank("Slayers");
        t.canvas.width = 30;
        t.canvas.height = 40;
        t.card_types = vec![CardType::Slayer];
        let mut bg = TemplateLayer::with_defaults(LayerType::Rect);
        bg.base.width = 30.0;
        bg.base.height = 40.0;
        t.layers.push(bg);
        t
    }

    fn cards() -> Vec<CardData> {
        vec![
            CardData::new("c1", "Axehand", "Warrior", CardType::Slayer, Rarity::Common),
            CardData::new("c2", "Bolt", "Mage", CardType::Action, Rarity::Rare),
            CardData::new("c3", "Shieldbearer", "Warrior", CardType::Slayer, Rarity::Epic),
        ]
    }

    #[test]
    fn test_skips_cards_without_template() {
        let mut progress = vec![];
        let outcome = export_all(&cards(), &[slayer_template()], &Palette::starter(), &AssetStore::new(), |p| {
            progress.push(p)
        })
        .unwrap();

        assert_eq!(outcome.manifest.entries.len(), 2);
        assert_eq!(outcome.warnings, vec![r#"Skipped "Bolt": no template for type "Action""#.to_string()]);
        assert!(outcome.archive.entry("pics/CUSTOM/Axehand.png").is_some());
        assert!(outcome.archive.entry("pics/CUSTOM/Bolt.png").is_none());
        assert!(outcome.archive.entry(MANIFEST_ENTRY).is_some());

        let phases: Vec<_> = progress.iter().map(|p| (p.phase, p.current, p.total)).collect();
        assert_eq!(
            phases,
            vec![
                (ExportPhase::Rendering, 1, 3),
                (ExportPhase::Rendering, 2, 3),
                (ExportPhase::Rendering, 3, 3),
                (ExportPhase::Packing, 1, 1),
            ]
        );
    }

    #[test]
    fn test_empty_card_list_gives_empty_archive() {
        let pipeline = ExportPipeline::new(
            HeadlessRenderer::new(),
            ExportConfig { include_manifest: false, ..ExportConfig::default() },
        );
        let outcome = pipeline
            .export_all(&[], &[], &Palette::starter(), &AssetStore::new(), None, MemoryArchive::new(), |_| {})
            .unwrap();
        assert!(outcome.archive.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_names_keep_first_card() {
        let mut cards = cards();
        cards[2].name = "Axehand".into();
        let outcome = export_all(&cards, &[slayer_template()], &Palette::starter(), &AssetStore::new(), |_| {}).unwrap();
        assert_eq!(outcome.manifest.entries.len(), 1);
        assert_eq!(outcome.manifest.entries[0].card_id, "c1");
        assert_eq!(outcome.warnings.len(), 2);
        assert_eq!(outcome.warnings[1], r#"Skipped "Axehand": duplicate card name"#);
    }

    #[test]
    fn test_manifest_records_hashes() {
        let outcome = export_all(&cards(), &[slayer_template()], &Palette::starter(), &AssetStore::new(), |_| {}).unwrap();
        let entry = &outcome.manifest.entries[0];
        assert_eq!(entry.size, [30, 40]);
        let bytes = &outcome.archive.entry(&entry.entry).unwrap().bytes;
        assert_eq!(entry.sha256, sha256_hex(bytes));
        assert_eq!(entry.template_fingerprint, template_fingerprint(&slayer_template()).unwrap());
        assert_eq!(outcome.manifest.manifest_hash.len(), 64);
        assert_eq!(outcome.manifest.engine_version, ENGINE_VERSION);
    }

    #[test]
    fn test_zip_export_with_catalogue() {
        let catalogue = Catalogue { name: "SET.xml".into(), bytes: b"<cards/>".to_vec() };
        let bytes = ExportPipeline::default()
            .export_all(
                &cards(),
                &[slayer_template()],
                &Palette::starter(),
                &AssetStore::new(),
                Some(&catalogue),
                ZipSink::new(),
                |_| {},
            )
            .unwrap()
            .archive;

        let zip = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut names: Vec<_> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            vec!["SET.xml", "manifest.json", "pics/CUSTOM/Axehand.png", "pics/CUSTOM/Shieldbearer.png"]
        );
    }
}
