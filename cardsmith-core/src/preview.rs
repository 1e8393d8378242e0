//! Preview grid: lazily rendered card tiles
//!
//! A tile renders at most once, the first time it becomes visible. While a
//! render is in flight, or once it finished, further visibility signals are
//! ignored. A failed render is not retried.

use crate::assets::AssetStore;
use crate::card::{CardData, CardId, CardType};
use crate::palette::Palette;
use crate::raster::{HeadlessRenderer, RenderError, RenderedImage};
use crate::templates::{find_template_for, Template, TemplateId};

#[derive(Debug, Clone, PartialEq)]
pub enum TileState {
    NoTemplate,
    Pending,
    InFlight,
    Rendered(RenderedImage),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct PreviewTile {
    pub card_id: CardId,
    pub card_type: CardType,
    pub template_id: Option<TemplateId>,
    pub state: TileState,
}

/// Work handed out when a tile first becomes visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub card_id: CardId,
    pub template_id: TemplateId,
}

#[derive(Debug, Clone, Default)]
pub struct PreviewGrid {
    tiles: Vec<PreviewTile>,
    filter: Option<CardType>,
}

impl PreviewGrid {
    /// One tile per card, in card order, matched to the first applicable template.
    pub fn new(cards: &[CardData], templates: &[Template]) -> Self {
        let tiles = cards
            .iter()
            .map(|card| {
                let template_id = find_template_for(templates, card.card_type).map(|t| t.id.clone());
                PreviewTile {
                    card_id: card.id.clone(),
                    card_type: card.card_type,
                    state: if template_id.is_some() { TileState::Pending } else { TileState::NoTemplate },
                    template_id,
                }
            })
            .collect();
        Self { tiles, filter: None }
    }

    pub fn set_filter(&mut self, filter: Option<CardType>) {
        self.filter = filter;
    }

    /// Tiles passing the type filter.
    pub fn tiles(&self) -> impl Iterator<Item = &PreviewTile> {
        self.tiles.iter().filter(move |t| self.filter.map_or(true, |f| t.card_type == f))
    }

    pub fn tile(&self, card_id: &str) -> Option<&PreviewTile> {
        self.tiles.iter().find(|t| t.card_id == card_id)
    }

    /// Visibility signal for a tile. Returns a request only for a pending tile,
    /// which moves it in flight.
    pub fn on_visible(&mut self, card_id: &str) -> Option<RenderRequest> {
        let tile = self.tiles.iter_mut().find(|t| t.card_id == card_id)?;
        if tile.state != TileState::Pending {
            return None;
        }
        let template_id = tile.template_id.clone()?;
        tile.state = TileState::InFlight;
        Some(RenderRequest { card_id: tile.card_id.clone(), template_id })
    }

    /// Stores the outcome of an in-flight render. Ignored for other states.
    pub fn complete(&mut self, card_id: &str, result: Result<RenderedImage, RenderError>) {
        let Some(tile) = self.tiles.iter_mut().find(|t| t.card_id == card_id) else { return };
        if tile.state != TileState::InFlight {
            return;
        }
        tile.state = match result {
            Ok(image) => TileState::Rendered(image),
            Err(e) => {
                log::warn!("preview of card {} failed: {}", card_id, e);
                TileState::Failed(e.to_string())
            }
        };
    }

    /// Handles a batch of visibility signals, rendering each newly visible
    /// tile in turn. Returns how many renders ran.
    pub fn render_visible(
        &mut self,
        visible: &[&str],
        cards: &[CardData],
        templates: &[Template],
        palette: &Palette,
        assets: &AssetStore,
        renderer: &HeadlessRenderer,
    ) -> usize {
        let mut rendered = 0;
        for card_id in visible {
            let Some(request) = self.on_visible(card_id) else { continue };
            let card = cards.iter().find(|c| c.id == request.card_id);
            let template = templates.iter().find(|t| t.id == request.template_id);
            let result = match (card, template) {
                (Some(card), Some(template)) => renderer.render_card(card, template, palette, assets),
                _ => {
                    // Card or template went away since the grid was built.
                    self.reset(&request.card_id);
                    continue;
                }
            };
            self.complete(&request.card_id, result);
            rendered += 1;
        }
        rendered
    }

    /// Renders every pending tile, reporting `(done, total)` after each card.
    pub fn render_all<F>(
        &mut self,
        cards: &[CardData],
        templates: &[Template],
        palette: &Palette,
        assets: &AssetStore,
        renderer: &HeadlessRenderer,
        mut on_progress: F,
    ) where
        F: FnMut(usize, usize),
    {
        let ids: Vec<CardId> = self.tiles().map(|t| t.card_id.clone()).collect();
        let total = ids.len();
        for (i, id) in ids.iter().enumerate() {
            self.render_visible(&[id.as_str()], cards, templates, palette, assets, renderer);
            on_progress(i + 1, total);
        }
    }

    fn reset(&mut self, card_id: &str) {
        if let Some(tile) = self.tiles.iter_mut().find(|t| t.card_id == card_id) {
            tile.state = TileState::Pending;
        }
    }
}
