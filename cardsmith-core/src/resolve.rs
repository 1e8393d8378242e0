//! Resolvers - pure functions from (layer, record, palette) to draw values
//!
//! Both renderers and the editor overlays call these. None of them fail: a
//! missing binding resolves to a placeholder or a fallback colour.

use crate::card::{CardData, FieldValue};
use crate::layers::{FillSource, Orientation, PhaseAlign, PhaseIconsLayer, RectLayer, SyntheticField, TemplateLayer, TextField};
use crate::palette::Palette;
use crate::scene::Bounds;

/// Rect fill when neither a manual fill nor a class colour applies.
pub const FALLBACK_FILL: &str = "#555555";

/// Rarity diamond fill without a record or a palette entry.
pub const NEUTRAL_FILL: &str = "#888888";

/// Whether `layer` takes part in rendering for `card`.
///
/// Without a `showIfField` the layer always shows. Without a record it also
/// shows, so authors see every layer while editing.
pub fn should_show_layer(layer: &TemplateLayer, card: Option<&CardData>) -> bool {
    match (layer.base.show_if_field, card) {
        (Some(field), Some(card)) => card.value(field).is_truthy(),
        _ => true,
    }
}

/// `[field]`, shown for unbound text.
pub fn placeholder(field: TextField) -> String {
    format!("[{}]", field.name())
}

pub fn resolve_field_text(field: TextField, card: Option<&CardData>) -> String {
    let Some(card) = card else {
        return placeholder(field);
    };

    match field {
        TextField::Synthetic(SyntheticField::Stats) => {
            format!("{}/{}", or_dash(card.power), or_dash(card.hp))
        }
        TextField::Synthetic(SyntheticField::StatsVp) => format!("{} VP", or_dash(card.vp)),
        TextField::Card(key) => match card.value(key) {
            FieldValue::Missing => placeholder(field),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => unescape_newlines(s),
        },
    }
}

fn or_dash(value: Option<i32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Source data may store line breaks as the two characters `\` `n`.
fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

pub fn resolve_rect_fill(rect: &RectLayer, palette: &Palette, card: Option<&CardData>) -> String {
    let manual = || rect.fill.clone().unwrap_or_else(|| FALLBACK_FILL.to_string());

    let Some(source) = rect.fill_source else {
        return manual();
    };
    // An unresolved class colour must not fall back to a stale manual fill.
    let Some(class) = card.and_then(|c| palette.class(&c.class_name)) else {
        return FALLBACK_FILL.to_string();
    };
    match source {
        FillSource::ClassPrimary => class.primary.clone(),
        FillSource::ClassSecondary => class.secondary.clone(),
        FillSource::ClassGradient | FillSource::Unknown => manual(),
    }
}

pub fn resolve_diamond_fill(palette: &Palette, card: Option<&CardData>) -> String {
    card.and_then(|c| palette.rarity_color(c.rarity))
        .unwrap_or(NEUTRAL_FILL)
        .to_string()
}

/// Phase labels shown by a phase-icons layer for `card`. None without a record.
pub fn phase_labels<'p>(palette: &'p Palette, card: Option<&CardData>) -> &'p [String] {
    match card {
        Some(card) => palette.phases_for(card.card_type),
        None => &[],
    }
}

/// Top-left of each icon relative to the layer origin.
pub fn phase_icon_offsets(layer: &PhaseIconsLayer, layer_width: f64, count: usize) -> Vec<(f64, f64)> {
    let step = layer.icon_size + layer.gap;
    let shift = match (layer.align, layer.orientation) {
        (PhaseAlign::Right, Orientation::Horizontal) => {
            (layer_width - phase_run_length(layer, count)).max(0.0)
        }
        (PhaseAlign::Right, Orientation::Vertical) => (layer_width - layer.icon_size).max(0.0),
        (PhaseAlign::Left, _) => 0.0,
    };
    (0..count)
        .map(|i| {
            let along = i as f64 * step;
            match layer.orientation {
                Orientation::Horizontal => (shift + along, 0.0),
                Orientation::Vertical => (shift, along),
            }
        })
        .collect()
}

fn phase_run_length(layer: &PhaseIconsLayer, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count as f64;
    n * layer.icon_size + (n - 1.0) * layer.gap
}

/// Visual extent of a phase-icons layer, derived from how many icons it draws.
///
/// Falls back to the stored layer box when there is no record or no phase.
pub fn phase_icons_bounds(layer: &TemplateLayer, phases: &PhaseIconsLayer, palette: &Palette, card: Option<&CardData>) -> Bounds {
    let base = &layer.base;
    let stored = Bounds::new(base.x, base.y, base.width, base.height);
    let count = phase_labels(palette, card).len();
    if count == 0 {
        return stored;
    }

    let run = phase_run_length(phases, count);
    let offsets = phase_icon_offsets(phases, base.width, count);
    let (dx, dy) = offsets.first().copied().unwrap_or((0.0, 0.0));
    let (width, height) = match phases.orientation {
        Orientation::Horizontal => (run, phases.icon_size),
        Orientation::Vertical => (phases.icon_size, run),
    };
    Bounds::new(base.x + dx, base.y + dy, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardField, CardType, Rarity};
    use crate::layers::{LayerKind, LayerType};

    fn card() -> CardData {
        CardData::new("c1", "Axehand", "Warrior", CardType::Slayer, Rarity::Rare)
    }

    fn gated(field: Option<CardField>) -> TemplateLayer {
        let mut layer = TemplateLayer::with_defaults(LayerType::Rect);
        layer.base.show_if_field = field;
        layer
    }

    #[test]
    fn test_visibility_truth_table() {
        let ungated = gated(None);
        let on_cost = gated(Some(CardField::Cost));
        let on_effect = gated(Some(CardField::Effect));

        assert!(should_show_layer(&ungated, None));
        assert!(should_show_layer(&ungated, Some(&card())));
        assert!(should_show_layer(&on_cost, None));

        let mut c = card();
        assert!(!should_show_layer(&on_cost, Some(&c)), "unset");
        c.cost = Some(0);
        assert!(!should_show_layer(&on_cost, Some(&c)), "zero");
        c.cost = Some(-2);
        assert!(should_show_layer(&on_cost, Some(&c)), "negative");
        c.cost = Some(3);
        assert!(should_show_layer(&on_cost, Some(&c)), "positive");

        assert!(!should_show_layer(&on_effect, Some(&c)), "empty string");
        c.effect = "Draw a card".into();
        assert!(should_show_layer(&on_effect, Some(&c)), "non-empty string");
    }

    #[test]
    fn test_field_text_placeholders_and_stats() {
        assert_eq!(resolve_field_text(CardField::Name.into(), None), "[name]");
        assert_eq!(resolve_field_text(TextField::Synthetic(SyntheticField::Stats), None), "[stats]");

        let mut c = card();
        let stats = TextField::Synthetic(SyntheticField::Stats);
        assert_eq!(resolve_field_text(stats, Some(&c)), "-/-");
        c.power = Some(4);
        c.hp = Some(2);
        assert_eq!(resolve_field_text(stats, Some(&c)), "4/2");
        c.hp = None;
        assert_eq!(resolve_field_text(stats, Some(&c)), "4/-");

        let vp = TextField::Synthetic(SyntheticField::StatsVp);
        assert_eq!(resolve_field_text(vp, Some(&c)), "- VP");
        c.vp = Some(3);
        assert_eq!(resolve_field_text(vp, Some(&c)), "3 VP");

        assert_eq!(resolve_field_text(CardField::Cost.into(), Some(&c)), "[cost]");
        assert_eq!(resolve_field_text(CardField::Name.into(), Some(&c)), "Axehand");
    }

    #[test]
    fn test_escaped_newlines_become_line_breaks() {
        let mut c = card();
        c.effect = "Strike.\\nDraw a card.".into();
        assert_eq!(resolve_field_text(CardField::Effect.into(), Some(&c)), "Strike.\nDraw a card.");
    }

    #[test]
    fn test_rect_fill_chain() {
        let palette = Palette::starter();
        let mut rect = RectLayer::default();
        assert_eq!(resolve_rect_fill(&rect, &palette, None), FALLBACK_FILL);

        rect.fill = Some("#123456".into());
        assert_eq!(resolve_rect_fill(&rect, &palette, None), "#123456");

        rect.fill_source = Some(FillSource::ClassPrimary);
        assert_eq!(resolve_rect_fill(&rect, &palette, None), FALLBACK_FILL);

        let mut stranger = card();
        stranger.class_name = "Bard".into();
        assert_eq!(resolve_rect_fill(&rect, &palette, Some(&stranger)), FALLBACK_FILL);

        assert_eq!(resolve_rect_fill(&rect, &palette, Some(&card())), "#c0392b");
        rect.fill_source = Some(FillSource::ClassSecondary);
        assert_eq!(resolve_rect_fill(&rect, &palette, Some(&card())), "#7b241c");

        rect.fill_source = Some(FillSource::Unknown);
        assert_eq!(resolve_rect_fill(&rect, &palette, Some(&card())), "#123456");
    }

    #[test]
    fn test_diamond_fill() {
        let palette = Palette::starter();
        assert_eq!(resolve_diamond_fill(&palette, None), NEUTRAL_FILL);
        assert_eq!(resolve_diamond_fill(&palette, Some(&card())), "#f87171");

        let mut mythic = card();
        mythic.rarity = Rarity::Mythic;
        assert_eq!(resolve_diamond_fill(&palette, Some(&mythic)), NEUTRAL_FILL);
    }

    #[test]
    fn test_phase_bounds_follow_phase_count() {
        let palette = Palette::starter();
        let layer = TemplateLayer::with_defaults(LayerType::PhaseIcons);
        let LayerKind::PhaseIcons(phases) = &layer.kind else {
            panic!("expected phase icons");
        };

        let stored = phase_icons_bounds(&layer, phases, &palette, None);
        assert_eq!(stored, Bounds::new(10.0, 10.0, 200.0, 30.0));

        let mut action = card();
        action.card_type = CardType::Action;
        let b = phase_icons_bounds(&layer, phases, &palette, Some(&action));
        assert_eq!(b, Bounds::new(10.0, 10.0, 52.0, 24.0));

        let mut right = phases.clone();
        right.align = PhaseAlign::Right;
        right.orientation = Orientation::Vertical;
        let b = phase_icons_bounds(&layer, &right, &palette, Some(&action));
        assert_eq!(b, Bounds::new(186.0, 10.0, 24.0, 52.0));
    }
}
