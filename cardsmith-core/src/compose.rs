//! Layer composition: template layers to render-target nodes
//!
//! The one place that knows how each layer kind looks. The editor stage and
//! the headless rasterizer both consume the [`Scene`] built here.

use crate::assets::{AssetStore, ImageAsset};
use crate::card::{CardData, CardField};
use crate::layers::{ImageSource, LayerKind, TemplateLayer, TextAlign};
use crate::palette::Palette;
use crate::resolve::{
    phase_icon_offsets, phase_labels, resolve_diamond_fill, resolve_field_text, resolve_rect_fill,
    should_show_layer,
};
use crate::scene::{
    Bounds, GroupNode, ImageNode, Node, Paint, Point, PolygonNode, RectNode, Scene, SceneItem,
    TextNode, VerticalAlign,
};
use crate::templates::Template;

pub const PLACEHOLDER_FILL: &str = "#888888";

const BADGE_FILL: &str = "#000000";
const BADGE_FONT_SIZE: f64 = 18.0;
const ICON_FILL: &str = "#333333";
const LIGHT_TEXT: &str = "#ffffff";

/// Everything a layer needs besides itself.
#[derive(Clone, Copy)]
pub struct LayerContext<'a> {
    pub card: Option<&'a CardData>,
    pub template_id: &'a str,
    pub palette: &'a Palette,
    pub assets: &'a AssetStore,
}

impl<'a> LayerContext<'a> {
    pub fn new(template: &'a Template, palette: &'a Palette, assets: &'a AssetStore, card: Option<&'a CardData>) -> Self {
        Self { card, template_id: &template.id, palette, assets }
    }

    fn image(&self, source: ImageSource) -> Option<&'a ImageAsset> {
        match source {
            ImageSource::Frame => self.assets.frame(self.template_id),
            ImageSource::Art => self.card.and_then(|c| self.assets.art(&c.name)),
        }
    }
}

/// Builds the node tree for every layer that renders for `ctx.card`, bottom first.
pub fn compose_scene(template: &Template, ctx: &LayerContext<'_>) -> Scene {
    let mut scene = Scene::new(template.canvas);
    scene.items = template
        .layers
        .iter()
        .filter(|layer| layer.is_visible() && should_show_layer(layer, ctx.card))
        .map(|layer| SceneItem {
            layer_id: layer.id().to_string(),
            node: layer_node(layer, ctx),
        })
        .collect();
    scene
}

/// The node for a single layer, ignoring visibility.
pub fn layer_node(layer: &TemplateLayer, ctx: &LayerContext<'_>) -> Node {
    let base = &layer.base;
    let id = Some(base.id.clone());
    let bounds = Bounds::new(base.x, base.y, base.width, base.height);

    match &layer.kind {
        LayerKind::Rect(rect) => Node::Rect(RectNode {
            id,
            bounds,
            corner_radius: rect.corner_radius.unwrap_or(0.0),
            paint: Paint::fill(resolve_rect_fill(rect, ctx.palette, ctx.card))
                .with_stroke(rect.stroke.clone(), rect.stroke_width)
                .with_opacity(rect.opacity),
        }),

        LayerKind::Text(text) => {
            let mut node = TextNode::new(bounds, resolve_field_text(text.field, ctx.card));
            node.id = id;
            node.font_size = text.font_size;
            if let Some(family) = &text.font_family {
                node.font_family = family.clone();
            }
            node.font_style = text.font_style.unwrap_or_default();
            node.fill = text.fill.clone().unwrap_or_else(|| LIGHT_TEXT.to_string());
            node.align = text.align.unwrap_or_default();
            node.line_height = text.line_height.unwrap_or(1.0);
            node.wrap = text.wrap.unwrap_or_default();
            Node::Text(node)
        }

        LayerKind::Image(image) => match ctx.image(image.image_source) {
            Some(asset) => Node::Image(ImageNode {
                id,
                bounds,
                asset: asset.clone(),
                fit: image.image_fit,
                opacity: image.opacity.unwrap_or(1.0),
            }),
            None => {
                if let Some(card) = ctx.card {
                    log::debug!("no {:?} image for \"{}\", drawing placeholder", image.image_source, card.name);
                }
                image_placeholder(id, bounds, ctx.card)
            }
        },

        LayerKind::Badge(badge) => {
            let local = Bounds::new(0.0, 0.0, base.width, base.height);
            let r = base.width.min(base.height) / 2.0;
            let disc = RectNode {
                id: None,
                bounds: Bounds::new(base.width / 2.0 - r, base.height / 2.0 - r, r * 2.0, r * 2.0),
                corner_radius: r,
                paint: Paint::fill(badge.fill.clone().unwrap_or_else(|| BADGE_FILL.to_string())),
            };
            let mut label = TextNode::new(local, resolve_field_text(badge.field.into(), ctx.card));
            label.font_size = badge.font_size.unwrap_or(BADGE_FONT_SIZE);
            label.fill = badge.text_fill.clone().unwrap_or_else(|| LIGHT_TEXT.to_string());
            label.align = TextAlign::Center;
            label.vertical_align = VerticalAlign::Middle;
            Node::Group(GroupNode {
                id,
                origin: Point::new(base.x, base.y),
                children: vec![Node::Rect(disc), Node::Text(label)],
            })
        }

        LayerKind::PhaseIcons(icons) => {
            let labels = phase_labels(ctx.palette, ctx.card);
            let size = icons.icon_size;
            let offsets = phase_icon_offsets(icons, base.width, labels.len());
            let children = labels
                .iter()
                .zip(offsets)
                .map(|(phase, (dx, dy))| {
                    let tile = RectNode {
                        id: None,
                        bounds: Bounds::new(0.0, 0.0, size, size),
                        corner_radius: icons.corner_radius.unwrap_or(0.0),
                        paint: Paint::fill(icons.fill.clone().unwrap_or_else(|| ICON_FILL.to_string())),
                    };
                    let mut abbr = TextNode::new(tile.bounds, ctx.palette.abbreviation(phase));
                    abbr.font_size = icons.font_size.unwrap_or_else(|| (size * 0.6).floor());
                    abbr.fill = icons.text_fill.clone().unwrap_or_else(|| LIGHT_TEXT.to_string());
                    abbr.align = TextAlign::Center;
                    abbr.vertical_align = VerticalAlign::Middle;
                    Node::Group(GroupNode {
                        id: None,
                        origin: Point::new(dx, dy),
                        children: vec![Node::Rect(tile), Node::Text(abbr)],
                    })
                })
                .collect();
            Node::Group(GroupNode { id, origin: Point::new(base.x, base.y), children })
        }

        LayerKind::RarityDiamond(diamond) => Node::RegularPolygon(PolygonNode {
            id,
            center: Point::new(base.x + base.width / 2.0, base.y + base.height / 2.0),
            sides: 4,
            radius: base.width.min(base.height) / 2.0,
            paint: Paint::fill(resolve_diamond_fill(ctx.palette, ctx.card))
                .with_stroke(diamond.stroke.clone(), diamond.stroke_width)
                .with_opacity(diamond.opacity),
        }),
    }
}

/// Grey block with the card name centred, drawn for images not loaded.
fn image_placeholder(id: Option<String>, bounds: Bounds, card: Option<&CardData>) -> Node {
    let local = Bounds::new(0.0, 0.0, bounds.width, bounds.height);
    let mut name = TextNode::new(local, resolve_field_text(CardField::Name.into(), card));
    name.align = TextAlign::Center;
    name.vertical_align = VerticalAlign::Middle;
    Node::Group(GroupNode {
        id,
        origin: Point::new(bounds.x, bounds.y),
        children: vec![
            Node::Rect(RectNode { id: None, bounds: local, corner_radius: 0.0, paint: Paint::fill(PLACEHOLDER_FILL) }),
            Node::Text(name),
        ],
    })
}
