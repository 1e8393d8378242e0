//! Layer Model - the six typed layer kinds a template stacks
//!
//! A layer is a shared [`LayerBase`] plus a [`LayerKind`]. On the wire both
//! are flattened into one object discriminated by `type`, which is the same
//! shape the template JSON import/export uses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::card::CardField;
use crate::templates::TemplateError;

pub type LayerId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerBase {
    pub id: LayerId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_if_field: Option<CardField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLayer {
    #[serde(flatten)]
    pub base: LayerBase,
    #[serde(flatten)]
    pub kind: LayerKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LayerKind {
    Rect(RectLayer),
    Text(TextLayer),
    Image(ImageLayer),
    Badge(BadgeLayer),
    PhaseIcons(PhaseIconsLayer),
    RarityDiamond(RarityDiamondLayer),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerType {
    Rect,
    Text,
    Image,
    Badge,
    PhaseIcons,
    RarityDiamond,
}

impl LayerType {
    pub const ALL: [LayerType; 6] = [
        LayerType::Rect,
        LayerType::Text,
        LayerType::Image,
        LayerType::Badge,
        LayerType::PhaseIcons,
        LayerType::RarityDiamond,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Rect => "rect",
            LayerType::Text => "text",
            LayerType::Image => "image",
            LayerType::Badge => "badge",
            LayerType::PhaseIcons => "phase-icons",
            LayerType::RarityDiamond => "rarity-diamond",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LayerType::Rect => "Rect",
            LayerType::Text => "Text",
            LayerType::Image => "Image",
            LayerType::Badge => "Badge",
            LayerType::PhaseIcons => "Phase Icons",
            LayerType::RarityDiamond => "Rarity Diamond",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillSource {
    #[serde(rename = "class.primary")]
    ClassPrimary,
    #[serde(rename = "class.secondary")]
    ClassSecondary,
    #[serde(rename = "class.gradient")]
    ClassGradient,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RectLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_source: Option<FillSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

/// Synthetic text bindings computed from several card fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyntheticField {
    #[serde(rename = "stats")]
    Stats,
    #[serde(rename = "statsVP")]
    StatsVp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextField {
    Synthetic(SyntheticField),
    Card(CardField),
}

impl TextField {
    pub fn name(&self) -> &'static str {
        match self {
            TextField::Synthetic(SyntheticField::Stats) => "stats",
            TextField::Synthetic(SyntheticField::StatsVp) => "statsVP",
            TextField::Card(field) => field.as_str(),
        }
    }
}

impl From<CardField> for TextField {
    fn from(field: CardField) -> Self {
        TextField::Card(field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "bold")]
    Bold,
    #[serde(rename = "italic")]
    Italic,
    #[serde(rename = "bold italic")]
    BoldItalic,
}

impl FontStyle {
    pub fn is_bold(&self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    pub fn is_italic(&self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextWrap {
    #[default]
    Word,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    pub field: TextField,
    pub font_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<FontStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap: Option<TextWrap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Art,
    Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
    Fill,
    Stretch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLayer {
    pub image_source: ImageSource,
    pub image_fit: ImageFit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeShape {
    #[default]
    Circle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeLayer {
    #[serde(default)]
    pub shape: BadgeShape,
    pub field: CardField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseAlign {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseIconsLayer {
    pub orientation: Orientation,
    pub icon_size: f64,
    pub gap: f64,
    #[serde(default)]
    pub align: PhaseAlign,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityDiamondLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl LayerKind {
    pub fn layer_type(&self) -> LayerType {
        match self {
            LayerKind::Rect(_) => LayerType::Rect,
            LayerKind::Text(_) => LayerType::Text,
            LayerKind::Image(_) => LayerType::Image,
            LayerKind::Badge(_) => LayerType::Badge,
            LayerKind::PhaseIcons(_) => LayerType::PhaseIcons,
            LayerKind::RarityDiamond(_) => LayerType::RarityDiamond,
        }
    }
}

impl TemplateLayer {
    pub fn new(base: LayerBase, kind: LayerKind) -> Self {
        Self { base, kind }
    }

    /// A freshly minted layer of the given kind with editor defaults.
    pub fn with_defaults(layer_type: LayerType) -> Self {
        let base = |x: f64, y: f64, width: f64, height: f64| LayerBase {
            id: Uuid::new_v4().to_string(),
            x,
            y,
            width,
            height,
            label: None,
            visible: Some(true),
            locked: Some(false),
            show_if_field: None,
        };

        match layer_type {
            LayerType::Rect => Self::new(
                base(0.0, 0.0, 375.0, 50.0),
                LayerKind::Rect(RectLayer {
                    fill: Some("#333333".into()),
                    ..Default::default()
                }),
            ),
            LayerType::Text => Self::new(
                base(10.0, 10.0, 355.0, 30.0),
                LayerKind::Text(TextLayer {
                    field: TextField::Card(CardField::Name),
                    font_size: 18.0,
                    font_family: None,
                    font_style: None,
                    fill: Some("#ffffff".into()),
                    align: Some(TextAlign::Left),
                    line_height: None,
                    wrap: None,
                }),
            ),
            LayerType::Image => Self::new(
                base(0.0, 0.0, 375.0, 523.0),
                LayerKind::Image(ImageLayer {
                    image_source: ImageSource::Frame,
                    image_fit: ImageFit::Cover,
                    opacity: Some(1.0),
                }),
            ),
            LayerType::Badge => Self::new(
                base(10.0, 10.0, 50.0, 50.0),
                LayerKind::Badge(BadgeLayer {
                    shape: BadgeShape::Circle,
                    field: CardField::Cost,
                    fill: Some("#000000".into()),
                    text_fill: Some("#ffffff".into()),
                    font_size: Some(18.0),
                }),
            ),
            LayerType::PhaseIcons => Self::new(
                base(10.0, 10.0, 200.0, 30.0),
                LayerKind::PhaseIcons(PhaseIconsLayer {
                    orientation: Orientation::Horizontal,
                    icon_size: 24.0,
                    gap: 4.0,
                    align: PhaseAlign::Left,
                    fill: Some("#333333".into()),
                    text_fill: Some("#ffffff".into()),
                    corner_radius: None,
                    font_size: None,
                }),
            ),
            LayerType::RarityDiamond => Self::new(
                base(10.0, 10.0, 40.0, 40.0),
                LayerKind::RarityDiamond(RarityDiamondLayer::default()),
            ),
        }
    }

    pub fn id(&self) -> &str {
        &self.base.id
    }

    pub fn layer_type(&self) -> LayerType {
        self.kind.layer_type()
    }

    /// Hidden layers take part in no render pass and no hit-testing.
    pub fn is_visible(&self) -> bool {
        self.base.visible != Some(false)
    }

    pub fn is_locked(&self) -> bool {
        self.base.locked == Some(true)
    }

    /// Label shown in layer lists: the user label, else the kind and binding.
    pub fn display_label(&self) -> String {
        if let Some(label) = self.base.label.as_deref().filter(|l| !l.is_empty()) {
            return label.to_string();
        }
        match &self.kind {
            LayerKind::Text(text) => format!("text: {}", text.field.name()),
            LayerKind::Badge(badge) => format!("badge: {}", badge.field.as_str()),
            LayerKind::Image(image) => match image.image_source {
                ImageSource::Art => "image: art".to_string(),
                ImageSource::Frame => "image: frame".to_string(),
            },
            other => other.layer_type().as_str().to_string(),
        }
    }

    /// Merges a partial set of fields into this layer, like an object assign.
    ///
    /// `null` clears an optional field. `id` and `type` cannot change.
    pub fn merge(&mut self, patch: &Map<String, Value>) -> Result<(), TemplateError> {
        let mut current = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => return Err(TemplateError::Invalid("layer did not serialize to an object".into())),
        };

        for key in ["id", "type"] {
            if let Some(value) = patch.get(key) {
                if current.get(key) != Some(value) {
                    return Err(TemplateError::ImmutableField(key));
                }
            }
        }

        for (key, value) in patch {
            if value.is_null() {
                current.remove(key);
            } else {
                current.insert(key.clone(), value.clone());
            }
        }

        *self = serde_json::from_value(Value::Object(current))?;
        Ok(())
    }
}
