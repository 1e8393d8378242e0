//! Template System - canvas contracts and the library that owns them
//!
//! A template owns its layer list exclusively. Every layer mutation goes
//! through [`TemplateLibrary`] so that callers snapshotting for undo always
//! see a consistent pre-state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::card::CardType;
use crate::layers::{LayerId, TemplateLayer};
use crate::validation::Validator;

pub type TemplateId = String;

pub const DEFAULT_CANVAS: Canvas = Canvas { width: 375, height: 523 };

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Layer {layer} not found in template {template}")]
    LayerNotFound { template: String, layer: String },

    #[error("Duplicate layer id: {0}")]
    DuplicateLayerId(String),

    #[error("Field `{0}` cannot be changed")]
    ImmutableField(&'static str),

    #[error("Invalid template: {0}")]
    Invalid(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub card_types: Vec<CardType>,
    pub canvas: Canvas,
    #[serde(default)]
    pub layers: Vec<TemplateLayer>,
}

impl Template {
    pub fn blank(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            card_types: vec![],
            canvas: DEFAULT_CANVAS,
            layers: vec![],
        }
    }

    pub fn applies_to(&self, card_type: CardType) -> bool {
        self.card_types.contains(&card_type)
    }

    pub fn layer(&self, layer_id: &str) -> Option<&TemplateLayer> {
        self.layers.iter().find(|l| l.id() == layer_id)
    }

    pub fn layer_mut(&mut self, layer_id: &str) -> Option<&mut TemplateLayer> {
        self.layers.iter_mut().find(|l| l.id() == layer_id)
    }
}

/// Template-level fields that can change after creation. Layers change
/// through the layer operations instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub card_types: Option<Vec<CardType>>,
    #[serde(default)]
    pub canvas: Option<Canvas>,
}

/// Template library - ordered, since the first template matching a card type wins
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self { templates: Vec::new() }
    }

    pub fn from_templates(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    pub fn list(&self) -> &[Template] {
        &self.templates
    }

    pub fn into_templates(self) -> Vec<Template> {
        self.templates
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Template> {
        self.templates.iter_mut().find(|t| t.id == id)
    }

    pub fn register(&mut self, template: Template) {
        match self.get_mut(&template.id) {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    pub fn create_blank(&mut self, name: &str) -> TemplateId {
        let template = Template::blank(name);
        let id = template.id.clone();
        self.templates.push(template);
        id
    }

    pub fn update_template(&mut self, id: &str, patch: TemplatePatch) -> Result<(), TemplateError> {
        if patch.canvas.is_some_and(|c| c.width == 0 || c.height == 0) {
            return Err(TemplateError::Invalid("canvas must be at least 1x1".into()));
        }
        let template = self.template_mut(id)?;
        if let Some(name) = patch.name {
            template.name = name;
        }
        if let Some(card_types) = patch.card_types {
            template.card_types = card_types;
        }
        if let Some(canvas) = patch.canvas {
            template.canvas = canvas;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Template> {
        let idx = self.templates.iter().position(|t| t.id == id)?;
        Some(self.templates.remove(idx))
    }

    /// First template whose card types include `card_type`.
    pub fn find_for(&self, card_type: CardType) -> Option<&Template> {
        find_template_for(&self.templates, card_type)
    }

    /// Imports a template from JSON. A fresh id is always minted; layer ids
    /// are kept verbatim.
    pub fn import_json(&mut self, json: &str) -> Result<TemplateId, TemplateError> {
        let mut template: Template = serde_json::from_str(json)?;
        template.id = Uuid::new_v4().to_string();

        let result = Validator::new().validate(&template);
        if !result.valid {
            let messages: Vec<_> = result
                .violations
                .iter()
                .map(|v| format!("{}: {}", v.rule, v.message))
                .collect();
            return Err(TemplateError::Invalid(messages.join("; ")));
        }

        let id = template.id.clone();
        log::info!("imported template \"{}\" as {}", template.name, id);
        self.templates.push(template);
        Ok(id)
    }

    pub fn export_json(&self, id: &str) -> Result<String, TemplateError> {
        let template = self.get(id).ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
        Ok(serde_json::to_string_pretty(template)?)
    }

    pub fn layers(&self, id: &str) -> Option<&[TemplateLayer]> {
        self.get(id).map(|t| t.layers.as_slice())
    }

    /// Replaces a template's whole layer list. Returns false when the template is unknown.
    pub fn set_layers(&mut self, id: &str, layers: Vec<TemplateLayer>) -> bool {
        match self.get_mut(id) {
            Some(template) => {
                template.layers = layers;
                true
            }
            None => false,
        }
    }

    pub fn add_layer(&mut self, id: &str, layer: TemplateLayer) -> Result<(), TemplateError> {
        let template = self.template_mut(id)?;
        if template.layer(layer.id()).is_some() {
            return Err(TemplateError::DuplicateLayerId(layer.id().to_string()));
        }
        template.layers.push(layer);
        Ok(())
    }

    pub fn update_layer(
        &mut self,
        id: &str,
        layer_id: &str,
        patch: &Map<String, Value>,
    ) -> Result<(), TemplateError> {
        let template = self.template_mut(id)?;
        let layer = template.layer_mut(layer_id).ok_or_else(|| TemplateError::LayerNotFound {
            template: id.to_string(),
            layer: layer_id.to_string(),
        })?;
        layer.merge(patch)
    }

    pub fn move_layer(&mut self, id: &str, layer_id: &str, x: f64, y: f64) -> Result<(), TemplateError> {
        let template = self.template_mut(id)?;
        let layer = template.layer_mut(layer_id).ok_or_else(|| TemplateError::LayerNotFound {
            template: id.to_string(),
            layer: layer_id.to_string(),
        })?;
        layer.base.x = x;
        layer.base.y = y;
        Ok(())
    }

    pub fn delete_layer(&mut self, id: &str, layer_id: &str) -> Result<(), TemplateError> {
        let template = self.template_mut(id)?;
        template.layers.retain(|l| l.id() != layer_id);
        Ok(())
    }

    /// Reorders layers to match `ordered_ids` (bottom first). Ids that name no
    /// layer are dropped, and layers not named are removed.
    pub fn reorder_layers(&mut self, id: &str, ordered_ids: &[LayerId]) -> Result<(), TemplateError> {
        let template = self.template_mut(id)?;
        let mut remaining = std::mem::take(&mut template.layers);
        let mut ordered = Vec::with_capacity(ordered_ids.len());
        for layer_id in ordered_ids {
            if let Some(idx) = remaining.iter().position(|l| l.id() == layer_id) {
                ordered.push(remaining.swap_remove(idx));
            }
        }
        template.layers = ordered;
        Ok(())
    }

    fn template_mut(&mut self, id: &str) -> Result<&mut Template, TemplateError> {
        self.get_mut(id).ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }
}

/// First template in `templates` whose card types include `card_type`.
pub fn find_template_for(templates: &[Template], card_type: CardType) -> Option<&Template> {
    templates.iter().find(|t| t.applies_to(card_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{LayerType, TemplateLayer};
    use serde_json::json;

    fn library_with_layers() -> (TemplateLibrary, TemplateId, Vec<LayerId>) {
        let mut lib = TemplateLibrary::new();
        let id = lib.create_blank("Creature");
        let mut ids = vec![];
        for layer_type in [LayerType::Rect, LayerType::Text, LayerType::Badge] {
            let layer = TemplateLayer::with_defaults(layer_type);
            ids.push(layer.id().to_string());
            lib.add_layer(&id, layer).unwrap();
        }
        (lib, id, ids)
    }

    #[test]
    fn test_import_mints_fresh_id_and_keeps_layer_ids() {
        let mut lib = TemplateLibrary::new();
        let json = json!({
            "id": "foreign-id",
            "name": "Imported",
            "cardTypes": ["Slayer"],
            "canvas": { "width": 375, "height": 523 },
            "layers": [
                { "id": "l-bg", "type": "rect", "x": 0, "y": 0, "width": 375, "height": 523, "fill": "#222222" }
            ]
        })
        .to_string();

        let id = lib.import_json(&json).unwrap();
        assert_ne!(id, "foreign-id");
        let template = lib.get(&id).unwrap();
        assert_eq!(template.layers[0].id(), "l-bg");

        let second = lib.import_json(&json).unwrap();
        assert_ne!(id, second);
    }

    #[test]
    fn test_import_rejects_malformed_and_invalid_json() {
        let mut lib = TemplateLibrary::new();
        assert!(matches!(
            lib.import_json("{ not json"),
            Err(TemplateError::SerializationError(_))
        ));

        let zero_canvas = json!({
            "id": "t", "name": "Zero", "cardTypes": [],
            "canvas": { "width": 0, "height": 523 }, "layers": []
        })
        .to_string();
        assert!(matches!(lib.import_json(&zero_canvas), Err(TemplateError::Invalid(_))));
        assert!(lib.list().is_empty());
    }

    #[test]
    fn test_find_for_returns_first_match() {
        let mut lib = TemplateLibrary::new();
        let mut a = Template::blank("A");
        a.card_types = vec![CardType::Action, CardType::Ploy];
        let mut b = Template::blank("B");
        b.card_types = vec![CardType::Action];
        lib.register(a.clone());
        lib.register(b);

        assert_eq!(lib.find_for(CardType::Action).unwrap().id, a.id);
        assert!(lib.find_for(CardType::Relic).is_none());
    }

    #[test]
    fn test_add_layer_rejects_duplicate_ids() {
        let (mut lib, id, ids) = library_with_layers();
        let mut dup = TemplateLayer::with_defaults(LayerType::Rect);
        dup.base.id = ids[0].clone();
        assert!(matches!(lib.add_layer(&id, dup), Err(TemplateError::DuplicateLayerId(_))));
        assert_eq!(lib.layers(&id).unwrap().len(), 3);
    }

    #[test]
    fn test_reorder_and_delete() {
        let (mut lib, id, ids) = library_with_layers();
        let reversed: Vec<_> = ids.iter().rev().cloned().collect();
        lib.reorder_layers(&id, &reversed).unwrap();
        let order: Vec<_> = lib.layers(&id).unwrap().iter().map(|l| l.id().to_string()).collect();
        assert_eq!(order, reversed);

        lib.delete_layer(&id, &ids[1]).unwrap();
        assert_eq!(lib.layers(&id).unwrap().len(), 2);
        assert!(lib.get(&id).unwrap().layer(&ids[1]).is_none());
    }

    #[test]
    fn test_update_layer_unknown_targets() {
        let (mut lib, id, _) = library_with_layers();
        let patch = json!({ "x": 5 });
        assert!(matches!(
            lib.update_layer("nope", "l", patch.as_object().unwrap()),
            Err(TemplateError::NotFound(_))
        ));
        assert!(matches!(
            lib.update_layer(&id, "nope", patch.as_object().unwrap()),
            Err(TemplateError::LayerNotFound { .. })
        ));
    }

    #[test]
    fn test_update_template_fields() {
        let mut lib = TemplateLibrary::new();
        let id = lib.create_blank("Old");
        let patch = TemplatePatch {
            name: Some("New".into()),
            card_types: Some(vec![CardType::Relic]),
            canvas: None,
        };
        lib.update_template(&id, patch).unwrap();
        let t = lib.get(&id).unwrap();
        assert_eq!(t.name, "New");
        assert!(t.applies_to(CardType::Relic));
        assert_eq!(t.canvas, DEFAULT_CANVAS);

        let bad = TemplatePatch { canvas: Some(Canvas { width: 0, height: 10 }), ..Default::default() };
        assert!(matches!(lib.update_template(&id, bad), Err(TemplateError::Invalid(_))));
    }

    #[test]
    fn test_export_then_import_round_trips_layers() {
        let (mut lib, id, _) = library_with_layers();
        lib.get_mut(&id).unwrap().card_types = vec![CardType::Slayer];
        let exported = lib.export_json(&id).unwrap();
        let imported = lib.import_json(&exported).unwrap();
        assert_eq!(lib.get(&id).unwrap().layers, lib.get(&imported).unwrap().layers);
    }
}
