//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations against a template.
//! Errors make a template invalid; warnings are informational.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::layers::LayerKind;
use crate::templates::Template;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub layer_id: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
    pub template_id: String,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Warning)
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, template: &Template) -> Vec<ValidationViolation>;
}

fn violation(
    rule: &dyn ValidationRule,
    severity: ViolationSeverity,
    message: String,
    layer_id: Option<&str>,
    remediation: &str,
) -> ValidationViolation {
    ValidationViolation {
        rule: rule.name().to_string(),
        severity,
        message,
        layer_id: layer_id.map(str::to_string),
        remediation: vec![remediation.to_string()],
    }
}

// --- Concrete Rules ---

pub struct CanvasSizeRule;

impl ValidationRule for CanvasSizeRule {
    fn name(&self) -> &'static str { "canvas_size" }

    fn validate(&self, template: &Template) -> Vec<ValidationViolation> {
        let Template { canvas, .. } = template;
        if canvas.width == 0 || canvas.height == 0 {
            vec![violation(
                self,
                ViolationSeverity::Error,
                format!("Canvas must be at least 1x1, got {}x{}", canvas.width, canvas.height),
                None,
                "Set a positive canvas width and height",
            )]
        } else {
            vec![]
        }
    }
}

pub struct UniqueLayerIdsRule;

impl ValidationRule for UniqueLayerIdsRule {
    fn name(&self) -> &'static str { "unique_layer_ids" }

    fn validate(&self, template: &Template) -> Vec<ValidationViolation> {
        let mut seen = HashSet::new();
        template
            .layers
            .iter()
            .filter(|l| !seen.insert(l.id()))
            .map(|l| {
                violation(
                    self,
                    ViolationSeverity::Error,
                    format!("Layer id \"{}\" is used more than once", l.id()),
                    Some(l.id()),
                    "Give every layer a distinct id",
                )
            })
            .collect()
    }
}

pub struct LayerSizeRule;

impl ValidationRule for LayerSizeRule {
    fn name(&self) -> &'static str { "layer_size" }

    fn validate(&self, template: &Template) -> Vec<ValidationViolation> {
        template
            .layers
            .iter()
            .filter(|l| !(l.base.width >= 1.0 && l.base.height >= 1.0))
            .map(|l| {
                violation(
                    self,
                    ViolationSeverity::Error,
                    format!("Layer size must be at least 1x1, got {}x{}", l.base.width, l.base.height),
                    Some(l.id()),
                    "Resize the layer",
                )
            })
            .collect()
    }
}

pub struct MetricsRule;

impl ValidationRule for MetricsRule {
    fn name(&self) -> &'static str { "metrics" }

    fn validate(&self, template: &Template) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for layer in &template.layers {
            let metrics: Vec<(&str, Option<f64>)> = match &layer.kind {
                LayerKind::Text(t) => vec![("fontSize", Some(t.font_size))],
                LayerKind::Badge(b) => vec![("fontSize", b.font_size)],
                LayerKind::PhaseIcons(p) => vec![
                    ("iconSize", Some(p.icon_size)),
                    ("gap", Some(p.gap)),
                    ("fontSize", p.font_size),
                ],
                LayerKind::Rect(_) | LayerKind::Image(_) | LayerKind::RarityDiamond(_) => vec![],
            };
            for (name, value) in metrics {
                if let Some(v) = value.filter(|v| !(*v >= 0.0)) {
                    violations.push(violation(
                        self,
                        ViolationSeverity::Error,
                        format!("{} must be non-negative, got {}", name, v),
                        Some(layer.id()),
                        "Use a size of zero or more",
                    ));
                }
            }
        }
        violations
    }
}

pub struct TemplateNameRule;

impl ValidationRule for TemplateNameRule {
    fn name(&self) -> &'static str { "template_name" }

    fn validate(&self, template: &Template) -> Vec<ValidationViolation> {
        if template.name.trim().is_empty() {
            vec![violation(
                self,
                ViolationSeverity::Warning,
                "Template has no name".to_string(),
                None,
                "Name the template so it can be found in lists",
            )]
        } else {
            vec![]
        }
    }
}

pub struct CardTypesRule;

impl ValidationRule for CardTypesRule {
    fn name(&self) -> &'static str { "card_types" }

    fn validate(&self, template: &Template) -> Vec<ValidationViolation> {
        if template.card_types.is_empty() {
            vec![violation(
                self,
                ViolationSeverity::Warning,
                "Template applies to no card types and will never be used for export".to_string(),
                None,
                "Select at least one card type",
            )]
        } else {
            vec![]
        }
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(CanvasSizeRule),
                Box::new(UniqueLayerIdsRule),
                Box::new(LayerSizeRule),
                Box::new(MetricsRule),
                Box::new(TemplateNameRule),
                Box::new(CardTypesRule),
            ],
        }
    }

    pub fn validate(&self, template: &Template) -> ValidationResult {
        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(template))
            .collect();

        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);

        ValidationResult {
            valid,
            violations,
            template_id: template.id.clone(),
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardType;
    use crate::layers::{LayerKind, LayerType, TemplateLayer};

    fn template() -> Template {
        let mut t = Template::blank("Creature");
        t.card_types = vec![CardType::Slayer];
        t.layers.push(TemplateLayer::with_defaults(LayerType::Rect));
        t.layers.push(TemplateLayer::with_defaults(LayerType::PhaseIcons));
        t
    }

    #[test]
    fn test_clean_template_is_valid() {
        let result = Validator::new().validate(&template());
        assert!(result.valid);
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_duplicate_ids_and_bad_sizes_are_errors() {
        let mut t = template();
        let first = t.layers[0].id().to_string();
        t.layers[1].base.id = first.clone();
        t.layers[1].base.width = 0.0;

        let result = Validator::new().validate(&t);
        assert!(!result.valid);
        let rules: Vec<_> = result.violations.iter().map(|v| v.rule.as_str()).collect();
        assert!(rules.contains(&"unique_layer_ids"));
        assert!(rules.contains(&"layer_size"));
        assert!(result.violations.iter().all(|v| v.layer_id.as_deref() == Some(first.as_str())));
    }

    #[test]
    fn test_negative_metrics_are_errors() {
        let mut t = template();
        if let LayerKind::PhaseIcons(p) = &mut t.layers[1].kind {
            p.gap = -2.0;
        }
        let result = Validator::new().validate(&t);
        assert!(!result.valid);
        assert_eq!(result.violations[0].rule, "metrics");
    }

    #[test]
    fn test_missing_name_and_types_only_warn() {
        let mut t = template();
        t.name = " ".into();
        t.card_types.clear();
        let result = Validator::new().validate(&t);
        assert!(result.valid);
        assert_eq!(result.warnings().count(), 2);
    }
}
