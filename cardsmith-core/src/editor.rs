//! Interactive Renderer - per-template editing session
//!
//! Owns the template library together with the state of the editing canvas:
//! the active template, preview record, selection, hover, an in-progress
//! drag and the undo history. Every layer mutation goes through this type so
//! the history always captures a consistent pre-state. UI layers subscribe to
//! [`EditorEvent`]s to know when to repaint.

use bitflags::bitflags;
use serde_json::{Map, Value};
use std::fmt::{self, Display};
use thiserror::Error;

use crate::assets::AssetStore;
use crate::card::CardData;
use crate::compose::{compose_scene, LayerContext};
use crate::config::{EditorConfig, GridSize};
use crate::history::History;
use crate::layers::{LayerId, LayerKind, TemplateLayer};
use crate::palette::Palette;
use crate::resolve::{phase_icons_bounds, should_show_layer};
use crate::scene::{Bounds, Point, Scene};
use crate::templates::{Template, TemplateError, TemplateId, TemplateLibrary, TemplatePatch};

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("No template is open")]
    NoActiveTemplate,

    #[error(transparent)]
    Template(#[from] TemplateError),
}

bitflags! {
    pub struct Modifiers: u8 {
        const SHIFT   = 0b0001;
        const CONTROL = 0b0010;
        const ALT     = 0b0100;
        const META    = 0b1000;
    }
}

impl Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(Modifiers::SHIFT) {
            parts.push("Shift");
        }
        if self.contains(Modifiers::CONTROL) {
            parts.push("Ctrl");
        }
        if self.contains(Modifiers::ALT) {
            parts.push("Alt");
        }
        if self.contains(Modifiers::META) {
            parts.push("Meta");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// Change notifications for whoever paints the editing canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    ActiveTemplateChanged(Option<TemplateId>),
    PreviewCardChanged(Option<String>),
    SelectionChanged(Option<LayerId>),
    HoverChanged(Option<LayerId>),
    DragMoved { layer_id: LayerId, position: Point },
    LayersChanged { template_id: TemplateId },
    TemplateChanged { template_id: TemplateId },
    HistoryChanged { can_undo: bool, can_redo: bool },
}

pub trait EditorObserver {
    fn on_event(&mut self, event: &EditorEvent);
}

impl<F: FnMut(&EditorEvent)> EditorObserver for F {
    fn on_event(&mut self, event: &EditorEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Hover,
    Selection,
}

impl OverlayKind {
    pub fn stroke(&self) -> &'static str {
        match self {
            OverlayKind::Hover => "#ffffff",
            OverlayKind::Selection => "#6366f1",
        }
    }

    pub fn stroke_width(&self) -> f64 {
        match self {
            OverlayKind::Hover => 1.0,
            OverlayKind::Selection => 2.0,
        }
    }

    pub fn opacity(&self) -> f64 {
        match self {
            OverlayKind::Hover => 0.35,
            OverlayKind::Selection => 1.0,
        }
    }

    /// Dash pattern; solid when `None`.
    pub fn dash(&self) -> Option<[f64; 2]> {
        match self {
            OverlayKind::Hover => None,
            OverlayKind::Selection => Some([4.0, 4.0]),
        }
    }
}

/// Highlight rectangle drawn above the layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub layer_id: LayerId,
    pub kind: OverlayKind,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridLine {
    Vertical(f64),
    Horizontal(f64),
}

impl GridLine {
    pub const STROKE: &'static str = "#ffffff";
    pub const STROKE_WIDTH: f64 = 0.3;
    pub const OPACITY: f64 = 0.15;
}

#[derive(Debug, Clone, PartialEq)]
struct DragState {
    layer_id: LayerId,
    /// Layer position when the drag started.
    origin: Point,
    /// Pointer position minus layer position.
    grab: Point,
    current: Point,
}

/// Applies axis lock and grid snap to a dragged layer position.
///
/// With `axis_lock` the axis with the smaller displacement from `origin` is
/// pinned (ties keep the horizontal move). Snap rounds each free axis to the
/// nearest multiple of the grid.
pub fn constrain_drag(origin: Point, pos: Point, axis_lock: bool, snap: Option<GridSize>) -> Point {
    let snap_axis = |v: f64| match snap {
        Some(grid) => {
            let size = f64::from(grid.px());
            (v / size).round() * size
        }
        None => v,
    };

    if !axis_lock {
        return Point::new(snap_axis(pos.x), snap_axis(pos.y));
    }
    let dx = (pos.x - origin.x).abs();
    let dy = (pos.y - origin.y).abs();
    if dx >= dy {
        Point::new(snap_axis(pos.x), origin.y)
    } else {
        Point::new(origin.x, snap_axis(pos.y))
    }
}

pub struct EditorSession {
    library: TemplateLibrary,
    palette: Palette,
    assets: AssetStore,
    config: EditorConfig,
    active: Option<TemplateId>,
    preview_card: Option<CardData>,
    selection: Option<LayerId>,
    hover: Option<LayerId>,
    drag: Option<DragState>,
    history: History,
    observers: Vec<Box<dyn EditorObserver>>,
}

impl EditorSession {
    pub fn new(library: TemplateLibrary, palette: Palette, config: EditorConfig) -> Self {
        let history = History::with_limit(config.history_limit);
        Self {
            library,
            palette,
            assets: AssetStore::new(),
            config,
            active: None,
            preview_card: None,
            selection: None,
            hover: None,
            drag: None,
            history,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl EditorObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: EditorEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }

    // --- Read access ---

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn into_library(self) -> TemplateLibrary {
        self.library
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn active_template_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_template(&self) -> Option<&Template> {
        self.active.as_deref().and_then(|id| self.library.get(id))
    }

    pub fn preview_card(&self) -> Option<&CardData> {
        self.preview_card.as_ref()
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn hover(&self) -> Option<&str> {
        self.hover.as_deref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    // --- Context ---

    /// Opens `template_id` for editing. History, selection, hover and any
    /// drag belong to the previous template and are dropped.
    pub fn set_active_template(&mut self, template_id: Option<&str>) -> Result<(), EditorError> {
        if let Some(id) = template_id {
            if self.library.get(id).is_none() {
                return Err(TemplateError::NotFound(id.to_string()).into());
            }
        }
        self.open(template_id.map(str::to_string));
        Ok(())
    }

    fn close_active(&mut self) {
        self.open(None);
    }

    fn open(&mut self, template_id: Option<TemplateId>) {
        self.active = template_id;
        self.history.clear();
        self.drag = None;
        self.set_hover(None);
        self.select(None);
        self.emit(EditorEvent::ActiveTemplateChanged(self.active.clone()));
        self.emit_history();
    }

    pub fn set_preview_card(&mut self, card: Option<CardData>) {
        self.preview_card = card;
        let id = self.preview_card.as_ref().map(|c| c.id.clone());
        self.emit(EditorEvent::PreviewCardChanged(id));
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
    }

    pub fn assets_mut(&mut self) -> &mut AssetStore {
        &mut self.assets
    }

    /// Replaces the configuration. A new history limit restarts the history.
    pub fn set_config(&mut self, config: EditorConfig) {
        if config.history_limit != self.config.history_limit {
            self.history = History::with_limit(config.history_limit);
            self.emit_history();
        }
        self.config = config;
    }

    // --- Template operations ---

    pub fn create_template(&mut self, name: &str) -> TemplateId {
        let id = self.library.create_blank(name);
        self.emit(EditorEvent::TemplateChanged { template_id: id.clone() });
        id
    }

    pub fn import_template(&mut self, json: &str) -> Result<TemplateId, EditorError> {
        let id = self.library.import_json(json)?;
        self.emit(EditorEvent::TemplateChanged { template_id: id.clone() });
        Ok(id)
    }

    pub fn update_template(&mut self, template_id: &str, patch: TemplatePatch) -> Result<(), EditorError> {
        self.library.update_template(template_id, patch)?;
        self.emit(EditorEvent::TemplateChanged { template_id: template_id.to_string() });
        Ok(())
    }

    pub fn delete_template(&mut self, template_id: &str) -> Option<Template> {
        let removed = self.library.remove(template_id)?;
        if self.active.as_deref() == Some(template_id) {
            // Closing the document also drops its history.
            self.close_active();
        }
        self.emit(EditorEvent::TemplateChanged { template_id: template_id.to_string() });
        Some(removed)
    }

    // --- Layer operations (undoable) ---

    pub fn add_layer(&mut self, layer: TemplateLayer) -> Result<LayerId, EditorError> {
        let layer_id = layer.id().to_string();
        self.mutate(|lib, id| lib.add_layer(id, layer))?;
        self.select(Some(&layer_id));
        Ok(layer_id)
    }

    pub fn update_layer(&mut self, layer_id: &str, patch: &Map<String, Value>) -> Result<(), EditorError> {
        self.mutate(|lib, id| lib.update_layer(id, layer_id, patch))
    }

    pub fn delete_layer(&mut self, layer_id: &str) -> Result<(), EditorError> {
        self.mutate(|lib, id| lib.delete_layer(id, layer_id))?;
        self.prune_targets();
        Ok(())
    }

    /// `ordered_ids` lists layers bottom first.
    pub fn reorder_layers(&mut self, ordered_ids: &[LayerId]) -> Result<(), EditorError> {
        self.mutate(|lib, id| lib.reorder_layers(id, ordered_ids))?;
        self.prune_targets();
        Ok(())
    }

    // --- Layer flags (not recorded in history) ---

    pub fn toggle_visibility(&mut self, layer_id: &str) -> Result<bool, EditorError> {
        let visible = !self.active_layer(layer_id)?.is_visible();
        self.set_flag(layer_id, "visible", visible)?;
        if !visible {
            self.prune_targets();
        }
        Ok(visible)
    }

    pub fn toggle_lock(&mut self, layer_id: &str) -> Result<bool, EditorError> {
        let locked = !self.active_layer(layer_id)?.is_locked();
        self.set_flag(layer_id, "locked", locked)?;
        Ok(locked)
    }

    fn set_flag(&mut self, layer_id: &str, key: &str, value: bool) -> Result<(), EditorError> {
        let id = self.active_id()?;
        let mut patch = Map::new();
        patch.insert(key.to_string(), Value::Bool(value));
        self.library.update_layer(&id, layer_id, &patch)?;
        self.emit(EditorEvent::LayersChanged { template_id: id });
        Ok(())
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        let Some(id) = self.active.clone() else { return false };
        let changed = self.history.undo(&mut self.library, &id);
        self.after_restore(id, changed)
    }

    pub fn redo(&mut self) -> bool {
        let Some(id) = self.active.clone() else { return false };
        let changed = self.history.redo(&mut self.library, &id);
        self.after_restore(id, changed)
    }

    fn after_restore(&mut self, template_id: TemplateId, changed: bool) -> bool {
        if changed {
            self.drag = None;
            self.prune_targets();
            self.emit(EditorEvent::LayersChanged { template_id });
            self.emit_history();
        }
        changed
    }

    /// The single mutation path: captures the layer list, applies `op`, and
    /// records the captured list once `op` succeeds.
    fn mutate<F>(&mut self, op: F) -> Result<(), EditorError>
    where
        F: FnOnce(&mut TemplateLibrary, &str) -> Result<(), TemplateError>,
    {
        let id = self.active_id()?;
        let before = self
            .library
            .layers(&id)
            .map(<[TemplateLayer]>::to_vec)
            .ok_or_else(|| TemplateError::NotFound(id.clone()))?;
        op(&mut self.library, &id)?;
        self.history.push_snapshot(&before);
        self.emit(EditorEvent::LayersChanged { template_id: id });
        self.emit_history();
        Ok(())
    }

    fn emit_history(&mut self) {
        let event = EditorEvent::HistoryChanged {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        };
        self.emit(event);
    }

    fn active_id(&self) -> Result<TemplateId, EditorError> {
        self.active.clone().ok_or(EditorError::NoActiveTemplate)
    }

    fn active_layer(&self, layer_id: &str) -> Result<&TemplateLayer, EditorError> {
        let template = self.active_template().ok_or(EditorError::NoActiveTemplate)?;
        template.layer(layer_id).ok_or_else(|| {
            TemplateError::LayerNotFound {
                template: template.id.clone(),
                layer: layer_id.to_string(),
            }
            .into()
        })
    }

    /// Drops selection and hover targets that can no longer be shown.
    fn prune_targets(&mut self) {
        if let Some(id) = self.selection.clone() {
            if self.interactive_layer(&id).is_none() {
                self.select(None);
            }
        }
        if let Some(id) = self.hover.clone() {
            if self.interactive_layer(&id).is_none() {
                self.set_hover(None);
            }
        }
    }

    // --- Gestures ---

    /// A layer that is currently visible and passes its show-if predicate.
    fn interactive_layer(&self, layer_id: &str) -> Option<&TemplateLayer> {
        self.active_template()?
            .layer(layer_id)
            .filter(|l| l.is_visible() && should_show_layer(l, self.preview_card.as_ref()))
    }

    /// Topmost layer under `pos`.
    pub fn hit_test(&self, pos: Point) -> Option<LayerId> {
        let scene = self.stage_scene()?;
        scene
            .items
            .iter()
            .rev()
            .find(|item| item.node.bounds().is_some_and(|b| b.contains(pos)))
            .map(|item| item.layer_id.clone())
    }

    pub fn select(&mut self, layer_id: Option<&str>) {
        let next = layer_id.map(str::to_string);
        if self.selection != next {
            self.selection = next;
            self.emit(EditorEvent::SelectionChanged(self.selection.clone()));
        }
    }

    fn set_hover(&mut self, layer_id: Option<LayerId>) {
        if self.hover != layer_id {
            self.hover = layer_id;
            self.emit(EditorEvent::HoverChanged(self.hover.clone()));
        }
    }

    pub fn pointer_move(&mut self, pos: Point) {
        let target = self.hit_test(pos);
        self.set_hover(target);
    }

    pub fn pointer_leave(&mut self) {
        self.set_hover(None);
    }

    /// Selects the layer under `pos`, or clears the selection on empty canvas.
    pub fn click(&mut self, pos: Point) -> Option<LayerId> {
        let target = self.hit_test(pos);
        self.select(target.as_deref());
        target
    }

    /// Starts dragging `layer_id` grabbed at `pointer`. Locked, hidden and
    /// unknown layers cannot be dragged.
    pub fn begin_drag(&mut self, layer_id: &str, pointer: Point) -> bool {
        let Some(layer) = self.interactive_layer(layer_id) else { return false };
        if layer.is_locked() {
            return false;
        }
        let origin = Point::new(layer.base.x, layer.base.y);
        self.drag = Some(DragState {
            layer_id: layer_id.to_string(),
            origin,
            grab: Point::new(pointer.x - origin.x, pointer.y - origin.y),
            current: origin,
        });
        self.select(Some(layer_id));
        true
    }

    /// Moves the dragged layer with the pointer, applying axis lock (Shift)
    /// and grid snap. Returns the constrained layer position.
    pub fn drag_to(&mut self, pointer: Point, modifiers: Modifiers) -> Option<Point> {
        let snap = self.config.snap();
        let drag = self.drag.as_mut()?;
        let wanted = Point::new(pointer.x - drag.grab.x, pointer.y - drag.grab.y);
        drag.current = constrain_drag(drag.origin, wanted, modifiers.contains(Modifiers::SHIFT), snap);
        let event = EditorEvent::DragMoved { layer_id: drag.layer_id.clone(), position: drag.current };
        let position = drag.current;
        self.emit(event);
        Some(position)
    }

    /// Commits the drag. The pre-drag layer list goes onto the history; a
    /// drag that ends where it started records nothing.
    pub fn end_drag(&mut self) -> Result<Option<Point>, EditorError> {
        let Some(drag) = self.drag.take() else { return Ok(None) };
        if drag.current == drag.origin {
            return Ok(None);
        }
        let DragState { layer_id, current, .. } = drag;
        self.mutate(|lib, id| lib.move_layer(id, &layer_id, current.x, current.y))?;
        Ok(Some(current))
    }

    pub fn cancel_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            self.emit(EditorEvent::DragMoved { layer_id: drag.layer_id, position: drag.origin });
        }
    }

    // --- Stage ---

    /// The scene for the editing canvas, with a dragged layer at its live position.
    pub fn stage_scene(&self) -> Option<Scene> {
        let template = self.active_template()?;
        let ctx = LayerContext::new(template, &self.palette, &self.assets, self.preview_card.as_ref());
        match &self.drag {
            Some(drag) => {
                let mut moved = template.clone();
                if let Some(layer) = moved.layer_mut(&drag.layer_id) {
                    layer.base.x = drag.current.x;
                    layer.base.y = drag.current.y;
                }
                Some(compose_scene(&moved, &ctx))
            }
            None => Some(compose_scene(template, &ctx)),
        }
    }

    /// Visual box of a layer: live drag position when dragged, and the
    /// phase-count extent for phase icons.
    pub fn layer_bounds(&self, layer: &TemplateLayer) -> Bounds {
        let mut bounds = match &layer.kind {
            LayerKind::PhaseIcons(icons) => {
                phase_icons_bounds(layer, icons, &self.palette, self.preview_card.as_ref())
            }
            _ => Bounds::new(layer.base.x, layer.base.y, layer.base.width, layer.base.height),
        };
        if let Some(drag) = self.drag.as_ref().filter(|d| d.layer_id == layer.id()) {
            bounds = bounds.translate(drag.current.x - drag.origin.x, drag.current.y - drag.origin.y);
        }
        bounds
    }

    /// Hover and selection highlights. Hover is hidden on the selected layer.
    pub fn overlays(&self) -> Vec<Overlay> {
        let mut overlays = Vec::new();
        let hover = self.hover.as_deref().filter(|h| Some(*h) != self.selection.as_deref());
        for (target, kind) in [(hover, OverlayKind::Hover), (self.selection.as_deref(), OverlayKind::Selection)] {
            if let Some(layer) = target.and_then(|id| self.interactive_layer(id)) {
                overlays.push(Overlay {
                    layer_id: layer.id().to_string(),
                    kind,
                    bounds: self.layer_bounds(layer),
                });
            }
        }
        overlays
    }

    /// Snap grid guides, empty when snapping is off.
    pub fn grid_lines(&self) -> Vec<GridLine> {
        let (Some(grid), Some(template)) = (self.config.snap(), self.active_template()) else {
            return vec![];
        };
        let step = grid.px() as usize;
        let vertical = (0..=template.canvas.width).step_by(step).map(|x| GridLine::Vertical(f64::from(x)));
        let horizontal = (0..=template.canvas.height).step_by(step).map(|y| GridLine::Horizontal(f64::from(y)));
        vertical.chain(horizontal).collect()
    }
}
