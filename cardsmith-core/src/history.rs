//! Undo/Redo History - bounded layer-list snapshots per open template
//!
//! Snapshots are immutable deep copies of a template's layer list. Each stack
//! is a fixed-capacity ring indexed by position: on overflow the oldest slot
//! is overwritten rather than shifting the whole stack.

use std::sync::Arc;

use crate::layers::TemplateLayer;
use crate::templates::TemplateLibrary;

pub const MAX_UNDO: usize = 50;

/// An immutable copy of a layer list.
pub type Snapshot = Arc<[TemplateLayer]>;

/// Fixed-capacity LIFO stack that evicts its oldest entry when full.
#[derive(Debug, Clone)]
pub struct SnapshotRing {
    slots: Vec<Option<Snapshot>>,
    /// Index of the oldest entry.
    head: usize,
    len: usize,
}

impl SnapshotRing {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { slots: vec![None; capacity], head: 0, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Pushes a snapshot, returning the evicted oldest one when full.
    pub fn push(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        let cap = self.capacity();
        if self.len == cap {
            let evicted = self.slots[self.head].replace(snapshot);
            self.head = (self.head + 1) % cap;
            evicted
        } else {
            let idx = (self.head + self.len) % cap;
            self.slots[idx] = Some(snapshot);
            self.len += 1;
            None
        }
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let idx = (self.head + self.len) % self.capacity();
        self.slots[idx].take()
    }

    pub fn peek(&self) -> Option<&Snapshot> {
        if self.len == 0 {
            return None;
        }
        self.slots[(self.head + self.len - 1) % self.capacity()].as_ref()
    }

    /// Entry `i` counting from the oldest.
    pub fn get(&self, i: usize) -> Option<&Snapshot> {
        if i >= self.len {
            return None;
        }
        self.slots[(self.head + i) % self.capacity()].as_ref()
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

/// Undo and redo stacks for one editing context.
#[derive(Debug, Clone)]
pub struct History {
    undo: SnapshotRing,
    redo: SnapshotRing,
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(MAX_UNDO)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo: SnapshotRing::with_capacity(limit),
            redo: SnapshotRing::with_capacity(limit),
        }
    }

    /// Records the layer list as it is right before a mutation. Clears redo.
    pub fn push_snapshot(&mut self, layers: &[TemplateLayer]) {
        if self.undo.push(layers.into()).is_some() {
            log::trace!("undo history full, dropped oldest snapshot");
        }
        self.redo.clear();
    }

    /// Restores the most recent snapshot into `template_id`. Returns false
    /// (and changes nothing) when there is nothing to undo or no such template.
    pub fn undo(&mut self, library: &mut TemplateLibrary, template_id: &str) -> bool {
        swap_in(&mut self.undo, &mut self.redo, library, template_id)
    }

    pub fn redo(&mut self, library: &mut TemplateLibrary, template_id: &str) -> bool {
        swap_in(&mut self.redo, &mut self.undo, library, template_id)
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn undo_stack(&self) -> &SnapshotRing {
        &self.undo
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

fn swap_in(
    from: &mut SnapshotRing,
    to: &mut SnapshotRing,
    library: &mut TemplateLibrary,
    template_id: &str,
) -> bool {
    if from.is_empty() {
        return false;
    }
    let Some(current) = library.layers(template_id).map(Snapshot::from) else {
        return false;
    };
    let Some(snapshot) = from.pop() else {
        return false;
    };
    to.push(current);
    library.set_layers(template_id, snapshot.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerType;
    use crate::templates::TemplateLibrary;

    fn layers(n: usize) -> Vec<TemplateLayer> {
        (0..n).map(|_| TemplateLayer::with_defaults(LayerType::Rect)).collect()
    }

    #[test]
    fn test_ring_evicts_oldest_by_index() {
        let mut ring = SnapshotRing::with_capacity(3);
        for n in 1..=4 {
            ring.push(layers(n).into());
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.get(0).unwrap().len(), 2);
        assert_eq!(ring.peek().unwrap().len(), 4);
        assert_eq!(ring.pop().unwrap().len(), 4);
        assert_eq!(ring.pop().unwrap().len(), 3);
        assert_eq!(ring.pop().unwrap().len(), 2);
        assert!(ring.pop().is_none());
    }

    #[test]
    fn test_cap_keeps_newest_fifty() {
        let mut history = History::new();
        for n in 0..51 {
            history.push_snapshot(&layers(n));
        }
        assert_eq!(history.undo_len(), 50);
        assert_eq!(history.undo_stack().get(0).unwrap().len(), 1);
        assert_eq!(history.undo_stack().peek().unwrap().len(), 50);
    }

    #[test]
    fn test_undo_redo_swap_and_push_clears_redo() {
        let mut lib = TemplateLibrary::new();
        let id = lib.create_blank("T");
        let before = layers(1);
        lib.set_layers(&id, before.clone());

        let mut history = History::new();
        history.push_snapshot(lib.layers(&id).unwrap());
        let after = layers(2);
        lib.set_layers(&id, after.clone());

        assert!(history.undo(&mut lib, &id));
        assert_eq!(lib.layers(&id).unwrap(), before.as_slice());
        assert!(!history.undo(&mut lib, &id));

        assert!(history.redo(&mut lib, &id));
        assert_eq!(lib.layers(&id).unwrap(), after.as_slice());

        history.undo(&mut lib, &id);
        assert!(history.can_redo());
        history.push_snapshot(lib.layers(&id).unwrap());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_unknown_template_is_a_no_op() {
        let mut lib = TemplateLibrary::new();
        let mut history = History::new();
        history.push_snapshot(&layers(1));
        assert!(!history.undo(&mut lib, "missing"));
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn test_snapshots_are_independent_copies() {
        let mut lib = TemplateLibrary::new();
        let id = lib.create_blank("T");
        lib.set_layers(&id, layers(1));
        let mut history = History::new();
        history.push_snapshot(lib.layers(&id).unwrap());

        lib.get_mut(&id).unwrap().layers[0].base.x = 99.0;
        history.undo(&mut lib, &id);
        assert_eq!(lib.layers(&id).unwrap()[0].base.x, 0.0);
    }
}
