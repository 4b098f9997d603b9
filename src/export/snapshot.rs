//! Scoped style borrowing
//!
//! Every inline property the pipeline overwrites while preparing a capture
//! goes through a `StyleGuard`. The guard records the original value (or
//! its absence) the first time a property is touched and puts everything
//! back when it is dropped, whichever way the enclosing scope exits.

use log::debug;

use crate::dom::{Document, InlineStyle, NodeId};

// ─────────────────────────────────────────────────────────────────────────────
// Style Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// One recorded original value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub node: NodeId,
    pub property: String,
    /// `None` when the property was not set inline
    pub original: Option<String>,
}

/// Original inline values of every property overwritten during one export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSnapshot {
    entries: Vec<SnapshotEntry>,
    /// Full inline style of each touched node, so restoring keeps declaration order
    originals: Vec<(NodeId, InlineStyle)>,
}

impl StyleSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `property` of `node` unless it was already recorded; the
    /// first value seen is the original.
    pub fn record(&mut self, doc: &Document, node: NodeId, property: &str) {
        let property = property.to_ascii_lowercase();
        if self
            .entries
            .iter()
            .any(|e| e.node == node && e.property == property)
        {
            return;
        }
        let Some(el) = doc.element(node) else {
            return;
        };
        if !self.originals.iter().any(|(n, _)| *n == node) {
            self.originals.push((node, el.style.clone()));
        }
        let original = el.style.get(&property).map(str::to_string);
        self.entries.push(SnapshotEntry {
            node,
            property,
            original,
        });
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Put every touched node's inline style back exactly as recorded.
    pub fn restore(self, doc: &mut Document) {
        for (node, style) in self.originals {
            if let Some(el) = doc.element_mut(node) {
                el.style = style;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Style Guard
// ─────────────────────────────────────────────────────────────────────────────

/// Exclusive borrow of a document's inline styles that restores them on drop.
pub struct StyleGuard<'a> {
    doc: &'a mut Document,
    snapshot: StyleSnapshot,
}

impl<'a> StyleGuard<'a> {
    pub fn new(doc: &'a mut Document) -> Self {
        Self {
            doc,
            snapshot: StyleSnapshot::new(),
        }
    }

    /// Set an inline property, recording its original value first.
    pub fn set(&mut self, node: NodeId, property: &str, value: &str) {
        self.snapshot.record(&*self.doc, node, property);
        if let Some(el) = self.doc.element_mut(node) {
            el.style.set(property, value);
        }
    }

    /// Remove an inline property, recording its original value first.
    pub fn remove(&mut self, node: NodeId, property: &str) {
        self.snapshot.record(&*self.doc, node, property);
        if let Some(el) = self.doc.element_mut(node) {
            el.style.remove(property);
        }
    }

    /// Read access to the borrowed document while mutations are in effect.
    pub fn document(&self) -> &Document {
        &*self.doc
    }

    pub fn snapshot(&self) -> &StyleSnapshot {
        &self.snapshot
    }
}

impl Drop for StyleGuard<'_> {
    fn drop(&mut self) {
        let snapshot = std::mem::take(&mut self.snapshot);
        if !snapshot.is_empty() {
            debug!("Restoring {} borrowed style properties", snapshot.len());
        }
        snapshot.restore(&mut *self.doc);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
