//! In-memory stores for annotation metadata and layer settings.

use std::collections::BTreeMap;

use crate::model::{LayerRecord, default_layers};
use crate::model::record::AnnotationRecord;

// ============================================================================
// Annotation metadata
// ============================================================================

/// Annotation records keyed by widget identifier.
///
/// Iteration order is the key order, so snapshots handed to change listeners
/// are deterministic.
#[derive(Debug, Default)]
pub struct MetadataStore {
    records: BTreeMap<String, AnnotationRecord>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&AnnotationRecord> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut AnnotationRecord> {
        self.records.get_mut(id)
    }

    /// Insert or replace, keyed by the record's own id.
    pub fn set(&mut self, record: AnnotationRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn remove(&mut self, id: &str) -> Option<AnnotationRecord> {
        self.records.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationRecord> {
        self.records.values()
    }

    /// Cloned snapshot of all records, in key order.
    pub fn snapshot(&self) -> Vec<AnnotationRecord> {
        self.records.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

// ============================================================================
// Layers
// ============================================================================

/// Layer settings keyed by annotation type.
///
/// A type without a layer record counts as visible and has no color.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: BTreeMap<String, LayerRecord>,
}

impl LayerRegistry {
    /// Registry preloaded with the built-in histology layers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        for layer in default_layers() {
            registry.add(layer);
        }
        registry
    }

    pub fn add(&mut self, layer: LayerRecord) {
        self.layers.insert(layer.layer_type.clone(), layer);
    }

    pub fn get(&self, layer_type: &str) -> Option<&LayerRecord> {
        self.layers.get(layer_type)
    }

    pub fn layers(&self) -> Vec<LayerRecord> {
        self.layers.values().cloned().collect()
    }

    /// Toggle a layer. Toggling a type that has no layer yet registers one,
    /// so ad-hoc annotation types can be hidden too.
    pub fn set_visible(&mut self, layer_type: &str, visible: bool) {
        self.layers
            .entry(layer_type.to_string())
            .or_insert_with(|| LayerRecord::new(layer_type, crate::shape::DEFAULT_COLOR))
            .visible = visible;
    }

    /// Recolor a layer, registering it if needed.
    pub fn set_color(&mut self, layer_type: &str, color: &str) {
        let layer = self
            .layers
            .entry(layer_type.to_string())
            .or_insert_with(|| LayerRecord::new(layer_type, color));
        layer.color = color.to_string();
    }

    /// Absent layers are visible.
    pub fn is_visible(&self, layer_type: &str) -> bool {
        self.layers.get(layer_type).is_none_or(|layer| layer.visible)
    }

    pub fn color_for(&self, layer_type: &str) -> Option<&str> {
        self.layers.get(layer_type).map(|layer| layer.color.as_str())
    }
}
