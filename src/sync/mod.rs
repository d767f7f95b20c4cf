//! Synchronization between the drawing widget, the metadata store, and the
//! REST backend.
//!
//! [`AnnotationSync`] is the single writer for annotation state. User
//! gestures arrive as [`WidgetEvent`]s; every handler finishes its local
//! bookkeeping, then persists, then notifies change listeners. Persistence
//! failures never leave the widget and the store disagreeing: a failed
//! create is rolled back everywhere, a failed delete restores the shape, a
//! failed update keeps the local edit.

use chrono::Utc;

use crate::backend::{AnnotationBackend, AnnotationUpload};
use crate::config::AnnotatorConfig;
use crate::error::AnnotatorError;
use crate::geometry::{self, BoundingBox};
use crate::model::LayerRecord;
use crate::model::record::AnnotationRecord;
use crate::notify::{LogNotices, NoticeSink, Severity};
use crate::shape::{BodyValue, Purpose, Shape};
use crate::stats::AnnotationStatistics;
use crate::store::{LayerRegistry, MetadataStore};
use crate::style;
use crate::widget::{AnnotationWidget, DrawingTool, WidgetConfig, WidgetEvent, WidgetProvider};

mod pending;
use pending::PendingOps;


/// Lifecycle of the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Initializing,
    Ready,
    Destroyed,
}

/// Partial edit applied through the side panel rather than the widget.
#[derive(Debug, Clone, Default)]
pub struct AnnotationUpdate {
    pub annotation_type: Option<String>,
    pub notes: Option<String>,
    pub grade: Option<String>,
    pub color: Option<String>,
}

type ChangeListener = Box<dyn FnMut(&[AnnotationRecord])>;

/// The annotation synchronization adapter.
pub struct AnnotationSync<P, B>
where
    P: WidgetProvider,
    B: AnnotationBackend,
{
    state: SyncState,
    config: AnnotatorConfig,
    provider: P,
    widget: Option<P::Widget>,
    backend: Option<B>,
    image_id: Option<i64>,
    store: MetadataStore,
    layers: LayerRegistry,
    pending: PendingOps,
    listeners: Vec<ChangeListener>,
    notices: Box<dyn NoticeSink>,
}

impl<P, B> AnnotationSync<P, B>
where
    P: WidgetProvider,
    B: AnnotationBackend,
{
    pub fn new(config: AnnotatorConfig, provider: P) -> Self {
        Self {
            state: SyncState::Uninitialized,
            config,
            provider,
            widget: None,
            backend: None,
            image_id: None,
            store: MetadataStore::new(),
            layers: LayerRegistry::with_defaults(),
            pending: PendingOps::default(),
            listeners: Vec::new(),
            notices: Box::new(LogNotices),
        }
    }

    /// Route notices somewhere other than the log.
    pub fn set_notice_sink(&mut self, sink: Box<dyn NoticeSink>) {
        self.notices = sink;
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create the widget and load the image's stored annotations.
    ///
    /// Fails only when the widget cannot be created; a failing load is
    /// reported as a notice and leaves the adapter usable with an empty set.
    pub fn initialize(&mut self, image_id: i64, backend: B) -> Result<(), AnnotatorError> {
        log::info!("initializing annotation layer for image {image_id}");
        self.state = SyncState::Initializing;
        let widget_config = WidgetConfig {
            vocabulary: self.config.vocabulary.clone(),
            drawing_enabled: false,
        };
        let widget = match self.provider.create_widget(&widget_config) {
            Ok(widget) => widget,
            Err(err) => {
                log::error!("failed to create drawing widget: {err}");
                self.state = SyncState::Uninitialized;
                return Err(err);
            }
        };
        self.widget = Some(widget);
        self.backend = Some(backend);
        self.image_id = Some(image_id);
        self.state = SyncState::Ready;
        self.load_existing();
        Ok(())
    }

    /// Tear down the widget and drop all local state.
    pub fn destroy(&mut self) {
        if let Some(mut widget) = self.widget.take() {
            widget.destroy();
        }
        self.store.clear();
        self.pending.clear();
        self.backend = None;
        self.image_id = None;
        self.state = SyncState::Destroyed;
        log::debug!("annotation adapter destroyed");
    }

    /// Pull stored annotations from the backend into the widget and store.
    fn load_existing(&mut self) {
        let Some(image_id) = self.image_id else {
            return;
        };
        let listed = match self.backend.as_ref() {
            Some(backend) => backend.list_annotations(image_id),
            None => return,
        };
        let stored = match listed {
            Ok(stored) => stored,
            Err(err) => {
                log::error!("failed to load annotations for image {image_id}: {err}");
                self.notices
                    .notice(Severity::Error, "failed to load existing annotations");
                return;
            }
        };
        log::info!("loading {} stored annotations", stored.len());
        let mut shapes = Vec::with_capacity(stored.len());
        for item in stored {
            let mut shape = item.annotation;
            shape.database_id = Some(item.database_id);
            if shape.id.is_empty() {
                shape.id = item.database_id.to_string();
            }
            let creator = item.creator.as_deref().unwrap_or("Unknown");
            let mut record = AnnotationRecord::from_shape(&shape, creator);
            record.backend_id = Some(item.database_id);
            if item.created.is_some() {
                record.created = item.created;
            }
            record.updated = item.updated;
            if let Some(color) = self.layers.color_for(&record.annotation_type) {
                let color = color.to_string();
                style::apply_color(&mut shape, &color);
                record.color = Some(color);
            }
            record.geometry = shape.clone();
            self.store.set(record);
            shapes.push(shape);
        }
        if let Some(widget) = self.widget.as_mut() {
            widget.set_shapes(shapes);
        }
        self.refresh_visible_shapes();
        self.notify_changes();
    }

    // ========================================================================
    // Widget events
    // ========================================================================

    /// Feed one widget gesture through the adapter.
    pub fn handle_event(&mut self, event: WidgetEvent) {
        if self.state != SyncState::Ready {
            log::warn!("widget event ignored: adapter not ready");
            return;
        }
        match event {
            WidgetEvent::Created(shape) => self.on_created(shape),
            WidgetEvent::Updated { shape, .. } => self.on_updated(shape),
            WidgetEvent::Deleted(shape) => self.on_deleted(shape),
        }
    }

    fn on_created(&mut self, mut shape: Shape) {
        log::debug!("annotation created: {}", shape.id);
        let annotation_type = shape.annotation_type().to_string();
        let layer_color = self.layers.color_for(&annotation_type).map(str::to_string);
        if let Some(color) = &layer_color {
            style::apply_color(&mut shape, color);
            if let Some(widget) = self.widget.as_mut() {
                widget.replace_shape(shape.clone());
            }
        }
        let mut record = AnnotationRecord::from_shape(&shape, &self.config.creator);
        if let Some(color) = layer_color {
            record.color = Some(color);
        }
        self.store.set(record);
        self.persist_create(shape);
        self.notify_changes();
    }

    fn persist_create(&mut self, shape: Shape) {
        let context = self.image_id.zip(self.backend.as_ref());
        let Some((image_id, backend)) = context else {
            log::error!("cannot save annotation {}: no backend context", shape.id);
            self.rollback_create(&shape.id);
            return;
        };
        let Some(record) = self.store.get(&shape.id) else {
            return;
        };
        let upload = match AnnotationUpload::from_shape(
            &shape,
            &record.creator,
            &record.annotation_type,
            record.notes.as_deref(),
        ) {
            Ok(upload) => upload,
            Err(err) => {
                log::error!("cannot serialize annotation {}: {err}", shape.id);
                self.rollback_create(&shape.id);
                return;
            }
        };
        match backend.create_annotation(image_id, &upload) {
            Ok(saved) => {
                log::info!("annotation {} saved as {}", shape.id, saved.id);
                if let Some(record) = self.store.get_mut(&shape.id) {
                    record.backend_id = Some(saved.id);
                    record.geometry.database_id = Some(saved.id);
                    let stamped = record.geometry.clone();
                    if let Some(widget) = self.widget.as_mut() {
                        widget.replace_shape(stamped);
                    }
                } else {
                    // deleted locally while the create was in flight; the
                    // backend row keeps its id but nothing references it
                    log::warn!(
                        "create response for {} arrived after local removal",
                        shape.id
                    );
                }
            }
            Err(err) => {
                log::error!("failed to save annotation {}: {err}", shape.id);
                self.rollback_create(&shape.id);
            }
        }
    }

    /// Undo a local create whose persistence failed: remove the shape from
    /// the widget and the record from the store, swallowing the delete echo.
    fn rollback_create(&mut self, id: &str) {
        self.pending.mark_deleting(id);
        if let Some(widget) = self.widget.as_mut() {
            widget.remove_shape(id);
        }
        self.store.remove(id);
        self.notices
            .notice(Severity::Error, "failed to save annotation");
    }

    fn on_updated(&mut self, mut shape: Shape) {
        log::debug!("annotation updated: {}", shape.id);
        let annotation_type = shape.annotation_type().to_string();
        let mut record = match self.store.get(&shape.id) {
            Some(record) => record.clone(),
            // an update for a shape we never tracked; adopt it
            None => AnnotationRecord::from_shape(&shape, "Unknown"),
        };
        record.annotation_type = annotation_type.clone();
        record.notes = shape.notes().map(str::to_string);
        record.updated = Some(Utc::now());
        record.area = None;
        if let Some(color) = self.layers.color_for(&annotation_type) {
            let color = color.to_string();
            style::apply_color(&mut shape, &color);
            record.color = Some(color);
        }
        record.geometry = shape.clone();
        self.store.set(record.clone());
        if let Some(widget) = self.widget.as_mut() {
            widget.replace_shape(shape);
        }
        self.persist_update(&record);
        self.notify_changes();
    }

    fn persist_update(&mut self, record: &AnnotationRecord) {
        let Some((image_id, backend)) = self.image_id.zip(self.backend.as_ref()) else {
            log::warn!("cannot update annotation {}: no backend context", record.id);
            return;
        };
        let backend_id = record.backend_id.or(record.geometry.database_id);
        let Some(backend_id) = backend_id else {
            log::warn!(
                "annotation {} has no backend id yet, skipping update",
                record.id
            );
            return;
        };
        let upload = match AnnotationUpload::from_shape(
            &record.geometry,
            &record.creator,
            &record.annotation_type,
            record.notes.as_deref(),
        ) {
            Ok(upload) => upload,
            Err(err) => {
                log::error!("cannot serialize annotation {}: {err}", record.id);
                return;
            }
        };
        match backend.update_annotation(image_id, backend_id, &upload) {
            Ok(()) => log::debug!("annotation {backend_id} updated"),
            Err(err) => {
                // the local edit stays; it will be retried on the next edit
                log::error!("failed to update annotation {backend_id}: {err}");
                self.notices
                    .notice(Severity::Error, "failed to update annotation");
            }
        }
    }

    fn on_deleted(&mut self, shape: Shape) {
        if self.pending.take_deleting(&shape.id) {
            // echo of a programmatic removal, already handled upstream
            log::debug!("suppressed delete echo for {}", shape.id);
            self.store.remove(&shape.id);
            self.notify_changes();
            return;
        }
        log::debug!("annotation deleted: {}", shape.id);
        let backend_id = shape
            .database_id
            .or_else(|| self.store.get(&shape.id).and_then(|r| r.backend_id));
        let context = self.image_id.zip(self.backend.as_ref()).zip(backend_id);
        let Some(((image_id, backend), backend_id)) = context else {
            log::warn!(
                "annotation {} was never persisted, removing locally",
                shape.id
            );
            self.store.remove(&shape.id);
            self.notify_changes();
            return;
        };
        match backend.delete_annotation(image_id, backend_id) {
            Ok(()) => {
                log::info!("annotation {backend_id} deleted");
                self.store.remove(&shape.id);
                self.notify_changes();
            }
            Err(err) => {
                log::error!("failed to delete annotation {backend_id}: {err}");
                // restore the widget copy so UI and backend agree again
                if let Some(widget) = self.widget.as_mut() {
                    widget.add_shape(shape);
                }
                self.notices
                    .notice(Severity::Error, "failed to delete annotation");
            }
        }
    }

    // ========================================================================
    // Programmatic operations
    // ========================================================================

    /// Delete an annotation from outside the widget, e.g. the side panel.
    pub fn delete_by_id(&mut self, id: &str) {
        if self.state != SyncState::Ready {
            log::warn!("delete ignored: adapter not ready");
            return;
        }
        let shape = self
            .widget
            .as_ref()
            .and_then(|widget| widget.shapes().into_iter().find(|s| s.id == id));
        let Some(shape) = shape else {
            log::warn!("delete requested for unknown annotation {id}");
            return;
        };
        let backend_id = shape
            .database_id
            .or_else(|| self.store.get(id).and_then(|r| r.backend_id));

        // optimistic removal; the echo is swallowed via the pending marker
        self.pending.mark_deleting(id);
        if let Some(widget) = self.widget.as_mut() {
            widget.remove_shape(id);
        }

        let context = self.image_id.zip(self.backend.as_ref()).zip(backend_id);
        let Some(((image_id, backend), backend_id)) = context else {
            log::warn!("annotation {id} was never persisted, removing locally");
            self.store.remove(id);
            self.notify_changes();
            return;
        };
        match backend.delete_annotation(image_id, backend_id) {
            Ok(()) => {
                log::info!("annotation {backend_id} deleted");
                self.store.remove(id);
                self.notify_changes();
            }
            Err(err) => {
                log::error!("failed to delete annotation {backend_id}: {err}");
                self.pending.take_deleting(id);
                if let Some(widget) = self.widget.as_mut() {
                    widget.add_shape(shape);
                }
                self.notices
                    .notice(Severity::Error, "failed to delete annotation");
            }
        }
    }

    /// Apply a partial edit to one annotation and persist it.
    pub fn update_annotation(&mut self, id: &str, update: AnnotationUpdate) {
        if self.state != SyncState::Ready {
            log::warn!("update ignored: adapter not ready");
            return;
        }
        let Some(mut record) = self.store.get(id).cloned() else {
            log::warn!("update requested for unknown annotation {id}");
            return;
        };
        let mut shape = record.geometry.clone();
        if let Some(annotation_type) = update.annotation_type {
            shape.upsert_body(Purpose::Tagging, BodyValue::Text(annotation_type.clone()));
            record.annotation_type = annotation_type;
        }
        if let Some(notes) = update.notes {
            shape.upsert_body(Purpose::Commenting, BodyValue::Text(notes.clone()));
            record.notes = Some(notes);
        }
        if let Some(grade) = update.grade {
            shape.upsert_body(Purpose::Grading, BodyValue::Text(grade));
        }
        if let Some(color) = update.color {
            style::apply_color(&mut shape, &color);
            record.color = Some(color);
        }
        record.updated = Some(Utc::now());
        record.geometry = shape.clone();
        self.store.set(record.clone());
        if let Some(widget) = self.widget.as_mut() {
            widget.replace_shape(shape);
        }
        self.persist_update(&record);
        self.notify_changes();
    }

    /// Highlight one annotation in the widget, e.g. when its row is clicked
    /// in the side panel.
    pub fn select_annotation(&mut self, id: &str) {
        if let Some(widget) = self.widget.as_mut() {
            widget.select_shape(id);
        }
    }

    /// Drop every annotation locally. Backend records are untouched.
    pub fn clear_annotations(&mut self) {
        if let Some(widget) = self.widget.as_mut() {
            widget.set_shapes(Vec::new());
        }
        self.store.clear();
        self.pending.clear();
        self.notify_changes();
    }

    // ========================================================================
    // Layers
    // ========================================================================

    pub fn layers(&self) -> Vec<LayerRecord> {
        self.layers.layers()
    }

    pub fn add_layer(&mut self, layer: LayerRecord) {
        self.layers.add(layer);
    }

    /// Show or hide every annotation of one type.
    pub fn set_layer_visible(&mut self, layer_type: &str, visible: bool) {
        log::debug!("layer {layer_type} visible={visible}");
        self.layers.set_visible(layer_type, visible);
        self.refresh_visible_shapes();
    }

    /// Recolor a layer and restyle every annotation of that type.
    pub fn set_layer_color(&mut self, layer_type: &str, color: &str) {
        log::debug!("layer {layer_type} color={color}");
        self.layers.set_color(layer_type, color);
        let ids: Vec<String> = self
            .store
            .iter()
            .filter(|record| record.annotation_type == layer_type)
            .map(|record| record.id.clone())
            .collect();
        for id in &ids {
            if let Some(record) = self.store.get_mut(id) {
                style::apply_color(&mut record.geometry, color);
                record.color = Some(color.to_string());
            }
        }
        self.refresh_visible_shapes();
        self.notify_changes();
    }

    /// Rebuild the widget's shape set from the store, skipping hidden layers.
    fn refresh_visible_shapes(&mut self) {
        let shapes: Vec<Shape> = self
            .store
            .iter()
            .filter(|record| self.layers.is_visible(&record.annotation_type))
            .map(|record| record.geometry.clone())
            .collect();
        if let Some(widget) = self.widget.as_mut() {
            widget.set_shapes(shapes);
        }
    }

    // ========================================================================
    // Widget configuration
    // ========================================================================

    /// Swap the tag vocabulary. The widget cannot change its vocabulary in
    /// place, so it is destroyed and rebuilt with the shapes carried over.
    pub fn set_vocabulary(&mut self, vocabulary: Vec<String>) -> Result<(), AnnotatorError> {
        if self.state != SyncState::Ready {
            return Err(AnnotatorError::NotInitialized);
        }
        log::info!("rebuilding widget with {} tags", vocabulary.len());
        self.config.vocabulary = vocabulary;
        let carried = self
            .widget
            .as_ref()
            .map(|widget| widget.shapes())
            .unwrap_or_default();
        if let Some(mut old) = self.widget.take() {
            old.destroy();
        }
        let widget_config = WidgetConfig {
            vocabulary: self.config.vocabulary.clone(),
            drawing_enabled: false,
        };
        match self.provider.create_widget(&widget_config) {
            Ok(mut widget) => {
                widget.set_shapes(carried);
                self.widget = Some(widget);
                Ok(())
            }
            Err(err) => {
                log::error!("failed to rebuild drawing widget: {err}");
                self.state = SyncState::Uninitialized;
                Err(err)
            }
        }
    }

    /// Select the active drawing tool, or leave drawing mode with `None`.
    pub fn set_tool(&mut self, tool: Option<DrawingTool>) {
        let Some(widget) = self.widget.as_mut() else {
            return;
        };
        match tool {
            Some(tool) => {
                widget.set_drawing_enabled(true);
                widget.set_drawing_tool(tool);
            }
            None => widget.set_drawing_enabled(false),
        }
    }

    // ========================================================================
    // Queries and listeners
    // ========================================================================

    /// Register a change listener. It fires immediately with the current
    /// snapshot and again after every change.
    pub fn subscribe(&mut self, mut listener: impl FnMut(&[AnnotationRecord]) + 'static) {
        let snapshot = self.store.snapshot();
        listener(&snapshot);
        self.listeners.push(Box::new(listener));
    }

    fn notify_changes(&mut self) {
        let snapshot = self.store.snapshot();
        for listener in &mut self.listeners {
            listener(&snapshot);
        }
    }

    pub fn annotations(&self) -> Vec<AnnotationRecord> {
        self.store.snapshot()
    }

    pub fn annotation_count(&self) -> usize {
        self.store.len()
    }

    /// Bounding box of one annotation, for zoom-to-annotation.
    pub fn annotation_bounds(&self, id: &str) -> Option<BoundingBox> {
        self.store
            .get(id)
            .and_then(|record| record.geometry.svg())
            .and_then(geometry::bounding_box)
    }

    /// Current shapes as the widget holds them, for export.
    pub fn export_shapes(&self) -> Vec<Shape> {
        self.widget
            .as_ref()
            .map(|widget| widget.shapes())
            .unwrap_or_default()
    }

    pub fn statistics(&self) -> AnnotationStatistics {
        AnnotationStatistics::compute(&self.store.snapshot())
    }
}
