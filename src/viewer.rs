//! Deep-zoom viewer control: magnification, rotation, and lifecycle.
//!
//! The viewer itself is a capability port; [`ViewerController`] adds the
//! magnification ladder, rotation stepping, and ties the annotation adapter's
//! lifecycle to the viewer's open event.

use crate::backend::AnnotationBackend;
use crate::config::{AnnotatorConfig, MAGNIFICATION_LADDER};
use crate::error::AnnotatorError;
use crate::geometry::BoundingBox;
use crate::model::ImageMetadata;
use crate::sync::{AnnotationSync, SyncState};
use crate::widget::WidgetProvider;

/// Tile pyramid description handed to the viewer when opening a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSource {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub max_level: u32,
}

impl From<ImageMetadata> for TileSource {
    fn from(metadata: ImageMetadata) -> Self {
        Self {
            width: metadata.width,
            height: metadata.height,
            tile_size: metadata.tile_size,
            max_level: metadata.max_level,
        }
    }
}

/// The rendering viewer, as the host provides it.
pub trait SlideViewer {
    /// Start loading a slide. Completion is reported as
    /// [`ViewerEvent::Opened`] or [`ViewerEvent::OpenFailed`].
    fn open(&mut self, source: TileSource);

    /// Current zoom factor in viewport coordinates.
    fn zoom(&self) -> f64;

    /// Zoom factor at which the whole slide fits the viewport.
    fn home_zoom(&self) -> f64;

    fn center(&self) -> (f64, f64);

    /// Rotation in degrees.
    fn rotation(&self) -> f64;

    fn zoom_to(&mut self, zoom: f64);

    fn set_rotation(&mut self, degrees: f64);

    /// Reset to the home view.
    fn go_home(&mut self);

    /// Pan and zoom so `bounds` fills the viewport.
    fn fit_bounds(&mut self, bounds: BoundingBox);

    fn destroy(&mut self);
}

/// Events forwarded from the viewer by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// The slide finished opening.
    Opened,
    OpenFailed,
    Zoom,
    Pan,
    Rotate,
    /// One tile failed to load; the viewer keeps running.
    TileLoadFailed { url: String },
}

/// Snapshot of the current view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerState {
    pub zoom: f64,
    pub center: (f64, f64),
    pub rotation: f64,
    /// Zoom expressed relative to the home zoom.
    pub magnification: f64,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            center: (0.5, 0.5),
            rotation: 0.0,
            magnification: 1.0,
        }
    }
}

/// Drives one viewer and its annotation adapter.
pub struct ViewerController<V, P, B>
where
    V: SlideViewer,
    P: WidgetProvider,
    B: AnnotationBackend,
{
    viewer: Option<V>,
    sync: AnnotationSync<P, B>,
    image_id: i64,
    /// Backend held until the open event triggers adapter initialization.
    pending_backend: Option<B>,
    state: ViewerState,
    min_magnification: f64,
    max_magnification: f64,
}

impl<V, P, B> ViewerController<V, P, B>
where
    V: SlideViewer,
    P: WidgetProvider,
    B: AnnotationBackend,
{
    /// Start opening `tile_source` in the viewer. The annotation layer is
    /// brought up once the open event arrives.
    pub fn new(
        config: &AnnotatorConfig,
        mut viewer: V,
        sync: AnnotationSync<P, B>,
        image_id: i64,
        backend: B,
        tile_source: TileSource,
    ) -> Self {
        viewer.open(tile_source);
        Self {
            viewer: Some(viewer),
            sync,
            image_id,
            pending_backend: Some(backend),
            state: ViewerState::default(),
            min_magnification: config.min_magnification,
            max_magnification: config.max_magnification,
        }
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn magnification(&self) -> f64 {
        self.state.magnification
    }

    /// Magnification formatted for the toolbar, e.g. `"20x"`.
    pub fn magnification_label(&self) -> String {
        let magnification = self.state.magnification;
        if (magnification - magnification.round()).abs() < 0.05 {
            format!("{}x", magnification.round() as i64)
        } else {
            format!("{magnification:.1}x")
        }
    }

    pub fn sync(&self) -> &AnnotationSync<P, B> {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut AnnotationSync<P, B> {
        &mut self.sync
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Forward one viewer event.
    pub fn handle_event(&mut self, event: ViewerEvent) {
        match event {
            ViewerEvent::Opened => self.on_opened(),
            ViewerEvent::OpenFailed => {
                log::error!("failed to open image {}", self.image_id);
            }
            ViewerEvent::Zoom | ViewerEvent::Pan | ViewerEvent::Rotate => self.read_viewer_state(),
            ViewerEvent::TileLoadFailed { url } => {
                log::warn!("tile failed to load: {url}");
            }
        }
    }

    /// Open handler: home the view, then bring up the annotation layer.
    /// A failing annotation layer leaves the viewer fully usable.
    fn on_opened(&mut self) {
        log::info!("image {} opened", self.image_id);
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.go_home();
        }
        self.read_viewer_state();
        if self.sync.state() == SyncState::Uninitialized {
            if let Some(backend) = self.pending_backend.take() {
                if let Err(err) = self.sync.initialize(self.image_id, backend) {
                    log::error!("annotation layer unavailable: {err}");
                }
            }
        }
    }

    fn read_viewer_state(&mut self) {
        let Some(viewer) = self.viewer.as_ref() else {
            return;
        };
        let zoom = viewer.zoom();
        let home = viewer.home_zoom();
        self.state = ViewerState {
            zoom,
            center: viewer.center(),
            rotation: viewer.rotation(),
            magnification: if home > 0.0 {
                zoom / home
            } else {
                self.state.magnification
            },
        };
    }

    // ========================================================================
    // Zoom and rotation
    // ========================================================================

    /// Step up to the next predefined magnification, or scale by 1.5 past
    /// the top of the ladder.
    pub fn zoom_in(&mut self) {
        let current = self.state.magnification;
        let next = MAGNIFICATION_LADDER
            .iter()
            .copied()
            .find(|&step| step > current + 1e-9)
            .unwrap_or(current * 1.5);
        self.set_magnification(next);
    }

    /// Step down to the previous predefined magnification, or scale by 0.67
    /// below the bottom of the ladder.
    pub fn zoom_out(&mut self) {
        let current = self.state.magnification;
        let previous = MAGNIFICATION_LADDER
            .iter()
            .copied()
            .rev()
            .find(|&step| step < current - 1e-9)
            .unwrap_or(current * 0.67);
        self.set_magnification(previous);
    }

    /// Jump to an absolute magnification, clamped to the configured range.
    pub fn set_magnification(&mut self, magnification: f64) {
        let magnification = magnification.clamp(self.min_magnification, self.max_magnification);
        if let Some(viewer) = self.viewer.as_mut() {
            let home = viewer.home_zoom();
            viewer.zoom_to(home * magnification);
        }
        self.state.magnification = magnification;
        log::debug!("magnification set to {magnification}");
    }

    /// Parse a magnification typed into the toolbar.
    pub fn set_custom_magnification(&mut self, input: &str) -> Result<(), AnnotatorError> {
        let value: f64 = input
            .trim()
            .trim_end_matches(['x', 'X'])
            .parse()
            .map_err(|_| AnnotatorError::invalid_input(format!("not a magnification: {input}")))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(AnnotatorError::invalid_input(format!(
                "magnification must be positive: {input}"
            )));
        }
        self.set_magnification(value);
        Ok(())
    }

    pub fn rotate_left(&mut self) {
        self.rotate_by(-90.0);
    }

    pub fn rotate_right(&mut self) {
        self.rotate_by(90.0);
    }

    fn rotate_by(&mut self, degrees: f64) {
        if let Some(viewer) = self.viewer.as_mut() {
            let rotation = viewer.rotation() + degrees;
            viewer.set_rotation(rotation);
            self.state.rotation = rotation;
        }
    }

    /// Back to the home view at 1x.
    pub fn reset_view(&mut self) {
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.go_home();
            viewer.set_rotation(0.0);
        }
        self.state = ViewerState::default();
    }

    /// Pan and zoom to one annotation.
    pub fn zoom_to_annotation(&mut self, id: &str) {
        let Some(bounds) = self.sync.annotation_bounds(id) else {
            log::warn!("no bounds for annotation {id}");
            return;
        };
        if let Some(viewer) = self.viewer.as_mut() {
            viewer.fit_bounds(bounds);
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Tear down adapter first, then the viewer.
    pub fn shutdown(&mut self) {
        self.sync.destroy();
        if let Some(mut viewer) = self.viewer.take() {
            viewer.destroy();
        }
        log::debug!("viewer controller shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::{AnnotationUpload, SavedAnnotation, StoredAnnotation};
    use crate::shape::Shape;
    use crate::widget::{AnnotationWidget, DrawingTool, WidgetConfig};

    #[derive(Debug, Default)]
    struct ViewerLog {
        opened: Vec<TileSource>,
        zoom_calls: Vec<f64>,
        rotations: Vec<f64>,
        homed: u32,
        fitted: Vec<BoundingBox>,
        destroyed: bool,
    }

    #[derive(Clone, Default)]
    struct StubViewer {
        log: Rc<RefCell<ViewerLog>>,
        zoom: Rc<RefCell<f64>>,
    }

    impl SlideViewer for StubViewer {
        fn open(&mut self, source: TileSource) {
            self.log.borrow_mut().opened.push(source);
        }
        fn zoom(&self) -> f64 {
            *self.zoom.borrow()
        }
        fn home_zoom(&self) -> f64 {
            0.5
        }
        fn center(&self) -> (f64, f64) {
            (0.5, 0.5)
        }
        fn rotation(&self) -> f64 {
            self.log.borrow().rotations.last().copied().unwrap_or(0.0)
        }
        fn zoom_to(&mut self, zoom: f64) {
            *self.zoom.borrow_mut() = zoom;
            self.log.borrow_mut().zoom_calls.push(zoom);
        }
        fn set_rotation(&mut self, degrees: f64) {
            self.log.borrow_mut().rotations.push(degrees);
        }
        fn go_home(&mut self) {
            *self.zoom.borrow_mut() = 0.5;
            self.log.borrow_mut().homed += 1;
        }
        fn fit_bounds(&mut self, bounds: BoundingBox) {
            self.log.borrow_mut().fitted.push(bounds);
        }
        fn destroy(&mut self) {
            self.log.borrow_mut().destroyed = true;
        }
    }

    #[derive(Clone, Default)]
    struct StubWidget {
        shapes: Rc<RefCell<Vec<Shape>>>,
        destroyed: Rc<RefCell<bool>>,
    }

    impl AnnotationWidget for StubWidget {
        fn add_shape(&mut self, shape: Shape) {
            self.shapes.borrow_mut().push(shape);
        }
        fn remove_shape(&mut self, id: &str) {
            self.shapes.borrow_mut().retain(|s| s.id != id);
        }
        fn shapes(&self) -> Vec<Shape> {
            self.shapes.borrow().clone()
        }
        fn set_shapes(&mut self, shapes: Vec<Shape>) {
            *self.shapes.borrow_mut() = shapes;
        }
        fn select_shape(&mut self, _id: &str) {}
        fn set_drawing_enabled(&mut self, _enabled: bool) {}
        fn set_drawing_tool(&mut self, _tool: DrawingTool) {}
        fn destroy(&mut self) {
            *self.destroyed.borrow_mut() = true;
        }
    }

    #[derive(Clone, Default)]
    struct StubProvider {
        widget: StubWidget,
        created: Rc<RefCell<u32>>,
    }

    impl WidgetProvider for StubProvider {
        type Widget = StubWidget;
        fn create_widget(&mut self, _config: &WidgetConfig) -> Result<StubWidget, AnnotatorError> {
            *self.created.borrow_mut() += 1;
            Ok(self.widget.clone())
        }
    }

    #[derive(Clone, Default)]
    struct StubBackend {
        lists: Rc<RefCell<u32>>,
    }

    impl AnnotationBackend for StubBackend {
        fn list_annotations(&self, _image_id: i64) -> Result<Vec<StoredAnnotation>, AnnotatorError> {
            *self.lists.borrow_mut() += 1;
            Ok(Vec::new())
        }
        fn create_annotation(
            &self,
            _image_id: i64,
            _upload: &AnnotationUpload,
        ) -> Result<SavedAnnotation, AnnotatorError> {
            Ok(SavedAnnotation {
                id: 1,
                creator: None,
                annotation_type: None,
                created: None,
                updated: None,
            })
        }
        fn update_annotation(
            &self,
            _image_id: i64,
            _annotation_id: i64,
            _upload: &AnnotationUpload,
        ) -> Result<(), AnnotatorError> {
            Ok(())
        }
        fn delete_annotation(
            &self,
            _image_id: i64,
            _annotation_id: i64,
        ) -> Result<(), AnnotatorError> {
            Ok(())
        }
    }

    fn controller() -> (
        ViewerController<StubViewer, StubProvider, StubBackend>,
        StubViewer,
        Rc<RefCell<u32>>,
    ) {
        let config = AnnotatorConfig::default();
        let viewer = StubViewer::default();
        let provider = StubProvider::default();
        let created = provider.created.clone();
        let sync = AnnotationSync::new(config.clone(), provider);
        let backend = StubBackend::default();
        let tile_source = TileSource {
            width: 40000,
            height: 30000,
            tile_size: 256,
            max_level: 9,
        };
        let controller =
            ViewerController::new(&config, viewer.clone(), sync, 7, backend, tile_source);
        (controller, viewer, created)
    }

    #[test]
    fn opened_event_homes_view_and_initializes_adapter() {
        let (mut controller, viewer, created) = controller();
        assert_eq!(viewer.log.borrow().opened.len(), 1);
        assert_eq!(controller.sync().state(), SyncState::Uninitialized);
        controller.handle_event(ViewerEvent::Opened);
        assert_eq!(viewer.log.borrow().homed, 1);
        assert_eq!(*created.borrow(), 1);
        assert_eq!(controller.sync().state(), SyncState::Ready);
        // a second open does not rebuild the adapter
        controller.handle_event(ViewerEvent::Opened);
        assert_eq!(*created.borrow(), 1);
    }

    #[test]
    fn zoom_in_steps_through_the_ladder() {
        let (mut controller, viewer, _) = controller();
        controller.handle_event(ViewerEvent::Opened);
        assert_eq!(controller.magnification(), 1.0);
        controller.zoom_in();
        assert_eq!(controller.magnification(), 2.0);
        controller.zoom_in();
        assert_eq!(controller.magnification(), 5.0);
        // zoom_to receives home_zoom * magnification
        assert_eq!(*viewer.log.borrow().zoom_calls.last().unwrap(), 2.5);
    }

    #[test]
    fn zoom_in_past_the_ladder_scales_and_clamps() {
        let (mut controller, _, _) = controller();
        controller.set_magnification(100.0);
        controller.zoom_in();
        assert_eq!(controller.magnification(), 100.0);
    }

    #[test]
    fn zoom_out_steps_down_and_scales_below_the_ladder() {
        let (mut controller, _, _) = controller();
        controller.set_magnification(5.0);
        controller.zoom_out();
        assert_eq!(controller.magnification(), 2.0);
        controller.set_magnification(0.5);
        controller.zoom_out();
        assert!((controller.magnification() - 0.335).abs() < 1e-9);
    }

    #[test]
    fn custom_magnification_parses_and_rejects() {
        let (mut controller, _, _) = controller();
        controller.set_custom_magnification(" 20x ").unwrap();
        assert_eq!(controller.magnification(), 20.0);
        assert!(controller.set_custom_magnification("fast").is_err());
        assert!(controller.set_custom_magnification("-3").is_err());
        // clamped to the configured range
        controller.set_custom_magnification("500").unwrap();
        assert_eq!(controller.magnification(), 100.0);
    }

    #[test]
    fn rotation_steps_by_ninety_degrees() {
        let (mut controller, viewer, _) = controller();
        controller.rotate_right();
        controller.rotate_right();
        controller.rotate_left();
        assert_eq!(viewer.log.borrow().rotations, vec![90.0, 180.0, 90.0]);
        assert_eq!(controller.state().rotation, 90.0);
    }

    #[test]
    fn reset_view_restores_defaults() {
        let (mut controller, viewer, _) = controller();
        controller.set_magnification(40.0);
        controller.rotate_right();
        controller.reset_view();
        assert_eq!(controller.state(), ViewerState::default());
        assert_eq!(viewer.log.borrow().homed, 1);
        assert_eq!(*viewer.log.borrow().rotations.last().unwrap(), 0.0);
    }

    #[test]
    fn magnification_label_formats() {
        let (mut controller, _, _) = controller();
        controller.set_magnification(20.0);
        assert_eq!(controller.magnification_label(), "20x");
        controller.set_magnification(1.5);
        assert_eq!(controller.magnification_label(), "1.5x");
    }

    #[test]
    fn shutdown_tears_down_adapter_then_viewer() {
        let (mut controller, viewer, _) = controller();
        controller.handle_event(ViewerEvent::Opened);
        controller.shutdown();
        assert_eq!(controller.sync().state(), SyncState::Destroyed);
        assert!(viewer.log.borrow().destroyed);
    }

    #[test]
    fn tile_source_from_metadata() {
        let source = TileSource::from(ImageMetadata {
            width: 40000,
            height: 30000,
            tile_size: 256,
            max_level: 9,
        });
        assert_eq!(source.tile_size, 256);
        assert_eq!(source.max_level, 9);
    }
}
