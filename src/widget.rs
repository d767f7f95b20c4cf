//! Capability port for the drawing widget.
//!
//! The widget owns the drawing surface and its own copy of every shape. The
//! adapter never assumes a concrete widget; it programs against these traits
//! and receives user gestures as [`WidgetEvent`]s from the host.

use crate::error::AnnotatorError;
use crate::shape::Shape;

/// Drawing tools a widget may offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawingTool {
    Rect,
    Polygon,
    Circle,
    Ellipse,
    Freehand,
    Point,
}

impl DrawingTool {
    pub fn name(self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::Polygon => "polygon",
            Self::Circle => "circle",
            Self::Ellipse => "ellipse",
            Self::Freehand => "freehand",
            Self::Point => "point",
        }
    }
}

/// Settings handed to the provider when (re)creating a widget.
#[derive(Debug, Clone, Default)]
pub struct WidgetConfig {
    /// Tags offered in the widget's editor popup.
    pub vocabulary: Vec<String>,
    pub drawing_enabled: bool,
}

/// A user gesture reported by the widget.
#[derive(Debug, Clone)]
pub enum WidgetEvent {
    /// A new shape was drawn and confirmed.
    Created(Shape),
    /// An existing shape was edited. `previous` is the pre-edit state.
    Updated {
        shape: Shape,
        previous: Option<Box<Shape>>,
    },
    /// A shape was removed, by the user or programmatically.
    Deleted(Shape),
}

/// The drawing surface.
pub trait AnnotationWidget {
    fn add_shape(&mut self, shape: Shape);

    fn remove_shape(&mut self, id: &str);

    /// Swap a shape for an updated copy. Widgets cannot patch a shape in
    /// place, so the default is an explicit remove followed by a re-add.
    fn replace_shape(&mut self, shape: Shape) {
        let id = shape.id.clone();
        self.remove_shape(&id);
        self.add_shape(shape);
    }

    /// Current shapes, in widget order.
    fn shapes(&self) -> Vec<Shape>;

    /// Replace the whole shape set in one call.
    fn set_shapes(&mut self, shapes: Vec<Shape>);

    /// Highlight one shape, opening its editor popup where the widget has
    /// one.
    fn select_shape(&mut self, id: &str);

    fn set_drawing_enabled(&mut self, enabled: bool);

    fn set_drawing_tool(&mut self, tool: DrawingTool);

    /// Release the widget's resources. The widget is unusable afterwards.
    fn destroy(&mut self);
}

/// Factory for drawing widgets.
///
/// Creation can fail when the widget library is not loaded in the host
/// environment; it is also invoked again on vocabulary changes, which require
/// a full widget rebuild.
pub trait WidgetProvider {
    type Widget: AnnotationWidget;

    fn create_widget(&mut self, config: &WidgetConfig) -> Result<Self::Widget, AnnotatorError>;
}
