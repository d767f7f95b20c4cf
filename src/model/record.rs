//! Metadata record kept per annotation, alongside the widget's shape.

use chrono::{DateTime, Utc};

use crate::geometry;
use crate::shape::Shape;

/// Client-side record for one annotation.
///
/// The `geometry` field holds the authoritative shape; the scalar fields are
/// denormalized from its bodies for quick access. `backend_id` is `None`
/// until the create call has succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    /// Widget identifier, unique within the session.
    pub id: String,
    /// Database key, once persisted.
    pub backend_id: Option<i64>,
    pub annotation_type: String,
    pub creator: String,
    pub notes: Option<String>,
    pub color: Option<String>,
    /// Cached area in squared image units. Computed on demand.
    pub area: Option<f64>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub geometry: Shape,
}

impl AnnotationRecord {
    /// Derive a record from a widget shape, stamping `creator` and the
    /// current time.
    pub fn from_shape(shape: &Shape, creator: &str) -> Self {
        Self {
            id: shape.id.clone(),
            backend_id: shape.database_id,
            annotation_type: shape.annotation_type().to_string(),
            creator: creator.to_string(),
            notes: shape.notes().map(str::to_string),
            color: Some(shape.color()),
            area: None,
            created: Some(Utc::now()),
            updated: None,
            geometry: shape.clone(),
        }
    }

    /// Area of the annotated region, computed from the SVG selector on first
    /// use and cached.
    pub fn area(&mut self) -> f64 {
        if let Some(area) = self.area {
            return area;
        }
        let area = self
            .geometry
            .svg()
            .map(geometry::shape_area)
            .unwrap_or(0.0);
        self.area = Some(area);
        area
    }

    /// Area without mutating the cache.
    pub fn area_uncached(&self) -> f64 {
        self.area.unwrap_or_else(|| {
            self.geometry
                .svg()
                .map(geometry::shape_area)
                .unwrap_or(0.0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Body, Purpose};

    fn tagged_rect() -> Shape {
        let mut shape = Shape::with_svg(
            "#r1",
            r#"<svg><rect x="0" y="0" width="10" height="5"></rect></svg>"#,
        );
        shape.body.push(Body::text(Purpose::Tagging, "Tumor"));
        shape.body.push(Body::text(Purpose::Commenting, "check margins"));
        shape
    }

    #[test]
    fn record_denormalizes_shape_fields() {
        let record = AnnotationRecord::from_shape(&tagged_rect(), "Current User");
        assert_eq!(record.id, "#r1");
        assert_eq!(record.annotation_type, "Tumor");
        assert_eq!(record.notes.as_deref(), Some("check margins"));
        assert_eq!(record.creator, "Current User");
        assert!(record.backend_id.is_none());
        assert!(record.created.is_some());
    }

    #[test]
    fn area_is_computed_once_and_cached() {
        let mut record = AnnotationRecord::from_shape(&tagged_rect(), "Current User");
        assert_eq!(record.area(), 50.0);
        assert_eq!(record.area, Some(50.0));
        // cache survives even if geometry changes afterwards
        record.geometry = Shape::with_svg("#r1", "<svg></svg>");
        assert_eq!(record.area(), 50.0);
    }
}
