//! Domain model: annotation records, layers, and slide images.

pub mod image;
pub mod layer;
pub mod record;

pub use image::{ImageDetails, ImageMetadata, ImageOverview, ImageStatus, ImageUpdate};
pub use layer::{LayerRecord, default_layers};
pub use record::AnnotationRecord;
