//! Capability ports for the REST backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnnotatorError;
use crate::model::{ImageDetails, ImageMetadata, ImageOverview, ImageUpdate};
use crate::shape::Shape;

/// Create/update payload for one annotation.
///
/// `geometry` carries the whole shape as a JSON string, not as nested JSON.
/// The backend stores that string verbatim and parses it again when listing,
/// so the shape survives untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationUpload {
    pub creator: String,
    #[serde(rename = "type")]
    pub annotation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub geometry: String,
}

impl AnnotationUpload {
    pub fn from_shape(
        shape: &Shape,
        creator: &str,
        annotation_type: &str,
        notes: Option<&str>,
    ) -> Result<Self, AnnotatorError> {
        let geometry = serde_json::to_string(shape)?;
        Ok(Self {
            creator: creator.to_string(),
            annotation_type: annotation_type.to_string(),
            notes: notes.map(str::to_string),
            geometry,
        })
    }

    /// Reject a malformed payload before any network traffic.
    pub fn validate(&self) -> Result<(), AnnotatorError> {
        if self.geometry.is_empty() {
            return Err(AnnotatorError::missing_field("geometry"));
        }
        let parsed: serde_json::Value = serde_json::from_str(&self.geometry)
            .map_err(|e| AnnotatorError::invalid_geometry(e.to_string()))?;
        if !parsed.is_object() {
            return Err(AnnotatorError::invalid_geometry(
                "geometry must be a JSON object",
            ));
        }
        Ok(())
    }
}

/// One stored annotation from the list endpoint. The backend returns the
/// shape pre-parsed under `annotation`, next to its database key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnnotation {
    pub database_id: i64,
    pub annotation: Shape,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

/// Response of a successful create call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAnnotation {
    pub id: i64,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(rename = "type", default)]
    pub annotation_type: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

/// Annotation CRUD, scoped to one image per call.
pub trait AnnotationBackend {
    fn list_annotations(&self, image_id: i64) -> Result<Vec<StoredAnnotation>, AnnotatorError>;

    fn create_annotation(
        &self,
        image_id: i64,
        upload: &AnnotationUpload,
    ) -> Result<SavedAnnotation, AnnotatorError>;

    fn update_annotation(
        &self,
        image_id: i64,
        annotation_id: i64,
        upload: &AnnotationUpload,
    ) -> Result<(), AnnotatorError>;

    fn delete_annotation(&self, image_id: i64, annotation_id: i64) -> Result<(), AnnotatorError>;
}

/// Slide image management and tile access.
pub trait ImageBackend {
    fn list_images(&self) -> Result<Vec<ImageOverview>, AnnotatorError>;

    fn image_metadata(&self, image_id: i64) -> Result<ImageMetadata, AnnotatorError>;

    fn upload_image(&self, file_name: &str, bytes: Vec<u8>)
    -> Result<ImageDetails, AnnotatorError>;

    fn update_image(
        &self,
        image_id: i64,
        update: &ImageUpdate,
    ) -> Result<ImageDetails, AnnotatorError>;

    fn delete_image(&self, image_id: i64) -> Result<(), AnnotatorError>;

    /// URL of one JPEG tile in the deep-zoom pyramid.
    fn tile_url(&self, image_id: i64, level: u32, x: u32, y: u32) -> String;
}
