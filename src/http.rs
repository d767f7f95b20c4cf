//! REST backend over HTTP.
//!
//! One client per backend; all calls are blocking. Non-success status codes
//! become [`AnnotatorError::Backend`] with the response body as message.

use reqwest::blocking::{Client, Response, multipart};

use crate::backend::{
    AnnotationBackend, AnnotationUpload, ImageBackend, SavedAnnotation, StoredAnnotation,
};
use crate::error::AnnotatorError;
use crate::model::{ImageDetails, ImageMetadata, ImageOverview, ImageUpdate};

/// HTTP implementation of the backend ports.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    api_root: String,
}

impl HttpBackend {
    /// `api_root` is the base URL, with or without a trailing slash.
    pub fn new(api_root: impl Into<String>) -> Self {
        let mut api_root = api_root.into();
        while api_root.ends_with('/') {
            api_root.pop();
        }
        Self {
            client: Client::new(),
            api_root,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_root)
    }

    fn check(response: Response) -> Result<Response, AnnotatorError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().unwrap_or_default();
            Err(AnnotatorError::backend(status.as_u16(), message))
        }
    }
}

impl AnnotationBackend for HttpBackend {
    fn list_annotations(&self, image_id: i64) -> Result<Vec<StoredAnnotation>, AnnotatorError> {
        let url = self.url(&format!("/images/annotations/{image_id}"));
        log::debug!("GET {url}");
        let response = Self::check(self.client.get(&url).send()?)?;
        Ok(response.json()?)
    }

    fn create_annotation(
        &self,
        image_id: i64,
        upload: &AnnotationUpload,
    ) -> Result<SavedAnnotation, AnnotatorError> {
        upload.validate()?;
        let url = self.url(&format!("/images/annotations/{image_id}"));
        log::debug!("POST {url} type={}", upload.annotation_type);
        let response = Self::check(self.client.post(&url).json(upload).send()?)?;
        Ok(response.json()?)
    }

    fn update_annotation(
        &self,
        image_id: i64,
        annotation_id: i64,
        upload: &AnnotationUpload,
    ) -> Result<(), AnnotatorError> {
        upload.validate()?;
        let url = self.url(&format!("/images/annotations/{image_id}/{annotation_id}"));
        log::debug!("PUT {url}");
        Self::check(self.client.put(&url).json(upload).send()?)?;
        Ok(())
    }

    fn delete_annotation(&self, image_id: i64, annotation_id: i64) -> Result<(), AnnotatorError> {
        let url = self.url(&format!("/images/annotations/{image_id}/{annotation_id}"));
        log::debug!("DELETE {url}");
        Self::check(self.client.delete(&url).send()?)?;
        Ok(())
    }
}

impl ImageBackend for HttpBackend {
    fn list_images(&self) -> Result<Vec<ImageOverview>, AnnotatorError> {
        let url = self.url("/images/get-images-list");
        log::debug!("GET {url}");
        let response = Self::check(self.client.get(&url).send()?)?;
        Ok(response.json()?)
    }

    fn image_metadata(&self, image_id: i64) -> Result<ImageMetadata, AnnotatorError> {
        let url = self.url(&format!("/images/metadata/{image_id}"));
        log::debug!("GET {url}");
        let response = Self::check(self.client.get(&url).send()?)?;
        Ok(response.json()?)
    }

    fn upload_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ImageDetails, AnnotatorError> {
        let url = self.url("/images/upload");
        log::info!("uploading {file_name} ({} bytes)", bytes.len());
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        let response = Self::check(self.client.post(&url).multipart(form).send()?)?;
        Ok(response.json()?)
    }

    fn update_image(
        &self,
        image_id: i64,
        update: &ImageUpdate,
    ) -> Result<ImageDetails, AnnotatorError> {
        let url = self.url(&format!("/images/{image_id}"));
        log::debug!("PUT {url}");
        let response = Self::check(self.client.put(&url).json(update).send()?)?;
        Ok(response.json()?)
    }

    fn delete_image(&self, image_id: i64) -> Result<(), AnnotatorError> {
        let url = self.url(&format!("/images/{image_id}"));
        log::debug!("DELETE {url}");
        Self::check(self.client.delete(&url).send()?)?;
        Ok(())
    }

    fn tile_url(&self, image_id: i64, level: u32, x: u32, y: u32) -> String {
        format!("{}/tiles/{image_id}/{level}/{x}_{y}.jpg", self.api_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed() {
        let backend = HttpBackend::new("http://localhost:8080/api//");
        assert_eq!(
            backend.url("/images/upload"),
            "http://localhost:8080/api/images/upload"
        );
    }

    #[test]
    fn tile_url_layout() {
        let backend = HttpBackend::new("http://localhost:8080/api");
        assert_eq!(
            backend.tile_url(7, 3, 12, 5),
            "http://localhost:8080/api/tiles/7/3/12_5.jpg"
        );
    }
}
