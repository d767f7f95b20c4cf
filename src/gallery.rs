//! Slide gallery: the image list with search, sorting, and upload.
//!
//! The gallery keeps an in-memory copy of the backend's image list and
//! refreshes it on a timer via [`ImageGallery::tick`], plus on demand after
//! every upload, rename, or delete.

use web_time::Instant;

use crate::backend::ImageBackend;
use crate::error::AnnotatorError;
use crate::model::{ImageDetails, ImageOverview, ImageStatus, ImageUpdate};

/// How often the image list is re-fetched while the gallery is visible.
pub const REFRESH_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Sort orders for the gallery grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Newest first.
    #[default]
    DateDesc,
    DateAsc,
    NameAsc,
    NameDesc,
}

/// The image list and its view settings.
pub struct ImageGallery<B: ImageBackend> {
    backend: B,
    images: Vec<ImageOverview>,
    sort_key: SortKey,
    uploading: bool,
    last_refresh: Option<Instant>,
}

impl<B: ImageBackend> ImageGallery<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            images: Vec::new(),
            sort_key: SortKey::default(),
            uploading: false,
            last_refresh: None,
        }
    }

    pub fn images(&self) -> &[ImageOverview] {
        &self.images
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// Slides that can be opened in the viewer.
    pub fn ready_count(&self) -> usize {
        self.images
            .iter()
            .filter(|image| image.status.is_viewable())
            .count()
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Re-fetch the image list now.
    pub fn refresh(&mut self) -> Result<(), AnnotatorError> {
        self.images = self.backend.list_images()?;
        self.last_refresh = Some(Instant::now());
        self.apply_sort();
        log::debug!("image list refreshed, {} entries", self.images.len());
        Ok(())
    }

    /// Periodic driver. Refreshes immediately on the first call, then every
    /// [`REFRESH_INTERVAL`]. Returns whether a refresh ran.
    pub fn tick(&mut self) -> bool {
        if !self.refresh_due() {
            return false;
        }
        if let Err(err) = self.refresh() {
            log::error!("failed to refresh image list: {err}");
        }
        true
    }

    fn refresh_due(&self) -> bool {
        self.last_refresh
            .is_none_or(|at| at.elapsed() >= REFRESH_INTERVAL)
    }

    // ========================================================================
    // View: search, filter, sort
    // ========================================================================

    /// Entries matching a case-insensitive name search and an optional
    /// status filter, in the current sort order.
    pub fn visible(&self, search: &str, status: Option<ImageStatus>) -> Vec<&ImageOverview> {
        let needle = search.trim().to_lowercase();
        self.images
            .iter()
            .filter(|image| needle.is_empty() || image.name.to_lowercase().contains(&needle))
            .filter(|image| status.is_none_or(|wanted| image.status == wanted))
            .collect()
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.sort_key = key;
        self.apply_sort();
    }

    fn apply_sort(&mut self) {
        match self.sort_key {
            SortKey::DateDesc => self.images.sort_by(|a, b| b.created.cmp(&a.created)),
            SortKey::DateAsc => self.images.sort_by(|a, b| a.created.cmp(&b.created)),
            SortKey::NameAsc => self.images.sort_by(|a, b| a.name.cmp(&b.name)),
            SortKey::NameDesc => self.images.sort_by(|a, b| b.name.cmp(&a.name)),
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Upload a slide file and refresh the list.
    pub fn upload(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ImageDetails, AnnotatorError> {
        self.uploading = true;
        let result = self.backend.upload_image(file_name, bytes);
        self.uploading = false;
        match result {
            Ok(details) => {
                log::info!("uploaded {file_name} as image {}", details.id);
                if let Err(err) = self.refresh() {
                    log::warn!("list refresh after upload failed: {err}");
                }
                Ok(details)
            }
            Err(err) => {
                log::error!("upload of {file_name} failed: {err}");
                Err(err)
            }
        }
    }

    /// Rename an image and refresh the list.
    pub fn rename(&mut self, image_id: i64, name: &str) -> Result<ImageDetails, AnnotatorError> {
        let update = ImageUpdate {
            name: Some(name.to_string()),
        };
        let details = self.backend.update_image(image_id, &update)?;
        if let Err(err) = self.refresh() {
            log::warn!("list refresh after rename failed: {err}");
        }
        Ok(details)
    }

    /// Delete an image and refresh the list.
    pub fn delete(&mut self, image_id: i64) -> Result<(), AnnotatorError> {
        self.backend.delete_image(image_id)?;
        log::info!("deleted image {image_id}");
        if let Err(err) = self.refresh() {
            log::warn!("list refresh after delete failed: {err}");
        }
        Ok(())
    }
}

/// Human-readable file size for the upload dialog, e.g. `"1.46 MB"`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return String::from("0 Bytes");
    }
    let exponent = ((bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::model::ImageMetadata;

    #[derive(Debug, Default)]
    struct BackendLog {
        lists: u32,
        uploads: Vec<String>,
        deletes: Vec<i64>,
        renames: Vec<(i64, String)>,
    }

    #[derive(Clone, Default)]
    struct StubImageBackend {
        log: Rc<RefCell<BackendLog>>,
        images: Rc<RefCell<Vec<ImageOverview>>>,
    }

    fn overview(id: i64, name: &str, status: ImageStatus, day: u32) -> ImageOverview {
        ImageOverview {
            id,
            name: name.to_string(),
            status,
            preview_url: None,
            created: Some(Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()),
            updated: None,
        }
    }

    impl ImageBackend for StubImageBackend {
        fn list_images(&self) -> Result<Vec<ImageOverview>, AnnotatorError> {
            self.log.borrow_mut().lists += 1;
            Ok(self.images.borrow().clone())
        }
        fn image_metadata(&self, _image_id: i64) -> Result<ImageMetadata, AnnotatorError> {
            Ok(ImageMetadata {
                width: 100,
                height: 100,
                tile_size: 256,
                max_level: 1,
            })
        }
        fn upload_image(
            &self,
            file_name: &str,
            _bytes: Vec<u8>,
        ) -> Result<ImageDetails, AnnotatorError> {
            self.log.borrow_mut().uploads.push(file_name.to_string());
            Ok(ImageDetails {
                id: 99,
                name: file_name.to_string(),
                width: None,
                height: None,
                tile_size: None,
                max_level: None,
                status: Some(ImageStatus::Pending),
                created: None,
                updated: None,
            })
        }
        fn update_image(
            &self,
            image_id: i64,
            update: &ImageUpdate,
        ) -> Result<ImageDetails, AnnotatorError> {
            let name = update.name.clone().unwrap_or_default();
            self.log.borrow_mut().renames.push((image_id, name.clone()));
            Ok(ImageDetails {
                id: image_id,
                name,
                width: None,
                height: None,
                tile_size: None,
                max_level: None,
                status: None,
                created: None,
                updated: None,
            })
        }
        fn delete_image(&self, image_id: i64) -> Result<(), AnnotatorError> {
            self.log.borrow_mut().deletes.push(image_id);
            self.images.borrow_mut().retain(|image| image.id != image_id);
            Ok(())
        }
        fn tile_url(&self, image_id: i64, level: u32, x: u32, y: u32) -> String {
            format!("/tiles/{image_id}/{level}/{x}_{y}.jpg")
        }
    }

    fn gallery_with(images: Vec<ImageOverview>) -> (ImageGallery<StubImageBackend>, StubImageBackend) {
        let backend = StubImageBackend::default();
        *backend.images.borrow_mut() = images;
        (ImageGallery::new(backend.clone()), backend)
    }

    #[test]
    fn first_tick_refreshes_immediately_then_waits() {
        let (mut gallery, backend) = gallery_with(vec![overview(1, "a.svs", ImageStatus::Ready, 1)]);
        assert!(gallery.tick());
        assert_eq!(gallery.images().len(), 1);
        // the interval has not elapsed
        assert!(!gallery.tick());
        assert_eq!(backend.log.borrow().lists, 1);
    }

    #[test]
    fn search_and_status_filter() {
        let (mut gallery, _) = gallery_with(vec![
            overview(1, "Liver_biopsy.svs", ImageStatus::Ready, 1),
            overview(2, "kidney.svs", ImageStatus::Processing, 2),
            overview(3, "liver_resection.svs", ImageStatus::Ready, 3),
        ]);
        gallery.refresh().unwrap();
        let hits = gallery.visible("liver", None);
        assert_eq!(hits.len(), 2);
        let ready = gallery.visible("", Some(ImageStatus::Ready));
        assert_eq!(ready.len(), 2);
        assert_eq!(gallery.visible("liver", Some(ImageStatus::Processing)).len(), 0);
        assert_eq!(gallery.ready_count(), 2);
    }

    #[test]
    fn sort_orders() {
        let (mut gallery, _) = gallery_with(vec![
            overview(1, "b.svs", ImageStatus::Ready, 1),
            overview(2, "a.svs", ImageStatus::Ready, 3),
            overview(3, "c.svs", ImageStatus::Ready, 2),
        ]);
        gallery.refresh().unwrap();
        // default: newest first
        let ids: Vec<i64> = gallery.images().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        gallery.set_sort_key(SortKey::NameAsc);
        let names: Vec<&str> = gallery.images().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a.svs", "b.svs", "c.svs"]);
    }

    #[test]
    fn upload_sends_file_and_refreshes() {
        let (mut gallery, backend) = gallery_with(Vec::new());
        let details = gallery.upload("slide.svs", vec![1, 2, 3]).unwrap();
        assert_eq!(details.id, 99);
        assert!(!gallery.is_uploading());
        assert_eq!(backend.log.borrow().uploads, vec!["slide.svs"]);
        assert_eq!(backend.log.borrow().lists, 1);
    }

    #[test]
    fn delete_removes_and_refreshes() {
        let (mut gallery, backend) = gallery_with(vec![overview(1, "a.svs", ImageStatus::Ready, 1)]);
        gallery.refresh().unwrap();
        gallery.delete(1).unwrap();
        assert!(gallery.images().is_empty());
        assert_eq!(backend.log.borrow().deletes, vec![1]);
    }

    #[test]
    fn rename_issues_update() {
        let (mut gallery, backend) = gallery_with(vec![overview(1, "a.svs", ImageStatus::Ready, 1)]);
        gallery.rename(1, "renamed.svs").unwrap();
        assert_eq!(
            backend.log.borrow().renames,
            vec![(1, String::from("renamed.svs"))]
        );
    }

    #[test]
    fn file_sizes_format_like_the_upload_dialog() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1_536_000), "1.46 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }
}
