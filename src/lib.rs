//! slidemark: client core for annotating whole-slide microscopy images.
//!
//! The crate ties three independently replaceable pieces together:
//!
//! - a deep-zoom [`viewer`] showing a tiled slide pyramid,
//! - a drawing [`widget`] where regions are drawn and tagged,
//! - a REST [`backend`] persisting annotations and slides.
//!
//! [`sync::AnnotationSync`] sits in the middle: every drawing gesture flows
//! through it, it keeps the widget, the in-memory [`store`], and the backend
//! agreeing, and it rolls local state back when persistence fails.

pub mod backend;
pub mod config;
pub mod error;
pub mod gallery;
pub mod geometry;
pub mod http;
pub mod model;
pub mod notify;
pub mod shape;
pub mod stats;
pub mod store;
pub mod style;
pub mod sync;
pub mod viewer;
pub mod widget;

pub use config::AnnotatorConfig;
pub use error::AnnotatorError;
pub use http::HttpBackend;
pub use shape::Shape;
pub use sync::{AnnotationSync, SyncState};
pub use viewer::ViewerController;
