//! Client configuration and built-in defaults.

/// Tag vocabulary offered by the drawing widget when none is configured.
pub const DEFAULT_TAG_VOCABULARY: &[&str] = &["Nucleus", "Tumor", "Necrosis", "Stroma", "Muscle"];

/// Predefined magnification steps for the viewer zoom controls.
pub const MAGNIFICATION_LADDER: &[f64] =
    &[0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 40.0, 60.0, 80.0, 100.0];

/// Lowest magnification the viewer accepts.
pub const MIN_MAGNIFICATION: f64 = 0.1;

/// Highest magnification the viewer accepts.
pub const MAX_MAGNIFICATION: f64 = 100.0;

/// Creator stamped onto annotations drawn in this session.
pub const DEFAULT_CREATOR: &str = "Current User";

/// Settings shared by the annotation adapter and the viewer controller.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatorConfig {
    /// Base URL of the REST backend, without a trailing slash.
    pub api_root: String,
    /// Creator recorded on newly drawn annotations.
    pub creator: String,
    /// Tag vocabulary for the drawing widget.
    pub vocabulary: Vec<String>,
    pub min_magnification: f64,
    pub max_magnification: f64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            api_root: String::from("/api"),
            creator: String::from(DEFAULT_CREATOR),
            vocabulary: DEFAULT_TAG_VOCABULARY
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            min_magnification: MIN_MAGNIFICATION,
            max_magnification: MAX_MAGNIFICATION,
        }
    }
}

impl AnnotatorConfig {
    pub fn new(api_root: impl Into<String>) -> Self {
        Self {
            api_root: api_root.into(),
            ..Self::default()
        }
    }

    /// Override the creator stamped on new annotations.
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Override the tag vocabulary.
    pub fn with_vocabulary(mut self, vocabulary: Vec<String>) -> Self {
        self.vocabulary = vocabulary;
        self
    }
}
