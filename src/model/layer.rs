//! Annotation layers: one per annotation type, with visibility and color.

/// Display settings for all annotations of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    pub id: String,
    pub name: String,
    /// Annotation type this layer collects, matched against tagging bodies.
    pub layer_type: String,
    pub visible: bool,
    pub color: String,
}

impl LayerRecord {
    pub fn new(layer_type: impl Into<String>, color: impl Into<String>) -> Self {
        let layer_type = layer_type.into();
        Self {
            id: layer_type.to_lowercase(),
            name: layer_type.clone(),
            layer_type,
            visible: true,
            color: color.into(),
        }
    }
}

/// The built-in histology layers and their colors.
pub fn default_layers() -> Vec<LayerRecord> {
    vec![
        LayerRecord::new("Nucleus", "#ff0000"),
        LayerRecord::new("Tumor", "#00ff00"),
        LayerRecord::new("Necrosis", "#0000ff"),
        LayerRecord::new("Stroma", "#ffff00"),
        LayerRecord::new("Muscle", "#800080"),
    ]
}
