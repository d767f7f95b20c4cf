//! W3C Web Annotation shapes as exchanged with the drawing widget.
//!
//! A [`Shape`] is the JSON object the widget emits and consumes: an id, a
//! target whose selector carries an SVG fragment, and a list of purpose-tagged
//! bodies. Unknown fields are preserved verbatim so a shape survives a
//! round trip through the client untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Fallback color when neither the SVG nor a style body names one.
pub const DEFAULT_COLOR: &str = "#ff0000";

/// Annotation type reported when no tagging body is present.
pub const UNKNOWN_TYPE: &str = "Unknown";

/// One annotation as the widget sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: String,
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<Body>,
    #[serde(default)]
    pub target: Target,
    /// Database key stamped onto the shape once the backend has stored it.
    #[serde(rename = "databaseId", default, skip_serializing_if = "Option::is_none")]
    pub database_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The annotated region: a selector holding an SVG fragment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Selector>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selector {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Selector {
    pub fn svg(value: impl Into<String>) -> Self {
        Self {
            kind: String::from("SvgSelector"),
            value: value.into(),
            extra: Map::new(),
        }
    }
}

/// One body entry. The `purpose` field decides how `value` is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    #[serde(rename = "type", default = "textual_body")]
    pub kind: String,
    #[serde(default = "no_purpose", skip_serializing_if = "is_no_purpose")]
    pub purpose: Purpose,
    pub value: BodyValue,
}

fn no_purpose() -> Purpose {
    Purpose::Other(String::new())
}

fn is_no_purpose(purpose: &Purpose) -> bool {
    *purpose == no_purpose()
}

impl Body {
    pub fn text(purpose: Purpose, value: impl Into<String>) -> Self {
        Self {
            kind: textual_body(),
            purpose,
            value: BodyValue::Text(value.into()),
        }
    }
}

fn textual_body() -> String {
    String::from("TextualBody")
}

/// Role of a body within the annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purpose {
    /// Annotation type, e.g. "Tumor".
    Tagging,
    /// Pathologist grading.
    Grading,
    /// Free-form notes.
    Commenting,
    /// Display style (fill, stroke, opacity).
    Style,
    #[serde(untagged)]
    Other(String),
}

/// Body payload. Style bodies carry a structured object, everything else text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodyValue {
    Text(String),
    Style(StyleValue),
    Other(Value),
}

/// Structured value of a style body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleValue {
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
    pub fill_opacity: f64,
}

/// Widgets emit `body` as either a single object or an array. Normalize to a
/// vector; `null` and a missing field both become empty.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Body>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<Body>),
        One(Body),
    }

    let parsed: Option<OneOrMany> = Option::deserialize(deserializer)?;
    Ok(match parsed {
        None => Vec::new(),
        Some(OneOrMany::One(body)) => vec![body],
        Some(OneOrMany::Many(bodies)) => bodies,
    })
}

impl Shape {
    /// Build a shape around an SVG fragment, the way the widget does for a
    /// freshly drawn region.
    pub fn with_svg(id: impl Into<String>, svg: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context: Some(String::from("http://www.w3.org/ns/anno.jsonld")),
            kind: Some(String::from("Annotation")),
            body: Vec::new(),
            target: Target {
                source: None,
                selector: Some(Selector::svg(svg)),
                extra: Map::new(),
            },
            database_id: None,
            extra: Map::new(),
        }
    }

    /// SVG fragment of the target selector, if any.
    pub fn svg(&self) -> Option<&str> {
        self.target
            .selector
            .as_ref()
            .map(|selector| selector.value.as_str())
    }

    pub fn svg_mut(&mut self) -> Option<&mut String> {
        self.target
            .selector
            .as_mut()
            .map(|selector| &mut selector.value)
    }

    pub fn body_for(&self, purpose: &Purpose) -> Option<&Body> {
        self.body.iter().find(|body| body.purpose == *purpose)
    }

    /// Replace the body with the given purpose, or append one.
    pub fn upsert_body(&mut self, purpose: Purpose, value: BodyValue) {
        if let Some(body) = self.body.iter_mut().find(|body| body.purpose == purpose) {
            body.value = value;
        } else {
            self.body.push(Body {
                kind: textual_body(),
                purpose,
                value,
            });
        }
    }

    fn text_for(&self, purpose: &Purpose) -> Option<&str> {
        match self.body_for(purpose) {
            Some(Body {
                value: BodyValue::Text(text),
                ..
            }) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Annotation type from the tagging body, or [`UNKNOWN_TYPE`].
    pub fn annotation_type(&self) -> &str {
        self.text_for(&Purpose::Tagging).unwrap_or(UNKNOWN_TYPE)
    }

    pub fn notes(&self) -> Option<&str> {
        self.text_for(&Purpose::Commenting)
    }

    pub fn grade(&self) -> Option<&str> {
        self.text_for(&Purpose::Grading)
    }

    /// Display color: the SVG `fill` attribute wins, then the style body,
    /// then [`DEFAULT_COLOR`].
    pub fn color(&self) -> String {
        if let Some(svg) = self.svg() {
            if let Some(fill) = crate::style::attr_value(svg, "fill") {
                return fill.to_string();
            }
        }
        if let Some(Body {
            value: BodyValue::Style(style),
            ..
        }) = self.body_for(&Purpose::Style)
        {
            return style.fill.clone();
        }
        String::from(DEFAULT_COLOR)
    }
}
