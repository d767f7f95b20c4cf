//! Geometry extraction from SVG selector fragments.
//!
//! The drawing widget stores every region as a small SVG fragment. The
//! helpers here pull a bounding box and an area out of the first recognized
//! shape element without rendering anything.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// SVG elements the extractor understands, in document order of preference.
pub(crate) const SHAPE_TAGS: &[&str] = &["rect", "circle", "ellipse", "polygon", "path"];

/// Axis-aligned bounding box in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Bounding box of the first recognized shape element in `svg`.
///
/// Returns `None` when no shape element is present, when the element's
/// dimensions are not positive, or when any extremum comes out non-finite.
pub fn bounding_box(svg: &str) -> Option<BoundingBox> {
    let element = first_shape_element(svg)?;
    match element.name().as_ref() {
        b"rect" => {
            let w = attr_f64(&element, "width");
            let h = attr_f64(&element, "height");
            (w > 0.0 && h > 0.0).then(|| BoundingBox {
                x: attr_f64(&element, "x"),
                y: attr_f64(&element, "y"),
                width: w,
                height: h,
            })
        }
        b"circle" => {
            let r = attr_f64(&element, "r");
            (r > 0.0).then(|| BoundingBox {
                x: attr_f64(&element, "cx") - r,
                y: attr_f64(&element, "cy") - r,
                width: 2.0 * r,
                height: 2.0 * r,
            })
        }
        b"ellipse" => {
            let rx = attr_f64(&element, "rx");
            let ry = attr_f64(&element, "ry");
            (rx > 0.0 && ry > 0.0).then(|| BoundingBox {
                x: attr_f64(&element, "cx") - rx,
                y: attr_f64(&element, "cy") - ry,
                width: 2.0 * rx,
                height: 2.0 * ry,
            })
        }
        b"polygon" => points_box(&parse_pairs(&attr_string(&element, "points"))),
        b"path" => points_box(&parse_pairs(&attr_string(&element, "d"))),
        _ => None,
    }
}

/// Area of the first recognized shape element, in squared image units.
///
/// Rectangles use width times height, circles `pi * r^2`, polygons the
/// shoelace formula. Ellipses and paths report 0.
pub fn shape_area(svg: &str) -> f64 {
    let Some(element) = first_shape_element(svg) else {
        return 0.0;
    };
    match element.name().as_ref() {
        b"rect" => attr_f64(&element, "width") * attr_f64(&element, "height"),
        b"circle" => {
            let r = attr_f64(&element, "r");
            std::f64::consts::PI * r * r
        }
        b"polygon" => shoelace(&parse_pairs(&attr_string(&element, "points"))),
        _ => 0.0,
    }
}

fn first_shape_element(svg: &str) -> Option<BytesStart<'static>> {
    let mut reader = Reader::from_str(svg);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.name();
                if SHAPE_TAGS.iter().any(|tag| tag.as_bytes() == name.as_ref()) {
                    return Some(e.into_owned());
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Attribute as f64; missing, malformed, or non-finite values become 0.
fn attr_f64(element: &BytesStart<'_>, name: &str) -> f64 {
    match element.try_get_attribute(name) {
        Ok(Some(attr)) => attr
            .unescape_value()
            .ok()
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|n| n.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn attr_string(element: &BytesStart<'_>, name: &str) -> String {
    match element.try_get_attribute(name) {
        Ok(Some(attr)) => attr
            .unescape_value()
            .map(|value| value.into_owned())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Alternating x/y pairs from a points list or a path's numeric tokens.
fn parse_pairs(text: &str) -> Vec<(f64, f64)> {
    let numbers = numeric_tokens(text);
    let mut pairs = Vec::with_capacity(numbers.len() / 2);
    let mut i = 0;
    while i + 1 < numbers.len() {
        pairs.push((numbers[i], numbers[i + 1]));
        i += 2;
    }
    pairs
}

/// Pull every numeric token out of `text`, skipping path commands and
/// separators. Tokens that do not parse to a finite number become 0.
fn numeric_tokens(text: &str) -> Vec<f64> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit()
            || ch == '.'
            || ch == 'e'
            || ch == 'E'
            || ((ch == '-' || ch == '+')
                && (current.is_empty() || current.ends_with('e') || current.ends_with('E')))
        {
            current.push(ch);
        } else if !current.is_empty() {
            push_token(&mut tokens, &current);
            current.clear();
            if ch == '-' || ch == '+' {
                current.push(ch);
            }
        }
    }
    if !current.is_empty() {
        push_token(&mut tokens, &current);
    }
    tokens
}

fn push_token(tokens: &mut Vec<f64>, token: &str) {
    // lone sign or stray exponent parses to nothing, skip it
    if token.chars().all(|c| !c.is_ascii_digit()) {
        return;
    }
    let value = token.parse::<f64>().ok().filter(|n| n.is_finite());
    tokens.push(value.unwrap_or(0.0));
}

/// Bounding box over coordinate pairs. Requires at least two pairs and
/// finite extrema.
fn points_box(pairs: &[(f64, f64)]) -> Option<BoundingBox> {
    if pairs.len() < 2 {
        return None;
    }
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(x, y) in pairs {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let finite = [min_x, min_y, max_x, max_y].iter().all(|n| n.is_finite());
    finite.then(|| BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    })
}

fn shoelace(pairs: &[(f64, f64)]) -> f64 {
    if pairs.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..pairs.len() {
        let j = (i + 1) % pairs.len();
        twice_area += pairs[i].0 * pairs[j].1 - pairs[j].0 * pairs[i].1;
    }
    (twice_area / 2.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_box_and_area() {
        let svg = r#"<svg><rect x="10" y="20" width="30" height="40"></rect></svg>"#;
        let bbox = bounding_box(svg).unwrap();
        assert_eq!(bbox.x, 10.0);
        assert_eq!(bbox.y, 20.0);
        assert_eq!(bbox.width, 30.0);
        assert_eq!(bbox.height, 40.0);
        assert_eq!(shape_area(svg), 1200.0);
    }

    #[test]
    fn rect_with_zero_dimension_is_rejected() {
        let svg = r#"<svg><rect x="1" y="1" width="0" height="40"/></svg>"#;
        assert!(bounding_box(svg).is_none());
    }

    #[test]
    fn circle_box_and_area() {
        let svg = r#"<svg><circle cx="50" cy="60" r="10"/></svg>"#;
        let bbox = bounding_box(svg).unwrap();
        assert_eq!(bbox.x, 40.0);
        assert_eq!(bbox.y, 50.0);
        assert_eq!(bbox.width, 20.0);
        assert_eq!(bbox.height, 20.0);
        let area = shape_area(svg);
        assert!((area - std::f64::consts::PI * 100.0).abs() < 1e-9);
    }

    #[test]
    fn ellipse_box() {
        let svg = r#"<svg><ellipse cx="10" cy="10" rx="4" ry="2"/></svg>"#;
        let bbox = bounding_box(svg).unwrap();
        assert_eq!(bbox.x, 6.0);
        assert_eq!(bbox.y, 8.0);
        assert_eq!(bbox.width, 8.0);
        assert_eq!(bbox.height, 4.0);
        assert_eq!(shape_area(svg), 0.0);
    }

    #[test]
    fn polygon_box_and_shoelace_area() {
        let svg = r#"<svg><polygon points="0,0 4,0 4,3 0,3"/></svg>"#;
        let bbox = bounding_box(svg).unwrap();
        assert_eq!(bbox.width, 4.0);
        assert_eq!(bbox.height, 3.0);
        assert_eq!(shape_area(svg), 12.0);
    }

    #[test]
    fn polygon_with_single_pair_is_rejected() {
        let svg = r#"<svg><polygon points="5,5"/></svg>"#;
        assert!(bounding_box(svg).is_none());
    }

    #[test]
    fn path_box_approximation() {
        let svg = r#"<svg><path d="M 10 10 L 30 10 L 30 25 Z"/></svg>"#;
        let bbox = bounding_box(svg).unwrap();
        assert_eq!(bbox.x, 10.0);
        assert_eq!(bbox.y, 10.0);
        assert_eq!(bbox.width, 20.0);
        assert_eq!(bbox.height, 15.0);
        assert_eq!(shape_area(svg), 0.0);
    }

    #[test]
    fn path_with_negative_and_exponent_tokens() {
        let tokens = numeric_tokens("M-1.5e1,2L3-4");
        assert_eq!(tokens, vec![-15.0, 2.0, 3.0, -4.0]);
    }

    #[test]
    fn unrecognized_fragment_yields_nothing() {
        assert!(bounding_box("<svg><line x1=\"0\" y1=\"0\" x2=\"1\" y2=\"1\"/></svg>").is_none());
        assert!(bounding_box("not svg at all").is_none());
        assert_eq!(shape_area("<svg></svg>"), 0.0);
    }

    #[test]
    fn malformed_numeric_attribute_defaults_to_zero() {
        let svg = r#"<svg><rect x="abc" y="2" width="5" height="5"/></svg>"#;
        let bbox = bounding_box(svg).unwrap();
        assert_eq!(bbox.x, 0.0);
        assert_eq!(bbox.y, 2.0);
    }
}
