//! Color styling of annotation shapes.
//!
//! Layers assign a color per annotation type. Applying a color rewrites the
//! presentation attributes inside the SVG selector text and records the same
//! values in a style body, so the color survives both widget re-rendering and
//! a backend round trip.

use crate::shape::{BodyValue, Purpose, Shape, StyleValue};

/// Fill opacity written by [`apply_color`].
pub const FILL_OPACITY: f64 = 0.25;

/// Stroke width written by [`apply_color`].
pub const STROKE_WIDTH: f64 = 2.0;

/// Recolor a shape in place. Idempotent: applying the same color twice
/// leaves the shape unchanged.
pub fn apply_color(shape: &mut Shape, color: &str) {
    if let Some(svg) = shape.svg() {
        let mut value = replace_attr(svg, "fill", color);
        value = replace_attr(&value, "fill-opacity", "0.25");
        value = replace_attr(&value, "stroke", color);
        value = replace_attr(&value, "stroke-width", "2");
        if !has_attr(&value, "fill") {
            value = inject_style_attrs(&value, color);
        }
        if let Some(slot) = shape.svg_mut() {
            *slot = value;
        }
    }
    shape.upsert_body(
        Purpose::Style,
        BodyValue::Style(StyleValue {
            fill: color.to_string(),
            stroke: color.to_string(),
            stroke_width: STROKE_WIDTH,
            fill_opacity: FILL_OPACITY,
        }),
    );
}

/// Value of the first `name="..."` attribute in the fragment, if present.
pub(crate) fn attr_value<'a>(svg: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{name}=\"");
    let mut rest = svg;
    let mut offset = 0;
    while let Some(pos) = rest.find(&needle) {
        if is_attr_boundary(svg, offset + pos) {
            let start = offset + pos + needle.len();
            let end = svg[start..].find('"')?;
            return Some(&svg[start..start + end]);
        }
        offset += pos + needle.len();
        rest = &svg[offset..];
    }
    None
}

pub(crate) fn has_attr(svg: &str, name: &str) -> bool {
    attr_value(svg, name).is_some()
}

/// Rewrite every `name="..."` occurrence to `name="value"`, leaving the rest
/// of the fragment byte for byte intact. Attribute names are matched on a
/// word boundary so `fill=` never hits `fill-opacity=`.
fn replace_attr(svg: &str, name: &str, value: &str) -> String {
    let needle = format!("{name}=\"");
    let mut out = String::with_capacity(svg.len());
    let mut rest = svg;
    let mut offset = 0;
    loop {
        let Some(pos) = rest.find(&needle) else {
            out.push_str(rest);
            return out;
        };
        let after = pos + needle.len();
        if !is_attr_boundary(svg, offset + pos) {
            out.push_str(&rest[..after]);
            offset += after;
            rest = &svg[offset..];
            continue;
        }
        let Some(end) = rest[after..].find('"') else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..after]);
        out.push_str(value);
        out.push('"');
        offset += after + end + 1;
        rest = &svg[offset..];
    }
}

/// True when the byte before `pos` cannot belong to a longer attribute name.
fn is_attr_boundary(svg: &str, pos: usize) -> bool {
    if pos == 0 {
        return true;
    }
    let prev = svg.as_bytes()[pos - 1];
    !(prev.is_ascii_alphanumeric() || prev == b'-' || prev == b'_' || prev == b':')
}

/// Insert fill and stroke attributes right after the first recognized shape
/// tag. Used for fragments that carry no styling of their own.
fn inject_style_attrs(svg: &str, color: &str) -> String {
    let attrs = format!(
        " fill=\"{color}\" fill-opacity=\"0.25\" stroke=\"{color}\" stroke-width=\"2\""
    );
    for tag in crate::geometry::SHAPE_TAGS {
        let open = format!("<{tag}");
        let mut search_from = 0;
        while let Some(pos) = svg[search_from..].find(&open) {
            let at = search_from + pos;
            let end = at + open.len();
            let next = svg.as_bytes().get(end);
            if next.is_none_or(|c| c.is_ascii_whitespace() || *c == b'>' || *c == b'/') {
                let mut out = String::with_capacity(svg.len() + attrs.len());
                out.push_str(&svg[..end]);
                out.push_str(&attrs);
                out.push_str(&svg[end..]);
                return out;
            }
            search_from = end;
        }
    }
    svg.to_string()
}
