//! Summary statistics over the current annotation set.

use std::collections::BTreeMap;

use crate::model::record::AnnotationRecord;

/// Count and share of one annotation type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeBreakdown {
    pub annotation_type: String,
    pub count: usize,
    /// Share of the total, rounded to whole percent.
    pub percentage: u32,
}

/// Aggregates shown in the statistics panel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotationStatistics {
    pub total: usize,
    /// Sum of annotation areas in squared image units.
    pub total_area: f64,
    pub average_area: f64,
    /// Per-type breakdown, ordered by type name.
    pub by_type: Vec<TypeBreakdown>,
}

impl AnnotationStatistics {
    pub fn compute(records: &[AnnotationRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let total = records.len();
        let total_area: f64 = records.iter().map(AnnotationRecord::area_uncached).sum();
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in records {
            *counts.entry(record.annotation_type.as_str()).or_default() += 1;
        }
        let by_type = counts
            .into_iter()
            .map(|(annotation_type, count)| TypeBreakdown {
                annotation_type: annotation_type.to_string(),
                count,
                percentage: ((count as f64 / total as f64) * 100.0).round() as u32,
            })
            .collect();
        Self {
            total,
            total_area,
            average_area: total_area / total as f64,
            by_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Body, Purpose, Shape};

    fn record(id: &str, tag: &str, width: f64) -> AnnotationRecord {
        let svg = format!(r#"<svg><rect x="0" y="0" width="{width}" height="10"/></svg>"#);
        let mut shape = Shape::with_svg(id, svg);
        shape.body.push(Body::text(Purpose::Tagging, tag));
        AnnotationRecord::from_shape(&shape, "Current User")
    }

    #[test]
    fn empty_set_yields_zeroes() {
        let stats = AnnotationStatistics::compute(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.total_area, 0.0);
        assert!(stats.by_type.is_empty());
    }

    #[test]
    fn areas_and_breakdown() {
        let records = vec![
            record("#a", "Tumor", 10.0),
            record("#b", "Tumor", 20.0),
            record("#c", "Stroma", 5.0),
        ];
        let stats = AnnotationStatistics::compute(&records);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.total_area, 350.0);
        assert!((stats.average_area - 350.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.by_type.len(), 2);
        let tumor = stats
            .by_type
            .iter()
            .find(|b| b.annotation_type == "Tumor")
            .unwrap();
        assert_eq!(tumor.count, 2);
        assert_eq!(tumor.percentage, 67);
    }
}
