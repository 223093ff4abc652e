///! Ancestry position labels
///!
///! A label spells the path from the entrant to one ancestor, one marker per
///! generation: "父" = sire, "母" = dam. "母父" is the dam's sire.
use std::fmt;

pub const PATERNAL: char = '父';
pub const MATERNAL: char = '母';

/// Generations shown in the five-generation pedigree table
pub const DEFAULT_PEDIGREE_DEPTH: u32 = 5;

/// One ancestry slot, e.g. "父母父"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionLabel(String);

impl PositionLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PositionLabel {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Deepest walk performed; larger depths are clamped to it
pub const MAX_PEDIGREE_DEPTH: u32 = 20;

/// Number of labels produced for `max_depth` generations
pub fn label_count(max_depth: u32) -> usize {
    (1usize << (max_depth.min(MAX_PEDIGREE_DEPTH) + 1)) - 2
}

/// Generate every label down to `max_depth` generations.
///
/// Labels come out in pre-order with the sire's branch before the dam's,
/// which is the order the ancestor cells appear in the pedigree table:
/// index `i` of the result names the `i`-th cell.
/// Depths above `MAX_PEDIGREE_DEPTH` are clamped.
pub fn position_labels(max_depth: u32) -> Vec<PositionLabel> {
    let max_depth = max_depth.min(MAX_PEDIGREE_DEPTH);
    let mut labels = Vec::with_capacity(label_count(max_depth));
    let mut path = String::new();
    walk(&mut path, 0, max_depth, &mut labels);
    labels
}

fn walk(path: &mut String, depth: u32, max_depth: u32, out: &mut Vec<PositionLabel>) {
    if depth > max_depth {
        return;
    }
    // root (empty path) is not a label
    if depth > 0 {
        out.push(PositionLabel(path.clone()));
    }
    for marker in [PATERNAL, MATERNAL] {
        path.push(marker);
        walk(path, depth + 1, max_depth, out);
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_label_count_and_uniqueness() {
        for depth in 0..=8 {
            let labels = position_labels(depth);
            assert_eq!(labels.len(), (1usize << (depth + 1)) - 2);
            assert_eq!(labels.len(), label_count(depth));

            let unique: HashSet<_> = labels.iter().collect();
            assert_eq!(unique.len(), labels.len());
        }
    }

    #[test]
    fn test_huge_depth_is_clamped() {
        assert_eq!(label_count(63), label_count(MAX_PEDIGREE_DEPTH));
        assert_eq!(label_count(u32::MAX), (1usize << (MAX_PEDIGREE_DEPTH + 1)) - 2);
    }

    #[test]
    fn test_zero_depth_is_empty() {
        assert!(position_labels(0).is_empty());
    }

    #[test]
    fn test_pre_order_sire_first() {
        let labels: Vec<String> = position_labels(2)
            .into_iter()
            .map(|l| l.to_string())
            .collect();
        assert_eq!(labels, vec!["父", "父父", "父母", "母", "母父", "母母"]);
    }

    #[test]
    fn test_default_depth_table_layout() {
        let labels = position_labels(DEFAULT_PEDIGREE_DEPTH);
        assert_eq!(labels.len(), 62);
        assert_eq!(labels[0].as_str(), "父");
        assert_eq!(labels[4].as_str(), "父父父父父");
        assert_eq!(labels[5].as_str(), "父父父父母");
        assert_eq!(labels[31].as_str(), "母");
        assert_eq!(labels[61].as_str(), "母母母母母");
        assert_eq!(labels[61].as_str().chars().count(), 5);
    }
}
