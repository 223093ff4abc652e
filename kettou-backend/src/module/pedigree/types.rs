///! Pedigree data types
use kettou_common::{MATCH_SEPARATOR, NO_MATCH};

use super::labels::PositionLabel;

/// One resolved ancestor of an entrant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    pub position: PositionLabel,
    pub name: String,
}

/// Ancestors of one entrant in pedigree-table order.
///
/// Partial: slots whose cell had no name are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pedigree {
    ancestors: Vec<Ancestor>,
}

impl Pedigree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair table cells with labels by index.
    ///
    /// Cells past the last label are ignored; empty or missing cells are skipped.
    pub fn from_cells<I>(labels: &[PositionLabel], cells: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let ancestors = labels
            .iter()
            .zip(cells)
            .filter_map(|(label, cell)| {
                let name = cell?.trim().to_string();
                if name.is_empty() {
                    return None;
                }
                Some(Ancestor {
                    position: label.clone(),
                    name,
                })
            })
            .collect();
        Self { ancestors }
    }

    pub fn push(&mut self, position: impl Into<PositionLabel>, name: impl Into<String>) {
        self.ancestors.push(Ancestor {
            position: position.into(),
            name: name.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ancestor> {
        self.ancestors.iter()
    }

    pub fn len(&self) -> usize {
        self.ancestors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ancestors.is_empty()
    }

    pub fn get(&self, position: &str) -> Option<&str> {
        self.ancestors
            .iter()
            .find(|a| a.position.as_str() == position)
            .map(|a| a.name.as_str())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Pedigree {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        let mut pedigree = Pedigree::new();
        for (position, name) in iter {
            pedigree.push(PositionLabel::from(position), name);
        }
        pedigree
    }
}

/// An ancestor found in the reference list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEntry {
    pub position: PositionLabel,
    /// Ancestor name as it appeared in the pedigree
    pub name: String,
    pub image_url: Option<String>,
}

impl MatchEntry {
    /// `<img src='…' width='100'>【父母】Name`, image part only when known
    pub fn render(&self) -> String {
        match &self.image_url {
            Some(url) => format!(
                "<img src='{}' width='100'>【{}】{}",
                url, self.position, self.name
            ),
            None => format!("【{}】{}", self.position, self.name),
        }
    }
}

/// Join rendered matches for storage; an empty list becomes the no-match placeholder.
pub fn render_matches(matches: &[MatchEntry]) -> String {
    if matches.is_empty() {
        return NO_MATCH.to_string();
    }
    matches
        .iter()
        .map(MatchEntry::render)
        .collect::<Vec<_>>()
        .join(MATCH_SEPARATOR)
}
